//! Direct strategy: every requested node is evaluated in full.

use std::sync::Arc;

use crate::error::Result;
use crate::oracle::Oracle;
use crate::pool::{self, WorkerPool};
use crate::quantity::Quantity;

use super::{Request, Stats, dispatch, node_count};

pub struct Direct<Q: Quantity> {
    quantity: Arc<Q>,
    pool: WorkerPool,
    stats: Stats,
}

impl<Q: Quantity> Direct<Q> {
    pub fn new(quantity: Arc<Q>, workers: usize) -> Result<Self> {
        let shared = Arc::clone(&quantity);
        let pool = pool::spawn_workers(workers, move |jobs| pool::serve(shared.as_ref(), jobs))?;
        log::debug!("direct solver with {} workers", pool.workers());
        Ok(Self {
            quantity,
            pool,
            stats: Stats::default(),
        })
    }

    pub fn quantity(&self) -> &Q {
        &self.quantity
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    pub fn compute<O: Oracle>(&mut self, oracle: &O) -> Result<O::Surrogate> {
        let dims = self.quantity.dimensions();
        oracle.compute(dims.inputs, dims.outputs, |nodes, _| self.batch(nodes))
    }

    /// Evaluate a batch of nodes, one job per node.
    pub fn batch(&mut self, nodes: &[f64]) -> Result<Vec<f64>> {
        let dims = self.quantity.dimensions();
        let count = node_count(nodes, dims.inputs)?;
        let mut values = vec![0.0; count * dims.outputs];
        let requests = nodes
            .chunks_exact(dims.inputs)
            .enumerate()
            .map(|(index, node)| Request {
                index,
                node,
                key: None,
                cached: None,
            });
        dispatch(&self.pool, requests, dims.outputs, &mut values)?;

        self.stats.batches += 1;
        self.stats.nodes += count as u64;
        self.stats.evaluations += count as u64;
        log::info!(
            "batch {}: {count} nodes evaluated (total {} nodes)",
            self.stats.batches,
            self.stats.nodes
        );
        Ok(values)
    }
}
