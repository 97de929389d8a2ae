//! Cached strategy: the expensive step runs at most once per slow key.
//!
//! A batch is dispatched in two phases. Phase one sends one node for every
//! distinct slow key the cache does not know yet; the worker computes the
//! intermediate and the reply carries it back. Phase two sends every other
//! node with its intermediate attached, so those workers only finish the
//! cheap fast-coordinate step. Both phases write their replies back to the
//! cache; rewriting an existing entry is harmless.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use crate::cache::{Cache, Key};
use crate::error::{Error, Result};
use crate::oracle::Oracle;
use crate::pool::{self, Reply, WorkerPool};
use crate::quantity::{Intermediate, Quantity};

use super::{Request, Stats, dispatch, node_count};

pub struct Cached<Q: Quantity> {
    quantity: Arc<Q>,
    pool: WorkerPool,
    cache: Cache,
    batches: u64,
    nodes: u64,
    evaluations: u64,
}

impl<Q: Quantity> Cached<Q> {
    pub fn new(quantity: Arc<Q>, workers: usize, capacity: usize) -> Result<Self> {
        let shared = Arc::clone(&quantity);
        let pool = pool::spawn_workers(workers, move |jobs| pool::serve(shared.as_ref(), jobs))?;
        log::debug!(
            "cached solver with {} workers, cache sized for {capacity} entries",
            pool.workers()
        );
        Ok(Self {
            quantity,
            pool,
            cache: Cache::new(capacity),
            batches: 0,
            nodes: 0,
            evaluations: 0,
        })
    }

    pub fn quantity(&self) -> &Q {
        &self.quantity
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    pub fn stats(&self) -> Stats {
        let cache = self.cache.stats();
        Stats {
            batches: self.batches,
            nodes: self.nodes,
            evaluations: self.evaluations,
            cache_hits: cache.hits,
            cache_misses: cache.misses,
        }
    }

    /// Build a surrogate. The cache is flushed once construction ends.
    pub fn compute<O: Oracle>(&mut self, oracle: &O) -> Result<O::Surrogate> {
        let dims = self.quantity.dimensions();
        let surrogate = oracle.compute(dims.inputs, dims.outputs, |nodes, indices| {
            self.batch(nodes, indices)
        });
        self.cache.flush();
        surrogate
    }

    /// Evaluate a batch of nodes. `indices` holds the lattice index of every
    /// coordinate; the slow part of it is the cache key.
    pub fn batch(&mut self, nodes: &[f64], indices: &[u64]) -> Result<Vec<f64>> {
        let dims = self.quantity.dimensions();
        let count = node_count(nodes, dims.inputs)?;
        if indices.len() != nodes.len() {
            return Err(Error::config(format!(
                "{} lattice indices for {} coordinates",
                indices.len(),
                nodes.len()
            )));
        }
        let keys: Vec<Key> = indices
            .chunks_exact(dims.inputs)
            .map(|index| Key::new(&index[dims.fast..]))
            .collect();

        // One lookup per distinct key.
        let mut known: HashMap<Key, Option<Intermediate>> = HashMap::new();
        let mut first = Vec::new();
        let mut rest = Vec::new();
        for (i, key) in keys.iter().enumerate() {
            match known.entry(key.clone()) {
                Entry::Vacant(slot) => {
                    let hit = self.cache.get(key);
                    if hit.is_none() {
                        first.push(i);
                    } else {
                        rest.push(i);
                    }
                    slot.insert(hit);
                }
                Entry::Occupied(_) => rest.push(i),
            }
        }

        let node: Vec<&[f64]> = nodes.chunks_exact(dims.inputs).collect();
        let mut values = vec![0.0; count * dims.outputs];

        let fresh = dispatch(
            &self.pool,
            first.iter().map(|&i| Request {
                index: i,
                node: node[i],
                key: Some(keys[i].clone()),
                cached: None,
            }),
            dims.outputs,
            &mut values,
        )?;
        let evaluations = fresh.iter().filter(|r| r.fresh).count() as u64;
        for (key, data) in self.write_back(fresh) {
            known.insert(key, Some(data));
        }

        let reused = dispatch(
            &self.pool,
            rest.iter().map(|&i| Request {
                index: i,
                node: node[i],
                key: Some(keys[i].clone()),
                cached: known.get(&keys[i]).cloned().flatten(),
            }),
            dims.outputs,
            &mut values,
        )?;
        let evaluations = evaluations + reused.iter().filter(|r| r.fresh).count() as u64;
        self.write_back(reused);

        self.batches += 1;
        self.nodes += count as u64;
        self.evaluations += evaluations;
        log::info!(
            "batch {}: {count} nodes, {evaluations} evaluations (total {} nodes, {} evaluations)",
            self.batches,
            self.nodes,
            self.evaluations
        );
        Ok(values)
    }

    /// Store every returned intermediate; yields what was stored.
    fn write_back(&self, replies: Vec<Reply>) -> Vec<(Key, Intermediate)> {
        let mut stored = Vec::with_capacity(replies.len());
        for reply in replies {
            if let (Some(key), Some(data)) = (reply.key, reply.data) {
                self.cache.set(key.clone(), Arc::clone(&data));
                stored.push((key, data));
            }
        }
        stored
    }
}
