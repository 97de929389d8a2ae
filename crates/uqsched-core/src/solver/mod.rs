//! Solvers: drive an [`Oracle`] with values computed on a worker pool.
//!
//! Two strategies share one worker pool design:
//!
//! - [`Direct`] evaluates every requested node in full; used when a quantity
//!   has no fast coordinates, so nothing can be reused.
//! - [`Cached`] keys the expensive intermediate on the lattice index of the
//!   slow coordinates and computes it at most once per key.
//!
//! [`Solver`] picks between them from the quantity's dimensions.

mod cached;
mod direct;

use std::sync::Arc;

use crossbeam_channel::unbounded;
use serde::Serialize;

use crate::cache::Key;
use crate::config::SolverConfig;
use crate::error::{Error, Result};
use crate::oracle::Oracle;
use crate::pool::{Job, Reply, WorkerPool};
use crate::quantity::{Dimensions, Intermediate, Quantity};

pub use cached::Cached;
pub use direct::Direct;

/// Running counters of a solver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    /// Batches requested by the oracle.
    pub batches: u64,
    /// Nodes requested by the oracle.
    pub nodes: u64,
    /// Runs of the expensive step.
    pub evaluations: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
}

/// Strategy for a quantity of shape `dims`: direct when it has no fast
/// coordinates and caching is not forced.
pub fn strategy_for(dims: Dimensions, config: &SolverConfig) -> &'static str {
    if dims.fast == 0 && !config.force_cache {
        "direct"
    } else {
        "cached"
    }
}

/// Strategy chosen for a quantity.
pub enum Solver<Q: Quantity> {
    Direct(Direct<Q>),
    Cached(Cached<Q>),
}

impl<Q: Quantity> Solver<Q> {
    /// Spawn the worker pool and pick a strategy with [`strategy_for`].
    pub fn new(quantity: Q, config: &SolverConfig) -> Result<Self> {
        let quantity = Arc::new(quantity);
        let workers = config.worker_count();
        match strategy_for(quantity.dimensions(), config) {
            "direct" => Ok(Self::Direct(Direct::new(quantity, workers)?)),
            _ => Ok(Self::Cached(Cached::new(
                quantity,
                workers,
                config.cache_capacity,
            )?)),
        }
    }

    pub fn quantity(&self) -> &Q {
        match self {
            Self::Direct(s) => s.quantity(),
            Self::Cached(s) => s.quantity(),
        }
    }

    /// Strategy name for reports.
    pub fn strategy(&self) -> &'static str {
        match self {
            Self::Direct(_) => "direct",
            Self::Cached(_) => "cached",
        }
    }

    /// Build a surrogate of the quantity with `oracle`.
    pub fn compute<O: Oracle>(&mut self, oracle: &O) -> Result<O::Surrogate> {
        match self {
            Self::Direct(s) => s.compute(oracle),
            Self::Cached(s) => s.compute(oracle),
        }
    }

    /// Evaluate a surrogate; no worker is involved.
    pub fn evaluate<O: Oracle>(
        &self,
        oracle: &O,
        surrogate: &O::Surrogate,
        points: &[f64],
    ) -> Vec<f64> {
        oracle.evaluate(surrogate, points)
    }

    /// Values of one batch of nodes (`inputs` values each) with their lattice
    /// indices, in node order.
    pub fn batch(&mut self, nodes: &[f64], indices: &[u64]) -> Result<Vec<f64>> {
        match self {
            Self::Direct(s) => s.batch(nodes),
            Self::Cached(s) => s.batch(nodes, indices),
        }
    }

    pub fn stats(&self) -> Stats {
        match self {
            Self::Direct(s) => s.stats(),
            Self::Cached(s) => s.stats(),
        }
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// A job before it is bound to a reply channel.
pub(crate) struct Request<'a> {
    pub index: usize,
    pub node: &'a [f64],
    pub key: Option<Key>,
    pub cached: Option<Intermediate>,
}

/// Submit `requests`, wait for all of them, and copy each reply's values to
/// `values[index × outputs..]`. Returns the replies for cache write-back.
///
/// Every submitted job is awaited even after a failure, so the pool is idle
/// again when this returns. The first error is reported.
pub(crate) fn dispatch<'a>(
    pool: &WorkerPool,
    requests: impl IntoIterator<Item = Request<'a>>,
    outputs: usize,
    values: &mut [f64],
) -> Result<Vec<Reply>> {
    let (tx, rx) = unbounded();
    let mut submitted = 0;
    let mut failure = None;
    for request in requests {
        let job = Job {
            index: request.index,
            node: request.node.to_vec(),
            key: request.key,
            cached: request.cached,
            reply: tx.clone(),
        };
        if let Err(e) = pool.submit(job) {
            failure = Some(e);
            break;
        }
        submitted += 1;
    }
    drop(tx);

    let mut replies = Vec::with_capacity(submitted);
    for _ in 0..submitted {
        match rx.recv() {
            Ok(Ok(reply)) => {
                let at = reply.index * outputs;
                values[at..at + outputs].copy_from_slice(&reply.values);
                replies.push(reply);
            }
            Ok(Err(e)) => {
                failure.get_or_insert(e);
            }
            Err(_) => {
                failure.get_or_insert(Error::Disconnected);
                break;
            }
        }
    }
    match failure {
        Some(e) => Err(e),
        None => Ok(replies),
    }
}

/// Check a batch against the quantity's input count; returns the node count.
pub(crate) fn node_count(nodes: &[f64], inputs: usize) -> Result<usize> {
    if inputs == 0 || nodes.len() % inputs != 0 {
        return Err(Error::config(format!(
            "batch of {} coordinates does not split into nodes of {inputs}",
            nodes.len()
        )));
    }
    Ok(nodes.len() / inputs)
}
