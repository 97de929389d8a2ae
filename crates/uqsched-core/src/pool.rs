//! Worker pool and job protocol.
//!
//! A fixed set of named OS threads consumes [`Job`]s from one shared
//! rendezvous channel. Every job carries its own reply sender; the worker
//! answers with exactly one [`Reply`] (or the error that prevented it), so the
//! coordinator matches completions by [`Job::index`] and never relies on
//! completion order.
//!
//! Dropping the job sender is the only shutdown signal: workers drain the
//! channel and exit, and [`WorkerPool`] joins them on drop.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};

use crate::cache::Key;
use crate::error::{Error, Result};
use crate::quantity::{Intermediate, Quantity};

/// One node to evaluate.
#[derive(Debug)]
pub struct Job {
    /// Position of the node in its batch; values land at `index × outputs`.
    pub index: usize,
    /// Full node, fast coordinates first.
    pub node: Vec<f64>,
    /// Cache key of the slow coordinates, if the caller caches.
    pub key: Option<Key>,
    /// Previously computed intermediate for `key`.
    pub cached: Option<Intermediate>,
    pub reply: Sender<Result<Reply>>,
}

/// A worker's answer to one [`Job`].
#[derive(Debug)]
pub struct Reply {
    pub index: usize,
    pub values: Vec<f64>,
    /// Echo of [`Job::key`].
    pub key: Option<Key>,
    /// The intermediate used, when the job carried a key.
    pub data: Option<Intermediate>,
    /// Whether the expensive step ran for this job.
    pub fresh: bool,
}

/// Handle to a running set of workers.
pub struct WorkerPool {
    jobs: Option<Sender<Job>>,
    handles: Vec<JoinHandle<()>>,
}

/// Spawn `workers` threads (at least one), each running `serve` on the shared
/// job queue until it is closed.
pub fn spawn_workers<F>(workers: usize, serve: F) -> Result<WorkerPool>
where
    F: Fn(Receiver<Job>) + Send + Sync + 'static,
{
    let (tx, rx) = crossbeam_channel::bounded(0);
    let serve = Arc::new(serve);
    let mut pool = WorkerPool {
        jobs: Some(tx),
        handles: Vec::with_capacity(workers.max(1)),
    };
    for i in 0..workers.max(1) {
        let rx = rx.clone();
        let serve = Arc::clone(&serve);
        let handle = std::thread::Builder::new()
            .name(format!("uqsched-worker-{i}"))
            .spawn(move || {
                log::debug!("worker {i} started");
                serve(rx);
                log::debug!("worker {i} stopped");
            })?;
        pool.handles.push(handle);
    }
    Ok(pool)
}

impl WorkerPool {
    /// Number of worker threads.
    pub fn workers(&self) -> usize {
        self.handles.len()
    }

    /// Hand `job` to the next idle worker, blocking until one takes it.
    pub fn submit(&self, job: Job) -> Result<()> {
        let jobs = self.jobs.as_ref().ok_or(Error::Disconnected)?;
        jobs.send(job).map_err(|_| Error::Disconnected)
    }

    /// Close the queue and wait for every worker to exit.
    pub fn shutdown(mut self) {
        self.close();
    }

    fn close(&mut self) {
        self.jobs.take();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.close();
    }
}

// ---------------------------------------------------------------------------
// Serve loop
// ---------------------------------------------------------------------------

/// Process jobs for `quantity` until the queue closes.
///
/// The expensive step runs unless the job brings its intermediate along. A
/// failing or panicking evaluation is answered with an error; the worker
/// stays alive for the next job.
pub fn serve<Q: Quantity>(quantity: &Q, jobs: Receiver<Job>) {
    let dims = quantity.dimensions();
    let mut scratch = Q::Scratch::default();
    for job in jobs.iter() {
        let Job {
            index,
            node,
            key,
            cached,
            reply,
        } = job;
        let outcome = catch_unwind(AssertUnwindSafe(|| -> Result<Reply> {
            let (fast, slow) = node.split_at(dims.fast);
            let (data, fresh) = match cached {
                Some(data) => (data, false),
                None => (Arc::new(quantity.prepare(slow, &mut scratch)?), true),
            };
            let mut values = vec![0.0; dims.outputs];
            quantity.finish(&data, fast, &mut values);
            let data = key.is_some().then_some(data);
            Ok(Reply {
                index,
                values,
                key,
                data,
                fresh,
            })
        }));
        let outcome = outcome.unwrap_or_else(|_| {
            // Buffers may be half-written.
            scratch = Q::Scratch::default();
            Err(Error::simulation(format!("evaluation of node {index} panicked")))
        });
        // A closed reply channel means the batch was abandoned.
        let _ = reply.send(outcome);
    }
}
