//! # uqsched-core
//!
//! **Surrogates of scheduled systems under correlated timing uncertainty.**
//!
//! `uqsched-core` evaluates expensive quantities of a scheduled task graph
//! (end-to-end delay, energy, temperature) at the nodes an adaptive
//! interpolation oracle asks for, spreading the work over a pool of workers and
//! reusing expensive partial results wherever two nodes share their slow
//! coordinates.
//!
//! ## Quick Start
//!
//! ```no_run
//! use uqsched_core::{Config, Grid, Solver, Target};
//!
//! let config = Config::default();
//! let target = Target::from_config(&config).unwrap();
//! let oracle = Grid::from_config(&config.interpolation).unwrap();
//!
//! let mut solver = Solver::new(target, &config.solver).unwrap();
//! let surface = solver.compute(&oracle).unwrap();
//! let nz = solver.quantity().model().transform.dimension();
//! let values = solver.evaluate(&oracle, &surface, &vec![0.5; nz]);
//! println!("{values:?} after {:?}", solver.stats());
//! ```
//!
//! ## Architecture
//!
//! Oracle → Solver (direct or cached) → Worker pool → Quantity → Output
//!
//! - The [`uncertainty`] model maps a point of the reduced unit hypercube to
//!   task durations through a Gaussian copula whose correlation is truncated by
//!   principal component analysis.
//! - A [`Quantity`] splits evaluation into an expensive step over the slow
//!   coordinates and a cheap step over the fast ones.
//! - The [`Cache`] keys expensive results on exact lattice indices, so the
//!   [`Cached`] strategy runs the expensive step at most once per slow point.

pub mod cache;
pub mod config;
pub mod error;
pub mod oracle;
pub mod pool;
pub mod quantity;
pub mod solver;
pub mod system;
pub mod uncertainty;

pub use cache::{Cache, CacheStats, Key};
pub use config::{
    AssessmentConfig, Config, InterpolationConfig, SolverConfig, SystemConfig, TargetConfig,
    UncertaintyConfig,
};
pub use error::{Error, Result};
pub use oracle::{Grid, Oracle, Surface};
pub use pool::{Job, Reply, WorkerPool, spawn_workers};
pub use quantity::{Dimensions, Intermediate, Model, Quantity, Target, TargetKind, Workspace};
pub use solver::{Cached, Direct, Solver, Stats, strategy_for};
pub use system::System;
pub use uncertainty::Transform;

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
