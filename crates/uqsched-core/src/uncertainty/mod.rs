//! Stochastic model of task durations.
//!
//! - [`marginal`]: per-task bounded distributions
//! - [`correlation`]: correlation kernel and principal-component reduction
//! - [`linalg`]: products that keep signed infinities intact
//! - [`Transform`]: the full unit-hypercube → durations map

pub mod correlation;
pub mod linalg;
pub mod marginal;
mod transform;

pub use transform::Transform;
