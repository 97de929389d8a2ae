//! Run configuration.
//!
//! A run is described by one JSON document with a section per concern. Every
//! section has defaults, so a configuration file only needs to name what it
//! changes:
//!
//! ```json
//! {
//!   "system": { "cores": 2, "tasks": 20, "seed": 0 },
//!   "uncertainty": { "correlation_length": 2.0, "variance_threshold": 0.95 },
//!   "target": { "name": "end-to-end-delay" }
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::quantity::TargetKind;
use crate::uncertainty::marginal::Family;

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Synthetic platform and task graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Number of processing elements.
    pub cores: usize,
    /// Number of tasks in the generated graph.
    pub tasks: usize,
    /// Seed for the graph and platform generators.
    pub seed: u64,
    /// Sampling interval of power and temperature profiles in seconds.
    pub time_step: f64,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            cores: 2,
            tasks: 20,
            seed: 0,
            time_step: 1e-3,
        }
    }
}

/// Stochastic model of task durations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UncertaintyConfig {
    /// Indices of uncertain tasks. `None` selects every task.
    pub tasks: Option<Vec<usize>>,
    /// Upper bound of a task's delay relative to its nominal duration.
    pub deviation: f64,
    /// Marginal family, e.g. `"Uniform"` or `"Beta(2, 2)"`.
    pub distribution: String,
    /// Correlation length in task-graph hops.
    pub correlation_length: f64,
    /// Share of the total variance the reduced space must retain.
    pub variance_threshold: f64,
}

impl Default for UncertaintyConfig {
    fn default() -> Self {
        Self {
            tasks: None,
            deviation: 0.2,
            distribution: "Beta(2, 2)".to_string(),
            correlation_length: 2.0,
            variance_threshold: 0.95,
        }
    }
}

/// Quantity of interest.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Registry identifier, see [`TargetKind`].
    pub name: String,
    /// Resolution of the normalized-time axis kept for `temperature-profile`.
    pub time_steps: usize,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            name: "end-to-end-delay".to_string(),
            time_steps: 101,
        }
    }
}

/// Evaluation dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Worker count; 0 means one per available hardware thread.
    pub workers: usize,
    /// Expected number of distinct slow-coordinate entries. Sizing hint only.
    pub cache_capacity: usize,
    /// Use the cached strategy even when the target has no fast coordinates.
    pub force_cache: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            cache_capacity: 1000,
            force_cache: false,
        }
    }
}

impl SolverConfig {
    /// Effective number of workers.
    pub fn worker_count(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }
}

/// Reference interpolation oracle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpolationConfig {
    /// Levels below this are always completed.
    pub min_level: u32,
    /// Deepest lattice level.
    pub max_level: u32,
    /// Refinement stops once no new node deviates more than this from the
    /// previous level's prediction.
    pub absolute_error: f64,
    /// Largest full tensor grid the oracle may build. The finest level has
    /// `(2^max_level + 1)^inputs` nodes.
    pub max_nodes: usize,
}

impl Default for InterpolationConfig {
    fn default() -> Self {
        // The default system reduces to 10 dimensions: 3^10 nodes at level
        // one, 5^10 at level two.
        Self {
            min_level: 1,
            max_level: 1,
            absolute_error: 1e-3,
            max_nodes: crate::oracle::DEFAULT_MAX_NODES,
        }
    }
}

/// Post-construction assessment at random points.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssessmentConfig {
    pub samples: usize,
    pub seed: u64,
}

impl Default for AssessmentConfig {
    fn default() -> Self {
        Self {
            samples: 1000,
            seed: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Whole configuration
// ---------------------------------------------------------------------------

/// Complete run configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub system: SystemConfig,
    pub uncertainty: UncertaintyConfig,
    pub target: TargetConfig,
    pub solver: SolverConfig,
    pub interpolation: InterpolationConfig,
    pub assessment: AssessmentConfig,
}

impl Config {
    /// Read and validate a configuration file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Parse and validate a configuration document.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every section for values the run cannot work with.
    pub fn validate(&self) -> Result<()> {
        let system = &self.system;
        if system.cores == 0 {
            return Err(Error::config("system.cores must be at least 1"));
        }
        if system.tasks == 0 {
            return Err(Error::config("system.tasks must be at least 1"));
        }
        if !(system.time_step.is_finite() && system.time_step > 0.0) {
            return Err(Error::config("system.time_step must be positive"));
        }

        let uncertainty = &self.uncertainty;
        if let Some(tasks) = &uncertainty.tasks {
            if tasks.is_empty() {
                return Err(Error::config("uncertainty.tasks must not be empty"));
            }
            if let Some(&bad) = tasks.iter().find(|&&t| t >= system.tasks) {
                return Err(Error::config(format!(
                    "uncertainty.tasks references task {bad}, but there are only {} tasks",
                    system.tasks
                )));
            }
        }
        if !(uncertainty.deviation.is_finite() && uncertainty.deviation > 0.0) {
            return Err(Error::config("uncertainty.deviation must be positive"));
        }
        if !(uncertainty.correlation_length.is_finite() && uncertainty.correlation_length > 0.0) {
            return Err(Error::config(
                "uncertainty.correlation_length must be positive",
            ));
        }
        let threshold = uncertainty.variance_threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(Error::config(
                "uncertainty.variance_threshold must be in (0, 1]",
            ));
        }
        Family::parse(&uncertainty.distribution)?;

        TargetKind::from_name(&self.target.name)?;
        if self.target.time_steps < 2 {
            return Err(Error::config("target.time_steps must be at least 2"));
        }

        let interpolation = &self.interpolation;
        if interpolation.max_level == 0 || interpolation.max_level > 20 {
            return Err(Error::config("interpolation.max_level must be in 1..=20"));
        }
        if interpolation.min_level > interpolation.max_level {
            return Err(Error::config(
                "interpolation.min_level must not exceed max_level",
            ));
        }
        if !(interpolation.absolute_error >= 0.0) {
            return Err(Error::config(
                "interpolation.absolute_error must be non-negative",
            ));
        }
        if interpolation.max_nodes == 0 {
            return Err(Error::config("interpolation.max_nodes must be at least 1"));
        }

        Ok(())
    }
}
