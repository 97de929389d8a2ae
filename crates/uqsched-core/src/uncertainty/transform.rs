//! Mapping between the reduced unit hypercube and physical task durations.
//!
//! ```text
//! z ∈ [0,1]^nz ─Φ⁻¹→ independent normals ─correlator→ correlated normals (nu)
//!              ─Φ→ correlated uniforms ─marginal⁻¹→ task delays ─+nominal→ durations (nt)
//! ```
//!
//! The transform is immutable after construction and shared read-only by all
//! workers.

use statrs::distribution::{ContinuousCDF, Normal};

use crate::config::UncertaintyConfig;
use crate::error::{Error, Result};
use crate::system::TaskGraph;

use super::correlation::{self, Reduction};
use super::linalg::multiply_infinite;
use super::marginal::{Family, Marginal};

/// Stochastic model of task durations.
#[derive(Debug, Clone)]
pub struct Transform {
    nominal: Vec<f64>,
    tasks: Vec<usize>,
    marginals: Vec<Marginal>,
    reduction: Reduction,
    gaussian: Normal,
}

impl Transform {
    /// Assemble a transform from its parts.
    ///
    /// `tasks` selects the uncertain entries of `nominal`; `marginals` and the
    /// rows of the reduction's correlator follow the same order.
    pub fn new(
        nominal: Vec<f64>,
        tasks: Vec<usize>,
        marginals: Vec<Marginal>,
        reduction: Reduction,
    ) -> Result<Self> {
        if tasks.is_empty() {
            return Err(Error::config("no uncertain tasks selected"));
        }
        if let Some(&bad) = tasks.iter().find(|&&t| t >= nominal.len()) {
            return Err(Error::config(format!(
                "uncertain task {bad} out of range for {} tasks",
                nominal.len()
            )));
        }
        if marginals.len() != tasks.len() || reduction.full_dimension() != tasks.len() {
            return Err(Error::config(format!(
                "{} uncertain tasks but {} marginals and {} correlated dimensions",
                tasks.len(),
                marginals.len(),
                reduction.full_dimension()
            )));
        }
        let gaussian = Normal::new(0.0, 1.0).map_err(|e| Error::numeric(e.to_string()))?;
        Ok(Self {
            nominal,
            tasks,
            marginals,
            reduction,
            gaussian,
        })
    }

    /// Build the delay model of a task graph.
    ///
    /// Each uncertain task receives an additive delay on
    /// `[0, deviation × nominal]`; delays are correlated according to the
    /// tasks' hop distance in the graph.
    pub fn from_config(
        graph: &TaskGraph,
        nominal: &[f64],
        config: &UncertaintyConfig,
    ) -> Result<Self> {
        let tasks: Vec<usize> = match &config.tasks {
            Some(tasks) => {
                let mut tasks = tasks.clone();
                tasks.sort_unstable();
                tasks.dedup();
                tasks
            }
            None => (0..nominal.len()).collect(),
        };
        if let Some(&bad) = tasks.iter().find(|&&t| t >= graph.len()) {
            return Err(Error::config(format!(
                "uncertain task {bad} out of range for {} tasks",
                graph.len()
            )));
        }

        let family = Family::parse(&config.distribution)?;
        let marginals = tasks
            .iter()
            .map(|&t| family.bounded(0.0, config.deviation * nominal[t]))
            .collect::<Result<Vec<_>>>()?;

        let distances = graph.distances(&tasks);
        let correlation = correlation::correlate(&distances, config.correlation_length);
        let reduction = correlation::decompose(&correlation, config.variance_threshold)?;

        log::debug!(
            "uncertainty: {} uncertain tasks reduced to {} dimensions ({:.1}% variance)",
            reduction.full_dimension(),
            reduction.reduced_dimension(),
            100.0 * reduction.retained
        );

        Self::new(nominal.to_vec(), tasks, marginals, reduction)
    }

    /// Number of independent stochastic dimensions (`nz`).
    pub fn dimension(&self) -> usize {
        self.reduction.reduced_dimension()
    }

    /// Number of uncertain tasks (`nu`).
    pub fn uncertain(&self) -> usize {
        self.tasks.len()
    }

    /// Indices of the uncertain tasks.
    pub fn tasks(&self) -> &[usize] {
        &self.tasks
    }

    /// Nominal durations of all tasks (`nt`).
    pub fn nominal(&self) -> &[f64] {
        &self.nominal
    }

    /// The dimensionality reduction in use.
    pub fn reduction(&self) -> &Reduction {
        &self.reduction
    }

    /// Correlated standard normals (length `nu`) for a point `z` of the
    /// reduced hypercube.
    pub fn gaussian(&self, z: &[f64]) -> Vec<f64> {
        debug_assert_eq!(z.len(), self.dimension());
        let independent: Vec<f64> = z.iter().map(|&u| self.quantile(u)).collect();
        let mut correlated = vec![0.0; self.uncertain()];
        multiply_infinite(&self.reduction.correlator, &independent, &mut correlated);
        correlated
    }

    /// Task durations (length `nt`) for a point `z` of the reduced hypercube.
    ///
    /// Tasks that are not uncertain keep their nominal duration.
    pub fn backward(&self, z: &[f64]) -> Vec<f64> {
        let mut durations = self.nominal.clone();
        self.backward_into(z, &mut durations);
        durations
    }

    /// Like [`Transform::backward`] but writes into `durations`, which must
    /// hold `nt` values. Certain tasks are reset to nominal.
    pub fn backward_into(&self, z: &[f64], durations: &mut [f64]) {
        durations.copy_from_slice(&self.nominal);
        let correlated = self.gaussian(z);
        for ((&task, marginal), g) in self.tasks.iter().zip(&self.marginals).zip(correlated) {
            let u = self.gaussian.cdf(g);
            durations[task] = self.nominal[task] + marginal.inverse_cdf(u);
        }
    }

    /// Inverse of [`Transform::backward`]: the point of the reduced hypercube
    /// whose image is closest (in the correlated normal space) to `durations`.
    pub fn forward(&self, durations: &[f64]) -> Vec<f64> {
        debug_assert_eq!(durations.len(), self.nominal.len());
        let correlated: Vec<f64> = self
            .tasks
            .iter()
            .zip(&self.marginals)
            .map(|(&task, marginal)| {
                let u = marginal.cdf(durations[task] - self.nominal[task]);
                self.quantile(u)
            })
            .collect();
        let mut independent = vec![0.0; self.dimension()];
        multiply_infinite(&self.reduction.decorrelator, &correlated, &mut independent);
        independent
            .into_iter()
            .map(|g| self.gaussian.cdf(g))
            .collect()
    }

    fn quantile(&self, u: f64) -> f64 {
        if u.is_nan() {
            f64::NAN
        } else if u <= 0.0 {
            f64::NEG_INFINITY
        } else if u >= 1.0 {
            f64::INFINITY
        } else {
            self.gaussian.inverse_cdf(u)
        }
    }
}
