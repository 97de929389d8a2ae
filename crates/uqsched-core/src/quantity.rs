//! Quantities of interest.
//!
//! A [`Quantity`] maps a node of the unit hypercube to `no` output values. Its
//! inputs split into a prefix of `nf` fast coordinates and `ni - nf` slow
//! coordinates. Evaluation is split the same way:
//!
//! - [`Quantity::prepare`] does the expensive work that depends on the slow
//!   coordinates only and returns an intermediate array;
//! - [`Quantity::finish`] turns that array plus the fast coordinates into the
//!   output values and is cheap.
//!
//! The solvers cache intermediates between the two steps. [`Target`] is the
//! closed set of quantities defined over a scheduled [`System`]; it is built
//! by name through a static registry.

use std::sync::Arc;

use crate::config::{Config, TargetConfig};
use crate::error::{Error, Result};
use crate::system::System;
use crate::uncertainty::Transform;

/// Expensive slow-coordinate result shared between jobs and the cache.
pub type Intermediate = Arc<Vec<f64>>;

/// Input and output sizes of a quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    /// Total input coordinates (`ni`).
    pub inputs: usize,
    /// Leading fast coordinates (`nf`).
    pub fast: usize,
    /// Output values per node (`no`).
    pub outputs: usize,
}

impl Dimensions {
    /// Number of slow coordinates.
    pub fn slow(&self) -> usize {
        self.inputs - self.fast
    }
}

/// Capability shared by every quantity of interest.
pub trait Quantity: Send + Sync + 'static {
    /// Per-worker buffers reused across evaluations.
    type Scratch: Default + Send;

    fn dimensions(&self) -> Dimensions;

    /// Expensive step: compute the intermediate for the slow coordinates.
    fn prepare(&self, slow: &[f64], scratch: &mut Self::Scratch) -> Result<Vec<f64>>;

    /// Cheap step: derive the output values from an intermediate and the fast
    /// coordinates. `values` holds `outputs` entries.
    fn finish(&self, data: &[f64], fast: &[f64], values: &mut [f64]);

    /// Evaluate a full node.
    fn compute(&self, node: &[f64], scratch: &mut Self::Scratch, values: &mut [f64]) -> Result<()> {
        let (fast, slow) = node.split_at(self.dimensions().fast);
        let data = self.prepare(slow, scratch)?;
        self.finish(&data, fast, values);
        Ok(())
    }

    /// Map task durations to the slow coordinates that reproduce them.
    fn forward(&self, durations: &[f64]) -> Vec<f64>;

    /// Map slow coordinates to task durations.
    fn inverse(&self, slow: &[f64]) -> Vec<f64>;
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Identifier of a [`Target`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    EndToEndDelay,
    TotalEnergy,
    PeakTemperature,
    TemperatureProfile,
}

const REGISTRY: &[(&str, TargetKind)] = &[
    ("end-to-end-delay", TargetKind::EndToEndDelay),
    ("total-energy", TargetKind::TotalEnergy),
    ("peak-temperature", TargetKind::PeakTemperature),
    ("temperature-profile", TargetKind::TemperatureProfile),
];

impl TargetKind {
    /// Every registered kind, in registry order.
    pub fn all() -> impl Iterator<Item = TargetKind> {
        REGISTRY.iter().map(|&(_, kind)| kind)
    }

    /// Look up a kind by its registry identifier.
    pub fn from_name(name: &str) -> Result<Self> {
        REGISTRY
            .iter()
            .find(|(id, _)| *id == name)
            .map(|&(_, kind)| kind)
            .ok_or_else(|| {
                let known: Vec<&str> = REGISTRY.iter().map(|(id, _)| *id).collect();
                Error::config(format!(
                    "unknown target '{name}' (expected one of: {})",
                    known.join(", ")
                ))
            })
    }

    pub fn name(&self) -> &'static str {
        REGISTRY
            .iter()
            .find(|(_, kind)| kind == self)
            .map(|(id, _)| *id)
            .unwrap_or("unknown")
    }
}

impl std::fmt::Display for TargetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ---------------------------------------------------------------------------
// Targets
// ---------------------------------------------------------------------------

/// Shared read-only state every target evaluates against.
#[derive(Debug, Clone)]
pub struct Model {
    pub system: Arc<System>,
    pub transform: Arc<Transform>,
}

impl Model {
    /// Generate the system and its uncertainty model from a configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let system = System::from_config(&config.system)?;
        let transform = Transform::from_config(
            &system.graph,
            &system.nominal_durations(),
            &config.uncertainty,
        )?;
        Ok(Self {
            system: Arc::new(system),
            transform: Arc::new(transform),
        })
    }
}

/// Quantities defined over a scheduled system with uncertain durations.
#[derive(Debug, Clone)]
pub enum Target {
    /// Span of the schedule; one output.
    EndToEndDelay(Model),
    /// Dynamic plus static energy; one output.
    TotalEnergy(Model),
    /// Maximum temperature of each core; one output per core.
    PeakTemperature(Model),
    /// Temperature of each core at a normalized time given by the single fast
    /// coordinate; one output per core.
    TemperatureProfile { model: Model, time_steps: usize },
}

/// Per-worker buffers of a [`Target`].
#[derive(Debug, Default)]
pub struct Workspace {
    durations: Vec<f64>,
    power: Vec<f64>,
}

impl Target {
    pub fn new(kind: TargetKind, model: Model, config: &TargetConfig) -> Result<Self> {
        Ok(match kind {
            TargetKind::EndToEndDelay => Self::EndToEndDelay(model),
            TargetKind::TotalEnergy => Self::TotalEnergy(model),
            TargetKind::PeakTemperature => Self::PeakTemperature(model),
            TargetKind::TemperatureProfile => {
                if config.time_steps < 2 {
                    return Err(Error::config("temperature profile needs at least 2 time steps"));
                }
                Self::TemperatureProfile {
                    model,
                    time_steps: config.time_steps,
                }
            }
        })
    }

    /// Build the configured target, generating its system along the way.
    pub fn from_config(config: &Config) -> Result<Self> {
        let kind = TargetKind::from_name(&config.target.name)?;
        let model = Model::from_config(config)?;
        Self::new(kind, model, &config.target)
    }

    pub fn kind(&self) -> TargetKind {
        match self {
            Self::EndToEndDelay(_) => TargetKind::EndToEndDelay,
            Self::TotalEnergy(_) => TargetKind::TotalEnergy,
            Self::PeakTemperature(_) => TargetKind::PeakTemperature,
            Self::TemperatureProfile { .. } => TargetKind::TemperatureProfile,
        }
    }

    pub fn model(&self) -> &Model {
        match self {
            Self::EndToEndDelay(model)
            | Self::TotalEnergy(model)
            | Self::PeakTemperature(model)
            | Self::TemperatureProfile { model, .. } => model,
        }
    }

    fn durations<'a>(&self, slow: &[f64], scratch: &'a mut Workspace) -> &'a [f64] {
        let transform = &self.model().transform;
        scratch.durations.resize(transform.nominal().len(), 0.0);
        transform.backward_into(slow, &mut scratch.durations);
        &scratch.durations
    }
}

impl Quantity for Target {
    type Scratch = Workspace;

    fn dimensions(&self) -> Dimensions {
        let model = self.model();
        let nz = model.transform.dimension();
        let cores = model.system.cores();
        match self {
            Self::EndToEndDelay(_) | Self::TotalEnergy(_) => Dimensions {
                inputs: nz,
                fast: 0,
                outputs: 1,
            },
            Self::PeakTemperature(_) => Dimensions {
                inputs: nz,
                fast: 0,
                outputs: cores,
            },
            Self::TemperatureProfile { .. } => Dimensions {
                inputs: 1 + nz,
                fast: 1,
                outputs: cores,
            },
        }
    }

    fn prepare(&self, slow: &[f64], scratch: &mut Workspace) -> Result<Vec<f64>> {
        let system = &self.model().system;
        match self {
            Self::EndToEndDelay(_) => {
                let durations = self.durations(slow, scratch);
                Ok(vec![system.reschedule(durations).span()])
            }
            Self::TotalEnergy(_) => {
                let durations = self.durations(slow, scratch);
                Ok(vec![system.energy(durations)])
            }
            Self::PeakTemperature(_) => {
                self.durations(slow, scratch);
                let (_, trajectory) = system.temperature(&scratch.durations, &mut scratch.power)?;
                let cores = system.cores();
                let mut peak = vec![f64::NEG_INFINITY; cores];
                for row in trajectory.chunks_exact(cores) {
                    for (p, &t) in peak.iter_mut().zip(row) {
                        *p = p.max(t);
                    }
                }
                Ok(peak)
            }
            Self::TemperatureProfile { time_steps, .. } => {
                self.durations(slow, scratch);
                let (schedule, trajectory) =
                    system.temperature(&scratch.durations, &mut scratch.power)?;
                Ok(resample(
                    &trajectory,
                    system.cores(),
                    system.time_step(),
                    schedule.span(),
                    *time_steps,
                ))
            }
        }
    }

    fn finish(&self, data: &[f64], fast: &[f64], values: &mut [f64]) {
        match self {
            Self::TemperatureProfile { time_steps, .. } => {
                let cores = values.len();
                let position = fast[0].clamp(0.0, 1.0) * (*time_steps - 1) as f64;
                let lower = (position.floor() as usize).min(*time_steps - 2);
                let weight = position - lower as f64;
                let a = &data[lower * cores..(lower + 1) * cores];
                let b = &data[(lower + 1) * cores..(lower + 2) * cores];
                for ((v, &x), &y) in values.iter_mut().zip(a).zip(b) {
                    *v = x + weight * (y - x);
                }
            }
            _ => values.copy_from_slice(data),
        }
    }

    fn forward(&self, durations: &[f64]) -> Vec<f64> {
        self.model().transform.forward(durations)
    }

    fn inverse(&self, slow: &[f64]) -> Vec<f64> {
        self.model().transform.backward(slow)
    }
}

/// Resample a `steps × cores` trajectory onto `points` uniformly spaced
/// instants of `[0, span]`. Row `r` of the trajectory is the state at
/// `(r + 1) · time_step`; the state at time zero is the ambient.
fn resample(
    trajectory: &[f64],
    cores: usize,
    time_step: f64,
    span: f64,
    points: usize,
) -> Vec<f64> {
    let steps = trajectory.len() / cores;
    let row = |r: usize| -> &[f64] { &trajectory[r * cores..(r + 1) * cores] };
    let mut out = Vec::with_capacity(points * cores);
    for k in 0..points {
        let time = span * k as f64 / (points - 1) as f64;
        let position = time / time_step;
        if position <= 1.0 {
            let weight = position.max(0.0);
            for &t in row(0) {
                let ambient = crate::system::thermal::AMBIENT;
                out.push(ambient + weight * (t - ambient));
            }
            continue;
        }
        // Between rows `lower - 1` and `lower`, at times lower·dt and (lower+1)·dt.
        let lower = (position.floor() as usize).min(steps);
        if lower >= steps {
            out.extend_from_slice(row(steps - 1));
            continue;
        }
        let weight = position - lower as f64;
        for (&x, &y) in row(lower - 1).iter().zip(row(lower)) {
            out.push(x + weight * (y - x));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn config(target: &str) -> Config {
        let mut config = Config::default();
        config.system.tasks = 10;
        config.target.name = target.to_string();
        config.target.time_steps = 11;
        config
    }

    // -----------------------------------------------------------------------
    // Registry
    // -----------------------------------------------------------------------

    #[test]
    fn test_registry_round_trips() {
        for kind in TargetKind::all() {
            assert_eq!(TargetKind::from_name(kind.name()).unwrap(), kind);
        }
        assert_eq!(TargetKind::all().count(), 4);
    }

    #[test]
    fn test_unknown_target_lists_known_ones() {
        let err = TargetKind::from_name("energy").unwrap_err();
        assert!(err.to_string().contains("total-energy"));
    }

    // -----------------------------------------------------------------------
    // Dimensions
    // -----------------------------------------------------------------------

    #[test]
    fn test_dimensions() {
        let delay = Target::from_config(&config("end-to-end-delay")).unwrap();
        let nz = delay.model().transform.dimension();
        assert_eq!(
            delay.dimensions(),
            Dimensions {
                inputs: nz,
                fast: 0,
                outputs: 1
            }
        );
        let profile = Target::from_config(&config("temperature-profile")).unwrap();
        let d = profile.dimensions();
        assert_eq!((d.inputs, d.fast, d.outputs), (nz + 1, 1, 2));
        assert_eq!(d.slow(), nz);
    }

    // -----------------------------------------------------------------------
    // Values
    // -----------------------------------------------------------------------

    #[test]
    fn test_delay_is_span_of_replayed_schedule() {
        let target = Target::from_config(&config("end-to-end-delay")).unwrap();
        let model = target.model();
        let z = vec![0.3; target.dimensions().inputs];
        let mut values = [0.0];
        target
            .compute(&z, &mut Workspace::default(), &mut values)
            .unwrap();
        let expected = model.system.reschedule(&target.inverse(&z)).span();
        assert_eq!(values[0], expected);
        assert!(values[0] >= model.system.schedule.span());
    }

    #[test]
    fn test_energy_is_positive() {
        let target = Target::from_config(&config("total-energy")).unwrap();
        let nz = target.dimensions().inputs;
        let mut values = [0.0];
        target
            .compute(&vec![0.5; nz], &mut Workspace::default(), &mut values)
            .unwrap();
        assert!(values[0] > 0.0);
    }

    #[test]
    fn test_profile_endpoints() {
        let target = Target::from_config(&config("temperature-profile")).unwrap();
        let d = target.dimensions();
        let data = target
            .prepare(&vec![0.5; d.slow()], &mut Workspace::default())
            .unwrap();
        assert_eq!(data.len(), 11 * d.outputs);

        let mut start = vec![0.0; d.outputs];
        target.finish(&data, &[0.0], &mut start);
        for &t in &start {
            assert!((t - crate::system::thermal::AMBIENT).abs() < 1e-9);
        }

        let mut end = vec![0.0; d.outputs];
        target.finish(&data, &[1.0], &mut end);
        for (a, b) in end.iter().zip(&data[10 * d.outputs..]) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn test_profile_peak_bounds_profile() {
        let peak = Target::from_config(&config("peak-temperature")).unwrap();
        let profile = Target::from_config(&config("temperature-profile")).unwrap();
        let nz = peak.dimensions().inputs;
        let mut scratch = Workspace::default();
        let maxima = peak.prepare(&vec![0.3; nz], &mut scratch).unwrap();
        let data = profile.prepare(&vec![0.3; nz], &mut scratch).unwrap();
        for row in data.chunks_exact(maxima.len()) {
            for (t, m) in row.iter().zip(&maxima) {
                assert!(t <= &(m + 1e-9));
            }
        }
    }

    #[test]
    fn test_resample_linear_ramp() {
        // One core, trajectory 1, 2, 3 (above ambient) at t = 1, 2, 3.
        let ambient = crate::system::thermal::AMBIENT;
        let trajectory = [ambient + 1.0, ambient + 2.0, ambient + 3.0];
        let out = resample(&trajectory, 1, 1.0, 3.0, 7);
        let expected: Vec<f64> = (0..7).map(|k| ambient + 0.5 * k as f64).collect();
        for (a, b) in out.iter().zip(&expected) {
            assert!((a - b).abs() < 1e-9);
        }
    }
}
