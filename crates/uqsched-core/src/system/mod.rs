//! The physical system whose quantities are analyzed.
//!
//! Architecture:
//! 1. Generate a task graph and a heterogeneous platform from a seed
//! 2. Schedule the graph once with nominal execution times
//! 3. Replay the schedule for perturbed durations
//! 4. Derive power profiles, energy, and temperature trajectories
//!
//! All of it is deterministic given the configuration; nothing here keeps
//! mutable state between evaluations, so one [`System`] is shared read-only by
//! every worker.

pub mod graph;
pub mod platform;
pub mod power;
pub mod schedule;
pub mod thermal;

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::config::SystemConfig;
use crate::error::{Error, Result};

pub use graph::TaskGraph;
pub use platform::Platform;
pub use schedule::Schedule;
pub use thermal::ThermalModel;

/// Task graph, platform, nominal schedule, and thermal model.
#[derive(Debug, Clone)]
pub struct System {
    pub graph: TaskGraph,
    pub platform: Platform,
    pub schedule: Schedule,
    pub thermal: ThermalModel,
    time_step: f64,
}

impl System {
    /// Assemble a system from explicit parts.
    pub fn new(graph: TaskGraph, platform: Platform, time_step: f64) -> Result<Self> {
        if graph.len() != platform.tasks() {
            return Err(Error::config(format!(
                "graph has {} tasks but the platform characterizes {}",
                graph.len(),
                platform.tasks()
            )));
        }
        let schedule = Schedule::list(&graph, &platform);
        let thermal = ThermalModel::new(platform.cores(), time_step)?;
        Ok(Self {
            graph,
            platform,
            schedule,
            thermal,
            time_step,
        })
    }

    /// Generate the system described by `config`.
    pub fn from_config(config: &SystemConfig) -> Result<Self> {
        if config.cores == 0 || config.tasks == 0 {
            return Err(Error::config("system needs at least one core and one task"));
        }
        let mut rng = StdRng::seed_from_u64(config.seed);
        let graph = TaskGraph::random(config.tasks, &mut rng);
        let platform = Platform::random(config.cores, config.tasks, &mut rng);
        let system = Self::new(graph, platform, config.time_step)?;
        log::debug!(
            "system: {} tasks on {} cores, nominal span {:.4}s",
            system.tasks(),
            system.cores(),
            system.schedule.span()
        );
        Ok(system)
    }

    pub fn tasks(&self) -> usize {
        self.graph.len()
    }

    pub fn cores(&self) -> usize {
        self.platform.cores()
    }

    pub fn time_step(&self) -> f64 {
        self.time_step
    }

    /// Execution time of every task on its mapped core.
    pub fn nominal_durations(&self) -> Vec<f64> {
        self.schedule.durations(&self.platform)
    }

    /// Nominal schedule replayed with `durations`.
    pub fn reschedule(&self, durations: &[f64]) -> Schedule {
        self.schedule.recompute(&self.graph, durations)
    }

    /// Total energy of the schedule replayed with `durations`.
    pub fn energy(&self, durations: &[f64]) -> f64 {
        let schedule = self.reschedule(durations);
        power::energy(&schedule, &self.platform, durations)
    }

    /// Temperature trajectory (row-major `steps × cores`) of the schedule
    /// replayed with `durations`, together with that schedule.
    ///
    /// `power` is a scratch buffer for the power profile.
    pub fn temperature(
        &self,
        durations: &[f64],
        power: &mut Vec<f64>,
    ) -> Result<(Schedule, Vec<f64>)> {
        let schedule = self.reschedule(durations);
        power::profile_into(&schedule, &self.platform, self.time_step, power)?;
        let trajectory = self.thermal.simulate(power)?;
        Ok((schedule, trajectory))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_is_deterministic() {
        let config = SystemConfig::default();
        let a = System::from_config(&config).unwrap();
        let b = System::from_config(&config).unwrap();
        assert_eq!(a.schedule.span(), b.schedule.span());
        assert_eq!(a.nominal_durations(), b.nominal_durations());
    }

    #[test]
    fn test_seed_changes_system() {
        let a = System::from_config(&SystemConfig::default()).unwrap();
        let b = System::from_config(&SystemConfig {
            seed: 1,
            ..Default::default()
        })
        .unwrap();
        assert_ne!(a.nominal_durations(), b.nominal_durations());
    }

    #[test]
    fn test_new_rejects_mismatch() {
        let graph = TaskGraph::new(2, &[]).unwrap();
        let platform = Platform::new(vec![vec![1.0]], vec![vec![1.0]], vec![0.0]).unwrap();
        assert!(System::new(graph, platform, 1e-3).is_err());
    }

    #[test]
    fn test_temperature_trajectory_shape() {
        let system = System::from_config(&SystemConfig::default()).unwrap();
        let mut power = Vec::new();
        let (schedule, trajectory) = system
            .temperature(&system.nominal_durations(), &mut power)
            .unwrap();
        let steps = (schedule.span() / system.time_step()).ceil() as usize;
        assert_eq!(trajectory.len(), steps * system.cores());
        assert!(trajectory.iter().all(|&t| t > thermal::AMBIENT));
    }

    #[test]
    fn test_energy_grows_with_durations() {
        let system = System::from_config(&SystemConfig::default()).unwrap();
        let nominal = system.nominal_durations();
        let longer: Vec<f64> = nominal.iter().map(|d| d * 1.1).collect();
        assert!(system.energy(&longer) > system.energy(&nominal));
    }
}
