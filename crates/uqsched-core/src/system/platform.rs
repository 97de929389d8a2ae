//! Processing elements and per-task execution characteristics.

use rand::Rng;

use crate::error::{Error, Result};

/// Execution time range of a task on a reference core, in seconds.
const TIME_RANGE: (f64, f64) = (0.01, 0.05);
/// Dynamic power range of a task on a reference core, in watts.
const POWER_RANGE: (f64, f64) = (5.0, 20.0);
/// Relative speed range of cores; a factor above 1 is a slower core.
const SLOWDOWN_RANGE: (f64, f64) = (0.8, 1.25);
/// Leakage of an idle core, in watts.
const LEAKAGE: f64 = 1.0;

/// A set of cores and what each task costs on each of them.
#[derive(Debug, Clone)]
pub struct Platform {
    cores: usize,
    /// `time[task][core]` in seconds.
    time: Vec<Vec<f64>>,
    /// `power[task][core]` in watts.
    power: Vec<Vec<f64>>,
    leakage: Vec<f64>,
}

impl Platform {
    /// Build a platform from explicit tables.
    pub fn new(time: Vec<Vec<f64>>, power: Vec<Vec<f64>>, leakage: Vec<f64>) -> Result<Self> {
        let cores = leakage.len();
        if cores == 0 {
            return Err(Error::config("platform has no cores"));
        }
        if time.len() != power.len() {
            return Err(Error::config("time and power tables differ in task count"));
        }
        for (task, (t, p)) in time.iter().zip(&power).enumerate() {
            if t.len() != cores || p.len() != cores {
                return Err(Error::config(format!(
                    "task {task} is not characterized for all {cores} cores"
                )));
            }
            if t.iter().any(|&v| !(v.is_finite() && v > 0.0)) {
                return Err(Error::config(format!(
                    "task {task} has a non-positive execution time"
                )));
            }
        }
        Ok(Self {
            cores,
            time,
            power,
            leakage,
        })
    }

    /// Generate a heterogeneous platform for `tasks` tasks.
    pub fn random<R: Rng>(cores: usize, tasks: usize, rng: &mut R) -> Self {
        let slowdown: Vec<f64> = (0..cores)
            .map(|_| rng.random_range(SLOWDOWN_RANGE.0..SLOWDOWN_RANGE.1))
            .collect();
        let mut time = Vec::with_capacity(tasks);
        let mut power = Vec::with_capacity(tasks);
        for _ in 0..tasks {
            let t = rng.random_range(TIME_RANGE.0..TIME_RANGE.1);
            let p = rng.random_range(POWER_RANGE.0..POWER_RANGE.1);
            time.push(slowdown.iter().map(|s| t * s).collect());
            power.push(slowdown.iter().map(|s| p / s).collect());
        }
        Self {
            cores,
            time,
            power,
            leakage: vec![LEAKAGE; cores],
        }
    }

    pub fn cores(&self) -> usize {
        self.cores
    }

    pub fn tasks(&self) -> usize {
        self.time.len()
    }

    /// Execution time of `task` on `core`.
    pub fn time(&self, task: usize, core: usize) -> f64 {
        self.time[task][core]
    }

    /// Dynamic power of `task` on `core`.
    pub fn power(&self, task: usize, core: usize) -> f64 {
        self.power[task][core]
    }

    /// Static power of `core`.
    pub fn leakage(&self, core: usize) -> f64 {
        self.leakage[core]
    }

    /// Execution time of `task` averaged over cores.
    pub fn mean_time(&self, task: usize) -> f64 {
        self.time[task].iter().sum::<f64>() / self.cores as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_random_ranges() {
        let p = Platform::random(3, 10, &mut StdRng::seed_from_u64(1));
        assert_eq!(p.cores(), 3);
        assert_eq!(p.tasks(), 10);
        for task in 0..10 {
            for core in 0..3 {
                let t = p.time(task, core);
                assert!(t > 0.0 && t < TIME_RANGE.1 * SLOWDOWN_RANGE.1);
                assert!(p.power(task, core) > 0.0);
            }
        }
    }

    #[test]
    fn test_faster_core_draws_more_power() {
        let p = Platform::random(2, 1, &mut StdRng::seed_from_u64(5));
        let energy0 = p.time(0, 0) * p.power(0, 0);
        let energy1 = p.time(0, 1) * p.power(0, 1);
        assert!((energy0 - energy1).abs() < 1e-12);
    }

    #[test]
    fn test_new_validates_tables() {
        assert!(Platform::new(vec![vec![1.0]], vec![vec![1.0]], vec![]).is_err());
        assert!(Platform::new(vec![vec![1.0, 1.0]], vec![vec![1.0]], vec![0.0, 0.0]).is_err());
        assert!(Platform::new(vec![vec![0.0]], vec![vec![1.0]], vec![0.0]).is_err());
        let p = Platform::new(vec![vec![2.0, 4.0]], vec![vec![1.0, 1.0]], vec![0.5, 0.5]).unwrap();
        assert_eq!(p.mean_time(0), 3.0);
    }
}
