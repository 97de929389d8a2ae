//! Lumped RC thermal model.
//!
//! Every core is one thermal node with capacitance `C`, a conductance `G_amb`
//! to the ambient, and a conductance `G_lat` to each neighbor (cores sit in a
//! row). With `T` the temperature above ambient and `P` the power:
//!
//! ```text
//! C dT/dt = -G T + P
//! ```
//!
//! `G` is symmetric, so the system is integrated exactly for piecewise-constant
//! power through its eigendecomposition.

use nalgebra::{DMatrix, DVector, SymmetricEigen};

use crate::error::{Error, Result};

/// Ambient temperature in kelvin.
pub const AMBIENT: f64 = 318.15;
/// Thermal capacitance of a core in J/K.
const CAPACITANCE: f64 = 0.05;
/// Conductance from a core to the ambient in W/K.
const AMBIENT_CONDUCTANCE: f64 = 0.5;
/// Conductance between adjacent cores in W/K.
const LATERAL_CONDUCTANCE: f64 = 0.2;

/// Discretized thermal model: `T[k+1] = E T[k] + F P[k]`.
#[derive(Debug, Clone)]
pub struct ThermalModel {
    cores: usize,
    e: DMatrix<f64>,
    f: DMatrix<f64>,
}

impl ThermalModel {
    pub fn new(cores: usize, time_step: f64) -> Result<Self> {
        if cores == 0 {
            return Err(Error::config("thermal model needs at least one core"));
        }
        if !(time_step.is_finite() && time_step > 0.0) {
            return Err(Error::config("thermal time step must be positive"));
        }

        let mut g: DMatrix<f64> = DMatrix::zeros(cores, cores);
        for i in 0..cores {
            g[(i, i)] += AMBIENT_CONDUCTANCE;
            if i + 1 < cores {
                g[(i, i)] += LATERAL_CONDUCTANCE;
                g[(i + 1, i + 1)] += LATERAL_CONDUCTANCE;
                g[(i, i + 1)] -= LATERAL_CONDUCTANCE;
                g[(i + 1, i)] -= LATERAL_CONDUCTANCE;
            }
        }

        let a = -g / CAPACITANCE;
        let eigen = SymmetricEigen::try_new(a, f64::EPSILON, 10_000)
            .ok_or_else(|| Error::numeric("thermal system eigendecomposition did not converge"))?;
        let u = &eigen.eigenvectors;
        if eigen.eigenvalues.iter().any(|&l| l >= 0.0) {
            return Err(Error::numeric("thermal system is not dissipative"));
        }

        let decay = DVector::from_iterator(
            cores,
            eigen.eigenvalues.iter().map(|&l| (l * time_step).exp()),
        );
        let gain = DVector::from_iterator(
            cores,
            eigen
                .eigenvalues
                .iter()
                .map(|&l| ((l * time_step).exp() - 1.0) / l / CAPACITANCE),
        );
        let e = u * DMatrix::from_diagonal(&decay) * u.transpose();
        let f = u * DMatrix::from_diagonal(&gain) * u.transpose();

        Ok(Self { cores, e, f })
    }

    pub fn cores(&self) -> usize {
        self.cores
    }

    /// Integrate a row-major `steps × cores` power profile starting from the
    /// ambient temperature. Returns absolute temperatures in the same layout,
    /// one row per step (the state at the end of the step).
    pub fn simulate(&self, power: &[f64]) -> Result<Vec<f64>> {
        if power.is_empty() || power.len() % self.cores != 0 {
            return Err(Error::simulation(format!(
                "power profile of {} values does not fit {} cores",
                power.len(),
                self.cores
            )));
        }
        let mut state: DVector<f64> = DVector::zeros(self.cores);
        let mut output = Vec::with_capacity(power.len());
        for row in power.chunks_exact(self.cores) {
            let p = DVector::from_column_slice(row);
            state = &self.e * &state + &self.f * p;
            output.extend(state.iter().map(|t| t + AMBIENT));
        }
        if output.iter().any(|t| !t.is_finite()) {
            return Err(Error::simulation("temperature diverged"));
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_power_stays_at_ambient() {
        let model = ThermalModel::new(3, 1e-3).unwrap();
        let t = model.simulate(&[0.0; 30]).unwrap();
        assert!(t.iter().all(|&v| (v - AMBIENT).abs() < 1e-12));
    }

    #[test]
    fn test_constant_power_reaches_steady_state() {
        let model = ThermalModel::new(1, 0.01).unwrap();
        // Ten time constants.
        let steps = (10.0 * CAPACITANCE / AMBIENT_CONDUCTANCE / 0.01) as usize;
        let t = model.simulate(&vec![5.0; steps]).unwrap();
        let expected = AMBIENT + 5.0 / AMBIENT_CONDUCTANCE;
        assert!((t[steps - 1] - expected).abs() < 1e-3);
    }

    #[test]
    fn test_heat_spreads_to_neighbors() {
        let model = ThermalModel::new(2, 1e-3).unwrap();
        let power: Vec<f64> = (0..100).flat_map(|_| [10.0, 0.0]).collect();
        let t = model.simulate(&power).unwrap();
        let last = &t[t.len() - 2..];
        assert!(last[0] > last[1]);
        assert!(last[1] > AMBIENT);
    }

    #[test]
    fn test_step_size_independent() {
        let coarse = ThermalModel::new(2, 0.02).unwrap();
        let fine = ThermalModel::new(2, 0.01).unwrap();
        let a = coarse.simulate(&[3.0, 1.0]).unwrap();
        let b = fine.simulate(&[3.0, 1.0, 3.0, 1.0]).unwrap();
        assert!((a[0] - b[2]).abs() < 1e-9);
        assert!((a[1] - b[3]).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(ThermalModel::new(0, 1e-3).is_err());
        assert!(ThermalModel::new(2, 0.0).is_err());
        let model = ThermalModel::new(2, 1e-3).unwrap();
        assert!(matches!(model.simulate(&[1.0; 3]), Err(Error::Simulation(_))));
        assert!(matches!(model.simulate(&[]), Err(Error::Simulation(_))));
        assert!(matches!(
            model.simulate(&[f64::NAN, 0.0]),
            Err(Error::Simulation(_))
        ));
    }
}
