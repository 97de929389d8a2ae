//! Task correlation structure and its dimensionality reduction.
//!
//! Correlation between two uncertain tasks decays with their distance in the
//! task graph following a squared-exponential kernel. The resulting matrix is
//! reduced by principal component analysis: only the leading eigenpairs that
//! together explain the configured share of the total variance are kept.

use nalgebra::{DMatrix, DVector, SymmetricEigen};

use crate::error::{Error, Result};

/// Iteration cap for the symmetric eigensolver.
const EIGEN_MAX_ITERATIONS: usize = 10_000;

/// Build a correlation matrix from pairwise distances.
///
/// `distances[(i, j)]` is the distance between tasks `i` and `j`; an infinite
/// distance means the tasks are unrelated. The result has a unit diagonal.
pub fn correlate(distances: &DMatrix<f64>, length: f64) -> DMatrix<f64> {
    let n = distances.nrows();
    DMatrix::from_fn(n, n, |i, j| {
        if i == j {
            return 1.0;
        }
        let d = distances[(i, j)];
        if d.is_infinite() {
            0.0
        } else {
            (-(d / length).powi(2)).exp()
        }
    })
}

/// Leading principal components of a correlation matrix.
#[derive(Debug, Clone)]
pub struct Reduction {
    /// `nu × nz` map from independent to correlated standard normals.
    pub correlator: DMatrix<f64>,
    /// `nz × nu` least-squares inverse of the correlator.
    pub decorrelator: DMatrix<f64>,
    /// Retained eigenvalues in decreasing order.
    pub eigenvalues: Vec<f64>,
    /// Share of the total variance explained by the retained components.
    pub retained: f64,
}

impl Reduction {
    /// Number of correlated dimensions (`nu`).
    pub fn full_dimension(&self) -> usize {
        self.correlator.nrows()
    }

    /// Number of independent dimensions (`nz`).
    pub fn reduced_dimension(&self) -> usize {
        self.correlator.ncols()
    }
}

/// Decompose `correlation` and keep the fewest components whose eigenvalues
/// add up to at least `threshold` of the total.
pub fn decompose(correlation: &DMatrix<f64>, threshold: f64) -> Result<Reduction> {
    let n = correlation.nrows();
    if n == 0 || correlation.ncols() != n {
        return Err(Error::numeric(format!(
            "correlation matrix must be square and non-empty, got {}x{}",
            correlation.nrows(),
            correlation.ncols()
        )));
    }
    if correlation.iter().any(|v| !v.is_finite()) {
        return Err(Error::numeric("correlation matrix has non-finite entries"));
    }
    if !(threshold > 0.0 && threshold <= 1.0) {
        return Err(Error::config(format!(
            "variance threshold must be in (0, 1], got {threshold}"
        )));
    }

    let eigen = SymmetricEigen::try_new(correlation.clone(), f64::EPSILON, EIGEN_MAX_ITERATIONS)
        .ok_or_else(|| Error::numeric("eigendecomposition did not converge"))?;

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));
    // Round-off can push null directions slightly below zero.
    let values: Vec<f64> = order
        .iter()
        .map(|&k| eigen.eigenvalues[k].max(0.0))
        .collect();

    let total: f64 = values.iter().sum();
    if total <= 0.0 {
        return Err(Error::numeric("correlation matrix carries no variance"));
    }

    let mut kept = 0;
    let mut cumulative = 0.0;
    while kept < n {
        cumulative += values[kept];
        kept += 1;
        if cumulative / total >= threshold {
            break;
        }
    }
    // Zero-variance directions carry nothing worth sampling.
    while kept > 1 && values[kept - 1] <= 0.0 {
        kept -= 1;
    }

    let mut correlator = DMatrix::zeros(n, kept);
    let mut decorrelator = DMatrix::zeros(kept, n);
    for (c, &k) in order.iter().take(kept).enumerate() {
        let scale = values[c].sqrt();
        let vector: DVector<f64> = eigen.eigenvectors.column(k).into_owned();
        for r in 0..n {
            correlator[(r, c)] = vector[r] * scale;
            decorrelator[(c, r)] = vector[r] / scale;
        }
    }

    Ok(Reduction {
        correlator,
        decorrelator,
        eigenvalues: values[..kept].to_vec(),
        retained: values[..kept].iter().sum::<f64>() / total,
    })
}
