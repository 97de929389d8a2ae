//! Matrix-vector products that tolerate infinite inputs.
//!
//! A uniform coordinate of exactly 0 or 1 becomes ∓∞ after the standard
//! normal quantile. A plain dot product then produces `0 × ∞ = NaN` or
//! `∞ - ∞ = NaN`. [`multiply_infinite`] instead resolves each output row from
//! the signed infinite contributions alone and keeps the finite sum only when
//! those contributions cancel out.

use nalgebra::DMatrix;

/// Compute `y = a · x`, propagating signed infinities in `x`.
///
/// Per output row:
/// - finite inputs are summed normally;
/// - each infinite input with a nonzero coefficient contributes
///   `coefficient × sign(input)` to a net infinite weight;
/// - a positive or negative net weight makes the row `+∞` or `-∞`;
/// - a net weight of exactly zero leaves the finite partial sum.
///
/// NaN inputs are not handled specially and propagate as usual.
pub fn multiply_infinite(a: &DMatrix<f64>, x: &[f64], y: &mut [f64]) {
    debug_assert_eq!(a.ncols(), x.len());
    debug_assert_eq!(a.nrows(), y.len());

    if x.iter().all(|v| !v.is_infinite()) {
        multiply(a, x, y);
        return;
    }

    for (i, out) in y.iter_mut().enumerate() {
        let mut finite = 0.0;
        let mut infinite = 0.0;
        for (j, &v) in x.iter().enumerate() {
            let c = a[(i, j)];
            if v.is_infinite() {
                if c != 0.0 {
                    infinite += c * v.signum();
                }
            } else {
                finite += c * v;
            }
        }
        *out = if infinite > 0.0 {
            f64::INFINITY
        } else if infinite < 0.0 {
            f64::NEG_INFINITY
        } else {
            finite
        };
    }
}

/// Plain `y = a · x` without allocation.
pub fn multiply(a: &DMatrix<f64>, x: &[f64], y: &mut [f64]) {
    debug_assert_eq!(a.ncols(), x.len());
    debug_assert_eq!(a.nrows(), y.len());

    y.fill(0.0);
    for (j, &v) in x.iter().enumerate() {
        for (i, out) in y.iter_mut().enumerate() {
            *out += a[(i, j)] * v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finite_matches_plain_product() {
        let a = DMatrix::from_row_slice(2, 3, &[1.0, 2.0, 3.0, -1.0, 0.5, 0.0]);
        let x = [1.0, -2.0, 0.5];
        let mut y = [0.0; 2];
        multiply_infinite(&a, &x, &mut y);
        assert_eq!(y, [1.0 - 4.0 + 1.5, -1.0 - 1.0]);
    }

    #[test]
    fn test_single_infinite_input_sets_sign() {
        let a = DMatrix::from_row_slice(3, 2, &[0.5, 1.0, -0.5, 1.0, 0.0, 2.0]);
        let x = [f64::INFINITY, 3.0];
        let mut y = [0.0; 3];
        multiply_infinite(&a, &x, &mut y);
        assert_eq!(y[0], f64::INFINITY);
        assert_eq!(y[1], f64::NEG_INFINITY);
        // Zero coefficient: the infinite input does not participate.
        assert_eq!(y[2], 6.0);
    }

    #[test]
    fn test_negative_infinity_input() {
        let a = DMatrix::from_row_slice(1, 2, &[-0.25, 4.0]);
        let mut y = [0.0];
        multiply_infinite(&a, &[f64::NEG_INFINITY, 1.0], &mut y);
        assert_eq!(y[0], f64::INFINITY);
    }

    #[test]
    fn test_dominant_infinite_term_wins() {
        let a = DMatrix::from_row_slice(1, 3, &[0.8, 0.3, 1.0]);
        let mut y = [0.0];
        multiply_infinite(&a, &[f64::INFINITY, f64::NEG_INFINITY, 2.0], &mut y);
        assert_eq!(y[0], f64::INFINITY);
        multiply_infinite(&a, &[f64::NEG_INFINITY, f64::INFINITY, 2.0], &mut y);
        assert_eq!(y[0], f64::NEG_INFINITY);
    }

    #[test]
    fn test_cancelling_infinities_fall_back_to_finite_sum() {
        let a = DMatrix::from_row_slice(1, 3, &[0.5, 0.5, 3.0]);
        let mut y = [0.0];
        multiply_infinite(&a, &[f64::INFINITY, f64::NEG_INFINITY, 2.0], &mut y);
        assert_eq!(y[0], 6.0);
    }

    #[test]
    fn test_plain_multiply_overwrites_output() {
        let a = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, 1.0]);
        let mut y = [42.0, 42.0];
        multiply(&a, &[3.0, 4.0], &mut y);
        assert_eq!(y, [3.0, 4.0]);
    }
}
