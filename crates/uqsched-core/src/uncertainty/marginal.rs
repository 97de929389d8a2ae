//! Per-task marginal distributions on a bounded support.
//!
//! A [`Family`] is what the configuration names (`"Uniform"`, `"Beta(2, 5)"`);
//! binding it to a task's bounds yields a [`Marginal`] with a CDF and an
//! inverse CDF. The inverse CDF hits the bounds exactly at 0 and 1 so that the
//! degenerate corners of the unit hypercube map onto the physical extremes.

use statrs::distribution::{Beta, ContinuousCDF};

use crate::error::{Error, Result};

/// Distribution family before it is bound to a support.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Family {
    Uniform,
    /// Beta distribution with shape parameters `alpha` and `beta`.
    Beta { alpha: f64, beta: f64 },
}

impl Family {
    /// Parse a family name such as `"Uniform"` or `"Beta(2, 5)"`.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        let (name, args) = match text.find('(') {
            Some(open) => {
                let close = text
                    .rfind(')')
                    .filter(|&close| close > open && close == text.len() - 1)
                    .ok_or_else(|| Error::config(format!("malformed distribution '{text}'")))?;
                (&text[..open], Some(&text[open + 1..close]))
            }
            None => (text, None),
        };

        let params: Vec<f64> = match args {
            Some(args) if !args.trim().is_empty() => args
                .split(',')
                .map(|p| {
                    p.trim().parse::<f64>().map_err(|_| {
                        Error::config(format!("bad parameter '{}' in '{text}'", p.trim()))
                    })
                })
                .collect::<Result<_>>()?,
            _ => Vec::new(),
        };

        match (name.trim().to_ascii_lowercase().as_str(), params.as_slice()) {
            ("uniform", []) => Ok(Self::Uniform),
            ("beta", &[alpha, beta]) => {
                if !(alpha > 0.0 && beta > 0.0 && alpha.is_finite() && beta.is_finite()) {
                    return Err(Error::config(format!(
                        "beta shape parameters must be positive, got '{text}'"
                    )));
                }
                Ok(Self::Beta { alpha, beta })
            }
            _ => Err(Error::config(format!("unknown distribution '{text}'"))),
        }
    }

    /// Bind the family to the support `[lower, upper]`.
    pub fn bounded(&self, lower: f64, upper: f64) -> Result<Marginal> {
        if !(lower.is_finite() && upper.is_finite() && lower < upper) {
            return Err(Error::config(format!(
                "marginal support [{lower}, {upper}] is empty or unbounded"
            )));
        }
        let shape = match *self {
            Self::Uniform => Shape::Uniform,
            Self::Beta { alpha, beta } => Shape::Beta(
                Beta::new(alpha, beta).map_err(|e| Error::config(e.to_string()))?,
            ),
        };
        Ok(Marginal {
            shape,
            lower,
            upper,
        })
    }
}

impl std::fmt::Display for Family {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uniform => write!(f, "Uniform"),
            Self::Beta { alpha, beta } => write!(f, "Beta({alpha}, {beta})"),
        }
    }
}

#[derive(Debug, Clone)]
enum Shape {
    Uniform,
    Beta(Beta),
}

/// A family bound to a finite support.
#[derive(Debug, Clone)]
pub struct Marginal {
    shape: Shape,
    lower: f64,
    upper: f64,
}

impl Marginal {
    /// Support of the distribution.
    pub fn bounds(&self) -> (f64, f64) {
        (self.lower, self.upper)
    }

    /// Cumulative probability of `x`.
    pub fn cdf(&self, x: f64) -> f64 {
        if x <= self.lower {
            return 0.0;
        }
        if x >= self.upper {
            return 1.0;
        }
        let u = (x - self.lower) / (self.upper - self.lower);
        match &self.shape {
            Shape::Uniform => u,
            Shape::Beta(beta) => beta.cdf(u),
        }
    }

    /// Quantile of probability `p`; `p` is clamped to [0, 1].
    pub fn inverse_cdf(&self, p: f64) -> f64 {
        if p <= 0.0 || p.is_nan() {
            return self.lower;
        }
        if p >= 1.0 {
            return self.upper;
        }
        let u = match &self.shape {
            Shape::Uniform => p,
            Shape::Beta(beta) => beta.inverse_cdf(p),
        };
        self.lower + u.clamp(0.0, 1.0) * (self.upper - self.lower)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -----------------------------------------------------------------------
    // Parsing
    // -----------------------------------------------------------------------

    #[test]
    fn test_parse_uniform() {
        assert_eq!(Family::parse("Uniform").unwrap(), Family::Uniform);
        assert_eq!(Family::parse(" uniform() ").unwrap(), Family::Uniform);
    }

    #[test]
    fn test_parse_beta() {
        assert_eq!(
            Family::parse("Beta(2, 5)").unwrap(),
            Family::Beta {
                alpha: 2.0,
                beta: 5.0
            }
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for text in ["Gamma(1, 2)", "Beta(2)", "Beta(2, x)", "Beta(0, 1)", "Beta(1, 2", ""] {
            assert!(Family::parse(text).is_err(), "{text} should not parse");
        }
    }

    #[test]
    fn test_display_round_trips() {
        let family = Family::Beta {
            alpha: 1.5,
            beta: 3.0,
        };
        assert_eq!(Family::parse(&family.to_string()).unwrap(), family);
    }

    // -----------------------------------------------------------------------
    // Bounds
    // -----------------------------------------------------------------------

    #[test]
    fn test_inverse_cdf_hits_bounds_exactly() {
        let families = [
            Family::Uniform,
            Family::Beta {
                alpha: 2.0,
                beta: 2.0,
            },
            Family::Beta {
                alpha: 0.5,
                beta: 3.0,
            },
        ];
        for family in families {
            for (lower, upper) in [(0.0, 1.0), (0.0, 0.004), (-3.0, 7.5)] {
                let m = family.bounded(lower, upper).unwrap();
                assert_eq!(m.inverse_cdf(0.0), lower, "{family} lower");
                assert_eq!(m.inverse_cdf(1.0), upper, "{family} upper");
            }
        }
    }

    #[test]
    fn test_inverse_cdf_clamps_out_of_range() {
        let m = Family::Uniform.bounded(2.0, 4.0).unwrap();
        assert_eq!(m.inverse_cdf(-0.5), 2.0);
        assert_eq!(m.inverse_cdf(1.5), 4.0);
        assert_eq!(m.inverse_cdf(f64::NAN), 2.0);
    }

    #[test]
    fn test_uniform_is_linear() {
        let m = Family::Uniform.bounded(10.0, 20.0).unwrap();
        assert!((m.inverse_cdf(0.25) - 12.5).abs() < 1e-12);
        assert!((m.cdf(17.5) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_beta_cdf_inverts() {
        let m = Family::Beta {
            alpha: 2.0,
            beta: 5.0,
        }
        .bounded(0.0, 3.0)
        .unwrap();
        for p in [0.05, 0.3, 0.5, 0.8, 0.95] {
            let x = m.inverse_cdf(p);
            assert!((m.cdf(x) - p).abs() < 1e-6, "p={p}");
        }
    }

    #[test]
    fn test_symmetric_beta_median_is_midpoint() {
        let m = Family::Beta {
            alpha: 3.0,
            beta: 3.0,
        }
        .bounded(0.0, 2.0)
        .unwrap();
        assert!((m.inverse_cdf(0.5) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_empty_support_rejected() {
        assert!(Family::Uniform.bounded(1.0, 1.0).is_err());
        assert!(Family::Uniform.bounded(0.0, f64::INFINITY).is_err());
    }
}
