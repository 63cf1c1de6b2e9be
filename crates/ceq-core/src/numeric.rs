use crate::CeqError;

/// Floating point type used throughout system
pub type Real = f64;

/// Absolute/relative tolerance pair.
#[derive(Clone, Copy, Debug)]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

pub fn nearly_equal(a: Real, b: Real, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    if diff <= tol.abs {
        return true;
    }
    diff <= tol.rel * a.abs().max(b.abs())
}

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, CeqError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(CeqError::NonFinite { what, value: v })
    }
}

/// Strictly positive and finite, e.g. pressures, temperatures, densities.
pub fn ensure_positive(v: Real, what: &'static str) -> Result<Real, CeqError> {
    let v = ensure_finite(v, what)?;
    if v > 0.0 {
        Ok(v)
    } else {
        Err(CeqError::InvalidArg { what })
    }
}

pub fn ensure_len(actual: usize, expected: usize, what: &'static str) -> Result<(), CeqError> {
    if actual == expected {
        Ok(())
    } else {
        Err(CeqError::DimensionMismatch {
            what,
            expected,
            actual,
        })
    }
}

/// Logistic step mapped onto (-1, 1): ~0 at `x <= 0`, ~1 as soon as `x` is
/// meaningfully positive. `sharpness` sets the transition width.
pub fn smooth_step(x: Real, sharpness: Real) -> Real {
    // exp overflow saturates to inf, which yields the -1 limit without a NaN
    (1.0 / (1.0 + (-sharpness * x).exp()) - 0.5) * 2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearly_equal_basic() {
        let tol = Tolerances {
            abs: 1e-12,
            rel: 1e-9,
        };
        assert!(nearly_equal(1.0, 1.0 + 1e-12, tol));
        assert!(nearly_equal(0.0, 1e-13, tol));
        assert!(!nearly_equal(1.0, 1.0 + 1e-6, tol));
    }

    #[test]
    fn ensure_finite_detects_nan() {
        let err = ensure_finite(Real::NAN, "test").unwrap_err();
        let msg = format!("{err}");
        assert!(msg.contains("Non-finite"));
    }

    #[test]
    fn ensure_positive_rejects_zero() {
        assert!(ensure_positive(0.0, "pressure").is_err());
        assert!(ensure_positive(-1.0, "pressure").is_err());
        assert_eq!(ensure_positive(2.5, "pressure").unwrap(), 2.5);
    }

    #[test]
    fn ensure_len_reports_both_sizes() {
        let err = ensure_len(3, 4, "b0").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("expected 4"));
        assert!(msg.contains("got 3"));
    }

    #[test]
    fn smooth_step_limits() {
        assert_eq!(smooth_step(0.0, 1e5), 0.0);
        assert!((smooth_step(1e-3, 1e5) - 1.0).abs() < 1e-12);
        assert!((smooth_step(-1.0, 1e5) + 1.0).abs() < 1e-12);
        // tiny positive arguments sit on the linear part of the step
        let x = 1e-12;
        assert!((smooth_step(x, 1e5) - 0.5e5 * x).abs() < 1e-15);
    }
}
