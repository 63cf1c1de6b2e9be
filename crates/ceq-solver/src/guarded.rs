//! Explicit recovery results for numerically guarded evaluations.
//!
//! A guarded evaluation either produces the exact value, substitutes a
//! bounded fallback for a well-understood degeneracy, or fails. Callers
//! decide per call site which degeneracies may fall back; everything else is
//! an `Err` and propagates.

use crate::error::{SolverError, SolverResult};

/// Floor substituted for a degenerate chemical-potential logarithm.
pub const LN_FALLBACK_ARG: f64 = 1e-5;

/// Outcome of a guarded evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Guarded<T> {
    /// The value was computed as requested.
    Exact(T),
    /// The requested value was undefined; a fallback was substituted.
    Fallback(T),
}

impl<T> Guarded<T> {
    /// Extract the value regardless of how it was obtained.
    pub fn into_value(self) -> T {
        match self {
            Guarded::Exact(v) | Guarded::Fallback(v) => v,
        }
    }

    pub fn used_fallback(&self) -> bool {
        matches!(self, Guarded::Fallback(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Guarded<U> {
        match self {
            Guarded::Exact(v) => Guarded::Exact(f(v)),
            Guarded::Fallback(v) => Guarded::Fallback(f(v)),
        }
    }
}

/// Natural log, substituting `ln(1e-5)` for a non-positive or non-finite argument.
pub fn ln_or_floor(x: f64) -> Guarded<f64> {
    if x.is_finite() && x > 0.0 {
        Guarded::Exact(x.ln())
    } else {
        Guarded::Fallback(LN_FALLBACK_ARG.ln())
    }
}

/// Natural log that fails with the offending value instead of falling back.
pub fn checked_ln(what: &'static str, x: f64) -> SolverResult<f64> {
    if x.is_finite() && x > 0.0 {
        Ok(x.ln())
    } else {
        Err(SolverError::Domain {
            what,
            context: format!("ln({x:e})"),
        })
    }
}

/// Square root that fails on negative or non-finite arguments.
pub fn checked_sqrt(what: &'static str, x: f64, context: impl FnOnce() -> String) -> SolverResult<f64> {
    if x.is_finite() && x >= 0.0 {
        Ok(x.sqrt())
    } else {
        Err(SolverError::Domain {
            what,
            context: context(),
        })
    }
}

/// Quotient that fails on a zero or non-finite denominator.
pub fn checked_div(
    what: &'static str,
    num: f64,
    den: f64,
    context: impl FnOnce() -> String,
) -> SolverResult<f64> {
    let q = num / den;
    if den != 0.0 && q.is_finite() {
        Ok(q)
    } else {
        Err(SolverError::Domain {
            what,
            context: context(),
        })
    }
}
