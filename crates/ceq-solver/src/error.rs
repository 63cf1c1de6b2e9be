//! Error types for solver operations.

use ceq_core::error::CeqError;
use ceq_thermo::ThermoError;
use thiserror::Error;

/// Errors that can occur while configuring or running a solver.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    /// Malformed configuration or inputs (unknown mode, wrong vector length, ...).
    #[error("Invalid input: {what}")]
    InvalidInput { what: String },

    /// Property evaluation failed, e.g. temperature outside the fitted range.
    #[error("Thermo error: {0}")]
    Thermo(#[from] ThermoError),

    /// Floating-point domain violation, with the offending values.
    #[error("Domain error in {what}: {context}")]
    Domain { what: &'static str, context: String },

    #[error("Convergence failed after {iterations} iterations (residual norm {residual_norm:e})")]
    ConvergenceFailed {
        iterations: usize,
        residual_norm: f64,
    },

    /// Singular Jacobian or failed factorization.
    #[error("Numeric error: {what}")]
    Numeric { what: String },
}

pub type SolverResult<T> = Result<T, SolverError>;

impl SolverError {
    pub(crate) fn invalid(what: impl Into<String>) -> Self {
        SolverError::InvalidInput { what: what.into() }
    }

    /// Whether an outer loop may retry the call from a perturbed state.
    ///
    /// Evaluation and domain failures depend on the iterate; configuration
    /// errors do not.
    pub fn is_retryable(&self) -> bool {
        match self {
            SolverError::InvalidInput { .. } => false,
            SolverError::Thermo(ThermoError::OutOfRange { .. })
            | SolverError::Thermo(ThermoError::NonPhysical { .. }) => true,
            SolverError::Thermo(_) => false,
            SolverError::Domain { .. }
            | SolverError::ConvergenceFailed { .. }
            | SolverError::Numeric { .. } => true,
        }
    }
}

impl From<SolverError> for CeqError {
    fn from(e: SolverError) -> Self {
        match e {
            SolverError::InvalidInput { .. } => CeqError::Upstream {
                context: "solver input",
                message: e.to_string(),
            },
            SolverError::Thermo(inner) => inner.into(),
            other => CeqError::Upstream {
                context: "solver",
                message: other.to_string(),
            },
        }
    }
}
