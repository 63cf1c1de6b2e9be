//! Thermodynamic data errors.

use ceq_core::CeqError;
use thiserror::Error;

/// Result type for thermodynamic data operations.
pub type ThermoResult<T> = Result<T, ThermoError>;

/// Errors that can occur while evaluating species or mixture data.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ThermoError {
    /// Temperature (or another argument) outside the fitted range. Never clamped.
    #[error("{what} = {value} outside valid range [{min}, {max}]")]
    OutOfRange {
        what: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// Non-physical values (negative amounts, zero total moles, ...).
    #[error("Non-physical value for {what}")]
    NonPhysical { what: &'static str },

    /// Invalid argument.
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    /// Species name that is not in the catalog.
    #[error("Unknown species '{name}'")]
    UnknownSpecies { name: String },

    /// Vector or matrix shape does not match the species/element set.
    #[error("Dimension mismatch for {what}: expected {expected}, got {actual}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
}

impl From<ThermoError> for CeqError {
    fn from(err: ThermoError) -> Self {
        match err {
            ThermoError::NonPhysical { what } => CeqError::Invariant { what },
            ThermoError::InvalidArg { what } => CeqError::InvalidArg { what },
            ThermoError::DimensionMismatch {
                what,
                expected,
                actual,
            } => CeqError::DimensionMismatch {
                what,
                expected,
                actual,
            },
            other => CeqError::Upstream {
                context: "thermo",
                message: other.to_string(),
            },
        }
    }
}
