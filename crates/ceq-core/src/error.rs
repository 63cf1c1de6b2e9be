use thiserror::Error;

pub type CeqResult<T> = Result<T, CeqError>;

#[derive(Error, Debug)]
pub enum CeqError {
    #[error("Non-finite numeric value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Dimension mismatch for {what}: expected {expected}, got {actual}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Invariant violated: {what}")]
    Invariant { what: &'static str },

    /// Error raised by a downstream crate, flattened to its message.
    #[error("{context}: {message}")]
    Upstream {
        context: &'static str,
        message: String,
    },
}
