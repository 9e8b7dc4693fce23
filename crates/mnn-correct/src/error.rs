use thiserror::Error;

/// Result alias used by every fallible operation in this crate.
pub type Result<T> = std::result::Result<T, CorrectionError>;

/// Failures raised before or during a correction call.
///
/// Shape problems are detected eagerly, before any computation starts, so a
/// caller never observes partial output.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CorrectionError {
    /// Two inputs disagree on a shared dimension.
    #[error("dimension mismatch for {what}: expected {expected}, got {got}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    /// A sample or anchor index points outside its matrix.
    #[error("{what} index {index} is out of bounds for length {len}")]
    IndexOutOfBounds {
        what: &'static str,
        index: usize,
        len: usize,
    },

    /// A scalar option violates its precondition (e.g. non-positive sigma).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Every kernel weight reaching this sample underflowed to zero.
    #[error("total kernel weight for sample {sample} is zero; increase sigma")]
    DegenerateWeights { sample: usize },
}
