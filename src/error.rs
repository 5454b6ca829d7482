use thiserror::Error;

/// Errors surfaced by the classifiers and the stream harness.
///
/// All of them are raised synchronously to the immediate caller; the crate
/// never retries or recovers internally.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StreamError {
    /// Malformed input: mismatched `X`/`y` lengths, empty chunks,
    /// non-finite feature values, or labels outside the binary set {0, 1}.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The feature count differs from the one established on the first fit.
    #[error("number of features does not match: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// `predict` or `ensemble_support_matrix` called before any fit.
    #[error("this model has not been fitted yet; call `partial_fit` first")]
    NotFitted,
}
