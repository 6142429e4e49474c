//! Error type shared by every estimator in the crate.
//!
//! The variants follow the four failure kinds an estimator can report:
//! a malformed argument, a call made while `estimate()` is running, an
//! incomplete configuration, and a failed (robust or linear) estimation.

/// Errors raised by polynomial estimators and their configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// A supplied value violates an invariant (degree, lengths, ranges...).
    ///
    /// Raised before any state is modified.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The estimator is running `estimate()` and cannot be modified.
    #[error("Estimator is locked while an estimation is in progress")]
    Locked,

    /// `estimate()` was called on a consistent but incomplete configuration.
    #[error("Estimator is not ready: {0}")]
    NotReady(String),

    /// The robust search could not produce a model.
    #[error("Robust estimation failed: {0}")]
    RobustEstimation(String),

    /// The least squares system is rank deficient and cannot be solved.
    #[error(
        "Linear system is numerically unsolvable; evaluations may be degenerate. [rows: {rows}, unknowns: {unknowns}]"
    )]
    Singular {
        /// Number of linear constraints.
        rows: usize,
        /// Number of polynomial coefficients.
        unknowns: usize,
    },
}

impl Error {
    /// Shorthand for building an [`Error::InvalidArgument`].
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Returns true if a supplied argument was rejected.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }

    /// Returns true if the estimator was locked.
    pub fn is_locked(&self) -> bool {
        matches!(self, Self::Locked)
    }

    /// Returns true if the estimator was not ready.
    pub fn is_not_ready(&self) -> bool {
        matches!(self, Self::NotReady(_))
    }

    /// Returns true if the estimation itself failed, robustly or numerically.
    pub fn is_estimation_failure(&self) -> bool {
        matches!(self, Self::RobustEstimation(_) | Self::Singular { .. })
    }
}

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predicates_classify_variants() {
        let err = Error::invalid("degree must be at least 1");
        assert!(err.is_invalid_argument());
        assert!(!err.is_locked());
        assert!(err.to_string().contains("degree must be at least 1"));

        assert!(Error::Locked.is_locked());
        assert!(Error::NotReady("no evaluations".into()).is_not_ready());

        let singular = Error::Singular { rows: 2, unknowns: 2 };
        assert!(singular.is_estimation_failure());
        assert!(singular.to_string().contains("rows: 2"));
        assert!(Error::RobustEstimation("no consensus".into()).is_estimation_failure());
    }
}
