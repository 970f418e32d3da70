//! Error type shared by every estimator and basis operation in the crate.

use crate::basis::DomainRange;
use thiserror::Error;

/// Broad category of an [`FdaError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Raised eagerly at construction or fit time.
    Configuration,
    /// Raised when the data handed to a fitted estimator does not match it.
    Precondition,
    /// A decomposition failed; switching solver strategy may help.
    Numerical,
    /// An evaluation point cannot be handled by any basis.
    Domain,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FdaError {
    #[error("Invalid value for `{parameter}`: {reason}")]
    InvalidParameter {
        parameter: &'static str,
        reason: String,
    },

    #[error("Requested {requested} components, but only {available} {limit} are available.")]
    TooManyComponents {
        requested: usize,
        available: usize,
        limit: &'static str,
    },

    #[error("Domain ranges are not equal: {left} vs {right}.")]
    DomainMismatch { left: DomainRange, right: DomainRange },

    #[error(
        "The number of basis functions ({n_basis}) exceeds the number of points to be smoothed ({n_points})."
    )]
    Underdetermined { n_basis: usize, n_points: usize },

    #[error("Invalid sample points: {0}")]
    InvalidSamplePoints(String),

    #[error("The estimator must be fitted before calling `{0}`.")]
    NotFitted(&'static str),

    #[error(
        "Sample points differ from those recorded at fit time ({expected} points expected, {found} given)."
    )]
    SamplePointsMismatch { expected: usize, found: usize },

    #[error("Dimension mismatch in {context}: expected {expected}, found {found}.")]
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Basis mismatch: {0}")]
    BasisMismatch(String),

    #[error("Evaluation point {0} is not finite.")]
    NonFinitePoint(f64),

    #[error("Cholesky factorization of the {matrix} ({dim}x{dim}) failed: matrix is not positive definite.")]
    CholeskyFailed { matrix: &'static str, dim: usize },

    #[error("The {matrix} ({dim}x{dim}) is singular to working precision.")]
    SingularMatrix { matrix: &'static str, dim: usize },
}

impl FdaError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FdaError::InvalidParameter { .. }
            | FdaError::TooManyComponents { .. }
            | FdaError::DomainMismatch { .. }
            | FdaError::Underdetermined { .. }
            | FdaError::InvalidSamplePoints(_) => ErrorKind::Configuration,
            FdaError::NotFitted(_)
            | FdaError::SamplePointsMismatch { .. }
            | FdaError::DimensionMismatch { .. }
            | FdaError::BasisMismatch(_) => ErrorKind::Precondition,
            FdaError::CholeskyFailed { .. } | FdaError::SingularMatrix { .. } => {
                ErrorKind::Numerical
            }
            FdaError::NonFinitePoint(_) => ErrorKind::Domain,
        }
    }

    pub(crate) fn invalid(parameter: &'static str, reason: impl Into<String>) -> Self {
        FdaError::InvalidParameter {
            parameter,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FdaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            FdaError::Underdetermined {
                n_basis: 5,
                n_points: 3
            }
            .kind(),
            ErrorKind::Configuration
        );
        assert_eq!(FdaError::NotFitted("transform").kind(), ErrorKind::Precondition);
        assert_eq!(
            FdaError::CholeskyFailed {
                matrix: "normal equations matrix",
                dim: 3
            }
            .kind(),
            ErrorKind::Numerical
        );
        assert_eq!(FdaError::NonFinitePoint(f64::NAN).kind(), ErrorKind::Domain);
    }

    #[test]
    fn test_error_messages_name_the_matrix() {
        let err = FdaError::CholeskyFailed {
            matrix: "weight matrix",
            dim: 4,
        };
        assert_eq!(
            err.to_string(),
            "Cholesky factorization of the weight matrix (4x4) failed: matrix is not positive definite."
        );
    }
}
