//! Error types for NIPALS decomposition.

use thiserror::Error;

/// Errors that can occur while preprocessing or decomposing a matrix.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NipalsError {
    /// A vector has zero variance and cannot be scaled.
    #[error("{direction} {index} has zero variance and cannot be scaled")]
    DegenerateVariance {
        /// Orientation of the offending vector, `"row"` or `"column"`.
        direction: &'static str,
        /// Index of the offending row or column.
        index: usize,
    },

    /// Power iteration exhausted its budget before converging.
    #[error(
        "component {component} did not converge after {iterations} iterations \
         (last change {delta:.4e}, tolerance {tolerance:.4e}); \
         consider increasing max_iter or tolerance"
    )]
    NotConverged {
        /// Zero-based extraction index of the component.
        component: usize,
        /// Number of iterations performed.
        iterations: usize,
        /// Last value compared against the tolerance.
        delta: f64,
        /// Requested tolerance.
        tolerance: f64,
    },

    /// Input dimensions are invalid.
    #[error("invalid dimensions: {message}")]
    InvalidDimensions {
        /// Description of the dimension error.
        message: String,
    },

    /// The input contains NaN or an infinity.
    #[error("non-finite value {value} at ({row}, {column})")]
    NonFiniteInput { row: usize, column: usize, value: f64 },

    /// Invalid configuration parameter.
    #[error("invalid configuration for '{parameter}': {message}")]
    InvalidConfig {
        /// Name of the invalid parameter.
        parameter: String,
        /// Description of why it's invalid.
        message: String,
    },

    /// The cancellation token was triggered.
    #[error("decomposition cancelled while extracting component {component}")]
    Cancelled { component: usize },
}

impl NipalsError {
    pub(crate) fn dimensions(message: impl Into<String>) -> Self {
        NipalsError::InvalidDimensions {
            message: message.into(),
        }
    }

    pub(crate) fn config(parameter: &str, message: impl Into<String>) -> Self {
        NipalsError::InvalidConfig {
            parameter: parameter.into(),
            message: message.into(),
        }
    }
}

/// Convenience type alias for Results with NipalsError.
pub type Result<T> = std::result::Result<T, NipalsError>;
