//! Error types shared by the transformer, regressor and pipeline.

use thiserror::Error;

/// Result type alias for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;

/// Errors raised while building or evaluating a pre-fitted model.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    #[error("Invalid parameter: {name}, {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("Non-finite value: {0}")]
    NonFinite(String),
}

impl ModelError {
    pub(crate) fn shape(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::ShapeMismatch { expected: expected.into(), actual: actual.into() }
    }

    pub(crate) fn param(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter { name, reason: reason.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ModelError::shape("4 input features", "3");
        assert_eq!(err.to_string(), "Invalid shape: expected 4 input features, got 3");

        let err = ModelError::param("degree", "must be at least 1");
        assert_eq!(err.to_string(), "Invalid parameter: degree, must be at least 1");
    }
}
