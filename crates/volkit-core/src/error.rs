//! Error types for volume processing.

use thiserror::Error;

/// Errors raised by volkit operations.
#[derive(Error, Debug)]
pub enum VolumeError {
    /// Two inputs that must cover the same grid do not.
    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// A parameter is outside its valid domain.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// An operation that only understands one dimensionality received another.
    #[error("Unsupported dimensions: expected a {expected}D image, got {actual}D")]
    UnsupportedDimension { expected: usize, actual: usize },

    /// The input holds no voxels (or no voxels of interest).
    #[error("Empty image: {0}")]
    EmptyImage(String),

    /// Tensor data could not be moved to the host as f32.
    #[error("Data conversion error: {0}")]
    DataConversion(String),
}

/// Result type for volume operations.
pub type Result<T> = std::result::Result<T, VolumeError>;

impl VolumeError {
    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    pub fn empty_image(msg: impl Into<String>) -> Self {
        Self::EmptyImage(msg.into())
    }

    pub fn data_conversion(msg: impl Into<String>) -> Self {
        Self::DataConversion(msg.into())
    }

    /// Shape mismatch between two grids.
    pub fn shape_mismatch(expected: &[usize], actual: &[usize]) -> Self {
        Self::ShapeMismatch {
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = VolumeError::invalid_parameter("gamma must be non-negative");
        assert_eq!(err.to_string(), "Invalid parameter: gamma must be non-negative");
    }

    #[test]
    fn test_unsupported_dimension_message() {
        let err = VolumeError::UnsupportedDimension { expected: 2, actual: 3 };
        assert_eq!(
            err.to_string(),
            "Unsupported dimensions: expected a 2D image, got 3D"
        );
    }

    #[test]
    fn test_shape_mismatch() {
        let err = VolumeError::shape_mismatch(&[10, 10, 10], &[5, 5, 5]);
        let msg = err.to_string();
        assert!(msg.contains("expected [10, 10, 10]"));
        assert!(msg.contains("got [5, 5, 5]"));
    }
}
