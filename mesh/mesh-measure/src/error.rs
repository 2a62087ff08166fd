//! Error types for measurement operations.

use mesh_types::FaceIndexError;
use thiserror::Error;

/// Result type alias for measurement operations.
pub type MeasureResult<T> = Result<T, MeasureError>;

/// Errors that can occur during measurement operations.
#[derive(Debug, Error)]
pub enum MeasureError {
    /// A face references a vertex that does not exist.
    #[error("cannot measure mesh: {0}")]
    IndexOutOfBounds(#[from] FaceIndexError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MeasureError::from(FaceIndexError {
            face: 3,
            index: 9,
            vertex_count: 4,
        });
        let text = err.to_string();
        assert!(text.starts_with("cannot measure mesh"));
        assert!(text.contains('9'));
    }
}
