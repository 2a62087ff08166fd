//! Error types for mesh decimation operations.

use mesh_types::FaceIndexError;
use thiserror::Error;

/// Errors that can occur during decimation operations.
#[derive(Debug, Error)]
pub enum DecimateError {
    /// Invalid target ratio.
    #[error("Invalid target ratio: {0} (must be in (0, 1])")]
    InvalidRatio(f64),

    /// Invalid target triangle count.
    #[error("Invalid target triangle count: {0}")]
    InvalidTargetCount(usize),

    /// A face references a vertex that does not exist.
    #[error("Cannot decimate: {0}")]
    IndexOutOfBounds(#[from] FaceIndexError),
}

/// Result type for decimation operations.
pub type DecimateResult<T> = std::result::Result<T, DecimateError>;
