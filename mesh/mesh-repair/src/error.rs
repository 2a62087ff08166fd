//! Error types for mesh repair operations.

use mesh_types::FaceIndexError;
use thiserror::Error;

/// Result type for repair operations.
pub type RepairResult<T> = Result<T, RepairError>;

/// Errors that can occur during mesh repair.
///
/// Everything repair can fix is reported in the
/// [`RepairSummary`](crate::RepairSummary) instead; only input the repairer
/// cannot index safely is rejected.
#[derive(Debug, Error)]
pub enum RepairError {
    /// Mesh has invalid indices.
    #[error("cannot repair mesh: {0}")]
    IndexOutOfBounds(#[from] FaceIndexError),
}
