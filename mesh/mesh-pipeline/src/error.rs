//! Error types for pipeline runs.

use std::path::PathBuf;

use mesh_decimate::DecimateError;
use mesh_io::{IoError, IoErrorKind, MeshFormat};
use mesh_measure::MeasureError;
use mesh_repair::RepairError;
use mesh_types::FaceIndexError;
use thiserror::Error;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Process exit code for a successful run.
pub const EXIT_SUCCESS: i32 = 0;
/// Process exit code for invalid or unreadable input.
pub const EXIT_INVALID_INPUT: i32 = 1;
/// Process exit code for an unsupported or unrecognized format.
pub const EXIT_UNSUPPORTED_FORMAT: i32 = 2;
/// Process exit code for a failed write.
pub const EXIT_WRITE_FAILURE: i32 = 3;

/// Errors that abort a pipeline run.
///
/// Recoverable conditions never appear here; they are attached to the
/// [`PipelineReport`](crate::PipelineReport) as
/// [`PipelineWarning`](crate::PipelineWarning)s.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The input could not be loaded.
    #[error("failed to load {}: {source}", path.display())]
    Load {
        /// Input path.
        path: PathBuf,
        /// Loader failure.
        #[source]
        source: IoError,
    },

    /// The input has no vertices or no faces.
    #[error("degenerate input: {vertices} vertices, {faces} faces")]
    DegenerateInput {
        /// Vertex count after loading.
        vertices: usize,
        /// Face count after loading.
        faces: usize,
    },

    /// A face references a vertex that does not exist.
    #[error("invalid mesh: {0}")]
    InvalidMesh(#[from] FaceIndexError),

    /// The decimation target is out of range.
    #[error("invalid decimation target: {0}")]
    InvalidTarget(#[source] DecimateError),

    /// An output could not be produced.
    #[error("failed to export {format} to {}: {source}", path.display())]
    Export {
        /// Destination path.
        path: PathBuf,
        /// Requested format.
        format: MeshFormat,
        /// Exporter failure.
        #[source]
        source: IoError,
    },

    /// A configuration file could not be read or parsed.
    #[error("invalid configuration {}: {message}", path.display())]
    Config {
        /// Configuration file.
        path: PathBuf,
        /// What went wrong.
        message: String,
    },

    /// The configuration is internally inconsistent.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The batch worker pool could not be started.
    #[error("failed to start worker pool: {0}")]
    WorkerPool(String),
}

impl PipelineError {
    /// Creates an invalid configuration error.
    #[must_use]
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig(reason.into())
    }

    /// Process exit code for this failure.
    ///
    /// | Code | Meaning |
    /// |------|---------|
    /// | 1 | invalid or unreadable input, bad target or configuration |
    /// | 2 | unsupported or unrecognized format, on load or export |
    /// | 3 | an output could not be written |
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Load { source, .. } => match source.kind() {
                IoErrorKind::UnsupportedFeature | IoErrorKind::UnknownFormat => {
                    EXIT_UNSUPPORTED_FORMAT
                }
                IoErrorKind::Format | IoErrorKind::Io => EXIT_INVALID_INPUT,
            },
            Self::Export { source, .. } => match source.kind() {
                IoErrorKind::UnsupportedFeature | IoErrorKind::UnknownFormat => {
                    EXIT_UNSUPPORTED_FORMAT
                }
                IoErrorKind::Io => EXIT_WRITE_FAILURE,
                IoErrorKind::Format => EXIT_INVALID_INPUT,
            },
            Self::DegenerateInput { .. }
            | Self::InvalidMesh(_)
            | Self::InvalidTarget(_)
            | Self::Config { .. }
            | Self::InvalidConfig(_)
            | Self::WorkerPool(_) => EXIT_INVALID_INPUT,
        }
    }
}

impl From<MeasureError> for PipelineError {
    fn from(err: MeasureError) -> Self {
        match err {
            MeasureError::IndexOutOfBounds(e) => Self::InvalidMesh(e),
        }
    }
}

impl From<DecimateError> for PipelineError {
    fn from(err: DecimateError) -> Self {
        match err {
            DecimateError::IndexOutOfBounds(e) => Self::InvalidMesh(e),
            other => Self::InvalidTarget(other),
        }
    }
}

impl From<RepairError> for PipelineError {
    fn from(err: RepairError) -> Self {
        match err {
            RepairError::IndexOutOfBounds(e) => Self::InvalidMesh(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load_error(source: IoError) -> PipelineError {
        PipelineError::Load {
            path: PathBuf::from("in.glb"),
            source,
        }
    }

    fn export_error(source: IoError) -> PipelineError {
        PipelineError::Export {
            path: PathBuf::from("out.stl"),
            format: MeshFormat::Stl,
            source,
        }
    }

    #[test]
    fn test_load_exit_codes() {
        let missing = load_error(IoError::FileNotFound {
            path: PathBuf::from("in.glb"),
        });
        assert_eq!(missing.exit_code(), EXIT_INVALID_INPUT);

        let malformed = load_error(IoError::invalid_content("bad magic"));
        assert_eq!(malformed.exit_code(), EXIT_INVALID_INPUT);

        let unknown = load_error(IoError::UnknownFormat {
            extension: "obj".to_string(),
        });
        assert_eq!(unknown.exit_code(), EXIT_UNSUPPORTED_FORMAT);
    }

    #[test]
    fn test_export_exit_codes() {
        let unsupported = export_error(IoError::unsupported("object colour", MeshFormat::Stl));
        assert_eq!(unsupported.exit_code(), EXIT_UNSUPPORTED_FORMAT);

        let write = export_error(IoError::Write {
            path: PathBuf::from("out.stl"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        });
        assert_eq!(write.exit_code(), EXIT_WRITE_FAILURE);
    }

    #[test]
    fn test_input_exit_codes() {
        let degenerate = PipelineError::DegenerateInput {
            vertices: 0,
            faces: 0,
        };
        assert_eq!(degenerate.exit_code(), EXIT_INVALID_INPUT);

        let target: PipelineError = DecimateError::InvalidRatio(1.5).into();
        assert!(matches!(target, PipelineError::InvalidTarget(_)));
        assert_eq!(target.exit_code(), EXIT_INVALID_INPUT);
    }

    #[test]
    fn test_error_display() {
        let err = PipelineError::DegenerateInput {
            vertices: 3,
            faces: 0,
        };
        assert_eq!(err.to_string(), "degenerate input: 3 vertices, 0 faces");

        let err = export_error(IoError::unsupported("texture embedding", MeshFormat::Stl));
        assert!(err.to_string().contains("out.stl"));
    }
}
