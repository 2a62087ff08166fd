//! Error types for mesh I/O operations.

use std::path::PathBuf;

use mesh_types::FaceIndexError;
use thiserror::Error;

use crate::MeshFormat;

/// Result type for mesh I/O operations.
pub type IoResult<T> = Result<T, IoError>;

/// Coarse classification of an [`IoError`].
///
/// Callers that map failures onto exit codes or retry policies match on
/// this rather than on individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IoErrorKind {
    /// Malformed, truncated, or internally inconsistent container.
    Format,
    /// The format cannot express something that was requested or encountered.
    UnsupportedFeature,
    /// The file extension does not name a supported format.
    UnknownFormat,
    /// The operating system refused a read or write.
    Io,
}

/// Errors that can occur during mesh I/O operations.
#[derive(Debug, Error)]
pub enum IoError {
    /// File not found.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was not found.
        path: PathBuf,
    },

    /// Unknown file format (unrecognized extension).
    #[error("unknown file format: .{extension}")]
    UnknownFormat {
        /// The unrecognized extension.
        extension: String,
    },

    /// Invalid file content (parse error).
    #[error("invalid file content: {message}")]
    InvalidContent {
        /// Description of what was invalid.
        message: String,
    },

    /// The data ended before a structure it declared was complete.
    #[error("unexpected end of data at byte {position}")]
    UnexpectedEof {
        /// Offset at which more bytes were required.
        position: u64,
    },

    /// A fixed-size header is shorter than the format requires.
    #[error("invalid header: expected {expected} bytes, got {got}")]
    InvalidHeader {
        /// Required header size.
        expected: usize,
        /// Bytes available.
        got: usize,
    },

    /// Fewer STL records are present than the header declares.
    #[error("invalid face count: header declares {expected}, data holds {got}")]
    InvalidFaceCount {
        /// Declared number of faces.
        expected: u32,
        /// Complete records actually present.
        got: u32,
    },

    /// A face index points past the end of the vertex array.
    #[error(transparent)]
    IndexOutOfBounds(#[from] FaceIndexError),

    /// An accessor or buffer view addresses bytes outside its backing store.
    #[error("{what} {index} reads outside its buffer")]
    BufferOverrun {
        /// Kind of the offending object (`accessor`, `bufferView`, ...).
        what: &'static str,
        /// Its index in the document.
        index: usize,
    },

    /// The format cannot represent a requested or encountered feature.
    #[error("{format} does not support {feature}")]
    UnsupportedFeature {
        /// Human-readable feature name.
        feature: String,
        /// Format that lacks it.
        format: MeshFormat,
    },

    /// Writing the destination failed.
    #[error("failed to write {path}: {source}")]
    Write {
        /// Destination path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// I/O error from the standard library.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl IoError {
    /// Create an `InvalidContent` error with the given message.
    #[must_use]
    pub fn invalid_content(message: impl Into<String>) -> Self {
        Self::InvalidContent {
            message: message.into(),
        }
    }

    /// Create an `UnsupportedFeature` error.
    #[must_use]
    pub fn unsupported(feature: impl Into<String>, format: MeshFormat) -> Self {
        Self::UnsupportedFeature {
            feature: feature.into(),
            format,
        }
    }

    /// Classify this error.
    #[must_use]
    pub const fn kind(&self) -> IoErrorKind {
        match self {
            Self::InvalidContent { .. }
            | Self::UnexpectedEof { .. }
            | Self::InvalidHeader { .. }
            | Self::InvalidFaceCount { .. }
            | Self::IndexOutOfBounds(_)
            | Self::BufferOverrun { .. } => IoErrorKind::Format,
            Self::UnsupportedFeature { .. } => IoErrorKind::UnsupportedFeature,
            Self::UnknownFormat { .. } => IoErrorKind::UnknownFormat,
            Self::FileNotFound { .. } | Self::Write { .. } | Self::Io(_) => IoErrorKind::Io,
        }
    }

    /// True for write-side failures, as opposed to reading the input.
    #[must_use]
    pub const fn is_write_failure(&self) -> bool {
        matches!(self, Self::Write { .. })
    }
}
