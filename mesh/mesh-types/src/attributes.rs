//! Optional per-vertex and per-face attributes.
//!
//! Attribute presence is carried by the `Option` wrapping each field on
//! [`IndexedMesh`](crate::IndexedMesh); the types here describe what is
//! stored once present.

use std::sync::Arc;

use nalgebra::Vector3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Unit normals attached to a mesh.
///
/// The variant records which element the normals belong to, so a consumer
/// never has to guess from the array length.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", content = "values"))]
pub enum Normals {
    /// One normal per vertex, indexed like `vertices`.
    PerVertex(Vec<Vector3<f64>>),
    /// One normal per face, indexed like `faces`.
    PerFace(Vec<Vector3<f64>>),
}

impl Normals {
    /// Number of stored normals.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.values().len()
    }

    /// True when no normals are stored.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values().is_empty()
    }

    /// The stored vectors regardless of binding.
    #[must_use]
    pub fn values(&self) -> &[Vector3<f64>] {
        match self {
            Self::PerVertex(v) | Self::PerFace(v) => v,
        }
    }

    /// True for [`Normals::PerVertex`].
    #[inline]
    #[must_use]
    pub const fn is_per_vertex(&self) -> bool {
        matches!(self, Self::PerVertex(_))
    }
}

/// Opaque image payload carried alongside a mesh.
///
/// The bytes are never decoded or modified; they are shared between
/// clones of the mesh and handed to the exporter untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureRef {
    /// MIME type declared by the source container, e.g. `image/png`.
    pub mime_type: Option<String>,
    /// Encoded image bytes.
    pub bytes: Arc<[u8]>,
}

impl TextureRef {
    /// Wrap encoded image bytes.
    #[must_use]
    pub fn new(mime_type: Option<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            mime_type,
            bytes: bytes.into(),
        }
    }

    /// Size of the encoded image in bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// True for a zero-length payload.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
