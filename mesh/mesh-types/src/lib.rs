//! Core mesh types for the post-processing engine.
//!
//! - [`IndexedMesh`] - positions plus index triples, with optional normals,
//!   UVs, per-vertex colours, and a pass-through texture reference
//! - [`Normals`] / [`TextureRef`] - the optional attribute payloads
//! - [`Triangle`] - a face with resolved positions
//! - [`Aabb`] - axis-aligned bounding box
//!
//! # Layer 0 Crate
//!
//! This crate depends only on `nalgebra` (and optionally `serde`). Every
//! other crate in the workspace builds on it: the loaders produce an
//! [`IndexedMesh`], each processing stage consumes one and hands on a new
//! one, and the exporters read it.
//!
//! # Units
//!
//! Coordinates are unit-agnostic `f64`. Loaders widen `f32` input and the
//! STL/3MF writers narrow back.
//!
//! # Winding
//!
//! Face winding is **counter-clockwise (CCW) when viewed from outside**, so
//! normals point outward by the right-hand rule and a closed mesh has
//! positive signed volume.
//!
//! # Example
//!
//! ```
//! use mesh_types::{unit_cube, MeshBounds, MeshTopology};
//!
//! let cube = unit_cube();
//! assert_eq!(cube.face_count(), 12);
//! assert!((cube.signed_volume() - 1.0).abs() < 1e-12);
//! assert!((cube.bounds().diagonal() - 3.0_f64.sqrt()).abs() < 1e-12);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

mod attributes;
mod bounds;
mod mesh;
mod traits;
mod triangle;

pub use attributes::{Normals, TextureRef};
pub use bounds::Aabb;
pub use mesh::{seamed_unit_cube, unit_cube, FaceIndexError, IndexedMesh};
pub use traits::{MeshBounds, MeshTopology};
pub use triangle::Triangle;

// Re-export nalgebra types for convenience
pub use nalgebra::{Point3, Vector3};
