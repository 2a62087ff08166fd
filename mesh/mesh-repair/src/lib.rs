//! Mesh repair operations for fixing common mesh issues.
//!
//! This crate provides tools for:
//! - Coincident vertex merging and epsilon welding
//! - Degenerate triangle removal (repeated indices, near-zero area)
//! - Duplicate face removal
//! - Floater removal (keep the largest connected component)
//! - Unreferenced vertex removal
//! - Normal recomputation after topology changes
//!
//! [`repair_mesh`] runs all of them in a fixed order and reports what it
//! did in a [`RepairSummary`].
//!
//! # Layer 0
//!
//! This is a Layer 0 crate with no rendering or UI dependencies.
//!
//! # Example
//!
//! ```
//! use mesh_types::{unit_cube, IndexedMesh, Point3};
//! use mesh_repair::{repair_mesh, RepairParams};
//!
//! // A cube with a stray triangle floating next to it
//! let mut mesh = unit_cube();
//! mesh.merge(&IndexedMesh::from_parts(
//!     vec![Point3::new(3.0, 0.0, 0.0), Point3::new(4.0, 0.0, 0.0), Point3::new(3.0, 1.0, 0.0)],
//!     vec![[0, 1, 2]],
//! ));
//!
//! // Repair the mesh
//! let (repaired, summary) = repair_mesh(mesh, &RepairParams::default()).unwrap();
//! assert_eq!(repaired.faces.len(), 12);
//! println!("Floaters removed: {}", summary.components_removed);
//! ```

// Safety: Deny unwrap/expect in library code. Tests may use them (workspace warns).
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod components;
mod error;
mod params;
mod repair;
mod weld;

pub use components::{keep_largest_component, FloaterRemoval};
pub use error::{RepairError, RepairResult};
pub use params::RepairParams;
pub use repair::{
    remove_degenerate_faces, remove_duplicate_faces, remove_unreferenced_vertices, repair_mesh,
    repair_mesh_with_components, RepairSummary, RepairWarning,
};
pub use weld::{merge_coincident_vertices, weld_vertices};
