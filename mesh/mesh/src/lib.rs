//! Mesh post-processing toolkit for 3D printing.
//!
//! This umbrella crate re-exports the mesh-* crates, providing a unified API
//! for turning generated meshes into printable files. All crates are Layer 0
//! (no rendering or UI dependencies) and can be used in CLI tools, servers,
//! or batch jobs.
//!
//! # Quick Start
//!
//! ```no_run
//! use mesh::prelude::*;
//!
//! // Load a mesh
//! let mesh = load_mesh("duck_3d.glb").unwrap();
//!
//! // Halve the face count
//! let decimated = decimate_mesh(&mesh, &DecimateParams::with_target_ratio(0.5)).unwrap();
//!
//! // Drop floaters and degenerate faces
//! let (repaired, summary) = repair_mesh(decimated.mesh, &RepairParams::default()).unwrap();
//! println!("{summary}");
//!
//! // Save the result
//! save_mesh(&repaired, "duck_3d_simplified.stl", MeshFormat::Stl, &ExportOptions::default()).unwrap();
//! ```
//!
//! Or let a [`pipeline::Pipeline`] sequence the stages and time them:
//!
//! ```no_run
//! use mesh::prelude::*;
//!
//! let config = PipelineConfig::simplified_for_printing();
//! let pipeline = Pipeline::new(config).unwrap();
//! let report = pipeline.run(&pipeline.job_for("duck_3d.glb")).unwrap();
//! println!("{report}");
//! ```
//!
//! # Module Organization
//!
//! ## Foundation
//! - [`types`] - Core data structures: `IndexedMesh`, `Triangle`, `Aabb`
//! - [`io`] - File I/O for GLB, STL and 3MF
//!
//! ## Analysis
//! - [`measure`] - Bounds, area, volume, watertightness, components
//!
//! ## Processing
//! - [`decimate`] - Mesh simplification (QEM-based)
//! - [`repair`] - Floater, degenerate and duplicate removal, vertex welding
//!
//! ## Orchestration
//! - [`pipeline`] - Staged runs with timings, reports and parallel batches

// Safety: Deny unwrap/expect in library code. Tests may use them (workspace warns).
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

// =============================================================================
// Re-exports
// =============================================================================

/// Core data structures: `IndexedMesh`, `Triangle`, `Aabb`.
pub use mesh_types as types;

/// File I/O for GLB, STL and 3MF.
pub use mesh_io as io;

/// Bounds, surface area, volume, watertightness and connected components.
pub use mesh_measure as measure;

/// Mesh simplification (QEM-based decimation).
pub use mesh_decimate as decimate;

/// Floater, degenerate and duplicate removal.
pub use mesh_repair as repair;

/// Staged runs, reports and batches.
pub use mesh_pipeline as pipeline;

// =============================================================================
// Prelude
// =============================================================================

/// Common imports for mesh processing.
///
/// This module re-exports the most commonly used types and traits.
///
/// # Usage
///
/// ```
/// use mesh::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use mesh_types::{Aabb, IndexedMesh, MeshBounds, MeshTopology, Point3, Triangle, Vector3};

    // I/O
    pub use mesh_io::{ExportOptions, MeshFormat, load_mesh, save_mesh};

    // Statistics
    pub use mesh_measure::{StatisticsReport, mesh_statistics};

    // Decimation
    pub use mesh_decimate::{DecimateParams, DecimateTarget, decimate_mesh};

    // Repair
    pub use mesh_repair::{RepairParams, RepairSummary, repair_mesh};

    // Pipeline (main use case)
    pub use mesh_pipeline::{Pipeline, PipelineConfig, PipelineJob, PipelineReport};
}

// =============================================================================
// Tests
// =============================================================================
