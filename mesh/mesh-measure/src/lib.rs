//! Statistics and connectivity analysis for triangle meshes.
//!
//! # Features
//!
//! - **Statistics**: vertex and face counts, bounds, surface area, and the
//!   enclosed volume when the mesh is watertight
//! - **Edge topology**: boundary and non-manifold edge counts
//! - **Connected components**: union-find labeling of faces that share an
//!   edge, reusable by repair
//!
//! Edges are compared by vertex position, not index, so a mesh split along
//! UV seams still measures as one closed surface (see [`position_ids`]).
//!
//! # Layer 0 Crate
//!
//! This is a Layer 0 crate with no rendering or UI dependencies. It can be
//! used in CLI tools, servers, and batch jobs.
//!
//! # Example
//!
//! ```
//! use mesh_measure::mesh_statistics;
//! use mesh_types::unit_cube;
//!
//! let stats = mesh_statistics(&unit_cube()).unwrap();
//! assert!((stats.report.surface_area - 6.0).abs() < 1e-12);
//! assert!(stats.report.is_watertight);
//! ```
//!
//! # Parallelism
//!
//! Area, volume and bounds use rayon reductions over fixed-size chunks, so
//! results are identical regardless of thread count.

// Safety: Deny unwrap/expect in library code. Tests may use them (workspace warns).
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod components;
mod error;
mod positions;
mod statistics;
mod topology;

pub use components::ConnectedComponents;
pub use error::{MeasureError, MeasureResult};
pub use positions::{position_ids, position_key};
pub use statistics::{mesh_statistics, statistics_report, MeshStatistics, StatisticsReport};
pub use topology::EdgeTopology;
