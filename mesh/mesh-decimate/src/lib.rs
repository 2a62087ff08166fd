//! Mesh simplification using quadric error metrics.
//!
//! This crate provides mesh decimation (simplification) by iteratively collapsing edges
//! while minimizing geometric error using the Quadric Error Metrics (QEM) algorithm.
//!
//! # Features
//!
//! - **Edge collapse**: Iteratively collapse edges with lowest error
//! - **Quadric error metrics**: Minimize geometric error during simplification
//! - **Boundary preservation**: Optionally keep open boundaries fixed.
//!   Edges are compared by vertex index, so a vertex split along a UV or
//!   colour seam is a boundary too and the seam stays closed
//! - **Topology guards**: Collapses that would pinch the surface, create a
//!   zero-area face or flip a face are rejected
//! - **Target control**: Specify target by triangle count or ratio
//! - **Cancellation**: Stop a long run from another thread via [`CancelFlag`]
//!
//! # Layer 0 Crate
//!
//! This is a Layer 0 crate with no rendering or UI dependencies. It can be used in:
//! - CLI tools
//! - Servers
//! - Batch pipelines
//!
//! # Example
//!
//! ```
//! use mesh_types::unit_cube;
//! use mesh_decimate::{decimate_mesh, DecimateParams};
//!
//! // Create a mesh
//! let cube = unit_cube();
//!
//! // Decimate to 50% of original triangles
//! let result = decimate_mesh(&cube, &DecimateParams::with_target_ratio(0.5)).unwrap();
//! println!("{}", result);
//!
//! // Use aggressive settings for more reduction
//! let aggressive_result = decimate_mesh(&cube, &DecimateParams::aggressive()).unwrap();
//! println!("Aggressive: {}", aggressive_result);
//! ```
//!
//! # Algorithm
//!
//! The implementation uses the Quadric Error Metrics (QEM) algorithm:
//!
//! 1. For each vertex, compute a quadric matrix representing the sum of squared
//!    distances to the planes of adjacent faces
//! 2. For each edge, compute the optimal collapse position and error cost
//! 3. Iteratively collapse the edge with minimum cost until target is reached
//! 4. Re-cost the edges around each surviving vertex; outdated queue entries
//!    are skipped when they surface
//!
//! Ties in cost are broken by the order edges entered the queue, so the
//! output is deterministic for a given input and parameters.

// Safety: Deny unwrap/expect in library code. Tests may use them (workspace warns).
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod cancel;
mod decimate;
mod error;
mod params;
mod quadric;
mod result;

pub use cancel::CancelFlag;
pub use decimate::{decimate_mesh, decimate_mesh_cancellable};
pub use error::{DecimateError, DecimateResult};
pub use params::{DecimateParams, DecimateTarget};
pub use quadric::Quadric;
pub use result::{DecimateWarning, DecimationResult};
