//! Result types for decimation operations.

// Triangle counts don't overflow in practice
#![allow(clippy::cast_precision_loss)]

use std::fmt;

use mesh_types::IndexedMesh;
use serde::{Deserialize, Serialize};

/// Recovered condition reported alongside a decimated mesh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecimateWarning {
    /// The quadric system was singular and the edge midpoint was used.
    NumericInstability {
        /// Number of candidate placements that fell back.
        occurrences: usize,
    },
    /// No valid collapse remained before the target was reached.
    Incomplete {
        /// Requested face count.
        target: usize,
        /// Face count actually reached.
        achieved: usize,
    },
    /// The cancellation flag was set; the result is partially decimated.
    Cancelled {
        /// Face count when decimation stopped.
        achieved: usize,
    },
}

impl fmt::Display for DecimateWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NumericInstability { occurrences } => write!(
                f,
                "singular quadric at {occurrences} placements, used edge midpoint"
            ),
            Self::Incomplete { target, achieved } => write!(
                f,
                "decimation incomplete: target {target} faces, reached {achieved}"
            ),
            Self::Cancelled { achieved } => {
                write!(f, "decimation cancelled at {achieved} faces")
            }
        }
    }
}

/// Result of mesh decimation.
#[derive(Debug, Clone)]
pub struct DecimationResult {
    /// The decimated mesh.
    pub mesh: IndexedMesh,

    /// Number of triangles in original mesh.
    pub original_triangles: usize,

    /// Face count decimation aimed for.
    pub target_triangles: usize,

    /// Number of triangles in decimated mesh.
    pub final_triangles: usize,

    /// Number of edge collapses performed.
    pub collapses_performed: usize,

    /// Number of edge collapses rejected (boundary, link condition, normal
    /// flip, or error limit).
    pub collapses_rejected: usize,

    /// Recovered conditions, in the order they were detected.
    pub warnings: Vec<DecimateWarning>,
}

impl DecimationResult {
    /// Result for a mesh that was returned unchanged.
    pub(crate) fn unchanged(mesh: IndexedMesh, target: usize) -> Self {
        let faces = mesh.faces.len();
        Self {
            mesh,
            original_triangles: faces,
            target_triangles: target,
            final_triangles: faces,
            collapses_performed: 0,
            collapses_rejected: 0,
            warnings: Vec::new(),
        }
    }

    /// Get the reduction ratio (final / original).
    #[must_use]
    pub fn reduction_ratio(&self) -> f64 {
        if self.original_triangles == 0 {
            1.0
        } else {
            self.final_triangles as f64 / self.original_triangles as f64
        }
    }

    /// Get the percentage of triangles removed.
    #[must_use]
    pub fn reduction_percent(&self) -> f64 {
        (1.0 - self.reduction_ratio()) * 100.0
    }

    /// Check if any decimation occurred.
    #[must_use]
    pub const fn was_decimated(&self) -> bool {
        self.collapses_performed > 0
    }

    /// Whether the target face count was reached.
    #[must_use]
    pub const fn reached_target(&self) -> bool {
        self.final_triangles <= self.target_triangles
    }
}

impl fmt::Display for DecimationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Decimation: {} → {} triangles ({:.1}% reduction, {} collapses, {} rejected)",
            self.original_triangles,
            self.final_triangles,
            self.reduction_percent(),
            self.collapses_performed,
            self.collapses_rejected
        )?;
        for warning in &self.warnings {
            write!(f, "\n  warning: {warning}")?;
        }
        Ok(())
    }
}
