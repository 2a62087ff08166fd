//! Repair configuration.

use serde::{Deserialize, Serialize};

/// Configuration parameters for mesh repair operations.
///
/// Distances are in mesh units. The area threshold is relative, so the same
/// defaults suit millimetre prints and metre-scale scenes alike.
///
/// # Example
///
/// ```
/// use mesh_repair::RepairParams;
///
/// // Use defaults: exact vertex merge, floaters removed
/// let params = RepairParams::default();
///
/// // Or customize for your use case
/// let params = RepairParams {
///     weld_epsilon: 0.01,  // Weld near-coincident vertices in noisy scans
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepairParams {
    /// Distance below which vertices are welded.
    ///
    /// `0.0` merges only vertices with identical positions (and identical
    /// UVs when present).
    /// Default: `0.0`
    pub weld_epsilon: f64,

    /// Minimum face area as a fraction of the squared bounding-box diagonal.
    ///
    /// Faces smaller than `relative_area_epsilon * diagonal²` are removed.
    /// Default: `1e-12`
    pub relative_area_epsilon: f64,

    /// Remove faces that repeat another face's vertices in any order.
    ///
    /// Default: `true`
    pub remove_duplicate_faces: bool,

    /// Keep only the largest edge-connected component.
    ///
    /// Default: `true`
    pub keep_largest_component: bool,

    /// Whether to remove unreferenced vertices after repair.
    ///
    /// Default: `true`
    pub remove_unreferenced: bool,

    /// Compute per-vertex normals even if the mesh carried none.
    ///
    /// Normals that were present are always recomputed after topology
    /// changes.
    /// Default: `false`
    pub compute_normals: bool,
}

impl Default for RepairParams {
    fn default() -> Self {
        Self {
            weld_epsilon: 0.0,
            relative_area_epsilon: 1e-12,
            remove_duplicate_faces: true,
            keep_largest_component: true,
            remove_unreferenced: true,
            compute_normals: false,
        }
    }
}

impl RepairParams {
    /// Create params for noisy scan or generated data.
    ///
    /// Welds near-coincident vertices and treats slivers more aggressively.
    #[must_use]
    pub fn for_scans() -> Self {
        Self {
            weld_epsilon: 1e-4,
            relative_area_epsilon: 1e-10,
            ..Default::default()
        }
    }

    /// Create params for 3D printing preparation.
    ///
    /// Like the default, but always emits vertex normals.
    #[must_use]
    pub fn for_printing() -> Self {
        Self {
            compute_normals: true,
            ..Default::default()
        }
    }

    /// Only clean up degenerate and duplicate geometry; keep every
    /// component.
    #[must_use]
    pub fn cleanup_only() -> Self {
        Self {
            keep_largest_component: false,
            ..Default::default()
        }
    }

    /// Set the vertex welding distance threshold.
    ///
    /// # Example
    ///
    /// ```
    /// use mesh_repair::RepairParams;
    ///
    /// let params = RepairParams::default()
    ///     .with_weld_epsilon(0.01);
    /// ```
    #[must_use]
    pub const fn with_weld_epsilon(mut self, epsilon: f64) -> Self {
        self.weld_epsilon = epsilon;
        self
    }

    /// Set the relative area threshold for degenerate faces.
    #[must_use]
    pub const fn with_relative_area_epsilon(mut self, epsilon: f64) -> Self {
        self.relative_area_epsilon = epsilon;
        self
    }

    /// Set whether duplicate faces are removed.
    #[must_use]
    pub const fn with_remove_duplicate_faces(mut self, remove: bool) -> Self {
        self.remove_duplicate_faces = remove;
        self
    }

    /// Set whether only the largest component is kept.
    #[must_use]
    pub const fn with_keep_largest_component(mut self, keep: bool) -> Self {
        self.keep_largest_component = keep;
        self
    }

    /// Set whether to remove unreferenced vertices after repair.
    #[must_use]
    pub const fn with_remove_unreferenced(mut self, remove: bool) -> Self {
        self.remove_unreferenced = remove;
        self
    }

    /// Set whether normals are computed for meshes without them.
    #[must_use]
    pub const fn with_compute_normals(mut self, compute: bool) -> Self {
        self.compute_normals = compute;
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn repair_params_default() {
        let params = RepairParams::default();
        assert_eq!(params.weld_epsilon, 0.0);
        assert_relative_eq!(params.relative_area_epsilon, 1e-12);
        assert!(params.keep_largest_component);
        assert!(params.remove_unreferenced);
        assert!(!params.compute_normals);
    }

    #[test]
    fn repair_params_presets() {
        assert!(RepairParams::for_scans().weld_epsilon > 0.0);
        assert!(RepairParams::for_printing().compute_normals);
        assert!(!RepairParams::cleanup_only().keep_largest_component);
    }

    #[test]
    fn repair_params_builder_methods() {
        let params = RepairParams::default()
            .with_weld_epsilon(0.05)
            .with_relative_area_epsilon(1e-8)
            .with_remove_duplicate_faces(false)
            .with_keep_largest_component(false)
            .with_remove_unreferenced(false)
            .with_compute_normals(true);

        assert_relative_eq!(params.weld_epsilon, 0.05);
        assert_relative_eq!(params.relative_area_epsilon, 1e-8);
        assert!(!params.remove_duplicate_faces);
        assert!(!params.keep_largest_component);
        assert!(!params.remove_unreferenced);
        assert!(params.compute_normals);
    }

    #[test]
    fn repair_params_partial_json() {
        let params: RepairParams = serde_json::from_str(r#"{"weld_epsilon":0.5}"#).unwrap();
        assert_eq!(params.weld_epsilon, 0.5);
        assert!(params.keep_largest_component);
    }
}
