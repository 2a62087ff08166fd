//! Core mesh repair operations.
//!
//! Provides functions for fixing common mesh issues like degenerate triangles,
//! duplicate faces, floaters, and unreferenced vertices, plus [`repair_mesh`]
//! which runs them in a fixed order.

use std::fmt;

use hashbrown::HashSet;
use mesh_measure::ConnectedComponents;
use mesh_types::{IndexedMesh, MeshBounds, MeshTopology};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::components::keep_largest_component;
use crate::error::RepairResult;
use crate::params::RepairParams;
use crate::weld::{merge_coincident_vertices, weld_vertices};

/// Remove faces with a repeated vertex index or an area below
/// `area_threshold`.
///
/// A threshold of `0.0` removes only repeated-index faces. Faces that
/// reference a missing vertex are removed as well. Returns the number of
/// faces removed.
///
/// # Example
///
/// ```
/// use mesh_types::{IndexedMesh, Point3};
/// use mesh_repair::remove_degenerate_faces;
///
/// let mut mesh = IndexedMesh::from_parts(
///     vec![
///         Point3::new(0.0, 0.0, 0.0),
///         Point3::new(10.0, 0.0, 0.0),
///         Point3::new(5.0, 0.0, 0.0), // Collinear - degenerate
///     ],
///     vec![[0, 1, 2], [0, 0, 1]],
/// );
///
/// assert_eq!(remove_degenerate_faces(&mut mesh, 0.0), 1);
/// assert_eq!(remove_degenerate_faces(&mut mesh, 1e-9), 1);
/// assert!(mesh.faces.is_empty());
/// ```
pub fn remove_degenerate_faces(mesh: &mut IndexedMesh, area_threshold: f64) -> usize {
    let keep: Vec<bool> = (0..mesh.faces.len())
        .map(|i| {
            let [a, b, c] = mesh.faces[i];
            if a == b || b == c || a == c {
                return false;
            }
            mesh.triangle(i)
                .is_some_and(|tri| tri.area() >= area_threshold)
        })
        .collect();
    mesh.retain_faces(|i, _| keep[i])
}

/// Remove duplicate faces from the mesh.
///
/// Faces are considered duplicate if they have the same vertices
/// (regardless of winding order or starting vertex). The first occurrence
/// is kept.
///
/// Returns the number of duplicate faces removed.
///
/// # Example
///
/// ```
/// use mesh_types::{IndexedMesh, Point3};
/// use mesh_repair::remove_duplicate_faces;
///
/// let mut mesh = IndexedMesh::from_parts(
///     vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0), Point3::new(0.0, 1.0, 0.0)],
///     vec![[0, 1, 2], [2, 1, 0]], // Reversed duplicate
/// );
///
/// let removed = remove_duplicate_faces(&mut mesh);
/// assert_eq!(removed, 1);
/// ```
pub fn remove_duplicate_faces(mesh: &mut IndexedMesh) -> usize {
    let mut seen: HashSet<[u32; 3]> = HashSet::with_capacity(mesh.faces.len());
    mesh.retain_faces(|_, face| {
        let mut key = *face;
        key.sort_unstable();
        seen.insert(key)
    })
}

/// Remove unreferenced vertices and compact the vertex array.
///
/// UVs and per-vertex normals are compacted with their vertices. Returns
/// the number of vertices removed.
///
/// # Example
///
/// ```
/// use mesh_types::{IndexedMesh, Point3};
/// use mesh_repair::remove_unreferenced_vertices;
///
/// let mut mesh = IndexedMesh::from_parts(
///     vec![
///         Point3::new(0.0, 0.0, 0.0),
///         Point3::new(1.0, 0.0, 0.0),
///         Point3::new(0.0, 1.0, 0.0),
///         Point3::new(100.0, 100.0, 100.0), // Unreferenced
///     ],
///     vec![[0, 1, 2]],
/// );
///
/// let removed = remove_unreferenced_vertices(&mut mesh);
/// assert_eq!(removed, 1);
/// assert_eq!(mesh.vertices.len(), 3);
/// ```
pub fn remove_unreferenced_vertices(mesh: &mut IndexedMesh) -> usize {
    mesh.compact()
}

/// Run the full repair pass on a mesh.
///
/// This performs, in order:
/// 1. Remove faces with a repeated vertex index
/// 2. Merge coincident vertices, or weld within `weld_epsilon`
/// 3. Remove faces that are degenerate after merging, by index or by area
///    relative to the input's bounding-box diagonal
/// 4. Remove duplicate faces
/// 5. Keep the largest connected component
/// 6. Remove unreferenced vertices
/// 7. Recompute normals if the mesh had them and its topology changed, or
///    if `compute_normals` is set
///
/// Repairing an already repaired mesh leaves its vertex and face counts
/// unchanged.
///
/// # Errors
///
/// [`RepairError::IndexOutOfBounds`](crate::RepairError::IndexOutOfBounds)
/// if a face references a missing vertex.
///
/// # Example
///
/// ```
/// use mesh_types::unit_cube;
/// use mesh_repair::{repair_mesh, RepairParams};
///
/// let mut mesh = unit_cube();
/// mesh.faces.push([0, 0, 1]);
///
/// let (repaired, summary) = repair_mesh(mesh, &RepairParams::default()).unwrap();
/// assert_eq!(repaired.faces.len(), 12);
/// assert_eq!(summary.degenerates_removed, 1);
/// println!("{summary}");
/// ```
pub fn repair_mesh(
    mesh: IndexedMesh,
    params: &RepairParams,
) -> RepairResult<(IndexedMesh, RepairSummary)> {
    repair_mesh_with_components(mesh, params, None)
}

/// [`repair_mesh`] that can reuse a component labeling computed earlier,
/// typically by [`mesh_measure::mesh_statistics`].
///
/// The labels are only used if they still describe the mesh at the
/// floater-removal step; otherwise they are recomputed.
///
/// # Errors
///
/// As for [`repair_mesh`].
pub fn repair_mesh_with_components(
    mut mesh: IndexedMesh,
    params: &RepairParams,
    components: Option<&ConnectedComponents>,
) -> RepairResult<(IndexedMesh, RepairSummary)> {
    mesh.validate_indices()?;

    let initial_vertices = mesh.vertices.len();
    let initial_faces = mesh.faces.len();
    let diagonal = mesh.bounds_opt().map_or(0.0, |b| b.diagonal());
    let area_threshold = params.relative_area_epsilon * diagonal * diagonal;

    let mut degenerates_removed = remove_degenerate_faces(&mut mesh, 0.0);

    let vertices_merged = if params.weld_epsilon > 0.0 {
        weld_vertices(&mut mesh, params.weld_epsilon)
    } else {
        merge_coincident_vertices(&mut mesh)
    };

    degenerates_removed += remove_degenerate_faces(&mut mesh, area_threshold);

    let duplicates_removed = if params.remove_duplicate_faces {
        remove_duplicate_faces(&mut mesh)
    } else {
        0
    };

    let floaters = if params.keep_largest_component {
        keep_largest_component(&mut mesh, components)
    } else {
        crate::FloaterRemoval::default()
    };

    let unreferenced_removed = if params.remove_unreferenced {
        remove_unreferenced_vertices(&mut mesh)
    } else {
        0
    };

    let topology_changed = mesh.faces.len() != initial_faces || vertices_merged > 0;
    let normals_recomputed = params.compute_normals || (mesh.has_normals() && topology_changed);
    if normals_recomputed {
        mesh.recompute_normals();
    }

    let mut warnings = Vec::new();
    if mesh.faces.is_empty() {
        let w = RepairWarning::EmptyResult;
        warn!(initial_faces, "{w}");
        warnings.push(w);
    }

    let summary = RepairSummary {
        initial_vertices,
        initial_faces,
        final_vertices: mesh.vertex_count(),
        final_faces: mesh.face_count(),
        vertices_merged,
        degenerates_removed,
        duplicates_removed,
        components_removed: floaters.components_removed,
        floater_faces_removed: floaters.faces_removed,
        unreferenced_removed,
        normals_recomputed,
        warnings,
    };
    info!(
        vertices = summary.final_vertices,
        faces = summary.final_faces,
        merged = vertices_merged,
        degenerate = degenerates_removed,
        duplicate = duplicates_removed,
        floaters = floaters.components_removed,
        "Repair complete"
    );

    Ok((mesh, summary))
}

/// Non-fatal outcome of a repair pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RepairWarning {
    /// Repair removed every face; the mesh is empty.
    EmptyResult,
}

impl fmt::Display for RepairWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyResult => write!(f, "repair removed every face, result is empty"),
        }
    }
}

/// Result of a repair operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairSummary {
    /// Number of vertices before repair.
    pub initial_vertices: usize,
    /// Number of faces before repair.
    pub initial_faces: usize,
    /// Number of vertices after repair.
    pub final_vertices: usize,
    /// Number of faces after repair.
    pub final_faces: usize,
    /// Number of vertices merged into another.
    pub vertices_merged: usize,
    /// Number of repeated-index or zero-area faces removed.
    pub degenerates_removed: usize,
    /// Number of duplicate faces removed.
    pub duplicates_removed: usize,
    /// Number of disconnected components dropped.
    pub components_removed: usize,
    /// Number of faces dropped with those components.
    pub floater_faces_removed: usize,
    /// Number of unreferenced vertices removed.
    pub unreferenced_removed: usize,
    /// Whether normals were recomputed.
    pub normals_recomputed: bool,
    /// Non-fatal conditions met during repair.
    pub warnings: Vec<RepairWarning>,
}

impl RepairSummary {
    /// Check if any repairs were performed.
    #[must_use]
    pub const fn had_changes(&self) -> bool {
        self.vertices_merged > 0
            || self.degenerates_removed > 0
            || self.duplicates_removed > 0
            || self.floater_faces_removed > 0
            || self.unreferenced_removed > 0
    }

    /// Whether repair left no faces.
    #[must_use]
    pub fn is_empty_result(&self) -> bool {
        self.warnings.contains(&RepairWarning::EmptyResult)
    }
}

impl fmt::Display for RepairSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Repair: {} verts ({} merged, {} unreferenced), {} faces ({} degenerate, {} duplicate, {} in {} floaters)",
            self.final_vertices,
            self.vertices_merged,
            self.unreferenced_removed,
            self.final_faces,
            self.degenerates_removed,
            self.duplicates_removed,
            self.floater_faces_removed,
            self.components_removed
        )?;
        for warning in &self.warnings {
            write!(f, "\n  warning: {warning}")?;
        }
        Ok(())
    }
}
