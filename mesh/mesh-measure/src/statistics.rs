//! Whole-mesh statistics.
//!
//! Bounds, surface area and signed volume are computed with parallel
//! reductions over fixed-size chunks of the face (or vertex) list. Partial
//! sums are combined in chunk order, so the result does not depend on the
//! number of worker threads.

use std::fmt;

use mesh_types::{Aabb, IndexedMesh, Triangle};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::components::ConnectedComponents;
use crate::error::MeasureResult;
use crate::topology::EdgeTopology;

/// Faces (or vertices) per parallel work item.
const CHUNK: usize = 4096;

/// Summary of a mesh's size, extent and connectivity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsReport {
    /// Number of vertices, referenced or not.
    pub vertex_count: usize,
    /// Number of faces.
    pub face_count: usize,
    /// Axis-aligned bounds of all vertices; `None` without vertices.
    pub bounds: Option<Aabb>,
    /// Sum of triangle areas.
    pub surface_area: f64,
    /// Enclosed signed volume; `None` unless the mesh is watertight.
    pub volume: Option<f64>,
    /// Every edge is shared by exactly two faces.
    pub is_watertight: bool,
    /// Edges used by one face.
    pub boundary_edge_count: usize,
    /// Edges used by three or more faces.
    pub non_manifold_edge_count: usize,
    /// Number of edge-connected face components.
    pub component_count: usize,
}

impl fmt::Display for StatisticsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "vertices:     {}", self.vertex_count)?;
        writeln!(f, "faces:        {}", self.face_count)?;
        match &self.bounds {
            Some(b) => {
                let size = b.size();
                writeln!(
                    f,
                    "bounds:       [{:.4}, {:.4}, {:.4}] .. [{:.4}, {:.4}, {:.4}] ({:.4} x {:.4} x {:.4})",
                    b.min.x, b.min.y, b.min.z, b.max.x, b.max.y, b.max.z, size.x, size.y, size.z
                )?;
            }
            None => writeln!(f, "bounds:       (empty)")?,
        }
        writeln!(f, "surface area: {:.4}", self.surface_area)?;
        match self.volume {
            Some(v) => writeln!(f, "volume:       {v:.4}")?,
            None => writeln!(
                f,
                "volume:       undefined (not watertight: {} boundary, {} non-manifold edges)",
                self.boundary_edge_count, self.non_manifold_edge_count
            )?,
        }
        write!(f, "components:   {}", self.component_count)
    }
}

/// A [`StatisticsReport`] together with the component labeling it was
/// derived from, so later stages can reuse the labels.
#[derive(Debug, Clone)]
pub struct MeshStatistics {
    /// The report.
    pub report: StatisticsReport,
    /// Face labels by connected component.
    pub components: ConnectedComponents,
}

/// Compute statistics and component labels for a mesh.
///
/// # Errors
///
/// [`MeasureError::IndexOutOfBounds`](crate::MeasureError::IndexOutOfBounds)
/// if a face references a missing vertex.
///
/// # Example
///
/// ```
/// use mesh_measure::mesh_statistics;
/// use mesh_types::unit_cube;
///
/// let stats = mesh_statistics(&unit_cube()).unwrap();
/// assert_eq!(stats.report.face_count, 12);
/// assert!((stats.report.volume.unwrap() - 1.0).abs() < 1e-12);
/// assert_eq!(stats.components.count(), 1);
/// ```
pub fn mesh_statistics(mesh: &IndexedMesh) -> MeasureResult<MeshStatistics> {
    mesh.validate_indices()?;

    let bounds = parallel_bounds(mesh);
    let (surface_area, signed_volume) = parallel_area_volume(mesh);
    let topology = EdgeTopology::build(mesh);
    let components = ConnectedComponents::compute(mesh);
    let is_watertight = topology.is_watertight();

    let report = StatisticsReport {
        vertex_count: mesh.vertices.len(),
        face_count: mesh.faces.len(),
        bounds,
        surface_area,
        volume: is_watertight.then_some(signed_volume),
        is_watertight,
        boundary_edge_count: topology.boundary_edge_count(),
        non_manifold_edge_count: topology.non_manifold_edge_count(),
        component_count: components.count(),
    };

    debug!(
        vertices = report.vertex_count,
        faces = report.face_count,
        surface_area = report.surface_area,
        watertight = report.is_watertight,
        components = report.component_count,
        "computed mesh statistics"
    );

    Ok(MeshStatistics { report, components })
}

/// Compute only the [`StatisticsReport`].
///
/// # Errors
///
/// As for [`mesh_statistics`].
pub fn statistics_report(mesh: &IndexedMesh) -> MeasureResult<StatisticsReport> {
    mesh_statistics(mesh).map(|s| s.report)
}

fn parallel_bounds(mesh: &IndexedMesh) -> Option<Aabb> {
    let bounds = mesh
        .vertices
        .par_chunks(CHUNK)
        .map(|chunk| Aabb::from_points(chunk.iter()))
        .reduce(Aabb::empty, |a, b| a.union(&b));
    (!bounds.is_empty()).then_some(bounds)
}

/// Indices must already be validated.
fn parallel_area_volume(mesh: &IndexedMesh) -> (f64, f64) {
    let partials: Vec<(f64, f64)> = mesh
        .faces
        .par_chunks(CHUNK)
        .map(|chunk| {
            chunk.iter().fold((0.0, 0.0), |(area, volume), face| {
                let tri = Triangle::new(
                    mesh.vertices[face[0] as usize],
                    mesh.vertices[face[1] as usize],
                    mesh.vertices[face[2] as usize],
                );
                (area + tri.area(), volume + tri.signed_volume_from_origin())
            })
        })
        .collect();
    partials
        .into_iter()
        .fold((0.0, 0.0), |(a, v), (pa, pv)| (a + pa, v + pv))
}
