//! Traits for mesh types.

use crate::{Aabb, Triangle};
use nalgebra::Point3;

/// Read-only access to mesh topology.
///
/// Algorithms that only need counts, faces, and resolved triangles are
/// written against this trait rather than a concrete mesh type.
pub trait MeshTopology {
    /// Get the number of vertices.
    fn vertex_count(&self) -> usize;

    /// Get the number of faces (triangles).
    fn face_count(&self) -> usize;

    /// True when the mesh has no vertices or no faces.
    fn is_empty(&self) -> bool {
        self.vertex_count() == 0 || self.face_count() == 0
    }

    /// Vertex position by index, or `None` if out of bounds.
    fn vertex(&self, index: usize) -> Option<&Point3<f64>>;

    /// Face by index as a vertex index triple.
    fn face(&self, index: usize) -> Option<[u32; 3]>;

    /// Triangle with resolved positions.
    ///
    /// Returns `None` if the face index, or any vertex it references, is
    /// out of bounds.
    fn triangle(&self, face_index: usize) -> Option<Triangle>;

    /// Iterate over all faces as vertex index triples.
    fn faces(&self) -> impl Iterator<Item = [u32; 3]>;

    /// Iterate over all triangles with resolved positions.
    ///
    /// Assumes valid indices; validate untrusted meshes first.
    fn triangles(&self) -> impl Iterator<Item = Triangle>;
}

/// Trait for types that can compute a bounding box.
pub trait MeshBounds {
    /// Compute the axis-aligned bounding box.
    ///
    /// Returns an empty AABB if the mesh has no vertices.
    fn bounds(&self) -> Aabb;

    /// Compute the bounding box, returning `None` if empty.
    fn bounds_opt(&self) -> Option<Aabb> {
        let b = self.bounds();
        if b.is_empty() { None } else { Some(b) }
    }
}
