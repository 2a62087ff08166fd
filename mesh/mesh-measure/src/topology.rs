//! Edge incidence analysis.

use hashbrown::HashMap;
use mesh_types::IndexedMesh;

use crate::positions::{canonical, position_ids};

/// Undirected edges of a mesh with the number of faces using each.
///
/// Endpoints are identified by position, so vertices split along an
/// attribute seam share their edges. Edges that collapse to a single
/// position are ignored.
#[derive(Debug, Clone, Default)]
pub struct EdgeTopology {
    ids: Vec<u32>,
    uses: HashMap<(u32, u32), u32>,
}

impl EdgeTopology {
    /// Count edge uses over all faces.
    #[must_use]
    pub fn build(mesh: &IndexedMesh) -> Self {
        let ids = position_ids(mesh);
        let mut uses: HashMap<(u32, u32), u32> = HashMap::with_capacity(mesh.faces.len() * 3 / 2);
        for face in &mesh.faces {
            for k in 0..3 {
                let a = canonical(&ids, face[k]);
                let b = canonical(&ids, face[(k + 1) % 3]);
                if a != b {
                    *uses.entry((a.min(b), a.max(b))).or_insert(0) += 1;
                }
            }
        }
        Self { ids, uses }
    }

    /// Number of distinct edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.uses.len()
    }

    /// Edges used by exactly one face.
    #[must_use]
    pub fn boundary_edge_count(&self) -> usize {
        self.uses.values().filter(|&&n| n == 1).count()
    }

    /// Edges used by more than two faces.
    #[must_use]
    pub fn non_manifold_edge_count(&self) -> usize {
        self.uses.values().filter(|&&n| n > 2).count()
    }

    /// Faces used by the edge between vertices `a` and `b`, in either
    /// orientation.
    #[must_use]
    pub fn edge_uses(&self, a: u32, b: u32) -> u32 {
        let (a, b) = (canonical(&self.ids, a), canonical(&self.ids, b));
        self.uses.get(&(a.min(b), a.max(b))).copied().unwrap_or(0)
    }

    /// Every edge is shared by exactly two faces, and there is at least one.
    #[must_use]
    pub fn is_watertight(&self) -> bool {
        !self.uses.is_empty() && self.uses.values().all(|&n| n == 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh_types::{seamed_unit_cube, unit_cube, Point3};

    #[test]
    fn cube_is_closed() {
        let topo = EdgeTopology::build(&unit_cube());
        assert_eq!(topo.edge_count(), 18);
        assert_eq!(topo.boundary_edge_count(), 0);
        assert_eq!(topo.non_manifold_edge_count(), 0);
        assert!(topo.is_watertight());
        assert_eq!(topo.edge_uses(2, 0), 2);
    }

    #[test]
    fn open_cube_has_boundary() {
        let mut cube = unit_cube();
        cube.faces.truncate(10);
        let topo = EdgeTopology::build(&cube);
        assert_eq!(topo.boundary_edge_count(), 4);
        assert!(!topo.is_watertight());
    }

    #[test]
    fn fin_is_non_manifold() {
        let mut cube = unit_cube();
        cube.vertices.push(Point3::new(0.5, 0.5, 2.0));
        cube.faces.push([4, 5, 8]);
        let topo = EdgeTopology::build(&cube);
        assert_eq!(topo.non_manifold_edge_count(), 1);
        assert_eq!(topo.boundary_edge_count(), 2);
    }

    #[test]
    fn uv_seams_are_not_boundaries() {
        let cube = seamed_unit_cube();
        let topo = EdgeTopology::build(&cube);
        assert_eq!(topo.edge_count(), 18);
        assert_eq!(topo.boundary_edge_count(), 0);
        assert!(topo.is_watertight());
        // The origin-to-(0,1,0) edge is split between the -Z chart (0, 3)
        // and the -X chart (16, 19).
        assert_eq!(cube.vertices[0], cube.vertices[16]);
        assert_eq!(cube.vertices[3], cube.vertices[19]);
        assert_eq!(topo.edge_uses(0, 3), 2);
        assert_eq!(topo.edge_uses(16, 19), 2);
    }

    #[test]
    fn empty_mesh_is_not_watertight() {
        assert!(!EdgeTopology::build(&IndexedMesh::new()).is_watertight());
    }
}
