//! Connected-component labeling over shared edges.
//!
//! Two faces are connected when they share an edge, compared by the
//! positions of its two endpoints regardless of order. Faces on either side
//! of a UV seam are therefore connected. Faces that merely touch at a vertex
//! stay in separate components.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use hashbrown::HashMap;
use mesh_types::IndexedMesh;

use crate::positions::{canonical, position_ids};

/// Face membership of every connected component of a mesh.
///
/// Labels are dense (`0..count`) and assigned in order of each component's
/// first face, so face 0 always belongs to component 0.
///
/// # Example
///
/// ```
/// use mesh_measure::ConnectedComponents;
/// use mesh_types::unit_cube;
///
/// let cc = ConnectedComponents::compute(&unit_cube());
/// assert_eq!(cc.count(), 1);
/// assert_eq!(cc.largest(), Some(0));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectedComponents {
    labels: Vec<u32>,
    face_counts: Vec<usize>,
    min_vertex: Vec<u32>,
    fingerprint: Fingerprint,
}

/// Identifies the face list the labels were computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fingerprint {
    vertex_count: usize,
    face_count: usize,
    faces_hash: u64,
}

impl Fingerprint {
    fn of(mesh: &IndexedMesh) -> Self {
        let mut hasher = DefaultHasher::new();
        mesh.faces.hash(&mut hasher);
        Self {
            vertex_count: mesh.vertices.len(),
            face_count: mesh.faces.len(),
            faces_hash: hasher.finish(),
        }
    }
}

impl ConnectedComponents {
    /// Label the faces of `mesh`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    // Truncation: face counts are bounded by u32 vertex indexing
    pub fn compute(mesh: &IndexedMesh) -> Self {
        let face_count = mesh.faces.len();
        let ids = position_ids(mesh);
        let mut uf = UnionFind::new(face_count);
        let mut first_face: HashMap<(u32, u32), usize> = HashMap::with_capacity(face_count * 2);

        for (f, face) in mesh.faces.iter().enumerate() {
            for k in 0..3 {
                let a = canonical(&ids, face[k]);
                let b = canonical(&ids, face[(k + 1) % 3]);
                if a == b {
                    continue;
                }
                let key = (a.min(b), a.max(b));
                match first_face.get(&key) {
                    Some(&other) => uf.union(f, other),
                    None => {
                        first_face.insert(key, f);
                    }
                }
            }
        }

        let mut root_label: HashMap<usize, u32> = HashMap::new();
        let mut labels = Vec::with_capacity(face_count);
        let mut face_counts = Vec::new();
        let mut min_vertex = Vec::new();

        for (f, face) in mesh.faces.iter().enumerate() {
            let root = uf.find(f);
            let label = *root_label.entry(root).or_insert_with(|| {
                face_counts.push(0);
                min_vertex.push(u32::MAX);
                (face_counts.len() - 1) as u32
            });
            let slot = label as usize;
            face_counts[slot] += 1;
            let lowest = face[0].min(face[1]).min(face[2]);
            min_vertex[slot] = min_vertex[slot].min(lowest);
            labels.push(label);
        }

        Self {
            labels,
            face_counts,
            min_vertex,
            fingerprint: Fingerprint::of(mesh),
        }
    }

    /// Number of components.
    #[must_use]
    pub fn count(&self) -> usize {
        self.face_counts.len()
    }

    /// Component label of each face, indexed by face.
    #[must_use]
    pub fn face_labels(&self) -> &[u32] {
        &self.labels
    }

    /// Number of faces in each component, indexed by label.
    #[must_use]
    pub fn face_counts(&self) -> &[usize] {
        &self.face_counts
    }

    /// Lowest vertex index referenced by each component, indexed by label.
    #[must_use]
    pub fn min_vertex_indices(&self) -> &[u32] {
        &self.min_vertex
    }

    /// Label of the component with the most faces.
    ///
    /// Ties go to the component whose lowest vertex index is smaller.
    /// `None` for a mesh without faces.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    // Truncation: labels are created as u32
    pub fn largest(&self) -> Option<u32> {
        (0..self.count())
            .min_by(|&a, &b| {
                self.face_counts[b]
                    .cmp(&self.face_counts[a])
                    .then(self.min_vertex[a].cmp(&self.min_vertex[b]))
            })
            .map(|label| label as u32)
    }

    /// Whether these labels were computed from exactly this mesh's faces.
    ///
    /// Used to reuse a labeling across stages; any change to the face list
    /// or vertex count invalidates it.
    #[must_use]
    pub fn is_current_for(&self, mesh: &IndexedMesh) -> bool {
        self.fingerprint.face_count == mesh.faces.len()
            && self.fingerprint.vertex_count == mesh.vertices.len()
            && self.fingerprint == Fingerprint::of(mesh)
    }
}

// =============================================================================
// Union-find
// =============================================================================

/// Disjoint-set forest with path compression and union by rank.
struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut cur = x;
        while self.parent[cur] != root {
            let next = self.parent[cur];
            self.parent[cur] = root;
            cur = next;
        }
        root
    }

    fn union(&mut self, x: usize, y: usize) {
        let root_x = self.find(x);
        let root_y = self.find(y);
        if root_x == root_y {
            return;
        }
        match self.rank[root_x].cmp(&self.rank[root_y]) {
            std::cmp::Ordering::Less => self.parent[root_x] = root_y,
            std::cmp::Ordering::Greater => self.parent[root_y] = root_x,
            std::cmp::Ordering::Equal => {
                self.parent[root_y] = root_x;
                self.rank[root_x] = self.rank[root_x].saturating_add(1);
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use mesh_types::{seamed_unit_cube, unit_cube, Point3};

    /// Tetrahedron offset far from the unit cube, with its own vertices.
    fn cube_and_tetra() -> IndexedMesh {
        let mut mesh = unit_cube();
        let tetra = IndexedMesh::from_parts(
            vec![
                Point3::new(5.0, 0.0, 0.0),
                Point3::new(6.0, 0.0, 0.0),
                Point3::new(5.0, 1.0, 0.0),
                Point3::new(5.0, 0.0, 1.0),
            ],
            vec![[0, 2, 1], [0, 1, 3], [1, 2, 3], [0, 3, 2]],
        );
        mesh.merge(&tetra);
        mesh
    }

    #[test]
    fn cube_is_one_component() {
        let cc = ConnectedComponents::compute(&unit_cube());
        assert_eq!(cc.count(), 1);
        assert_eq!(cc.face_counts(), &[12]);
        assert!(cc.face_labels().iter().all(|&l| l == 0));
    }

    #[test]
    fn floater_gets_its_own_label() {
        let mesh = cube_and_tetra();
        let cc = ConnectedComponents::compute(&mesh);
        assert_eq!(cc.count(), 2);
        assert_eq!(cc.face_counts(), &[12, 4]);
        assert_eq!(cc.min_vertex_indices(), &[0, 8]);
        assert_eq!(cc.largest(), Some(0));
        assert_eq!(&cc.face_labels()[12..], &[1, 1, 1, 1]);
    }

    #[test]
    fn uv_charts_join_across_seams() {
        let cc = ConnectedComponents::compute(&seamed_unit_cube());
        assert_eq!(cc.count(), 1);
        assert_eq!(cc.face_counts(), &[12]);
        assert_eq!(cc.min_vertex_indices(), &[0]);
    }

    #[test]
    fn vertex_contact_does_not_connect() {
        // Two triangles sharing only vertex 0.
        let mesh = IndexedMesh::from_parts(
            vec![
                Point3::origin(),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
                Point3::new(-1.0, 0.0, 0.0),
                Point3::new(0.0, -1.0, 0.0),
            ],
            vec![[0, 1, 2], [0, 3, 4]],
        );
        assert_eq!(ConnectedComponents::compute(&mesh).count(), 2);
    }

    #[test]
    fn tie_prefers_lower_vertex_index() {
        // Two disjoint single triangles; the second references lower indices.
        let mesh = IndexedMesh::from_parts(
            vec![
                Point3::origin(),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
                Point3::new(5.0, 0.0, 0.0),
                Point3::new(6.0, 0.0, 0.0),
                Point3::new(5.0, 1.0, 0.0),
            ],
            vec![[3, 4, 5], [0, 1, 2]],
        );
        let cc = ConnectedComponents::compute(&mesh);
        assert_eq!(cc.count(), 2);
        assert_eq!(cc.largest(), Some(1));
    }

    #[test]
    fn empty_mesh_has_no_components() {
        let cc = ConnectedComponents::compute(&IndexedMesh::new());
        assert_eq!(cc.count(), 0);
        assert_eq!(cc.largest(), None);
    }

    #[test]
    fn staleness_tracks_face_edits() {
        let mut mesh = cube_and_tetra();
        let cc = ConnectedComponents::compute(&mesh);
        assert!(cc.is_current_for(&mesh));

        mesh.faces.swap(0, 1);
        assert!(!cc.is_current_for(&mesh));

        mesh.faces.swap(0, 1);
        assert!(cc.is_current_for(&mesh));
        mesh.faces.pop();
        assert!(!cc.is_current_for(&mesh));
    }
}
