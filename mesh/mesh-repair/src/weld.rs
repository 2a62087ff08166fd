//! Vertex merging.
//!
//! Both functions only remap face indices. The replaced vertices stay in
//! the vertex array until [`remove_unreferenced_vertices`] compacts it, and
//! faces that collapse to a repeated index are left for
//! [`remove_degenerate_faces`].
//!
//! [`remove_unreferenced_vertices`]: crate::remove_unreferenced_vertices
//! [`remove_degenerate_faces`]: crate::remove_degenerate_faces

use hashbrown::HashMap;
use mesh_measure::position_key;
use mesh_types::{IndexedMesh, Point3};

/// Merge vertices whose positions are bit-identical.
///
/// When the mesh has UVs or vertex colours, vertices are merged only if
/// those are identical too, so texture and colour seams survive. The first
/// occurrence of each position is kept. Returns the number of vertices merged.
///
/// # Example
///
/// ```
/// use mesh_types::{IndexedMesh, Point3};
/// use mesh_repair::merge_coincident_vertices;
///
/// // Two triangles as an STL file stores them: no shared vertices.
/// let mut mesh = IndexedMesh::from_parts(
///     vec![
///         Point3::new(0.0, 0.0, 0.0),
///         Point3::new(1.0, 0.0, 0.0),
///         Point3::new(0.0, 1.0, 0.0),
///         Point3::new(1.0, 0.0, 0.0),
///         Point3::new(1.0, 1.0, 0.0),
///         Point3::new(0.0, 1.0, 0.0),
///     ],
///     vec![[0, 1, 2], [3, 4, 5]],
/// );
///
/// assert_eq!(merge_coincident_vertices(&mut mesh), 2);
/// assert_eq!(mesh.faces[1], [1, 4, 2]);
/// ```
#[allow(clippy::cast_possible_truncation)]
// Truncation: vertex indices are u32 throughout the mesh
pub fn merge_coincident_vertices(mesh: &mut IndexedMesh) -> usize {
    type Key = ([u64; 3], Option<[u32; 2]>, Option<[u8; 4]>);

    let uvs = mesh.uvs.as_deref();
    let colors = mesh.colors.as_deref();
    let mut first: HashMap<Key, u32> = HashMap::with_capacity(mesh.vertices.len());
    let mut remap = Vec::with_capacity(mesh.vertices.len());
    let mut merged = 0;

    for (i, p) in mesh.vertices.iter().enumerate() {
        let uv = uvs
            .and_then(|uvs| uvs.get(i))
            .map(|uv| [uv[0].to_bits(), uv[1].to_bits()]);
        let color = colors.and_then(|colors| colors.get(i)).copied();
        let target = *first
            .entry((position_key(p), uv, color))
            .or_insert(i as u32);
        if target != i as u32 {
            merged += 1;
        }
        remap.push(target);
    }

    if merged > 0 {
        remap_faces(mesh, &remap);
    }
    merged
}

/// Weld vertices that are within `epsilon` distance of each other.
///
/// Uses spatial hashing for efficiency. With UVs or colours present, only
/// vertices with identical attributes are welded. An `epsilon` that is not a positive
/// finite number falls back to [`merge_coincident_vertices`]. Returns the
/// number of vertices merged.
///
/// # Example
///
/// ```
/// use mesh_types::{IndexedMesh, Point3};
/// use mesh_repair::weld_vertices;
///
/// let mut mesh = IndexedMesh::from_parts(
///     vec![
///         Point3::new(0.0, 0.0, 0.0),
///         Point3::new(1.0, 0.0, 0.0),
///         Point3::new(0.0, 1.0, 0.0),
///         Point3::new(1.0001, 0.0, 0.0), // Near-duplicate of vertex 1
///     ],
///     vec![[0, 1, 2], [0, 3, 2]],
/// );
///
/// let merged = weld_vertices(&mut mesh, 0.001);
/// assert_eq!(merged, 1);
/// ```
#[allow(clippy::cast_possible_truncation)]
// Truncation: vertex indices are u32 throughout the mesh
pub fn weld_vertices(mesh: &mut IndexedMesh, epsilon: f64) -> usize {
    if !(epsilon.is_finite() && epsilon > 0.0) {
        return merge_coincident_vertices(mesh);
    }
    let vertex_count = mesh.vertices.len();
    if vertex_count == 0 {
        return 0;
    }

    let cell_size = epsilon * 2.0;
    let vertices = &mesh.vertices;
    let uvs = mesh.uvs.as_deref();
    let colors = mesh.colors.as_deref();
    let same_attributes = |a: usize, b: usize| {
        uvs.map_or(true, |uvs| uvs.get(a) == uvs.get(b))
            && colors.map_or(true, |colors| colors.get(a) == colors.get(b))
    };

    // Build spatial hash
    let mut spatial_hash: HashMap<(i64, i64, i64), Vec<u32>> = HashMap::new();
    for (idx, position) in vertices.iter().enumerate() {
        spatial_hash
            .entry(pos_to_cell(position, cell_size))
            .or_default()
            .push(idx as u32);
    }

    // Find canonical representatives
    let mut remap: Vec<u32> = (0..vertex_count as u32).collect();
    let mut merged = 0;

    for (idx, position) in vertices.iter().enumerate() {
        if remap[idx] != idx as u32 {
            continue;
        }
        let cell = pos_to_cell(position, cell_size);

        // Check 3x3x3 neighborhood
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let Some(candidates) = spatial_hash.get(&(cell.0 + dx, cell.1 + dy, cell.2 + dz))
                    else {
                        continue;
                    };
                    for &other in candidates {
                        let o = other as usize;
                        if o <= idx || remap[o] != other || !same_attributes(o, idx) {
                            continue;
                        }
                        if (position - &vertices[o]).norm() < epsilon {
                            remap[o] = idx as u32;
                            merged += 1;
                        }
                    }
                }
            }
        }
    }

    if merged > 0 {
        remap_faces(mesh, &remap);
    }
    merged
}

/// Point every face index at its representative. Indices outside `remap`
/// are left alone.
fn remap_faces(mesh: &mut IndexedMesh, remap: &[u32]) {
    for face in &mut mesh.faces {
        for i in face.iter_mut() {
            if let Some(&target) = remap.get(*i as usize) {
                *i = target;
            }
        }
    }
}

/// Convert position to spatial hash cell.
#[allow(clippy::cast_possible_truncation)]
// Truncation: cells beyond i64 range only occur for non-finite coordinates
fn pos_to_cell(pos: &Point3<f64>, cell_size: f64) -> (i64, i64, i64) {
    (
        (pos.x / cell_size).floor() as i64,
        (pos.y / cell_size).floor() as i64,
        (pos.z / cell_size).floor() as i64,
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;

    fn split_quad() -> IndexedMesh {
        IndexedMesh::from_parts(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2], [3, 4, 5]],
        )
    }

    #[test]
    fn merge_exact_duplicates() {
        let mut mesh = split_quad();
        assert_eq!(merge_coincident_vertices(&mut mesh), 2);
        assert_eq!(mesh.faces, vec![[0, 1, 2], [1, 4, 2]]);
        // Vertices are left for compaction.
        assert_eq!(mesh.vertices.len(), 6);
    }

    #[test]
    fn merge_treats_signed_zero_as_equal() {
        let mut mesh = IndexedMesh::from_parts(
            vec![Point3::new(0.0, 0.0, 0.0), Point3::new(-0.0, 0.0, -0.0)],
            vec![[0, 1, 1]],
        );
        assert_eq!(merge_coincident_vertices(&mut mesh), 1);
        assert_eq!(mesh.faces[0], [0, 0, 0]);
    }

    #[test]
    fn merge_respects_uv_seams() {
        let mut mesh = split_quad();
        mesh.uvs = Some(vec![
            [0.0, 0.0],
            [1.0, 0.0],
            [0.0, 1.0],
            [0.5, 0.0], // Same position as vertex 1, different UV
            [1.0, 1.0],
            [0.0, 1.0],
        ]);
        assert_eq!(merge_coincident_vertices(&mut mesh), 1);
        assert_eq!(mesh.faces[1], [3, 4, 2]);
    }

    #[test]
    fn merge_respects_color_seams() {
        let mut mesh = split_quad();
        let red = [255, 0, 0, 255];
        let blue = [0, 0, 255, 255];
        mesh.colors = Some(vec![red, red, red, blue, blue, red]);
        // Vertex 3 differs in colour from vertex 1; vertex 5 matches vertex 2.
        assert_eq!(merge_coincident_vertices(&mut mesh), 1);
        assert_eq!(mesh.faces[1], [3, 4, 2]);
    }

    #[test]
    fn merge_no_duplicates_is_noop() {
        let mut mesh = mesh_types::unit_cube();
        let before = mesh.clone();
        assert_eq!(merge_coincident_vertices(&mut mesh), 0);
        assert_eq!(mesh, before);
    }

    #[test]
    fn weld_near_vertices() {
        let mut mesh = IndexedMesh::from_parts(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(10.0, 0.0, 0.0),
                Point3::new(0.0, 10.0, 0.0),
                Point3::new(10.001, 0.0, 0.0), // Near vertex 1
            ],
            vec![[0, 1, 2], [0, 3, 2]],
        );

        let merged = weld_vertices(&mut mesh, 0.01);
        assert_eq!(merged, 1);

        // Face should now reference vertex 1 instead of 3
        assert_eq!(mesh.faces[1][1], 1);
    }

    #[test]
    fn weld_across_cell_boundary() {
        // 0.1999 and 0.2001 fall in different cells of size 0.2.
        let mut mesh = IndexedMesh::from_parts(
            vec![Point3::new(0.1999, 0.0, 0.0), Point3::new(0.2001, 0.0, 0.0)],
            vec![[0, 1, 1]],
        );
        assert_eq!(weld_vertices(&mut mesh, 0.1), 1);
    }

    #[test]
    fn weld_zero_epsilon_is_exact_merge() {
        let mut mesh = split_quad();
        assert_eq!(weld_vertices(&mut mesh, 0.0), 2);
        let mut mesh = split_quad();
        assert_eq!(weld_vertices(&mut mesh, f64::NAN), 2);
    }

    #[test]
    fn weld_empty_mesh() {
        let mut mesh = IndexedMesh::new();
        let merged = weld_vertices(&mut mesh, 0.01);
        assert_eq!(merged, 0);
    }
}
