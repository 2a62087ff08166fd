//! Position-canonical vertex identity.
//!
//! Loaders keep vertices split where UVs, normals, or colours differ, so
//! one corner of the surface can appear under several indices. Topology
//! and connectivity are about the surface, not its attributes; they look
//! vertices up through [`position_ids`] so that split corners count once.

use hashbrown::HashMap;
use mesh_types::{IndexedMesh, Point3};

/// Bit pattern of a position, with `-0.0` folded into `0.0`.
///
/// Two positions have the same key exactly when their coordinates compare
/// equal, except that NaN coordinates only match identical NaN bits.
#[inline]
#[must_use]
pub fn position_key(p: &Point3<f64>) -> [u64; 3] {
    // Adding zero folds -0.0 into 0.0
    [p.x + 0.0, p.y + 0.0, p.z + 0.0].map(f64::to_bits)
}

/// For every vertex, the lowest index with a bit-identical position.
///
/// A mesh without coincident vertices maps every index to itself.
///
/// # Example
///
/// ```
/// use mesh_measure::position_ids;
/// use mesh_types::{IndexedMesh, Point3};
///
/// let mesh = IndexedMesh::from_parts(
///     vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0), Point3::origin()],
///     vec![],
/// );
/// assert_eq!(position_ids(&mesh), vec![0, 1, 0]);
/// ```
#[must_use]
#[allow(clippy::cast_possible_truncation)]
// Truncation: vertex indices are u32 throughout the mesh
pub fn position_ids(mesh: &IndexedMesh) -> Vec<u32> {
    let mut first: HashMap<[u64; 3], u32> = HashMap::with_capacity(mesh.vertices.len());
    mesh.vertices
        .iter()
        .enumerate()
        .map(|(i, p)| *first.entry(position_key(p)).or_insert(i as u32))
        .collect()
}

/// Canonical id of `index`, or `index` itself when it is out of range.
#[inline]
pub(crate) fn canonical(ids: &[u32], index: u32) -> u32 {
    ids.get(index as usize).copied().unwrap_or(index)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use mesh_types::{seamed_unit_cube, unit_cube};

    #[test]
    fn welded_mesh_is_identity() {
        let ids = position_ids(&unit_cube());
        assert_eq!(ids, (0..8).collect::<Vec<u32>>());
    }

    #[test]
    fn seamed_cube_collapses_to_eight_corners() {
        let cube = seamed_unit_cube();
        let ids = position_ids(&cube);
        let mut distinct = ids.clone();
        distinct.sort_unstable();
        distinct.dedup();
        assert_eq!(distinct.len(), 8);
        for (i, &id) in ids.iter().enumerate() {
            assert!(id as usize <= i);
            assert_eq!(cube.vertices[id as usize], cube.vertices[i]);
        }
    }

    #[test]
    fn signed_zero_shares_a_key() {
        assert_eq!(
            position_key(&Point3::new(0.0, -0.0, 1.0)),
            position_key(&Point3::new(-0.0, 0.0, 1.0))
        );
    }

    #[test]
    fn out_of_range_index_passes_through() {
        assert_eq!(canonical(&[0, 0], 1), 0);
        assert_eq!(canonical(&[0, 0], 7), 7);
    }
}
