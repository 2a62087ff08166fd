//! Indexed triangle mesh.

use crate::{Aabb, MeshBounds, MeshTopology, Normals, TextureRef, Triangle};
use nalgebra::{Point3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A face references a vertex that does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("face {face} references vertex {index}, but the mesh has {vertex_count} vertices")]
pub struct FaceIndexError {
    /// Position of the offending face in `faces`.
    pub face: usize,
    /// The out-of-range index.
    pub index: u32,
    /// Vertex count at the time of the check.
    pub vertex_count: usize,
}

/// An indexed triangle mesh with optional attributes.
///
/// # Memory Layout
///
/// - `vertices`: `Vec<Point3<f64>>` - positions, in the order faces index them
/// - `faces`: `Vec<[u32; 3]>` - triangles as vertex indices
/// - `normals`: per-vertex or per-face unit vectors, if present
/// - `uvs`: per-vertex texture coordinates, if present
/// - `texture`: opaque image reference, passed through every stage
///
/// The mesh owns its arrays outright. Stages hand it on by value, so no two
/// live meshes ever share vertex or face storage.
///
/// # Winding Order
///
/// Faces use **counter-clockwise (CCW) winding** when viewed from outside.
///
/// # Example
///
/// ```
/// use mesh_types::{IndexedMesh, Point3, MeshTopology};
///
/// let mesh = IndexedMesh::from_parts(
///     vec![
///         Point3::new(0.0, 0.0, 0.0),
///         Point3::new(1.0, 0.0, 0.0),
///         Point3::new(0.0, 1.0, 0.0),
///     ],
///     vec![[0, 1, 2]],
/// );
///
/// assert_eq!(mesh.vertex_count(), 3);
/// assert_eq!(mesh.face_count(), 1);
/// assert!(!mesh.has_normals());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IndexedMesh {
    /// Vertex positions.
    pub vertices: Vec<Point3<f64>>,

    /// Triangle faces as indices into `vertices`.
    pub faces: Vec<[u32; 3]>,

    /// Optional normals, bound per vertex or per face.
    pub normals: Option<Normals>,

    /// Optional per-vertex texture coordinates.
    pub uvs: Option<Vec<[f32; 2]>>,

    /// Optional per-vertex RGBA colours.
    pub colors: Option<Vec<[u8; 4]>>,

    /// Optional base-colour image.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub texture: Option<TextureRef>,
}

impl IndexedMesh {
    /// Create a new empty mesh.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            vertices: Vec::new(),
            faces: Vec::new(),
            normals: None,
            uvs: None,
            colors: None,
            texture: None,
        }
    }

    /// Create an empty mesh with pre-allocated capacity.
    #[inline]
    #[must_use]
    pub fn with_capacity(vertex_count: usize, face_count: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertex_count),
            faces: Vec::with_capacity(face_count),
            ..Self::new()
        }
    }

    /// Create a geometry-only mesh from positions and faces.
    #[inline]
    #[must_use]
    pub const fn from_parts(vertices: Vec<Point3<f64>>, faces: Vec<[u32; 3]>) -> Self {
        Self {
            vertices,
            faces,
            normals: None,
            uvs: None,
            colors: None,
            texture: None,
        }
    }

    /// Whether normals are attached.
    #[inline]
    #[must_use]
    pub const fn has_normals(&self) -> bool {
        self.normals.is_some()
    }

    /// Whether UVs are attached.
    #[inline]
    #[must_use]
    pub const fn has_uvs(&self) -> bool {
        self.uvs.is_some()
    }

    /// Whether per-vertex colours are attached.
    #[inline]
    #[must_use]
    pub const fn has_colors(&self) -> bool {
        self.colors.is_some()
    }

    /// Check that every face index is within `[0, vertices.len())`.
    ///
    /// # Errors
    ///
    /// Returns the first offending face in face order.
    pub fn validate_indices(&self) -> Result<(), FaceIndexError> {
        let vertex_count = self.vertices.len();
        for (face, tri) in self.faces.iter().enumerate() {
            if let Some(&index) = tri.iter().find(|&&i| i as usize >= vertex_count) {
                return Err(FaceIndexError {
                    face,
                    index,
                    vertex_count,
                });
            }
        }
        Ok(())
    }

    /// Signed enclosed volume via the divergence theorem.
    ///
    /// Positive for a closed mesh with outward winding. For an open mesh
    /// the number is not a volume; check watertightness first.
    #[must_use]
    pub fn signed_volume(&self) -> f64 {
        self.triangles()
            .map(|tri| tri.signed_volume_from_origin())
            .sum()
    }

    /// Total surface area.
    #[must_use]
    pub fn surface_area(&self) -> f64 {
        self.triangles().map(|tri| tri.area()).sum()
    }

    /// Unit normal of every face, zero for faces without area.
    #[must_use]
    pub fn face_normals(&self) -> Vec<Vector3<f64>> {
        self.triangles()
            .map(|tri| tri.normal().unwrap_or_else(Vector3::zeros))
            .collect()
    }

    /// Area-weighted vertex normals.
    ///
    /// Each face adds its unnormalized normal (length twice its area) to its
    /// three corners; the sums are then normalized. Vertices touched only by
    /// zero-area faces, or by no face, get a zero vector.
    #[must_use]
    pub fn vertex_normals(&self) -> Vec<Vector3<f64>> {
        let mut sums = vec![Vector3::zeros(); self.vertices.len()];
        for (face, tri) in self.faces.iter().zip(self.triangles()) {
            let weighted = tri.normal_unnormalized();
            for &i in face {
                sums[i as usize] += weighted;
            }
        }
        sums.into_iter()
            .map(|n| n.try_normalize(f64::EPSILON).unwrap_or_else(Vector3::zeros))
            .collect()
    }

    /// Rebuild normals from the current geometry.
    ///
    /// Keeps the existing binding when normals are present; otherwise
    /// attaches per-vertex normals.
    pub fn recompute_normals(&mut self) {
        self.normals = Some(match self.normals {
            Some(Normals::PerFace(_)) => Normals::PerFace(self.face_normals()),
            _ => Normals::PerVertex(self.vertex_normals()),
        });
    }

    /// Keep only faces for which `keep(face_index, face)` returns true.
    ///
    /// Per-face normals are filtered alongside. Returns the number of faces
    /// removed. Vertices are left in place; see [`IndexedMesh::compact`].
    pub fn retain_faces(&mut self, mut keep: impl FnMut(usize, &[u32; 3]) -> bool) -> usize {
        let before = self.faces.len();
        let mask: Vec<bool> = self
            .faces
            .iter()
            .enumerate()
            .map(|(i, f)| keep(i, f))
            .collect();

        let mut it = mask.iter();
        self.faces.retain(|_| it.next().copied().unwrap_or(false));
        if let Some(Normals::PerFace(normals)) = &mut self.normals {
            let mut it = mask.iter();
            normals.retain(|_| it.next().copied().unwrap_or(false));
        }
        before - self.faces.len()
    }

    /// Drop vertices no face references, preserving the order of the rest.
    ///
    /// UVs, colours, and per-vertex normals are remapped with their
    /// vertices. Returns the number of vertices removed.
    ///
    /// # Panics
    ///
    /// Panics if a face index is out of range; call
    /// [`IndexedMesh::validate_indices`] first on untrusted input.
    #[allow(clippy::cast_possible_truncation)]
    // Truncation: the surviving count never exceeds the u32 index space faces already use
    pub fn compact(&mut self) -> usize {
        let mut used = vec![false; self.vertices.len()];
        for face in &self.faces {
            for &i in face {
                used[i as usize] = true;
            }
        }
        if used.iter().all(|&u| u) {
            return 0;
        }

        let mut remap = vec![u32::MAX; used.len()];
        let mut next = 0u32;
        for (old, &u) in used.iter().enumerate() {
            if u {
                remap[old] = next;
                next += 1;
            }
        }

        let before = self.vertices.len();
        self.vertices = keep_used(&self.vertices, &used);
        if let Some(uvs) = &mut self.uvs {
            *uvs = keep_used(uvs, &used);
        }
        if let Some(colors) = &mut self.colors {
            *colors = keep_used(colors, &used);
        }
        if let Some(Normals::PerVertex(normals)) = &mut self.normals {
            *normals = keep_used(normals, &used);
        }
        for face in &mut self.faces {
            for i in face.iter_mut() {
                *i = remap[*i as usize];
            }
        }
        before - self.vertices.len()
    }

    /// Append another mesh, offsetting its face indices.
    ///
    /// An attribute survives only if both meshes carry it with the same
    /// binding. The texture of `self` wins; `other`'s is used if `self` has
    /// none.
    ///
    /// # Note
    ///
    /// Indices are u32, so combined vertex counts above ~4 billion are not
    /// supported.
    #[allow(clippy::cast_possible_truncation)]
    // Truncation: mesh indices are u32, vertex counts > 4B are unsupported
    pub fn merge(&mut self, other: &Self) {
        let offset = self.vertices.len() as u32;
        let self_was_empty = self.vertices.is_empty() && self.faces.is_empty();

        self.normals = match (self.normals.take(), &other.normals) {
            (None, Some(n)) if self_was_empty => Some(n.clone()),
            (Some(Normals::PerVertex(mut a)), Some(Normals::PerVertex(b))) => {
                a.extend_from_slice(b);
                Some(Normals::PerVertex(a))
            }
            (Some(Normals::PerFace(mut a)), Some(Normals::PerFace(b))) => {
                a.extend_from_slice(b);
                Some(Normals::PerFace(a))
            }
            _ => None,
        };
        self.uvs = match (self.uvs.take(), &other.uvs) {
            (None, Some(b)) if self_was_empty => Some(b.clone()),
            (Some(mut a), Some(b)) => {
                a.extend_from_slice(b);
                Some(a)
            }
            _ => None,
        };
        self.colors = match (self.colors.take(), &other.colors) {
            (None, Some(b)) if self_was_empty => Some(b.clone()),
            (Some(mut a), Some(b)) => {
                a.extend_from_slice(b);
                Some(a)
            }
            _ => None,
        };
        if self.texture.is_none() {
            self.texture.clone_from(&other.texture);
        }

        self.vertices.extend_from_slice(&other.vertices);
        self.faces.extend(
            other
                .faces
                .iter()
                .map(|f| [f[0] + offset, f[1] + offset, f[2] + offset]),
        );
    }
}

fn keep_used<T: Copy>(values: &[T], used: &[bool]) -> Vec<T> {
    values
        .iter()
        .zip(used)
        .filter_map(|(v, &u)| u.then_some(*v))
        .collect()
}

impl MeshTopology for IndexedMesh {
    #[inline]
    fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    fn face_count(&self) -> usize {
        self.faces.len()
    }

    fn vertex(&self, index: usize) -> Option<&Point3<f64>> {
        self.vertices.get(index)
    }

    fn face(&self, index: usize) -> Option<[u32; 3]> {
        self.faces.get(index).copied()
    }

    fn triangle(&self, face_index: usize) -> Option<Triangle> {
        let [i0, i1, i2] = *self.faces.get(face_index)?;
        Some(Triangle::new(
            *self.vertices.get(i0 as usize)?,
            *self.vertices.get(i1 as usize)?,
            *self.vertices.get(i2 as usize)?,
        ))
    }

    fn faces(&self) -> impl Iterator<Item = [u32; 3]> {
        self.faces.iter().copied()
    }

    fn triangles(&self) -> impl Iterator<Item = Triangle> {
        self.faces.iter().map(|&[i0, i1, i2]| {
            Triangle::new(
                self.vertices[i0 as usize],
                self.vertices[i1 as usize],
                self.vertices[i2 as usize],
            )
        })
    }
}

impl MeshBounds for IndexedMesh {
    fn bounds(&self) -> Aabb {
        Aabb::from_points(self.vertices.iter())
    }
}

/// Helper function to create a unit cube mesh.
///
/// Spans (0,0,0) to (1,1,1): 8 shared vertices, 12 outward-wound faces.
///
/// # Example
///
/// ```
/// use mesh_types::{unit_cube, MeshTopology};
///
/// let cube = unit_cube();
/// assert_eq!(cube.vertex_count(), 8);
/// assert_eq!(cube.face_count(), 12);
/// ```
#[must_use]
pub fn unit_cube() -> IndexedMesh {
    let vertices = vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(1.0, 1.0, 0.0),
        Point3::new(0.0, 1.0, 0.0),
        Point3::new(0.0, 0.0, 1.0),
        Point3::new(1.0, 0.0, 1.0),
        Point3::new(1.0, 1.0, 1.0),
        Point3::new(0.0, 1.0, 1.0),
    ];

    let faces = vec![
        // -Z
        [0, 2, 1],
        [0, 3, 2],
        // +Z
        [4, 5, 6],
        [4, 6, 7],
        // -Y
        [0, 1, 5],
        [0, 5, 4],
        // +Y
        [3, 7, 6],
        [3, 6, 2],
        // -X
        [0, 4, 7],
        [0, 7, 3],
        // +X
        [1, 2, 6],
        [1, 6, 5],
    ];

    IndexedMesh::from_parts(vertices, faces)
}

/// Unit cube split along its edges into one UV chart per side.
///
/// This is how textured exporters write a cube: 24 vertices, four per
/// side, each with its own UVs, so corners coincide in position but not
/// in index. Faces are those of [`unit_cube`] in the same order.
///
/// # Example
///
/// ```
/// use mesh_types::{seamed_unit_cube, MeshTopology};
///
/// let cube = seamed_unit_cube();
/// assert_eq!(cube.vertex_count(), 24);
/// assert_eq!(cube.face_count(), 12);
/// assert!(cube.has_uvs());
/// ```
#[must_use]
#[allow(clippy::cast_possible_truncation)]
// Truncation: at most 24 vertices
pub fn seamed_unit_cube() -> IndexedMesh {
    let welded = unit_cube();
    let mut mesh = IndexedMesh::with_capacity(24, 12);
    let mut uvs = Vec::with_capacity(24);

    for (side, pair) in welded.faces.chunks(2).enumerate() {
        let mut corners: Vec<u32> = Vec::with_capacity(4);
        for face in pair {
            let mut out = [0u32; 3];
            for (slot, &v) in out.iter_mut().zip(face) {
                let k = match corners.iter().position(|&c| c == v) {
                    Some(k) => k,
                    None => {
                        corners.push(v);
                        mesh.vertices.push(welded.vertices[v as usize]);
                        uvs.push(side_uv(side, corners.len() - 1));
                        corners.len() - 1
                    }
                };
                *slot = (side * 4 + k) as u32;
            }
            mesh.faces.push(out);
        }
    }
    mesh.uvs = Some(uvs);
    mesh
}

/// Corner `k` of the chart for `side`, laid out in a 6x1 atlas.
#[allow(clippy::cast_precision_loss)]
fn side_uv(side: usize, k: usize) -> [f32; 2] {
    let u = (side as f32 + 0.1 + 0.8 * (k & 1) as f32) / 6.0;
    let v = 0.1 + 0.8 * (k >> 1) as f32;
    [u, v]
}
