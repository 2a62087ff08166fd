//! Core mesh decimation algorithm.
//!
//! Implements edge collapse with quadric error metrics (QEM).
//!
//! Candidates live in a binary heap keyed by `(cost, edge id)`. Each one
//! records the version of both endpoints when it was queued; a collapse
//! bumps the version of the surviving vertex, so outdated candidates are
//! recognized and dropped when popped rather than searched for and removed.

// Mesh indices are u32 by construction
#![allow(clippy::cast_possible_truncation)]

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use hashbrown::{HashMap, HashSet};
use mesh_types::{IndexedMesh, Normals, Point3, Triangle};
use smallvec::SmallVec;
use tracing::{debug, info, warn};

use crate::cancel::CancelFlag;
use crate::error::DecimateResult;
use crate::params::DecimateParams;
use crate::quadric::Quadric;
use crate::result::{DecimateWarning, DecimationResult};

type FaceList = SmallVec<[u32; 8]>;
type VertexList = SmallVec<[u32; 16]>;

/// An edge collapse candidate in the priority queue.
#[derive(Debug, Clone)]
struct Candidate {
    cost: f64,
    /// Queue order among equal costs; lower ids pop first.
    id: u64,
    /// Endpoints, `a < b`.
    a: u32,
    b: u32,
    /// Endpoint versions at the time of queuing.
    stamp: [u32; 2],
    target: Point3<f64>,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap behavior (smaller cost = higher priority)
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.id.cmp(&self.id))
    }
}

#[derive(Default)]
struct CollapseQueue {
    heap: BinaryHeap<Candidate>,
    next_id: u64,
    singular_fallbacks: usize,
}

/// Decimate a mesh using edge collapse with quadric error metrics.
///
/// Returns the mesh unchanged when the target is at or above the current
/// face count.
///
/// # Errors
///
/// - [`DecimateError::InvalidRatio`](crate::DecimateError::InvalidRatio) or
///   [`DecimateError::InvalidTargetCount`](crate::DecimateError::InvalidTargetCount)
///   for an invalid target.
/// - [`DecimateError::IndexOutOfBounds`](crate::DecimateError::IndexOutOfBounds)
///   if a face references a missing vertex.
///
/// # Example
///
/// ```
/// use mesh_types::unit_cube;
/// use mesh_decimate::{decimate_mesh, DecimateParams};
///
/// let cube = unit_cube();
/// let result = decimate_mesh(&cube, &DecimateParams::with_target_ratio(0.5)).unwrap();
/// assert!(result.final_triangles <= cube.faces.len());
/// println!("{result}");
/// ```
pub fn decimate_mesh(
    mesh: &IndexedMesh,
    params: &DecimateParams,
) -> DecimateResult<DecimationResult> {
    decimate_mesh_cancellable(mesh, params, &CancelFlag::new())
}

/// [`decimate_mesh`] that stops early once `cancel` is set.
///
/// The flag is polled every `params.cancel_check_interval` candidates.
/// A cancelled run returns the partially decimated mesh, which is as valid
/// as a completed one, with a [`DecimateWarning::Cancelled`].
///
/// # Errors
///
/// As for [`decimate_mesh`].
pub fn decimate_mesh_cancellable(
    mesh: &IndexedMesh,
    params: &DecimateParams,
    cancel: &CancelFlag,
) -> DecimateResult<DecimationResult> {
    decimate_until(mesh, params, &mut || cancel.is_cancelled())
}

/// The decimation loop. `should_stop` is called every
/// `params.cancel_check_interval` candidates, starting before the first.
fn decimate_until(
    mesh: &IndexedMesh,
    params: &DecimateParams,
    should_stop: &mut dyn FnMut() -> bool,
) -> DecimateResult<DecimationResult> {
    let original_triangles = mesh.faces.len();
    let target = params.target.resolve(original_triangles)?;
    mesh.validate_indices()?;

    // Don't decimate if already at or below target
    if original_triangles <= target {
        debug!(
            faces = original_triangles,
            target, "Mesh already at or below target"
        );
        return Ok(DecimationResult::unchanged(mesh.clone(), target));
    }

    info!(
        original = original_triangles,
        target = target,
        "Starting mesh decimation"
    );

    let mut work = WorkingMesh::new(mesh);
    let mut queue = CollapseQueue::default();
    work.seed(&mut queue, params);

    let interval = params.cancel_check_interval.max(1);
    let cos_limit = params.max_normal_flip_angle.cos();
    let mut examined = 0usize;
    let mut collapses_performed = 0;
    let mut collapses_rejected = 0;
    let mut cancelled = false;

    while work.active_faces > target {
        if examined % interval == 0 && should_stop() {
            cancelled = true;
            break;
        }
        let Some(candidate) = queue.heap.pop() else {
            break;
        };
        examined += 1;

        if work.is_stale(&candidate) {
            continue;
        }
        let shared = work.edge_faces(candidate.a, candidate.b);
        if shared.is_empty() {
            continue;
        }
        if !work.can_collapse(&candidate, &shared, params, cos_limit) {
            collapses_rejected += 1;
            continue;
        }

        let keep = work.collapse(&candidate, params);
        collapses_performed += 1;

        for n in work.neighbors(keep) {
            let (a, b) = edge_key(keep, n);
            work.enqueue(a, b, &mut queue, params);
        }
    }

    let final_triangles = work.active_faces;
    let mut warnings = Vec::new();
    if queue.singular_fallbacks > 0 {
        let w = DecimateWarning::NumericInstability {
            occurrences: queue.singular_fallbacks,
        };
        warn!(occurrences = queue.singular_fallbacks, "{w}");
        warnings.push(w);
    }
    if cancelled {
        let w = DecimateWarning::Cancelled {
            achieved: final_triangles,
        };
        warn!(faces = final_triangles, "{w}");
        warnings.push(w);
    } else if final_triangles > target {
        let w = DecimateWarning::Incomplete {
            target,
            achieved: final_triangles,
        };
        warn!(target, faces = final_triangles, "{w}");
        warnings.push(w);
    }

    let final_mesh = work.into_mesh(mesh);

    info!(
        final_triangles,
        collapses = collapses_performed,
        rejected = collapses_rejected,
        "Decimation complete"
    );

    Ok(DecimationResult {
        mesh: final_mesh,
        original_triangles,
        target_triangles: target,
        final_triangles,
        collapses_performed,
        collapses_rejected,
        warnings,
    })
}

// ============================================================================
// Working state
// ============================================================================

const fn edge_key(v1: u32, v2: u32) -> (u32, u32) {
    if v1 < v2 {
        (v1, v2)
    } else {
        (v2, v1)
    }
}

/// The edge of `face` opposite `v`, as an ordered key.
fn opposite_edge(face: &[u32; 3], v: u32) -> (u32, u32) {
    debug_assert!(face.contains(&v), "vertex {v} is not a corner of {face:?}");
    let k = face.iter().position(|&x| x == v).unwrap_or(0);
    edge_key(face[(k + 1) % 3], face[(k + 2) % 3])
}

/// Flat-array mesh that supports in-place collapses.
///
/// Faces and vertices are tombstoned rather than removed so indices stay
/// stable until the final compaction.
struct WorkingMesh {
    positions: Vec<Point3<f64>>,
    faces: Vec<[u32; 3]>,
    face_alive: Vec<bool>,
    vertex_alive: Vec<bool>,
    /// Faces around each vertex; may hold dead faces, filtered on read.
    incident: Vec<FaceList>,
    quadrics: Vec<Quadric>,
    version: Vec<u32>,
    on_boundary: Vec<bool>,
    active_faces: usize,
}

impl WorkingMesh {
    fn new(mesh: &IndexedMesh) -> Self {
        let n = mesh.vertices.len();
        let mut incident = vec![FaceList::new(); n];
        let mut quadrics = vec![Quadric::default(); n];
        let mut edge_uses: HashMap<(u32, u32), u32> = HashMap::with_capacity(mesh.faces.len() * 2);

        for (f, face) in mesh.faces.iter().enumerate() {
            for (k, &v) in face.iter().enumerate() {
                if !face[..k].contains(&v) {
                    incident[v as usize].push(f as u32);
                }
                let w = face[(k + 1) % 3];
                if v != w {
                    *edge_uses.entry(edge_key(v, w)).or_insert(0) += 1;
                }
            }

            let p0 = mesh.vertices[face[0] as usize];
            let tri = Triangle::new(p0, mesh.vertices[face[1] as usize], mesh.vertices[face[2] as usize]);
            if let Some(normal) = tri.normal() {
                let q = Quadric::from_point_normal(&p0, &normal);
                for &v in face {
                    quadrics[v as usize] += q;
                }
            }
        }

        let mut on_boundary = vec![false; n];
        for (&(a, b), &uses) in &edge_uses {
            if uses != 2 {
                on_boundary[a as usize] = true;
                on_boundary[b as usize] = true;
            }
        }

        Self {
            positions: mesh.vertices.clone(),
            faces: mesh.faces.clone(),
            face_alive: vec![true; mesh.faces.len()],
            vertex_alive: vec![true; n],
            incident,
            quadrics,
            version: vec![0; n],
            on_boundary,
            active_faces: mesh.faces.len(),
        }
    }

    fn triangle(&self, face: &[u32; 3]) -> Triangle {
        Triangle::new(
            self.positions[face[0] as usize],
            self.positions[face[1] as usize],
            self.positions[face[2] as usize],
        )
    }

    fn live_faces(&self, v: u32) -> impl Iterator<Item = u32> + '_ {
        self.incident[v as usize]
            .iter()
            .copied()
            .filter(|&f| self.face_alive[f as usize])
    }

    /// Live faces containing both `a` and `b`.
    fn edge_faces(&self, a: u32, b: u32) -> FaceList {
        self.live_faces(a)
            .filter(|&f| self.faces[f as usize].contains(&b))
            .collect()
    }

    /// Vertices sharing a live face with `v`, ascending.
    fn neighbors(&self, v: u32) -> VertexList {
        let mut out: VertexList = self
            .live_faces(v)
            .flat_map(|f| self.faces[f as usize])
            .filter(|&u| u != v)
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Queue every edge once, numbered in first-seen order.
    fn seed(&self, queue: &mut CollapseQueue, params: &DecimateParams) {
        let mut seen: HashSet<(u32, u32)> = HashSet::with_capacity(self.faces.len() * 2);
        for face in &self.faces {
            for k in 0..3 {
                let (a, b) = (face[k], face[(k + 1) % 3]);
                if a == b {
                    continue;
                }
                let key = edge_key(a, b);
                if seen.insert(key) {
                    self.enqueue(key.0, key.1, queue, params);
                }
            }
        }
        debug!(candidates = queue.heap.len(), "Seeded collapse queue");
    }

    fn enqueue(&self, a: u32, b: u32, queue: &mut CollapseQueue, params: &DecimateParams) {
        let uses = self.edge_faces(a, b).len();
        if uses == 0 || uses > 2 {
            return;
        }
        let boundary_edge = uses == 1;
        if boundary_edge && params.preserve_boundary {
            return;
        }

        let combined = self.quadrics[a as usize] + self.quadrics[b as usize];
        let target = self.placement(a, b, &combined, params, &mut queue.singular_fallbacks);
        let mut cost = combined.evaluate(&target).max(0.0);
        if boundary_edge {
            cost *= params.boundary_penalty;
        }

        queue.heap.push(Candidate {
            cost,
            id: queue.next_id,
            a,
            b,
            stamp: [self.version[a as usize], self.version[b as usize]],
            target,
        });
        queue.next_id += 1;
    }

    fn placement(
        &self,
        a: u32,
        b: u32,
        combined: &Quadric,
        params: &DecimateParams,
        singular_fallbacks: &mut usize,
    ) -> Point3<f64> {
        let (pa, pb) = (self.positions[a as usize], self.positions[b as usize]);
        if params.preserve_boundary {
            match (self.on_boundary[a as usize], self.on_boundary[b as usize]) {
                (true, false) => return pa,
                (false, true) => return pb,
                _ => {}
            }
        }
        combined
            .optimal_point(params.singular_epsilon)
            .unwrap_or_else(|| {
                *singular_fallbacks += 1;
                Point3::from((pa.coords + pb.coords) * 0.5)
            })
    }

    fn is_stale(&self, c: &Candidate) -> bool {
        let (a, b) = (c.a as usize, c.b as usize);
        !self.vertex_alive[a]
            || !self.vertex_alive[b]
            || self.version[a] != c.stamp[0]
            || self.version[b] != c.stamp[1]
    }

    fn can_collapse(
        &self,
        c: &Candidate,
        shared: &FaceList,
        params: &DecimateParams,
        cos_limit: f64,
    ) -> bool {
        if shared.len() > 2 {
            return false;
        }
        if params.preserve_boundary
            && (shared.len() == 1
                || (self.on_boundary[c.a as usize] && self.on_boundary[c.b as usize]))
        {
            return false;
        }
        if params.max_error.is_some_and(|max| c.cost > max) {
            return false;
        }
        self.link_condition(c.a, c.b, shared) && self.keeps_orientation(c.a, c.b, &c.target, cos_limit)
    }

    /// The endpoints' links may intersect only in the edge's own link:
    /// shared neighbours are exactly the opposite corners of the edge's
    /// faces, and no pair of faces `(a, x, y)`, `(b, x, y)` exists.
    fn link_condition(&self, a: u32, b: u32, shared: &FaceList) -> bool {
        let na = self.neighbors(a);
        let nb = self.neighbors(b);
        let common = na
            .iter()
            .filter(|&&v| v != b && nb.binary_search(&v).is_ok())
            .count();
        if common != shared.len() {
            return false;
        }

        let mut across_a: SmallVec<[(u32, u32); 16]> = self
            .live_faces(a)
            .map(|f| &self.faces[f as usize])
            .filter(|face| !face.contains(&b))
            .map(|face| opposite_edge(face, a))
            .collect();
        across_a.sort_unstable();
        self.live_faces(b)
            .map(|f| &self.faces[f as usize])
            .filter(|face| !face.contains(&a))
            .all(|face| across_a.binary_search(&opposite_edge(face, b)).is_err())
    }

    /// No surviving face may lose its area or turn past the flip limit.
    fn keeps_orientation(&self, a: u32, b: u32, target: &Point3<f64>, cos_limit: f64) -> bool {
        for v in [a, b] {
            for f in self.live_faces(v) {
                let face = &self.faces[f as usize];
                if face.contains(&a) && face.contains(&b) {
                    continue;
                }
                let moved = face.map(|i| {
                    if i == a || i == b {
                        *target
                    } else {
                        self.positions[i as usize]
                    }
                });
                let Some(after) = Triangle::new(moved[0], moved[1], moved[2]).normal() else {
                    return false;
                };
                if let Some(before) = self.triangle(face).normal() {
                    if before.dot(&after) < cos_limit {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// Merge the candidate's edge into one vertex and return the survivor.
    fn collapse(&mut self, c: &Candidate, params: &DecimateParams) -> u32 {
        // Under boundary preservation the boundary endpoint survives, so its
        // attributes stay with the fixed position.
        let (keep, gone) = if params.preserve_boundary
            && self.on_boundary[c.b as usize]
            && !self.on_boundary[c.a as usize]
        {
            (c.b, c.a)
        } else {
            (c.a, c.b)
        };
        let (k, g) = (keep as usize, gone as usize);

        self.positions[k] = c.target;
        let absorbed = self.quadrics[g];
        self.quadrics[k] += absorbed;
        self.on_boundary[k] |= self.on_boundary[g];
        self.vertex_alive[g] = false;
        self.version[k] = self.version[k].wrapping_add(1);

        for f in std::mem::take(&mut self.incident[g]) {
            let fi = f as usize;
            if !self.face_alive[fi] {
                continue;
            }
            if self.faces[fi].contains(&keep) {
                self.face_alive[fi] = false;
                self.active_faces -= 1;
            } else {
                for idx in &mut self.faces[fi] {
                    if *idx == gone {
                        *idx = keep;
                    }
                }
                self.incident[k].push(f);
            }
        }
        let face_alive = &self.face_alive;
        self.incident[k].retain(|f| face_alive[*f as usize]);

        keep
    }

    /// Compact live vertices and faces into a mesh, carrying attributes
    /// over from `source`.
    fn into_mesh(self, source: &IndexedMesh) -> IndexedMesh {
        let mut remap = vec![u32::MAX; self.positions.len()];
        let mut vertices = Vec::with_capacity(self.positions.len());
        for (v, alive) in self.vertex_alive.iter().enumerate() {
            if *alive {
                remap[v] = vertices.len() as u32;
                vertices.push(self.positions[v]);
            }
        }

        let faces: Vec<[u32; 3]> = self
            .faces
            .iter()
            .zip(&self.face_alive)
            .filter(|(_, alive)| **alive)
            .map(|(face, _)| face.map(|i| remap[i as usize]))
            .collect();

        let uvs = source.uvs.as_ref().map(|uvs| {
            uvs.iter()
                .zip(&self.vertex_alive)
                .filter(|(_, alive)| **alive)
                .map(|(uv, _)| *uv)
                .collect()
        });

        let colors = source.colors.as_ref().map(|colors| {
            colors
                .iter()
                .zip(&self.vertex_alive)
                .filter(|(_, alive)| **alive)
                .map(|(color, _)| *color)
                .collect()
        });

        let mut out = IndexedMesh {
            vertices,
            faces,
            normals: None,
            uvs,
            colors,
            texture: source.texture.clone(),
        };
        if let Some(normals) = &source.normals {
            out.normals = Some(match normals {
                Normals::PerFace(_) => Normals::PerFace(Vec::new()),
                Normals::PerVertex(_) => Normals::PerVertex(Vec::new()),
            });
            out.recompute_normals();
        }

        debug!(
            vertices = out.vertices.len(),
            faces = out.faces.len(),
            "Built final decimated mesh"
        );
        out
    }
}
