//! Floater removal.

use mesh_measure::ConnectedComponents;
use mesh_types::IndexedMesh;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// What [`keep_largest_component`] removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloaterRemoval {
    /// Components dropped.
    pub components_removed: usize,
    /// Faces dropped with them.
    pub faces_removed: usize,
}

/// Keep only the largest edge-connected component.
///
/// The component with the most faces wins; a tie goes to the component
/// whose lowest vertex index is smaller. `components` is reused when it was
/// computed from the mesh as it is now, and recomputed otherwise.
/// Vertices are left in place.
///
/// # Example
///
/// ```
/// use mesh_types::{unit_cube, Point3};
/// use mesh_repair::keep_largest_component;
///
/// let mut mesh = unit_cube();
/// let speck = mesh_types::IndexedMesh::from_parts(
///     vec![Point3::new(5.0, 0.0, 0.0), Point3::new(6.0, 0.0, 0.0), Point3::new(5.0, 1.0, 0.0)],
///     vec![[0, 1, 2]],
/// );
/// mesh.merge(&speck);
///
/// let removed = keep_largest_component(&mut mesh, None);
/// assert_eq!(removed.components_removed, 1);
/// assert_eq!(mesh.faces.len(), 12);
/// ```
pub fn keep_largest_component(
    mesh: &mut IndexedMesh,
    components: Option<&ConnectedComponents>,
) -> FloaterRemoval {
    let computed;
    let cc = match components {
        Some(cc) if cc.is_current_for(mesh) => {
            debug!("Reusing component labels from statistics");
            cc
        }
        _ => {
            computed = ConnectedComponents::compute(mesh);
            &computed
        }
    };

    if cc.count() <= 1 {
        return FloaterRemoval::default();
    }
    let Some(largest) = cc.largest() else {
        return FloaterRemoval::default();
    };

    let labels = cc.face_labels();
    let faces_removed = mesh.retain_faces(|i, _| labels.get(i) == Some(&largest));
    debug!(
        kept = largest,
        components = cc.count(),
        faces_removed,
        "Removed floating components"
    );

    FloaterRemoval {
        components_removed: cc.count() - 1,
        faces_removed,
    }
}
