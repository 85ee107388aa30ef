//! User strategy hooks.

use crate::assembly::MeshInstance;
use crate::mesh::AttributedMesh;
use std::fmt;
use std::sync::Arc;

/// Modifies the mesh of an instance before it is appended to a combined LOD.
///
/// The mesh is in the part's local space, already restricted to the UV
/// layers the LOD keeps.
pub trait InstancePreprocess: Send + Sync {
    /// Modifies `mesh`, the variant selected for `instance` at `lod`.
    fn preprocess(&self, mesh: &mut AttributedMesh, instance: &MeshInstance, lod: usize);
}

/// Assigns a grouping id to the triangles of a combined mesh.
///
/// The coplanar merge never merges triangles with different grouping ids.
/// Without this hook, the grouping id is the mesh `group_ids` attribute.
pub trait TriangleGroupingId: Send + Sync {
    /// The grouping id of `triangle`.
    fn grouping_id(&self, mesh: &AttributedMesh, triangle: usize) -> u32;
}

/// The set of hooks of [`CombineOptions`](crate::CombineOptions).
#[derive(Clone, Default)]
pub struct CombineHooks {
    /// Called on each instance mesh before it is appended.
    pub instance_preprocess: Option<Arc<dyn InstancePreprocess>>,
    /// Splits the coplanar merge regions.
    pub triangle_grouping: Option<Arc<dyn TriangleGroupingId>>,
}

impl CombineHooks {
    /// The grouping id of `triangle`, from the hook if set or from the mesh
    /// group ids otherwise.
    pub fn grouping_id(&self, mesh: &AttributedMesh, triangle: usize) -> u32 {
        match &self.triangle_grouping {
            Some(hook) => hook.grouping_id(mesh, triangle),
            None => mesh.group_ids[triangle],
        }
    }
}

impl fmt::Debug for CombineHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CombineHooks")
            .field("instance_preprocess", &self.instance_preprocess.is_some())
            .field("triangle_grouping", &self.triangle_grouping.is_some())
            .finish()
    }
}
