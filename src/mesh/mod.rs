//! Attributed triangle meshes and the spatial/topological queries used by
//! every processing stage.

pub use self::attributed_mesh::AttributedMesh;
pub use self::bvh::{MeshBvh, SurfaceProjection, SurfaceRayHit};
pub use self::queries::triangle_winding_number;
pub use self::topology::{connected_components, split_bowties, EdgeTopology};
pub use self::weld::{weld_vertices, WeldMode};

mod attributed_mesh;
mod bvh;
mod queries;
mod topology;
#[cfg(feature = "wavefront")]
mod wavefront;
mod weld;
