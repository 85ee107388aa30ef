//! Post-processing of the combined LODs: hidden-face removal, coplanar merge
//! and coarse LOD synthesis.

pub use self::chain::process_lod_chain;
pub use self::coarse::{project_attributes, synthesize_coarse_lods};
pub use self::coplanar::{merge_coplanar_faces, MERGE_LOCKED_GROUP};
pub use self::hidden::remove_hidden_faces;

mod chain;
mod coarse;
mod coplanar;
mod hidden;
mod voxel;
