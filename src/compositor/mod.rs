//! Assembly of the instance meshes into per-LOD accumulation buffers.

pub use self::compose::{compose_lod, CombinedLod};

mod compose;
