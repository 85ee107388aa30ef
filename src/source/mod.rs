//! Part source geometry providers and the source LOD loader.

pub use self::loader::{load_part_sources, PartSources, SourceRequest};
pub use self::provider::{LodSet, LodSetSource, MaterialRef, SourceKey, SourceMeshProvider, StaticSource};

mod loader;
mod provider;
