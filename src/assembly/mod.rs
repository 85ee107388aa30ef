//! Instances, parts and the deduplicated material table.

pub use self::builder::{build_parts_assembly, Part, PartFlags, PartInstance, PartsAssembly, DEFAULT_MATERIAL};
pub use self::instances::{DetailLevel, InstanceGroup, InstanceList, MeshInstance};

mod builder;
mod instances;
