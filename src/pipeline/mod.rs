//! The combination pipeline and its task runner.

pub use self::combine::{combine_mesh_instances, CombineResults, CombinedSubAssembly};
pub use self::tasks::TaskRunner;

mod combine;
mod tasks;
