//! Per-part simplified and approximated mesh chains.

pub use self::mesh_set::{
    compute_all_part_mesh_sets, compute_part_mesh_set, PartMeshSet, VariantKind, VariantRef,
};

mod mesh_set;
