//! Per-LOD triangle budgets and the choice of part variants.

pub use self::optimizer::{plan_part_lods, LodSourcePlan};

mod optimizer;
