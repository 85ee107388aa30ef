//! Configuration of the combination pipeline.
//!
//! Every stage receives the [`CombineOptions`] by reference: there is no
//! global state. The numeric defaults are the ones the pipeline is tuned for.

use crate::hooks::CombineHooks;
use crate::math::Real;
use std::collections::BTreeSet;

/// How an output LOD is produced from the part variants.
///
/// Variants are ordered from the most to the least faithful: the methods
/// assigned to successive LODs must be non-decreasing.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub enum LodMethod {
    /// The part source LODs are copied as-is.
    Copied,
    /// The part meshes are simplified with increasing tolerance.
    Simplified,
    /// The part meshes are replaced by simple shape approximations.
    Approximated,
    /// The whole combined mesh is replaced by a closed coarse wrap.
    VoxWrapped,
}

/// How the triangle budget of each output LOD is defined.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub enum BudgetMethod {
    /// No budget: the `k`-th LOD of a method uses the `k`-th variant of that
    /// method.
    #[default]
    NoRestriction,
    /// [`BudgetOptions::absolute_budgets`] gives the budget of each LOD.
    Absolute,
    /// [`BudgetOptions::percent_of_previous`] gives the budget of each LOD as
    /// a percentage of the previous LOD triangle count.
    PercentOfPrevious,
}

/// The hidden-face detection algorithm.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub enum HiddenRemovalMethod {
    /// Triangles whose front side is inside the combined volume (generalized
    /// winding number), confirmed by ray casts, are removed.
    WindingNumber,
    /// Triangles never seen from outside along a set of sampled directions
    /// are removed.
    #[default]
    ExteriorVisibility,
}

/// The algorithm producing the coarse ("voxel-wrapped") LODs.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub enum CoarseLodStrategy {
    /// Morphological closure of a voxelization, then surface extraction and
    /// simplification.
    #[default]
    Voxel,
    /// The best cardinal-axis swept silhouette solid.
    SweptPlanar,
    /// The intersection of the three cardinal-axis swept silhouettes.
    IntersectProjections,
    /// `SweptPlanar` if its deviation is small enough, `Voxel` otherwise.
    Automatic,
}

/// How decorative instances are handled at low detail.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub enum DecorationHandling {
    /// Decorative instances are treated as any other instance.
    Keep,
    /// Decorative instances are removed from
    /// [`CombineOptions::filter_decorative_lod`] on.
    Remove,
    /// Decorative instances use their coarsest approximation
    /// [`CombineOptions::approximate_decorative_lod_offset`] LODs before they
    /// are removed.
    #[default]
    ApproximateThenRemove,
}

/// Debug vertex coloring of the output meshes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub enum VertexColorMode {
    /// Colors are left untouched.
    #[default]
    None,
    /// Each LOD gets its own color.
    LodIndex,
    /// Each part gets its own color.
    PartIndex,
    /// Parts are colored from white to red by triangle count.
    TriangleCount,
}

/// The set of shape approximations allowed for a part.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct ApproximationTypes(u32);

bitflags::bitflags! {
    impl ApproximationTypes: u32 {
        /// The axis-aligned bounding box.
        const AXIS_ALIGNED_BOX = 1;
        /// The oriented bounding box.
        const ORIENTED_BOX = 1 << 1;
        /// The smallest of the three cardinal-axis swept convex hulls.
        const SWEPT_HULL = 1 << 2;
        /// The convex hull, and its simplified version.
        const CONVEX_HULL = 1 << 3;
        /// Flattened extrusions of the part silhouette.
        const SWEPT_PROJECTION = 1 << 4;
    }
}

impl ApproximationTypes {
    /// The effective set of allowed approximations: an empty set allows all.
    pub fn effective(self) -> Self {
        if self.is_empty() {
            Self::all()
        } else {
            self
        }
    }
}

/// Parameters of the per-part simplification and approximation chains.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct ApproximationOptions {
    /// Geometric tolerance of the first simplified LOD.
    pub simplify_base_tolerance: Real,
    /// Multiplier applied to the tolerance for each following simplified LOD.
    pub simplify_tolerance_scale: Real,
    /// Pin the corners where several large planar regions meet.
    pub preserve_salient_corners: bool,
    /// Minimum size of a planar region for its corners to be salient.
    pub min_salient_part_dimension: Real,
    /// Triangle-cost exponent of the first approximation level.
    pub triangle_cost_base: Real,
    /// Multiplier applied to the triangle-cost exponent for each following
    /// approximation level.
    pub triangle_cost_scale: Real,
    /// Number of additional approximation levels computed beyond the ones
    /// needed by the approximated LODs.
    pub num_extra_levels: usize,
    /// Triangle-cost increment of each additional level.
    pub extra_level_triangle_cost_step: Real,
    /// Approximations deviating more than this from the part are rejected.
    pub max_allowable_deviation: Option<Real>,
    /// Allowed approximation shapes (empty means all).
    pub approximation_types: ApproximationTypes,
    /// The axis-aligned box replaces a winner with at most 12 triangles if
    /// their volume ratio is below `1 + box_preference_pct_low / 100`.
    pub box_preference_pct_low: Real,
    /// The axis-aligned box replaces a winner with more than 12 triangles if
    /// their volume ratio is below `1 + box_preference_pct_high / 100`.
    pub box_preference_pct_high: Real,
    /// Closing offset used by the flattened extrusion.
    pub extrusion_merge_offset: Real,
    /// Holes smaller than this are filled by the flattened extrusion.
    pub extrusion_min_hole_area: Real,
}

impl Default for ApproximationOptions {
    fn default() -> Self {
        Self {
            simplify_base_tolerance: 0.25,
            simplify_tolerance_scale: 2.0,
            preserve_salient_corners: true,
            min_salient_part_dimension: 1.0,
            triangle_cost_base: 0.7,
            triangle_cost_scale: 2.5,
            num_extra_levels: 10,
            extra_level_triangle_cost_step: 0.25,
            max_allowable_deviation: None,
            approximation_types: ApproximationTypes::empty(),
            box_preference_pct_low: 20.0,
            box_preference_pct_high: 10.0,
            extrusion_merge_offset: 0.1,
            extrusion_min_hole_area: 100.0,
        }
    }
}

/// Parameters of the per-LOD triangle budget optimizer.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct BudgetOptions {
    /// How budgets are defined.
    pub method: BudgetMethod,
    /// Per-LOD triangle budgets, for [`BudgetMethod::Absolute`].
    pub absolute_budgets: Vec<usize>,
    /// Per-LOD percentage of the previous LOD triangle count, for
    /// [`BudgetMethod::PercentOfPrevious`].
    pub percent_of_previous: Vec<Real>,
    /// Parts are promoted while the LOD total exceeds
    /// `budget * promotion_multiplier`.
    pub promotion_multiplier: Real,
    /// Maximum number of promotions per LOD.
    pub max_iterations: usize,
    /// The optimizer gives up after this many iterations without reducing the
    /// total.
    pub max_no_progress_iterations: usize,
    /// Factor applied to the weight of a part each time it is promoted.
    pub replaced_weight_decay: Real,
    /// Amount added to the weight of every part after each promotion.
    pub replaced_weight_bump: Real,
}

impl Default for BudgetOptions {
    fn default() -> Self {
        Self {
            method: BudgetMethod::NoRestriction,
            absolute_budgets: Vec::new(),
            percent_of_previous: Vec::new(),
            promotion_multiplier: 1.0,
            max_iterations: 1000,
            max_no_progress_iterations: 25,
            replaced_weight_decay: 0.5,
            replaced_weight_bump: 0.1,
        }
    }
}

/// Parameters of the hidden-face removal.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct HiddenRemovalOptions {
    /// Enables hidden-face removal.
    pub enabled: bool,
    /// The detection algorithm.
    pub method: HiddenRemovalMethod,
    /// First LOD processed.
    pub start_lod: usize,
    /// Number of spherical-Fibonacci view directions (on top of the six
    /// cardinal directions).
    pub num_directions: usize,
    /// Number of sample points per triangle.
    pub samples_per_triangle: usize,
    /// Number of random rays confirming an occlusion.
    pub occlusion_rays: usize,
    /// A triangle seen from behind counts as visible.
    pub double_sided: bool,
}

impl Default for HiddenRemovalOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            method: HiddenRemovalMethod::ExteriorVisibility,
            start_lod: 1,
            num_directions: 128,
            samples_per_triangle: 4,
            occlusion_rays: 25,
            double_sided: false,
        }
    }
}

/// Parameters of the coplanar merge and planar retriangulation.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct PlanarMergeOptions {
    /// Enables the coplanar merge.
    pub merge_coplanar: bool,
    /// First LOD processed by the coplanar merge.
    pub merge_start_lod: usize,
    /// First LOD whose planar regions are retriangulated, if any.
    pub retriangulate_start_lod: Option<usize>,
    /// Geometric tolerance of the merge.
    pub tolerance: Real,
    /// Holes smaller than this are filled by the retriangulation.
    pub min_hole_area: Real,
    /// Source LODs from this index on are retriangulated before the part
    /// chains are computed (when UVs are not preserved).
    pub retriangulate_source_start_lod: Option<usize>,
    /// Materials whose triangles are never merged.
    pub prevent_merging_materials: BTreeSet<u32>,
}

impl Default for PlanarMergeOptions {
    fn default() -> Self {
        Self {
            merge_coplanar: true,
            merge_start_lod: 1,
            retriangulate_start_lod: None,
            tolerance: 0.01,
            min_hole_area: 0.0,
            retriangulate_source_start_lod: None,
            prevent_merging_materials: BTreeSet::new(),
        }
    }
}

/// Parameters of the coarse LOD synthesis.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct CoarseLodOptions {
    /// The synthesis algorithm.
    pub strategy: CoarseLodStrategy,
    /// Size of the smallest feature kept by the wrap. Gaps narrower than
    /// this are closed.
    pub detail_size: Real,
    /// Initial voxel size.
    pub initial_cell_size: Real,
    /// Maximum number of voxels along each axis.
    pub max_grid_cells: usize,
    /// Budget of each coarse LOD, as a percentage of the previous LOD budget
    /// (or triangle count).
    pub triangle_reduction_pct: Real,
    /// The coarse LOD `k` has at most `max_triangles_base / 2^k` triangles.
    pub max_triangles_base: usize,
    /// Tolerance multiplier applied to each following coarse LOD.
    pub tolerance_scale: Real,
}

impl Default for CoarseLodOptions {
    fn default() -> Self {
        Self {
            strategy: CoarseLodStrategy::Voxel,
            detail_size: 1.0,
            initial_cell_size: 2.0,
            max_grid_cells: 256,
            triangle_reduction_pct: 50.0,
            max_triangles_base: 5000,
            tolerance_scale: 1.5,
        }
    }
}

/// The complete configuration of [`combine_mesh_instances`](crate::combine_mesh_instances).
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct CombineOptions {
    /// Number of output LODs.
    pub num_lods: usize,
    /// Number of leading LODs copied from the part source LODs.
    pub num_copied_lods: usize,
    /// Number of simplified LODs following the copied ones.
    pub num_simplified_lods: usize,
    /// Number of trailing coarse LODs.
    pub num_coarse_lods: usize,
    /// Explicit per-LOD methods, overriding the counts above.
    pub lod_methods: Option<Vec<LodMethod>>,
    /// Source LOD used by the first copied LOD.
    pub base_copied_lod: usize,
    /// Source LOD used as the input of the simplification chain.
    pub simplification_source_lod: usize,
    /// Source LOD used as the input of the approximation chain.
    pub approximation_source_lod: usize,
    /// Simplification and approximation chain parameters.
    pub approximation: ApproximationOptions,
    /// Budget optimizer parameters.
    pub budget: BudgetOptions,
    /// Hidden-face removal parameters.
    pub hidden_removal: HiddenRemovalOptions,
    /// Coplanar merge parameters.
    pub planar: PlanarMergeOptions,
    /// Coarse LOD parameters.
    pub coarse: CoarseLodOptions,
    /// Handling of decorative instances.
    pub decoration_handling: DecorationHandling,
    /// First LOD from which decorative instances are removed.
    pub filter_decorative_lod: usize,
    /// Number of LODs before `filter_decorative_lod` where decorative
    /// instances use their coarsest approximation.
    pub approximate_decorative_lod_offset: usize,
    /// Keep UVs on every LOD up to (and including) this one.
    pub preserve_uv_level: Option<usize>,
    /// Keep UVs on all copied and simplified LODs.
    pub preserve_uvs: bool,
    /// Debug vertex coloring.
    pub vertex_color_mode: VertexColorMode,
    /// Run single-threaded and log per-stage details.
    pub verbose: bool,
    /// User strategy hooks.
    #[cfg_attr(feature = "serde-serialize", serde(skip))]
    pub hooks: CombineHooks,
}

impl Default for CombineOptions {
    fn default() -> Self {
        Self {
            num_lods: 5,
            num_copied_lods: 1,
            num_simplified_lods: 3,
            num_coarse_lods: 1,
            lod_methods: None,
            base_copied_lod: 0,
            simplification_source_lod: 0,
            approximation_source_lod: 0,
            approximation: ApproximationOptions::default(),
            budget: BudgetOptions::default(),
            hidden_removal: HiddenRemovalOptions::default(),
            planar: PlanarMergeOptions::default(),
            coarse: CoarseLodOptions::default(),
            decoration_handling: DecorationHandling::ApproximateThenRemove,
            filter_decorative_lod: 2,
            approximate_decorative_lod_offset: 1,
            preserve_uv_level: None,
            preserve_uvs: false,
            vertex_color_mode: VertexColorMode::None,
            verbose: false,
            hooks: CombineHooks::default(),
        }
    }
}

impl CombineOptions {
    /// The method of each output LOD.
    ///
    /// Methods come from [`Self::lod_methods`] if set, otherwise from the
    /// LOD counts: copied LODs first, then simplified, then approximated,
    /// and the last `num_coarse_lods` LODs are coarse wraps. A method lower
    /// than the previous LOD's is raised to it, with a warning.
    pub fn resolve_lod_methods(&self) -> Vec<LodMethod> {
        let mut methods: Vec<LodMethod> = match &self.lod_methods {
            Some(methods) => methods.iter().copied().take(self.num_lods).collect(),
            None => (0..self.num_lods)
                .map(|lod| {
                    if lod < self.num_copied_lods {
                        LodMethod::Copied
                    } else if lod < self.num_copied_lods + self.num_simplified_lods {
                        LodMethod::Simplified
                    } else if lod >= self.num_lods.saturating_sub(self.num_coarse_lods) {
                        LodMethod::VoxWrapped
                    } else {
                        LodMethod::Approximated
                    }
                })
                .collect(),
        };

        for lod in 1..methods.len() {
            if methods[lod] < methods[lod - 1] {
                log::warn!(
                    "LOD {} method {:?} is lower than the method {:?} of the previous LOD; using {:?}",
                    lod,
                    methods[lod],
                    methods[lod - 1],
                    methods[lod - 1]
                );
                methods[lod] = methods[lod - 1];
            }
        }

        methods
    }

    /// The number of approximation levels needed by the approximated LODs,
    /// without the extra levels.
    pub fn num_approximated_lods(&self) -> usize {
        self.resolve_lod_methods()
            .iter()
            .filter(|m| **m == LodMethod::Approximated)
            .count()
    }

    /// Whether multithreading is enabled.
    pub fn parallel(&self) -> bool {
        cfg!(feature = "parallel") && !self.verbose
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_methods() {
        let methods = CombineOptions::default().resolve_lod_methods();
        assert_eq!(
            methods,
            vec![
                LodMethod::Copied,
                LodMethod::Simplified,
                LodMethod::Simplified,
                LodMethod::Simplified,
                LodMethod::VoxWrapped
            ]
        );
    }

    #[test]
    fn methods_are_made_monotonic() {
        let options = CombineOptions {
            num_lods: 3,
            lod_methods: Some(vec![
                LodMethod::Approximated,
                LodMethod::Copied,
                LodMethod::VoxWrapped,
            ]),
            ..CombineOptions::default()
        };
        assert_eq!(
            options.resolve_lod_methods(),
            vec![
                LodMethod::Approximated,
                LodMethod::Approximated,
                LodMethod::VoxWrapped
            ]
        );
    }

    #[test]
    fn empty_approximation_types_allow_everything() {
        assert_eq!(ApproximationTypes::empty().effective(), ApproximationTypes::all());
        assert_eq!(
            ApproximationTypes::AXIS_ALIGNED_BOX.effective(),
            ApproximationTypes::AXIS_ALIGNED_BOX
        );
    }
}
