use crate::math::{Affine, Real};
use crate::options::ApproximationTypes;
use crate::source::{MaterialRef, SourceMeshProvider};
use std::fmt;
use std::sync::Arc;

/// How much an instance contributes to the overall look of the assembly.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub enum DetailLevel {
    /// A regular instance.
    #[default]
    Standard,
    /// A small instance.
    Small,
    /// A decorative instance: excluded from budgets and collision, removed
    /// at low detail.
    Decorative,
}

/// Settings shared by a group of instances.
#[derive(Clone, Debug, PartialEq)]
pub struct InstanceGroup {
    /// Materials registered in the output table even if unused by the
    /// instance meshes.
    pub materials: Vec<MaterialRef>,
    /// Keep the UVs of the parts of this group on every LOD.
    pub preserve_uvs: bool,
    /// Allow shape approximations of the parts of this group.
    pub allow_approximation: bool,
    /// Allow the coplanar merge to modify the parts of this group.
    pub allow_merging: bool,
    /// Allowed approximation shapes (empty means all).
    pub approximation_types: ApproximationTypes,
}

impl Default for InstanceGroup {
    fn default() -> Self {
        Self {
            materials: Vec::new(),
            preserve_uvs: false,
            allow_approximation: true,
            allow_merging: true,
            approximation_types: ApproximationTypes::empty(),
        }
    }
}

/// One placement (possibly repeated) of a part source.
#[derive(Clone)]
pub struct MeshInstance {
    /// The source geometry.
    pub source: Arc<dyn SourceMeshProvider>,
    /// World transforms; each one places a copy of the source.
    pub transforms: Vec<Affine<Real>>,
    /// Per material slot override of the source default material.
    pub material_overrides: Vec<Option<MaterialRef>>,
    /// Detail level.
    pub detail_level: DetailLevel,
    /// The instance is dropped from this LOD on.
    pub lod_filter: Option<usize>,
    /// Output subset of this instance.
    pub subset_id: u32,
    /// Never use shape approximations for this instance.
    pub disable_approximation: bool,
    /// Index of the [`InstanceGroup`] of this instance.
    pub group: usize,
}

impl MeshInstance {
    /// A standard instance of `source` with a single transform.
    pub fn new(source: Arc<dyn SourceMeshProvider>, transform: Affine<Real>) -> Self {
        Self {
            source,
            transforms: vec![transform],
            material_overrides: Vec::new(),
            detail_level: DetailLevel::Standard,
            lod_filter: None,
            subset_id: 0,
            disable_approximation: false,
            group: 0,
        }
    }

    /// Whether this instance is decorative.
    pub fn is_decorative(&self) -> bool {
        self.detail_level == DetailLevel::Decorative
    }

    /// Whether this instance is dropped from `lod`.
    pub fn is_filtered_at(&self, lod: usize) -> bool {
        self.lod_filter.map_or(false, |filter| lod >= filter)
    }
}

impl fmt::Debug for MeshInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MeshInstance")
            .field("source", &self.source.source_key())
            .field("transforms", &self.transforms.len())
            .field("detail_level", &self.detail_level)
            .field("lod_filter", &self.lod_filter)
            .field("subset_id", &self.subset_id)
            .field("disable_approximation", &self.disable_approximation)
            .field("group", &self.group)
            .finish()
    }
}

/// The input of the combination: instances and their groups.
///
/// An instance whose group index is out of range uses the default group.
#[derive(Clone, Debug, Default)]
pub struct InstanceList {
    /// Instance groups.
    pub groups: Vec<InstanceGroup>,
    /// Instances.
    pub instances: Vec<MeshInstance>,
}

impl InstanceList {
    /// An empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a group and returns its index.
    pub fn add_group(&mut self, group: InstanceGroup) -> usize {
        self.groups.push(group);
        self.groups.len() - 1
    }

    /// Adds an instance.
    pub fn add_instance(&mut self, instance: MeshInstance) {
        self.instances.push(instance);
    }

    /// The group of `instance`.
    pub fn group_of(&self, instance: &MeshInstance) -> InstanceGroup {
        self.groups.get(instance.group).cloned().unwrap_or_default()
    }
}
