use super::{InstanceList, MeshInstance};
use crate::options::ApproximationTypes;
use crate::source::{MaterialRef, SourceKey, SourceMeshProvider};
use hashbrown::HashMap;
use indexmap::IndexSet;
use std::sync::Arc;

/// The material of the sources that list no material slot.
pub const DEFAULT_MATERIAL: &str = "default";

/// Per-part processing flags, merged from the groups of its instances.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct PartFlags(u8);

bitflags::bitflags! {
    impl PartFlags: u8 {
        /// Shape approximations may replace the part.
        const ALLOW_APPROXIMATION = 1;
        /// UVs must survive simplification.
        const PRESERVE_UVS = 1 << 1;
        /// The coplanar merge may modify the part.
        const ALLOW_MERGING = 1 << 2;
    }
}

/// A unique source identity and the instances placing it.
#[derive(Clone)]
pub struct Part {
    /// The identity shared by the instances of this part.
    pub key: SourceKey,
    /// The geometry provider.
    pub source: Arc<dyn SourceMeshProvider>,
    /// Indices of the instances of this part in [`PartsAssembly::instances`].
    pub instances: Vec<usize>,
    /// Processing flags.
    pub flags: PartFlags,
    /// Allowed approximation shapes (empty means all).
    pub approximation_types: ApproximationTypes,
    /// Triangle count of the source LOD 0.
    pub lod0_triangles: usize,
}

impl std::fmt::Debug for Part {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Part")
            .field("key", &self.key)
            .field("instances", &self.instances)
            .field("flags", &self.flags)
            .field("approximation_types", &self.approximation_types)
            .field("lod0_triangles", &self.lod0_triangles)
            .finish()
    }
}

/// An instance attached to its part.
#[derive(Clone, Debug)]
pub struct PartInstance {
    /// The input instance.
    pub instance: MeshInstance,
    /// Index of the part in [`PartsAssembly::parts`].
    pub part_index: usize,
    /// For each material slot of the source, the index of its material in
    /// [`PartsAssembly::materials`].
    pub material_indices: Vec<u32>,
}

impl PartInstance {
    /// The combined-mesh material of the source material slot `slot`.
    ///
    /// Slots past the end of the source list use its last material.
    pub fn material_index(&self, slot: u32) -> u32 {
        self.material_indices
            .get(slot as usize)
            .or(self.material_indices.last())
            .copied()
            .unwrap_or(0)
    }
}

/// Parts, instances and the deduplicated material table.
#[derive(Clone, Debug, Default)]
pub struct PartsAssembly {
    /// Parts, by decreasing LOD 0 triangle count.
    pub parts: Vec<Part>,
    /// Instances, grouped by part in part order.
    pub instances: Vec<PartInstance>,
    /// Materials in first-seen order.
    pub materials: IndexSet<MaterialRef>,
}

impl PartsAssembly {
    /// Whether there is nothing to combine.
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Number of non-decorative placements of each part.
    pub fn placement_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.parts.len()];
        for inst in &self.instances {
            if !inst.instance.is_decorative() {
                counts[inst.part_index] += inst.instance.transforms.len();
            }
        }
        counts
    }
}

/// Groups the instances of `list` into parts keyed by source identity.
///
/// Instances whose source fails validation (for example an out-of-range
/// LOD-set index) are skipped. The material table collects, in first-seen
/// order, the group materials and the (possibly overridden) material of every
/// source slot.
pub fn build_parts_assembly(list: &InstanceList) -> PartsAssembly {
    if list.instances.is_empty() {
        log::warn!("No instances to combine.");
        return PartsAssembly::default();
    }

    let mut materials = IndexSet::new();
    let mut parts: Vec<Part> = Vec::new();
    let mut part_ids: HashMap<SourceKey, usize> = HashMap::new();
    let mut attached: Vec<PartInstance> = Vec::new();

    for (i, instance) in list.instances.iter().enumerate() {
        if let Err(err) = instance.source.validate() {
            log::warn!("Skipping instance {}: {}", i, err);
            continue;
        }

        let group = list.group_of(instance);
        for material in &group.materials {
            let _ = materials.insert(material.clone());
        }

        let key = instance.source.source_key();
        let part_index = *part_ids.entry(key.clone()).or_insert_with(|| {
            parts.push(Part {
                key,
                source: instance.source.clone(),
                instances: Vec::new(),
                flags: PartFlags::ALLOW_APPROXIMATION | PartFlags::ALLOW_MERGING,
                approximation_types: ApproximationTypes::empty(),
                lod0_triangles: instance.source.num_triangles(0),
            });
            parts.len() - 1
        });

        let part = &mut parts[part_index];
        if group.preserve_uvs {
            part.flags |= PartFlags::PRESERVE_UVS;
        }
        if !group.allow_approximation {
            part.flags.remove(PartFlags::ALLOW_APPROXIMATION);
        }
        if !group.allow_merging {
            part.flags.remove(PartFlags::ALLOW_MERGING);
        }
        if part.approximation_types.is_empty() {
            part.approximation_types = group.approximation_types;
        }

        let mut slots = instance.source.materials();
        if slots.is_empty() {
            slots.push(MaterialRef::from(DEFAULT_MATERIAL));
        }
        let material_indices = slots
            .into_iter()
            .enumerate()
            .map(|(slot, default)| {
                let material = instance
                    .material_overrides
                    .get(slot)
                    .cloned()
                    .flatten()
                    .unwrap_or(default);
                materials.insert_full(material).0 as u32
            })
            .collect();

        attached.push(PartInstance {
            instance: instance.clone(),
            part_index,
            material_indices,
        });
    }

    // Sort parts by decreasing complexity, then remap the instances.
    let mut order: Vec<usize> = (0..parts.len()).collect();
    order.sort_by(|a, b| {
        parts[*b]
            .lod0_triangles
            .cmp(&parts[*a].lod0_triangles)
            .then_with(|| parts[*a].key.cmp(&parts[*b].key))
    });
    let mut new_index = vec![0; parts.len()];
    for (new, old) in order.iter().enumerate() {
        new_index[*old] = new;
    }
    let mut sorted_parts: Vec<Part> = order.iter().map(|i| parts[*i].clone()).collect();

    for inst in &mut attached {
        inst.part_index = new_index[inst.part_index];
    }
    attached.sort_by_key(|inst| inst.part_index);
    for (i, inst) in attached.iter().enumerate() {
        sorted_parts[inst.part_index].instances.push(i);
    }

    log::info!(
        "Assembled {} instances into {} parts with {} materials.",
        attached.len(),
        sorted_parts.len(),
        materials.len()
    );

    PartsAssembly {
        parts: sorted_parts,
        instances: attached,
        materials,
    }
}
