use super::TaskRunner;
use crate::assembly::{build_parts_assembly, InstanceList, PartsAssembly};
use crate::budget::plan_part_lods;
use crate::collision::{combine_collision_shapes, CollisionShape};
use crate::compositor::{compose_lod, CombinedLod};
use crate::options::{CombineOptions, LodMethod};
use crate::part_meshes::{compute_all_part_mesh_sets, PartMeshSet};
use crate::postprocess::{process_lod_chain, MERGE_LOCKED_GROUP};
use crate::source::MaterialRef;
use std::collections::{BTreeMap, BTreeSet};

/// The full LOD chain of one output subset.
#[derive(Clone, Debug)]
pub struct CombinedSubAssembly {
    /// The subset id shared by the instances of this subassembly.
    pub subset_id: u32,
    /// The output LODs, from the most to the least detailed.
    pub lods: Vec<CombinedLod>,
    /// The merged collision shapes of the non-decorative instances.
    pub collision: Vec<CollisionShape>,
    /// The materials indexed by the triangle material ids of `lods`.
    pub materials: Vec<MaterialRef>,
}

/// The result of [`combine_mesh_instances`].
#[derive(Clone, Debug, Default)]
pub struct CombineResults {
    /// One entry per subset id, in increasing id order.
    pub subassemblies: Vec<CombinedSubAssembly>,
    /// The deduplicated material table of all the instances.
    pub materials: Vec<MaterialRef>,
}

/// Combines the instances of `instances` into merged LOD chains.
///
/// The stages run in sequence, each one complete before the next starts:
/// assembly, part variants, budget plan, composition, then one
/// post-processing task per subset. Failures inside a stage are logged and
/// replaced by simpler geometry; an empty input yields an empty result.
pub fn combine_mesh_instances(instances: &InstanceList, options: &CombineOptions) -> CombineResults {
    let runner = TaskRunner::new(options.parallel());

    let assembly = build_parts_assembly(instances);
    if assembly.is_empty() {
        log::warn!("Nothing to combine: the assembly has no parts.");
        return CombineResults::default();
    }

    let meshes = compute_all_part_mesh_sets(&assembly, options, &runner);
    let plans = plan_part_lods(&assembly, &meshes, options);

    // Every coarse LOD is synthesized from the composition of the first one.
    let first_coarse = plans.iter().position(|p| p.method == LodMethod::VoxWrapped);
    let lods: Vec<CombinedLod> = runner.map(&plans, |lod, plan| {
        if first_coarse.map_or(false, |first| lod > first) {
            CombinedLod {
                lod,
                method: Some(plan.method),
                budget: plan.budget,
                ..CombinedLod::default()
            }
        } else {
            compose_lod(lod, plan, &assembly, &meshes, options)
        }
    });

    let materials: Vec<MaterialRef> = assembly.materials.iter().cloned().collect();
    let subsets = split_subsets(&assembly, lods);
    let multiple = subsets.len() > 1;

    let subassemblies = runner.run_tasks(subsets, |_, (subset_id, lods)| {
        let mut lods = process_lod_chain(lods, options, &runner);
        for lod in &mut lods {
            for group in &mut lod.mesh.group_ids {
                *group &= !MERGE_LOCKED_GROUP;
            }
        }

        let subset_materials = if multiple {
            remap_used_materials(&mut lods, &materials)
        } else {
            materials.clone()
        };

        CombinedSubAssembly {
            subset_id,
            collision: subset_collision(&assembly, &meshes, subset_id),
            lods,
            materials: subset_materials,
        }
    });

    log::info!(
        "Combined {} parts into {} subassemblies: {:?} triangles.",
        assembly.parts.len(),
        subassemblies.len(),
        subassemblies
            .iter()
            .map(|s| s.lods.iter().map(|l| l.mesh.num_triangles()).collect::<Vec<_>>())
            .collect::<Vec<_>>()
    );

    CombineResults {
        subassemblies,
        materials,
    }
}

/// Splits the composed LODs by subset id, in increasing id order.
fn split_subsets(assembly: &PartsAssembly, lods: Vec<CombinedLod>) -> Vec<(u32, Vec<CombinedLod>)> {
    let ids: BTreeSet<u32> = assembly.instances.iter().map(|i| i.instance.subset_id).collect();
    if ids.len() <= 1 {
        return ids.into_iter().next().map(|id| vec![(id, lods)]).unwrap_or_default();
    }

    ids.into_iter()
        .map(|id| {
            let split = lods
                .iter()
                .map(|lod| {
                    let triangles: Vec<usize> = (0..lod.mesh.num_triangles())
                        .filter(|t| lod.mesh.subset_ids.as_ref().map_or(true, |s| s[*t] == id))
                        .collect();
                    CombinedLod {
                        lod: lod.lod,
                        method: lod.method,
                        budget: lod.budget,
                        mesh: lod.mesh.extract_triangles(&triangles),
                    }
                })
                .collect();
            (id, split)
        })
        .collect()
}

/// Restricts `materials` to the ones used by `lods` and remaps the triangle
/// material ids accordingly.
fn remap_used_materials(lods: &mut [CombinedLod], materials: &[MaterialRef]) -> Vec<MaterialRef> {
    let used: BTreeSet<u32> = lods
        .iter()
        .flat_map(|l| l.mesh.material_ids.iter().copied())
        .collect();
    let remap: BTreeMap<u32, u32> = used
        .iter()
        .enumerate()
        .map(|(new, old)| (*old, new as u32))
        .collect();
    for lod in lods {
        for material in &mut lod.mesh.material_ids {
            *material = remap.get(material).copied().unwrap_or(0);
        }
    }
    used.iter()
        .filter_map(|m| materials.get(*m as usize).cloned())
        .collect()
}

/// The merged, world-space collision shapes of the non-decorative instances
/// of a subset.
fn subset_collision(assembly: &PartsAssembly, meshes: &[PartMeshSet], subset_id: u32) -> Vec<CollisionShape> {
    let mut shapes = Vec::new();
    for inst in &assembly.instances {
        if inst.instance.subset_id != subset_id || inst.instance.is_decorative() {
            continue;
        }
        for transform in &inst.instance.transforms {
            shapes.extend(
                meshes[inst.part_index]
                    .collision
                    .iter()
                    .map(|shape| shape.transformed(transform)),
            );
        }
    }
    combine_collision_shapes(shapes)
}
