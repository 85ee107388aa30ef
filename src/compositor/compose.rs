use crate::assembly::{PartFlags, PartInstance, PartsAssembly};
use crate::budget::LodSourcePlan;
use crate::math::{Color, Real};
use crate::mesh::AttributedMesh;
use crate::options::{CombineOptions, DecorationHandling, LodMethod, VertexColorMode};
use crate::part_meshes::{PartMeshSet, VariantKind, VariantRef};
use crate::postprocess::MERGE_LOCKED_GROUP;

/// One output LOD being assembled.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CombinedLod {
    /// Index of this LOD.
    pub lod: usize,
    /// The method of this LOD.
    pub method: Option<LodMethod>,
    /// Triangle budget of this LOD, if any.
    pub budget: Option<usize>,
    /// The accumulated mesh; material ids index the assembly material table.
    pub mesh: AttributedMesh,
}

/// The variant an instance uses in `lod`, after the per-instance rules.
fn select_variant(
    inst: &PartInstance,
    meshes: &PartMeshSet,
    choice: VariantRef,
    lod: usize,
    method: LodMethod,
    options: &CombineOptions,
) -> Option<VariantRef> {
    let instance = &inst.instance;
    if instance.is_filtered_at(lod) {
        return None;
    }

    let mut variant = choice;
    if instance.is_decorative() && options.decoration_handling != DecorationHandling::Keep {
        if lod >= options.filter_decorative_lod || method == LodMethod::VoxWrapped {
            return None;
        }
        let approximate_from = options
            .filter_decorative_lod
            .saturating_sub(options.approximate_decorative_lod_offset);
        if options.decoration_handling == DecorationHandling::ApproximateThenRemove && lod >= approximate_from {
            variant = meshes.last_approximated().unwrap_or(variant);
        }
    }

    if instance.disable_approximation && variant.kind == VariantKind::Approximated {
        let last_source = meshes.num_variants(VariantKind::Source).saturating_sub(1);
        variant = meshes
            .last_simplified()
            .unwrap_or(VariantRef::new(VariantKind::Source, last_source));
    }

    Some(variant)
}

/// A distinct debug color for an index.
fn index_color(index: usize) -> Color {
    // Golden-ratio hue steps.
    let hue = (index as Real * 0.618_034).fract() * 6.0;
    let x = 1.0 - ((hue % 2.0) - 1.0).abs();
    let (r, g, b) = match hue as u32 {
        0 => (1.0, x, 0.0),
        1 => (x, 1.0, 0.0),
        2 => (0.0, 1.0, x),
        3 => (0.0, x, 1.0),
        4 => (x, 0.0, 1.0),
        _ => (1.0, 0.0, x),
    };
    Color::new(r, g, b, 1.0)
}

/// White for boxes, up to red for parts with 300 triangles or more.
fn triangle_count_color(num_triangles: usize) -> Color {
    let t = ((num_triangles as Real / 12.0).clamp(1.0, 25.0) / 25.0).sqrt();
    let white = Color::repeat(1.0);
    let red = Color::new(1.0, 0.0, 0.0, 1.0);
    white.lerp(&red, t)
}

/// Appends every instance of `assembly` to the mesh of output LOD `lod`.
///
/// Instances are visited in part order. Each gets the variant chosen by
/// `plan`, adjusted by the LOD filter, decoration and approximation opt-out
/// rules; the mesh is copied, handed to the pre-process hook, stripped of UVs
/// unless the LOD or the part requires them, remapped to the global material
/// table and appended once per instance transform. Triangles of parts that
/// disallow merging are tagged with [`MERGE_LOCKED_GROUP`].
pub fn compose_lod(
    lod: usize,
    plan: &LodSourcePlan,
    assembly: &PartsAssembly,
    meshes: &[PartMeshSet],
    options: &CombineOptions,
) -> CombinedLod {
    let mut result = CombinedLod {
        lod,
        method: Some(plan.method),
        budget: plan.budget,
        mesh: AttributedMesh::default(),
    };

    for inst in &assembly.instances {
        let p = inst.part_index;
        let Some(choice) = plan.choices.get(p).copied().flatten() else {
            continue;
        };
        let Some(variant) = select_variant(inst, &meshes[p], choice, lod, plan.method, options) else {
            continue;
        };
        let Some(source) = meshes[p].mesh(variant) else {
            continue;
        };

        let mut mesh = source.clone();
        if let Some(hook) = &options.hooks.instance_preprocess {
            hook.preprocess(&mut mesh, &inst.instance, lod);
        }

        let keep_uvs = options.preserve_uv_level.map_or(false, |level| lod <= level)
            || assembly.parts[p].flags.contains(PartFlags::PRESERVE_UVS)
            || (options.preserve_uvs && plan.method <= LodMethod::Simplified);
        if !keep_uvs {
            mesh.strip_uvs();
        }

        for material in &mut mesh.material_ids {
            *material = inst.material_index(*material);
        }
        mesh.subset_ids = Some(vec![inst.instance.subset_id; mesh.num_triangles()]);
        if !assembly.parts[p].flags.contains(PartFlags::ALLOW_MERGING) {
            for group in &mut mesh.group_ids {
                *group |= MERGE_LOCKED_GROUP;
            }
        }

        let color = match options.vertex_color_mode {
            VertexColorMode::None => None,
            VertexColorMode::LodIndex => Some(index_color(lod)),
            VertexColorMode::PartIndex => Some(index_color(p)),
            VertexColorMode::TriangleCount => Some(triangle_count_color(mesh.num_triangles())),
        };
        if let Some(color) = color {
            mesh.colors = Some(vec![color; mesh.num_vertices()]);
        }

        for transform in &inst.instance.transforms {
            result.mesh.append_transformed(&mesh, transform);
        }
    }

    if options.verbose {
        log::debug!(
            "Composed LOD {} ({:?}): {} triangles.",
            lod,
            plan.method,
            result.mesh.num_triangles()
        );
    }

    result
}
