use crate::approximation::{
    compute_deviation, select_best_fitting_approximation, ApproximateMethod, DeviationMetric,
};
use crate::assembly::{Part, PartFlags, PartsAssembly};
use crate::collision::CollisionShape;
use crate::math::Real;
use crate::mesh::{AttributedMesh, MeshBvh};
use crate::options::{CombineOptions, LodMethod};
use crate::pipeline::TaskRunner;
use crate::simplify::{simplify_part_mesh, PartSimplifyParams};
use crate::source::{load_part_sources, SourceRequest};

/// Approximations with at most this many triangles end the chain.
const BOX_TRIANGLES: usize = 12;

/// The family of a part mesh variant, from the most to the least faithful.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub enum VariantKind {
    /// A source LOD.
    Source,
    /// A simplified mesh.
    Simplified,
    /// A shape approximation.
    Approximated,
}

/// A reference to one mesh of a [`PartMeshSet`].
///
/// Variants are ordered by decreasing fidelity.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct VariantRef {
    /// The variant family.
    pub kind: VariantKind,
    /// Index within the family.
    pub index: usize,
}

impl VariantRef {
    /// Creates a variant reference.
    pub fn new(kind: VariantKind, index: usize) -> Self {
        Self { kind, index }
    }
}

/// Every mesh variant computed for one part.
#[derive(Clone, Debug, Default)]
pub struct PartMeshSet {
    /// Source LODs.
    pub source_lods: Vec<AttributedMesh>,
    /// Simplified meshes, by strictly decreasing triangle count.
    pub simplified_lods: Vec<AttributedMesh>,
    /// Deviation of each simplified mesh from the simplification source.
    pub simplified_deviations: Vec<DeviationMetric>,
    /// Shape approximations, by strictly decreasing triangle count.
    pub approximated_lods: Vec<AttributedMesh>,
    /// Deviation of each approximation from the simplification source.
    pub approximated_deviations: Vec<DeviationMetric>,
    /// The generator of each approximation.
    pub approximation_methods: Vec<ApproximateMethod>,
    /// Simple collision primitives, in the part space.
    pub collision: Vec<CollisionShape>,
}

impl PartMeshSet {
    /// Whether this part has no geometry.
    pub fn is_empty(&self) -> bool {
        self.source_lods.is_empty()
    }

    /// The number of variants of the given family.
    pub fn num_variants(&self, kind: VariantKind) -> usize {
        match kind {
            VariantKind::Source => self.source_lods.len(),
            VariantKind::Simplified => self.simplified_lods.len(),
            VariantKind::Approximated => self.approximated_lods.len(),
        }
    }

    /// The mesh of a variant.
    pub fn mesh(&self, variant: VariantRef) -> Option<&AttributedMesh> {
        match variant.kind {
            VariantKind::Source => self.source_lods.get(variant.index),
            VariantKind::Simplified => self.simplified_lods.get(variant.index),
            VariantKind::Approximated => self.approximated_lods.get(variant.index),
        }
    }

    /// The triangle count of a variant, 0 if it does not exist.
    pub fn num_triangles(&self, variant: VariantRef) -> usize {
        self.mesh(variant).map_or(0, |m| m.num_triangles())
    }

    /// The recorded deviation of a variant. Source LODs have none.
    pub fn deviation(&self, variant: VariantRef) -> DeviationMetric {
        match variant.kind {
            VariantKind::Source => DeviationMetric::default(),
            VariantKind::Simplified => self.simplified_deviations.get(variant.index).copied().unwrap_or_default(),
            VariantKind::Approximated => self
                .approximated_deviations
                .get(variant.index)
                .copied()
                .unwrap_or_default(),
        }
    }

    /// The last simplified mesh, if any.
    pub fn last_simplified(&self) -> Option<VariantRef> {
        self.simplified_lods
            .len()
            .checked_sub(1)
            .map(|i| VariantRef::new(VariantKind::Simplified, i))
    }

    /// The last (coarsest) approximation, if any.
    pub fn last_approximated(&self) -> Option<VariantRef> {
        self.approximated_lods
            .len()
            .checked_sub(1)
            .map(|i| VariantRef::new(VariantKind::Approximated, i))
    }

    /// All the variants, from the most to the least faithful.
    pub fn variants(&self) -> Vec<VariantRef> {
        [VariantKind::Source, VariantKind::Simplified, VariantKind::Approximated]
            .into_iter()
            .flat_map(|kind| (0..self.num_variants(kind)).map(move |i| VariantRef::new(kind, i)))
            .collect()
    }
}

/// Cost used to compare variants of different families.
fn variant_cost(deviation: &DeviationMetric, num_triangles: usize, triangle_cost: Real) -> Real {
    deviation.average * (num_triangles as Real / BOX_TRIANGLES as Real).powf(triangle_cost)
}

/// The triangle-cost exponents of the approximation levels.
///
/// The requested levels grow geometrically; the extra levels then add a
/// constant step.
pub(crate) fn approximation_triangle_costs(options: &CombineOptions) -> Vec<Real> {
    let approx = &options.approximation;
    let requested = options.num_approximated_lods();
    let mut costs: Vec<Real> = (0..requested)
        .map(|i| approx.triangle_cost_base * approx.triangle_cost_scale.powi(i as i32))
        .collect();
    let last = costs.last().copied();
    for k in 0..approx.num_extra_levels {
        let step = approx.extra_level_triangle_cost_step * (k + 1) as Real;
        costs.push(match last {
            Some(last) => last + step,
            None => approx.triangle_cost_base + step - approx.extra_level_triangle_cost_step,
        });
    }
    costs
}

/// The source LOD request of a part.
fn source_request(part: &Part, options: &CombineOptions) -> SourceRequest {
    let num_lods = (options.base_copied_lod + options.num_copied_lods)
        .max(options.simplification_source_lod + 1)
        .max(options.approximation_source_lod + 1);
    let preserve_uvs = options.preserve_uvs || part.flags.contains(PartFlags::PRESERVE_UVS);
    SourceRequest {
        num_lods,
        retriangulate_start_lod: if preserve_uvs {
            None
        } else {
            options.planar.retriangulate_source_start_lod
        },
        retriangulate_tolerance: options.planar.tolerance,
    }
}

/// Computes the source, simplified and approximated meshes of a part.
///
/// The simplified chain runs passes of increasing tolerance on the
/// simplification source LOD; the approximation chain picks the best shape
/// at increasing triangle costs and stops once a shape has 12 triangles or
/// fewer. Both chains are strictly decreasing in triangle count, simplified
/// meshes costing more than the cheapest approximation are dropped, and every
/// approximation has fewer triangles than the last simplified mesh.
pub fn compute_part_mesh_set(part: &Part, options: &CombineOptions) -> PartMeshSet {
    let sources = load_part_sources(part.source.as_ref(), &source_request(part, options));
    let mut result = PartMeshSet {
        collision: sources.collision.clone(),
        ..PartMeshSet::default()
    };
    let (Some(simplification_source), Some(approximation_source)) = (
        sources.lod(options.simplification_source_lod).cloned(),
        sources.lod(options.approximation_source_lod).cloned(),
    ) else {
        return result;
    };
    result.source_lods = sources.lods;

    let approx = &options.approximation;
    let reference = MeshBvh::new(&simplification_source);
    let preserve_uvs = options.preserve_uvs || part.flags.contains(PartFlags::PRESERVE_UVS);

    // Simplification chain.
    let num_simplified = options
        .resolve_lod_methods()
        .iter()
        .filter(|m| **m == LodMethod::Simplified)
        .count();
    let mut tolerance = approx.simplify_base_tolerance;
    let coarsest_source = result
        .source_lods
        .last()
        .map_or(simplification_source.num_triangles(), |m| m.num_triangles());
    let mut previous = coarsest_source;
    for _ in 0..num_simplified {
        let params = PartSimplifyParams {
            tolerance,
            preserve_uvs,
            preserve_salient_corners: approx.preserve_salient_corners,
            min_salient_part_dimension: approx.min_salient_part_dimension,
            ..PartSimplifyParams::default()
        };
        let simplified = simplify_part_mesh(&simplification_source, &params);
        if simplified.num_triangles() > 0 && simplified.num_triangles() < previous {
            previous = simplified.num_triangles();
            result
                .simplified_deviations
                .push(compute_deviation(&simplified, &reference));
            result.simplified_lods.push(simplified);
        }
        tolerance *= approx.simplify_tolerance_scale;
    }

    // Approximation chain.
    if part.flags.contains(PartFlags::ALLOW_APPROXIMATION) && approximation_source.num_triangles() > 0 {
        let approximation_reference = MeshBvh::new(&approximation_source);
        let mut previous = usize::MAX;
        for cost in approximation_triangle_costs(options) {
            let Some(best) = select_best_fitting_approximation(
                &approximation_source,
                &approximation_reference,
                cost,
                approx,
                part.approximation_types,
                approx.simplify_base_tolerance,
            ) else {
                break;
            };

            let num_triangles = best.mesh.num_triangles();
            if num_triangles < previous {
                previous = num_triangles;
                result
                    .approximated_deviations
                    .push(compute_deviation(&best.mesh, &reference));
                result.approximation_methods.push(best.method);
                result.approximated_lods.push(best.mesh);
            }
            if num_triangles <= BOX_TRIANGLES {
                break;
            }
        }
    }

    // Drop the simplified meshes that cost more than the cheapest
    // approximation.
    let cheapest = result
        .approximated_lods
        .iter()
        .zip(&result.approximated_deviations)
        .map(|(mesh, dev)| variant_cost(dev, mesh.num_triangles(), approx.triangle_cost_base))
        .fold(Real::INFINITY, Real::min);
    if cheapest.is_finite() {
        let mut k = 0;
        let keep: Vec<bool> = result
            .simplified_lods
            .iter()
            .zip(&result.simplified_deviations)
            .map(|(mesh, dev)| variant_cost(dev, mesh.num_triangles(), approx.triangle_cost_base) < cheapest)
            .collect();
        result.simplified_lods.retain(|_| {
            k += 1;
            keep[k - 1]
        });
        k = 0;
        result.simplified_deviations.retain(|_| {
            k += 1;
            keep[k - 1]
        });
    }

    // The merged chain must be strictly decreasing.
    let last = result
        .simplified_lods
        .last()
        .map_or(coarsest_source, |m| m.num_triangles());
    let first_kept = result
        .approximated_lods
        .iter()
        .position(|m| m.num_triangles() < last)
        .unwrap_or(result.approximated_lods.len());
    let _ = result.approximated_lods.drain(..first_kept);
    let _ = result.approximated_deviations.drain(..first_kept);
    let _ = result.approximation_methods.drain(..first_kept);

    if options.verbose {
        log::debug!(
            "Part {:?}: {} source, {:?} simplified, {:?} approximated ({:?}) triangles",
            part.key,
            result.source_lods[0].num_triangles(),
            result.simplified_lods.iter().map(|m| m.num_triangles()).collect::<Vec<_>>(),
            result.approximated_lods.iter().map(|m| m.num_triangles()).collect::<Vec<_>>(),
            result.approximation_methods,
        );
    }

    result
}

/// Computes the mesh sets of every part of `assembly`, one task per part.
pub fn compute_all_part_mesh_sets(
    assembly: &PartsAssembly,
    options: &CombineOptions,
    runner: &TaskRunner,
) -> Vec<PartMeshSet> {
    let sets = runner.map(&assembly.parts, |_, part| compute_part_mesh_set(part, options));
    log::info!(
        "Computed the mesh variants of {} parts ({} simplified, {} approximated).",
        sets.len(),
        sets.iter().map(|s| s.simplified_lods.len()).sum::<usize>(),
        sets.iter().map(|s| s.approximated_lods.len()).sum::<usize>(),
    );
    sets
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::approximation::box_mesh;
    use crate::assembly::{build_parts_assembly, InstanceList, MeshInstance};
    use crate::math::{Affine, Isometry, Point, Vector};
    use crate::source::StaticSource;
    use std::sync::Arc;

    fn uv_sphere(rings: usize, segments: usize) -> AttributedMesh {
        let mut vertices = vec![Point::new(0.0, 0.0, 1.0)];
        for r in 1..rings {
            let theta = std::f32::consts::PI * r as Real / rings as Real;
            for s in 0..segments {
                let phi = 2.0 * std::f32::consts::PI * s as Real / segments as Real;
                vertices.push(Point::new(
                    theta.sin() * phi.cos(),
                    theta.sin() * phi.sin(),
                    theta.cos(),
                ));
            }
        }
        vertices.push(Point::new(0.0, 0.0, -1.0));
        let south = (vertices.len() - 1) as u32;
        let ring = |r: usize, s: usize| (1 + (r - 1) * segments + s % segments) as u32;

        let mut indices = Vec::new();
        for s in 0..segments {
            indices.push([0, ring(1, s), ring(1, s + 1)]);
            indices.push([south, ring(rings - 1, s + 1), ring(rings - 1, s)]);
        }
        for r in 1..rings - 1 {
            for s in 0..segments {
                indices.push([ring(r, s), ring(r + 1, s), ring(r + 1, s + 1)]);
                indices.push([ring(r, s), ring(r + 1, s + 1), ring(r, s + 1)]);
            }
        }
        AttributedMesh::new(vertices, indices)
    }

    fn single_part(mesh: AttributedMesh) -> Part {
        let mut list = InstanceList::new();
        list.add_instance(MeshInstance::new(
            Arc::new(StaticSource::new("part", vec![mesh])),
            Affine::identity(),
        ));
        build_parts_assembly(&list).parts.remove(0)
    }

    #[test]
    fn chains_are_strictly_decreasing() {
        let part = single_part(uv_sphere(16, 24));
        let mut options = CombineOptions {
            num_lods: 6,
            num_copied_lods: 1,
            num_simplified_lods: 3,
            num_coarse_lods: 0,
            ..CombineOptions::default()
        };
        options.approximation.simplify_base_tolerance = 0.02;
        let set = compute_part_mesh_set(&part, &options);
        assert_eq!(set.source_lods.len(), 1);
        assert!(!set.approximated_lods.is_empty());
        assert!(set.approximated_lods.last().unwrap().num_triangles() <= 12);

        let counts: Vec<usize> = set
            .variants()
            .iter()
            .map(|v| set.num_triangles(*v))
            .collect();
        for w in counts.windows(2) {
            assert!(w[0] > w[1], "{:?}", counts);
        }
        assert_eq!(set.simplified_deviations.len(), set.simplified_lods.len());
        assert_eq!(set.approximated_deviations.len(), set.approximated_lods.len());
    }

    #[test]
    fn approximations_are_cheaper_than_the_coarsest_source() {
        // The hull of a coarse sphere has as many triangles as the sphere.
        let part = single_part(uv_sphere(8, 12));
        let set = compute_part_mesh_set(&part, &CombineOptions::default());
        let counts: Vec<usize> = set
            .variants()
            .iter()
            .map(|v| set.num_triangles(*v))
            .collect();
        assert_eq!(counts[0], 168);
        for w in counts.windows(2) {
            assert!(w[0] > w[1], "{:?}", counts);
        }
    }

    #[test]
    fn approximation_can_be_disabled() {
        let mut part = single_part(box_mesh(&Isometry::identity(), &Vector::repeat(1.0)));
        part.flags.remove(PartFlags::ALLOW_APPROXIMATION);
        let set = compute_part_mesh_set(&part, &CombineOptions::default());
        assert!(set.approximated_lods.is_empty());
    }

    #[test]
    fn extra_levels_extend_costs() {
        let options = CombineOptions {
            num_lods: 3,
            num_copied_lods: 1,
            num_simplified_lods: 0,
            num_coarse_lods: 0,
            ..CombineOptions::default()
        };
        let costs = approximation_triangle_costs(&options);
        assert_eq!(costs.len(), 12);
        assert!((costs[1] - 0.7 * 2.5).abs() < 1.0e-5);
        assert!((costs[2] - (0.7 * 2.5 + 0.25)).abs() < 1.0e-5);
    }
}
