use crate::assembly::{PartFlags, PartsAssembly};
use crate::math::Real;
use crate::options::{BudgetMethod, CombineOptions, LodMethod};
use crate::part_meshes::{PartMeshSet, VariantKind, VariantRef};
use arrayvec::ArrayVec;

/// The variant each part uses in one output LOD.
#[derive(Clone, Debug, PartialEq)]
pub struct LodSourcePlan {
    /// The method of this LOD.
    pub method: LodMethod,
    /// The variant of each part, `None` for parts without geometry.
    pub choices: Vec<Option<VariantRef>>,
    /// The triangle budget of this LOD, if any.
    pub budget: Option<usize>,
    /// Sum over non-decorative placements of the chosen variant triangle
    /// counts.
    pub estimated_triangles: usize,
}

/// The per-part state of the promotion loop.
struct PartState {
    chain: Vec<VariantRef>,
    position: usize,
    weight: Real,
}

fn uv_layers(meshes: &PartMeshSet, variant: VariantRef) -> usize {
    meshes.mesh(variant).map_or(0, |m| m.num_uv_layers())
}

/// The chain position a part starts at for the `rank`-th LOD of `method`.
///
/// A method without variants for the part falls back to the closest family
/// available, toward lower fidelity first.
fn start_position(meshes: &PartMeshSet, chain: &[VariantRef], method: LodMethod, rank: usize, base_copied: usize) -> usize {
    let find = |kind: VariantKind, index: usize| {
        let count = meshes.num_variants(kind);
        if count == 0 {
            None
        } else {
            chain.iter().position(|v| *v == VariantRef::new(kind, index.min(count - 1)))
        }
    };
    let last_source = meshes.num_variants(VariantKind::Source).saturating_sub(1);
    let position = match method {
        LodMethod::Copied | LodMethod::VoxWrapped => find(VariantKind::Source, base_copied + rank),
        LodMethod::Simplified => find(VariantKind::Simplified, rank)
            .or_else(|| find(VariantKind::Approximated, 0))
            .or_else(|| find(VariantKind::Source, last_source)),
        LodMethod::Approximated => find(VariantKind::Approximated, rank)
            .or_else(|| meshes.last_simplified().and_then(|v| find(v.kind, v.index)))
            .or_else(|| find(VariantKind::Source, last_source)),
    };
    position.unwrap_or(0)
}

/// The next position of a promoted part, if any.
///
/// The next variant of the same family is preferred; otherwise the first
/// variant of a following family with the lowest recorded average deviation
/// is taken.
fn promotion_target(meshes: &PartMeshSet, state: &PartState) -> Option<usize> {
    let current = *state.chain.get(state.position)?;
    if let Some(next) = state.chain.get(state.position + 1) {
        if next.kind == current.kind {
            return Some(state.position + 1);
        }
    }

    let crossings: ArrayVec<usize, 3> = [VariantKind::Simplified, VariantKind::Approximated]
        .into_iter()
        .filter(|kind| *kind > current.kind)
        .filter_map(|kind| state.chain.iter().position(|v| v.kind == kind))
        .collect();
    crossings.into_iter().min_by(|a, b| {
        let da = meshes.deviation(state.chain[*a]).average;
        let db = meshes.deviation(state.chain[*b]).average;
        da.total_cmp(&db).then(a.cmp(b))
    })
}

fn estimate(states: &[Option<PartState>], meshes: &[PartMeshSet], counts: &[usize]) -> usize {
    states
        .iter()
        .zip(meshes)
        .zip(counts)
        .map(|((state, meshes), count)| {
            state
                .as_ref()
                .and_then(|s| s.chain.get(s.position))
                .map_or(0, |v| meshes.num_triangles(*v) * count)
        })
        .sum()
}

/// The triangle budget of an output LOD.
fn lod_budget(
    options: &CombineOptions,
    lod: usize,
    method: LodMethod,
    coarse_rank: usize,
    previous: Option<&LodSourcePlan>,
) -> Option<usize> {
    if method == LodMethod::VoxWrapped {
        let coarse = &options.coarse;
        let cap = coarse.max_triangles_base >> coarse_rank.min(usize::BITS as usize - 1);
        let budget = match previous {
            Some(p) => {
                let base = p.budget.unwrap_or(p.estimated_triangles);
                ((base as Real * coarse.triangle_reduction_pct / 100.0) as usize).min(cap)
            }
            None => cap,
        };
        return Some(budget.max(12));
    }

    match options.budget.method {
        BudgetMethod::NoRestriction => None,
        BudgetMethod::Absolute => options.budget.absolute_budgets.get(lod).copied().filter(|b| *b > 0),
        BudgetMethod::PercentOfPrevious => {
            let pct = *options.budget.percent_of_previous.get(lod)?;
            previous.map(|p| (p.estimated_triangles as Real * pct / 100.0) as usize)
        }
    }
}

/// Chooses, for every output LOD, the variant of each part.
///
/// Each part starts at the variant of the LOD method matching the LOD rank
/// within that method, and never goes back to a more detailed variant than
/// it used in the previous LOD. While the LOD exceeds
/// `budget * promotion_multiplier`, the part with the highest
/// `triangles * placements * weight` is moved one variant down; its weight is
/// then decayed while every weight is bumped, spreading the promotions over
/// the parts. Parts whose UVs are required cannot lose them. The loop is
/// best effort: it stops after the iteration or no-progress caps, with a
/// warning.
pub fn plan_part_lods(
    assembly: &PartsAssembly,
    meshes: &[PartMeshSet],
    options: &CombineOptions,
) -> Vec<LodSourcePlan> {
    let methods = options.resolve_lod_methods();
    let counts = assembly.placement_counts();
    let budget = &options.budget;
    let mut plans: Vec<LodSourcePlan> = Vec::with_capacity(methods.len());
    let mut previous_positions: Vec<usize> = vec![0; meshes.len()];

    for (lod, method) in methods.iter().copied().enumerate() {
        let rank = methods[..lod].iter().filter(|m| **m == method).count();
        let plan_budget = lod_budget(options, lod, method, rank, plans.last());

        let mut states: Vec<Option<PartState>> = meshes
            .iter()
            .enumerate()
            .map(|(p, set)| {
                if set.is_empty() {
                    return None;
                }
                let chain = set.variants();
                let mut position = start_position(set, &chain, method, rank, options.base_copied_lod);
                if method != LodMethod::VoxWrapped {
                    position = position.max(previous_positions[p]).min(chain.len() - 1);
                }
                Some(PartState {
                    chain,
                    position,
                    weight: 1.0,
                })
            })
            .collect();

        let mut total = estimate(&states, meshes, &counts);

        let target = match (method, plan_budget) {
            (LodMethod::VoxWrapped, _) | (_, None) => None,
            (_, Some(b)) => Some(b as Real * budget.promotion_multiplier),
        };

        if let Some(target) = target {
            let uvs_required = options.preserve_uv_level.map_or(false, |level| lod <= level);
            let mut iterations = 0;
            let mut no_progress = 0;

            while total as Real > target
                && iterations < budget.max_iterations
                && no_progress < budget.max_no_progress_iterations
            {
                iterations += 1;

                let mut best: Option<(usize, usize, Real)> = None;
                for (p, state) in states.iter().enumerate() {
                    let Some(state) = state else { continue };
                    let Some(next) = promotion_target(&meshes[p], state) else {
                        continue;
                    };
                    let current = state.chain[state.position];
                    let uv_blocked = (uvs_required || assembly.parts[p].flags.contains(PartFlags::PRESERVE_UVS))
                        && uv_layers(&meshes[p], state.chain[next]) < uv_layers(&meshes[p], current);
                    if uv_blocked {
                        continue;
                    }
                    let weight = (meshes[p].num_triangles(current) * counts[p]) as Real * state.weight;
                    if best.map_or(true, |b| weight > b.2) {
                        best = Some((p, next, weight));
                    }
                }

                let Some((p, next, _)) = best else {
                    break;
                };
                if let Some(state) = &mut states[p] {
                    state.position = next;
                    state.weight *= budget.replaced_weight_decay;
                }
                for state in states.iter_mut().flatten() {
                    state.weight += budget.replaced_weight_bump;
                }

                let new_total = estimate(&states, meshes, &counts);
                if new_total < total {
                    no_progress = 0;
                } else {
                    no_progress += 1;
                }
                total = new_total;
            }

            if total as Real > target {
                log::warn!(
                    "LOD {} has {} triangles, over its budget of {} ({} promotions).",
                    lod,
                    total,
                    target,
                    iterations
                );
            } else if options.verbose {
                log::debug!("LOD {}: {} triangles after {} promotions.", lod, total, iterations);
            }
        }

        for (p, state) in states.iter().enumerate() {
            if let (Some(state), true) = (state, method != LodMethod::VoxWrapped) {
                previous_positions[p] = state.position;
            }
        }

        plans.push(LodSourcePlan {
            method,
            choices: states
                .iter()
                .map(|s| s.as_ref().and_then(|s| s.chain.get(s.position).copied()))
                .collect(),
            budget: plan_budget,
            estimated_triangles: total,
        });
    }

    plans
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::approximation::{box_mesh, DeviationMetric};
    use crate::assembly::{build_parts_assembly, InstanceList, MeshInstance};
    use crate::math::{Affine, Isometry, Point, Vector};
    use crate::mesh::AttributedMesh;
    use crate::source::StaticSource;
    use std::sync::Arc;

    /// A strip of `tris` disjoint triangles.
    fn triangles(tris: usize) -> AttributedMesh {
        let vertices = (0..tris)
            .flat_map(|i| {
                let x = i as Real;
                [Point::new(x, 0.0, 0.0), Point::new(x + 1.0, 0.0, 0.0), Point::new(x, 1.0, 0.0)]
            })
            .collect();
        let indices = (0..tris as u32).map(|i| [3 * i, 3 * i + 1, 3 * i + 2]).collect();
        AttributedMesh::new(vertices, indices)
    }

    fn synthetic_set(simplified: &[usize], approximated: &[usize]) -> PartMeshSet {
        PartMeshSet {
            source_lods: vec![triangles(1000)],
            simplified_lods: simplified.iter().map(|t| triangles(*t)).collect(),
            simplified_deviations: (0..simplified.len())
                .map(|i| DeviationMetric {
                    average: 0.1 * (i + 1) as Real,
                    max: 0.2 * (i + 1) as Real,
                })
                .collect(),
            approximated_lods: approximated.iter().map(|t| triangles(*t)).collect(),
            approximated_deviations: vec![DeviationMetric { average: 1.0, max: 1.0 }; approximated.len()],
            ..PartMeshSet::default()
        }
    }

    fn assembly(num_parts: usize) -> PartsAssembly {
        let mut list = InstanceList::new();
        for i in 0..num_parts {
            let cube = box_mesh(&Isometry::identity(), &Vector::repeat(1.0));
            list.add_instance(MeshInstance::new(
                Arc::new(StaticSource::new(format!("part{}", i), vec![cube])),
                Affine::identity(),
            ));
        }
        build_parts_assembly(&list)
    }

    fn budget_options(budgets: Vec<usize>) -> CombineOptions {
        let mut options = CombineOptions {
            num_lods: budgets.len(),
            num_copied_lods: 1,
            num_simplified_lods: budgets.len() - 1,
            num_coarse_lods: 0,
            ..CombineOptions::default()
        };
        options.budget.method = BudgetMethod::Absolute;
        options.budget.absolute_budgets = budgets;
        options
    }

    #[test]
    fn absolute_budget_is_met() {
        let assembly = assembly(2);
        let sets = vec![synthetic_set(&[400, 100, 20], &[12]), synthetic_set(&[300, 50], &[12])];
        let options = budget_options(vec![0, 200]);
        let plans = plan_part_lods(&assembly, &sets, &options);
        assert_eq!(plans.len(), 2);
        assert_eq!(plans[0].estimated_triangles, 2000);
        assert!(plans[1].estimated_triangles <= 200, "{:?}", plans[1]);
        assert_eq!(plans[1].budget, Some(200));
    }

    #[test]
    fn infeasible_budget_is_best_effort() {
        let assembly = assembly(1);
        let sets = vec![synthetic_set(&[400], &[12])];
        let options = budget_options(vec![0, 5]);
        let plans = plan_part_lods(&assembly, &sets, &options);
        assert_eq!(plans[1].estimated_triangles, 12);
        assert_eq!(
            plans[1].choices[0],
            Some(VariantRef::new(VariantKind::Approximated, 0))
        );
    }

    #[test]
    fn no_restriction_follows_lod_rank() {
        let assembly = assembly(1);
        let sets = vec![synthetic_set(&[400, 100], &[12])];
        let options = CombineOptions {
            num_lods: 4,
            num_copied_lods: 1,
            num_simplified_lods: 3,
            num_coarse_lods: 0,
            ..CombineOptions::default()
        };
        let plans = plan_part_lods(&assembly, &sets, &options);
        let tris: Vec<usize> = plans.iter().map(|p| p.estimated_triangles).collect();
        assert_eq!(tris, vec![1000, 400, 100, 100]);
    }

    #[test]
    fn voxel_budget_is_capped() {
        let assembly = assembly(1);
        let sets = vec![synthetic_set(&[400], &[12])];
        let mut options = CombineOptions {
            num_lods: 3,
            num_copied_lods: 1,
            num_simplified_lods: 1,
            num_coarse_lods: 1,
            ..CombineOptions::default()
        };
        options.coarse.max_triangles_base = 100;
        let plans = plan_part_lods(&assembly, &sets, &options);
        assert_eq!(plans[2].method, LodMethod::VoxWrapped);
        assert_eq!(plans[2].budget, Some(100));
    }
}
