use super::{merge_coplanar_faces, project_attributes, remove_hidden_faces, synthesize_coarse_lods};
use crate::compositor::CombinedLod;
use crate::options::{CombineOptions, LodMethod};
use crate::pipeline::TaskRunner;

/// Post-processes the composed LODs of one subset.
///
/// The stages run in order, each one finishing before the next starts:
///
/// 1. Each LOD below the coarse band gets hidden-face removal (from
///    `hidden_removal.start_lod` on) and the coplanar merge (from
///    `planar.merge_start_lod` on, past the UV-preserving LODs). The first
///    coarse LOD, which holds the full-detail composition, only gets
///    hidden-face removal.
/// 2. The coarse LODs are synthesized from that hidden-reduced mesh and
///    receive its attributes.
/// 3. A LOD with more triangles than its predecessor is replaced by a copy of
///    the predecessor.
pub fn process_lod_chain(
    mut lods: Vec<CombinedLod>,
    options: &CombineOptions,
    runner: &TaskRunner,
) -> Vec<CombinedLod> {
    let first_coarse = lods.iter().position(|l| l.method == Some(LodMethod::VoxWrapped));
    let coarse_start = first_coarse.map(|i| lods[i].lod);

    runner.for_each_mut(&mut lods, |_, lod| {
        let index = lod.lod;
        let is_coarse_reference = Some(index) == coarse_start;
        if coarse_start.map_or(false, |start| index > start) {
            return;
        }

        let hidden = &options.hidden_removal;
        if hidden.enabled && (index >= hidden.start_lod || is_coarse_reference) {
            let _ = remove_hidden_faces(&mut lod.mesh, hidden, runner);
        }

        let planar = &options.planar;
        let uv_locked = options.preserve_uv_level.map_or(false, |level| index <= level);
        if !is_coarse_reference && planar.merge_coplanar && index >= planar.merge_start_lod && !uv_locked {
            let retriangulate = planar.retriangulate_start_lod.map_or(false, |start| index >= start);
            let removed = merge_coplanar_faces(&mut lod.mesh, planar, &options.hooks, retriangulate);
            if options.verbose {
                log::debug!("LOD {}: coplanar merge removed {} triangles.", index, removed);
            }
        }
    });

    if let Some(first) = first_coarse {
        let reference = std::mem::take(&mut lods[first].mesh);
        let budgets: Vec<usize> = lods[first..]
            .iter()
            .map(|l| l.budget.unwrap_or(options.coarse.max_triangles_base))
            .collect();
        let coarse = synthesize_coarse_lods(&reference, &budgets, &options.coarse);
        for (lod, mut mesh) in lods[first..].iter_mut().zip(coarse) {
            project_attributes(&mut mesh, &reference);
            lod.mesh = mesh;
        }
    }

    for i in 1..lods.len() {
        let (head, tail) = lods.split_at_mut(i);
        let previous = &head[i - 1];
        if tail[0].mesh.num_triangles() > previous.mesh.num_triangles() {
            log::debug!(
                "LOD {} has more triangles than LOD {} ({} > {}), using LOD {}.",
                tail[0].lod,
                previous.lod,
                tail[0].mesh.num_triangles(),
                previous.mesh.num_triangles(),
                previous.lod
            );
            tail[0].mesh = previous.mesh.clone();
        }
    }

    lods
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::approximation::box_mesh;
    use crate::math::{Isometry, Vector};
    use crate::mesh::AttributedMesh;

    fn lod(lod: usize, method: LodMethod, mesh: AttributedMesh, budget: Option<usize>) -> CombinedLod {
        CombinedLod {
            lod,
            method: Some(method),
            budget,
            mesh,
        }
    }

    #[test]
    fn chain_is_monotonic_and_coarse_lods_fit() {
        let mut detailed = box_mesh(&Isometry::identity(), &Vector::repeat(2.0));
        detailed.append(&box_mesh(&Isometry::identity(), &Vector::repeat(1.0)));
        detailed.append(&box_mesh(&Isometry::translation(6.0, 0.0, 0.0), &Vector::repeat(1.0)));
        let lods = vec![
            lod(0, LodMethod::Copied, detailed.clone(), None),
            lod(1, LodMethod::Copied, detailed.clone(), None),
            lod(2, LodMethod::VoxWrapped, detailed.clone(), Some(100)),
            lod(3, LodMethod::VoxWrapped, AttributedMesh::default(), Some(50)),
        ];
        let mut options = CombineOptions::default();
        options.hidden_removal.num_directions = 16;
        options.coarse.max_grid_cells = 32;
        let result = process_lod_chain(lods, &options, &TaskRunner::sequential());

        assert_eq!(result.len(), 4);
        // LOD 0 is untouched, LOD 1 lost the enclosed box.
        assert_eq!(result[0].mesh.num_triangles(), 36);
        assert_eq!(result[1].mesh.num_triangles(), 24);
        assert!(result[2].mesh.num_triangles() <= 24);
        assert!(result[3].mesh.num_triangles() <= 50);
        for pair in result.windows(2) {
            assert!(pair[1].mesh.num_triangles() <= pair[0].mesh.num_triangles());
        }
    }
}
