use crate::hooks::CombineHooks;
use crate::math::Real;
use crate::mesh::{weld_vertices, AttributedMesh, WeldMode};
use crate::options::PlanarMergeOptions;
use crate::planar::{retriangulate_planar_faces, PlanarRetriangulateParams};
use crate::simplify::{simplify_mesh, BoundaryConstraint, CollapsePlacement, SimplifyParams};
use indexmap::IndexSet;

/// Group ids with this bit set mark triangles that are never merged.
pub const MERGE_LOCKED_GROUP: u32 = 1 << 31;

/// Merges the nearly coplanar triangles of `mesh` into fewer triangles.
///
/// Coincident vertices are welded, then the mesh is simplified under
/// `options.tolerance`, with every change of material or grouping id kept as
/// a feature edge. If `retriangulate` is set, the remaining planar regions
/// are replaced by constrained Delaunay triangulations of their closed
/// outlines.
///
/// Triangles using a material of `options.prevent_merging_materials`, or
/// whose group id carries [`MERGE_LOCKED_GROUP`], are left untouched.
/// Returns the number of removed triangles.
pub fn merge_coplanar_faces(
    mesh: &mut AttributedMesh,
    options: &PlanarMergeOptions,
    hooks: &CombineHooks,
    retriangulate: bool,
) -> usize {
    let num_tris = mesh.num_triangles();
    if num_tris < 2 {
        return 0;
    }

    let tolerance = options.tolerance.max(Real::EPSILON);
    let mode = if mesh.num_uv_layers() > 0 {
        WeldMode::MatchAttributes
    } else {
        WeldMode::PositionOnly
    };
    let _ = weld_vertices(mesh, tolerance * 0.01, mode);

    // Merge regions are keyed by (original group, grouping id, lock). A
    // locked triangle gets a region of its own.
    let mut regions: IndexSet<(u32, u32, usize)> = IndexSet::new();
    let mut pinned = Vec::new();
    let mut merge_groups = Vec::with_capacity(mesh.num_triangles());
    for t in 0..mesh.num_triangles() {
        let group = mesh.group_ids[t];
        let locked = group & MERGE_LOCKED_GROUP != 0
            || options.prevent_merging_materials.contains(&mesh.material_ids[t]);
        let key = (group, hooks.grouping_id(mesh, t), if locked { t + 1 } else { 0 });
        merge_groups.push(regions.insert_full(key).0 as u32);
        if locked {
            pinned.extend_from_slice(&mesh.indices[t]);
        }
    }
    pinned.sort_unstable();
    pinned.dedup();
    mesh.group_ids = merge_groups;

    let params = SimplifyParams {
        target_triangle_count: 1,
        geometric_tolerance: Some(tolerance),
        boundary: BoundaryConstraint::Constrained,
        placement: CollapsePlacement::Endpoints,
        preserve_group_boundaries: true,
        pinned_vertices: pinned,
        ..SimplifyParams::default()
    };
    let _ = simplify_mesh(mesh, &params);

    if retriangulate {
        let params = PlanarRetriangulateParams {
            min_hole_area: options.min_hole_area,
            ..PlanarRetriangulateParams::from_tolerance(tolerance)
        };
        let _ = retriangulate_planar_faces(mesh, &params);
    }

    for group in &mut mesh.group_ids {
        *group = regions.get_index(*group as usize).map_or(0, |key| key.0);
    }
    if mesh.normals.is_some() {
        mesh.recompute_normals(60.0);
    }

    num_tris.saturating_sub(mesh.num_triangles())
}
