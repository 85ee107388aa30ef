use super::voxel::VoxelGrid;
use crate::approximation::{axis_aligned_box, compute_deviation, silhouette_polygons, swept_solid, SweptSolidParams};
use crate::error::GeometryError;
use crate::math::{Color, Point, Point2, Real, Vector};
use crate::mesh::{AttributedMesh, MeshBvh};
use crate::options::{CoarseLodOptions, CoarseLodStrategy};
use crate::planar::{close_polygons, plane_basis, ClosureParams, Polygon2};
use crate::simplify::{simplify_mesh, BoundaryConstraint, SimplifyParams};

/// Builds the coarse LODs of `reference`, one per entry of `budgets`.
///
/// The first coarse LOD is produced by `options.strategy` and simplified to
/// its budget. Each following one re-simplifies the previous one with a
/// tolerance growing by `options.tolerance_scale` per level. A result that
/// cannot be brought under its budget is replaced by the bounding box of
/// `reference`. Every result is sorted for determinism; attributes are left
/// to [`project_attributes`].
pub fn synthesize_coarse_lods(
    reference: &AttributedMesh,
    budgets: &[usize],
    options: &CoarseLodOptions,
) -> Vec<AttributedMesh> {
    let mut results = Vec::with_capacity(budgets.len());
    if reference.is_empty() || budgets.is_empty() {
        results.resize_with(budgets.len(), AttributedMesh::default);
        return results;
    }

    let bvh = MeshBvh::new(reference);
    let detail = options.detail_size.max(0.001);
    let first = match options.strategy {
        CoarseLodStrategy::Voxel => voxel_wrap(reference, options),
        CoarseLodStrategy::SweptPlanar => {
            best_swept_solid(reference, &bvh, detail).map(|(mesh, _)| mesh).or_else(|err| {
                log::debug!("Swept coarse LOD failed ({}), using a voxel wrap.", err);
                voxel_wrap(reference, options)
            })
        }
        CoarseLodStrategy::IntersectProjections => intersect_projections(reference, options).or_else(|err| {
            log::debug!("Projection intersection failed ({}), using a voxel wrap.", err);
            voxel_wrap(reference, options)
        }),
        CoarseLodStrategy::Automatic => match best_swept_solid(reference, &bvh, detail) {
            Ok((mesh, max_deviation)) if max_deviation < 2.0 * detail => Ok(mesh),
            _ => voxel_wrap(reference, options),
        },
    };

    let mut current = match first {
        Ok(mesh) => mesh,
        Err(err) => {
            log::warn!("Coarse LOD synthesis failed ({}), using the bounding box.", err);
            AttributedMesh::default()
        }
    };
    simplify_to_budget(&mut current, budgets[0], None);
    results.push(fit_budget(current, reference, budgets[0]));

    for (k, budget) in budgets.iter().enumerate().skip(1) {
        let mut mesh = results[k - 1].clone();
        let tolerance = detail * options.tolerance_scale.powi(k as i32);
        simplify_to_budget(&mut mesh, *budget, Some(tolerance));
        results.push(fit_budget(mesh, reference, *budget));
    }

    results
}

fn simplify_to_budget(mesh: &mut AttributedMesh, budget: usize, tolerance: Option<Real>) {
    if mesh.num_triangles() <= budget {
        return;
    }
    let mut params = SimplifyParams {
        target_triangle_count: budget,
        geometric_tolerance: tolerance,
        boundary: BoundaryConstraint::Free,
        preserve_group_boundaries: false,
        ..SimplifyParams::default()
    };
    let _ = simplify_mesh(mesh, &params);
    if tolerance.is_some() && mesh.num_triangles() > budget {
        params.geometric_tolerance = None;
        let _ = simplify_mesh(mesh, &params);
    }
}

/// `mesh` if it is non-empty and within `budget`, the bounding box of
/// `reference` otherwise.
fn fit_budget(mut mesh: AttributedMesh, reference: &AttributedMesh, budget: usize) -> AttributedMesh {
    if mesh.is_empty() || mesh.num_triangles() > budget {
        log::debug!(
            "Coarse LOD has {} triangles for a budget of {}, using the bounding box.",
            mesh.num_triangles(),
            budget
        );
        mesh = axis_aligned_box(reference).unwrap_or_default();
    }
    mesh.sort_for_determinism();
    mesh
}

/// Voxel size and padding of the coarse grid of `mesh`.
fn coarse_grid(mesh: &AttributedMesh, options: &CoarseLodOptions) -> VoxelGrid {
    let aabb = mesh.aabb();
    let detail = options.detail_size.max(0.001);
    let max_dim = aabb.extents().max();
    let cell = options
        .initial_cell_size
        .min(detail * 0.5)
        .max(max_dim / options.max_grid_cells.max(8) as Real)
        .max(1.0e-4);
    let padding = (detail / cell).ceil() as usize + 2;
    VoxelGrid::new(&aabb, cell, padding)
}

/// Voxelizes `mesh`, closes gaps narrower than the detail size and extracts
/// the closed surface.
fn voxel_wrap(mesh: &AttributedMesh, options: &CoarseLodOptions) -> Result<AttributedMesh, GeometryError> {
    let mut grid = coarse_grid(mesh, options);
    log::trace!("Coarse voxel grid {:?} ({} voxels).", grid.dims(), grid.num_voxels());
    grid.voxelize_surface(mesh);
    grid.fill_inside();
    let closed = grid.close(&grid.occupancy(), options.detail_size.max(0.001));
    let wrap = grid.surface_nets(&closed);
    if wrap.is_empty() {
        return Err(GeometryError::EmptyMesh);
    }
    Ok(wrap)
}

/// The cardinal-axis swept solid of `mesh` with the smallest maximum
/// deviation, tried along Z, X then Y.
fn best_swept_solid(
    mesh: &AttributedMesh,
    reference: &MeshBvh,
    detail: Real,
) -> Result<(AttributedMesh, Real), GeometryError> {
    let params = SweptSolidParams {
        merge_offset: detail,
        min_hole_area: 4.0 * detail * detail,
        simplify_tolerance: detail * 0.25,
        ..SweptSolidParams::default()
    };

    let mut best: Option<(AttributedMesh, Real)> = None;
    let mut last_err = GeometryError::EmptyMesh;
    for dir in [Vector::z(), Vector::x(), Vector::y()] {
        match swept_solid(mesh, &dir, &params) {
            Ok(solid) => {
                let deviation = compute_deviation(&solid, reference).max;
                if best.as_ref().map_or(true, |(_, d)| deviation < *d) {
                    best = Some((solid, deviation));
                }
            }
            Err(err) => last_err = err,
        }
    }
    best.ok_or(last_err)
}

/// Voxelizes the intersection of the three cardinal-axis swept silhouettes
/// of `mesh`.
fn intersect_projections(
    mesh: &AttributedMesh,
    options: &CoarseLodOptions,
) -> Result<AttributedMesh, GeometryError> {
    let detail = options.detail_size.max(0.001);
    let closure = ClosureParams {
        offset: detail,
        min_hole_area: 4.0 * detail * detail,
        simplify_tolerance: detail * 0.25,
        ..ClosureParams::default()
    };

    let mut silhouettes: Vec<([Vector<Real>; 2], Vec<Polygon2>)> = Vec::with_capacity(3);
    for dir in [Vector::z(), Vector::x(), Vector::y()] {
        let polygons = close_polygons(&silhouette_polygons(mesh, &dir, 0.1), &closure)?;
        silhouettes.push((plane_basis(&dir), polygons));
    }

    let grid = coarse_grid(mesh, options);
    let inside_all = |pt: &Point<Real>| {
        silhouettes.iter().all(|(basis, polygons)| {
            let projected = Point2::new(pt.coords.dot(&basis[0]), pt.coords.dot(&basis[1]));
            polygons.iter().any(|p| p.contains_point(&projected))
        })
    };
    let wrap = grid.surface_nets(&grid.occupancy_from(inside_all));
    if wrap.is_empty() {
        return Err(GeometryError::EmptyMesh);
    }
    Ok(wrap)
}

/// Copies the attributes of the closest point of `reference` onto `coarse`.
///
/// Each triangle takes the material, group and subset of the reference
/// triangle closest to its centroid. Each vertex takes the UVs, colors and
/// normals interpolated at its closest reference point. Normals are
/// recomputed if the reference has none.
pub fn project_attributes(coarse: &mut AttributedMesh, reference: &AttributedMesh) {
    if coarse.is_empty() || reference.is_empty() {
        return;
    }
    let bvh = MeshBvh::new(reference);

    for t in 0..coarse.num_triangles() {
        if let Some(proj) = bvh.project_point(&coarse.triangle_centroid(t)) {
            let source = proj.triangle as usize;
            coarse.material_ids[t] = reference.material_ids[source];
            coarse.group_ids[t] = reference.group_ids[source];
            if let Some(subsets) = &reference.subset_ids {
                coarse.subset_ids.get_or_insert_with(|| vec![0; coarse.indices.len()])[t] = subsets[source];
            }
        }
    }

    let projections: Vec<_> = coarse
        .vertices
        .iter()
        .map(|v| bvh.project_point(v).map(|p| (reference.indices[p.triangle as usize], p.bcoords)))
        .collect();

    coarse.uv_layers = reference
        .uv_layers
        .iter()
        .map(|layer| {
            projections
                .iter()
                .map(|proj| {
                    let [u, v] = interpolate(proj, |i| [layer[i].x, layer[i].y]);
                    Point2::new(u, v)
                })
                .collect()
        })
        .collect();

    coarse.colors = reference.colors.as_ref().map(|colors| {
        projections
            .iter()
            .map(|proj| Color::from(interpolate::<4>(proj, |i| colors[i].into())))
            .collect()
    });

    match &reference.normals {
        Some(normals) => {
            coarse.normals = Some(
                projections
                    .iter()
                    .map(|proj| {
                        Vector::from(interpolate::<3>(proj, |i| normals[i].into()))
                            .try_normalize(Real::EPSILON)
                            .unwrap_or_else(Vector::z)
                    })
                    .collect(),
            );
        }
        None => coarse.recompute_normals(60.0),
    }
}

/// Barycentric interpolation of a per-vertex attribute at a projection.
fn interpolate<const N: usize>(
    projection: &Option<([u32; 3], [Real; 3])>,
    value: impl Fn(usize) -> [Real; N],
) -> [Real; N] {
    let mut result = [0.0; N];
    if let Some((tri, bcoords)) = projection {
        for (vid, weight) in tri.iter().zip(bcoords.iter()) {
            let v = value(*vid as usize);
            for k in 0..N {
                result[k] += v[k] * weight;
            }
        }
    }
    result
}
