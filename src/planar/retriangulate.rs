use super::{close_polygons, cluster_planes, triangulate_polygons, ClosureParams, PlaneCluster};
use crate::math::{Point, Point2, Real, Vector};
use crate::mesh::{weld_vertices, AttributedMesh, WeldMode};

/// Parameters of [`retriangulate_planar_faces`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PlanarRetriangulateParams {
    /// Minimum dot product between the normals of coplanar triangles.
    pub normal_dot: Real,
    /// Maximum distance of a triangle from the plane of its neighbors.
    pub plane_tolerance: Real,
    /// Upper bound of the closing offset. Each region uses
    /// `min(sqrt(area) * 0.02, max_merge_offset)`.
    pub max_merge_offset: Real,
    /// Holes smaller than this are filled.
    pub min_hole_area: Real,
    /// Tolerance of the boundary simplification.
    pub simplify_tolerance: Real,
    /// New vertices closer than this to an original vertex of the region are
    /// snapped to it.
    pub snap_distance: Real,
    /// Maximum raster resolution along each axis.
    pub max_grid_cells: usize,
    /// A new triangulation is rejected if its area is smaller than this
    /// fraction of the original area.
    pub min_area_ratio: Real,
}

impl PlanarRetriangulateParams {
    /// Parameters scaled from a single geometric tolerance.
    pub fn from_tolerance(tolerance: Real) -> Self {
        Self {
            normal_dot: 0.99,
            plane_tolerance: tolerance * 0.05,
            max_merge_offset: tolerance,
            min_hole_area: 0.0,
            simplify_tolerance: tolerance * 0.1,
            snap_distance: tolerance * 0.1,
            max_grid_cells: 512,
            min_area_ratio: 0.5,
        }
    }
}

/// Two unit vectors forming, with `n`, a right-handed orthonormal frame.
pub fn plane_basis(n: &Vector<Real>) -> [Vector<Real>; 2] {
    let helper = if n.x.abs() < 0.57 {
        Vector::x()
    } else if n.y.abs() < 0.57 {
        Vector::y()
    } else {
        Vector::z()
    };
    let b0 = helper.cross(n).normalize();
    let b1 = n.cross(&b0);
    [b0, b1]
}

struct Replacement {
    cluster: usize,
    vertices: Vec<Point<Real>>,
    source_vertices: Vec<u32>,
    triangles: Vec<[u32; 3]>,
}

/// Replaces the triangulation of each planar region of `mesh` by a
/// constrained Delaunay triangulation of its closed, simplified outline.
///
/// Regions are computed with [`cluster_planes`]. A region is only replaced if
/// the new triangulation has fewer triangles and keeps at least
/// `params.min_area_ratio` of the original area. Failed regions keep their
/// triangles. Returns the number of replaced regions.
pub fn retriangulate_planar_faces(mesh: &mut AttributedMesh, params: &PlanarRetriangulateParams) -> usize {
    let clusters = cluster_planes(mesh, params.normal_dot, params.plane_tolerance);
    let mut replacements = Vec::new();

    for (cluster_id, cluster) in clusters.iter().enumerate() {
        if cluster.triangles.len() < 2 || cluster.flatness(mesh) > params.plane_tolerance * 2.0 {
            continue;
        }
        match retriangulate_cluster(mesh, cluster, params) {
            Ok((vertices, source_vertices, triangles)) => replacements.push(Replacement {
                cluster: cluster_id,
                vertices,
                source_vertices,
                triangles,
            }),
            Err(err) => log::trace!("planar region {} kept: {}", cluster_id, err),
        }
    }

    if replacements.is_empty() {
        return 0;
    }

    let mut replaced = vec![false; mesh.num_triangles()];
    for rep in &replacements {
        let cluster = &clusters[rep.cluster];
        let first = cluster.triangles[0];
        let material = mesh.material_ids[first];
        let group = mesh.group_ids[first];
        let subset = mesh.subset_ids.as_ref().map(|s| s[first]);

        let mut ids = Vec::with_capacity(rep.vertices.len());
        for (pt, src) in rep.vertices.iter().zip(rep.source_vertices.iter()) {
            let vid = mesh.duplicate_vertex(*src);
            mesh.vertices[vid as usize] = *pt;
            if let Some(normals) = &mut mesh.normals {
                normals[vid as usize] = cluster.normal;
            }
            ids.push(vid);
        }

        for tri in &rep.triangles {
            mesh.indices.push(tri.map(|i| ids[i as usize]));
            mesh.material_ids.push(material);
            mesh.group_ids.push(group);
            if let (Some(subsets), Some(subset)) = (&mut mesh.subset_ids, subset) {
                subsets.push(subset);
            }
            replaced.push(false);
        }
        for t in &cluster.triangles {
            replaced[*t] = true;
        }
    }

    mesh.retain_triangles(|t| !replaced[t]);
    let _ = weld_vertices(mesh, params.snap_distance * 0.01, WeldMode::MatchAttributes);
    replacements.len()
}

#[allow(clippy::type_complexity)]
fn retriangulate_cluster(
    mesh: &AttributedMesh,
    cluster: &PlaneCluster,
    params: &PlanarRetriangulateParams,
) -> Result<(Vec<Point<Real>>, Vec<u32>, Vec<[u32; 3]>), crate::GeometryError> {
    let basis = plane_basis(&cluster.normal);
    let project = |p: &Point<Real>| {
        let d = p - cluster.origin;
        Point2::new(d.dot(&basis[0]), d.dot(&basis[1]))
    };

    let triangles_2d: Vec<Vec<Point2<Real>>> = cluster
        .triangles
        .iter()
        .map(|t| mesh.triangle(*t).iter().map(project).collect())
        .collect();

    let closure = ClosureParams {
        offset: (cluster.area.sqrt() * 0.02).min(params.max_merge_offset),
        min_hole_area: params.min_hole_area,
        simplify_tolerance: params.simplify_tolerance,
        max_grid_cells: params.max_grid_cells,
    };
    let polygons = close_polygons(&triangles_2d, &closure)?;
    let (points, triangles) = triangulate_polygons(&polygons)?;

    if triangles.len() >= cluster.triangles.len() {
        return Err(crate::GeometryError::Rejected("no triangle count reduction"));
    }
    let new_area: Real = triangles
        .iter()
        .map(|t| {
            let [a, b, c] = t.map(|i| points[i as usize]);
            (b - a).perp(&(c - a)).abs() * 0.5
        })
        .sum();
    if new_area < cluster.area * params.min_area_ratio {
        return Err(crate::GeometryError::Rejected("too much area lost"));
    }

    // Snap to the nearest original vertex when close enough, otherwise lift
    // back onto the cluster plane.
    let mut originals: Vec<u32> = cluster.triangles.iter().flat_map(|t| mesh.indices[*t]).collect();
    originals.sort_unstable();
    originals.dedup();
    let projected: Vec<Point2<Real>> = originals
        .iter()
        .map(|v| project(&mesh.vertices[*v as usize]))
        .collect();

    let mut vertices = Vec::with_capacity(points.len());
    let mut sources = Vec::with_capacity(points.len());
    for pt in &points {
        let (nearest, dist) = projected
            .iter()
            .enumerate()
            .map(|(i, q)| (i, (q - pt).norm()))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .unwrap_or((0, Real::MAX));
        sources.push(originals[nearest]);
        if dist <= params.snap_distance {
            vertices.push(mesh.vertices[originals[nearest] as usize]);
        } else {
            vertices.push(cluster.origin + basis[0] * pt.x + basis[1] * pt.y);
        }
    }

    Ok((vertices, sources, triangles))
}

/// Retriangulates the planar regions of a part source mesh.
///
/// UVs and colors are dropped, coincident vertices welded, and normals
/// recomputed on the result.
pub fn planar_retriangulate_part_mesh(source: &AttributedMesh, tolerance: Real) -> AttributedMesh {
    let mut mesh = source.clone();
    mesh.strip_uvs();
    mesh.strip_colors();
    mesh.normals = None;
    let _ = weld_vertices(&mut mesh, tolerance * 0.01, WeldMode::PositionOnly);
    let params = PlanarRetriangulateParams::from_tolerance(tolerance);
    let num_replaced = retriangulate_planar_faces(&mut mesh, &params);
    log::trace!("retriangulated {} planar regions of part source", num_replaced);
    mesh.recompute_normals(60.0);
    mesh
}
