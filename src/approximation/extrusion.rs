use crate::error::GeometryError;
use crate::math::{Point, Point2, Real, Vector};
use crate::mesh::AttributedMesh;
use crate::planar::{close_polygons, plane_basis, triangulate_polygons, ClosureParams};
use hashbrown::HashMap;

/// Parameters of [`swept_solid`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SweptSolidParams {
    /// Closing offset of the projected silhouette.
    pub merge_offset: Real,
    /// Silhouette holes smaller than this are filled.
    pub min_hole_area: Real,
    /// Tolerance of the silhouette outline simplification.
    pub simplify_tolerance: Real,
    /// Only triangles whose normal has at least this dot product with the
    /// sweep direction contribute to the silhouette.
    pub facing_threshold: Real,
    /// Maximum raster resolution of the silhouette.
    pub max_grid_cells: usize,
}

impl Default for SweptSolidParams {
    fn default() -> Self {
        Self {
            merge_offset: 0.1,
            min_hole_area: 100.0,
            simplify_tolerance: 0.25,
            facing_threshold: 0.1,
            max_grid_cells: 512,
        }
    }
}

/// Computes the 2D silhouette of `mesh` seen along `dir`, expressed in the
/// basis returned by [`plane_basis`].
pub(crate) fn silhouette_polygons(
    mesh: &AttributedMesh,
    dir: &Vector<Real>,
    facing_threshold: Real,
) -> Vec<Vec<Point2<Real>>> {
    let basis = plane_basis(dir);
    (0..mesh.num_triangles())
        .filter(|t| mesh.triangle_normal(*t).dot(dir) >= facing_threshold)
        .map(|t| {
            let tri = mesh.triangle(t);
            let mut projected: Vec<_> = tri
                .iter()
                .map(|p| Point2::new(p.coords.dot(&basis[0]), p.coords.dot(&basis[1])))
                .collect();
            projected.dedup();
            projected
        })
        .collect()
}

/// Extrudes the closed silhouette of `mesh` seen along `dir` over the extent
/// of `mesh` along `dir`.
///
/// The silhouette is the closed union of the projections of the triangles
/// facing `dir`. The result is a closed, outward-oriented mesh whose caps are
/// constrained Delaunay triangulations of the silhouette.
pub fn swept_solid(
    mesh: &AttributedMesh,
    dir: &Vector<Real>,
    params: &SweptSolidParams,
) -> Result<AttributedMesh, GeometryError> {
    if mesh.num_triangles() == 0 {
        return Err(GeometryError::EmptyMesh);
    }
    let dir = dir
        .try_normalize(Real::EPSILON)
        .ok_or(GeometryError::Degenerate)?;

    let silhouette = silhouette_polygons(mesh, &dir, params.facing_threshold);
    if silhouette.is_empty() {
        return Err(GeometryError::Degenerate);
    }

    let closure = ClosureParams {
        offset: params.merge_offset,
        min_hole_area: params.min_hole_area,
        simplify_tolerance: params.simplify_tolerance,
        max_grid_cells: params.max_grid_cells,
    };
    let polygons = close_polygons(&silhouette, &closure)?;
    let (points, cap) = triangulate_polygons(&polygons)?;

    let (min, max) = mesh
        .vertices
        .iter()
        .map(|p| p.coords.dot(&dir))
        .fold((Real::MAX, -Real::MAX), |(lo, hi), h| (lo.min(h), hi.max(h)));
    if max - min <= Real::EPSILON {
        return Err(GeometryError::Degenerate);
    }

    let basis = plane_basis(&dir);
    let lift = |p: &Point2<Real>, h: Real| Point::from(basis[0] * p.x + basis[1] * p.y + dir * h);

    let n = points.len() as u32;
    let mut vertices: Vec<Point<Real>> = points.iter().map(|p| lift(p, min)).collect();
    vertices.extend(points.iter().map(|p| lift(p, max)));

    let mut indices = Vec::with_capacity(cap.len() * 2);
    for tri in &cap {
        indices.push([tri[0] + n, tri[1] + n, tri[2] + n]);
        indices.push([tri[0], tri[2], tri[1]]);
    }

    // The cap triangulation keeps the loop vertices bit-for-bit.
    let key = |p: &Point2<Real>| (p.x.to_bits(), p.y.to_bits());
    let cap_ids: HashMap<(u32, u32), u32> = points
        .iter()
        .enumerate()
        .map(|(i, p)| (key(p), i as u32))
        .collect();

    for poly in &polygons {
        for ring in poly.loops() {
            for k in 0..ring.len() {
                let (Some(i), Some(j)) = (
                    cap_ids.get(&key(&ring[k])),
                    cap_ids.get(&key(&ring[(k + 1) % ring.len()])),
                ) else {
                    continue;
                };
                if i == j {
                    continue;
                }
                indices.push([*i, *j, *j + n]);
                indices.push([*i, *j + n, *i + n]);
            }
        }
    }

    if indices.len() < 3 {
        return Err(GeometryError::Degenerate);
    }

    Ok(AttributedMesh::new(vertices, indices))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::approximation::box_mesh;
    use crate::math::Isometry;

    /// Two boxes side by side with a narrow gap.
    fn twin_boxes() -> AttributedMesh {
        let mut mesh = box_mesh(
            &Isometry::translation(-1.05, 0.0, 0.0),
            &Vector::new(1.0, 1.0, 1.0),
        );
        mesh.append(&box_mesh(
            &Isometry::translation(1.05, 0.0, 0.0),
            &Vector::new(1.0, 1.0, 1.0),
        ));
        mesh
    }

    #[test]
    fn extrusion_closes_gaps() {
        let mesh = twin_boxes();
        let params = SweptSolidParams {
            merge_offset: 0.2,
            min_hole_area: 0.0,
            simplify_tolerance: 0.01,
            ..SweptSolidParams::default()
        };
        let solid = swept_solid(&mesh, &Vector::z(), &params).unwrap();
        assert_eq!(solid.num_triangles(), 12);
        let (volume, _) = solid.volume_and_area();
        assert!((volume - 4.1 * 2.0 * 2.0).abs() < 0.2, "{}", volume);
    }

    #[test]
    fn empty_mesh_is_rejected() {
        assert_eq!(
            swept_solid(&AttributedMesh::default(), &Vector::z(), &SweptSolidParams::default()),
            Err(GeometryError::EmptyMesh)
        );
    }
}
