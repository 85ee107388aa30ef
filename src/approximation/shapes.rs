use crate::error::GeometryError;
use crate::math::{Isometry, Point, Point2, Real, Vector};
use crate::mesh::AttributedMesh;
use crate::simplify::{simplify_mesh, CollapsePlacement, SimplifyParams};
use crate::utils;
use na::Translation3;
use parry3d::transformation::try_convex_hull;

const MIN_HALF_EXTENT: Real = 1.0e-4;

/// Outward-oriented triangles of a box whose vertex `i` has the sign pattern
/// of the bits of `i` (bit 0 for x, bit 1 for y, bit 2 for z).
const BOX_INDICES: [[u32; 3]; 12] = [
    [0, 2, 1],
    [1, 2, 3],
    [4, 5, 6],
    [5, 7, 6],
    [0, 1, 4],
    [1, 5, 4],
    [2, 6, 3],
    [3, 6, 7],
    [0, 4, 2],
    [2, 4, 6],
    [1, 3, 5],
    [3, 7, 5],
];

/// A 12-triangle box mesh with the given pose and half-extents.
pub fn box_mesh(pose: &Isometry<Real>, half_extents: &Vector<Real>) -> AttributedMesh {
    let he = half_extents.map(|e| e.max(MIN_HALF_EXTENT));
    let vertices = (0..8)
        .map(|i| {
            let local = Point::new(
                if i & 1 == 0 { -he.x } else { he.x },
                if i & 2 == 0 { -he.y } else { he.y },
                if i & 4 == 0 { -he.z } else { he.z },
            );
            pose * local
        })
        .collect();
    AttributedMesh::new(vertices, BOX_INDICES.to_vec())
}

fn check_not_empty(mesh: &AttributedMesh) -> Result<(), GeometryError> {
    if mesh.num_triangles() == 0 || mesh.vertices.is_empty() {
        Err(GeometryError::EmptyMesh)
    } else {
        Ok(())
    }
}

/// The axis-aligned bounding box of `mesh`, as a 12-triangle mesh.
pub fn axis_aligned_box(mesh: &AttributedMesh) -> Result<AttributedMesh, GeometryError> {
    check_not_empty(mesh)?;
    let aabb = mesh.aabb();
    let pose = Isometry::from_parts(Translation3::from(aabb.center().coords), na::one());
    Ok(box_mesh(&pose, &aabb.half_extents()))
}

/// A covariance-aligned bounding box of `mesh`, as a 12-triangle mesh.
pub fn oriented_box(mesh: &AttributedMesh) -> Result<AttributedMesh, GeometryError> {
    check_not_empty(mesh)?;
    let (pose, half_extents) = utils::obb(&mesh.vertices);
    Ok(box_mesh(&pose, &half_extents))
}

/// Computes the convex hull of 2D points (Andrew's monotone chain).
///
/// The hull is counter-clockwise, without collinear points.
pub fn convex_hull2d(points: &[Point2<Real>]) -> Vec<Point2<Real>> {
    let mut pts = points.to_vec();
    pts.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    pts.dedup();
    if pts.len() < 3 {
        return pts;
    }

    let cross = |o: &Point2<Real>, a: &Point2<Real>, b: &Point2<Real>| (a - o).perp(&(b - o));
    let mut hull: Vec<Point2<Real>> = Vec::with_capacity(pts.len() * 2);
    for pass in 0..2 {
        let start = hull.len();
        let iter: Box<dyn Iterator<Item = &Point2<Real>>> = if pass == 0 {
            Box::new(pts.iter())
        } else {
            Box::new(pts.iter().rev())
        };
        for p in iter {
            while hull.len() >= start + 2
                && cross(&hull[hull.len() - 2], &hull[hull.len() - 1], p) <= 0.0
            {
                let _ = hull.pop();
            }
            hull.push(*p);
        }
        let _ = hull.pop();
    }
    hull
}

/// Extrudes a counter-clockwise convex 2D polygon, expressed in the
/// `(axis + 1, axis + 2)` coordinate plane, between `min` and `max` along the
/// cardinal `axis`.
pub(crate) fn extrude_polygon(
    polygon: &[Point2<Real>],
    cap_triangles: &[[u32; 3]],
    axis: usize,
    min: Real,
    max: Real,
) -> AttributedMesh {
    let (iu, iv) = ((axis + 1) % 3, (axis + 2) % 3);
    let n = polygon.len() as u32;
    let lift = |p: &Point2<Real>, h: Real| {
        let mut pt = Point::origin();
        pt[iu] = p.x;
        pt[iv] = p.y;
        pt[axis] = h;
        pt
    };

    let mut vertices: Vec<Point<Real>> = polygon.iter().map(|p| lift(p, min)).collect();
    vertices.extend(polygon.iter().map(|p| lift(p, max)));

    let mut indices = Vec::with_capacity(cap_triangles.len() * 2 + polygon.len() * 2);
    for tri in cap_triangles {
        indices.push([tri[0] + n, tri[1] + n, tri[2] + n]);
        indices.push([tri[0], tri[2], tri[1]]);
    }
    for i in 0..n {
        let j = (i + 1) % n;
        indices.push([i, j, j + n]);
        indices.push([i, j + n, i + n]);
    }

    AttributedMesh::new(vertices, indices)
}

/// The convex hull of the projection of `mesh` along the cardinal `axis`,
/// extruded over the extent of `mesh` along that axis.
pub fn swept_hull(mesh: &AttributedMesh, axis: usize) -> Result<AttributedMesh, GeometryError> {
    check_not_empty(mesh)?;
    let (iu, iv) = ((axis + 1) % 3, (axis + 2) % 3);
    let projected: Vec<_> = mesh.vertices.iter().map(|p| Point2::new(p[iu], p[iv])).collect();
    let hull = convex_hull2d(&projected);
    if hull.len() < 3 {
        return Err(GeometryError::Degenerate);
    }

    let aabb = mesh.aabb();
    let (min, max) = (aabb.mins[axis], aabb.maxs[axis]);
    let (min, max) = if max - min < 2.0 * MIN_HALF_EXTENT {
        let mid = (min + max) * 0.5;
        (mid - MIN_HALF_EXTENT, mid + MIN_HALF_EXTENT)
    } else {
        (min, max)
    };
    let fan: Vec<[u32; 3]> = (1..hull.len() as u32 - 1).map(|i| [0, i, i + 1]).collect();
    Ok(extrude_polygon(&hull, &fan, axis, min, max))
}

/// The smallest (by volume) of the three cardinal-axis swept hulls, and its
/// axis.
pub fn min_volume_swept_hull(mesh: &AttributedMesh) -> Result<(AttributedMesh, usize), GeometryError> {
    let mut best: Option<(AttributedMesh, usize, Real)> = None;
    let mut last_err = GeometryError::Degenerate;
    for axis in 0..3 {
        match swept_hull(mesh, axis) {
            Ok(hull) => {
                let volume = hull.volume_and_area().0.abs();
                if best.as_ref().map(|b| volume < b.2).unwrap_or(true) {
                    best = Some((hull, axis, volume));
                }
            }
            Err(err) => last_err = err,
        }
    }
    best.map(|(hull, axis, _)| (hull, axis)).ok_or(last_err)
}

/// The convex hull of the vertices of `mesh`.
pub fn convex_hull_mesh(mesh: &AttributedMesh) -> Result<AttributedMesh, GeometryError> {
    check_not_empty(mesh)?;
    let (vertices, indices) = try_convex_hull(&mesh.vertices)?;
    let hull = AttributedMesh::new(vertices, indices);
    if hull.num_triangles() < 4 || hull.volume_and_area().0.abs() <= Real::EPSILON {
        return Err(GeometryError::Degenerate);
    }
    Ok(hull)
}

/// A convex hull with fewer triangles: the convex hull is simplified within
/// `tolerance`, then the hull of the remaining vertices is taken so the
/// result stays convex.
pub fn simplified_convex_hull(mesh: &AttributedMesh, tolerance: Real) -> Result<AttributedMesh, GeometryError> {
    let mut hull = convex_hull_mesh(mesh)?;
    let params = SimplifyParams {
        target_triangle_count: 4,
        geometric_tolerance: Some(tolerance),
        placement: CollapsePlacement::Endpoints,
        ..SimplifyParams::default()
    };
    let _ = simplify_mesh(&mut hull, &params);
    convex_hull_mesh(&hull)
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    fn rotated_cube() -> AttributedMesh {
        let pose = Isometry::new(Vector::new(1.0, 2.0, 3.0), Vector::new(0.0, 0.0, 0.6));
        box_mesh(&pose, &Vector::new(2.0, 1.0, 0.5))
    }

    #[test]
    fn box_mesh_is_closed_and_outward() {
        let cube = box_mesh(&Isometry::identity(), &Vector::new(1.0, 2.0, 3.0));
        let (volume, area) = cube.volume_and_area();
        assert_relative_eq!(volume, 48.0, epsilon = 1.0e-3);
        assert_relative_eq!(area, 88.0, epsilon = 1.0e-3);
    }

    #[test]
    fn oriented_box_is_tighter_than_aabb() {
        let mesh = rotated_cube();
        let aabb = axis_aligned_box(&mesh).unwrap().volume_and_area().0;
        let obb = oriented_box(&mesh).unwrap().volume_and_area().0;
        assert_relative_eq!(obb, 8.0, epsilon = 1.0e-2);
        assert!(aabb > obb * 1.2);
    }

    #[test]
    fn swept_hull_of_box_is_box() {
        let cube = box_mesh(&Isometry::identity(), &Vector::new(1.0, 2.0, 3.0));
        for axis in 0..3 {
            let hull = swept_hull(&cube, axis).unwrap();
            assert_eq!(hull.num_triangles(), 12);
            assert_relative_eq!(hull.volume_and_area().0, 48.0, epsilon = 1.0e-3);
        }
    }

    #[test]
    fn hull2d_drops_interior_and_collinear_points() {
        let pts = [
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(2.0, 0.0),
            Point2::new(2.0, 2.0),
            Point2::new(0.0, 2.0),
            Point2::new(1.0, 1.0),
        ];
        let hull = convex_hull2d(&pts);
        assert_eq!(hull.len(), 4);
        assert!(utils::signed_area2d(&hull) > 0.0);
    }

    #[test]
    fn convex_hull_of_box() {
        let mesh = rotated_cube();
        let hull = convex_hull_mesh(&mesh).unwrap();
        assert_relative_eq!(hull.volume_and_area().0, 8.0, epsilon = 1.0e-3);
        assert_eq!(
            convex_hull_mesh(&AttributedMesh::default()),
            Err(GeometryError::EmptyMesh)
        );
    }
}
