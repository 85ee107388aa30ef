use super::Polygon2;
use crate::error::GeometryError;
use crate::math::{Point2, Real};
use crate::utils::sanitize_spade_point;
use spade::{ConstrainedDelaunayTriangulation, Point2 as Pt2, Triangulation};

/// Triangulates polygons with holes with a constrained Delaunay
/// triangulation.
///
/// Only the vertices of the polygons are used (no Steiner points besides the
/// ones created by splitting intersecting constraints), which gives close to
/// the fewest triangles for the given boundary. Triangles whose center lies
/// outside of the polygons (even-odd rule) are discarded.
pub fn triangulate_polygons(
    polygons: &[Polygon2],
) -> Result<(Vec<Point2<Real>>, Vec<[u32; 3]>), GeometryError> {
    let mut cdt = ConstrainedDelaunayTriangulation::<Pt2<f64>>::new();
    let mut handles = vec![];

    for poly in polygons.iter().flat_map(|p| p.loops()) {
        if poly.len() < 3 {
            continue;
        }
        handles.clear();
        for pt in poly {
            let handle = cdt
                .insert(sanitize_spade_point(pt))
                .map_err(|_| GeometryError::Triangulation("invalid polygon vertex"))?;
            handles.push(handle);
        }

        for ia in 0..handles.len() {
            let ib = (ia + 1) % handles.len();
            if handles[ia] != handles[ib] {
                let _ = cdt.add_constraint_and_split(handles[ia], handles[ib], |v| v);
            }
        }
    }

    let mut result_idx = vec![];
    let mut result_pts = vec![];
    let mut handle_to_pt_id = vec![None; cdt.num_vertices()];

    for face in cdt.inner_faces() {
        let tri_handles = face.vertices();
        let tri_pts = tri_handles.map(|v| {
            let pt = v.position();
            Point2::new(pt.x as Real, pt.y as Real)
        });
        let tri_center = Point2::from((tri_pts[0].coords + tri_pts[1].coords + tri_pts[2].coords) / 3.0);

        if !polygons.iter().any(|p| p.contains_point(&tri_center)) {
            continue;
        }

        let mut tri_idx = [0u32; 3];
        for (k, v) in tri_handles.iter().enumerate() {
            tri_idx[k] = match handle_to_pt_id[v.fix().index()] {
                Some(id) => id,
                None => {
                    let id = result_pts.len() as u32;
                    result_pts.push(tri_pts[k]);
                    handle_to_pt_id[v.fix().index()] = Some(id);
                    id
                }
            };
        }
        result_idx.push(tri_idx);
    }

    if result_idx.is_empty() {
        return Err(GeometryError::Triangulation("no triangle inside the polygons"));
    }

    Ok((result_pts, result_idx))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn square_with_hole() {
        let outer = vec![
            Point2::new(0.0, 0.0),
            Point2::new(4.0, 0.0),
            Point2::new(4.0, 4.0),
            Point2::new(0.0, 4.0),
        ];
        let hole = vec![
            Point2::new(1.0, 1.0),
            Point2::new(1.0, 3.0),
            Point2::new(3.0, 3.0),
            Point2::new(3.0, 1.0),
        ];
        let poly = Polygon2 {
            outer,
            holes: vec![hole],
        };
        let (pts, tris) = triangulate_polygons(&[poly]).unwrap();
        assert_eq!(pts.len(), 8);
        assert_eq!(tris.len(), 8);

        let area: Real = tris
            .iter()
            .map(|t| {
                let [a, b, c] = t.map(|i| pts[i as usize]);
                ((b - a).perp(&(c - a)) * 0.5).abs()
            })
            .sum();
        assert!((area - 12.0).abs() < 1.0e-4);
    }

    #[test]
    fn square_is_two_triangles() {
        let poly = Polygon2::new(vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
        ]);
        let (_, tris) = triangulate_polygons(&[poly]).unwrap();
        assert_eq!(tris.len(), 2);
    }
}
