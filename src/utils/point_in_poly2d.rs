use crate::math::{Point2, Real};

/// Signed area of a closed 2D polygon (positive if counter-clockwise).
pub fn signed_area2d(poly: &[Point2<Real>]) -> Real {
    let mut area = 0.0;
    for i in 0..poly.len() {
        let a = poly[i];
        let b = poly[(i + 1) % poly.len()];
        area += a.x * b.y - b.x * a.y;
    }
    area * 0.5
}

/// Tests if the given point is inside of a set of closed polygons with the
/// even-odd rule (holes are simply additional loops).
///
/// Points exactly on an edge may be classified either way.
pub fn point_in_polygons2d<'a>(
    pt: &Point2<Real>,
    loops: impl IntoIterator<Item = &'a [Point2<Real>]>,
) -> bool {
    let mut inside = false;
    for poly in loops {
        let n = poly.len();
        if n < 3 {
            continue;
        }
        let mut j = n - 1;
        for i in 0..n {
            let a = poly[i];
            let b = poly[j];
            if (a.y > pt.y) != (b.y > pt.y) {
                let x = a.x + (pt.y - a.y) * (b.x - a.x) / (b.y - a.y);
                if pt.x < x {
                    inside = !inside;
                }
            }
            j = i;
        }
    }
    inside
}
