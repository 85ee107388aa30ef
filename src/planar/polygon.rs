use crate::math::{Point2, Real};
use crate::utils::{point_in_polygons2d, signed_area2d};

/// A simple 2D polygon with holes.
///
/// The outer loop is counter-clockwise, holes are clockwise.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct Polygon2 {
    /// The outer boundary.
    pub outer: Vec<Point2<Real>>,
    /// The holes, strictly inside `outer`.
    pub holes: Vec<Vec<Point2<Real>>>,
}

impl Polygon2 {
    /// A polygon without holes.
    pub fn new(outer: Vec<Point2<Real>>) -> Self {
        Self {
            outer,
            holes: Vec::new(),
        }
    }

    /// The area of the outer loop minus the area of the holes.
    pub fn area(&self) -> Real {
        signed_area2d(&self.outer).abs()
            - self
                .holes
                .iter()
                .map(|h| signed_area2d(h).abs())
                .sum::<Real>()
    }

    /// Iterates through all the loops of this polygon, outer loop first.
    pub fn loops(&self) -> impl Iterator<Item = &[Point2<Real>]> {
        std::iter::once(&self.outer[..]).chain(self.holes.iter().map(|h| &h[..]))
    }

    /// Tests if `pt` is inside the polygon (inside the outer loop and outside
    /// every hole).
    pub fn contains_point(&self, pt: &Point2<Real>) -> bool {
        point_in_polygons2d(pt, self.loops())
    }

    /// The number of vertices of all the loops.
    pub fn num_vertices(&self) -> usize {
        self.loops().map(|l| l.len()).sum()
    }
}

/// Douglas-Peucker simplification of a polyline.
///
/// If `closed` is `true`, the polyline is treated as a closed loop (the last
/// point connects back to the first one) and the result keeps at least the
/// two points of the loop farthest from each other.
pub fn simplify_polyline(points: &[Point2<Real>], tolerance: Real, closed: bool) -> Vec<Point2<Real>> {
    if points.len() < 3 {
        return points.to_vec();
    }

    let mut keep = vec![false; points.len()];
    if closed {
        // Split the loop at the point farthest from the first one.
        let far = (1..points.len())
            .max_by(|a, b| {
                let da = (points[*a] - points[0]).norm_squared();
                let db = (points[*b] - points[0]).norm_squared();
                da.total_cmp(&db)
            })
            .unwrap_or(points.len() / 2);
        keep[0] = true;
        keep[far] = true;
        douglas_peucker(points, 0, far, tolerance, &mut keep);
        douglas_peucker_wrapping(points, far, tolerance, &mut keep);
    } else {
        keep[0] = true;
        keep[points.len() - 1] = true;
        douglas_peucker(points, 0, points.len() - 1, tolerance, &mut keep);
    }

    points
        .iter()
        .zip(keep.iter())
        .filter(|(_, k)| **k)
        .map(|(p, _)| *p)
        .collect()
}

fn douglas_peucker(points: &[Point2<Real>], first: usize, last: usize, tolerance: Real, keep: &mut [bool]) {
    if last <= first + 1 {
        return;
    }

    let (a, b) = (points[first], points[last]);
    let mut best = (first, -1.0);
    for (i, p) in points.iter().enumerate().take(last).skip(first + 1) {
        let d = segment_distance(p, &a, &b);
        if d > best.1 {
            best = (i, d);
        }
    }

    if best.1 > tolerance {
        keep[best.0] = true;
        douglas_peucker(points, first, best.0, tolerance, keep);
        douglas_peucker(points, best.0, last, tolerance, keep);
    }
}

/// Simplifies the section of a closed loop going from `start` back to index 0.
fn douglas_peucker_wrapping(points: &[Point2<Real>], start: usize, tolerance: Real, keep: &mut [bool]) {
    let mut section: Vec<Point2<Real>> = points[start..].to_vec();
    section.push(points[0]);
    let mut section_keep = vec![false; section.len()];
    douglas_peucker(&section, 0, section.len() - 1, tolerance, &mut section_keep);
    for (i, k) in section_keep.iter().enumerate().take(section.len() - 1) {
        if *k {
            keep[start + i] = true;
        }
    }
}

fn segment_distance(p: &Point2<Real>, a: &Point2<Real>, b: &Point2<Real>) -> Real {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq <= Real::EPSILON {
        return (p - a).norm();
    }
    let t = ((p - a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    (p - (a + ab * t)).norm()
}

/// Tests whether any two non-adjacent edges of the given closed loops
/// intersect (or overlap).
pub fn loops_self_intersect<'a>(loops: impl IntoIterator<Item = &'a [Point2<Real>]>) -> bool {
    let mut segments = Vec::new();
    for (loop_id, poly) in loops.into_iter().enumerate() {
        let n = poly.len();
        for i in 0..n {
            segments.push((loop_id, i, n, poly[i], poly[(i + 1) % n]));
        }
    }

    for i in 0..segments.len() {
        let (la, ia, na, a0, a1) = segments[i];
        for (lb, ib, _, b0, b1) in segments.iter().skip(i + 1) {
            if la == *lb && (ia + 1) % na == *ib || la == *lb && (ib + 1) % na == ia {
                continue;
            }
            if segments_intersect(&a0, &a1, b0, b1) {
                return true;
            }
        }
    }

    false
}

fn orient(a: &Point2<Real>, b: &Point2<Real>, c: &Point2<Real>) -> Real {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

fn segments_intersect(a0: &Point2<Real>, a1: &Point2<Real>, b0: &Point2<Real>, b1: &Point2<Real>) -> bool {
    let d1 = orient(b0, b1, a0);
    let d2 = orient(b0, b1, a1);
    let d3 = orient(a0, a1, b0);
    let d4 = orient(a0, a1, b1);

    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }

    let on_segment = |p: &Point2<Real>, q: &Point2<Real>, r: &Point2<Real>| {
        r.x >= p.x.min(q.x) && r.x <= p.x.max(q.x) && r.y >= p.y.min(q.y) && r.y <= p.y.max(q.y)
    };

    (d1 == 0.0 && on_segment(b0, b1, a0))
        || (d2 == 0.0 && on_segment(b0, b1, a1))
        || (d3 == 0.0 && on_segment(a0, a1, b0))
        || (d4 == 0.0 && on_segment(a0, a1, b1))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn collinear_points_are_removed() {
        let pts: Vec<_> = (0..=10).map(|i| Point2::new(i as Real, 0.0)).collect();
        let simplified = simplify_polyline(&pts, 0.01, false);
        assert_eq!(simplified, vec![Point2::new(0.0, 0.0), Point2::new(10.0, 0.0)]);
    }

    #[test]
    fn staircase_square_loop_simplifies_to_corners() {
        let mut pts = Vec::new();
        for i in 0..4 {
            pts.push(Point2::new(i as Real, 0.0));
        }
        for i in 0..4 {
            pts.push(Point2::new(4.0, i as Real));
        }
        for i in 0..4 {
            pts.push(Point2::new(4.0 - i as Real, 4.0));
        }
        for i in 0..4 {
            pts.push(Point2::new(0.0, 4.0 - i as Real));
        }
        let simplified = simplify_polyline(&pts, 0.1, true);
        assert_eq!(simplified.len(), 4);
        assert!((signed_area2d(&simplified) - 16.0).abs() < 1.0e-5);
    }

    #[test]
    fn bowtie_loop_self_intersects() {
        let bowtie = [
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(1.0, 0.0),
            Point2::new(0.0, 1.0),
        ];
        let square = [
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
        ];
        assert!(loops_self_intersect([&bowtie[..]]));
        assert!(!loops_self_intersect([&square[..]]));
    }
}
