use crate::math::{Point, Real};

/// Computes the geometric center (centroid) of a set of points.
///
/// All points are weighted equally. Returns the origin if `pts` is empty.
///
/// # Example
///
/// ```
/// use lodmerge3d::utils::center;
/// use lodmerge3d::math::Point;
///
/// let points = vec![
///     Point::new(0.0, 0.0, 0.0),
///     Point::new(4.0, 0.0, 0.0),
///     Point::new(0.0, 4.0, 0.0),
/// ];
///
/// let c = center(&points);
/// assert!((c.x - 4.0 / 3.0).abs() < 1e-6);
/// assert!((c.y - 4.0 / 3.0).abs() < 1e-6);
/// assert!(c.z.abs() < 1e-6);
/// ```
#[inline]
pub fn center(pts: &[Point<Real>]) -> Point<Real> {
    if pts.is_empty() {
        return Point::origin();
    }

    let denom = 1.0 / pts.len() as Real;
    let mut res = Point::origin();
    for pt in pts {
        res += pt.coords * denom;
    }

    res
}
