//! Generalized winding number of triangle soups.

use crate::math::{Point, Real};

/// The solid angle subtended by triangle `abc` seen from `p`, divided by
/// `4π`: the contribution of that triangle to the generalized winding number
/// at `p`.
pub fn triangle_winding_number(
    p: &Point<Real>,
    a: &Point<Real>,
    b: &Point<Real>,
    c: &Point<Real>,
) -> f64 {
    let a = (a - p).cast::<f64>();
    let b = (b - p).cast::<f64>();
    let c = (c - p).cast::<f64>();
    let la = a.norm();
    let lb = b.norm();
    let lc = c.norm();
    let numer = a.dot(&b.cross(&c));
    let denom = la * lb * lc + a.dot(&b) * lc + b.dot(&c) * la + c.dot(&a) * lb;
    2.0 * numer.atan2(denom) / (4.0 * std::f64::consts::PI)
}
