use crate::math::{Point, Real, Vector};
use na::{Matrix3, Vector3};
use std::ops::{Add, AddAssign};

/// A symmetric quadric error form `Q(p) = pᵀAp + 2bᵀp + c`, stored in
/// double precision.
///
/// The quadric of a plane `n·p + d = 0` measures the squared distance of a
/// point to that plane; sums of plane quadrics measure the (weighted) sum of
/// squared distances to a set of planes.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Quadric {
    a: Matrix3<f64>,
    b: Vector3<f64>,
    c: f64,
    /// Accumulated weight of the planes.
    pub weight: f64,
}

impl Default for Quadric {
    fn default() -> Self {
        Self::zero()
    }
}

impl Quadric {
    /// The zero quadric.
    pub fn zero() -> Self {
        Self {
            a: Matrix3::zeros(),
            b: Vector3::zeros(),
            c: 0.0,
            weight: 0.0,
        }
    }

    /// The quadric of the plane with unit normal `normal` passing through
    /// `point`, scaled by `weight`.
    pub fn from_plane(normal: &Vector<Real>, point: &Point<Real>, weight: f64) -> Self {
        let n = normal.cast::<f64>();
        let d = -n.dot(&point.coords.cast::<f64>());
        Self {
            a: n * n.transpose() * weight,
            b: n * d * weight,
            c: d * d * weight,
            weight,
        }
    }

    /// Evaluates the quadric at `p`.
    pub fn evaluate(&self, p: &Point<Real>) -> f64 {
        let p = p.coords.cast::<f64>();
        (p.dot(&(self.a * p)) + 2.0 * self.b.dot(&p) + self.c).max(0.0)
    }

    /// The mean squared plane distance at `p` (the error normalized by the
    /// accumulated weight).
    pub fn mean_error(&self, p: &Point<Real>) -> f64 {
        if self.weight <= 0.0 {
            0.0
        } else {
            self.evaluate(p) / self.weight
        }
    }

    /// The point minimizing this quadric, if the system is well-conditioned.
    pub fn optimal_point(&self) -> Option<Point<Real>> {
        let det = self.a.determinant();
        let scale = self.a.norm().powi(3).max(1.0e-30);
        if det.abs() < 1.0e-9 * scale {
            return None;
        }
        self.a
            .try_inverse()
            .map(|inv| -(inv * self.b))
            .map(|p| Point::new(p.x as Real, p.y as Real, p.z as Real))
    }
}

impl Add for Quadric {
    type Output = Quadric;

    fn add(self, rhs: Quadric) -> Quadric {
        Quadric {
            a: self.a + rhs.a,
            b: self.b + rhs.b,
            c: self.c + rhs.c,
            weight: self.weight + rhs.weight,
        }
    }
}

impl AddAssign for Quadric {
    fn add_assign(&mut self, rhs: Quadric) {
        *self = *self + rhs;
    }
}

#[cfg(test)]
mod test {
    use super::Quadric;
    use crate::math::{Point, Vector};

    #[test]
    fn corner_of_three_planes_is_optimal() {
        let q = Quadric::from_plane(&Vector::x(), &Point::new(1.0, 0.0, 0.0), 1.0)
            + Quadric::from_plane(&Vector::y(), &Point::new(0.0, 2.0, 0.0), 1.0)
            + Quadric::from_plane(&Vector::z(), &Point::new(0.0, 0.0, 3.0), 1.0);
        let p = q.optimal_point().unwrap();
        assert!((p - Point::new(1.0, 2.0, 3.0)).norm() < 1.0e-5);
        assert!(q.evaluate(&p) < 1.0e-9);
        assert!((q.evaluate(&Point::new(1.0, 2.0, 4.0)) - 1.0).abs() < 1.0e-9);
    }

    #[test]
    fn planar_quadric_is_singular() {
        let q = Quadric::from_plane(&Vector::z(), &Point::origin(), 1.0)
            + Quadric::from_plane(&Vector::z(), &Point::new(3.0, 1.0, 0.0), 2.0);
        assert!(q.optimal_point().is_none());
    }
}
