use crate::math::{Isometry, Point, Real, Vector, DIM};
use na::{Rotation3, Translation3, UnitQuaternion};

/// Computes an oriented bounding box for the given set of points.
///
/// The box axes are the eigenvectors of the point covariance matrix. Returns
/// the box pose (its center and orientation) and its half-extents along the
/// local axes.
///
/// The returned OBB is not guaranteed to be the smallest enclosing OBB,
/// though it is a good fit for elongated or rotated parts.
pub fn obb(pts: &[Point<Real>]) -> (Isometry<Real>, Vector<Real>) {
    let cov = crate::utils::cov(pts);
    let mut eigv = cov.symmetric_eigen().eigenvectors;

    if eigv.determinant() < 0.0 {
        eigv = -eigv;
    }

    let mut mins = Vector::repeat(Real::MAX);
    let mut maxs = Vector::repeat(-Real::MAX);

    for pt in pts {
        for i in 0..DIM {
            let dot = eigv.column(i).dot(&pt.coords);
            mins[i] = mins[i].min(dot);
            maxs[i] = maxs[i].max(dot);
        }
    }

    if pts.is_empty() {
        return (Isometry::identity(), Vector::zeros());
    }

    let rot = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(eigv));
    let local_center = (maxs + mins) / 2.0;

    (
        Isometry::from_parts(Translation3::from(rot * local_center), rot),
        (maxs - mins) / 2.0,
    )
}

#[cfg(test)]
mod test {
    use crate::math::{Point, Real};
    use na::{UnitQuaternion, Vector3};

    #[test]
    fn obb_recovers_rotated_box_extents() {
        let rot = UnitQuaternion::from_euler_angles(0.3, 0.2, 0.9);
        let half = Vector3::new(4.0, 1.0, 0.5);
        let mut pts = Vec::new();
        for i in 0..8 {
            let sign = Vector3::new(
                if i & 1 == 0 { -1.0 } else { 1.0 },
                if i & 2 == 0 { -1.0 } else { 1.0 },
                if i & 4 == 0 { -1.0 } else { 1.0 },
            );
            pts.push(Point::from(rot * half.component_mul(&sign)) + Vector3::new(10.0, 0.0, 0.0));
        }

        let (pose, half_extents) = super::obb(&pts);
        let mut sorted: Vec<Real> = half_extents.iter().copied().collect();
        sorted.sort_by(|a, b| a.total_cmp(b));
        assert!((sorted[0] - 0.5).abs() < 1.0e-3);
        assert!((sorted[1] - 1.0).abs() < 1.0e-3);
        assert!((sorted[2] - 4.0).abs() < 1.0e-3);
        assert!((pose.translation.vector - Vector3::new(10.0, 0.0, 0.0)).norm() < 1.0e-3);
    }
}
