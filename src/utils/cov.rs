use crate::math::{Matrix, Point, Real};

/// The covariance matrix of `pts` around their centroid.
pub fn cov(pts: &[Point<Real>]) -> Matrix<Real> {
    center_cov(pts).1
}

/// The centroid of `pts` and their covariance matrix around it.
///
/// Part vertices can sit far from the origin, so the outer products are
/// summed in `f64` relative to the centroid. An empty set yields the origin
/// and a zero matrix.
pub fn center_cov(pts: &[Point<Real>]) -> (Point<Real>, Matrix<Real>) {
    let center = crate::utils::center(pts);
    if pts.is_empty() {
        return (center, Matrix::zeros());
    }

    let c = center.coords.cast::<f64>();
    let sum = pts.iter().fold(na::Matrix3::<f64>::zeros(), |acc, p| {
        let d = p.coords.cast::<f64>() - c;
        acc + d * d.transpose()
    });
    (center, (sum / pts.len() as f64).cast::<Real>())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn far_away_segment_has_a_single_axis() {
        let pts: Vec<_> = (0..5)
            .map(|i| Point::new(1.0e4 + i as Real, 2.0e4, -3.0e4))
            .collect();
        let (center, m) = center_cov(&pts);
        assert!((center - Point::new(1.0e4 + 2.0, 2.0e4, -3.0e4)).norm() < 1.0e-2);
        assert!((m[(0, 0)] - 2.0).abs() < 1.0e-3);
        assert!(m[(1, 1)].abs() < 1.0e-3);
        assert!(m[(0, 2)].abs() < 1.0e-3);
        assert_eq!(cov(&[]), Matrix::<Real>::zeros());
    }
}
