/// Clamps a coordinate to the range spade accepts.
///
/// Magnitudes below `spade::MIN_ALLOWED_VALUE` snap to zero and magnitudes
/// above `spade::MAX_ALLOWED_VALUE` saturate.
pub fn sanitize_spade_coord(coord: f64) -> f64 {
    let abs = coord.abs();
    if abs <= spade::MIN_ALLOWED_VALUE {
        0.0
    } else if abs > spade::MAX_ALLOWED_VALUE {
        spade::MAX_ALLOWED_VALUE * coord.signum()
    } else {
        coord
    }
}

/// A polygon vertex as a spade point, with sanitized coordinates.
pub fn sanitize_spade_point(point: &crate::math::Point2<crate::math::Real>) -> spade::Point2<f64> {
    spade::Point2::new(
        sanitize_spade_coord(point.x as f64),
        sanitize_spade_coord(point.y as f64),
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::math::Point2;

    #[test]
    fn tiny_coordinates_snap_to_zero() {
        let pt = sanitize_spade_point(&Point2::new(1.0e-44, -2.5));
        assert_eq!(pt, spade::Point2::new(0.0, -2.5));
        assert_eq!(sanitize_spade_coord(-1.0e300), -spade::MAX_ALLOWED_VALUE);
    }
}
