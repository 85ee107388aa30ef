use crate::math::{Real, Vector};

/// The six cardinal directions `±X`, `±Y`, `±Z`.
pub fn cardinal_directions() -> [Vector<Real>; 6] {
    [
        Vector::x(),
        -Vector::x(),
        Vector::y(),
        -Vector::y(),
        Vector::z(),
        -Vector::z(),
    ]
}

/// Generates `n` unit directions evenly spread over the sphere with a
/// spherical Fibonacci lattice.
pub fn spherical_fibonacci(n: usize) -> Vec<Vector<Real>> {
    let golden_angle = std::f64::consts::PI * (3.0 - 5.0f64.sqrt());
    (0..n)
        .map(|i| {
            let z = 1.0 - (2.0 * i as f64 + 1.0) / n as f64;
            let r = (1.0 - z * z).max(0.0).sqrt();
            let phi = golden_angle * i as f64;
            Vector::new((r * phi.cos()) as Real, (r * phi.sin()) as Real, z as Real)
        })
        .collect()
}
