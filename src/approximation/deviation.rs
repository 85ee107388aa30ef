use crate::math::{Point, Real};
use crate::mesh::{AttributedMesh, MeshBvh};

/// Point-sampled distance between an approximation and a reference surface.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct DeviationMetric {
    /// Root-mean-square distance of the samples.
    pub average: Real,
    /// Largest distance of the samples.
    pub max: Real,
}

/// Measures how far `candidate` lies from the `reference` surface.
///
/// The samples are the vertices, the triangle centroids and the edge
/// midpoints of `candidate`; each is measured to its closest point on
/// `reference`. An empty candidate or reference has zero deviation.
pub fn compute_deviation(candidate: &AttributedMesh, reference: &MeshBvh) -> DeviationMetric {
    if reference.num_triangles() == 0 {
        return DeviationMetric::default();
    }

    let mut sum_sq = 0.0f64;
    let mut max_sq: Real = 0.0;
    let mut count = 0usize;

    let mut measure = |pt: &Point<Real>| {
        if let Some(proj) = reference.project_point(pt) {
            let d_sq = proj.distance * proj.distance;
            sum_sq += d_sq as f64;
            max_sq = max_sq.max(d_sq);
            count += 1;
        }
    };

    for v in &candidate.vertices {
        measure(v);
    }

    for tri in &candidate.indices {
        let [a, b, c] = tri.map(|i| candidate.vertices[i as usize]);
        measure(&Point::from((a.coords + b.coords + c.coords) / 3.0));
        measure(&na::center(&a, &b));
        measure(&na::center(&b, &c));
        measure(&na::center(&c, &a));
    }

    if count == 0 {
        return DeviationMetric::default();
    }

    DeviationMetric {
        average: (sum_sq / count as f64).sqrt() as Real,
        max: max_sq.sqrt(),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::approximation::box_mesh;
    use crate::math::{Isometry, Vector};

    #[test]
    fn identical_meshes_do_not_deviate() {
        let cube = box_mesh(&Isometry::identity(), &Vector::repeat(1.0));
        let bvh = MeshBvh::new(&cube);
        let dev = compute_deviation(&cube, &bvh);
        assert!(dev.average < 1.0e-5);
        assert!(dev.max < 1.0e-5);
    }

    #[test]
    fn deviation_is_measured_from_the_candidate() {
        // A single triangle on a face of the reference cube: nothing of the
        // candidate is away from the cube, even if most of the cube is missing.
        let cube = box_mesh(&Isometry::identity(), &Vector::repeat(1.0));
        let patch = AttributedMesh::new(
            vec![
                Point::new(-0.5, -0.5, 1.0),
                Point::new(0.5, -0.5, 1.0),
                Point::new(0.0, 0.5, 1.0),
            ],
            vec![[0, 1, 2]],
        );
        let dev = compute_deviation(&patch, &MeshBvh::new(&cube));
        assert!(dev.max < 1.0e-5);
        let reverse = compute_deviation(&cube, &MeshBvh::new(&patch));
        assert!(reverse.max > 1.0);
    }

    #[test]
    fn scaled_box_deviation() {
        let cube = box_mesh(&Isometry::identity(), &Vector::repeat(1.0));
        let bigger = box_mesh(&Isometry::identity(), &Vector::repeat(1.5));
        let bvh = MeshBvh::new(&cube);
        let dev = compute_deviation(&bigger, &bvh);
        // The corners of the bigger box are 0.5 away along each axis.
        assert!((dev.max - 0.75f32.sqrt()).abs() < 1.0e-4);
        assert!(dev.average >= 0.5 - 1.0e-4);
        assert!(dev.average <= dev.max);
    }
}
