use super::{
    axis_aligned_box, compute_deviation, convex_hull_mesh, min_volume_swept_hull, oriented_box,
    simplified_convex_hull, swept_solid, DeviationMetric, SweptSolidParams,
};
use crate::error::GeometryError;
use crate::math::{Real, Vector};
use crate::mesh::{AttributedMesh, MeshBvh};
use crate::options::{ApproximationOptions, ApproximationTypes};

/// Triangle count of a box, the reference of the triangle cost.
const BOX_TRIANGLES: Real = 12.0;

/// The oriented box is only kept if it is this much smaller than the
/// axis-aligned box.
const OBB_MIN_GAIN: Real = 1.2;

/// The shape generator of an approximation candidate.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub enum ApproximateMethod {
    /// The axis-aligned bounding box.
    AxisAlignedBox,
    /// The covariance-aligned bounding box.
    OrientedBox,
    /// The smallest cardinal-axis swept convex hull.
    MinVolumeSweptHull,
    /// The convex hull.
    ConvexHull,
    /// The simplified convex hull.
    MinTriCountHull,
    /// The extruded silhouette along the given cardinal axis.
    FlattenedExtrusion(usize),
    /// The axis-aligned box, preferred over a winner of similar volume.
    OverrideAxisBox,
}

impl ApproximateMethod {
    /// A stable numeric identifier of this method.
    pub fn id(self) -> u32 {
        match self {
            ApproximateMethod::AxisAlignedBox => 0,
            ApproximateMethod::OrientedBox => 1,
            ApproximateMethod::MinVolumeSweptHull => 2,
            ApproximateMethod::ConvexHull => 3,
            ApproximateMethod::MinTriCountHull => 4,
            ApproximateMethod::FlattenedExtrusion(_) => 5,
            ApproximateMethod::OverrideAxisBox => 77,
        }
    }
}

/// A measured approximation candidate.
#[derive(Clone, Debug)]
pub struct ApproxCandidate {
    /// The generator of this candidate.
    pub method: ApproximateMethod,
    /// The candidate geometry.
    pub mesh: AttributedMesh,
    /// Deviation from the reference surface.
    pub deviation: DeviationMetric,
    /// Enclosed volume.
    pub volume: Real,
    /// Selection cost; infinite when the deviation bound is exceeded.
    pub cost: Real,
}

/// Measures approximation candidates against a reference surface and picks
/// the cheapest one.
///
/// The cost of a candidate is
/// `deviation.average * (triangle_count / 12) ^ triangle_cost`. Candidates
/// whose max deviation exceeds the bound get an infinite cost; ties are won by
/// the candidate added first.
pub struct ApproxSelector<'a> {
    reference: &'a MeshBvh,
    triangle_cost: Real,
    max_deviation: Option<Real>,
    candidates: Vec<ApproxCandidate>,
}

impl<'a> ApproxSelector<'a> {
    /// Creates an empty selector.
    pub fn new(reference: &'a MeshBvh, triangle_cost: Real, max_deviation: Option<Real>) -> Self {
        Self {
            reference,
            triangle_cost,
            max_deviation,
            candidates: Vec::new(),
        }
    }

    /// Measures `mesh` and adds it to the candidates.
    pub fn add_candidate(&mut self, method: ApproximateMethod, mesh: AttributedMesh) -> &ApproxCandidate {
        let deviation = compute_deviation(&mesh, self.reference);
        let volume = mesh.volume_and_area().0;
        let within_bound = self.max_deviation.map_or(true, |bound| deviation.max <= bound);
        let cost = if within_bound {
            let ratio = mesh.num_triangles() as Real / BOX_TRIANGLES;
            deviation.average * ratio.powf(self.triangle_cost)
        } else {
            Real::INFINITY
        };

        self.candidates.push(ApproxCandidate {
            method,
            mesh,
            deviation,
            volume,
            cost,
        });
        &self.candidates[self.candidates.len() - 1]
    }

    /// The candidates, in generation order.
    pub fn candidates(&self) -> &[ApproxCandidate] {
        &self.candidates
    }

    /// The cheapest candidate within the deviation bound, if any.
    pub fn select_best(&self) -> Option<&ApproxCandidate> {
        let mut best: Option<&ApproxCandidate> = None;
        for candidate in self.candidates.iter().filter(|c| c.cost.is_finite()) {
            if best.map_or(true, |b| candidate.cost < b.cost) {
                best = Some(candidate);
            }
        }
        best
    }

    fn find(&self, method: ApproximateMethod) -> Option<&ApproxCandidate> {
        self.candidates.iter().find(|c| c.method == method)
    }
}

/// The winner of [`select_best_fitting_approximation`].
#[derive(Clone, Debug)]
pub struct ApproximationResult {
    /// The generator of the selected shape.
    pub method: ApproximateMethod,
    /// The selected shape.
    pub mesh: AttributedMesh,
    /// Its deviation from the reference surface.
    pub deviation: DeviationMetric,
}

fn push_candidate(
    selector: &mut ApproxSelector,
    method: ApproximateMethod,
    mesh: Result<AttributedMesh, GeometryError>,
) {
    match mesh {
        Ok(mesh) => {
            let _ = selector.add_candidate(method, mesh);
        }
        Err(err) => log::debug!("Approximation {:?} failed: {}", method, err),
    }
}

/// Generates every allowed shape approximation of `source` and returns the
/// cheapest one at the given triangle cost exponent.
///
/// `reference` is the surface the deviations are measured against;
/// `tolerance` drives the simplified hull and the silhouette outlines. If the
/// axis-aligned box is allowed and its volume is close enough to the winner's
/// (see [`ApproximationOptions::box_preference_pct_low`]), the box is
/// returned instead. Returns `None` if `source` is empty or if no candidate
/// satisfies the deviation bound.
pub fn select_best_fitting_approximation(
    source: &AttributedMesh,
    reference: &MeshBvh,
    triangle_cost: Real,
    options: &ApproximationOptions,
    types: ApproximationTypes,
    tolerance: Real,
) -> Option<ApproximationResult> {
    if source.num_triangles() == 0 {
        return None;
    }

    let types = types.effective();
    let mut selector = ApproxSelector::new(reference, triangle_cost, options.max_allowable_deviation);

    let aabb = axis_aligned_box(source);
    let aabb_volume = aabb.as_ref().map(|m| m.volume_and_area().0).ok();
    if types.contains(ApproximationTypes::AXIS_ALIGNED_BOX) {
        push_candidate(&mut selector, ApproximateMethod::AxisAlignedBox, aabb.clone());
    }

    if types.contains(ApproximationTypes::ORIENTED_BOX) {
        let obb = oriented_box(source).map(|obb| {
            let obb_volume = obb.volume_and_area().0;
            match (&aabb, aabb_volume) {
                (Ok(aabb), Some(aabb_volume)) if aabb_volume < OBB_MIN_GAIN * obb_volume => aabb.clone(),
                _ => obb,
            }
        });
        push_candidate(&mut selector, ApproximateMethod::OrientedBox, obb);
    }

    if types.contains(ApproximationTypes::SWEPT_HULL) {
        let hull = min_volume_swept_hull(source).map(|(hull, _)| hull);
        push_candidate(&mut selector, ApproximateMethod::MinVolumeSweptHull, hull);
    }

    if types.contains(ApproximationTypes::CONVEX_HULL) {
        push_candidate(&mut selector, ApproximateMethod::ConvexHull, convex_hull_mesh(source));
        push_candidate(
            &mut selector,
            ApproximateMethod::MinTriCountHull,
            simplified_convex_hull(source, tolerance),
        );
    }

    if types.contains(ApproximationTypes::SWEPT_PROJECTION) {
        let params = SweptSolidParams {
            merge_offset: options.extrusion_merge_offset,
            min_hole_area: options.extrusion_min_hole_area,
            simplify_tolerance: tolerance,
            ..SweptSolidParams::default()
        };
        for axis in 0..3 {
            let dir = Vector::ith(axis, 1.0);
            push_candidate(
                &mut selector,
                ApproximateMethod::FlattenedExtrusion(axis),
                swept_solid(source, &dir, &params),
            );
        }
    }

    let best = selector.select_best()?;

    if best.method != ApproximateMethod::AxisAlignedBox && best.volume > 0.0 {
        if let Some(aabb) = selector
            .find(ApproximateMethod::AxisAlignedBox)
            .filter(|c| c.cost.is_finite())
        {
            let pct = if best.mesh.num_triangles() <= BOX_TRIANGLES as usize {
                options.box_preference_pct_low
            } else {
                options.box_preference_pct_high
            };
            if aabb.volume / best.volume < 1.0 + pct / 100.0 {
                return Some(ApproximationResult {
                    method: ApproximateMethod::OverrideAxisBox,
                    mesh: aabb.mesh.clone(),
                    deviation: aabb.deviation,
                });
            }
        }
    }

    Some(ApproximationResult {
        method: best.method,
        mesh: best.mesh.clone(),
        deviation: best.deviation,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::approximation::box_mesh;
    use crate::math::{Isometry, Point};

    /// An L-shaped prism: two boxes sharing a corner region.
    fn l_shape() -> AttributedMesh {
        let mut mesh = box_mesh(
            &Isometry::translation(2.0, 0.5, 0.5),
            &Vector::new(2.0, 0.5, 0.5),
        );
        mesh.append(&box_mesh(
            &Isometry::translation(0.5, 2.0, 0.5),
            &Vector::new(0.5, 2.0, 0.5),
        ));
        mesh
    }

    #[test]
    fn bounded_candidates_are_never_selected() {
        let cube = box_mesh(&Isometry::identity(), &Vector::repeat(1.0));
        let bvh = MeshBvh::new(&cube);
        let mut selector = ApproxSelector::new(&bvh, 1.0, Some(0.1));
        let _ = selector.add_candidate(
            ApproximateMethod::AxisAlignedBox,
            box_mesh(&Isometry::identity(), &Vector::repeat(2.0)),
        );
        assert!(selector.select_best().is_none());

        let _ = selector.add_candidate(ApproximateMethod::ConvexHull, cube.clone());
        let best = selector.select_best().unwrap();
        assert_eq!(best.method, ApproximateMethod::ConvexHull);
        assert!(best.deviation.max <= 0.1);
    }

    #[test]
    fn ties_go_to_first_candidate() {
        let cube = box_mesh(&Isometry::identity(), &Vector::repeat(1.0));
        let bvh = MeshBvh::new(&cube);
        let mut selector = ApproxSelector::new(&bvh, 1.0, None);
        let _ = selector.add_candidate(ApproximateMethod::OrientedBox, cube.clone());
        let _ = selector.add_candidate(ApproximateMethod::AxisAlignedBox, cube.clone());
        assert_eq!(selector.select_best().unwrap().method, ApproximateMethod::OrientedBox);
        assert_eq!(selector.candidates().len(), 2);
    }

    #[test]
    fn box_only_constraint() {
        let mesh = l_shape();
        let bvh = MeshBvh::new(&mesh);
        let result = select_best_fitting_approximation(
            &mesh,
            &bvh,
            0.7,
            &ApproximationOptions::default(),
            ApproximationTypes::AXIS_ALIGNED_BOX,
            0.1,
        )
        .unwrap();
        assert_eq!(result.method, ApproximateMethod::AxisAlignedBox);
        assert_eq!(result.mesh.num_triangles(), 12);
        let aabb = result.mesh.aabb();
        assert!((aabb.mins - Point::origin()).norm() < 1.0e-5);
        assert!((aabb.maxs - Point::new(4.0, 4.0, 1.0)).norm() < 1.0e-5);
    }

    #[test]
    fn high_triangle_cost_prefers_boxes() {
        let mesh = l_shape();
        let bvh = MeshBvh::new(&mesh);
        let options = ApproximationOptions::default();
        let result =
            select_best_fitting_approximation(&mesh, &bvh, 100.0, &options, ApproximationTypes::all(), 0.1)
                .unwrap();
        assert!(result.mesh.num_triangles() <= 12);
    }

    #[test]
    fn empty_source_has_no_approximation() {
        let empty = AttributedMesh::default();
        let bvh = MeshBvh::new(&empty);
        assert!(select_best_fitting_approximation(
            &empty,
            &bvh,
            1.0,
            &ApproximationOptions::default(),
            ApproximationTypes::all(),
            0.1
        )
        .is_none());
    }

    #[test]
    fn method_ids_are_stable() {
        assert_eq!(ApproximateMethod::AxisAlignedBox.id(), 0);
        assert_eq!(ApproximateMethod::FlattenedExtrusion(2).id(), 5);
        assert_eq!(ApproximateMethod::OverrideAxisBox.id(), 77);
    }
}
