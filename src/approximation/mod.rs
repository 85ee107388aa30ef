//! Simple shape approximations of part meshes and their selection.

pub use self::deviation::{compute_deviation, DeviationMetric};
pub use self::extrusion::{swept_solid, SweptSolidParams};
pub use self::selector::{
    select_best_fitting_approximation, ApproxCandidate, ApproxSelector, ApproximateMethod,
    ApproximationResult,
};
pub use self::shapes::{
    axis_aligned_box, box_mesh, convex_hull2d, convex_hull_mesh, min_volume_swept_hull, oriented_box,
    simplified_convex_hull, swept_hull,
};

pub(crate) use self::extrusion::silhouette_polygons;

mod deviation;
mod extrusion;
mod selector;
mod shapes;
