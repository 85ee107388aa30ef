//! Quadric-error edge-collapse simplification.

pub use self::edge_collapse::{simplify_mesh, SimplifyStats};
pub use self::part::{simplify_part_mesh, PartSimplifyParams};
pub use self::quadric::Quadric;
pub use self::salient::find_salient_corners;

use crate::math::Real;

mod edge_collapse;
mod part;
mod quadric;
mod salient;

/// How open boundaries (and feature edges) constrain collapses.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub enum BoundaryConstraint {
    /// Boundary vertices can neither move nor be removed.
    Fixed,
    /// Boundary vertices may only collapse along boundary edges, onto other
    /// boundary vertices.
    #[default]
    Constrained,
    /// Boundaries are only protected by their constraint quadrics.
    Free,
}

/// Where the surviving vertex of a collapse is placed.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub enum CollapsePlacement {
    /// The quadric minimizer when well-defined, otherwise the best of the
    /// endpoints and the midpoint.
    #[default]
    Optimal,
    /// One of the two endpoints.
    Endpoints,
    /// The midpoint, unless an endpoint has a lower error.
    Midpoint,
}

/// Parameters of [`simplify_mesh`].
#[derive(Clone, Debug, PartialEq)]
pub struct SimplifyParams {
    /// Simplification stops once the mesh has this many triangles or less.
    pub target_triangle_count: usize,
    /// Maximum distance between the simplified surface and the input surface.
    ///
    /// `None` lets the triangle target alone drive the simplification.
    pub geometric_tolerance: Option<Real>,
    /// Constraint applied to boundary and feature edges.
    pub boundary: BoundaryConstraint,
    /// Placement of the surviving vertex.
    pub placement: CollapsePlacement,
    /// Weight of the constraint planes added along boundary edges.
    pub boundary_weight: f64,
    /// Minimum cosine between a triangle normal before and after a collapse.
    pub min_normal_dot: Real,
    /// Treat edges between triangles of different material or group as
    /// feature edges.
    pub preserve_group_boundaries: bool,
    /// Vertices that must neither move nor be removed.
    pub pinned_vertices: Vec<u32>,
}

impl Default for SimplifyParams {
    fn default() -> Self {
        Self {
            target_triangle_count: 0,
            geometric_tolerance: None,
            boundary: BoundaryConstraint::Constrained,
            placement: CollapsePlacement::Optimal,
            boundary_weight: 1000.0,
            min_normal_dot: 0.1,
            preserve_group_boundaries: true,
            pinned_vertices: Vec::new(),
        }
    }
}
