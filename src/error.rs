//! Error types reported by the geometry stages.
//!
//! None of these errors escapes [`combine_mesh_instances`](crate::combine_mesh_instances):
//! the stage owning a failed step logs it and falls back to a simpler
//! representation (the previous LOD, a box, the unprocessed mesh).

use parry3d::transformation::ConvexHullError;

/// Errors raised by individual geometry algorithms.
///
/// Every variant describes a degenerate-input or numerical failure that the
/// caller is expected to recover from by picking another representation.
///
/// # Example
///
/// ```
/// use lodmerge3d::approximation::swept_solid;
/// use lodmerge3d::mesh::AttributedMesh;
/// use lodmerge3d::GeometryError;
/// use nalgebra::Vector3;
///
/// let empty = AttributedMesh::default();
/// match swept_solid(&empty, &Vector3::z(), &Default::default()) {
///     Err(GeometryError::EmptyMesh) => { /* fall back to a box */ }
///     _ => unreachable!(),
/// }
/// ```
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// The input mesh has no triangles.
    #[error("the input mesh has no triangles")]
    EmptyMesh,

    /// All the input points are (nearly) coplanar or collinear so no volume
    /// can be enclosed.
    #[error("the input points do not span a volume")]
    Degenerate,

    /// The convex hull computation failed.
    #[error("convex hull computation failed: {0}")]
    ConvexHull(String),

    /// The constrained Delaunay triangulation rejected its input.
    #[error("planar triangulation failed: {0}")]
    Triangulation(&'static str),

    /// The 2D polygon union/closure produced no region.
    #[error("polygon union produced an empty region")]
    EmptyPolygonUnion,

    /// A result was computed but rejected by a quality check (area loss,
    /// triangle count not reduced, deviation above bound).
    #[error("result rejected: {0}")]
    Rejected(&'static str),
}

impl From<ConvexHullError> for GeometryError {
    fn from(err: ConvexHullError) -> Self {
        GeometryError::ConvexHull(err.to_string())
    }
}

/// Errors raised by a [`SourceMeshProvider`](crate::source::SourceMeshProvider).
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// The requested LOD does not exist on this source.
    #[error("source LOD {0} is not available")]
    MissingLod(usize),

    /// A LOD-set-backed instance referenced an index past the end of the set.
    #[error("LOD set index {index} is out of range (set has {len} entries)")]
    InvalidLodSetIndex {
        /// The requested index.
        index: usize,
        /// The number of entries in the set.
        len: usize,
    },

    /// The provider could not read its backing data.
    #[error("failed to read source geometry: {0}")]
    Io(String),
}
