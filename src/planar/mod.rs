//! Planar-region extraction, 2D polygon closing and constrained Delaunay
//! retriangulation.

pub use self::plane_clusters::{cluster_planes, PlaneCluster};
pub use self::polygon::{loops_self_intersect, simplify_polyline, Polygon2};
pub use self::raster::{close_polygons, ClosureParams};
pub use self::retriangulate::{
    plane_basis, planar_retriangulate_part_mesh, retriangulate_planar_faces, PlanarRetriangulateParams,
};
pub use self::triangulate::triangulate_polygons;

mod plane_clusters;
mod polygon;
mod raster;
mod retriangulate;
mod triangulate;
