/*!
lodmerge3d
==========

**lodmerge3d** combines many placed instances of triangle meshes into merged,
multi-resolution LOD chains. Each output LOD is assembled from per-part
variants (copied source LODs, simplified meshes, or simple shape
approximations) chosen to fit a triangle budget, then post-processed with
hidden-face removal, coplanar merging and, for the coarsest levels, a
volumetric or swept-projection wrap.

The main entry point is [`pipeline::combine_mesh_instances`].
*/

#![deny(non_camel_case_types)]
#![deny(unused_parens)]
#![deny(non_upper_case_globals)]
#![deny(unused_results)]
#![warn(missing_docs)]
#![warn(unused_imports)]
#![allow(missing_copy_implementations)]
#![allow(clippy::too_many_arguments)] // Maybe revisit this one later.
#![allow(clippy::module_inception)]
#![allow(clippy::manual_range_contains)]
#![allow(clippy::type_complexity)]

#[cfg(feature = "serde-serialize")]
#[macro_use]
extern crate serde;

pub extern crate nalgebra as na;
pub extern crate parry3d;

pub mod approximation;
pub mod assembly;
pub mod budget;
pub mod collision;
pub mod compositor;
pub mod error;
pub mod hooks;
pub mod mesh;
pub mod options;
pub mod part_meshes;
pub mod pipeline;
pub mod planar;
pub mod postprocess;
pub mod simplify;
pub mod source;
pub mod utils;

pub use crate::error::{GeometryError, SourceError};
pub use crate::options::CombineOptions;
pub use crate::pipeline::{combine_mesh_instances, CombineResults};

/// Aliases for the mathematical types used throughout this crate.
pub mod math {
    pub use na::{Affine3, Isometry3, Matrix3, Point2, Point3, Vector2, Vector3, Vector4};

    /// The scalar type used throughout this crate.
    pub type Real = f32;

    /// The default tolerance used for geometric operations.
    pub const DEFAULT_EPSILON: Real = Real::EPSILON;

    /// The dimension of the space.
    pub const DIM: usize = 3;

    /// The point type.
    pub type Point<N> = Point3<N>;

    /// The vector type.
    pub type Vector<N> = Vector3<N>;

    /// The matrix type.
    pub type Matrix<N> = Matrix3<N>;

    /// The rigid transformation type.
    pub type Isometry<N> = Isometry3<N>;

    /// The general (possibly scaled or sheared) transformation type.
    pub type Affine<N> = Affine3<N>;

    /// Linear RGBA color.
    pub type Color = Vector4<Real>;
}
