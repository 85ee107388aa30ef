use crate::math::{Affine, Isometry, Matrix, Point, Real, Vector, DIM};
use na::{Rotation3, Translation3, UnitQuaternion};

/// A box with an arbitrary orientation.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct OrientedBox {
    /// Center and orientation of the box.
    pub pose: Isometry<Real>,
    /// Half side lengths along the local axes.
    pub half_extents: Vector<Real>,
}

impl OrientedBox {
    /// Creates a box from its pose and half-extents.
    pub fn new(pose: Isometry<Real>, half_extents: Vector<Real>) -> Self {
        Self { pose, half_extents }
    }

    /// Volume of this box.
    pub fn volume(&self) -> Real {
        8.0 * self.half_extents.x * self.half_extents.y * self.half_extents.z
    }

    /// Volume of this box with every face moved outward by `offset` (inward
    /// if negative).
    pub fn offset_volume(&self, offset: Real) -> Real {
        let he = self.half_extents.map(|e| (e + offset).max(0.0));
        8.0 * he.x * he.y * he.z
    }

    /// The `i`-th local axis, in world space.
    pub fn axis(&self, i: usize) -> Vector<Real> {
        self.pose.rotation * Vector::ith(i, 1.0)
    }

    /// The eight corners of this box.
    pub fn vertices(&self) -> [Point<Real>; 8] {
        let he = self.half_extents;
        std::array::from_fn(|i| {
            let local = Point::new(
                if i & 1 == 0 { -he.x } else { he.x },
                if i & 2 == 0 { -he.y } else { he.y },
                if i & 4 == 0 { -he.z } else { he.z },
            );
            self.pose * local
        })
    }

    /// This box after applying `transform`.
    ///
    /// A sheared box is replaced by the box spanned by the orthonormalized
    /// images of its axes.
    pub fn transformed(&self, transform: &Affine<Real>) -> Self {
        let linear: Matrix<Real> = transform.matrix().fixed_view::<3, 3>(0, 0).into_owned();
        let center = transform * Point::from(self.pose.translation.vector);

        let mut axes = [Vector::zeros(); DIM];
        let mut half_extents = Vector::zeros();
        for i in 0..DIM {
            let image = linear * self.axis(i) * self.half_extents[i];
            half_extents[i] = image.norm();
            axes[i] = image;
        }

        // Gram-Schmidt, falling back to the untransformed axes for collapsed
        // directions.
        for i in 0..DIM {
            let mut axis = axes[i];
            for j in 0..i {
                axis -= axes[j] * axes[j].dot(&axis);
            }
            axes[i] = axis
                .try_normalize(Real::EPSILON)
                .unwrap_or_else(|| self.axis(i));
        }
        let mut basis = Matrix::from_columns(&axes);
        if basis.determinant() < 0.0 {
            basis.set_column(2, &-axes[2]);
        }

        let rotation = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(basis));
        Self {
            pose: Isometry::from_parts(Translation3::from(center.coords), rotation),
            half_extents,
        }
    }

    /// The smallest box with the orientation of `self` containing both
    /// `self` and `other`.
    pub fn merged_in_frame(&self, other: &OrientedBox) -> OrientedBox {
        let inv = self.pose.inverse();
        let mut mins = Vector::repeat(Real::MAX);
        let mut maxs = Vector::repeat(-Real::MAX);
        for pt in self.vertices().iter().chain(other.vertices().iter()) {
            let local = inv * pt;
            mins = mins.inf(&local.coords);
            maxs = maxs.sup(&local.coords);
        }
        let local_center = (mins + maxs) * 0.5;
        let center = self.pose * Point::from(local_center);
        OrientedBox {
            pose: Isometry::from_parts(Translation3::from(center.coords), self.pose.rotation),
            half_extents: (maxs - mins) * 0.5,
        }
    }
}

/// A simple collision primitive.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub enum CollisionShape {
    /// An oriented box.
    Box(OrientedBox),
    /// A sphere.
    Sphere {
        /// Center of the sphere.
        center: Point<Real>,
        /// Radius of the sphere.
        radius: Real,
    },
    /// A capsule: the set of points within `radius` of the segment `[a, b]`.
    Capsule {
        /// First segment endpoint.
        a: Point<Real>,
        /// Second segment endpoint.
        b: Point<Real>,
        /// Radius of the capsule.
        radius: Real,
    },
    /// The convex hull of a point cloud.
    ConvexHull(Vec<Point<Real>>),
}

impl CollisionShape {
    /// This shape after applying `transform`.
    ///
    /// Radii are scaled by the largest scaling factor of `transform`.
    pub fn transformed(&self, transform: &Affine<Real>) -> Self {
        let linear: Matrix<Real> = transform.matrix().fixed_view::<3, 3>(0, 0).into_owned();
        let max_scale = (0..DIM)
            .map(|i| linear.column(i).norm())
            .fold(0.0, Real::max);
        match self {
            CollisionShape::Box(b) => CollisionShape::Box(b.transformed(transform)),
            CollisionShape::Sphere { center, radius } => CollisionShape::Sphere {
                center: transform * center,
                radius: radius * max_scale,
            },
            CollisionShape::Capsule { a, b, radius } => CollisionShape::Capsule {
                a: transform * a,
                b: transform * b,
                radius: radius * max_scale,
            },
            CollisionShape::ConvexHull(points) => {
                CollisionShape::ConvexHull(points.iter().map(|p| transform * p).collect())
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;
    use na::Matrix4;

    #[test]
    fn scaled_box() {
        let b = OrientedBox::new(Isometry::translation(1.0, 0.0, 0.0), Vector::new(1.0, 2.0, 3.0));
        let transform = Affine::from_matrix_unchecked(Matrix4::new_nonuniform_scaling(&Vector::new(
            2.0, 1.0, 1.0,
        )));
        let moved = b.transformed(&transform);
        assert_relative_eq!(moved.half_extents, Vector::new(2.0, 2.0, 3.0), epsilon = 1.0e-5);
        assert_relative_eq!(moved.pose.translation.vector, Vector::new(2.0, 0.0, 0.0), epsilon = 1.0e-5);
        assert_relative_eq!(moved.volume(), b.volume() * 2.0, epsilon = 1.0e-3);
    }

    #[test]
    fn merged_box_contains_both() {
        let a = OrientedBox::new(Isometry::translation(-1.0, 0.0, 0.0), Vector::repeat(1.0));
        let b = OrientedBox::new(Isometry::translation(1.0, 0.0, 0.0), Vector::repeat(1.0));
        let merged = a.merged_in_frame(&b);
        assert_relative_eq!(merged.half_extents, Vector::new(2.0, 1.0, 1.0), epsilon = 1.0e-5);
        assert_relative_eq!(merged.volume(), a.volume() + b.volume(), epsilon = 1.0e-4);
    }

    #[test]
    fn sphere_radius_follows_scale() {
        let sphere = CollisionShape::Sphere {
            center: Point::origin(),
            radius: 1.0,
        };
        let transform = Affine::from_matrix_unchecked(Matrix4::new_scaling(3.0));
        match sphere.transformed(&transform) {
            CollisionShape::Sphere { radius, .. } => assert_relative_eq!(radius, 3.0),
            _ => unreachable!(),
        }
    }
}
