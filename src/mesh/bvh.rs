use super::queries::triangle_winding_number;
use super::AttributedMesh;
use crate::math::{Point, Real, Vector};
use parry3d::query::{PointQueryWithLocation, Ray, RayCast};
use parry3d::shape::{FeatureId, TriMesh};

/// The projection of a point on the surface of a [`MeshBvh`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SurfaceProjection {
    /// The triangle containing the projected point.
    pub triangle: u32,
    /// The projected point.
    pub point: Point<Real>,
    /// Barycentric coordinates of `point` in `triangle`.
    pub bcoords: [Real; 3],
    /// Distance between the query point and `point`.
    pub distance: Real,
}

/// A ray hit on the surface of a [`MeshBvh`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SurfaceRayHit {
    /// The triangle hit.
    pub triangle: u32,
    /// Ray parameter of the hit.
    pub toi: Real,
    /// `true` if the back side of the triangle was hit.
    pub backface: bool,
}

/// The surface of a mesh indexed by a bounding-volume hierarchy, for
/// nearest-surface-point and ray-cast queries.
///
/// The positions and triangles are copied into a [`TriMesh`] so the queries
/// can be shared across threads independently of the mesh they were built
/// from. Attributes are not kept. An empty mesh answers every query with
/// `None`.
#[derive(Clone, Debug, Default)]
pub struct MeshBvh {
    trimesh: Option<TriMesh>,
}

impl MeshBvh {
    /// Builds the hierarchy of the given mesh.
    pub fn new(mesh: &AttributedMesh) -> Self {
        Self::from_raw(mesh.vertices.clone(), mesh.indices.clone())
    }

    /// Builds the hierarchy of the given positions and triangles.
    pub fn from_raw(vertices: Vec<Point<Real>>, indices: Vec<[u32; 3]>) -> Self {
        Self {
            trimesh: TriMesh::new(vertices, indices).ok(),
        }
    }

    /// The number of triangles indexed by this hierarchy.
    pub fn num_triangles(&self) -> usize {
        self.trimesh.as_ref().map_or(0, |m| m.num_triangles())
    }

    /// Projects `point` on the closest point of the mesh surface.
    ///
    /// Returns `None` if the mesh is empty.
    pub fn project_point(&self, point: &Point<Real>) -> Option<SurfaceProjection> {
        self.project_point_with_max_dist(point, Real::MAX)
    }

    /// Projects `point` on the closest point of the mesh surface no farther
    /// than `max_dist`.
    pub fn project_point_with_max_dist(
        &self,
        point: &Point<Real>,
        max_dist: Real,
    ) -> Option<SurfaceProjection> {
        let trimesh = self.trimesh.as_ref()?;
        let (proj, (triangle, location)) =
            trimesh.project_local_point_and_get_location_with_max_dist(point, false, max_dist)?;
        Some(SurfaceProjection {
            triangle,
            point: proj.point,
            bcoords: location
                .barycentric_coordinates()
                .unwrap_or([1.0 / 3.0; 3]),
            distance: na::distance(point, &proj.point),
        })
    }

    /// Casts a ray against both sides of the triangles and returns the
    /// closest hit.
    pub fn cast_ray(
        &self,
        origin: &Point<Real>,
        dir: &Vector<Real>,
        max_toi: Real,
    ) -> Option<SurfaceRayHit> {
        let trimesh = self.trimesh.as_ref()?;
        let ray = Ray::new(*origin, *dir);
        let hit = trimesh.cast_local_ray_and_get_normal(&ray, max_toi, false)?;
        // Back faces are reported past the last triangle id.
        let num_triangles = trimesh.num_triangles() as u32;
        let (triangle, backface) = match hit.feature {
            FeatureId::Face(id) if id >= num_triangles => (id - num_triangles, true),
            FeatureId::Face(id) => (id, false),
            _ => return None,
        };
        Some(SurfaceRayHit {
            triangle,
            toi: hit.time_of_impact,
            backface,
        })
    }

    /// Generalized winding number of the mesh at `point`.
    ///
    /// Close to 1 inside a closed, outward-oriented mesh, close to 0 outside.
    pub fn winding_number(&self, point: &Point<Real>) -> f64 {
        self.trimesh.as_ref().map_or(0.0, |trimesh| {
            trimesh
                .triangles()
                .map(|tri| triangle_winding_number(point, &tri.a, &tri.b, &tri.c))
                .sum()
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::approximation::box_mesh;
    use crate::math::Isometry;

    fn grid(n: usize) -> AttributedMesh {
        let mut vertices = Vec::new();
        let mut indices = Vec::new();
        for j in 0..=n {
            for i in 0..=n {
                vertices.push(Point::new(i as Real, j as Real, 0.0));
            }
        }
        let w = (n + 1) as u32;
        for j in 0..n as u32 {
            for i in 0..n as u32 {
                let a = j * w + i;
                indices.push([a, a + 1, a + w + 1]);
                indices.push([a, a + w + 1, a + w]);
            }
        }
        AttributedMesh::new(vertices, indices)
    }

    #[test]
    fn projection_on_a_flat_grid() {
        let mesh = grid(10);
        let bvh = MeshBvh::new(&mesh);
        let mut rng = oorandom::Rand32::new(42);
        for _ in 0..100 {
            let p = Point::new(
                rng.rand_float() * 14.0 - 2.0,
                rng.rand_float() * 14.0 - 2.0,
                rng.rand_float() * 4.0 - 2.0,
            );
            let proj = bvh.project_point(&p).unwrap();
            let closest = Point::new(p.x.clamp(0.0, 10.0), p.y.clamp(0.0, 10.0), 0.0);
            assert!((proj.distance - (closest - p).norm()).abs() < 1.0e-4);

            let [a, b, c] = mesh.triangle(proj.triangle as usize);
            let rebuilt = a.coords * proj.bcoords[0] + b.coords * proj.bcoords[1] + c.coords * proj.bcoords[2];
            assert!((rebuilt - proj.point.coords).norm() < 1.0e-4);
        }
    }

    #[test]
    fn projection_respects_max_dist() {
        let bvh = MeshBvh::new(&grid(2));
        assert!(bvh.project_point_with_max_dist(&Point::new(1.0, 1.0, 3.0), 2.0).is_none());
        assert!(bvh.project_point_with_max_dist(&Point::new(1.0, 1.0, 1.5), 2.0).is_some());
    }

    #[test]
    fn ray_hits_report_the_side() {
        let mesh = grid(4);
        let bvh = MeshBvh::new(&mesh);
        let front = bvh
            .cast_ray(&Point::new(1.5, 1.2, 3.0), &-Vector::z(), 10.0)
            .unwrap();
        assert!((front.toi - 3.0).abs() < 1.0e-5);
        assert!(!front.backface);
        assert!((front.triangle as usize) < mesh.num_triangles());

        let back = bvh
            .cast_ray(&Point::new(1.5, 1.2, -3.0), &Vector::z(), 10.0)
            .unwrap();
        assert!(back.backface);
        assert_eq!(back.triangle, front.triangle);
        assert!(bvh.cast_ray(&Point::new(1.5, 1.2, 3.0), &-Vector::z(), 2.0).is_none());
    }

    #[test]
    fn winding_number_inside_and_outside() {
        let bvh = MeshBvh::new(&box_mesh(&Isometry::identity(), &Vector::repeat(1.0)));
        assert!((bvh.winding_number(&Point::origin()) - 1.0).abs() < 1.0e-6);
        assert!(bvh.winding_number(&Point::new(3.0, 0.0, 0.0)).abs() < 1.0e-6);
    }

    #[test]
    fn empty_mesh_answers_nothing() {
        let bvh = MeshBvh::new(&AttributedMesh::default());
        assert_eq!(bvh.num_triangles(), 0);
        assert!(bvh.project_point(&Point::origin()).is_none());
        assert!(bvh.cast_ray(&Point::origin(), &Vector::x(), 1.0).is_none());
        assert_eq!(bvh.winding_number(&Point::origin()), 0.0);
    }
}
