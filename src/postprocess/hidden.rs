use crate::math::{Point, Real, Vector};
use crate::mesh::{AttributedMesh, MeshBvh};
use crate::options::{HiddenRemovalMethod, HiddenRemovalOptions};
use crate::pipeline::TaskRunner;
use crate::utils::{cardinal_directions, spherical_fibonacci};
use oorandom::Rand32;

/// Sample points are pulled toward the centroid by this factor so that rays
/// do not graze the triangle edges.
const SAMPLE_SHRINK: Real = 0.8;

/// Removes the triangles that cannot be seen from outside the mesh.
///
/// Returns the number of removed triangles. The random samples of a triangle
/// only depend on its vertex positions, so running this again on its own
/// output removes nothing.
pub fn remove_hidden_faces(
    mesh: &mut AttributedMesh,
    options: &HiddenRemovalOptions,
    runner: &TaskRunner,
) -> usize {
    let num_tris = mesh.num_triangles();
    if num_tris < 2 {
        return 0;
    }

    let bvh = MeshBvh::new(mesh);
    let triangles: Vec<usize> = (0..num_tris).collect();
    let visible = match options.method {
        HiddenRemovalMethod::ExteriorVisibility => {
            let mut directions: Vec<Vector<Real>> = cardinal_directions().to_vec();
            directions.extend(spherical_fibonacci(options.num_directions));
            let reach = mesh.aabb().extents().norm() * 2.0 + 1.0;
            runner.map(&triangles, |_, t| {
                is_visible_from_outside(mesh, &bvh, *t, &directions, reach, options)
            })
        }
        HiddenRemovalMethod::WindingNumber => {
            let offset = mesh.aabb().extents().norm() * 1.0e-3;
            let reach = mesh.aabb().extents().norm() * 2.0 + 1.0;
            runner.map(&triangles, |_, t| {
                !is_enclosed(mesh, &bvh, *t, offset, reach, options.occlusion_rays)
            })
        }
    };

    mesh.retain_triangles(|t| visible[t]);
    let removed = num_tris - mesh.num_triangles();
    if removed > 0 {
        log::debug!("Hidden-face removal: {} of {} triangles removed.", removed, num_tris);
    }
    removed
}

/// A seed that only depends on the positions of the triangle vertices, in any
/// order.
fn triangle_seed(tri: &[Point<Real>; 3]) -> u64 {
    tri.iter()
        .map(|p| {
            let mut h = 0xcbf2_9ce4_8422_2325u64;
            for c in p.iter() {
                h ^= c.to_bits() as u64;
                h = h.wrapping_mul(0x0000_0100_0000_01b3);
            }
            h
        })
        .fold(0u64, u64::wrapping_add)
}

fn sample_points(tri: &[Point<Real>; 3], num_samples: usize) -> Vec<Point<Real>> {
    let centroid = Point::from((tri[0].coords + tri[1].coords + tri[2].coords) / 3.0);
    let mut samples = vec![centroid];
    let mut rng = Rand32::new(triangle_seed(tri));
    for _ in 1..num_samples.max(1) {
        let (mut u, mut v) = (rng.rand_float() as Real, rng.rand_float() as Real);
        if u + v > 1.0 {
            u = 1.0 - u;
            v = 1.0 - v;
        }
        let pt = tri[0] + (tri[1] - tri[0]) * u + (tri[2] - tri[0]) * v;
        samples.push(centroid + (pt - centroid) * SAMPLE_SHRINK);
    }
    samples
}

fn is_visible_from_outside(
    mesh: &AttributedMesh,
    bvh: &MeshBvh,
    t: usize,
    directions: &[Vector<Real>],
    reach: Real,
    options: &HiddenRemovalOptions,
) -> bool {
    let normal = mesh.triangle_normal(t);
    if normal == Vector::zeros() {
        return false;
    }

    let tri = mesh.triangle(t);
    let samples = sample_points(&tri, options.samples_per_triangle);
    for dir in directions {
        if normal.dot(dir) <= 0.0 && !options.double_sided {
            continue;
        }
        for pt in &samples {
            let origin = pt + dir * reach;
            if let Some(hit) = bvh.cast_ray(&origin, &-dir, reach * 1.01) {
                if hit.triangle as usize == t {
                    return true;
                }
            }
        }
    }
    false
}

fn is_enclosed(
    mesh: &AttributedMesh,
    bvh: &MeshBvh,
    t: usize,
    offset: Real,
    reach: Real,
    num_rays: usize,
) -> bool {
    let normal = mesh.triangle_normal(t);
    if normal == Vector::zeros() {
        return true;
    }

    let tri = mesh.triangle(t);
    let above = mesh.triangle_centroid(t) + normal * offset;
    if bvh.winding_number(&above) < 0.5 {
        return false;
    }

    // Confirm with random rays: a single escape keeps the triangle.
    let mut rng = Rand32::new(triangle_seed(&tri) ^ 0x5151);
    for _ in 0..num_rays {
        let z = rng.rand_float() as Real * 2.0 - 1.0;
        let phi = rng.rand_float() as Real * std::f32::consts::TAU;
        let r = (1.0 - z * z).max(0.0).sqrt();
        let dir = Vector::new(r * phi.cos(), r * phi.sin(), z);
        if bvh.cast_ray(&above, &dir, reach).is_none() {
            return false;
        }
    }
    true
}
