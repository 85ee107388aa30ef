use lodmerge3d::assembly::MeshInstance;
use lodmerge3d::math::{Affine, Point, Real};
use lodmerge3d::mesh::AttributedMesh;
use lodmerge3d::na::Translation3;
use lodmerge3d::options::LodMethod;
use lodmerge3d::source::StaticSource;
use lodmerge3d::CombineOptions;
use std::collections::HashMap;
use std::sync::Arc;

/// A flat `nx * ny` grid of `cell`-sized squares in the XY plane, facing +Z.
pub fn grid(nx: usize, ny: usize, cell: Real) -> AttributedMesh {
    let mut vertices = Vec::new();
    for j in 0..=ny {
        for i in 0..=nx {
            vertices.push(Point::new(i as Real * cell, j as Real * cell, 0.0));
        }
    }

    let id = |i: usize, j: usize| (j * (nx + 1) + i) as u32;
    let mut indices = Vec::new();
    for j in 0..ny {
        for i in 0..nx {
            indices.push([id(i, j), id(i + 1, j), id(i + 1, j + 1)]);
            indices.push([id(i, j), id(i + 1, j + 1), id(i, j + 1)]);
        }
    }

    AttributedMesh::new(vertices, indices)
}

/// A closed, outward-facing cube of half side `half` centered at the origin,
/// with each face split into `n * n` quads.
pub fn tessellated_box(half: Real, n: usize) -> AttributedMesh {
    let mut vertices = Vec::new();
    let mut ids: HashMap<[usize; 3], u32> = HashMap::new();
    let mut indices = Vec::new();
    let step = 2.0 * half / n as Real;

    for axis in 0..3 {
        let (b, c) = ((axis + 1) % 3, (axis + 2) % 3);
        for side in [0, n] {
            let mut vertex = |u: usize, v: usize| {
                let mut lattice = [0; 3];
                lattice[axis] = side;
                lattice[b] = u;
                lattice[c] = v;
                *ids.entry(lattice).or_insert_with(|| {
                    vertices.push(Point::new(
                        lattice[0] as Real * step - half,
                        lattice[1] as Real * step - half,
                        lattice[2] as Real * step - half,
                    ));
                    vertices.len() as u32 - 1
                })
            };

            for u in 0..n {
                for v in 0..n {
                    let quad = [vertex(u, v), vertex(u + 1, v), vertex(u + 1, v + 1), vertex(u, v + 1)];
                    let (t0, t1) = if side == n {
                        ([quad[0], quad[1], quad[2]], [quad[0], quad[2], quad[3]])
                    } else {
                        ([quad[0], quad[2], quad[1]], [quad[0], quad[3], quad[2]])
                    };
                    indices.push(t0);
                    indices.push(t1);
                }
            }
        }
    }

    AttributedMesh::new(vertices, indices)
}

pub fn translation(x: Real, y: Real, z: Real) -> Affine<Real> {
    Affine::from_matrix_unchecked(Translation3::new(x, y, z).to_homogeneous())
}

pub fn source(name: &str, mesh: AttributedMesh) -> Arc<StaticSource> {
    Arc::new(StaticSource::new(name, vec![mesh]))
}

pub fn instance_at(source: Arc<StaticSource>, x: Real) -> MeshInstance {
    MeshInstance::new(source, translation(x, 0.0, 0.0))
}

/// Options producing the given LOD methods, with every post-processing
/// stage disabled.
pub fn plain_options(methods: &[LodMethod]) -> CombineOptions {
    let mut options = CombineOptions::default();
    options.num_lods = methods.len();
    options.lod_methods = Some(methods.to_vec());
    options.hidden_removal.enabled = false;
    options.planar.merge_coplanar = false;
    options
}

pub fn assert_materials_valid(results: &lodmerge3d::CombineResults) {
    for sub in &results.subassemblies {
        for lod in &sub.lods {
            assert!(lod.mesh.is_consistent());
            assert!(lod
                .mesh
                .material_ids
                .iter()
                .all(|m| (*m as usize) < sub.materials.len()));
        }
    }
}
