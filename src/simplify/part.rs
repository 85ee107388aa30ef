use super::{find_salient_corners, simplify_mesh, BoundaryConstraint, CollapsePlacement, SimplifyParams};
use crate::math::Real;
use crate::mesh::{split_bowties, weld_vertices, AttributedMesh, WeldMode};

/// Parameters of [`simplify_part_mesh`].
#[derive(Clone, Debug, PartialEq)]
pub struct PartSimplifyParams {
    /// Maximum geometric deviation allowed for the simplified mesh.
    pub tolerance: Real,
    /// Keep UV layers and vertex colors (and the seams they imply).
    pub preserve_uvs: bool,
    /// Pin corners where several large planar regions meet.
    pub preserve_salient_corners: bool,
    /// Normal angle used to group faces when looking for salient corners.
    pub salient_angle_deg: Real,
    /// Minimum dimension of a planar region for its corners to be salient.
    pub min_salient_part_dimension: Real,
    /// Meshes with fewer vertices than this are returned unchanged.
    pub min_vertex_count: usize,
}

impl Default for PartSimplifyParams {
    fn default() -> Self {
        Self {
            tolerance: 0.25,
            preserve_uvs: false,
            preserve_salient_corners: true,
            salient_angle_deg: 44.0,
            min_salient_part_dimension: 1.0,
            min_vertex_count: 16,
        }
    }
}

/// Simplifies a part source mesh to the given geometric tolerance.
///
/// Near-duplicate vertices are welded and bowtie vertices split before
/// simplifying. Unless UVs are preserved, UV layers and vertex colors are
/// stripped first so they do not introduce seams. Normals are recomputed on
/// the result.
pub fn simplify_part_mesh(source: &AttributedMesh, params: &PartSimplifyParams) -> AttributedMesh {
    let mut mesh = source.clone();
    if mesh.num_vertices() < params.min_vertex_count {
        return mesh;
    }

    let weld_mode = if params.preserve_uvs {
        WeldMode::MatchAttributes
    } else {
        mesh.strip_uvs();
        mesh.strip_colors();
        mesh.normals = None;
        WeldMode::PositionOnly
    };

    let _ = weld_vertices(&mut mesh, params.tolerance * 0.001, weld_mode);
    let _ = split_bowties(&mut mesh);

    let pinned_vertices = if params.preserve_salient_corners {
        find_salient_corners(
            &mesh,
            params.salient_angle_deg,
            params.min_salient_part_dimension,
        )
    } else {
        Vec::new()
    };

    let simplify = SimplifyParams {
        target_triangle_count: 1,
        geometric_tolerance: Some(params.tolerance),
        boundary: BoundaryConstraint::Constrained,
        placement: CollapsePlacement::Optimal,
        preserve_group_boundaries: true,
        pinned_vertices,
        ..SimplifyParams::default()
    };
    let stats = simplify_mesh(&mut mesh, &simplify);
    log::trace!(
        "part simplification at tolerance {}: {} -> {} triangles",
        params.tolerance,
        stats.initial_triangles,
        stats.final_triangles
    );

    mesh.recompute_normals(60.0);
    mesh
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::math::Point;

    fn tessellated_sphere(rings: u32, sectors: u32) -> AttributedMesh {
        let mut vertices = vec![Point::new(0.0, 0.0, 1.0)];
        for r in 1..rings {
            let theta = std::f32::consts::PI * r as f32 / rings as f32;
            for s in 0..sectors {
                let phi = 2.0 * std::f32::consts::PI * s as f32 / sectors as f32;
                vertices.push(Point::new(
                    theta.sin() * phi.cos(),
                    theta.sin() * phi.sin(),
                    theta.cos(),
                ));
            }
        }
        vertices.push(Point::new(0.0, 0.0, -1.0));
        let south = vertices.len() as u32 - 1;
        let ring = |r: u32, s: u32| 1 + (r - 1) * sectors + s % sectors;

        let mut indices = Vec::new();
        for s in 0..sectors {
            indices.push([0, ring(1, s), ring(1, s + 1)]);
            indices.push([south, ring(rings - 1, s + 1), ring(rings - 1, s)]);
        }
        for r in 1..rings - 1 {
            for s in 0..sectors {
                indices.push([ring(r, s), ring(r + 1, s), ring(r + 1, s + 1)]);
                indices.push([ring(r, s), ring(r + 1, s + 1), ring(r, s + 1)]);
            }
        }
        AttributedMesh::new(vertices, indices)
    }

    #[test]
    fn coarser_tolerance_gives_fewer_triangles() {
        let sphere = tessellated_sphere(16, 24);
        let fine = simplify_part_mesh(
            &sphere,
            &PartSimplifyParams {
                tolerance: 0.03,
                ..Default::default()
            },
        );
        let coarse = simplify_part_mesh(
            &sphere,
            &PartSimplifyParams {
                tolerance: 0.2,
                ..Default::default()
            },
        );
        assert!(fine.num_triangles() < sphere.num_triangles());
        assert!(coarse.num_triangles() < fine.num_triangles());
        assert!(coarse.normals.is_some());
    }

    #[test]
    fn tiny_meshes_are_untouched() {
        let tri = AttributedMesh::new(
            vec![Point::origin(), Point::new(1.0, 0.0, 0.0), Point::new(0.0, 1.0, 0.0)],
            vec![[0, 1, 2]],
        );
        assert_eq!(simplify_part_mesh(&tri, &PartSimplifyParams::default()), tri);
    }
}
