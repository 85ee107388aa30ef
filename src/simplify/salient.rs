use crate::math::{Real, Vector};
use crate::mesh::{AttributedMesh, EdgeTopology};
use smallvec::SmallVec;
use std::collections::VecDeque;

/// Finds the corners where several large planar regions meet.
///
/// Faces are first grouped into near-planar regions: a face joins the region
/// of an edge-adjacent face if its normal is within `angle_deg` of the
/// region's seed normal. A region is large if its area exceeds
/// `min_part_dimension²`. A vertex is salient if at least three regions meet
/// there and at least two of them are large.
///
/// The mesh is expected to be welded. Returns the salient vertex ids, sorted.
pub fn find_salient_corners(
    mesh: &AttributedMesh,
    angle_deg: Real,
    min_part_dimension: Real,
) -> Vec<u32> {
    let num_tris = mesh.num_triangles();
    if num_tris == 0 {
        return Vec::new();
    }

    let normals: Vec<Vector<Real>> = (0..num_tris).map(|t| mesh.triangle_normal(t)).collect();
    let cos_tol = angle_deg.to_radians().cos();
    let topology = EdgeTopology::new(&mesh.indices);

    let mut group = vec![u32::MAX; num_tris];
    let mut group_areas: Vec<Real> = Vec::new();
    let mut queue = VecDeque::new();

    for seed in 0..num_tris {
        if group[seed] != u32::MAX {
            continue;
        }
        let gid = group_areas.len() as u32;
        let seed_normal = normals[seed];
        let mut area = 0.0;
        group[seed] = gid;
        queue.push_back(seed);

        while let Some(t) = queue.pop_front() {
            area += mesh.triangle_area(t);
            let tri = mesh.indices[t];
            for k in 0..3 {
                let key = crate::utils::SortedPair::new(tri[k], tri[(k + 1) % 3]);
                let Some(adj) = topology.edges.get(&key) else {
                    continue;
                };
                for other in adj {
                    let other = *other as usize;
                    if group[other] == u32::MAX && normals[other].dot(&seed_normal) >= cos_tol {
                        group[other] = gid;
                        queue.push_back(other);
                    }
                }
            }
        }

        group_areas.push(area);
    }

    let large_area = min_part_dimension * min_part_dimension;
    let mut vertex_groups: Vec<SmallVec<[u32; 6]>> = vec![SmallVec::new(); mesh.num_vertices()];
    for (t, tri) in mesh.indices.iter().enumerate() {
        for v in tri {
            let groups = &mut vertex_groups[*v as usize];
            if !groups.contains(&group[t]) {
                groups.push(group[t]);
            }
        }
    }

    vertex_groups
        .iter()
        .enumerate()
        .filter(|(_, groups)| {
            groups.len() >= 3
                && groups
                    .iter()
                    .filter(|g| group_areas[**g as usize] > large_area)
                    .count()
                    >= 2
        })
        .map(|(v, _)| v as u32)
        .collect()
}
