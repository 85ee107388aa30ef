use super::AttributedMesh;
use crate::math::Real;
use rstar::primitives::GeomWithData;
use rstar::RTree;

/// How attribute differences affect vertex welding.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WeldMode {
    /// Weld any two vertices closer than the tolerance.
    PositionOnly,
    /// Only weld vertices whose UVs, colors and normals also match. This
    /// keeps attribute seams as open boundaries.
    MatchAttributes,
}

type IndexedPoint = GeomWithData<[Real; 3], u32>;

/// Merges vertices closer than `tolerance` and remaps triangle indices.
///
/// Triangles that become degenerate (two identical indices) are removed.
/// Unreferenced vertices are compacted away. Returns the number of vertices
/// merged.
pub fn weld_vertices(mesh: &mut AttributedMesh, tolerance: Real, mode: WeldMode) -> usize {
    if mesh.vertices.is_empty() {
        return 0;
    }

    let sq_tol = tolerance * tolerance;
    let mut tree: RTree<IndexedPoint> = RTree::new();
    let mut remap: Vec<u32> = Vec::with_capacity(mesh.vertices.len());
    let mut num_merged = 0;

    for (vid, pt) in mesh.vertices.iter().enumerate() {
        let key = [pt.x, pt.y, pt.z];
        let target = tree
            .locate_within_distance(key, sq_tol)
            .map(|candidate| candidate.data)
            .filter(|other| {
                mode == WeldMode::PositionOnly || attributes_match(mesh, vid, *other as usize)
            })
            .min();

        match target {
            Some(other) => {
                remap.push(other);
                num_merged += 1;
            }
            None => {
                remap.push(vid as u32);
                tree.insert(IndexedPoint::new(key, vid as u32));
            }
        }
    }

    if num_merged == 0 {
        return 0;
    }

    for tri in &mut mesh.indices {
        for k in 0..3 {
            tri[k] = remap[tri[k] as usize];
        }
    }

    let degenerate: Vec<bool> = mesh
        .indices
        .iter()
        .map(|t| t[0] == t[1] || t[1] == t[2] || t[2] == t[0])
        .collect();
    mesh.retain_triangles(|i| !degenerate[i]);
    mesh.compact();
    num_merged
}

fn attributes_match(mesh: &AttributedMesh, a: usize, b: usize) -> bool {
    const ATTR_EPS: Real = 1.0e-4;
    let uvs_match = mesh
        .uv_layers
        .iter()
        .all(|layer| (layer[a] - layer[b]).norm_squared() <= ATTR_EPS * ATTR_EPS);
    let colors_match = mesh
        .colors
        .as_ref()
        .map(|c| (c[a] - c[b]).norm_squared() <= ATTR_EPS * ATTR_EPS)
        .unwrap_or(true);
    let normals_match = mesh
        .normals
        .as_ref()
        .map(|n| n[a].dot(&n[b]) >= 0.999)
        .unwrap_or(true);
    uvs_match && colors_match && normals_match
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::math::Point;

    #[test]
    fn weld_merges_split_quad() {
        let mut mesh = AttributedMesh::new(
            vec![
                Point::new(0.0, 0.0, 0.0),
                Point::new(1.0, 0.0, 0.0),
                Point::new(1.0, 1.0, 0.0),
                Point::new(0.0, 0.0, 0.0),
                Point::new(1.0, 1.0, 1.0e-6),
                Point::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2], [3, 4, 5]],
        );
        assert_eq!(weld_vertices(&mut mesh, 1.0e-3, WeldMode::PositionOnly), 2);
        assert_eq!(mesh.num_vertices(), 4);
        assert_eq!(mesh.num_triangles(), 2);
    }

    #[test]
    fn attribute_seams_are_kept() {
        let mut mesh = AttributedMesh::new(
            vec![Point::new(0.0, 0.0, 0.0), Point::new(0.0, 0.0, 0.0)],
            vec![],
        );
        mesh.set_num_uv_layers(1);
        mesh.uv_layers[0][1].x = 0.5;
        assert_eq!(weld_vertices(&mut mesh, 1.0e-3, WeldMode::MatchAttributes), 0);
    }
}
