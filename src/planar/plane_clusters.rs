use crate::math::{Point, Real, Vector};
use crate::mesh::{AttributedMesh, EdgeTopology};
use ena::unify::{InPlaceUnificationTable, UnifyKey};

#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq)]
struct IntKey(u32);

impl UnifyKey for IntKey {
    type Value = ();
    fn index(&self) -> u32 {
        self.0
    }
    fn from_index(u: u32) -> IntKey {
        IntKey(u)
    }
    fn tag() -> &'static str {
        "IntKey"
    }
}

/// A set of edge-connected, nearly coplanar triangles.
#[derive(Clone, Debug, PartialEq)]
pub struct PlaneCluster {
    /// Area-weighted average normal of the triangles.
    pub normal: Vector<Real>,
    /// Area-weighted centroid of the triangles. It lies on the cluster plane.
    pub origin: Point<Real>,
    /// Total area of the triangles.
    pub area: Real,
    /// The triangles of this cluster, in increasing order.
    pub triangles: Vec<usize>,
}

impl PlaneCluster {
    /// The maximum distance between a vertex of the cluster and its plane.
    pub fn flatness(&self, mesh: &AttributedMesh) -> Real {
        self.triangles
            .iter()
            .flat_map(|t| mesh.indices[*t])
            .map(|v| (mesh.vertices[v as usize] - self.origin).dot(&self.normal).abs())
            .fold(0.0, Real::max)
    }
}

/// Groups edge-adjacent triangles lying on a common plane.
///
/// Two adjacent triangles are merged if they have the same material and
/// group id, if their normals' dot product is at least `normal_dot`, and if
/// the centroid of each lies within `distance_tolerance` of the plane of the
/// other. Degenerate triangles are never clustered.
///
/// Clusters are returned in order of their first triangle.
pub fn cluster_planes(
    mesh: &AttributedMesh,
    normal_dot: Real,
    distance_tolerance: Real,
) -> Vec<PlaneCluster> {
    let num_tris = mesh.num_triangles();
    let normals: Vec<_> = (0..num_tris).map(|t| mesh.triangle_normal(t)).collect();
    let centroids: Vec<_> = (0..num_tris).map(|t| mesh.triangle_centroid(t)).collect();

    let mut ufind: InPlaceUnificationTable<IntKey> = InPlaceUnificationTable::new();
    let keys: Vec<IntKey> = (0..num_tris).map(|_| ufind.new_key(())).collect();

    let topology = EdgeTopology::new(&mesh.indices);
    for tris in topology.edges.values() {
        if tris.len() != 2 {
            continue;
        }
        let (a, b) = (tris[0] as usize, tris[1] as usize);
        if mesh.material_ids[a] != mesh.material_ids[b] || mesh.group_ids[a] != mesh.group_ids[b] {
            continue;
        }
        if normals[a] == Vector::zeros() || normals[b] == Vector::zeros() {
            continue;
        }
        let coplanar = normals[a].dot(&normals[b]) >= normal_dot
            && (centroids[b] - centroids[a]).dot(&normals[a]).abs() <= distance_tolerance
            && (centroids[a] - centroids[b]).dot(&normals[b]).abs() <= distance_tolerance;
        if coplanar {
            ufind.union(keys[a], keys[b]);
        }
    }

    let mut cluster_of_root = vec![u32::MAX; num_tris];
    let mut clusters: Vec<PlaneCluster> = Vec::new();
    for t in 0..num_tris {
        let root = ufind.find(keys[t]).0 as usize;
        if cluster_of_root[root] == u32::MAX {
            cluster_of_root[root] = clusters.len() as u32;
            clusters.push(PlaneCluster {
                normal: Vector::zeros(),
                origin: Point::origin(),
                area: 0.0,
                triangles: Vec::new(),
            });
        }
        let cluster = &mut clusters[cluster_of_root[root] as usize];
        let area = mesh.triangle_area(t);
        cluster.normal += normals[t] * area;
        cluster.origin.coords += centroids[t].coords * area;
        cluster.area += area;
        cluster.triangles.push(t);
    }

    for cluster in &mut clusters {
        if cluster.area > 0.0 {
            cluster.origin.coords /= cluster.area;
        } else {
            cluster.origin = centroids[cluster.triangles[0]];
        }
        cluster.normal = cluster
            .normal
            .try_normalize(Real::EPSILON)
            .unwrap_or(normals[cluster.triangles[0]]);
    }

    clusters
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn folded_sheet_gives_two_clusters() {
        let vertices = vec![
            Point::new(0.0, 0.0, 0.0),
            Point::new(1.0, 0.0, 0.0),
            Point::new(1.0, 1.0, 0.0),
            Point::new(0.0, 1.0, 0.0),
            Point::new(1.0, 0.0, 1.0),
            Point::new(1.0, 1.0, 1.0),
        ];
        let indices = vec![[0, 1, 2], [0, 2, 3], [1, 4, 5], [1, 5, 2]];
        let mesh = AttributedMesh::new(vertices, indices);
        let clusters = cluster_planes(&mesh, 0.99, 1.0e-3);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].triangles, vec![0, 1]);
        assert!((clusters[0].area - 1.0).abs() < 1.0e-5);
        assert!(clusters[0].flatness(&mesh) < 1.0e-6);
    }
}
