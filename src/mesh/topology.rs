use super::AttributedMesh;
use crate::utils::SortedPair;
use hashbrown::HashMap;
use smallvec::SmallVec;

/// Undirected edge → incident triangles map of an indexed mesh.
#[derive(Clone, Debug, Default)]
pub struct EdgeTopology {
    /// For each undirected edge, the triangles containing it.
    pub edges: HashMap<SortedPair<u32>, SmallVec<[u32; 2]>>,
}

impl EdgeTopology {
    /// Builds the edge map of the given triangles.
    pub fn new(indices: &[[u32; 3]]) -> Self {
        let mut edges: HashMap<SortedPair<u32>, SmallVec<[u32; 2]>> =
            HashMap::with_capacity(indices.len() * 3 / 2);
        for (tid, tri) in indices.iter().enumerate() {
            for k in 0..3 {
                edges
                    .entry(SortedPair::new(tri[k], tri[(k + 1) % 3]))
                    .or_default()
                    .push(tid as u32);
            }
        }
        Self { edges }
    }

    /// Returns `true` if the edge `(a, b)` has exactly one incident triangle.
    pub fn is_boundary_edge(&self, a: u32, b: u32) -> bool {
        self.edges
            .get(&SortedPair::new(a, b))
            .map(|tris| tris.len() == 1)
            .unwrap_or(false)
    }

    /// Per-vertex flag: `true` if the vertex lies on a boundary (or
    /// non-manifold) edge.
    pub fn boundary_vertices(&self, num_vertices: usize) -> Vec<bool> {
        let mut result = vec![false; num_vertices];
        for (edge, tris) in &self.edges {
            if tris.len() != 2 {
                result[edge.low() as usize] = true;
                result[edge.high() as usize] = true;
            }
        }
        result
    }

    /// The directed boundary edges `(a, b)` following the winding of their
    /// unique incident triangle.
    pub fn boundary_edges(&self, indices: &[[u32; 3]]) -> Vec<[u32; 2]> {
        let mut result = Vec::new();
        for tri in indices {
            for k in 0..3 {
                let a = tri[k];
                let b = tri[(k + 1) % 3];
                if self.is_boundary_edge(a, b) {
                    result.push([a, b]);
                }
            }
        }
        result
    }

    /// Chains the boundary edges into closed loops of vertex ids.
    ///
    /// Each loop follows the winding of the adjacent triangles. Open chains
    /// (which only happen on non-manifold input) are dropped.
    pub fn boundary_loops(&self, indices: &[[u32; 3]]) -> Vec<Vec<u32>> {
        let edges = self.boundary_edges(indices);
        let mut next: HashMap<u32, SmallVec<[u32; 1]>> = HashMap::new();
        for [a, b] in &edges {
            next.entry(*a).or_default().push(*b);
        }

        let mut loops = Vec::new();
        let mut starts: Vec<u32> = edges.iter().map(|e| e[0]).collect();
        starts.sort_unstable();

        for start in starts {
            if next.get(&start).map(|n| n.is_empty()).unwrap_or(true) {
                continue;
            }

            let mut polyline = vec![start];
            let mut curr = start;
            let mut closed = false;
            while let Some(succ) = next.get_mut(&curr).and_then(|n| n.pop()) {
                if succ == start {
                    closed = true;
                    break;
                }
                polyline.push(succ);
                curr = succ;
                if polyline.len() > edges.len() {
                    break;
                }
            }

            if closed && polyline.len() >= 3 {
                loops.push(polyline);
            }
        }

        loops
    }
}

/// Splits "bowtie" vertices: vertices whose incident triangles form more than
/// one edge-connected fan are duplicated once per extra fan.
///
/// Returns the number of vertices added.
pub fn split_bowties(mesh: &mut AttributedMesh) -> usize {
    let mut incident: Vec<SmallVec<[u32; 8]>> = vec![SmallVec::new(); mesh.vertices.len()];
    for (tid, tri) in mesh.indices.iter().enumerate() {
        for k in 0..3 {
            incident[tri[k] as usize].push(tid as u32);
        }
    }

    let mut num_added = 0;
    for vid in 0..incident.len() {
        let tris = incident[vid].clone();
        if tris.len() < 2 {
            continue;
        }

        // Flood-fill the fans around `vid`: two incident triangles are in the
        // same fan if they share an edge containing `vid`.
        let mut fan_of = vec![usize::MAX; tris.len()];
        let mut num_fans = 0;
        for seed in 0..tris.len() {
            if fan_of[seed] != usize::MAX {
                continue;
            }
            fan_of[seed] = num_fans;
            let mut stack = vec![seed];
            while let Some(curr) = stack.pop() {
                let tc = mesh.indices[tris[curr] as usize];
                for other in 0..tris.len() {
                    if fan_of[other] != usize::MAX {
                        continue;
                    }
                    let to = mesh.indices[tris[other] as usize];
                    let shares_edge = tc
                        .iter()
                        .filter(|v| **v != vid as u32)
                        .any(|v| to.contains(v));
                    if shares_edge {
                        fan_of[other] = num_fans;
                        stack.push(other);
                    }
                }
            }
            num_fans += 1;
        }

        for fan in 1..num_fans {
            let new_id = mesh.duplicate_vertex(vid as u32);
            num_added += 1;
            for (i, tid) in tris.iter().enumerate() {
                if fan_of[i] == fan {
                    let tri = &mut mesh.indices[*tid as usize];
                    for k in 0..3 {
                        if tri[k] == vid as u32 {
                            tri[k] = new_id;
                        }
                    }
                }
            }
        }
    }

    num_added
}

/// Labels the edge-connected components of the triangles.
///
/// Returns the per-triangle component id and the number of components.
pub fn connected_components(indices: &[[u32; 3]], topology: &EdgeTopology) -> (Vec<u32>, usize) {
    let mut labels = vec![u32::MAX; indices.len()];
    let mut num_components = 0;
    for seed in 0..indices.len() {
        if labels[seed] != u32::MAX {
            continue;
        }
        labels[seed] = num_components as u32;
        let mut stack = vec![seed];
        while let Some(tid) = stack.pop() {
            let tri = indices[tid];
            for k in 0..3 {
                let key = SortedPair::new(tri[k], tri[(k + 1) % 3]);
                if let Some(neighbors) = topology.edges.get(&key) {
                    for n in neighbors {
                        if labels[*n as usize] == u32::MAX {
                            labels[*n as usize] = num_components as u32;
                            stack.push(*n as usize);
                        }
                    }
                }
            }
        }
        num_components += 1;
    }
    (labels, num_components)
}
