use super::{BoundaryConstraint, CollapsePlacement, Quadric, SimplifyParams};
use crate::math::{Point, Real, Vector};
use crate::mesh::{AttributedMesh, EdgeTopology, MeshBvh};
use crate::utils::SortedPair;
use ordered_float::OrderedFloat;
use smallvec::SmallVec;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Statistics returned by [`simplify_mesh`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SimplifyStats {
    /// Triangle count before simplification.
    pub initial_triangles: usize,
    /// Triangle count after simplification.
    pub final_triangles: usize,
    /// Number of edge collapses applied.
    pub num_collapses: usize,
}

type HeapEntry = Reverse<(OrderedFloat<f64>, u32, u32, u32, u32)>;

struct Collapser<'a> {
    params: &'a SimplifyParams,
    positions: Vec<Point<Real>>,
    tris: Vec<[u32; 3]>,
    tri_alive: Vec<bool>,
    tri_keys: Vec<u64>,
    vert_tris: Vec<SmallVec<[u32; 8]>>,
    vert_alive: Vec<bool>,
    version: Vec<u32>,
    quadrics: Vec<Quadric>,
    feature: Vec<bool>,
    pinned: Vec<bool>,
    reference: Option<MeshBvh>,
    num_alive: usize,
}

/// A validated collapse: `removed` merges into `kept`, which moves to
/// `target`.
struct Collapse {
    kept: u32,
    removed: u32,
    target: Point<Real>,
}

/// Quadric-error edge-collapse simplification.
///
/// Collapses edges in order of increasing quadric error until the mesh has at
/// most `params.target_triangle_count` triangles or no remaining collapse
/// satisfies the constraints of `params` (geometric tolerance, boundary and
/// feature-edge constraints, pinned vertices, no normal flips, manifold link
/// condition).
///
/// Attributes of the surviving vertices are kept as-is; per-triangle
/// attributes are untouched. Normals, if present, should be recomputed by
/// the caller.
pub fn simplify_mesh(mesh: &mut AttributedMesh, params: &SimplifyParams) -> SimplifyStats {
    let initial = mesh.num_triangles();
    let mut stats = SimplifyStats {
        initial_triangles: initial,
        final_triangles: initial,
        num_collapses: 0,
    };

    if initial <= params.target_triangle_count || initial == 0 {
        return stats;
    }

    let mut collapser = Collapser::new(mesh, params);
    stats.num_collapses = collapser.run();

    mesh.vertices = collapser.positions;
    let kept: Vec<usize> = (0..collapser.tris.len())
        .filter(|t| collapser.tri_alive[*t])
        .collect();
    mesh.indices = kept.iter().map(|t| collapser.tris[*t]).collect();
    mesh.material_ids = kept.iter().map(|t| mesh.material_ids[*t]).collect();
    mesh.group_ids = kept.iter().map(|t| mesh.group_ids[*t]).collect();
    if let Some(subsets) = &mut mesh.subset_ids {
        *subsets = kept.iter().map(|t| subsets[*t]).collect();
    }
    mesh.compact();

    stats.final_triangles = mesh.num_triangles();
    stats
}

impl<'a> Collapser<'a> {
    fn new(mesh: &AttributedMesh, params: &'a SimplifyParams) -> Self {
        let nv = mesh.vertices.len();
        let mut vert_tris: Vec<SmallVec<[u32; 8]>> = vec![SmallVec::new(); nv];
        for (tid, tri) in mesh.indices.iter().enumerate() {
            for k in 0..3 {
                vert_tris[tri[k] as usize].push(tid as u32);
            }
        }

        let tri_keys: Vec<u64> = (0..mesh.indices.len())
            .map(|t| ((mesh.material_ids[t] as u64) << 32) | mesh.group_ids[t] as u64)
            .collect();

        // Feature edges: open boundaries, non-manifold edges, and (optionally)
        // edges between regions with different material/group.
        let topology = EdgeTopology::new(&mesh.indices);
        let mut feature = vec![false; nv];
        let mut feature_edges = Vec::new();
        for (edge, tris) in &topology.edges {
            let is_feature = tris.len() != 2
                || (params.preserve_group_boundaries
                    && tri_keys[tris[0] as usize] != tri_keys[tris[1] as usize]);
            if is_feature {
                feature[edge.low() as usize] = true;
                feature[edge.high() as usize] = true;
                feature_edges.push((*edge, tris[0]));
            }
        }

        let mut quadrics = vec![Quadric::zero(); nv];
        for t in 0..mesh.indices.len() {
            let n = mesh.triangle_normal(t);
            if n == Vector::zeros() {
                continue;
            }
            let tri = mesh.indices[t];
            let q = Quadric::from_plane(&n, &mesh.vertices[tri[0] as usize], 1.0);
            for k in 0..3 {
                quadrics[tri[k] as usize] += q;
            }
        }

        // Constraint planes orthogonal to the surface along feature edges.
        for (edge, tid) in &feature_edges {
            let a = mesh.vertices[edge.low() as usize];
            let b = mesh.vertices[edge.high() as usize];
            let n = mesh.triangle_normal(*tid as usize);
            if let Some(side) = (b - a).cross(&n).try_normalize(Real::EPSILON) {
                let q = Quadric::from_plane(&side, &a, params.boundary_weight);
                quadrics[edge.low() as usize] += q;
                quadrics[edge.high() as usize] += q;
            }
        }

        let mut pinned = vec![false; nv];
        for v in &params.pinned_vertices {
            if let Some(p) = pinned.get_mut(*v as usize) {
                *p = true;
            }
        }
        if params.boundary == BoundaryConstraint::Fixed {
            for (p, f) in pinned.iter_mut().zip(feature.iter()) {
                *p |= *f;
            }
        }

        let reference = params
            .geometric_tolerance
            .filter(|tol| tol.is_finite())
            .map(|_| MeshBvh::new(mesh));

        Self {
            params,
            positions: mesh.vertices.clone(),
            tris: mesh.indices.clone(),
            tri_alive: vec![true; mesh.indices.len()],
            tri_keys,
            vert_tris,
            vert_alive: vec![true; nv],
            version: vec![0; nv],
            quadrics,
            feature,
            pinned,
            reference,
            num_alive: mesh.indices.len(),
        }
    }

    fn run(&mut self) -> usize {
        let mut heap: BinaryHeap<HeapEntry> = BinaryHeap::new();
        let mut seen = hashbrown::HashSet::new();
        for tri in &self.tris {
            for k in 0..3 {
                let edge = SortedPair::new(tri[k], tri[(k + 1) % 3]);
                if seen.insert(edge) {
                    self.push_edge(&mut heap, edge.low(), edge.high());
                }
            }
        }

        let mut num_collapses = 0;
        while self.num_alive > self.params.target_triangle_count {
            let Some(Reverse((_, a, b, va, vb))) = heap.pop() else {
                break;
            };
            if !self.vert_alive[a as usize]
                || !self.vert_alive[b as usize]
                || self.version[a as usize] != va
                || self.version[b as usize] != vb
            {
                continue;
            }

            if let Some(collapse) = self.plan_collapse(a, b) {
                self.apply(&collapse);
                num_collapses += 1;
                let kept = collapse.kept;
                let neighbors = self.neighbors(kept);
                for n in neighbors {
                    self.push_edge(&mut heap, kept, n);
                }
            }
        }

        num_collapses
    }

    fn push_edge(&self, heap: &mut BinaryHeap<HeapEntry>, a: u32, b: u32) {
        let q = self.quadrics[a as usize] + self.quadrics[b as usize];
        let (_, target) = self.choose_target(a, b, &q);
        let cost = q.evaluate(&target);
        heap.push(Reverse((
            OrderedFloat(cost),
            a,
            b,
            self.version[a as usize],
            self.version[b as usize],
        )));
    }

    /// Picks which endpoint survives and where it goes, ignoring validity.
    fn choose_target(&self, a: u32, b: u32, q: &Quadric) -> (u32, Point<Real>) {
        let pa = self.positions[a as usize];
        let pb = self.positions[b as usize];
        let (ea, eb) = (q.evaluate(&pa), q.evaluate(&pb));
        let best_endpoint = if eb < ea { (b, pb) } else { (a, pa) };

        match self.params.placement {
            CollapsePlacement::Endpoints => best_endpoint,
            CollapsePlacement::Midpoint => {
                let mid = na::center(&pa, &pb);
                let kept = if eb < ea { b } else { a };
                if q.evaluate(&mid) <= q.evaluate(&best_endpoint.1) {
                    (kept, mid)
                } else {
                    best_endpoint
                }
            }
            CollapsePlacement::Optimal => {
                let len = (pb - pa).norm();
                let mid = na::center(&pa, &pb);
                let kept = if eb < ea { b } else { a };
                let optimal = q
                    .optimal_point()
                    .filter(|p| (p - mid).norm() <= len * 2.0 + Real::EPSILON);
                let mut best = best_endpoint;
                let mut best_err = q.evaluate(&best.1);
                for cand in optimal.into_iter().chain(std::iter::once(mid)) {
                    let err = q.evaluate(&cand);
                    if err < best_err {
                        best_err = err;
                        best = (kept, cand);
                    }
                }
                best
            }
        }
    }

    fn neighbors(&self, v: u32) -> SmallVec<[u32; 16]> {
        let mut result: SmallVec<[u32; 16]> = SmallVec::new();
        for t in &self.vert_tris[v as usize] {
            if !self.tri_alive[*t as usize] {
                continue;
            }
            for w in self.tris[*t as usize] {
                if w != v && !result.contains(&w) {
                    result.push(w);
                }
            }
        }
        result
    }

    fn is_feature_edge(&self, a: u32, b: u32) -> bool {
        let mut shared: SmallVec<[u32; 2]> = SmallVec::new();
        for t in &self.vert_tris[a as usize] {
            if self.tri_alive[*t as usize] && self.tris[*t as usize].contains(&b) {
                shared.push(*t);
            }
        }
        shared.len() != 2
            || (self.params.preserve_group_boundaries
                && self.tri_keys[shared[0] as usize] != self.tri_keys[shared[1] as usize])
    }

    fn plan_collapse(&self, a: u32, b: u32) -> Option<Collapse> {
        let (pin_a, pin_b) = (self.pinned[a as usize], self.pinned[b as usize]);
        if pin_a && pin_b {
            return None;
        }

        let q = self.quadrics[a as usize] + self.quadrics[b as usize];
        let (fa, fb) = (self.feature[a as usize], self.feature[b as usize]);

        let (kept, target) = if pin_a {
            (a, self.positions[a as usize])
        } else if pin_b {
            (b, self.positions[b as usize])
        } else if self.params.boundary != BoundaryConstraint::Free && (fa || fb) {
            if fa && fb {
                // Both on features: only slide along a feature edge, and
                // only onto one of its endpoints.
                if !self.is_feature_edge(a, b) {
                    return None;
                }
                let (ea, eb) = (
                    q.evaluate(&self.positions[a as usize]),
                    q.evaluate(&self.positions[b as usize]),
                );
                if eb < ea {
                    (b, self.positions[b as usize])
                } else {
                    (a, self.positions[a as usize])
                }
            } else if fa {
                (a, self.positions[a as usize])
            } else {
                (b, self.positions[b as usize])
            }
        } else {
            self.choose_target(a, b, &q)
        };
        let removed = if kept == a { b } else { a };

        if !self.link_condition(a, b) {
            return None;
        }

        if let Some(tol) = self.params.geometric_tolerance {
            let sq_tol = (tol as f64) * (tol as f64);
            let err = q.evaluate(&target);
            let weight = q.weight.max(1.0);
            if err / weight > sq_tol {
                return None;
            }
        }

        let mut new_centroids: SmallVec<[Point<Real>; 16]> = SmallVec::new();
        for v in [a, b] {
            for t in &self.vert_tris[v as usize] {
                if !self.tri_alive[*t as usize] {
                    continue;
                }
                let tri = self.tris[*t as usize];
                if tri.contains(&a) && tri.contains(&b) {
                    continue;
                }
                let old = self.tri_points(&tri, None);
                let new = self.tri_points(&tri, Some((a, b, target)));
                let n_old = (old[1] - old[0]).cross(&(old[2] - old[0]));
                let n_new = (new[1] - new[0]).cross(&(new[2] - new[0]));
                let area_old = n_old.norm();
                let area_new = n_new.norm();
                if area_new <= area_old.max(Real::EPSILON) * 1.0e-4 {
                    return None;
                }
                if n_old.dot(&n_new) < self.params.min_normal_dot * area_old * area_new {
                    return None;
                }
                new_centroids.push(Point::from((new[0].coords + new[1].coords + new[2].coords) / 3.0));
            }
        }

        if let (Some(reference), Some(tol)) = (&self.reference, self.params.geometric_tolerance) {
            let within = |p: &Point<Real>| {
                reference
                    .project_point_with_max_dist(p, tol * 1.0001 + Real::EPSILON)
                    .is_some()
            };
            if !within(&target) || !new_centroids.iter().all(within) {
                return None;
            }
        }

        Some(Collapse {
            kept,
            removed,
            target,
        })
    }

    fn tri_points(&self, tri: &[u32; 3], moved: Option<(u32, u32, Point<Real>)>) -> [Point<Real>; 3] {
        let mut pts = [Point::origin(); 3];
        for k in 0..3 {
            pts[k] = match moved {
                Some((a, b, p)) if tri[k] == a || tri[k] == b => p,
                _ => self.positions[tri[k] as usize],
            };
        }
        pts
    }

    /// The one-ring intersection of `a` and `b` must be exactly the vertices
    /// opposite to the edge `(a, b)`.
    fn link_condition(&self, a: u32, b: u32) -> bool {
        let na = self.neighbors(a);
        let nb = self.neighbors(b);
        let common = na.iter().filter(|v| nb.contains(v)).count();

        let mut num_edge_tris = 0;
        for t in &self.vert_tris[a as usize] {
            if self.tri_alive[*t as usize] && self.tris[*t as usize].contains(&b) {
                num_edge_tris += 1;
            }
        }

        if num_edge_tris == 0 || num_edge_tris > 2 || common != num_edge_tris {
            return false;
        }

        // Collapsing the last edge of a closed tetrahedron-like component
        // would produce a degenerate sheet.
        !(num_edge_tris == 2 && na.len() <= 3 && nb.len() <= 3)
    }

    fn apply(&mut self, collapse: &Collapse) {
        let Collapse {
            kept,
            removed,
            target,
        } = *collapse;

        let removed_tris = std::mem::take(&mut self.vert_tris[removed as usize]);
        for t in &removed_tris {
            if !self.tri_alive[*t as usize] {
                continue;
            }
            let tri = &mut self.tris[*t as usize];
            if tri.contains(&kept) {
                self.tri_alive[*t as usize] = false;
                self.num_alive -= 1;
            } else {
                for k in 0..3 {
                    if tri[k] == removed {
                        tri[k] = kept;
                    }
                }
                self.vert_tris[kept as usize].push(*t);
            }
        }

        let tri_alive = &self.tri_alive;
        self.vert_tris[kept as usize].retain(|t| tri_alive[*t as usize]);

        self.positions[kept as usize] = target;
        let qr = self.quadrics[removed as usize];
        self.quadrics[kept as usize] += qr;
        self.feature[kept as usize] |= self.feature[removed as usize];
        self.vert_alive[removed as usize] = false;
        self.version[kept as usize] += 1;
        self.version[removed as usize] += 1;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::simplify::SimplifyParams;

    pub(crate) fn grid(nx: usize, ny: usize) -> AttributedMesh {
        let mut vertices = Vec::new();
        let mut indices = Vec::new();
        for j in 0..=ny {
            for i in 0..=nx {
                vertices.push(Point::new(i as Real, j as Real, 0.0));
            }
        }
        let w = (nx + 1) as u32;
        for j in 0..ny as u32 {
            for i in 0..nx as u32 {
                let a = j * w + i;
                indices.push([a, a + 1, a + w + 1]);
                indices.push([a, a + w + 1, a + w]);
            }
        }
        AttributedMesh::new(vertices, indices)
    }

    #[test]
    fn planar_grid_collapses_to_two_triangles() {
        let mut mesh = grid(10, 5);
        assert_eq!(mesh.num_triangles(), 100);
        let params = SimplifyParams {
            target_triangle_count: 1,
            geometric_tolerance: Some(1.0e-3),
            placement: CollapsePlacement::Endpoints,
            ..SimplifyParams::default()
        };
        let stats = simplify_mesh(&mut mesh, &params);
        assert!(stats.final_triangles <= 2, "{:?}", stats);
        let (_, area) = mesh.volume_and_area();
        assert!((area - 50.0).abs() < 1.0e-3);
    }

    #[test]
    fn pinned_vertices_survive() {
        let mut mesh = grid(4, 4);
        let pinned_pos = mesh.vertices[12];
        let params = SimplifyParams {
            target_triangle_count: 1,
            geometric_tolerance: Some(1.0e-3),
            pinned_vertices: vec![12],
            ..SimplifyParams::default()
        };
        let _ = simplify_mesh(&mut mesh, &params);
        assert!(mesh.vertices.contains(&pinned_pos));
    }
}
