use crate::math::{Affine, Color, Point, Point2, Real, Vector};
use na::Matrix3;
use parry3d::bounding_volume::Aabb;
use std::collections::BTreeMap;

/// An indexed triangle mesh carrying the per-vertex and per-triangle
/// attributes needed to combine part meshes.
///
/// Attributes are stored per vertex: UV or normal seams are represented by
/// duplicated vertices, which makes the seams show up as open boundaries in
/// the index topology.
///
/// Every per-vertex array (`normals`, each UV layer, `colors`) has exactly
/// `vertices.len()` entries when present; every per-triangle array
/// (`material_ids`, `group_ids`, `subset_ids`) has exactly `indices.len()`
/// entries when present.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct AttributedMesh {
    /// Vertex positions.
    pub vertices: Vec<Point<Real>>,
    /// Optional per-vertex normals.
    pub normals: Option<Vec<Vector<Real>>>,
    /// Per-vertex UV layers (possibly none).
    pub uv_layers: Vec<Vec<Point2<Real>>>,
    /// Optional per-vertex linear colors.
    pub colors: Option<Vec<Color>>,
    /// Triangles, counter-clockwise when seen from the outside.
    pub indices: Vec<[u32; 3]>,
    /// Per-triangle material index.
    pub material_ids: Vec<u32>,
    /// Per-triangle grouping id (polygroup).
    pub group_ids: Vec<u32>,
    /// Optional per-triangle subset id.
    pub subset_ids: Option<Vec<u32>>,
}

impl AttributedMesh {
    /// Creates a mesh with positions and triangles only.
    ///
    /// All triangles get material 0 and group 0.
    pub fn new(vertices: Vec<Point<Real>>, indices: Vec<[u32; 3]>) -> Self {
        let num_triangles = indices.len();
        Self {
            vertices,
            normals: None,
            uv_layers: Vec::new(),
            colors: None,
            indices,
            material_ids: vec![0; num_triangles],
            group_ids: vec![0; num_triangles],
            subset_ids: None,
        }
    }

    /// The number of triangles of this mesh.
    #[inline]
    pub fn num_triangles(&self) -> usize {
        self.indices.len()
    }

    /// The number of vertices of this mesh, including unreferenced ones.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Returns `true` if this mesh has no triangles.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// The number of UV layers.
    #[inline]
    pub fn num_uv_layers(&self) -> usize {
        self.uv_layers.len()
    }

    /// The three vertices of the `i`-th triangle.
    #[inline]
    pub fn triangle(&self, i: usize) -> [Point<Real>; 3] {
        let idx = self.indices[i];
        [
            self.vertices[idx[0] as usize],
            self.vertices[idx[1] as usize],
            self.vertices[idx[2] as usize],
        ]
    }

    /// The unnormalized normal of the `i`-th triangle (its length is twice the
    /// triangle area).
    #[inline]
    pub fn triangle_scaled_normal(&self, i: usize) -> Vector<Real> {
        let [a, b, c] = self.triangle(i);
        (b - a).cross(&(c - a))
    }

    /// The unit normal of the `i`-th triangle, or zero if it is degenerate.
    pub fn triangle_normal(&self, i: usize) -> Vector<Real> {
        self.triangle_scaled_normal(i)
            .try_normalize(Real::EPSILON)
            .unwrap_or_else(Vector::zeros)
    }

    /// The area of the `i`-th triangle.
    #[inline]
    pub fn triangle_area(&self, i: usize) -> Real {
        self.triangle_scaled_normal(i).norm() * 0.5
    }

    /// The centroid of the `i`-th triangle.
    #[inline]
    pub fn triangle_centroid(&self, i: usize) -> Point<Real> {
        let [a, b, c] = self.triangle(i);
        Point::from((a.coords + b.coords + c.coords) / 3.0)
    }

    /// Total surface area.
    pub fn area(&self) -> Real {
        (0..self.num_triangles()).map(|i| self.triangle_area(i)).sum()
    }

    /// Computes the enclosed volume and the surface area of this mesh.
    ///
    /// The volume is computed with the divergence theorem, so it is only
    /// meaningful for closed, consistently oriented meshes. Its absolute value
    /// is returned.
    pub fn volume_and_area(&self) -> (Real, Real) {
        let mut volume = 0.0;
        let mut area = 0.0;
        for i in 0..self.num_triangles() {
            let [a, b, c] = self.triangle(i);
            volume += a.coords.dot(&b.coords.cross(&c.coords));
            area += (b - a).cross(&(c - a)).norm() * 0.5;
        }
        ((volume / 6.0).abs(), area)
    }

    /// The axis-aligned bounding box of the vertices referenced by triangles.
    ///
    /// Returns an invalid (inverted) box if the mesh is empty.
    pub fn aabb(&self) -> Aabb {
        let mut aabb = Aabb::new_invalid();
        for tri in &self.indices {
            for k in 0..3 {
                aabb.take_point(self.vertices[tri[k] as usize]);
            }
        }
        aabb
    }

    /// Returns the ids of the vertices actually referenced by a triangle.
    pub fn referenced_vertices(&self) -> Vec<bool> {
        let mut used = vec![false; self.vertices.len()];
        for tri in &self.indices {
            for k in 0..3 {
                used[tri[k] as usize] = true;
            }
        }
        used
    }

    /// Removes every UV layer.
    pub fn strip_uvs(&mut self) {
        self.uv_layers.clear();
    }

    /// Removes the vertex colors.
    pub fn strip_colors(&mut self) {
        self.colors = None;
    }

    /// Resizes the UV layer list, filling new layers with `(0, 0)`.
    pub fn set_num_uv_layers(&mut self, num_layers: usize) {
        let n = self.vertices.len();
        self.uv_layers.resize_with(num_layers, || vec![Point2::origin(); n]);
    }

    /// Ensures a per-triangle subset id array exists, initialized with `subset`.
    pub fn enable_subset_ids(&mut self, subset: u32) {
        if self.subset_ids.is_none() {
            self.subset_ids = Some(vec![subset; self.indices.len()]);
        }
    }

    /// Sets the material of every triangle.
    pub fn set_material(&mut self, material: u32) {
        self.material_ids.iter_mut().for_each(|m| *m = material);
    }

    /// Reverses the orientation of every triangle.
    pub fn reverse_orientation(&mut self) {
        for tri in &mut self.indices {
            tri.swap(1, 2);
        }
        if let Some(normals) = &mut self.normals {
            normals.iter_mut().for_each(|n| *n = -*n);
        }
    }

    /// Applies an affine transformation to the positions and normals.
    ///
    /// Normals are transformed by the inverse-transpose of the linear part. If
    /// the transformation mirrors space, the triangle winding is flipped so
    /// that the mesh stays outward-oriented.
    pub fn transform_by(&mut self, transform: &Affine<Real>) {
        for v in &mut self.vertices {
            *v = transform * *v;
        }

        let linear: Matrix3<Real> = transform.matrix().fixed_view::<3, 3>(0, 0).into_owned();
        if let Some(normals) = &mut self.normals {
            let normal_matrix = linear
                .try_inverse()
                .map(|inv| inv.transpose())
                .unwrap_or(linear);
            for n in normals.iter_mut() {
                *n = (normal_matrix * *n)
                    .try_normalize(Real::EPSILON)
                    .unwrap_or(*n);
            }
        }

        if linear.determinant() < 0.0 {
            for tri in &mut self.indices {
                tri.swap(1, 2);
            }
        }
    }

    /// Appends `other` to this mesh.
    ///
    /// Attribute layouts are reconciled: missing UV layers are filled with
    /// `(0, 0)`, missing colors with white, and normals are only kept if both
    /// meshes have them (or if `self` was empty).
    pub fn append(&mut self, other: &AttributedMesh) {
        if self.vertices.is_empty() && self.indices.is_empty() {
            *self = other.clone();
            return;
        }

        let base = self.vertices.len() as u32;
        let num_layers = self.uv_layers.len().max(other.uv_layers.len());
        self.set_num_uv_layers(num_layers);
        for (layer_id, layer) in self.uv_layers.iter_mut().enumerate() {
            match other.uv_layers.get(layer_id) {
                Some(src) => layer.extend_from_slice(src),
                None => layer.extend(std::iter::repeat(Point2::origin()).take(other.vertices.len())),
            }
        }

        match (&mut self.normals, &other.normals) {
            (Some(dst), Some(src)) => dst.extend_from_slice(src),
            (dst, _) => *dst = None,
        }

        if self.colors.is_some() || other.colors.is_some() {
            let white = Color::repeat(1.0);
            let num_vertices = self.vertices.len();
            let dst = self
                .colors
                .get_or_insert_with(|| vec![white; num_vertices]);
            match &other.colors {
                Some(src) => dst.extend_from_slice(src),
                None => dst.extend(std::iter::repeat(white).take(other.vertices.len())),
            }
        }

        if self.subset_ids.is_some() || other.subset_ids.is_some() {
            let num_tris = self.indices.len();
            let dst = self.subset_ids.get_or_insert_with(|| vec![0; num_tris]);
            match &other.subset_ids {
                Some(src) => dst.extend_from_slice(src),
                None => dst.extend(std::iter::repeat(0).take(other.indices.len())),
            }
        }

        self.vertices.extend_from_slice(&other.vertices);
        self.indices.extend(
            other
                .indices
                .iter()
                .map(|t| [t[0] + base, t[1] + base, t[2] + base]),
        );
        self.material_ids.extend_from_slice(&other.material_ids);
        self.group_ids.extend_from_slice(&other.group_ids);
    }

    /// Appends a copy of `other` transformed by `transform`.
    pub fn append_transformed(&mut self, other: &AttributedMesh, transform: &Affine<Real>) {
        let mut moved = other.clone();
        moved.transform_by(transform);
        self.append(&moved);
    }

    /// Keeps only the triangles for which `keep` returns `true`, then removes
    /// unreferenced vertices.
    pub fn retain_triangles(&mut self, mut keep: impl FnMut(usize) -> bool) {
        let mut kept = Vec::with_capacity(self.indices.len());
        for i in 0..self.indices.len() {
            if keep(i) {
                kept.push(i);
            }
        }
        if kept.len() == self.indices.len() {
            return;
        }

        self.indices = kept.iter().map(|i| self.indices[*i]).collect();
        self.material_ids = kept.iter().map(|i| self.material_ids[*i]).collect();
        self.group_ids = kept.iter().map(|i| self.group_ids[*i]).collect();
        if let Some(subsets) = &mut self.subset_ids {
            *subsets = kept.iter().map(|i| subsets[*i]).collect();
        }
        self.compact();
    }

    /// Removes the vertices not referenced by any triangle and remaps indices.
    pub fn compact(&mut self) {
        let used = self.referenced_vertices();
        if used.iter().all(|u| *u) {
            return;
        }

        let mut remap = vec![u32::MAX; self.vertices.len()];
        let mut next = 0;
        for (i, u) in used.iter().enumerate() {
            if *u {
                remap[i] = next;
                next += 1;
            }
        }

        fn filter<T: Copy>(data: &mut Vec<T>, used: &[bool]) {
            let mut i = 0;
            data.retain(|_| {
                i += 1;
                used[i - 1]
            });
        }

        filter(&mut self.vertices, &used);
        if let Some(normals) = &mut self.normals {
            filter(normals, &used);
        }
        for layer in &mut self.uv_layers {
            filter(layer, &used);
        }
        if let Some(colors) = &mut self.colors {
            filter(colors, &used);
        }
        for tri in &mut self.indices {
            for k in 0..3 {
                tri[k] = remap[tri[k] as usize];
            }
        }
    }

    /// Copies the triangles listed in `triangles` into a new mesh.
    pub fn extract_triangles(&self, triangles: &[usize]) -> AttributedMesh {
        let mut result = self.clone();
        let mut order = triangles.to_vec();
        order.sort_unstable();
        order.dedup();
        result.indices = order.iter().map(|i| self.indices[*i]).collect();
        result.material_ids = order.iter().map(|i| self.material_ids[*i]).collect();
        result.group_ids = order.iter().map(|i| self.group_ids[*i]).collect();
        if let Some(subsets) = &self.subset_ids {
            result.subset_ids = Some(order.iter().map(|i| subsets[*i]).collect());
        }
        result.compact();
        result
    }

    /// Splits this mesh into sub-meshes keyed by `key(triangle_id)`.
    ///
    /// The sub-meshes are returned in increasing key order.
    pub fn split_by<K: Ord>(&self, mut key: impl FnMut(usize) -> K) -> Vec<(K, AttributedMesh)> {
        let mut buckets: BTreeMap<K, Vec<usize>> = BTreeMap::new();
        for i in 0..self.indices.len() {
            buckets.entry(key(i)).or_default().push(i);
        }
        buckets
            .into_iter()
            .map(|(k, tris)| (k, self.extract_triangles(&tris)))
            .collect()
    }

    /// Computes area-weighted per-vertex normals, splitting vertices whose
    /// incident faces differ by more than `hard_angle_deg`.
    pub fn recompute_normals(&mut self, hard_angle_deg: Real) {
        let cos_threshold = hard_angle_deg.to_radians().cos();
        let face_normals: Vec<_> = (0..self.num_triangles())
            .map(|i| self.triangle_normal(i))
            .collect();
        let face_weights: Vec<_> = (0..self.num_triangles())
            .map(|i| self.triangle_area(i))
            .collect();

        let mut incident = vec![Vec::new(); self.vertices.len()];
        for (tid, tri) in self.indices.iter().enumerate() {
            for k in 0..3 {
                incident[tri[k] as usize].push((tid, k));
            }
        }

        let mut normals = vec![Vector::zeros(); self.vertices.len()];
        let mut splits: Vec<(u32, Vec<(usize, usize)>, Vector<Real>)> = Vec::new();

        for (vid, corners) in incident.iter().enumerate() {
            if corners.is_empty() {
                continue;
            }

            // Greedy clustering of incident faces by normal direction.
            let mut clusters: Vec<(Vector<Real>, Vector<Real>, Vec<(usize, usize)>)> = Vec::new();
            for &(tid, k) in corners {
                let n = face_normals[tid];
                match clusters.iter_mut().find(|(seed, _, _)| seed.dot(&n) >= cos_threshold) {
                    Some((_, acc, members)) => {
                        *acc += n * face_weights[tid];
                        members.push((tid, k));
                    }
                    None => clusters.push((n, n * face_weights[tid], vec![(tid, k)])),
                }
            }

            let mut clusters = clusters.into_iter();
            if let Some((seed, acc, _)) = clusters.next() {
                normals[vid] = acc.try_normalize(Real::EPSILON).unwrap_or(seed);
            }
            for (seed, acc, members) in clusters {
                splits.push((
                    vid as u32,
                    members,
                    acc.try_normalize(Real::EPSILON).unwrap_or(seed),
                ));
            }
        }

        for (vid, members, normal) in splits {
            let new_id = self.duplicate_vertex(vid);
            normals.push(normal);
            for (tid, k) in members {
                self.indices[tid][k] = new_id;
            }
        }

        self.normals = Some(normals);
    }

    /// Appends a copy of vertex `vid` (with all its attributes) and returns
    /// the new vertex id.
    ///
    /// If normals are present, the copy's normal is the original's.
    pub fn duplicate_vertex(&mut self, vid: u32) -> u32 {
        let v = vid as usize;
        let new_id = self.vertices.len() as u32;
        self.vertices.push(self.vertices[v]);
        if let Some(normals) = &mut self.normals {
            normals.push(normals[v]);
        }
        for layer in &mut self.uv_layers {
            layer.push(layer[v]);
        }
        if let Some(colors) = &mut self.colors {
            colors.push(colors[v]);
        }
        new_id
    }

    /// Reorders vertices and triangles into a canonical order that only
    /// depends on the geometry, so that results computed from differently
    /// ordered inputs match exactly.
    pub fn sort_for_determinism(&mut self) {
        self.compact();

        let mut order: Vec<u32> = (0..self.vertices.len() as u32).collect();
        order.sort_by(|a, b| {
            let pa = self.vertices[*a as usize];
            let pb = self.vertices[*b as usize];
            pa.x.total_cmp(&pb.x)
                .then(pa.y.total_cmp(&pb.y))
                .then(pa.z.total_cmp(&pb.z))
        });
        let mut remap = vec![0u32; order.len()];
        for (new_id, old_id) in order.iter().enumerate() {
            remap[*old_id as usize] = new_id as u32;
        }

        fn permute<T: Copy>(data: &mut Vec<T>, order: &[u32]) {
            *data = order.iter().map(|i| data[*i as usize]).collect();
        }
        permute(&mut self.vertices, &order);
        if let Some(normals) = &mut self.normals {
            permute(normals, &order);
        }
        for layer in &mut self.uv_layers {
            permute(layer, &order);
        }
        if let Some(colors) = &mut self.colors {
            permute(colors, &order);
        }

        for tri in &mut self.indices {
            let mut t = [remap[tri[0] as usize], remap[tri[1] as usize], remap[tri[2] as usize]];
            // Rotate (preserving winding) so the smallest index comes first.
            let first = (0..3).min_by_key(|k| t[*k]).unwrap_or(0);
            t.rotate_left(first);
            *tri = t;
        }

        let mut tri_order: Vec<usize> = (0..self.indices.len()).collect();
        tri_order.sort_by_key(|i| (self.indices[*i], self.material_ids[*i], self.group_ids[*i]));
        self.indices = tri_order.iter().map(|i| self.indices[*i]).collect();
        self.material_ids = tri_order.iter().map(|i| self.material_ids[*i]).collect();
        self.group_ids = tri_order.iter().map(|i| self.group_ids[*i]).collect();
        if let Some(subsets) = &mut self.subset_ids {
            *subsets = tri_order.iter().map(|i| subsets[*i]).collect();
        }
    }

    /// Checks that all the attribute arrays have consistent lengths and that
    /// every index is in bounds.
    pub fn is_consistent(&self) -> bool {
        let nv = self.vertices.len();
        let nt = self.indices.len();
        self.normals.as_ref().map(|n| n.len() == nv).unwrap_or(true)
            && self.uv_layers.iter().all(|l| l.len() == nv)
            && self.colors.as_ref().map(|c| c.len() == nv).unwrap_or(true)
            && self.material_ids.len() == nt
            && self.group_ids.len() == nt
            && self.subset_ids.as_ref().map(|s| s.len() == nt).unwrap_or(true)
            && self
                .indices
                .iter()
                .all(|t| t.iter().all(|i| (*i as usize) < nv))
    }
}
