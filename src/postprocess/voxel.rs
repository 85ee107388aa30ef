use crate::math::{Point, Real, Vector};
use crate::mesh::AttributedMesh;
use hashbrown::HashMap;
use parry3d::bounding_volume::Aabb;
use parry3d::transformation::voxelization::{FillMode, VoxelValue as SurfaceVoxel, VoxelizedVolume};

/// Squared distance standing for "no source cell".
const FAR: f32 = 1.0e18;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum VoxelValue {
    Undefined,
    OnSurface,
    Outside,
    Inside,
}

/// A regular grid of cubic voxels.
///
/// Voxel `(i, j, k)` is centered at `origin + (i, j, k) * cell`. Every voxel
/// of the outermost layer is empty, so the extracted surfaces are closed.
#[derive(Clone, Debug)]
pub(crate) struct VoxelGrid {
    origin: Point<Real>,
    cell: Real,
    dims: [usize; 3],
    data: Vec<VoxelValue>,
}

impl VoxelGrid {
    /// A grid covering `aabb` plus `padding` voxels on each side.
    pub fn new(aabb: &Aabb, cell: Real, padding: usize) -> Self {
        let extents = aabb.extents();
        let mut dims = [0; 3];
        for k in 0..3 {
            dims[k] = (extents[k] / cell).ceil() as usize + 1 + 2 * padding;
        }
        let origin = aabb.mins - Vector::repeat(padding as Real * cell);
        Self {
            origin,
            cell,
            dims,
            data: vec![VoxelValue::Undefined; dims[0] * dims[1] * dims[2]],
        }
    }

    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    pub fn num_voxels(&self) -> usize {
        self.data.len()
    }

    #[inline]
    fn index(&self, i: usize, j: usize, k: usize) -> usize {
        (k * self.dims[1] + j) * self.dims[0] + i
    }

    /// The index of the voxel containing `pt`.
    #[cfg(test)]
    fn index_at(&self, pt: &Point<Real>) -> usize {
        let ijk = (pt - self.origin) / self.cell;
        let c = |k: usize| (ijk[k].round().max(0.0) as usize).min(self.dims[k] - 1);
        self.index(c(0), c(1), c(2))
    }

    #[inline]
    pub fn center(&self, i: usize, j: usize, k: usize) -> Point<Real> {
        self.origin + Vector::new(i as Real, j as Real, k as Real) * self.cell
    }

    /// Marks the voxels intersecting a triangle of `mesh` as on-surface.
    pub fn voxelize_surface(&mut self, mesh: &AttributedMesh) {
        if mesh.indices.is_empty() {
            return;
        }

        let surface = VoxelizedVolume::with_voxel_size(
            &mesh.vertices,
            &mesh.indices,
            self.cell,
            FillMode::SurfaceOnly,
            false,
        );
        // Voxel `(i, j, k)` of `surface` is centered at the corner of the
        // vertex bounding box plus `(i, j, k) * cell`.
        let shift = (Aabb::from_points_ref(&mesh.vertices).mins - self.origin) / self.cell;
        let dims = self.dims;
        let to_grid = |c: u32, axis: usize| {
            let c = (c as Real + shift[axis]).round();
            (c >= 0.0 && (c as usize) < dims[axis]).then_some(c as usize)
        };

        let [rx, ry, rz] = surface.resolution();
        for k in 0..rz {
            for j in 0..ry {
                for i in 0..rx {
                    if surface.voxel(i, j, k) != SurfaceVoxel::PrimitiveOnSurface {
                        continue;
                    }
                    if let (Some(gi), Some(gj), Some(gk)) = (to_grid(i, 0), to_grid(j, 1), to_grid(k, 2)) {
                        let id = self.index(gi, gj, gk);
                        self.data[id] = VoxelValue::OnSurface;
                    }
                }
            }
        }
    }

    /// Flood-fills the outside from the grid border; the remaining undefined
    /// voxels are inside.
    pub fn fill_inside(&mut self) {
        let [nx, ny, nz] = self.dims;
        let mut stack = Vec::new();
        for k in 0..nz {
            for j in 0..ny {
                for i in 0..nx {
                    let border = i == 0 || j == 0 || k == 0 || i == nx - 1 || j == ny - 1 || k == nz - 1;
                    let id = self.index(i, j, k);
                    if border && self.data[id] == VoxelValue::Undefined {
                        self.data[id] = VoxelValue::Outside;
                        stack.push([i, j, k]);
                    }
                }
            }
        }

        while let Some([i, j, k]) = stack.pop() {
            for (axis, delta) in [(0, -1isize), (0, 1), (1, -1), (1, 1), (2, -1), (2, 1)] {
                let mut n = [i, j, k];
                let c = n[axis] as isize + delta;
                if c < 0 || c as usize >= self.dims[axis] {
                    continue;
                }
                n[axis] = c as usize;
                let id = self.index(n[0], n[1], n[2]);
                if self.data[id] == VoxelValue::Undefined {
                    self.data[id] = VoxelValue::Outside;
                    stack.push(n);
                }
            }
        }

        for value in &mut self.data {
            if *value == VoxelValue::Undefined {
                *value = VoxelValue::Inside;
            }
        }
    }

    /// Whether each voxel is on the surface or inside.
    pub fn occupancy(&self) -> Vec<bool> {
        self.data
            .iter()
            .map(|v| matches!(v, VoxelValue::OnSurface | VoxelValue::Inside))
            .collect()
    }

    /// Sets the occupancy of each voxel from `occupied(center)`.
    pub fn occupancy_from(&self, occupied: impl Fn(&Point<Real>) -> bool) -> Vec<bool> {
        let [nx, ny, nz] = self.dims;
        let mut result = vec![false; self.data.len()];
        // The border stays empty.
        for k in 1..nz.saturating_sub(1) {
            for j in 1..ny.saturating_sub(1) {
                for i in 1..nx.saturating_sub(1) {
                    result[self.index(i, j, k)] = occupied(&self.center(i, j, k));
                }
            }
        }
        result
    }

    /// Morphological closing of `occupied` with a ball of `radius` (in world
    /// units), computed from exact Euclidean distance transforms.
    pub fn close(&self, occupied: &[bool], radius: Real) -> Vec<bool> {
        let r = radius / self.cell;
        let r_sq = (r * r) as f32;
        if r_sq < 1.0 {
            return occupied.to_vec();
        }

        let to_occupied = squared_distance_transform(occupied, self.dims);
        let dilated: Vec<bool> = to_occupied.iter().map(|d| *d <= r_sq).collect();
        let empty: Vec<bool> = dilated.iter().map(|d| !*d).collect();
        let to_empty = squared_distance_transform(&empty, self.dims);
        let mut closed: Vec<bool> = to_empty.iter().map(|d| *d > r_sq).collect();

        let [nx, ny, nz] = self.dims;
        for k in 0..nz {
            for j in 0..ny {
                for i in 0..nx {
                    if i == 0 || j == 0 || k == 0 || i == nx - 1 || j == ny - 1 || k == nz - 1 {
                        closed[self.index(i, j, k)] = false;
                    }
                }
            }
        }
        closed
    }

    /// Extracts the boundary of `occupied` with surface nets.
    ///
    /// Each grid cube with mixed occupancy gets one vertex at the average of
    /// its crossing edge midpoints. Each voxel face between an occupied and
    /// an empty voxel yields an outward-facing quad.
    pub fn surface_nets(&self, occupied: &[bool]) -> AttributedMesh {
        let [nx, ny, nz] = self.dims;
        let at = |i: usize, j: usize, k: usize| occupied[self.index(i, j, k)];
        let mut vertex_ids: HashMap<[usize; 3], u32> = HashMap::new();
        let mut vertices = Vec::new();

        let mut cube_vertex = |c: [usize; 3], vertices: &mut Vec<Point<Real>>| -> u32 {
            *vertex_ids.entry(c).or_insert_with(|| {
                let mut sum = Vector::zeros();
                let mut count = 0;
                for axis in 0..3 {
                    let (u, v) = ((axis + 1) % 3, (axis + 2) % 3);
                    for du in 0..2 {
                        for dv in 0..2 {
                            let mut a = c;
                            a[u] += du;
                            a[v] += dv;
                            let mut b = a;
                            b[axis] += 1;
                            if at(a[0], a[1], a[2]) != at(b[0], b[1], b[2]) {
                                let pa = self.center(a[0], a[1], a[2]);
                                let pb = self.center(b[0], b[1], b[2]);
                                sum += (pa.coords + pb.coords) * 0.5;
                                count += 1;
                            }
                        }
                    }
                }
                vertices.push(Point::from(sum / count.max(1) as Real));
                (vertices.len() - 1) as u32
            })
        };

        // A crossing edge never lies in the border layer, so the cubes around
        // it are in the grid.
        let mut indices = Vec::new();
        for k in 0..nz {
            for j in 0..ny {
                for i in 0..nx {
                    for axis in 0..3 {
                        let p0 = [i, j, k];
                        let mut p1 = p0;
                        p1[axis] += 1;
                        if p1[axis] >= self.dims[axis] {
                            continue;
                        }
                        let inside0 = at(p0[0], p0[1], p0[2]);
                        if inside0 == at(p1[0], p1[1], p1[2]) {
                            continue;
                        }

                        // The four cubes around the edge p0-p1, counter-clockwise
                        // around +axis.
                        let (u, v) = ((axis + 1) % 3, (axis + 2) % 3);
                        let corner = |du: usize, dv: usize| {
                            let mut c = p0;
                            c[u] -= du;
                            c[v] -= dv;
                            c
                        };
                        let quad = [
                            cube_vertex(corner(1, 1), &mut vertices),
                            cube_vertex(corner(0, 1), &mut vertices),
                            cube_vertex(corner(0, 0), &mut vertices),
                            cube_vertex(corner(1, 0), &mut vertices),
                        ];
                        if inside0 {
                            indices.push([quad[0], quad[1], quad[2]]);
                            indices.push([quad[0], quad[2], quad[3]]);
                        } else {
                            indices.push([quad[0], quad[2], quad[1]]);
                            indices.push([quad[0], quad[3], quad[2]]);
                        }
                    }
                }
            }
        }

        AttributedMesh::new(vertices, indices)
    }
}

/// One-dimensional squared distance transform of the sampled function `f`
/// (lower envelope of parabolas).
fn distance_transform_1d(f: &[f32], d: &mut [f32], v: &mut [usize], z: &mut [f32]) {
    let n = f.len();
    if n == 0 {
        return;
    }
    let parabola_cut = |q: usize, p: usize| {
        let (qf, pf) = (q as f32, p as f32);
        ((f[q] + qf * qf) - (f[p] + pf * pf)) / (2.0 * qf - 2.0 * pf)
    };

    let mut k = 0;
    v[0] = 0;
    z[0] = f32::NEG_INFINITY;
    z[1] = f32::INFINITY;
    for q in 1..n {
        let mut s = parabola_cut(q, v[k]);
        while s <= z[k] {
            k -= 1;
            s = parabola_cut(q, v[k]);
        }
        k += 1;
        v[k] = q;
        z[k] = s;
        z[k + 1] = f32::INFINITY;
    }

    k = 0;
    for (q, out) in d.iter_mut().enumerate().take(n) {
        while z[k + 1] < q as f32 {
            k += 1;
        }
        let dq = q as f32 - v[k] as f32;
        *out = dq * dq + f[v[k]];
    }
}

/// Squared Euclidean distance, in voxels, from each voxel to the closest
/// voxel where `sources` is set.
pub(crate) fn squared_distance_transform(sources: &[bool], dims: [usize; 3]) -> Vec<f32> {
    let mut grid: Vec<f32> = sources.iter().map(|s| if *s { 0.0 } else { FAR }).collect();
    let max_dim = dims.iter().copied().max().unwrap_or(0);
    let mut f = vec![0.0; max_dim];
    let mut d = vec![0.0; max_dim];
    let mut v = vec![0; max_dim];
    let mut z = vec![0.0; max_dim + 1];

    let strides = [1, dims[0], dims[0] * dims[1]];
    for axis in 0..3 {
        let n = dims[axis];
        let (a, b) = ((axis + 1) % 3, (axis + 2) % 3);
        for ib in 0..dims[b] {
            for ia in 0..dims[a] {
                let base = ia * strides[a] + ib * strides[b];
                for q in 0..n {
                    f[q] = grid[base + q * strides[axis]];
                }
                distance_transform_1d(&f[..n], &mut d[..n], &mut v[..n], &mut z[..n + 1]);
                for q in 0..n {
                    grid[base + q * strides[axis]] = d[q].min(FAR);
                }
            }
        }
    }
    grid
}
