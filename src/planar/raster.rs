use super::polygon::{loops_self_intersect, simplify_polyline, Polygon2};
use crate::error::GeometryError;
use crate::math::{Point2, Real, Vector2};
use crate::utils::{point_in_polygons2d, signed_area2d};
use hashbrown::HashMap;
use smallvec::SmallVec;

/// Parameters of [`close_polygons`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ClosureParams {
    /// Dilation then erosion distance. Gaps narrower than twice this distance
    /// are closed.
    pub offset: Real,
    /// Holes with a smaller area are filled.
    pub min_hole_area: Real,
    /// Douglas-Peucker tolerance applied to the resulting loops.
    pub simplify_tolerance: Real,
    /// Maximum number of raster cells along each axis.
    pub max_grid_cells: usize,
}

impl Default for ClosureParams {
    fn default() -> Self {
        Self {
            offset: 0.0,
            min_hole_area: 0.0,
            simplify_tolerance: 0.0,
            max_grid_cells: 512,
        }
    }
}

/// A binary occupancy grid over a 2D domain.
struct Raster {
    origin: Point2<Real>,
    cell: Real,
    nx: usize,
    ny: usize,
    filled: Vec<bool>,
}

impl Raster {
    fn new(mins: Point2<Real>, maxs: Point2<Real>, margin: Real, max_cells: usize) -> Self {
        let extents = maxs - mins + Vector2::repeat(2.0 * margin);
        let max_extent = extents.x.max(extents.y).max(Real::EPSILON);
        let mut cell = max_extent / (max_cells.max(8) as Real - 4.0);
        if margin > 0.0 {
            cell = cell.max((margin * 0.5).min(max_extent / 16.0));
        }
        let origin = mins - Vector2::repeat(margin + 2.0 * cell);
        let nx = ((extents.x / cell).ceil() as usize + 4).max(1);
        let ny = ((extents.y / cell).ceil() as usize + 4).max(1);
        Self {
            origin,
            cell,
            nx,
            ny,
            filled: vec![false; nx * ny],
        }
    }

    #[inline]
    fn get(&self, i: isize, j: isize) -> bool {
        i >= 0
            && j >= 0
            && (i as usize) < self.nx
            && (j as usize) < self.ny
            && self.filled[j as usize * self.nx + i as usize]
    }

    /// Fills the cells whose center is inside `poly` (even-odd rule).
    fn fill_polygon(&mut self, poly: &[Point2<Real>]) {
        if poly.len() < 3 {
            return;
        }
        let mut crossings: Vec<Real> = Vec::new();
        for j in 0..self.ny {
            let y = self.origin.y + (j as Real + 0.5) * self.cell;
            crossings.clear();
            for k in 0..poly.len() {
                let a = poly[k];
                let b = poly[(k + 1) % poly.len()];
                if (a.y > y) != (b.y > y) {
                    crossings.push(a.x + (y - a.y) * (b.x - a.x) / (b.y - a.y));
                }
            }
            crossings.sort_by(|a, b| a.total_cmp(b));
            for span in crossings.chunks_exact(2) {
                let i0 = ((span[0] - self.origin.x) / self.cell - 0.5).ceil().max(0.0) as usize;
                let i1 = ((span[1] - self.origin.x) / self.cell - 0.5).floor();
                if i1 < 0.0 {
                    continue;
                }
                let i1 = (i1 as usize).min(self.nx - 1);
                for i in i0..=i1 {
                    self.filled[j * self.nx + i] = true;
                }
            }
        }
    }

    /// Dilates (`grow = true`) or erodes the occupancy with a disk of
    /// `radius` cells.
    fn morph(&mut self, radius: usize, grow: bool) {
        if radius == 0 {
            return;
        }
        let r = radius as isize;
        let mut kernel: SmallVec<[(isize, isize); 64]> = SmallVec::new();
        for dj in -r..=r {
            for di in -r..=r {
                if di * di + dj * dj <= r * r {
                    kernel.push((di, dj));
                }
            }
        }

        let mut result = self.filled.clone();
        for j in 0..self.ny as isize {
            for i in 0..self.nx as isize {
                let current = self.get(i, j);
                if current == grow {
                    continue;
                }
                let flip = kernel.iter().any(|(di, dj)| self.get(i + di, j + dj) == grow);
                if flip {
                    result[j as usize * self.nx + i as usize] = grow;
                }
            }
        }
        self.filled = result;
    }

    /// Traces the boundary of the occupied region as closed loops along cell
    /// edges. Occupied cells are on the left of each loop, so outer
    /// boundaries are counter-clockwise and holes clockwise.
    fn trace_loops(&self) -> Vec<Vec<Point2<Real>>> {
        // Directed edges between lattice corners, keyed by start corner.
        let mut outgoing: HashMap<(isize, isize), SmallVec<[(isize, isize); 2]>> = HashMap::new();
        for j in 0..self.ny as isize {
            for i in 0..self.nx as isize {
                if !self.get(i, j) {
                    continue;
                }
                if !self.get(i, j - 1) {
                    outgoing.entry((i, j)).or_default().push((i + 1, j));
                }
                if !self.get(i + 1, j) {
                    outgoing.entry((i + 1, j)).or_default().push((i + 1, j + 1));
                }
                if !self.get(i, j + 1) {
                    outgoing.entry((i + 1, j + 1)).or_default().push((i, j + 1));
                }
                if !self.get(i - 1, j) {
                    outgoing.entry((i, j + 1)).or_default().push((i, j));
                }
            }
        }

        let mut starts: Vec<(isize, isize)> = outgoing.keys().copied().collect();
        starts.sort_unstable_by_key(|(i, j)| (*j, *i));

        let mut loops = Vec::new();
        for start in starts {
            while outgoing.get(&start).map(|o| !o.is_empty()).unwrap_or(false) {
                let mut corners = vec![start];
                let mut prev_dir = (0isize, 0isize);
                let mut curr = start;
                loop {
                    let Some(candidates) = outgoing.get_mut(&curr) else {
                        break;
                    };
                    if candidates.is_empty() {
                        break;
                    }
                    // At saddles, take the left-most turn so diagonal cells
                    // yield separate loops.
                    let pick = if candidates.len() > 1 {
                        let left = (-prev_dir.1, prev_dir.0);
                        candidates
                            .iter()
                            .position(|c| (c.0 - curr.0, c.1 - curr.1) == left)
                            .unwrap_or(0)
                    } else {
                        0
                    };
                    let next = candidates.swap_remove(pick);
                    prev_dir = (next.0 - curr.0, next.1 - curr.1);
                    curr = next;
                    if curr == start {
                        break;
                    }
                    corners.push(curr);
                }

                let pts = remove_collinear(&corners);
                if pts.len() >= 3 {
                    loops.push(
                        pts.iter()
                            .map(|(i, j)| {
                                self.origin + Vector2::new(*i as Real, *j as Real) * self.cell
                            })
                            .collect(),
                    );
                }
            }
        }

        loops
    }
}

fn remove_collinear(corners: &[(isize, isize)]) -> Vec<(isize, isize)> {
    let n = corners.len();
    (0..n)
        .filter(|k| {
            let p = corners[(k + n - 1) % n];
            let c = corners[*k];
            let q = corners[(k + 1) % n];
            (c.0 - p.0) * (q.1 - c.1) - (c.1 - p.1) * (q.0 - c.0) != 0
        })
        .map(|k| corners[k])
        .collect()
}

/// Computes the closed union of a set of simple polygons.
///
/// The polygons are rasterized, dilated then eroded by `params.offset`, and
/// the boundary of the result is traced back into polygons with holes. Holes
/// smaller than `params.min_hole_area` are dropped and the loops are
/// simplified with `params.simplify_tolerance`. If simplification makes the
/// loops intersect, the unsimplified loops are used.
pub fn close_polygons(
    polygons: &[Vec<Point2<Real>>],
    params: &ClosureParams,
) -> Result<Vec<Polygon2>, GeometryError> {
    let mut mins = Point2::new(Real::MAX, Real::MAX);
    let mut maxs = Point2::new(-Real::MAX, -Real::MAX);
    for pt in polygons.iter().flatten() {
        mins = mins.inf(pt);
        maxs = maxs.sup(pt);
    }
    if mins.x > maxs.x {
        return Err(GeometryError::EmptyPolygonUnion);
    }

    let mut raster = Raster::new(mins, maxs, params.offset.max(0.0), params.max_grid_cells);
    for poly in polygons {
        raster.fill_polygon(poly);
    }

    let radius = (params.offset / raster.cell).round() as usize;
    raster.morph(radius, true);
    raster.morph(radius, false);

    let raw_loops = raster.trace_loops();
    // Staircase steps and the notches left where a closed gap meets the
    // outline are one cell deep.
    let tolerance = params.simplify_tolerance.max(raster.cell * 1.5);
    let simplified: Vec<Vec<Point2<Real>>> = raw_loops
        .iter()
        .map(|l| simplify_polyline(l, tolerance, true))
        .collect();

    let valid_simplification = simplified.iter().all(|l| l.len() >= 3)
        && !loops_self_intersect(simplified.iter().map(|l| &l[..]));
    let loops = if valid_simplification {
        simplified
    } else {
        raw_loops
    };

    let polygons = assemble_polygons(loops, params.min_hole_area);
    if polygons.is_empty() {
        Err(GeometryError::EmptyPolygonUnion)
    } else {
        Ok(polygons)
    }
}

/// Sorts loops into outer boundaries (counter-clockwise) and holes
/// (clockwise), attaching each hole to the smallest outer loop containing it.
fn assemble_polygons(loops: Vec<Vec<Point2<Real>>>, min_hole_area: Real) -> Vec<Polygon2> {
    let (outers, holes): (Vec<_>, Vec<_>) = loops
        .into_iter()
        .filter(|l| signed_area2d(l) != 0.0)
        .partition(|l| signed_area2d(l) > 0.0);

    let mut polygons: Vec<Polygon2> = outers.into_iter().map(Polygon2::new).collect();
    for hole in holes {
        if signed_area2d(&hole).abs() < min_hole_area {
            continue;
        }
        let owner = polygons
            .iter()
            .enumerate()
            .filter(|(_, p)| point_in_polygons2d(&hole[0], [&p.outer[..]]) || hole_inside(&hole, &p.outer))
            .min_by(|a, b| signed_area2d(&a.1.outer).total_cmp(&signed_area2d(&b.1.outer)))
            .map(|(i, _)| i);
        if let Some(owner) = owner {
            polygons[owner].holes.push(hole);
        }
    }
    polygons
}

fn hole_inside(hole: &[Point2<Real>], outer: &[Point2<Real>]) -> bool {
    let n = hole.len();
    (0..n).any(|k| {
        let mid = na::center(&hole[k], &hole[(k + 1) % n]);
        point_in_polygons2d(&mid, [outer])
    })
}

#[cfg(test)]
mod test {
    use super::*;

    fn rect(x0: Real, y0: Real, x1: Real, y1: Real) -> Vec<Point2<Real>> {
        vec![
            Point2::new(x0, y0),
            Point2::new(x1, y0),
            Point2::new(x1, y1),
            Point2::new(x0, y1),
        ]
    }

    #[test]
    fn adjacent_triangles_union_into_a_square() {
        let tris = vec![
            vec![Point2::new(0.0, 0.0), Point2::new(4.0, 0.0), Point2::new(4.0, 4.0)],
            vec![Point2::new(0.0, 0.0), Point2::new(4.0, 4.0), Point2::new(0.0, 4.0)],
        ];
        let result = close_polygons(&tris, &ClosureParams::default()).unwrap();
        assert_eq!(result.len(), 1);
        assert!(result[0].holes.is_empty());
        assert!((result[0].area() - 16.0).abs() < 0.5);
    }

    #[test]
    fn narrow_gap_is_closed() {
        let parts = vec![rect(0.0, 0.0, 4.0, 4.0), rect(4.1, 0.0, 8.0, 4.0)];
        let params = ClosureParams {
            offset: 0.2,
            ..ClosureParams::default()
        };
        let result = close_polygons(&parts, &params).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].outer.len(), 4);
        assert!(result[0].holes.is_empty());
    }

    #[test]
    fn small_holes_are_dropped() {
        let parts = vec![
            rect(0.0, 0.0, 10.0, 4.0),
            rect(0.0, 6.0, 10.0, 10.0),
            rect(0.0, 4.0, 4.0, 6.0),
            rect(6.0, 4.0, 10.0, 6.0),
        ];
        let keep = close_polygons(&parts, &ClosureParams::default()).unwrap();
        assert_eq!(keep.len(), 1);
        assert_eq!(keep[0].holes.len(), 1);

        let params = ClosureParams {
            min_hole_area: 5.0,
            ..ClosureParams::default()
        };
        let filled = close_polygons(&parts, &params).unwrap();
        assert!(filled[0].holes.is_empty());
    }

    #[test]
    fn empty_input_is_an_error() {
        assert_eq!(
            close_polygons(&[], &ClosureParams::default()),
            Err(GeometryError::EmptyPolygonUnion)
        );
    }
}
