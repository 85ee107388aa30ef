use super::{CollisionShape, OrientedBox};
use crate::math::Real;

/// Two box axes are aligned if the absolute value of their dot product is at
/// least this.
const ALIGNED_AXIS_DOT: Real = 0.99;
/// Width of the volume tolerance band of a merge.
const MERGE_OFFSET: Real = 0.01;

fn num_aligned_axes(a: &OrientedBox, b: &OrientedBox) -> usize {
    (0..3)
        .filter(|i| {
            let axis = a.axis(*i);
            (0..3).any(|j| axis.dot(&b.axis(j)).abs() >= ALIGNED_AXIS_DOT)
        })
        .count()
}

/// The box covering `a` and `b` if it adds no volume to them.
///
/// The merged volume must lie strictly between the volumes of the merged box
/// shrunk and grown by a small offset.
fn try_merge(a: &OrientedBox, b: &OrientedBox) -> Option<OrientedBox> {
    if num_aligned_axes(a, b) < 2 {
        return None;
    }

    let merged = a.merged_in_frame(b);
    let sum = a.volume() + b.volume();
    if merged.offset_volume(MERGE_OFFSET) > sum && merged.offset_volume(-MERGE_OFFSET) < sum {
        Some(merged)
    } else {
        None
    }
}

/// Merges the boxes of `shapes` that can be combined without gaining volume.
///
/// The largest boxes are merged first; the process repeats until no pair of
/// boxes can be merged. Spheres, capsules and convex hulls are returned
/// unchanged after the boxes.
pub fn combine_collision_shapes(shapes: Vec<CollisionShape>) -> Vec<CollisionShape> {
    let mut boxes = Vec::new();
    let mut others = Vec::new();
    for shape in shapes {
        match shape {
            CollisionShape::Box(b) => boxes.push(b),
            other => others.push(other),
        }
    }

    let initial = boxes.len();
    'outer: loop {
        boxes.sort_by(|a, b| b.volume().total_cmp(&a.volume()));
        for i in 0..boxes.len() {
            for j in i + 1..boxes.len() {
                if let Some(merged) = try_merge(&boxes[i], &boxes[j]) {
                    boxes[i] = merged;
                    let _ = boxes.swap_remove(j);
                    continue 'outer;
                }
            }
        }
        break;
    }

    if boxes.len() != initial {
        log::debug!("Merged {} collision boxes into {}", initial, boxes.len());
    }

    boxes
        .into_iter()
        .map(CollisionShape::Box)
        .chain(others)
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::math::{Isometry, Point, Vector};
    use approx::assert_relative_eq;

    fn cube_at(x: Real, y: Real) -> CollisionShape {
        CollisionShape::Box(OrientedBox::new(
            Isometry::translation(x, y, 0.0),
            Vector::repeat(0.5),
        ))
    }

    #[test]
    fn face_adjacent_boxes_merge() {
        let shapes = (0..4).map(|i| cube_at(i as Real, 0.0)).collect();
        let merged = combine_collision_shapes(shapes);
        assert_eq!(merged.len(), 1);
        match &merged[0] {
            CollisionShape::Box(b) => {
                assert_relative_eq!(b.volume(), 4.0, epsilon = 1.0e-4);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn diagonal_boxes_do_not_merge() {
        let shapes = vec![cube_at(0.0, 0.0), cube_at(1.0, 1.0)];
        assert_eq!(combine_collision_shapes(shapes).len(), 2);
    }

    #[test]
    fn other_shapes_pass_through() {
        let sphere = CollisionShape::Sphere {
            center: Point::origin(),
            radius: 1.0,
        };
        let shapes = vec![cube_at(0.0, 0.0), sphere.clone(), cube_at(1.0, 0.0)];
        let merged = combine_collision_shapes(shapes);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[1], sphere);
    }
}
