use crate::common::{instance_at, plain_options, tessellated_box};
use lodmerge3d::assembly::{DetailLevel, InstanceList};
use lodmerge3d::collision::{CollisionShape, OrientedBox};
use lodmerge3d::combine_mesh_instances;
use lodmerge3d::math::{Isometry, Vector};
use lodmerge3d::options::LodMethod;
use lodmerge3d::source::StaticSource;
use std::sync::Arc;

fn unit_box_source() -> Arc<StaticSource> {
    let shape = CollisionShape::Box(OrientedBox::new(Isometry::identity(), Vector::repeat(1.0)));
    Arc::new(StaticSource::new("block", vec![tessellated_box(1.0, 1)]).with_collision_shapes(vec![shape]))
}

#[test]
fn adjacent_boxes_are_merged() {
    let source = unit_box_source();
    let mut list = InstanceList::new();
    list.add_instance(instance_at(source.clone(), 0.0));
    list.add_instance(instance_at(source.clone(), 2.0));
    let mut decorative = instance_at(source, 20.0);
    decorative.detail_level = DetailLevel::Decorative;
    list.add_instance(decorative);

    let results = combine_mesh_instances(&list, &plain_options(&[LodMethod::Copied]));
    let collision = &results.subassemblies[0].collision;
    assert_eq!(collision.len(), 1);
    match &collision[0] {
        CollisionShape::Box(merged) => {
            assert!((merged.volume() - 16.0).abs() < 1.0e-3);
            assert!((merged.pose.translation.vector - Vector::new(1.0, 0.0, 0.0)).norm() < 1.0e-4);
        }
        other => panic!("expected a box, got {:?}", other),
    }
}

#[test]
fn distant_boxes_stay_separate() {
    let source = unit_box_source();
    let mut list = InstanceList::new();
    list.add_instance(instance_at(source.clone(), 0.0));
    list.add_instance(instance_at(source, 5.0));

    let results = combine_mesh_instances(&list, &plain_options(&[LodMethod::Copied]));
    assert_eq!(results.subassemblies[0].collision.len(), 2);
}
