use crate::common::{assert_materials_valid, grid, instance_at, plain_options, source};
use lodmerge3d::assembly::{InstanceGroup, InstanceList, DEFAULT_MATERIAL};
use lodmerge3d::combine_mesh_instances;
use lodmerge3d::options::LodMethod;
use lodmerge3d::source::{MaterialRef, StaticSource};
use std::sync::Arc;

#[test]
fn overrides_and_group_materials_are_registered() {
    let mut mesh = grid(2, 2, 1.0);
    for (t, material) in mesh.material_ids.iter_mut().enumerate() {
        *material = (t % 2) as u32;
    }
    let painted = Arc::new(
        StaticSource::new("painted", vec![mesh])
            .with_materials(vec![MaterialRef::from("wood"), MaterialRef::from("metal")]),
    );
    let plain = source("plain", grid(1, 1, 1.0));

    let mut list = InstanceList::new();
    let group = list.add_group(InstanceGroup {
        materials: vec![MaterialRef::from("unused")],
        ..InstanceGroup::default()
    });
    let mut overridden = instance_at(painted.clone(), 10.0);
    overridden.material_overrides = vec![None, Some(MaterialRef::from("gold"))];
    overridden.group = group;
    list.add_instance(instance_at(painted, 0.0));
    list.add_instance(overridden);
    list.add_instance(instance_at(plain, 20.0));

    let results = combine_mesh_instances(&list, &plain_options(&[LodMethod::Copied]));
    let names: Vec<&str> = results.materials.iter().map(|m| &**m).collect();
    for expected in ["wood", "metal", "gold", "unused", "plain"] {
        assert!(names.contains(&expected), "missing {}", expected);
    }
    assert_eq!(names.len(), 5);

    // The overridden instance uses "gold" where the other one uses "metal".
    let sub = &results.subassemblies[0];
    let mesh = &sub.lods[0].mesh;
    let used_at = |x_min: f32, x_max: f32| -> Vec<&str> {
        let mut used: Vec<&str> = (0..mesh.num_triangles())
            .filter(|t| {
                let c = mesh.triangle_centroid(*t);
                c.x >= x_min && c.x <= x_max
            })
            .map(|t| &*sub.materials[mesh.material_ids[t] as usize])
            .collect();
        used.sort_unstable();
        used.dedup();
        used
    };
    assert_eq!(used_at(0.0, 2.0), vec!["metal", "wood"]);
    assert_eq!(used_at(10.0, 12.0), vec!["gold", "wood"]);
    assert_eq!(used_at(20.0, 21.0), vec!["plain"]);
    assert_materials_valid(&results);
}

#[test]
fn sources_without_material_slots_use_the_default_material() {
    let bare = Arc::new(StaticSource::new("bare", vec![grid(1, 1, 1.0)]).with_materials(vec![]));
    let mut list = InstanceList::new();
    list.add_instance(instance_at(bare, 0.0));

    let results = combine_mesh_instances(&list, &plain_options(&[LodMethod::Copied]));
    let sub = &results.subassemblies[0];
    let names: Vec<&str> = sub.materials.iter().map(|m| &**m).collect();
    assert_eq!(names, vec![DEFAULT_MATERIAL]);
    assert_eq!(sub.lods[0].mesh.material_ids, vec![0, 0]);
    assert_materials_valid(&results);
}
