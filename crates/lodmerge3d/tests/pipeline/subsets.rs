use crate::common::{assert_materials_valid, grid, instance_at, plain_options, source};
use lodmerge3d::assembly::InstanceList;
use lodmerge3d::combine_mesh_instances;
use lodmerge3d::options::LodMethod;

#[test]
fn subsets_are_split_in_increasing_order() {
    let left = source("left", grid(2, 2, 1.0));
    let right = source("right", grid(3, 1, 1.0));

    let mut list = InstanceList::new();
    let mut a = instance_at(right, 10.0);
    a.subset_id = 3;
    let mut b = instance_at(left.clone(), 0.0);
    b.subset_id = 1;
    let mut c = instance_at(left, 5.0);
    c.subset_id = 1;
    list.add_instance(a);
    list.add_instance(b);
    list.add_instance(c);

    let results = combine_mesh_instances(&list, &plain_options(&[LodMethod::Copied, LodMethod::Copied]));
    let ids: Vec<u32> = results.subassemblies.iter().map(|s| s.subset_id).collect();
    assert_eq!(ids, vec![1, 3]);

    let first = &results.subassemblies[0];
    let second = &results.subassemblies[1];
    assert_eq!(first.lods[0].mesh.num_triangles(), 16);
    assert_eq!(second.lods[0].mesh.num_triangles(), 6);
    assert!(first.lods[0].mesh.vertices.iter().all(|v| v.x < 10.0));
    assert!(second.lods[0].mesh.vertices.iter().all(|v| v.x >= 10.0));

    // Each subset only lists the materials it uses.
    assert_eq!(first.materials.len(), 1);
    assert_eq!(&*first.materials[0], "left");
    assert_eq!(&*second.materials[0], "right");
    assert_eq!(results.materials.len(), 2);
    assert_materials_valid(&results);
}

#[test]
fn filtered_instances_leave_later_lods() {
    let part = source("tile", grid(2, 2, 1.0));
    let mut list = InstanceList::new();
    let mut filtered = instance_at(part.clone(), 5.0);
    filtered.lod_filter = Some(1);
    list.add_instance(instance_at(part, 0.0));
    list.add_instance(filtered);

    let results = combine_mesh_instances(&list, &plain_options(&[LodMethod::Copied, LodMethod::Copied]));
    let lods = &results.subassemblies[0].lods;
    assert_eq!(lods[0].mesh.num_triangles(), 16);
    assert_eq!(lods[1].mesh.num_triangles(), 8);
}
