use crate::common::{assert_materials_valid, grid, instance_at, plain_options, source, tessellated_box, translation};
use lodmerge3d::assembly::{InstanceGroup, InstanceList, MeshInstance};
use lodmerge3d::combine_mesh_instances;
use lodmerge3d::options::{ApproximationTypes, LodMethod};
use lodmerge3d::math::Point;

#[test]
fn copied_instances_are_concatenated() {
    // 10 x 25 cells: 500 triangles.
    let part = source("panel", grid(10, 25, 1.0));
    let mut list = InstanceList::new();
    list.add_instance(instance_at(part.clone(), 0.0));
    list.add_instance(instance_at(part, 100.0));

    let results = combine_mesh_instances(&list, &plain_options(&[LodMethod::Copied]));
    assert_eq!(results.subassemblies.len(), 1);
    let lods = &results.subassemblies[0].lods;
    assert_eq!(lods.len(), 1);
    assert_eq!(lods[0].mesh.num_triangles(), 1000);

    let aabb = lods[0].mesh.aabb();
    assert_eq!(aabb.mins, Point::new(0.0, 0.0, 0.0));
    assert_eq!(aabb.maxs, Point::new(110.0, 25.0, 0.0));

    // Both placements are present and disjoint.
    let left = lods[0]
        .mesh
        .vertices
        .iter()
        .filter(|v| v.x <= 10.0)
        .count();
    let right = lods[0]
        .mesh
        .vertices
        .iter()
        .filter(|v| v.x >= 100.0)
        .count();
    assert_eq!(left, right);
    assert_eq!(left + right, lods[0].mesh.num_vertices());
    assert_materials_valid(&results);
}

#[test]
fn box_constraint_yields_the_bounding_box() {
    let part = source("crate", tessellated_box(1.0, 4));
    let mut list = InstanceList::new();
    let group = list.add_group(InstanceGroup {
        approximation_types: ApproximationTypes::AXIS_ALIGNED_BOX,
        ..InstanceGroup::default()
    });
    let mut instance = MeshInstance::new(part, translation(5.0, 0.0, 0.0));
    instance.group = group;
    list.add_instance(instance);

    let results = combine_mesh_instances(&list, &plain_options(&[LodMethod::Approximated]));
    let mesh = &results.subassemblies[0].lods[0].mesh;
    assert_eq!(mesh.num_triangles(), 12);

    let aabb = mesh.aabb();
    assert!((aabb.mins - Point::new(4.0, -1.0, -1.0)).norm() < 1.0e-4);
    assert!((aabb.maxs - Point::new(6.0, 1.0, 1.0)).norm() < 1.0e-4);
    assert_materials_valid(&results);
}

#[test]
fn coplanar_merge_flattens_a_grid() {
    let part = source("floor", grid(10, 5, 1.0));
    let mut list = InstanceList::new();
    list.add_instance(instance_at(part, 0.0));

    let mut options = plain_options(&[LodMethod::Copied]);
    options.planar.merge_coplanar = true;
    options.planar.merge_start_lod = 0;

    let results = combine_mesh_instances(&list, &options);
    let mesh = &results.subassemblies[0].lods[0].mesh;
    assert!(mesh.num_triangles() <= 2, "{} triangles", mesh.num_triangles());
    assert!((mesh.area() - 50.0).abs() < 1.0e-3);
}

#[test]
fn empty_input_yields_no_subassembly() {
    let results = combine_mesh_instances(&InstanceList::new(), &plain_options(&[LodMethod::Copied]));
    assert!(results.subassemblies.is_empty());
    assert!(results.materials.is_empty());
}

#[test]
fn full_chain_is_monotonic() {
    let part = source("block", tessellated_box(1.0, 6));
    let mut list = InstanceList::new();
    for i in 0..4 {
        list.add_instance(instance_at(part.clone(), i as f32 * 3.0));
    }

    let mut options = lodmerge3d::CombineOptions::default();
    options.hidden_removal.num_directions = 16;
    options.coarse.max_grid_cells = 48;
    options.coarse.max_triangles_base = 200;

    let results = combine_mesh_instances(&list, &options);
    let lods = &results.subassemblies[0].lods;
    assert_eq!(lods.len(), options.num_lods);
    assert_eq!(lods[0].mesh.num_triangles(), 4 * 6 * 6 * 6 * 2);
    for pair in lods.windows(2) {
        assert!(pair[1].mesh.num_triangles() <= pair[0].mesh.num_triangles());
    }
    let last = lods.last().map(|l| l.mesh.num_triangles()).unwrap_or(0);
    assert!(last > 0 && last <= 200);
    assert_materials_valid(&results);
}

#[test]
fn random_placements_keep_every_copied_triangle() {
    use rand::{Rng, SeedableRng};

    let mut rng = rand::rngs::StdRng::seed_from_u64(42);
    let part = source("pebble", tessellated_box(0.5, 2));
    let mut list = InstanceList::new();
    let mut transforms = Vec::new();
    for _ in 0..20 {
        transforms.push(translation(
            rng.gen_range(-50.0..50.0),
            rng.gen_range(-50.0..50.0),
            rng.gen_range(-50.0..50.0),
        ));
    }
    let mut instance = MeshInstance::new(part, transforms[0]);
    instance.transforms = transforms;
    list.add_instance(instance);

    let results = combine_mesh_instances(&list, &plain_options(&[LodMethod::Copied]));
    let mesh = &results.subassemblies[0].lods[0].mesh;
    assert_eq!(mesh.num_triangles(), 20 * 48);
    let (volume, _) = mesh.volume_and_area();
    assert!((volume - 20.0).abs() < 1.0e-2);
    assert_materials_valid(&results);
}
