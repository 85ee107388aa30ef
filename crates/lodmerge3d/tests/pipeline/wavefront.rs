use crate::common::{plain_options, tessellated_box, translation};
use lodmerge3d::assembly::{InstanceList, MeshInstance};
use lodmerge3d::combine_mesh_instances;
use lodmerge3d::options::LodMethod;
use lodmerge3d::source::StaticSource;
use std::sync::Arc;

#[test]
fn obj_sources_combine_like_in_memory_ones() {
    let mesh = tessellated_box(1.0, 2);
    let path = std::env::temp_dir().join(format!("lodmerge3d-roundtrip-{}.obj", std::process::id()));
    mesh.to_obj_file(&path).unwrap();
    let loaded = StaticSource::from_obj_files("block", &[&path]).unwrap();
    let _ = std::fs::remove_file(&path);
    assert_eq!(loaded.lods[0].num_triangles(), mesh.num_triangles());
    assert_eq!(loaded.lods[0].num_vertices(), mesh.num_vertices());

    let mut list = InstanceList::new();
    list.add_instance(MeshInstance::new(Arc::new(loaded), translation(0.0, 0.0, 3.0)));
    let results = combine_mesh_instances(&list, &plain_options(&[LodMethod::Copied]));
    let combined = &results.subassemblies[0].lods[0].mesh;
    assert_eq!(combined.num_triangles(), mesh.num_triangles());
    let (volume, _) = combined.volume_and_area();
    assert!((volume - 8.0).abs() < 1.0e-3);
    assert!((combined.aabb().center().z - 3.0).abs() < 1.0e-5);
}
