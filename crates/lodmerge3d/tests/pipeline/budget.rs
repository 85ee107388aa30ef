use crate::common::{assert_materials_valid, instance_at, plain_options, source, tessellated_box};
use lodmerge3d::assembly::InstanceList;
use lodmerge3d::combine_mesh_instances;
use lodmerge3d::options::{BudgetMethod, LodMethod};

#[test]
fn absolute_budgets_are_met() {
    let part = source("block", tessellated_box(1.0, 4));
    let mut list = InstanceList::new();
    for i in 0..4 {
        list.add_instance(instance_at(part.clone(), i as f32 * 4.0));
    }

    let mut options = plain_options(&[LodMethod::Copied, LodMethod::Simplified, LodMethod::Simplified]);
    options.budget.method = BudgetMethod::Absolute;
    options.budget.absolute_budgets = vec![0, 300, 60];

    let results = combine_mesh_instances(&list, &options);
    let lods = &results.subassemblies[0].lods;
    assert_eq!(lods.len(), 3);
    // A zero budget means no budget.
    assert_eq!(lods[0].budget, None);
    assert_eq!(lods[0].mesh.num_triangles(), 4 * 192);
    assert_eq!(lods[1].budget, Some(300));
    assert!(lods[1].mesh.num_triangles() <= 300);
    assert!(lods[2].mesh.num_triangles() <= 60);
    assert_materials_valid(&results);
}

#[test]
fn percent_of_previous_budgets_shrink() {
    let part = source("block", tessellated_box(1.0, 4));
    let mut list = InstanceList::new();
    list.add_instance(instance_at(part.clone(), 0.0));
    list.add_instance(instance_at(part, 4.0));

    let mut options = plain_options(&[LodMethod::Copied, LodMethod::Simplified, LodMethod::Approximated]);
    options.budget.method = BudgetMethod::PercentOfPrevious;
    options.budget.percent_of_previous = vec![100.0, 50.0, 50.0];

    let results = combine_mesh_instances(&list, &options);
    let lods = &results.subassemblies[0].lods;
    assert_eq!(lods[0].mesh.num_triangles(), 384);
    assert_eq!(lods[1].budget, Some(192));
    assert!(lods[1].mesh.num_triangles() <= 192);
    assert!(lods[2].mesh.num_triangles() <= lods[1].mesh.num_triangles());
}

#[test]
fn no_restriction_uses_matching_variants() {
    let part = source("block", tessellated_box(1.0, 4));
    let mut list = InstanceList::new();
    list.add_instance(instance_at(part, 0.0));

    let results = combine_mesh_instances(&list, &plain_options(&[LodMethod::Copied, LodMethod::Approximated]));
    let lods = &results.subassemblies[0].lods;
    assert_eq!(lods[0].budget, None);
    assert_eq!(lods[0].mesh.num_triangles(), 192);
    // Nothing beats the box of a box.
    assert!(lods[1].mesh.num_triangles() <= 12);
}
