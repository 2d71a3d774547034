use std::sync::Arc;

use super::square_section;
use crate::geom::{
    GeometryKernel, InstrumentedKernel, KernelError, KernelOp, LoftOptions, MeshKernel, Shape,
    Transform, Vec3,
};

#[test]
fn mesh_kernel_mass_properties_of_a_box() {
    let kernel = MeshKernel::default();
    let sections = [square_section(0.0, 0.0, 0.0, 1.0), square_section(0.0, 3.0, 0.0, 1.0)];
    let solid = kernel.loft(&sections, &LoftOptions::ruled_solid()).expect("loft");

    assert!((kernel.volume(&solid).unwrap() - 3.0).abs() < 1e-12);
    assert!((kernel.area(&solid).unwrap() - 14.0).abs() < 1e-12);

    let bbox = kernel.bounding_box(&solid).unwrap();
    assert_eq!(bbox.size(), Vec3::new(1.0, 3.0, 1.0));
}

#[test]
fn mirrored_solid_keeps_positive_volume() {
    let kernel = MeshKernel::default();
    let sections = [square_section(0.0, 0.0, 0.0, 1.0), square_section(0.0, 2.0, 0.0, 1.0)];
    let solid = kernel.loft(&sections, &LoftOptions::ruled_solid()).expect("loft");
    let mirrored = kernel
        .transform(&solid, &Transform::mirror(Vec3::Y).unwrap())
        .expect("mirror");

    assert!((kernel.volume(&mirrored).unwrap() - 2.0).abs() < 1e-12);
    assert!(kernel.bounding_box(&mirrored).unwrap().max.y <= 0.0);
}

#[test]
fn disjoint_operands_short_circuit() {
    let kernel = MeshKernel::default();
    let a = kernel
        .loft(
            &[square_section(0.0, 0.0, 0.0, 1.0), square_section(0.0, 1.0, 0.0, 1.0)],
            &LoftOptions::ruled_solid(),
        )
        .unwrap();
    let b = kernel
        .loft(
            &[square_section(5.0, 0.0, 0.0, 1.0), square_section(5.0, 1.0, 0.0, 1.0)],
            &LoftOptions::ruled_solid(),
        )
        .unwrap();

    assert_eq!(kernel.cut(&a, &b).unwrap(), a);
    assert!(kernel.common(&a, &b).unwrap().is_empty());
}

#[test]
fn empty_shapes_have_no_bounding_box() {
    let kernel = MeshKernel::default();
    assert!(matches!(
        kernel.bounding_box(&Shape::empty()),
        Err(KernelError::EmptyShape { .. })
    ));
}

#[test]
fn instrumented_kernel_counts_calls() {
    let kernel = Arc::new(InstrumentedKernel::new(MeshKernel::default()));
    let dyn_kernel: Arc<dyn GeometryKernel> = kernel.clone();

    let sections = [
        square_section(0.0, 0.0, 0.0, 1.0),
        square_section(0.0, 1.0, 0.0, 1.0),
        square_section(0.0, 2.0, 0.0, 1.0),
    ];
    let solid = dyn_kernel.loft(&sections, &LoftOptions::ruled_solid()).unwrap();
    dyn_kernel.volume(&solid).unwrap();
    dyn_kernel.volume(&solid).unwrap();

    assert_eq!(kernel.count(KernelOp::Loft), 1);
    assert_eq!(kernel.last_loft_sections(), 3);
    assert_eq!(kernel.count(KernelOp::Volume), 2);
    assert_eq!(kernel.count(KernelOp::Cut), 0);

    kernel.reset();
    assert!(KernelOp::ALL.iter().all(|op| kernel.count(*op) == 0));
}
