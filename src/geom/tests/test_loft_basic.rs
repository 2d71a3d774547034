use super::square_section;
use crate::geom::{LoftError, LoftOptions, Point3, Shape, Wire, loft_wires};

fn solid_volume(shape: &Shape) -> f64 {
    match shape {
        Shape::Solid(mesh) => mesh.signed_volume(),
        other => panic!("expected solid, got {}", other.kind_name()),
    }
}

#[test]
fn ruled_box_has_expected_volume_and_area() {
    let sections = [square_section(0.0, 0.0, 0.0, 1.0), square_section(0.0, 2.0, 0.0, 1.0)];
    let shape = loft_wires(&sections, &LoftOptions::ruled_solid()).expect("loft box");

    assert!((solid_volume(&shape) - 2.0).abs() < 1e-12);
    assert!((shape.merged_mesh().area() - 10.0).abs() < 1e-12);
}

#[test]
fn reversed_section_order_still_yields_positive_volume() {
    let sections = [square_section(0.0, 2.0, 0.0, 1.0), square_section(0.0, 0.0, 0.0, 1.0)];
    let shape = loft_wires(&sections, &LoftOptions::ruled_solid()).expect("loft box");
    assert!((solid_volume(&shape) - 2.0).abs() < 1e-12);
}

#[test]
fn smooth_loft_inserts_rows_and_keeps_prismatic_volume() {
    let sections = [
        square_section(0.0, 0.0, 0.0, 1.0),
        square_section(0.0, 1.0, 0.0, 1.0),
        square_section(0.0, 2.0, 0.0, 1.0),
    ];
    let options = LoftOptions {
        solid: true,
        ruled: false,
        span_subdivisions: 3,
    };
    let shape = loft_wires(&sections, &options).expect("smooth loft");
    let Shape::Solid(mesh) = &shape else {
        panic!("expected solid");
    };

    // 3 sections + 2 spans * 3 rows, 4 points each, plus two cap centroids.
    assert_eq!(mesh.vertex_count(), 9 * 4 + 2);
    assert!((mesh.signed_volume() - 2.0).abs() < 1e-9);
}

#[test]
fn sections_with_different_point_counts_are_resampled() {
    let coarse = square_section(0.0, 0.0, 0.0, 1.0);
    let fine = Wire::closed(vec![
        Point3::new(0.0, 1.0, 0.0),
        Point3::new(0.5, 1.0, 0.0),
        Point3::new(1.0, 1.0, 0.0),
        Point3::new(1.0, 1.0, 0.5),
        Point3::new(1.0, 1.0, 1.0),
        Point3::new(0.5, 1.0, 1.0),
        Point3::new(0.0, 1.0, 1.0),
        Point3::new(0.0, 1.0, 0.5),
    ]);

    let shape = loft_wires(&[coarse, fine], &LoftOptions::ruled_solid()).expect("loft");
    assert!((solid_volume(&shape) - 1.0).abs() < 1e-9);
}

#[test]
fn open_sections_loft_into_a_shell() {
    let a = Wire::open(vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)]);
    let b = Wire::open(vec![Point3::new(0.0, 1.0, 0.0), Point3::new(1.0, 1.0, 0.0)]);
    let shape = loft_wires(&[a, b], &LoftOptions::ruled_shell()).expect("shell");
    let Shape::Shell(mesh) = shape else {
        panic!("expected shell");
    };
    assert_eq!(mesh.triangle_count(), 2);
    assert!((mesh.area() - 1.0).abs() < 1e-12);
}

#[test]
fn invalid_inputs_are_rejected() {
    let single = [square_section(0.0, 0.0, 0.0, 1.0)];
    assert!(matches!(
        loft_wires(&single, &LoftOptions::ruled_solid()),
        Err(LoftError::NotEnoughSections { count: 1 })
    ));

    let open = [
        Wire::open(vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)]),
        Wire::open(vec![Point3::new(0.0, 1.0, 0.0), Point3::new(1.0, 1.0, 0.0)]),
    ];
    assert!(matches!(
        loft_wires(&open, &LoftOptions::ruled_solid()),
        Err(LoftError::SolidRequiresClosedSections)
    ));

    let mixed = [square_section(0.0, 0.0, 0.0, 1.0), open[1].clone()];
    assert!(matches!(
        loft_wires(&mixed, &LoftOptions::ruled_shell()),
        Err(LoftError::MixedClosedOpen { .. })
    ));

    let bad = [
        square_section(0.0, 0.0, 0.0, 1.0),
        Wire::closed(vec![
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(f64::NAN, 1.0, 0.0),
            Point3::new(1.0, 1.0, 1.0),
        ]),
    ];
    assert!(matches!(
        loft_wires(&bad, &LoftOptions::ruled_solid()),
        Err(LoftError::NonFinitePoint { index: 1, point_index: 1 })
    ));
}
