use super::square_section;
use crate::geom::{
    BooleanOp, GeomMesh, LoftOptions, Point3, PointContainment, Shape, Tolerance, boolean_meshes,
    classify_point_in_mesh, loft_wires,
};

fn cube(x0: f64, y0: f64, z0: f64, size: f64) -> GeomMesh {
    let sections = [
        square_section(x0, y0, z0, size),
        square_section(x0, y0 + size, z0, size),
    ];
    match loft_wires(&sections, &LoftOptions::ruled_solid()).expect("loft cube") {
        Shape::Solid(mesh) => mesh,
        other => panic!("expected solid, got {}", other.kind_name()),
    }
}

#[test]
fn classify_point_in_mesh_cube_inside_outside() {
    let cube = cube(0.0, 0.0, 0.0, 1.0);
    let tol = Tolerance::default_geom();

    assert_eq!(
        classify_point_in_mesh(Point3::new(0.5, 0.5, 0.5), &cube, tol),
        PointContainment::Inside
    );
    assert_eq!(
        classify_point_in_mesh(Point3::new(2.0, 0.5, 0.5), &cube, tol),
        PointContainment::Outside
    );
    assert_eq!(
        classify_point_in_mesh(Point3::new(0.3, 0.0, 0.6), &cube, tol),
        PointContainment::OnSurface
    );
}

#[test]
fn cut_and_common_partition_the_first_operand() {
    let a = cube(0.0, 0.0, 0.0, 2.0);
    let b = cube(1.0, -1.0, -1.0, 4.0);
    let tol = Tolerance::default_geom();

    let cut = boolean_meshes(&a, &b, BooleanOp::Cut, tol).expect("cut");
    let common = boolean_meshes(&a, &b, BooleanOp::Common, tol).expect("common");

    assert!(cut.validate().is_ok());
    assert!(common.validate().is_ok());
    assert!(!common.is_empty());
    assert!((cut.signed_volume() + common.signed_volume() - a.signed_volume()).abs() < 1e-9);
}

#[test]
fn tool_fully_inside_is_carved_out() {
    let a = cube(0.0, 0.0, 0.0, 3.0);
    let b = cube(1.0, 1.0, 1.0, 1.0);
    let tol = Tolerance::default_geom();

    let cut = boolean_meshes(&a, &b, BooleanOp::Cut, tol).expect("cut");
    let common = boolean_meshes(&a, &b, BooleanOp::Common, tol).expect("common");

    assert!((cut.signed_volume() - 26.0).abs() < 1e-9);
    assert!((common.signed_volume() - 1.0).abs() < 1e-9);
}

#[test]
fn empty_operand_is_an_error() {
    let a = cube(0.0, 0.0, 0.0, 1.0);
    let empty = GeomMesh::default();
    assert!(boolean_meshes(&a, &empty, BooleanOp::Cut, Tolerance::default_geom()).is_err());
}
