use std::sync::Arc;

use airframe_engine::components::ComponentKind;
use airframe_engine::config::{ComponentRef, Configuration, EngineSettings};
use airframe_engine::geom::{
    BBox, GeometryKernel, InstrumentedKernel, KernelOp, MeshKernel, Point3, Shape, Vec3,
};
use airframe_engine::parse::XmlDocument;
use airframe_engine::report::ConfigurationReport;
use airframe_engine::{DeflectionMap, EngineError, GeometricComponent};

const SIMPLE_WING: &str = include_str!("data/simple_wing.xml");
const TWO_FLAP_WING: &str = include_str!("data/two_flap_wing.xml");

/// One untapered segment of chord 2 and span 3, leading edge at x = 1, z = 0.5.
const RECTANGULAR_WING: &str = r#"<cpacs><vehicles>
  <aircraft><model uID="Plank">
    <wings><wing uID="R1">
      <transformation><translation><x>1</x><y>0</y><z>0.5</z></translation></transformation>
      <sections>
        <section uID="R1_S1">
          <transformation><scaling><x>2</x><y>1</y><z>2</z></scaling></transformation>
          <elements><element uID="R1_E1"><airfoilUID>Diamond</airfoilUID></element></elements>
        </section>
        <section uID="R1_S2">
          <transformation><scaling><x>2</x><y>1</y><z>2</z></scaling></transformation>
          <elements><element uID="R1_E2"><airfoilUID>Diamond</airfoilUID></element></elements>
        </section>
      </sections>
      <positionings>
        <positioning uID="R1_P1">
          <length>3</length><sweepAngle>0</sweepAngle><dihedralAngle>0</dihedralAngle>
          <fromSectionUID>R1_S1</fromSectionUID><toSectionUID>R1_S2</toSectionUID>
        </positioning>
      </positionings>
      <segments>
        <segment uID="R1_Seg1"><fromElementUID>R1_E1</fromElementUID><toElementUID>R1_E2</toElementUID></segment>
      </segments>
    </wing></wings>
  </model></aircraft>
  <profiles><wingAirfoils>
    <wingAirfoil uID="Diamond"><pointList>
      <x>1;0.5;0;0.5;1</x><y>0;0;0;0;0</y><z>0;0.1;0;-0.1;0</z>
    </pointList></wingAirfoil>
  </wingAirfoils></profiles>
</vehicles></cpacs>"#;

fn load() -> Configuration {
    Configuration::from_xml_str(SIMPLE_WING, EngineSettings::default()).expect("fixture loads")
}

fn load_instrumented() -> (Configuration, Arc<InstrumentedKernel<MeshKernel>>) {
    load_instrumented_from(SIMPLE_WING)
}

fn load_instrumented_from(xml: &str) -> (Configuration, Arc<InstrumentedKernel<MeshKernel>>) {
    let settings = EngineSettings::default();
    let kernel = Arc::new(InstrumentedKernel::new(MeshKernel::new(settings.kernel)));
    let doc = XmlDocument::parse_str(xml).expect("fixture parses");
    let configuration = Configuration::read(&doc, kernel.clone(), settings).expect("fixture loads");
    kernel.reset();
    (configuration, kernel)
}

fn assert_close(actual: f64, expected: f64, eps: f64) {
    assert!(
        (actual - expected).abs() <= eps,
        "expected {expected}, got {actual} (eps {eps})"
    );
}

fn assert_bbox_close(a: BBox, b: BBox, eps: f64) {
    assert!(a.approx_eq(b, eps), "bounding boxes differ: {a:?} vs {b:?}");
}

#[test]
fn reads_the_component_tree() {
    let configuration = load();
    assert_eq!(configuration.uid(), "SimpleAircraft");
    assert_eq!(configuration.wing_count(), 1);
    assert_eq!(configuration.fuselage_count(), 1);

    let wing = configuration.wing(1).unwrap();
    assert_eq!(wing.uid(), "W1");
    assert_eq!(wing.segment_count(), 2);
    assert_eq!(wing.component_segment_count(), 1);
    assert_eq!(wing.segment(2).unwrap().uid(), "W1_Seg2");
    assert!(matches!(
        wing.segment(3),
        Err(EngineError::IndexOutOfRange { index: 3, count: 2, .. })
    ));
    assert!(matches!(wing.segment(0), Err(EngineError::IndexOutOfRange { .. })));

    let registry = configuration.registry();
    assert_eq!(
        registry.resolve("W1_Flap").unwrap(),
        ComponentRef::TrailingEdgeDevice {
            wing: 0,
            component_segment: 0,
            index: 0
        }
    );
    assert!(matches!(
        registry.resolve("missing"),
        Err(EngineError::UnresolvedReference { .. })
    ));

    let component = configuration.geometric_component("W1_Seg1").unwrap();
    assert_eq!(component.kind(), ComponentKind::WingSegment);
    assert_eq!(component.parent_uid(), Some("W1"));
    let fuselage_segment = configuration.geometric_component("F1_Seg2").unwrap();
    assert_eq!(fuselage_segment.kind(), ComponentKind::FuselageSegment);
}

#[test]
fn duplicate_uids_are_rejected() {
    let xml = SIMPLE_WING.replace("uID=\"W1_Seg2\"", "uID=\"W1_Seg1\"");
    let err = Configuration::from_xml_str(&xml, EngineSettings::default()).unwrap_err();
    assert!(
        matches!(err, EngineError::DuplicateIdentifier { ref uid } if uid == "W1_Seg1"),
        "{err}"
    );
}

#[test]
fn unknown_airfoil_is_an_unresolved_reference() {
    let xml = SIMPLE_WING.replacen("<airfoilUID>Diamond</airfoilUID>", "<airfoilUID>Nowhere</airfoilUID>", 1);
    let err = Configuration::from_xml_str(&xml, EngineSettings::default()).unwrap_err();
    assert!(matches!(err, EngineError::UnresolvedReference { ref uid } if uid == "Nowhere"), "{err}");
}

#[test]
fn fused_loft_uses_one_wire_per_segment_plus_the_tip() {
    let (configuration, kernel) = load_instrumented();
    let wing = configuration.wing(1).unwrap();

    let loft = wing.fused_loft().unwrap();
    assert_eq!(kernel.count(KernelOp::Loft), 1);
    assert_eq!(kernel.last_loft_sections(), 3);

    let again = wing.fused_loft().unwrap();
    assert!(Arc::ptr_eq(&loft, &again));
    assert_eq!(kernel.count(KernelOp::Loft), 1);
}

#[test]
fn transform_setters_rebuild_the_wing_immediately() {
    let mut configuration = load();
    let wing = configuration.wing_mut(1).unwrap();
    let generation = wing.generation();
    let before = wing.fused_loft().unwrap();

    wing.set_translation(Vec3::new(1.0, 0.0, 0.0)).unwrap();
    assert!(!wing.is_invalidated());
    assert_eq!(wing.generation(), generation + 1);

    let after = wing.fused_loft().unwrap();
    assert!(!Arc::ptr_eq(&before, &after));
    assert_close(wing.volume().unwrap(), 0.4, 1e-9);
    let mac = wing.mac().unwrap();
    assert_close(mac.position.x, 1.0, 1e-12);
    let kernel = configuration.kernel();
    let shifted = kernel.bounding_box(&after).unwrap();
    assert_close(shifted.min.x, 1.0, 1e-12);
}

#[test]
fn update_after_invalidation_advances_the_generation_once() {
    let mut configuration = load();
    let wing = configuration.wing_mut(1).unwrap();
    let generation = wing.generation();

    wing.invalidate();
    assert!(wing.is_invalidated());
    let err = wing.fused_loft().unwrap_err();
    assert!(matches!(err, EngineError::Configuration(_)), "{err}");

    wing.update().unwrap();
    assert_eq!(wing.generation(), generation + 1);
    wing.update().unwrap();
    assert_eq!(wing.generation(), generation + 1);
    assert!(wing.fused_loft().is_ok());
}

#[test]
fn non_finite_and_zero_scaling_are_rejected() {
    let mut configuration = load();
    let wing = configuration.wing_mut(1).unwrap();
    assert!(matches!(
        wing.set_translation(Vec3::new(f64::NAN, 0.0, 0.0)),
        Err(EngineError::NonFinite { .. })
    ));
    assert!(wing.set_scaling(Vec3::new(1.0, 0.0, 1.0)).is_err());
}

#[test]
fn eta_xsi_of_leading_edge_points() {
    let configuration = load();
    let wing = configuration.wing(1).unwrap();

    let root = wing.segment_eta_xsi(Point3::new(0.0, 0.0, 0.0)).unwrap().unwrap();
    assert_eq!(root.segment_index, 1);
    assert_eq!(root.segment_uid, "W1_Seg1");
    assert_close(root.eta, 0.0, 1e-9);
    assert_close(root.xsi, 0.0, 1e-9);

    // the kink belongs to both segments; the inner one wins
    let kink = wing.segment_eta_xsi(Point3::new(0.0, 2.0, 0.0)).unwrap().unwrap();
    assert_eq!(kink.segment_index, 1);
    assert_close(kink.eta, 1.0, 1e-9);

    let outer = wing.segment_eta_xsi(Point3::new(0.3, 3.0, 0.0)).unwrap().unwrap();
    assert_eq!(outer.segment_index, 2);
    assert_close(outer.eta, 0.5, 1e-9);
    assert_close(outer.xsi, 0.3, 1e-9);

    let upper = wing.segment_eta_xsi(Point3::new(0.5, 1.0, 0.05)).unwrap().unwrap();
    assert!(upper.on_top);
    let lower = wing.segment_eta_xsi(Point3::new(0.5, 1.0, -0.05)).unwrap().unwrap();
    assert!(!lower.on_top);

    assert!(wing.segment_eta_xsi(Point3::new(0.5, 1.0, 1.0)).unwrap().is_none());
    assert!(wing.segment_eta_xsi(Point3::new(0.5, 6.0, 0.0)).unwrap().is_none());
}

#[test]
fn mac_of_an_untapered_rectangular_wing() {
    let configuration = load();
    let wing = configuration.wing(1).unwrap();
    let mac = wing.mac().unwrap();
    assert_close(mac.chord, 1.0, 1e-12);
    assert_close(mac.position.x, 0.0, 1e-12);
    assert_close(mac.position.y, 2.0, 1e-12);
    assert_close(mac.position.z, 0.0, 1e-12);
}

#[test]
fn mac_of_a_single_rectangular_segment() {
    let configuration = Configuration::from_xml_str(RECTANGULAR_WING, EngineSettings::default()).unwrap();
    let wing = configuration.wing(1).unwrap();
    assert_eq!(wing.segment_count(), 1);
    let mac = wing.mac().unwrap();
    assert_close(mac.chord, 2.0, 1e-12);
    assert_close(mac.position.x, 1.0, 1e-12);
    assert_close(mac.position.y, 1.5, 1e-12);
    assert_close(mac.position.z, 0.5, 1e-12);
}

#[test]
fn derived_wing_quantities() {
    let configuration = load();
    let wing = configuration.wing(1).unwrap();
    assert_close(wing.volume().unwrap(), 0.4, 1e-9);
    assert_close(wing.reference_area(airframe_engine::SymmetryAxis::XY), 4.0, 1e-12);
    // mirrored about the x-z plane
    assert_close(wing.wingspan().unwrap(), 8.0, 1e-9);
    assert!(wing.surface_area().unwrap() > 8.0);

    let segment = wing.segment(1).unwrap();
    assert_close(segment.volume().unwrap(), 0.2, 1e-9);
    assert_close(segment.chord_length(0.5), 1.0, 1e-12);
}

#[test]
fn repeated_flap_requests_reuse_the_cached_cut() {
    let (mut configuration, kernel) = load_instrumented();
    let wing = configuration.wing_mut(1).unwrap();
    let mut map = DeflectionMap::new();
    map.insert("W1_Flap".to_owned(), 0.0);

    let first = wing.build_fused_segments_with_flaps(&map).unwrap();
    assert_eq!(kernel.count(KernelOp::Cut), 1);
    assert_eq!(kernel.count(KernelOp::Common), 1);

    let second = wing.build_fused_segments_with_flaps(&map).unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    map.insert("W1_Flap".to_owned(), 50.0);
    let deflected = wing.build_fused_segments_with_flaps(&map).unwrap();
    assert!(!Arc::ptr_eq(&first, &deflected));
    assert_eq!(kernel.count(KernelOp::Cut), 1);
    assert_eq!(kernel.count(KernelOp::Common), 1);
    assert_eq!(wing.active_deflection(), Some(&map));
}

fn device_part(shape: &Shape) -> &Shape {
    match shape {
        Shape::Compound(parts) => &parts[0],
        other => panic!("expected a compound, got {other:?}"),
    }
}

#[test]
fn extending_and_retracting_a_flap_restores_the_baseline() {
    let mut configuration = load();
    let kernel = Arc::clone(configuration.kernel());
    let wing = configuration.wing_mut(1).unwrap();

    let fused_volume = kernel.volume(&wing.fused_loft().unwrap()).unwrap();
    let baseline = wing.extend_flap("W1_Flap", 0.0).unwrap();
    let baseline_box = kernel.bounding_box(&baseline).unwrap();
    let baseline_volume = kernel.volume(&baseline).unwrap();
    assert_close(baseline_volume, fused_volume, 1e-9);

    let deflected = wing.extend_flap("W1_Flap", 50.0).unwrap();
    let moved = kernel.bounding_box(device_part(&deflected)).unwrap();
    let rest = kernel.bounding_box(device_part(&baseline)).unwrap();
    assert!(!moved.approx_eq(rest, 1e-3), "device did not move: {moved:?}");

    let retracted = wing.extend_flap("W1_Flap", 0.0).unwrap();
    assert_bbox_close(kernel.bounding_box(&retracted).unwrap(), baseline_box, 1e-12);
    assert_close(kernel.volume(&retracted).unwrap(), baseline_volume, 1e-12);

    assert!(matches!(
        wing.extend_flap("nope", 10.0),
        Err(EngineError::UnresolvedReference { .. })
    ));
}

#[test]
fn unknown_devices_in_a_map_are_ignored_and_values_clamped() {
    let mut configuration = load();
    let wing = configuration.wing_mut(1).unwrap();
    let mut map = DeflectionMap::new();
    map.insert("W1_Flap".to_owned(), 150.0);
    map.insert("Elsewhere".to_owned(), 20.0);

    wing.build_fused_segments_with_flaps(&map).unwrap();
    let active = wing.active_deflection().unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active.get("W1_Flap"), Some(&100.0));
}

#[test]
fn wing_without_flaps_removes_the_device_region() {
    let configuration = load();
    let kernel = configuration.kernel();
    let wing = configuration.wing(1).unwrap();
    let fused = wing.fused_loft().unwrap();
    let residual = wing.wing_without_flaps().unwrap();
    assert!(!Arc::ptr_eq(&fused, &residual));
    let (fused_area, residual_area) = (kernel.area(&fused).unwrap(), kernel.area(&residual).unwrap());
    assert!(residual_area < fused_area, "{residual_area} >= {fused_area}");
    // the cut is cached: asking again returns the same shape
    assert!(Arc::ptr_eq(&residual, &wing.wing_without_flaps().unwrap()));
}

fn compound_parts(shape: &Shape) -> &[Shape] {
    match shape {
        Shape::Compound(parts) => parts,
        other => panic!("expected a compound, got {other:?}"),
    }
}

#[test]
fn devices_are_cut_in_reverse_order_from_the_shrinking_residual() {
    let (mut configuration, kernel) = load_instrumented_from(TWO_FLAP_WING);
    let wing = configuration.wing_mut(1).unwrap();
    let fused_volume = kernel.volume(&wing.fused_loft().unwrap()).unwrap();

    let assembly = wing.build_fused_segments_with_flaps(&DeflectionMap::new()).unwrap();
    assert_eq!(kernel.count(KernelOp::Cut), 2);
    assert_eq!(kernel.count(KernelOp::Common), 2);

    // outer flap first, then inner flap, then the residual
    let parts = compound_parts(&assembly);
    assert_eq!(parts.len(), 3);
    let outer = kernel.bounding_box(&parts[0]).unwrap();
    let inner = kernel.bounding_box(&parts[1]).unwrap();
    assert!(outer.min.y > inner.min.y && outer.max.y > inner.max.y, "{outer:?} vs {inner:?}");

    let residual = wing.wing_without_flaps().unwrap();
    let devices = kernel.volume(&parts[0]).unwrap() + kernel.volume(&parts[1]).unwrap();
    assert_close(kernel.volume(&residual).unwrap(), fused_volume - devices, 1e-9);

    wing.extend_flap("W1_OuterFlap", 60.0).unwrap();
    wing.extend_flap("W1_InnerFlap", 20.0).unwrap();
    assert_eq!(kernel.count(KernelOp::Cut), 2);
    assert_eq!(kernel.count(KernelOp::Common), 2);
}

#[test]
fn wing_cut_out_moves_the_inner_device_border() {
    let configuration = Configuration::from_xml_str(TWO_FLAP_WING, EngineSettings::default()).unwrap();
    let wing = configuration.wing(1).unwrap();
    let device = wing.component_segment(1).unwrap().device_by_uid("W1_InnerFlap").unwrap();
    assert_close(device.wing_cut_out().inner.eta, 0.2, 1e-12);
    assert_close(device.wing_cut_out().inner.rot_z, 5.0, 1e-12);
    assert!(device.wing_cut_out().outer.eta < 0.0);

    let start = TWO_FLAP_WING.find("<wingCutOut>").unwrap();
    let end = TWO_FLAP_WING.find("</wingCutOut>").unwrap() + "</wingCutOut>".len();
    let plain_xml = format!("{}{}", &TWO_FLAP_WING[..start], &TWO_FLAP_WING[end..]);
    let plain = Configuration::from_xml_str(&plain_xml, EngineSettings::default()).unwrap();

    let kernel = configuration.kernel();
    let inner_device_area = |configuration: &Configuration| {
        let assembly = configuration
            .wing(1)
            .unwrap()
            .flap_assembly(&DeflectionMap::new())
            .unwrap();
        kernel.area(&compound_parts(&assembly)[1]).unwrap()
    };
    // the cut-out starts outboard of the device border and keeps less of the wing
    let (with_cut_out, without) = (inner_device_area(&configuration), inner_device_area(&plain));
    assert!(with_cut_out < without, "{with_cut_out} >= {without}");

    let xml = configuration.to_xml_string().unwrap();
    let reread = Configuration::from_xml_str(&xml, EngineSettings::default()).unwrap();
    let reread_device = reread
        .wing(1)
        .unwrap()
        .component_segment(1)
        .unwrap()
        .device_by_uid("W1_InnerFlap")
        .unwrap()
        .wing_cut_out();
    assert_eq!(reread_device, device.wing_cut_out());
}

#[test]
fn fuselage_quantities() {
    let configuration = load();
    let fuselage = configuration.fuselage(1).unwrap();
    assert_close(fuselage.length().unwrap(), 10.0, 1e-12);
    assert_close(fuselage.volume().unwrap(), 20.0, 1e-9);
    assert_close(fuselage.circumference(1, 0.5).unwrap(), 4.0 * 2f64.sqrt(), 1e-9);

    let segment = fuselage.segment(1).unwrap();
    let p = segment.point(0.5, 0.0);
    assert_close(p.x, 2.5, 1e-12);
    assert_close(p.z, 1.0, 1e-12);
}

#[test]
fn scaled_fuselage_answers_queries_without_an_explicit_update() {
    let mut configuration = load();
    let fuselage = configuration.fuselage_mut(1).unwrap();
    fuselage.set_scaling(Vec3::new(2.0, 1.0, 1.0)).unwrap();
    assert!(!fuselage.is_invalidated());
    assert_close(fuselage.length().unwrap(), 20.0, 1e-12);
    assert_close(fuselage.volume().unwrap(), 40.0, 1e-9);
}

#[test]
fn write_then_read_preserves_the_model() {
    let mut configuration = load();
    configuration
        .wing_mut(1)
        .unwrap()
        .set_translation(Vec3::new(0.0, 0.0, 0.5))
        .unwrap();
    configuration.update().unwrap();

    let xml = configuration.to_xml_string().unwrap();
    let reread = Configuration::from_xml_str(&xml, EngineSettings::default()).unwrap();

    let wing = reread.wing_by_uid("W1").unwrap();
    assert_eq!(wing.transformation().translation(), Vec3::new(0.0, 0.0, 0.5));
    assert_eq!(wing.symmetry(), airframe_engine::SymmetryAxis::XZ);
    assert_close(wing.volume().unwrap(), 0.4, 1e-9);
    let device = wing.component_segment(1).unwrap().device_by_uid("W1_Flap").unwrap();
    assert_eq!(device.steps().len(), 2);
    assert_eq!(reread.registry().len(), configuration.registry().len());
    assert_close(reread.fuselage(1).unwrap().length().unwrap(), 10.0, 1e-12);
}

#[test]
fn settings_file_overrides_defaults() {
    let settings = EngineSettings::from_xml_str(
        "<settings><pointTolerance>0.01</pointTolerance><inversionMaxIterations>5</inversionMaxIterations></settings>",
    )
    .unwrap();
    let configuration = Configuration::from_xml_str(SIMPLE_WING, settings).unwrap();
    assert_eq!(configuration.settings().point_tolerance, 0.01);
    assert_eq!(configuration.settings().inversion_max_iterations, 5);

    // a point just above the skin counts as on the wing with the looser tolerance
    let wing = configuration.wing(1).unwrap();
    assert!(wing.segment_eta_xsi(Point3::new(0.5, 1.0, 0.105)).unwrap().is_some());
}

#[test]
fn report_lists_every_component() {
    let configuration = load();
    let report = ConfigurationReport::collect(&configuration).unwrap();
    assert_eq!(report.wings.len(), 1);
    assert_eq!(report.fuselages.len(), 1);
    assert_close(report.wings[0].wingspan, 8.0, 1e-9);

    let xml = report.to_xml_string().unwrap();
    assert!(xml.contains("<wing uid=\"W1\""), "{xml}");
    assert!(xml.contains("<fuselage uid=\"F1\""), "{xml}");
}
