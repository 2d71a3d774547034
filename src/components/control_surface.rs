//! Trailing-edge devices: outer shape, hinge line and deflection path.
//!
//! Geometry queries take the owning component segment and the wing's
//! segments because a device is positioned in component-segment
//! coordinates.

use crate::config::EngineSettings;
use crate::error::{EngineError, EngineResult};
use crate::geom::{GeometryKernel, LoftOptions, Memo, Point3, Shape, Transform, Vec3, Wire};
use crate::parse::DocumentBackend;

use super::component_segment::ComponentSegment;
use super::wing_segment::WingSegment;

/// Inner or outer edge of the device outline. `xsi_te` is always 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceBorder {
    pub eta_le: f64,
    pub eta_te: f64,
    pub xsi_le: f64,
}

impl DeviceBorder {
    fn read(doc: &dyn DocumentBackend, path: &str) -> EngineResult<Self> {
        let eta_le = doc.double(&format!("{path}/etaLE"))?;
        Ok(Self {
            eta_le,
            eta_te: doc.optional_double(&format!("{path}/etaTE")).unwrap_or(eta_le),
            xsi_le: doc.double(&format!("{path}/xsiLE"))?,
        })
    }

    fn write(&self, doc: &mut dyn DocumentBackend, path: &str) -> EngineResult<()> {
        doc.set_double(&format!("{path}/etaLE"), self.eta_le)?;
        doc.set_double(&format!("{path}/etaTE"), self.eta_te)?;
        doc.set_double(&format!("{path}/xsiLE"), self.xsi_le)?;
        Ok(())
    }
}

/// Hinge location on one border. Negative values mean "not given".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HingePoint {
    pub hinge_xsi: f64,
    pub hinge_rel_height: f64,
}

impl Default for HingePoint {
    fn default() -> Self {
        Self {
            hinge_xsi: -1.0,
            hinge_rel_height: -1.0,
        }
    }
}

impl HingePoint {
    fn read(doc: &dyn DocumentBackend, path: &str) -> Self {
        let mut hinge = Self::default();
        if let Some(xsi) = doc.optional_double(&format!("{path}/hingeXsi")) {
            hinge.hinge_xsi = xsi;
        }
        if let Some(height) = doc.optional_double(&format!("{path}/hingeRelHeight")) {
            hinge.hinge_rel_height = height;
        }
        hinge
    }

    fn write(&self, doc: &mut dyn DocumentBackend, path: &str) -> EngineResult<()> {
        if self.hinge_xsi >= 0.0 {
            doc.set_double(&format!("{path}/hingeXsi"), self.hinge_xsi)?;
        }
        if self.hinge_rel_height >= 0.0 {
            doc.set_double(&format!("{path}/hingeRelHeight"), self.hinge_rel_height)?;
        }
        Ok(())
    }
}

/// One point of the deflection path.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DeflectionStep {
    /// Percent of the full deflection, 0 to 100.
    pub rel_deflection: f64,
    /// Degrees about the hinge line.
    pub hinge_line_rotation: f64,
    pub inner_hinge_translation: Vec3,
    pub outer_hinge_translation: Vec3,
}

impl DeflectionStep {
    fn read(doc: &dyn DocumentBackend, path: &str) -> EngineResult<Self> {
        let translation = |name: &str| -> EngineResult<Vec3> {
            let p = format!("{path}/{name}");
            Ok(if doc.check_element(&p) {
                doc.point(&p)?.to_vec3()
            } else {
                Vec3::ZERO
            })
        };
        Ok(Self {
            rel_deflection: doc.double(&format!("{path}/relDeflection"))?,
            hinge_line_rotation: doc.double(&format!("{path}/hingeLineRotation"))?,
            inner_hinge_translation: translation("innerHingeTranslation")?,
            outer_hinge_translation: translation("outerHingeTranslation")?,
        })
    }

    fn write(&self, doc: &mut dyn DocumentBackend, path: &str) -> EngineResult<()> {
        doc.set_double(&format!("{path}/relDeflection"), self.rel_deflection)?;
        doc.set_double(&format!("{path}/hingeLineRotation"), self.hinge_line_rotation)?;
        doc.set_point(
            &format!("{path}/innerHingeTranslation"),
            Point3::ORIGIN + self.inner_hinge_translation,
        )?;
        doc.set_point(
            &format!("{path}/outerHingeTranslation"),
            Point3::ORIGIN + self.outer_hinge_translation,
        )?;
        Ok(())
    }

    fn lerp(&self, other: &Self, t: f64) -> Self {
        let mix = |a: f64, b: f64| a + (b - a) * t;
        Self {
            rel_deflection: mix(self.rel_deflection, other.rel_deflection),
            hinge_line_rotation: mix(self.hinge_line_rotation, other.hinge_line_rotation),
            inner_hinge_translation: self.inner_hinge_translation.lerp(other.inner_hinge_translation, t),
            outer_hinge_translation: self.outer_hinge_translation.lerp(other.outer_hinge_translation, t),
        }
    }
}

/// Shape of the wing cut-out on one border. `eta < 0` keeps the device
/// border; `rot_z` turns the cut plane about the surface normal (degrees).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CutOutProfile {
    pub eta: f64,
    pub rot_z: f64,
}

impl Default for CutOutProfile {
    fn default() -> Self {
        Self { eta: -1.0, rot_z: 0.0 }
    }
}

impl CutOutProfile {
    fn read(doc: &dyn DocumentBackend, path: &str) -> Self {
        let mut profile = Self::default();
        if let Some(eta) = doc.optional_double(&format!("{path}/eta")) {
            profile.eta = eta;
        }
        if let Some(rot_z) = doc.optional_double(&format!("{path}/rotZ")) {
            profile.rot_z = rot_z;
        }
        profile
    }

    fn write(&self, doc: &mut dyn DocumentBackend, path: &str) -> EngineResult<()> {
        if self.eta >= 0.0 {
            doc.set_double(&format!("{path}/eta"), self.eta)?;
        }
        if self.rot_z != 0.0 {
            doc.set_double(&format!("{path}/rotZ"), self.rot_z)?;
        }
        Ok(())
    }

    fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WingCutOut {
    pub inner: CutOutProfile,
    pub outer: CutOutProfile,
}

#[derive(Debug)]
pub struct TrailingEdgeDevice {
    uid: String,
    name: String,
    parent_uid: Option<String>,
    inner_border: DeviceBorder,
    outer_border: DeviceBorder,
    inner_hinge: HingePoint,
    outer_hinge: HingePoint,
    /// Sorted by `rel_deflection`.
    steps: Vec<DeflectionStep>,
    wing_cut_out: WingCutOut,
    /// Part of the wing inside the cut-out, stamped with the wing generation.
    loft: Memo<Shape>,
}

impl TrailingEdgeDevice {
    pub(crate) fn read(doc: &dyn DocumentBackend, path: &str) -> EngineResult<Self> {
        let steps_path = format!("{path}/path/steps");
        let mut steps = (1..=doc.named_child_count(&steps_path, "step"))
            .map(|m| DeflectionStep::read(doc, &format!("{steps_path}/step[{m}]")))
            .collect::<EngineResult<Vec<_>>>()?;
        steps.sort_by(|a, b| a.rel_deflection.total_cmp(&b.rel_deflection));

        let cut_out = format!("{path}/wingCutOut");
        Ok(Self {
            uid: doc.attribute(path, "uID")?,
            name: doc.optional_text(&format!("{path}/name")).unwrap_or_default(),
            parent_uid: doc.optional_text(&format!("{path}/parentUID")),
            inner_border: DeviceBorder::read(doc, &format!("{path}/outerShape/innerBorder"))?,
            outer_border: DeviceBorder::read(doc, &format!("{path}/outerShape/outerBorder"))?,
            inner_hinge: HingePoint::read(doc, &format!("{path}/path/innerHingePoint")),
            outer_hinge: HingePoint::read(doc, &format!("{path}/path/outerHingePoint")),
            steps,
            wing_cut_out: WingCutOut {
                inner: CutOutProfile::read(doc, &format!("{cut_out}/innerBorder")),
                outer: CutOutProfile::read(doc, &format!("{cut_out}/outerBorder")),
            },
            loft: Memo::new(),
        })
    }

    pub(crate) fn write(&self, doc: &mut dyn DocumentBackend, path: &str) -> EngineResult<()> {
        doc.set_attribute(path, "uID", &self.uid)?;
        doc.set_text(&format!("{path}/name"), &self.name)?;
        if let Some(parent) = &self.parent_uid {
            doc.set_text(&format!("{path}/parentUID"), parent)?;
        }
        self.inner_border.write(doc, &format!("{path}/outerShape/innerBorder"))?;
        self.outer_border.write(doc, &format!("{path}/outerShape/outerBorder"))?;
        self.inner_hinge.write(doc, &format!("{path}/path/innerHingePoint"))?;
        self.outer_hinge.write(doc, &format!("{path}/path/outerHingePoint"))?;
        for (m, step) in self.steps.iter().enumerate() {
            step.write(doc, &format!("{path}/path/steps/step[{}]", m + 1))?;
        }
        let cut_out = &self.wing_cut_out;
        if !(cut_out.inner.is_default() && cut_out.outer.is_default()) {
            cut_out.inner.write(doc, &format!("{path}/wingCutOut/innerBorder"))?;
            cut_out.outer.write(doc, &format!("{path}/wingCutOut/outerBorder"))?;
        }
        Ok(())
    }

    #[must_use]
    pub fn uid(&self) -> &str {
        &self.uid
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn parent_uid(&self) -> Option<&str> {
        self.parent_uid.as_deref()
    }

    #[must_use]
    pub fn inner_border(&self) -> DeviceBorder {
        self.inner_border
    }

    #[must_use]
    pub fn outer_border(&self) -> DeviceBorder {
        self.outer_border
    }

    #[must_use]
    pub fn steps(&self) -> &[DeflectionStep] {
        &self.steps
    }

    #[must_use]
    pub fn wing_cut_out(&self) -> WingCutOut {
        self.wing_cut_out
    }

    /// Replaces the deflection path. Cached lofts stay valid because the
    /// path only affects the transform.
    pub fn set_steps(&mut self, mut steps: Vec<DeflectionStep>) -> EngineResult<()> {
        let finite = |v: Vec3| v.is_finite();
        if steps.iter().any(|s| {
            !s.rel_deflection.is_finite()
                || !s.hinge_line_rotation.is_finite()
                || !finite(s.inner_hinge_translation)
                || !finite(s.outer_hinge_translation)
        }) {
            return Err(EngineError::NonFinite { what: "deflection step" });
        }
        steps.sort_by(|a, b| a.rel_deflection.total_cmp(&b.rel_deflection));
        self.steps = steps;
        Ok(())
    }

    pub(crate) fn cached_loft(&self) -> &Memo<Shape> {
        &self.loft
    }

    /// Solid enclosing the device region: the border corners, pushed above
    /// and below the chord surface and past the trailing edge, lofted
    /// from the inner to the outer border.
    pub fn cut_out_shape(
        &self,
        kernel: &dyn GeometryKernel,
        component_segment: &ComponentSegment,
        segments: &[WingSegment],
        settings: &EngineSettings,
    ) -> EngineResult<Shape> {
        let border_wire = |border: &DeviceBorder, cut_out: &CutOutProfile| -> EngineResult<Wire> {
            let (eta_le, eta_te) = if cut_out.eta >= 0.0 {
                (cut_out.eta, cut_out.eta)
            } else {
                (border.eta_le, border.eta_te)
            };
            let le = component_segment.chord_point(segments, eta_le, border.xsi_le);
            let te = component_segment.chord_point(segments, eta_te, 1.0);
            let te = te + (te - le) * settings.cut_out_trailing_edge_extension;
            let normal = component_segment.normal(segments, eta_le);
            let offset = normal * (settings.cut_out_height_factor * component_segment.chord_length(segments, eta_le));

            let corners = vec![le + offset, te + offset, te - offset, le - offset];
            let corners = if cut_out.rot_z == 0.0 {
                corners
            } else {
                let rotation = Transform::rotate_about_line(le, normal, cut_out.rot_z.to_radians())
                    .ok_or_else(|| EngineError::configuration(format!("device `{}`: degenerate cut-out normal", self.uid)))?;
                corners.into_iter().map(|p| rotation.apply_point(p)).collect()
            };
            Ok(Wire::closed(corners))
        };

        let inner = border_wire(&self.inner_border, &self.wing_cut_out.inner)?;
        let outer = border_wire(&self.outer_border, &self.wing_cut_out.outer)?;
        log::trace!("device `{}`: cut-out solid", self.uid);
        Ok(kernel.loft(&[inner, outer], &LoftOptions::ruled_solid())?)
    }

    /// Inner and outer hinge points in world coordinates. Missing hinge xsi
    /// falls back to the border's leading edge, missing height to half
    /// thickness.
    #[must_use]
    pub fn hinge_points(&self, component_segment: &ComponentSegment, segments: &[WingSegment]) -> (Point3, Point3) {
        let hinge = |border: &DeviceBorder, hinge: &HingePoint| {
            let xsi = if hinge.hinge_xsi >= 0.0 { hinge.hinge_xsi } else { border.xsi_le };
            let rel = if hinge.hinge_rel_height >= 0.0 {
                hinge.hinge_rel_height
            } else {
                log::trace!("device `{}`: no hinge height, using 0.5", self.uid);
                0.5
            };
            let upper = component_segment.upper_point(segments, border.eta_le, xsi);
            let lower = component_segment.lower_point(segments, border.eta_le, xsi);
            lower.lerp(upper, rel)
        };
        (
            hinge(&self.inner_border, &self.inner_hinge),
            hinge(&self.outer_border, &self.outer_hinge),
        )
    }

    /// Path parameters at `percent`, clamped to 0–100 and to the defined
    /// steps and interpolated linearly between them.
    #[must_use]
    pub fn deflection_parameters(&self, percent: f64) -> DeflectionStep {
        let percent = percent.clamp(0.0, 100.0);
        let (Some(first), Some(last)) = (self.steps.first(), self.steps.last()) else {
            return DeflectionStep {
                rel_deflection: percent,
                ..DeflectionStep::default()
            };
        };
        if percent <= first.rel_deflection {
            return *first;
        }
        if percent >= last.rel_deflection {
            return *last;
        }
        for pair in self.steps.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            if percent <= b.rel_deflection {
                let span = b.rel_deflection - a.rel_deflection;
                let t = if span > 0.0 { (percent - a.rel_deflection) / span } else { 0.0 };
                return a.lerp(b, t);
            }
        }
        *last
    }

    /// Rigid motion of the device at `percent`: rotation about the hinge
    /// line followed by the mean hinge translation.
    pub fn transformation(
        &self,
        component_segment: &ComponentSegment,
        segments: &[WingSegment],
        percent: f64,
    ) -> EngineResult<Transform> {
        let step = self.deflection_parameters(percent);
        let (inner, outer) = self.hinge_points(component_segment, segments);
        let rotation = Transform::rotate_about_line(inner, outer - inner, step.hinge_line_rotation.to_radians())
            .ok_or_else(|| EngineError::configuration(format!("device `{}` has a degenerate hinge line", self.uid)))?;
        let translation = (step.inner_hinge_translation + step.outer_hinge_translation) * 0.5;
        Ok(Transform::translate(translation) * rotation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::{DocumentBackend, XmlDocument};

    fn device() -> TrailingEdgeDevice {
        let doc = XmlDocument::parse_str(
            r"<ted uID='F1'>
                <name>Flap</name>
                <outerShape>
                  <innerBorder><etaLE>0.1</etaLE><xsiLE>0.7</xsiLE></innerBorder>
                  <outerBorder><etaLE>0.9</etaLE><etaTE>0.85</etaTE><xsiLE>0.75</xsiLE></outerBorder>
                </outerShape>
                <path>
                  <innerHingePoint><hingeXsi>0.72</hingeXsi></innerHingePoint>
                  <steps>
                    <step><relDeflection>100</relDeflection><hingeLineRotation>30</hingeLineRotation>
                      <innerHingeTranslation><x>0.2</x><y>0</y><z>0</z></innerHingeTranslation></step>
                    <step><relDeflection>0</relDeflection><hingeLineRotation>0</hingeLineRotation></step>
                  </steps>
                </path>
              </ted>",
        )
        .unwrap();
        TrailingEdgeDevice::read(&doc, "/ted").unwrap()
    }

    #[test]
    fn optional_fields_keep_their_sentinels() {
        let d = device();
        assert_eq!(d.inner_border().eta_te, 0.1);
        assert_eq!(d.outer_border().eta_te, 0.85);
        assert_eq!(d.inner_hinge.hinge_xsi, 0.72);
        assert_eq!(d.inner_hinge.hinge_rel_height, -1.0);
        assert_eq!(d.outer_hinge, HingePoint::default());
        assert_eq!(d.wing_cut_out(), WingCutOut::default());
        assert_eq!(d.parent_uid(), None);
    }

    #[test]
    fn deflection_is_interpolated_between_sorted_steps() {
        let d = device();
        assert_eq!(d.steps()[0].rel_deflection, 0.0);
        let half = d.deflection_parameters(50.0);
        assert!((half.hinge_line_rotation - 15.0).abs() < 1e-12);
        assert!((half.inner_hinge_translation.x - 0.1).abs() < 1e-12);
        assert_eq!(d.deflection_parameters(150.0).hinge_line_rotation, 30.0);
        assert_eq!(d.deflection_parameters(-5.0).hinge_line_rotation, 0.0);
    }

    #[test]
    fn wing_cut_out_survives_write_and_read() {
        let doc = XmlDocument::parse_str(
            r"<ted uID='F2'>
                <outerShape>
                  <innerBorder><etaLE>0.2</etaLE><xsiLE>0.7</xsiLE></innerBorder>
                  <outerBorder><etaLE>0.4</etaLE><xsiLE>0.7</xsiLE></outerBorder>
                </outerShape>
                <wingCutOut>
                  <innerBorder><eta>0.15</eta><rotZ>5</rotZ></innerBorder>
                </wingCutOut>
              </ted>",
        )
        .unwrap();
        let flap = TrailingEdgeDevice::read(&doc, "/ted").unwrap();
        assert_eq!(flap.wing_cut_out().inner, CutOutProfile { eta: 0.15, rot_z: 5.0 });

        let mut out = XmlDocument::parse_str("<ted/>").unwrap();
        flap.write(&mut out, "/ted").unwrap();
        assert!(out.check_element("/ted/wingCutOut/innerBorder/eta"));
        assert!(!out.check_element("/ted/wingCutOut/outerBorder/eta"));

        let reread = TrailingEdgeDevice::read(&out, "/ted").unwrap();
        assert_eq!(reread.wing_cut_out(), flap.wing_cut_out());
        assert_eq!(reread.wing_cut_out().outer, CutOutProfile::default());

        let mut plain = XmlDocument::parse_str("<ted/>").unwrap();
        device().write(&mut plain, "/ted").unwrap();
        assert!(!plain.check_element("/ted/wingCutOut"));
    }

    #[test]
    fn steps_must_be_finite() {
        let mut d = device();
        let bad = DeflectionStep {
            rel_deflection: f64::NAN,
            ..DeflectionStep::default()
        };
        assert!(d.set_steps(vec![bad]).is_err());
        assert_eq!(d.steps().len(), 2);
    }
}
