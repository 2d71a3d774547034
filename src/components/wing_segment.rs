//! Wing segments: the span between two section elements and its eta/xsi
//! coordinate system.
//!
//! Eta runs from the inner (0) to the outer (1) connection, xsi from the
//! leading (0) to the trailing (1) edge. The chord surface is the bilinear
//! patch through the four chord corners.

use std::sync::Arc;

use crate::config::{ComponentRef, EngineSettings, Owner, ReadContext};
use crate::error::{EngineError, EngineResult};
use crate::geom::{
    GeometryKernel, LoftOptions, Memo, Point3, Shape, SharedShape, Transform, Vec3, Wire,
};
use crate::parse::DocumentBackend;

use super::connection::Connection;
use super::positioning::Positionings;
use super::profile::WingProfile;
use super::section::Section;
use super::{ComponentKind, GeometricComponent, SymmetryAxis, stale};

/// Leading-edge path through a segment, given as offsets from the straight
/// leading edge at increasing eta.
#[derive(Debug, Clone, PartialEq)]
pub struct GuideCurve {
    uid: String,
    points: Vec<(f64, Vec3)>,
}

impl GuideCurve {
    pub fn new(uid: impl Into<String>, mut points: Vec<(f64, Vec3)>) -> EngineResult<Self> {
        if points.iter().any(|(eta, offset)| !eta.is_finite() || !offset.is_finite()) {
            return Err(EngineError::NonFinite { what: "guide curve point" });
        }
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        Ok(Self {
            uid: uid.into(),
            points,
        })
    }

    fn read(doc: &dyn DocumentBackend, path: &str) -> EngineResult<Self> {
        let list = format!("{path}/pointList");
        let etas = doc.vector(&format!("{list}/eta"))?;
        let xs = doc.vector(&format!("{list}/x"))?;
        let ys = doc.vector(&format!("{list}/y"))?;
        let zs = doc.vector(&format!("{list}/z"))?;
        if [xs.len(), ys.len(), zs.len()].iter().any(|n| *n != etas.len()) {
            return Err(EngineError::configuration(format!(
                "guide curve `{path}` has coordinate lists of different length"
            )));
        }
        let points = etas
            .into_iter()
            .zip(xs.into_iter().zip(ys).zip(zs))
            .map(|(eta, ((x, y), z))| (eta, Vec3::new(x, y, z)))
            .collect();
        Self::new(doc.attribute(path, "uID")?, points)
    }

    fn write(&self, doc: &mut dyn DocumentBackend, path: &str) -> EngineResult<()> {
        doc.set_attribute(path, "uID", &self.uid)?;
        let list = format!("{path}/pointList");
        let column = |f: fn(&(f64, Vec3)) -> f64| self.points.iter().map(f).collect::<Vec<_>>();
        doc.set_vector(&format!("{list}/eta"), &column(|p| p.0))?;
        doc.set_vector(&format!("{list}/x"), &column(|p| p.1.x))?;
        doc.set_vector(&format!("{list}/y"), &column(|p| p.1.y))?;
        doc.set_vector(&format!("{list}/z"), &column(|p| p.1.z))?;
        Ok(())
    }

    #[must_use]
    pub fn uid(&self) -> &str {
        &self.uid
    }

    /// `(eta, offset)` pairs sorted by eta.
    #[must_use]
    pub fn points(&self) -> &[(f64, Vec3)] {
        &self.points
    }
}

#[derive(Debug)]
pub struct WingSegment {
    uid: String,
    name: String,
    wing_uid: String,
    inner: Connection<WingProfile>,
    outer: Connection<WingProfile>,
    guide_curves: Vec<GuideCurve>,
    wing_transform: Transform,
    symmetry: SymmetryAxis,
    generation: u64,
    invalidated: bool,
    loft: Memo<Shape>,
    kernel: Arc<dyn GeometryKernel>,
    settings: EngineSettings,
}

impl WingSegment {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn read(
        ctx: &mut ReadContext<'_>,
        doc: &dyn DocumentBackend,
        path: &str,
        wing: usize,
        wing_uid: &str,
        index: usize,
        sections: &[Section],
        positionings: &Positionings,
    ) -> EngineResult<Self> {
        let uid = doc.attribute(path, "uID")?;
        ctx.registry.add_uid(
            &uid,
            ComponentRef::Segment {
                owner: Owner::Wing(wing),
                index,
            },
        )?;
        let profiles = ctx.profiles;
        let inner = Connection::resolve(
            sections,
            positionings,
            &doc.text(&format!("{path}/fromElementUID"))?,
            |p| profiles.wing_profile(p),
        )?;
        let outer = Connection::resolve(
            sections,
            positionings,
            &doc.text(&format!("{path}/toElementUID"))?,
            |p| profiles.wing_profile(p),
        )?;

        let curves_path = format!("{path}/guideCurves");
        let mut guide_curves = Vec::new();
        for k in 1..=doc.named_child_count(&curves_path, "guideCurve") {
            let curve = GuideCurve::read(doc, &format!("{curves_path}/guideCurve[{k}]"))?;
            ctx.registry.add_uid(
                &curve.uid,
                ComponentRef::GuideCurve {
                    wing,
                    segment: index,
                    index: k - 1,
                },
            )?;
            guide_curves.push(curve);
        }

        Ok(Self {
            uid,
            name: doc.optional_text(&format!("{path}/name")).unwrap_or_default(),
            wing_uid: wing_uid.to_owned(),
            inner,
            outer,
            guide_curves,
            wing_transform: Transform::identity(),
            symmetry: SymmetryAxis::None,
            generation: 0,
            invalidated: true,
            loft: Memo::new(),
            kernel: Arc::clone(ctx.kernel),
            settings: *ctx.settings,
        })
    }

    pub(crate) fn write(&self, doc: &mut dyn DocumentBackend, path: &str) -> EngineResult<()> {
        doc.set_attribute(path, "uID", &self.uid)?;
        doc.set_text(&format!("{path}/name"), &self.name)?;
        doc.set_text(&format!("{path}/fromElementUID"), self.inner.element_uid())?;
        doc.set_text(&format!("{path}/toElementUID"), self.outer.element_uid())?;
        for (k, curve) in self.guide_curves.iter().enumerate() {
            curve.write(doc, &format!("{path}/guideCurves/guideCurve[{}]", k + 1))?;
        }
        Ok(())
    }

    /// Pulls the owner's current transforms and marks the segment stale.
    pub(crate) fn sync(
        &mut self,
        sections: &[Section],
        positionings: &Positionings,
        wing_transform: Transform,
        symmetry: SymmetryAxis,
    ) {
        self.inner.refresh(sections, positionings);
        self.outer.refresh(sections, positionings);
        self.wing_transform = wing_transform;
        self.symmetry = symmetry;
        self.invalidated = true;
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn inner_connection(&self) -> &Connection<WingProfile> {
        &self.inner
    }

    #[must_use]
    pub fn outer_connection(&self) -> &Connection<WingProfile> {
        &self.outer
    }

    #[must_use]
    pub fn guide_curves(&self) -> &[GuideCurve] {
        &self.guide_curves
    }

    #[must_use]
    pub fn guide_curve(&self, uid: &str) -> Option<&GuideCurve> {
        self.guide_curves.iter().find(|c| c.uid == uid)
    }

    fn world(&self, connection: &Connection<WingProfile>, point: Point3) -> Point3 {
        self.wing_transform.apply_point(connection.place_point(point))
    }

    /// Inner and outer wire in the wing frame, before the wing transform.
    #[must_use]
    pub fn wing_frame_wires(&self) -> (Wire, Wire) {
        (
            self.inner.place_wire(&self.inner.profile().wire()),
            self.outer.place_wire(&self.outer.profile().wire()),
        )
    }

    #[must_use]
    pub fn wing_frame_upper_wires(&self) -> (Wire, Wire) {
        (
            self.inner.place_wire(&self.inner.profile().upper_wire()),
            self.outer.place_wire(&self.outer.profile().upper_wire()),
        )
    }

    #[must_use]
    pub fn wing_frame_lower_wires(&self) -> (Wire, Wire) {
        (
            self.inner.place_wire(&self.inner.profile().lower_wire()),
            self.outer.place_wire(&self.outer.profile().lower_wire()),
        )
    }

    #[must_use]
    pub fn chord_point(&self, eta: f64, xsi: f64) -> Point3 {
        let inner = self.world(&self.inner, self.inner.profile().chord_point(xsi));
        let outer = self.world(&self.outer, self.outer.profile().chord_point(xsi));
        inner.lerp(outer, eta)
    }

    #[must_use]
    pub fn upper_point(&self, eta: f64, xsi: f64) -> Point3 {
        let inner = self.world(&self.inner, self.inner.profile().upper_point(xsi));
        let outer = self.world(&self.outer, self.outer.profile().upper_point(xsi));
        inner.lerp(outer, eta)
    }

    #[must_use]
    pub fn lower_point(&self, eta: f64, xsi: f64) -> Point3 {
        let inner = self.world(&self.inner, self.inner.profile().lower_point(xsi));
        let outer = self.world(&self.outer, self.outer.profile().lower_point(xsi));
        inner.lerp(outer, eta)
    }

    /// Chord length at `eta`.
    #[must_use]
    pub fn chord_length(&self, eta: f64) -> f64 {
        self.chord_point(eta, 0.0).distance_to(self.chord_point(eta, 1.0))
    }

    /// Inverts the chord surface for the point closest to `point`.
    pub fn eta_xsi(&self, point: Point3) -> EngineResult<(f64, f64)> {
        let a = self.chord_point(0.0, 0.0);
        let b = self.chord_point(0.0, 1.0);
        let c = self.chord_point(1.0, 0.0);
        let d = self.chord_point(1.0, 1.0);

        let max_iterations = self.settings.inversion_max_iterations;
        let (mut eta, mut xsi) = (0.5, 0.5);
        for _ in 0..max_iterations {
            let surface = a.lerp(b, xsi).lerp(c.lerp(d, xsi), eta);
            let r = surface - point;
            let d_eta = (c - a) * (1.0 - xsi) + (d - b) * xsi;
            let d_xsi = (b - a) * (1.0 - eta) + (d - c) * eta;

            let (m11, m12, m22) = (d_eta.dot(d_eta), d_eta.dot(d_xsi), d_xsi.dot(d_xsi));
            let det = m11 * m22 - m12 * m12;
            if det.abs() <= f64::EPSILON * m11.max(m22).max(1.0) {
                break;
            }
            let (g1, g2) = (d_eta.dot(r), d_xsi.dot(r));
            let step_eta = -(m22 * g1 - m12 * g2) / det;
            let step_xsi = -(m11 * g2 - m12 * g1) / det;
            eta += step_eta;
            xsi += step_xsi;
            if !eta.is_finite() || !xsi.is_finite() {
                break;
            }
            if step_eta.abs().max(step_xsi.abs()) <= self.settings.inversion_tolerance {
                log::trace!("segment `{}`: inverted to eta={eta}, xsi={xsi}", self.uid);
                return Ok((eta, xsi));
            }
        }
        Err(EngineError::Inversion {
            uid: self.uid.clone(),
            iterations: max_iterations,
        })
    }

    /// Whether `point` lies inside the segment, between its chord surface and
    /// its skin.
    #[must_use]
    pub fn is_on(&self, point: Point3) -> bool {
        let Ok((eta, xsi)) = self.eta_xsi(point) else {
            return false;
        };
        let tol = self.settings.point_tolerance;
        let inside = |v: f64| v >= -tol && v <= 1.0 + tol;
        if !inside(eta) || !inside(xsi) {
            return false;
        }
        let (eta, xsi) = (eta.clamp(0.0, 1.0), xsi.clamp(0.0, 1.0));
        let chord = self.chord_point(eta, xsi);
        let thickness = chord
            .distance_to(self.upper_point(eta, xsi))
            .max(chord.distance_to(self.lower_point(eta, xsi)));
        chord.distance_to(point) <= thickness + tol
    }

    /// Whether `point` is nearer the upper than the lower skin.
    pub fn is_on_top(&self, point: Point3) -> EngineResult<bool> {
        let (eta, xsi) = self.eta_xsi(point)?;
        let (eta, xsi) = (eta.clamp(0.0, 1.0), xsi.clamp(0.0, 1.0));
        Ok(point.distance_to(self.upper_point(eta, xsi)) <= point.distance_to(self.lower_point(eta, xsi)))
    }

    /// Area of the chord quadrilateral projected onto `plane`.
    #[must_use]
    pub fn reference_area(&self, plane: SymmetryAxis) -> f64 {
        let a = self.chord_point(0.0, 0.0);
        let b = self.chord_point(0.0, 1.0);
        let c = self.chord_point(1.0, 0.0);
        let d = self.chord_point(1.0, 1.0);
        let diagonal_1 = plane.project(d - a);
        let diagonal_2 = plane.project(c - b);
        0.5 * diagonal_1.cross(diagonal_2).length()
    }

    pub fn volume(&self) -> EngineResult<f64> {
        Ok(self.kernel.volume(&*self.loft()?)?)
    }

    pub fn surface_area(&self) -> EngineResult<f64> {
        Ok(self.kernel.area(&*self.loft()?)?)
    }

    fn build_loft(&self) -> EngineResult<SharedShape> {
        log::debug!("segment `{}`: building loft", self.uid);
        let (inner, outer) = self.wing_frame_wires();
        let local = self.kernel.loft(&[inner, outer], &LoftOptions::ruled_solid())?;
        Ok(Arc::new(self.kernel.transform(&local, &self.wing_transform)?))
    }

    #[must_use]
    pub fn wing_uid(&self) -> &str {
        &self.wing_uid
    }
}

impl GeometricComponent for WingSegment {
    fn uid(&self) -> &str {
        &self.uid
    }

    fn kind(&self) -> ComponentKind {
        ComponentKind::WingSegment
    }

    fn parent_uid(&self) -> Option<&str> {
        Some(&self.wing_uid)
    }

    fn symmetry(&self) -> SymmetryAxis {
        self.symmetry
    }

    fn transform(&self) -> Transform {
        self.wing_transform
    }

    fn kernel(&self) -> &Arc<dyn GeometryKernel> {
        &self.kernel
    }

    fn is_invalidated(&self) -> bool {
        self.invalidated
    }

    fn invalidate(&mut self) {
        self.invalidated = true;
    }

    fn update(&mut self) -> EngineResult<()> {
        if self.invalidated {
            self.generation += 1;
            self.invalidated = false;
        }
        Ok(())
    }

    fn generation(&self) -> u64 {
        self.generation
    }

    fn loft(&self) -> EngineResult<SharedShape> {
        if self.invalidated {
            return Err(stale(ComponentKind::WingSegment, &self.uid));
        }
        self.loft.get_or_try_build(self.generation, || self.build_loft())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guide_curve_points_are_sorted_by_eta() {
        let curve = GuideCurve::new(
            "G1",
            vec![(0.7, Vec3::new(0.0, 0.0, 0.1)), (0.2, Vec3::ZERO)],
        )
        .unwrap();
        assert_eq!(curve.points()[0].0, 0.2);
        assert!(GuideCurve::new("G2", vec![(f64::NAN, Vec3::ZERO)]).is_err());
    }
}
