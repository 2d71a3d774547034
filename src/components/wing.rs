//! Wings: sections, positionings and segments plus every shape derived
//! from them.
//!
//! All derived shapes live in generation-stamped memos. Mutators only mark
//! the wing invalidated; [`Wing::update`] rebuilds transforms, pushes them
//! to the segments and advances the generation.

use std::sync::Arc;

use crate::config::{ComponentRef, EngineSettings, Owner, ReadContext};
use crate::error::{EngineError, EngineResult, check_index};
use crate::geom::{
    BBox, CacheStats, GeometryKernel, KeyedMemo, LoftOptions, Memo, Point3, Shape, SharedShape,
    Transform, Vec3, Wire, blend_wires,
};
use crate::parse::DocumentBackend;

use super::component_segment::ComponentSegment;
use super::control_surface::DeflectionStep;
use super::positioning::{Positioning, Positionings};
use super::section::Section;
use super::transformation::Transformation;
use super::wing_segment::{GuideCurve, WingSegment};
use super::{ComponentKind, DeflectionMap, GeometricComponent, SymmetryAxis, stale};

/// Result of [`Wing::segment_eta_xsi`].
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentEtaXsi {
    /// 1-based.
    pub segment_index: usize,
    pub segment_uid: String,
    pub eta: f64,
    pub xsi: f64,
    pub on_top: bool,
}

/// Mean aerodynamic chord and its leading-edge position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WingMac {
    pub chord: f64,
    pub position: Point3,
}

#[derive(Debug)]
struct ShellPair {
    upper: SharedShape,
    lower: SharedShape,
}

#[derive(Debug)]
pub struct Wing {
    uid: String,
    name: String,
    parent_uid: Option<String>,
    symmetry: SymmetryAxis,
    transformation: Transformation,
    sections: Vec<Section>,
    positionings: Positionings,
    segments: Vec<WingSegment>,
    component_segments: Vec<ComponentSegment>,
    kernel: Arc<dyn GeometryKernel>,
    settings: EngineSettings,

    generation: u64,
    invalidated: bool,
    fused_loft: Memo<Shape>,
    guide_loft: Memo<Shape>,
    shells: Memo<ShellPair>,
    wing_cut_out: Memo<Shape>,
    flap_assembly: KeyedMemo<DeflectionMap, Shape>,
    active_deflection: Option<DeflectionMap>,
}

impl Wing {
    pub fn read(ctx: &mut ReadContext<'_>, doc: &dyn DocumentBackend, path: &str, index: usize) -> EngineResult<Self> {
        let uid = doc.attribute(path, "uID")?;
        ctx.registry.add_uid(&uid, ComponentRef::Wing(index))?;
        let owner = Owner::Wing(index);
        let symmetry = match doc.attribute(path, "symmetry") {
            Ok(value) => value.parse()?,
            Err(_) => SymmetryAxis::None,
        };

        let sections_path = format!("{path}/sections");
        let sections = (1..=doc.named_child_count(&sections_path, "section"))
            .map(|j| {
                Section::read(
                    ctx,
                    doc,
                    &format!("{sections_path}/section[{j}]"),
                    owner,
                    j - 1,
                    "airfoilUID",
                )
            })
            .collect::<EngineResult<Vec<_>>>()?;
        let positionings = Positionings::read(ctx, doc, path, owner)?;

        let segments_path = format!("{path}/segments");
        let segments = (1..=doc.named_child_count(&segments_path, "segment"))
            .map(|j| {
                WingSegment::read(
                    ctx,
                    doc,
                    &format!("{segments_path}/segment[{j}]"),
                    index,
                    &uid,
                    j - 1,
                    &sections,
                    &positionings,
                )
            })
            .collect::<EngineResult<Vec<_>>>()?;

        let cs_path = format!("{path}/componentSegments");
        let component_segments = (1..=doc.named_child_count(&cs_path, "componentSegment"))
            .map(|j| {
                ComponentSegment::read(
                    ctx,
                    doc,
                    &format!("{cs_path}/componentSegment[{j}]"),
                    index,
                    j - 1,
                    &segments,
                )
            })
            .collect::<EngineResult<Vec<_>>>()?;

        log::debug!(
            "wing `{uid}`: {} sections, {} segments, {} component segments",
            sections.len(),
            segments.len(),
            component_segments.len()
        );

        let mut wing = Self {
            name: doc.optional_text(&format!("{path}/name")).unwrap_or_default(),
            parent_uid: doc.optional_text(&format!("{path}/parentUID")),
            symmetry,
            transformation: Transformation::read(doc, path)?,
            sections,
            positionings,
            segments,
            component_segments,
            kernel: Arc::clone(ctx.kernel),
            settings: *ctx.settings,
            generation: 0,
            invalidated: true,
            fused_loft: Memo::new(),
            guide_loft: Memo::new(),
            shells: Memo::new(),
            wing_cut_out: Memo::new(),
            flap_assembly: KeyedMemo::new(),
            active_deflection: None,
            uid,
        };
        wing.update()?;
        Ok(wing)
    }

    pub fn write(&self, doc: &mut dyn DocumentBackend, path: &str) -> EngineResult<()> {
        doc.set_attribute(path, "uID", &self.uid)?;
        if self.symmetry != SymmetryAxis::None {
            doc.set_attribute(path, "symmetry", self.symmetry.as_str())?;
        }
        doc.set_text(&format!("{path}/name"), &self.name)?;
        if let Some(parent) = &self.parent_uid {
            doc.set_text(&format!("{path}/parentUID"), parent)?;
        }
        self.transformation.write(doc, path)?;
        for (j, section) in self.sections.iter().enumerate() {
            section.write(doc, &format!("{path}/sections/section[{}]", j + 1), "airfoilUID")?;
        }
        self.positionings.write(doc, path)?;
        for (j, segment) in self.segments.iter().enumerate() {
            segment.write(doc, &format!("{path}/segments/segment[{}]", j + 1))?;
        }
        for (j, cs) in self.component_segments.iter().enumerate() {
            cs.write(doc, &format!("{path}/componentSegments/componentSegment[{}]", j + 1))?;
        }
        Ok(())
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn transformation(&self) -> &Transformation {
        &self.transformation
    }

    /// Transform setters rebuild the wing before returning.
    pub fn set_translation(&mut self, translation: Vec3) -> EngineResult<()> {
        self.transformation.set_translation(translation)?;
        self.invalidate();
        self.update()
    }

    /// Euler angles in degrees.
    pub fn set_rotation(&mut self, rotation: Vec3) -> EngineResult<()> {
        self.transformation.set_rotation(rotation)?;
        self.invalidate();
        self.update()
    }

    pub fn set_scaling(&mut self, scaling: Vec3) -> EngineResult<()> {
        self.transformation.set_scaling(scaling)?;
        self.invalidate();
        self.update()
    }

    pub fn set_symmetry(&mut self, symmetry: SymmetryAxis) -> EngineResult<()> {
        self.symmetry = symmetry;
        self.invalidate();
        self.update()
    }

    // --- children -----------------------------------------------------------

    #[must_use]
    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    pub fn section(&self, index: usize) -> EngineResult<&Section> {
        let i = check_index("section", index, self.sections.len())?;
        Ok(&self.sections[i])
    }

    /// Marks the wing invalidated.
    pub fn section_mut(&mut self, index: usize) -> EngineResult<&mut Section> {
        let i = check_index("section", index, self.sections.len())?;
        self.invalidate();
        Ok(&mut self.sections[i])
    }

    #[must_use]
    pub fn positionings(&self) -> &Positionings {
        &self.positionings
    }

    /// Marks the wing invalidated.
    pub fn positioning_mut(&mut self, index: usize) -> EngineResult<&mut Positioning> {
        self.positionings.get(index)?;
        self.invalidate();
        self.positionings.get_mut(index)
    }

    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// 1-based segment access.
    pub fn segment(&self, index: usize) -> EngineResult<&WingSegment> {
        let i = check_index("segment", index, self.segments.len())?;
        Ok(&self.segments[i])
    }

    pub fn segment_by_uid(&self, uid: &str) -> EngineResult<&WingSegment> {
        self.segments
            .iter()
            .find(|s| s.uid() == uid)
            .ok_or_else(|| EngineError::unresolved(uid))
    }

    #[must_use]
    pub fn segments(&self) -> &[WingSegment] {
        &self.segments
    }

    #[must_use]
    pub fn component_segment_count(&self) -> usize {
        self.component_segments.len()
    }

    pub fn component_segment(&self, index: usize) -> EngineResult<&ComponentSegment> {
        let i = check_index("component segment", index, self.component_segments.len())?;
        Ok(&self.component_segments[i])
    }

    pub fn component_segment_by_uid(&self, uid: &str) -> EngineResult<&ComponentSegment> {
        self.component_segments
            .iter()
            .find(|cs| cs.uid() == uid)
            .ok_or_else(|| EngineError::unresolved(uid))
    }

    pub fn guide_curve(&self, uid: &str) -> EngineResult<&GuideCurve> {
        self.segments
            .iter()
            .find_map(|s| s.guide_curve(uid))
            .ok_or_else(|| EngineError::unresolved(uid))
    }

    /// Replaces the deflection path of a device. Only the flap assembly is
    /// affected; cut-out caches stay valid.
    pub fn set_device_steps(&mut self, device_uid: &str, steps: Vec<DeflectionStep>) -> EngineResult<()> {
        let (cs, index) = self.locate_device(device_uid)?;
        self.component_segments[cs].device_mut(index + 1)?.set_steps(steps)?;
        self.flap_assembly.clear();
        Ok(())
    }

    fn locate_device(&self, uid: &str) -> EngineResult<(usize, usize)> {
        self.component_segments
            .iter()
            .enumerate()
            .find_map(|(c, cs)| cs.devices().iter().position(|d| d.uid() == uid).map(|d| (c, d)))
            .ok_or_else(|| EngineError::unresolved(uid))
    }

    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        let mut stats = self.fused_loft.stats();
        stats += self.guide_loft.stats();
        stats += self.shells.stats();
        stats += self.wing_cut_out.stats();
        stats += self.flap_assembly.stats();
        stats
    }

    fn check_fresh(&self) -> EngineResult<()> {
        if self.invalidated {
            Err(stale(ComponentKind::Wing, &self.uid))
        } else {
            Ok(())
        }
    }

    fn require_segments(&self) -> EngineResult<()> {
        if self.segments.is_empty() {
            Err(EngineError::configuration(format!("wing `{}` has no segments", self.uid)))
        } else {
            Ok(())
        }
    }

    fn to_world(&self, local: &Shape) -> EngineResult<SharedShape> {
        Ok(Arc::new(self.transformation.transform_shape(self.kernel.as_ref(), local)?))
    }

    // --- loft & shell builder ----------------------------------------------

    /// Lofts the inner wire of every segment plus the outer wire of the last
    /// one as a single ruled solid.
    fn build_fused_segments(&self) -> EngineResult<SharedShape> {
        self.require_segments()?;
        let mut wires: Vec<Wire> = self.segments.iter().map(|s| s.wing_frame_wires().0).collect();
        if let Some(last) = self.segments.last() {
            wires.push(last.wing_frame_wires().1);
        }
        log::debug!("wing `{}`: lofting {} sections", self.uid, wires.len());
        let local = self.kernel.loft(&wires, &LoftOptions::ruled_solid())?;
        self.to_world(&local)
    }

    /// Two open lofts through the upper and the lower wire halves.
    fn build_upper_lower_shells(&self) -> EngineResult<(SharedShape, SharedShape)> {
        self.require_segments()?;
        let half = |pick: fn(&WingSegment) -> (Wire, Wire)| -> EngineResult<SharedShape> {
            let mut wires: Vec<Wire> = self.segments.iter().map(|s| pick(s).0).collect();
            if let Some(last) = self.segments.last() {
                wires.push(pick(last).1);
            }
            let local = self.kernel.loft(&wires, &LoftOptions::ruled_shell())?;
            self.to_world(&local)
        };
        log::debug!("wing `{}`: building upper and lower shells", self.uid);
        Ok((
            half(WingSegment::wing_frame_upper_wires)?,
            half(WingSegment::wing_frame_lower_wires)?,
        ))
    }

    /// Smooth loft with one extra section per guide-curve point, blended
    /// between the segment's end wires and moved by the point's offset.
    fn build_fused_segments_with_guides(&self) -> EngineResult<SharedShape> {
        self.require_segments()?;
        let mut wires = Vec::new();
        for segment in &self.segments {
            let (inner, outer) = segment.wing_frame_wires();
            let mut stations: Vec<(f64, Vec3)> = segment
                .guide_curves()
                .iter()
                .flat_map(|c| c.points().iter().copied())
                .filter(|(eta, _)| *eta > 0.0 && *eta < 1.0)
                .collect();
            stations.sort_by(|a, b| a.0.total_cmp(&b.0));

            wires.push(inner.clone());
            for (eta, offset) in stations {
                let blended = blend_wires(&inner, &outer, eta).map_err(crate::geom::KernelError::from)?;
                wires.push(blended.transformed(&Transform::translate(offset)));
            }
        }
        if let Some(last) = self.segments.last() {
            wires.push(last.wing_frame_wires().1);
        }
        let options = LoftOptions {
            solid: true,
            ruled: false,
            span_subdivisions: 0,
        };
        log::debug!("wing `{}`: guided loft through {} sections", self.uid, wires.len());
        let local = self.kernel.loft(&wires, &options)?;
        self.to_world(&local)
    }

    /// Loft without control-surface deflection.
    pub fn fused_loft(&self) -> EngineResult<SharedShape> {
        self.check_fresh()?;
        self.fused_loft
            .get_or_try_build(self.generation, || self.build_fused_segments())
    }

    pub fn loft_with_leading_edge(&self) -> EngineResult<SharedShape> {
        self.check_fresh()?;
        self.guide_loft
            .get_or_try_build(self.generation, || self.build_fused_segments_with_guides())
    }

    fn shells(&self) -> EngineResult<Arc<ShellPair>> {
        self.check_fresh()?;
        self.shells.get_or_try_build(self.generation, || {
            let (upper, lower) = self.build_upper_lower_shells()?;
            Ok::<_, EngineError>(Arc::new(ShellPair { upper, lower }))
        })
    }

    pub fn upper_shape(&self) -> EngineResult<SharedShape> {
        Ok(Arc::clone(&self.shells()?.upper))
    }

    pub fn lower_shape(&self) -> EngineResult<SharedShape> {
        Ok(Arc::clone(&self.shells()?.lower))
    }

    // --- control-surface pipeline ------------------------------------------

    /// Clamps percentages and drops uids that name no device of this wing.
    fn normalize_deflections(&self, deflections: &DeflectionMap) -> DeflectionMap {
        deflections
            .iter()
            .filter_map(|(uid, percent)| {
                if self.locate_device(uid).is_err() {
                    log::warn!("wing `{}`: ignoring deflection for unknown device `{uid}`", self.uid);
                    return None;
                }
                if !(0.0..=100.0).contains(percent) {
                    log::warn!("wing `{}`: clamping deflection {percent} of `{uid}` to 0..100", self.uid);
                }
                let percent = if percent.is_nan() { 0.0 } else { percent.clamp(0.0, 100.0) };
                Some((uid.clone(), percent))
            })
            .collect()
    }

    /// Residual wing plus every deflected device, as one compound. Devices
    /// are processed per component segment in reverse definition order; a
    /// device's cut is made once per generation and reused for any map.
    pub fn flap_assembly(&self, deflections: &DeflectionMap) -> EngineResult<SharedShape> {
        self.check_fresh()?;
        let deflections = self.normalize_deflections(deflections);
        self.flap_assembly
            .get_or_try_build(self.generation, &deflections, || self.build_flap_assembly(&deflections))
    }

    fn build_flap_assembly(&self, deflections: &DeflectionMap) -> EngineResult<SharedShape> {
        let generation = self.generation;
        let mut parts = Vec::new();

        for cs in &self.component_segments {
            for device in cs.devices().iter().rev() {
                let device_loft = match device.cached_loft().peek(generation) {
                    Some(cached) => cached,
                    None => {
                        let wing_shape = match self.wing_cut_out.peek(generation) {
                            Some(residual) => residual,
                            None => self.fused_loft()?,
                        };
                        let tool = device.cut_out_shape(self.kernel.as_ref(), cs, &self.segments, &self.settings)?;
                        log::debug!("wing `{}`: cutting device `{}`", self.uid, device.uid());
                        let residual = self.kernel.cut(&wing_shape, &tool)?;
                        let common = Arc::new(self.kernel.common(&wing_shape, &tool)?);
                        self.wing_cut_out.store(generation, Arc::new(residual));
                        device.cached_loft().store(generation, Arc::clone(&common));
                        common
                    }
                };

                let percent = deflections.get(device.uid()).copied().unwrap_or(0.0);
                let motion = device.transformation(cs, &self.segments, percent)?;
                log::trace!("wing `{}`: device `{}` at {percent}%", self.uid, device.uid());
                parts.push(self.kernel.transform(&device_loft, &motion)?);
            }
        }

        let residual = match self.wing_cut_out.peek(generation) {
            Some(residual) => residual,
            None => self.fused_loft()?,
        };
        parts.push(residual.as_ref().clone());
        Ok(Arc::new(Shape::Compound(parts)))
    }

    /// Builds the flap assembly for `deflections` and makes it the wing's
    /// visible loft.
    pub fn build_fused_segments_with_flaps(&mut self, deflections: &DeflectionMap) -> EngineResult<SharedShape> {
        let shape = self.flap_assembly(deflections)?;
        self.active_deflection = Some(self.normalize_deflections(deflections));
        Ok(shape)
    }

    /// Deflects a single device; every other device is at 0 %.
    pub fn extend_flap(&mut self, device_uid: &str, percent: f64) -> EngineResult<SharedShape> {
        self.locate_device(device_uid)?;
        let mut map = DeflectionMap::new();
        map.insert(device_uid.to_owned(), percent);
        self.build_fused_segments_with_flaps(&map)
    }

    /// Returns the visible loft to the undeflected fused loft.
    pub fn clear_deflection(&mut self) {
        self.active_deflection = None;
    }

    #[must_use]
    pub fn active_deflection(&self) -> Option<&DeflectionMap> {
        self.active_deflection.as_ref()
    }

    /// Wing with every device region removed. Equals the fused loft when the
    /// wing has no devices.
    pub fn wing_without_flaps(&self) -> EngineResult<SharedShape> {
        self.check_fresh()?;
        if let Some(residual) = self.wing_cut_out.peek(self.generation) {
            return Ok(residual);
        }
        self.flap_assembly(&DeflectionMap::new())?;
        match self.wing_cut_out.peek(self.generation) {
            Some(residual) => Ok(residual),
            None => self.fused_loft(),
        }
    }

    // --- derived quantities ------------------------------------------------

    pub fn volume(&self) -> EngineResult<f64> {
        Ok(self.kernel.volume(&*self.loft()?)?)
    }

    pub fn surface_area(&self) -> EngineResult<f64> {
        Ok(self.kernel.area(&*self.loft()?)?)
    }

    /// Surface area after cutting away `excluded`, e.g. the fuselage.
    pub fn wetted_area(&self, excluded: Option<&Shape>) -> EngineResult<f64> {
        let loft = self.loft()?;
        match excluded {
            Some(parent) if !parent.is_empty() => {
                let wetted = self.kernel.cut(&loft, parent)?;
                Ok(self.kernel.area(&wetted)?)
            }
            _ => Ok(self.kernel.area(&loft)?),
        }
    }

    /// Sum of the projected chord areas of all segments.
    #[must_use]
    pub fn reference_area(&self, plane: SymmetryAxis) -> f64 {
        self.segments.iter().map(|s| s.reference_area(plane)).sum()
    }

    /// Extent of all segment lofts (and their mirror images) along the
    /// symmetry-plane normal, or the largest extent without symmetry.
    pub fn wingspan(&self) -> EngineResult<f64> {
        self.check_fresh()?;
        let mut bounds: Option<BBox> = None;
        let mut add = |b: BBox| bounds = Some(bounds.map_or(b, |acc| acc.union(b)));
        for segment in &self.segments {
            add(self.kernel.bounding_box(&*segment.loft()?)?);
            if let Some(mirrored) = segment.mirrored_loft()? {
                add(self.kernel.bounding_box(&mirrored)?);
            }
        }
        let size = bounds
            .ok_or_else(|| EngineError::configuration(format!("wing `{}` has no segments", self.uid)))?
            .size();
        Ok(match self.symmetry {
            SymmetryAxis::None => size.x.max(size.y).max(size.z),
            SymmetryAxis::XY => size.z,
            SymmetryAxis::XZ => size.y,
            SymmetryAxis::YZ => size.x,
        })
    }

    /// Mean aerodynamic chord by the trapezoidal method, applied per
    /// segment and weighted by segment area. Sweep and dihedral are taken
    /// into account; twist is not.
    pub fn mac(&self) -> EngineResult<WingMac> {
        self.check_fresh()?;
        self.require_segments()?;
        let mut area_sum = 0.0;
        let mut chord_sum = 0.0;
        let mut position_sum = Vec3::ZERO;

        for segment in &self.segments {
            let inner_le = segment.chord_point(0.0, 0.0);
            let inner_te = segment.chord_point(0.0, 1.0);
            let outer_le = segment.chord_point(1.0, 0.0);
            let outer_te = segment.chord_point(1.0, 1.0);

            let root_chord = inner_le.distance_to(inner_te);
            let tip_chord = outer_le.distance_to(outer_te);

            let yz = |p: Point3| Point3::new(0.0, p.y, p.z);
            let span = 0.5 * (yz(inner_le).distance_to(yz(outer_le)) + yz(inner_te).distance_to(yz(outer_te)));
            let span_y = 0.5 * ((outer_le.y - inner_le.y) + (outer_te.y - inner_te.y));
            if span <= 0.0 || root_chord <= 0.0 {
                log::warn!("segment `{}` has no span or chord; skipped in MAC", segment.uid());
                continue;
            }

            let taper = tip_chord / root_chord;
            let b_mac = span * (2.0 * tip_chord + root_chord) / (3.0 * (tip_chord + root_chord));
            let c_mac = root_chord - (root_chord - tip_chord) / span * b_mac;

            let quarter_inner = segment.chord_point(0.0, 0.25);
            let quarter_outer = segment.chord_point(1.0, 0.25);
            let sweep_tan = (quarter_outer.x - quarter_inner.x) / span;
            let dihedral_sin = (quarter_outer.z - quarter_inner.z) / span;
            let dihedral_cos = span_y / span;

            let position = inner_le.to_vec3()
                + Vec3::new(
                    0.25 * root_chord - 0.25 * c_mac + b_mac * sweep_tan,
                    dihedral_cos * b_mac,
                    dihedral_sin * b_mac,
                );
            let area = (1.0 + taper) * root_chord * span / 2.0;

            area_sum += area;
            position_sum = position_sum + position * area;
            chord_sum += c_mac * area;
        }

        if area_sum <= 0.0 {
            return Err(EngineError::configuration(format!("wing `{}` has no planform area", self.uid)));
        }
        Ok(WingMac {
            chord: chord_sum / area_sum,
            position: Point3::ORIGIN + position_sum / area_sum,
        })
    }

    /// Finds the first segment containing `point` and its eta/xsi there.
    /// `None` when no segment contains the point.
    pub fn segment_eta_xsi(&self, point: Point3) -> EngineResult<Option<SegmentEtaXsi>> {
        self.check_fresh()?;
        let Some((i, segment)) = self.segments.iter().enumerate().find(|(_, s)| s.is_on(point)) else {
            log::trace!("wing `{}`: no segment contains {point:?}", self.uid);
            return Ok(None);
        };
        let (eta, xsi) = segment.eta_xsi(point)?;
        Ok(Some(SegmentEtaXsi {
            segment_index: i + 1,
            segment_uid: segment.uid().to_owned(),
            eta: eta.clamp(0.0, 1.0),
            xsi: xsi.clamp(0.0, 1.0),
            on_top: segment.is_on_top(point)?,
        }))
    }
}

impl GeometricComponent for Wing {
    fn uid(&self) -> &str {
        &self.uid
    }

    fn kind(&self) -> ComponentKind {
        ComponentKind::Wing
    }

    fn parent_uid(&self) -> Option<&str> {
        self.parent_uid.as_deref()
    }

    fn symmetry(&self) -> SymmetryAxis {
        self.symmetry
    }

    fn transform(&self) -> Transform {
        self.transformation.matrix()
    }

    fn kernel(&self) -> &Arc<dyn GeometryKernel> {
        &self.kernel
    }

    fn is_invalidated(&self) -> bool {
        self.invalidated
    }

    /// Marks the wing and all segments stale.
    fn invalidate(&mut self) {
        self.invalidated = true;
        for segment in &mut self.segments {
            segment.invalidate();
        }
    }

    fn update(&mut self) -> EngineResult<()> {
        if !self.invalidated {
            return Ok(());
        }
        self.transformation.build_matrix();
        for section in &mut self.sections {
            section.build_matrices();
        }
        self.positionings.update()?;

        let matrix = self.transformation.matrix();
        for segment in &mut self.segments {
            segment.sync(&self.sections, &self.positionings, matrix, self.symmetry);
            segment.update()?;
        }
        self.generation += 1;
        self.invalidated = false;
        log::debug!("wing `{}`: updated to generation {}", self.uid, self.generation);
        Ok(())
    }

    fn generation(&self) -> u64 {
        self.generation
    }

    /// The flap assembly while a deflection is active, the fused loft
    /// otherwise.
    fn loft(&self) -> EngineResult<SharedShape> {
        match &self.active_deflection {
            Some(map) => self.flap_assembly(map),
            None => self.fused_loft(),
        }
    }
}
