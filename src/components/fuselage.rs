//! Fuselages and their segments.

use std::sync::Arc;

use crate::config::{ComponentRef, Owner, ReadContext};
use crate::error::{EngineError, EngineResult, check_index};
use crate::geom::{
    GeometryKernel, LoftOptions, Memo, Point3, Shape, SharedShape, Transform, Vec3, Wire, blend_wires,
};
use crate::parse::DocumentBackend;

use super::connection::Connection;
use super::positioning::{Positioning, Positionings};
use super::profile::FuselageProfile;
use super::section::Section;
use super::transformation::Transformation;
use super::{ComponentKind, GeometricComponent, SymmetryAxis, stale};

#[derive(Debug)]
pub struct FuselageSegment {
    uid: String,
    name: String,
    fuselage_uid: String,
    inner: Connection<FuselageProfile>,
    outer: Connection<FuselageProfile>,
    fuselage_transform: Transform,
    symmetry: SymmetryAxis,
    generation: u64,
    invalidated: bool,
    loft: Memo<Shape>,
    kernel: Arc<dyn GeometryKernel>,
}

impl FuselageSegment {
    #[allow(clippy::too_many_arguments)]
    fn read(
        ctx: &mut ReadContext<'_>,
        doc: &dyn DocumentBackend,
        path: &str,
        fuselage: usize,
        fuselage_uid: &str,
        index: usize,
        sections: &[Section],
        positionings: &Positionings,
    ) -> EngineResult<Self> {
        let uid = doc.attribute(path, "uID")?;
        ctx.registry.add_uid(
            &uid,
            ComponentRef::Segment {
                owner: Owner::Fuselage(fuselage),
                index,
            },
        )?;
        let profiles = ctx.profiles;
        let inner = Connection::resolve(
            sections,
            positionings,
            &doc.text(&format!("{path}/fromElementUID"))?,
            |p| profiles.fuselage_profile(p),
        )?;
        let outer = Connection::resolve(
            sections,
            positionings,
            &doc.text(&format!("{path}/toElementUID"))?,
            |p| profiles.fuselage_profile(p),
        )?;
        Ok(Self {
            uid,
            name: doc.optional_text(&format!("{path}/name")).unwrap_or_default(),
            fuselage_uid: fuselage_uid.to_owned(),
            inner,
            outer,
            fuselage_transform: Transform::identity(),
            symmetry: SymmetryAxis::None,
            generation: 0,
            invalidated: true,
            loft: Memo::new(),
            kernel: Arc::clone(ctx.kernel),
        })
    }

    fn write(&self, doc: &mut dyn DocumentBackend, path: &str) -> EngineResult<()> {
        doc.set_attribute(path, "uID", &self.uid)?;
        doc.set_text(&format!("{path}/name"), &self.name)?;
        doc.set_text(&format!("{path}/fromElementUID"), self.inner.element_uid())?;
        doc.set_text(&format!("{path}/toElementUID"), self.outer.element_uid())?;
        Ok(())
    }

    fn sync(&mut self, sections: &[Section], positionings: &Positionings, transform: Transform, symmetry: SymmetryAxis) {
        self.inner.refresh(sections, positionings);
        self.outer.refresh(sections, positionings);
        self.fuselage_transform = transform;
        self.symmetry = symmetry;
        self.invalidated = true;
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn inner_connection(&self) -> &Connection<FuselageProfile> {
        &self.inner
    }

    #[must_use]
    pub fn outer_connection(&self) -> &Connection<FuselageProfile> {
        &self.outer
    }

    /// Inner and outer wire in the fuselage frame.
    #[must_use]
    pub fn fuselage_frame_wires(&self) -> (Wire, Wire) {
        (
            self.inner.place_wire(&self.inner.profile().wire()),
            self.outer.place_wire(&self.outer.profile().wire()),
        )
    }

    fn world_wires(&self) -> (Wire, Wire) {
        let (inner, outer) = self.fuselage_frame_wires();
        (
            inner.transformed(&self.fuselage_transform),
            outer.transformed(&self.fuselage_transform),
        )
    }

    /// Surface point at `eta` along the segment and normalized arc length
    /// `zeta` around the profile.
    #[must_use]
    pub fn point(&self, eta: f64, zeta: f64) -> Point3 {
        let world = |c: &Connection<FuselageProfile>| {
            self.fuselage_transform
                .apply_point(c.place_point(c.profile().point_at(zeta)))
        };
        world(&self.inner).lerp(world(&self.outer), eta)
    }

    /// Perimeter of the cross section at `eta`.
    pub fn circumference(&self, eta: f64) -> EngineResult<f64> {
        let (inner, outer) = self.world_wires();
        let section = blend_wires(&inner, &outer, eta.clamp(0.0, 1.0)).map_err(crate::geom::KernelError::from)?;
        Ok(section.length())
    }

    pub fn volume(&self) -> EngineResult<f64> {
        Ok(self.kernel.volume(&*self.loft()?)?)
    }

    pub fn surface_area(&self) -> EngineResult<f64> {
        Ok(self.kernel.area(&*self.loft()?)?)
    }

    fn build_loft(&self) -> EngineResult<SharedShape> {
        log::debug!("fuselage segment `{}`: building loft", self.uid);
        let (inner, outer) = self.fuselage_frame_wires();
        let local = self.kernel.loft(&[inner, outer], &LoftOptions::ruled_solid())?;
        Ok(Arc::new(self.kernel.transform(&local, &self.fuselage_transform)?))
    }
}

impl GeometricComponent for FuselageSegment {
    fn uid(&self) -> &str {
        &self.uid
    }

    fn kind(&self) -> ComponentKind {
        ComponentKind::FuselageSegment
    }

    fn parent_uid(&self) -> Option<&str> {
        Some(&self.fuselage_uid)
    }

    fn symmetry(&self) -> SymmetryAxis {
        self.symmetry
    }

    fn transform(&self) -> Transform {
        self.fuselage_transform
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
            return Err(stale(ComponentKind::FuselageSegment, &self.uid));
        }
        self.loft.get_or_try_build(self.generation, || self.build_loft())
    }
}

#[derive(Debug)]
pub struct Fuselage {
    uid: String,
    name: String,
    parent_uid: Option<String>,
    symmetry: SymmetryAxis,
    transformation: Transformation,
    sections: Vec<Section>,
    positionings: Positionings,
    segments: Vec<FuselageSegment>,
    kernel: Arc<dyn GeometryKernel>,
    generation: u64,
    invalidated: bool,
    fused_loft: Memo<Shape>,
}

impl Fuselage {
    pub fn read(ctx: &mut ReadContext<'_>, doc: &dyn DocumentBackend, path: &str, index: usize) -> EngineResult<Self> {
        let uid = doc.attribute(path, "uID")?;
        ctx.registry.add_uid(&uid, ComponentRef::Fuselage(index))?;
        let owner = Owner::Fuselage(index);
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
                    "profileUID",
                )
            })
            .collect::<EngineResult<Vec<_>>>()?;
        let positionings = Positionings::read(ctx, doc, path, owner)?;
        let segments_path = format!("{path}/segments");
        let segments = (1..=doc.named_child_count(&segments_path, "segment"))
            .map(|j| {
                FuselageSegment::read(
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
        log::debug!("fuselage `{uid}`: {} sections, {} segments", sections.len(), segments.len());

        let mut fuselage = Self {
            name: doc.optional_text(&format!("{path}/name")).unwrap_or_default(),
            parent_uid: doc.optional_text(&format!("{path}/parentUID")),
            symmetry,
            transformation: Transformation::read(doc, path)?,
            sections,
            positionings,
            segments,
            kernel: Arc::clone(ctx.kernel),
            generation: 0,
            invalidated: true,
            fused_loft: Memo::new(),
            uid,
        };
        fuselage.update()?;
        Ok(fuselage)
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
            section.write(doc, &format!("{path}/sections/section[{}]", j + 1), "profileUID")?;
        }
        self.positionings.write(doc, path)?;
        for (j, segment) in self.segments.iter().enumerate() {
            segment.write(doc, &format!("{path}/segments/segment[{}]", j + 1))?;
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

    pub fn set_translation(&mut self, translation: Vec3) -> EngineResult<()> {
        self.transformation.set_translation(translation)?;
        self.invalidate();
        self.update()
    }

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

    pub fn section(&self, index: usize) -> EngineResult<&Section> {
        let i = check_index("section", index, self.sections.len())?;
        Ok(&self.sections[i])
    }

    /// Marks the fuselage invalidated.
    pub fn section_mut(&mut self, index: usize) -> EngineResult<&mut Section> {
        let i = check_index("section", index, self.sections.len())?;
        self.invalidate();
        Ok(&mut self.sections[i])
    }

    /// Marks the fuselage invalidated.
    pub fn positioning_mut(&mut self, index: usize) -> EngineResult<&mut Positioning> {
        self.positionings.get(index)?;
        self.invalidate();
        self.positionings.get_mut(index)
    }

    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn segment(&self, index: usize) -> EngineResult<&FuselageSegment> {
        let i = check_index("segment", index, self.segments.len())?;
        Ok(&self.segments[i])
    }

    pub fn segment_by_uid(&self, uid: &str) -> EngineResult<&FuselageSegment> {
        self.segments
            .iter()
            .find(|s| s.uid() == uid)
            .ok_or_else(|| EngineError::unresolved(uid))
    }

    fn build_fused_segments(&self) -> EngineResult<SharedShape> {
        if self.segments.is_empty() {
            return Err(EngineError::configuration(format!("fuselage `{}` has no segments", self.uid)));
        }
        let mut wires: Vec<Wire> = self.segments.iter().map(|s| s.fuselage_frame_wires().0).collect();
        if let Some(last) = self.segments.last() {
            wires.push(last.fuselage_frame_wires().1);
        }
        log::debug!("fuselage `{}`: lofting {} sections", self.uid, wires.len());
        let local = self.kernel.loft(&wires, &LoftOptions::ruled_solid())?;
        Ok(Arc::new(self.transformation.transform_shape(self.kernel.as_ref(), &local)?))
    }

    pub fn volume(&self) -> EngineResult<f64> {
        Ok(self.kernel.volume(&*self.loft()?)?)
    }

    pub fn surface_area(&self) -> EngineResult<f64> {
        Ok(self.kernel.area(&*self.loft()?)?)
    }

    pub fn wetted_area(&self, excluded: Option<&Shape>) -> EngineResult<f64> {
        let loft = self.loft()?;
        match excluded {
            Some(other) if !other.is_empty() => Ok(self.kernel.area(&self.kernel.cut(&loft, other)?)?),
            _ => Ok(self.kernel.area(&loft)?),
        }
    }

    /// Distance between the centroids of the first and the last cross section.
    pub fn length(&self) -> EngineResult<f64> {
        let (Some(first), Some(last)) = (self.segments.first(), self.segments.last()) else {
            return Err(EngineError::configuration(format!("fuselage `{}` has no segments", self.uid)));
        };
        let nose = first.world_wires().0.centroid();
        let tail = last.world_wires().1.centroid();
        match (nose, tail) {
            (Some(a), Some(b)) => Ok(a.distance_to(b)),
            _ => Err(EngineError::configuration(format!("fuselage `{}` has empty profiles", self.uid))),
        }
    }

    /// Perimeter at `eta` of the 1-based `segment`.
    pub fn circumference(&self, segment: usize, eta: f64) -> EngineResult<f64> {
        self.segment(segment)?.circumference(eta)
    }
}

impl GeometricComponent for Fuselage {
    fn uid(&self) -> &str {
        &self.uid
    }

    fn kind(&self) -> ComponentKind {
        ComponentKind::Fuselage
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
        log::debug!("fuselage `{}`: updated to generation {}", self.uid, self.generation);
        Ok(())
    }

    fn generation(&self) -> u64 {
        self.generation
    }

    fn loft(&self) -> EngineResult<SharedShape> {
        if self.invalidated {
            return Err(stale(ComponentKind::Fuselage, &self.uid));
        }
        self.fused_loft
            .get_or_try_build(self.generation, || self.build_fused_segments())
    }
}
