//! A segment end: a profile placed by its element, section and positioning.

use std::sync::Arc;

use crate::error::{EngineError, EngineResult};
use crate::geom::{Point3, Transform, Wire};

use super::positioning::Positionings;
use super::section::{Section, locate_element};

#[derive(Debug, Clone)]
pub struct Connection<P> {
    element_uid: String,
    section_uid: String,
    section_index: usize,
    element_index: usize,
    profile: Arc<P>,
    positioning: Transform,
    section: Transform,
    element: Transform,
}

impl<P> Connection<P> {
    /// Binds `element_uid` to its section. `profile_of` maps the element's
    /// profile uid to the shared profile.
    pub fn resolve(
        sections: &[Section],
        positionings: &Positionings,
        element_uid: &str,
        profile_of: impl FnOnce(&str) -> EngineResult<Arc<P>>,
    ) -> EngineResult<Self> {
        let (section_index, element_index) =
            locate_element(sections, element_uid).ok_or_else(|| EngineError::unresolved(element_uid))?;
        let section = &sections[section_index];
        let element = &section.elements()[element_index];
        let profile = profile_of(element.profile_uid())?;
        let mut connection = Self {
            element_uid: element_uid.to_owned(),
            section_uid: section.uid().to_owned(),
            section_index,
            element_index,
            profile,
            positioning: Transform::identity(),
            section: Transform::identity(),
            element: Transform::identity(),
        };
        connection.refresh(sections, positionings);
        Ok(connection)
    }

    /// Copies the current section, element and positioning matrices.
    pub fn refresh(&mut self, sections: &[Section], positionings: &Positionings) {
        let section = &sections[self.section_index];
        self.section = section.transformation().matrix();
        self.element = section.elements()[self.element_index].transformation().matrix();
        self.positioning = positionings.transform(&self.section_uid);
    }

    #[must_use]
    pub fn element_uid(&self) -> &str {
        &self.element_uid
    }

    #[must_use]
    pub fn section_uid(&self) -> &str {
        &self.section_uid
    }

    /// 0-based section position in the owner.
    #[must_use]
    pub fn section_index(&self) -> usize {
        self.section_index
    }

    #[must_use]
    pub fn profile(&self) -> &Arc<P> {
        &self.profile
    }

    /// `positioning * section * element`; the element is applied first.
    #[must_use]
    pub fn transform(&self) -> Transform {
        self.positioning * self.section * self.element
    }

    #[must_use]
    pub fn place_point(&self, point: Point3) -> Point3 {
        self.transform().apply_point(point)
    }

    #[must_use]
    pub fn place_wire(&self, wire: &Wire) -> Wire {
        wire.transformed(&self.transform())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::positioning::Positioning;
    use crate::components::profile::WingProfile;
    use crate::config::{Owner, ReadContext, UidRegistry};
    use crate::config::{EngineSettings, ProfileLibrary};
    use crate::geom::{GeometryKernel, MeshKernel, Vec3};
    use crate::parse::XmlDocument;

    #[test]
    fn transform_is_positioning_section_element() {
        let doc = XmlDocument::parse_str(
            r"<wing><sections><section uID='S1'><transformation><scaling><x>2</x><y>2</y><z>2</z></scaling></transformation>
              <elements><element uID='E1'><airfoilUID>P</airfoilUID>
              <transformation><translation><x>0.5</x><y>0</y><z>0</z></translation></transformation></element></elements>
              </section></sections></wing>",
        )
        .unwrap();
        let mut registry = UidRegistry::new();
        let profiles = ProfileLibrary::default();
        let kernel: Arc<dyn GeometryKernel> = Arc::new(MeshKernel::default());
        let settings = EngineSettings::default();
        let mut ctx = ReadContext {
            registry: &mut registry,
            profiles: &profiles,
            kernel: &kernel,
            settings: &settings,
        };
        let section = Section::read(&mut ctx, &doc, "/wing/sections/section[1]", Owner::Wing(0), 0, "airfoilUID").unwrap();
        let sections = vec![section];
        let mut positionings = Positionings::default();
        positionings.push(Positioning::new("P1", 3.0, 0.0, 0.0, None, "S1").unwrap());
        positionings.update().unwrap();

        let profile = Arc::new(
            WingProfile::new(
                "P",
                "",
                vec![Point3::new(1.0, 0.0, 0.0), Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, -0.1)],
            )
            .unwrap(),
        );
        let connection = Connection::resolve(&sections, &positionings, "E1", |uid| {
            assert_eq!(uid, "P");
            Ok(Arc::clone(&profile))
        })
        .unwrap();

        assert_eq!(connection.section_uid(), "S1");
        // element shift 0.5, section scale 2, positioning 3 along y
        let p = connection.place_point(Point3::ORIGIN);
        assert_eq!(p, Point3::ORIGIN + Vec3::new(1.0, 3.0, 0.0));

        let missing = Connection::<WingProfile>::resolve(&sections, &positionings, "nope", |_| unreachable!());
        assert!(matches!(missing, Err(EngineError::UnresolvedReference { .. })));
    }
}
