//! Sections and their elements.

use crate::config::{ComponentRef, Owner, ReadContext};
use crate::error::{EngineResult, check_index};
use crate::parse::DocumentBackend;

use super::transformation::Transformation;

/// One profile placement inside a section.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionElement {
    uid: String,
    name: String,
    profile_uid: String,
    transformation: Transformation,
}

impl SectionElement {
    #[must_use]
    pub fn uid(&self) -> &str {
        &self.uid
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn profile_uid(&self) -> &str {
        &self.profile_uid
    }

    #[must_use]
    pub fn transformation(&self) -> &Transformation {
        &self.transformation
    }

    pub fn transformation_mut(&mut self) -> &mut Transformation {
        &mut self.transformation
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    uid: String,
    name: String,
    transformation: Transformation,
    elements: Vec<SectionElement>,
}

impl Section {
    /// Reads `path` and its elements. `profile_tag` names the element child
    /// holding the profile uid (`airfoilUID` for wings, `profileUID` for
    /// fuselages).
    pub fn read(
        ctx: &mut ReadContext<'_>,
        doc: &dyn DocumentBackend,
        path: &str,
        owner: Owner,
        index: usize,
        profile_tag: &str,
    ) -> EngineResult<Self> {
        let uid = doc.attribute(path, "uID")?;
        ctx.registry.add_uid(&uid, ComponentRef::Section { owner, index })?;
        let name = doc.optional_text(&format!("{path}/name")).unwrap_or_default();
        let transformation = Transformation::read(doc, path)?;

        let elements_path = format!("{path}/elements");
        let count = doc.named_child_count(&elements_path, "element");
        let mut elements = Vec::with_capacity(count);
        for i in 1..=count {
            let element_path = format!("{elements_path}/element[{i}]");
            let element_uid = doc.attribute(&element_path, "uID")?;
            ctx.registry.add_uid(
                &element_uid,
                ComponentRef::SectionElement {
                    owner,
                    section: index,
                    index: i - 1,
                },
            )?;
            elements.push(SectionElement {
                uid: element_uid,
                name: doc.optional_text(&format!("{element_path}/name")).unwrap_or_default(),
                profile_uid: doc.text(&format!("{element_path}/{profile_tag}"))?,
                transformation: Transformation::read(doc, &element_path)?,
            });
        }

        Ok(Self {
            uid,
            name,
            transformation,
            elements,
        })
    }

    pub fn write(&self, doc: &mut dyn DocumentBackend, path: &str, profile_tag: &str) -> EngineResult<()> {
        doc.set_attribute(path, "uID", &self.uid)?;
        doc.set_text(&format!("{path}/name"), &self.name)?;
        self.transformation.write(doc, path)?;
        for (i, element) in self.elements.iter().enumerate() {
            let element_path = format!("{path}/elements/element[{}]", i + 1);
            doc.set_attribute(&element_path, "uID", &element.uid)?;
            doc.set_text(&format!("{element_path}/name"), &element.name)?;
            doc.set_text(&format!("{element_path}/{profile_tag}"), &element.profile_uid)?;
            element.transformation.write(doc, &element_path)?;
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
    pub fn transformation(&self) -> &Transformation {
        &self.transformation
    }

    pub fn transformation_mut(&mut self) -> &mut Transformation {
        &mut self.transformation
    }

    #[must_use]
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// 1-based element access.
    pub fn element(&self, index: usize) -> EngineResult<&SectionElement> {
        let i = check_index("section element", index, self.elements.len())?;
        Ok(&self.elements[i])
    }

    pub fn element_mut(&mut self, index: usize) -> EngineResult<&mut SectionElement> {
        let i = check_index("section element", index, self.elements.len())?;
        Ok(&mut self.elements[i])
    }

    #[must_use]
    pub fn elements(&self) -> &[SectionElement] {
        &self.elements
    }

    /// Rebuilds the matrices of the section and its elements.
    pub fn build_matrices(&mut self) {
        self.transformation.build_matrix();
        for element in &mut self.elements {
            element.transformation.build_matrix();
        }
    }
}

/// Finds the section and element holding `element_uid`, as 0-based indices.
#[must_use]
pub fn locate_element(sections: &[Section], element_uid: &str) -> Option<(usize, usize)> {
    sections.iter().enumerate().find_map(|(s, section)| {
        section
            .elements
            .iter()
            .position(|e| e.uid == element_uid)
            .map(|e| (s, e))
    })
}
