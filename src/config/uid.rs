//! Unique-identifier registry of one configuration.

use std::collections::BTreeMap;

use crate::components::ComponentKind;
use crate::error::{EngineError, EngineResult};

/// Which top-level component owns a section, positioning or segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Owner {
    Wing(usize),
    Fuselage(usize),
}

/// Location of a registered component inside the configuration. Indices
/// are 0-based positions in the owning lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentRef {
    Model,
    Wing(usize),
    Fuselage(usize),
    Section { owner: Owner, index: usize },
    SectionElement { owner: Owner, section: usize, index: usize },
    Positioning { owner: Owner, index: usize },
    Segment { owner: Owner, index: usize },
    GuideCurve { wing: usize, segment: usize, index: usize },
    ComponentSegment { wing: usize, index: usize },
    TrailingEdgeDevice { wing: usize, component_segment: usize, index: usize },
    WingProfile,
    FuselageProfile,
}

impl ComponentRef {
    #[must_use]
    pub const fn kind(self) -> ComponentKind {
        match self {
            Self::Model => ComponentKind::Model,
            Self::Wing(_) => ComponentKind::Wing,
            Self::Fuselage(_) => ComponentKind::Fuselage,
            Self::Section {
                owner: Owner::Wing(_),
                ..
            } => ComponentKind::WingSection,
            Self::Section {
                owner: Owner::Fuselage(_),
                ..
            } => ComponentKind::FuselageSection,
            Self::SectionElement { .. } => ComponentKind::SectionElement,
            Self::Positioning { .. } => ComponentKind::Positioning,
            Self::Segment {
                owner: Owner::Wing(_),
                ..
            } => ComponentKind::WingSegment,
            Self::Segment {
                owner: Owner::Fuselage(_),
                ..
            } => ComponentKind::FuselageSegment,
            Self::GuideCurve { .. } => ComponentKind::GuideCurve,
            Self::ComponentSegment { .. } => ComponentKind::ComponentSegment,
            Self::TrailingEdgeDevice { .. } => ComponentKind::TrailingEdgeDevice,
            Self::WingProfile => ComponentKind::WingProfile,
            Self::FuselageProfile => ComponentKind::FuselageProfile,
        }
    }
}

/// Maps uids to the components that own them. Entries are never removed.
#[derive(Debug, Clone, Default)]
pub struct UidRegistry {
    entries: BTreeMap<String, ComponentRef>,
}

impl UidRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_uid(&mut self, uid: &str, component: ComponentRef) -> EngineResult<()> {
        if uid.trim().is_empty() {
            return Err(EngineError::configuration(format!(
                "empty uid for a {:?}",
                component.kind()
            )));
        }
        if self.entries.contains_key(uid) {
            return Err(EngineError::DuplicateIdentifier {
                uid: uid.to_owned(),
            });
        }
        log::trace!("registering uid `{uid}` -> {component:?}");
        self.entries.insert(uid.to_owned(), component);
        Ok(())
    }

    pub fn resolve(&self, uid: &str) -> EngineResult<ComponentRef> {
        self.entries
            .get(uid)
            .copied()
            .ok_or_else(|| EngineError::unresolved(uid))
    }

    /// Resolves `uid` and checks that it names a component of `kind`.
    pub fn resolve_kind(&self, uid: &str, kind: ComponentKind) -> EngineResult<ComponentRef> {
        let found = self.resolve(uid)?;
        if found.kind() == kind {
            Ok(found)
        } else {
            Err(EngineError::configuration(format!(
                "uid `{uid}` names a {:?}, expected a {kind:?}",
                found.kind()
            )))
        }
    }

    #[must_use]
    pub fn contains(&self, uid: &str) -> bool {
        self.entries.contains_key(uid)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ComponentRef)> + '_ {
        self.entries.iter().map(|(uid, c)| (uid.as_str(), *c))
    }

    /// Uids of every component of `kind`, in lexical order.
    #[must_use]
    pub fn uids_of_kind(&self, kind: ComponentKind) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, c)| c.kind() == kind)
            .map(|(uid, _)| uid.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registering_twice_is_rejected() {
        let mut registry = UidRegistry::new();
        registry.add_uid("W1", ComponentRef::Wing(0)).unwrap();
        let err = registry.add_uid("W1", ComponentRef::Fuselage(0)).unwrap_err();
        assert!(matches!(err, EngineError::DuplicateIdentifier { uid } if uid == "W1"));
        assert_eq!(registry.resolve("W1").unwrap(), ComponentRef::Wing(0));
    }

    #[test]
    fn unknown_uid_is_unresolved() {
        let registry = UidRegistry::new();
        assert!(matches!(
            registry.resolve("nope"),
            Err(EngineError::UnresolvedReference { .. })
        ));
    }

    #[test]
    fn empty_uid_is_rejected() {
        let mut registry = UidRegistry::new();
        assert!(matches!(
            registry.add_uid("  ", ComponentRef::Model),
            Err(EngineError::Configuration(_))
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn lookup_by_kind() {
        let mut registry = UidRegistry::new();
        registry.add_uid("W1", ComponentRef::Wing(0)).unwrap();
        registry
            .add_uid(
                "W1_Seg1",
                ComponentRef::Segment {
                    owner: Owner::Wing(0),
                    index: 0,
                },
            )
            .unwrap();
        registry
            .add_uid(
                "F1_Seg1",
                ComponentRef::Segment {
                    owner: Owner::Fuselage(0),
                    index: 0,
                },
            )
            .unwrap();

        assert_eq!(registry.uids_of_kind(ComponentKind::WingSegment), vec!["W1_Seg1"]);
        assert_eq!(registry.len(), 3);
        assert!(registry.resolve_kind("W1", ComponentKind::Fuselage).is_err());
        assert!(registry.resolve_kind("F1_Seg1", ComponentKind::FuselageSegment).is_ok());
    }
}
