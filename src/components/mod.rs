//! Geometric components of an aircraft configuration.
//!
//! Every component that owns a shape implements [`GeometricComponent`]. The
//! set of kinds that can be registered under a uid is closed and listed in
//! [`ComponentKind`].

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{EngineError, EngineResult};
use crate::geom::{GeometryKernel, Shape, SharedShape, Transform, Vec3};

pub mod component_segment;
pub mod connection;
pub mod control_surface;
pub mod fuselage;
pub mod positioning;
pub mod profile;
pub mod section;
pub mod transformation;
pub mod wing;
pub mod wing_segment;

pub use component_segment::ComponentSegment;
pub use connection::Connection;
pub use control_surface::{
    CutOutProfile, DeflectionStep, DeviceBorder, HingePoint, TrailingEdgeDevice, WingCutOut,
};
pub use fuselage::{Fuselage, FuselageSegment};
pub use positioning::{Positioning, Positionings};
pub use profile::{FuselageProfile, WingProfile};
pub use section::{Section, SectionElement};
pub use transformation::Transformation;
pub use wing::{SegmentEtaXsi, Wing, WingMac};
pub use wing_segment::{GuideCurve, WingSegment};

/// Device uid → deflection in percent of the full path.
pub type DeflectionMap = BTreeMap<String, f64>;

/// Kinds of components that can be registered under a uid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ComponentKind {
    Model,
    Wing,
    Fuselage,
    WingSection,
    FuselageSection,
    SectionElement,
    Positioning,
    WingSegment,
    FuselageSegment,
    GuideCurve,
    ComponentSegment,
    TrailingEdgeDevice,
    WingProfile,
    FuselageProfile,
}

impl ComponentKind {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::Wing => "wing",
            Self::Fuselage => "fuselage",
            Self::WingSection => "wing section",
            Self::FuselageSection => "fuselage section",
            Self::SectionElement => "section element",
            Self::Positioning => "positioning",
            Self::WingSegment => "wing segment",
            Self::FuselageSegment => "fuselage segment",
            Self::GuideCurve => "guide curve",
            Self::ComponentSegment => "component segment",
            Self::TrailingEdgeDevice => "trailing edge device",
            Self::WingProfile => "wing profile",
            Self::FuselageProfile => "fuselage profile",
        }
    }

    /// Whether components of this kind produce a loft.
    #[must_use]
    pub const fn is_geometric(self) -> bool {
        matches!(
            self,
            Self::Wing | Self::Fuselage | Self::WingSegment | Self::FuselageSegment
        )
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Mirror plane of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SymmetryAxis {
    #[default]
    None,
    XY,
    XZ,
    YZ,
}

impl SymmetryAxis {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::XY => "x-y-plane",
            Self::XZ => "x-z-plane",
            Self::YZ => "y-z-plane",
        }
    }

    /// Normal of the mirror plane.
    #[must_use]
    pub const fn normal(self) -> Option<Vec3> {
        match self {
            Self::None => None,
            Self::XY => Some(Vec3::Z),
            Self::XZ => Some(Vec3::Y),
            Self::YZ => Some(Vec3::X),
        }
    }

    #[must_use]
    pub fn mirror(self) -> Option<Transform> {
        self.normal().and_then(Transform::mirror)
    }

    /// Drops the component along the plane normal. `None` keeps the vector.
    #[must_use]
    pub fn project(self, v: Vec3) -> Vec3 {
        match self {
            Self::None => v,
            Self::XY => Vec3::new(v.x, v.y, 0.0),
            Self::XZ => Vec3::new(v.x, 0.0, v.z),
            Self::YZ => Vec3::new(0.0, v.y, v.z),
        }
    }
}

impl FromStr for SymmetryAxis {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "none" => Ok(Self::None),
            "x-y-plane" => Ok(Self::XY),
            "x-z-plane" => Ok(Self::XZ),
            "y-z-plane" => Ok(Self::YZ),
            other => Err(EngineError::configuration(format!("unknown symmetry plane `{other}`"))),
        }
    }
}

impl fmt::Display for SymmetryAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared behaviour of every component that owns a lazily built shape.
///
/// Mutators mark a component invalidated; [`GeometricComponent::update`]
/// rebuilds its transforms and advances the generation, which makes all
/// cached shapes stale. Transform setters run `update` themselves. Edits made
/// through `section_mut`/`positioning_mut` leave the component invalidated,
/// and its shape accessors fail until `update` has run.
pub trait GeometricComponent {
    fn uid(&self) -> &str;

    fn kind(&self) -> ComponentKind;

    fn parent_uid(&self) -> Option<&str> {
        None
    }

    fn symmetry(&self) -> SymmetryAxis {
        SymmetryAxis::None
    }

    /// World transform as of the last `update`.
    fn transform(&self) -> Transform;

    fn kernel(&self) -> &Arc<dyn GeometryKernel>;

    fn is_invalidated(&self) -> bool;

    /// Marks this component and its children stale.
    fn invalidate(&mut self);

    /// No-op unless invalidated.
    fn update(&mut self) -> EngineResult<()>;

    fn generation(&self) -> u64;

    fn loft(&self) -> EngineResult<SharedShape>;

    /// Loft mirrored through the symmetry plane, if one is set.
    fn mirrored_loft(&self) -> EngineResult<Option<Shape>> {
        let Some(mirror) = self.symmetry().mirror() else {
            return Ok(None);
        };
        let loft = self.loft()?;
        Ok(Some(self.kernel().transform(&loft, &mirror)?))
    }
}

/// Error returned by shape accessors of a component awaiting `update`.
pub(crate) fn stale(kind: ComponentKind, uid: &str) -> EngineError {
    EngineError::configuration(format!("{kind} `{uid}` was modified; call update() before querying geometry"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symmetry_axis_parses_document_names() {
        assert_eq!("x-z-plane".parse::<SymmetryAxis>().unwrap(), SymmetryAxis::XZ);
        assert_eq!("".parse::<SymmetryAxis>().unwrap(), SymmetryAxis::None);
        assert!("diagonal".parse::<SymmetryAxis>().is_err());
        assert_eq!(SymmetryAxis::YZ.normal(), Some(Vec3::X));
        assert_eq!(SymmetryAxis::XY.to_string(), "x-y-plane");
    }

    #[test]
    fn projection_drops_the_normal_component() {
        let v = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(SymmetryAxis::XZ.project(v), Vec3::new(1.0, 0.0, 3.0));
        assert_eq!(SymmetryAxis::None.project(v), v);
    }
}
