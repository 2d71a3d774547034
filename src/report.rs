//! Serializable summaries of a configuration's derived quantities.

use serde::Serialize;

use crate::components::{Fuselage, GeometricComponent, SymmetryAxis, Wing};
use crate::config::Configuration;
use crate::error::EngineResult;
use crate::parse::DocumentError;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename = "report")]
pub struct ConfigurationReport {
    #[serde(rename = "@uid")]
    pub uid: String,
    #[serde(rename = "@name", skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(rename = "wing")]
    pub wings: Vec<WingReport>,
    #[serde(rename = "fuselage")]
    pub fuselages: Vec<FuselageReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WingReport {
    #[serde(rename = "@uid")]
    pub uid: String,
    #[serde(rename = "@segments")]
    pub segments: usize,
    pub volume: f64,
    pub surface_area: f64,
    /// Projected onto the x-y plane.
    pub reference_area: f64,
    pub wingspan: f64,
    pub mac: MacReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MacReport {
    #[serde(rename = "@chord")]
    pub chord: f64,
    #[serde(rename = "@x")]
    pub x: f64,
    #[serde(rename = "@y")]
    pub y: f64,
    #[serde(rename = "@z")]
    pub z: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FuselageReport {
    #[serde(rename = "@uid")]
    pub uid: String,
    #[serde(rename = "@segments")]
    pub segments: usize,
    pub volume: f64,
    pub surface_area: f64,
    pub length: f64,
}

impl ConfigurationReport {
    pub fn collect(configuration: &Configuration) -> EngineResult<Self> {
        Ok(Self {
            uid: configuration.uid().to_owned(),
            name: configuration.name().to_owned(),
            wings: configuration
                .wings()
                .map(WingReport::collect)
                .collect::<EngineResult<_>>()?,
            fuselages: configuration
                .fuselages()
                .map(FuselageReport::collect)
                .collect::<EngineResult<_>>()?,
        })
    }

    pub fn to_xml_string(&self) -> Result<String, DocumentError> {
        Ok(quick_xml::se::to_string(self)?)
    }
}

impl WingReport {
    pub fn collect(wing: &Wing) -> EngineResult<Self> {
        log::debug!("collecting report for wing `{}`", wing.uid());
        let mac = wing.mac()?;
        Ok(Self {
            uid: wing.uid().to_owned(),
            segments: wing.segment_count(),
            volume: wing.volume()?,
            surface_area: wing.surface_area()?,
            reference_area: wing.reference_area(SymmetryAxis::XY),
            wingspan: wing.wingspan()?,
            mac: MacReport {
                chord: mac.chord,
                x: mac.position.x,
                y: mac.position.y,
                z: mac.position.z,
            },
        })
    }
}

impl FuselageReport {
    pub fn collect(fuselage: &Fuselage) -> EngineResult<Self> {
        log::debug!("collecting report for fuselage `{}`", fuselage.uid());
        Ok(Self {
            uid: fuselage.uid().to_owned(),
            segments: fuselage.segment_count(),
            volume: fuselage.volume()?,
            surface_area: fuselage.surface_area()?,
            length: fuselage.length()?,
        })
    }
}
