use serde::Deserialize;

use crate::geom::KernelSettings;
use crate::parse::DocumentError;

/// Numeric knobs of the engine. Every field has a default so a settings
/// file only needs to name what it changes.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineSettings {
    pub kernel: KernelSettings,
    /// Distance within which a point counts as lying on a segment.
    pub point_tolerance: f64,
    pub inversion_max_iterations: usize,
    /// Parameter step below which eta/xsi inversion is converged.
    pub inversion_tolerance: f64,
    /// Half height of a control-surface cut-out, as a fraction of the local chord.
    pub cut_out_height_factor: f64,
    /// Extension of a cut-out past the trailing edge, as a fraction of the device chord.
    pub cut_out_trailing_edge_extension: f64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            kernel: KernelSettings::default(),
            point_tolerance: 1e-5,
            inversion_max_iterations: 50,
            inversion_tolerance: 1e-12,
            cut_out_height_factor: 0.5,
            cut_out_trailing_edge_extension: 0.1,
        }
    }
}

impl EngineSettings {
    /// Reads settings from an XML document such as
    /// `<settings><pointTolerance>1e-4</pointTolerance></settings>`.
    pub fn from_xml_str(input: &str) -> Result<Self, DocumentError> {
        let settings: Self = quick_xml::de::from_str(input)?;
        log::debug!("loaded engine settings: {settings:?}");
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_keep_defaults() {
        let settings = EngineSettings::from_xml_str(
            "<settings><pointTolerance>0.001</pointTolerance><kernel><smoothSpanSubdivisions>2</smoothSpanSubdivisions></kernel></settings>",
        )
        .unwrap();
        assert_eq!(settings.point_tolerance, 0.001);
        assert_eq!(settings.kernel.smooth_span_subdivisions, 2);
        assert_eq!(settings.kernel.tolerance, KernelSettings::default().tolerance);
        assert_eq!(settings.inversion_max_iterations, 50);
    }

    #[test]
    fn malformed_settings_are_rejected() {
        assert!(EngineSettings::from_xml_str("<settings><pointTolerance>abc</pointTolerance></settings>").is_err());
    }
}
