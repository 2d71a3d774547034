#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod components;
pub mod config;
pub mod error;
pub mod geom;
pub mod parse;
pub mod report;

pub use components::{
    ComponentKind, ComponentSegment, DeflectionMap, DeflectionStep, Fuselage, FuselageSegment,
    GeometricComponent, SegmentEtaXsi, SymmetryAxis, TrailingEdgeDevice, Wing, WingMac,
    WingSegment,
};
pub use config::{Configuration, EngineSettings, UidRegistry};
pub use error::{EngineError, EngineResult};
pub use report::ConfigurationReport;

cfg_if::cfg_if! {
    if #[cfg(feature = "debug_logs")] {
        /// Installs the stderr logger at `Debug` level. Calling it twice is harmless.
        pub fn initialize() {
            init_logger();
        }
    } else {
        pub fn initialize() {
            // no-op fallback when debug logs are disabled
        }
    }
}

#[cfg(feature = "debug_logs")]
fn init_logger() {
    use log::LevelFilter;
    // a second call finds the logger already set
    let _ = env_logger::Builder::new()
        .filter_level(LevelFilter::Debug)
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .try_init();
}
