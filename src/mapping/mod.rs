//! Mapping module - turns controller state into host-side output

pub mod accumulator;
pub mod config;
pub mod edge;
pub mod executor;
pub mod hid;
pub mod shaper;
pub mod sink;

pub use accumulator::{DeltaAccumulator, MouseFlusher};
pub use config::{Config, ConfigError, KeyMapping, OutputMode, Settings};
pub use edge::{Edge, EdgeTracker};
pub use executor::{Direction, KeyMouseEmulator, Output};
pub use hid::{HidOutput, HidReport, HidReportBuilder, HID_REPORT_DESCRIPTOR};
pub use shaper::ShapingSettings;
pub use sink::{Frame, OutputSink};
