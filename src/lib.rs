//! bigben-bridge: Bigben USB controller to HID gamepad / keyboard+mouse bridge
//!
//! This library polls a Bigben wired controller over USB, decodes its
//! reports into one canonical state, and drives either a standard HID
//! gamepad report or synthetic keyboard and mouse input.

pub mod backend;
pub mod bigben;
pub mod manager;
pub mod mapping;

// Re-export commonly used items
pub use backend::{Key, KeyboardBackend, MouseBackend, ReportDelivery};
pub use bigben::{ConnectionState, ControllerState, Layout, ReportCodec, Transport};
pub use manager::{ConnectionSupervisor, PollStats, SupervisorEvent, SupervisorSettings};
pub use mapping::{Config, HidOutput, HidReportBuilder, KeyMouseEmulator, OutputSink};
