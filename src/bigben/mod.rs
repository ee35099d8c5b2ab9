//! Bigben controller support
//!
//! This module provides the device-facing half of the bridge:
//! - Protocol constants and canonical types
//! - Report decoding and output report encoding
//! - The USB transport and a scripted mock for tests

pub mod constants;
pub mod types;
pub mod codec;
pub mod transport;
pub mod mock_transport;

// Re-export commonly used items
pub use codec::{decode, encode_led, encode_rumble, DecodeError, Layout, ReportCodec};
pub use mock_transport::{MockTransport, ReadStep};
pub use transport::{Connection, Transport, TransportError};
pub use types::*;

#[cfg(feature = "usb")]
pub use transport::{UsbConnection, UsbTransport};
