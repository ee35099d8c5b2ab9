//! Bigben controller protocol constants
//!
//! This module contains the constants needed to talk to Bigben Interactive
//! controllers:
//! - USB identifiers and endpoints
//! - Report IDs and sizes for both wire layouts
//! - Button bit assignments
//! - Output report templates

// ============================================================================
// USB Discovery Constants
// ============================================================================

/// Bigben Interactive vendor ID
pub const BIGBEN_VENDOR_ID: u16 = 0x146b;

/// PC Compact Controller (XInput mode)
pub const BIGBEN_PRODUCT_PC_COMPACT: u16 = 0x0603;

/// PS4 Compact Controller
pub const BIGBEN_PRODUCT_PS4_COMPACT: u16 = 0x0d05;

/// PS3 kid-friendly mini pad
pub const BIGBEN_PRODUCT_PS3_MINIPAD: u16 = 0x0902;

/// Product IDs the transport will open
pub const SUPPORTED_PRODUCT_IDS: [u16; 3] = [
    BIGBEN_PRODUCT_PC_COMPACT,
    BIGBEN_PRODUCT_PS4_COMPACT,
    BIGBEN_PRODUCT_PS3_MINIPAD,
];

/// Interface claimed on the device
pub const USB_INTERFACE: u8 = 0;

/// Interrupt IN endpoint (controller -> host)
pub const ENDPOINT_IN: u8 = 0x81;

/// Interrupt OUT endpoint (host -> controller)
pub const ENDPOINT_OUT: u8 = 0x02;

// ============================================================================
// Report IDs and Sizes
// ============================================================================

/// First byte of every 20-byte legacy input report
pub const LEGACY_REPORT_ID: u8 = 0x00;

/// Nominal size of the legacy input report
pub const LEGACY_REPORT_SIZE: usize = 20;

/// Bytes that must be present for the legacy report to be decoded
/// (header, buttons, triggers and all four stick words)
pub const LEGACY_MIN_SIZE: usize = 14;

/// First byte of every 64-byte canonical input report
pub const CANONICAL_REPORT_ID: u8 = 0x01;

/// Nominal size of the canonical input report
pub const CANONICAL_REPORT_SIZE: usize = 64;

/// Bytes that must be present for the canonical report to be decoded
/// (report id through right trigger)
pub const CANONICAL_MIN_SIZE: usize = 10;

/// Largest input report any layout produces; used to size read buffers
pub const MAX_INPUT_REPORT_SIZE: usize = 64;

/// Size of every output report (rumble and LED)
pub const OUTPUT_REPORT_SIZE: usize = 8;

/// Constant size marker carried in byte 1 of every output report
pub const OUTPUT_SIZE_MARKER: u8 = 0x08;

/// Legacy rumble report type
pub const LEGACY_RUMBLE_REPORT_ID: u8 = 0x00;

/// Canonical rumble report type
pub const CANONICAL_RUMBLE_REPORT_ID: u8 = 0x02;

/// LED report type (shared by both layouts)
pub const LED_REPORT_ID: u8 = 0x01;

/// Canonical rumble duration byte meaning "until told otherwise"
pub const RUMBLE_CONTINUOUS: u8 = 0xFF;

/// Only the low nibble of the LED byte drives LEDs 1-4
pub const LED_MASK: u8 = 0x0F;

// ============================================================================
// Canonical (64-byte) Button Bits
// ============================================================================
//
// These positions are shared with the HID button field: bit n is HID button n+1.

pub const BTN_A: u16 = 1 << 0;
pub const BTN_B: u16 = 1 << 1;
pub const BTN_X: u16 = 1 << 2;
pub const BTN_Y: u16 = 1 << 3;
pub const BTN_LB: u16 = 1 << 4;
pub const BTN_RB: u16 = 1 << 5;
pub const BTN_LT: u16 = 1 << 6;
pub const BTN_RT: u16 = 1 << 7;
pub const BTN_BACK: u16 = 1 << 8;
pub const BTN_START: u16 = 1 << 9;
pub const BTN_L3: u16 = 1 << 10;
pub const BTN_R3: u16 = 1 << 11;
pub const BTN_HOME: u16 = 1 << 12;

/// The 13 active button bits; bits 13-15 are reserved and always zero
pub const BUTTON_MASK: u16 = 0x1FFF;

// ============================================================================
// Legacy (20-byte) Button Bits
// ============================================================================
//
// XInput order with the face and D-pad nibbles exchanged: A/B/X/Y in the
// low nibble, then Start, Back, L3, R3, LB, RB, Home, and the four D-pad
// directions in the high nibble. The legacy report has no digital
// trigger bits, so LT/RT are derived from the analog trigger bytes.

pub const LEGACY_BTN_A: u16 = 0x0001;
pub const LEGACY_BTN_B: u16 = 0x0002;
pub const LEGACY_BTN_X: u16 = 0x0004;
pub const LEGACY_BTN_Y: u16 = 0x0008;
pub const LEGACY_BTN_START: u16 = 0x0010;
pub const LEGACY_BTN_BACK: u16 = 0x0020;
pub const LEGACY_BTN_L3: u16 = 0x0040;
pub const LEGACY_BTN_R3: u16 = 0x0080;
pub const LEGACY_BTN_LB: u16 = 0x0100;
pub const LEGACY_BTN_RB: u16 = 0x0200;
pub const LEGACY_BTN_HOME: u16 = 0x0400;
pub const LEGACY_DPAD_UP: u16 = 0x1000;
pub const LEGACY_DPAD_DOWN: u16 = 0x2000;
pub const LEGACY_DPAD_LEFT: u16 = 0x4000;
pub const LEGACY_DPAD_RIGHT: u16 = 0x8000;

/// Analog trigger value at which the legacy decoder reports LT/RT as pressed
pub const LEGACY_TRIGGER_THRESHOLD: u8 = 30;

// ============================================================================
// Axis and Hat Constants
// ============================================================================

/// Center value for 8-bit analog axes
pub const AXIS_CENTER: u8 = 128;

/// Hat switch value for a released D-pad
pub const HAT_NEUTRAL: u8 = 8;

// ============================================================================
// Timing Constants
// ============================================================================

/// Upper bound for a single blocking read (milliseconds)
pub const MAX_READ_TIMEOUT_MS: u64 = 100;

/// Default delay between reconnection attempts (milliseconds)
pub const DEFAULT_RECONNECT_BACKOFF_MS: u64 = 1000;
