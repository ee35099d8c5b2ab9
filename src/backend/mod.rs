//! Host capability interfaces
//!
//! The decode/shape/edge core never talks to the OS directly. It goes
//! through these traits:
//! - [`KeyboardBackend`] / [`MouseBackend`] for synthetic input injection
//! - [`ReportDelivery`] for handing formatted HID reports to a driver
//!
//! Windows gets `SendInput` implementations; every platform gets mocks that
//! log and record what they were asked to do.

pub mod keys;
pub mod keyboard_sendinput;
pub mod mouse_sendinput;
pub mod mock_keyboard;
pub mod mock_mouse;
pub mod mock_delivery;

pub use keys::Key;

#[cfg(windows)]
pub use keyboard_sendinput::KeyboardSendInputBackend;
#[cfg(windows)]
pub use mouse_sendinput::MouseSendInputBackend;

pub use mock_delivery::{DeliveredReport, MockReportDelivery};
pub use mock_keyboard::{KeyEvent, MockKeyboardBackend};
pub use mock_mouse::{MockMouseBackend, MouseEvent};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Backend operation failed: {0}")]
    Operation(String),

    #[error("Unsupported key: {0}")]
    UnsupportedKey(String),
}

/// Synthetic keyboard injection
pub trait KeyboardBackend {
    /// Press a key (key down event)
    fn key_down(&self, key: Key) -> Result<(), BackendError>;

    /// Release a key (key up event)
    fn key_up(&self, key: Key) -> Result<(), BackendError>;

    /// Press and release a key
    fn key_press(&self, key: Key) -> Result<(), BackendError> {
        self.key_down(key)?;
        self.key_up(key)
    }
}

/// Synthetic mouse injection
pub trait MouseBackend {
    /// Move the pointer relatively by (dx, dy) pixels
    fn move_relative(&self, dx: i32, dy: i32) -> Result<(), BackendError>;

    /// Press a mouse button
    fn button_down(&self, button: MouseButton) -> Result<(), BackendError>;

    /// Release a mouse button
    fn button_up(&self, button: MouseButton) -> Result<(), BackendError>;

    /// Press and release a mouse button
    fn click(&self, button: MouseButton) -> Result<(), BackendError> {
        self.button_down(button)?;
        self.button_up(button)
    }
}

/// Driver-side HID report delivery
pub trait ReportDelivery {
    /// Hand one input report to the host HID stack
    fn deliver_input_report(&self, timestamp_us: u64, report: &[u8]) -> Result<(), BackendError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl MouseButton {
    pub fn as_str(self) -> &'static str {
        match self {
            MouseButton::Left => "left",
            MouseButton::Right => "right",
            MouseButton::Middle => "middle",
        }
    }
}
