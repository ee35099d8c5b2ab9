//! Windows SendInput keyboard backend (scancode-based).
//!
//! Injects keyboard events with `KEYEVENTF_SCANCODE`, which games accept
//! more reliably than virtual-key injection. Extended keys (arrows, right
//! ctrl/alt, numpad enter, ...) get `KEYEVENTF_EXTENDEDKEY` automatically.
//!
//! # Safety Notes
//! - `SendInput` is wrapped in one small unsafe helper.
//! - If `SendInput` returns 0, the last OS error is surfaced as
//!   [`BackendError::Operation`].

#![cfg(windows)]

use crate::backend::{BackendError, Key, KeyboardBackend};
use log::trace;
use windows::Win32::Foundation::GetLastError;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, KEYBDINPUT, KEYBD_EVENT_FLAGS,
    KEYEVENTF_EXTENDEDKEY, KEYEVENTF_KEYUP, KEYEVENTF_SCANCODE, VIRTUAL_KEY,
};

/// Backend that uses Win32 SendInput to synthesize keyboard events.
#[derive(Clone, Copy, Debug, Default)]
pub struct KeyboardSendInputBackend;

impl KeyboardSendInputBackend {
    fn send(key: Key, up: bool) -> Result<(), BackendError> {
        let mut flags: KEYBD_EVENT_FLAGS = KEYEVENTF_SCANCODE;
        if up {
            flags |= KEYEVENTF_KEYUP;
        }
        if key.is_extended() {
            flags |= KEYEVENTF_EXTENDEDKEY;
        }

        let input = INPUT {
            r#type: INPUT_KEYBOARD,
            Anonymous: INPUT_0 {
                ki: KEYBDINPUT {
                    wVk: VIRTUAL_KEY(0),
                    wScan: key.scancode() & 0xFF,
                    dwFlags: flags,
                    time: 0,
                    dwExtraInfo: 0,
                },
            },
        };

        // SAFETY: a single, fully initialised INPUT struct
        let sent = unsafe { SendInput(&[input], std::mem::size_of::<INPUT>() as i32) };
        if sent == 0 {
            let err = unsafe { GetLastError() };
            return Err(BackendError::Operation(format!(
                "SendInput failed for '{}': 0x{:08X}",
                key, err.0
            )));
        }
        trace!("SendInput key {} {}", key, if up { "up" } else { "down" });
        Ok(())
    }
}

impl KeyboardBackend for KeyboardSendInputBackend {
    fn key_down(&self, key: Key) -> Result<(), BackendError> {
        Self::send(key, false)
    }

    fn key_up(&self, key: Key) -> Result<(), BackendError> {
        Self::send(key, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extended_keys_are_flagged() {
        // Only checks the table the injector relies on; no input is sent
        assert!(Key::Up.is_extended());
        assert_eq!(Key::Up.scancode() & 0xFF, 0x48);
        assert!(!Key::W.is_extended());
    }
}
