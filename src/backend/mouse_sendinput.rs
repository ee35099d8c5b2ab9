//! Windows SendInput mouse backend.
//!
//! Relative pointer motion and button events via Win32 SendInput. Timing
//! (batching deltas to a flush clock) lives in the mapping layer.

#![cfg(windows)]

use crate::backend::{BackendError, MouseBackend, MouseButton};
use windows::Win32::Foundation::GetLastError;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    SendInput, INPUT, INPUT_0, INPUT_MOUSE, MOUSEEVENTF_LEFTDOWN, MOUSEEVENTF_LEFTUP,
    MOUSEEVENTF_MIDDLEDOWN, MOUSEEVENTF_MIDDLEUP, MOUSEEVENTF_MOVE, MOUSEEVENTF_RIGHTDOWN,
    MOUSEEVENTF_RIGHTUP, MOUSEINPUT, MOUSE_EVENT_FLAGS,
};

#[derive(Clone, Copy, Debug, Default)]
pub struct MouseSendInputBackend;

impl MouseSendInputBackend {
    fn send(dx: i32, dy: i32, flags: MOUSE_EVENT_FLAGS) -> Result<(), BackendError> {
        let input = INPUT {
            r#type: INPUT_MOUSE,
            Anonymous: INPUT_0 {
                mi: MOUSEINPUT {
                    dx,
                    dy,
                    mouseData: 0,
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
            Err(BackendError::Operation(format!(
                "SendInput failed: 0x{:08X}",
                err.0
            )))
        } else {
            Ok(())
        }
    }

    fn button_flags(button: MouseButton) -> (MOUSE_EVENT_FLAGS, MOUSE_EVENT_FLAGS) {
        match button {
            MouseButton::Left => (MOUSEEVENTF_LEFTDOWN, MOUSEEVENTF_LEFTUP),
            MouseButton::Right => (MOUSEEVENTF_RIGHTDOWN, MOUSEEVENTF_RIGHTUP),
            MouseButton::Middle => (MOUSEEVENTF_MIDDLEDOWN, MOUSEEVENTF_MIDDLEUP),
        }
    }
}

impl MouseBackend for MouseSendInputBackend {
    fn move_relative(&self, dx: i32, dy: i32) -> Result<(), BackendError> {
        Self::send(dx, dy, MOUSEEVENTF_MOVE)
    }

    fn button_down(&self, button: MouseButton) -> Result<(), BackendError> {
        Self::send(0, 0, Self::button_flags(button).0)
    }

    fn button_up(&self, button: MouseButton) -> Result<(), BackendError> {
        Self::send(0, 0, Self::button_flags(button).1)
    }
}
