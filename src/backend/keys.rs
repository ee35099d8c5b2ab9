//! Portable key names.
//!
//! Every key carries its US keyboard Set 1 scancode so the Windows backend
//! can inject by scancode, which games pick up more reliably than virtual
//! keys. Extended keys are encoded as `0xE0xx`.
//!
//! Names parse case-insensitively. Accepted names per key:
//!
//! - letters `a`-`z`, digits `0`-`9`, `f1`-`f12`
//! - `shift`, `lshift`/`leftshift`, `rshift`/`rightshift` (same for `ctrl`, `alt`)
//! - `up`, `down`, `left`, `right` (also `uparrow`, ...)
//! - `numpad0`-`numpad9` / `kp0`-`kp9`, `kp*`, `kp+`, `kp-`, `kp/`, `kp.`, `kpenter`
//! - `esc`, `tab`, `caps`, `enter`, `backspace`, `space`, `ins`, `del`,
//!   `home`, `end`, `pgup`, `pgdown`
//! - punctuation `-` `=` `[` `]` `;` `'` `` ` `` `\` `,` `.` `/`

use crate::backend::BackendError;
use std::fmt;
use std::str::FromStr;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum Key {
    A, B, C, D, E, F, G, H, I, J, K, L, M,
    N, O, P, Q, R, S, T, U, V, W, X, Y, Z,

    Key0, Key1, Key2, Key3, Key4, Key5, Key6, Key7, Key8, Key9,

    F1, F2, F3, F4, F5, F6, F7, F8, F9, F10, F11, F12,

    Shift, LeftShift, RightShift,
    Ctrl, LeftCtrl, RightCtrl,
    Alt, LeftAlt, RightAlt,

    Up, Down, Left, Right,

    Numpad0, Numpad1, Numpad2, Numpad3, Numpad4,
    Numpad5, Numpad6, Numpad7, Numpad8, Numpad9,
    NumpadMultiply, NumpadAdd, NumpadSubtract,
    NumpadDivide, NumpadDecimal, NumpadEnter,

    Escape, Tab, CapsLock, Enter, Backspace, Space,
    Insert, Delete, Home, End, PageUp, PageDown,

    Minus, Equals, LeftBracket, RightBracket,
    Semicolon, Apostrophe, Grave, Backslash,
    Comma, Period, Slash,
}

/// (key, scancode, accepted names); the first name is the canonical one
const KEY_TABLE: &[(Key, u16, &[&str])] = &[
    (Key::A, 0x1E, &["a"]),
    (Key::B, 0x30, &["b"]),
    (Key::C, 0x2E, &["c"]),
    (Key::D, 0x20, &["d"]),
    (Key::E, 0x12, &["e"]),
    (Key::F, 0x21, &["f"]),
    (Key::G, 0x22, &["g"]),
    (Key::H, 0x23, &["h"]),
    (Key::I, 0x17, &["i"]),
    (Key::J, 0x24, &["j"]),
    (Key::K, 0x25, &["k"]),
    (Key::L, 0x26, &["l"]),
    (Key::M, 0x32, &["m"]),
    (Key::N, 0x31, &["n"]),
    (Key::O, 0x18, &["o"]),
    (Key::P, 0x19, &["p"]),
    (Key::Q, 0x10, &["q"]),
    (Key::R, 0x13, &["r"]),
    (Key::S, 0x1F, &["s"]),
    (Key::T, 0x14, &["t"]),
    (Key::U, 0x16, &["u"]),
    (Key::V, 0x2F, &["v"]),
    (Key::W, 0x11, &["w"]),
    (Key::X, 0x2D, &["x"]),
    (Key::Y, 0x15, &["y"]),
    (Key::Z, 0x2C, &["z"]),
    (Key::Key0, 0x0B, &["0"]),
    (Key::Key1, 0x02, &["1"]),
    (Key::Key2, 0x03, &["2"]),
    (Key::Key3, 0x04, &["3"]),
    (Key::Key4, 0x05, &["4"]),
    (Key::Key5, 0x06, &["5"]),
    (Key::Key6, 0x07, &["6"]),
    (Key::Key7, 0x08, &["7"]),
    (Key::Key8, 0x09, &["8"]),
    (Key::Key9, 0x0A, &["9"]),
    (Key::F1, 0x3B, &["f1"]),
    (Key::F2, 0x3C, &["f2"]),
    (Key::F3, 0x3D, &["f3"]),
    (Key::F4, 0x3E, &["f4"]),
    (Key::F5, 0x3F, &["f5"]),
    (Key::F6, 0x40, &["f6"]),
    (Key::F7, 0x41, &["f7"]),
    (Key::F8, 0x42, &["f8"]),
    (Key::F9, 0x43, &["f9"]),
    (Key::F10, 0x44, &["f10"]),
    (Key::F11, 0x57, &["f11"]),
    (Key::F12, 0x58, &["f12"]),
    (Key::Shift, 0x2A, &["shift"]),
    (Key::LeftShift, 0x2A, &["leftshift", "lshift"]),
    (Key::RightShift, 0x36, &["rightshift", "rshift"]),
    (Key::Ctrl, 0x1D, &["ctrl", "control"]),
    (Key::LeftCtrl, 0x1D, &["leftctrl", "lctrl", "leftcontrol"]),
    (Key::RightCtrl, 0xE01D, &["rightctrl", "rctrl", "rightcontrol"]),
    (Key::Alt, 0x38, &["alt"]),
    (Key::LeftAlt, 0x38, &["leftalt", "lalt"]),
    (Key::RightAlt, 0xE038, &["rightalt", "ralt"]),
    (Key::Up, 0xE048, &["up", "uparrow"]),
    (Key::Down, 0xE050, &["down", "downarrow"]),
    (Key::Left, 0xE04B, &["left", "leftarrow"]),
    (Key::Right, 0xE04D, &["right", "rightarrow"]),
    (Key::Numpad0, 0x52, &["numpad0", "kp0"]),
    (Key::Numpad1, 0x4F, &["numpad1", "kp1"]),
    (Key::Numpad2, 0x50, &["numpad2", "kp2"]),
    (Key::Numpad3, 0x51, &["numpad3", "kp3"]),
    (Key::Numpad4, 0x4B, &["numpad4", "kp4"]),
    (Key::Numpad5, 0x4C, &["numpad5", "kp5"]),
    (Key::Numpad6, 0x4D, &["numpad6", "kp6"]),
    (Key::Numpad7, 0x47, &["numpad7", "kp7"]),
    (Key::Numpad8, 0x48, &["numpad8", "kp8"]),
    (Key::Numpad9, 0x49, &["numpad9", "kp9"]),
    (Key::NumpadMultiply, 0x37, &["numpadmultiply", "kpmultiply", "kp*"]),
    (Key::NumpadAdd, 0x4E, &["numpadadd", "kpadd", "kp+"]),
    (Key::NumpadSubtract, 0x4A, &["numpadsubtract", "kpsubtract", "kp-"]),
    (Key::NumpadDivide, 0xE035, &["numpaddivide", "kpdivide", "kp/"]),
    (Key::NumpadDecimal, 0x53, &["numpaddecimal", "kpdecimal", "kp."]),
    (Key::NumpadEnter, 0xE01C, &["numpadenter", "kpenter"]),
    (Key::Escape, 0x01, &["escape", "esc"]),
    (Key::Tab, 0x0F, &["tab"]),
    (Key::CapsLock, 0x3A, &["capslock", "caps"]),
    (Key::Enter, 0x1C, &["enter", "return"]),
    (Key::Backspace, 0x0E, &["backspace", "back"]),
    (Key::Space, 0x39, &["space", "spacebar"]),
    (Key::Insert, 0xE052, &["insert", "ins"]),
    (Key::Delete, 0xE053, &["delete", "del"]),
    (Key::Home, 0xE047, &["home"]),
    (Key::End, 0xE04F, &["end"]),
    (Key::PageUp, 0xE049, &["pageup", "pgup"]),
    (Key::PageDown, 0xE051, &["pagedown", "pgdown"]),
    (Key::Minus, 0x0C, &["minus", "-"]),
    (Key::Equals, 0x0D, &["equals", "="]),
    (Key::LeftBracket, 0x1A, &["leftbracket", "["]),
    (Key::RightBracket, 0x1B, &["rightbracket", "]"]),
    (Key::Semicolon, 0x27, &["semicolon", ";"]),
    (Key::Apostrophe, 0x28, &["apostrophe", "quote", "'"]),
    (Key::Grave, 0x29, &["grave", "`"]),
    (Key::Backslash, 0x2B, &["backslash", "\\"]),
    (Key::Comma, 0x33, &["comma", ","]),
    (Key::Period, 0x34, &["period", "."]),
    (Key::Slash, 0x35, &["slash", "/"]),
];

impl Key {
    fn entry(self) -> &'static (Key, u16, &'static [&'static str]) {
        // Every variant has a row
        KEY_TABLE
            .iter()
            .find(|(k, _, _)| *k == self)
            .unwrap_or(&KEY_TABLE[0])
    }

    /// US Set 1 scancode; extended keys carry the `0xE0` prefix in the high byte
    pub fn scancode(self) -> u16 {
        self.entry().1
    }

    /// Extended keys need `KEYEVENTF_EXTENDEDKEY` when injected
    pub fn is_extended(self) -> bool {
        self.scancode() > 0xFF
    }

    /// Canonical lowercase name
    pub fn name(self) -> &'static str {
        self.entry().2[0]
    }

    /// Parse a key name (case-insensitive, surrounding whitespace ignored)
    pub fn parse(name: &str) -> Result<Key, BackendError> {
        let wanted = name.trim().to_ascii_lowercase();
        KEY_TABLE
            .iter()
            .find(|(_, _, names)| names.contains(&wanted.as_str()))
            .map(|(key, _, _)| *key)
            .ok_or_else(|| BackendError::UnsupportedKey(name.to_string()))
    }
}

impl FromStr for Key {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Key::parse(s)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_table_name_round_trips() {
        for (key, _, names) in KEY_TABLE {
            assert_eq!(key.entry().0, *key);
            for name in names.iter() {
                assert_eq!(Key::parse(name).unwrap(), *key, "name {name}");
            }
        }
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(Key::parse("W").unwrap(), Key::W);
        assert_eq!(Key::parse("  Shift ").unwrap(), Key::Shift);
        assert_eq!(Key::parse("F12").unwrap(), Key::F12);
        assert_eq!(Key::parse("KP+").unwrap(), Key::NumpadAdd);
    }

    #[test]
    fn parse_aliases() {
        assert_eq!(Key::parse("esc").unwrap(), Key::Escape);
        assert_eq!(Key::parse("lshift").unwrap(), Key::LeftShift);
        assert_eq!(Key::parse("rctrl").unwrap(), Key::RightCtrl);
        assert_eq!(Key::parse("leftarrow").unwrap(), Key::Left);
        assert_eq!(Key::parse("pgdown").unwrap(), Key::PageDown);
    }

    #[test]
    fn parse_invalid() {
        assert!(matches!(
            Key::parse("f13"),
            Err(BackendError::UnsupportedKey(name)) if name == "f13"
        ));
        assert!(Key::parse("").is_err());
        assert!("not_a_key".parse::<Key>().is_err());
    }

    #[test]
    fn scancodes_and_extended_flag() {
        assert_eq!(Key::A.scancode(), 0x1E);
        assert_eq!(Key::W.scancode(), 0x11);
        assert_eq!(Key::Space.scancode(), 0x39);
        assert_eq!(Key::Up.scancode(), 0xE048);
        assert!(Key::Up.is_extended());
        assert!(Key::RightAlt.is_extended());
        assert!(!Key::W.is_extended());
        assert!(!Key::F1.is_extended());
    }

    #[test]
    fn display_uses_canonical_name() {
        assert_eq!(Key::Escape.to_string(), "escape");
        assert_eq!(Key::Key5.to_string(), "5");
    }
}
