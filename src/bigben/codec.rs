//! Report codec
//!
//! Bit-exact decode of raw interrupt reports into [`ControllerState`], and
//! encode of rumble/LED intents into 8-byte output reports. Both wire
//! layouts decode into the same canonical state.

use crate::bigben::constants::*;
use crate::bigben::types::{Button, Buttons, ControllerState, Dpad, LedIntent, RumbleIntent, StickPosition};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Input report wire layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// 20-byte report: signed 16-bit sticks, D-pad as four button bits
    #[default]
    Legacy,
    /// 64-byte report: unsigned 8-bit sticks, separate hat byte
    Canonical,
}

impl Layout {
    /// Expected first byte of an input report
    pub const fn report_id(self) -> u8 {
        match self {
            Layout::Legacy => LEGACY_REPORT_ID,
            Layout::Canonical => CANONICAL_REPORT_ID,
        }
    }

    /// Fewest bytes the decoder accepts
    pub const fn min_size(self) -> usize {
        match self {
            Layout::Legacy => LEGACY_MIN_SIZE,
            Layout::Canonical => CANONICAL_MIN_SIZE,
        }
    }

    /// Size the device normally sends
    pub const fn report_size(self) -> usize {
        match self {
            Layout::Legacy => LEGACY_REPORT_SIZE,
            Layout::Canonical => CANONICAL_REPORT_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Report too short: expected at least {expected} bytes, got {actual}")]
    TooShort { expected: usize, actual: usize },

    #[error("Unexpected report id: expected {expected:#04x}, got {actual:#04x}")]
    BadReportId { expected: u8, actual: u8 },
}

/// Decode a raw input report using the given layout.
///
/// Never panics on malformed input: short buffers and foreign report IDs
/// are errors, and any D-pad pattern that does not resolve to a compass
/// point decodes as [`Dpad::Neutral`].
pub fn decode(raw: &[u8], layout: Layout) -> Result<ControllerState, DecodeError> {
    if raw.len() < layout.min_size() {
        return Err(DecodeError::TooShort {
            expected: layout.min_size(),
            actual: raw.len(),
        });
    }

    if raw[0] != layout.report_id() {
        return Err(DecodeError::BadReportId {
            expected: layout.report_id(),
            actual: raw[0],
        });
    }

    Ok(match layout {
        Layout::Legacy => decode_legacy(raw),
        Layout::Canonical => decode_canonical(raw),
    })
}

/// Rescale a signed 16-bit axis to the unsigned 8-bit range centered at 128
pub fn rescale_axis(value: i16) -> u8 {
    let scaled = i32::from(value) / 256 + i32::from(AXIS_CENTER);
    scaled.clamp(0, 255) as u8
}

// Legacy layout:
//   [0] report id  [1] size  [2..4] buttons (LE)  [4] LT  [5] RT
//   [6..8] LX  [8..10] LY  [10..12] RX  [12..14] RY  (all i16 LE)
fn decode_legacy(raw: &[u8]) -> ControllerState {
    let bits = u16::from_le_bytes([raw[2], raw[3]]);
    let left_trigger = raw[4];
    let right_trigger = raw[5];
    let axis = |at: usize| rescale_axis(i16::from_le_bytes([raw[at], raw[at + 1]]));

    let mut buttons = Buttons::NONE;
    let mapping = [
        (LEGACY_BTN_A, Button::A),
        (LEGACY_BTN_B, Button::B),
        (LEGACY_BTN_X, Button::X),
        (LEGACY_BTN_Y, Button::Y),
        (LEGACY_BTN_START, Button::Start),
        (LEGACY_BTN_BACK, Button::Back),
        (LEGACY_BTN_L3, Button::L3),
        (LEGACY_BTN_R3, Button::R3),
        (LEGACY_BTN_LB, Button::LB),
        (LEGACY_BTN_RB, Button::RB),
        (LEGACY_BTN_HOME, Button::Home),
    ];
    for (mask, button) in mapping {
        buttons.set(button, bits & mask != 0);
    }
    buttons.set(Button::LT, left_trigger >= LEGACY_TRIGGER_THRESHOLD);
    buttons.set(Button::RT, right_trigger >= LEGACY_TRIGGER_THRESHOLD);

    let dpad = Dpad::from_flags(
        bits & LEGACY_DPAD_UP != 0,
        bits & LEGACY_DPAD_DOWN != 0,
        bits & LEGACY_DPAD_LEFT != 0,
        bits & LEGACY_DPAD_RIGHT != 0,
    );

    ControllerState {
        left_stick: StickPosition::new(axis(6), axis(8)),
        right_stick: StickPosition::new(axis(10), axis(12)),
        left_trigger,
        right_trigger,
        buttons,
        dpad,
    }
}

// Canonical layout:
//   [0] report id  [1] LX  [2] LY  [3] RX  [4] RY  [5] hat
//   [6..8] buttons (LE)  [8] LT  [9] RT  [10..64] reserved
fn decode_canonical(raw: &[u8]) -> ControllerState {
    ControllerState {
        left_stick: StickPosition::new(raw[1], raw[2]),
        right_stick: StickPosition::new(raw[3], raw[4]),
        left_trigger: raw[8],
        right_trigger: raw[9],
        buttons: Buttons::from_bits(u16::from_le_bytes([raw[6], raw[7]])),
        dpad: Dpad::from_hat(raw[5]),
    }
}

/// Encode a rumble request for the given layout
pub fn encode_rumble(intent: RumbleIntent, layout: Layout) -> [u8; OUTPUT_REPORT_SIZE] {
    let mut report = [0u8; OUTPUT_REPORT_SIZE];
    report[1] = OUTPUT_SIZE_MARKER;
    match layout {
        Layout::Legacy => {
            report[0] = LEGACY_RUMBLE_REPORT_ID;
            report[3] = intent.weak;
            report[4] = intent.strong;
        }
        Layout::Canonical => {
            report[0] = CANONICAL_RUMBLE_REPORT_ID;
            // The weak motor is on/off only on this firmware
            report[2] = u8::from(intent.weak != 0);
            report[3] = intent.strong;
            report[4] = if intent.is_off() { 0 } else { RUMBLE_CONTINUOUS };
        }
    }
    report
}

/// Encode a player LED request (same format on both layouts)
pub fn encode_led(intent: LedIntent) -> [u8; OUTPUT_REPORT_SIZE] {
    let mut report = [0u8; OUTPUT_REPORT_SIZE];
    report[0] = LED_REPORT_ID;
    report[1] = OUTPUT_SIZE_MARKER;
    report[2] = intent.mask();
    report
}

/// A codec bound to one layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReportCodec {
    layout: Layout,
}

impl ReportCodec {
    pub const fn new(layout: Layout) -> Self {
        Self { layout }
    }

    pub const fn layout(&self) -> Layout {
        self.layout
    }

    pub fn decode(&self, raw: &[u8]) -> Result<ControllerState, DecodeError> {
        decode(raw, self.layout)
    }

    pub fn encode_rumble(&self, intent: RumbleIntent) -> [u8; OUTPUT_REPORT_SIZE] {
        encode_rumble(intent, self.layout)
    }

    pub fn encode_led(&self, intent: LedIntent) -> [u8; OUTPUT_REPORT_SIZE] {
        encode_led(intent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn legacy_report(buttons: u16, lt: u8, rt: u8, sticks: [i16; 4]) -> [u8; LEGACY_REPORT_SIZE] {
        let mut data = [0u8; LEGACY_REPORT_SIZE];
        data[0] = LEGACY_REPORT_ID;
        data[1] = LEGACY_REPORT_SIZE as u8;
        data[2..4].copy_from_slice(&buttons.to_le_bytes());
        data[4] = lt;
        data[5] = rt;
        for (i, value) in sticks.iter().enumerate() {
            let at = 6 + i * 2;
            data[at..at + 2].copy_from_slice(&value.to_le_bytes());
        }
        data
    }

    fn canonical_report(sticks: [u8; 4], hat: u8, buttons: u16, lt: u8, rt: u8) -> [u8; CANONICAL_REPORT_SIZE] {
        let mut data = [0u8; CANONICAL_REPORT_SIZE];
        data[0] = CANONICAL_REPORT_ID;
        data[1..5].copy_from_slice(&sticks);
        data[5] = hat;
        data[6..8].copy_from_slice(&buttons.to_le_bytes());
        data[8] = lt;
        data[9] = rt;
        data
    }

    #[test]
    fn legacy_a_pressed_sticks_centered() {
        let raw = [
            0x00, 0x08, 0x01, 0x00, 0x00, 0x00, 0x80, 0x00, 0x80, 0x00, 0x80, 0x00, 0x80, 0x00,
        ];
        let state = decode(&raw, Layout::Legacy).unwrap();
        assert!(state.buttons.is_pressed(Button::A));
        assert_eq!(state.buttons.iter().count(), 1);
        assert_eq!(state.left_stick, StickPosition::new(128, 128));
        assert_eq!(state.right_stick, StickPosition::new(128, 128));
        assert_eq!(state.dpad, Dpad::Neutral);
    }

    #[test]
    fn legacy_axis_rescale_extremes() {
        assert_eq!(rescale_axis(i16::MIN), 0);
        assert_eq!(rescale_axis(i16::MAX), 255);
        assert_eq!(rescale_axis(0), 128);
        assert_eq!(rescale_axis(-256), 127);
        assert_eq!(rescale_axis(255), 128);
    }

    #[test]
    fn legacy_sticks_and_triggers() {
        let raw = legacy_report(0, 200, 10, [i16::MAX, i16::MIN, 0, 512]);
        let state = decode(&raw, Layout::Legacy).unwrap();
        assert_eq!(state.left_stick, StickPosition::new(255, 0));
        assert_eq!(state.right_stick, StickPosition::new(128, 130));
        assert_eq!(state.left_trigger, 200);
        assert_eq!(state.right_trigger, 10);
        assert!(state.buttons.is_pressed(Button::LT));
        assert!(!state.buttons.is_pressed(Button::RT));
    }

    #[test]
    fn legacy_dpad_directions() {
        let cases = [
            (LEGACY_DPAD_UP, Dpad::N),
            (LEGACY_DPAD_UP | LEGACY_DPAD_RIGHT, Dpad::NE),
            (LEGACY_DPAD_RIGHT, Dpad::E),
            (LEGACY_DPAD_DOWN | LEGACY_DPAD_RIGHT, Dpad::SE),
            (LEGACY_DPAD_DOWN, Dpad::S),
            (LEGACY_DPAD_DOWN | LEGACY_DPAD_LEFT, Dpad::SW),
            (LEGACY_DPAD_LEFT, Dpad::W),
            (LEGACY_DPAD_UP | LEGACY_DPAD_LEFT, Dpad::NW),
            (LEGACY_DPAD_UP | LEGACY_DPAD_DOWN, Dpad::Neutral),
            (LEGACY_DPAD_LEFT | LEGACY_DPAD_RIGHT, Dpad::Neutral),
            (0xF000, Dpad::Neutral),
        ];
        for (bits, expected) in cases {
            let state = decode(&legacy_report(bits, 0, 0, [0; 4]), Layout::Legacy).unwrap();
            assert_eq!(state.dpad, expected, "bits {:#06x}", bits);
            assert!(state.buttons.is_empty());
        }
    }

    #[test]
    fn legacy_button_wire_bits() {
        let cases = [
            (0x0001, Button::A),
            (0x0002, Button::B),
            (0x0004, Button::X),
            (0x0008, Button::Y),
            (0x0010, Button::Start),
            (0x0020, Button::Back),
            (0x0040, Button::L3),
            (0x0080, Button::R3),
            (0x0100, Button::LB),
            (0x0200, Button::RB),
            (0x0400, Button::Home),
        ];
        for (bits, expected) in cases {
            let state = decode(&legacy_report(bits, 0, 0, [0; 4]), Layout::Legacy).unwrap();
            let pressed: Vec<Button> = state.buttons.iter().collect();
            assert_eq!(pressed, vec![expected], "bits {:#06x}", bits);
            assert_eq!(state.dpad, Dpad::Neutral);
        }
    }

    #[test]
    fn legacy_every_button_bit() {
        let raw = legacy_report(0x07FF, 255, 255, [0; 4]);
        let state = decode(&raw, Layout::Legacy).unwrap();
        assert_eq!(state.buttons.bits(), BUTTON_MASK);
    }

    #[test]
    fn canonical_copies_fields() {
        let raw = canonical_report([10, 20, 30, 40], 3, BTN_B | BTN_HOME, 7, 250);
        let state = decode(&raw, Layout::Canonical).unwrap();
        assert_eq!(state.left_stick, StickPosition::new(10, 20));
        assert_eq!(state.right_stick, StickPosition::new(30, 40));
        assert_eq!(state.dpad, Dpad::SE);
        assert!(state.buttons.is_pressed(Button::B));
        assert!(state.buttons.is_pressed(Button::Home));
        assert_eq!(state.left_trigger, 7);
        assert_eq!(state.right_trigger, 250);
    }

    #[test]
    fn canonical_bad_hat_is_neutral() {
        for hat in [8u8, 9, 0x0F, 0xFF] {
            let raw = canonical_report([128; 4], hat, 0, 0, 0);
            assert_eq!(decode(&raw, Layout::Canonical).unwrap().dpad, Dpad::Neutral);
        }
    }

    #[test]
    fn canonical_masks_reserved_button_bits() {
        let raw = canonical_report([128; 4], 8, 0xE001, 0, 0);
        let state = decode(&raw, Layout::Canonical).unwrap();
        assert_eq!(state.buttons.bits(), BTN_A);
    }

    #[test]
    fn too_short_is_rejected() {
        assert_eq!(
            decode(&[0x00; 13], Layout::Legacy),
            Err(DecodeError::TooShort { expected: 14, actual: 13 })
        );
        assert_eq!(
            decode(&[], Layout::Canonical),
            Err(DecodeError::TooShort { expected: 10, actual: 0 })
        );
    }

    #[test]
    fn wrong_report_id_is_rejected() {
        let mut raw = legacy_report(0, 0, 0, [0; 4]);
        raw[0] = 0x05;
        assert_eq!(
            decode(&raw, Layout::Legacy),
            Err(DecodeError::BadReportId { expected: 0x00, actual: 0x05 })
        );
        let raw = canonical_report([128; 4], 8, 0, 0, 0);
        assert!(matches!(decode(&raw, Layout::Legacy), Err(DecodeError::BadReportId { .. })));
    }

    #[test]
    fn rumble_reports() {
        let intent = RumbleIntent::new(0x40, 0xC0);
        assert_eq!(
            encode_rumble(intent, Layout::Legacy),
            [0x00, 0x08, 0x00, 0x40, 0xC0, 0x00, 0x00, 0x00]
        );
        assert_eq!(
            encode_rumble(intent, Layout::Canonical),
            [0x02, 0x08, 0x01, 0xC0, 0xFF, 0x00, 0x00, 0x00]
        );
        assert_eq!(
            encode_rumble(RumbleIntent::OFF, Layout::Canonical),
            [0x02, 0x08, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn led_report() {
        assert_eq!(
            encode_led(LedIntent::new(0x1F)),
            [0x01, 0x08, 0x0F, 0x00, 0x00, 0x00, 0x00, 0x00]
        );
        let codec = ReportCodec::new(Layout::Canonical);
        assert_eq!(codec.encode_led(LedIntent::player(2))[2], 0x02);
    }
}
