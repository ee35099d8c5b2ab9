//! Bigben controller type definitions
//!
//! This module defines the canonical, wire-format independent types used
//! throughout the pipeline: controller state, button identifiers, D-pad
//! directions, shaped axes and the small output intents.

use crate::bigben::constants::{
    AXIS_CENTER, BTN_A, BTN_B, BTN_BACK, BTN_HOME, BTN_L3, BTN_LB, BTN_LT, BTN_R3, BTN_RB,
    BTN_RT, BTN_START, BTN_X, BTN_Y, BUTTON_MASK, HAT_NEUTRAL, LED_MASK,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Named controller buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Button {
    A,
    B,
    X,
    Y,
    LB,
    RB,
    LT,
    RT,
    Back,
    Start,
    L3,
    R3,
    Home,
}

impl Button {
    /// Every button, in the order edges are reported
    pub const ALL: [Button; 13] = [
        Button::A,
        Button::B,
        Button::X,
        Button::Y,
        Button::LB,
        Button::RB,
        Button::LT,
        Button::RT,
        Button::Back,
        Button::Start,
        Button::L3,
        Button::R3,
        Button::Home,
    ];

    /// Canonical bit for this button (also its HID button bit)
    pub const fn bit(self) -> u16 {
        match self {
            Button::A => BTN_A,
            Button::B => BTN_B,
            Button::X => BTN_X,
            Button::Y => BTN_Y,
            Button::LB => BTN_LB,
            Button::RB => BTN_RB,
            Button::LT => BTN_LT,
            Button::RT => BTN_RT,
            Button::Back => BTN_BACK,
            Button::Start => BTN_START,
            Button::L3 => BTN_L3,
            Button::R3 => BTN_R3,
            Button::Home => BTN_HOME,
        }
    }

    /// Position of this button in [`Button::ALL`]
    pub const fn index(self) -> usize {
        self.bit().trailing_zeros() as usize
    }
}

/// Set of pressed buttons, stored in canonical bit order.
///
/// Reserved bits are masked off on construction, so a `Buttons` value never
/// carries anything outside the 13 known buttons.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Buttons(u16);

impl Buttons {
    pub const NONE: Self = Self(0);

    /// Build from a raw canonical bitfield, dropping reserved bits
    pub const fn from_bits(bits: u16) -> Self {
        Self(bits & BUTTON_MASK)
    }

    pub const fn bits(self) -> u16 {
        self.0
    }

    pub const fn is_pressed(self, button: Button) -> bool {
        self.0 & button.bit() != 0
    }

    pub fn set(&mut self, button: Button, pressed: bool) {
        if pressed {
            self.0 |= button.bit();
        } else {
            self.0 &= !button.bit();
        }
    }

    pub fn with(mut self, button: Button) -> Self {
        self.set(button, true);
        self
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterate over the pressed buttons in edge order
    pub fn iter(self) -> impl Iterator<Item = Button> {
        Button::ALL.into_iter().filter(move |b| self.is_pressed(*b))
    }
}

/// D-pad direction, resolved to one of eight compass points or neutral
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Dpad {
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
    #[default]
    Neutral,
}

impl Dpad {
    /// Resolve a hat-switch value; anything outside 0-7 is neutral
    pub const fn from_hat(hat: u8) -> Self {
        match hat {
            0 => Dpad::N,
            1 => Dpad::NE,
            2 => Dpad::E,
            3 => Dpad::SE,
            4 => Dpad::S,
            5 => Dpad::SW,
            6 => Dpad::W,
            7 => Dpad::NW,
            _ => Dpad::Neutral,
        }
    }

    /// Resolve four independent direction flags.
    ///
    /// Opposing pairs cancel the whole pad rather than picking a winner.
    pub const fn from_flags(up: bool, down: bool, left: bool, right: bool) -> Self {
        if (up && down) || (left && right) {
            return Dpad::Neutral;
        }
        match (up, down, left, right) {
            (true, false, false, false) => Dpad::N,
            (true, false, false, true) => Dpad::NE,
            (false, false, false, true) => Dpad::E,
            (false, true, false, true) => Dpad::SE,
            (false, true, false, false) => Dpad::S,
            (false, true, true, false) => Dpad::SW,
            (false, false, true, false) => Dpad::W,
            (true, false, true, false) => Dpad::NW,
            _ => Dpad::Neutral,
        }
    }

    /// HID hat-switch value (0-7, 8 = neutral)
    pub const fn hat(self) -> u8 {
        match self {
            Dpad::N => 0,
            Dpad::NE => 1,
            Dpad::E => 2,
            Dpad::SE => 3,
            Dpad::S => 4,
            Dpad::SW => 5,
            Dpad::W => 6,
            Dpad::NW => 7,
            Dpad::Neutral => HAT_NEUTRAL,
        }
    }

    /// Cardinal components as (up, down, left, right)
    pub const fn components(self) -> (bool, bool, bool, bool) {
        match self {
            Dpad::N => (true, false, false, false),
            Dpad::NE => (true, false, false, true),
            Dpad::E => (false, false, false, true),
            Dpad::SE => (false, true, false, true),
            Dpad::S => (false, true, false, false),
            Dpad::SW => (false, true, true, false),
            Dpad::W => (false, false, true, false),
            Dpad::NW => (true, false, true, false),
            Dpad::Neutral => (false, false, false, false),
        }
    }
}

/// Raw analog stick position (0-255 per axis, 128 = center)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StickPosition {
    pub x: u8,
    pub y: u8,
}

impl StickPosition {
    pub const CENTER: Self = Self { x: AXIS_CENTER, y: AXIS_CENTER };

    pub const fn new(x: u8, y: u8) -> Self {
        Self { x, y }
    }
}

impl Default for StickPosition {
    fn default() -> Self {
        Self::CENTER
    }
}

/// Canonical controller state, independent of the wire layout it came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ControllerState {
    pub left_stick: StickPosition,
    pub right_stick: StickPosition,
    pub left_trigger: u8,
    pub right_trigger: u8,
    pub buttons: Buttons,
    pub dpad: Dpad,
}

impl ControllerState {
    /// Centered sticks, released triggers, nothing pressed
    pub const fn neutral() -> Self {
        Self {
            left_stick: StickPosition::CENTER,
            right_stick: StickPosition::CENTER,
            left_trigger: 0,
            right_trigger: 0,
            buttons: Buttons::NONE,
            dpad: Dpad::Neutral,
        }
    }
}

/// Shaped stick vector, each axis in [-1, 1]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StickVector {
    pub x: f64,
    pub y: f64,
}

/// Analog values after deadzone and response curve
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ShapedAxes {
    pub left: StickVector,
    pub right: StickVector,
    /// [0, 1]
    pub left_trigger: f64,
    /// [0, 1]
    pub right_trigger: f64,
}

/// Which analog stick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StickType {
    Left,
    Right,
}

/// Rumble motor magnitudes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RumbleIntent {
    pub weak: u8,
    pub strong: u8,
}

impl RumbleIntent {
    pub const OFF: Self = Self { weak: 0, strong: 0 };

    pub const fn new(weak: u8, strong: u8) -> Self {
        Self { weak, strong }
    }

    pub const fn is_off(self) -> bool {
        self.weak == 0 && self.strong == 0
    }
}

/// Player LED bitmask (LED1 = 0x01 ... LED4 = 0x08)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LedIntent {
    mask: u8,
}

impl LedIntent {
    pub const fn new(mask: u8) -> Self {
        Self { mask: mask & LED_MASK }
    }

    /// Light the LED for a 1-based player number (1-4); other values light nothing
    pub const fn player(player: u8) -> Self {
        match player {
            1..=4 => Self::new(1 << (player - 1)),
            _ => Self::new(0),
        }
    }

    pub const fn mask(self) -> u8 {
        self.mask
    }
}

/// Connection lifecycle, owned by the supervisor
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Faulted(String),
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Faulted(reason) => write!(f, "faulted: {}", reason),
        }
    }
}
