//! Analog response shaping.
//!
//! Pure functions only. Two domains are covered:
//! - the integer domain (`u8` axis bytes centered at 128), used when the
//!   output is another byte-oriented report
//! - the normalized domain (`f64` in [-1, 1]), used to drive pointer motion
//!   and stick-as-digital thresholds

use crate::bigben::constants::AXIS_CENTER;
use crate::bigben::{ControllerState, ShapedAxes, StickPosition, StickVector};

/// Upper edge of the precision zone
pub const PRECISION_ZONE_END: f64 = 0.4;
/// Upper edge of the linear zone
pub const LINEAR_ZONE_END: f64 = 0.8;

const PRECISION_EXPONENT: f64 = 0.7;
const ACCELERATION_EXPONENT: f64 = 1.3;

/// Remove a band of `threshold` around center and stretch the rest back
/// over the full range.
///
/// Values within the band return exactly 128. Outside it, the remaining
/// `[threshold, 127]` is rescaled onto `[0, 127]` on each side, keeping the
/// sign. Center is a fixed point and a threshold of 0 is the identity.
pub fn deadzone(value: u8, threshold: u8) -> u8 {
    let center = i32::from(AXIS_CENTER);
    let t = i32::from(threshold.min(127));
    let offset = i32::from(value) - center;

    if offset.abs() < t {
        return AXIS_CENTER;
    }

    let range = 127 - t;
    if range == 0 {
        return if offset < 0 { 0 } else { 255 };
    }

    let adjusted = if offset > 0 { offset - t } else { offset + t };
    (center + adjusted * 127 / range).clamp(0, 255) as u8
}

/// Trigger deadzone: below `threshold` is released, the rest is stretched
/// back over `[0, 255]`.
pub fn trigger_deadzone(value: u8, threshold: u8) -> u8 {
    if value < threshold {
        return 0;
    }
    let range = 255 - u32::from(threshold);
    if range == 0 {
        return 255;
    }
    ((u32::from(value - threshold) * 255) / range).min(255) as u8
}

/// Inner/outer deadzone on one normalized axis.
///
/// Zero inside `inner`, full deflection beyond `outer`, linear in between.
/// NaN maps to zero.
pub fn dual_deadzone(value: f64, inner: f64, outer: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    let magnitude = value.abs().min(1.0);
    let sign = value.signum();

    if magnitude <= inner {
        return 0.0;
    }
    if magnitude >= outer || outer <= inner {
        return sign;
    }
    sign * (magnitude - inner) / (outer - inner)
}

/// Three-zone response curve.
///
/// Magnitudes up to 0.4 get exponent 0.7 (finer control near center),
/// 0.4-0.8 stay linear, and above 0.8 get exponent 1.3. Each zone is
/// normalized to [0, 1] before the exponent, so the curve is continuous
/// at both boundaries. Sign is carried separately.
pub fn multi_stage_curve(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    let magnitude = value.abs().min(1.0);
    let sign = value.signum();

    let shaped = if magnitude <= PRECISION_ZONE_END {
        PRECISION_ZONE_END * (magnitude / PRECISION_ZONE_END).powf(PRECISION_EXPONENT)
    } else if magnitude <= LINEAR_ZONE_END {
        magnitude
    } else {
        let width = 1.0 - LINEAR_ZONE_END;
        LINEAR_ZONE_END + width * ((magnitude - LINEAR_ZONE_END) / width).powf(ACCELERATION_EXPONENT)
    };

    sign * shaped
}

/// Map an axis byte to [-1, 1] (128 is 0; 0 clamps to -1)
pub fn normalize(value: u8) -> f64 {
    ((f64::from(value) - f64::from(AXIS_CENTER)) / 127.0).clamp(-1.0, 1.0)
}

/// Shaping parameters for one session
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapingSettings {
    /// Integer stick deadzone (0-127)
    pub stick_deadzone: u8,
    /// Integer trigger deadzone
    pub trigger_deadzone: u8,
    pub inner_deadzone: f64,
    pub outer_deadzone: f64,
    pub response_curve: bool,
}

impl Default for ShapingSettings {
    fn default() -> Self {
        Self {
            stick_deadzone: 12,
            trigger_deadzone: 0,
            inner_deadzone: 0.10,
            outer_deadzone: 0.95,
            response_curve: true,
        }
    }
}

impl From<&crate::mapping::config::Settings> for ShapingSettings {
    fn from(s: &crate::mapping::config::Settings) -> Self {
        Self {
            stick_deadzone: s.stick_deadzone,
            trigger_deadzone: s.trigger_deadzone,
            inner_deadzone: s.inner_deadzone,
            outer_deadzone: s.outer_deadzone,
            response_curve: s.response_curve,
        }
    }
}

fn shape_axis(value: u8, settings: &ShapingSettings) -> f64 {
    let v = dual_deadzone(normalize(value), settings.inner_deadzone, settings.outer_deadzone);
    if settings.response_curve {
        multi_stage_curve(v)
    } else {
        v
    }
}

fn shape_stick(stick: StickPosition, settings: &ShapingSettings) -> StickVector {
    StickVector {
        x: shape_axis(stick.x, settings),
        y: shape_axis(stick.y, settings),
    }
}

fn shape_trigger(value: u8, settings: &ShapingSettings) -> f64 {
    f64::from(trigger_deadzone(value, settings.trigger_deadzone)) / 255.0
}

/// Shape every analog input of a state snapshot
pub fn shape(state: &ControllerState, settings: &ShapingSettings) -> ShapedAxes {
    ShapedAxes {
        left: shape_stick(state.left_stick, settings),
        right: shape_stick(state.right_stick, settings),
        left_trigger: shape_trigger(state.left_trigger, settings),
        right_trigger: shape_trigger(state.right_trigger, settings),
    }
}
