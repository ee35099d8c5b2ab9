//! Standard HID gamepad output.
//!
//! [`HidReportBuilder`] turns a canonical state into the 10-byte input
//! report described by [`HID_REPORT_DESCRIPTOR`]; [`HidOutput`] is the
//! output sink that builds one report per poll cycle and hands it to a
//! [`ReportDelivery`].

use crate::backend::ReportDelivery;
use crate::bigben::constants::{AXIS_CENTER, BUTTON_MASK, HAT_NEUTRAL};
use crate::bigben::ControllerState;
use crate::mapping::shaper::{deadzone, trigger_deadzone};
use crate::mapping::sink::{Frame, OutputSink};
use log::{debug, warn};
use std::time::Instant;

pub const HID_REPORT_ID: u8 = 0x01;
pub const HID_REPORT_SIZE: usize = 10;

/// Gamepad report descriptor: 16 buttons, X/Y, Rx/Ry, Z/Rz (triggers),
/// a 4-bit hat switch with null state, and 4 bits of padding.
#[rustfmt::skip]
pub const HID_REPORT_DESCRIPTOR: [u8; 79] = [
    0x05, 0x01,        // Usage Page (Generic Desktop)
    0x09, 0x05,        // Usage (Game Pad)
    0xA1, 0x01,        // Collection (Application)
    0x85, HID_REPORT_ID, //   Report ID

    0x05, 0x09,        //   Usage Page (Button)
    0x19, 0x01,        //   Usage Minimum (1)
    0x29, 0x10,        //   Usage Maximum (16)
    0x15, 0x00,        //   Logical Minimum (0)
    0x25, 0x01,        //   Logical Maximum (1)
    0x75, 0x01,        //   Report Size (1)
    0x95, 0x10,        //   Report Count (16)
    0x81, 0x02,        //   Input (Data, Var, Abs)

    0x05, 0x01,        //   Usage Page (Generic Desktop)
    0x09, 0x30,        //   Usage (X)
    0x09, 0x31,        //   Usage (Y)
    0x15, 0x00,        //   Logical Minimum (0)
    0x26, 0xFF, 0x00,  //   Logical Maximum (255)
    0x75, 0x08,        //   Report Size (8)
    0x95, 0x02,        //   Report Count (2)
    0x81, 0x02,        //   Input (Data, Var, Abs)

    0x09, 0x33,        //   Usage (Rx)
    0x09, 0x34,        //   Usage (Ry)
    0x81, 0x02,        //   Input (Data, Var, Abs)

    0x09, 0x32,        //   Usage (Z)
    0x09, 0x35,        //   Usage (Rz)
    0x81, 0x02,        //   Input (Data, Var, Abs)

    0x09, 0x39,        //   Usage (Hat switch)
    0x15, 0x00,        //   Logical Minimum (0)
    0x25, 0x07,        //   Logical Maximum (7)
    0x35, 0x00,        //   Physical Minimum (0)
    0x46, 0x3B, 0x01,  //   Physical Maximum (315)
    0x65, 0x14,        //   Unit (Degrees)
    0x75, 0x04,        //   Report Size (4)
    0x95, 0x01,        //   Report Count (1)
    0x81, 0x42,        //   Input (Data, Var, Abs, Null State)

    0x75, 0x04,        //   Report Size (4)
    0x95, 0x01,        //   Report Count (1)
    0x81, 0x03,        //   Input (Const)
    0xC0,              // End Collection
];

/// One gamepad input report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HidReport {
    /// 13 active bits; the top 3 are always zero
    pub buttons: u16,
    pub left_x: u8,
    pub left_y: u8,
    pub right_x: u8,
    pub right_y: u8,
    pub left_trigger: u8,
    pub right_trigger: u8,
    /// 0-7 clockwise from north, 8 for neutral
    pub hat: u8,
}

impl HidReport {
    /// Centered sticks, nothing pressed
    pub const NEUTRAL: Self = Self {
        buttons: 0,
        left_x: AXIS_CENTER,
        left_y: AXIS_CENTER,
        right_x: AXIS_CENTER,
        right_y: AXIS_CENTER,
        left_trigger: 0,
        right_trigger: 0,
        hat: HAT_NEUTRAL,
    };

    /// Wire bytes: `[id, buttons_lo, buttons_hi, lx, ly, rx, ry, lt, rt, hat]`
    pub fn to_bytes(&self) -> [u8; HID_REPORT_SIZE] {
        let [lo, hi] = self.buttons.to_le_bytes();
        [
            HID_REPORT_ID,
            lo,
            hi,
            self.left_x,
            self.left_y,
            self.right_x,
            self.right_y,
            self.left_trigger,
            self.right_trigger,
            self.hat,
        ]
    }
}

impl Default for HidReport {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

/// Pure state-to-report translation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HidReportBuilder {
    pub stick_deadzone: u8,
    pub trigger_deadzone: u8,
    /// Mirror both Y axes about center; needed when the source layout
    /// reports up as positive (legacy)
    pub invert_y: bool,
}

impl HidReportBuilder {
    pub fn new(stick_deadzone: u8, trigger_deadzone: u8) -> Self {
        Self {
            stick_deadzone,
            trigger_deadzone,
            invert_y: false,
        }
    }

    pub fn with_invert_y(mut self, invert_y: bool) -> Self {
        self.invert_y = invert_y;
        self
    }

    pub fn build(&self, state: &ControllerState) -> HidReport {
        let stick = |v: u8| deadzone(v, self.stick_deadzone);
        let stick_y = |v: u8| {
            let v = stick(v);
            if self.invert_y {
                mirror_axis(v)
            } else {
                v
            }
        };
        HidReport {
            buttons: state.buttons.bits() & BUTTON_MASK,
            left_x: stick(state.left_stick.x),
            left_y: stick_y(state.left_stick.y),
            right_x: stick(state.right_stick.x),
            right_y: stick_y(state.right_stick.y),
            left_trigger: trigger_deadzone(state.left_trigger, self.trigger_deadzone),
            right_trigger: trigger_deadzone(state.right_trigger, self.trigger_deadzone),
            hat: state.dpad.hat(),
        }
    }
}

/// Reflect an axis byte about center; 128 stays 128, 0 saturates to 255
fn mirror_axis(v: u8) -> u8 {
    (2 * AXIS_CENTER as u16).saturating_sub(v as u16).min(255) as u8
}

/// Output sink that delivers one HID report per poll cycle
pub struct HidOutput<D: ReportDelivery> {
    builder: HidReportBuilder,
    delivery: D,
    epoch: Instant,
    last: Option<HidReport>,
    failures: u64,
}

impl<D: ReportDelivery> HidOutput<D> {
    pub fn new(builder: HidReportBuilder, delivery: D) -> Self {
        Self {
            builder,
            delivery,
            epoch: Instant::now(),
            last: None,
            failures: 0,
        }
    }

    pub fn delivery(&self) -> &D {
        &self.delivery
    }

    /// Most recently delivered report
    pub fn last_report(&self) -> Option<HidReport> {
        self.last
    }

    /// Deliveries the host rejected
    pub fn failures(&self) -> u64 {
        self.failures
    }

    fn deliver(&mut self, report: HidReport) {
        let timestamp_us = self.epoch.elapsed().as_micros() as u64;
        match self.delivery.deliver_input_report(timestamp_us, &report.to_bytes()) {
            Ok(()) => self.last = Some(report),
            Err(e) => {
                self.failures += 1;
                // Only the first failure is loud; the rest would repeat every cycle
                if self.failures == 1 {
                    warn!("Failed to deliver HID report: {}", e);
                } else {
                    debug!("Failed to deliver HID report: {}", e);
                }
            }
        }
    }
}

impl<D: ReportDelivery> OutputSink for HidOutput<D> {
    fn consume(&mut self, frame: &Frame) {
        let report = self.builder.build(&frame.state);
        self.deliver(report);
    }

    fn release_all(&mut self) {
        debug!("Sending neutral HID report");
        self.deliver(HidReport::NEUTRAL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockReportDelivery;
    use crate::bigben::{Button, Buttons, Dpad, ShapedAxes, StickPosition};

    #[test]
    fn descriptor_is_well_formed() {
        assert_eq!(HID_REPORT_DESCRIPTOR.len(), 79);
        assert_eq!(&HID_REPORT_DESCRIPTOR[..4], &[0x05, 0x01, 0x09, 0x05]);
        assert_eq!(HID_REPORT_DESCRIPTOR[HID_REPORT_DESCRIPTOR.len() - 1], 0xC0);
    }

    #[test]
    fn neutral_state_builds_neutral_report() {
        let builder = HidReportBuilder::new(12, 0);
        assert_eq!(builder.build(&ControllerState::neutral()), HidReport::NEUTRAL);
        assert_eq!(
            HidReport::NEUTRAL.to_bytes(),
            [0x01, 0, 0, 128, 128, 128, 128, 0, 0, 8]
        );
    }

    #[test]
    fn buttons_map_one_to_one() {
        let builder = HidReportBuilder::default();
        let mut state = ControllerState::neutral();
        state.buttons = Buttons::NONE.with(Button::A).with(Button::Home);
        let report = builder.build(&state);
        assert_eq!(report.buttons, Button::A.bit() | Button::Home.bit());
        assert_eq!(&report.to_bytes()[1..3], &report.buttons.to_le_bytes()[..]);
    }

    #[test]
    fn reserved_button_bits_are_masked() {
        let builder = HidReportBuilder::default();
        let mut state = ControllerState::neutral();
        state.buttons = Buttons::from_bits(0xFFFF);
        assert_eq!(builder.build(&state).buttons, 0x1FFF);
    }

    #[test]
    fn dpad_maps_to_hat() {
        let builder = HidReportBuilder::default();
        let mut state = ControllerState::neutral();
        for (dpad, hat) in [
            (Dpad::N, 0),
            (Dpad::NE, 1),
            (Dpad::E, 2),
            (Dpad::SE, 3),
            (Dpad::S, 4),
            (Dpad::SW, 5),
            (Dpad::W, 6),
            (Dpad::NW, 7),
            (Dpad::Neutral, 8),
        ] {
            state.dpad = dpad;
            assert_eq!(builder.build(&state).hat, hat);
        }
    }

    #[test]
    fn axes_pass_through_deadzones() {
        let builder = HidReportBuilder::new(10, 20);
        let mut state = ControllerState::neutral();
        state.left_stick = StickPosition::new(133, 255);
        state.left_trigger = 15;
        state.right_trigger = 255;
        let report = builder.build(&state);
        assert_eq!(report.left_x, 128);
        assert_eq!(report.left_y, 255);
        assert_eq!(report.left_trigger, 0);
        assert_eq!(report.right_trigger, 255);

        // Zero thresholds copy raw bytes
        let raw = HidReportBuilder::new(0, 0).build(&state);
        assert_eq!(raw.left_x, 133);
        assert_eq!(raw.left_trigger, 15);
    }

    #[test]
    fn invert_y_mirrors_both_sticks_about_center() {
        let builder = HidReportBuilder::new(0, 0).with_invert_y(true);
        let mut state = ControllerState::neutral();
        assert_eq!(builder.build(&state), HidReport::NEUTRAL);

        // Legacy stick pushed up reads high; the host expects low
        state.left_stick = StickPosition::new(200, 255);
        state.right_stick = StickPosition::new(128, 0);
        let report = builder.build(&state);
        assert_eq!(report.left_x, 200);
        assert_eq!(report.left_y, 1);
        assert_eq!(report.right_y, 255);
        assert_eq!(HidReportBuilder::new(0, 0).build(&state).left_y, 255);
    }

    #[test]
    fn output_delivers_every_cycle_and_neutral_on_release() {
        let delivery = MockReportDelivery::new();
        let mut output = HidOutput::new(HidReportBuilder::default(), delivery.clone());

        let mut state = ControllerState::neutral();
        state.buttons = Buttons::NONE.with(Button::B);
        let frame = Frame { state, shaped: ShapedAxes::default(), edges: Vec::new() };
        output.consume(&frame);
        output.consume(&frame);
        output.release_all();

        let reports = delivery.reports();
        assert_eq!(reports.len(), 3);
        assert_eq!(reports[0].bytes[1], Button::B.bit() as u8);
        assert_eq!(reports[0].bytes, reports[1].bytes);
        assert!(reports[1].timestamp_us >= reports[0].timestamp_us);
        assert_eq!(reports[2].bytes, HidReport::NEUTRAL.to_bytes().to_vec());
        assert_eq!(output.last_report(), Some(HidReport::NEUTRAL));
    }
}
