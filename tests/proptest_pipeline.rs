//! Property-based tests for the decode/shape/edge pipeline.
//!
//! Uses proptest to check the invariants that must hold for any input:
//! decoding never panics, shaping stays in range and is monotonic, and the
//! edge tracker never reports a transition that did not happen.

use bigben_bridge::bigben::{decode, Button, Buttons, ControllerState, Dpad, Layout};
use bigben_bridge::mapping::shaper::{
    deadzone, dual_deadzone, multi_stage_curve, trigger_deadzone, LINEAR_ZONE_END,
    PRECISION_ZONE_END,
};
use bigben_bridge::mapping::{Edge, EdgeTracker};
use proptest::prelude::*;

fn arb_layout() -> impl Strategy<Value = Layout> {
    prop_oneof![Just(Layout::Legacy), Just(Layout::Canonical)]
}

fn arb_state() -> impl Strategy<Value = ControllerState> {
    (any::<u16>(), 0u8..=12).prop_map(|(bits, hat)| {
        let mut state = ControllerState::neutral();
        state.buttons = Buttons::from_bits(bits & 0x1FFF);
        state.dpad = Dpad::from_hat(hat);
        state
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Arbitrary bytes either decode or return an error; never panic.
    #[test]
    fn prop_decode_never_panics(
        data in proptest::collection::vec(any::<u8>(), 0..80),
        layout in arb_layout(),
    ) {
        let result = decode(&data, layout);
        if data.len() < layout.min_size() {
            prop_assert!(result.is_err());
        }
    }

    /// Reserved button bits never survive a canonical decode.
    #[test]
    fn prop_canonical_buttons_masked(mut data in proptest::collection::vec(any::<u8>(), 64)) {
        data[0] = 0x01;
        let state = decode(&data, Layout::Canonical)
            .map_err(|e| TestCaseError::fail(format!("{e:?}")))?;
        prop_assert_eq!(state.buttons.bits() & !0x1FFF, 0);
    }

    /// Same-side values keep their order through the deadzone.
    #[test]
    fn prop_deadzone_monotonic(t in 0u8..=127, a in any::<u8>(), b in any::<u8>()) {
        let (v1, v2) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(deadzone(v1, t) <= deadzone(v2, t),
            "deadzone({v1},{t})={} > deadzone({v2},{t})={}", deadzone(v1, t), deadzone(v2, t));
    }

    /// The deadzone never flips which side of center a value is on.
    #[test]
    fn prop_deadzone_preserves_sign(t in 0u8..=127, v in any::<u8>()) {
        let out = deadzone(v, t);
        if v > 128 {
            prop_assert!(out >= 128);
        } else if v < 128 {
            prop_assert!(out <= 128);
        } else {
            prop_assert_eq!(out, 128);
        }
    }

    /// Triggers below the threshold read as released, and full pull stays full.
    #[test]
    fn prop_trigger_deadzone(t in any::<u8>(), v in any::<u8>()) {
        let out = trigger_deadzone(v, t);
        if v < t {
            prop_assert_eq!(out, 0);
        }
        prop_assert_eq!(trigger_deadzone(255, t), 255);
    }

    /// Shaped values stay within [-1, 1] and keep their sign.
    #[test]
    fn prop_shaping_in_range(v in -2.0f64..2.0, inner in 0.0f64..0.45, outer in 0.55f64..1.0) {
        let dz = dual_deadzone(v, inner, outer);
        prop_assert!((-1.0..=1.0).contains(&dz));
        let curved = multi_stage_curve(dz);
        prop_assert!((-1.0..=1.0).contains(&curved));
        prop_assert!(curved == 0.0 || curved.signum() == v.signum());
    }

    /// The response curve is non-decreasing.
    #[test]
    fn prop_curve_monotonic(a in -1.0f64..=1.0, b in -1.0f64..=1.0) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(multi_stage_curve(lo) <= multi_stage_curve(hi) + 1e-12);
    }

    /// Edges never outnumber the transitions that actually happened.
    #[test]
    fn prop_no_duplicate_edges(states in proptest::collection::vec(arb_state(), 1..40)) {
        let mut tracker = EdgeTracker::new();
        let mut previous = ControllerState::neutral();

        for state in states {
            let edges: Vec<Edge> = tracker.update(state).collect();

            for button in Button::ALL {
                let was = previous.buttons.is_pressed(button);
                let is = state.buttons.is_pressed(button);
                let pressed = edges.iter().filter(|e| **e == Edge::ButtonPressed(button)).count();
                let released = edges.iter().filter(|e| **e == Edge::ButtonReleased(button)).count();
                prop_assert_eq!(pressed, usize::from(!was && is));
                prop_assert_eq!(released, usize::from(was && !is));
            }

            let dpad_edges = edges.iter().filter(|e| matches!(e, Edge::DpadChanged(..))).count();
            prop_assert_eq!(dpad_edges, usize::from(previous.dpad != state.dpad));

            previous = state;
        }
    }
}

#[test]
fn curve_is_continuous_at_zone_edges() {
    for edge in [PRECISION_ZONE_END, LINEAR_ZONE_END] {
        let below = multi_stage_curve(edge - 1e-12);
        let at = multi_stage_curve(edge);
        let above = multi_stage_curve(edge + 1e-12);
        assert!((at - below).abs() < 1e-9, "jump below {edge}");
        assert!((above - at).abs() < 1e-9, "jump above {edge}");
    }
}
