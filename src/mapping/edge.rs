//! Edge detection between consecutive controller snapshots.
//!
//! [`EdgeTracker`] is the only owner of the "previous state". Each call to
//! [`EdgeTracker::update`] swaps in the new snapshot and returns a lazy
//! iterator over what changed: buttons first (in [`Button::ALL`] order),
//! then the D-pad.

use crate::bigben::{Button, ControllerState, Dpad};

/// One discrete input transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Edge {
    ButtonPressed(Button),
    ButtonReleased(Button),
    /// (from, to); only emitted when the resolved direction changes
    DpadChanged(Dpad, Dpad),
}

/// Tracks the previous snapshot and reports transitions
#[derive(Debug, Clone, Default)]
pub struct EdgeTracker {
    previous: ControllerState,
}

impl EdgeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare `current` against the stored snapshot, then store `current`.
    ///
    /// The returned iterator owns copies of both snapshots, so the tracker
    /// is already up to date whether or not the edges are consumed.
    pub fn update(&mut self, current: ControllerState) -> Edges {
        let previous = std::mem::replace(&mut self.previous, current);
        Edges {
            previous,
            current,
            next_button: 0,
            dpad_checked: false,
        }
    }

    /// Forget everything: the next update compares against a neutral state
    pub fn reset(&mut self) {
        self.previous = ControllerState::neutral();
    }

    pub fn previous(&self) -> &ControllerState {
        &self.previous
    }
}

/// Lazy sequence of edges for one update
#[derive(Debug, Clone)]
pub struct Edges {
    previous: ControllerState,
    current: ControllerState,
    next_button: usize,
    dpad_checked: bool,
}

impl Iterator for Edges {
    type Item = Edge;

    fn next(&mut self) -> Option<Edge> {
        while let Some(&button) = Button::ALL.get(self.next_button) {
            self.next_button += 1;
            let was = self.previous.buttons.is_pressed(button);
            let is = self.current.buttons.is_pressed(button);
            match (was, is) {
                (false, true) => return Some(Edge::ButtonPressed(button)),
                (true, false) => return Some(Edge::ButtonReleased(button)),
                _ => {}
            }
        }

        if !self.dpad_checked {
            self.dpad_checked = true;
            if self.previous.dpad != self.current.dpad {
                return Some(Edge::DpadChanged(self.previous.dpad, self.current.dpad));
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bigben::Buttons;

    fn with_buttons(buttons: &[Button]) -> ControllerState {
        let mut state = ControllerState::neutral();
        for b in buttons {
            state.buttons.set(*b, true);
        }
        state
    }

    #[test]
    fn press_then_release() {
        let mut tracker = EdgeTracker::new();
        let edges: Vec<_> = tracker.update(with_buttons(&[Button::A])).collect();
        assert_eq!(edges, vec![Edge::ButtonPressed(Button::A)]);

        let edges: Vec<_> = tracker.update(ControllerState::neutral()).collect();
        assert_eq!(edges, vec![Edge::ButtonReleased(Button::A)]);
    }

    #[test]
    fn same_state_twice_yields_nothing() {
        let mut tracker = EdgeTracker::new();
        let state = with_buttons(&[Button::X, Button::Start]);
        assert_eq!(tracker.update(state).count(), 2);
        assert_eq!(tracker.update(state).count(), 0);
    }

    #[test]
    fn buttons_come_before_dpad_in_fixed_order() {
        let mut tracker = EdgeTracker::new();
        tracker.update(with_buttons(&[Button::Home]));

        let mut next = with_buttons(&[Button::B, Button::A]);
        next.dpad = Dpad::NE;
        let edges: Vec<_> = tracker.update(next).collect();
        assert_eq!(
            edges,
            vec![
                Edge::ButtonPressed(Button::A),
                Edge::ButtonPressed(Button::B),
                Edge::ButtonReleased(Button::Home),
                Edge::DpadChanged(Dpad::Neutral, Dpad::NE),
            ]
        );
    }

    #[test]
    fn dpad_only_reports_resolved_changes() {
        let mut tracker = EdgeTracker::new();
        let mut state = ControllerState::neutral();
        state.dpad = Dpad::from_hat(9);
        // Noise that resolves to neutral is not a change
        assert_eq!(tracker.update(state).count(), 0);

        state.dpad = Dpad::from_hat(2);
        assert_eq!(
            tracker.update(state).collect::<Vec<_>>(),
            vec![Edge::DpadChanged(Dpad::Neutral, Dpad::E)]
        );
    }

    #[test]
    fn state_is_replaced_even_if_edges_are_dropped() {
        let mut tracker = EdgeTracker::new();
        let state = with_buttons(&[Button::RB]);
        drop(tracker.update(state));
        assert_eq!(tracker.previous(), &state);
        assert_eq!(tracker.update(state).count(), 0);
    }

    #[test]
    fn reset_forgets_held_inputs() {
        let mut tracker = EdgeTracker::new();
        let state = with_buttons(&[Button::LB]);
        tracker.update(state).for_each(drop);
        tracker.reset();
        assert_eq!(tracker.previous().buttons, Buttons::NONE);
        // After a reset the still-held button is reported as a fresh press
        assert_eq!(
            tracker.update(state).collect::<Vec<_>>(),
            vec![Edge::ButtonPressed(Button::LB)]
        );
    }

    #[test]
    fn axis_changes_are_not_edges() {
        let mut tracker = EdgeTracker::new();
        let mut state = ControllerState::neutral();
        state.left_stick.x = 255;
        state.right_trigger = 200;
        assert_eq!(tracker.update(state).count(), 0);
    }
}
