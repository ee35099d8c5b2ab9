//! Output sink interface
//!
//! The supervisor hands every decoded cycle to one sink. Implementations
//! are [`HidOutput`](crate::mapping::hid::HidOutput) for formatted gamepad
//! reports and [`KeyMouseEmulator`](crate::mapping::executor::KeyMouseEmulator)
//! for synthetic keyboard/mouse input.

use crate::bigben::{ControllerState, ShapedAxes};
use crate::mapping::edge::Edge;

/// Everything a sink sees for one poll cycle
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub state: ControllerState,
    pub shaped: ShapedAxes,
    /// Edges since the previous frame, in emission order
    pub edges: Vec<Edge>,
}

pub trait OutputSink {
    /// Consume one poll cycle
    fn consume(&mut self, frame: &Frame);

    /// Release everything this sink is holding on the host side.
    /// Called on disconnect and on shutdown.
    fn release_all(&mut self);
}

impl<S: OutputSink + ?Sized> OutputSink for Box<S> {
    fn consume(&mut self, frame: &Frame) {
        (**self).consume(frame)
    }

    fn release_all(&mut self) {
        (**self).release_all()
    }
}
