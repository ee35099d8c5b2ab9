//! Mock mouse backend for testing.
//!
//! Logs mouse events instead of sending them to the OS, and records them
//! so tests can assert on exactly what would have been injected.

use crate::backend::{BackendError, MouseBackend, MouseButton};
use log::info;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseEvent {
    Move { dx: i32, dy: i32 },
    Down(MouseButton),
    Up(MouseButton),
}

/// Mock mouse backend. Clones share one event log, so a clone handed to
/// the flush thread records into the same place as the emulator's copy.
#[derive(Clone, Debug, Default)]
pub struct MockMouseBackend {
    events: Arc<Mutex<Vec<MouseEvent>>>,
}

impl MockMouseBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, event: MouseEvent) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event);
    }

    /// Every event recorded so far, oldest first
    pub fn events(&self) -> Vec<MouseEvent> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Sum of all relative moves
    pub fn total_motion(&self) -> (i64, i64) {
        self.events()
            .iter()
            .fold((0, 0), |(x, y), event| match event {
                MouseEvent::Move { dx, dy } => (x + *dx as i64, y + *dy as i64),
                _ => (x, y),
            })
    }

    /// Number of relative move calls
    pub fn move_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, MouseEvent::Move { .. }))
            .count()
    }

    /// Buttons whose last recorded event was a button down
    pub fn buttons_down(&self) -> BTreeSet<MouseButton> {
        let mut down = BTreeSet::new();
        for event in self.events() {
            match event {
                MouseEvent::Down(b) => {
                    down.insert(b);
                }
                MouseEvent::Up(b) => {
                    down.remove(&b);
                }
                MouseEvent::Move { .. } => {}
            }
        }
        down
    }
}

impl MouseBackend for MockMouseBackend {
    fn move_relative(&self, dx: i32, dy: i32) -> Result<(), BackendError> {
        info!("[MOCK MOUSE] Move relative: dx={}, dy={}", dx, dy);
        self.record(MouseEvent::Move { dx, dy });
        Ok(())
    }

    fn button_down(&self, button: MouseButton) -> Result<(), BackendError> {
        info!("[MOCK MOUSE] Button DOWN: {}", button.as_str());
        self.record(MouseEvent::Down(button));
        Ok(())
    }

    fn button_up(&self, button: MouseButton) -> Result<(), BackendError> {
        info!("[MOCK MOUSE] Button UP: {}", button.as_str());
        self.record(MouseEvent::Up(button));
        Ok(())
    }
}
