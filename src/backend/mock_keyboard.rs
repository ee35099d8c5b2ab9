//! Mock keyboard backend for testing.
//!
//! Logs keyboard events instead of sending them to the OS, and records them
//! so tests can assert on exactly what would have been injected.

use crate::backend::{BackendError, Key, KeyboardBackend};
use log::info;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    Down(Key),
    Up(Key),
}

/// Mock keyboard backend. Clones share one event log.
#[derive(Clone, Debug, Default)]
pub struct MockKeyboardBackend {
    events: Arc<Mutex<Vec<KeyEvent>>>,
}

impl MockKeyboardBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, event: KeyEvent) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event);
    }

    /// Every event recorded so far, oldest first
    pub fn events(&self) -> Vec<KeyEvent> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Keys whose last recorded event was a key down
    pub fn keys_down(&self) -> BTreeSet<Key> {
        let mut down = BTreeSet::new();
        for event in self.events() {
            match event {
                KeyEvent::Down(k) => {
                    down.insert(k);
                }
                KeyEvent::Up(k) => {
                    down.remove(&k);
                }
            }
        }
        down
    }

    pub fn clear(&self) {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

impl KeyboardBackend for MockKeyboardBackend {
    fn key_down(&self, key: Key) -> Result<(), BackendError> {
        info!("[MOCK KEYBOARD] Key DOWN: {}", key);
        self.record(KeyEvent::Down(key));
        Ok(())
    }

    fn key_up(&self, key: Key) -> Result<(), BackendError> {
        info!("[MOCK KEYBOARD] Key UP: {}", key);
        self.record(KeyEvent::Up(key));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_keyboard_records_events() {
        let kb = MockKeyboardBackend::new();
        kb.key_down(Key::W).unwrap();
        kb.key_press(Key::Space).unwrap();

        assert_eq!(
            kb.events(),
            vec![
                KeyEvent::Down(Key::W),
                KeyEvent::Down(Key::Space),
                KeyEvent::Up(Key::Space)
            ]
        );
        assert_eq!(kb.keys_down().into_iter().collect::<Vec<_>>(), vec![Key::W]);

        kb.key_up(Key::W).unwrap();
        assert!(kb.keys_down().is_empty());
    }

    #[test]
    fn clones_share_the_log() {
        let kb = MockKeyboardBackend::new();
        let other = kb.clone();
        other.key_down(Key::A).unwrap();
        assert_eq!(kb.events(), vec![KeyEvent::Down(Key::A)]);
        kb.clear();
        assert!(other.events().is_empty());
    }
}
