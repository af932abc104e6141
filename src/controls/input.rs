//! Boundary towards the native engine's input queue.

use crate::controls::keys::KeyCode;
use std::collections::VecDeque;
use tracing::trace;

/// Receiver of key transitions. The native side exposes exactly these two
/// entry points and expects them in order.
pub trait KeySink {
    fn key_down(&mut self, key: KeyCode);
    fn key_up(&mut self, key: KeyCode);

    /// Called once a thumbstick gesture has ended and its keys are released.
    fn gesture_released(&mut self) {}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyEvent {
    Down(KeyCode),
    Up(KeyCode),
}

/// Ordered buffer of key events waiting to be handed to the engine.
#[derive(Debug, Default)]
pub struct KeyQueue {
    events: VecDeque<KeyEvent>,
    gestures_released: usize,
}

impl KeyQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&mut self) -> Vec<KeyEvent> {
        self.events.drain(..).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn gestures_released(&self) -> usize {
        self.gestures_released
    }
}

impl KeySink for KeyQueue {
    fn key_down(&mut self, key: KeyCode) {
        trace!("key down {}", key);
        self.events.push_back(KeyEvent::Down(key));
    }

    fn key_up(&mut self, key: KeyCode) {
        trace!("key up {}", key);
        self.events.push_back(KeyEvent::Up(key));
    }

    fn gesture_released(&mut self) {
        self.gestures_released += 1;
    }
}
