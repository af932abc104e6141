//! Tap handling for bound buttons.

use crate::config::UiState;
use crate::controls::input::KeySink;
use crate::controls::keys::KeyCode;
use crate::controls::widget::{ButtonControl, ButtonId};
use std::collections::HashSet;
use tracing::debug;

/// Requests a tap makes beyond its key events.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Activation {
    pub haptic: bool,
    pub cursor_click: bool,
    /// New latch state for toggle keys, `None` for momentary keys.
    pub latched: Option<bool>,
}

/// Tracks which toggle buttons are currently held down.
#[derive(Debug, Default)]
pub struct ButtonInput {
    latched: HashSet<ButtonId>,
}

impl ButtonInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_latched(&self, id: ButtonId) -> bool {
        self.latched.contains(&id)
    }

    pub fn activate(
        &mut self,
        button: &ButtonControl,
        ui: &UiState,
        sink: &mut dyn KeySink,
    ) -> Activation {
        let key = button.key;
        let mut activation = Activation::default();

        if key.is_toggle() {
            let now_latched = self.latched.insert(button.id);
            if now_latched {
                sink.key_down(key);
            } else {
                self.latched.remove(&button.id);
                sink.key_up(key);
            }
            activation.latched = Some(now_latched);
        } else {
            sink.key_down(key);
            sink.key_up(key);
        }

        if key == KeyCode::Z {
            // Z doubles as the interact key: click with the custom cursor, Enter otherwise.
            if ui.custom_cursor_enabled {
                activation.cursor_click = true;
            } else {
                sink.key_down(KeyCode::ENTER);
                sink.key_up(KeyCode::ENTER);
            }
        }
        if (key == KeyCode::Z || key == KeyCode::E) && ui.vibration_enabled {
            activation.haptic = true;
        }

        debug!("Button {} activated: {:?}", button.id, activation);
        activation
    }

    /// Lets go of every latched toggle, e.g. when the overlay is hidden.
    pub fn release_latched(&mut self, buttons: &[ButtonControl], sink: &mut dyn KeySink) {
        for button in buttons.iter().filter(|b| self.latched.contains(&b.id)) {
            sink.key_up(button.key);
        }
        self.latched.clear();
    }

    /// Drops latch state for a button that no longer exists.
    pub fn forget(&mut self, id: ButtonId) {
        self.latched.remove(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controls::input::{KeyEvent, KeyQueue};

    fn button(id: u32, key: KeyCode) -> ButtonControl {
        ButtonControl::with_defaults(ButtonId::new(id).unwrap(), key)
    }

    #[test]
    fn momentary_keys_pulse() {
        let mut input = ButtonInput::new();
        let mut queue = KeyQueue::new();
        let activation = input.activate(&button(1, KeyCode::F1), &UiState::default(), &mut queue);

        assert_eq!(activation, Activation::default());
        assert_eq!(
            queue.drain(),
            vec![KeyEvent::Down(KeyCode::F1), KeyEvent::Up(KeyCode::F1)]
        );
    }

    #[test]
    fn shift_toggles_between_taps() {
        let mut input = ButtonInput::new();
        let mut queue = KeyQueue::new();
        let shift = button(2, KeyCode::SHIFT_RIGHT);
        let ui = UiState::default();

        assert_eq!(input.activate(&shift, &ui, &mut queue).latched, Some(true));
        assert!(input.is_latched(shift.id));
        assert_eq!(queue.drain(), vec![KeyEvent::Down(KeyCode::SHIFT_RIGHT)]);

        assert_eq!(input.activate(&shift, &ui, &mut queue).latched, Some(false));
        assert!(!input.is_latched(shift.id));
        assert_eq!(queue.drain(), vec![KeyEvent::Up(KeyCode::SHIFT_RIGHT)]);
    }

    #[test]
    fn interact_key_sends_enter_or_clicks() {
        let mut input = ButtonInput::new();
        let mut queue = KeyQueue::new();
        let z = button(3, KeyCode::Z);

        let activation = input.activate(&z, &UiState::default(), &mut queue);
        assert!(activation.haptic);
        assert!(!activation.cursor_click);
        assert_eq!(
            queue.drain(),
            vec![
                KeyEvent::Down(KeyCode::Z),
                KeyEvent::Up(KeyCode::Z),
                KeyEvent::Down(KeyCode::ENTER),
                KeyEvent::Up(KeyCode::ENTER),
            ]
        );

        let ui = UiState {
            custom_cursor_enabled: true,
            vibration_enabled: false,
            ..UiState::default()
        };
        let activation = input.activate(&z, &ui, &mut queue);
        assert!(activation.cursor_click);
        assert!(!activation.haptic);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn hiding_releases_latched_toggles() {
        let mut input = ButtonInput::new();
        let mut queue = KeyQueue::new();
        let buttons = vec![button(1, KeyCode::SHIFT_LEFT), button(2, KeyCode::E)];
        input.activate(&buttons[0], &UiState::default(), &mut queue);
        input.activate(&buttons[1], &UiState::default(), &mut queue);
        queue.drain();

        input.release_latched(&buttons, &mut queue);
        assert_eq!(queue.drain(), vec![KeyEvent::Up(KeyCode::SHIFT_LEFT)]);
        assert!(!input.is_latched(buttons[0].id));
    }
}
