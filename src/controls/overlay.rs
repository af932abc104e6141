//! Routes surface-level pointer events to the control under the finger.
//!
//! In play mode a gesture drives the thumbstick or taps a button. In edit mode
//! the same gesture drags the control and commits its position on release.
//! Only one pointer is tracked at a time.

use crate::config::{AppConfig, StickSettings, UiState};
use crate::controls::buttons::{Activation, ButtonInput};
use crate::controls::input::{KeyEvent, KeyQueue, KeySink};
use crate::controls::keys::KeyCode;
use crate::controls::layout::{LayoutEngine, LayoutError};
use crate::controls::thumbstick::{PointerAction, PointerEvent, StickMachine};
use crate::controls::widget::{ButtonControl, ButtonId, Control, ControlTarget, ResizeStep};
use egui::Pos2;
use tracing::{debug, info};

#[derive(Clone, Copy, Debug, PartialEq)]
enum ActiveGesture {
    Stick,
    Tap(ButtonId),
    Drag { target: ControlTarget, last: Pos2 },
}

#[derive(Debug)]
pub struct Overlay {
    layout: LayoutEngine,
    stick: Option<StickMachine>,
    buttons: ButtonInput,
    ui: UiState,
    settings: StickSettings,
    edit_mode: bool,
    keys: KeyQueue,
    active: Option<ActiveGesture>,
}

impl Overlay {
    pub fn new(layout: LayoutEngine, config: &AppConfig) -> Self {
        let mut overlay = Self {
            layout,
            stick: None,
            buttons: ButtonInput::new(),
            ui: config.ui.clone(),
            settings: config.stick.clone(),
            edit_mode: false,
            keys: KeyQueue::new(),
            active: None,
        };
        overlay.rebuild_stick();
        overlay
    }

    pub fn layout(&self) -> &LayoutEngine {
        &self.layout
    }

    pub fn ui(&self) -> &UiState {
        &self.ui
    }

    pub fn edit_mode(&self) -> bool {
        self.edit_mode
    }

    pub fn stick(&self) -> Option<&StickMachine> {
        self.stick.as_ref()
    }

    pub fn is_latched(&self, id: ButtonId) -> bool {
        self.buttons.is_latched(id)
    }

    /// Key events produced since the last drain, in emission order.
    pub fn drain_keys(&mut self) -> Vec<KeyEvent> {
        self.keys.drain()
    }

    pub fn set_edit_mode(&mut self, edit_mode: bool) -> Result<(), LayoutError> {
        if self.edit_mode != edit_mode {
            self.cancel_active()?;
            self.edit_mode = edit_mode;
            info!("Edit mode {}", if edit_mode { "on" } else { "off" });
        }
        Ok(())
    }

    /// Hiding the overlay lets go of every held key.
    pub fn set_visible(&mut self, visible: bool) -> Result<(), LayoutError> {
        if !visible {
            self.cancel_active()?;
            self.buttons
                .release_latched(self.layout.buttons(), &mut self.keys);
        }
        self.ui.visible = visible;
        Ok(())
    }

    pub fn set_run_enabled(&mut self, enabled: bool) {
        self.ui.run_enabled = enabled;
        if let Some(stick) = self.stick.as_mut() {
            stick.set_run_enabled(enabled);
        }
    }

    pub fn add_button(&mut self, key: KeyCode) -> Result<ButtonControl, LayoutError> {
        self.layout.add_control(key)
    }

    pub fn delete_button(&mut self, id: ButtonId) -> Result<ButtonControl, LayoutError> {
        self.commit_drag()?;
        let removed = self.layout.delete_control(id)?;
        if self.buttons.is_latched(id) {
            self.keys.key_up(removed.key);
        }
        self.buttons.forget(id);
        if self.active == Some(ActiveGesture::Tap(id)) {
            self.active = None;
        }
        Ok(removed)
    }

    pub fn resize(&mut self, target: ControlTarget, step: ResizeStep) -> Result<f32, LayoutError> {
        self.commit_drag()?;
        let size = self.layout.resize_control(target, step)?;
        if target == ControlTarget::Thumbstick {
            self.rebuild_stick();
        }
        Ok(size)
    }

    pub fn set_locked(&mut self, target: ControlTarget, locked: bool) -> Result<(), LayoutError> {
        self.commit_drag()?;
        self.layout.set_locked(target, locked)
    }

    /// Places a thumbstick if the layout lacks one and wires it up.
    pub fn ensure_thumbstick(&mut self, key: KeyCode) -> Result<(), LayoutError> {
        self.layout.ensure_thumbstick(key)?;
        if self.stick.is_none() {
            self.rebuild_stick();
        }
        Ok(())
    }

    /// Feeds one pointer event in surface coordinates. Returns the activation
    /// when the event completes a button tap.
    pub fn pointer(&mut self, event: PointerEvent) -> Result<Option<Activation>, LayoutError> {
        if !self.ui.visible {
            return Ok(None);
        }
        if self.edit_mode {
            self.edit_pointer(event)?;
            Ok(None)
        } else {
            Ok(self.play_pointer(event))
        }
    }

    fn play_pointer(&mut self, event: PointerEvent) -> Option<Activation> {
        match (self.active, event.action) {
            (Some(ActiveGesture::Stick), action) => {
                self.drive_stick(action, event.position);
                if matches!(action, PointerAction::Up | PointerAction::Cancel) {
                    self.active = None;
                }
                None
            }
            (Some(ActiveGesture::Tap(id)), PointerAction::Up) => {
                self.active = None;
                let button = self
                    .layout
                    .button(id)
                    .filter(|b| b.placement.contains(event.position))?;
                Some(self.buttons.activate(button, &self.ui, &mut self.keys))
            }
            (Some(ActiveGesture::Tap(_)), PointerAction::Cancel) => {
                self.active = None;
                None
            }
            (Some(_), _) => None,
            (None, PointerAction::Down) => {
                self.active = self.play_hit(event.position);
                if self.active == Some(ActiveGesture::Stick) {
                    self.drive_stick(PointerAction::Down, event.position);
                    if !self.stick.as_ref().is_some_and(StickMachine::is_tracking) {
                        self.active = None;
                    }
                }
                None
            }
            (None, action) => {
                // Stray up/cancel: keep the stick's release guarantee.
                if matches!(action, PointerAction::Up | PointerAction::Cancel) {
                    self.drive_stick(action, event.position);
                }
                None
            }
        }
    }

    fn edit_pointer(&mut self, event: PointerEvent) -> Result<(), LayoutError> {
        match (self.active, event.action) {
            (None, PointerAction::Down) => {
                if let Some(target) = self.edit_hit(event.position) {
                    debug!("Dragging {}", target);
                    self.active = Some(ActiveGesture::Drag {
                        target,
                        last: event.position,
                    });
                }
            }
            (Some(ActiveGesture::Drag { target, last }), PointerAction::Move) => {
                let delta = event.position - last;
                self.layout.move_control(target, delta.x, delta.y)?;
                self.active = Some(ActiveGesture::Drag {
                    target,
                    last: event.position,
                });
            }
            (Some(ActiveGesture::Drag { .. }), PointerAction::Up | PointerAction::Cancel) => {
                self.commit_drag()?;
            }
            _ => {}
        }
        Ok(())
    }

    fn play_hit(&self, point: Pos2) -> Option<ActiveGesture> {
        if let Some(button) = self
            .layout
            .buttons()
            .iter()
            .rev()
            .find(|b| b.placement.contains(point))
        {
            return Some(ActiveGesture::Tap(button.id));
        }
        self.layout
            .thumbstick()
            .filter(|t| t.placement.contains(point))
            .map(|_| ActiveGesture::Stick)
    }

    fn edit_hit(&self, point: Pos2) -> Option<ControlTarget> {
        let button = self
            .layout
            .buttons()
            .iter()
            .rev()
            .find(|b| b.placement.contains(point))
            .map(|b| b as &dyn Control);
        let stick = self
            .layout
            .thumbstick()
            .filter(|t| t.placement.contains(point))
            .map(|t| t as &dyn Control);

        button
            .or(stick)
            .filter(|c| !c.placement().locked)
            .map(|c| c.target())
    }

    fn drive_stick(&mut self, action: PointerAction, surface: Pos2) {
        let Some(placement) = self.layout.thumbstick().map(|t| t.placement) else {
            return;
        };
        if let Some(stick) = self.stick.take() {
            let event = PointerEvent::new(action, placement.to_local(surface));
            self.stick = Some(stick.handle(event, &mut self.keys));
        }
    }

    /// Ends an edit drag in progress at its current position.
    fn commit_drag(&mut self) -> Result<(), LayoutError> {
        if let Some(ActiveGesture::Drag { target, .. }) = self.active {
            self.active = None;
            self.layout.end_drag(target)?;
            if target == ControlTarget::Thumbstick {
                self.rebuild_stick();
            }
        }
        Ok(())
    }

    fn cancel_active(&mut self) -> Result<(), LayoutError> {
        self.commit_drag()?;
        match self.active.take() {
            Some(ActiveGesture::Stick) => {
                if let Some(stick) = self.stick.take() {
                    let event = PointerEvent::new(PointerAction::Cancel, Pos2::ZERO);
                    self.stick = Some(stick.handle(event, &mut self.keys));
                }
            }
            Some(ActiveGesture::Drag { .. }) | Some(ActiveGesture::Tap(_)) | None => {}
        }
        Ok(())
    }

    fn rebuild_stick(&mut self) {
        if let Some(stick) = self.stick.take() {
            if stick.is_tracking() {
                let event = PointerEvent::new(PointerAction::Cancel, Pos2::ZERO);
                stick.handle(event, &mut self.keys);
                if self.active == Some(ActiveGesture::Stick) {
                    self.active = None;
                }
            }
        }
        self.stick = self.layout.thumbstick().map(|t| {
            StickMachine::new(
                t.placement.radius(),
                self.settings.clone(),
                self.ui.run_enabled,
            )
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunMode;
    use crate::controls::store::LayoutStore;
    use egui::{pos2, vec2};
    use std::fs;

    // Button 1 (E) centred at (150, 150); thumbstick radius 100 centred at (400, 400).
    const LAYOUT: &str = "\
ButtonID_1(100.0;100.0;100.0;false;33)
ButtonID_2(100.0;600.0;100.0;true;59)
ButtonID_99(200.0;300.0;300.0;false;29)
";

    fn overlay(dir: &tempfile::TempDir) -> Overlay {
        let path = dir.path().join("UI.cfg");
        fs::write(&path, LAYOUT).unwrap();
        let layout = LayoutEngine::open(LayoutStore::new(path)).unwrap();
        let mut config = AppConfig::default();
        config.stick.run_mode = RunMode::Off;
        Overlay::new(layout, &config)
    }

    fn ev(action: PointerAction, x: f32, y: f32) -> PointerEvent {
        PointerEvent::new(action, pos2(x, y))
    }

    #[test]
    fn tap_activates_button_under_finger() {
        let dir = tempfile::tempdir().unwrap();
        let mut overlay = overlay(&dir);

        assert_eq!(overlay.pointer(ev(PointerAction::Down, 150.0, 150.0)).unwrap(), None);
        let activation = overlay.pointer(ev(PointerAction::Up, 155.0, 150.0)).unwrap();

        assert!(activation.is_some_and(|a| a.haptic));
        assert_eq!(
            overlay.drain_keys(),
            vec![KeyEvent::Down(KeyCode::E), KeyEvent::Up(KeyCode::E)]
        );
    }

    #[test]
    fn tap_released_off_the_button_does_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut overlay = overlay(&dir);

        overlay.pointer(ev(PointerAction::Down, 150.0, 150.0)).unwrap();
        assert_eq!(overlay.pointer(ev(PointerAction::Up, 300.0, 150.0)).unwrap(), None);
        assert!(overlay.drain_keys().is_empty());
    }

    #[test]
    fn stick_gesture_maps_to_movement_keys() {
        let dir = tempfile::tempdir().unwrap();
        let mut overlay = overlay(&dir);

        overlay.pointer(ev(PointerAction::Down, 400.0, 400.0)).unwrap();
        overlay.pointer(ev(PointerAction::Move, 400.0, 340.0)).unwrap();
        let keys = overlay.drain_keys();
        assert_eq!(keys.last(), Some(&KeyEvent::Down(KeyCode::W)));

        overlay.pointer(ev(PointerAction::Up, 400.0, 340.0)).unwrap();
        let keys = overlay.drain_keys();
        assert_eq!(keys.len(), 4);
        assert!(keys.iter().all(|k| matches!(k, KeyEvent::Up(_))));
        assert!(!overlay.stick().unwrap().is_tracking());
    }

    #[test]
    fn hidden_overlay_ignores_touches_and_releases_toggles() {
        let dir = tempfile::tempdir().unwrap();
        let mut overlay = overlay(&dir);

        overlay.pointer(ev(PointerAction::Down, 650.0, 150.0)).unwrap();
        overlay.pointer(ev(PointerAction::Up, 650.0, 150.0)).unwrap();
        assert!(overlay.is_latched(ButtonId::new(2).unwrap()));
        overlay.drain_keys();

        overlay.set_visible(false).unwrap();
        assert_eq!(overlay.drain_keys(), vec![KeyEvent::Up(KeyCode::SHIFT_LEFT)]);

        overlay.pointer(ev(PointerAction::Down, 150.0, 150.0)).unwrap();
        assert_eq!(overlay.pointer(ev(PointerAction::Up, 150.0, 150.0)).unwrap(), None);
        assert!(overlay.drain_keys().is_empty());
    }

    #[test]
    fn edit_drag_moves_and_commits() {
        let dir = tempfile::tempdir().unwrap();
        let mut overlay = overlay(&dir);
        overlay.set_edit_mode(true).unwrap();

        overlay.pointer(ev(PointerAction::Down, 150.0, 150.0)).unwrap();
        overlay.pointer(ev(PointerAction::Move, 170.0, 160.0)).unwrap();
        overlay.pointer(ev(PointerAction::Move, 190.0, 170.0)).unwrap();
        overlay.pointer(ev(PointerAction::Up, 190.0, 170.0)).unwrap();

        let button = overlay.layout().button(ButtonId::FIRST).unwrap();
        assert_eq!(button.placement.offset, vec2(140.0, 120.0));
        let on_disk = overlay.layout().store().load().unwrap();
        assert_eq!((on_disk[0].offset_x, on_disk[0].offset_y), (140.0, 120.0));
        assert!(overlay.drain_keys().is_empty());
    }

    #[test]
    fn locked_controls_do_not_drag() {
        let dir = tempfile::tempdir().unwrap();
        let mut overlay = overlay(&dir);
        overlay.set_edit_mode(true).unwrap();

        overlay.pointer(ev(PointerAction::Down, 650.0, 150.0)).unwrap();
        overlay.pointer(ev(PointerAction::Move, 700.0, 150.0)).unwrap();
        overlay.pointer(ev(PointerAction::Up, 700.0, 150.0)).unwrap();

        let locked = overlay.layout().button(ButtonId::new(2).unwrap()).unwrap();
        assert_eq!(locked.placement.offset, vec2(600.0, 100.0));
    }

    #[test]
    fn entering_edit_mode_cancels_stick_gesture() {
        let dir = tempfile::tempdir().unwrap();
        let mut overlay = overlay(&dir);

        overlay.pointer(ev(PointerAction::Down, 400.0, 400.0)).unwrap();
        overlay.pointer(ev(PointerAction::Move, 330.0, 400.0)).unwrap();
        overlay.drain_keys();

        overlay.set_edit_mode(true).unwrap();
        assert_eq!(overlay.drain_keys().len(), 4);
        assert!(!overlay.stick().unwrap().is_tracking());
    }

    #[test]
    fn resizing_thumbstick_changes_its_radius() {
        let dir = tempfile::tempdir().unwrap();
        let mut overlay = overlay(&dir);

        overlay
            .resize(ControlTarget::Thumbstick, ResizeStep::Grow)
            .unwrap();
        assert_eq!(overlay.stick().unwrap().radius(), 110.0);
    }

    #[test]
    fn deleting_the_dragged_button_ends_the_drag() {
        let dir = tempfile::tempdir().unwrap();
        let mut overlay = overlay(&dir);
        overlay.set_edit_mode(true).unwrap();

        overlay.pointer(ev(PointerAction::Down, 150.0, 150.0)).unwrap();
        overlay.pointer(ev(PointerAction::Move, 100.0, 150.0)).unwrap();
        overlay.delete_button(ButtonId::FIRST).unwrap();

        overlay.pointer(ev(PointerAction::Up, 100.0, 150.0)).unwrap();
        assert!(overlay.layout().button(ButtonId::FIRST).is_none());
        assert_eq!(overlay.layout().store().load().unwrap().len(), 2);
    }

    #[test]
    fn resize_during_drag_commits_the_drag_first() {
        let dir = tempfile::tempdir().unwrap();
        let mut overlay = overlay(&dir);
        overlay.set_edit_mode(true).unwrap();

        overlay.pointer(ev(PointerAction::Down, 150.0, 150.0)).unwrap();
        overlay.pointer(ev(PointerAction::Move, 0.0, 150.0)).unwrap();
        overlay
            .resize(ControlTarget::Thumbstick, ResizeStep::Grow)
            .unwrap();

        let records = overlay.layout().store().load().unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!((records[0].offset_x, records[0].offset_y), (0.0, 100.0));
        assert!(!overlay
            .layout()
            .is_dragging(ControlTarget::Button(ButtonId::FIRST)));

        // The finger lifting afterwards changes nothing.
        overlay.pointer(ev(PointerAction::Up, 0.0, 150.0)).unwrap();
        assert_eq!(overlay.layout().store().load().unwrap(), records);
    }

    #[test]
    fn deleting_latched_button_releases_its_key() {
        let dir = tempfile::tempdir().unwrap();
        let mut overlay = overlay(&dir);
        let shift = ButtonId::new(2).unwrap();

        overlay.pointer(ev(PointerAction::Down, 650.0, 150.0)).unwrap();
        overlay.pointer(ev(PointerAction::Up, 650.0, 150.0)).unwrap();
        overlay.drain_keys();

        overlay.delete_button(shift).unwrap();
        assert_eq!(overlay.drain_keys(), vec![KeyEvent::Up(KeyCode::SHIFT_LEFT)]);
        assert!(!overlay.is_latched(shift));
    }
}
