//! Live registry of on-screen controls.
//!
//! The engine owns the authoritative list. Every committed edit (drag end,
//! resize, lock change, add, delete) rewrites the layout file from memory;
//! intermediate drag samples stay in memory only.

use crate::controls::keys::{KeyCatalog, KeyCode};
use crate::controls::store::{LayoutStore, StoreError};
use crate::controls::widget::{
    ButtonControl, ButtonId, Control, ControlTarget, ResizeStep, ThumbstickControl, Widget,
    WidgetRecord,
};
use egui::{vec2, Vec2};
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("No button with id {0}")]
    UnknownButton(ButtonId),

    #[error("Layout has no thumbstick")]
    MissingThumbstick,

    #[error("The {0} is locked")]
    Locked(ControlTarget),

    #[error("Key {0} is not available for a new button")]
    KeyUnavailable(KeyCode),

    #[error("No button ids left to allocate")]
    IdsExhausted,

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug)]
pub struct LayoutEngine {
    store: LayoutStore,
    buttons: Vec<ButtonControl>,
    thumbstick: Option<ThumbstickControl>,
    // Offsets as of the last commit for controls with a drag in progress.
    drag_origins: HashMap<ControlTarget, Vec2>,
}

impl LayoutEngine {
    /// Loads the persisted layout and materialises it.
    pub fn open(store: LayoutStore) -> Result<Self, LayoutError> {
        let records = store.load()?;
        let engine = Self::from_records(store, &records);
        info!(
            "Layout opened with {} buttons{}",
            engine.buttons.len(),
            if engine.thumbstick.is_some() {
                " and a thumbstick"
            } else {
                ""
            }
        );
        Ok(engine)
    }

    fn from_records(store: LayoutStore, records: &[WidgetRecord]) -> Self {
        let mut buttons: Vec<ButtonControl> = Vec::new();
        let mut thumbstick = None;
        let mut bound_keys = HashSet::new();

        for record in records {
            match Widget::from_record(record) {
                Some(Widget::Thumbstick(stick)) => thumbstick = Some(stick),
                Some(Widget::Button(button)) => {
                    if bound_keys.insert(button.key) {
                        buttons.push(button);
                    } else {
                        warn!(
                            "Dropping button {} because key {} is already bound",
                            button.id, button.key
                        );
                    }
                }
                None => warn!("Dropping layout record with invalid id {}", record.id),
            }
        }

        Self {
            store,
            buttons,
            thumbstick,
            drag_origins: HashMap::new(),
        }
    }

    pub fn store(&self) -> &LayoutStore {
        &self.store
    }

    pub fn buttons(&self) -> &[ButtonControl] {
        &self.buttons
    }

    pub fn button(&self, id: ButtonId) -> Option<&ButtonControl> {
        self.buttons.iter().find(|b| b.id == id)
    }

    pub fn thumbstick(&self) -> Option<&ThumbstickControl> {
        self.thumbstick.as_ref()
    }

    pub fn widgets(&self) -> Vec<Widget> {
        self.buttons
            .iter()
            .cloned()
            .map(Widget::Button)
            .chain(self.thumbstick.clone().map(Widget::Thumbstick))
            .collect()
    }

    pub fn records(&self) -> Vec<WidgetRecord> {
        self.widgets().iter().map(Widget::record).collect()
    }

    /// Keys bound to any control, the thumbstick included.
    pub fn used_keys(&self) -> HashSet<KeyCode> {
        self.buttons
            .iter()
            .map(|b| b.key)
            .chain(self.thumbstick.as_ref().map(|t| t.key))
            .collect()
    }

    pub fn key_catalog(&self) -> KeyCatalog {
        KeyCatalog::available(&self.used_keys())
    }

    pub fn next_button_id(&self) -> Result<ButtonId, LayoutError> {
        match self.buttons.iter().map(|b| b.id).max() {
            Some(highest) => highest.next().ok_or(LayoutError::IdsExhausted),
            None => Ok(ButtonId::FIRST),
        }
    }

    pub fn is_dragging(&self, target: ControlTarget) -> bool {
        self.drag_origins.contains_key(&target)
    }

    /// Adds a button at the default spot bound to `key`.
    pub fn add_control(&mut self, key: KeyCode) -> Result<ButtonControl, LayoutError> {
        if !self.key_catalog().contains(key) {
            return Err(LayoutError::KeyUnavailable(key));
        }

        let button = ButtonControl::with_defaults(self.next_button_id()?, key);
        self.buttons.push(button.clone());
        self.persist()?;
        info!("Added button {} bound to {}", button.id, key);
        Ok(button)
    }

    /// Places a default thumbstick when the layout has none.
    pub fn ensure_thumbstick(&mut self, key: KeyCode) -> Result<&ThumbstickControl, LayoutError> {
        if self.thumbstick.is_none() {
            info!("Placing default thumbstick bound to {}", key);
            self.thumbstick = Some(ThumbstickControl::with_defaults(key));
            self.persist()?;
        }
        self.thumbstick.as_ref().ok_or(LayoutError::MissingThumbstick)
    }

    /// Applies one drag sample. Not persisted until [`Self::end_drag`]; other
    /// edits made meanwhile store this control at its last committed offset.
    pub fn move_control(
        &mut self,
        target: ControlTarget,
        dx: f32,
        dy: f32,
    ) -> Result<(), LayoutError> {
        let placement = self.unlocked_mut(target)?.placement_mut();
        let committed = placement.offset;
        placement.translate(vec2(dx, dy));
        self.drag_origins.entry(target).or_insert(committed);
        Ok(())
    }

    /// Commits the position reached by the drag.
    pub fn end_drag(&mut self, target: ControlTarget) -> Result<(), LayoutError> {
        let control = self.control_mut(target)?;
        control.placement_mut().clamp_to_surface();
        let offset = control.placement().offset;
        self.drag_origins.remove(&target);
        self.persist()?;
        debug!("Committed {} at ({}, {})", target, offset.x, offset.y);
        Ok(())
    }

    /// Grows or shrinks by one step and persists. Returns the new size.
    pub fn resize_control(
        &mut self,
        target: ControlTarget,
        step: ResizeStep,
    ) -> Result<f32, LayoutError> {
        let control = self.unlocked_mut(target)?;
        control.placement_mut().resize(step);
        let size = control.placement().size;
        self.persist()?;
        debug!("Resized {} to {}", target, size);
        Ok(size)
    }

    pub fn set_locked(&mut self, target: ControlTarget, locked: bool) -> Result<(), LayoutError> {
        self.control_mut(target)?.placement_mut().locked = locked;
        self.persist()?;
        info!("{} {}", if locked { "Locked" } else { "Unlocked" }, target);
        Ok(())
    }

    /// Removes a button. The thumbstick has no [`ButtonId`] and cannot be
    /// removed here.
    pub fn delete_control(&mut self, id: ButtonId) -> Result<ButtonControl, LayoutError> {
        let index = self
            .buttons
            .iter()
            .position(|b| b.id == id)
            .ok_or(LayoutError::UnknownButton(id))?;
        let removed = self.buttons.remove(index);
        self.drag_origins.remove(&ControlTarget::Button(id));
        self.persist()?;
        info!("Deleted button {}", id);
        Ok(removed)
    }

    fn control_mut(&mut self, target: ControlTarget) -> Result<&mut dyn Control, LayoutError> {
        match target {
            ControlTarget::Button(id) => self
                .buttons
                .iter_mut()
                .find(|b| b.id == id)
                .map(|b| b as &mut dyn Control)
                .ok_or(LayoutError::UnknownButton(id)),
            ControlTarget::Thumbstick => self
                .thumbstick
                .as_mut()
                .map(|t| t as &mut dyn Control)
                .ok_or(LayoutError::MissingThumbstick),
        }
    }

    fn unlocked_mut(&mut self, target: ControlTarget) -> Result<&mut dyn Control, LayoutError> {
        let control = self.control_mut(target)?;
        if control.placement().locked {
            return Err(LayoutError::Locked(target));
        }
        Ok(control)
    }

    /// Live records, except that controls mid-drag keep their committed offset.
    fn committed_records(&self) -> Vec<WidgetRecord> {
        self.widgets()
            .iter()
            .map(|widget| {
                let control = widget.as_control();
                let mut record = control.record();
                if let Some(origin) = self.drag_origins.get(&control.target()) {
                    record.offset_x = origin.x;
                    record.offset_y = origin.y;
                }
                record
            })
            .collect()
    }

    fn persist(&self) -> Result<(), StoreError> {
        self.store.save(&self.committed_records())
    }
}
