//! On-screen control types.
//!
//! A control is either an ordinary [`ButtonControl`] or the single
//! [`ThumbstickControl`]. The persisted form of both is a [`WidgetRecord`];
//! the thumbstick is recognised there by the reserved id [`THUMBSTICK_ID`],
//! but once materialised it is its own variant and cannot be addressed by a
//! [`ButtonId`].

use crate::controls::keys::KeyCode;
use egui::{vec2, Pos2, Vec2};
use std::fmt;

/// Id the layout file uses for the thumbstick record.
pub const THUMBSTICK_ID: u32 = 99;
pub const MIN_CONTROL_SIZE: f32 = 50.0;
pub const RESIZE_STEP: f32 = 20.0;
pub const DEFAULT_BUTTON_SIZE: f32 = 100.0;
pub const DEFAULT_BUTTON_OFFSET: f32 = 100.0;
pub const DEFAULT_THUMBSTICK_SIZE: f32 = 200.0;

/// One line of the layout file, exactly as stored.
#[derive(Clone, Debug, PartialEq)]
pub struct WidgetRecord {
    pub id: u32,
    pub size: f32,
    pub offset_x: f32,
    pub offset_y: f32,
    pub is_locked: bool,
    pub key_code: KeyCode,
}

impl WidgetRecord {
    pub fn is_thumbstick(&self) -> bool {
        self.id == THUMBSTICK_ID
    }
}

impl fmt::Display for WidgetRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ButtonID_{}({};{};{};{};{})",
            self.id,
            format_decimal(self.size),
            format_decimal(self.offset_x),
            format_decimal(self.offset_y),
            self.is_locked,
            self.key_code.0
        )
    }
}

/// Writes whole numbers with a trailing `.0` so every value reads back through
/// the `[\d.]+` grammar.
pub fn format_decimal(value: f32) -> String {
    if value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

/// Id of an ordinary button. Never 0 and never the thumbstick id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ButtonId(u32);

impl ButtonId {
    pub const FIRST: ButtonId = ButtonId(1);

    pub fn new(raw: u32) -> Option<Self> {
        (raw != 0 && raw != THUMBSTICK_ID).then_some(Self(raw))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// The id allocated after this one, skipping the thumbstick id. `None`
    /// once the id space is used up.
    pub fn next(self) -> Option<Self> {
        match self.0.checked_add(1)? {
            THUMBSTICK_ID => Some(Self(THUMBSTICK_ID + 1)),
            n => Some(Self(n)),
        }
    }
}

impl fmt::Display for ButtonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Addresses a control for editing gestures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ControlTarget {
    Button(ButtonId),
    Thumbstick,
}

impl ControlTarget {
    pub fn raw_id(self) -> u32 {
        match self {
            ControlTarget::Button(id) => id.get(),
            ControlTarget::Thumbstick => THUMBSTICK_ID,
        }
    }
}

impl fmt::Display for ControlTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlTarget::Button(id) => write!(f, "button {id}"),
            ControlTarget::Thumbstick => write!(f, "thumbstick"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResizeStep {
    Grow,
    Shrink,
}

impl ResizeStep {
    pub fn delta(self) -> f32 {
        match self {
            ResizeStep::Grow => RESIZE_STEP,
            ResizeStep::Shrink => -RESIZE_STEP,
        }
    }
}

/// Size, position and lock flag shared by every control.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    /// Diameter in device-independent units.
    pub size: f32,
    /// Top-left corner relative to the play surface.
    pub offset: Vec2,
    pub locked: bool,
}

impl Placement {
    pub fn new(size: f32, offset: Vec2, locked: bool) -> Self {
        Self {
            size,
            offset,
            locked,
        }
    }

    pub fn radius(&self) -> f32 {
        self.size / 2.0
    }

    pub fn center(&self) -> Pos2 {
        (self.offset + Vec2::splat(self.radius())).to_pos2()
    }

    /// Circular hit test in surface coordinates.
    pub fn contains(&self, point: Pos2) -> bool {
        point.distance(self.center()) <= self.radius()
    }

    /// Converts a surface point into the control's local frame (origin top-left).
    pub fn to_local(&self, point: Pos2) -> Pos2 {
        point - self.offset
    }

    pub fn translate(&mut self, delta: Vec2) {
        self.offset += delta;
    }

    pub fn resize(&mut self, step: ResizeStep) {
        self.size = (self.size + step.delta()).max(MIN_CONTROL_SIZE);
    }

    /// Keeps the control on the play surface so its record stays parseable.
    pub fn clamp_to_surface(&mut self) {
        self.offset = self.offset.max(Vec2::ZERO);
    }
}

/// Uniform view over buttons and the thumbstick for the editing gestures.
pub trait Control {
    fn target(&self) -> ControlTarget;
    fn placement(&self) -> &Placement;
    fn placement_mut(&mut self) -> &mut Placement;
    fn key_code(&self) -> KeyCode;

    fn record(&self) -> WidgetRecord {
        let placement = self.placement();
        WidgetRecord {
            id: self.target().raw_id(),
            size: placement.size,
            offset_x: placement.offset.x,
            offset_y: placement.offset.y,
            is_locked: placement.locked,
            key_code: self.key_code(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ButtonControl {
    pub id: ButtonId,
    pub placement: Placement,
    pub key: KeyCode,
}

impl ButtonControl {
    /// A freshly added button at the default spot.
    pub fn with_defaults(id: ButtonId, key: KeyCode) -> Self {
        Self {
            id,
            placement: Placement::new(
                DEFAULT_BUTTON_SIZE,
                Vec2::splat(DEFAULT_BUTTON_OFFSET),
                false,
            ),
            key,
        }
    }
}

impl Control for ButtonControl {
    fn target(&self) -> ControlTarget {
        ControlTarget::Button(self.id)
    }

    fn placement(&self) -> &Placement {
        &self.placement
    }

    fn placement_mut(&mut self) -> &mut Placement {
        &mut self.placement
    }

    fn key_code(&self) -> KeyCode {
        self.key
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ThumbstickControl {
    pub placement: Placement,
    pub key: KeyCode,
}

impl ThumbstickControl {
    pub fn with_defaults(key: KeyCode) -> Self {
        Self {
            placement: Placement::new(DEFAULT_THUMBSTICK_SIZE, Vec2::ZERO, false),
            key,
        }
    }
}

impl Control for ThumbstickControl {
    fn target(&self) -> ControlTarget {
        ControlTarget::Thumbstick
    }

    fn placement(&self) -> &Placement {
        &self.placement
    }

    fn placement_mut(&mut self) -> &mut Placement {
        &mut self.placement
    }

    fn key_code(&self) -> KeyCode {
        self.key
    }
}

/// A materialised layout entry.
#[derive(Clone, Debug, PartialEq)]
pub enum Widget {
    Button(ButtonControl),
    Thumbstick(ThumbstickControl),
}

impl Widget {
    /// `None` for records carrying id 0, which no control may use.
    pub fn from_record(record: &WidgetRecord) -> Option<Self> {
        let placement = Placement::new(
            record.size,
            vec2(record.offset_x, record.offset_y),
            record.is_locked,
        );
        if record.is_thumbstick() {
            return Some(Widget::Thumbstick(ThumbstickControl {
                placement,
                key: record.key_code,
            }));
        }
        ButtonId::new(record.id).map(|id| {
            Widget::Button(ButtonControl {
                id,
                placement,
                key: record.key_code,
            })
        })
    }

    pub fn as_control(&self) -> &dyn Control {
        match self {
            Widget::Button(button) => button,
            Widget::Thumbstick(stick) => stick,
        }
    }

    pub fn record(&self) -> WidgetRecord {
        self.as_control().record()
    }
}
