//! Virtual analog stick: turns a single pointer's drag into forward/left/back/right
//! key presses.
//!
//! The stick is a [`statum`] state machine with two states:
//!
//! ```text
//!          down inside circle
//!   Idle ─────────────────────► Tracking ──┐ move: accumulate, clamp,
//!    ▲                             │  ▲    │ release all, re-press
//!    └──────── up / cancel ────────┘  └────┘
//! ```
//!
//! Positions are in the stick's local frame: origin at the top-left of its
//! bounding box, centre at `(radius, radius)`.

use crate::config::{RunMode, StickSettings};
use crate::controls::input::KeySink;
use crate::controls::keys::KeyCode;
use egui::{Pos2, Vec2};
use statum::{machine, state};
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Forward,
    Left,
    Back,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Forward,
        Direction::Left,
        Direction::Back,
        Direction::Right,
    ];

    pub fn key(self) -> KeyCode {
        match self {
            Direction::Forward => KeyCode::W,
            Direction::Left => KeyCode::A,
            Direction::Back => KeyCode::S,
            Direction::Right => KeyCode::D,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerAction {
    Down,
    Move,
    Up,
    Cancel,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerEvent {
    pub action: PointerAction,
    pub position: Pos2,
}

impl PointerEvent {
    pub fn new(action: PointerAction, position: Pos2) -> Self {
        Self { action, position }
    }
}

/// Pulls `offset` back onto the circle of `radius`, keeping its angle.
pub fn clamp_to_radius(offset: Vec2, radius: f32) -> Vec2 {
    if offset.length() > radius {
        Vec2::angled(offset.angle()) * radius
    } else {
        offset
    }
}

/// Directions to hold for a clamped offset, in press order.
///
/// Near the rim of a cardinal direction only that axis is pressed; elsewhere
/// each axis is tested against the deadzone on its own, so diagonals press
/// two keys.
pub fn select_directions(offset: Vec2, radius: f32, settings: &StickSettings) -> Vec<Direction> {
    if radius <= 0.0 {
        return Vec::new();
    }

    let x_ratio = (offset.x / radius).abs();
    let y_ratio = (offset.y / radius).abs();

    if y_ratio > x_ratio && y_ratio > settings.axis_lock_ratio {
        return vec![if offset.y < 0.0 {
            Direction::Forward
        } else {
            Direction::Back
        }];
    }
    if x_ratio > y_ratio && x_ratio > settings.axis_lock_ratio {
        return vec![if offset.x < 0.0 {
            Direction::Left
        } else {
            Direction::Right
        }];
    }

    let deadzone = settings.deadzone_ratio * radius;
    let mut directions = Vec::with_capacity(2);
    if offset.y < -deadzone {
        directions.push(Direction::Forward);
    }
    if offset.y > deadzone {
        directions.push(Direction::Back);
    }
    if offset.x < -deadzone {
        directions.push(Direction::Left);
    }
    if offset.x > deadzone {
        directions.push(Direction::Right);
    }
    directions
}

/// Where the gesture started, in local coordinates.
#[derive(Debug, Clone)]
pub struct Gesture {
    pub origin: Pos2,
}

#[state]
#[derive(Debug, Clone)]
pub enum StickState {
    Idle,
    Tracking(Gesture),
}

#[machine]
#[derive(Debug)]
pub struct Thumbstick<S: StickState> {
    radius: f32,
    settings: StickSettings,
    // Running offset from the centre, always within the radius.
    offset: Vec2,
    last_sample: Pos2,
    run_held: bool,
    run_enabled: bool,
}

impl<S: StickState> Thumbstick<S> {
    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    pub fn is_running(&self) -> bool {
        self.run_held
    }

    pub fn set_run_enabled(&mut self, enabled: bool) {
        self.run_enabled = enabled;
    }

    fn center(&self) -> Pos2 {
        Pos2::new(self.radius, self.radius)
    }

    fn release_keys(&mut self, sink: &mut dyn KeySink) {
        for direction in Direction::ALL {
            sink.key_up(direction.key());
        }
        if self.run_held {
            sink.key_up(self.settings.run_key);
            self.run_held = false;
        }
    }
}

impl Thumbstick<Idle> {
    pub fn create(radius: f32, settings: StickSettings, run_enabled: bool) -> Self {
        Self::new(
            radius,
            settings,
            Vec2::ZERO,
            Pos2::ZERO,
            false,
            run_enabled,
        )
    }

    /// Starts a gesture, or hands the stick back unchanged when the touch
    /// lands outside the circle.
    pub fn press(
        mut self,
        position: Pos2,
        sink: &mut dyn KeySink,
    ) -> Result<Thumbstick<Tracking>, Thumbstick<Idle>> {
        if position.distance(self.center()) > self.radius {
            debug!("Touch at {:?} outside thumbstick, ignored", position);
            return Err(self);
        }

        self.offset = position - self.center();
        self.last_sample = position;
        if self.settings.run_mode == RunMode::Toggle && self.run_enabled {
            sink.key_down(self.settings.run_key);
            self.run_held = true;
        }

        debug!("Thumbstick tracking from {:?}", position);
        Ok(self.transition_with(Gesture { origin: position }))
    }

    /// Up or cancel without a gesture still releases every direction.
    pub fn release_idle(&mut self, sink: &mut dyn KeySink) {
        self.release_keys(sink);
    }
}

impl Thumbstick<Tracking> {
    pub fn origin(&self) -> Option<Pos2> {
        self.get_state_data().map(|gesture| gesture.origin)
    }

    /// Applies one move sample and re-presses the matching directions.
    pub fn drag(&mut self, position: Pos2, sink: &mut dyn KeySink) -> Vec<Direction> {
        let delta = position - self.last_sample;
        self.last_sample = position;
        self.offset = clamp_to_radius(self.offset + delta, self.radius);

        // Release first so no key from the previous sample stays down.
        for direction in Direction::ALL {
            sink.key_up(direction.key());
        }
        let directions = select_directions(self.offset, self.radius, &self.settings);
        for direction in &directions {
            sink.key_down(direction.key());
        }

        if self.settings.run_mode == RunMode::Latch
            && !self.run_held
            && self.offset.length() > self.settings.run_threshold_ratio * self.radius
        {
            sink.key_down(self.settings.run_key);
            self.run_held = true;
        }

        directions
    }

    /// Ends the gesture: recentre, release everything, notify the sink.
    pub fn release(mut self, sink: &mut dyn KeySink) -> Thumbstick<Idle> {
        self.offset = Vec2::ZERO;
        self.release_keys(sink);
        sink.gesture_released();
        debug!("Thumbstick released");
        self.transition()
    }
}

/// Runtime wrapper that routes pointer events to whichever state the stick is in.
#[derive(Debug)]
pub enum StickMachine {
    Idle(Thumbstick<Idle>),
    Tracking(Thumbstick<Tracking>),
}

impl StickMachine {
    pub fn new(radius: f32, settings: StickSettings, run_enabled: bool) -> Self {
        StickMachine::Idle(Thumbstick::create(radius, settings, run_enabled))
    }

    pub fn handle(self, event: PointerEvent, sink: &mut dyn KeySink) -> Self {
        match (self, event.action) {
            (StickMachine::Idle(stick), PointerAction::Down) => {
                match stick.press(event.position, sink) {
                    Ok(tracking) => StickMachine::Tracking(tracking),
                    Err(idle) => StickMachine::Idle(idle),
                }
            }
            (StickMachine::Idle(stick), PointerAction::Move) => StickMachine::Idle(stick),
            (StickMachine::Idle(mut stick), PointerAction::Up | PointerAction::Cancel) => {
                stick.release_idle(sink);
                StickMachine::Idle(stick)
            }
            // A second down while tracking moves the same gesture.
            (StickMachine::Tracking(mut stick), PointerAction::Down | PointerAction::Move) => {
                stick.drag(event.position, sink);
                StickMachine::Tracking(stick)
            }
            (StickMachine::Tracking(stick), PointerAction::Up | PointerAction::Cancel) => {
                StickMachine::Idle(stick.release(sink))
            }
        }
    }

    pub fn is_tracking(&self) -> bool {
        matches!(self, StickMachine::Tracking(_))
    }

    pub fn offset(&self) -> Vec2 {
        match self {
            StickMachine::Idle(stick) => stick.offset(),
            StickMachine::Tracking(stick) => stick.offset(),
        }
    }

    pub fn radius(&self) -> f32 {
        match self {
            StickMachine::Idle(stick) => stick.radius(),
            StickMachine::Tracking(stick) => stick.radius(),
        }
    }

    pub fn set_run_enabled(&mut self, enabled: bool) {
        match self {
            StickMachine::Idle(stick) => stick.set_run_enabled(enabled),
            StickMachine::Tracking(stick) => stick.set_run_enabled(enabled),
        }
    }
}
