use serde::{Deserialize, Serialize};

use tilerun_core::EnvEvent;

use crate::config::PhysicsConfig;

/// 2D vector in pixels (or pixels/tick).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle, top-left anchored, y down.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    /// Strict overlap: rectangles sharing only an edge do not overlap.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

/// Ground/ceiling/wall contact flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contacts {
    pub on_ground: bool,
    pub on_ceiling: bool,
    pub on_left: bool,
    pub on_right: bool,
}

/// Kinematic state of one actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KinematicBody {
    pub position: Vec2,
    pub velocity: Vec2,
    pub previous_position: Vec2,
    /// Desired horizontal direction: -1, 0 or +1.
    pub intent_dir: i8,
    pub contacts: Contacts,
    size: Vec2,
    collision_offset: Vec2,
    move_speed: f32,
    jump_speed: f32,
    gravity: f32,
    max_fall_speed: f32,
}

impl KinematicBody {
    pub fn new(position: Vec2, physics: &PhysicsConfig) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            previous_position: position,
            intent_dir: 0,
            contacts: Contacts::default(),
            size: Vec2::new(physics.body_width, physics.body_height),
            collision_offset: Vec2::new(physics.collision_offset_x, physics.collision_offset_y),
            move_speed: physics.move_speed,
            jump_speed: physics.jump_speed,
            gravity: physics.gravity,
            max_fall_speed: physics.max_fall_speed,
        }
    }

    pub fn size(&self) -> Vec2 {
        self.size
    }

    pub fn collision_rect(&self) -> Rect {
        Rect {
            x: self.position.x + self.collision_offset.x,
            y: self.position.y + self.collision_offset.y,
            w: self.size.x,
            h: self.size.y,
        }
    }

    /// Move horizontally so the collision rectangle's left edge is at `x`.
    /// The vertical position is untouched.
    pub fn set_collision_x(&mut self, x: f32) {
        self.position.x = x - self.collision_offset.x;
    }

    /// Move vertically so the collision rectangle's top edge is at `y`.
    pub fn set_collision_y(&mut self, y: f32) {
        self.position.y = y - self.collision_offset.y;
    }

    pub fn on_ground(&self) -> bool {
        self.contacts.on_ground
    }

    /// Teleport to `position` with zero velocity, intent and contacts.
    pub fn reset_at(&mut self, position: Vec2) {
        self.position = position;
        self.previous_position = position;
        self.velocity = Vec2::ZERO;
        self.intent_dir = 0;
        self.contacts = Contacts::default();
    }

    pub fn set_horizontal_intent(&mut self, direction: i8) {
        self.intent_dir = direction.signum();
        self.velocity.x = f32::from(self.intent_dir) * self.move_speed;
    }

    /// Apply the jump impulse if grounded. Airborne jumps are ignored.
    #[must_use]
    pub fn jump(&mut self) -> Option<EnvEvent> {
        if !self.contacts.on_ground {
            return None;
        }
        self.velocity.y = self.jump_speed;
        self.contacts.on_ground = false;
        let rect = self.collision_rect();
        Some(EnvEvent::JumpTriggered {
            x: rect.x + rect.w / 2.0,
            y: rect.bottom(),
        })
    }

    /// Runs every tick, grounded or not; resolution cancels it on a floor.
    pub fn apply_gravity(&mut self) {
        self.velocity.y += self.gravity;
        if self.velocity.y > self.max_fall_speed {
            self.velocity.y = self.max_fall_speed;
        }
    }

    /// Record the pre-tick position and re-derive `vx` from the intent.
    pub fn begin_tick(&mut self) {
        self.previous_position = self.position;
        self.velocity.x = f32::from(self.intent_dir) * self.move_speed;
    }

    /// Velocity becomes the actual displacement of this tick, except that a
    /// floor or ceiling contact leaves `vy` at zero so the next tick's
    /// gravity starts from rest.
    pub fn finish_tick(&mut self) {
        self.velocity = Vec2::new(
            self.position.x - self.previous_position.x,
            self.position.y - self.previous_position.y,
        );
        if self.contacts.on_ground || self.contacts.on_ceiling {
            self.velocity.y = 0.0;
        }
    }
}
