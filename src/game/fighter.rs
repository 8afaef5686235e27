//! Fighter state (authoritative) and the buffered input vector

use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

use super::archetype::{Archetype, AttackKind};

/// Buffered player input. Every flag is explicit and defaults to false.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputState {
    pub left: bool,
    pub right: bool,
    pub jump: bool,
    pub basic: bool,
    pub special: bool,
    pub ult: bool,
}

impl InputState {
    pub fn wants(&self, kind: AttackKind) -> bool {
        match kind {
            AttackKind::Basic => self.basic,
            AttackKind::Special => self.special,
            AttackKind::Ult => self.ult,
        }
    }
}

/// Horizontal facing, sent to clients as -1 / 1
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facing {
    Left,
    Right,
}

impl Facing {
    pub fn sign(self) -> f32 {
        match self {
            Facing::Left => -1.0,
            Facing::Right => 1.0,
        }
    }

    /// Facing pointing from `from_x` towards `to_x` (left when equal)
    pub fn away_from(from_x: f32, to_x: f32) -> Self {
        if to_x > from_x {
            Facing::Right
        } else {
            Facing::Left
        }
    }
}

impl Serialize for Facing {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Facing::Left => serializer.serialize_i8(-1),
            Facing::Right => serializer.serialize_i8(1),
        }
    }
}

/// One connected participant's combat and physics state
#[derive(Debug, Clone)]
pub struct Fighter {
    pub id: Uuid,
    pub archetype: &'static Archetype,

    // Kinematics
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub facing: Facing,
    pub grounded: bool,

    // Combat (health is deliberately not clamped at zero)
    pub health: f32,
    pub max_health: f32,
    pub attacking: bool,
    pub knockback: f32,
    pub is_dead: bool,

    // Input tracking
    pub pending_input: InputState,
    /// Jump state seen on the previous simulated tick, for edge-triggered jumps
    pub jump_was_held: bool,
}

impl Fighter {
    pub fn new(id: Uuid, archetype: &'static Archetype, spawn_x: f32, spawn_y: f32) -> Self {
        Self {
            id,
            archetype,
            x: spawn_x,
            y: spawn_y,
            vx: 0.0,
            vy: 0.0,
            facing: Facing::Right,
            grounded: true,
            health: archetype.max_health,
            max_health: archetype.max_health,
            attacking: false,
            knockback: 0.0,
            is_dead: false,
            pending_input: InputState::default(),
            jump_was_held: false,
        }
    }

    /// Alive fighters move, attack and can be hit
    pub fn is_active(&self) -> bool {
        !self.is_dead
    }
}
