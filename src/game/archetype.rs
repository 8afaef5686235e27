//! Archetype catalog - immutable per-class fighter stats

use serde::{Deserialize, Serialize};

use super::GameError;

/// Attack kinds, in the order they are checked each tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackKind {
    Basic,
    Special,
    Ult,
}

impl AttackKind {
    /// Tie-break order when several attack inputs are held in one tick
    pub const ALL: [AttackKind; 3] = [AttackKind::Basic, AttackKind::Special, AttackKind::Ult];
}

/// Damage and knockback for one attack kind
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttackStats {
    pub damage: f32,
    /// Knockback before the target-health term is added
    pub knockback_base: f32,
}

/// Immutable stat template for a character class
#[derive(Debug, PartialEq)]
pub struct Archetype {
    pub name: &'static str,
    pub max_health: f32,
    /// Flat damage rating, informational only (attacks carry their own damage)
    pub base_damage: f32,
    /// Horizontal speed while a direction is held
    pub move_speed: f32,
    pub basic: AttackStats,
    pub special: AttackStats,
    pub ult: AttackStats,
}

impl Archetype {
    pub fn attack(&self, kind: AttackKind) -> AttackStats {
        match kind {
            AttackKind::Basic => self.basic,
            AttackKind::Special => self.special,
            AttackKind::Ult => self.ult,
        }
    }

    /// Look up an archetype by name
    pub fn lookup(name: &str) -> Result<&'static Archetype, GameError> {
        CATALOG
            .iter()
            .find(|a| a.name == name)
            .copied()
            .ok_or_else(|| GameError::UnknownArchetype(name.to_string()))
    }

    /// Every name the gateway may pick from
    pub fn names() -> impl Iterator<Item = &'static str> {
        CATALOG.iter().map(|a| a.name)
    }
}

/// Fast and durable, moderate damage
pub static VEXA: Archetype = Archetype {
    name: "vexa",
    max_health: 100.0,
    base_damage: 10.0,
    move_speed: 5.0,
    basic: AttackStats { damage: 12.0, knockback_base: 5.0 },
    special: AttackStats { damage: 25.0, knockback_base: 10.0 },
    ult: AttackStats { damage: 70.0, knockback_base: 20.0 },
};

/// Fragile and slower, but hits hard with special and ult
pub static GLYPH: Archetype = Archetype {
    name: "glyph",
    max_health: 80.0,
    base_damage: 15.0,
    move_speed: 4.0,
    basic: AttackStats { damage: 4.0, knockback_base: 2.0 },
    special: AttackStats { damage: 45.0, knockback_base: 6.0 },
    ult: AttackStats { damage: 80.0, knockback_base: 12.0 },
};

static CATALOG: [&Archetype; 2] = [&GLYPH, &VEXA];
