//! Game simulation modules

pub mod archetype;
pub mod combat;
pub mod effects;
pub mod fighter;
pub mod lifecycle;
pub mod physics;
pub mod registry;
pub mod snapshot;
pub mod stage;
pub mod world;

pub use fighter::{Fighter, InputState};
pub use stage::{SessionEvent, Stage, StageHandle};
pub use world::World;

use std::str::FromStr;

/// Simulation errors
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("Unknown archetype: {0}")]
    UnknownArchetype(String),
}

/// Health given back on respawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RespawnHealth {
    /// Reset to max health
    #[default]
    Full,
    /// Reset to 0, the legacy behaviour
    Zero,
}

impl FromStr for RespawnHealth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" => Ok(Self::Full),
            "zero" => Ok(Self::Zero),
            other => Err(other.to_string()),
        }
    }
}

/// How the jump input is sampled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JumpTrigger {
    /// Holding jump re-jumps on every grounded tick
    #[default]
    Level,
    /// Jump must be released before it fires again
    Edge,
}

impl FromStr for JumpTrigger {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "level" => Ok(Self::Level),
            "edge" => Ok(Self::Edge),
            other => Err(other.to_string()),
        }
    }
}

/// Tunable rule choices for a stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GameRules {
    pub respawn_health: RespawnHealth,
    pub jump_trigger: JumpTrigger,
}
