//! Snapshot building

use crate::ws::protocol::{FighterSnapshot, PlayerMap, ServerMsg};

use super::fighter::Fighter;
use super::registry::FighterRegistry;

impl From<&Fighter> for FighterSnapshot {
    fn from(f: &Fighter) -> Self {
        Self {
            id: f.id,
            x: f.x,
            y: f.y,
            facing: f.facing,
            health: f.health,
            max_health: f.max_health,
            attacking: f.attacking,
            is_dead: f.is_dead,
            character_type: f.archetype.name.to_string(),
        }
    }
}

/// Builds full-state snapshots for network transmission
#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    /// Tick of the last snapshot built
    last_tick: Option<u64>,
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every fighter, dead ones included, keyed by identity
    pub fn players(registry: &FighterRegistry) -> PlayerMap {
        registry.iter().map(|f| (f.id, FighterSnapshot::from(f))).collect()
    }

    /// Per-tick broadcast of the whole registry
    pub fn build(&mut self, tick: u64, registry: &FighterRegistry) -> ServerMsg {
        debug_assert!(self.last_tick.map_or(true, |last| tick > last), "snapshot tick went backwards");
        self.last_tick = Some(tick);

        ServerMsg::GameState {
            tick,
            players: Self::players(registry),
        }
    }

    /// One-off snapshot for a connection that just joined
    pub fn build_initial(tick: u64, registry: &FighterRegistry) -> ServerMsg {
        ServerMsg::CurrentPlayers {
            tick,
            players: Self::players(registry),
        }
    }
}
