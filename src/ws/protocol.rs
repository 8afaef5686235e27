//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::game::fighter::{Facing, InputState};

/// Full registry snapshot keyed by fighter identity
pub type PlayerMap = BTreeMap<Uuid, FighterSnapshot>;

/// Messages sent from client to server
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ClientMsg {
    /// Current input state, sent whenever local input changes
    PlayerInput(InputState),
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ServerMsg {
    /// Everyone on stage, sent once to a new connection
    CurrentPlayers { tick: u64, players: PlayerMap },

    /// Another fighter joined
    NewPlayer(FighterSnapshot),

    /// A fighter's connection closed
    PlayerDisconnected(Uuid),

    /// Per-tick full state
    GameState { tick: u64, players: PlayerMap },
}

/// Fighter state as seen by clients
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FighterSnapshot {
    pub id: Uuid,
    pub x: f32,
    pub y: f32,
    /// -1 or 1
    pub facing: Facing,
    /// May be negative
    pub health: f32,
    pub max_health: f32,
    pub attacking: bool,
    pub is_dead: bool,
    pub character_type: String,
}
