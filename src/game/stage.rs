//! Stage task: fixed-rate simulation clock and session event intake

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::util::time::{tick_duration, SIMULATION_TPS};
use crate::ws::protocol::{FighterSnapshot, ServerMsg};

use super::snapshot::SnapshotBuilder;
use super::world::World;
use super::{GameError, GameRules, InputState};

/// Events from connection handlers, applied between ticks
#[derive(Debug)]
pub enum SessionEvent {
    /// Connection opened; the reply carries the `currentPlayers` snapshot
    Join {
        fighter_id: Uuid,
        reply: oneshot::Sender<ServerMsg>,
    },
    /// Latest input from a connection
    Input { fighter_id: Uuid, input: InputState },
    /// Connection closed
    Leave { fighter_id: Uuid },
}

/// Handle to the running stage
#[derive(Clone)]
pub struct StageHandle {
    pub event_tx: mpsc::Sender<SessionEvent>,
    pub snapshot_tx: broadcast::Sender<ServerMsg>,
    active_fighters: Arc<AtomicUsize>,
    tick: Arc<AtomicU64>,
}

impl StageHandle {
    /// Fighters currently in play, excluding those waiting to respawn
    pub fn active_fighters(&self) -> usize {
        self.active_fighters.load(Ordering::Relaxed)
    }

    pub fn tick(&self) -> u64 {
        self.tick.load(Ordering::Relaxed)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerMsg> {
        self.snapshot_tx.subscribe()
    }
}

/// The authoritative stage
pub struct Stage {
    world: World,
    event_rx: mpsc::Receiver<SessionEvent>,
    snapshot_tx: broadcast::Sender<ServerMsg>,
    snapshot_builder: SnapshotBuilder,
    active_fighters: Arc<AtomicUsize>,
    tick: Arc<AtomicU64>,
}

impl Stage {
    /// Create a new stage
    pub fn new(seed: u64, rules: GameRules) -> (Self, StageHandle) {
        let (event_tx, event_rx) = mpsc::channel(1024);
        let (snapshot_tx, _) = broadcast::channel(128);
        let active_fighters = Arc::new(AtomicUsize::new(0));
        let tick = Arc::new(AtomicU64::new(0));

        let handle = StageHandle {
            event_tx,
            snapshot_tx: snapshot_tx.clone(),
            active_fighters: active_fighters.clone(),
            tick: tick.clone(),
        };

        let stage = Self {
            world: World::new(seed, rules),
            event_rx,
            snapshot_tx,
            snapshot_builder: SnapshotBuilder::new(),
            active_fighters,
            tick,
        };

        (stage, handle)
    }

    /// Run the authoritative tick loop until every handle is dropped
    pub async fn run(mut self) -> Result<(), GameError> {
        info!(tps = SIMULATION_TPS, rules = ?self.world.rules(), "Stage started");

        let mut tick_interval = interval(tick_duration());
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let started = Instant::now();

        loop {
            tick_interval.tick().await;

            // Network events land between ticks, never during one
            if !self.process_events()? {
                break;
            }

            self.run_tick(started.elapsed());
        }

        info!(tick = self.world.tick(), "Stage stopped");
        Ok(())
    }

    /// Drain pending session events. Returns false once all senders are gone.
    fn process_events(&mut self) -> Result<bool, GameError> {
        loop {
            match self.event_rx.try_recv() {
                Ok(event) => self.handle_event(event)?,
                Err(TryRecvError::Empty) => return Ok(true),
                Err(TryRecvError::Disconnected) => return Ok(false),
            }
        }
    }

    fn handle_event(&mut self, event: SessionEvent) -> Result<(), GameError> {
        match event {
            SessionEvent::Join { fighter_id, reply } => self.handle_join(fighter_id, reply)?,
            SessionEvent::Input { fighter_id, input } => {
                if !self.world.set_input(&fighter_id, input) {
                    debug!(fighter_id = %fighter_id, "Input for unknown fighter dropped");
                }
            }
            SessionEvent::Leave { fighter_id } => self.handle_leave(fighter_id),
        }
        Ok(())
    }

    fn handle_join(&mut self, fighter_id: Uuid, reply: oneshot::Sender<ServerMsg>) -> Result<(), GameError> {
        let fighter = self.world.spawn_fighter(fighter_id)?;
        let snapshot = FighterSnapshot::from(fighter);

        info!(
            fighter_id = %fighter_id,
            archetype = %snapshot.character_type,
            x = snapshot.x,
            "Fighter joined"
        );

        self.publish_active_fighters();

        let current = SnapshotBuilder::build_initial(self.world.tick(), self.world.registry());
        if reply.send(current).is_err() {
            warn!(fighter_id = %fighter_id, "Connection gone before currentPlayers");
        }

        let _ = self.snapshot_tx.send(ServerMsg::NewPlayer(snapshot));
        Ok(())
    }

    fn handle_leave(&mut self, fighter_id: Uuid) {
        if self.world.remove_fighter(&fighter_id).is_none() {
            return;
        }

        self.publish_active_fighters();
        let _ = self.snapshot_tx.send(ServerMsg::PlayerDisconnected(fighter_id));

        info!(
            fighter_id = %fighter_id,
            fighter_count = self.world.registry().len(),
            "Fighter left"
        );
    }

    fn publish_active_fighters(&self) {
        self.active_fighters
            .store(self.world.registry().active_count(), Ordering::Relaxed);
    }

    /// Step the world and broadcast the resulting state
    fn run_tick(&mut self, now: std::time::Duration) {
        let report = self.world.step(now);

        for attack in &report.attacks {
            for hit in &attack.hits {
                debug!(
                    attacker_id = %attack.attacker_id,
                    target_id = %hit.target_id,
                    kind = ?attack.kind,
                    damage = hit.damage,
                    knockback = hit.knockback,
                    "Hit"
                );
            }
        }

        let tick = self.world.tick();
        self.tick.store(tick, Ordering::Relaxed);
        self.publish_active_fighters();

        if !report.deaths.is_empty() || !report.respawns.is_empty() {
            debug!(
                tick,
                deaths = ?report.deaths,
                respawns = ?report.respawns,
                "Lifecycle transitions"
            );
        }

        // No receivers is fine: nobody is connected
        let snapshot = self.snapshot_builder.build(tick, self.world.registry());
        let _ = self.snapshot_tx.send(snapshot);
    }
}
