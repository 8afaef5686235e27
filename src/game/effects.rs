//! Deferred effects - cooldown and respawn timers applied at tick boundaries

use std::collections::BTreeMap;
use std::time::Duration;
use uuid::Uuid;

/// A state change that fires after a wall-clock delay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredEffect {
    /// Release the attacking lock
    AttackCooldownEnd(Uuid),
    /// Bring a dead fighter back
    Respawn(Uuid),
}

impl DeferredEffect {
    pub fn fighter_id(&self) -> Uuid {
        match self {
            DeferredEffect::AttackCooldownEnd(id) | DeferredEffect::Respawn(id) => *id,
        }
    }
}

/// Queue of pending effects ordered by due time, then by scheduling order
#[derive(Debug, Default)]
pub struct EffectQueue {
    pending: BTreeMap<(Duration, u64), DeferredEffect>,
    next_seq: u64,
}

impl EffectQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, due: Duration, effect: DeferredEffect) {
        self.pending.insert((due, self.next_seq), effect);
        self.next_seq += 1;
    }

    /// Remove and return every effect due at or before `now`, oldest first
    pub fn drain_due(&mut self, now: Duration) -> Vec<DeferredEffect> {
        let later = self.pending.split_off(&(now, u64::MAX));
        let due = std::mem::replace(&mut self.pending, later);
        due.into_values().collect()
    }

    /// Drop every pending effect for a fighter
    pub fn cancel_for(&mut self, id: Uuid) -> usize {
        let before = self.pending.len();
        self.pending.retain(|_, effect| effect.fighter_id() != id);
        before - self.pending.len()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
