//! Death and respawn transitions

use rand::Rng;
use std::time::Duration;
use tracing::info;

use super::effects::{DeferredEffect, EffectQueue};
use super::fighter::Fighter;
use super::physics::{STAGE_HEIGHT, STAGE_WIDTH};
use super::RespawnHealth;

/// Falling past this y kills a fighter
pub const DEATH_Y: f32 = STAGE_HEIGHT + 100.0;
/// Height fighters (re)spawn at; gravity settles them onto the ground
pub const SPAWN_Y: f32 = STAGE_HEIGHT - 60.0;
/// Horizontal margin kept free at each stage edge when spawning
pub const SPAWN_MARGIN: f32 = 50.0;
pub const RESPAWN_DELAY: Duration = Duration::from_millis(3000);

/// Lifecycle system for the Alive -> Dead -> Alive cycle
pub struct LifecycleSystem;

impl LifecycleSystem {
    /// Random spawn x in [SPAWN_MARGIN, STAGE_WIDTH - SPAWN_MARGIN)
    pub fn spawn_x<R: Rng>(rng: &mut R) -> f32 {
        rng.gen_range(SPAWN_MARGIN..STAGE_WIDTH - SPAWN_MARGIN)
    }

    /// Kill a fighter that fell off-stage. Health plays no part.
    /// Returns true on the Alive -> Dead transition.
    pub fn check_death(fighter: &mut Fighter, effects: &mut EffectQueue, now: Duration) -> bool {
        if fighter.is_dead || fighter.y <= DEATH_Y {
            return false;
        }

        fighter.is_dead = true;
        effects.schedule(now + RESPAWN_DELAY, DeferredEffect::Respawn(fighter.id));
        info!(fighter_id = %fighter.id, y = fighter.y, "Fighter fell off stage");
        true
    }

    /// Reset a dead fighter in place: same identity, fresh spawn point
    pub fn respawn<R: Rng>(fighter: &mut Fighter, rng: &mut R, policy: RespawnHealth) {
        if !fighter.is_dead {
            return;
        }

        fighter.x = Self::spawn_x(rng);
        fighter.y = SPAWN_Y;
        fighter.vx = 0.0;
        fighter.vy = 0.0;
        fighter.knockback = 0.0;
        fighter.grounded = false;
        fighter.health = match policy {
            RespawnHealth::Full => fighter.max_health,
            RespawnHealth::Zero => 0.0,
        };
        fighter.is_dead = false;

        info!(fighter_id = %fighter.id, x = fighter.x, "Fighter respawned");
    }
}
