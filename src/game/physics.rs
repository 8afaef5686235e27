//! Fighter movement: input, gravity, integration, ground clamp and knockback decay

use super::fighter::Fighter;
use super::JumpTrigger;

/// Stage width in world units
pub const STAGE_WIDTH: f32 = 640.0;
/// Stage height in world units (y grows downwards)
pub const STAGE_HEIGHT: f32 = 360.0;
/// The single ground plane fighters stand on
pub const GROUND_Y: f32 = STAGE_HEIGHT - 32.0;

pub const GRAVITY: f32 = 0.8;
/// Horizontal velocity multiplier per tick with no directional input
pub const FRICTION: f32 = 0.8;
pub const JUMP_IMPULSE: f32 = 15.0;
/// Knockback multiplier per tick
pub const KNOCKBACK_DECAY: f32 = 0.9;
/// Knockback below this snaps to zero
pub const KNOCKBACK_EPSILON: f32 = 0.1;

/// Physics system for advancing one fighter by one tick
pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Advance a live fighter by one tick using its buffered input
    pub fn step(fighter: &mut Fighter, jump_trigger: JumpTrigger) {
        let input = fighter.pending_input;

        // Horizontal movement; friction only without directional input
        if input.left {
            fighter.vx = -fighter.archetype.move_speed;
        } else if input.right {
            fighter.vx = fighter.archetype.move_speed;
        } else {
            fighter.vx *= FRICTION;
        }

        // Jump
        let jump_pressed = match jump_trigger {
            JumpTrigger::Level => input.jump,
            JumpTrigger::Edge => input.jump && !fighter.jump_was_held,
        };
        fighter.jump_was_held = input.jump;
        if jump_pressed && fighter.grounded {
            fighter.vy = -JUMP_IMPULSE;
            fighter.grounded = false;
        }

        fighter.vy += GRAVITY;

        fighter.x += fighter.vx;
        fighter.y += fighter.vy;

        fighter.x = fighter.x.clamp(0.0, STAGE_WIDTH);
        if fighter.y >= GROUND_Y {
            fighter.y = GROUND_Y;
            fighter.vy = 0.0;
            fighter.grounded = true;
        }

        Self::decay_knockback(fighter);
    }

    /// Layer the residual knockback onto vx, then decay it geometrically
    fn decay_knockback(fighter: &mut Fighter) {
        if fighter.knockback > 0.0 {
            fighter.vx += fighter.facing.sign() * fighter.knockback;
            fighter.knockback *= KNOCKBACK_DECAY;
            if fighter.knockback < KNOCKBACK_EPSILON {
                fighter.knockback = 0.0;
            }
        }
    }
}
