//! Combat system - attack start, proximity hit test, damage and knockback

use std::time::Duration;
use uuid::Uuid;

use super::archetype::AttackKind;
use super::effects::{DeferredEffect, EffectQueue};
use super::fighter::{Facing, Fighter};
use super::registry::FighterRegistry;

/// Half-extents of the axis-aligned proximity box around the attacker
pub const HIT_RANGE_X: f32 = 50.0;
pub const HIT_RANGE_Y: f32 = 50.0;
/// Share of the target's post-damage health added to knockback
pub const KNOCKBACK_HEALTH_FACTOR: f32 = 0.3;
/// How long the attacking lock is held after an attack starts
pub const ATTACK_COOLDOWN: Duration = Duration::from_millis(300);

/// A single landed hit
#[derive(Debug, Clone, PartialEq)]
pub struct HitResult {
    pub target_id: Uuid,
    pub damage: f32,
    pub knockback: f32,
}

/// An attack that started this tick, with whatever it hit
#[derive(Debug, Clone, PartialEq)]
pub struct AttackOutcome {
    pub attacker_id: Uuid,
    pub kind: AttackKind,
    pub hits: Vec<HitResult>,
}

/// Combat system for resolving a fighter's attack inputs
pub struct CombatSystem;

impl CombatSystem {
    /// First requested attack kind, if the fighter is free to attack
    pub fn requested_attack(fighter: &Fighter) -> Option<AttackKind> {
        if fighter.attacking || !fighter.is_active() {
            return None;
        }
        AttackKind::ALL
            .into_iter()
            .find(|kind| fighter.pending_input.wants(*kind))
    }

    /// Is the target inside the attacker's proximity box
    pub fn in_range(attacker: &Fighter, target: &Fighter) -> bool {
        (target.x - attacker.x).abs() < HIT_RANGE_X && (target.y - attacker.y).abs() < HIT_RANGE_Y
    }

    /// Apply one attack's damage and knockback to a target
    pub fn apply_hit(attacker_x: f32, target: &mut Fighter, damage: f32, knockback_base: f32) -> f32 {
        target.health -= damage;
        target.knockback = knockback_base + target.health * KNOCKBACK_HEALTH_FACTOR;
        target.facing = Facing::away_from(attacker_x, target.x);
        target.vx = target.facing.sign() * target.knockback;
        target.knockback
    }

    /// Start at most one attack for `attacker_id` and resolve its hits.
    /// Schedules the cooldown that releases the attacking lock.
    pub fn resolve(
        registry: &mut FighterRegistry,
        effects: &mut EffectQueue,
        attacker_id: Uuid,
        now: Duration,
    ) -> Option<AttackOutcome> {
        let attacker = registry.get_mut(&attacker_id)?;
        let kind = Self::requested_attack(attacker)?;

        attacker.attacking = true;
        let attacker = attacker.clone();
        let stats = attacker.archetype.attack(kind);
        effects.schedule(now + ATTACK_COOLDOWN, DeferredEffect::AttackCooldownEnd(attacker_id));

        let mut hits = Vec::new();
        for target in registry.iter_mut() {
            if target.id == attacker_id || !target.is_active() {
                continue;
            }
            if !Self::in_range(&attacker, target) {
                continue;
            }

            let knockback = Self::apply_hit(attacker.x, target, stats.damage, stats.knockback_base);
            hits.push(HitResult {
                target_id: target.id,
                damage: stats.damage,
                knockback,
            });
        }

        Some(AttackOutcome {
            attacker_id,
            kind,
            hits,
        })
    }
}
