//! World state and the deterministic per-tick step (single writer)

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::btree_map::Entry;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use super::archetype::Archetype;
use super::combat::{AttackOutcome, CombatSystem};
use super::effects::{DeferredEffect, EffectQueue};
use super::fighter::{Fighter, InputState};
use super::lifecycle::{LifecycleSystem, SPAWN_Y};
use super::physics::PhysicsSystem;
use super::registry::FighterRegistry;
use super::{GameError, GameRules};

/// What happened during one step
#[derive(Debug, Default)]
pub struct StepReport {
    pub attacks: Vec<AttackOutcome>,
    pub deaths: Vec<Uuid>,
    pub respawns: Vec<Uuid>,
}

/// The authoritative world. Only the stage task owns one.
pub struct World {
    tick: u64,
    registry: FighterRegistry,
    effects: EffectQueue,
    rng: ChaCha8Rng,
    rules: GameRules,
}

impl World {
    pub fn new(seed: u64, rules: GameRules) -> Self {
        Self {
            tick: 0,
            registry: FighterRegistry::new(),
            effects: EffectQueue::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            rules,
        }
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn registry(&self) -> &FighterRegistry {
        &self.registry
    }

    pub fn rules(&self) -> GameRules {
        self.rules
    }

    /// Create a fighter with a randomly chosen archetype at a random spawn point.
    /// An identity that already exists keeps its fighter.
    pub fn spawn_fighter(&mut self, id: Uuid) -> Result<&Fighter, GameError> {
        match self.registry.entry(id) {
            Entry::Occupied(existing) => {
                warn!(fighter_id = %id, "Fighter already exists");
                Ok(&*existing.into_mut())
            }
            Entry::Vacant(slot) => {
                let names: Vec<&str> = Archetype::names().collect();
                let name = names
                    .choose(&mut self.rng)
                    .copied()
                    .ok_or_else(|| GameError::UnknownArchetype(String::from("<empty catalog>")))?;
                let archetype = Archetype::lookup(name)?;
                let spawn_x = LifecycleSystem::spawn_x(&mut self.rng);
                debug!(
                    fighter_id = %id,
                    archetype = archetype.name,
                    max_health = archetype.max_health,
                    base_damage = archetype.base_damage,
                    move_speed = archetype.move_speed,
                    "Spawning fighter"
                );
                Ok(&*slot.insert(Fighter::new(id, archetype, spawn_x, SPAWN_Y)))
            }
        }
    }

    /// Insert a pre-built fighter. Returns false if the id is taken.
    pub fn insert_fighter(&mut self, fighter: Fighter) -> bool {
        self.registry.insert(fighter)
    }

    /// Remove a fighter and cancel its pending timers
    pub fn remove_fighter(&mut self, id: &Uuid) -> Option<Fighter> {
        let removed = self.registry.remove(id)?;
        let cancelled = self.effects.cancel_for(*id);
        if cancelled > 0 {
            debug!(fighter_id = %id, cancelled, "Cancelled pending effects");
        }
        Some(removed)
    }

    /// Overwrite a fighter's buffered input. False if the fighter is gone.
    pub fn set_input(&mut self, id: &Uuid, input: InputState) -> bool {
        self.registry.set_input(id, input)
    }

    /// Run one tick. `now` is the wall-clock time since the stage started;
    /// timers that came due since the last tick are applied first.
    pub fn step(&mut self, now: Duration) -> StepReport {
        let mut report = StepReport::default();
        self.tick += 1;

        for effect in self.effects.drain_due(now) {
            self.apply_effect(effect, &mut report);
        }

        for id in self.registry.ids() {
            let Some(fighter) = self.registry.get_mut(&id) else {
                continue;
            };
            if !fighter.is_active() {
                continue;
            }

            PhysicsSystem::step(fighter, self.rules.jump_trigger);

            if let Some(outcome) = CombatSystem::resolve(&mut self.registry, &mut self.effects, id, now) {
                report.attacks.push(outcome);
            }

            if let Some(fighter) = self.registry.get_mut(&id) {
                if LifecycleSystem::check_death(fighter, &mut self.effects, now) {
                    report.deaths.push(id);
                }
            }
        }

        report
    }

    fn apply_effect(&mut self, effect: DeferredEffect, report: &mut StepReport) {
        let Some(fighter) = self.registry.get_mut(&effect.fighter_id()) else {
            debug!(?effect, "Effect for departed fighter ignored");
            return;
        };

        match effect {
            DeferredEffect::AttackCooldownEnd(_) => fighter.attacking = false,
            DeferredEffect::Respawn(id) => {
                if fighter.is_dead {
                    LifecycleSystem::respawn(fighter, &mut self.rng, self.rules.respawn_health);
                    report.respawns.push(id);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::archetype::{AttackKind, VEXA};
    use crate::game::lifecycle::{DEATH_Y, SPAWN_MARGIN};
    use crate::game::physics::{GROUND_Y, STAGE_WIDTH};

    const LOW: Uuid = Uuid::from_u128(1);
    const HIGH: Uuid = Uuid::from_u128(2);

    /// Wall-clock time at tick `n` of a 60 Hz loop
    fn at_tick(n: u64) -> Duration {
        Duration::from_micros(n * 1_000_000 / 60)
    }

    fn world() -> World {
        World::new(42, GameRules::default())
    }

    fn basic() -> InputState {
        InputState { basic: true, ..Default::default() }
    }

    #[test]
    fn spawned_fighter_uses_catalog_and_spawn_band() {
        let mut world = world();
        let fighter = world.spawn_fighter(LOW).unwrap();

        assert!(Archetype::lookup(fighter.archetype.name).is_ok());
        assert_eq!(fighter.health, fighter.archetype.max_health);
        assert_eq!(fighter.y, SPAWN_Y);
        assert!(fighter.x >= SPAWN_MARGIN && fighter.x <= STAGE_WIDTH - SPAWN_MARGIN);
    }

    #[test]
    fn spawning_existing_identity_keeps_original() {
        let mut world = world();
        let x = world.spawn_fighter(LOW).unwrap().x;
        let again = world.spawn_fighter(LOW).unwrap().x;
        assert_eq!(x, again);
        assert_eq!(world.registry().len(), 1);
    }

    #[test]
    fn spawn_returns_the_registered_fighter() {
        let mut world = world();
        let (id, x, name) = {
            let fighter = world.spawn_fighter(HIGH).unwrap();
            (fighter.id, fighter.x, fighter.archetype.name)
        };

        let stored = world.registry().get(&HIGH).unwrap();
        assert_eq!(id, HIGH);
        assert_eq!(stored.x, x);
        assert_eq!(stored.archetype.name, name);
    }

    #[test]
    fn same_seed_gives_same_simulation() {
        let run = || {
            let mut world = world();
            for n in 1..=4u128 {
                world.spawn_fighter(Uuid::from_u128(n)).unwrap();
            }
            for n in 1..=4u128 {
                world.set_input(&Uuid::from_u128(n), InputState { right: n % 2 == 0, basic: true, ..Default::default() });
            }
            for n in 1..=120 {
                world.step(at_tick(n));
            }
            world
                .registry()
                .iter()
                .map(|f| (f.id, f.archetype.name, f.x, f.y, f.health))
                .collect::<Vec<_>>()
        };

        assert_eq!(run(), run());
    }

    #[test]
    fn lower_identity_resolves_first_in_mutual_attack() {
        for (low_x, high_x) in [(200.0, 230.0), (230.0, 200.0)] {
            let mut world = world();
            world.insert_fighter(Fighter::new(LOW, &VEXA, low_x, GROUND_Y));
            world.insert_fighter(Fighter::new(HIGH, &VEXA, high_x, GROUND_Y));
            world.set_input(&LOW, basic());
            world.set_input(&HIGH, basic());

            let report = world.step(at_tick(1));

            // LOW hits first and knocks HIGH out of range before HIGH swings
            assert_eq!(report.attacks.len(), 2);
            assert_eq!(report.attacks[0].attacker_id, LOW);
            assert_eq!(report.attacks[0].hits.len(), 1);
            assert!(report.attacks[1].hits.is_empty());
            assert_eq!(world.registry().get(&LOW).unwrap().health, 100.0);
            assert_eq!(world.registry().get(&HIGH).unwrap().health, 88.0);
        }
    }

    #[test]
    fn at_most_one_attack_start_per_cooldown_window() {
        let mut world = world();
        world.insert_fighter(Fighter::new(LOW, &VEXA, 100.0, GROUND_Y));
        world.insert_fighter(Fighter::new(HIGH, &VEXA, 500.0, GROUND_Y));
        world.set_input(&LOW, InputState { basic: true, special: true, ult: true, ..Default::default() });

        let mut starts = Vec::new();
        for n in 1..=90 {
            let now = at_tick(n);
            for attack in world.step(now).attacks {
                assert_eq!(attack.kind, AttackKind::Basic);
                starts.push(now);
            }
        }

        assert_eq!(starts.len(), 5);
        for pair in starts.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(300));
        }
    }

    #[test]
    fn attacking_lock_releases_after_cooldown() {
        let mut world = world();
        world.insert_fighter(Fighter::new(LOW, &VEXA, 100.0, GROUND_Y));
        world.set_input(&LOW, basic());
        world.step(at_tick(1));
        world.set_input(&LOW, InputState::default());

        let mut released_at = None;
        for n in 2..=40 {
            world.step(at_tick(n));
            if !world.registry().get(&LOW).unwrap().attacking {
                released_at = Some(at_tick(n));
                break;
            }
        }

        let released_at = released_at.expect("lock never released");
        let held = released_at - at_tick(1);
        assert!(held >= Duration::from_millis(300));
        assert!(held < Duration::from_millis(300) + at_tick(1));
    }

    #[test]
    fn respawn_fires_three_seconds_after_death() {
        let mut world = world();
        world.insert_fighter(Fighter::new(LOW, &VEXA, 300.0, GROUND_Y));

        let died_at = at_tick(10);
        {
            let fighter = world.registry.get_mut(&LOW).unwrap();
            fighter.y = DEATH_Y + 5.0;
            fighter.health = -20.0;
            assert!(LifecycleSystem::check_death(fighter, &mut world.effects, died_at));
        }

        let mut respawned_at = None;
        for n in 11..=400 {
            let report = world.step(at_tick(n));
            let fighter = world.registry().get(&LOW).unwrap();
            if !fighter.is_dead {
                assert_eq!(report.respawns, vec![LOW]);
                respawned_at = Some(at_tick(n));
                break;
            }
            // Dead fighters are frozen in place
            assert_eq!(fighter.y, DEATH_Y + 5.0);
        }

        let respawned_at = respawned_at.expect("fighter never respawned");
        let delay = respawned_at - died_at;
        assert!(delay >= Duration::from_millis(3000));
        assert!(delay <= Duration::from_millis(3000) + at_tick(1));

        let fighter = world.registry().get(&LOW).unwrap();
        assert!(fighter.x >= SPAWN_MARGIN && fighter.x <= STAGE_WIDTH - SPAWN_MARGIN);
        assert_eq!(fighter.health, fighter.max_health);
    }

    #[test]
    fn removal_cancels_pending_timers() {
        let mut world = world();
        world.insert_fighter(Fighter::new(LOW, &VEXA, 100.0, GROUND_Y));
        world.set_input(&LOW, basic());
        world.step(at_tick(1));
        assert_eq!(world.effects.len(), 1);

        world.remove_fighter(&LOW);
        assert!(world.effects.is_empty());
        assert!(world.registry().is_empty());
    }

    #[test]
    fn stale_effect_for_missing_fighter_is_noop() {
        let mut world = world();
        world.insert_fighter(Fighter::new(LOW, &VEXA, 100.0, GROUND_Y));
        world.effects.schedule(at_tick(1), DeferredEffect::Respawn(HIGH));
        world.effects.schedule(at_tick(1), DeferredEffect::AttackCooldownEnd(HIGH));

        let report = world.step(at_tick(2));

        assert!(report.respawns.is_empty());
        assert_eq!(world.registry().len(), 1);
        assert!(world.effects.is_empty());
    }

    #[test]
    fn input_for_missing_fighter_is_dropped() {
        let mut world = world();
        assert!(!world.set_input(&LOW, basic()));
    }
}
