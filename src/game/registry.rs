//! Fighter registry - the single mutable ground truth, keyed by identity

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use uuid::Uuid;

use super::fighter::{Fighter, InputState};

/// Ordered table of fighters. Iteration is always ascending by identity.
#[derive(Debug, Default)]
pub struct FighterRegistry {
    fighters: BTreeMap<Uuid, Fighter>,
}

impl FighterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fighter. Returns false (and keeps the existing entry) if the id is taken.
    pub fn insert(&mut self, fighter: Fighter) -> bool {
        if self.fighters.contains_key(&fighter.id) {
            return false;
        }
        self.fighters.insert(fighter.id, fighter);
        true
    }

    /// Slot for `id`, for insert-if-absent
    pub fn entry(&mut self, id: Uuid) -> Entry<'_, Uuid, Fighter> {
        self.fighters.entry(id)
    }

    pub fn remove(&mut self, id: &Uuid) -> Option<Fighter> {
        self.fighters.remove(id)
    }

    pub fn get(&self, id: &Uuid) -> Option<&Fighter> {
        self.fighters.get(id)
    }

    pub fn get_mut(&mut self, id: &Uuid) -> Option<&mut Fighter> {
        self.fighters.get_mut(id)
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.fighters.contains_key(id)
    }

    /// Overwrite the buffered input (last write wins). Returns false for unknown ids.
    pub fn set_input(&mut self, id: &Uuid, input: InputState) -> bool {
        match self.fighters.get_mut(id) {
            Some(fighter) => {
                fighter.pending_input = input;
                true
            }
            None => false,
        }
    }

    /// Snapshot of identities in simulation order
    pub fn ids(&self) -> Vec<Uuid> {
        self.fighters.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Fighter> {
        self.fighters.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Fighter> {
        self.fighters.values_mut()
    }

    /// Fighters that are not waiting to respawn
    pub fn active_count(&self) -> usize {
        self.fighters.values().filter(|f| f.is_active()).count()
    }

    pub fn len(&self) -> usize {
        self.fighters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fighters.is_empty()
    }
}
