//! Authoritative hostile entity state and identifier allocation.

use std::{collections::BTreeMap, time::Duration};

use errand_core::{CellCoord, EntityId, EntityKind, EntitySnapshot};

/// State of a single entity stored inside the world.
#[derive(Clone, Debug)]
pub(crate) struct EntityState {
    pub(crate) id: EntityId,
    pub(crate) kind: EntityKind,
    pub(crate) cell: CellCoord,
    pub(crate) hop: Option<Hop>,
    pub(crate) alive: bool,
}

impl EntityState {
    pub(crate) fn snapshot(&self) -> EntitySnapshot {
        EntitySnapshot {
            id: self.id,
            kind: self.kind,
            cell: self.cell,
            hop_from: self.hop.map(|hop| hop.from),
            alive: self.alive,
        }
    }
}

/// Hop in progress, shared by the player and entities.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Hop {
    pub(crate) from: CellCoord,
    pub(crate) remaining: Duration,
}

/// Registry that stores entities, allocates identifiers and queues respawns.
#[derive(Debug)]
pub(crate) struct EntityRegistry {
    entries: BTreeMap<EntityId, EntityState>,
    next_entity_id: EntityId,
    pending_respawns: Vec<EntityKind>,
}

impl EntityRegistry {
    pub(crate) fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_entity_id: EntityId::new(0),
            pending_respawns: Vec::new(),
        }
    }

    pub(crate) fn spawn(&mut self, kind: EntityKind, cell: CellCoord) -> EntityId {
        let id = self.next_entity_id;
        self.next_entity_id = EntityId::new(id.get().saturating_add(1));
        let previous = self.entries.insert(
            id,
            EntityState {
                id,
                kind,
                cell,
                hop: None,
                alive: true,
            },
        );
        debug_assert!(previous.is_none(), "entity identifiers are never reused");
        id
    }

    pub(crate) fn get_mut(&mut self, id: EntityId) -> Option<&mut EntityState> {
        self.entries.get_mut(&id)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &EntityState> {
        self.entries.values()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut EntityState> {
        self.entries.values_mut()
    }

    /// Marks the entity dead and queues its kind for respawn.
    ///
    /// Returns the captured state, or `None` when the entity is missing or already dead.
    pub(crate) fn capture(&mut self, id: EntityId) -> Option<&EntityState> {
        let entity = self.entries.get_mut(&id).filter(|entity| entity.alive)?;
        entity.alive = false;
        entity.hop = None;
        self.pending_respawns.push(entity.kind);
        Some(entity)
    }

    pub(crate) fn remove_dead(&mut self) -> u32 {
        let before = self.entries.len();
        self.entries.retain(|_, entity| entity.alive);
        u32::try_from(before - self.entries.len()).unwrap_or(u32::MAX)
    }

    pub(crate) fn pending_respawns(&self) -> &[EntityKind] {
        &self.pending_respawns
    }

    pub(crate) fn take_pending_respawns(&mut self) -> Vec<EntityKind> {
        std::mem::take(&mut self.pending_respawns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_allocates_sequential_identifiers() {
        let mut registry = EntityRegistry::new();
        let first = registry.spawn(EntityKind::Red, CellCoord::new(1, 1));
        let second = registry.spawn(EntityKind::Blue, CellCoord::new(2, 2));
        assert_eq!(first.get(), 0);
        assert_eq!(second.get(), 1);
        assert_eq!(registry.iter().count(), 2);
    }

    #[test]
    fn capture_is_idempotent_and_queues_one_respawn() {
        let mut registry = EntityRegistry::new();
        let id = registry.spawn(EntityKind::Purple, CellCoord::new(0, 0));

        assert!(registry.capture(id).is_some());
        assert!(registry.capture(id).is_none());
        assert_eq!(registry.pending_respawns(), &[EntityKind::Purple]);

        assert_eq!(registry.take_pending_respawns(), vec![EntityKind::Purple]);
        assert!(registry.pending_respawns().is_empty());
    }

    #[test]
    fn remove_dead_keeps_living_entities() {
        let mut registry = EntityRegistry::new();
        let doomed = registry.spawn(EntityKind::Red, CellCoord::new(0, 0));
        let survivor = registry.spawn(EntityKind::Red, CellCoord::new(1, 0));
        let _ = registry.capture(doomed);

        assert_eq!(registry.remove_dead(), 1);
        let remaining: Vec<_> = registry.iter().map(|entity| entity.id).collect();
        assert_eq!(remaining, vec![survivor]);
    }
}
