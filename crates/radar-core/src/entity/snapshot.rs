//! Immutable per-tick entity snapshots and their published handle.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use tracing::debug;

use super::{Entity, EntityId};
use crate::spatial;

/// The complete set of decoded entities valid for one scan tick.
///
/// Never mutated after construction. The local player is stored by id and is
/// guaranteed to be a member of `entities`.
#[derive(Debug, Clone)]
pub struct EntitySnapshot {
    entities: Vec<Entity>,
    local_player: Option<EntityId>,
    session_id: Option<i32>,
    tick: u64,
    captured_at: DateTime<Utc>,
}

impl EntitySnapshot {
    /// Snapshot published before the first successful scan
    pub fn empty() -> Self {
        Self {
            entities: Vec::new(),
            local_player: None,
            session_id: None,
            tick: 0,
            captured_at: Utc::now(),
        }
    }

    /// Build a snapshot from decoded entities.
    ///
    /// Entities with an id already seen earlier in the sequence are dropped.
    /// A `local_player` id that matches no entity is discarded.
    pub fn new(entities: Vec<Entity>, local_player: Option<EntityId>, tick: u64) -> Self {
        let mut seen = HashSet::with_capacity(entities.len());
        let entities: Vec<Entity> = entities
            .into_iter()
            .filter(|e| {
                let first = seen.insert(e.id);
                if !first {
                    debug!("Dropping duplicate entity id {}", e.id);
                }
                first
            })
            .collect();

        let local_player = local_player.filter(|id| seen.contains(id));

        Self {
            entities,
            local_player,
            session_id: None,
            tick,
            captured_at: Utc::now(),
        }
    }

    pub fn with_session(mut self, session_id: Option<i32>) -> Self {
        self.session_id = session_id;
        self
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id == id)
    }

    pub fn local_player(&self) -> Option<&Entity> {
        self.local_player.and_then(|id| self.get(id))
    }

    pub fn local_player_id(&self) -> Option<EntityId> {
        self.local_player
    }

    pub fn session_id(&self) -> Option<i32> {
        self.session_id
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Valid, living entities other than the local player within
    /// `max_distance` of it (inclusive), nearest first.
    ///
    /// Empty when no local player is present.
    pub fn nearby(&self, max_distance: f32) -> Vec<&Entity> {
        match self.local_player() {
            Some(local) => spatial::nearby(local, &self.entities, max_distance),
            None => Vec::new(),
        }
    }
}

impl Default for EntitySnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

/// Shared handle to the latest published snapshot.
///
/// Publication replaces the whole `Arc` in one step; readers clone the `Arc`
/// and keep a consistent snapshot for as long as they hold it.
#[derive(Debug, Clone)]
pub struct SnapshotHandle {
    current: Arc<RwLock<Arc<EntitySnapshot>>>,
}

impl SnapshotHandle {
    pub fn new() -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(EntitySnapshot::empty()))),
        }
    }

    /// Latest published snapshot
    pub fn load(&self) -> Arc<EntitySnapshot> {
        // The guarded value is a single pointer and cannot be left half-written
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Replace the published snapshot
    pub fn publish(&self, snapshot: EntitySnapshot) {
        let next = Arc::new(snapshot);
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        *guard = next;
    }

    /// Owned result of [`EntitySnapshot::nearby`] on the latest snapshot
    pub fn nearby(&self, max_distance: f32) -> Vec<Entity> {
        self.load()
            .nearby(max_distance)
            .into_iter()
            .cloned()
            .collect()
    }
}

impl Default for SnapshotHandle {
    fn default() -> Self {
        Self::new()
    }
}
