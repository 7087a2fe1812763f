//! Per-process group affiliation cache.
//!
//! Survives restarts of the radar while the same target process keeps
//! running. Data is only meaningful for the process id it was recorded
//! against.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::entity::{EntityId, EntitySnapshot};

pub type GroupId = i32;
pub type AffiliationId = i32;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistentCache {
    /// Process id this cache is tied to
    #[serde(alias = "pid")]
    pub process_id: u32,
    /// Group/session id -> (entity id -> affiliation id)
    pub groups: BTreeMap<GroupId, BTreeMap<EntityId, AffiliationId>>,
}

impl PersistentCache {
    pub fn new(process_id: u32) -> Self {
        Self {
            process_id,
            groups: BTreeMap::new(),
        }
    }

    pub fn is_valid_for(&self, process_id: u32) -> bool {
        self.process_id == process_id
    }

    /// Bind the cache to `process_id`, discarding data recorded for any
    /// other process.
    ///
    /// Returns `true` if stale data was discarded.
    pub fn bind_to(&mut self, process_id: u32) -> bool {
        if self.is_valid_for(process_id) {
            return false;
        }
        let stale = !self.groups.is_empty();
        if stale {
            info!(
                "Discarding cache for pid {} ({} groups); attached pid is {}",
                self.process_id,
                self.groups.len(),
                process_id
            );
        }
        *self = Self::new(process_id);
        stale
    }

    pub fn record(&mut self, group: GroupId, entity: EntityId, affiliation: AffiliationId) {
        self.groups
            .entry(group)
            .or_default()
            .insert(entity, affiliation);
    }

    pub fn affiliation(&self, group: GroupId, entity: EntityId) -> Option<AffiliationId> {
        self.groups.get(&group)?.get(&entity).copied()
    }

    pub fn group(&self, group: GroupId) -> Option<&BTreeMap<EntityId, AffiliationId>> {
        self.groups.get(&group)
    }

    /// Record the team of every valid entity in `snapshot` under its session.
    ///
    /// Returns the number of new or changed entries. Snapshots without a
    /// session id are ignored.
    pub fn record_snapshot(&mut self, snapshot: &EntitySnapshot) -> usize {
        let Some(session) = snapshot.session_id() else {
            return 0;
        };

        let group = self.groups.entry(session).or_default();
        let mut changed = 0;
        for entity in snapshot.entities().iter().filter(|e| e.is_valid) {
            if group.insert(entity.id, entity.team) != Some(entity.team) {
                changed += 1;
            }
        }
        changed
    }

    pub fn clear(&mut self) {
        self.groups.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total entries across all groups
    pub fn len(&self) -> usize {
        self.groups.values().map(BTreeMap::len).sum()
    }
}
