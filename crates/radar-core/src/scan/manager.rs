use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, error, trace};

use super::{EntityLayout, EntityWalker};
use crate::entity::{Entity, EntitySnapshot, SnapshotHandle};
use crate::error::Result;
use crate::memory::MemoryProvider;

/// Scans the target once per tick and publishes the result as a snapshot.
///
/// The manager owns its provider; it is driven from a single scheduler thread
/// while any number of readers hold clones of [`EntityManager::snapshots`].
pub struct EntityManager {
    provider: Box<dyn MemoryProvider>,
    walker: Box<dyn EntityWalker>,
    layout: EntityLayout,
    snapshots: SnapshotHandle,
    max_entities: usize,
    tick: u64,
}

impl EntityManager {
    pub fn new(
        provider: Box<dyn MemoryProvider>,
        walker: Box<dyn EntityWalker>,
        layout: EntityLayout,
        max_entities: usize,
    ) -> Self {
        Self {
            provider,
            walker,
            layout,
            snapshots: SnapshotHandle::new(),
            max_entities,
            tick: 0,
        }
    }

    /// Publish into an existing handle instead of a private one
    pub fn publishing_to(mut self, snapshots: SnapshotHandle) -> Self {
        self.snapshots = snapshots;
        self
    }

    /// Handle for reading published snapshots from other threads
    pub fn snapshots(&self) -> SnapshotHandle {
        self.snapshots.clone()
    }

    pub fn provider(&self) -> &dyn MemoryProvider {
        self.provider.as_ref()
    }

    pub fn provider_mut(&mut self) -> &mut dyn MemoryProvider {
        self.provider.as_mut()
    }

    /// Run one scan tick.
    ///
    /// Returns `true` if a new snapshot was published. When detached, or when
    /// the scan fails, the previous snapshot stays published untouched.
    pub fn update(&mut self) -> bool {
        if !self.provider.is_attached() {
            return false;
        }

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.scan()));
        match outcome {
            Ok(Ok(snapshot)) => {
                trace!(
                    "Tick {}: {} entities, local player {:?}",
                    snapshot.tick(),
                    snapshot.len(),
                    snapshot.local_player_id()
                );
                self.tick = snapshot.tick();
                self.snapshots.publish(snapshot);
                true
            }
            Ok(Err(e)) => {
                error!("Error updating entities: {}", e);
                false
            }
            Err(_) => {
                error!("Entity update panicked; keeping previous snapshot");
                false
            }
        }
    }

    /// Build a complete candidate snapshot without touching the published one
    fn scan(&self) -> Result<EntitySnapshot> {
        let walk = self.walker.walk(self.provider.as_ref())?;

        let mut entities = Vec::with_capacity(walk.records.len().min(self.max_entities));
        let mut local_player = None;
        let mut dropped = 0usize;

        for &address in walk.records.iter().take(self.max_entities) {
            match self.layout.decode(self.provider.as_ref(), address) {
                Ok(record) => {
                    let is_local = walk.local_record == Some(address)
                        || record.is_flagged_local(self.layout.local_flag_mask);
                    if is_local && local_player.is_none() {
                        local_player = Some(record.entity.id);
                    }
                    entities.push(record.entity);
                }
                Err(e) => {
                    dropped += 1;
                    debug!("Dropping entity record: {}", e);
                }
            }
        }

        if dropped > 0 {
            debug!("Dropped {} of {} entity records", dropped, walk.records.len());
        }

        Ok(EntitySnapshot::new(entities, local_player, self.tick + 1)
            .with_session(walk.session_id))
    }

    /// Latest published snapshot
    pub fn entities(&self) -> Arc<EntitySnapshot> {
        self.snapshots.load()
    }

    pub fn local_player(&self) -> Option<Entity> {
        self.snapshots.load().local_player().cloned()
    }

    /// Entities within `max_distance` of the local player, nearest first.
    ///
    /// Excludes the local player and invalid entities; empty when no local
    /// player is present.
    pub fn get_nearby_entities(&self, max_distance: f32) -> Vec<Entity> {
        self.snapshots.nearby(max_distance)
    }
}

impl Drop for EntityManager {
    fn drop(&mut self) {
        if self.provider.is_attached() {
            self.provider.detach();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::memory::{MemoryImage, MemoryImageBuilder};
    use crate::scan::{PointerListWalker, Walk};
    use std::sync::Mutex;

    const BASE: u64 = 0x1_4000_0000;
    const LIST: u64 = 0x2000_0000;
    const RECORDS: u64 = 0x3000_0000;
    const RECORD_SIZE: u64 = 0x100;

    struct Record {
        id: i32,
        position: [f32; 3],
        health: f32,
        local: bool,
    }

    fn record(id: i32, x: f32, y: f32, z: f32) -> Record {
        Record {
            id,
            position: [x, y, z],
            health: 100.0,
            local: false,
        }
    }

    fn build_image(records: &[Record]) -> MemoryImage {
        let layout = EntityLayout::default();
        let mut builder = MemoryImageBuilder::new()
            .process("game.exe", 4321)
            .base_address(BASE)
            .write_u64(BASE + 0x100, LIST);

        for (i, r) in records.iter().enumerate() {
            let addr = RECORDS + i as u64 * RECORD_SIZE;
            builder = builder
                .write_u64(LIST + i as u64 * 8, addr)
                .write_i32(addr + layout.id, r.id)
                .write_i32(addr + layout.team, r.id % 2)
                .write_u32(addr + layout.flags, if r.local { 0x1 } else { 0 })
                .write_f32(addr + layout.health, r.health)
                .write_f32(addr + layout.max_health, 100.0)
                .write_f32(addr + layout.position, r.position[0])
                .write_f32(addr + layout.position + 4, r.position[1])
                .write_f32(addr + layout.position + 8, r.position[2])
                .write_string(addr + layout.name, &format!("Entity_{}", r.id), layout.name_len);
        }
        builder.build()
    }

    fn manager_for(image: MemoryImage, max_entities: usize) -> EntityManager {
        let mut image = image;
        assert!(image.attach("game.exe"));
        EntityManager::new(
            Box::new(image),
            Box::new(PointerListWalker::new(0x100, max_entities)),
            EntityLayout::default(),
            max_entities,
        )
    }

    fn local(mut r: Record) -> Record {
        r.local = true;
        r
    }

    #[test]
    fn test_update_publishes_snapshot_and_local_player() {
        let image = build_image(&[
            local(record(0, 0.0, 0.0, 0.0)),
            record(1, 10.0, 0.0, 0.0),
            record(2, 0.0, 30.0, 0.0),
        ]);
        let mut manager = manager_for(image, 3);

        assert!(manager.update());
        let snapshot = manager.entities();
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.tick(), 1);
        assert_eq!(manager.local_player().unwrap().id, 0);

        let nearby = manager.get_nearby_entities(15.0);
        assert_eq!(nearby.len(), 1);
        assert_eq!(nearby[0].id, 1);
        assert_eq!(nearby[0].name, "Entity_1");
    }

    #[test]
    fn test_update_detached_is_noop() {
        let image = build_image(&[local(record(0, 0.0, 0.0, 0.0))]);
        let mut manager = manager_for(image, 1);
        assert!(manager.update());
        let before = manager.entities();

        manager.provider_mut().detach();
        assert!(!manager.update());
        assert!(Arc::ptr_eq(&before, &manager.entities()));
        assert_eq!(manager.local_player().unwrap().id, 0);
    }

    #[test]
    fn test_invalid_records_dropped_without_failing_tick() {
        let mut bad = record(1, f32::NAN, 0.0, 0.0);
        bad.health = 50.0;
        let mut overhealed = record(2, 1.0, 0.0, 0.0);
        overhealed.health = 500.0;
        let image = build_image(&[
            local(record(0, 0.0, 0.0, 0.0)),
            bad,
            overhealed,
            record(3, 2.0, 0.0, 0.0),
        ]);
        let mut manager = manager_for(image, 4);

        assert!(manager.update());
        let ids: Vec<i32> = manager.entities().entities().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![0, 3]);
    }

    #[test]
    fn test_wild_pointers_dropped_without_failing_tick() {
        let mut image =
            build_image(&[local(record(0, 0.0, 0.0, 0.0)), record(1, 4.0, 0.0, 0.0)]);
        image.write(LIST + 16, &u64::MAX.to_le_bytes());
        image.write(LIST + 24, &(u64::MAX - 2).to_le_bytes());
        let mut manager = manager_for(image, 4);

        assert!(manager.update());
        let ids: Vec<i32> = manager.entities().entities().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![0, 1]);
        assert_eq!(manager.local_player().unwrap().id, 0);
        assert_eq!(manager.get_nearby_entities(10.0).len(), 1);
    }

    #[test]
    fn test_max_entities_caps_walk() {
        let image = build_image(&[
            record(0, 0.0, 0.0, 0.0),
            record(1, 1.0, 0.0, 0.0),
            record(2, 2.0, 0.0, 0.0),
        ]);
        let mut manager = manager_for(image, 2);
        assert!(manager.update());
        assert_eq!(manager.entities().len(), 2);
    }

    #[test]
    fn test_local_player_cleared_when_absent() {
        let image = build_image(&[local(record(0, 0.0, 0.0, 0.0)), record(1, 1.0, 0.0, 0.0)]);
        let mut manager = manager_for(image, 2);
        assert!(manager.update());
        assert!(manager.local_player().is_some());

        // Local player no longer flagged on the next tick
        let mut image = build_image(&[record(0, 0.0, 0.0, 0.0), record(1, 1.0, 0.0, 0.0)]);
        assert!(image.attach("game.exe"));
        manager.set_provider(Box::new(image));

        assert!(manager.update());
        assert!(manager.local_player().is_none());
        assert!(manager.get_nearby_entities(100.0).is_empty());
    }

    #[test]
    fn test_publishing_to_shared_handle() {
        let image = build_image(&[local(record(0, 0.0, 0.0, 0.0)), record(1, 3.0, 4.0, 0.0)]);
        let shared = SnapshotHandle::new();
        let mut manager = manager_for(image, 2).publishing_to(shared.clone());

        assert!(manager.update());
        assert_eq!(shared.load().tick(), 1);
        let nearby = shared.nearby(5.0);
        assert_eq!(nearby.len(), 1);
        assert_eq!(nearby[0].distance_to(&manager.local_player().unwrap()), 5.0);
    }

    /// Walker that fails on demand
    struct ScriptedWalker {
        inner: PointerListWalker,
        mode: Arc<Mutex<&'static str>>,
    }

    impl EntityWalker for ScriptedWalker {
        fn walk(&self, memory: &dyn MemoryProvider) -> Result<Walk> {
            let mode = *self.mode.lock().unwrap();
            match mode {
                "error" => Err(Error::MemoryReadFailed {
                    address: 0,
                    message: "bus fault".to_string(),
                }),
                "panic" => panic!("walker exploded"),
                _ => self.inner.walk(memory),
            }
        }
    }

    #[test]
    fn test_failed_tick_retains_previous_snapshot() {
        let mut image =
            build_image(&[local(record(0, 0.0, 0.0, 0.0)), record(1, 5.0, 0.0, 0.0)]);
        assert!(image.attach("game.exe"));
        let mode = Arc::new(Mutex::new("ok"));
        let mut manager = EntityManager::new(
            Box::new(image),
            Box::new(ScriptedWalker {
                inner: PointerListWalker::new(0x100, 2),
                mode: Arc::clone(&mode),
            }),
            EntityLayout::default(),
            2,
        );

        assert!(manager.update());
        let before = manager.entities();

        for failure in ["error", "panic"] {
            *mode.lock().unwrap() = failure;
            assert!(!manager.update());
            assert!(Arc::ptr_eq(&before, &manager.entities()));
            assert_eq!(manager.local_player().unwrap().id, 0);
        }

        *mode.lock().unwrap() = "ok";
        assert!(manager.update());
        assert_eq!(manager.entities().tick(), 2);
    }

    impl EntityManager {
        fn set_provider(&mut self, provider: Box<dyn MemoryProvider>) {
            self.provider = provider;
        }
    }
}
