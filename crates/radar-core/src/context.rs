//! Application context tying configuration, scanning and snapshots together.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{info, warn};

use crate::entity::SnapshotHandle;
use crate::error::Result;
use crate::memory::MemoryProvider;
use crate::scan::EntityManager;
use crate::scheduler::TaskScheduler;
use crate::storage::{AppConfig, ConfigStore};

/// Configuration shared between the scan thread, input handling and the
/// render loop, together with the store it is persisted to.
#[derive(Debug, Clone)]
pub struct SharedConfig {
    store: ConfigStore,
    config: Arc<Mutex<AppConfig>>,
}

impl SharedConfig {
    pub fn new(store: ConfigStore, config: AppConfig) -> Self {
        Self {
            store,
            config: Arc::new(Mutex::new(config)),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, AppConfig> {
        self.config.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Copy of the current configuration
    pub fn get(&self) -> AppConfig {
        self.lock().clone()
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut AppConfig) -> R) -> R {
        f(&mut self.lock())
    }

    /// Persist the current configuration.
    ///
    /// The lock is released before touching the disk.
    pub fn save(&self) -> Result<()> {
        let config = self.get();
        self.store.save(&config)?;
        info!("Configuration saved to {}", self.store.path().display());
        Ok(())
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }
}

/// Owns the running radar: the scan scheduler and the snapshot it publishes.
pub struct RadarContext {
    config: SharedConfig,
    snapshots: SnapshotHandle,
    scanner: Option<TaskScheduler>,
    process_id: Option<u32>,
    target: Option<String>,
}

impl RadarContext {
    pub fn new(config: SharedConfig) -> Self {
        Self {
            config,
            snapshots: SnapshotHandle::new(),
            scanner: None,
            process_id: None,
            target: None,
        }
    }

    /// Attach to `target` instead of the configured process for this run
    /// only; the stored configuration keeps its own target.
    pub fn with_target(mut self, target: Option<String>) -> Self {
        self.target = target;
        self
    }

    /// Process name [`RadarContext::start_scanning`] attaches to
    pub fn target(&self) -> String {
        match &self.target {
            Some(target) => target.clone(),
            None => self.config.lock().scan.target_process.clone(),
        }
    }

    pub fn config(&self) -> &SharedConfig {
        &self.config
    }

    /// Handle for reading the latest snapshot
    pub fn snapshots(&self) -> SnapshotHandle {
        self.snapshots.clone()
    }

    pub fn process_id(&self) -> Option<u32> {
        self.process_id
    }

    pub fn is_scanning(&self) -> bool {
        self.scanner.as_ref().is_some_and(TaskScheduler::is_running)
    }

    /// Attach `provider` to the configured target and start the scan loop.
    ///
    /// Returns `Ok(false)` when the target cannot be attached; the caller
    /// may keep rendering the (empty) snapshot. Cached affiliations recorded
    /// against a different process are discarded here.
    pub fn start_scanning(&mut self, mut provider: Box<dyn MemoryProvider>) -> Result<bool> {
        let config = self.config.get();
        let target = self.target();
        let walker = config.target.walker(config.scan.max_entities)?;

        if !provider.attach(&target) {
            warn!("Failed to attach to {}", target);
            return Ok(false);
        }

        let process_id = provider.process_id().unwrap_or_default();
        info!(
            "Attached to {} (pid {}, base 0x{:X})",
            target,
            process_id,
            provider.base_address()
        );
        self.process_id = Some(process_id);
        self.config.update(|c| c.cache.bind_to(process_id));

        let mut manager = EntityManager::new(
            provider,
            Box::new(walker),
            config.target.layout.clone(),
            config.scan.max_entities,
        )
        .publishing_to(self.snapshots.clone());

        let shared = self.config.clone();
        let mut scanner = TaskScheduler::new(
            "EntityScanner",
            config.scan.interval(),
            config.scan.sleep_mode,
        );
        scanner.start(move || {
            if manager.update() {
                let snapshot = manager.entities();
                shared.update(|c| c.cache.record_snapshot(&snapshot));
            }
            Ok(())
        })?;

        self.scanner = Some(scanner);
        Ok(true)
    }

    /// Stop scanning (detaching the provider) and persist configuration.
    pub fn shutdown(&mut self) -> Result<()> {
        if let Some(mut scanner) = self.scanner.take() {
            scanner.stop();
        }
        self.config.save()
    }
}

impl Drop for RadarContext {
    fn drop(&mut self) {
        if let Some(mut scanner) = self.scanner.take() {
            scanner.stop();
        }
    }
}
