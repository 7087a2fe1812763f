//! CLI command implementations.

pub mod cache;
pub mod config;
pub mod run;

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use radar_core::{AppConfig, ConfigStore, Error, InstanceLock};
use tracing::{info, warn};

use crate::prompter::CliPrompter;

/// Name of the single-instance lock
pub const INSTANCE_NAME: &str = "radar-single-instance";

pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("radar")
}

/// Take the single-instance lock before touching persisted state
pub fn acquire_instance() -> Result<InstanceLock> {
    match InstanceLock::acquire(INSTANCE_NAME) {
        Ok(lock) => Ok(lock),
        Err(Error::AlreadyRunning) => bail!("Another radar instance is already running"),
        Err(e) => Err(e.into()),
    }
}

/// Load configuration, asking the operator what to do if it is unreadable.
pub fn load_config(store: &ConfigStore, reset_on_corruption: bool) -> Result<AppConfig> {
    load_config_with(store, || {
        reset_on_corruption
            || CliPrompter.confirm(&format!(
                "Configuration at {} is unreadable. Reset to defaults?",
                store.path().display()
            ))
    })
}

fn load_config_with(store: &ConfigStore, decide_reset: impl FnOnce() -> bool) -> Result<AppConfig> {
    match store.load() {
        Ok(config) => Ok(config),
        Err(Error::ConfigCorrupted { path }) => {
            if decide_reset() {
                warn!("Resetting unreadable configuration at {}", path.display());
                Ok(store.reset()?)
            } else {
                bail!(
                    "Configuration at {} is corrupted; not starting",
                    path.display()
                )
            }
        }
        Err(e) => Err(e.into()),
    }
}

/// Read configuration for display only.
///
/// Never creates, resets or rewrites stored state, so it is safe while
/// another instance is running. Nothing stored yet reads as defaults.
pub fn read_config(store: &ConfigStore) -> Result<AppConfig> {
    match store.load_existing() {
        Ok(Some(config)) => Ok(config),
        Ok(None) => {
            info!("No configuration at {}, showing defaults", store.path().display());
            Ok(AppConfig::default())
        }
        Err(Error::ConfigCorrupted { path }) => bail!(
            "Configuration at {} is corrupted; run `radar config reset`",
            path.display()
        ),
        Err(e) => Err(e.into()),
    }
}

pub fn store_in(config_dir: &Path) -> ConfigStore {
    ConfigStore::new(config_dir)
}
