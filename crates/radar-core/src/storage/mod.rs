//! Durable operator state.
//!
//! - **Atomic file**: temp/canonical/backup write protocol behind one
//!   process-wide lock
//! - **Config**: operator settings (`config.json`)
//! - **Cache**: per-process group affiliation cache, stored in the config

mod atomic;
mod cache;
mod config;

pub use atomic::AtomicJsonFile;
pub use cache::{AffiliationId, GroupId, PersistentCache};
pub use config::{AppConfig, ConfigStore, DmaConfig, FpgaAlgo, RadarConfig, ScanConfig, TargetConfig};
