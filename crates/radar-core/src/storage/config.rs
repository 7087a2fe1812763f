//! Operator configuration persisted as `config.json`.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::{AtomicJsonFile, PersistentCache};
use crate::error::Result;
use crate::memory::parse_hex_address;
use crate::scan::{EntityLayout, PointerListWalker};
use crate::scheduler::SleepMode;

/// Read algorithm used by the DMA access channel
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
pub enum FpgaAlgo {
    #[default]
    Auto,
    Old,
    OldTiny,
    New,
    NewTiny,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DmaConfig {
    pub fpga_algo: FpgaAlgo,
    #[serde(rename = "enableMemMap")]
    pub mem_map_enabled: bool,
}

impl Default for DmaConfig {
    fn default() -> Self {
        Self {
            fpga_algo: FpgaAlgo::Auto,
            mem_map_enabled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScanConfig {
    pub target_process: String,
    pub scan_interval_ms: u64,
    pub sleep_mode: SleepMode,
    pub max_entities: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            target_process: "example.exe".to_string(),
            scan_interval_ms: 100,
            sleep_mode: SleepMode::Compensated,
            max_entities: 64,
        }
    }
}

impl ScanConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.scan_interval_ms.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RadarConfig {
    /// Display range in world units
    pub range: f32,
    pub render_interval_ms: u64,
    pub size: u32,
}

impl Default for RadarConfig {
    fn default() -> Self {
        Self {
            range: 100.0,
            render_interval_ms: 16,
            size: 400,
        }
    }
}

impl RadarConfig {
    pub const MIN_RANGE: f32 = 10.0;
    pub const MAX_RANGE: f32 = 2000.0;

    pub fn render_interval(&self) -> Duration {
        Duration::from_millis(self.render_interval_ms.max(1))
    }

    /// Adjust range by `delta`, clamped to the supported bounds
    pub fn adjust_range(&mut self, delta: f32) -> f32 {
        self.range = (self.range + delta).clamp(Self::MIN_RANGE, Self::MAX_RANGE);
        self.range
    }
}

/// Where the entity collection lives in the target, as hex offsets from the
/// target's base address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TargetConfig {
    pub entity_list: String,
    pub local_player: String,
    pub session_id: String,
    pub layout: EntityLayout,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            entity_list: "0x00000000".to_string(),
            local_player: "0x00000000".to_string(),
            session_id: String::new(),
            layout: EntityLayout::default(),
        }
    }
}

impl TargetConfig {
    /// Build the walker described by this configuration
    pub fn walker(&self, max_entities: usize) -> Result<PointerListWalker> {
        self.layout.validate()?;
        Ok(
            PointerListWalker::new(parse_hex_address(&self.entity_list)?, max_entities)
                .with_local_player(parse_hex_address(&self.local_player)?)
                .with_session_id(parse_hex_address(&self.session_id)?),
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    pub dma: DmaConfig,
    pub scan: ScanConfig,
    pub radar: RadarConfig,
    pub target: TargetConfig,
    pub cache: PersistentCache,
}

/// Loads and saves [`AppConfig`] in a directory.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    file: AtomicJsonFile<AppConfig>,
}

impl ConfigStore {
    pub const FILENAME: &'static str = "config.json";

    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            file: AtomicJsonFile::new(dir.as_ref().join(Self::FILENAME)),
        }
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Load the stored configuration.
    ///
    /// A first run (nothing stored) creates and persists defaults. When every
    /// stored copy is unreadable this returns
    /// [`Error::ConfigCorrupted`](crate::Error::ConfigCorrupted) and the
    /// caller must choose [`ConfigStore::reset`] or abort.
    pub fn load(&self) -> Result<AppConfig> {
        self.file.load_or_create(AppConfig::default)
    }

    /// Read the stored configuration without creating or repairing anything.
    ///
    /// `Ok(None)` when nothing is stored yet.
    pub fn load_existing(&self) -> Result<Option<AppConfig>> {
        self.file.load()
    }

    pub fn save(&self, config: &AppConfig) -> Result<()> {
        self.file.save(config)
    }

    /// Replace stored state with defaults, persisting immediately
    pub fn reset(&self) -> Result<AppConfig> {
        self.file.reset_to(AppConfig::default())
    }
}
