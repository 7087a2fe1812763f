//! Main radar mode.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use crossterm::terminal;
use radar_core::{
    MemoryImage, MemoryProvider, RadarContext, SharedConfig, ShutdownSignal, render_snapshot,
};
use tracing::{debug, info, warn};

use super::{acquire_instance, load_config, store_in};
use crate::input;
use crate::renderer::ConsoleRenderer;

#[derive(Debug, Default)]
pub struct RunOptions {
    pub image: Option<PathBuf>,
    pub target: Option<String>,
    pub reset_on_corruption: bool,
}

/// Run the radar until Ctrl+C, Esc or q
pub fn run(config_dir: &Path, options: RunOptions) -> Result<()> {
    // Must precede any config access so a second instance changes nothing
    let _instance = acquire_instance()?;

    let store = store_in(config_dir);
    let config = load_config(&store, options.reset_on_corruption)?;
    info!("Radar {} using {}", env!("CARGO_PKG_VERSION"), store.path().display());

    let provider = open_provider(&options)?;

    let shutdown = Arc::new(ShutdownSignal::new());
    let shutdown_ctrlc = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        info!("Received shutdown signal, stopping...");
        shutdown_ctrlc.trigger();
    })?;

    let shared = SharedConfig::new(store, config);
    let mut context = RadarContext::new(shared.clone()).with_target(options.target.clone());
    if !context.start_scanning(provider)? {
        warn!("Target not attached; showing an empty radar");
    }

    let _raw_mode = RawMode::enable();
    let mut input = input::start(shared.clone(), Arc::clone(&shutdown))?;

    let mut renderer = ConsoleRenderer::stdout(shared.get().radar.range);
    let snapshots = context.snapshots();
    loop {
        let radar = shared.get().radar;
        renderer.set_range(radar.range);
        render_snapshot(&mut renderer, &snapshots.load());
        if shutdown.wait(radar.render_interval()) {
            break;
        }
    }

    input.stop();
    context.shutdown()?;
    info!("Radar stopped");
    Ok(())
}

fn open_provider(options: &RunOptions) -> Result<Box<dyn MemoryProvider>> {
    match &options.image {
        Some(path) => {
            let image = MemoryImage::load(path)
                .with_context(|| format!("Failed to load memory image {}", path.display()))?;
            info!(
                "Loaded memory image of {} ({} bytes)",
                image.process_name,
                image.total_bytes()
            );
            Ok(Box::new(image))
        }
        None => bail!("No memory access provider configured; pass --image <file>"),
    }
}

/// Raw terminal mode for the lifetime of the guard
struct RawMode {
    enabled: bool,
}

impl RawMode {
    fn enable() -> Self {
        match terminal::enable_raw_mode() {
            Ok(()) => Self { enabled: true },
            Err(e) => {
                debug!("Raw mode unavailable: {}", e);
                Self { enabled: false }
            }
        }
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        if self.enabled {
            let _ = terminal::disable_raw_mode();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use radar_core::MemoryImageBuilder;
    use tempfile::tempdir;

    #[test]
    fn test_open_provider_requires_image() {
        assert!(open_provider(&RunOptions::default()).is_err());
    }

    #[test]
    fn test_open_provider_from_image_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("image.json");
        MemoryImageBuilder::new()
            .process("game.exe", 42)
            .write_u32(0x1000, 7)
            .build()
            .save(&path)
            .unwrap();

        let options = RunOptions {
            image: Some(path),
            ..Default::default()
        };
        let mut provider = open_provider(&options).unwrap();
        assert!(!provider.is_attached());
        assert!(provider.attach("GAME.EXE"));
        assert_eq!(provider.process_id(), Some(42));
    }

    #[test]
    fn test_open_provider_missing_file() {
        let dir = tempdir().unwrap();
        let options = RunOptions {
            image: Some(dir.path().join("missing.json")),
            ..Default::default()
        };
        assert!(open_provider(&options).is_err());
    }
}
