//! `cache` subcommands.

use std::path::Path;

use anyhow::Result;
use radar_core::{ConfigStore, PersistentCache};

use super::{acquire_instance, read_config, store_in};

/// Print cached affiliations
pub fn show(config_dir: &Path) -> Result<()> {
    let config = read_config(&store_in(config_dir))?;
    print!("{}", describe(&config.cache));
    Ok(())
}

/// Remove every cached affiliation, keeping the process binding
pub fn clear(config_dir: &Path) -> Result<()> {
    let _instance = acquire_instance()?;
    let removed = clear_in(&store_in(config_dir))?;
    eprintln!("Removed {} cached affiliations", removed);
    Ok(())
}

fn clear_in(store: &ConfigStore) -> Result<usize> {
    let mut config = store.load()?;
    let removed = config.cache.len();
    config.cache.clear();
    store.save(&config)?;
    Ok(removed)
}

fn describe(cache: &PersistentCache) -> String {
    let mut out = format!(
        "Process {}: {} groups, {} entries\n",
        cache.process_id,
        cache.groups.len(),
        cache.len()
    );
    for (group, members) in &cache.groups {
        out.push_str(&format!("  group {}\n", group));
        for (entity, affiliation) in members {
            out.push_str(&format!("    entity {:>6} -> {}\n", entity, affiliation));
        }
    }
    out
}
