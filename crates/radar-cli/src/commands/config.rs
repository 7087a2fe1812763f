//! `config` subcommands.

use std::path::Path;

use anyhow::Result;

use super::{acquire_instance, read_config, store_in};

/// Print the stored configuration as JSON
pub fn show(config_dir: &Path) -> Result<()> {
    let config = read_config(&store_in(config_dir))?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

/// Overwrite stored configuration with defaults
pub fn reset(config_dir: &Path) -> Result<()> {
    let _instance = acquire_instance()?;
    let store = store_in(config_dir);
    store.reset()?;
    eprintln!("Configuration reset: {}", store.path().display());
    Ok(())
}

pub fn path(config_dir: &Path) -> Result<()> {
    println!("{}", store_in(config_dir).path().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_show_on_empty_dir_creates_nothing() {
        let dir = tempdir().unwrap();
        show(dir.path()).unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
