//! Crash-safe JSON persistence.
//!
//! Every stored document lives in a file triad: the canonical file, a `.tmp`
//! staging file and a `.bak` copy of the previous canonical content. Writes
//! go to the staging file, are flushed to disk, then moved into place. Loads
//! try staging, canonical and backup in that order.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Serializes every load and save in the process.
static STORE_LOCK: Mutex<()> = Mutex::new(());

fn store_lock() -> MutexGuard<'static, ()> {
    // Holds no data; a panic in another holder leaves nothing inconsistent
    STORE_LOCK.lock().unwrap_or_else(|e| e.into_inner())
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// A JSON document stored with the temp/canonical/backup write protocol.
#[derive(Debug, Clone)]
pub struct AtomicJsonFile<T> {
    canonical: PathBuf,
    temp: PathBuf,
    backup: PathBuf,
    _marker: PhantomData<fn() -> T>,
}

impl<T> AtomicJsonFile<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let canonical = path.as_ref().to_path_buf();
        Self {
            temp: with_suffix(&canonical, ".tmp"),
            backup: with_suffix(&canonical, ".bak"),
            canonical,
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.canonical
    }

    pub fn temp_path(&self) -> &Path {
        &self.temp
    }

    pub fn backup_path(&self) -> &Path {
        &self.backup
    }

    /// Load the first readable copy.
    ///
    /// Returns `Ok(None)` when no copy exists at all, and
    /// [`Error::ConfigCorrupted`] when copies exist but none can be parsed.
    pub fn load(&self) -> Result<Option<T>> {
        let _guard = store_lock();
        self.load_locked()
    }

    /// Write `value` using the full crash-safe protocol.
    pub fn save(&self, value: &T) -> Result<()> {
        let _guard = store_lock();
        self.save_locked(value)
    }

    /// Overwrite stored state with `value` and return it.
    ///
    /// The explicit recovery path after [`Error::ConfigCorrupted`].
    pub fn reset_to(&self, value: T) -> Result<T> {
        let _guard = store_lock();
        warn!("Resetting {} to defaults", self.canonical.display());
        self.save_locked(&value)?;
        Ok(value)
    }

    /// Load, or create and persist `default()` when nothing is stored yet.
    pub fn load_or_create(&self, default: impl FnOnce() -> T) -> Result<T> {
        let _guard = store_lock();
        match self.load_locked()? {
            Some(value) => Ok(value),
            None => {
                info!("No stored copy of {}, creating", self.canonical.display());
                let value = default();
                self.save_locked(&value)?;
                Ok(value)
            }
        }
    }

    fn load_locked(&self) -> Result<Option<T>> {
        for path in [&self.temp, &self.canonical, &self.backup] {
            if let Some(value) = Self::try_load(path) {
                debug!("Loaded {}", path.display());
                return Ok(Some(value));
            }
        }

        if self.temp.exists() || self.canonical.exists() || self.backup.exists() {
            return Err(Error::ConfigCorrupted {
                path: self.canonical.clone(),
            });
        }
        Ok(None)
    }

    fn try_load(path: &Path) -> Option<T> {
        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to read {}: {}", path.display(), e);
                }
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Failed to parse {}: {}", path.display(), e);
                None
            }
        }
    }

    fn save_locked(&self, value: &T) -> Result<()> {
        if let Some(dir) = self.canonical.parent()
            && !dir.as_os_str().is_empty()
        {
            fs::create_dir_all(dir)?;
        }

        let json = serde_json::to_string_pretty(value)?;
        {
            let mut file = File::create(&self.temp)?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
        }

        if self.canonical.exists() {
            replace_with_backup(&self.temp, &self.canonical, &self.backup)?;
        } else {
            fs::copy(&self.temp, &self.backup)?;
            fs::rename(&self.temp, &self.canonical)?;
        }
        sync_parent_dir(&self.canonical);

        debug!("Saved {}", self.canonical.display());
        Ok(())
    }
}

/// Move `temp` over `canonical`, keeping the previous canonical as `backup`.
#[cfg(target_os = "windows")]
fn replace_with_backup(temp: &Path, canonical: &Path, backup: &Path) -> Result<()> {
    use windows::Win32::Storage::FileSystem::{REPLACEFILE_IGNORE_MERGE_ERRORS, ReplaceFileW};
    use windows::core::HSTRING;

    let replaced = HSTRING::from(canonical.as_os_str());
    let replacement = HSTRING::from(temp.as_os_str());
    let backup = HSTRING::from(backup.as_os_str());

    // SAFETY: all three paths are valid NUL-terminated wide strings owned for the call.
    unsafe {
        ReplaceFileW(
            &replaced,
            &replacement,
            &backup,
            REPLACEFILE_IGNORE_MERGE_ERRORS,
            None,
            None,
        )
    }
    .map_err(|e| Error::Io(std::io::Error::other(format!("ReplaceFileW failed: {e}"))))
}

/// Move `temp` over `canonical`, keeping the previous canonical as `backup`.
///
/// Both steps are atomic renames. If interrupted between them, the staging
/// file is still present and is the first copy tried on load.
#[cfg(not(target_os = "windows"))]
fn replace_with_backup(temp: &Path, canonical: &Path, backup: &Path) -> Result<()> {
    fs::rename(canonical, backup)?;
    fs::rename(temp, canonical)?;
    Ok(())
}

#[cfg(unix)]
fn sync_parent_dir(path: &Path) {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    if let Ok(handle) = File::open(dir)
        && let Err(e) = handle.sync_all()
    {
        debug!("Failed to sync directory {}: {}", dir.display(), e);
    }
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) {}
