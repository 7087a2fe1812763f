//! Single-instance enforcement.
//!
//! Windows uses a named kernel mutex; other platforms take an exclusive
//! advisory lock on a file in the temp directory. The lock is released when
//! the returned guard is dropped or the process exits.

use tracing::debug;

use crate::error::{Error, Result};

#[cfg(target_os = "windows")]
pub struct InstanceLock {
    handle: windows::Win32::Foundation::HANDLE,
}

#[cfg(target_os = "windows")]
impl InstanceLock {
    /// Acquire the lock named `name`, failing with [`Error::AlreadyRunning`]
    /// if another process holds it.
    pub fn acquire(name: &str) -> Result<Self> {
        use windows::Win32::Foundation::{CloseHandle, ERROR_ALREADY_EXISTS, GetLastError};
        use windows::Win32::System::Threading::CreateMutexW;
        use windows::core::HSTRING;

        let mutex_name = HSTRING::from(format!("Local\\{}", name));
        // SAFETY: the name outlives the call; the returned handle is owned by the guard.
        let handle = unsafe { CreateMutexW(None, true, &mutex_name) }
            .map_err(|e| Error::Io(std::io::Error::other(format!("CreateMutexW failed: {e}"))))?;

        // SAFETY: reads the calling thread's last-error value set by CreateMutexW.
        if unsafe { GetLastError() } == ERROR_ALREADY_EXISTS {
            // SAFETY: handle was returned by CreateMutexW above and is not used again.
            let _ = unsafe { CloseHandle(handle) };
            return Err(Error::AlreadyRunning);
        }

        debug!("Acquired instance mutex {}", mutex_name);
        Ok(Self { handle })
    }
}

#[cfg(target_os = "windows")]
impl Drop for InstanceLock {
    fn drop(&mut self) {
        use windows::Win32::Foundation::CloseHandle;
        use windows::Win32::System::Threading::ReleaseMutex;

        // SAFETY: the handle is owned by this guard and released exactly once.
        unsafe {
            let _ = ReleaseMutex(self.handle);
            let _ = CloseHandle(self.handle);
        }
    }
}

#[cfg(not(target_os = "windows"))]
pub struct InstanceLock {
    _file: std::fs::File,
    path: std::path::PathBuf,
}

#[cfg(not(target_os = "windows"))]
impl InstanceLock {
    /// Acquire the lock named `name`, failing with [`Error::AlreadyRunning`]
    /// if another process holds it.
    pub fn acquire(name: &str) -> Result<Self> {
        Self::acquire_in(&std::env::temp_dir(), name)
    }

    pub fn acquire_in(dir: &std::path::Path, name: &str) -> Result<Self> {
        use std::fs::{File, TryLockError};

        let path = dir.join(format!("{}.lock", name));
        let file = File::options()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)?;

        match file.try_lock() {
            Ok(()) => {
                debug!("Acquired instance lock {}", path.display());
                Ok(Self { _file: file, path })
            }
            Err(TryLockError::WouldBlock) => Err(Error::AlreadyRunning),
            Err(TryLockError::Error(e)) => Err(Error::Io(e)),
        }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[cfg(all(test, not(target_os = "windows")))]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_second_acquire_fails_while_held() {
        let dir = tempdir().unwrap();
        let first = InstanceLock::acquire_in(dir.path(), "radar-test").unwrap();
        assert!(first.path().exists());

        assert!(matches!(
            InstanceLock::acquire_in(dir.path(), "radar-test"),
            Err(Error::AlreadyRunning)
        ));

        drop(first);
        assert!(InstanceLock::acquire_in(dir.path(), "radar-test").is_ok());
    }

    #[test]
    fn test_distinct_names_do_not_conflict() {
        let dir = tempdir().unwrap();
        let _a = InstanceLock::acquire_in(dir.path(), "a").unwrap();
        assert!(InstanceLock::acquire_in(dir.path(), "b").is_ok());
    }
}
