use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Not attached to a target process")]
    NotAttached,

    #[error("Failed to read process memory at address {address:#x}: {message}")]
    MemoryReadFailed { address: u64, message: String },

    #[error("Invalid entity record at {address:#x}: {reason}")]
    InvalidRecord { address: u64, reason: String },

    #[error("Unsupported entity layout version: {0}")]
    UnsupportedLayout(u32),

    #[error("Invalid entity layout: {0}")]
    InvalidLayout(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Config corrupted: no readable copy of {}", path.display())]
    ConfigCorrupted { path: PathBuf },

    #[error("Scheduler '{0}' is already running")]
    SchedulerRunning(String),

    #[error("Scheduler '{0}' has been stopped and cannot be restarted")]
    SchedulerStopped(String),

    #[error("Another instance is already running")]
    AlreadyRunning,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this error is a "file not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }

    pub(crate) fn invalid_record(address: u64, reason: impl Into<String>) -> Self {
        Error::InvalidRecord {
            address,
            reason: reason.into(),
        }
    }
}
