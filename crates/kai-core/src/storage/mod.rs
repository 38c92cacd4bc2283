mod background;
mod config;
pub mod database;

pub use background::BackgroundStore;
pub use config::{Config, NotificationsConfig, TimerDefaults, WindowConfig};
pub use database::SqliteStore;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::error::StorageError;

/// Durable key-value store the engine persists into.
///
/// Values are opaque bytes. A missing key is `Ok(None)`; callers treat
/// bytes they cannot decode the same way.
pub trait Store: Send + Sync {
    fn save(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError>;
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;
}

/// Keys used by the engine.
pub mod keys {
    pub const SESSIONS: &str = "sessions";
    pub const POMODORO_MINUTES: &str = "durations.pomodoro_minutes";
    pub const SHORT_BREAK_MINUTES: &str = "durations.short_break_minutes";
    pub const LONG_BREAK_MINUTES: &str = "durations.long_break_minutes";
    pub const SIMPLE_HOURS: &str = "durations.simple_hours";
    pub const SIMPLE_MINUTES: &str = "durations.simple_minutes";
    pub const SIMPLE_SECONDS: &str = "durations.simple_seconds";
}

/// In-process store. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Store for MemoryStore {
    fn save(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| StorageError::Locked)?;
        entries.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| StorageError::Locked)?;
        Ok(entries.get(key).cloned())
    }
}

impl<S: Store + ?Sized> Store for std::sync::Arc<S> {
    fn save(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        (**self).save(key, bytes)
    }

    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        (**self).load(key)
    }
}

/// Returns the data directory, creating it if needed.
///
/// `KAI_DATA_DIR` wins when set. Otherwise `~/.config/kai`, or
/// `~/.config/kai-dev` when `KAI_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, StorageError> {
    let dir = match std::env::var_os("KAI_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("KAI_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("kai-dev")
            } else {
                base_dir.join("kai")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| StorageError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
