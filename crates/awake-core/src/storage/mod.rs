mod config;
pub mod database;
mod gateway;
pub mod journal;

pub use config::{AlarmConfig, Config, LoggingConfig, SOUND_URL_ENV};
pub use database::Database;
pub use gateway::{Persistence, ALARMS_KEY, SETTINGS_KEY};
pub use journal::NotificationJournal;

use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::StorageError;

/// Durable text-valued key-value store.
///
/// This is the on-device persistence collaborator; the alarm core only ever
/// stores whole JSON documents under fixed keys.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
}

impl<K: KeyValueStore + ?Sized> KeyValueStore for Box<K> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }
}

/// In-process store. Reads and writes can be made to fail on demand.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
    pub fail_reads: bool,
    pub fail_writes: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with raw values, e.g. legacy JSON.
    pub fn with_values<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: values
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            ..Self::default()
        }
    }

    /// Raw stored text, bypassing failure injection.
    pub fn raw(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        if self.fail_reads {
            return Err(StorageError::Unavailable(format!("read of '{key}' refused")));
        }
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::Unavailable(format!("write of '{key}' refused")));
        }
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Returns the data directory, creating it if needed.
///
/// `AWAKE_DATA_DIR` wins when set. Otherwise `~/.config/awake-alarm`, or
/// `~/.config/awake-alarm-dev` when `AWAKE_ENV=dev`.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let dir = match std::env::var_os("AWAKE_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("AWAKE_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("awake-alarm-dev")
            } else {
                base_dir.join("awake-alarm")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
