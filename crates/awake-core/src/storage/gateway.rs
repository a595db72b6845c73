//! Durable schema for alarms and settings.
//!
//! Two independent slots, each a JSON document under its own key:
//!
//! - `"alarms"`: `[{id, hour, minute, enabled, label?, days?}, ...]`
//! - `"settings"`: `{use24Hour, emergencyStopMinutes, vibrateEnabled}`
//!
//! Loads never fail: any read or parse problem yields the empty list or the
//! default settings. Saves report their error so the caller can decide what
//! to tell the user. The two slots are written separately and may disagree
//! after a crash between writes.

use tracing::warn;

use super::KeyValueStore;
use crate::alarm::Alarm;
use crate::error::StorageError;
use crate::settings::Settings;

pub const ALARMS_KEY: &str = "alarms";
pub const SETTINGS_KEY: &str = "settings";

pub struct Persistence<K> {
    kv: K,
}

impl<K: KeyValueStore> Persistence<K> {
    pub fn new(kv: K) -> Self {
        Self { kv }
    }

    pub fn kv(&self) -> &K {
        &self.kv
    }

    pub fn kv_mut(&mut self) -> &mut K {
        &mut self.kv
    }

    pub fn into_inner(self) -> K {
        self.kv
    }

    /// Stored alarms, or an empty list if nothing usable is stored.
    pub fn load_alarms(&self) -> Vec<Alarm> {
        match self.try_load_alarms() {
            Ok(alarms) => alarms,
            Err(e) => {
                warn!("Error loading alarms, starting empty: {}", e);
                Vec::new()
            }
        }
    }

    fn try_load_alarms(&self) -> Result<Vec<Alarm>, StorageError> {
        let Some(text) = self.kv.get(ALARMS_KEY)? else {
            return Ok(Vec::new());
        };
        let alarms: Vec<Alarm> = serde_json::from_str(&text).map_err(|e| malformed(ALARMS_KEY, e))?;
        for alarm in &alarms {
            alarm
                .validate()
                .map_err(|e| malformed(ALARMS_KEY, format!("alarm {}: {e}", alarm.id)))?;
        }
        Ok(alarms)
    }

    pub fn save_alarms(&mut self, alarms: &[Alarm]) -> Result<(), StorageError> {
        let result = serde_json::to_string(alarms)
            .map_err(|e| malformed(ALARMS_KEY, e))
            .and_then(|json| self.kv.set(ALARMS_KEY, &json));
        if let Err(e) = &result {
            warn!("Error saving alarms: {}", e);
        }
        result
    }

    /// Stored settings, or the defaults if nothing usable is stored.
    pub fn load_settings(&self) -> Settings {
        match self.try_load_settings() {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Error loading settings, using defaults: {}", e);
                Settings::default()
            }
        }
    }

    fn try_load_settings(&self) -> Result<Settings, StorageError> {
        let Some(text) = self.kv.get(SETTINGS_KEY)? else {
            return Ok(Settings::default());
        };
        let settings: Settings =
            serde_json::from_str(&text).map_err(|e| malformed(SETTINGS_KEY, e))?;
        if settings.emergency_stop_minutes == 0 {
            return Err(malformed(SETTINGS_KEY, "emergencyStopMinutes must be positive"));
        }
        Ok(settings)
    }

    pub fn save_settings(&mut self, settings: &Settings) -> Result<(), StorageError> {
        let result = serde_json::to_string(settings)
            .map_err(|e| malformed(SETTINGS_KEY, e))
            .and_then(|json| self.kv.set(SETTINGS_KEY, &json));
        if let Err(e) = &result {
            warn!("Error saving settings: {}", e);
        }
        result
    }
}

fn malformed(key: &str, message: impl ToString) -> StorageError {
    StorageError::Malformed {
        key: key.to_string(),
        message: message.to_string(),
    }
}
