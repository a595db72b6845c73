//! TOML-based host configuration.
//!
//! Stores deployment-level knobs that are not user settings:
//! - The alarm sound locator
//! - The default log filter
//!
//! Configuration is stored at `~/.config/awake-alarm/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::ConfigError;
use crate::ringing::SoundSource;

/// Env var that overrides `alarm.sound_url`.
pub const SOUND_URL_ENV: &str = "AWAKE_ALARM_SOUND_URL";

/// Alarm output configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlarmConfig {
    /// Locator of the looping alarm sound. When unset the ringing screen
    /// falls back to vibration.
    #[serde(default)]
    pub sound_url: Option<String>,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing` filter directive used when `AWAKE_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "warn".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub alarm: AlarmConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
        optional: bool,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let mut parts = key.split('.').peekable();
        if parts.peek().map_or(true, |p| p.is_empty()) {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => {
                        let b = value.parse::<bool>().map_err(|e| ConfigError::InvalidValue {
                            key: key.to_string(),
                            message: e.to_string(),
                        })?;
                        serde_json::Value::Bool(b)
                    }
                    // Optional strings serialize as null when unset.
                    serde_json::Value::Null | serde_json::Value::String(_) => {
                        if !value.is_empty() {
                            serde_json::Value::String(value.into())
                        } else if optional {
                            serde_json::Value::Null
                        } else {
                            return Err(ConfigError::InvalidValue {
                                key: key.to_string(),
                                message: "must not be empty".into(),
                            });
                        }
                    }
                    _ => {
                        return Err(ConfigError::InvalidValue {
                            key: key.to_string(),
                            message: "not a settable scalar".into(),
                        })
                    }
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("config.toml"),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Load from the data directory, writing defaults if the file is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Err(_) => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
        }
    }

    /// Persist to the data directory.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Load from disk, returning default on error.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a value by dot-separated key without saving. An empty value clears
    /// optional strings.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |e: serde_json::Error| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        };
        let defaults = serde_json::to_value(Self::default()).map_err(invalid)?;
        let optional = Self::get_json_value_by_path(&defaults, key)
            .is_some_and(serde_json::Value::is_null);

        let mut json = serde_json::to_value(&*self).map_err(invalid)?;
        Self::set_json_value_by_path(&mut json, key, value, optional)?;
        *self = serde_json::from_value(json).map_err(invalid)?;
        Ok(())
    }

    /// Effective sound locator: the env override, then the config file.
    pub fn sound_source(&self) -> Option<SoundSource> {
        let from_env = std::env::var(SOUND_URL_ENV).ok();
        Self::pick_sound(from_env, self.alarm.sound_url.clone())
    }

    fn pick_sound(from_env: Option<String>, from_file: Option<String>) -> Option<SoundSource> {
        from_env
            .filter(|s| !s.trim().is_empty())
            .or(from_file.filter(|s| !s.trim().is_empty()))
            .map(SoundSource::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
        assert_eq!(parsed.logging.level, "warn");
        assert!(parsed.alarm.sound_url.is_none());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("[alarm]\nsound_url = \"file:///alarm.mp3\"\n").unwrap();
        assert_eq!(parsed.alarm.sound_url.as_deref(), Some("file:///alarm.mp3"));
        assert_eq!(parsed.logging.level, "warn");
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("logging.level").as_deref(), Some("warn"));
        assert_eq!(cfg.get("alarm.sound_url").as_deref(), Some("null"));
        assert!(cfg.get("alarm.missing").is_none());
    }

    #[test]
    fn set_and_clear_sound_url() {
        let mut cfg = Config::default();
        cfg.set("alarm.sound_url", "https://example.com/ring.mp3").unwrap();
        assert_eq!(cfg.alarm.sound_url.as_deref(), Some("https://example.com/ring.mp3"));
        cfg.set("alarm.sound_url", "").unwrap();
        assert!(cfg.alarm.sound_url.is_none());
    }

    #[test]
    fn empty_value_is_rejected_for_required_string() {
        let mut cfg = Config::default();
        let err = cfg.set("logging.level", "").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
        assert!(err.to_string().contains("must not be empty"));
        assert_eq!(cfg.logging.level, "warn");
    }

    #[test]
    fn set_rejects_unknown_key() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.set("alarm.volume", "3"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(cfg.set("", "3").is_err());
    }

    #[test]
    fn env_override_wins_and_blank_is_ignored() {
        let file = Some("file:///a.mp3".to_string());
        assert_eq!(
            Config::pick_sound(Some("file:///b.mp3".into()), file.clone()),
            Some(SoundSource::new("file:///b.mp3"))
        );
        assert_eq!(
            Config::pick_sound(Some("  ".into()), file.clone()),
            Some(SoundSource::new("file:///a.mp3"))
        );
        assert_eq!(Config::pick_sound(None, None), None);
    }

    #[test]
    fn load_from_writes_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg, Config::default());
        assert!(path.exists());

        let mut changed = cfg.clone();
        changed.set("logging.level", "debug").unwrap();
        changed.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap().logging.level, "debug");
    }
}
