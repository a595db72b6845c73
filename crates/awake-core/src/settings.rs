//! Process-wide user settings.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// The emergency auto-stop durations offered to the user, in minutes.
pub const EMERGENCY_STOP_CHOICES: [u32; 4] = [5, 10, 15, 20];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Display preference only; alarm times are always stored in 24-hour form.
    #[serde(rename = "use24Hour", default)]
    pub use_24_hour: bool,
    #[serde(rename = "emergencyStopMinutes", default = "default_emergency_stop_minutes")]
    pub emergency_stop_minutes: u32,
    #[serde(rename = "vibrateEnabled", default = "default_true")]
    pub vibrate_enabled: bool,
}

fn default_emergency_stop_minutes() -> u32 {
    10
}

fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            use_24_hour: false,
            emergency_stop_minutes: default_emergency_stop_minutes(),
            vibrate_enabled: true,
        }
    }
}

impl Settings {
    /// Copy of these settings with `patch` merged in.
    pub fn merged(&self, patch: &SettingsPatch) -> Result<Settings, ValidationError> {
        let mut next = *self;
        if let Some(use_24_hour) = patch.use_24_hour {
            next.use_24_hour = use_24_hour;
        }
        if let Some(minutes) = patch.emergency_stop_minutes {
            if !EMERGENCY_STOP_CHOICES.contains(&minutes) {
                return Err(ValidationError::InvalidValue {
                    field: "emergencyStopMinutes".into(),
                    message: format!("{minutes} is not one of {EMERGENCY_STOP_CHOICES:?}"),
                });
            }
            next.emergency_stop_minutes = minutes;
        }
        if let Some(vibrate) = patch.vibrate_enabled {
            next.vibrate_enabled = vibrate;
        }
        Ok(next)
    }

    pub fn emergency_stop(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.emergency_stop_minutes as i64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SettingsPatch {
    pub use_24_hour: Option<bool>,
    pub emergency_stop_minutes: Option<u32>,
    pub vibrate_enabled: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let s = Settings::default();
        assert!(!s.use_24_hour);
        assert_eq!(s.emergency_stop_minutes, 10);
        assert!(s.vibrate_enabled);
    }

    #[test]
    fn wire_format_uses_camel_case_keys() {
        let json = serde_json::to_value(Settings::default()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"use24Hour": false, "emergencyStopMinutes": 10, "vibrateEnabled": true})
        );
    }

    #[test]
    fn missing_fields_take_their_defaults() {
        let s: Settings = serde_json::from_str(r#"{"use24Hour": true}"#).unwrap();
        assert!(s.use_24_hour);
        assert_eq!(s.emergency_stop_minutes, 10);
        assert!(s.vibrate_enabled);
    }

    #[test]
    fn merge_rejects_uncurated_emergency_duration() {
        let patch = SettingsPatch {
            emergency_stop_minutes: Some(7),
            ..SettingsPatch::default()
        };
        assert!(Settings::default().merged(&patch).is_err());

        let patch = SettingsPatch {
            emergency_stop_minutes: Some(15),
            vibrate_enabled: Some(false),
            ..SettingsPatch::default()
        };
        let s = Settings::default().merged(&patch).unwrap();
        assert_eq!(s.emergency_stop_minutes, 15);
        assert!(!s.vibrate_enabled);
        assert!(!s.use_24_hour);
    }
}
