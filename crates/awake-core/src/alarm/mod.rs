//! Alarm records and the partial values used to create and edit them.
//!
//! `hour`/`minute` are always the 24-hour wall-clock time, whatever the
//! display preference in [`Settings`](crate::Settings) says.

mod repeat;

pub use repeat::{Repeat, WeekdaySet};

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;

/// Stable identity of an alarm for its whole lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlarmId(String);

impl AlarmId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh random id (UUID v4).
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AlarmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AlarmId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for AlarmId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A persisted wake-time record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alarm {
    pub id: AlarmId,
    pub hour: u8,
    pub minute: u8,
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(
        default,
        rename = "days",
        skip_serializing_if = "Repeat::is_one_time",
        with = "repeat::days_field"
    )]
    pub repeat: Repeat,
}

impl Alarm {
    /// Minutes since midnight, the display sort key.
    pub fn minutes_of_day(&self) -> u16 {
        self.hour as u16 * 60 + self.minute as u16
    }

    pub fn is_one_time(&self) -> bool {
        self.repeat.is_one_time()
    }

    /// Label shown to the user, `"Alarm"` when none was set.
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(DEFAULT_LABEL)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_time(self.hour, self.minute)
    }

    fn apply(&mut self, patch: &AlarmPatch) {
        if let Some(hour) = patch.hour {
            self.hour = hour;
        }
        if let Some(minute) = patch.minute {
            self.minute = minute;
        }
        if let Some(enabled) = patch.enabled {
            self.enabled = enabled;
        }
        if let Some(label) = &patch.label {
            self.label = normalize_label(label.as_deref());
        }
        if let Some(repeat) = patch.repeat {
            self.repeat = repeat;
        }
    }

    /// Copy of this alarm with `patch` merged in.
    pub fn merged(&self, patch: &AlarmPatch) -> Result<Alarm, ValidationError> {
        let mut next = self.clone();
        next.apply(patch);
        next.validate()?;
        Ok(next)
    }
}

pub const DEFAULT_LABEL: &str = "Alarm";

/// Everything needed to create an alarm except its id.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AlarmDraft {
    pub hour: u8,
    pub minute: u8,
    /// Defaults to enabled when not given.
    pub enabled: Option<bool>,
    pub label: Option<String>,
    pub repeat: Repeat,
}

impl AlarmDraft {
    pub fn at(hour: u8, minute: u8) -> Self {
        Self {
            hour,
            minute,
            ..Self::default()
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    pub fn repeat(mut self, repeat: Repeat) -> Self {
        self.repeat = repeat;
        self
    }

    pub(crate) fn into_alarm(self, id: AlarmId) -> Result<Alarm, ValidationError> {
        validate_time(self.hour, self.minute)?;
        Ok(Alarm {
            id,
            hour: self.hour,
            minute: self.minute,
            enabled: self.enabled.unwrap_or(true),
            label: normalize_label(self.label.as_deref()),
            repeat: self.repeat,
        })
    }
}

/// Partial update merged field-by-field into an existing alarm.
///
/// `label: Some(None)` clears the label.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AlarmPatch {
    pub hour: Option<u8>,
    pub minute: Option<u8>,
    pub enabled: Option<bool>,
    pub label: Option<Option<String>>,
    pub repeat: Option<Repeat>,
}

impl AlarmPatch {
    pub fn enabled(enabled: bool) -> Self {
        Self {
            enabled: Some(enabled),
            ..Self::default()
        }
    }

    pub fn time(hour: u8, minute: u8) -> Self {
        Self {
            hour: Some(hour),
            minute: Some(minute),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

pub fn validate_time(hour: u8, minute: u8) -> Result<(), ValidationError> {
    if hour > 23 {
        return Err(ValidationError::OutOfRange {
            field: "hour",
            value: hour as u32,
            min: 0,
            max: 23,
        });
    }
    if minute > 59 {
        return Err(ValidationError::OutOfRange {
            field: "minute",
            value: minute as u32,
            min: 0,
            max: 59,
        });
    }
    Ok(())
}

fn normalize_label(label: Option<&str>) -> Option<String> {
    label
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
}

/// Alarms ordered by time of day, ties kept in stored order.
pub fn sort_for_display(alarms: &[Alarm]) -> Vec<Alarm> {
    let mut sorted = alarms.to_vec();
    sorted.sort_by_key(Alarm::minutes_of_day);
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alarm(id: &str, hour: u8, minute: u8) -> Alarm {
        AlarmDraft::at(hour, minute).into_alarm(AlarmId::from(id)).unwrap()
    }

    #[test]
    fn draft_defaults_to_enabled() {
        let a = alarm("a", 7, 0);
        assert!(a.enabled);
        assert!(a.is_one_time());
        assert_eq!(a.label, None);
    }

    #[test]
    fn draft_rejects_out_of_range_time() {
        assert!(AlarmDraft::at(24, 0).into_alarm(AlarmId::from("x")).is_err());
        assert!(AlarmDraft::at(0, 60).into_alarm(AlarmId::from("x")).is_err());
    }

    #[test]
    fn blank_label_is_dropped() {
        let a = AlarmDraft::at(6, 30)
            .label("   ")
            .into_alarm(AlarmId::from("a"))
            .unwrap();
        assert_eq!(a.label, None);
        assert_eq!(a.display_label(), "Alarm");
    }

    #[test]
    fn patch_merges_only_given_fields() {
        let a = AlarmDraft::at(6, 30)
            .label(" Gym ")
            .into_alarm(AlarmId::from("a"))
            .unwrap();
        assert_eq!(a.label.as_deref(), Some("Gym"));

        let b = a.merged(&AlarmPatch::enabled(false)).unwrap();
        assert_eq!((b.hour, b.minute), (6, 30));
        assert!(!b.enabled);
        assert_eq!(b.label.as_deref(), Some("Gym"));

        let cleared = b
            .merged(&AlarmPatch {
                label: Some(None),
                ..AlarmPatch::default()
            })
            .unwrap();
        assert_eq!(cleared.label, None);
    }

    #[test]
    fn patch_with_invalid_minute_is_rejected() {
        let a = alarm("a", 6, 30);
        let patch = AlarmPatch {
            minute: Some(75),
            ..AlarmPatch::default()
        };
        assert!(a.merged(&patch).is_err());
    }

    #[test]
    fn wire_format_omits_absent_fields() {
        let a = alarm("1700000000000", 7, 5);
        let json = serde_json::to_value(&a).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"id": "1700000000000", "hour": 7, "minute": 5, "enabled": true})
        );
    }

    #[test]
    fn wire_format_days_decode() {
        let weekly: Alarm = serde_json::from_str(
            r#"{"id":"a","hour":6,"minute":0,"enabled":true,"label":"Work","days":[1,2,3,4,5]}"#,
        )
        .unwrap();
        assert_eq!(weekly.repeat.days().indices(), vec![1, 2, 3, 4, 5]);

        let empty: Alarm =
            serde_json::from_str(r#"{"id":"b","hour":6,"minute":0,"enabled":true,"days":[]}"#)
                .unwrap();
        assert!(empty.is_one_time());

        let null: Alarm =
            serde_json::from_str(r#"{"id":"c","hour":6,"minute":0,"enabled":false,"days":null}"#)
                .unwrap();
        assert!(null.is_one_time());
    }

    #[test]
    fn sorts_by_minutes_of_day() {
        let alarms = vec![alarm("late", 22, 0), alarm("early", 5, 45), alarm("mid", 12, 0)];
        let ids: Vec<_> = sort_for_display(&alarms)
            .into_iter()
            .map(|a| a.id.to_string())
            .collect();
        assert_eq!(ids, vec!["early", "mid", "late"]);
    }
}
