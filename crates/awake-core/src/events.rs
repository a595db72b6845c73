use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::alarm::AlarmId;
use crate::ringing::AlertMode;

/// Every state change in the system produces an Event.
/// Hosts poll for events to re-render; nothing here is persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    AlarmAdded {
        alarm_id: AlarmId,
        hour: u8,
        minute: u8,
        at: DateTime<Utc>,
    },
    AlarmUpdated {
        alarm_id: AlarmId,
        enabled: bool,
        at: DateTime<Utc>,
    },
    AlarmRemoved {
        alarm_id: AlarmId,
        at: DateTime<Utc>,
    },
    SettingsUpdated {
        at: DateTime<Utc>,
    },
    /// Alarms were re-read from the durable store.
    AlarmsRefreshed {
        count: usize,
        at: DateTime<Utc>,
    },
    RingingStarted {
        alarm_id: AlarmId,
        alert: AlertMode,
        emergency_stop_minutes: u32,
        at: DateTime<Utc>,
    },
    PhraseRejected {
        alarm_id: AlarmId,
        attempts: u32,
        at: DateTime<Utc>,
    },
    /// The whole minutes left before auto-stop dropped.
    AutoStopCountdown {
        alarm_id: AlarmId,
        minutes_left: u32,
        at: DateTime<Utc>,
    },
    /// A back gesture arrived while ringing and was swallowed.
    BackSuppressed {
        alarm_id: AlarmId,
        at: DateTime<Utc>,
    },
    AlarmDismissed {
        alarm_id: AlarmId,
        attempts: u32,
        elapsed_seconds: u64,
        at: DateTime<Utc>,
    },
    AlarmAutoStopped {
        alarm_id: AlarmId,
        attempts: u32,
        elapsed_seconds: u64,
        at: DateTime<Utc>,
    },
}
