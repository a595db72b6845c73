//! The notification platform seam.
//!
//! Platforms address notifications by their own opaque identifiers; alarms
//! are only recognisable through the `{alarmId, type}` payload each request
//! carries.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::fmt;

use crate::alarm::AlarmId;
use crate::error::ScheduleError;

/// Platform-assigned identifier of a pending notification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(String);

impl NotificationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationContent {
    pub title: String,
    pub body: String,
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationTrigger {
    /// Local wall-clock time at which the notification fires.
    pub date: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub content: NotificationContent,
    pub trigger: NotificationTrigger,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingNotification {
    pub identifier: NotificationId,
    pub request: NotificationRequest,
}

impl PendingNotification {
    /// Alarm this notification belongs to, if it is an alarm notification.
    pub fn alarm_id(&self) -> Option<AlarmId> {
        AlarmPayload::from_data(&self.request.content.data).map(|p| p.alarm_id)
    }
}

/// The `data` payload attached to every alarm notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmPayload {
    #[serde(rename = "alarmId")]
    pub alarm_id: AlarmId,
    #[serde(rename = "type")]
    pub kind: String,
}

impl AlarmPayload {
    pub const KIND: &'static str = "alarm";

    pub fn new(alarm_id: AlarmId) -> Self {
        Self {
            alarm_id,
            kind: Self::KIND.to_string(),
        }
    }

    pub fn to_data(&self) -> serde_json::Value {
        serde_json::json!({ "alarmId": self.alarm_id, "type": self.kind })
    }

    /// Requires a non-empty string `alarmId`. A `type` other than `"alarm"`
    /// marks a foreign notification; a missing `type` is tolerated.
    pub fn from_data(data: &serde_json::Value) -> Option<Self> {
        let alarm_id = data.get("alarmId")?.as_str().filter(|id| !id.is_empty())?;
        match data.get("type") {
            None | Some(serde_json::Value::Null) => {}
            Some(kind) if kind.as_str() == Some(Self::KIND) => {}
            Some(_) => return None,
        }
        Some(Self::new(AlarmId::from(alarm_id)))
    }
}

/// Alarm to open the ringing flow for when the user taps a delivered
/// notification with this payload.
pub fn route_notification_response(data: &serde_json::Value) -> Option<AlarmId> {
    AlarmPayload::from_data(data).map(|p| p.alarm_id)
}

/// Local notification capability of the host platform.
pub trait NotificationPlatform {
    fn schedule(&mut self, request: NotificationRequest) -> Result<NotificationId, ScheduleError>;

    /// Cancelling an identifier that is not pending is a no-op.
    fn cancel(&mut self, identifier: &NotificationId) -> Result<(), ScheduleError>;

    fn pending(&self) -> Result<Vec<PendingNotification>, ScheduleError>;

    fn cancel_all(&mut self) -> Result<(), ScheduleError>;
}

/// Platform kept entirely in memory, with failure injection.
#[derive(Debug, Default)]
pub struct InMemoryPlatform {
    pending: Vec<PendingNotification>,
    next_id: u64,
    enumerations: Cell<usize>,
    pub fail_schedule: bool,
    pub fail_cancel: bool,
    pub fail_enumerate: bool,
}

impl InMemoryPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `pending()` calls so far.
    pub fn enumerations(&self) -> usize {
        self.enumerations.get()
    }

    /// Pending notifications, bypassing failure injection.
    pub fn snapshot(&self) -> &[PendingNotification] {
        &self.pending
    }

    /// Remove and return everything due at `now`, as the OS would when
    /// delivering.
    pub fn deliver_due(&mut self, now: NaiveDateTime) -> Vec<PendingNotification> {
        let (due, rest): (Vec<_>, Vec<_>) = self
            .pending
            .drain(..)
            .partition(|n| n.request.trigger.date <= now);
        self.pending = rest;
        due
    }
}

impl NotificationPlatform for InMemoryPlatform {
    fn schedule(&mut self, request: NotificationRequest) -> Result<NotificationId, ScheduleError> {
        if self.fail_schedule {
            return Err(ScheduleError::Platform("schedule refused".into()));
        }
        self.next_id += 1;
        let identifier = NotificationId::new(format!("notification-{}", self.next_id));
        self.pending.push(PendingNotification {
            identifier: identifier.clone(),
            request,
        });
        Ok(identifier)
    }

    fn cancel(&mut self, identifier: &NotificationId) -> Result<(), ScheduleError> {
        if self.fail_cancel {
            return Err(ScheduleError::Platform("cancel refused".into()));
        }
        self.pending.retain(|n| &n.identifier != identifier);
        Ok(())
    }

    fn pending(&self) -> Result<Vec<PendingNotification>, ScheduleError> {
        self.enumerations.set(self.enumerations.get() + 1);
        if self.fail_enumerate {
            return Err(ScheduleError::Platform("enumeration refused".into()));
        }
        Ok(self.pending.clone())
    }

    fn cancel_all(&mut self) -> Result<(), ScheduleError> {
        if self.fail_cancel {
            return Err(ScheduleError::Platform("cancel refused".into()));
        }
        self.pending.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payload_round_trip_shape() {
        let data = AlarmPayload::new(AlarmId::from("42")).to_data();
        assert_eq!(data, json!({"alarmId": "42", "type": "alarm"}));
        assert_eq!(route_notification_response(&data), Some(AlarmId::from("42")));
    }

    #[test]
    fn routing_ignores_foreign_payloads() {
        assert_eq!(route_notification_response(&json!({})), None);
        assert_eq!(route_notification_response(&json!({"alarmId": ""})), None);
        assert_eq!(route_notification_response(&json!({"alarmId": 42})), None);
        assert_eq!(
            route_notification_response(&json!({"alarmId": "1", "type": "reminder"})),
            None
        );
        assert_eq!(
            route_notification_response(&json!({"alarmId": "1"})),
            Some(AlarmId::from("1"))
        );
    }
}
