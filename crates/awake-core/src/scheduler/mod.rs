//! Next-trigger computation and notification bookkeeping.
//!
//! The scheduler keeps an index from alarm id to the platform identifiers it
//! registered, so cancelling an alarm does not need to walk every pending
//! notification. The index is rebuilt from the platform on attach; while it
//! cannot be trusted (enumeration failed), cancellation falls back to
//! enumerate-then-match.
//!
//! Invariant: at most one pending notification per alarm id. `schedule`
//! cancels whatever is registered for the id before registering anew.

mod platform;

pub use platform::{
    route_notification_response, AlarmPayload, InMemoryPlatform, NotificationContent,
    NotificationId, NotificationPlatform, NotificationRequest, NotificationTrigger,
    PendingNotification,
};

use chrono::{Datelike, Duration, NaiveDateTime, NaiveTime};
use std::collections::HashMap;
use tracing::{error, info, warn};

use crate::alarm::{Alarm, AlarmId, Repeat};
use crate::error::ScheduleError;

pub const NOTIFICATION_BODY: &str = "Time to wake up! Type \"yes i am awake\" to stop.";

/// Next instant at which `alarm` should ring, strictly after `now`.
///
/// One-time alarms ring at the next `hour:minute:00`, at most 24 hours away.
/// Weekly alarms ring at the earliest such time falling on one of their
/// days, at most 7 days away.
pub fn next_trigger_instant(alarm: &Alarm, now: NaiveDateTime) -> Result<NaiveDateTime, ScheduleError> {
    let time = NaiveTime::from_hms_opt(alarm.hour as u32, alarm.minute as u32, 0).ok_or(
        ScheduleError::InvalidTime {
            hour: alarm.hour,
            minute: alarm.minute,
        },
    )?;
    let today = now.date().and_time(time);

    match alarm.repeat {
        Repeat::Weekly(days) if !days.is_empty() => (0..=7)
            .map(|offset| today + Duration::days(offset))
            .find(|candidate| *candidate > now && days.contains(candidate.weekday()))
            .ok_or(ScheduleError::InvalidTime {
                hour: alarm.hour,
                minute: alarm.minute,
            }),
        _ => {
            if today > now {
                Ok(today)
            } else {
                Ok(today + Duration::days(1))
            }
        }
    }
}

/// Result of registering an alarm with the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledAlarm {
    pub identifier: NotificationId,
    pub trigger_at: NaiveDateTime,
}

pub struct NotificationScheduler<P> {
    platform: P,
    index: HashMap<AlarmId, Vec<NotificationId>>,
    index_trusted: bool,
}

impl<P: NotificationPlatform> NotificationScheduler<P> {
    /// Wrap a platform and index whatever alarm notifications it already
    /// holds from an earlier process.
    pub fn attach(platform: P) -> Self {
        let mut scheduler = Self {
            platform,
            index: HashMap::new(),
            index_trusted: false,
        };
        if let Err(e) = scheduler.rebuild_index() {
            warn!("Could not index pending notifications, will enumerate on cancel: {}", e);
        }
        scheduler
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    pub fn into_platform(self) -> P {
        self.platform
    }

    /// Re-read the platform's pending list into the index. Returns the number
    /// of alarm notifications found.
    pub fn rebuild_index(&mut self) -> Result<usize, ScheduleError> {
        let pending = self.platform.pending()?;
        self.index.clear();
        let mut count = 0;
        for notification in pending {
            if let Some(alarm_id) = notification.alarm_id() {
                self.index
                    .entry(alarm_id)
                    .or_default()
                    .push(notification.identifier);
                count += 1;
            }
        }
        self.index_trusted = true;
        Ok(count)
    }

    /// Forget the id index; the next cancel rebuilds it from the platform.
    pub fn invalidate_index(&mut self) {
        self.index_trusted = false;
    }

    /// Register the next trigger of `alarm`, replacing any earlier one.
    pub fn schedule(&mut self, alarm: &Alarm, now: NaiveDateTime) -> Result<ScheduledAlarm, ScheduleError> {
        self.cancel(&alarm.id)?;
        let trigger_at = next_trigger_instant(alarm, now)?;

        let request = NotificationRequest {
            content: NotificationContent {
                title: alarm.display_label().to_string(),
                body: NOTIFICATION_BODY.to_string(),
                data: AlarmPayload::new(alarm.id.clone()).to_data(),
            },
            trigger: NotificationTrigger { date: trigger_at },
        };

        match self.platform.schedule(request) {
            Ok(identifier) => {
                info!(
                    "Alarm {} scheduled for {}",
                    alarm.id,
                    trigger_at.format("%Y-%m-%d %H:%M")
                );
                self.index
                    .entry(alarm.id.clone())
                    .or_default()
                    .push(identifier.clone());
                Ok(ScheduledAlarm {
                    identifier,
                    trigger_at,
                })
            }
            Err(e) => {
                error!("Error scheduling alarm {}: {}", alarm.id, e);
                Err(e)
            }
        }
    }

    /// Cancel every pending notification for `alarm_id`. Returns how many
    /// were cancelled; zero when nothing was scheduled.
    pub fn cancel(&mut self, alarm_id: &AlarmId) -> Result<usize, ScheduleError> {
        if !self.index_trusted && self.rebuild_index().is_err() {
            return self.cancel_by_enumeration(alarm_id);
        }

        let Some(identifiers) = self.index.remove(alarm_id) else {
            return Ok(0);
        };
        let mut cancelled = 0;
        for (i, identifier) in identifiers.iter().enumerate() {
            if let Err(e) = self.platform.cancel(identifier) {
                error!("Error cancelling alarm {}: {}", alarm_id, e);
                self.index
                    .insert(alarm_id.clone(), identifiers[i..].to_vec());
                return Err(e);
            }
            cancelled += 1;
        }
        if cancelled > 0 {
            info!("Cancelled {} notification(s) for alarm {}", cancelled, alarm_id);
        }
        Ok(cancelled)
    }

    fn cancel_by_enumeration(&mut self, alarm_id: &AlarmId) -> Result<usize, ScheduleError> {
        let pending = self.platform.pending().map_err(|e| {
            error!("Error cancelling alarm {}: {}", alarm_id, e);
            e
        })?;
        let mut cancelled = 0;
        for notification in pending {
            if notification.alarm_id().as_ref() == Some(alarm_id) {
                self.platform.cancel(&notification.identifier)?;
                cancelled += 1;
            }
        }
        self.index.remove(alarm_id);
        Ok(cancelled)
    }

    /// Cancel everything the platform has pending, alarm or not.
    pub fn cancel_all(&mut self) -> Result<(), ScheduleError> {
        self.platform.cancel_all().map_err(|e| {
            error!("Error cancelling all alarms: {}", e);
            e
        })?;
        self.index.clear();
        self.index_trusted = true;
        info!("All alarms cancelled");
        Ok(())
    }

    /// Pending notifications tagged with `alarm_id`, read from the platform.
    pub fn pending_for(&self, alarm_id: &AlarmId) -> Result<Vec<PendingNotification>, ScheduleError> {
        Ok(self
            .platform
            .pending()?
            .into_iter()
            .filter(|n| n.alarm_id().as_ref() == Some(alarm_id))
            .collect())
    }

    /// Alarm notifications whose trigger is at or before `now`.
    pub fn due(&self, now: NaiveDateTime) -> Result<Vec<PendingNotification>, ScheduleError> {
        let mut due: Vec<_> = self
            .platform
            .pending()?
            .into_iter()
            .filter(|n| n.request.trigger.date <= now && n.alarm_id().is_some())
            .collect();
        due.sort_by_key(|n| n.request.trigger.date);
        Ok(due)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::{AlarmDraft, WeekdaySet};
    use chrono::{NaiveDate, Weekday};
    use proptest::prelude::*;

    fn alarm(id: &str, hour: u8, minute: u8) -> Alarm {
        AlarmDraft::at(hour, minute).into_alarm(AlarmId::from(id)).unwrap()
    }

    // 2026-03-14 is a Saturday.
    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 14)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn later_today() {
        let next = next_trigger_instant(&alarm("a", 9, 30), at(7, 0, 0)).unwrap();
        assert_eq!(next, at(9, 30, 0));
    }

    #[test]
    fn earlier_rolls_to_tomorrow() {
        let next = next_trigger_instant(&alarm("a", 6, 0), at(7, 0, 0)).unwrap();
        assert_eq!(next, at(6, 0, 0) + Duration::days(1));
    }

    #[test]
    fn exactly_now_rolls_to_tomorrow() {
        let next = next_trigger_instant(&alarm("a", 7, 0), at(7, 0, 0)).unwrap();
        assert_eq!(next, at(7, 0, 0) + Duration::days(1));
    }

    #[test]
    fn weekly_picks_next_listed_day() {
        let mut a = alarm("a", 6, 30);
        a.repeat = Repeat::weekly([Weekday::Mon, Weekday::Wed].into_iter().collect());
        let next = next_trigger_instant(&a, at(7, 0, 0)).unwrap();
        assert_eq!(next.weekday(), Weekday::Mon);
        assert_eq!(next, at(6, 30, 0) + Duration::days(2));
    }

    #[test]
    fn weekly_same_day_after_time_waits_a_week() {
        let mut a = alarm("a", 6, 30);
        a.repeat = Repeat::weekly([Weekday::Sat].into_iter().collect());
        let next = next_trigger_instant(&a, at(7, 0, 0)).unwrap();
        assert_eq!(next, at(6, 30, 0) + Duration::days(7));

        let next = next_trigger_instant(&a, at(6, 0, 0)).unwrap();
        assert_eq!(next, at(6, 30, 0));
    }

    #[test]
    fn invalid_time_is_an_error() {
        let mut a = alarm("a", 6, 30);
        a.hour = 24;
        assert!(matches!(
            next_trigger_instant(&a, at(7, 0, 0)),
            Err(ScheduleError::InvalidTime { hour: 24, .. })
        ));
    }

    #[test]
    fn schedule_registers_one_tagged_notification() {
        let mut scheduler = NotificationScheduler::attach(InMemoryPlatform::new());
        let a = alarm("a", 9, 0);
        let scheduled = scheduler.schedule(&a, at(7, 0, 0)).unwrap();
        assert_eq!(scheduled.trigger_at, at(9, 0, 0));

        let pending = scheduler.pending_for(&a.id).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].request.content.title, "Alarm");
        assert_eq!(pending[0].request.content.body, NOTIFICATION_BODY);
        assert_eq!(
            pending[0].request.content.data,
            serde_json::json!({"alarmId": "a", "type": "alarm"})
        );
    }

    #[test]
    fn rescheduling_replaces_previous_notification() {
        let mut scheduler = NotificationScheduler::attach(InMemoryPlatform::new());
        let mut a = alarm("a", 9, 0);
        scheduler.schedule(&a, at(7, 0, 0)).unwrap();
        a.hour = 10;
        scheduler.schedule(&a, at(7, 0, 0)).unwrap();

        let pending = scheduler.pending_for(&a.id).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].request.trigger.date, at(10, 0, 0));
    }

    #[test]
    fn cancel_is_idempotent_and_targeted() {
        let mut scheduler = NotificationScheduler::attach(InMemoryPlatform::new());
        scheduler.schedule(&alarm("a", 9, 0), at(7, 0, 0)).unwrap();
        scheduler.schedule(&alarm("b", 9, 0), at(7, 0, 0)).unwrap();

        assert_eq!(scheduler.cancel(&AlarmId::from("a")).unwrap(), 1);
        assert_eq!(scheduler.cancel(&AlarmId::from("a")).unwrap(), 0);
        assert_eq!(scheduler.cancel(&AlarmId::from("never")).unwrap(), 0);
        assert_eq!(scheduler.platform().snapshot().len(), 1);
        assert_eq!(
            scheduler.platform().snapshot()[0].alarm_id(),
            Some(AlarmId::from("b"))
        );
    }

    #[test]
    fn cancel_uses_index_without_enumerating() {
        let mut scheduler = NotificationScheduler::attach(InMemoryPlatform::new());
        scheduler.schedule(&alarm("a", 9, 0), at(7, 0, 0)).unwrap();
        let before = scheduler.platform().enumerations();
        scheduler.cancel(&AlarmId::from("a")).unwrap();
        assert_eq!(scheduler.platform().enumerations(), before);
    }

    #[test]
    fn attach_indexes_notifications_from_a_previous_process() {
        let mut first = NotificationScheduler::attach(InMemoryPlatform::new());
        first.schedule(&alarm("a", 9, 0), at(7, 0, 0)).unwrap();

        let mut second = NotificationScheduler::attach(first.into_platform());
        assert_eq!(second.cancel(&AlarmId::from("a")).unwrap(), 1);
        assert!(second.platform().snapshot().is_empty());
    }

    #[test]
    fn untrusted_index_falls_back_to_enumeration() {
        let mut first = NotificationScheduler::attach(InMemoryPlatform::new());
        first.schedule(&alarm("a", 9, 0), at(7, 0, 0)).unwrap();
        let mut platform = first.into_platform();
        platform.fail_enumerate = true;

        let mut second = NotificationScheduler::attach(platform);
        assert!(second.cancel(&AlarmId::from("a")).is_err());

        second.platform_mut().fail_enumerate = false;
        assert_eq!(second.cancel(&AlarmId::from("a")).unwrap(), 1);
    }

    #[test]
    fn invalidated_index_sees_notifications_registered_elsewhere() {
        let mut scheduler = NotificationScheduler::attach(InMemoryPlatform::new());
        scheduler.schedule(&alarm("a", 9, 0), at(7, 0, 0)).unwrap();
        let request = scheduler.platform().snapshot()[0].request.clone();
        scheduler.platform_mut().schedule(request).unwrap();

        scheduler.invalidate_index();
        assert_eq!(scheduler.cancel(&AlarmId::from("a")).unwrap(), 2);
        assert!(scheduler.platform().snapshot().is_empty());
    }

    #[test]
    fn failed_registration_leaves_nothing_pending() {
        let mut platform = InMemoryPlatform::new();
        platform.fail_schedule = true;
        let mut scheduler = NotificationScheduler::attach(platform);
        assert!(scheduler.schedule(&alarm("a", 9, 0), at(7, 0, 0)).is_err());
        assert!(scheduler.platform().snapshot().is_empty());
    }

    #[test]
    fn cancel_all_clears_everything() {
        let mut scheduler = NotificationScheduler::attach(InMemoryPlatform::new());
        scheduler.schedule(&alarm("a", 9, 0), at(7, 0, 0)).unwrap();
        scheduler.schedule(&alarm("b", 10, 0), at(7, 0, 0)).unwrap();
        scheduler.cancel_all().unwrap();
        assert!(scheduler.platform().snapshot().is_empty());
        assert_eq!(scheduler.cancel(&AlarmId::from("a")).unwrap(), 0);
    }

    #[test]
    fn due_lists_only_elapsed_triggers() {
        let mut scheduler = NotificationScheduler::attach(InMemoryPlatform::new());
        scheduler.schedule(&alarm("a", 7, 30), at(7, 0, 0)).unwrap();
        scheduler.schedule(&alarm("b", 8, 0), at(7, 0, 0)).unwrap();
        let due = scheduler.due(at(7, 45, 0)).unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].alarm_id(), Some(AlarmId::from("a")));
    }

    proptest! {
        #[test]
        fn one_time_trigger_is_within_a_day(
            h in 0u8..24, m in 0u8..60,
            nh in 0u32..24, nm in 0u32..60, ns in 0u32..60,
        ) {
            let now = at(nh, nm, ns);
            let next = next_trigger_instant(&alarm("p", h, m), now).unwrap();
            prop_assert!(next > now);
            prop_assert!(next - now <= Duration::hours(24));
        }

        #[test]
        fn weekly_trigger_is_within_a_week_on_a_listed_day(
            h in 0u8..24, m in 0u8..60, mask in 1u8..128,
            nh in 0u32..24, nm in 0u32..60,
        ) {
            let days = WeekdaySet::from_indices((0..7).filter(|i| mask & (1 << i) != 0)).unwrap();
            let mut a = alarm("p", h, m);
            a.repeat = Repeat::weekly(days);
            let now = at(nh, nm, 0);
            let next = next_trigger_instant(&a, now).unwrap();
            prop_assert!(next > now);
            prop_assert!(next - now <= Duration::days(7));
            prop_assert!(days.contains(next.weekday()));
        }
    }
}
