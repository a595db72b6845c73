//! The alarm store: canonical in-memory alarms and settings.
//!
//! Every mutation runs in the same order: compute the new state, persist it,
//! commit it in memory, then bring the notification scheduler in line. A
//! failed write or a failed platform call does not roll anything back; it is
//! reported as a [`MutationIssue`] on the returned [`Mutation`] so the host
//! can warn the user.
//!
//! Readers get the alarm list as an `Arc<[Alarm]>` snapshot. Mutations swap
//! the whole slice, so a snapshot never shows a half-applied change.

use chrono::Utc;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

use crate::alarm::{sort_for_display, Alarm, AlarmDraft, AlarmId, AlarmPatch};
use crate::clock::{Clock, SystemClock};
use crate::error::{ScheduleError, ValidationError};
use crate::events::Event;
use crate::scheduler::{NotificationPlatform, NotificationScheduler};
use crate::settings::{Settings, SettingsPatch};
use crate::storage::{KeyValueStore, Persistence, ALARMS_KEY, SETTINGS_KEY};

/// Something that went wrong after a mutation was committed in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationIssue {
    /// The durable write failed; the change is lost on restart.
    NotPersisted { key: &'static str, message: String },
    /// The alarm could not be registered and will not ring.
    NotScheduled { alarm_id: AlarmId, message: String },
    /// An old notification could not be withdrawn and may still ring.
    NotCancelled { alarm_id: AlarmId, message: String },
}

impl fmt::Display for MutationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MutationIssue::NotPersisted { key, message } => {
                write!(f, "could not save {key}: {message}")
            }
            MutationIssue::NotScheduled { alarm_id, message } => {
                write!(f, "alarm {alarm_id} may not ring: {message}")
            }
            MutationIssue::NotCancelled { alarm_id, message } => {
                write!(f, "alarm {alarm_id} may still ring: {message}")
            }
        }
    }
}

/// Outcome of a store mutation.
#[must_use = "a mutation may carry issues the user should be warned about"]
#[derive(Debug, Clone, PartialEq)]
pub struct Mutation<T> {
    pub value: T,
    pub issues: Vec<MutationIssue>,
}

impl<T> Mutation<T> {
    fn clean(value: T) -> Self {
        Self {
            value,
            issues: Vec::new(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Whether a scheduling problem means an alarm may fail to ring (or ring
    /// when it should not).
    pub fn may_not_ring(&self) -> bool {
        self.issues.iter().any(|issue| {
            matches!(
                issue,
                MutationIssue::NotScheduled { .. } | MutationIssue::NotCancelled { .. }
            )
        })
    }

    pub fn into_value(self) -> T {
        self.value
    }
}

/// Counts from [`AlarmStore::reconcile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReconcileReport {
    pub armed: usize,
    pub cancelled: usize,
}

pub struct AlarmStore<K, P, C = SystemClock> {
    persistence: Persistence<K>,
    scheduler: NotificationScheduler<P>,
    clock: C,
    alarms: Arc<[Alarm]>,
    settings: Settings,
    events: Vec<Event>,
}

impl<K: KeyValueStore, P: NotificationPlatform> AlarmStore<K, P, SystemClock> {
    /// Hydrate from `kv` and attach to `platform`, using the local clock.
    pub fn open(kv: K, platform: P) -> Self {
        Self::with_clock(kv, platform, SystemClock)
    }
}

impl<K: KeyValueStore, P: NotificationPlatform, C: Clock> AlarmStore<K, P, C> {
    pub fn with_clock(kv: K, platform: P, clock: C) -> Self {
        let persistence = Persistence::new(kv);
        let alarms = persistence.load_alarms();
        let settings = persistence.load_settings();
        info!("Loaded {} alarm(s)", alarms.len());
        Self {
            persistence,
            scheduler: NotificationScheduler::attach(platform),
            clock,
            alarms: alarms.into(),
            settings,
            events: Vec::new(),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Snapshot of the alarms in stored order.
    pub fn alarms(&self) -> Arc<[Alarm]> {
        Arc::clone(&self.alarms)
    }

    pub fn settings(&self) -> Settings {
        self.settings
    }

    pub fn get(&self, id: &AlarmId) -> Option<&Alarm> {
        self.alarms.iter().find(|a| &a.id == id)
    }

    pub fn sorted_for_display(&self) -> Vec<Alarm> {
        sort_for_display(&self.alarms)
    }

    pub fn scheduler(&self) -> &NotificationScheduler<P> {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut NotificationScheduler<P> {
        &mut self.scheduler
    }

    pub fn persistence(&self) -> &Persistence<K> {
        &self.persistence
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Take the events queued since the last call.
    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Create an alarm with a fresh id. Enabled alarms are scheduled.
    pub fn add(&mut self, draft: AlarmDraft) -> Result<Mutation<Alarm>, ValidationError> {
        let mut id = AlarmId::generate();
        while self.get(&id).is_some() {
            id = AlarmId::generate();
        }
        let alarm = draft.into_alarm(id)?;

        let mut next = self.alarms.to_vec();
        next.push(alarm.clone());

        let mut issues = Vec::new();
        self.persist_alarms(&next, &mut issues);
        self.alarms = next.into();
        if alarm.enabled {
            self.arm(&alarm, &mut issues);
        }

        info!("Alarm {} added for {:02}:{:02}", alarm.id, alarm.hour, alarm.minute);
        self.events.push(Event::AlarmAdded {
            alarm_id: alarm.id.clone(),
            hour: alarm.hour,
            minute: alarm.minute,
            at: Utc::now(),
        });
        Ok(Mutation {
            value: alarm,
            issues,
        })
    }

    /// Merge `patch` into the alarm with `id`. Unknown ids are a no-op and
    /// yield `None`. Any pending trigger is replaced, or withdrawn if the
    /// alarm ends up disabled.
    pub fn update(
        &mut self,
        id: &AlarmId,
        patch: &AlarmPatch,
    ) -> Result<Mutation<Option<Alarm>>, ValidationError> {
        let Some(pos) = self.alarms.iter().position(|a| &a.id == id) else {
            return Ok(Mutation::clean(None));
        };
        let updated = self.alarms[pos].merged(patch)?;

        let mut next = self.alarms.to_vec();
        next[pos] = updated.clone();

        let mut issues = Vec::new();
        self.persist_alarms(&next, &mut issues);
        self.alarms = next.into();
        // `schedule` withdraws the old trigger itself.
        if updated.enabled {
            self.arm(&updated, &mut issues);
        } else {
            self.disarm(id, &mut issues);
        }

        self.events.push(Event::AlarmUpdated {
            alarm_id: id.clone(),
            enabled: updated.enabled,
            at: Utc::now(),
        });
        Ok(Mutation {
            value: Some(updated),
            issues,
        })
    }

    /// Flip the enabled flag through [`update`](Self::update).
    pub fn toggle(&mut self, id: &AlarmId) -> Result<Mutation<Option<Alarm>>, ValidationError> {
        let Some(enabled) = self.get(id).map(|a| a.enabled) else {
            return Ok(Mutation::clean(None));
        };
        self.update(id, &AlarmPatch::enabled(!enabled))
    }

    /// Delete the alarm with `id` and withdraw its trigger. Removing an
    /// unknown id changes nothing and returns `None`.
    pub fn remove(&mut self, id: &AlarmId) -> Mutation<Option<Alarm>> {
        let removed = self.get(id).cloned();
        let next: Vec<Alarm> = self.alarms.iter().filter(|a| &a.id != id).cloned().collect();

        let mut issues = Vec::new();
        self.persist_alarms(&next, &mut issues);
        self.alarms = next.into();
        self.disarm(id, &mut issues);

        if removed.is_some() {
            info!("Alarm {} removed", id);
            self.events.push(Event::AlarmRemoved {
                alarm_id: id.clone(),
                at: Utc::now(),
            });
        }
        Mutation {
            value: removed,
            issues,
        }
    }

    /// Merge `patch` into the settings. Scheduling is not affected.
    pub fn update_settings(
        &mut self,
        patch: &SettingsPatch,
    ) -> Result<Mutation<Settings>, ValidationError> {
        let next = self.settings.merged(patch)?;

        let mut issues = Vec::new();
        if let Err(e) = self.persistence.save_settings(&next) {
            issues.push(MutationIssue::NotPersisted {
                key: SETTINGS_KEY,
                message: e.to_string(),
            });
        }
        self.settings = next;

        self.events.push(Event::SettingsUpdated { at: Utc::now() });
        Ok(Mutation {
            value: next,
            issues,
        })
    }

    /// Re-read the alarms from the durable store, discarding the in-memory
    /// list. Returns the number of alarms loaded.
    ///
    /// Another process may have scheduled or cancelled notifications as
    /// well, so the scheduler's id index is dropped too.
    pub fn refresh(&mut self) -> usize {
        let alarms = self.persistence.load_alarms();
        let count = alarms.len();
        self.alarms = alarms.into();
        self.scheduler.invalidate_index();
        self.events.push(Event::AlarmsRefreshed {
            count,
            at: Utc::now(),
        });
        count
    }

    /// Apply what a successful dismissal means for the alarm: a one-time
    /// alarm is disabled, a weekly alarm is re-armed for its next day.
    pub fn acknowledge_dismissal(
        &mut self,
        id: &AlarmId,
    ) -> Result<Mutation<Option<Alarm>>, ValidationError> {
        let Some(alarm) = self.get(id).cloned() else {
            return Ok(Mutation::clean(None));
        };
        if alarm.is_one_time() {
            return self.update(id, &AlarmPatch::enabled(false));
        }

        let mut issues = Vec::new();
        if alarm.enabled {
            self.arm(&alarm, &mut issues);
        }
        Ok(Mutation {
            value: Some(alarm),
            issues,
        })
    }

    /// Make the platform's pending notifications match the stored alarms:
    /// every enabled alarm gets a trigger, everything else is withdrawn.
    pub fn reconcile(&mut self) -> Result<Mutation<ReconcileReport>, ScheduleError> {
        self.scheduler.rebuild_index()?;
        let pending: HashSet<AlarmId> = self
            .scheduler
            .platform()
            .pending()?
            .iter()
            .filter_map(|n| n.alarm_id())
            .collect();
        let enabled: HashSet<AlarmId> = self
            .alarms
            .iter()
            .filter(|a| a.enabled)
            .map(|a| a.id.clone())
            .collect();

        let mut report = ReconcileReport::default();
        let mut issues = Vec::new();

        for stale in pending.difference(&enabled) {
            if self.disarm(stale, &mut issues) {
                report.cancelled += 1;
            }
        }
        let alarms = self.alarms();
        for alarm in alarms.iter().filter(|a| a.enabled && !pending.contains(&a.id)) {
            if self.arm(alarm, &mut issues) {
                report.armed += 1;
            }
        }

        if report != ReconcileReport::default() {
            info!(
                "Reconciled notifications: {} armed, {} cancelled",
                report.armed, report.cancelled
            );
        }
        Ok(Mutation {
            value: report,
            issues,
        })
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn persist_alarms(&mut self, alarms: &[Alarm], issues: &mut Vec<MutationIssue>) {
        if let Err(e) = self.persistence.save_alarms(alarms) {
            issues.push(MutationIssue::NotPersisted {
                key: ALARMS_KEY,
                message: e.to_string(),
            });
        }
    }

    fn arm(&mut self, alarm: &Alarm, issues: &mut Vec<MutationIssue>) -> bool {
        let now = self.clock.now();
        match self.scheduler.schedule(alarm, now) {
            Ok(_) => true,
            Err(e) => {
                issues.push(MutationIssue::NotScheduled {
                    alarm_id: alarm.id.clone(),
                    message: e.to_string(),
                });
                false
            }
        }
    }

    fn disarm(&mut self, id: &AlarmId, issues: &mut Vec<MutationIssue>) -> bool {
        match self.scheduler.cancel(id) {
            Ok(_) => true,
            Err(e) => {
                warn!("Alarm {} may still ring: {}", id, e);
                issues.push(MutationIssue::NotCancelled {
                    alarm_id: id.clone(),
                    message: e.to_string(),
                });
                false
            }
        }
    }
}
