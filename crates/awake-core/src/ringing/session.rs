//! A single ringing session.
//!
//! Like the rest of the core this is a wall-clock state machine without
//! threads: the host calls `tick()` about once per second and forwards user
//! input. See [`drive`](super::drive) for a ready-made async host loop.
//!
//! ## State Transitions
//!
//! ```text
//! Arming -> Ringing -> Dismissed     (required phrase typed)
//!                   -> AutoStopped   (emergency deadline reached)
//! ```
//!
//! The alert output is acquired on entry to `Ringing` and released exactly
//! once on leaving it, or when the session is dropped while still ringing.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::alert::{AlertDevice, AlertMode, SoundSource};
use super::phrase::is_required_phrase;
use crate::alarm::{Alarm, AlarmId, DEFAULT_LABEL};
use crate::events::Event;
use crate::settings::Settings;
use crate::time_format::format_elapsed;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RingingState {
    Arming,
    Ringing,
    Dismissed,
    AutoStopped,
}

impl RingingState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RingingState::Dismissed | RingingState::AutoStopped)
    }
}

pub struct RingingSession<D: AlertDevice> {
    alarm_id: AlarmId,
    label: Option<String>,
    one_time: bool,
    state: RingingState,
    /// Failed phrase submissions.
    attempts: u32,
    elapsed_seconds: u64,
    started_at: Option<DateTime<Utc>>,
    emergency_stop_minutes: u32,
    /// Last countdown value reported to the host.
    minutes_left: u32,
    vibrate_enabled: bool,
    input: String,
    device: D,
    /// `Some` exactly while the output is held.
    alert: Option<AlertMode>,
}

impl<D: AlertDevice> RingingSession<D> {
    /// `alarm` is `None` when the id no longer exists in the store; the
    /// session then rings as an unlabeled one-time alarm.
    pub fn new(alarm_id: AlarmId, alarm: Option<&Alarm>, settings: &Settings, device: D) -> Self {
        Self {
            alarm_id,
            label: alarm.and_then(|a| a.label.clone()),
            one_time: alarm.map_or(true, Alarm::is_one_time),
            state: RingingState::Arming,
            attempts: 0,
            elapsed_seconds: 0,
            started_at: None,
            emergency_stop_minutes: settings.emergency_stop_minutes,
            minutes_left: settings.emergency_stop_minutes,
            vibrate_enabled: settings.vibrate_enabled,
            input: String::new(),
            device,
            alert: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn alarm_id(&self) -> &AlarmId {
        &self.alarm_id
    }

    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(DEFAULT_LABEL)
    }

    pub fn is_one_time(&self) -> bool {
        self.one_time
    }

    pub fn state(&self) -> RingingState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed_seconds
    }

    /// `m:ss` for the "ringing for" line.
    pub fn elapsed_display(&self) -> String {
        format_elapsed(self.elapsed_seconds)
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn emergency_stop_minutes(&self) -> u32 {
        self.emergency_stop_minutes
    }

    /// Whole minutes left before auto-stop, rounded up, as last reported.
    pub fn minutes_left(&self) -> u32 {
        self.minutes_left
    }

    /// Instant at which the session auto-stops.
    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.started_at
            .map(|started| started + Duration::minutes(self.emergency_stop_minutes as i64))
    }

    pub fn alert_mode(&self) -> Option<AlertMode> {
        self.alert
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Enter `Ringing` and acquire the alert output.
    pub fn start(&mut self, now: DateTime<Utc>, sound: Option<&SoundSource>) -> Option<Event> {
        if self.state != RingingState::Arming {
            return None;
        }
        self.state = RingingState::Ringing;
        self.started_at = Some(now);

        if self.vibrate_enabled {
            self.device.pulse();
        }

        let mode = match sound {
            Some(source) => match self.device.play_looping(source) {
                Ok(()) => AlertMode::Sound,
                Err(e) => {
                    warn!("Error playing alarm sound {}: {}", source, e);
                    self.fallback_mode()
                }
            },
            None => {
                warn!("No alarm sound configured");
                self.fallback_mode()
            }
        };
        self.alert = Some(mode);

        info!("Alarm {} ringing ({:?})", self.alarm_id, mode);
        Some(Event::RingingStarted {
            alarm_id: self.alarm_id.clone(),
            alert: mode,
            emergency_stop_minutes: self.emergency_stop_minutes,
            at: now,
        })
    }

    fn fallback_mode(&self) -> AlertMode {
        if self.vibrate_enabled {
            AlertMode::HapticPulse
        } else {
            warn!("Alarm {} has neither sound nor vibration", self.alarm_id);
            AlertMode::Silent
        }
    }

    /// Call about once per second. Returns `Some(Event::AlarmAutoStopped)`
    /// when the emergency deadline has been reached, and
    /// `Some(Event::AutoStopCountdown)` each time the minutes left drop.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if self.state != RingingState::Ringing {
            return None;
        }
        self.flush_elapsed(now);

        if self.deadline().is_some_and(|deadline| now >= deadline) {
            return self.emergency_stop(now);
        }
        if self.alert == Some(AlertMode::HapticPulse) {
            self.device.pulse();
        }

        let left = self.remaining_minutes(now);
        if left >= self.minutes_left {
            return None;
        }
        self.minutes_left = left;
        Some(Event::AutoStopCountdown {
            alarm_id: self.alarm_id.clone(),
            minutes_left: left,
            at: now,
        })
    }

    /// Replace the input buffer with what the user has typed so far.
    pub fn set_input(&mut self, text: impl Into<String>) {
        if self.state == RingingState::Ringing {
            self.input = text.into();
        }
    }

    /// Check the input buffer against the required phrase. The buffer is
    /// cleared either way.
    pub fn submit(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if self.state != RingingState::Ringing {
            return None;
        }
        self.flush_elapsed(now);
        let text = std::mem::take(&mut self.input);

        if is_required_phrase(&text) {
            self.state = RingingState::Dismissed;
            self.release();
            info!(
                "Alarm {} dismissed after {}s and {} wrong attempt(s)",
                self.alarm_id, self.elapsed_seconds, self.attempts
            );
            return Some(Event::AlarmDismissed {
                alarm_id: self.alarm_id.clone(),
                attempts: self.attempts,
                elapsed_seconds: self.elapsed_seconds,
                at: now,
            });
        }

        self.attempts += 1;
        if self.vibrate_enabled {
            self.device.error_feedback();
        }
        Some(Event::PhraseRejected {
            alarm_id: self.alarm_id.clone(),
            attempts: self.attempts,
            at: now,
        })
    }

    pub fn submit_text(&mut self, text: &str, now: DateTime<Utc>) -> Option<Event> {
        self.set_input(text);
        self.submit(now)
    }

    /// A platform back gesture. Swallowed (`Some`) until the session is
    /// finished; `None` means the host may navigate away.
    pub fn back_pressed(&self, now: DateTime<Utc>) -> Option<Event> {
        if self.is_finished() {
            return None;
        }
        Some(Event::BackSuppressed {
            alarm_id: self.alarm_id.clone(),
            at: now,
        })
    }

    /// Stop ringing because the emergency deadline fired. The alarm's
    /// enabled flag is left alone.
    pub fn emergency_stop(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if self.state != RingingState::Ringing {
            return None;
        }
        self.flush_elapsed(now);
        self.state = RingingState::AutoStopped;
        self.release();
        warn!(
            "Alarm {} automatically stopped after {} minutes",
            self.alarm_id, self.emergency_stop_minutes
        );
        Some(Event::AlarmAutoStopped {
            alarm_id: self.alarm_id.clone(),
            attempts: self.attempts,
            elapsed_seconds: self.elapsed_seconds,
            at: now,
        })
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn flush_elapsed(&mut self, now: DateTime<Utc>) {
        if let Some(started) = self.started_at {
            let secs = (now - started).num_seconds().max(0) as u64;
            self.elapsed_seconds = self.elapsed_seconds.max(secs);
        }
    }

    fn remaining_minutes(&self, now: DateTime<Utc>) -> u32 {
        let Some(deadline) = self.deadline() else {
            return self.emergency_stop_minutes;
        };
        let secs = (deadline - now).num_seconds().max(0) as u64;
        secs.div_ceil(60) as u32
    }

    fn release(&mut self) {
        if let Some(AlertMode::Sound) = self.alert.take() {
            if let Err(e) = self.device.stop_sound() {
                warn!("Error stopping alarm sound: {}", e);
            }
        }
    }
}

impl<D: AlertDevice> Drop for RingingSession<D> {
    fn drop(&mut self) {
        self.release();
    }
}
