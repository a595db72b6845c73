//! Async host loop for a ringing session.
//!
//! The per-second ticker and the emergency deadline are owned by the loop, so
//! they are dropped together with it on every exit path. Wall-clock instants
//! handed to the session are derived from tokio's monotonic clock, anchored
//! once at entry.

use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval_at, sleep_until, Instant, MissedTickBehavior};
use tracing::info;

use super::alert::{AlertDevice, SoundSource};
use super::session::{RingingSession, RingingState};
use crate::events::Event;

const TICK: Duration = Duration::from_secs(1);

/// User or host input forwarded into a running session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionInput {
    /// The user submitted this text.
    Submit(String),
    /// Platform back gesture.
    Back,
    /// The hosting screen is going away.
    Teardown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    Dismissed,
    AutoStopped,
    /// Input closed or the host tore the screen down while ringing.
    TornDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriveReport {
    pub end: SessionEnd,
    pub attempts: u32,
    pub elapsed_seconds: u64,
}

/// Run `session` until it is dismissed, auto-stops, or is torn down.
///
/// The session is started first if it is still arming. Every event it
/// produces is passed to `on_event`. Dropping `inputs`' sender counts as
/// teardown.
pub async fn drive<D, F>(
    mut session: RingingSession<D>,
    sound: Option<&SoundSource>,
    mut inputs: mpsc::UnboundedReceiver<SessionInput>,
    mut on_event: F,
) -> DriveReport
where
    D: AlertDevice,
    F: FnMut(&Event),
{
    let origin = Instant::now();
    let origin_wall = Utc::now();
    let now = || -> DateTime<Utc> {
        origin_wall
            + chrono::Duration::from_std(origin.elapsed()).unwrap_or_else(|_| chrono::Duration::zero())
    };

    if session.state() == RingingState::Arming {
        if let Some(event) = session.start(now(), sound) {
            on_event(&event);
        }
    }

    let emergency_after = session
        .deadline()
        .and_then(|deadline| (deadline - now()).to_std().ok())
        .unwrap_or(Duration::ZERO);
    let emergency = sleep_until(Instant::now() + emergency_after);
    tokio::pin!(emergency);

    let mut ticker = interval_at(origin + TICK, TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    while !session.is_finished() {
        let event = tokio::select! {
            biased;

            _ = &mut emergency => session.emergency_stop(now()),
            _ = ticker.tick() => session.tick(now()),
            input = inputs.recv() => match input {
                Some(SessionInput::Submit(text)) => session.submit_text(&text, now()),
                Some(SessionInput::Back) => session.back_pressed(now()),
                Some(SessionInput::Teardown) | None => {
                    info!("Ringing screen for alarm {} torn down", session.alarm_id());
                    return report(&session, SessionEnd::TornDown);
                }
            },
        };
        if let Some(event) = event {
            on_event(&event);
        }
    }

    let end = match session.state() {
        RingingState::AutoStopped => SessionEnd::AutoStopped,
        _ => SessionEnd::Dismissed,
    };
    report(&session, end)
}

fn report<D: AlertDevice>(session: &RingingSession<D>, end: SessionEnd) -> DriveReport {
    DriveReport {
        end,
        attempts: session.attempts(),
        elapsed_seconds: session.elapsed_seconds(),
    }
}
