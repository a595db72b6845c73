use std::io::{BufRead, Write};

use awake_core::error::AudioError;
use awake_core::ringing::REQUIRED_PHRASE;
use awake_core::scheduler::route_notification_response;
use awake_core::time_format::{format_elapsed, format_time};
use awake_core::{
    drive, session_for, AlarmId, AlertDevice, Clock, Config, Event, SessionEnd, SessionInput,
    SoundSource,
};
use tokio::sync::mpsc;
use tracing::warn;

use super::{open_store, warn_issues, CliResult};

/// Terminal stand-in for the speaker and vibration motor. It cannot play
/// audio, so sessions fall back to pulses, which ring the terminal bell.
#[derive(Debug, Default)]
struct TerminalAlert;

impl AlertDevice for TerminalAlert {
    fn play_looping(&mut self, sound: &SoundSource) -> Result<(), AudioError> {
        Err(AudioError::Unsupported(format!("terminal cannot play {sound}")))
    }

    fn stop_sound(&mut self) -> Result<(), AudioError> {
        Ok(())
    }

    fn pulse(&mut self) {
        let mut stderr = std::io::stderr();
        let _ = stderr.write_all(b"\x07");
        let _ = stderr.flush();
    }

    fn error_feedback(&mut self) {
        self.pulse();
    }
}

pub async fn run(alarm_id: Option<String>) -> CliResult {
    let mut store = open_store()?;

    let alarm_id = match alarm_id {
        Some(id) => AlarmId::from(id),
        None => {
            let now = store.clock().now();
            let due = store.scheduler().due(now)?;
            let first = due.first().ok_or("no alarm is due")?;
            route_notification_response(&first.request.content.data)
                .ok_or("due notification does not belong to an alarm")?
        }
    };
    // Whatever was pending for this alarm has now been delivered.
    if let Err(e) = store.scheduler_mut().cancel(&alarm_id) {
        warn!("Could not withdraw notification for alarm {}: {}", alarm_id, e);
    }

    let settings = store.settings();
    let sound = Config::load_or_default().sound_source();
    let session = session_for(&store, &alarm_id, TerminalAlert);

    match store.get(&alarm_id) {
        Some(alarm) => println!(
            "{}  {}",
            format_time(alarm.hour, alarm.minute, settings.use_24_hour),
            session.label()
        ),
        None => println!("{}", session.label()),
    }
    println!("Type \"{REQUIRED_PHRASE}\" to stop.");

    let (tx, rx) = mpsc::unbounded_channel();
    // A plain thread so a pending read never holds up runtime shutdown.
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(SessionInput::Submit(line)).is_err() {
                break;
            }
        }
    });

    let report = drive(session, sound.as_ref(), rx, print_event).await;

    // Alarms may have been edited from another shell while this one rang.
    store.refresh();

    match report.end {
        SessionEnd::Dismissed => {
            let acknowledged = store.acknowledge_dismissal(&alarm_id)?;
            warn_issues(&acknowledged);
            println!(
                "Dismissed after {} ({} wrong attempt(s))",
                format_elapsed(report.elapsed_seconds),
                report.attempts
            );
        }
        SessionEnd::AutoStopped => {
            let reconciled = store.reconcile()?;
            warn_issues(&reconciled);
            println!("Stopped automatically after {}", format_elapsed(report.elapsed_seconds));
        }
        SessionEnd::TornDown => {
            // The notification was withdrawn on entry; put it back.
            let reconciled = store.reconcile()?;
            warn_issues(&reconciled);
            return Err("input closed before the alarm was dismissed".into());
        }
    }
    Ok(())
}

fn print_event(event: &Event) {
    match event {
        Event::RingingStarted {
            alert,
            emergency_stop_minutes,
            ..
        } => {
            eprintln!("ringing ({alert:?})");
            println!("{}", minutes_left_line(*emergency_stop_minutes));
        }
        Event::AutoStopCountdown { minutes_left, .. } => {
            println!("{}", minutes_left_line(*minutes_left));
        }
        Event::PhraseRejected { attempts, .. } => {
            println!("Not quite. Type \"{REQUIRED_PHRASE}\" ({attempts} wrong so far)");
        }
        Event::AlarmDismissed { .. } => println!("Good morning."),
        _ => {}
    }
}

fn minutes_left_line(minutes: u32) -> String {
    match minutes {
        1 => "Stops by itself in 1 minute".into(),
        n => format!("Stops by itself in {n} minutes"),
    }
}
