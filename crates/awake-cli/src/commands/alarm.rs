use awake_core::time_format::{format_countdown, format_time, parse_time};
use awake_core::{next_trigger_instant, Alarm, AlarmDraft, AlarmId, AlarmPatch, Clock, Repeat, SystemClock};
use clap::Subcommand;

use super::{open_store, warn_issues, CliResult};

#[derive(Subcommand)]
pub enum AlarmAction {
    /// Add an alarm
    Add {
        /// Time as "HH:MM" or "h:MM AM|PM"
        time: String,
        /// Label shown when ringing
        #[arg(long)]
        label: Option<String>,
        /// Repeat on these weekdays, comma-separated (0 = Sunday .. 6 = Saturday)
        #[arg(long, value_delimiter = ',')]
        days: Vec<u8>,
        /// Create the alarm switched off
        #[arg(long)]
        disabled: bool,
    },
    /// List alarms ordered by time of day
    List {
        /// Print the stored records as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change fields of an alarm
    Update {
        /// Alarm ID
        id: String,
        /// New time
        #[arg(long)]
        time: Option<String>,
        /// New label
        #[arg(long, conflicts_with = "clear_label")]
        label: Option<String>,
        /// Remove the label
        #[arg(long)]
        clear_label: bool,
        /// New repeat days, comma-separated (0 = Sunday .. 6 = Saturday)
        #[arg(long, value_delimiter = ',', conflicts_with = "once")]
        days: Option<Vec<u8>>,
        /// Make the alarm one-time
        #[arg(long)]
        once: bool,
        /// Switch the alarm on
        #[arg(long, conflicts_with = "disable")]
        enable: bool,
        /// Switch the alarm off
        #[arg(long)]
        disable: bool,
    },
    /// Switch an alarm on or off
    Toggle {
        /// Alarm ID
        id: String,
    },
    /// Delete an alarm
    Remove {
        /// Alarm ID
        id: String,
    },
    /// Re-arm enabled alarms and withdraw stale notifications
    Reconcile,
}

pub fn run(action: AlarmAction) -> CliResult {
    let mut store = open_store()?;

    match action {
        AlarmAction::Add {
            time,
            label,
            days,
            disabled,
        } => {
            let (hour, minute) = parse_time(&time)?;
            let mut draft = AlarmDraft::at(hour, minute)
                .repeat(Repeat::from_indices(days)?)
                .enabled(!disabled);
            if let Some(label) = label {
                draft = draft.label(label);
            }
            let added = store.add(draft)?;
            warn_issues(&added);
            println!("{}", serde_json::to_string_pretty(&added.value)?);
        }
        AlarmAction::List { json } => {
            let alarms = store.sorted_for_display();
            if json {
                println!("{}", serde_json::to_string_pretty(&alarms)?);
            } else if alarms.is_empty() {
                println!("No alarms");
            } else {
                let use_24_hour = store.settings().use_24_hour;
                for alarm in &alarms {
                    println!("{}", list_line(alarm, use_24_hour));
                }
            }
        }
        AlarmAction::Update {
            id,
            time,
            label,
            clear_label,
            days,
            once,
            enable,
            disable,
        } => {
            let mut patch = AlarmPatch::default();
            if let Some(time) = time {
                let (hour, minute) = parse_time(&time)?;
                patch.hour = Some(hour);
                patch.minute = Some(minute);
            }
            if clear_label {
                patch.label = Some(None);
            } else if let Some(label) = label {
                patch.label = Some(Some(label));
            }
            if once {
                patch.repeat = Some(Repeat::OneTime);
            } else if let Some(days) = days {
                patch.repeat = Some(Repeat::from_indices(days)?);
            }
            if enable {
                patch.enabled = Some(true);
            } else if disable {
                patch.enabled = Some(false);
            }
            if patch.is_empty() {
                return Err("nothing to update".into());
            }

            let updated = store.update(&AlarmId::from(id.as_str()), &patch)?;
            warn_issues(&updated);
            match &updated.value {
                Some(alarm) => println!("{}", serde_json::to_string_pretty(alarm)?),
                None => return Err(format!("alarm not found: {id}").into()),
            }
        }
        AlarmAction::Toggle { id } => {
            let toggled = store.toggle(&AlarmId::from(id.as_str()))?;
            warn_issues(&toggled);
            match &toggled.value {
                Some(alarm) => println!("{}", serde_json::to_string_pretty(alarm)?),
                None => return Err(format!("alarm not found: {id}").into()),
            }
        }
        AlarmAction::Remove { id } => {
            let removed = store.remove(&AlarmId::from(id.as_str()));
            warn_issues(&removed);
            match removed.value {
                Some(alarm) => println!("removed {}", alarm.id),
                None => println!("no alarm with id {id}"),
            }
        }
        AlarmAction::Reconcile => {
            let reconciled = store.reconcile()?;
            warn_issues(&reconciled);
            println!(
                "armed {}, cancelled {}",
                reconciled.value.armed, reconciled.value.cancelled
            );
        }
    }
    Ok(())
}

fn list_line(alarm: &Alarm, use_24_hour: bool) -> String {
    let state = if alarm.enabled { "on " } else { "off" };
    let days = if alarm.is_one_time() {
        "once".to_string()
    } else {
        alarm.repeat.days().short_names().join(",")
    };
    let mut line = format!(
        "{}  {:>8}  {}  {:<12}  {}",
        alarm.id,
        format_time(alarm.hour, alarm.minute, use_24_hour),
        state,
        alarm.display_label(),
        days
    );
    if alarm.enabled {
        let now = SystemClock.now();
        if let Ok(next) = next_trigger_instant(alarm, now) {
            line.push_str("  ");
            line.push_str(&format_countdown(next - now));
        }
    }
    line
}
