use awake_core::scheduler::{route_notification_response, NotificationPlatform, PendingNotification};
use awake_core::Clock;
use clap::Subcommand;

use super::{open_store, CliResult};

#[derive(Subcommand)]
pub enum NotifyAction {
    /// List pending alarm notifications
    Pending {
        #[arg(long)]
        json: bool,
    },
    /// List notifications whose trigger has passed
    Due {
        /// Remove them from the journal, as the OS does on delivery, and
        /// print the alarm each one routes to
        #[arg(long)]
        deliver: bool,
        #[arg(long)]
        json: bool,
    },
}

pub fn run(action: NotifyAction) -> CliResult {
    let mut store = open_store()?;

    match action {
        NotifyAction::Pending { json } => {
            let pending = store.scheduler().platform().pending()?;
            print_notifications(&pending, json)?;
        }
        NotifyAction::Due { deliver, json } => {
            let now = store.clock().now();
            if deliver {
                let delivered = store.scheduler_mut().platform_mut().take_due(now)?;
                if json {
                    print_notifications(&delivered, true)?;
                } else {
                    for notification in &delivered {
                        if let Some(alarm_id) =
                            route_notification_response(&notification.request.content.data)
                        {
                            println!("{alarm_id}");
                        }
                    }
                }
            } else {
                let due = store.scheduler().due(now)?;
                print_notifications(&due, json)?;
            }
        }
    }
    Ok(())
}

fn print_notifications(notifications: &[PendingNotification], json: bool) -> CliResult {
    if json {
        println!("{}", serde_json::to_string_pretty(notifications)?);
        return Ok(());
    }
    if notifications.is_empty() {
        println!("No notifications");
    }
    for notification in notifications {
        let alarm = notification
            .alarm_id()
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".into());
        println!(
            "{}  {}  {}  {}",
            notification.identifier,
            notification.request.trigger.date.format("%Y-%m-%d %H:%M"),
            alarm,
            notification.request.content.title
        );
    }
    Ok(())
}
