use awake_core::settings::EMERGENCY_STOP_CHOICES;
use awake_core::SettingsPatch;
use clap::Subcommand;

use super::{open_store, warn_issues, CliResult};

#[derive(Subcommand)]
pub enum SettingsAction {
    /// Print current settings as JSON
    Show,
    /// Change one or more settings
    Set {
        /// Show times as HH:MM instead of h:MM AM/PM
        #[arg(long)]
        use_24_hour: Option<bool>,
        /// Minutes until a ringing alarm stops by itself (5, 10, 15 or 20)
        #[arg(long)]
        emergency_stop_minutes: Option<u32>,
        /// Vibrate while ringing and on wrong phrases
        #[arg(long)]
        vibrate: Option<bool>,
    },
}

pub fn run(action: SettingsAction) -> CliResult {
    let mut store = open_store()?;

    match action {
        SettingsAction::Show => {
            println!("{}", serde_json::to_string_pretty(&store.settings())?);
        }
        SettingsAction::Set {
            use_24_hour,
            emergency_stop_minutes,
            vibrate,
        } => {
            let patch = SettingsPatch {
                use_24_hour,
                emergency_stop_minutes,
                vibrate_enabled: vibrate,
            };
            if patch == SettingsPatch::default() {
                return Err(format!(
                    "nothing to set (emergency stop choices: {EMERGENCY_STOP_CHOICES:?})"
                )
                .into());
            }
            let updated = store.update_settings(&patch)?;
            warn_issues(&updated);
            println!("{}", serde_json::to_string_pretty(&updated.value)?);
        }
    }
    Ok(())
}
