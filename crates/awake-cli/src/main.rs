use awake_core::Config;
use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

/// Env var holding a `tracing` filter; wins over `logging.level`.
const LOG_ENV: &str = "AWAKE_LOG";

#[derive(Parser)]
#[command(name = "awake-cli", version, about = "Awake alarm CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Alarm management
    Alarm {
        #[command(subcommand)]
        action: commands::alarm::AlarmAction,
    },
    /// User settings
    Settings {
        #[command(subcommand)]
        action: commands::settings::SettingsAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Pending alarm notifications
    Notify {
        #[command(subcommand)]
        action: commands::notify::NotifyAction,
    },
    /// Ring an alarm until "yes i am awake" is typed
    Ring {
        /// Alarm to ring; defaults to the first due notification
        alarm_id: Option<String>,
    },
    /// Print shell completions
    Completions {
        shell: clap_complete::Shell,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(Config::load_or_default().logging.level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging();

    let result = match cli.command {
        Commands::Alarm { action } => commands::alarm::run(action),
        Commands::Settings { action } => commands::settings::run(action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Notify { action } => commands::notify::run(action),
        Commands::Ring { alarm_id } => commands::ring::run(alarm_id).await,
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "awake-cli", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
