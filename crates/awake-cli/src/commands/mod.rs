pub mod alarm;
pub mod config;
pub mod notify;
pub mod ring;
pub mod settings;

use awake_core::{AlarmStore, Database, Mutation, NotificationJournal};

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// The store as the CLI runs it: alarm data and the notification journal
/// share `awake.db` in the data directory.
pub type CliStore = AlarmStore<Database, NotificationJournal>;

pub fn open_store() -> Result<CliStore, Box<dyn std::error::Error>> {
    Ok(AlarmStore::open(Database::open()?, NotificationJournal::open()?))
}

/// Print a mutation's issues as warnings on stderr.
pub fn warn_issues<T>(mutation: &Mutation<T>) {
    for issue in &mutation.issues {
        eprintln!("warning: {issue}");
    }
    if mutation.may_not_ring() {
        eprintln!("warning: run `awake-cli alarm reconcile` to repair scheduling");
    }
}
