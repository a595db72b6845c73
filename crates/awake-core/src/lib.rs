//! # Awake Core Library
//!
//! Core logic for an alarm clock that will not stop ringing until the user
//! types "yes i am awake". Every host (the CLI today) is a thin layer over
//! this crate.
//!
//! ## Architecture
//!
//! - **Alarm Store**: canonical alarms and settings, persisted through a
//!   key-value store and kept in sync with the notification platform
//! - **Scheduler**: next-trigger computation and notification bookkeeping
//!   behind the [`NotificationPlatform`] seam
//! - **Ringing**: a wall-clock state machine that requires the caller to
//!   invoke `tick()` about once per second, plus an async driver for it
//! - **Storage**: SQLite key-value storage, a SQLite notification journal and
//!   TOML configuration
//!
//! ## Key Components
//!
//! - [`AlarmStore`]: the state core every screen reads from
//! - [`RingingSession`]: dismissal state machine
//! - [`NotificationScheduler`]: schedule / cancel by alarm id
//! - [`Config`]: application configuration management

pub mod alarm;
pub mod clock;
pub mod error;
pub mod events;
pub mod ringing;
pub mod scheduler;
pub mod settings;
pub mod storage;
pub mod store;
pub mod time_format;

pub use alarm::{Alarm, AlarmDraft, AlarmId, AlarmPatch, Repeat, WeekdaySet};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{AudioError, ConfigError, CoreError, Result, ScheduleError, StorageError, ValidationError};
pub use events::Event;
pub use ringing::{
    drive, session_for, AlertDevice, AlertMode, DriveReport, RingingSession, RingingState,
    SessionEnd, SessionInput, SoundSource,
};
pub use scheduler::{
    next_trigger_instant, InMemoryPlatform, NotificationPlatform, NotificationScheduler,
};
pub use settings::{Settings, SettingsPatch};
pub use storage::{Config, Database, KeyValueStore, MemoryStore, NotificationJournal, Persistence};
pub use store::{AlarmStore, Mutation, MutationIssue, ReconcileReport};
