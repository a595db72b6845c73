//! The forced-wake ringing flow: alert output, phrase check, session state
//! machine and its async host loop.

mod alert;
mod driver;
mod phrase;
mod session;

pub use alert::{AlertDevice, AlertMode, SoundSource};
pub use driver::{drive, DriveReport, SessionEnd, SessionInput};
pub use phrase::{is_required_phrase, normalize, REQUIRED_PHRASE};
pub use session::{RingingSession, RingingState};

use crate::alarm::AlarmId;
use crate::clock::Clock;
use crate::scheduler::NotificationPlatform;
use crate::storage::KeyValueStore;
use crate::store::AlarmStore;

/// Build a session for `alarm_id` from the store's current alarms and
/// settings. An id the store no longer knows rings as an unlabeled one-time
/// alarm.
pub fn session_for<K, P, C, D>(
    store: &AlarmStore<K, P, C>,
    alarm_id: &AlarmId,
    device: D,
) -> RingingSession<D>
where
    K: KeyValueStore,
    P: NotificationPlatform,
    C: Clock,
    D: AlertDevice,
{
    RingingSession::new(alarm_id.clone(), store.get(alarm_id), &store.settings(), device)
}
