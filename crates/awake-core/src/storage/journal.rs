//! SQLite-backed notification platform.
//!
//! Short-lived hosts such as the CLI have no OS scheduler that outlives the
//! process, so pending notifications are journaled next to the alarm data
//! and "delivered" by draining the ones whose trigger has passed.

use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use std::path::Path;

use super::database::DATABASE_FILE;
use super::data_dir;
use crate::error::{ScheduleError, StorageError};
use crate::scheduler::{
    NotificationContent, NotificationId, NotificationPlatform, NotificationRequest,
    NotificationTrigger, PendingNotification,
};

const TRIGGER_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

pub struct NotificationJournal {
    conn: Connection,
}

impl NotificationJournal {
    /// Open the journal inside the data directory's database file.
    pub fn open() -> Result<Self, StorageError> {
        let dir = data_dir().map_err(|e| StorageError::Unavailable(e.to_string()))?;
        Self::open_at(&dir.join(DATABASE_FILE))
    }

    pub fn open_at(path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(path).map_err(|source| StorageError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let journal = Self { conn };
        journal.migrate()?;
        Ok(journal)
    }

    pub fn open_memory() -> Result<Self, StorageError> {
        let journal = Self {
            conn: Connection::open_in_memory()?,
        };
        journal.migrate()?;
        Ok(journal)
    }

    fn migrate(&self) -> Result<(), StorageError> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS notifications (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                title      TEXT NOT NULL,
                body       TEXT NOT NULL,
                data       TEXT NOT NULL,
                trigger_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_notifications_trigger_at ON notifications(trigger_at);",
        )?;
        Ok(())
    }

    /// Remove and return every notification due at `now`, oldest first.
    pub fn take_due(&mut self, now: NaiveDateTime) -> Result<Vec<PendingNotification>, ScheduleError> {
        let cutoff = now.format(TRIGGER_FORMAT).to_string();
        let tx = self.conn.transaction()?;
        let due = {
            let mut stmt = tx.prepare(
                "SELECT id, title, body, data, trigger_at FROM notifications
                 WHERE trigger_at <= ?1 ORDER BY trigger_at, id",
            )?;
            let rows = stmt.query_map(params![cutoff], row_to_pending)?;
            rows.collect::<Result<Vec<_>, _>>()?
        };
        tx.execute("DELETE FROM notifications WHERE trigger_at <= ?1", params![cutoff])?;
        tx.commit()?;
        Ok(due)
    }
}

fn row_to_pending(row: &rusqlite::Row<'_>) -> rusqlite::Result<PendingNotification> {
    let id: i64 = row.get(0)?;
    let data: String = row.get(3)?;
    let trigger_at: String = row.get(4)?;
    let data = serde_json::from_str(&data).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let date = NaiveDateTime::parse_from_str(&trigger_at, TRIGGER_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(PendingNotification {
        identifier: NotificationId::new(id.to_string()),
        request: NotificationRequest {
            content: NotificationContent {
                title: row.get(1)?,
                body: row.get(2)?,
                data,
            },
            trigger: NotificationTrigger { date },
        },
    })
}

impl NotificationPlatform for NotificationJournal {
    fn schedule(&mut self, request: NotificationRequest) -> Result<NotificationId, ScheduleError> {
        let data = serde_json::to_string(&request.content.data)
            .map_err(|e| ScheduleError::Platform(e.to_string()))?;
        self.conn.execute(
            "INSERT INTO notifications (title, body, data, trigger_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                request.content.title,
                request.content.body,
                data,
                request.trigger.date.format(TRIGGER_FORMAT).to_string(),
            ],
        )?;
        Ok(NotificationId::new(self.conn.last_insert_rowid().to_string()))
    }

    fn cancel(&mut self, identifier: &NotificationId) -> Result<(), ScheduleError> {
        // Identifiers not minted here cannot be pending here.
        let Ok(id) = identifier.as_str().parse::<i64>() else {
            return Ok(());
        };
        self.conn
            .execute("DELETE FROM notifications WHERE id = ?1", params![id])?;
        Ok(())
    }

    fn pending(&self) -> Result<Vec<PendingNotification>, ScheduleError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, body, data, trigger_at FROM notifications ORDER BY trigger_at, id",
        )?;
        let rows = stmt.query_map([], row_to_pending)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn cancel_all(&mut self) -> Result<(), ScheduleError> {
        self.conn.execute("DELETE FROM notifications", [])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::{AlarmDraft, AlarmId};
    use crate::scheduler::NotificationScheduler;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 14)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn journal_round_trips_requests() {
        let mut scheduler = NotificationScheduler::attach(NotificationJournal::open_memory().unwrap());
        let alarm = AlarmDraft::at(8, 15)
            .label("Standup")
            .into_alarm(AlarmId::from("a"))
            .unwrap();
        scheduler.schedule(&alarm, at(7, 0)).unwrap();

        let pending = scheduler.platform().pending().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].request.content.title, "Standup");
        assert_eq!(pending[0].request.trigger.date, at(8, 15));
        assert_eq!(pending[0].alarm_id(), Some(AlarmId::from("a")));
    }

    #[test]
    fn take_due_drains_only_elapsed() {
        let mut scheduler = NotificationScheduler::attach(NotificationJournal::open_memory().unwrap());
        for (id, h) in [("a", 8), ("b", 9)] {
            let alarm = AlarmDraft::at(h, 0).into_alarm(AlarmId::from(id)).unwrap();
            scheduler.schedule(&alarm, at(7, 0)).unwrap();
        }
        let due = scheduler.platform_mut().take_due(at(8, 30)).unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].alarm_id(), Some(AlarmId::from("a")));
        assert_eq!(scheduler.platform().pending().unwrap().len(), 1);
    }

    #[test]
    fn pending_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DATABASE_FILE);
        {
            let mut scheduler = NotificationScheduler::attach(NotificationJournal::open_at(&path).unwrap());
            let alarm = AlarmDraft::at(8, 0).into_alarm(AlarmId::from("a")).unwrap();
            scheduler.schedule(&alarm, at(7, 0)).unwrap();
        }
        let mut scheduler = NotificationScheduler::attach(NotificationJournal::open_at(&path).unwrap());
        assert_eq!(scheduler.cancel(&AlarmId::from("a")).unwrap(), 1);
        assert!(scheduler.platform().pending().unwrap().is_empty());
    }
}
