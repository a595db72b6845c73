//! Integration tests for the alarm store against real storage backends.

use awake_core::scheduler::NotificationPlatform;
use awake_core::storage::ALARMS_KEY;
use awake_core::{
    AlarmDraft, AlarmId, AlarmPatch, AlarmStore, Database, InMemoryPlatform, ManualClock,
    MemoryStore, MutationIssue, NotificationJournal, Repeat, SettingsPatch,
};
use chrono::{NaiveDate, NaiveDateTime};
use proptest::prelude::*;

fn morning() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 3, 16)
        .unwrap()
        .and_hms_opt(6, 0, 0)
        .unwrap()
}

fn memory_store() -> AlarmStore<MemoryStore, InMemoryPlatform, ManualClock> {
    AlarmStore::with_clock(
        MemoryStore::new(),
        InMemoryPlatform::new(),
        ManualClock::new(morning()),
    )
}

#[test]
fn test_add_registers_exactly_one_tagged_notification() {
    let mut store = memory_store();
    let first = store.add(AlarmDraft::at(7, 0)).unwrap().into_value();
    let second = store.add(AlarmDraft::at(7, 0)).unwrap().into_value();

    assert_ne!(first.id, second.id);
    assert_eq!(store.alarms().len(), 2);
    assert_eq!(store.persistence().load_alarms(), store.alarms().to_vec());
    for id in [&first.id, &second.id] {
        assert_eq!(store.scheduler().pending_for(id).unwrap().len(), 1);
    }
}

#[test]
fn test_disable_withdraws_every_notification() {
    let mut store = memory_store();
    let id = store.add(AlarmDraft::at(7, 0)).unwrap().into_value().id;

    let updated = store.update(&id, &AlarmPatch::enabled(false)).unwrap();
    assert!(updated.is_clean());
    assert!(store.scheduler().pending_for(&id).unwrap().is_empty());
    assert!(!store.persistence().load_alarms()[0].enabled);
}

#[test]
fn test_remove_is_idempotent() {
    let mut store = memory_store();
    let keep = store.add(AlarmDraft::at(6, 30)).unwrap().into_value().id;
    let gone = store.add(AlarmDraft::at(7, 0)).unwrap().into_value().id;

    let first = store.remove(&gone);
    assert!(first.is_clean());
    assert_eq!(first.value.map(|a| a.id), Some(gone.clone()));
    let after_first = store.alarms();

    let second = store.remove(&gone);
    assert!(second.is_clean());
    assert_eq!(second.value, None);
    assert_eq!(store.alarms(), after_first);
    assert_eq!(store.alarms()[0].id, keep);
    assert!(store.scheduler().pending_for(&gone).unwrap().is_empty());
}

#[test]
fn test_failed_cancel_is_surfaced() {
    let mut store = memory_store();
    let id = store.add(AlarmDraft::at(7, 0)).unwrap().into_value().id;
    store.scheduler_mut().platform_mut().fail_cancel = true;

    let removed = store.remove(&id);
    assert!(removed.may_not_ring());
    assert!(matches!(
        removed.issues.as_slice(),
        [MutationIssue::NotCancelled { .. }]
    ));
    // The removal itself still happened.
    assert!(store.alarms().is_empty());
    assert_eq!(store.persistence().kv().raw(ALARMS_KEY), Some("[]"));
}

#[test]
fn test_state_survives_restart_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("awake.db");

    let id = {
        let mut store = AlarmStore::with_clock(
            Database::open_at(&db_path).unwrap(),
            NotificationJournal::open_at(&db_path).unwrap(),
            ManualClock::new(morning()),
        );
        let id = store
            .add(
                AlarmDraft::at(6, 45)
                    .label("Run")
                    .repeat(Repeat::from_indices([1, 3, 5]).unwrap()),
            )
            .unwrap()
            .into_value()
            .id;
        let _ = store
            .update_settings(&SettingsPatch {
                emergency_stop_minutes: Some(5),
                vibrate_enabled: Some(false),
                ..SettingsPatch::default()
            })
            .unwrap();
        id
    };

    let mut store = AlarmStore::with_clock(
        Database::open_at(&db_path).unwrap(),
        NotificationJournal::open_at(&db_path).unwrap(),
        ManualClock::new(morning()),
    );
    let alarm = store.get(&id).cloned().unwrap();
    assert_eq!(alarm.label.as_deref(), Some("Run"));
    assert_eq!(alarm.repeat.days().indices(), vec![1, 3, 5]);
    assert_eq!(store.settings().emergency_stop_minutes, 5);
    assert!(!store.settings().vibrate_enabled);

    // The journal kept the trigger; disabling after restart still finds it.
    assert_eq!(store.scheduler().pending_for(&id).unwrap().len(), 1);
    let _ = store.toggle(&id).unwrap();
    assert!(store.scheduler().platform().pending().unwrap().is_empty());
}

#[test]
fn test_corrupt_slot_starts_empty() {
    let kv = MemoryStore::with_values([(ALARMS_KEY, "{\"not\":\"a list\"}")]);
    let store = AlarmStore::with_clock(kv, InMemoryPlatform::new(), ManualClock::new(morning()));
    assert!(store.alarms().is_empty());
}

#[test]
fn test_toggle_unknown_id_is_noop() {
    let mut store = memory_store();
    let result = store.toggle(&AlarmId::from("missing")).unwrap();
    assert_eq!(result.value, None);
    assert!(store.drain_events().is_empty());
}

proptest! {
    #[test]
    fn toggle_twice_restores_enabled(
        hour in 0u8..24,
        minute in 0u8..60,
        enabled in any::<bool>(),
    ) {
        let mut store = memory_store();
        let id = store
            .add(AlarmDraft::at(hour, minute).enabled(enabled))
            .unwrap()
            .into_value()
            .id;

        let _ = store.toggle(&id).unwrap();
        let _ = store.toggle(&id).unwrap();

        prop_assert_eq!(store.get(&id).map(|a| a.enabled), Some(enabled));
        let pending = store.scheduler().pending_for(&id).unwrap().len();
        prop_assert_eq!(pending, usize::from(enabled));
    }

    #[test]
    fn display_order_is_by_minutes(times in prop::collection::vec((0u8..24, 0u8..60), 0..12)) {
        let mut store = memory_store();
        for (hour, minute) in &times {
            let _ = store.add(AlarmDraft::at(*hour, *minute)).unwrap();
        }
        let sorted = store.sorted_for_display();
        prop_assert_eq!(sorted.len(), times.len());
        prop_assert!(sorted.windows(2).all(|w| w[0].minutes_of_day() <= w[1].minutes_of_day()));
    }
}
