mod common;

use common::{count_rows, RecordingObserver, SyncEvent};
use molbase_core::db::open_db_in_memory;
use molbase_core::{
    EntitySynchronizer, LogObserver, Preference, PreferenceSynchronizer, SyncError,
    MAX_PREFERENCE_VALUE_LEN,
};
use std::sync::Arc;

#[test]
fn repeated_synchronize_appends_fresh_rows() {
    let conn = open_db_in_memory().unwrap();
    let mut sync = PreferenceSynchronizer::new(&conn, Arc::new(LogObserver));

    let preference = Preference::new("jdoe", "review.layout", Some("compact".to_string()));
    let first = sync.synchronize(&preference, true).unwrap().unwrap();
    let second = sync.synchronize(&preference, true).unwrap().unwrap();

    assert_ne!(first.ac, second.ac);
    assert_eq!(count_rows(&conn, "preferences"), 2);
}

#[test]
fn stored_row_matches_the_transient_fields() {
    let conn = open_db_in_memory().unwrap();
    let mut sync = PreferenceSynchronizer::new(&conn, Arc::new(LogObserver));

    let preference = Preference::new("jdoe", "review.layout", Some("compact".to_string()));
    let stored = sync.synchronize(&preference, true).unwrap().unwrap();
    assert!(stored.created_at.is_some());

    let (user_login, key, value): (String, String, Option<String>) = conn
        .query_row(
            "SELECT user_login, pref_key, pref_value FROM preferences;",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .unwrap();
    assert_eq!(user_login, "jdoe");
    assert_eq!(key, "review.layout");
    assert_eq!(value.as_deref(), Some("compact"));
}

#[test]
fn over_length_value_is_truncated_with_warning() {
    let conn = open_db_in_memory().unwrap();
    let observer = RecordingObserver::new();
    let mut sync = PreferenceSynchronizer::new(&conn, observer.clone());

    let long_value = "v".repeat(MAX_PREFERENCE_VALUE_LEN + 5);
    let preference = Preference::new("jdoe", "review.layout", Some(long_value));
    let stored = sync.synchronize(&preference, true).unwrap().unwrap();

    assert_eq!(
        stored.value.as_ref().map(|v| v.chars().count()),
        Some(MAX_PREFERENCE_VALUE_LEN)
    );
    assert!(observer.events().contains(&SyncEvent::Truncated {
        entity: "preference",
        field: "value",
        original_len: MAX_PREFERENCE_VALUE_LEN + 5,
        max_len: MAX_PREFERENCE_VALUE_LEN,
    }));
}

#[test]
fn blank_key_is_a_contract_violation() {
    let conn = open_db_in_memory().unwrap();
    let mut sync = PreferenceSynchronizer::new(&conn, Arc::new(LogObserver));

    let err = sync
        .synchronize(&Preference::new("jdoe", "  ", None), true)
        .unwrap_err();
    assert!(matches!(
        err,
        SyncError::Synchronizer { entity: "preference", .. }
    ));
    assert_eq!(count_rows(&conn, "preferences"), 0);
}

#[test]
fn persist_not_allowed_returns_none_without_insert() {
    let conn = open_db_in_memory().unwrap();
    let mut sync = PreferenceSynchronizer::new(&conn, Arc::new(LogObserver));

    let result = sync
        .synchronize(&Preference::new("jdoe", "review.layout", None), false)
        .unwrap();
    assert!(result.is_none());
    assert_eq!(count_rows(&conn, "preferences"), 0);
}
