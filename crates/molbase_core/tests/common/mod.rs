//! Shared test fixtures: a recording observer for asserting truncation
//! warnings and nested-before-parent persistence ordering.
#![allow(dead_code)]

use molbase_core::SyncObserver;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    Truncated {
        entity: &'static str,
        field: &'static str,
        original_len: usize,
        max_len: usize,
    },
    NestedResolved {
        entity: &'static str,
        field: &'static str,
        ac: String,
    },
    Persisted {
        entity: &'static str,
        ac: String,
    },
}

#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<SyncEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<SyncEvent> {
        self.events.lock().unwrap().clone()
    }

    fn record(&self, event: SyncEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl SyncObserver for RecordingObserver {
    fn field_truncated(
        &self,
        entity: &'static str,
        field: &'static str,
        original_len: usize,
        max_len: usize,
    ) {
        self.record(SyncEvent::Truncated {
            entity,
            field,
            original_len,
            max_len,
        });
    }

    fn nested_resolved(&self, entity: &'static str, field: &'static str, ac: &str) {
        self.record(SyncEvent::NestedResolved {
            entity,
            field,
            ac: ac.to_string(),
        });
    }

    fn entity_persisted(&self, entity: &'static str, ac: &str) {
        self.record(SyncEvent::Persisted {
            entity,
            ac: ac.to_string(),
        });
    }
}

/// Counts rows in one table.
pub fn count_rows(conn: &rusqlite::Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })
    .unwrap()
}
