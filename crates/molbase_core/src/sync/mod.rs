//! Object-relational synchronization protocol.
//!
//! # Responsibility
//! - Define the per-entity synchronizer contract and its generic
//!   `synchronize` flow (cache check, find, merge-or-instantiate, property
//!   normalization, persist).
//! - Own the typed error taxonomy surfaced to callers.
//!
//! # Invariants
//! - At most one persisted row per logical business identity after a
//!   successful pass, for entities that have a business key.
//! - A row is never inserted while one of its nested cv terms is still
//!   transient; children are synchronized before parents.
//! - Session caches are write-once per key and cleared at session end.
//!
//! # See also
//! - `sync::session` for the unit-of-work façade.

use crate::db::DbError;
use log::debug;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod alias_sync;
pub mod cv_term_sync;
pub mod observer;
pub mod preference_sync;
pub mod session;
pub mod xref_sync;

use observer::SyncObserver;

pub type SyncResult<T> = Result<T, SyncError>;

/// Synchronization error taxonomy.
///
/// All variants abort the current `synchronize` call; the only deliberate
/// warn-and-continue case is field truncation, which is reported through the
/// observer instead.
#[derive(Debug)]
pub enum SyncError {
    /// The business-key lookup could not execute at the storage layer.
    Finder {
        entity: &'static str,
        source: DbError,
    },
    /// Insert or update failed, including for a nested reference.
    Persister {
        entity: &'static str,
        source: DbError,
    },
    /// Contract/state violation, e.g. an unresolvable nested reference or a
    /// corrupt persisted row shape.
    Synchronizer {
        entity: &'static str,
        message: String,
    },
}

impl SyncError {
    pub(crate) fn finder(entity: &'static str, source: impl Into<DbError>) -> Self {
        Self::Finder {
            entity,
            source: source.into(),
        }
    }

    pub(crate) fn persister(entity: &'static str, source: impl Into<DbError>) -> Self {
        Self::Persister {
            entity,
            source: source.into(),
        }
    }

    pub(crate) fn synchronizer(entity: &'static str, message: impl Into<String>) -> Self {
        Self::Synchronizer {
            entity,
            message: message.into(),
        }
    }
}

impl Display for SyncError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Finder { entity, source } => {
                write!(f, "lookup failed for {entity}: {source}")
            }
            Self::Persister { entity, source } => {
                write!(f, "persist failed for {entity}: {source}")
            }
            Self::Synchronizer { entity, message } => {
                write!(f, "synchronization contract violated for {entity}: {message}")
            }
        }
    }
}

impl Error for SyncError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Finder { source, .. } => Some(source),
            Self::Persister { source, .. } => Some(source),
            Self::Synchronizer { .. } => None,
        }
    }
}

/// Per-entity synchronization hooks composed into one generic flow.
///
/// One implementation exists per entity kind; the provided `synchronize`
/// method is the orchestrator and should not be overridden.
pub trait EntitySynchronizer {
    type Entity: Clone;

    /// Stable entity name used in errors and diagnostics.
    fn entity_kind(&self) -> &'static str;

    /// Session dedup key derived from the transient value.
    ///
    /// `None` marks a no-dedup entity: every synchronize call goes through
    /// the finder (and inserts a fresh row when the finder reports
    /// not-found, which for key-less entities is always).
    fn identity_key(&self, transient: &Self::Entity) -> Option<String>;

    /// Session cache read. The default is the deliberate no-op cache used
    /// by entities without a natural dedup key.
    fn cache_lookup(&self, key: &str) -> Option<Self::Entity> {
        let _ = key;
        None
    }

    /// Session cache write. Write-once per key; later writes are ignored.
    fn cache_store(&mut self, key: String, persisted: Self::Entity) {
        let _ = (key, persisted);
    }

    /// Drops all session cache state, marking the end of a unit of work.
    fn clear_cache(&mut self) {}

    /// Looks up the persisted counterpart by business key.
    ///
    /// Returns `Ok(None)` for a legitimate miss; never matches on partial
    /// key overlap.
    fn find(&mut self, transient: &Self::Entity) -> SyncResult<Option<Self::Entity>>;

    /// Builds a new persistent-shape value from exactly the transient
    /// value's defining fields.
    fn instantiate(&self, transient: &Self::Entity) -> SyncResult<Self::Entity>;

    /// Merge-ignoring-persistent policy: transient field values win, except
    /// the accession and audit metadata, which are taken from the persisted
    /// instance.
    fn merge(
        &self,
        transient: &Self::Entity,
        persisted: &Self::Entity,
    ) -> SyncResult<Self::Entity>;

    /// Normalizes scalar fields (length truncation, warn-and-continue) and
    /// resolves every present nested reference through its own synchronizer
    /// before the candidate is persisted. An absent nested reference is a
    /// no-op.
    fn synchronize_properties(
        &mut self,
        candidate: &mut Self::Entity,
        persist_allowed: bool,
    ) -> SyncResult<()>;

    /// Inserts the candidate and assigns its accession and audit metadata.
    fn insert(&mut self, candidate: &mut Self::Entity) -> SyncResult<()>;

    /// Writes the merged state back to the existing row.
    fn update(&mut self, candidate: &Self::Entity) -> SyncResult<()>;

    /// Reconciles a transient value with its storage-backed counterpart,
    /// creating it when absent and `persist_allowed` is set.
    ///
    /// Returns `Ok(None)` only when no counterpart exists and persistence
    /// is not allowed; that path has no side effects.
    fn synchronize(
        &mut self,
        transient: &Self::Entity,
        persist_allowed: bool,
    ) -> SyncResult<Option<Self::Entity>> {
        let key = self.identity_key(transient);
        if let Some(key) = &key {
            if let Some(hit) = self.cache_lookup(key) {
                debug!(
                    "event=sync_cache_hit module=sync entity={} key={key}",
                    self.entity_kind()
                );
                return Ok(Some(hit));
            }
        }

        let result = match self.find(transient)? {
            Some(persisted) => {
                let mut merged = self.merge(transient, &persisted)?;
                self.synchronize_properties(&mut merged, persist_allowed)?;
                self.update(&merged)?;
                merged
            }
            None if !persist_allowed => return Ok(None),
            None => {
                let mut candidate = self.instantiate(transient)?;
                self.synchronize_properties(&mut candidate, true)?;
                self.insert(&mut candidate)?;
                candidate
            }
        };

        if let Some(key) = key {
            self.cache_store(key, result.clone());
        }
        Ok(Some(result))
    }
}

/// Generates a fresh accession for a newly persisted row.
pub(crate) fn new_ac() -> String {
    format!("MB-{}", Uuid::new_v4().simple())
}

/// Truncates `value` to `max_len` characters, reporting data loss through
/// the observer. Fields within bounds are untouched.
pub(crate) fn truncate_to_max(
    value: &mut String,
    max_len: usize,
    entity: &'static str,
    field: &'static str,
    observer: &dyn SyncObserver,
) {
    let original_len = value.chars().count();
    if original_len <= max_len {
        return;
    }
    observer.field_truncated(entity, field, original_len, max_len);
    *value = value.chars().take(max_len).collect();
}

/// Optional-field variant of [`truncate_to_max`].
pub(crate) fn truncate_opt_to_max(
    value: &mut Option<String>,
    max_len: usize,
    entity: &'static str,
    field: &'static str,
    observer: &dyn SyncObserver,
) {
    if let Some(value) = value {
        truncate_to_max(value, max_len, entity, field, observer);
    }
}

/// Reads back the storage-owned audit columns after an insert.
pub(crate) fn load_audit(
    conn: &Connection,
    table: &'static str,
    ac: &str,
    entity: &'static str,
) -> SyncResult<(i64, i64)> {
    conn.query_row(
        &format!("SELECT created_at, updated_at FROM {table} WHERE ac = ?1;"),
        [ac],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )
    .map_err(|err| SyncError::persister(entity, err))
}

#[cfg(test)]
mod tests {
    use super::truncate_to_max;
    use crate::sync::observer::SyncObserver;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CountingObserver {
        truncations: Mutex<Vec<(&'static str, usize, usize)>>,
    }

    impl SyncObserver for CountingObserver {
        fn field_truncated(
            &self,
            _entity: &'static str,
            field: &'static str,
            original_len: usize,
            max_len: usize,
        ) {
            self.truncations
                .lock()
                .expect("observer lock should not be poisoned")
                .push((field, original_len, max_len));
        }

        fn nested_resolved(&self, _entity: &'static str, _field: &'static str, _ac: &str) {}

        fn entity_persisted(&self, _entity: &'static str, _ac: &str) {}
    }

    #[test]
    fn truncate_keeps_values_within_bounds_untouched() {
        let observer = CountingObserver::default();
        let mut value = "abcd".to_string();
        truncate_to_max(&mut value, 4, "alias", "name", &observer);
        assert_eq!(value, "abcd");
        assert!(observer
            .truncations
            .lock()
            .expect("observer lock should not be poisoned")
            .is_empty());
    }

    #[test]
    fn truncate_cuts_to_exact_max_and_reports_once() {
        let observer = CountingObserver::default();
        let mut value = "abcde".to_string();
        truncate_to_max(&mut value, 4, "alias", "name", &observer);
        assert_eq!(value, "abcd");

        let recorded = observer
            .truncations
            .lock()
            .expect("observer lock should not be poisoned")
            .clone();
        assert_eq!(recorded, vec![("name", 5, 4)]);
    }

    #[test]
    fn truncate_counts_characters_not_bytes() {
        let observer = CountingObserver::default();
        let mut value = "αβγδε".to_string();
        truncate_to_max(&mut value, 3, "alias", "name", &observer);
        assert_eq!(value, "αβγ");
    }
}
