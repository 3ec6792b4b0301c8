//! User preference synchronizer.
//!
//! # Responsibility
//! - Persist per-user key/value records.
//!
//! # Invariants
//! - Preferences carry no business key: the finder always reports not-found
//!   and every allowed pass appends a fresh row, keeping older values as
//!   history.

use crate::model::preference::{Preference, MAX_PREFERENCE_KEY_LEN, MAX_PREFERENCE_VALUE_LEN};
use crate::sync::observer::SyncObserver;
use crate::sync::{
    load_audit, new_ac, truncate_opt_to_max, truncate_to_max, EntitySynchronizer, SyncError,
    SyncResult,
};
use rusqlite::{params, Connection};
use std::sync::Arc;

const ENTITY: &str = "preference";

/// Synchronizer for [`Preference`] records.
pub struct PreferenceSynchronizer<'conn> {
    conn: &'conn Connection,
    observer: Arc<dyn SyncObserver>,
}

impl<'conn> PreferenceSynchronizer<'conn> {
    pub fn new(conn: &'conn Connection, observer: Arc<dyn SyncObserver>) -> Self {
        Self { conn, observer }
    }
}

impl EntitySynchronizer for PreferenceSynchronizer<'_> {
    type Entity = Preference;

    fn entity_kind(&self) -> &'static str {
        ENTITY
    }

    fn identity_key(&self, _transient: &Preference) -> Option<String> {
        None
    }

    /// Preferences have no stable business key, so there is nothing to find.
    fn find(&mut self, _transient: &Preference) -> SyncResult<Option<Preference>> {
        Ok(None)
    }

    fn instantiate(&self, transient: &Preference) -> SyncResult<Preference> {
        Ok(Preference {
            ac: None,
            user_login: transient.user_login.clone(),
            key: transient.key.clone(),
            value: transient.value.clone(),
            created_at: None,
            updated_at: None,
        })
    }

    fn merge(&self, transient: &Preference, persisted: &Preference) -> SyncResult<Preference> {
        Ok(Preference {
            ac: persisted.ac.clone(),
            created_at: persisted.created_at,
            updated_at: persisted.updated_at,
            ..transient.clone()
        })
    }

    fn synchronize_properties(
        &mut self,
        candidate: &mut Preference,
        _persist_allowed: bool,
    ) -> SyncResult<()> {
        candidate
            .validate()
            .map_err(|err| SyncError::synchronizer(ENTITY, err.to_string()))?;

        truncate_to_max(
            &mut candidate.user_login,
            MAX_PREFERENCE_KEY_LEN,
            ENTITY,
            "user_login",
            self.observer.as_ref(),
        );
        truncate_to_max(
            &mut candidate.key,
            MAX_PREFERENCE_KEY_LEN,
            ENTITY,
            "key",
            self.observer.as_ref(),
        );
        truncate_opt_to_max(
            &mut candidate.value,
            MAX_PREFERENCE_VALUE_LEN,
            ENTITY,
            "value",
            self.observer.as_ref(),
        );
        Ok(())
    }

    fn insert(&mut self, candidate: &mut Preference) -> SyncResult<()> {
        let ac = new_ac();
        self.conn
            .execute(
                "INSERT INTO preferences (ac, user_login, pref_key, pref_value)
                 VALUES (?1, ?2, ?3, ?4);",
                params![
                    ac,
                    candidate.user_login,
                    candidate.key,
                    candidate.value.as_deref(),
                ],
            )
            .map_err(|err| SyncError::persister(ENTITY, err))?;

        let (created_at, updated_at) = load_audit(self.conn, "preferences", &ac, ENTITY)?;
        candidate.created_at = Some(created_at);
        candidate.updated_at = Some(updated_at);
        self.observer.entity_persisted(ENTITY, &ac);
        candidate.ac = Some(ac);
        Ok(())
    }

    fn update(&mut self, candidate: &Preference) -> SyncResult<()> {
        let ac = candidate
            .ac
            .as_deref()
            .ok_or_else(|| SyncError::synchronizer(ENTITY, "update requires a persisted ac"))?;

        let changed = self
            .conn
            .execute(
                "UPDATE preferences
                 SET
                    user_login = ?1,
                    pref_key = ?2,
                    pref_value = ?3,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE ac = ?4;",
                params![
                    candidate.user_login,
                    candidate.key,
                    candidate.value.as_deref(),
                    ac,
                ],
            )
            .map_err(|err| SyncError::persister(ENTITY, err))?;

        if changed == 0 {
            return Err(SyncError::synchronizer(
                ENTITY,
                format!("persisted row `{ac}` disappeared during synchronization"),
            ));
        }
        Ok(())
    }
}
