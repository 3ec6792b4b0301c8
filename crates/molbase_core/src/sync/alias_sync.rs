//! Interactor alias synchronizer.
//!
//! # Responsibility
//! - Persist alias records, resolving the optional type term first.
//!
//! # Invariants
//! - Aliases carry no business key: the finder always reports not-found and
//!   every allowed pass appends a fresh row. Repeated synchronization of
//!   equal inputs is deliberately not collapsed.
//! - `name` is truncated to `MAX_ALIAS_NAME_LEN` characters before insert.

use crate::model::alias::{Alias, MAX_ALIAS_NAME_LEN};
use crate::sync::cv_term_sync::CvTermSynchronizer;
use crate::sync::observer::SyncObserver;
use crate::sync::{load_audit, new_ac, truncate_to_max, EntitySynchronizer, SyncError, SyncResult};
use rusqlite::{params, Connection};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

const ENTITY: &str = "alias";

/// Synchronizer for [`Alias`] records.
pub struct AliasSynchronizer<'conn> {
    conn: &'conn Connection,
    cv_terms: Rc<RefCell<CvTermSynchronizer<'conn>>>,
    observer: Arc<dyn SyncObserver>,
}

impl<'conn> AliasSynchronizer<'conn> {
    pub fn new(conn: &'conn Connection, observer: Arc<dyn SyncObserver>) -> Self {
        let cv_terms = Rc::new(RefCell::new(CvTermSynchronizer::new(conn, observer.clone())));
        Self::with_cv_terms(conn, cv_terms, observer)
    }

    /// Builds a synchronizer on top of an existing term synchronizer, so
    /// one session-wide cache serves every nested resolution.
    pub fn with_cv_terms(
        conn: &'conn Connection,
        cv_terms: Rc<RefCell<CvTermSynchronizer<'conn>>>,
        observer: Arc<dyn SyncObserver>,
    ) -> Self {
        Self {
            conn,
            cv_terms,
            observer,
        }
    }
}

impl EntitySynchronizer for AliasSynchronizer<'_> {
    type Entity = Alias;

    fn entity_kind(&self) -> &'static str {
        ENTITY
    }

    fn identity_key(&self, _transient: &Alias) -> Option<String> {
        None
    }

    fn clear_cache(&mut self) {
        self.cv_terms.borrow_mut().clear_cache();
    }

    /// Aliases have no stable business key, so there is nothing to find.
    fn find(&mut self, _transient: &Alias) -> SyncResult<Option<Alias>> {
        Ok(None)
    }

    fn instantiate(&self, transient: &Alias) -> SyncResult<Alias> {
        Ok(Alias {
            ac: None,
            alias_type: transient.alias_type.clone(),
            name: transient.name.clone(),
            created_at: None,
            updated_at: None,
        })
    }

    fn merge(&self, transient: &Alias, persisted: &Alias) -> SyncResult<Alias> {
        Ok(Alias {
            ac: persisted.ac.clone(),
            created_at: persisted.created_at,
            updated_at: persisted.updated_at,
            ..transient.clone()
        })
    }

    fn synchronize_properties(
        &mut self,
        candidate: &mut Alias,
        persist_allowed: bool,
    ) -> SyncResult<()> {
        candidate
            .validate()
            .map_err(|err| SyncError::synchronizer(ENTITY, err.to_string()))?;

        if let Some(alias_type) = &candidate.alias_type {
            let resolved = self.cv_terms.borrow_mut().resolve_for(
                alias_type,
                persist_allowed,
                ENTITY,
                "alias_type",
            )?;
            candidate.alias_type = Some(resolved);
        }

        truncate_to_max(
            &mut candidate.name,
            MAX_ALIAS_NAME_LEN,
            ENTITY,
            "name",
            self.observer.as_ref(),
        );
        Ok(())
    }

    fn insert(&mut self, candidate: &mut Alias) -> SyncResult<()> {
        let type_ac = match &candidate.alias_type {
            Some(alias_type) => Some(alias_type.ac.as_deref().ok_or_else(|| {
                SyncError::synchronizer(ENTITY, "alias_type must be persisted before insert")
            })?),
            None => None,
        };

        let ac = new_ac();
        self.conn
            .execute(
                "INSERT INTO aliases (ac, type_ac, name) VALUES (?1, ?2, ?3);",
                params![ac, type_ac, candidate.name],
            )
            .map_err(|err| SyncError::persister(ENTITY, err))?;

        let (created_at, updated_at) = load_audit(self.conn, "aliases", &ac, ENTITY)?;
        candidate.created_at = Some(created_at);
        candidate.updated_at = Some(updated_at);
        self.observer.entity_persisted(ENTITY, &ac);
        candidate.ac = Some(ac);
        Ok(())
    }

    fn update(&mut self, candidate: &Alias) -> SyncResult<()> {
        let ac = candidate
            .ac
            .as_deref()
            .ok_or_else(|| SyncError::synchronizer(ENTITY, "update requires a persisted ac"))?;
        let type_ac = candidate
            .alias_type
            .as_ref()
            .and_then(|alias_type| alias_type.ac.as_deref());

        let changed = self
            .conn
            .execute(
                "UPDATE aliases
                 SET
                    type_ac = ?1,
                    name = ?2,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE ac = ?3;",
                params![type_ac, candidate.name, ac],
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
