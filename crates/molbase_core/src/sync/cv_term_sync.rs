//! Controlled-vocabulary term synchronizer.
//!
//! # Responsibility
//! - Find-or-create ontology terms by business key (MI identifier, else
//!   normalized short name).
//! - Serve as the nested-reference resolver for every other synchronizer.
//!
//! # Invariants
//! - At most one `cv_terms` row per business key after a successful pass.
//! - The session cache is write-once per key and maps source identity to
//!   the persisted instance.
//! - Finder, cache key and write path share one short-name normalization
//!   (trim, cut to the stored length, ASCII case fold).

use crate::model::cv_term::{CvTerm, MAX_FULL_NAME_LEN, MAX_SHORT_NAME_LEN};
use crate::sync::observer::SyncObserver;
use crate::sync::{
    load_audit, new_ac, truncate_opt_to_max, truncate_to_max, EntitySynchronizer, SyncError,
    SyncResult,
};
use log::debug;
use rusqlite::{params, Connection, Row};
use std::collections::HashMap;
use std::sync::Arc;

const ENTITY: &str = "cv_term";

const TERM_SELECT_SQL: &str = "SELECT
    ac,
    short_name,
    full_name,
    mi_identifier,
    created_at,
    updated_at
FROM cv_terms";

/// Synchronizer for [`CvTerm`] records.
pub struct CvTermSynchronizer<'conn> {
    conn: &'conn Connection,
    cache: HashMap<String, CvTerm>,
    observer: Arc<dyn SyncObserver>,
}

impl<'conn> CvTermSynchronizer<'conn> {
    pub fn new(conn: &'conn Connection, observer: Arc<dyn SyncObserver>) -> Self {
        Self {
            conn,
            cache: HashMap::new(),
            observer,
        }
    }

    /// Resolves a nested term on behalf of a parent synchronizer.
    ///
    /// The returned term is always persisted. When the term has no
    /// persisted counterpart and persistence is not allowed, the parent's
    /// synchronization is aborted with a contract violation: a parent row
    /// must never point at a transient term.
    pub fn resolve_for(
        &mut self,
        term: &CvTerm,
        persist_allowed: bool,
        parent_entity: &'static str,
        parent_field: &'static str,
    ) -> SyncResult<CvTerm> {
        match self.synchronize(term, persist_allowed)? {
            Some(resolved) => {
                if let Some(ac) = &resolved.ac {
                    self.observer.nested_resolved(parent_entity, parent_field, ac);
                }
                Ok(resolved)
            }
            None => Err(SyncError::synchronizer(
                parent_entity,
                format!(
                    "nested cv term `{}` for {parent_field} has no persisted \
                     counterpart and persistence is not allowed",
                    term.short_name
                ),
            )),
        }
    }

    fn find_row(&self, sql: &str, key: &str) -> SyncResult<Option<CvTerm>> {
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|err| SyncError::finder(ENTITY, err))?;
        let mut rows = stmt
            .query([key])
            .map_err(|err| SyncError::finder(ENTITY, err))?;

        match rows.next().map_err(|err| SyncError::finder(ENTITY, err))? {
            Some(row) => Ok(Some(
                parse_term_row(row).map_err(|err| SyncError::finder(ENTITY, err))?,
            )),
            None => Ok(None),
        }
    }
}

impl EntitySynchronizer for CvTermSynchronizer<'_> {
    type Entity = CvTerm;

    fn entity_kind(&self) -> &'static str {
        ENTITY
    }

    fn identity_key(&self, transient: &CvTerm) -> Option<String> {
        Some(transient.identity_key())
    }

    fn cache_lookup(&self, key: &str) -> Option<CvTerm> {
        self.cache.get(key).cloned()
    }

    fn cache_store(&mut self, key: String, persisted: CvTerm) {
        self.cache.entry(key).or_insert(persisted);
    }

    fn clear_cache(&mut self) {
        debug!(
            "event=sync_cache_cleared module=sync entity={ENTITY} entries={}",
            self.cache.len()
        );
        self.cache.clear();
    }

    fn find(&mut self, transient: &CvTerm) -> SyncResult<Option<CvTerm>> {
        if let Some(ac) = &transient.ac {
            return self.find_row(&format!("{TERM_SELECT_SQL} WHERE ac = ?1;"), ac);
        }
        if let Some(mi) = &transient.mi_identifier {
            return self.find_row(&format!("{TERM_SELECT_SQL} WHERE mi_identifier = ?1;"), mi);
        }
        // Bind the stored form of the name so over-length or padded
        // transients still match their own persisted row.
        self.find_row(
            &format!(
                "{TERM_SELECT_SQL}
                 WHERE lower(short_name) = ?1
                 ORDER BY ac
                 LIMIT 1;"
            ),
            &transient.normalized_short_name(),
        )
    }

    fn instantiate(&self, transient: &CvTerm) -> SyncResult<CvTerm> {
        Ok(CvTerm {
            ac: None,
            short_name: transient.short_name.clone(),
            full_name: transient.full_name.clone(),
            mi_identifier: transient.mi_identifier.clone(),
            created_at: None,
            updated_at: None,
        })
    }

    fn merge(&self, transient: &CvTerm, persisted: &CvTerm) -> SyncResult<CvTerm> {
        Ok(CvTerm {
            ac: persisted.ac.clone(),
            created_at: persisted.created_at,
            updated_at: persisted.updated_at,
            ..transient.clone()
        })
    }

    fn synchronize_properties(
        &mut self,
        candidate: &mut CvTerm,
        _persist_allowed: bool,
    ) -> SyncResult<()> {
        candidate
            .validate()
            .map_err(|err| SyncError::synchronizer(ENTITY, err.to_string()))?;

        // Trim before the length cut so the stored value matches the
        // business-key normalization.
        candidate.short_name = candidate.short_name.trim().to_string();
        truncate_to_max(
            &mut candidate.short_name,
            MAX_SHORT_NAME_LEN,
            ENTITY,
            "short_name",
            self.observer.as_ref(),
        );
        truncate_opt_to_max(
            &mut candidate.full_name,
            MAX_FULL_NAME_LEN,
            ENTITY,
            "full_name",
            self.observer.as_ref(),
        );
        Ok(())
    }

    fn insert(&mut self, candidate: &mut CvTerm) -> SyncResult<()> {
        let ac = new_ac();
        self.conn
            .execute(
                "INSERT INTO cv_terms (ac, short_name, full_name, mi_identifier)
                 VALUES (?1, ?2, ?3, ?4);",
                params![
                    ac,
                    candidate.short_name,
                    candidate.full_name.as_deref(),
                    candidate.mi_identifier.as_deref(),
                ],
            )
            .map_err(|err| SyncError::persister(ENTITY, err))?;

        let (created_at, updated_at) = load_audit(self.conn, "cv_terms", &ac, ENTITY)?;
        candidate.created_at = Some(created_at);
        candidate.updated_at = Some(updated_at);
        self.observer.entity_persisted(ENTITY, &ac);
        candidate.ac = Some(ac);
        Ok(())
    }

    fn update(&mut self, candidate: &CvTerm) -> SyncResult<()> {
        let ac = candidate
            .ac
            .as_deref()
            .ok_or_else(|| SyncError::synchronizer(ENTITY, "update requires a persisted ac"))?;

        let changed = self
            .conn
            .execute(
                "UPDATE cv_terms
                 SET
                    short_name = ?1,
                    full_name = ?2,
                    mi_identifier = ?3,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE ac = ?4;",
                params![
                    candidate.short_name,
                    candidate.full_name.as_deref(),
                    candidate.mi_identifier.as_deref(),
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

/// Loads one term by accession for nested-reference reconstruction.
///
/// A missing row is a contract violation: the referencing column is a
/// foreign key, so the row must exist.
pub(crate) fn fetch_term_by_ac(
    conn: &Connection,
    ac: &str,
    entity: &'static str,
) -> SyncResult<CvTerm> {
    let mut stmt = conn
        .prepare(&format!("{TERM_SELECT_SQL} WHERE ac = ?1;"))
        .map_err(|err| SyncError::finder(entity, err))?;
    let mut rows = stmt
        .query([ac])
        .map_err(|err| SyncError::finder(entity, err))?;

    match rows.next().map_err(|err| SyncError::finder(entity, err))? {
        Some(row) => parse_term_row(row).map_err(|err| SyncError::finder(entity, err)),
        None => Err(SyncError::synchronizer(
            entity,
            format!("referenced cv term `{ac}` does not exist"),
        )),
    }
}

fn parse_term_row(row: &Row<'_>) -> rusqlite::Result<CvTerm> {
    Ok(CvTerm {
        ac: Some(row.get("ac")?),
        short_name: row.get("short_name")?,
        full_name: row.get("full_name")?,
        mi_identifier: row.get("mi_identifier")?,
        created_at: Some(row.get("created_at")?),
        updated_at: Some(row.get("updated_at")?),
    })
}
