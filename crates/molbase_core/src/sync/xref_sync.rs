//! Cross-reference synchronizer.
//!
//! # Responsibility
//! - Find-or-create xref records by composite business key (persisted
//!   database term + primary id + qualifier + scope).
//! - Resolve database, qualifier and evidence-type terms before persisting.
//!
//! # Invariants
//! - A lookup matches only when every key part matches, including an absent
//!   qualifier; partial overlap is never a match.
//! - Only evidence-scoped xrefs carry an evidence type column value.

use crate::model::cv_term::CvTerm;
use crate::model::xref::{Xref, XrefScope, MAX_XREF_ID_LEN, MAX_XREF_VERSION_LEN};
use crate::sync::cv_term_sync::{fetch_term_by_ac, CvTermSynchronizer};
use crate::sync::observer::SyncObserver;
use crate::sync::{
    load_audit, new_ac, truncate_opt_to_max, truncate_to_max, EntitySynchronizer, SyncError,
    SyncResult,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

const ENTITY: &str = "xref";

const XREF_SELECT_SQL: &str = "SELECT
    ac,
    database_ac,
    primary_id,
    secondary_id,
    version,
    qualifier_ac,
    scope,
    evidence_type_ac,
    created_at,
    updated_at
FROM xrefs";

/// Synchronizer for [`Xref`] records.
pub struct XrefSynchronizer<'conn> {
    conn: &'conn Connection,
    cv_terms: Rc<RefCell<CvTermSynchronizer<'conn>>>,
    observer: Arc<dyn SyncObserver>,
}

impl<'conn> XrefSynchronizer<'conn> {
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

    fn parse_xref_row(&self, row: &Row<'_>) -> SyncResult<Xref> {
        let database_ac: String = row
            .get("database_ac")
            .map_err(|err| SyncError::finder(ENTITY, err))?;
        let qualifier_ac: Option<String> = row
            .get("qualifier_ac")
            .map_err(|err| SyncError::finder(ENTITY, err))?;
        let scope_tag: String = row
            .get("scope")
            .map_err(|err| SyncError::finder(ENTITY, err))?;
        let evidence_type_ac: Option<String> = row
            .get("evidence_type_ac")
            .map_err(|err| SyncError::finder(ENTITY, err))?;

        let database = fetch_term_by_ac(self.conn, &database_ac, ENTITY)?;
        let qualifier = match qualifier_ac {
            Some(ac) => Some(fetch_term_by_ac(self.conn, &ac, ENTITY)?),
            None => None,
        };
        let scope = parse_scope(&scope_tag, evidence_type_ac.as_deref(), self.conn)?;

        let read = |column: &str| -> SyncResult<Option<String>> {
            row.get(column).map_err(|err| SyncError::finder(ENTITY, err))
        };

        Ok(Xref {
            ac: Some(
                row.get("ac")
                    .map_err(|err| SyncError::finder(ENTITY, err))?,
            ),
            database,
            primary_id: row
                .get("primary_id")
                .map_err(|err| SyncError::finder(ENTITY, err))?,
            secondary_id: read("secondary_id")?,
            version: read("version")?,
            qualifier,
            scope,
            created_at: Some(
                row.get("created_at")
                    .map_err(|err| SyncError::finder(ENTITY, err))?,
            ),
            updated_at: Some(
                row.get("updated_at")
                    .map_err(|err| SyncError::finder(ENTITY, err))?,
            ),
        })
    }
}

impl EntitySynchronizer for XrefSynchronizer<'_> {
    type Entity = Xref;

    fn entity_kind(&self) -> &'static str {
        ENTITY
    }

    fn identity_key(&self, _transient: &Xref) -> Option<String> {
        None
    }

    fn clear_cache(&mut self) {
        self.cv_terms.borrow_mut().clear_cache();
    }

    /// Composite-key lookup.
    ///
    /// If the database term (or a supplied qualifier term) has no persisted
    /// counterpart yet, no xref row can reference it, so the result is an
    /// explicit not-found rather than a guess.
    fn find(&mut self, transient: &Xref) -> SyncResult<Option<Xref>> {
        let Some(database) = self.cv_terms.borrow_mut().find(&transient.database)? else {
            return Ok(None);
        };
        let database_ac = database.ac.ok_or_else(|| {
            SyncError::synchronizer(ENTITY, "found database term is missing its ac")
        })?;

        let qualifier_ac = match &transient.qualifier {
            None => None,
            Some(qualifier) => match self.cv_terms.borrow_mut().find(qualifier)? {
                Some(found) => found.ac,
                None => return Ok(None),
            },
        };

        // Bind the stored form of the id so over-length transients match
        // the truncated row.
        let primary_id: String = transient
            .primary_id
            .chars()
            .take(MAX_XREF_ID_LEN)
            .collect();

        let mut sql = format!(
            "{XREF_SELECT_SQL}
             WHERE database_ac = ?
               AND primary_id = ?
               AND scope = ?"
        );
        let mut bind_values: Vec<Value> = vec![
            Value::Text(database_ac),
            Value::Text(primary_id),
            Value::Text(scope_to_db(&transient.scope).to_string()),
        ];

        match qualifier_ac {
            Some(ac) => {
                sql.push_str(" AND qualifier_ac = ?");
                bind_values.push(Value::Text(ac));
            }
            None => sql.push_str(" AND qualifier_ac IS NULL"),
        }
        sql.push_str(" ORDER BY ac LIMIT 1;");

        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|err| SyncError::finder(ENTITY, err))?;
        let mut rows = stmt
            .query(params_from_iter(bind_values))
            .map_err(|err| SyncError::finder(ENTITY, err))?;

        match rows.next().map_err(|err| SyncError::finder(ENTITY, err))? {
            Some(row) => Ok(Some(self.parse_xref_row(row)?)),
            None => Ok(None),
        }
    }

    fn instantiate(&self, transient: &Xref) -> SyncResult<Xref> {
        Ok(Xref {
            ac: None,
            database: transient.database.clone(),
            primary_id: transient.primary_id.clone(),
            secondary_id: transient.secondary_id.clone(),
            version: transient.version.clone(),
            qualifier: transient.qualifier.clone(),
            scope: transient.scope.clone(),
            created_at: None,
            updated_at: None,
        })
    }

    fn merge(&self, transient: &Xref, persisted: &Xref) -> SyncResult<Xref> {
        Ok(Xref {
            ac: persisted.ac.clone(),
            created_at: persisted.created_at,
            updated_at: persisted.updated_at,
            ..transient.clone()
        })
    }

    fn synchronize_properties(
        &mut self,
        candidate: &mut Xref,
        persist_allowed: bool,
    ) -> SyncResult<()> {
        candidate
            .validate()
            .map_err(|err| SyncError::synchronizer(ENTITY, err.to_string()))?;

        let resolved = self.cv_terms.borrow_mut().resolve_for(
            &candidate.database,
            persist_allowed,
            ENTITY,
            "database",
        )?;
        candidate.database = resolved;

        if let Some(qualifier) = &candidate.qualifier {
            let resolved = self.cv_terms.borrow_mut().resolve_for(
                qualifier,
                persist_allowed,
                ENTITY,
                "qualifier",
            )?;
            candidate.qualifier = Some(resolved);
        }

        // Extra nested field only on the evidence-scoped variant.
        if let XrefScope::Evidence {
            evidence_type: Some(evidence_type),
        } = &candidate.scope
        {
            let resolved = self.cv_terms.borrow_mut().resolve_for(
                evidence_type,
                persist_allowed,
                ENTITY,
                "evidence_type",
            )?;
            candidate.scope = XrefScope::Evidence {
                evidence_type: Some(resolved),
            };
        }

        truncate_to_max(
            &mut candidate.primary_id,
            MAX_XREF_ID_LEN,
            ENTITY,
            "primary_id",
            self.observer.as_ref(),
        );
        truncate_opt_to_max(
            &mut candidate.secondary_id,
            MAX_XREF_ID_LEN,
            ENTITY,
            "secondary_id",
            self.observer.as_ref(),
        );
        truncate_opt_to_max(
            &mut candidate.version,
            MAX_XREF_VERSION_LEN,
            ENTITY,
            "version",
            self.observer.as_ref(),
        );
        Ok(())
    }

    fn insert(&mut self, candidate: &mut Xref) -> SyncResult<()> {
        let database_ac = candidate.database.ac.as_deref().ok_or_else(|| {
            SyncError::synchronizer(ENTITY, "database must be persisted before insert")
        })?;
        let qualifier_ac = persisted_ac(candidate.qualifier.as_ref(), "qualifier")?;
        let (scope_tag, evidence_type_ac) = scope_columns(&candidate.scope)?;

        let ac = new_ac();
        self.conn
            .execute(
                "INSERT INTO xrefs (
                    ac,
                    database_ac,
                    primary_id,
                    secondary_id,
                    version,
                    qualifier_ac,
                    scope,
                    evidence_type_ac
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
                params![
                    ac,
                    database_ac,
                    candidate.primary_id,
                    candidate.secondary_id.as_deref(),
                    candidate.version.as_deref(),
                    qualifier_ac,
                    scope_tag,
                    evidence_type_ac,
                ],
            )
            .map_err(|err| SyncError::persister(ENTITY, err))?;

        let (created_at, updated_at) = load_audit(self.conn, "xrefs", &ac, ENTITY)?;
        candidate.created_at = Some(created_at);
        candidate.updated_at = Some(updated_at);
        self.observer.entity_persisted(ENTITY, &ac);
        candidate.ac = Some(ac);
        Ok(())
    }

    fn update(&mut self, candidate: &Xref) -> SyncResult<()> {
        let ac = candidate
            .ac
            .as_deref()
            .ok_or_else(|| SyncError::synchronizer(ENTITY, "update requires a persisted ac"))?;
        let database_ac = candidate.database.ac.as_deref().ok_or_else(|| {
            SyncError::synchronizer(ENTITY, "database must be persisted before update")
        })?;
        let qualifier_ac = persisted_ac(candidate.qualifier.as_ref(), "qualifier")?;
        let (scope_tag, evidence_type_ac) = scope_columns(&candidate.scope)?;

        let changed = self
            .conn
            .execute(
                "UPDATE xrefs
                 SET
                    database_ac = ?1,
                    primary_id = ?2,
                    secondary_id = ?3,
                    version = ?4,
                    qualifier_ac = ?5,
                    scope = ?6,
                    evidence_type_ac = ?7,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE ac = ?8;",
                params![
                    database_ac,
                    candidate.primary_id,
                    candidate.secondary_id.as_deref(),
                    candidate.version.as_deref(),
                    qualifier_ac,
                    scope_tag,
                    evidence_type_ac,
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

fn persisted_ac<'a>(
    term: Option<&'a CvTerm>,
    field: &'static str,
) -> SyncResult<Option<&'a str>> {
    match term {
        None => Ok(None),
        Some(term) => match term.ac.as_deref() {
            Some(ac) => Ok(Some(ac)),
            None => Err(SyncError::synchronizer(
                ENTITY,
                format!("{field} must be persisted before write"),
            )),
        },
    }
}

fn scope_columns(scope: &XrefScope) -> SyncResult<(&'static str, Option<&str>)> {
    match scope {
        XrefScope::Plain => Ok(("plain", None)),
        XrefScope::Evidence { evidence_type } => Ok((
            "evidence",
            persisted_ac(evidence_type.as_ref(), "evidence_type")?,
        )),
    }
}

fn scope_to_db(scope: &XrefScope) -> &'static str {
    match scope {
        XrefScope::Plain => "plain",
        XrefScope::Evidence { .. } => "evidence",
    }
}

fn parse_scope(
    tag: &str,
    evidence_type_ac: Option<&str>,
    conn: &Connection,
) -> SyncResult<XrefScope> {
    match tag {
        "plain" => Ok(XrefScope::Plain),
        "evidence" => {
            let evidence_type = match evidence_type_ac {
                Some(ac) => Some(fetch_term_by_ac(conn, ac, ENTITY)?),
                None => None,
            };
            Ok(XrefScope::Evidence { evidence_type })
        }
        other => Err(SyncError::synchronizer(
            ENTITY,
            format!("invalid scope value `{other}` in xrefs.scope"),
        )),
    }
}
