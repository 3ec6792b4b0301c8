//! Cross-reference model.
//!
//! # Responsibility
//! - Define the xref shape: a database term, an external identifier and
//!   optional qualifier metadata.
//! - Model the evidence-scoped flavor as an explicit variant instead of a
//!   runtime subtype check.
//!
//! # Invariants
//! - `database` is a required nested reference and must be persisted before
//!   the xref row is inserted.
//! - Only `XrefScope::Evidence` carries an evidence type term.

use crate::model::cv_term::CvTerm;
use crate::model::{require_non_empty, ValidationError};
use serde::{Deserialize, Serialize};

/// Maximum stored length of `primary_id` and `secondary_id`, in characters.
pub const MAX_XREF_ID_LEN: usize = 4000;
/// Maximum stored length of `version`, in characters.
pub const MAX_XREF_VERSION_LEN: usize = 255;

/// Cross-reference flavor.
///
/// Evidence-scoped xrefs carry an extra evidence type term; plain xrefs
/// never do. The variant is part of the record identity on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "scope")]
pub enum XrefScope {
    /// Ordinary cross-reference.
    Plain,
    /// Cross-reference attached to experimental evidence.
    Evidence {
        /// Optional term describing how the evidence was obtained.
        evidence_type: Option<CvTerm>,
    },
}

/// A reference into an external database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Xref {
    /// Storage-assigned accession. `None` until persisted.
    pub ac: Option<String>,
    /// Nested database term (e.g. "uniprotkb"). Required.
    pub database: CvTerm,
    /// Identifier within the external database.
    pub primary_id: String,
    /// Optional secondary identifier.
    pub secondary_id: Option<String>,
    /// Optional database release/version tag.
    pub version: Option<String>,
    /// Nested qualifier term (e.g. "identity"). Nullable.
    pub qualifier: Option<CvTerm>,
    /// Plain or evidence-scoped flavor.
    pub scope: XrefScope,
    /// Creation time in epoch milliseconds, owned by storage.
    pub created_at: Option<i64>,
    /// Last update time in epoch milliseconds, owned by storage.
    pub updated_at: Option<i64>,
}

impl Xref {
    /// Creates a transient plain xref.
    pub fn new(database: CvTerm, primary_id: impl Into<String>) -> Self {
        Self {
            ac: None,
            database,
            primary_id: primary_id.into(),
            secondary_id: None,
            version: None,
            qualifier: None,
            scope: XrefScope::Plain,
            created_at: None,
            updated_at: None,
        }
    }

    /// Creates a transient evidence-scoped xref.
    pub fn evidence(
        database: CvTerm,
        primary_id: impl Into<String>,
        evidence_type: Option<CvTerm>,
    ) -> Self {
        Self {
            scope: XrefScope::Evidence { evidence_type },
            ..Self::new(database, primary_id)
        }
    }

    /// Checks required fields and all nested terms.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty(&self.primary_id, "xref", "primary_id")?;
        self.database.validate()?;
        if let Some(qualifier) = &self.qualifier {
            qualifier.validate()?;
        }
        if let XrefScope::Evidence {
            evidence_type: Some(evidence_type),
        } = &self.scope
        {
            evidence_type.validate()?;
        }
        Ok(())
    }

    /// Returns the evidence type term, when this xref is evidence-scoped.
    pub fn evidence_type(&self) -> Option<&CvTerm> {
        match &self.scope {
            XrefScope::Evidence { evidence_type } => evidence_type.as_ref(),
            XrefScope::Plain => None,
        }
    }
}
