//! Controlled-vocabulary term model.
//!
//! # Responsibility
//! - Define the canonical shape for ontology terms referenced by other
//!   records (alias types, xref databases/qualifiers, evidence types).
//! - Provide the business-key helpers used for find/dedup decisions.
//!
//! # Invariants
//! - `mi_identifier`, when present, matches `MI:NNNN`.
//! - The business key is the MI identifier when present, else the
//!   normalized short name (trimmed, cut to the stored length, ASCII
//!   case-folded).

use crate::model::{require_non_empty, ValidationError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Maximum stored length of `short_name`, in characters.
pub const MAX_SHORT_NAME_LEN: usize = 255;
/// Maximum stored length of `full_name`, in characters.
pub const MAX_FULL_NAME_LEN: usize = 4000;

static MI_IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^MI:\d{4}$").expect("MI identifier pattern must compile"));

/// A controlled-vocabulary term from the molecular-interaction ontology.
///
/// Terms are the leaf entities of the synchronization graph: every other
/// record that points at a term must have it persisted first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CvTerm {
    /// Storage-assigned accession. `None` until persisted.
    pub ac: Option<String>,
    /// Short label, unique per ontology namespace by convention.
    pub short_name: String,
    /// Optional human-readable name.
    pub full_name: Option<String>,
    /// PSI-MI ontology identifier, e.g. `MI:0302`.
    pub mi_identifier: Option<String>,
    /// Creation time in epoch milliseconds, owned by storage.
    pub created_at: Option<i64>,
    /// Last update time in epoch milliseconds, owned by storage.
    pub updated_at: Option<i64>,
}

impl CvTerm {
    /// Creates a transient term with only a short name.
    pub fn new(short_name: impl Into<String>) -> Self {
        Self {
            ac: None,
            short_name: short_name.into(),
            full_name: None,
            mi_identifier: None,
            created_at: None,
            updated_at: None,
        }
    }

    /// Creates a transient term carrying an MI identifier.
    pub fn with_mi(short_name: impl Into<String>, mi_identifier: impl Into<String>) -> Self {
        Self {
            mi_identifier: Some(mi_identifier.into()),
            ..Self::new(short_name)
        }
    }

    /// Checks required fields and MI identifier format.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty(&self.short_name, "cv_term", "short_name")?;
        if let Some(mi) = &self.mi_identifier {
            if !MI_IDENTIFIER_RE.is_match(mi) {
                return Err(ValidationError::InvalidMiIdentifier(mi.clone()));
            }
        }
        Ok(())
    }

    /// Stable dedup/lookup key for one synchronization session.
    ///
    /// Prefers the persisted accession, then the MI identifier, then the
    /// normalized short name.
    pub fn identity_key(&self) -> String {
        if let Some(ac) = &self.ac {
            return format!("ac:{ac}");
        }
        if let Some(mi) = &self.mi_identifier {
            return format!("mi:{mi}");
        }
        format!("short:{}", self.normalized_short_name())
    }

    /// Business-key form of the short name: trimmed, cut to the stored
    /// length and ASCII case-folded.
    ///
    /// This mirrors what the write path persists and what SQLite's
    /// `lower()` produces, so in-session (cache) and cross-session (finder)
    /// identity always agree.
    pub(crate) fn normalized_short_name(&self) -> String {
        self.short_name
            .trim()
            .chars()
            .take(MAX_SHORT_NAME_LEN)
            .collect::<String>()
            .to_ascii_lowercase()
    }

    /// Returns whether this value already has a persisted counterpart.
    pub fn is_persisted(&self) -> bool {
        self.ac.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::{CvTerm, MAX_SHORT_NAME_LEN};
    use crate::model::ValidationError;

    #[test]
    fn validate_accepts_well_formed_mi_identifier() {
        let term = CvTerm::with_mi("gene name", "MI:0301");
        term.validate().expect("well-formed term should validate");
    }

    #[test]
    fn validate_rejects_malformed_mi_identifier() {
        let term = CvTerm::with_mi("gene name", "MI:31");
        let err = term.validate().expect_err("short digits must be rejected");
        assert!(matches!(err, ValidationError::InvalidMiIdentifier(_)));

        let term = CvTerm::with_mi("gene name", "GO:0001");
        assert!(term.validate().is_err());
    }

    #[test]
    fn validate_rejects_blank_short_name() {
        let term = CvTerm::new("   ");
        let err = term.validate().expect_err("blank short name must fail");
        assert!(matches!(err, ValidationError::EmptyField { .. }));
    }

    #[test]
    fn identity_key_prefers_ac_then_mi_then_short_name() {
        let mut term = CvTerm::with_mi("Gene Name", "MI:0301");
        assert_eq!(term.identity_key(), "mi:MI:0301");

        term.ac = Some("MB-1".to_string());
        assert_eq!(term.identity_key(), "ac:MB-1");

        let plain = CvTerm::new("  Gene Name ");
        assert_eq!(plain.identity_key(), "short:gene name");
    }

    #[test]
    fn identity_key_uses_the_stored_short_name_form() {
        let over_length = CvTerm::new("n".repeat(MAX_SHORT_NAME_LEN + 10));
        let stored = CvTerm::new("n".repeat(MAX_SHORT_NAME_LEN));
        assert_eq!(over_length.identity_key(), stored.identity_key());
    }

    #[test]
    fn short_name_case_folding_is_ascii_only() {
        assert_eq!(
            CvTerm::new("SYN").identity_key(),
            CvTerm::new("syn").identity_key()
        );
        // Non-ASCII case variants stay distinct identities.
        assert_ne!(
            CvTerm::new("ΣYN").identity_key(),
            CvTerm::new("σyn").identity_key()
        );
    }

    #[test]
    fn serde_shape_is_stable() {
        let term = CvTerm::with_mi("gene name", "MI:0301");
        let json = serde_json::to_value(&term).expect("term should serialize");
        assert_eq!(json["short_name"], "gene name");
        assert_eq!(json["mi_identifier"], "MI:0301");
        assert!(json["ac"].is_null());
    }
}
