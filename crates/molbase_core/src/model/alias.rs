//! Interactor alias model.
//!
//! # Responsibility
//! - Define the alias shape: an optional type term plus a name.
//!
//! # Invariants
//! - Aliases have no business key; every synchronization pass appends a
//!   fresh row. Duplicate names are legitimate history, not corruption.

use crate::model::cv_term::CvTerm;
use crate::model::{require_non_empty, ValidationError};
use serde::{Deserialize, Serialize};

/// Maximum stored length of `name`, in characters.
pub const MAX_ALIAS_NAME_LEN: usize = 4000;

/// An alternative name attached to an interactor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alias {
    /// Storage-assigned accession. `None` until persisted.
    pub ac: Option<String>,
    /// Nested type term (e.g. "gene name"). Nullable by schema design.
    pub alias_type: Option<CvTerm>,
    /// The alias text itself.
    pub name: String,
    /// Creation time in epoch milliseconds, owned by storage.
    pub created_at: Option<i64>,
    /// Last update time in epoch milliseconds, owned by storage.
    pub updated_at: Option<i64>,
}

impl Alias {
    /// Creates a transient alias without a type term.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            ac: None,
            alias_type: None,
            name: name.into(),
            created_at: None,
            updated_at: None,
        }
    }

    /// Creates a transient alias with a type term.
    pub fn with_type(alias_type: CvTerm, name: impl Into<String>) -> Self {
        Self {
            alias_type: Some(alias_type),
            ..Self::new(name)
        }
    }

    /// Checks required fields.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty(&self.name, "alias", "name")?;
        if let Some(alias_type) = &self.alias_type {
            alias_type.validate()?;
        }
        Ok(())
    }
}
