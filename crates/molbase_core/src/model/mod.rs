//! Domain model for molecular-interaction records.
//!
//! # Responsibility
//! - Define the transient/persistent shapes handled by the synchronizers.
//! - Own field-level validation rules shared by all write paths.
//!
//! # Invariants
//! - `ac` is `None` until a record is persisted, then stable forever.
//! - Audit timestamps (`created_at`, `updated_at`) are owned by storage.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod alias;
pub mod cv_term;
pub mod preference;
pub mod xref;

/// Validation error raised before any SQL mutation is attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required text field is empty or whitespace-only.
    EmptyField {
        entity: &'static str,
        field: &'static str,
    },
    /// An ontology identifier does not match the `MI:NNNN` format.
    InvalidMiIdentifier(String),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyField { entity, field } => {
                write!(f, "{entity}.{field} must not be empty")
            }
            Self::InvalidMiIdentifier(value) => {
                write!(f, "invalid MI identifier `{value}`; expected MI:NNNN")
            }
        }
    }
}

impl Error for ValidationError {}

pub(crate) fn require_non_empty(
    value: &str,
    entity: &'static str,
    field: &'static str,
) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyField { entity, field });
    }
    Ok(())
}
