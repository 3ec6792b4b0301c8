//! User preference model.
//!
//! # Responsibility
//! - Define per-user key/value records stored alongside the domain data.
//!
//! # Invariants
//! - Preferences have no business key; every synchronization pass appends a
//!   fresh row, keeping earlier values as history.

use crate::model::{require_non_empty, ValidationError};
use serde::{Deserialize, Serialize};

/// Maximum stored length of `user_login` and `key`, in characters.
pub const MAX_PREFERENCE_KEY_LEN: usize = 255;
/// Maximum stored length of `value`, in characters.
pub const MAX_PREFERENCE_VALUE_LEN: usize = 4000;

/// A key/value setting owned by one user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preference {
    /// Storage-assigned accession. `None` until persisted.
    pub ac: Option<String>,
    /// Login of the owning user.
    pub user_login: String,
    /// Setting name.
    pub key: String,
    /// Setting value. Nullable.
    pub value: Option<String>,
    /// Creation time in epoch milliseconds, owned by storage.
    pub created_at: Option<i64>,
    /// Last update time in epoch milliseconds, owned by storage.
    pub updated_at: Option<i64>,
}

impl Preference {
    /// Creates a transient preference.
    pub fn new(
        user_login: impl Into<String>,
        key: impl Into<String>,
        value: Option<String>,
    ) -> Self {
        Self {
            ac: None,
            user_login: user_login.into(),
            key: key.into(),
            value,
            created_at: None,
            updated_at: None,
        }
    }

    /// Checks required fields.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty(&self.user_login, "preference", "user_login")?;
        require_non_empty(&self.key, "preference", "key")?;
        Ok(())
    }
}
