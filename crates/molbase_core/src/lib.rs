//! Object-relational synchronization core for a molecular-interaction
//! database.
//!
//! Given an in-memory alias, cross-reference or user preference, the
//! synchronizers find or create the persisted counterpart, normalize its
//! fields and resolve nested controlled-vocabulary terms first so
//! foreign-key order is always satisfied.

pub mod db;
pub mod logging;
pub mod model;
pub mod sync;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::alias::{Alias, MAX_ALIAS_NAME_LEN};
pub use model::cv_term::{CvTerm, MAX_FULL_NAME_LEN, MAX_SHORT_NAME_LEN};
pub use model::preference::{Preference, MAX_PREFERENCE_KEY_LEN, MAX_PREFERENCE_VALUE_LEN};
pub use model::xref::{Xref, XrefScope, MAX_XREF_ID_LEN, MAX_XREF_VERSION_LEN};
pub use model::ValidationError;
pub use sync::alias_sync::AliasSynchronizer;
pub use sync::cv_term_sync::CvTermSynchronizer;
pub use sync::observer::{LogObserver, SyncObserver};
pub use sync::preference_sync::PreferenceSynchronizer;
pub use sync::session::SyncSession;
pub use sync::xref_sync::XrefSynchronizer;
pub use sync::{EntitySynchronizer, SyncError, SyncResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
