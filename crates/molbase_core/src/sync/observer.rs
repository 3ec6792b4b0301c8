//! Injected diagnostics hook for synchronization side reports.
//!
//! # Responsibility
//! - Report non-fatal normalization events (truncation) and persistence
//!   milestones without binding the synchronizers to a global logger.
//!
//! # Invariants
//! - Observer callbacks must not fail; they are fire-and-forget.

use log::{debug, warn};

/// Receives non-fatal synchronization events.
///
/// Production code installs [`LogObserver`]; tests install a recording fake
/// to assert truncation warnings and nested-before-parent ordering.
pub trait SyncObserver: Send + Sync {
    /// A string field exceeded its maximum length and was cut down.
    fn field_truncated(
        &self,
        entity: &'static str,
        field: &'static str,
        original_len: usize,
        max_len: usize,
    );

    /// A nested cv term was resolved to a persisted instance and attached
    /// to the parent candidate.
    fn nested_resolved(&self, entity: &'static str, field: &'static str, ac: &str);

    /// A row was inserted for the given entity.
    fn entity_persisted(&self, entity: &'static str, ac: &str);
}

/// Default observer emitting structured events through the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl SyncObserver for LogObserver {
    fn field_truncated(
        &self,
        entity: &'static str,
        field: &'static str,
        original_len: usize,
        max_len: usize,
    ) {
        warn!(
            "event=field_truncated module=sync entity={entity} field={field} \
             original_len={original_len} max_len={max_len}"
        );
    }

    fn nested_resolved(&self, entity: &'static str, field: &'static str, ac: &str) {
        debug!("event=nested_resolved module=sync entity={entity} field={field} ac={ac}");
    }

    fn entity_persisted(&self, entity: &'static str, ac: &str) {
        debug!("event=entity_persisted module=sync entity={entity} ac={ac}");
    }
}
