//! Unit-of-work façade over the per-entity synchronizers.
//!
//! # Responsibility
//! - Bundle one synchronizer per entity kind over a single connection, so a
//!   caller resolves nested types through the same registry for the whole
//!   unit of work.
//! - Mark session end by clearing every dedup cache.
//!
//! # Invariants
//! - All synchronizers in one session share the same observer and one
//!   controlled-vocabulary term cache.
//! - Caches never survive `clear_caches`; a new unit of work starts fresh.

use crate::sync::alias_sync::AliasSynchronizer;
use crate::sync::cv_term_sync::CvTermSynchronizer;
use crate::sync::observer::{LogObserver, SyncObserver};
use crate::sync::preference_sync::PreferenceSynchronizer;
use crate::sync::xref_sync::XrefSynchronizer;
use crate::sync::EntitySynchronizer;
use log::debug;
use rusqlite::Connection;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

/// One synchronization session bound to one connection.
///
/// The session is single-threaded and synchronous: each `synchronize` call
/// runs to completion (including nested resolutions) before the next one
/// starts.
pub struct SyncSession<'conn> {
    /// Term synchronizer shared with the alias and xref synchronizers, so
    /// a term resolved once is a cache hit everywhere in the session.
    pub cv_terms: Rc<RefCell<CvTermSynchronizer<'conn>>>,
    pub aliases: AliasSynchronizer<'conn>,
    pub xrefs: XrefSynchronizer<'conn>,
    pub preferences: PreferenceSynchronizer<'conn>,
}

impl<'conn> SyncSession<'conn> {
    /// Creates a session reporting diagnostics through the `log` facade.
    pub fn new(conn: &'conn Connection) -> Self {
        Self::with_observer(conn, Arc::new(LogObserver))
    }

    /// Creates a session with an injected observer (recording fakes in
    /// tests, custom sinks in embedding applications).
    pub fn with_observer(conn: &'conn Connection, observer: Arc<dyn SyncObserver>) -> Self {
        let cv_terms = Rc::new(RefCell::new(CvTermSynchronizer::new(conn, observer.clone())));
        Self {
            aliases: AliasSynchronizer::with_cv_terms(conn, cv_terms.clone(), observer.clone()),
            xrefs: XrefSynchronizer::with_cv_terms(conn, cv_terms.clone(), observer.clone()),
            preferences: PreferenceSynchronizer::new(conn, observer),
            cv_terms,
        }
    }

    /// Invalidates every session cache, ending the current unit of work.
    ///
    /// The shared term cache is the only stateful one; the no-dedup
    /// synchronizers keep no entries.
    pub fn clear_caches(&mut self) {
        self.cv_terms.borrow_mut().clear_cache();
        self.preferences.clear_cache();
        debug!("event=sync_session_reset module=sync status=ok");
    }
}
