mod common;

use common::{count_rows, RecordingObserver, SyncEvent};
use molbase_core::db::open_db_in_memory;
use molbase_core::{Alias, CvTerm, EntitySynchronizer, Preference, SyncSession, Xref};

#[test]
fn one_session_drives_all_entity_kinds_over_one_connection() {
    let conn = open_db_in_memory().unwrap();
    let mut session = SyncSession::new(&conn);

    let gene_name = CvTerm::with_mi("gene name", "MI:0301");
    session
        .cv_terms
        .borrow_mut()
        .synchronize(&gene_name, true)
        .unwrap()
        .unwrap();
    session
        .aliases
        .synchronize(&Alias::with_type(gene_name, "p53"), true)
        .unwrap()
        .unwrap();
    session
        .xrefs
        .synchronize(
            &Xref::new(CvTerm::with_mi("uniprotkb", "MI:0486"), "P04637"),
            true,
        )
        .unwrap()
        .unwrap();
    session
        .preferences
        .synchronize(&Preference::new("jdoe", "review.layout", None), true)
        .unwrap()
        .unwrap();

    assert_eq!(count_rows(&conn, "cv_terms"), 2);
    assert_eq!(count_rows(&conn, "aliases"), 1);
    assert_eq!(count_rows(&conn, "xrefs"), 1);
    assert_eq!(count_rows(&conn, "preferences"), 1);
}

#[test]
fn alias_type_reuses_a_term_already_persisted_in_the_session() {
    let conn = open_db_in_memory().unwrap();
    let mut session = SyncSession::new(&conn);

    let gene_name = CvTerm::with_mi("gene name", "MI:0301");
    session
        .cv_terms
        .borrow_mut()
        .synchronize(&gene_name, true)
        .unwrap()
        .unwrap();
    session
        .aliases
        .synchronize(&Alias::with_type(gene_name, "p53"), true)
        .unwrap()
        .unwrap();

    // The alias synchronizer resolved the term through the shared cache
    // instead of inserting a duplicate.
    assert_eq!(count_rows(&conn, "cv_terms"), 1);
}

#[test]
fn nested_resolution_populates_the_shared_term_cache() {
    let conn = open_db_in_memory().unwrap();
    let mut session = SyncSession::new(&conn);

    let gene_name = CvTerm::with_mi("gene name", "MI:0301");
    session
        .aliases
        .synchronize(&Alias::with_type(gene_name.clone(), "p53"), true)
        .unwrap()
        .unwrap();

    // With the table hidden, any lookup would fail: the term resolved
    // through the alias must be served from the session-wide cache.
    conn.execute_batch("ALTER TABLE cv_terms RENAME TO cv_terms_hidden;")
        .unwrap();
    let cached = session
        .cv_terms
        .borrow_mut()
        .synchronize(&gene_name, true)
        .unwrap()
        .unwrap();
    assert!(cached.ac.is_some());
}

#[test]
fn session_observer_is_shared_across_synchronizers() {
    let conn = open_db_in_memory().unwrap();
    let observer = RecordingObserver::new();
    let mut session = SyncSession::with_observer(&conn, observer.clone());

    session
        .aliases
        .synchronize(
            &Alias::with_type(CvTerm::with_mi("gene name", "MI:0301"), "p53"),
            true,
        )
        .unwrap()
        .unwrap();
    session
        .preferences
        .synchronize(&Preference::new("jdoe", "review.layout", None), true)
        .unwrap()
        .unwrap();

    let persisted_entities: Vec<&'static str> = observer
        .events()
        .iter()
        .filter_map(|e| match e {
            SyncEvent::Persisted { entity, .. } => Some(*entity),
            _ => None,
        })
        .collect();
    assert_eq!(persisted_entities, vec!["cv_term", "alias", "preference"]);
}

#[test]
fn clear_caches_starts_a_fresh_unit_of_work() {
    let conn = open_db_in_memory().unwrap();
    let mut session = SyncSession::new(&conn);

    let gene_name = CvTerm::with_mi("gene name", "MI:0301");
    let first = session
        .cv_terms
        .borrow_mut()
        .synchronize(&gene_name, true)
        .unwrap()
        .unwrap();
    session.clear_caches();

    // Same logical identity in the next unit of work resolves to the same
    // row via the finder, not to a stale cache entry.
    let second = session
        .cv_terms
        .borrow_mut()
        .synchronize(&gene_name, true)
        .unwrap()
        .unwrap();
    assert_eq!(second.ac, first.ac);
    assert_eq!(count_rows(&conn, "cv_terms"), 1);
}
