mod common;

use spillgraph::{OverflowStore, SpillGraphError};

#[test]
fn test_backing_file_opens_lazily() {
    let path = common::temp_db_path("lazy");
    let store = OverflowStore::at_path(&path);
    assert!(!path.exists(), "construction must not touch the filesystem");

    store.persist(1, b"payload").expect("persist");
    assert!(path.exists());

    store.close().expect("close");
    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_persist_read_remove() {
    let store = OverflowStore::temp();

    assert_eq!(store.read(7).expect("speculative read"), None);

    store.persist(7, b"first").expect("persist");
    assert_eq!(store.read(7).expect("read"), Some(b"first".to_vec()));

    // persist is an upsert
    store.persist(7, b"second").expect("persist");
    assert_eq!(store.read(7).expect("read"), Some(b"second".to_vec()));

    store.remove(7).expect("remove");
    assert_eq!(store.read(7).expect("read after remove"), None);
    // removing an absent id is map semantics, not an error
    store.remove(7).expect("remove again");
}

#[test]
fn test_entries_are_ordered_by_id() {
    let store = OverflowStore::temp();
    for id in [20u64, 5, 11, 3] {
        store.persist(id, &id.to_le_bytes()).expect("persist");
    }

    let ids: Vec<u64> = store
        .iter_entries()
        .expect("entries")
        .iter()
        .map(|(id, _)| *id)
        .collect();
    assert_eq!(ids, vec![3, 5, 11, 20]);
    assert_eq!(store.max_id().expect("max"), Some(20));
}

#[test]
fn test_max_id_on_empty_store() {
    let store = OverflowStore::temp();
    assert_eq!(store.max_id().expect("max"), None);
}

#[test]
fn test_every_operation_fails_after_close() {
    let store = OverflowStore::temp();
    store.persist(1, b"x").expect("persist");
    store.close().expect("close");
    assert!(store.is_closed());

    assert!(matches!(
        store.persist(2, b"y").unwrap_err(),
        SpillGraphError::StoreClosed(_)
    ));
    assert!(matches!(
        store.read(1).unwrap_err(),
        SpillGraphError::StoreClosed(_)
    ));
    assert!(matches!(
        store.remove(1).unwrap_err(),
        SpillGraphError::StoreClosed(_)
    ));
    assert!(matches!(
        store.iter_entries().unwrap_err(),
        SpillGraphError::StoreClosed(_)
    ));
}

#[test]
fn test_temp_file_removed_on_close() {
    let store = OverflowStore::temp();
    store.persist(1, b"x").expect("persist");
    let path = store.path().to_path_buf();
    assert!(path.exists());

    store.close().expect("close");
    assert!(!path.exists(), "temp store must clean up its file");
}

#[test]
fn test_temp_file_removed_on_drop() {
    let path;
    {
        let store = OverflowStore::temp();
        store.persist(1, b"x").expect("persist");
        path = store.path().to_path_buf();
        assert!(path.exists());
    }
    assert!(!path.exists(), "drop must clean up the temp file");
}

#[test]
fn test_explicit_path_survives_close() {
    let path = common::temp_db_path("durable");
    {
        let store = OverflowStore::at_path(&path);
        store.persist(9, b"keep me").expect("persist");
        store.close().expect("close");
    }
    assert!(path.exists());

    let store = OverflowStore::at_path(&path);
    assert_eq!(store.read(9).expect("read"), Some(b"keep me".to_vec()));
    store.close().expect("close");
    let _ = std::fs::remove_file(&path);
}
