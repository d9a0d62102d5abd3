mod common;

use std::sync::Arc;

use common::{FOLLOWED_BY, NAME, SONG, WEIGHT};
use spillgraph::{Direction, PropertyValue, SpillGraph, SpillGraphError};

/// Evict, close, reopen at the same path: the node comes back by id with its
/// properties intact.
#[test]
fn test_overflowed_node_survives_reopen() {
    let path = common::temp_db_path("reopen");

    let id = {
        let graph = SpillGraph::open(&path, common::registry());
        let song = graph.create_node(SONG).expect("create");
        song.get()
            .expect("get")
            .write()
            .set_property(NAME, "Dark Star")
            .expect("set");
        song.evict().expect("evict");
        graph.close().expect("close");
        song.id()
    };

    let graph = SpillGraph::open(&path, common::registry());
    let song = graph.node(id).expect("lookup").expect("persisted node");
    assert_eq!(song.label(), SONG);
    assert!(!song.is_live());

    let handle = song.get().expect("reload");
    assert_eq!(
        handle.read().property(NAME).expect("get"),
        Some(PropertyValue::Str("Dark Star".into()))
    );

    graph.close().expect("close");
    let _ = std::fs::remove_file(&path);
}

/// Evict only the source of an edge; resolving the edge from the still-live
/// target reloads the source exactly once and the weight is preserved.
#[test]
fn test_edge_resolution_reloads_evicted_source_once() {
    let graph = SpillGraph::open_temp(common::registry());
    let source = graph.create_node(SONG).expect("source");
    let target = graph.create_node(SONG).expect("target");
    graph
        .link(&source, &target, FOLLOWED_BY, &[(WEIGHT, PropertyValue::Int(42))])
        .expect("link");

    source.evict().expect("evict source");
    assert!(!source.is_live());
    assert!(target.is_live());

    // Resolve the edge from the target side.
    let target_handle = target.get().expect("target get");
    let target_record = target_handle.read();
    let incoming = target_record
        .edges(Direction::In, FOLLOWED_BY)
        .expect("in edges");
    assert_eq!(incoming.len(), 1);
    let peer = incoming[0].peer().clone();
    assert_eq!(peer, source);

    let first = peer.get().expect("reload source");
    let second = peer.get().expect("cached");
    assert!(Arc::ptr_eq(&first, &second), "only one reload may happen");

    assert_eq!(
        first
            .read()
            .edge_property(Direction::Out, FOLLOWED_BY, 0, WEIGHT)
            .expect("weight"),
        Some(PropertyValue::Int(42))
    );
}

/// remove() eliminates both the live record and the persisted image.
#[test]
fn test_remove_eliminates_both_copies() {
    let graph = SpillGraph::open_temp(common::registry());
    let song = graph.create_node(SONG).expect("create");
    song.get()
        .expect("get")
        .write()
        .set_property(NAME, "Cassidy")
        .expect("set");
    song.evict().expect("persist image");
    song.get().expect("reload to live");
    let id = song.id();

    graph.remove(id).expect("remove");

    assert!(song.is_removed());
    assert!(matches!(song.get().unwrap_err(), SpillGraphError::NotFound(_)));
    assert_eq!(graph.store().read(id).expect("speculative read"), None);
    assert_eq!(graph.node(id).expect("lookup"), None);
}
