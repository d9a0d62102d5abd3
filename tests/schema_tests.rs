mod common;

use common::{FOLLOWED_BY, NAME, PERFORMANCES, SONG_TYPE, SUNG_BY, WEIGHT, WRITTEN_BY};
use spillgraph::{Direction, KeyId, LabelSchema, SchemaDecl, SpillGraphError};

#[test]
fn test_slots_follow_declaration_order() {
    let schema = LabelSchema::build(&common::song_decl());

    assert_eq!(schema.slot(Direction::Out, SUNG_BY), Some(0));
    assert_eq!(schema.slot(Direction::Out, WRITTEN_BY), Some(1));
    assert_eq!(schema.slot(Direction::Out, FOLLOWED_BY), Some(2));
    assert_eq!(schema.slot(Direction::In, FOLLOWED_BY), Some(3));
    assert_eq!(schema.slot_count(), 4);
}

#[test]
fn test_unregistered_combinations_are_none() {
    let schema = LabelSchema::build(&common::song_decl());

    assert_eq!(schema.slot(Direction::In, SUNG_BY), None);
    assert_eq!(schema.slot(Direction::Out, "coveredBy"), None);
    assert_eq!(schema.edge_property_offset(FOLLOWED_BY, "missing"), None);
    assert_eq!(schema.edge_property_offset(SUNG_BY, WEIGHT), None);
    assert_eq!(schema.edge_key_count("coveredBy"), None);
    assert_eq!(schema.key_id("missing"), None);
}

#[test]
fn test_key_ids_are_dense_in_declaration_order() {
    let schema = LabelSchema::build(&common::song_decl());

    assert_eq!(schema.key_id(NAME), Some(KeyId(0)));
    assert_eq!(schema.key_id(SONG_TYPE), Some(KeyId(1)));
    assert_eq!(schema.key_id(PERFORMANCES), Some(KeyId(2)));
    assert_eq!(schema.key_name(KeyId(1)), Some(SONG_TYPE));
    assert_eq!(schema.node_key_count(), 3);
}

#[test]
fn test_edge_property_offsets_and_counts() {
    let schema = LabelSchema::build(&common::song_decl());

    assert_eq!(schema.edge_key_count(FOLLOWED_BY), Some(1));
    assert_eq!(schema.edge_property_offset(FOLLOWED_BY, WEIGHT), Some(0));
    // Declared as edges but carrying no keys: the slot still exists with an
    // empty inline block.
    assert_eq!(schema.slots()[0].key_count, 0);
    assert_eq!(schema.slots()[2].key_count, 1);
    assert_eq!(schema.slots()[3].key_count, 1);
}

#[test]
fn test_allowed_edge_labels_per_direction() {
    let schema = LabelSchema::build(&common::song_decl());

    assert_eq!(
        schema.allowed_edge_labels(Direction::Out),
        vec![SUNG_BY, WRITTEN_BY, FOLLOWED_BY]
    );
    assert_eq!(schema.allowed_edge_labels(Direction::In), vec![FOLLOWED_BY]);
}

#[test]
fn test_schema_determinism_across_registrations() {
    let first = LabelSchema::build(&common::song_decl());
    let second = LabelSchema::build(&common::song_decl());

    assert_eq!(first.slots(), second.slots());
    for key in [NAME, SONG_TYPE, PERFORMANCES] {
        assert_eq!(first.key_id(key), second.key_id(key));
    }
    assert_eq!(
        first.edge_property_offset(FOLLOWED_BY, WEIGHT),
        second.edge_property_offset(FOLLOWED_BY, WEIGHT)
    );
    assert_eq!(
        first.edge_key_count(FOLLOWED_BY),
        second.edge_key_count(FOLLOWED_BY)
    );
}

#[test]
fn test_multi_key_edge_offsets() {
    let decl = SchemaDecl::new("flight")
        .out_edge("connectsTo")
        .edge_key("connectsTo", "distance")
        .edge_key("connectsTo", "carrier")
        .edge_key("connectsTo", "active");
    let schema = LabelSchema::build(&decl);

    assert_eq!(schema.edge_key_count("connectsTo"), Some(3));
    assert_eq!(schema.edge_property_offset("connectsTo", "distance"), Some(0));
    assert_eq!(schema.edge_property_offset("connectsTo", "carrier"), Some(1));
    assert_eq!(schema.edge_property_offset("connectsTo", "active"), Some(2));
    assert_eq!(schema.slots()[0].key_count, 3);
}

#[test]
fn test_duplicate_edge_declarations_collapse_to_one_slot() {
    let decl = SchemaDecl::new("city")
        .out_edge("roadTo")
        .out_edge("roadTo")
        .in_edge("roadTo")
        .in_edge("roadTo")
        .edge_key("roadTo", "length");
    let schema = LabelSchema::build(&decl);

    assert_eq!(schema.slot_count(), 2);
    assert_eq!(schema.slot(Direction::Out, "roadTo"), Some(0));
    assert_eq!(schema.slot(Direction::In, "roadTo"), Some(1));
    assert_eq!(schema.allowed_edge_labels(Direction::Out), vec!["roadTo"]);
    assert_eq!(schema.slots()[0].key_count, 1);
}

#[test]
fn test_duplicate_label_registration_rejected() {
    let registry = common::registry();
    assert!(registry.schema(common::SONG).is_some());

    let mut fresh = spillgraph::LabelRegistry::new();
    fresh.register_dense(&common::song_decl()).expect("first");
    let err = fresh.register_dense(&common::song_decl()).unwrap_err();
    assert!(matches!(err, SpillGraphError::InvalidInput(_)));
}
