#![allow(dead_code)]

//! Shared fixtures: the "song"/"artist" labels with their edge labels, one
//! label with hand-written typed fields and one using the dense fallback.

use std::path::PathBuf;
use std::sync::Arc;

use spillgraph::{
    KeyId, LabelFields, LabelRegistry, NodeFactory, PropertyValue, SchemaDecl, SpillGraphError,
};

pub const SONG: &str = "song";
pub const ARTIST: &str = "artist";
pub const FOLLOWED_BY: &str = "followedBy";
pub const SUNG_BY: &str = "sungBy";
pub const WRITTEN_BY: &str = "writtenBy";

pub const NAME: &str = "name";
pub const SONG_TYPE: &str = "songType";
pub const PERFORMANCES: &str = "performances";
pub const WEIGHT: &str = "weight";

pub fn song_decl() -> SchemaDecl {
    SchemaDecl::new(SONG)
        .node_key(NAME)
        .node_key(SONG_TYPE)
        .node_key(PERFORMANCES)
        .out_edge(SUNG_BY)
        .out_edge(WRITTEN_BY)
        .out_edge(FOLLOWED_BY)
        .in_edge(FOLLOWED_BY)
        .edge_key(FOLLOWED_BY, WEIGHT)
}

pub fn artist_decl() -> SchemaDecl {
    SchemaDecl::new(ARTIST)
        .node_key(NAME)
        .in_edge(SUNG_BY)
        .in_edge(WRITTEN_BY)
}

/// Typed fields for "song": direct fields dispatched by dense key id, the
/// layout a label declares at registration time. Key ids follow declaration
/// order in [`song_decl`].
#[derive(Debug, Default)]
pub struct SongFields {
    name: Option<String>,
    song_type: Option<String>,
    performances: Option<i64>,
}

impl LabelFields for SongFields {
    fn get(&self, key: KeyId) -> Option<PropertyValue> {
        match key.0 {
            0 => self.name.clone().map(PropertyValue::Str),
            1 => self.song_type.clone().map(PropertyValue::Str),
            2 => self.performances.map(PropertyValue::Int),
            _ => None,
        }
    }

    fn set(&mut self, key: KeyId, value: PropertyValue) -> Result<(), SpillGraphError> {
        match (key.0, value) {
            (0, PropertyValue::Str(s)) => self.name = Some(s),
            (1, PropertyValue::Str(s)) => self.song_type = Some(s),
            (2, PropertyValue::Int(i)) => self.performances = Some(i),
            (id, other) => {
                return Err(SpillGraphError::schema_violation(format!(
                    "song field {} cannot hold a {}",
                    id,
                    other.type_name()
                )));
            }
        }
        Ok(())
    }

    fn remove(&mut self, key: KeyId) {
        match key.0 {
            0 => self.name = None,
            1 => self.song_type = None,
            2 => self.performances = None,
            _ => {}
        }
    }
}

pub struct SongFactory;

impl NodeFactory for SongFactory {
    fn label(&self) -> &str {
        SONG
    }

    fn new_fields(&self) -> Box<dyn LabelFields> {
        Box::new(SongFields::default())
    }
}

/// Registry with "song" (typed fields) and "artist" (dense fallback).
pub fn registry() -> Arc<LabelRegistry> {
    let mut registry = LabelRegistry::new();
    registry
        .register(&song_decl(), Arc::new(SongFactory))
        .expect("register song");
    registry
        .register_dense(&artist_decl())
        .expect("register artist");
    Arc::new(registry)
}

/// Fresh path in the OS temp dir for store-reopen tests; callers remove the
/// file themselves.
pub fn temp_db_path(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!("spillgraph-test-{tag}-{:016x}.db", rand::random::<u64>()))
}
