//! Embedded property-graph storage that keeps nodes in memory until an
//! external memory-pressure policy overflows them to a persistent store.
//! Nodes use a schema-driven, array-based layout: each label registers fixed
//! slot and offset tables once, and every record of that label indexes flat
//! arrays instead of carrying per-edge maps. References stay cheap `(id,
//! label)` proxies that reload their record on demand, one node at a time.

pub mod codec;
pub mod errors;
pub mod factory;
pub mod graph;
pub mod node;
pub mod property;
pub mod reference;
pub mod schema;
pub mod store;

pub use crate::codec::{NodeDeserializer, NodeSerializer, RefResolver};
pub use crate::errors::SpillGraphError;
pub use crate::factory::{DenseNodeFactory, LabelRegistry, NodeFactory};
pub use crate::graph::SpillGraph;
pub use crate::node::{CompactNodeRecord, DenseFields, EdgeView, LabelFields};
pub use crate::property::PropertyValue;
pub use crate::reference::{NodeRef, RecordHandle};
pub use crate::schema::{Direction, KeyId, LabelSchema, SchemaDecl, SlotInfo};
pub use crate::store::OverflowStore;
