//! The owning graph context: wires the label registry, the overflow store
//! and the reference table together. Schemas and factories are fixed at open
//! time; after that the context only hands out and unifies references, assigns
//! ids, and mediates eviction and reload.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use ahash::AHashMap;
use parking_lot::{Mutex, RwLock};

use crate::codec::{NodeDeserializer, RefResolver};
use crate::errors::SpillGraphError;
use crate::factory::LabelRegistry;
use crate::node::CompactNodeRecord;
use crate::property::PropertyValue;
use crate::reference::{NodeRef, RefState};
use crate::schema::Direction;
use crate::store::OverflowStore;

pub(crate) struct GraphInner {
    registry: Arc<LabelRegistry>,
    deserializer: Option<NodeDeserializer>,
    store: OverflowStore,
    refs: RwLock<AHashMap<u64, NodeRef>>,
    next_id: AtomicU64,
    id_seeded: Mutex<bool>,
    self_weak: Weak<GraphInner>,
}

impl GraphInner {
    pub(crate) fn store(&self) -> &OverflowStore {
        &self.store
    }

    pub(crate) fn deserialize_node(
        &self,
        bytes: &[u8],
    ) -> Result<(u64, CompactNodeRecord), SpillGraphError> {
        let deserializer = self.deserializer.as_ref().ok_or_else(|| {
            SpillGraphError::deserialization_unavailable(
                "store was opened write-only".to_string(),
            )
        })?;
        deserializer.deserialize(bytes, self)
    }

    /// Existing reference for `id`, or a fresh empty one. Keeps reference
    /// identity: one `NodeRef` per id per graph.
    fn ref_for(&self, id: u64, label: &str) -> NodeRef {
        if let Some(existing) = self.refs.read().get(&id) {
            return existing.clone();
        }
        let mut refs = self.refs.write();
        if let Some(existing) = refs.get(&id) {
            return existing.clone();
        }
        let node_ref = NodeRef::new(id, label.to_string(), self.self_weak.clone(), RefState::Empty);
        refs.insert(id, node_ref.clone());
        self.next_id.fetch_max(id + 1, Ordering::SeqCst);
        node_ref
    }

    pub(crate) fn forget_ref(&self, id: u64) {
        self.refs.write().remove(&id);
    }
}

impl RefResolver for GraphInner {
    fn resolve_ref(&self, id: u64, label: &str) -> NodeRef {
        self.ref_for(id, label)
    }
}

/// The graph is the handle a deserializer needs to materialize adjacent
/// references without loading them.
impl RefResolver for SpillGraph {
    fn resolve_ref(&self, id: u64, label: &str) -> NodeRef {
        self.inner.ref_for(id, label)
    }
}

/// Embedded graph context. Cheap to clone; all clones share one store and one
/// reference table.
#[derive(Clone)]
pub struct SpillGraph {
    inner: Arc<GraphInner>,
}

impl SpillGraph {
    /// Graph over a store file at `path` (which may or may not exist yet),
    /// with reload enabled through the registry's factories.
    pub fn open<P: AsRef<Path>>(path: P, registry: Arc<LabelRegistry>) -> SpillGraph {
        Self::build(OverflowStore::at_path(path), registry, true)
    }

    /// Graph over a temp-file store, removed when the store closes.
    pub fn open_temp(registry: Arc<LabelRegistry>) -> SpillGraph {
        Self::build(OverflowStore::temp(), registry, true)
    }

    /// Graph that can create, mutate and evict nodes but has no deserializer:
    /// any reload attempt fails with `DeserializationUnavailable` while
    /// writes keep working.
    pub fn open_write_only<P: AsRef<Path>>(
        path: P,
        registry: Arc<LabelRegistry>,
    ) -> SpillGraph {
        Self::build(OverflowStore::at_path(path), registry, false)
    }

    fn build(
        store: OverflowStore,
        registry: Arc<LabelRegistry>,
        with_deserializer: bool,
    ) -> SpillGraph {
        let inner = Arc::new_cyclic(|self_weak| GraphInner {
            deserializer: with_deserializer.then(|| NodeDeserializer::new(registry.clone())),
            registry,
            store,
            refs: RwLock::new(AHashMap::new()),
            next_id: AtomicU64::new(0),
            id_seeded: Mutex::new(false),
            self_weak: self_weak.clone(),
        });
        SpillGraph { inner }
    }

    pub fn registry(&self) -> &Arc<LabelRegistry> {
        &self.inner.registry
    }

    pub fn store(&self) -> &OverflowStore {
        &self.inner.store
    }

    /// Creates a node with a live empty record attached and a graph-assigned
    /// id, never reused within this store's lifetime.
    pub fn create_node(&self, label: &str) -> Result<NodeRef, SpillGraphError> {
        let record = self.inner.registry.new_record(label)?;
        let id = self.alloc_id()?;
        let node_ref = NodeRef::new(
            id,
            label.to_string(),
            self.inner.self_weak.clone(),
            RefState::Empty,
        );
        node_ref.attach(record)?;
        self.inner.refs.write().insert(id, node_ref.clone());
        Ok(node_ref)
    }

    /// Reference for `id`: reference-table hit, else a speculative store read
    /// that decodes only the image header to build an empty reference.
    /// `Ok(None)` when the id is unknown both in memory and on disk.
    pub fn node(&self, id: u64) -> Result<Option<NodeRef>, SpillGraphError> {
        if let Some(existing) = self.inner.refs.read().get(&id) {
            return Ok(Some(existing.clone()));
        }
        let Some(bytes) = self.inner.store.read(id)? else {
            return Ok(None);
        };
        let (_, label) = NodeDeserializer::deserialize_ref_header(&bytes)?;
        Ok(Some(self.inner.ref_for(id, &label)))
    }

    /// Adds a `from -[edge_label]-> to` edge, writing the out-entry on
    /// `from`'s record and the in-entry on `to`'s record with equal inline
    /// property blocks. Slots, property keys and both records are resolved
    /// before either side is touched, so a failing endpoint never leaves a
    /// one-sided edge behind.
    pub fn link(
        &self,
        from: &NodeRef,
        to: &NodeRef,
        edge_label: &str,
        props: &[(&str, PropertyValue)],
    ) -> Result<(), SpillGraphError> {
        self.check_edge(from.label(), Direction::Out, edge_label, props)?;
        self.check_edge(to.label(), Direction::In, edge_label, props)?;
        let from_handle = from.get()?;
        let to_handle = to.get()?;
        from_handle
            .write()
            .add_edge(Direction::Out, edge_label, to.clone(), props)?;
        to_handle
            .write()
            .add_edge(Direction::In, edge_label, from.clone(), props)?;
        Ok(())
    }

    /// Removes the node everywhere: live record, persisted image, reference
    /// table. Subsequent lookups report `NotFound`.
    pub fn remove(&self, id: u64) -> Result<(), SpillGraphError> {
        let existing = self.inner.refs.read().get(&id).cloned();
        match existing {
            Some(node_ref) => node_ref.remove(),
            None => self.inner.store.remove(id),
        }
    }

    /// Flushes and closes the overflow store; every storage operation
    /// afterwards fails with `StoreClosed`.
    pub fn close(&self) -> Result<(), SpillGraphError> {
        self.inner.store.close()
    }

    fn check_edge(
        &self,
        node_label: &str,
        direction: Direction,
        edge_label: &str,
        props: &[(&str, PropertyValue)],
    ) -> Result<(), SpillGraphError> {
        let schema = self.inner.registry.schema(node_label).ok_or_else(|| {
            SpillGraphError::schema_violation(format!("label '{node_label}' is not registered"))
        })?;
        if schema.slot(direction, edge_label).is_none() {
            return Err(SpillGraphError::schema_violation(format!(
                "edge label '{edge_label}' ({direction:?}) not allowed for label '{node_label}'"
            )));
        }
        for (key, _) in props {
            if schema.edge_property_offset(edge_label, key).is_none() {
                return Err(SpillGraphError::schema_violation(format!(
                    "property key '{key}' not declared for edge label '{edge_label}'"
                )));
            }
        }
        Ok(())
    }

    /// Ids count up from past the largest id the store already holds, so ids
    /// are unique per store lifetime even across reopen.
    fn alloc_id(&self) -> Result<u64, SpillGraphError> {
        let mut seeded = self.inner.id_seeded.lock();
        if !*seeded {
            if let Some(max) = self.inner.store.max_id()? {
                self.inner.next_id.fetch_max(max + 1, Ordering::SeqCst);
            }
            *seeded = true;
        }
        drop(seeded);
        Ok(self.inner.next_id.fetch_add(1, Ordering::SeqCst))
    }
}
