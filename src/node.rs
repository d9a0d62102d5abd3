//! The compact in-memory node representation. Adjacency lives in one flat
//! array cell per schema slot; each cell is an insertion-ordered sequence of
//! `(adjacent reference, inline property block)` pairs, with edge properties
//! addressed positionally through the schema's offset table. Node-level
//! properties live in a per-label [`LabelFields`] implementation dispatched
//! by dense key id.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::errors::SpillGraphError;
use crate::property::PropertyValue;
use crate::reference::NodeRef;
use crate::schema::{Direction, KeyId, LabelSchema};

/// Per-label node-property storage. Implementations hold direct typed fields
/// and dispatch on [`KeyId`]; a `set` with a value type the field cannot hold
/// must fail with a schema violation rather than coerce.
pub trait LabelFields: Send + Sync + fmt::Debug {
    fn get(&self, key: KeyId) -> Option<PropertyValue>;
    fn set(&mut self, key: KeyId, value: PropertyValue) -> Result<(), SpillGraphError>;
    fn remove(&mut self, key: KeyId);
}

/// Array-backed [`LabelFields`] for labels without a bespoke field layout:
/// one `Option<PropertyValue>` cell per declared key, any value type accepted.
#[derive(Debug)]
pub struct DenseFields {
    values: Vec<Option<PropertyValue>>,
}

impl DenseFields {
    pub fn new(key_count: usize) -> Self {
        DenseFields {
            values: vec![None; key_count],
        }
    }
}

impl LabelFields for DenseFields {
    fn get(&self, key: KeyId) -> Option<PropertyValue> {
        self.values.get(key.0 as usize).cloned().flatten()
    }

    fn set(&mut self, key: KeyId, value: PropertyValue) -> Result<(), SpillGraphError> {
        match self.values.get_mut(key.0 as usize) {
            Some(cell) => {
                *cell = Some(value);
                Ok(())
            }
            None => Err(SpillGraphError::schema_violation(format!(
                "key id {} out of range",
                key.0
            ))),
        }
    }

    fn remove(&mut self, key: KeyId) {
        if let Some(cell) = self.values.get_mut(key.0 as usize) {
            *cell = None;
        }
    }
}

/// Adjacent reference plus the inline property block for one edge, sized by
/// the edge label's declared key count.
pub(crate) type EdgeEntry = (NodeRef, Box<[Option<PropertyValue>]>);

/// Read view over one adjacency entry: the peer reference and positional
/// access to the edge's inline properties.
pub struct EdgeView<'a> {
    schema: &'a LabelSchema,
    edge_label: &'a str,
    peer: &'a NodeRef,
    block: &'a [Option<PropertyValue>],
}

impl<'a> EdgeView<'a> {
    pub fn peer(&self) -> &'a NodeRef {
        self.peer
    }

    pub fn edge_label(&self) -> &'a str {
        self.edge_label
    }

    /// Edge property by key; `None` for unset or undeclared keys.
    pub fn property(&self, key: &str) -> Option<&'a PropertyValue> {
        let offset = self.schema.edge_property_offset(self.edge_label, key)?;
        self.block.get(offset)?.as_ref()
    }
}

/// In-memory node representation for one label. Created on insertion or
/// reload, mutated through key-validated accessors, serialized and dropped on
/// eviction. Mutation only flips the dirty flag; persistence is driven from
/// the reference layer.
#[derive(Debug)]
pub struct CompactNodeRecord {
    schema: Arc<LabelSchema>,
    fields: Box<dyn LabelFields>,
    adjacency: Vec<Vec<EdgeEntry>>,
    dirty: bool,
}

impl CompactNodeRecord {
    /// A fresh record starts dirty: it has never been persisted.
    pub fn new(schema: Arc<LabelSchema>, fields: Box<dyn LabelFields>) -> Self {
        let adjacency = (0..schema.slot_count()).map(|_| Vec::new()).collect();
        CompactNodeRecord {
            schema,
            fields,
            adjacency,
            dirty: true,
        }
    }

    pub fn schema(&self) -> &Arc<LabelSchema> {
        &self.schema
    }

    pub fn label(&self) -> &str {
        self.schema.label()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn mark_clean(&mut self) {
        self.dirty = false;
    }

    fn key_id(&self, key: &str) -> Result<KeyId, SpillGraphError> {
        self.schema.key_id(key).ok_or_else(|| {
            SpillGraphError::schema_violation(format!(
                "property key '{}' not declared for label '{}'",
                key,
                self.schema.label()
            ))
        })
    }

    pub fn property(&self, key: &str) -> Result<Option<PropertyValue>, SpillGraphError> {
        let id = self.key_id(key)?;
        Ok(self.fields.get(id))
    }

    pub fn set_property<V: Into<PropertyValue>>(
        &mut self,
        key: &str,
        value: V,
    ) -> Result<(), SpillGraphError> {
        let id = self.key_id(key)?;
        self.fields.set(id, value.into())?;
        self.dirty = true;
        Ok(())
    }

    pub fn remove_property(&mut self, key: &str) -> Result<(), SpillGraphError> {
        let id = self.key_id(key)?;
        self.fields.remove(id);
        self.dirty = true;
        Ok(())
    }

    /// Currently-set node properties, keyed by declared name.
    pub fn value_map(&self) -> BTreeMap<String, PropertyValue> {
        let mut map = BTreeMap::new();
        for (key, id) in self.schema.node_keys() {
            if let Some(value) = self.fields.get(id) {
                map.insert(key.to_string(), value);
            }
        }
        map
    }

    /// Appends an edge to the slot for `(direction, edge_label)`. Multiple
    /// edges per slot are allowed; insertion order is preserved.
    pub fn add_edge(
        &mut self,
        direction: Direction,
        edge_label: &str,
        peer: NodeRef,
        props: &[(&str, PropertyValue)],
    ) -> Result<(), SpillGraphError> {
        let slot = self.edge_slot(direction, edge_label)?;
        let key_count = self.schema.slots()[slot].key_count;
        let mut block = vec![None; key_count].into_boxed_slice();
        for (key, value) in props {
            let offset = self.edge_offset(edge_label, key)?;
            block[offset] = Some(value.clone());
        }
        self.adjacency[slot].push((peer, block));
        self.dirty = true;
        Ok(())
    }

    /// Adjacent references for `(direction, edge_label)`, in insertion order.
    pub fn adjacent(
        &self,
        direction: Direction,
        edge_label: &str,
    ) -> Result<Vec<NodeRef>, SpillGraphError> {
        let slot = self.edge_slot(direction, edge_label)?;
        Ok(self.adjacency[slot]
            .iter()
            .map(|(peer, _)| peer.clone())
            .collect())
    }

    pub fn edges(
        &self,
        direction: Direction,
        edge_label: &str,
    ) -> Result<Vec<EdgeView<'_>>, SpillGraphError> {
        let slot = self.edge_slot(direction, edge_label)?;
        Ok(self.slot_views(slot))
    }

    /// Edges in `(direction, edge_label)` whose inline properties satisfy the
    /// predicate.
    pub fn edges_matching<F>(
        &self,
        direction: Direction,
        edge_label: &str,
        predicate: F,
    ) -> Result<Vec<EdgeView<'_>>, SpillGraphError>
    where
        F: Fn(&EdgeView<'_>) -> bool,
    {
        let slot = self.edge_slot(direction, edge_label)?;
        Ok(self
            .slot_views(slot)
            .into_iter()
            .filter(|view| predicate(view))
            .collect())
    }

    /// All edges over all slots, in slot order then insertion order.
    pub fn all_edges(&self) -> Vec<EdgeView<'_>> {
        (0..self.adjacency.len())
            .flat_map(|slot| self.slot_views(slot))
            .collect()
    }

    /// All edges on one side of the node, regardless of edge label.
    pub fn edges_by_direction(&self, direction: Direction) -> Vec<EdgeView<'_>> {
        self.schema
            .slots()
            .iter()
            .enumerate()
            .filter(|(_, info)| info.direction == direction)
            .flat_map(|(slot, _)| self.slot_views(slot))
            .collect()
    }

    pub fn edge_property(
        &self,
        direction: Direction,
        edge_label: &str,
        index: usize,
        key: &str,
    ) -> Result<Option<PropertyValue>, SpillGraphError> {
        let slot = self.edge_slot(direction, edge_label)?;
        let offset = self.edge_offset(edge_label, key)?;
        let (_, block) = self.entry(slot, edge_label, index)?;
        Ok(block.get(offset).cloned().flatten())
    }

    /// Writes an edge property positionally; `index` addresses the entry
    /// within the slot's insertion-ordered sequence.
    pub fn set_edge_property<V: Into<PropertyValue>>(
        &mut self,
        direction: Direction,
        edge_label: &str,
        index: usize,
        key: &str,
        value: V,
    ) -> Result<(), SpillGraphError> {
        let slot = self.edge_slot(direction, edge_label)?;
        let offset = self.edge_offset(edge_label, key)?;
        let entries = &mut self.adjacency[slot];
        let (_, block) = entries.get_mut(index).ok_or_else(|| {
            SpillGraphError::not_found(format!("edge {edge_label}[{index}]"))
        })?;
        block[offset] = Some(value.into());
        self.dirty = true;
        Ok(())
    }

    /// Per-slot `(peer id, inline block)` listing, for value-equality checks.
    pub fn adjacency_snapshot(&self) -> Vec<Vec<(u64, Vec<Option<PropertyValue>>)>> {
        self.adjacency
            .iter()
            .map(|entries| {
                entries
                    .iter()
                    .map(|(peer, block)| (peer.id(), block.to_vec()))
                    .collect()
            })
            .collect()
    }

    pub(crate) fn adjacency(&self) -> &[Vec<EdgeEntry>] {
        &self.adjacency
    }

    /// Used by the deserializer: append without validation or dirty marking.
    pub(crate) fn push_edge_entry(
        &mut self,
        slot: usize,
        peer: NodeRef,
        block: Box<[Option<PropertyValue>]>,
    ) {
        self.adjacency[slot].push((peer, block));
    }

    pub(crate) fn get_by_id(&self, key: KeyId) -> Option<PropertyValue> {
        self.fields.get(key)
    }

    pub(crate) fn set_by_id(
        &mut self,
        key: KeyId,
        value: PropertyValue,
    ) -> Result<(), SpillGraphError> {
        self.fields.set(key, value)
    }

    fn edge_slot(&self, direction: Direction, edge_label: &str) -> Result<usize, SpillGraphError> {
        self.schema.slot(direction, edge_label).ok_or_else(|| {
            SpillGraphError::schema_violation(format!(
                "edge label '{}' ({:?}) not allowed for label '{}'",
                edge_label,
                direction,
                self.schema.label()
            ))
        })
    }

    fn edge_offset(&self, edge_label: &str, key: &str) -> Result<usize, SpillGraphError> {
        self.schema
            .edge_property_offset(edge_label, key)
            .ok_or_else(|| {
                SpillGraphError::schema_violation(format!(
                    "property key '{key}' not declared for edge label '{edge_label}'"
                ))
            })
    }

    fn entry(
        &self,
        slot: usize,
        edge_label: &str,
        index: usize,
    ) -> Result<&EdgeEntry, SpillGraphError> {
        self.adjacency[slot]
            .get(index)
            .ok_or_else(|| SpillGraphError::not_found(format!("edge {edge_label}[{index}]")))
    }

    fn slot_views(&self, slot: usize) -> Vec<EdgeView<'_>> {
        let info = &self.schema.slots()[slot];
        self.adjacency[slot]
            .iter()
            .map(|(peer, block)| EdgeView {
                schema: &self.schema,
                edge_label: info.edge_label.as_str(),
                peer,
                block,
            })
            .collect()
    }
}
