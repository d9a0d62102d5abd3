//! Per-label schemas: the fixed slot and offset tables that let node records
//! use flat arrays instead of per-edge maps. A schema is computed once when a
//! label is registered and never changes afterwards, so every instance of a
//! label shares the exact same layout.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Out,
    In,
}

impl Direction {
    pub fn reverse(self) -> Direction {
        match self {
            Direction::Out => Direction::In,
            Direction::In => Direction::Out,
        }
    }
}

/// Dense integer id assigned to each declared node-property key, in
/// declaration order. Comparing key ids replaces comparing interned strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyId(pub u16);

/// Everything a label declares: recognized node-property keys, allowed edge
/// labels per direction, and the property keys each edge label may carry.
/// Declaration order is significant — it fixes key ids, slots and offsets.
#[derive(Debug, Clone, Default)]
pub struct SchemaDecl {
    pub label: String,
    pub node_keys: Vec<String>,
    pub out_edges: Vec<String>,
    pub in_edges: Vec<String>,
    pub edge_keys: Vec<(String, Vec<String>)>,
}

impl SchemaDecl {
    pub fn new<T: Into<String>>(label: T) -> Self {
        SchemaDecl {
            label: label.into(),
            ..SchemaDecl::default()
        }
    }

    pub fn node_key<T: Into<String>>(mut self, key: T) -> Self {
        self.node_keys.push(key.into());
        self
    }

    pub fn out_edge<T: Into<String>>(mut self, edge_label: T) -> Self {
        self.out_edges.push(edge_label.into());
        self
    }

    pub fn in_edge<T: Into<String>>(mut self, edge_label: T) -> Self {
        self.in_edges.push(edge_label.into());
        self
    }

    pub fn edge_key<L: Into<String>, K: Into<String>>(mut self, edge_label: L, key: K) -> Self {
        let edge_label = edge_label.into();
        let key = key.into();
        if let Some((_, keys)) = self
            .edge_keys
            .iter_mut()
            .find(|(label, _)| *label == edge_label)
        {
            keys.push(key);
        } else {
            self.edge_keys.push((edge_label, vec![key]));
        }
        self
    }
}

/// One adjacency slot: a `(direction, edge label)` pair and the size of the
/// inline property block each entry in that slot carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotInfo {
    pub direction: Direction,
    pub edge_label: String,
    pub key_count: usize,
}

/// Immutable layout tables for one label. Out edges take slots `0..n` in
/// declaration order, in edges continue at `n`. Lookups for combinations the
/// label never declared return `None`: structurally disallowed, no storage.
#[derive(Debug)]
pub struct LabelSchema {
    label: String,
    key_ids: AHashMap<String, KeyId>,
    key_names: Vec<String>,
    out_slot: AHashMap<String, usize>,
    in_slot: AHashMap<String, usize>,
    slots: Vec<SlotInfo>,
    edge_key_count: AHashMap<String, usize>,
    edge_prop_offset: AHashMap<(String, String), usize>,
}

impl LabelSchema {
    pub fn build(decl: &SchemaDecl) -> LabelSchema {
        let mut key_ids = AHashMap::new();
        let mut key_names = Vec::with_capacity(decl.node_keys.len());
        for key in &decl.node_keys {
            if key_ids.contains_key(key) {
                continue;
            }
            key_ids.insert(key.clone(), KeyId(key_names.len() as u16));
            key_names.push(key.clone());
        }

        let mut edge_key_count = AHashMap::new();
        let mut edge_prop_offset = AHashMap::new();
        for (edge_label, keys) in &decl.edge_keys {
            edge_key_count.insert(edge_label.clone(), keys.len());
            for (offset, key) in keys.iter().enumerate() {
                edge_prop_offset.insert((edge_label.clone(), key.clone()), offset);
            }
        }

        let mut out_slot = AHashMap::new();
        let mut in_slot = AHashMap::new();
        let mut slots = Vec::with_capacity(decl.out_edges.len() + decl.in_edges.len());
        // Duplicate declarations collapse, like node keys: one slot per
        // (direction, edge label), keyed at its first position.
        for edge_label in &decl.out_edges {
            if out_slot.contains_key(edge_label) {
                continue;
            }
            out_slot.insert(edge_label.clone(), slots.len());
            slots.push(SlotInfo {
                direction: Direction::Out,
                edge_label: edge_label.clone(),
                key_count: edge_key_count.get(edge_label).copied().unwrap_or(0),
            });
        }
        for edge_label in &decl.in_edges {
            if in_slot.contains_key(edge_label) {
                continue;
            }
            in_slot.insert(edge_label.clone(), slots.len());
            slots.push(SlotInfo {
                direction: Direction::In,
                edge_label: edge_label.clone(),
                key_count: edge_key_count.get(edge_label).copied().unwrap_or(0),
            });
        }

        LabelSchema {
            label: decl.label.clone(),
            key_ids,
            key_names,
            out_slot,
            in_slot,
            slots,
            edge_key_count,
            edge_prop_offset,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Slot assigned to `(direction, edge_label)`, or `None` when the label
    /// never declared that combination.
    pub fn slot(&self, direction: Direction, edge_label: &str) -> Option<usize> {
        match direction {
            Direction::Out => self.out_slot.get(edge_label).copied(),
            Direction::In => self.in_slot.get(edge_label).copied(),
        }
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn slots(&self) -> &[SlotInfo] {
        &self.slots
    }

    pub fn allowed_edge_labels(&self, direction: Direction) -> Vec<&str> {
        self.slots
            .iter()
            .filter(|slot| slot.direction == direction)
            .map(|slot| slot.edge_label.as_str())
            .collect()
    }

    pub fn key_id(&self, key: &str) -> Option<KeyId> {
        self.key_ids.get(key).copied()
    }

    pub fn key_name(&self, id: KeyId) -> Option<&str> {
        self.key_names.get(id.0 as usize).map(String::as_str)
    }

    pub fn node_key_count(&self) -> usize {
        self.key_names.len()
    }

    /// Declared node-property keys with their ids, in declaration order.
    pub fn node_keys(&self) -> impl Iterator<Item = (&str, KeyId)> {
        self.key_names
            .iter()
            .enumerate()
            .map(|(idx, key)| (key.as_str(), KeyId(idx as u16)))
    }

    /// Number of distinct property keys an edge label may carry; sizes the
    /// inline block stored next to each adjacent reference.
    pub fn edge_key_count(&self, edge_label: &str) -> Option<usize> {
        self.edge_key_count.get(edge_label).copied()
    }

    /// Offset of `key` within `edge_label`'s inline property block.
    pub fn edge_property_offset(&self, edge_label: &str, key: &str) -> Option<usize> {
        self.edge_prop_offset
            .get(&(edge_label.to_string(), key.to_string()))
            .copied()
    }
}
