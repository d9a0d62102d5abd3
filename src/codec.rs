//! Binary codec between a [`CompactNodeRecord`] and the byte image kept in
//! the overflow store. The layout is schema-dependent: it can only be decoded
//! with the same label schema that produced it, which is what allows edges
//! and their inline properties to be written positionally with no per-field
//! framing. Adjacent nodes are wired back as (possibly still empty)
//! references, so rehydrating one node never loads its neighborhood.
//!
//! Layout, all little-endian:
//! `version u8 | id u64 | label str | per slot: entry count u32, then per
//! entry (peer id u64, peer label str, one tagged value per declared edge
//! key) | node prop count u16, then (key id u16, tagged value)*`.
//! Strings are u32-length-prefixed UTF-8; a tagged value is a one-byte tag
//! (0 = unset) followed by the payload.

use std::sync::Arc;

use crate::errors::SpillGraphError;
use crate::factory::LabelRegistry;
use crate::node::CompactNodeRecord;
use crate::property::PropertyValue;
use crate::reference::NodeRef;
use crate::schema::KeyId;

const FORMAT_VERSION: u8 = 1;

const TAG_UNSET: u8 = 0;
const TAG_STR: u8 = 1;
const TAG_INT: u8 = 2;
const TAG_FLOAT: u8 = 3;
const TAG_BOOL: u8 = 4;
const TAG_STR_LIST: u8 = 5;
const TAG_INT_LIST: u8 = 6;

/// Materializes a node reference for an adjacent id without loading it.
pub trait RefResolver {
    fn resolve_ref(&self, id: u64, label: &str) -> NodeRef;
}

pub struct NodeSerializer;

impl NodeSerializer {
    pub fn serialize(id: u64, record: &CompactNodeRecord) -> Result<Vec<u8>, SpillGraphError> {
        let schema = record.schema();
        let mut w = ByteWriter::new();
        w.put_u8(FORMAT_VERSION);
        w.put_u64(id);
        w.put_str(schema.label());

        for (slot, info) in schema.slots().iter().enumerate() {
            let entries = &record.adjacency()[slot];
            w.put_u32(entries.len() as u32);
            for (peer, block) in entries {
                w.put_u64(peer.id());
                w.put_str(peer.label());
                for offset in 0..info.key_count {
                    put_value(&mut w, block.get(offset).and_then(Option::as_ref));
                }
            }
        }

        let set: Vec<(KeyId, PropertyValue)> = schema
            .node_keys()
            .filter_map(|(_, key_id)| record.get_by_id(key_id).map(|value| (key_id, value)))
            .collect();
        w.put_u16(set.len() as u16);
        for (key_id, value) in &set {
            w.put_u16(key_id.0);
            put_value(&mut w, Some(value));
        }

        Ok(w.into_bytes())
    }
}

pub struct NodeDeserializer {
    registry: Arc<LabelRegistry>,
}

impl NodeDeserializer {
    pub fn new(registry: Arc<LabelRegistry>) -> Self {
        NodeDeserializer { registry }
    }

    /// Reconstructs a record from its byte image. Adjacent ids become
    /// references through `resolver`; nothing beyond this one node is loaded.
    pub fn deserialize(
        &self,
        bytes: &[u8],
        resolver: &dyn RefResolver,
    ) -> Result<(u64, CompactNodeRecord), SpillGraphError> {
        let mut r = ByteReader::new(bytes);
        let version = r.get_u8()?;
        if version != FORMAT_VERSION {
            return Err(SpillGraphError::serialization(format!(
                "unsupported format version {version}"
            )));
        }
        let id = r.get_u64()?;
        let label = r.get_str()?;
        let mut record = self.registry.new_record(&label).map_err(|_| {
            SpillGraphError::deserialization_unavailable(format!(
                "no factory registered for label '{label}'"
            ))
        })?;
        let schema = record.schema().clone();

        for (slot, info) in schema.slots().iter().enumerate() {
            let count = r.get_u32()? as usize;
            for _ in 0..count {
                let peer_id = r.get_u64()?;
                let peer_label = r.get_str()?;
                let mut block = vec![None; info.key_count].into_boxed_slice();
                for cell in block.iter_mut() {
                    *cell = get_value(&mut r)?;
                }
                let peer = resolver.resolve_ref(peer_id, &peer_label);
                record.push_edge_entry(slot, peer, block);
            }
        }

        let prop_count = r.get_u16()? as usize;
        for _ in 0..prop_count {
            let key_id = KeyId(r.get_u16()?);
            let value = get_value(&mut r)?.ok_or_else(|| {
                SpillGraphError::serialization("unset tag in node property list".to_string())
            })?;
            record.set_by_id(key_id, value)?;
        }

        record.mark_clean();
        Ok((id, record))
    }

    /// Decodes only the header, enough to build an empty reference for an
    /// entry found in an existing store.
    pub fn deserialize_ref_header(bytes: &[u8]) -> Result<(u64, String), SpillGraphError> {
        let mut r = ByteReader::new(bytes);
        let version = r.get_u8()?;
        if version != FORMAT_VERSION {
            return Err(SpillGraphError::serialization(format!(
                "unsupported format version {version}"
            )));
        }
        let id = r.get_u64()?;
        let label = r.get_str()?;
        Ok((id, label))
    }
}

fn put_value(w: &mut ByteWriter, value: Option<&PropertyValue>) {
    match value {
        None => w.put_u8(TAG_UNSET),
        Some(PropertyValue::Str(s)) => {
            w.put_u8(TAG_STR);
            w.put_str(s);
        }
        Some(PropertyValue::Int(i)) => {
            w.put_u8(TAG_INT);
            w.put_i64(*i);
        }
        Some(PropertyValue::Float(f)) => {
            w.put_u8(TAG_FLOAT);
            w.put_f64(*f);
        }
        Some(PropertyValue::Bool(b)) => {
            w.put_u8(TAG_BOOL);
            w.put_u8(*b as u8);
        }
        Some(PropertyValue::StrList(items)) => {
            w.put_u8(TAG_STR_LIST);
            w.put_u32(items.len() as u32);
            for item in items {
                w.put_str(item);
            }
        }
        Some(PropertyValue::IntList(items)) => {
            w.put_u8(TAG_INT_LIST);
            w.put_u32(items.len() as u32);
            for item in items {
                w.put_i64(*item);
            }
        }
    }
}

fn get_value(r: &mut ByteReader<'_>) -> Result<Option<PropertyValue>, SpillGraphError> {
    let tag = r.get_u8()?;
    let value = match tag {
        TAG_UNSET => return Ok(None),
        TAG_STR => PropertyValue::Str(r.get_str()?),
        TAG_INT => PropertyValue::Int(r.get_i64()?),
        TAG_FLOAT => PropertyValue::Float(r.get_f64()?),
        TAG_BOOL => PropertyValue::Bool(r.get_u8()? != 0),
        TAG_STR_LIST => {
            let count = r.get_u32()? as usize;
            let mut items = Vec::with_capacity(count);
            for _ in 0..count {
                items.push(r.get_str()?);
            }
            PropertyValue::StrList(items)
        }
        TAG_INT_LIST => {
            let count = r.get_u32()? as usize;
            let mut items = Vec::with_capacity(count);
            for _ in 0..count {
                items.push(r.get_i64()?);
            }
            PropertyValue::IntList(items)
        }
        other => {
            return Err(SpillGraphError::serialization(format!(
                "unknown value tag {other}"
            )));
        }
    };
    Ok(Some(value))
}

struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    fn new() -> Self {
        ByteWriter { buf: Vec::new() }
    }

    fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    fn put_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    fn put_u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    fn put_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    fn put_u64(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    fn put_i64(&mut self, value: i64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    fn put_f64(&mut self, value: f64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    fn put_str(&mut self, value: &str) {
        self.put_u32(value.len() as u32);
        self.buf.extend_from_slice(value.as_bytes());
    }
}

struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        ByteReader { buf, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], SpillGraphError> {
        let end = self.pos.checked_add(len).filter(|end| *end <= self.buf.len());
        match end {
            Some(end) => {
                let slice = &self.buf[self.pos..end];
                self.pos = end;
                Ok(slice)
            }
            None => Err(SpillGraphError::serialization(format!(
                "truncated image: need {} bytes at offset {}",
                len, self.pos
            ))),
        }
    }

    fn get_array<const N: usize>(&mut self) -> Result<[u8; N], SpillGraphError> {
        let slice = self.take(N)?;
        let mut array = [0u8; N];
        array.copy_from_slice(slice);
        Ok(array)
    }

    fn get_u8(&mut self) -> Result<u8, SpillGraphError> {
        Ok(self.take(1)?[0])
    }

    fn get_u16(&mut self) -> Result<u16, SpillGraphError> {
        Ok(u16::from_le_bytes(self.get_array()?))
    }

    fn get_u32(&mut self) -> Result<u32, SpillGraphError> {
        Ok(u32::from_le_bytes(self.get_array()?))
    }

    fn get_u64(&mut self) -> Result<u64, SpillGraphError> {
        Ok(u64::from_le_bytes(self.get_array()?))
    }

    fn get_i64(&mut self) -> Result<i64, SpillGraphError> {
        Ok(i64::from_le_bytes(self.get_array()?))
    }

    fn get_f64(&mut self) -> Result<f64, SpillGraphError> {
        Ok(f64::from_le_bytes(self.get_array()?))
    }

    fn get_str(&mut self) -> Result<String, SpillGraphError> {
        let len = self.get_u32()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| SpillGraphError::serialization(format!("invalid utf-8: {e}")))
    }
}
