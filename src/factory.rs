//! Label registration. Each label is registered exactly once, pairing an
//! immutable [`LabelSchema`] with a [`NodeFactory`] that builds its typed
//! field storage. The registry is populated at startup and shared read-only;
//! everything downstream dispatches purely on label strings.

use std::sync::Arc;

use ahash::AHashMap;

use crate::errors::SpillGraphError;
use crate::node::{CompactNodeRecord, DenseFields, LabelFields};
use crate::schema::{LabelSchema, SchemaDecl};

/// Builds the node-property storage for one label.
pub trait NodeFactory: Send + Sync {
    fn label(&self) -> &str;
    fn new_fields(&self) -> Box<dyn LabelFields>;
}

/// Factory producing [`DenseFields`], for labels without hand-written field
/// structs.
pub struct DenseNodeFactory {
    label: String,
    key_count: usize,
}

impl DenseNodeFactory {
    pub fn new<T: Into<String>>(label: T, key_count: usize) -> Self {
        DenseNodeFactory {
            label: label.into(),
            key_count,
        }
    }
}

impl NodeFactory for DenseNodeFactory {
    fn label(&self) -> &str {
        &self.label
    }

    fn new_fields(&self) -> Box<dyn LabelFields> {
        Box::new(DenseFields::new(self.key_count))
    }
}

#[derive(Default)]
pub struct LabelRegistry {
    schemas: AHashMap<String, Arc<LabelSchema>>,
    factories: AHashMap<String, Arc<dyn NodeFactory>>,
}

impl LabelRegistry {
    pub fn new() -> Self {
        LabelRegistry::default()
    }

    /// Registers a label: computes its slot/offset tables once and stores
    /// them with the factory. A label registers to exactly one schema.
    pub fn register(
        &mut self,
        decl: &SchemaDecl,
        factory: Arc<dyn NodeFactory>,
    ) -> Result<Arc<LabelSchema>, SpillGraphError> {
        if self.schemas.contains_key(&decl.label) {
            return Err(SpillGraphError::invalid_input(format!(
                "label '{}' already registered",
                decl.label
            )));
        }
        let schema = Arc::new(LabelSchema::build(decl));
        self.schemas.insert(decl.label.clone(), schema.clone());
        self.factories.insert(decl.label.clone(), factory);
        Ok(schema)
    }

    /// Registers a label backed by array-based fields sized from the
    /// declaration.
    pub fn register_dense(
        &mut self,
        decl: &SchemaDecl,
    ) -> Result<Arc<LabelSchema>, SpillGraphError> {
        let factory = Arc::new(DenseNodeFactory {
            label: decl.label.clone(),
            key_count: decl.node_keys.len(),
        });
        self.register(decl, factory)
    }

    pub fn schema(&self, label: &str) -> Option<Arc<LabelSchema>> {
        self.schemas.get(label).cloned()
    }

    pub fn factory(&self, label: &str) -> Option<Arc<dyn NodeFactory>> {
        self.factories.get(label).cloned()
    }

    pub fn labels(&self) -> Vec<&str> {
        self.schemas.keys().map(String::as_str).collect()
    }

    /// Builds an empty record for `label` through its registered factory.
    pub fn new_record(&self, label: &str) -> Result<CompactNodeRecord, SpillGraphError> {
        let schema = self.schema(label).ok_or_else(|| {
            SpillGraphError::schema_violation(format!("label '{label}' is not registered"))
        })?;
        let factory = self.factory(label).ok_or_else(|| {
            SpillGraphError::schema_violation(format!("label '{label}' has no factory"))
        })?;
        Ok(CompactNodeRecord::new(schema, factory.new_fields()))
    }
}
