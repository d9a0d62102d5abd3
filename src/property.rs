use serde::{Deserialize, Serialize};

/// Value types a node or edge property may hold. The set is closed on purpose:
/// the codec assigns each variant a fixed tag, and schemas reject anything
/// outside a label's declared keys before a value is ever stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    StrList(Vec<String>),
    IntList(Vec<i64>),
}

impl PropertyValue {
    /// Short name of the variant, used in schema-violation messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyValue::Str(_) => "str",
            PropertyValue::Int(_) => "int",
            PropertyValue::Float(_) => "float",
            PropertyValue::Bool(_) => "bool",
            PropertyValue::StrList(_) => "str-list",
            PropertyValue::IntList(_) => "int-list",
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Str(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Str(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Int(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Float(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

impl From<&PropertyValue> for serde_json::Value {
    fn from(value: &PropertyValue) -> Self {
        match value {
            PropertyValue::Str(s) => serde_json::Value::from(s.as_str()),
            PropertyValue::Int(i) => serde_json::Value::from(*i),
            PropertyValue::Float(f) => serde_json::Value::from(*f),
            PropertyValue::Bool(b) => serde_json::Value::from(*b),
            PropertyValue::StrList(items) => serde_json::Value::from(items.clone()),
            PropertyValue::IntList(items) => serde_json::Value::from(items.clone()),
        }
    }
}
