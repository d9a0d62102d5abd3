use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpillGraphError {
    #[error("schema violation: {0}")]
    SchemaViolation(String),
    #[error("deserialization unavailable: {0}")]
    DeserializationUnavailable(String),
    #[error("store closed: {0}")]
    StoreClosed(String),
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl SpillGraphError {
    pub fn schema_violation<T: Into<String>>(msg: T) -> Self {
        SpillGraphError::SchemaViolation(msg.into())
    }

    pub fn deserialization_unavailable<T: Into<String>>(msg: T) -> Self {
        SpillGraphError::DeserializationUnavailable(msg.into())
    }

    pub fn store_closed<T: Into<String>>(msg: T) -> Self {
        SpillGraphError::StoreClosed(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        SpillGraphError::Serialization(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        SpillGraphError::NotFound(msg.into())
    }

    pub fn invalid_input<T: Into<String>>(msg: T) -> Self {
        SpillGraphError::InvalidInput(msg.into())
    }
}
