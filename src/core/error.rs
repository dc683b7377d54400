use thiserror::Error;

use super::types::RecordId;

#[derive(Error, Debug)]
pub enum RecordError {
    #[error("Undefined property: {entity}::${property}")]
    UndefinedProperty { entity: String, property: String },

    #[error("Attempt to {operation}() a {entity} record without an ID")]
    MissingIdentity {
        entity: String,
        operation: &'static str,
    },

    #[error("Cannot find record #{id} of {entity}")]
    RecordNotFound { entity: String, id: RecordId },

    #[error("Attempt to save() {entity} record #{id} that has not been loaded")]
    NotLoaded { entity: String, id: RecordId },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Lock error: {0}")]
    LockError(String),
}

impl RecordError {
    pub fn undefined_property(entity: &str, property: &str) -> Self {
        Self::UndefinedProperty {
            entity: entity.to_string(),
            property: property.to_string(),
        }
    }

    pub fn missing_identity(entity: &str, operation: &'static str) -> Self {
        Self::MissingIdentity {
            entity: entity.to_string(),
            operation,
        }
    }

    pub fn not_found(entity: &str, id: RecordId) -> Self {
        Self::RecordNotFound {
            entity: entity.to_string(),
            id,
        }
    }
}

pub type Result<T> = std::result::Result<T, RecordError>;

impl<T> From<std::sync::PoisonError<T>> for RecordError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}

impl From<serde_json::Error> for RecordError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidArgument(err.to_string())
    }
}
