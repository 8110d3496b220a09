use thiserror::Error;

use crate::storage::StorageType;

#[derive(Debug, Error)]
pub enum EnumError {
    #[error("Invalid json: {0}")]
    InputFormat(#[source] serde_json::Error),

    #[error("Invalid path \"{path}\": {msg}")]
    PathEvaluation {
        path: String,
        msg:  String,
    },

    #[error("Invalid enum name \"{0}\"")]
    InvalidName(String),

    #[error("Invalid enum-entry name \"{0}\"")]
    InvalidEntryName(String),

    #[error("Invalid namespace \"{0}\"")]
    InvalidNamespace(String),

    #[error("Invalid assembly name \"{0}\"")]
    InvalidAssemblyName(String),

    #[error("Enum \"{enum_name}\" already contains an entry named \"{name}\"")]
    DuplicateName {
        enum_name: String,
        name:      String,
    },

    #[error("Enum \"{enum_name}\" already contains an entry with value {value}")]
    DuplicateValue {
        enum_name: String,
        value:     i64,
    },

    #[error("Enum \"{0}\" has no entries")]
    EmptyDefinition(String),

    #[error("Value {value} does not fit in storage type \"{storage}\"")]
    OutOfBoundsValue {
        storage: StorageType,
        value:   i64,
    },

    #[error("Mapping failed: {0}")]
    MappingFailure(#[source] Box<EnumError>),

    #[error("Image encode error: {0}")]
    EncodeError(String),

    #[error("Image decode error: {0}")]
    DecodeError(String),
}

impl EnumError {
    /// True for the errors raised when a name fails identifier validation.
    pub fn is_invalid_identifier(&self) -> bool {
        matches!(
            self,
            EnumError::InvalidName(_)
                | EnumError::InvalidEntryName(_)
                | EnumError::InvalidNamespace(_)
                | EnumError::InvalidAssemblyName(_)
        )
    }

    /// Unwraps any number of `MappingFailure` layers.
    pub fn root_cause(&self) -> &EnumError {
        match self {
            EnumError::MappingFailure(inner) => inner.root_cause(),
            other => other,
        }
    }
}
