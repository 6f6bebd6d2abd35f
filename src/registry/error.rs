//! Registry error types
//!
//! Error types for queue registry operations.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::key::EntryKey;

/// Error type for registry operations
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    /// Malformed key, unsupported filter operator, or unknown flag name
    #[error("validation error: {0}")]
    Validation(String),
    /// Entry not found
    #[error("entry not found: {0}")]
    NotFound(EntryKey),
    /// Entry already exists
    #[error("entry already exists: {0}")]
    Conflict(EntryKey),
    /// Underlying backend failure
    #[error("storage error: {0}")]
    Storage(String),
}

/// Stable classification of registry errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Storage,
}

impl RegistryError {
    /// Get the error kind
    pub fn kind(&self) -> ErrorKind {
        match self {
            RegistryError::Validation(_) => ErrorKind::Validation,
            RegistryError::NotFound(_) => ErrorKind::NotFound,
            RegistryError::Conflict(_) => ErrorKind::Conflict,
            RegistryError::Storage(_) => ErrorKind::Storage,
        }
    }
}

impl From<sled::Error> for RegistryError {
    fn from(err: sled::Error) -> Self {
        RegistryError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for RegistryError {
    fn from(err: serde_json::Error) -> Self {
        RegistryError::Storage(format!("corrupt entry record: {}", err))
    }
}
