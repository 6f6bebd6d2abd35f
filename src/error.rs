//! Crate-level error types

use thiserror::Error;

use crate::registry::RegistryError;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug, Error)]
pub enum Error {
    /// Registry operation failed
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The hub coordinator task has stopped
    #[error("hub is closed")]
    HubClosed,

    /// Malformed wire message
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns true if this error was caused by the client rather than the server
    pub fn is_client_error(&self) -> bool {
        match self {
            Error::Registry(e) => !matches!(e, RegistryError::Storage(_)),
            Error::Codec(_) => true,
            Error::HubClosed | Error::Io(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::EntryKey;

    #[test]
    fn test_client_error_classification() {
        let key = EntryKey::new("1A", 5);

        assert!(Error::from(RegistryError::NotFound(key.clone())).is_client_error());
        assert!(Error::from(RegistryError::Conflict(key)).is_client_error());
        assert!(Error::from(RegistryError::Validation("bad".into())).is_client_error());
        assert!(!Error::from(RegistryError::Storage("disk".into())).is_client_error());
        assert!(!Error::HubClosed.is_client_error());
    }

    #[test]
    fn test_registry_error_is_transparent() {
        let err = Error::from(RegistryError::NotFound(EntryKey::new("2B", 1)));
        assert_eq!(err.to_string(), "entry not found: 2B1");
    }
}
