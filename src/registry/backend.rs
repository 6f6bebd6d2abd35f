//! Durable storage backends for the registry
//!
//! The registry keeps the authoritative working set in memory and writes
//! every mutation through to a backend before applying it locally. A backend
//! only needs to persist whole entries keyed by [`EntryKey`].

use std::path::Path;

use sled::Tree;

use super::entry::Entry;
use super::error::RegistryError;
use super::key::EntryKey;

/// Tree name for persisted entries
pub const SCHEDULE_TREE: &str = "schedule";

/// Storage backend for queue entries
pub trait EntryBackend: Send + Sync {
    /// Load every persisted entry
    fn load_all(&self) -> Result<Vec<Entry>, RegistryError>;

    /// Insert or overwrite an entry
    fn put(&self, entry: &Entry) -> Result<(), RegistryError>;

    /// Remove an entry
    fn remove(&self, key: &EntryKey) -> Result<(), RegistryError>;

    /// Flush buffered writes to durable storage
    fn flush(&self) -> Result<(), RegistryError> {
        Ok(())
    }
}

/// Backend that persists nothing
///
/// The registry's in-memory map is the only copy of the data.
#[derive(Debug, Default, Clone, Copy)]
pub struct MemoryBackend;

impl EntryBackend for MemoryBackend {
    fn load_all(&self) -> Result<Vec<Entry>, RegistryError> {
        Ok(Vec::new())
    }

    fn put(&self, _entry: &Entry) -> Result<(), RegistryError> {
        Ok(())
    }

    fn remove(&self, _key: &EntryKey) -> Result<(), RegistryError> {
        Ok(())
    }
}

/// Backend storing entries as JSON records in a sled tree
///
/// Key format: `classcode\0classno_be_bytes`
pub struct SledBackend {
    db: sled::Db,
    tree: Tree,
}

impl SledBackend {
    /// Open the entry tree of an existing sled database
    pub fn open(db: &sled::Db) -> Result<Self, RegistryError> {
        let tree = db.open_tree(SCHEDULE_TREE)?;
        Ok(Self {
            db: db.clone(),
            tree,
        })
    }

    /// Open (or create) a sled database at `path`
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let db = sled::Config::new().path(path.as_ref()).open()?;
        Self::open(&db)
    }

    fn build_key(key: &EntryKey) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(key.class_code.len() + 5);
        bytes.extend_from_slice(key.class_code.as_bytes());
        bytes.push(0);
        bytes.extend_from_slice(&key.class_no.to_be_bytes());
        bytes
    }
}

impl EntryBackend for SledBackend {
    fn load_all(&self) -> Result<Vec<Entry>, RegistryError> {
        self.tree
            .iter()
            .values()
            .map(|value| -> Result<Entry, RegistryError> {
                Ok(serde_json::from_slice(&value?)?)
            })
            .collect()
    }

    fn put(&self, entry: &Entry) -> Result<(), RegistryError> {
        let value = serde_json::to_vec(entry)?;
        self.tree.insert(Self::build_key(&entry.key), value)?;
        Ok(())
    }

    fn remove(&self, key: &EntryKey) -> Result<(), RegistryError> {
        self.tree.remove(Self::build_key(key))?;
        Ok(())
    }

    fn flush(&self) -> Result<(), RegistryError> {
        self.db.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> sled::Db {
        sled::Config::new().temporary(true).open().unwrap()
    }

    #[test]
    fn test_put_load_remove() {
        let backend = SledBackend::open(&test_db()).unwrap();
        let mut entry = Entry::new(EntryKey::new("1A", 5));
        entry.priority = 2;
        entry.is_meeting = true;

        backend.put(&entry).unwrap();
        assert_eq!(backend.load_all().unwrap(), vec![entry.clone()]);

        backend.remove(&entry.key).unwrap();
        assert!(backend.load_all().unwrap().is_empty());
    }

    #[test]
    fn test_keys_do_not_collide() {
        let backend = SledBackend::open(&test_db()).unwrap();

        // "1A" + 12 and "1A1" + 2 render the same label but must stay distinct
        backend.put(&Entry::new(EntryKey::new("1A", 12))).unwrap();
        backend.put(&Entry::new(EntryKey::new("1A1", 2))).unwrap();

        assert_eq!(backend.load_all().unwrap().len(), 2);
    }

    #[test]
    fn test_persistence() {
        let dir = tempfile::tempdir().unwrap();
        let entry = Entry::new(EntryKey::new("4D", 9));

        {
            let backend = SledBackend::open_path(dir.path()).unwrap();
            backend.put(&entry).unwrap();
            backend.flush().unwrap();
        }

        let backend = SledBackend::open_path(dir.path()).unwrap();
        assert_eq!(backend.load_all().unwrap(), vec![entry]);
    }

    #[test]
    fn test_memory_backend_is_empty() {
        let backend = MemoryBackend;
        backend.put(&Entry::new(EntryKey::new("1A", 1))).unwrap();
        assert!(backend.load_all().unwrap().is_empty());
    }
}
