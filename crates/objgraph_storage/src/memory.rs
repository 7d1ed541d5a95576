//! In-memory record backend for testing.

use crate::backend::{validate_type_name, RecordBackend, RecordKey};
use crate::error::StorageResult;
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// An in-memory record backend.
///
/// This backend keeps all records in memory and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral stores that don't need persistence
///
/// # Thread Safety
///
/// This backend is thread-safe and can be shared across threads.
///
/// # Example
///
/// ```rust
/// use objgraph_storage::{InMemoryBackend, RecordBackend, RecordKey};
///
/// let backend = InMemoryBackend::new();
/// let key = RecordKey::new("Pessoa", "1").unwrap();
/// backend.write(&key, "{0:}").unwrap();
/// assert_eq!(backend.list_ids("Pessoa").unwrap(), vec!["1".to_string()]);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    records: RwLock<BTreeMap<String, BTreeMap<String, String>>>,
}

impl InMemoryBackend {
    /// Creates a new empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of records across all types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().values().map(BTreeMap::len).sum()
    }

    /// Returns true if no records are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clears all records from the backend.
    pub fn clear(&self) {
        self.records.write().clear();
    }
}

impl RecordBackend for InMemoryBackend {
    fn read(&self, key: &RecordKey) -> StorageResult<Option<String>> {
        Ok(self
            .records
            .read()
            .get(key.type_name())
            .and_then(|ids| ids.get(key.id()))
            .cloned())
    }

    fn write(&self, key: &RecordKey, text: &str) -> StorageResult<()> {
        self.records
            .write()
            .entry(key.type_name().to_string())
            .or_default()
            .insert(key.id().to_string(), text.to_string());
        Ok(())
    }

    fn exists(&self, key: &RecordKey) -> StorageResult<bool> {
        Ok(self
            .records
            .read()
            .get(key.type_name())
            .is_some_and(|ids| ids.contains_key(key.id())))
    }

    fn delete(&self, key: &RecordKey) -> StorageResult<bool> {
        Ok(self
            .records
            .write()
            .get_mut(key.type_name())
            .is_some_and(|ids| ids.remove(key.id()).is_some()))
    }

    fn list_ids(&self, type_name: &str) -> StorageResult<Vec<String>> {
        validate_type_name(type_name)?;
        Ok(self
            .records
            .read()
            .get(type_name)
            .map(|ids| ids.keys().cloned().collect())
            .unwrap_or_default())
    }
}
