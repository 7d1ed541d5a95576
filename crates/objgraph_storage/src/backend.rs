//! Storage backend trait definition.

use crate::error::{StorageError, StorageResult};
use std::fmt;

/// Address of one persisted record: the owning type and the entity identity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordKey {
    type_name: String,
    id: String,
}

impl RecordKey {
    /// Creates a key.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKey` if the type name is empty or contains characters
    /// other than ASCII alphanumerics, `_`, `-` and `.`, or if the identity is
    /// empty.
    pub fn new(type_name: impl Into<String>, id: impl Into<String>) -> StorageResult<Self> {
        let type_name = type_name.into();
        let id = id.into();
        validate_type_name(&type_name)?;
        if id.is_empty() {
            return Err(StorageError::InvalidKey(format!(
                "empty identity for type {type_name}"
            )));
        }
        Ok(Self { type_name, id })
    }

    /// Returns the type name.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Returns the identity.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.type_name, self.id)
    }
}

/// Checks that a type name is usable as a directory name on every platform.
pub(crate) fn validate_type_name(type_name: &str) -> StorageResult<()> {
    let valid = !type_name.is_empty()
        && !type_name.starts_with('.')
        && type_name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(format!(
            "invalid type name {type_name:?}"
        )))
    }
}

/// A record store for objgraph.
///
/// Backends are **opaque text stores** keyed by (type, identity). They do not
/// interpret record contents.
///
/// # Invariants
///
/// - `write` atomically creates or replaces the whole record; a reader sees
///   either the old text or the new text, never a mix
/// - `read` returns exactly the text last written for the key
/// - `delete` is idempotent
/// - Operations on different keys may run concurrently; writers to the same
///   key must be serialized by the caller
///
/// # Implementors
///
/// - [`super::InMemoryBackend`] - For testing
/// - [`super::FileBackend`] - One file per record
pub trait RecordBackend: Send + Sync {
    /// Reads a record.
    ///
    /// Returns `None` if no record exists for the key.
    ///
    /// # Errors
    ///
    /// Returns an error if an I/O error occurs.
    fn read(&self, key: &RecordKey) -> StorageResult<Option<String>>;

    /// Creates or replaces a record.
    ///
    /// # Errors
    ///
    /// Returns an error if an I/O error occurs. On error the previous record,
    /// if any, is left unchanged.
    fn write(&self, key: &RecordKey, text: &str) -> StorageResult<()>;

    /// Checks whether a record exists without reading its content.
    ///
    /// # Errors
    ///
    /// Returns an error if an I/O error occurs.
    fn exists(&self, key: &RecordKey) -> StorageResult<bool>;

    /// Removes a record.
    ///
    /// Returns `true` if a record was removed, `false` if none existed.
    ///
    /// # Errors
    ///
    /// Returns an error if an I/O error occurs.
    fn delete(&self, key: &RecordKey) -> StorageResult<bool>;

    /// Lists the identities of all records of a type, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the type name is invalid or an I/O error occurs.
    fn list_ids(&self, type_name: &str) -> StorageResult<Vec<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_validation() {
        assert!(RecordKey::new("Pessoa", "abc").is_ok());
        assert!(RecordKey::new("app.Pessoa_v2", "x y/z").is_ok());
        assert!(RecordKey::new("", "abc").is_err());
        assert!(RecordKey::new("../etc", "abc").is_err());
        assert!(RecordKey::new("Pessoa", "").is_err());
    }

    #[test]
    fn key_display() {
        let key = RecordKey::new("Pessoa", "42").unwrap();
        assert_eq!(key.to_string(), "Pessoa/42");
        assert_eq!(key.type_name(), "Pessoa");
        assert_eq!(key.id(), "42");
    }
}
