//! Persisted type table.
//!
//! The `TYPES` file maps every registered type name to the index its records
//! carry, so records written in one process decode against the same types in
//! the next one, whatever order the types are registered in.
//!
//! ```text
//! objgraph-types 1
//! 32 Pessoa
//! 33 Endereco
//! ```

use crate::error::{CoreError, CoreResult};
use objgraph_codec::{builtin, TypeIndex};
use std::collections::BTreeMap;

/// Header line of the manifest.
pub const MANIFEST_MAGIC: &str = "objgraph-types";

/// Current manifest version.
pub const MANIFEST_VERSION: u16 = 1;

/// Name to index table of registered types.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TypeManifest {
    types: BTreeMap<String, TypeIndex>,
}

impl TypeManifest {
    /// Creates an empty manifest.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the index of a type name.
    pub fn insert(&mut self, name: impl Into<String>, index: TypeIndex) {
        self.types.insert(name.into(), index);
    }

    /// Looks up the index of a type name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<TypeIndex> {
        self.types.get(name).copied()
    }

    /// Returns the lowest user index not taken by any entry.
    #[must_use]
    pub fn next_index(&self) -> TypeIndex {
        self.types
            .values()
            .max()
            .map_or(builtin::FIRST_USER_INDEX, |max| max + 1)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// True if no type has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// A recorded name that differs from `name` only in ASCII case.
    ///
    /// Such names would share a record directory on case-insensitive file
    /// systems.
    #[must_use]
    pub fn case_conflict(&self, name: &str) -> Option<&str> {
        self.types
            .keys()
            .map(String::as_str)
            .find(|other| *other != name && other.eq_ignore_ascii_case(name))
    }

    /// Iterates entries ordered by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, TypeIndex)> {
        self.types.iter().map(|(name, index)| (name.as_str(), *index))
    }

    /// Encodes the manifest, entries ordered by index.
    #[must_use]
    pub fn encode(&self) -> String {
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_by_key(|(_, index)| *index);

        let mut out = format!("{MANIFEST_MAGIC} {MANIFEST_VERSION}\n");
        for (name, index) in entries {
            out.push_str(&format!("{index} {name}\n"));
        }
        out
    }

    /// Decodes a manifest.
    ///
    /// # Errors
    ///
    /// Returns `InvalidFormat` on a bad header, an unsupported version, a
    /// malformed line, a builtin index, or two names sharing an index.
    pub fn decode(text: &str) -> CoreResult<Self> {
        let mut lines = text.lines();
        let header = lines
            .next()
            .ok_or_else(|| CoreError::invalid_format("empty type manifest"))?;
        let version = header
            .strip_prefix(MANIFEST_MAGIC)
            .map(str::trim)
            .ok_or_else(|| CoreError::invalid_format("invalid type manifest header"))?;
        let version: u16 = version
            .parse()
            .map_err(|_| CoreError::invalid_format("invalid type manifest version"))?;
        if version > MANIFEST_VERSION {
            return Err(CoreError::invalid_format(format!(
                "unsupported type manifest version: {version}"
            )));
        }

        let mut manifest = Self::new();
        let mut taken = BTreeMap::new();
        for (number, line) in lines.enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let (index, name) = line
                .split_once(' ')
                .ok_or_else(|| malformed_line(number, line))?;
            let index: TypeIndex = index.parse().map_err(|_| malformed_line(number, line))?;
            if builtin::is_builtin(index) || name.is_empty() {
                return Err(malformed_line(number, line));
            }
            if let Some(other) = taken.insert(index, name) {
                return Err(CoreError::invalid_format(format!(
                    "types {other} and {name} share index {index}"
                )));
            }
            manifest.insert(name, index);
        }
        Ok(manifest)
    }
}

fn malformed_line(number: usize, line: &str) -> CoreError {
    CoreError::invalid_format(format!(
        "malformed type manifest line {}: {line:?}",
        number + 2
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_encode_decode() {
        let mut manifest = TypeManifest::new();
        manifest.insert("Endereco", 33);
        manifest.insert("Pessoa", 32);

        let text = manifest.encode();
        assert_eq!(text, "objgraph-types 1\n32 Pessoa\n33 Endereco\n");

        let decoded = TypeManifest::decode(&text).unwrap();
        assert_eq!(decoded, manifest);
        assert_eq!(decoded.get("Pessoa"), Some(32));
        assert_eq!(decoded.next_index(), 34);
    }

    #[test]
    fn empty_manifest_starts_at_first_user_index() {
        assert_eq!(TypeManifest::new().next_index(), builtin::FIRST_USER_INDEX);
    }

    #[test]
    fn manifest_rejects_garbage() {
        assert!(TypeManifest::decode("").is_err());
        assert!(TypeManifest::decode("something else\n").is_err());
        assert!(TypeManifest::decode("objgraph-types 9\n").is_err());
        assert!(TypeManifest::decode("objgraph-types 1\nPessoa\n").is_err());
        assert!(TypeManifest::decode("objgraph-types 1\n6 Pessoa\n").is_err());
        assert!(TypeManifest::decode("objgraph-types 1\n40 A\n40 B\n").is_err());
    }
}
