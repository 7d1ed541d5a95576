//! Type registry.
//!
//! Maps type names to the indices written into records and back. Indices are
//! handed out from [`builtin::FIRST_USER_INDEX`] upward; a registry seeded
//! from a [`TypeManifest`] gives known names their persisted index.

use crate::error::{CoreError, CoreResult};
use crate::manifest::TypeManifest;
use crate::schema::TypeSchema;
use objgraph_codec::{builtin, TypeIndex};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Default)]
struct RegistryInner {
    by_name: HashMap<String, TypeIndex>,
    by_index: HashMap<TypeIndex, Arc<TypeSchema>>,
    manifest: TypeManifest,
}

/// Outcome of a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registration {
    /// Index of the type.
    pub index: TypeIndex,
    /// True if the name had no index before, so the manifest changed.
    pub new_index: bool,
}

/// Thread-safe name/index/schema registry.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    inner: RwLock<RegistryInner>,
}

impl TypeRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry that reuses the indices of a persisted manifest.
    #[must_use]
    pub fn with_manifest(manifest: TypeManifest) -> Self {
        Self {
            inner: RwLock::new(RegistryInner {
                manifest,
                ..RegistryInner::default()
            }),
        }
    }

    /// Registers a schema and returns its index.
    ///
    /// Registering a name again keeps its index and replaces the schema.
    pub fn register(&self, schema: TypeSchema) -> TypeIndex {
        self.register_schema(schema).index
    }

    /// Registers a schema, reporting whether a new index was assigned.
    pub fn register_schema(&self, schema: TypeSchema) -> Registration {
        let mut inner = self.inner.write();
        let name = schema.name().to_string();

        let (index, new_index) = match inner.manifest.get(&name) {
            Some(index) => (index, false),
            None => {
                let index = inner.manifest.next_index();
                inner.manifest.insert(name.clone(), index);
                (index, true)
            }
        };

        if let Some(previous) = inner.by_index.get(&index) {
            if **previous != schema {
                tracing::debug!(type_name = %name, index, "replacing registered schema");
            }
        }
        inner.by_name.insert(name, index);
        inner.by_index.insert(index, Arc::new(schema));
        Registration { index, new_index }
    }

    /// Index of a registered type.
    ///
    /// # Errors
    ///
    /// Returns `TypeNotRegistered` for an unknown name.
    pub fn index_of(&self, name: &str) -> CoreResult<TypeIndex> {
        self.inner
            .read()
            .by_name
            .get(name)
            .copied()
            .ok_or_else(|| CoreError::type_not_registered(name))
    }

    /// Schema registered under an index.
    ///
    /// # Errors
    ///
    /// Returns `TypeNotRegistered` for an unknown or builtin index.
    pub fn type_of(&self, index: TypeIndex) -> CoreResult<Arc<TypeSchema>> {
        self.inner
            .read()
            .by_index
            .get(&index)
            .cloned()
            .ok_or_else(|| CoreError::type_not_registered(format!("#{index}")))
    }

    /// Schema registered under a name.
    ///
    /// # Errors
    ///
    /// Returns `TypeNotRegistered` for an unknown name.
    pub fn schema(&self, name: &str) -> CoreResult<Arc<TypeSchema>> {
        let index = self.index_of(name)?;
        self.type_of(index)
    }

    /// True if the name is registered in this process.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.inner.read().by_name.contains_key(name)
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.inner.read().by_name.keys().cloned().collect();
        names.sort();
        names
    }

    /// Snapshot of the name/index table, including names known only from a
    /// loaded manifest.
    #[must_use]
    pub fn manifest(&self) -> TypeManifest {
        self.inner.read().manifest.clone()
    }

    /// A known type name that differs from `name` only in ASCII case.
    #[must_use]
    pub fn case_conflict(&self, name: &str) -> Option<String> {
        self.inner
            .read()
            .manifest
            .case_conflict(name)
            .map(str::to_string)
    }

    /// The manifest as it would read after registering `name`, or `None` if
    /// the name already has an index.
    #[must_use]
    pub fn manifest_with(&self, name: &str) -> Option<TypeManifest> {
        let inner = self.inner.read();
        if inner.manifest.get(name).is_some() {
            return None;
        }
        let mut manifest = inner.manifest.clone();
        let index = manifest.next_index();
        manifest.insert(name, index);
        Some(manifest)
    }
}

/// Type name for an index, builtin or registered. Used in diagnostics.
#[must_use]
pub fn describe_index(registry: &TypeRegistry, index: TypeIndex) -> String {
    match builtin::name(index) {
        Some(name) => name.to_string(),
        None => registry
            .type_of(index)
            .map_or_else(|_| format!("#{index}"), |schema| schema.name().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::AttrType;
    use std::thread;

    fn schema(name: &str) -> TypeSchema {
        TypeSchema::builder(name)
            .attribute("id", AttrType::Text)
            .build()
            .unwrap()
    }

    #[test]
    fn indices_start_after_builtins() {
        let registry = TypeRegistry::new();
        assert_eq!(registry.register(schema("A")), builtin::FIRST_USER_INDEX);
        assert_eq!(registry.register(schema("B")), builtin::FIRST_USER_INDEX + 1);
        assert_eq!(registry.index_of("B").unwrap(), 33);
        assert_eq!(registry.type_of(32).unwrap().name(), "A");
        assert_eq!(registry.schema("A").unwrap().name(), "A");
    }

    #[test]
    fn reregistering_keeps_index() {
        let registry = TypeRegistry::new();
        let first = registry.register_schema(schema("A"));
        let again = registry.register_schema(schema("A"));
        assert!(first.new_index);
        assert!(!again.new_index);
        assert_eq!(first.index, again.index);
    }

    #[test]
    fn unknown_lookups_fail() {
        let registry = TypeRegistry::new();
        assert!(matches!(
            registry.index_of("Nope"),
            Err(CoreError::TypeNotRegistered { .. })
        ));
        assert!(registry.type_of(builtin::STRING).is_err());
        assert!(registry.type_of(99).is_err());
    }

    #[test]
    fn manifest_indices_survive_registration_order() {
        let mut manifest = TypeManifest::new();
        manifest.insert("A", 32);
        manifest.insert("B", 33);

        let registry = TypeRegistry::with_manifest(manifest);
        assert_eq!(registry.register(schema("C")), 34);
        assert_eq!(registry.register(schema("B")), 33);
        assert_eq!(registry.register(schema("A")), 32);
        assert_eq!(registry.names(), vec!["A", "B", "C"]);
        assert_eq!(registry.manifest().len(), 3);
    }

    #[test]
    fn describe_builtin_and_user_indices() {
        let registry = TypeRegistry::new();
        registry.register(schema("A"));
        assert_eq!(describe_index(&registry, builtin::MAP), "map");
        assert_eq!(describe_index(&registry, 32), "A");
        assert_eq!(describe_index(&registry, 77), "#77");
    }

    #[test]
    fn concurrent_registration_assigns_distinct_indices() {
        let registry = Arc::new(TypeRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || registry.register(schema(&format!("T{i}"))))
            })
            .collect();
        let mut indices: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        indices.sort_unstable();
        indices.dedup();
        assert_eq!(indices.len(), 8);
    }
}
