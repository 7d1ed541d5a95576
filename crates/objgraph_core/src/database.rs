//! Database facade.

use crate::cascade::CascadeDeleter;
use crate::codec::{Decoder, EncodedEntity, Encoder};
use crate::config::Config;
use crate::dir::DatabaseDir;
use crate::error::{CoreError, CoreResult};
use crate::filter::Filter;
use crate::graph::{Graph, NodeId};
use crate::identity::IdentityResolver;
use crate::query::Query;
use crate::registry::TypeRegistry;
use crate::schema::TypeSchema;
use crate::unique::{TypeLocks, UniquenessGuard};
use crate::value::Value;
use objgraph_codec::{parse_record, write_record, TypeIndex};
use objgraph_storage::{FileBackend, InMemoryBackend, RecordBackend, RecordKey};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// An entity loaded from the store, together with the graph holding it and
/// every composite decoded alongside it.
#[derive(Debug, Clone)]
pub struct Loaded {
    /// Graph of the decoded record.
    pub graph: Graph,
    /// The loaded entity.
    pub node: NodeId,
}

impl Loaded {
    /// Reads an attribute of the loaded entity.
    ///
    /// # Errors
    ///
    /// Returns `UnknownAttribute` if the type declares no such attribute.
    pub fn get(&self, attribute: &str) -> CoreResult<&Value> {
        self.graph.get(self.node, attribute)
    }

    /// Identity of the loaded entity.
    #[must_use]
    pub fn identity(&self) -> Option<&str> {
        self.graph.identity(self.node)
    }
}

/// The main database handle.
///
/// `Database` persists object graphs one entity record at a time:
/// - `save` assigns identities, writes every owned sub-entity as its own
///   record and the entity itself last
/// - `load` rebuilds an entity (with its owned sub-entities inline) into a
///   fresh [`Graph`]
/// - `delete_cascade` removes an entity with everything it owns
///
/// # Opening a Database
///
/// ```rust,no_run
/// use objgraph_core::{AttrType, Database, Graph, TypeSchema};
/// use std::path::Path;
///
/// let db = Database::open(Path::new("my_database"))?;
/// db.register(
///     TypeSchema::builder("Pessoa")
///         .attribute("id", AttrType::Text)
///         .attribute("nome", AttrType::Text)
///         .build()?,
/// )?;
///
/// let mut graph = Graph::new();
/// let pessoa = db.create(&mut graph, "Pessoa")?;
/// graph.set(pessoa, "nome", "Carla")?;
/// let id = db.save(&mut graph, pessoa)?;
///
/// let loaded = db.load("Pessoa", &id)?.expect("just saved");
/// assert_eq!(loaded.get("nome")?.as_text(), Some("Carla"));
/// # Ok::<(), objgraph_core::CoreError>(())
/// ```
///
/// # In-Memory Databases
///
/// For testing, use `Database::open_in_memory()`.
///
/// # Thread Safety
///
/// `Database` is `Send + Sync`. Saves of different entities proceed in
/// parallel; concurrent saves of the same identity must be serialized by the
/// caller.
pub struct Database {
    config: Config,
    /// Database directory (holds the lock). None for in-memory databases.
    dir: Option<DatabaseDir>,
    registry: TypeRegistry,
    backend: Box<dyn RecordBackend>,
    type_locks: TypeLocks,
    /// Serializes manifest rewrites.
    manifest_lock: Mutex<()>,
}

impl Database {
    /// Opens or creates a database directory with default configuration.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseLocked` if another process holds the directory, or an
    /// I/O or format error.
    pub fn open(path: &Path) -> CoreResult<Self> {
        Self::open_with_config(path, Config::default())
    }

    /// Opens or creates a database directory.
    ///
    /// Type indices recorded in the directory's TYPES file are reused when
    /// the same names are registered again.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseLocked` if another process holds the directory, or an
    /// I/O or format error.
    pub fn open_with_config(path: &Path, config: Config) -> CoreResult<Self> {
        let dir = DatabaseDir::open(path, config.create_if_missing, config.lock_directory)?;
        let manifest = dir.load_manifest()?.unwrap_or_default();
        let backend = FileBackend::with_options(
            &dir.records_dir(),
            &config.record_extension,
            config.sync_on_write,
        )?;
        debug!(path = %path.display(), types = manifest.len(), "opened database");

        Ok(Self {
            config,
            registry: TypeRegistry::with_manifest(manifest),
            dir: Some(dir),
            backend: Box::new(backend),
            type_locks: TypeLocks::new(),
            manifest_lock: Mutex::new(()),
        })
    }

    /// Creates an in-memory database.
    #[must_use]
    pub fn open_in_memory() -> Self {
        Self::with_backend(Config::default(), Box::new(InMemoryBackend::new()))
    }

    /// Creates a database over any record backend.
    ///
    /// Type indices are not persisted; register types in the same order on
    /// every start.
    #[must_use]
    pub fn with_backend(config: Config, backend: Box<dyn RecordBackend>) -> Self {
        Self {
            config,
            dir: None,
            registry: TypeRegistry::new(),
            backend,
            type_locks: TypeLocks::new(),
            manifest_lock: Mutex::new(()),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the directory path, or `None` when not file backed.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.dir.as_ref().map(DatabaseDir::path)
    }

    /// Returns the type registry.
    #[must_use]
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Registers a type and returns its index.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSchema` if the name differs from a known type only in
    /// case, and an I/O error if a new index cannot be recorded in the TYPES
    /// file. A failed registration assigns no index.
    pub fn register(&self, schema: TypeSchema) -> CoreResult<TypeIndex> {
        let _guard = self.manifest_lock.lock();
        let name = schema.name().to_string();
        if let Some(other) = self.registry.case_conflict(&name) {
            return Err(CoreError::invalid_schema(format!(
                "type {name} differs from registered type {other} only by case"
            )));
        }
        // A new index is only handed out once the TYPES file records it.
        if let (Some(dir), Some(candidate)) = (&self.dir, self.registry.manifest_with(&name)) {
            dir.save_manifest(&candidate)?;
        }
        let registration = self.registry.register_schema(schema);
        debug!(type_name = %name, index = registration.index, "registered type");
        Ok(registration.index)
    }

    /// Returns the schema of a registered type.
    ///
    /// # Errors
    ///
    /// Returns `TypeNotRegistered` for an unknown name.
    pub fn schema(&self, type_name: &str) -> CoreResult<Arc<TypeSchema>> {
        self.registry.schema(type_name)
    }

    /// Adds a default-constructed instance of a registered type to `graph`.
    ///
    /// # Errors
    ///
    /// Returns `TypeNotRegistered` for an unknown name.
    pub fn create(&self, graph: &mut Graph, type_name: &str) -> CoreResult<NodeId> {
        Ok(graph.create(self.registry.schema(type_name)?))
    }

    /// Saves an entity and every entity it owns.
    ///
    /// Blank identities are generated first. All records are encoded and
    /// checked for unique attribute collisions before the first write, so a
    /// rejected save leaves the store unchanged. Owned sub-entities are
    /// written before the entities that enclose them and `node` is written
    /// last.
    ///
    /// Returns the identity of `node`.
    ///
    /// # Errors
    ///
    /// Returns `IdentityAttributeMissing` if the type has no identity,
    /// `DuplicatedUniqueField` on a unique collision, encoding errors such as
    /// `UnsupportedValueType` or `DanglingReference`, and storage errors.
    pub fn save(&self, graph: &mut Graph, node: NodeId) -> CoreResult<String> {
        let id = IdentityResolver::assign_all(graph, node)?;
        let encoding = Encoder::new(&self.registry, graph).encode_entity(node)?;

        let mut seen = HashSet::new();
        let pending: Vec<EncodedEntity> = encoding
            .owned
            .into_iter()
            .chain(std::iter::once(encoding.root))
            .filter(|e| seen.insert((e.schema.name().to_string(), e.id.clone())))
            .collect();
        let writes = pending
            .iter()
            .map(|e| {
                let key = RecordKey::new(e.schema.name(), e.id.as_str())?;
                Ok((key, write_record(&e.record)))
            })
            .collect::<CoreResult<Vec<_>>>()?;
        let unique_types = pending
            .iter()
            .filter(|e| e.schema.has_unique_attributes())
            .map(|e| self.registry.index_of(e.schema.name()))
            .collect::<CoreResult<Vec<_>>>()?;

        let _guards = self.type_locks.acquire(unique_types);
        UniquenessGuard::new(self.backend.as_ref()).check(&pending)?;
        for (key, text) in &writes {
            self.backend.write(key, text)?;
        }
        // Owned entities now belong to the records enclosing them.
        for entity in &pending {
            if let Some((parent, root)) = entity.ancestors {
                graph.set_markers(
                    entity.node,
                    Some(Value::Node(parent)),
                    Some(Value::Node(root)),
                )?;
            }
        }
        debug!(
            type_name = %graph.node(node)?.type_name(),
            %id,
            records = writes.len(),
            "saved entity"
        );
        Ok(id)
    }

    /// Loads an entity into a new graph.
    ///
    /// Returns `None` if no record exists.
    ///
    /// # Errors
    ///
    /// Returns `TypeNotRegistered` for an unknown type and codec errors for a
    /// malformed record.
    pub fn load(&self, type_name: &str, id: &str) -> CoreResult<Option<Loaded>> {
        let mut graph = Graph::new();
        Ok(self
            .load_into(&mut graph, type_name, id)?
            .map(|node| Loaded { graph, node }))
    }

    /// Loads an entity into an existing graph.
    ///
    /// # Errors
    ///
    /// As for [`Database::load`]; also `InvalidFormat` if the stored record
    /// belongs to another type.
    pub fn load_into(
        &self,
        graph: &mut Graph,
        type_name: &str,
        id: &str,
    ) -> CoreResult<Option<NodeId>> {
        let index = self.registry.index_of(type_name)?;
        let key = RecordKey::new(type_name, id)?;
        let Some(text) = self.backend.read(&key)? else {
            return Ok(None);
        };
        let record = parse_record(&text)?;
        if record.type_index != index {
            return Err(CoreError::invalid_format(format!(
                "record {key} has type index {}, expected {index}",
                record.type_index
            )));
        }
        let node = Decoder::new(&self.registry, graph).decode_entity(&record)?;
        debug!(%key, nodes = graph.len(), "loaded entity");
        Ok(Some(node))
    }

    /// Resolves a reference attribute to a node in the same graph.
    ///
    /// A lazy [`Value::Ref`] is loaded (or matched to a node already in the
    /// graph) and the attribute is rewritten to point at it. Returns `None`
    /// for a null attribute or a reference whose record no longer exists.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedValueType` if the attribute holds a non-object
    /// value, and load errors.
    pub fn resolve(
        &self,
        graph: &mut Graph,
        node: NodeId,
        attribute: &str,
    ) -> CoreResult<Option<NodeId>> {
        match graph.get(node, attribute)?.clone() {
            Value::Null => Ok(None),
            Value::Node(target) => Ok(Some(target)),
            Value::Ref(reference) => {
                let target = match graph.find(&reference.type_name, &reference.id) {
                    Some(existing) => Some(existing),
                    None => self.load_into(graph, &reference.type_name, &reference.id)?,
                };
                if let Some(target) = target {
                    graph.set(node, attribute, target)?;
                }
                Ok(target)
            }
            other => Err(CoreError::unsupported("object reference", other.kind())),
        }
    }

    /// Loads every persisted instance of a type, ordered by identity.
    ///
    /// # Errors
    ///
    /// Returns `TypeNotRegistered` for an unknown type and load errors.
    pub fn load_all(&self, type_name: &str) -> CoreResult<Vec<Loaded>> {
        self.load_all_filtered(type_name, &Filter::new())
    }

    /// Loads every persisted instance of a type that satisfies `filter`.
    ///
    /// # Errors
    ///
    /// Returns `TypeNotRegistered` for an unknown type and load errors.
    pub fn load_all_filtered(&self, type_name: &str, filter: &Filter) -> CoreResult<Vec<Loaded>> {
        let mut out = Vec::new();
        for id in self.get_all_ids(type_name)? {
            if let Some(loaded) = self.load(type_name, &id)? {
                if filter.matches(&loaded.graph, loaded.node) {
                    out.push(loaded);
                }
            }
        }
        debug!(type_name, matched = out.len(), "filtered scan");
        Ok(out)
    }

    /// Identities of every persisted instance of a type, sorted.
    ///
    /// # Errors
    ///
    /// Returns `TypeNotRegistered` for an unknown type and storage errors.
    pub fn get_all_ids(&self, type_name: &str) -> CoreResult<Vec<String>> {
        self.registry.index_of(type_name)?;
        Ok(self.backend.list_ids(type_name)?)
    }

    /// Checks whether a record exists without reading it.
    ///
    /// # Errors
    ///
    /// Returns `TypeNotRegistered` for an unknown type and storage errors.
    pub fn exists(&self, type_name: &str, id: &str) -> CoreResult<bool> {
        self.registry.index_of(type_name)?;
        Ok(self.backend.exists(&RecordKey::new(type_name, id)?)?)
    }

    /// Deletes the entity's own record. Owned sub-entities are kept.
    ///
    /// Returns `true` if a record was removed; an entity that was never
    /// saved has nothing to remove.
    ///
    /// # Errors
    ///
    /// Returns `IdentityAttributeMissing` for a value object and storage
    /// errors.
    pub fn delete(&self, graph: &Graph, node: NodeId) -> CoreResult<bool> {
        let entry = graph.node(node)?;
        if !entry.schema().has_identity() {
            return Err(CoreError::identity_missing(entry.type_name()));
        }
        self.delete_record(graph, node)
    }

    /// Deletes the entity and every entity it owns, children first.
    ///
    /// Cold attributes, lazy references and back-references to ancestors
    /// are not followed.
    ///
    /// Returns `true` if the entity's own record was removed.
    ///
    /// # Errors
    ///
    /// Returns `IdentityAttributeMissing` for a value object and storage
    /// errors.
    pub fn delete_cascade(&self, graph: &Graph, node: NodeId) -> CoreResult<bool> {
        let entry = graph.node(node)?;
        if !entry.schema().has_identity() {
            return Err(CoreError::identity_missing(entry.type_name()));
        }
        let plan = CascadeDeleter::new(graph).plan(node)?;
        let mut removed = false;
        for target in plan {
            removed = self.delete_record(graph, target)?;
        }
        Ok(removed)
    }

    fn delete_record(&self, graph: &Graph, node: NodeId) -> CoreResult<bool> {
        let entry = graph.node(node)?;
        let Some(id) = entry.identity() else {
            return Ok(false);
        };
        let key = RecordKey::new(entry.type_name(), id)?;
        let removed = self.backend.delete(&key)?;
        debug!(%key, removed, "deleted record");
        Ok(removed)
    }

    /// Runs a textual query, `<TypeName> <opcode> <attribute> <value>`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidFilter` for malformed text, `TypeNotRegistered` for an
    /// unknown type, and load errors.
    pub fn query(&self, text: &str) -> CoreResult<Vec<Loaded>> {
        let query: Query = text.parse()?;
        self.load_all_filtered(&query.type_name, &query.filter)
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("config", &self.config)
            .field("path", &self.path())
            .field("types", &self.registry.names())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::AttrType;
    use tempfile::tempdir;

    fn register_pessoa(db: &Database) {
        db.register(
            TypeSchema::builder("Pessoa")
                .attribute("id", AttrType::Text)
                .attribute("nome", AttrType::Text)
                .unique("email", AttrType::Text)
                .attribute("idade", AttrType::Int)
                .cold("amigo", AttrType::object("Pessoa"))
                .build()
                .unwrap(),
        )
        .unwrap();
    }

    fn pessoa(db: &Database, graph: &mut Graph, nome: &str, email: &str) -> NodeId {
        let p = db.create(graph, "Pessoa").unwrap();
        graph.set(p, "nome", nome).unwrap();
        graph.set(p, "email", email).unwrap();
        p
    }

    #[test]
    fn save_load_roundtrip() {
        let db = Database::open_in_memory();
        register_pessoa(&db);

        let mut graph = Graph::new();
        let p = pessoa(&db, &mut graph, "Carla", "carla@x");
        graph.set(p, "idade", 25).unwrap();
        let id = db.save(&mut graph, p).unwrap();

        assert!(db.exists("Pessoa", &id).unwrap());
        let loaded = db.load("Pessoa", &id).unwrap().unwrap();
        assert_eq!(loaded.identity(), Some(id.as_str()));
        assert_eq!(loaded.get("nome").unwrap(), &Value::Text("Carla".into()));
        assert_eq!(loaded.get("idade").unwrap(), &Value::Int(25));
        assert!(db.load("Pessoa", "missing").unwrap().is_none());
    }

    #[test]
    fn identity_is_stable_across_saves() {
        let db = Database::open_in_memory();
        register_pessoa(&db);

        let mut graph = Graph::new();
        let p = pessoa(&db, &mut graph, "Carla", "carla@x");
        let first = db.save(&mut graph, p).unwrap();
        graph.set(p, "nome", "Carla Souza").unwrap();
        let second = db.save(&mut graph, p).unwrap();
        assert_eq!(first, second);
        assert_eq!(db.get_all_ids("Pessoa").unwrap(), vec![first]);
    }

    #[test]
    fn duplicate_unique_is_rejected() {
        let db = Database::open_in_memory();
        register_pessoa(&db);

        let mut graph = Graph::new();
        let a = pessoa(&db, &mut graph, "A", "same@x");
        let b = pessoa(&db, &mut graph, "B", "same@x");
        db.save(&mut graph, a).unwrap();

        let err = db.save(&mut graph, b).unwrap_err();
        assert!(err.is_unique_violation());
        assert_eq!(db.get_all_ids("Pessoa").unwrap().len(), 1);
    }

    #[test]
    fn resolve_hydrates_cold_reference() {
        let db = Database::open_in_memory();
        register_pessoa(&db);

        let mut graph = Graph::new();
        let amigo = pessoa(&db, &mut graph, "Maria", "maria@x");
        let amigo_id = db.save(&mut graph, amigo).unwrap();
        let p = pessoa(&db, &mut graph, "Carla", "carla@x");
        graph.set(p, "amigo", amigo).unwrap();
        let id = db.save(&mut graph, p).unwrap();

        let mut loaded = db.load("Pessoa", &id).unwrap().unwrap();
        let node = loaded.node;
        assert!(loaded.get("amigo").unwrap().as_entity_ref().is_some());

        let target = db.resolve(&mut loaded.graph, node, "amigo").unwrap().unwrap();
        assert_eq!(loaded.graph.identity(target), Some(amigo_id.as_str()));
        assert_eq!(loaded.get("amigo").unwrap(), &Value::Node(target));
        assert_eq!(
            db.resolve(&mut loaded.graph, node, "amigo").unwrap(),
            Some(target)
        );
        assert!(db.resolve(&mut loaded.graph, node, "nome").is_err());
    }

    #[test]
    fn delete_reports_existence() {
        let db = Database::open_in_memory();
        register_pessoa(&db);

        let mut graph = Graph::new();
        let p = pessoa(&db, &mut graph, "Carla", "carla@x");
        assert!(!db.delete(&graph, p).unwrap());
        let id = db.save(&mut graph, p).unwrap();
        assert!(db.delete(&graph, p).unwrap());
        assert!(!db.delete(&graph, p).unwrap());
        assert!(!db.exists("Pessoa", &id).unwrap());
    }

    #[test]
    fn unregistered_type_is_an_error() {
        let db = Database::open_in_memory();
        assert!(matches!(
            db.get_all_ids("Nope"),
            Err(CoreError::TypeNotRegistered { .. })
        ));
        assert!(db.query("Nope ti nome x").is_err());
    }

    #[test]
    fn query_runs_filter() {
        let db = Database::open_in_memory();
        register_pessoa(&db);
        let mut graph = Graph::new();
        for (nome, email) in [("Jhones Conrado", "j@x"), ("Carla", "c@x"), ("Maria", "m@x")] {
            let p = pessoa(&db, &mut graph, nome, email);
            db.save(&mut graph, p).unwrap();
        }

        let mut found: Vec<_> = db
            .query("Pessoa tpi nome ar")
            .unwrap()
            .iter()
            .map(|l| l.get("nome").unwrap().as_text().unwrap().to_string())
            .collect();
        found.sort();
        assert_eq!(found, vec!["Carla", "Maria"]);
    }

    #[test]
    fn file_database_persists_types_and_records() {
        let temp = tempdir().unwrap();
        let id = {
            let db = Database::open(temp.path()).unwrap();
            register_pessoa(&db);
            let mut graph = Graph::new();
            let p = pessoa(&db, &mut graph, "Carla", "carla@x");
            db.save(&mut graph, p).unwrap()
        };

        let db = Database::open(temp.path()).unwrap();
        assert!(db.path().is_some());
        register_pessoa(&db);
        let loaded = db.load("Pessoa", &id).unwrap().unwrap();
        assert_eq!(loaded.get("email").unwrap(), &Value::Text("carla@x".into()));
    }

    #[test]
    fn unrecorded_type_gets_no_index() {
        let temp = tempdir().unwrap();
        let blocker = temp.path().join("TYPES.tmp");
        let schema = || {
            TypeSchema::builder("Cidade")
                .attribute("id", AttrType::Text)
                .build()
                .unwrap()
        };

        let db = Database::open(temp.path()).unwrap();
        std::fs::create_dir(&blocker).unwrap();
        assert!(db.register(schema()).is_err());
        assert!(db.registry().index_of("Cidade").is_err());
        assert!(db.registry().manifest().is_empty());

        std::fs::remove_dir(&blocker).unwrap();
        assert_eq!(db.register(schema()).unwrap(), 32);
        drop(db);

        let db = Database::open(temp.path()).unwrap();
        assert_eq!(db.registry().manifest().get("Cidade"), Some(32));
    }

    #[test]
    fn type_names_must_differ_beyond_case() {
        let db = Database::open_in_memory();
        register_pessoa(&db);
        let lower = TypeSchema::builder("pessoa")
            .attribute("id", AttrType::Text)
            .build()
            .unwrap();
        assert!(matches!(
            db.register(lower),
            Err(CoreError::InvalidSchema { .. })
        ));
    }

    #[test]
    fn second_open_is_locked() {
        let temp = tempdir().unwrap();
        let _db = Database::open(temp.path()).unwrap();
        assert!(matches!(
            Database::open(temp.path()),
            Err(CoreError::DatabaseLocked)
        ));
    }

    #[test]
    fn database_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Database>();
    }
}
