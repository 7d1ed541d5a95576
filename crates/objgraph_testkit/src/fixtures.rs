//! Test fixtures and database helpers.
//!
//! Provides convenience functions for setting up test databases
//! and a small domain model shared by the other test modules.

use objgraph_core::{AttrType, Database, TypeSchema};
use std::path::Path;
use tempfile::TempDir;

/// A test database with automatic cleanup.
pub struct TestDatabase {
    /// The database instance.
    pub db: Database,
    /// The temporary directory (kept alive to prevent cleanup).
    temp_dir: Option<TempDir>,
}

impl TestDatabase {
    /// Creates a new in-memory test database.
    pub fn memory() -> Self {
        Self {
            db: Database::open_in_memory(),
            temp_dir: None,
        }
    }

    /// Creates a new file-based test database in a temporary directory.
    pub fn file() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db = Database::open(temp_dir.path()).expect("Failed to open file database");
        Self {
            db,
            temp_dir: Some(temp_dir),
        }
    }

    /// Returns the database path if file-based, None if in-memory.
    pub fn path(&self) -> Option<&Path> {
        self.temp_dir.as_ref().map(TempDir::path)
    }

    /// Closes and reopens a file-based database on the same directory.
    ///
    /// Types must be registered again on the returned handle.
    pub fn reopen(self) -> Self {
        let Self { db, temp_dir } = self;
        drop(db);
        let temp_dir = temp_dir.expect("Only file databases can be reopened");
        let db = Database::open(temp_dir.path()).expect("Failed to reopen database");
        Self {
            db,
            temp_dir: Some(temp_dir),
        }
    }
}

impl std::ops::Deref for TestDatabase {
    type Target = Database;

    fn deref(&self) -> &Self::Target {
        &self.db
    }
}

/// Runs a test with a temporary in-memory database with the fixture types
/// registered.
///
/// # Example
///
/// ```rust
/// use objgraph_core::Graph;
/// use objgraph_testkit::with_temp_db;
///
/// with_temp_db(|db| {
///     let mut graph = Graph::new();
///     let p = db.create(&mut graph, "Pessoa").unwrap();
///     graph.set(p, "nome", "Carla").unwrap();
///     db.save(&mut graph, p).unwrap();
/// });
/// ```
pub fn with_temp_db<F, R>(f: F) -> R
where
    F: FnOnce(&Database) -> R,
{
    let test_db = TestDatabase::memory();
    schemas::register_all(&test_db);
    f(&test_db.db)
}

/// Runs a test with a temporary file-based database with the fixture types
/// registered.
pub fn with_file_db<F, R>(f: F) -> R
where
    F: FnOnce(&Database, &Path) -> R,
{
    let test_db = TestDatabase::file();
    schemas::register_all(&test_db);
    let path = test_db.path().expect("File database should have a path");
    f(&test_db.db, path)
}

/// Schemas of the fixture domain.
///
/// `Pessoa` has a unique `email` and a cold `amigo`; `Departamento` owns a
/// list of `Funcionario`, each pointing back at its department; `Endereco` is
/// a value object embedded in both.
pub mod schemas {
    use super::*;

    /// A person.
    pub fn pessoa() -> TypeSchema {
        TypeSchema::builder("Pessoa")
            .attribute("id", AttrType::Text)
            .attribute("nome", AttrType::Text)
            .unique("email", AttrType::Text)
            .attribute("idade", AttrType::Int)
            .attribute("ativo", AttrType::Bool)
            .attribute("endereco", AttrType::object("Endereco"))
            .cold("amigo", AttrType::object("Pessoa"))
            .build()
            .expect("valid Pessoa schema")
    }

    /// A postal address without identity.
    pub fn endereco() -> TypeSchema {
        TypeSchema::builder("Endereco")
            .attribute("rua", AttrType::Text)
            .attribute("cidade", AttrType::Text)
            .value_object()
            .build()
            .expect("valid Endereco schema")
    }

    /// A department owning its employees.
    pub fn departamento() -> TypeSchema {
        TypeSchema::builder("Departamento")
            .attribute("id", AttrType::Text)
            .unique("nome", AttrType::Text)
            .attribute(
                "funcionarios",
                AttrType::list(AttrType::object("Funcionario")),
            )
            .cold("parceiro", AttrType::object("Departamento"))
            .build()
            .expect("valid Departamento schema")
    }

    /// An employee pointing back at its department.
    pub fn funcionario() -> TypeSchema {
        TypeSchema::builder("Funcionario")
            .attribute("id", AttrType::Text)
            .attribute("nome", AttrType::Text)
            .attribute("salario", AttrType::Float)
            .attribute("departamento", AttrType::object("Departamento"))
            .attribute("endereco", AttrType::object("Endereco"))
            .build()
            .expect("valid Funcionario schema")
    }

    /// All fixture schemas, in registration order.
    pub fn all() -> Vec<TypeSchema> {
        vec![pessoa(), endereco(), departamento(), funcionario()]
    }

    /// Registers every fixture schema.
    pub fn register_all(db: &Database) {
        for schema in all() {
            db.register(schema).expect("Failed to register fixture type");
        }
    }
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;
    use objgraph_core::{Graph, NodeId, Value};

    /// Saves one `Pessoa` per name, with emails derived from the name.
    ///
    /// Returns the identities in input order.
    pub fn people(db: &Database, names: &[&str]) -> Vec<String> {
        let mut graph = Graph::new();
        names
            .iter()
            .enumerate()
            .map(|(i, nome)| {
                let p = db.create(&mut graph, "Pessoa").expect("Failed to create");
                graph.set(p, "nome", *nome).expect("Failed to set nome");
                graph
                    .set(p, "email", format!("{}@example.com", nome.to_lowercase()))
                    .expect("Failed to set email");
                graph
                    .set(p, "idade", 20 + i64::try_from(i).unwrap_or(0))
                    .expect("Failed to set idade");
                db.save(&mut graph, p).expect("Failed to save")
            })
            .collect()
    }

    /// Builds a department owning one employee per name, each pointing back
    /// at the department. Nothing is saved.
    pub fn department(
        db: &Database,
        graph: &mut Graph,
        nome: &str,
        staff: &[&str],
    ) -> (NodeId, Vec<NodeId>) {
        let d = db.create(graph, "Departamento").expect("Failed to create");
        graph.set(d, "nome", nome).expect("Failed to set nome");
        let mut employees = Vec::with_capacity(staff.len());
        for name in staff {
            let f = db.create(graph, "Funcionario").expect("Failed to create");
            graph.set(f, "nome", *name).expect("Failed to set nome");
            graph.set(f, "departamento", d).expect("Failed to link");
            graph.push(d, "funcionarios", Value::Node(f)).expect("Failed to push");
            employees.push(f);
        }
        (d, employees)
    }

    /// A database with `count` people saved.
    pub fn populated_database(count: usize) -> TestDatabase {
        let test_db = TestDatabase::memory();
        schemas::register_all(&test_db);
        let names: Vec<String> = (0..count).map(|i| format!("Pessoa{i}")).collect();
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        people(&test_db, &names);
        test_db
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use objgraph_core::Graph;

    #[test]
    fn test_memory_database() {
        let test_db = TestDatabase::memory();
        assert!(test_db.path().is_none());
        schemas::register_all(&test_db);
        assert_eq!(test_db.registry().names().len(), 4);
    }

    #[test]
    fn test_with_temp_db() {
        with_temp_db(|db| {
            let ids = scenarios::people(db, &["Carla", "Maria"]);
            assert_eq!(ids.len(), 2);
            assert_eq!(db.get_all_ids("Pessoa").unwrap().len(), 2);
        });
    }

    #[test]
    fn test_file_database_reopens() {
        let test_db = TestDatabase::file();
        schemas::register_all(&test_db);
        let ids = scenarios::people(&test_db, &["Carla"]);

        let test_db = test_db.reopen();
        schemas::register_all(&test_db);
        assert!(test_db.exists("Pessoa", &ids[0]).unwrap());
    }

    #[test]
    fn test_department_scenario() {
        with_temp_db(|db| {
            let mut graph = Graph::new();
            let (d, staff) = scenarios::department(db, &mut graph, "Vendas", &["Ana", "Bia"]);
            assert_eq!(staff.len(), 2);
            db.save(&mut graph, d).unwrap();
            assert_eq!(db.get_all_ids("Funcionario").unwrap().len(), 2);
        });
    }

    #[test]
    fn test_populated_scenario() {
        let test_db = scenarios::populated_database(10);
        assert_eq!(test_db.get_all_ids("Pessoa").unwrap().len(), 10);
    }
}
