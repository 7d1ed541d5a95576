//! Cross-crate integration test helpers.
//!
//! Provides utilities for testing interactions between
//! multiple objgraph crates.

use crate::fixtures::{schemas, TestDatabase};
use crate::generators::PessoaOperation;
use objgraph_core::{Database, Graph, NodeId, Value};
use std::collections::HashMap;

/// A test harness replaying [`PessoaOperation`]s against a database and a
/// model of what the database should contain.
pub struct IntegrationHarness {
    /// The database instance.
    pub db: TestDatabase,
    graph: Graph,
    slots: Vec<NodeId>,
    /// Expected `nome` per identity.
    expected: HashMap<String, String>,
}

impl IntegrationHarness {
    /// Creates a harness over an in-memory database with `slots` people.
    pub fn new(slots: usize) -> Self {
        Self::with_database(TestDatabase::memory(), slots)
    }

    /// Creates a harness over a given database.
    pub fn with_database(db: TestDatabase, slots: usize) -> Self {
        schemas::register_all(&db);
        let mut graph = Graph::new();
        let slots = (0..slots)
            .map(|i| {
                let p = db.create(&mut graph, "Pessoa").expect("Failed to create");
                graph
                    .set(p, "id", format!("pessoa-{i}"))
                    .expect("Failed to set id");
                p
            })
            .collect();
        Self {
            db,
            graph,
            slots,
            expected: HashMap::new(),
        }
    }

    /// Applies one operation and checks its result against the model.
    pub fn apply(&mut self, op: &PessoaOperation) {
        match op {
            PessoaOperation::Save { slot, nome } => {
                let node = self.slots[*slot];
                self.graph.set(node, "nome", nome.as_str()).expect("Failed to set");
                let id = self.db.save(&mut self.graph, node).expect("Failed to save");
                self.expected.insert(id, nome.clone());
            }
            PessoaOperation::Delete { slot } => {
                let node = self.slots[*slot];
                let id = self.id(*slot);
                let removed = self.db.delete(&self.graph, node).expect("Failed to delete");
                assert_eq!(removed, self.expected.remove(&id).is_some(), "delete {id}");
            }
            PessoaOperation::Load { slot } => {
                let id = self.id(*slot);
                let loaded = self.db.load("Pessoa", &id).expect("Failed to load");
                let nome = loaded.map(|l| {
                    l.get("nome")
                        .expect("nome declared")
                        .as_text()
                        .map(str::to_string)
                });
                assert_eq!(
                    nome.flatten().as_ref(),
                    self.expected.get(&id),
                    "load {id}"
                );
            }
        }
    }

    /// Verifies the stored identities and names match the model.
    pub fn verify_all(&self) {
        let mut ids = self.db.get_all_ids("Pessoa").expect("Failed to list");
        ids.sort();
        let mut expected: Vec<_> = self.expected.keys().cloned().collect();
        expected.sort();
        assert_eq!(ids, expected, "stored identities");

        for (id, nome) in &self.expected {
            let loaded = self
                .db
                .load("Pessoa", id)
                .expect("Failed to load")
                .expect("Entity should exist");
            assert_eq!(loaded.get("nome").expect("nome declared").as_text(), Some(nome.as_str()));
        }
    }

    /// Returns the count of tracked entities.
    pub fn tracked_count(&self) -> usize {
        self.expected.len()
    }

    fn id(&self, slot: usize) -> String {
        self.graph
            .identity(self.slots[slot])
            .expect("slot identity is preset")
            .to_string()
    }
}

/// Record level checks.
pub mod records {
    use super::*;
    use objgraph_codec::parse_record;

    /// Loads one attribute of a stored entity. Text comes back verbatim,
    /// other values in debug form, null as `None`.
    pub fn stored_field(db: &Database, type_name: &str, id: &str, field: &str) -> Option<String> {
        let loaded = db.load(type_name, id).expect("Failed to load")?;
        let value = loaded.get(field).ok()?.clone();
        match value {
            Value::Null => None,
            Value::Text(s) => Some(s),
            other => Some(format!("{other:?}")),
        }
    }

    /// Asserts that a text parses as exactly one record.
    pub fn assert_well_formed(text: &str) {
        if let Err(e) = parse_record(text) {
            panic!("record {text:?} is malformed: {e}");
        }
    }
}
