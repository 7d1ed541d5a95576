//! Fuzz testing harnesses for objgraph.
//!
//! This module provides fuzz targets that can be used with cargo-fuzz
//! or other fuzzing frameworks. Every target must return normally for any
//! input; errors are expected, panics are bugs.

use crate::fixtures::schemas;
use objgraph_codec::{parse_record, write_record};
use objgraph_core::{codec, Database, Filter, Graph, Query, TypeRegistry};

/// Fuzz target for record parsing.
///
/// Tests that arbitrary text either parses to a record or returns a proper
/// error (no panics).
pub fn fuzz_record_parse(data: &[u8]) {
    let text = String::from_utf8_lossy(data);
    let _ = parse_record(&text);
}

/// Fuzz target for record roundtrip.
///
/// Tests that writing a parsed record and parsing it again yields the same
/// record.
pub fn fuzz_record_roundtrip(data: &[u8]) {
    let text = String::from_utf8_lossy(data);
    if let Ok(record) = parse_record(&text) {
        let written = write_record(&record);
        let reparsed = parse_record(&written).expect("written record must parse");
        assert_eq!(record, reparsed, "Roundtrip mismatch");
    }
}

/// Fuzz target for schema-aware decoding.
///
/// Any record that parses is decoded against the fixture schemas.
pub fn fuzz_entity_decode(data: &[u8]) {
    let text = String::from_utf8_lossy(data);
    let Ok(record) = parse_record(&text) else {
        return;
    };
    let registry = TypeRegistry::new();
    for schema in schemas::all() {
        registry.register(schema);
    }
    let _ = codec::decode_entity(&registry, &mut Graph::new(), &record);
}

/// Fuzz target for filter and query text.
pub fn fuzz_filter_parse(data: &[u8]) {
    let text = String::from_utf8_lossy(data);
    if let Ok(filter) = text.parse::<Filter>() {
        // Normalized text must parse to the same filter.
        let again: Filter = filter
            .to_string()
            .parse()
            .expect("normalized filter must parse");
        assert_eq!(filter.predicates().len(), again.predicates().len());
    }
    let _ = text.parse::<Query>();
}

/// Fuzz target for database operations.
///
/// Tests that arbitrary operation sequences don't cause panics.
pub fn fuzz_database_operations(data: &[u8]) {
    let db = Database::open_in_memory();
    schemas::register_all(&db);
    FuzzOp::execute_sequence(&FuzzOp::parse_sequence(data), &db);
}

/// Structured fuzzing input for database operations on `Pessoa`.
#[derive(Debug, Clone)]
pub enum FuzzOp {
    /// Save a person.
    Save {
        /// Identity slot.
        slot: u8,
        /// Email, drawn from a small set so unique collisions happen.
        email: u8,
        /// Name bytes, decoded lossily.
        nome: Vec<u8>,
    },
    /// Load a person.
    Load {
        /// Identity slot.
        slot: u8,
    },
    /// Delete a person with everything it owns.
    Delete {
        /// Identity slot.
        slot: u8,
    },
    /// Run a filter scan.
    Scan {
        /// Filter text bytes, decoded lossily.
        filter: Vec<u8>,
    },
}

impl FuzzOp {
    /// Parse operations from fuzzer input.
    pub fn parse_sequence(data: &[u8]) -> Vec<FuzzOp> {
        let mut ops = Vec::new();
        let mut offset = 0;

        while offset < data.len() {
            let op_type = data[offset];
            offset += 1;

            let op = match op_type % 4 {
                0 => {
                    if offset + 3 > data.len() {
                        break;
                    }
                    let slot = data[offset];
                    let email = data[offset + 1];
                    let len = usize::from(data[offset + 2] % 32);
                    offset += 3;
                    if offset + len > data.len() {
                        break;
                    }
                    let nome = data[offset..offset + len].to_vec();
                    offset += len;
                    FuzzOp::Save { slot, email, nome }
                }
                1 => {
                    let Some(&slot) = data.get(offset) else { break };
                    offset += 1;
                    FuzzOp::Load { slot }
                }
                2 => {
                    let Some(&slot) = data.get(offset) else { break };
                    offset += 1;
                    FuzzOp::Delete { slot }
                }
                3 => {
                    let Some(&len) = data.get(offset) else { break };
                    let len = usize::from(len % 32);
                    offset += 1;
                    if offset + len > data.len() {
                        break;
                    }
                    let filter = data[offset..offset + len].to_vec();
                    offset += len;
                    FuzzOp::Scan { filter }
                }
                _ => break,
            };

            ops.push(op);
        }

        ops
    }

    /// Execute operations on a database with the fixture schemas registered.
    pub fn execute_sequence(ops: &[FuzzOp], db: &Database) {
        let mut graph = Graph::new();
        for op in ops {
            match op {
                FuzzOp::Save { slot, email, nome } => {
                    let Ok(p) = db.create(&mut graph, "Pessoa") else {
                        continue;
                    };
                    let _ = graph.set(p, "id", format!("p{}", slot % 8));
                    let _ = graph.set(p, "email", format!("{}@x", email % 4));
                    let _ = graph.set(p, "nome", String::from_utf8_lossy(nome).into_owned());
                    let _ = db.save(&mut graph, p);
                }
                FuzzOp::Load { slot } => {
                    let _ = db.load("Pessoa", &format!("p{}", slot % 8));
                }
                FuzzOp::Delete { slot } => {
                    if let Ok(Some(loaded)) = db.load("Pessoa", &format!("p{}", slot % 8)) {
                        let _ = db.delete_cascade(&loaded.graph, loaded.node);
                    }
                }
                FuzzOp::Scan { filter } => {
                    if let Ok(filter) = String::from_utf8_lossy(filter).parse::<Filter>() {
                        let _ = db.load_all_filtered("Pessoa", &filter);
                    }
                }
            }
        }
    }
}
