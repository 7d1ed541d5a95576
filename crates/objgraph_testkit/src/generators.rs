//! Property-based test generators using proptest.
//!
//! Provides strategies for generating random test data
//! that maintains required invariants.

use objgraph_codec::{builtin, Payload, Record};
use objgraph_core::Value;
use proptest::prelude::*;

/// Strategy for generating valid type names.
pub fn type_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Z][a-zA-Z0-9_]{0,31}").expect("Invalid regex")
}

/// Strategy for generating valid attribute names.
pub fn attribute_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-zA-Z0-9_]{0,15}").expect("Invalid regex")
}

/// Strategy for generating identities, including characters that need
/// escaping on disk and in records.
pub fn identity_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z0-9 _./:{}()\\[\\]\\\\-]{1,24}")
        .expect("Invalid regex")
        .prop_filter("Identity must not be blank", |s| !s.trim().is_empty())
}

/// Strategy for arbitrary text, delimiters included.
pub fn text_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => "[a-zA-Z0-9 ]{0,20}",
        1 => "[{}\\[\\]()\\\\:a-z]{0,20}",
        1 => any::<String>(),
    ]
}

/// Strategy for scalar values that decode to themselves without a declared
/// type.
pub fn scalar_value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<u8>().prop_map(Value::Byte),
        any::<char>().prop_map(Value::Char),
        any::<i64>().prop_map(Value::Int),
        (-1.0e12f64..1.0e12).prop_map(Value::Float),
        text_strategy().prop_map(Value::Text),
    ]
}

/// Strategy for nested lists and maps of scalars.
pub fn value_strategy() -> impl Strategy<Value = Value> {
    scalar_value_strategy().prop_recursive(3, 32, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::List),
            prop::collection::vec((text_strategy().prop_map(Value::Text), inner), 0..4)
                .prop_map(Value::Map),
        ]
    })
}

/// Strategy for schema-free record trees, used to exercise the record codec
/// directly.
pub fn record_strategy() -> impl Strategy<Value = Record> {
    let leaf = prop_oneof![
        Just(Record::null()),
        text_strategy().prop_map(|s| Record::literal(builtin::STRING, s)),
        any::<i64>().prop_map(|n| Record::literal(builtin::INT, n.to_string())),
    ];
    leaf.prop_recursive(3, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4)
                .prop_map(|items| Record::new(builtin::LIST, Payload::Elements(items))),
            (
                builtin::FIRST_USER_INDEX..64u32,
                prop::collection::vec((attribute_name_strategy(), inner), 1..4)
            )
                .prop_map(|(index, fields)| {
                    Record::new(
                        index,
                        Payload::Fields(
                            fields
                                .into_iter()
                                .map(|(name, value)| objgraph_codec::Field::new(name, value))
                                .collect(),
                        ),
                    )
                }),
        ]
    })
}

/// An operation against the `Pessoa` fixture type.
#[derive(Debug, Clone)]
pub enum PessoaOperation {
    /// Save a person with this slot's identity.
    Save {
        /// Identity slot.
        slot: usize,
        /// Name to store.
        nome: String,
    },
    /// Delete the person in a slot.
    Delete {
        /// Identity slot.
        slot: usize,
    },
    /// Load the person in a slot.
    Load {
        /// Identity slot.
        slot: usize,
    },
}

/// Strategy for operations over a fixed number of identity slots.
pub fn pessoa_operation_strategy(slots: usize) -> impl Strategy<Value = PessoaOperation> {
    prop_oneof![
        3 => (0..slots, "[A-Za-z ]{1,12}")
            .prop_map(|(slot, nome)| PessoaOperation::Save { slot, nome }),
        1 => (0..slots).prop_map(|slot| PessoaOperation::Delete { slot }),
        2 => (0..slots).prop_map(|slot| PessoaOperation::Load { slot }),
    ]
}

/// Strategy for generating a sequence of operations.
pub fn operation_sequence_strategy(
    slots: usize,
    min_ops: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<PessoaOperation>> {
    prop::collection::vec(pessoa_operation_strategy(slots), min_ops..max_ops)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 1024,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use objgraph_codec::{parse_record, write_record};
    use objgraph_storage::RecordKey;

    proptest! {
        #![proptest_config(PropTestConfig::quick().to_proptest_config())]

        #[test]
        fn type_names_make_valid_keys(name in type_name_strategy(), id in identity_strategy()) {
            prop_assert!(RecordKey::new(name, id).is_ok());
        }

        #[test]
        fn generated_records_parse_back(record in record_strategy()) {
            let text = write_record(&record);
            prop_assert_eq!(parse_record(&text).unwrap(), record);
        }

        #[test]
        fn operations_stay_in_range(ops in operation_sequence_strategy(4, 1, 20)) {
            for op in ops {
                let slot = match op {
                    PessoaOperation::Save { slot, .. }
                    | PessoaOperation::Delete { slot }
                    | PessoaOperation::Load { slot } => slot,
                };
                prop_assert!(slot < 4);
            }
        }
    }
}
