//! Shared test vectors for objgraph.
//!
//! Vectors pin the record text format and the filter text form so that other
//! readers of an objgraph directory can check themselves against the same
//! cases. They serialize to JSON with [`all_vectors_json`].

use serde::{Deserialize, Serialize};

/// A text-in, text-out test vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestVector {
    /// Unique identifier for this vector.
    pub id: String,
    /// Human-readable description.
    pub description: String,
    /// Input text.
    pub input: String,
    /// Expected canonical output.
    pub expected: String,
    /// Expected error kind (if this should fail).
    pub expected_error: Option<String>,
}

impl TestVector {
    fn ok(id: &str, description: &str, input: &str, expected: &str) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            input: input.into(),
            expected: expected.into(),
            expected_error: None,
        }
    }

    fn err(id: &str, description: &str, input: &str, error: &str) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            input: input.into(),
            expected: String::new(),
            expected_error: Some(error.into()),
        }
    }
}

/// Record format vectors.
pub fn record_vectors() -> Vec<TestVector> {
    vec![
        TestVector::ok("record_null", "Null value", "{0:}", "{0:}"),
        TestVector::ok("record_bool", "Boolean literal", "{1:true}", "{1:true}"),
        TestVector::ok("record_int", "Negative integer", "{4:-42}", "{4:-42}"),
        TestVector::ok("record_float", "Float literal", "{5:2.5}", "{5:2.5}"),
        TestVector::ok("record_text_empty", "Empty text", "{6:}", "{6:}"),
        TestVector::ok(
            "record_text_escaped",
            "Every reserved character escaped",
            "{6:a\\{b\\}\\[c\\]\\(d\\)\\\\e}",
            "{6:a\\{b\\}\\[c\\]\\(d\\)\\\\e}",
        ),
        TestVector::ok(
            "record_list",
            "List with a null element",
            "{8:[{4:1}{0:}{4:3}]}",
            "{8:[{4:1}{0:}{4:3}]}",
        ),
        TestVector::ok("record_list_empty", "Empty list", "{8:[]}", "{8:[]}"),
        TestVector::ok(
            "record_map",
            "Map with two entries",
            "{10:[({6:um}:{4:1})({6:dois}:{4:2})]}",
            "{10:[({6:um}:{4:1})({6:dois}:{4:2})]}",
        ),
        TestVector::ok(
            "record_composite",
            "Composite with a nested reference",
            "{33:{id:{6:f1}}{departamento:{32:d1}}}",
            "{33:{id:{6:f1}}{departamento:{32:d1}}}",
        ),
        TestVector::ok(
            "record_trailing_newline",
            "Trailing whitespace is dropped",
            "{6:a}\n",
            "{6:a}",
        ),
        TestVector::err("record_unclosed", "Missing closing brace", "{6:abc", "malformed"),
        TestVector::err("record_no_index", "Missing type index", "{:abc}", "malformed"),
        TestVector::err("record_trailing", "Trailing data", "{6:a}{6:b}", "malformed"),
        TestVector::err(
            "record_bad_name",
            "Reserved character in attribute name",
            "{33:{na(me:{6:x}}}",
            "malformed",
        ),
    ]
}

/// Filter text vectors. The expected text is the normalized form.
pub fn filter_vectors() -> Vec<TestVector> {
    vec![
        TestVector::ok("filter_equals", "Text equality", "ti nome Carla", "ti nome Carla"),
        TestVector::ok(
            "filter_contains_ignore_case",
            "Case-insensitive operand is upper-cased",
            "tpi nome ar",
            "tpi nome AR",
        ),
        TestVector::ok(
            "filter_value_spaces",
            "Value keeps inner spaces",
            "tp nome Jhones Conrado",
            "tp nome Jhones Conrado",
        ),
        TestVector::ok(
            "filter_path",
            "Dotted attribute path",
            "tc endereco.rua Rua",
            "tc endereco.rua Rua",
        ),
        TestVector::ok("filter_between", "Inclusive range", "nb idade 18 30", "nb idade 18 30"),
        TestVector::ok(
            "filter_number_shortest",
            "Number operands print in their shortest form",
            "nb idade 18.0 3e1",
            "nb idade 18 30",
        ),
        TestVector::ok(
            "filter_and",
            "Blank lines are skipped",
            "ti nome Carla\n\nng idade 20",
            "ti nome Carla\nng idade 20",
        ),
        TestVector::err("filter_opcode", "Unknown opcode", "xx nome a", "invalid_filter"),
        TestVector::err("filter_no_value", "Missing value", "ti nome", "invalid_filter"),
        TestVector::err("filter_bool", "Non-boolean operand", "bi ativo sim", "invalid_filter"),
    ]
}

/// Generate all test vectors as JSON.
pub fn all_vectors_json() -> String {
    let vectors = AllTestVectors {
        record: record_vectors(),
        filter: filter_vectors(),
    };

    serde_json::to_string_pretty(&vectors).expect("Failed to serialize vectors")
}

#[derive(Debug, Serialize, Deserialize)]
struct AllTestVectors {
    record: Vec<TestVector>,
    filter: Vec<TestVector>,
}
