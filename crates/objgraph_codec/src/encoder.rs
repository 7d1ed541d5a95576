//! Record writer.

use crate::record::{Payload, Record};

/// Characters that must be preceded by `\` inside a literal payload.
pub(crate) const ESCAPED: [char; 7] = ['\\', '{', '}', '[', ']', '(', ')'];

/// Render a record in the bracketed text format.
///
/// The output is deterministic: the same record always produces the same
/// text, and [`parse_record`](crate::parse_record) reads it back unchanged.
#[must_use]
pub fn write_record(record: &Record) -> String {
    let mut writer = RecordWriter::new();
    writer.write(record);
    writer.into_string()
}

/// A writer for the bracketed record format.
pub struct RecordWriter {
    buffer: String,
}

impl RecordWriter {
    /// Create a new writer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
        }
    }

    /// Create a new writer with the specified capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: String::with_capacity(capacity),
        }
    }

    /// Append a record.
    pub fn write(&mut self, record: &Record) {
        self.buffer.push('{');
        self.buffer.push_str(&record.type_index.to_string());
        self.buffer.push(':');
        match &record.payload {
            Payload::Literal(text) => self.write_literal(text),
            Payload::Elements(elements) => {
                self.buffer.push('[');
                for element in elements {
                    self.write(element);
                }
                self.buffer.push(']');
            }
            Payload::Entries(entries) => {
                self.buffer.push('[');
                for (key, value) in entries {
                    self.buffer.push('(');
                    self.write(key);
                    self.buffer.push(':');
                    self.write(value);
                    self.buffer.push(')');
                }
                self.buffer.push(']');
            }
            Payload::Fields(fields) => {
                for field in fields {
                    self.buffer.push('{');
                    self.buffer.push_str(&field.name);
                    self.buffer.push(':');
                    self.write(&field.value);
                    self.buffer.push('}');
                }
            }
        }
        self.buffer.push('}');
    }

    /// Consume this writer and return the text.
    #[must_use]
    pub fn into_string(self) -> String {
        self.buffer
    }

    /// Get a reference to the text written so far.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    fn write_literal(&mut self, text: &str) {
        for c in text.chars() {
            if ESCAPED.contains(&c) {
                self.buffer.push('\\');
            }
            self.buffer.push(c);
        }
    }
}

impl Default for RecordWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{builtin, Field};

    #[test]
    fn write_literals() {
        assert_eq!(write_record(&Record::null()), "{0:}");
        assert_eq!(
            write_record(&Record::literal(builtin::INT, "42")),
            "{4:42}"
        );
        assert_eq!(
            write_record(&Record::literal(builtin::STRING, "Jhones Conrado")),
            "{6:Jhones Conrado}"
        );
    }

    #[test]
    fn write_escapes_structural_characters() {
        let record = Record::literal(builtin::STRING, r"a{b}[c](d)\e");
        assert_eq!(write_record(&record), r"{6:a\{b\}\[c\]\(d\)\\e}");
    }

    #[test]
    fn write_list_and_map() {
        let list = Record::new(
            builtin::LIST,
            Payload::Elements(vec![
                Record::literal(builtin::INT, "1"),
                Record::literal(builtin::INT, "2"),
            ]),
        );
        assert_eq!(write_record(&list), "{8:[{4:1}{4:2}]}");

        let map = Record::new(
            builtin::MAP,
            Payload::Entries(vec![(
                Record::literal(builtin::STRING, "k"),
                Record::literal(builtin::BOOL, "true"),
            )]),
        );
        assert_eq!(write_record(&map), "{10:[({6:k}:{1:true})]}");
    }

    #[test]
    fn write_composite() {
        let record = Record::new(
            33,
            Payload::Fields(vec![
                Field::new("id", Record::literal(builtin::STRING, "p-1")),
                Field::new("nome", Record::literal(builtin::STRING, "Maria")),
            ]),
        );
        assert_eq!(
            write_record(&record),
            "{33:{id:{6:p-1}}{nome:{6:Maria}}}"
        );
    }

    #[test]
    fn empty_sequences() {
        assert_eq!(
            write_record(&Record::new(builtin::LIST, Payload::Elements(vec![]))),
            "{8:[]}"
        );
        assert_eq!(
            write_record(&Record::new(builtin::MAP, Payload::Entries(vec![]))),
            "{10:[]}"
        );
        assert_eq!(
            write_record(&Record::new(40, Payload::Fields(vec![]))),
            "{40:}"
        );
    }
}
