//! Record tree for the bracketed text format.

use crate::encoder::RecordWriter;

/// Registry index carried by every record.
pub type TypeIndex = u32;

/// Builtin type indices.
///
/// These are fixed by the format. Registries must number user types from
/// [`FIRST_USER_INDEX`](builtin::FIRST_USER_INDEX) upward.
pub mod builtin {
    use super::TypeIndex;

    /// Absent value.
    pub const NULL: TypeIndex = 0;
    /// `true` / `false`.
    pub const BOOL: TypeIndex = 1;
    /// Unsigned 8-bit integer.
    pub const BYTE: TypeIndex = 2;
    /// Single Unicode scalar value.
    pub const CHAR: TypeIndex = 3;
    /// Signed 64-bit integer.
    pub const INT: TypeIndex = 4;
    /// 64-bit float.
    pub const FLOAT: TypeIndex = 5;
    /// UTF-8 string.
    pub const STRING: TypeIndex = 6;
    /// Instant, as milliseconds since the Unix epoch (UTC).
    pub const DATE: TypeIndex = 7;
    /// Ordered sequence.
    pub const LIST: TypeIndex = 8;
    /// Sequence without duplicates.
    pub const SET: TypeIndex = 9;
    /// Ordered key/value pairs.
    pub const MAP: TypeIndex = 10;

    /// First index available to user types.
    pub const FIRST_USER_INDEX: TypeIndex = 32;

    /// Returns the display name of a builtin index.
    #[must_use]
    pub fn name(index: TypeIndex) -> Option<&'static str> {
        Some(match index {
            NULL => "null",
            BOOL => "bool",
            BYTE => "byte",
            CHAR => "char",
            INT => "int",
            FLOAT => "float",
            STRING => "string",
            DATE => "date",
            LIST => "list",
            SET => "set",
            MAP => "map",
            _ => return None,
        })
    }

    /// Returns true if the index is reserved for builtin types.
    #[must_use]
    pub const fn is_builtin(index: TypeIndex) -> bool {
        index < FIRST_USER_INDEX
    }
}

/// A single `{name:{value}}` attribute of a composite record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Attribute name.
    pub name: String,
    /// Encoded attribute value.
    pub value: Record,
}

impl Field {
    /// Creates a field.
    pub fn new(name: impl Into<String>, value: Record) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Category-specific record payload.
///
/// The grammar cannot tell an empty element list from an empty entry list,
/// nor an empty literal from a composite without fields. Both parse to the
/// first form; the type index decides what they mean.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Raw scalar text, or a bare identity for entity references.
    Literal(String),
    /// `[...]` list or set elements.
    Elements(Vec<Record>),
    /// `[(key:value)...]` map entries.
    Entries(Vec<(Record, Record)>),
    /// `{name:{value}}...` composite attributes.
    Fields(Vec<Field>),
}

/// An encoded value: `{<typeIndex>:<payload>}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Registry index of the value's type.
    pub type_index: TypeIndex,
    /// The encoded content.
    pub payload: Payload,
}

impl Record {
    /// Creates a record.
    #[must_use]
    pub const fn new(type_index: TypeIndex, payload: Payload) -> Self {
        Self {
            type_index,
            payload,
        }
    }

    /// The null record, `{0:}`.
    #[must_use]
    pub fn null() -> Self {
        Self::literal(builtin::NULL, String::new())
    }

    /// Creates a literal record.
    pub fn literal(type_index: TypeIndex, text: impl Into<String>) -> Self {
        Self::new(type_index, Payload::Literal(text.into()))
    }

    /// Returns true if this is the null record.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.type_index == builtin::NULL
    }

    /// Returns the literal text, if the payload is a literal.
    #[must_use]
    pub fn as_literal(&self) -> Option<&str> {
        match &self.payload {
            Payload::Literal(text) => Some(text),
            _ => None,
        }
    }

    /// Returns the composite fields, if the payload is a field sequence.
    #[must_use]
    pub fn fields(&self) -> Option<&[Field]> {
        match &self.payload {
            Payload::Fields(fields) => Some(fields),
            _ => None,
        }
    }

    /// Looks up a composite field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Record> {
        self.fields()?
            .iter()
            .find(|f| f.name == name)
            .map(|f| &f.value)
    }

    /// Renders the record in the bracketed text format.
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut writer = RecordWriter::new();
        writer.write(self);
        writer.into_string()
    }
}

impl std::fmt::Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_text())
    }
}
