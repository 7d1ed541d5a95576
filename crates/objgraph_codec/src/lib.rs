//! # objgraph Codec
//!
//! The bracketed record format used by objgraph.
//!
//! Every value is stored as `{<typeIndex>:<payload>}` where the payload depends
//! on the value's category:
//!
//! - scalars: the raw literal text, with `\ { } [ ] ( )` escaped by `\`
//! - lists and sets: `[` followed by the element records, then `]`
//! - maps: `[` followed by `({key}:{value})` entries, then `]`
//! - composites: a sequence of `{name:{value}}` attributes
//! - entity references: the bare identity literal
//!
//! This crate knows nothing about schemas. It only guarantees that brackets
//! are balanced and that [`write_record`] and [`parse_record`] are exact
//! inverses.
//!
//! ## Usage
//!
//! ```
//! use objgraph_codec::{builtin, parse_record, write_record, Field, Payload, Record};
//!
//! let record = Record::new(
//!     40,
//!     Payload::Fields(vec![Field::new("nome", Record::literal(builtin::STRING, "Carla"))]),
//! );
//! let text = write_record(&record);
//! assert_eq!(text, "{40:{nome:{6:Carla}}}");
//! assert_eq!(parse_record(&text).unwrap(), record);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod decoder;
mod encoder;
mod error;
pub mod literal;
mod record;

pub use decoder::{parse_record, RecordParser, MAX_DEPTH};
pub use encoder::{write_record, RecordWriter};
pub use error::{CodecError, CodecResult};
pub use record::{builtin, Field, Payload, Record, TypeIndex};
