//! Schema-aware record codec.
//!
//! Bridges [`Graph`] values and [`objgraph_codec::Record`] trees. Encoding
//! walks the graph depth-first with a [`TraversalPath`]; an entity met again
//! while it is still on the path is written as the compact reference
//! `{typeIndex:identity}`, so every cyclic graph encodes in finite space.
//! Nested entities additionally carry `superente` and `root` marker fields
//! pointing at their enclosing entity and at the traversal root.

mod decode;
mod encode;
mod path;

pub use decode::Decoder;
pub use encode::{EncodedEntity, Encoder, EntityEncoding};
pub use path::TraversalPath;

use crate::error::{CoreError, CoreResult};
use crate::graph::{Graph, NodeId};
use crate::registry::TypeRegistry;
use crate::schema::AttrType;
use crate::value::Value;
use objgraph_codec::Record;

pub(crate) static ANY: AttrType = AttrType::Any;

/// Checks that a composite of type `actual` may stand where `ty` is declared.
fn check_declared(ty: &AttrType, actual: &str) -> CoreResult<()> {
    match ty {
        AttrType::Object(expected) if expected != actual => {
            Err(CoreError::unsupported(expected.as_str(), actual))
        }
        AttrType::Object(_) | AttrType::Any => Ok(()),
        other => Err(CoreError::unsupported(other.to_string(), actual)),
    }
}

/// Encodes a value declared as `ty`.
///
/// # Errors
///
/// Returns `UnsupportedValueType` if the value does not fit `ty`.
pub fn encode_value(
    registry: &TypeRegistry,
    graph: &Graph,
    value: &Value,
    ty: &AttrType,
) -> CoreResult<Record> {
    Encoder::new(registry, graph).encode_value(value, ty)
}

/// Encodes an entity and the entities it owns.
///
/// # Errors
///
/// See [`Encoder::encode_entity`].
pub fn encode_entity(
    registry: &TypeRegistry,
    graph: &Graph,
    node: NodeId,
) -> CoreResult<EntityEncoding> {
    Encoder::new(registry, graph).encode_entity(node)
}

/// Decodes a record declared as `ty`, adding composites to `graph`.
///
/// # Errors
///
/// See [`Decoder::decode`].
pub fn decode_value(
    registry: &TypeRegistry,
    graph: &mut Graph,
    record: &Record,
    ty: &AttrType,
) -> CoreResult<Value> {
    Decoder::new(registry, graph).decode(record, ty)
}

/// Decodes a stored entity record into `graph`.
///
/// # Errors
///
/// See [`Decoder::decode_entity`].
pub fn decode_entity(
    registry: &TypeRegistry,
    graph: &mut Graph,
    record: &Record,
) -> CoreResult<NodeId> {
    Decoder::new(registry, graph).decode_entity(record)
}
