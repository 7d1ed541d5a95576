//! Record to value decoding.

use super::path::TraversalPath;
use super::{check_declared, ANY};
use crate::error::{CoreError, CoreResult};
use crate::graph::{Graph, NodeId};
use crate::registry::{describe_index, TypeRegistry};
use crate::schema::{AttrType, TypeSchema, PARENT_MARKER, ROOT_MARKER};
use crate::value::{EntityRef, Value};
use chrono::{DateTime, Utc};
use objgraph_codec::{builtin, literal, CodecError, Field, Payload, Record};
use std::sync::Arc;

/// Decodes records into a graph.
///
/// Composites become new nodes. A bare identity naming an ancestor on the
/// decode path is linked to that ancestor; any other bare identity becomes a
/// lazy [`Value::Ref`].
pub struct Decoder<'a> {
    registry: &'a TypeRegistry,
    graph: &'a mut Graph,
    path: TraversalPath,
}

impl<'a> Decoder<'a> {
    /// Creates a decoder that adds nodes to `graph`.
    pub fn new(registry: &'a TypeRegistry, graph: &'a mut Graph) -> Self {
        Self {
            registry,
            graph,
            path: TraversalPath::new(),
        }
    }

    /// Decodes a stored entity record.
    ///
    /// # Errors
    ///
    /// Returns `InvalidFormat` if the record is not a composite, and codec or
    /// registry errors from the fields.
    pub fn decode_entity(&mut self, record: &Record) -> CoreResult<NodeId> {
        match self.decode(record, &ANY)? {
            Value::Node(node) => Ok(node),
            other => Err(CoreError::invalid_format(format!(
                "expected a composite record, found {} ({})",
                describe_index(self.registry, record.type_index),
                other.kind()
            ))),
        }
    }

    /// Decodes a record as a value of type `ty`.
    ///
    /// # Errors
    ///
    /// Returns `Codec` errors for bad literals or payload shapes,
    /// `TypeNotRegistered` for unknown type indices, and
    /// `UnsupportedValueType` for a composite whose type `ty` does not allow.
    pub fn decode(&mut self, record: &Record, ty: &AttrType) -> CoreResult<Value> {
        match record.type_index {
            builtin::NULL => Ok(Value::Null),
            builtin::LIST => Ok(Value::List(self.elements(record, element_type(ty))?)),
            builtin::SET => Ok(Value::Set(self.elements(record, element_type(ty))?)),
            builtin::MAP => self.map(record, ty),
            index if builtin::is_builtin(index) => scalar(record, ty),
            index => self.composite(index, record, ty),
        }
    }

    fn elements(&mut self, record: &Record, inner: &AttrType) -> CoreResult<Vec<Value>> {
        match &record.payload {
            Payload::Elements(items) => items.iter().map(|item| self.decode(item, inner)).collect(),
            Payload::Literal(text) if text.is_empty() => Ok(Vec::new()),
            _ => Err(shape_error(record, "a sequence")),
        }
    }

    fn map(&mut self, record: &Record, ty: &AttrType) -> CoreResult<Value> {
        let (key_ty, value_ty) = match ty {
            AttrType::Map(key, value) => (key.as_ref(), value.as_ref()),
            _ => (&ANY, &ANY),
        };
        match &record.payload {
            Payload::Entries(entries) => {
                let mut decoded = Vec::with_capacity(entries.len());
                for (key, value) in entries {
                    decoded.push((self.decode(key, key_ty)?, self.decode(value, value_ty)?));
                }
                Ok(Value::Map(decoded))
            }
            Payload::Elements(items) if items.is_empty() => Ok(Value::Map(Vec::new())),
            Payload::Literal(text) if text.is_empty() => Ok(Value::Map(Vec::new())),
            _ => Err(shape_error(record, "map entries")),
        }
    }

    fn composite(&mut self, index: u32, record: &Record, ty: &AttrType) -> CoreResult<Value> {
        let schema = self.registry.type_of(index)?;
        check_declared(ty, schema.name())?;
        match &record.payload {
            Payload::Literal(id) if schema.has_identity() && !id.is_empty() => Ok(self
                .path
                .find(self.graph, schema.name(), id)
                .map_or_else(|| Value::Ref(EntityRef::new(schema.name(), id.as_str())), Value::Node)),
            Payload::Literal(text) if text.is_empty() => Ok(Value::Node(self.graph.create(schema))),
            Payload::Fields(fields) => self.fields(schema, fields).map(Value::Node),
            _ => Err(shape_error(record, "attributes")),
        }
    }

    fn fields(&mut self, schema: Arc<TypeSchema>, fields: &[Field]) -> CoreResult<NodeId> {
        let node = self.graph.create(Arc::clone(&schema));

        // Identity first, so descendants referring back can find this node.
        let identity = schema.identity_position();
        if let Some(pos) = identity {
            let name = schema.attributes()[pos].name();
            if let Some(field) = fields.iter().find(|f| f.name == name) {
                let value = self.decode(&field.value, &AttrType::Text)?;
                self.graph.set_at(node, pos, value)?;
            }
        }

        self.path.push(node);
        let result = self.assign(node, &schema, identity, fields);
        self.path.pop();
        result.map(|()| node)
    }

    fn assign(
        &mut self,
        node: NodeId,
        schema: &TypeSchema,
        identity: Option<usize>,
        fields: &[Field],
    ) -> CoreResult<()> {
        let mut parent = None;
        let mut root = None;
        for field in fields {
            match schema.position(&field.name) {
                Some(pos) if Some(pos) == identity => {}
                Some(pos) => {
                    let value = self.decode(&field.value, schema.attributes()[pos].ty())?;
                    self.graph.set_at(node, pos, value)?;
                }
                None if field.name == PARENT_MARKER => {
                    parent = Some(self.decode(&field.value, &ANY)?);
                }
                None if field.name == ROOT_MARKER => {
                    root = Some(self.decode(&field.value, &ANY)?);
                }
                None => {
                    tracing::debug!(
                        type_name = %schema.name(),
                        field = %field.name,
                        "skipping unknown field"
                    );
                }
            }
        }
        if parent.is_some() || root.is_some() {
            self.graph.set_markers(node, parent, root)?;
        }
        Ok(())
    }
}

fn element_type(ty: &AttrType) -> &AttrType {
    match ty {
        AttrType::List(inner) | AttrType::Set(inner) => inner.as_ref(),
        _ => &ANY,
    }
}

/// Decodes a literal, converting numbers to the declared numeric type.
fn scalar(record: &Record, ty: &AttrType) -> CoreResult<Value> {
    let text = record
        .as_literal()
        .ok_or_else(|| shape_error(record, "a literal"))?;
    let numeric = matches!(
        record.type_index,
        builtin::INT | builtin::FLOAT | builtin::BYTE
    );

    let value = match (ty, record.type_index) {
        (AttrType::Int, _) if numeric => Value::Int(literal::parse_integral(text)?),
        (AttrType::Byte, _) if numeric => Value::Byte(literal::parse_byte(text)?),
        (AttrType::Float, _) if numeric => Value::Float(literal::parse_float(text)?),
        (_, builtin::BOOL) => Value::Bool(literal::parse_bool(text)?),
        (_, builtin::BYTE) => Value::Byte(literal::parse_byte(text)?),
        (_, builtin::CHAR) => Value::Char(literal::parse_char(text)?),
        (_, builtin::INT) => Value::Int(literal::parse_integral(text)?),
        (_, builtin::FLOAT) => Value::Float(literal::parse_float(text)?),
        (_, builtin::STRING) => Value::Text(text.to_string()),
        (_, builtin::DATE) => {
            let millis = literal::parse_integral(text)?;
            let date = DateTime::<Utc>::from_timestamp_millis(millis)
                .ok_or_else(|| CodecError::invalid_literal("date", text))?;
            Value::Date(date)
        }
        (_, index) => return Err(CoreError::type_not_registered(format!("#{index}"))),
    };
    Ok(value)
}

fn shape_error(record: &Record, expected: &str) -> CoreError {
    CodecError::malformed(
        0,
        format!(
            "record of type #{} does not hold {expected}",
            record.type_index
        ),
    )
    .into()
}
