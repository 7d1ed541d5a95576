//! Value to record encoding.

use super::path::TraversalPath;
use super::{check_declared, ANY};
use crate::error::{CoreError, CoreResult};
use crate::graph::{Graph, NodeId};
use crate::registry::TypeRegistry;
use crate::schema::{AttrType, TypeSchema, PARENT_MARKER, ROOT_MARKER};
use crate::value::{EntityRef, Value};
use objgraph_codec::{builtin, literal, Field, Payload, Record, TypeIndex, MAX_DEPTH};
use std::sync::Arc;

/// One entity record produced by encoding.
#[derive(Debug, Clone)]
pub struct EncodedEntity {
    /// Node the record was built from.
    pub node: NodeId,
    /// Schema of the entity.
    pub schema: Arc<TypeSchema>,
    /// Identity of the entity.
    pub id: String,
    /// The record.
    pub record: Record,
    /// Parent and root entity the record was nested under, `None` for the
    /// entity a save started from.
    pub ancestors: Option<(NodeId, NodeId)>,
}

/// Records produced by encoding an entity for storage.
#[derive(Debug, Clone)]
pub struct EntityEncoding {
    /// The entity itself.
    pub root: EncodedEntity,
    /// Owned sub-entities, each finished before the entities enclosing it.
    pub owned: Vec<EncodedEntity>,
}

/// Encodes values against the registry, tracking ancestors to break cycles.
pub struct Encoder<'a> {
    registry: &'a TypeRegistry,
    graph: &'a Graph,
    path: TraversalPath,
    owned: Vec<EncodedEntity>,
    depth: usize,
}

impl<'a> Encoder<'a> {
    /// Creates an encoder over a graph.
    #[must_use]
    pub fn new(registry: &'a TypeRegistry, graph: &'a Graph) -> Self {
        Self {
            registry,
            graph,
            path: TraversalPath::new(),
            owned: Vec::new(),
            depth: 0,
        }
    }

    /// Encodes an entity and every entity it owns.
    ///
    /// Identities must already be assigned.
    ///
    /// # Errors
    ///
    /// Returns `IdentityAttributeMissing` for a value object,
    /// `DanglingReference` if a referenced entity has no identity,
    /// `UnsupportedValueType` if a value does not fit its attribute, and
    /// `GraphTooDeep` if the record would nest deeper than a parser accepts.
    pub fn encode_entity(mut self, node: NodeId) -> CoreResult<EntityEncoding> {
        let graph = self.graph;
        let entry = graph.node(node)?;
        let schema = Arc::clone(entry.schema());
        if !schema.has_identity() {
            return Err(CoreError::identity_missing(schema.name()));
        }
        let id = entry
            .identity()
            .ok_or_else(|| CoreError::dangling(schema.name()))?
            .to_string();

        let record = self.nested(|this| this.composite(node, &ANY, false))?;
        Ok(EntityEncoding {
            root: EncodedEntity {
                node,
                schema,
                id,
                record,
                ancestors: None,
            },
            owned: self.owned,
        })
    }

    /// Encodes one value as declared by `ty`.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedValueType` if the value does not fit `ty`, and
    /// `GraphTooDeep` if it nests deeper than a parser accepts.
    pub fn encode_value(&mut self, value: &Value, ty: &AttrType) -> CoreResult<Record> {
        self.encode(value, ty, false)
    }

    /// Runs `f` one record level deeper, failing past [`MAX_DEPTH`].
    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> CoreResult<T>) -> CoreResult<T> {
        if self.depth >= MAX_DEPTH {
            return Err(CoreError::GraphTooDeep { limit: MAX_DEPTH });
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn encode(&mut self, value: &Value, ty: &AttrType, cold: bool) -> CoreResult<Record> {
        self.nested(|this| this.encode_record(value, ty, cold))
    }

    #[allow(clippy::cast_precision_loss)]
    fn encode_record(&mut self, value: &Value, ty: &AttrType, cold: bool) -> CoreResult<Record> {
        use AttrType as T;

        let record = match (value, ty) {
            (Value::Null, _) => Record::null(),

            (Value::Int(n), T::Int | T::Any) => Record::literal(builtin::INT, n.to_string()),
            (Value::Int(n), T::Float) => {
                Record::literal(builtin::FLOAT, literal::format_float(*n as f64))
            }
            (Value::Float(f), T::Float | T::Any) => {
                Record::literal(builtin::FLOAT, literal::format_float(*f))
            }
            (Value::Byte(b), T::Byte | T::Any) => Record::literal(builtin::BYTE, b.to_string()),
            (Value::Byte(b), T::Int) => Record::literal(builtin::INT, b.to_string()),
            (Value::Byte(b), T::Float) => {
                Record::literal(builtin::FLOAT, literal::format_float(f64::from(*b)))
            }

            (Value::Date(d), T::Date | T::Any) => {
                Record::literal(builtin::DATE, d.timestamp_millis().to_string())
            }

            (Value::Text(s), T::Text | T::Any) => Record::literal(builtin::STRING, s.as_str()),
            (Value::Char(c), T::Char | T::Any) => Record::literal(builtin::CHAR, c.to_string()),
            (Value::Bool(b), T::Bool | T::Any) => {
                Record::literal(builtin::BOOL, literal::format_bool(*b))
            }

            (Value::List(items), T::List(inner)) => self.sequence(builtin::LIST, items, inner, cold)?,
            (Value::List(items), T::Any) => self.sequence(builtin::LIST, items, &ANY, cold)?,
            (Value::Set(items), T::Set(inner)) => self.sequence(builtin::SET, items, inner, cold)?,
            (Value::Set(items), T::Any) => self.sequence(builtin::SET, items, &ANY, cold)?,

            (Value::Map(entries), T::Map(key, value)) => self.map(entries, key, value, cold)?,
            (Value::Map(entries), T::Any) => self.map(entries, &ANY, &ANY, cold)?,

            (Value::Node(node), T::Object(_) | T::Any) => self.composite(*node, ty, cold)?,
            (Value::Ref(target), T::Object(_) | T::Any) => self.reference(target, ty)?,

            _ => return Err(CoreError::unsupported(ty.to_string(), value.kind())),
        };
        Ok(record)
    }

    fn sequence(
        &mut self,
        index: TypeIndex,
        items: &[Value],
        inner: &AttrType,
        cold: bool,
    ) -> CoreResult<Record> {
        let elements = items
            .iter()
            .map(|item| self.encode(item, inner, cold))
            .collect::<CoreResult<Vec<_>>>()?;
        Ok(Record::new(index, Payload::Elements(elements)))
    }

    fn map(
        &mut self,
        entries: &[(Value, Value)],
        key_ty: &AttrType,
        value_ty: &AttrType,
        cold: bool,
    ) -> CoreResult<Record> {
        let mut encoded = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            encoded.push((
                self.encode(key, key_ty, cold)?,
                self.encode(value, value_ty, cold)?,
            ));
        }
        Ok(Record::new(builtin::MAP, Payload::Entries(encoded)))
    }

    fn reference(&self, target: &EntityRef, ty: &AttrType) -> CoreResult<Record> {
        check_declared(ty, &target.type_name)?;
        if target.id.trim().is_empty() {
            return Err(CoreError::dangling(&target.type_name));
        }
        let index = self.registry.index_of(&target.type_name)?;
        Ok(Record::literal(index, target.id.as_str()))
    }

    /// Compact `{index:identity}` reference to an entity node.
    fn reference_to(&self, node: NodeId) -> CoreResult<Record> {
        let entry = self.graph.node(node)?;
        let identity = entry
            .identity()
            .ok_or_else(|| CoreError::dangling(entry.type_name()))?;
        let index = self.registry.index_of(entry.type_name())?;
        Ok(Record::literal(index, identity))
    }

    fn composite(&mut self, node: NodeId, ty: &AttrType, cold: bool) -> CoreResult<Record> {
        let graph = self.graph;
        let entry = graph.node(node)?;
        let schema = entry.schema();
        check_declared(ty, schema.name())?;

        if schema.has_identity() {
            let enclosing = self.path.parent_entity(graph);
            let back_reference =
                enclosing.is_some_and(|owner| graph.is_recorded_ancestor(owner, node));
            if cold || back_reference || self.path.contains(node) {
                return self.reference_to(node);
            }
        } else if self.path.contains(node) {
            return Err(CoreError::unsupported(
                format!("acyclic {}", schema.name()),
                "cycle through a value without identity",
            ));
        }

        let index = self.registry.index_of(schema.name())?;
        let ancestors = self
            .path
            .parent_entity(graph)
            .zip(self.path.root_entity(graph));
        let markers = if schema.has_identity() {
            self.markers(node, schema, ancestors)?
        } else {
            Vec::new()
        };
        if !markers.is_empty() && self.depth >= MAX_DEPTH {
            return Err(CoreError::GraphTooDeep { limit: MAX_DEPTH });
        }

        self.path.push(node);
        let fields = entry
            .values()
            .map(|(attr, value)| {
                self.encode(value, attr.ty(), attr.is_cold())
                    .map(|record| Field::new(attr.name(), record))
            })
            .collect::<CoreResult<Vec<_>>>();
        self.path.pop();

        let mut fields = fields?;
        fields.extend(markers);
        let record = Record::new(index, Payload::Fields(fields));

        if schema.has_identity() && !self.path.is_empty() {
            let id = entry
                .identity()
                .ok_or_else(|| CoreError::dangling(schema.name()))?;
            self.owned.push(EncodedEntity {
                node,
                schema: Arc::clone(schema),
                id: id.to_string(),
                record: record.clone(),
                ancestors,
            });
        }
        Ok(record)
    }

    /// `superente` and `root` fields, skipping names the schema declares
    /// itself.
    ///
    /// A nested entity points at the entities enclosing it on the current
    /// path. The entity a save starts from keeps whatever parent and root it
    /// was recorded under, so rewriting it alone does not drop its ancestry.
    fn markers(
        &self,
        node: NodeId,
        schema: &TypeSchema,
        ancestors: Option<(NodeId, NodeId)>,
    ) -> CoreResult<Vec<Field>> {
        let mut fields = Vec::new();
        let targets = match ancestors {
            Some((parent, root)) => [
                Some(self.reference_to(parent)?),
                Some(self.reference_to(root)?),
            ],
            None => {
                let entry = self.graph.node(node)?;
                [
                    entry.parent().map(|v| self.recorded(v)).transpose()?,
                    entry.root().map(|v| self.recorded(v)).transpose()?,
                ]
            }
        };
        for (name, target) in [PARENT_MARKER, ROOT_MARKER].into_iter().zip(targets) {
            if let Some(target) = target {
                if !schema.declares(name) {
                    fields.push(Field::new(name, target));
                }
            }
        }
        Ok(fields)
    }

    /// Reference record for a recorded marker value.
    fn recorded(&self, marker: &Value) -> CoreResult<Record> {
        match marker {
            Value::Node(node) => self.reference_to(*node),
            Value::Ref(target) => self.reference(target, &ANY),
            other => Err(CoreError::unsupported("entity", other.kind())),
        }
    }
}
