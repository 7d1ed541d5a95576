//! Object graph arena.
//!
//! A [`Graph`] owns every composite of one object graph. Edges between
//! composites are [`NodeId`] indices, so mutual and cyclic references need no
//! shared ownership.

use crate::error::{CoreError, CoreResult};
use crate::identity::is_blank;
use crate::schema::{Attribute, TypeSchema};
use crate::value::Value;
use std::sync::Arc;

/// Index of a node in its [`Graph`].
///
/// Only meaningful for the graph that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Arena index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// One composite instance.
#[derive(Debug, Clone)]
pub struct Node {
    schema: Arc<TypeSchema>,
    values: Vec<Value>,
    parent: Option<Value>,
    root: Option<Value>,
}

impl Node {
    /// Schema of the node.
    #[must_use]
    pub fn schema(&self) -> &Arc<TypeSchema> {
        &self.schema
    }

    /// Type name of the node.
    #[must_use]
    pub fn type_name(&self) -> &str {
        self.schema.name()
    }

    /// Value of an attribute.
    #[must_use]
    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.schema.position(attribute).map(|pos| &self.values[pos])
    }

    /// Attributes with their values, in declaration order.
    pub fn values(&self) -> impl Iterator<Item = (&Attribute, &Value)> {
        self.schema.attributes().iter().zip(&self.values)
    }

    /// The identity, if assigned and non-blank.
    #[must_use]
    pub fn identity(&self) -> Option<&str> {
        let pos = self.schema.identity_position()?;
        match &self.values[pos] {
            Value::Text(id) if !is_blank(&self.values[pos]) => Some(id),
            _ => None,
        }
    }

    /// Parent entity recorded in the `superente` marker when loaded.
    ///
    /// Either a [`Value::Node`] linked to an ancestor in the same graph or a
    /// lazy [`Value::Ref`].
    #[must_use]
    pub fn parent(&self) -> Option<&Value> {
        self.parent.as_ref()
    }

    /// Traversal root recorded in the `root` marker when loaded.
    #[must_use]
    pub fn root(&self) -> Option<&Value> {
        self.root.as_ref()
    }
}

/// Arena of composite nodes.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<Node>,
}

impl Graph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a default-constructed instance of the schema.
    pub fn create(&mut self, schema: Arc<TypeSchema>) -> NodeId {
        let values = schema
            .attributes()
            .iter()
            .map(|attr| attr.ty().default_value())
            .collect();
        self.nodes.push(Node {
            schema,
            values,
            parent: None,
            root: None,
        });
        NodeId(self.nodes.len() - 1)
    }

    /// Returns a node.
    ///
    /// # Errors
    ///
    /// Returns `UnknownNode` if the id is not from this graph.
    pub fn node(&self, id: NodeId) -> CoreResult<&Node> {
        self.nodes
            .get(id.0)
            .ok_or(CoreError::UnknownNode { index: id.0 })
    }

    fn node_mut(&mut self, id: NodeId) -> CoreResult<&mut Node> {
        self.nodes
            .get_mut(id.0)
            .ok_or(CoreError::UnknownNode { index: id.0 })
    }

    /// Reads an attribute.
    ///
    /// # Errors
    ///
    /// Returns `UnknownAttribute` if the type declares no such attribute.
    pub fn get(&self, id: NodeId, attribute: &str) -> CoreResult<&Value> {
        let node = self.node(id)?;
        node.get(attribute)
            .ok_or_else(|| CoreError::unknown_attribute(node.type_name(), attribute))
    }

    /// Assigns an attribute.
    ///
    /// # Errors
    ///
    /// Returns `UnknownAttribute` if the type declares no such attribute and
    /// `IdentityReassigned` when replacing a non-blank identity with a
    /// different value.
    pub fn set(&mut self, id: NodeId, attribute: &str, value: impl Into<Value>) -> CoreResult<()> {
        let value = value.into();
        let node = self.node_mut(id)?;
        let pos = node
            .schema
            .position(attribute)
            .ok_or_else(|| CoreError::unknown_attribute(node.type_name(), attribute))?;
        if node.schema.identity_position() == Some(pos) {
            if let Some(current) = node.identity() {
                if value.as_text() != Some(current) {
                    return Err(CoreError::IdentityReassigned {
                        type_name: node.type_name().to_string(),
                        current: current.to_string(),
                    });
                }
            }
        }
        node.values[pos] = value;
        Ok(())
    }

    /// Appends to a list or set attribute, creating it when null.
    ///
    /// # Errors
    ///
    /// Returns `UnknownAttribute` for an undeclared attribute and
    /// `UnsupportedValueType` if the attribute holds something else.
    pub fn push(&mut self, id: NodeId, attribute: &str, value: impl Into<Value>) -> CoreResult<()> {
        let value = value.into();
        let node = self.node_mut(id)?;
        let pos = node
            .schema
            .position(attribute)
            .ok_or_else(|| CoreError::unknown_attribute(node.type_name(), attribute))?;
        let slot = &mut node.values[pos];
        if slot.is_null() {
            *slot = match node.schema.attributes()[pos].ty() {
                crate::schema::AttrType::Set(_) => Value::Set(Vec::new()),
                _ => Value::List(Vec::new()),
            };
        }
        match slot {
            Value::List(items) => items.push(value),
            Value::Set(items) => {
                if !items.contains(&value) {
                    items.push(value);
                }
            }
            other => return Err(CoreError::unsupported("list or set", other.kind())),
        }
        Ok(())
    }

    /// Writes a slot without identity checks. Used by decoding and identity
    /// assignment.
    pub(crate) fn set_at(&mut self, id: NodeId, pos: usize, value: Value) -> CoreResult<()> {
        let node = self.node_mut(id)?;
        match node.values.get_mut(pos) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(CoreError::unknown_attribute(node.type_name(), pos.to_string())),
        }
    }

    pub(crate) fn set_markers(
        &mut self,
        id: NodeId,
        parent: Option<Value>,
        root: Option<Value>,
    ) -> CoreResult<()> {
        let node = self.node_mut(id)?;
        node.parent = parent;
        node.root = root;
        Ok(())
    }

    /// True if `ancestor` is the parent or root recorded on `node`, either
    /// linked as a node or named by a lazy reference.
    ///
    /// An edge from a node to its recorded ancestor is a back-reference and
    /// never ownership, whichever node a traversal starts from.
    #[must_use]
    pub fn is_recorded_ancestor(&self, node: NodeId, ancestor: NodeId) -> bool {
        let (Ok(entry), Ok(target)) = (self.node(node), self.node(ancestor)) else {
            return false;
        };
        [entry.parent(), entry.root()]
            .into_iter()
            .flatten()
            .any(|marker| match marker {
                Value::Node(n) => *n == ancestor,
                Value::Ref(r) => {
                    r.type_name == target.type_name() && target.identity() == Some(r.id.as_str())
                }
                _ => false,
            })
    }

    /// Identity of a node, if assigned.
    #[must_use]
    pub fn identity(&self, id: NodeId) -> Option<&str> {
        self.nodes.get(id.0).and_then(Node::identity)
    }

    /// Finds a node by type and identity.
    #[must_use]
    pub fn find(&self, type_name: &str, identity: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|n| n.type_name() == type_name && n.identity() == Some(identity))
            .map(NodeId)
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterates all nodes.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::AttrType;

    fn schema() -> Arc<TypeSchema> {
        Arc::new(
            TypeSchema::builder("Pessoa")
                .attribute("id", AttrType::Text)
                .attribute("nome", AttrType::Text)
                .attribute("idade", AttrType::Int)
                .attribute("apelidos", AttrType::set(AttrType::Text))
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn create_uses_defaults() {
        let mut graph = Graph::new();
        let p = graph.create(schema());
        assert_eq!(graph.get(p, "idade").unwrap(), &Value::Int(0));
        assert_eq!(graph.get(p, "nome").unwrap(), &Value::Null);
        assert_eq!(graph.identity(p), None);
        assert!(matches!(
            graph.get(p, "missing"),
            Err(CoreError::UnknownAttribute { .. })
        ));
    }

    #[test]
    fn identity_is_write_once() {
        let mut graph = Graph::new();
        let p = graph.create(schema());
        graph.set(p, "id", "  ").unwrap();
        assert_eq!(graph.identity(p), None);

        graph.set(p, "id", "a").unwrap();
        graph.set(p, "id", "a").unwrap();
        assert!(matches!(
            graph.set(p, "id", "b"),
            Err(CoreError::IdentityReassigned { .. })
        ));
        assert_eq!(graph.find("Pessoa", "a"), Some(p));
    }

    #[test]
    fn push_creates_collection() {
        let mut graph = Graph::new();
        let p = graph.create(schema());
        graph.push(p, "apelidos", "Jo").unwrap();
        graph.push(p, "apelidos", "Jo").unwrap();
        assert_eq!(
            graph.get(p, "apelidos").unwrap(),
            &Value::Set(vec!["Jo".into()])
        );
        assert!(graph.push(p, "idade", 1).is_err());
    }

    #[test]
    fn foreign_node_id_is_rejected() {
        let mut other = Graph::new();
        other.create(schema());
        let id = other.create(schema());
        assert!(matches!(
            Graph::new().node(id),
            Err(CoreError::UnknownNode { index: 1 })
        ));
    }
}
