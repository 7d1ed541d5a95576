//! Ancestor stack used to break cycles.

use crate::graph::{Graph, NodeId};

/// Stack of the composites enclosing the one being encoded or decoded.
///
/// The first entry is the traversal root. Reaching a node that is already on
/// the path means the graph has a cycle, and the encoder writes a reference
/// instead of descending again.
#[derive(Debug, Clone, Default)]
pub struct TraversalPath {
    nodes: Vec<NodeId>,
}

impl TraversalPath {
    /// Creates an empty path.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enters a node.
    pub fn push(&mut self, node: NodeId) {
        self.nodes.push(node);
    }

    /// Leaves the innermost node.
    pub fn pop(&mut self) -> Option<NodeId> {
        self.nodes.pop()
    }

    /// True if the node encloses the current position.
    #[must_use]
    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains(&node)
    }

    /// Depth of the path.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True at the traversal root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Innermost enclosing entity, skipping value objects.
    #[must_use]
    pub fn parent_entity(&self, graph: &Graph) -> Option<NodeId> {
        self.nodes
            .iter()
            .rev()
            .copied()
            .find(|&n| is_entity(graph, n))
    }

    /// Outermost enclosing entity.
    #[must_use]
    pub fn root_entity(&self, graph: &Graph) -> Option<NodeId> {
        self.nodes.iter().copied().find(|&n| is_entity(graph, n))
    }

    /// Innermost ancestor with the given type and identity.
    #[must_use]
    pub fn find(&self, graph: &Graph, type_name: &str, identity: &str) -> Option<NodeId> {
        self.nodes.iter().rev().copied().find(|&n| {
            graph
                .node(n)
                .is_ok_and(|node| node.type_name() == type_name && node.identity() == Some(identity))
        })
    }
}

fn is_entity(graph: &Graph, node: NodeId) -> bool {
    graph
        .node(node)
        .is_ok_and(|n| n.schema().has_identity())
}
