//! Cascading delete planning.

use crate::error::CoreResult;
use crate::graph::{Graph, NodeId};
use crate::identity::{nearest_entity, owned_children};
use std::collections::HashSet;

/// Plans the deletion of an entity together with everything it owns.
///
/// Ownership follows non-cold attributes, including inside lists, sets and
/// maps and through value objects. Cold attributes and lazy references are
/// never followed. An edge back to an ancestor on the current path, or to the
/// parent or root recorded on an entity, is a back-reference, not ownership.
#[derive(Debug)]
pub struct CascadeDeleter<'a> {
    graph: &'a Graph,
}

impl<'a> CascadeDeleter<'a> {
    /// Creates a planner over a graph.
    #[must_use]
    pub fn new(graph: &'a Graph) -> Self {
        Self { graph }
    }

    /// Entities to delete, children before parents, `root` last.
    ///
    /// Each entity appears once. Value objects are traversed but not listed,
    /// since they have no record of their own.
    ///
    /// # Errors
    ///
    /// Returns `UnknownNode` if the graph does not contain `root`.
    pub fn plan(&self, root: NodeId) -> CoreResult<Vec<NodeId>> {
        let mut order = Vec::new();
        let mut visited = HashSet::from([root]);
        let mut path = vec![root];
        self.visit(root, root, &mut path, &mut visited, &mut order)?;
        order.push(root);
        Ok(order)
    }

    fn visit(
        &self,
        node: NodeId,
        owner: NodeId,
        path: &mut Vec<NodeId>,
        visited: &mut HashSet<NodeId>,
        order: &mut Vec<NodeId>,
    ) -> CoreResult<()> {
        for child in owned_children(self.graph, node, owner)? {
            if path.contains(&child) || !visited.insert(child) {
                continue;
            }
            let child_owner = nearest_entity(self.graph, child, owner)?;
            path.push(child);
            let result = self.visit(child, child_owner, path, visited, order);
            path.pop();
            result?;
            if self.graph.node(child)?.schema().has_identity() {
                order.push(child);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AttrType, TypeSchema};
    use crate::value::{EntityRef, Value};
    use std::sync::Arc;

    struct Fixture {
        graph: Graph,
        pedido: NodeId,
        itens: Vec<NodeId>,
        cliente: NodeId,
        detalhe: NodeId,
    }

    fn fixture() -> Fixture {
        let pedido = Arc::new(
            TypeSchema::builder("Pedido")
                .attribute("id", AttrType::Text)
                .attribute("itens", AttrType::list(AttrType::object("Item")))
                .attribute("entrega", AttrType::object("Entrega"))
                .cold("cliente", AttrType::object("Cliente"))
                .cold("origem", AttrType::object("Pedido"))
                .build()
                .unwrap(),
        );
        let item = Arc::new(
            TypeSchema::builder("Item")
                .attribute("id", AttrType::Text)
                .attribute("pedido", AttrType::object("Pedido"))
                .attribute("detalhe", AttrType::object("Detalhe"))
                .build()
                .unwrap(),
        );
        let entrega = Arc::new(
            TypeSchema::builder("Entrega")
                .attribute("detalhe", AttrType::object("Detalhe"))
                .value_object()
                .build()
                .unwrap(),
        );
        let detalhe = Arc::new(
            TypeSchema::builder("Detalhe")
                .attribute("id", AttrType::Text)
                .build()
                .unwrap(),
        );
        let cliente = Arc::new(
            TypeSchema::builder("Cliente")
                .attribute("id", AttrType::Text)
                .build()
                .unwrap(),
        );

        let mut graph = Graph::new();
        let p = graph.create(pedido);
        let i1 = graph.create(Arc::clone(&item));
        let i2 = graph.create(item);
        let e = graph.create(entrega);
        let d = graph.create(detalhe);
        let c = graph.create(cliente);

        graph.set(p, "itens", vec![Value::Node(i1), Value::Node(i2)]).unwrap();
        graph.set(p, "entrega", e).unwrap();
        graph.set(p, "cliente", c).unwrap();
        graph
            .set(p, "origem", EntityRef::new("Pedido", "antigo"))
            .unwrap();
        graph.set(i1, "pedido", p).unwrap();
        graph.set(i2, "pedido", p).unwrap();
        graph.set(i1, "detalhe", d).unwrap();
        graph.set(e, "detalhe", d).unwrap();

        Fixture {
            graph,
            pedido: p,
            itens: vec![i1, i2],
            cliente: c,
            detalhe: d,
        }
    }

    #[test]
    fn children_before_parents_root_last() {
        let f = fixture();
        let plan = CascadeDeleter::new(&f.graph).plan(f.pedido).unwrap();

        assert_eq!(plan.last(), Some(&f.pedido));
        let pos = |n: NodeId| plan.iter().position(|&x| x == n).unwrap();
        assert!(pos(f.detalhe) < pos(f.itens[0]));
        assert!(pos(f.itens[1]) < pos(f.pedido));
        assert_eq!(plan.len(), 4);
    }

    #[test]
    fn cold_and_lazy_references_are_kept() {
        let f = fixture();
        let plan = CascadeDeleter::new(&f.graph).plan(f.pedido).unwrap();
        assert!(!plan.contains(&f.cliente));
    }

    #[test]
    fn recorded_parent_is_not_owned() {
        let mut f = fixture();
        let (item, pedido) = (f.itens[0], f.pedido);
        f.graph
            .set_markers(item, Some(Value::Node(pedido)), Some(Value::Node(pedido)))
            .unwrap();

        let plan = CascadeDeleter::new(&f.graph).plan(item).unwrap();
        assert_eq!(plan, vec![f.detalhe, item]);
    }

    #[test]
    fn parent_named_by_reference_is_not_owned() {
        let mut f = fixture();
        let (item, pedido) = (f.itens[1], f.pedido);
        f.graph.set(pedido, "id", "p-1").unwrap();
        let marker = Value::Ref(EntityRef::new("Pedido", "p-1"));
        f.graph
            .set_markers(item, Some(marker.clone()), Some(marker))
            .unwrap();

        let plan = CascadeDeleter::new(&f.graph).plan(item).unwrap();
        assert!(!plan.contains(&pedido));
        assert_eq!(plan.last(), Some(&item));
    }

    #[test]
    fn lone_entity_plans_itself() {
        let f = fixture();
        let plan = CascadeDeleter::new(&f.graph).plan(f.cliente).unwrap();
        assert_eq!(plan, vec![f.cliente]);
    }
}
