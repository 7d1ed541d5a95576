//! Identity resolution and assignment.
//!
//! Every entity type has one string attribute that holds its identity. The
//! identity is generated (UUID v4) the first time the entity is saved and
//! never changes afterwards.

use crate::error::{CoreError, CoreResult};
use crate::graph::{Graph, NodeId};
use crate::schema::{AttrType, Attribute};
use crate::value::Value;
use std::collections::HashSet;
use uuid::Uuid;

/// Attribute names recognised as identity without an explicit marker, in
/// order of preference before `id`.
pub const IDENTITY_NAMES: [&str; 2] = ["identity", "identificador"];

/// True if a value does not hold a usable identity.
#[must_use]
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Text(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Finds and assigns entity identities.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityResolver;

impl IdentityResolver {
    /// Determines the identity attribute of a type.
    ///
    /// An explicit name wins. Otherwise the first string attribute named
    /// `identity` or `identificador` is taken, then one named `id`, then the
    /// first string attribute whose name contains `id` in any case. Returns
    /// `None` for value-object types.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSchema` if the explicit name is undeclared or not a
    /// string attribute.
    pub fn resolve(
        type_name: &str,
        explicit: Option<&str>,
        attributes: &[Attribute],
    ) -> CoreResult<Option<usize>> {
        let is_text = |a: &Attribute| *a.ty() == AttrType::Text;

        if let Some(name) = explicit {
            let pos = attributes
                .iter()
                .position(|a| a.name() == name)
                .ok_or_else(|| {
                    CoreError::invalid_schema(format!(
                        "identity {type_name}.{name} is not declared"
                    ))
                })?;
            if !is_text(&attributes[pos]) {
                return Err(CoreError::invalid_schema(format!(
                    "identity {type_name}.{name} must be a string"
                )));
            }
            return Ok(Some(pos));
        }

        let named = |wanted: &str| {
            attributes
                .iter()
                .position(|a| is_text(a) && a.name() == wanted)
        };
        let found = IDENTITY_NAMES
            .iter()
            .find_map(|name| named(*name))
            .or_else(|| named("id"))
            .or_else(|| {
                attributes
                    .iter()
                    .position(|a| is_text(a) && a.name().to_lowercase().contains("id"))
            });
        Ok(found)
    }

    /// Generates a new identity.
    #[must_use]
    pub fn generate() -> String {
        Uuid::new_v4().to_string()
    }

    /// Returns the identity of an entity, generating one if it is blank.
    ///
    /// # Errors
    ///
    /// Returns `IdentityAttributeMissing` for a value-object type.
    pub fn ensure(graph: &mut Graph, node: NodeId) -> CoreResult<String> {
        let entry = graph.node(node)?;
        let pos = entry
            .schema()
            .identity_position()
            .ok_or_else(|| CoreError::identity_missing(entry.type_name()))?;
        if let Some(id) = entry.identity() {
            return Ok(id.to_string());
        }
        let id = Self::generate();
        graph.set_at(node, pos, Value::Text(id.clone()))?;
        tracing::debug!(type_name = %graph.node(node)?.type_name(), %id, "assigned identity");
        Ok(id)
    }

    /// Assigns identities to `root` and to every entity it owns.
    ///
    /// Owned entities are those reachable through non-cold attributes,
    /// including inside collections and through value objects. Ancestors met
    /// again through a cycle are not descended into twice, and the parent or
    /// root recorded on an entity is never treated as owned by it.
    ///
    /// # Errors
    ///
    /// Returns `IdentityAttributeMissing` if `root` is a value object.
    pub fn assign_all(graph: &mut Graph, root: NodeId) -> CoreResult<String> {
        let id = Self::ensure(graph, root)?;
        let mut owned = Vec::new();
        let mut seen = HashSet::from([root]);
        collect_owned(graph, root, root, &mut seen, &mut owned)?;
        for node in owned {
            if graph.node(node)?.schema().has_identity() {
                Self::ensure(graph, node)?;
            }
        }
        Ok(id)
    }
}

/// Collects every composite owned by `node`, each once, in discovery order.
fn collect_owned(
    graph: &Graph,
    node: NodeId,
    owner: NodeId,
    seen: &mut HashSet<NodeId>,
    out: &mut Vec<NodeId>,
) -> CoreResult<()> {
    for child in owned_children(graph, node, owner)? {
        if seen.insert(child) {
            out.push(child);
            let owner = nearest_entity(graph, child, owner)?;
            collect_owned(graph, child, owner, seen, out)?;
        }
    }
    Ok(())
}

/// Composites held by the non-cold attributes of `node`.
///
/// `owner` is the entity enclosing `node`: the node itself, or for a value
/// object the nearest entity above it. The parent and root recorded on
/// `owner` are left out, since they own it rather than the other way round.
pub(crate) fn owned_children(
    graph: &Graph,
    node: NodeId,
    owner: NodeId,
) -> CoreResult<Vec<NodeId>> {
    let mut children = Vec::new();
    for (attr, value) in graph.node(node)?.values() {
        if !attr.is_cold() {
            child_nodes(value, &mut children);
        }
    }
    children.retain(|&child| !graph.is_recorded_ancestor(owner, child));
    Ok(children)
}

/// `node` itself if it is an entity, otherwise the entity enclosing it.
pub(crate) fn nearest_entity(graph: &Graph, node: NodeId, enclosing: NodeId) -> CoreResult<NodeId> {
    Ok(if graph.node(node)?.schema().has_identity() {
        node
    } else {
        enclosing
    })
}

/// Nodes directly held by a value, looking inside collections.
fn child_nodes(value: &Value, out: &mut Vec<NodeId>) {
    match value {
        Value::Node(id) => out.push(*id),
        Value::List(items) | Value::Set(items) => {
            for item in items {
                child_nodes(item, out);
            }
        }
        Value::Map(entries) => {
            for (key, value) in entries {
                child_nodes(key, out);
                child_nodes(value, out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::TypeSchema;
    use std::sync::Arc;

    fn attrs(names: &[(&str, AttrType)]) -> Vec<Attribute> {
        names
            .iter()
            .map(|(name, ty)| Attribute::new(*name, ty.clone()))
            .collect()
    }

    #[test]
    fn explicit_marker_wins() {
        let a = attrs(&[("id", AttrType::Text), ("codigo", AttrType::Text)]);
        assert_eq!(IdentityResolver::resolve("T", Some("codigo"), &a).unwrap(), Some(1));
        assert!(IdentityResolver::resolve("T", Some("nope"), &a).is_err());

        let a = attrs(&[("n", AttrType::Int)]);
        assert!(IdentityResolver::resolve("T", Some("n"), &a).is_err());
    }

    #[test]
    fn fallback_order() {
        let a = attrs(&[
            ("userId", AttrType::Text),
            ("id", AttrType::Text),
            ("identificador", AttrType::Text),
        ]);
        assert_eq!(IdentityResolver::resolve("T", None, &a).unwrap(), Some(2));

        let a = attrs(&[("userId", AttrType::Text), ("id", AttrType::Text)]);
        assert_eq!(IdentityResolver::resolve("T", None, &a).unwrap(), Some(1));

        let a = attrs(&[("nome", AttrType::Text), ("ClientID", AttrType::Text)]);
        assert_eq!(IdentityResolver::resolve("T", None, &a).unwrap(), Some(1));

        let a = attrs(&[("id", AttrType::Int), ("rua", AttrType::Text)]);
        assert_eq!(IdentityResolver::resolve("T", None, &a).unwrap(), None);
    }

    #[test]
    fn ensure_assigns_once() {
        let schema = Arc::new(
            TypeSchema::builder("Pessoa")
                .attribute("id", AttrType::Text)
                .build()
                .unwrap(),
        );
        let mut graph = Graph::new();
        let p = graph.create(schema);

        let first = IdentityResolver::ensure(&mut graph, p).unwrap();
        assert!(Uuid::parse_str(&first).is_ok());
        let second = IdentityResolver::ensure(&mut graph, p).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn ensure_requires_identity() {
        let schema = Arc::new(
            TypeSchema::builder("Endereco")
                .attribute("rua", AttrType::Text)
                .build()
                .unwrap(),
        );
        let mut graph = Graph::new();
        let e = graph.create(schema);
        assert!(matches!(
            IdentityResolver::ensure(&mut graph, e),
            Err(CoreError::IdentityAttributeMissing { .. })
        ));
    }

    #[test]
    fn assign_all_reaches_owned_entities_only() {
        let item = Arc::new(
            TypeSchema::builder("Item")
                .attribute("id", AttrType::Text)
                .attribute("pedido", AttrType::object("Pedido"))
                .build()
                .unwrap(),
        );
        let pedido = Arc::new(
            TypeSchema::builder("Pedido")
                .attribute("id", AttrType::Text)
                .attribute("itens", AttrType::list(AttrType::object("Item")))
                .cold("anterior", AttrType::object("Pedido"))
                .build()
                .unwrap(),
        );
        let mut graph = Graph::new();
        let p = graph.create(pedido.clone());
        let previous = graph.create(pedido);
        let i = graph.create(item);
        graph.set(p, "itens", vec![Value::Node(i)]).unwrap();
        graph.set(i, "pedido", p).unwrap();
        graph.set(p, "anterior", previous).unwrap();

        IdentityResolver::assign_all(&mut graph, p).unwrap();
        assert!(graph.identity(p).is_some());
        assert!(graph.identity(i).is_some());
        assert_eq!(graph.identity(previous), None);
    }
}
