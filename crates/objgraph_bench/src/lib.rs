//! Benchmark utilities.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use objgraph_core::{AttrType, CoreResult, Database, Graph, NodeId, TypeSchema};
use rand::distributions::Alphanumeric;
use rand::Rng;

/// Generate random alphanumeric text of the specified length.
pub fn random_text(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Registers the benchmark schemas: `Cliente` with a unique `email`, and
/// `Pedido` owning a list of `Item`s that point back at it.
///
/// # Errors
///
/// Returns an error if a schema cannot be registered.
pub fn register_schemas(db: &Database) -> CoreResult<()> {
    db.register(
        TypeSchema::builder("Cliente")
            .attribute("id", AttrType::Text)
            .attribute("nome", AttrType::Text)
            .unique("email", AttrType::Text)
            .attribute("idade", AttrType::Int)
            .build()?,
    )?;
    db.register(
        TypeSchema::builder("Pedido")
            .attribute("id", AttrType::Text)
            .attribute("itens", AttrType::list(AttrType::object("Item")))
            .cold("cliente", AttrType::object("Cliente"))
            .build()?,
    )?;
    db.register(
        TypeSchema::builder("Item")
            .attribute("id", AttrType::Text)
            .attribute("descricao", AttrType::Text)
            .attribute("preco", AttrType::Float)
            .attribute("pedido", AttrType::object("Pedido"))
            .build()?,
    )?;
    Ok(())
}

/// Adds a `Cliente` with random text fields of `text_len` characters.
///
/// # Errors
///
/// Returns an error if the type is not registered.
pub fn cliente(db: &Database, graph: &mut Graph, text_len: usize) -> CoreResult<NodeId> {
    let c = db.create(graph, "Cliente")?;
    graph.set(c, "nome", random_text(text_len))?;
    graph.set(c, "email", format!("{}@example.com", random_text(12)))?;
    graph.set(c, "idade", rand::thread_rng().gen_range(18i64..90))?;
    Ok(c)
}

/// Adds a `Pedido` owning `items` items.
///
/// # Errors
///
/// Returns an error if the types are not registered.
pub fn pedido(db: &Database, graph: &mut Graph, items: usize) -> CoreResult<NodeId> {
    let p = db.create(graph, "Pedido")?;
    for _ in 0..items {
        let i = db.create(graph, "Item")?;
        graph.set(i, "descricao", random_text(24))?;
        graph.set(i, "preco", rand::thread_rng().gen_range(1.0f64..500.0))?;
        graph.set(i, "pedido", p)?;
        graph.push(p, "itens", i)?;
    }
    Ok(p)
}
