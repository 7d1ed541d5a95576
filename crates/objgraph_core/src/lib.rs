//! # objgraph Core
//!
//! Object-graph persistence engine for objgraph.
//!
//! This crate provides:
//! - Type schemas with identity, unique and cold attributes
//! - An arena [`Graph`] of typed nodes that may reference each other freely,
//!   cycles included
//! - A schema-aware codec between graphs and bracketed records
//! - Identity assignment, unique attribute enforcement and cascading delete
//! - Attribute filters and a textual query form
//! - The [`Database`] facade over a [`objgraph_storage::RecordBackend`]
//!
//! ## On-disk layout
//!
//! ```text
//! <dir>/LOCK                 exclusive process lock
//! <dir>/TYPES                type name to type index manifest
//! <dir>/records/<Type>/<id>.rec
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cascade;
pub mod codec;
mod config;
mod database;
mod dir;
mod error;
pub mod filter;
mod graph;
mod identity;
mod manifest;
mod query;
mod registry;
mod schema;
mod unique;
mod value;

pub use cascade::CascadeDeleter;
pub use config::Config;
pub use database::{Database, Loaded};
pub use dir::DatabaseDir;
pub use error::{CoreError, CoreResult};
pub use filter::{Filter, NumberOp, Predicate, TextOp};
pub use graph::{Graph, Node, NodeId};
pub use identity::{IdentityResolver, IDENTITY_NAMES};
pub use manifest::TypeManifest;
pub use objgraph_codec::TypeIndex;
pub use query::Query;
pub use registry::{describe_index, Registration, TypeRegistry};
pub use schema::{AttrType, Attribute, TypeSchema, TypeSchemaBuilder, PARENT_MARKER, ROOT_MARKER};
pub use unique::{TypeGuards, TypeLocks, UniquenessGuard};
pub use value::{EntityRef, Value};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
