//! # objgraph Storage
//!
//! Record storage backends for objgraph.
//!
//! This crate provides the lowest-level storage abstraction. Backends map a
//! [`RecordKey`] (type name, identity) to one text record and are **opaque** -
//! they do not interpret the record format.
//!
//! ## Design Principles
//!
//! - One record per (type, identity), addressed deterministically
//! - Whole-record atomic replacement, no partial writes
//! - Existence checks without reading content
//! - Must be `Send + Sync` for concurrent access
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - For testing and ephemeral storage
//! - [`FileBackend`] - One file per record using OS file APIs
//!
//! ## Example
//!
//! ```rust
//! use objgraph_storage::{InMemoryBackend, RecordBackend, RecordKey};
//!
//! let backend = InMemoryBackend::new();
//! let key = RecordKey::new("Pessoa", "p-1").unwrap();
//! backend.write(&key, "{6:hello world}").unwrap();
//! assert_eq!(backend.read(&key).unwrap().as_deref(), Some("{6:hello world}"));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::{RecordBackend, RecordKey};
pub use error::{StorageError, StorageResult};
pub use file::{escape_id, unescape_id, FileBackend, DEFAULT_EXTENSION};
pub use memory::InMemoryBackend;
