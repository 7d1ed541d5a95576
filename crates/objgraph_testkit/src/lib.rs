//! # objgraph Testkit
//!
//! Test utilities for objgraph.
//!
//! This crate provides:
//! - Test fixtures, a small domain model and database helpers
//! - Property-based test generators using proptest
//! - Cross-crate integration test helpers
//! - Fuzz testing harnesses
//! - Stress testing utilities
//! - Shared record and filter test vectors
//!
//! ## Usage
//!
//! ```rust
//! use objgraph_testkit::prelude::*;
//!
//! with_temp_db(|db| {
//!     let ids = scenarios::people(db, &["Carla", "Maria"]);
//!     assert_eq!(db.query("Pessoa tpi nome ar").unwrap().len(), 2);
//!     assert_eq!(ids.len(), 2);
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod fuzz;
pub mod generators;
pub mod integration;
pub mod stress;
pub mod vectors;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::fuzz::*;
    pub use crate::generators::*;
    pub use crate::integration::*;
    pub use crate::stress::*;
    pub use crate::vectors::*;
}

pub use fixtures::*;
pub use fuzz::*;
pub use generators::*;
pub use integration::*;
pub use stress::*;
pub use vectors::*;
