//! Attribute filters.
//!
//! A [`Filter`] is an ordered list of [`Predicate`]s that must all hold. Its
//! text form is one predicate per line, each written as
//! `<opcode> <attribute> <value>`:
//!
//! | opcode | test |
//! |---|---|
//! | `ti` `tp` `tc` `tt` | text equals, contains, starts with, ends with |
//! | `tii` `tpi` `tci` `tti` | the same, ignoring case |
//! | `ni` `nl` `ng` | number equals, less than, greater than |
//! | `nb` | number between two inclusive bounds, `<low> <high>` |
//! | `bi` | boolean equals, `true` or `false` |
//!
//! ```
//! use objgraph_core::filter::Filter;
//!
//! let filter: Filter = "tpi nome ar\nng idade 18".parse().unwrap();
//! assert_eq!(filter.predicates().len(), 2);
//! assert_eq!(filter.to_string(), "tpi nome AR\nng idade 18");
//! ```

mod predicate;

pub use predicate::{NumberOp, Predicate, TextOp};

use crate::error::{CoreError, CoreResult};
use crate::graph::{Graph, NodeId};
use crate::value::Value;
use std::fmt;
use std::str::FromStr;

/// Conjunction of predicates. An empty filter matches everything.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Filter {
    predicates: Vec<Predicate>,
}

impl Filter {
    /// Creates an empty filter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a predicate.
    #[must_use]
    pub fn and(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Predicates in order.
    #[must_use]
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// True if there is nothing to test.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// Tests a node. A predicate whose attribute path does not resolve fails.
    #[must_use]
    pub fn matches(&self, graph: &Graph, node: NodeId) -> bool {
        self.predicates.iter().all(|predicate| {
            resolve_path(graph, node, predicate.attribute())
                .is_some_and(|value| predicate.matches_value(value))
        })
    }
}

impl From<Predicate> for Filter {
    fn from(predicate: Predicate) -> Self {
        Self {
            predicates: vec![predicate],
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, predicate) in self.predicates.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{predicate}")?;
        }
        Ok(())
    }
}

impl FromStr for Filter {
    type Err = CoreError;

    fn from_str(text: &str) -> CoreResult<Self> {
        let predicates = text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(str::parse)
            .collect::<CoreResult<Vec<_>>>()?;
        Ok(Self { predicates })
    }
}

/// Follows a dotted attribute path from a node through nested composites.
#[must_use]
pub fn resolve_path<'g>(graph: &'g Graph, node: NodeId, path: &str) -> Option<&'g Value> {
    let mut current = node;
    let mut segments = path.split('.').peekable();
    while let Some(segment) = segments.next() {
        let value = graph.node(current).ok()?.get(segment)?;
        if segments.peek().is_none() {
            return Some(value);
        }
        current = value.as_node()?;
    }
    None
}
