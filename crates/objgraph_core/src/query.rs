//! Textual query surface: `<TypeName> <opcode> <attribute> <value>`.

use crate::error::{CoreError, CoreResult};
use crate::filter::Filter;
use std::fmt;
use std::str::FromStr;

/// A filter scan over all persisted instances of one type.
///
/// Additional predicates follow on later lines, in filter text form.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// Registered type to scan.
    pub type_name: String,
    /// Predicates every returned instance satisfies.
    pub filter: Filter,
}

impl Query {
    /// Creates a query.
    pub fn new(type_name: impl Into<String>, filter: Filter) -> Self {
        Self {
            type_name: type_name.into(),
            filter,
        }
    }
}

impl FromStr for Query {
    type Err = CoreError;

    fn from_str(text: &str) -> CoreResult<Self> {
        let text = text.trim_start();
        let (type_name, filter) = match text.split_once(char::is_whitespace) {
            Some((type_name, filter)) => (type_name, filter),
            None => (text, ""),
        };
        if type_name.is_empty() {
            return Err(CoreError::invalid_filter("query names no type"));
        }
        Ok(Self::new(type_name, filter.parse()?))
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.filter.is_empty() {
            f.write_str(&self.type_name)
        } else {
            write!(f, "{} {}", self.type_name, self.filter)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{Predicate, TextOp};

    #[test]
    fn parse_query() {
        let query: Query = "Pessoa tpi nome ar".parse().unwrap();
        assert_eq!(query.type_name, "Pessoa");
        assert_eq!(
            query.filter,
            Filter::from(Predicate::text_ignore_case("nome", TextOp::Contains, "ar"))
        );
        assert_eq!(query.to_string(), "Pessoa tpi nome AR");
    }

    #[test]
    fn type_only_query_matches_all() {
        let query: Query = "Pessoa".parse().unwrap();
        assert!(query.filter.is_empty());
        assert_eq!(query.to_string(), "Pessoa");
    }

    #[test]
    fn multi_line_query() {
        let query: Query = "Pessoa ti nome Carla\nng idade 20".parse().unwrap();
        assert_eq!(query.filter.predicates().len(), 2);
        assert_eq!(query.to_string(), "Pessoa ti nome Carla\nng idade 20");
    }

    #[test]
    fn malformed_queries() {
        assert!("".parse::<Query>().is_err());
        assert!("Pessoa zz nome x".parse::<Query>().is_err());
        assert!("Pessoa ti nome".parse::<Query>().is_err());
    }
}
