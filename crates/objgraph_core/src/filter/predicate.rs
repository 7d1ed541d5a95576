//! Single-attribute predicates and their text form.

use crate::error::{CoreError, CoreResult};
use crate::value::Value;
use std::fmt;
use std::str::FromStr;

/// How a text predicate compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextOp {
    /// Whole value equal.
    Equals,
    /// Value contains the operand.
    Contains,
    /// Value starts with the operand.
    StartsWith,
    /// Value ends with the operand.
    EndsWith,
}

impl TextOp {
    fn apply(self, haystack: &str, needle: &str) -> bool {
        match self {
            Self::Equals => haystack == needle,
            Self::Contains => haystack.contains(needle),
            Self::StartsWith => haystack.starts_with(needle),
            Self::EndsWith => haystack.ends_with(needle),
        }
    }

    const fn code(self) -> &'static str {
        match self {
            Self::Equals => "ti",
            Self::Contains => "tp",
            Self::StartsWith => "tc",
            Self::EndsWith => "tt",
        }
    }
}

/// How a number predicate compares. Bounds of `Between` are inclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumberOp {
    /// Equal to.
    Equals(f64),
    /// Strictly less than.
    LessThan(f64),
    /// Strictly greater than.
    GreaterThan(f64),
    /// Within `[low, high]`.
    Between(f64, f64),
}

impl NumberOp {
    #[allow(clippy::float_cmp)]
    fn apply(self, value: f64) -> bool {
        match self {
            Self::Equals(n) => value == n,
            Self::LessThan(n) => value < n,
            Self::GreaterThan(n) => value > n,
            Self::Between(low, high) => low <= value && value <= high,
        }
    }
}

/// A test on one attribute of a node.
///
/// The attribute may be a dotted path through nested composites, such as
/// `endereco.rua`.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Text comparison. Case-insensitive predicates hold their operand in
    /// upper case.
    Text {
        /// Attribute path.
        attribute: String,
        /// Comparison.
        op: TextOp,
        /// Operand.
        value: String,
        /// Whether case is ignored.
        case_insensitive: bool,
    },
    /// Numeric comparison over int, byte and float values.
    Number {
        /// Attribute path.
        attribute: String,
        /// Comparison with its operands.
        op: NumberOp,
    },
    /// Boolean equality.
    Bool {
        /// Attribute path.
        attribute: String,
        /// Expected value.
        value: bool,
    },
}

impl Predicate {
    /// Case-sensitive text predicate.
    pub fn text(attribute: impl Into<String>, op: TextOp, value: impl Into<String>) -> Self {
        Self::Text {
            attribute: attribute.into(),
            op,
            value: value.into(),
            case_insensitive: false,
        }
    }

    /// Case-insensitive text predicate.
    pub fn text_ignore_case(
        attribute: impl Into<String>,
        op: TextOp,
        value: impl AsRef<str>,
    ) -> Self {
        Self::Text {
            attribute: attribute.into(),
            op,
            value: value.as_ref().to_uppercase(),
            case_insensitive: true,
        }
    }

    /// Numeric predicate.
    pub fn number(attribute: impl Into<String>, op: NumberOp) -> Self {
        Self::Number {
            attribute: attribute.into(),
            op,
        }
    }

    /// Boolean predicate.
    pub fn boolean(attribute: impl Into<String>, value: bool) -> Self {
        Self::Bool {
            attribute: attribute.into(),
            value,
        }
    }

    /// Attribute path tested by the predicate.
    #[must_use]
    pub fn attribute(&self) -> &str {
        match self {
            Self::Text { attribute, .. }
            | Self::Number { attribute, .. }
            | Self::Bool { attribute, .. } => attribute,
        }
    }

    /// Tests a resolved attribute value. Values of the wrong kind, including
    /// null, never match.
    #[must_use]
    pub fn matches_value(&self, value: &Value) -> bool {
        match self {
            Self::Text {
                op,
                value: operand,
                case_insensitive,
                ..
            } => {
                let text = match value {
                    Value::Text(s) => s.clone(),
                    Value::Char(c) => c.to_string(),
                    _ => return false,
                };
                if *case_insensitive {
                    op.apply(&text.to_uppercase(), operand)
                } else {
                    op.apply(&text, operand)
                }
            }
            Self::Number { op, .. } => value.as_number().is_some_and(|n| op.apply(n)),
            Self::Bool { value: expected, .. } => value.as_bool() == Some(*expected),
        }
    }
}

/// Writes `<opcode> <attribute> <value>`.
///
/// Text operands are written verbatim, so parsing and writing text
/// predicates gives back the same line. Number operands are written in the
/// shortest form that parses back to the same `f64`: `30.0` becomes `30` and
/// `1e3` becomes `1000`.
impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text {
                attribute,
                op,
                value,
                case_insensitive,
            } => {
                let suffix = if *case_insensitive { "i" } else { "" };
                write!(f, "{}{suffix} {attribute} {value}", op.code())
            }
            Self::Number { attribute, op } => match op {
                NumberOp::Equals(n) => write!(f, "ni {attribute} {n}"),
                NumberOp::LessThan(n) => write!(f, "nl {attribute} {n}"),
                NumberOp::GreaterThan(n) => write!(f, "ng {attribute} {n}"),
                NumberOp::Between(low, high) => write!(f, "nb {attribute} {low} {high}"),
            },
            Self::Bool { attribute, value } => write!(f, "bi {attribute} {value}"),
        }
    }
}

impl FromStr for Predicate {
    type Err = CoreError;

    /// Parses `<opcode> <attribute> <value>`.
    ///
    /// The text is split at the first two whitespace boundaries; the value is
    /// the remainder, verbatim, and may itself contain spaces.
    fn from_str(line: &str) -> CoreResult<Self> {
        let (opcode, rest) = line
            .split_once(char::is_whitespace)
            .ok_or_else(|| CoreError::invalid_filter(format!("missing attribute in {line:?}")))?;
        let (attribute, value) = rest
            .split_once(char::is_whitespace)
            .ok_or_else(|| CoreError::invalid_filter(format!("missing value in {line:?}")))?;
        if attribute.is_empty() {
            return Err(CoreError::invalid_filter(format!(
                "empty attribute in {line:?}"
            )));
        }

        let text_op = |code: &str| match code {
            "ti" => Some(TextOp::Equals),
            "tp" => Some(TextOp::Contains),
            "tc" => Some(TextOp::StartsWith),
            "tt" => Some(TextOp::EndsWith),
            _ => None,
        };

        if let Some(op) = text_op(opcode) {
            return Ok(Self::text(attribute, op, value));
        }
        if let Some(op) = opcode.strip_suffix('i').and_then(text_op) {
            return Ok(Self::text_ignore_case(attribute, op, value));
        }

        let op = match opcode {
            "ni" => NumberOp::Equals(parse_number(value)?),
            "nl" => NumberOp::LessThan(parse_number(value)?),
            "ng" => NumberOp::GreaterThan(parse_number(value)?),
            "nb" => {
                let mut bounds = value.split_whitespace();
                match (bounds.next(), bounds.next(), bounds.next()) {
                    (Some(low), Some(high), None) => {
                        NumberOp::Between(parse_number(low)?, parse_number(high)?)
                    }
                    _ => {
                        return Err(CoreError::invalid_filter(format!(
                            "between needs two bounds, got {value:?}"
                        )))
                    }
                }
            }
            "bi" => {
                let value = match value {
                    "true" => true,
                    "false" => false,
                    _ => {
                        return Err(CoreError::invalid_filter(format!(
                            "expected true or false, got {value:?}"
                        )))
                    }
                };
                return Ok(Self::boolean(attribute, value));
            }
            _ => {
                return Err(CoreError::invalid_filter(format!(
                    "unknown opcode {opcode:?}"
                )))
            }
        };
        Ok(Self::number(attribute, op))
    }
}

fn parse_number(text: &str) -> CoreResult<f64> {
    text.trim()
        .parse()
        .map_err(|_| CoreError::invalid_filter(format!("expected a number, got {text:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_predicates() {
        let nome = Value::Text("Jhones Conrado".into());
        assert!(Predicate::text("nome", TextOp::Contains, "Jhones").matches_value(&nome));
        assert!(Predicate::text("nome", TextOp::StartsWith, "Jho").matches_value(&nome));
        assert!(Predicate::text("nome", TextOp::EndsWith, "rado").matches_value(&nome));
        assert!(!Predicate::text("nome", TextOp::Equals, "Jhones").matches_value(&nome));
        assert!(!Predicate::text("nome", TextOp::Contains, "jhones").matches_value(&nome));
        assert!(Predicate::text_ignore_case("nome", TextOp::Contains, "jhones")
            .matches_value(&nome));
        assert!(!Predicate::text("nome", TextOp::Equals, "x").matches_value(&Value::Null));
    }

    #[test]
    fn number_and_bool_predicates() {
        assert!(Predicate::number("idade", NumberOp::Between(18.0, 30.0)).matches_value(&Value::Int(30)));
        assert!(Predicate::number("idade", NumberOp::LessThan(18.0)).matches_value(&Value::Byte(17)));
        assert!(Predicate::number("altura", NumberOp::GreaterThan(1.7)).matches_value(&Value::Float(1.8)));
        assert!(!Predicate::number("idade", NumberOp::Equals(1.0)).matches_value(&Value::Text("1".into())));
        assert!(Predicate::boolean("ativo", true).matches_value(&Value::Bool(true)));
        assert!(!Predicate::boolean("ativo", true).matches_value(&Value::Null));
    }

    #[test]
    fn parse_splits_on_first_two_boundaries() {
        let p: Predicate = "tp nome Jhones Conrado".parse().unwrap();
        assert_eq!(p, Predicate::text("nome", TextOp::Contains, "Jhones Conrado"));

        let p: Predicate = "tpi nome ar".parse().unwrap();
        assert_eq!(p, Predicate::text_ignore_case("nome", TextOp::Contains, "AR"));
        assert_eq!(p.to_string(), "tpi nome AR");

        let p: Predicate = "nb idade 18 30".parse().unwrap();
        assert_eq!(p, Predicate::number("idade", NumberOp::Between(18.0, 30.0)));
    }

    #[test]
    fn text_form_roundtrips() {
        for text in [
            "ti nome Carla",
            "tp nome Jhones",
            "tc nome Ma",
            "tt nome ria",
            "tii nome CARLA",
            "tpi nome AR",
            "tci nome MA",
            "tti nome RIA",
            "ti endereco.rua Rua Augusta, 10",
            "ni idade 30",
            "nl altura 1.75",
            "ng idade -2",
            "nb idade 18 30",
            "bi ativo false",
        ] {
            let p: Predicate = text.parse().unwrap();
            assert_eq!(p.to_string(), text);
        }
    }

    #[test]
    fn number_operands_use_canonical_form() {
        for (text, canonical) in [
            ("ni idade 30.0", "ni idade 30"),
            ("nl x 1e3", "nl x 1000"),
            ("nb x 0.50 +2", "nb x 0.5 2"),
        ] {
            let p: Predicate = text.parse().unwrap();
            assert_eq!(p.to_string(), canonical);
            assert_eq!(canonical.parse::<Predicate>().unwrap(), p);
        }
    }

    #[test]
    fn parse_rejects_malformed() {
        for text in [
            "",
            "ti",
            "ti nome",
            "xx nome a",
            "ni idade abc",
            "nb idade 1",
            "nb idade 1 2 3",
            "bi ativo sim",
        ] {
            assert!(
                matches!(text.parse::<Predicate>(), Err(CoreError::InvalidFilter { .. })),
                "{text:?}"
            );
        }
    }
}
