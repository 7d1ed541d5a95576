//! Scalar literal formatting and parsing.
//!
//! Every scalar is stored as the raw text of a literal payload. These helpers
//! fix the textual form of each builtin scalar so that independent writers
//! produce identical records.

use crate::error::{CodecError, CodecResult};

/// Formats a boolean as `true` / `false`.
#[must_use]
pub fn format_bool(value: bool) -> String {
    let text = if value { "true" } else { "false" };
    text.to_string()
}

/// Parses `true` / `false`.
pub fn parse_bool(literal: &str) -> CodecResult<bool> {
    match literal {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(CodecError::invalid_literal("bool", literal)),
    }
}

/// Formats a float so that it always reads back to the same bits.
///
/// Integral values keep a trailing `.0` (`2.0`, not `2`).
#[must_use]
pub fn format_float(value: f64) -> String {
    format!("{value:?}")
}

/// Parses a float literal. Integer literals are accepted.
pub fn parse_float(literal: &str) -> CodecResult<f64> {
    literal
        .parse::<f64>()
        .map_err(|_| CodecError::invalid_literal("float", literal))
}

/// Parses an integral literal.
///
/// A fractional literal is truncated toward zero, never rounded:
/// `"3.9"` reads as `3` and `"-3.9"` as `-3`.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn parse_integral(literal: &str) -> CodecResult<i64> {
    if let Ok(value) = literal.parse::<i64>() {
        return Ok(value);
    }
    let value = parse_float(literal).map_err(|_| CodecError::invalid_literal("int", literal))?;
    let truncated = value.trunc();
    if !truncated.is_finite() || truncated < i64::MIN as f64 || truncated >= i64::MAX as f64 {
        return Err(CodecError::invalid_literal("int", literal));
    }
    Ok(truncated as i64)
}

/// Parses a byte literal (0-255), truncating any fractional part.
pub fn parse_byte(literal: &str) -> CodecResult<u8> {
    let value = parse_integral(literal).map_err(|_| CodecError::invalid_literal("byte", literal))?;
    u8::try_from(value).map_err(|_| CodecError::invalid_literal("byte", literal))
}

/// Parses a single-character literal.
pub fn parse_char(literal: &str) -> CodecResult<char> {
    let mut chars = literal.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(CodecError::invalid_literal("char", literal)),
    }
}
