//! Record parser.

use crate::error::{CodecError, CodecResult};
use crate::record::{Field, Payload, Record, TypeIndex};

/// Parse one record from text.
///
/// Trailing ASCII whitespace is tolerated so hand-edited files with a final
/// newline still load; any other trailing text is an error.
///
/// # Errors
///
/// Returns [`CodecError::MalformedRecord`] if brackets are unbalanced, a
/// separator is missing, or the input is truncated.
pub fn parse_record(text: &str) -> CodecResult<Record> {
    let mut parser = RecordParser::new(text);
    let record = parser.parse()?;
    parser.skip_whitespace();
    if !parser.is_empty() {
        return Err(CodecError::malformed(
            parser.pos,
            "trailing data after record",
        ));
    }
    Ok(record)
}

/// Maximum record nesting depth.
///
/// Deeper input is rejected instead of exhausting the stack. Writers that
/// build records from arbitrary graphs must stay within the same bound.
pub const MAX_DEPTH: usize = 256;

/// A parser for the bracketed record format.
pub struct RecordParser<'a> {
    data: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> RecordParser<'a> {
    /// Create a new parser for the given text.
    #[must_use]
    pub fn new(data: &'a str) -> Self {
        Self {
            data,
            pos: 0,
            depth: 0,
        }
    }

    /// Parse the next record.
    pub fn parse(&mut self) -> CodecResult<Record> {
        self.expect(b'{', "expected '{' opening a record")?;
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(CodecError::malformed(self.pos, "record nesting too deep"));
        }

        let type_index = self.parse_index()?;
        self.expect(b':', "missing ':' after type index")?;

        let payload = match self.peek() {
            Some(b'[') => self.parse_sequence()?,
            Some(b'{') => Payload::Fields(self.parse_fields()?),
            Some(_) => Payload::Literal(self.parse_literal()?),
            None => return Err(self.eof()),
        };

        self.expect(b'}', "expected '}' closing a record")?;
        self.depth -= 1;
        Ok(Record::new(type_index, payload))
    }

    /// Check if all input has been consumed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Get the unconsumed input.
    #[must_use]
    pub fn remaining(&self) -> &str {
        &self.data[self.pos..]
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b) if b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    #[inline]
    fn peek(&self) -> Option<u8> {
        self.data.as_bytes().get(self.pos).copied()
    }

    fn eof(&self) -> CodecError {
        CodecError::malformed(self.pos, "unexpected end of input")
    }

    fn expect(&mut self, byte: u8, message: &str) -> CodecResult<()> {
        match self.peek() {
            Some(b) if b == byte => {
                self.pos += 1;
                Ok(())
            }
            Some(_) => Err(CodecError::malformed(self.pos, message)),
            None => Err(self.eof()),
        }
    }

    fn parse_index(&mut self) -> CodecResult<TypeIndex> {
        let start = self.pos;
        while matches!(self.peek(), Some(b) if b.is_ascii_digit()) {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(CodecError::malformed(start, "missing type index"));
        }
        self.data[start..self.pos]
            .parse()
            .map_err(|_| CodecError::malformed(start, "type index out of range"))
    }

    fn parse_sequence(&mut self) -> CodecResult<Payload> {
        self.expect(b'[', "expected '['")?;
        match self.peek() {
            Some(b'(') => {
                let mut entries = Vec::new();
                while self.peek() == Some(b'(') {
                    self.pos += 1;
                    let key = self.parse()?;
                    self.expect(b':', "missing ':' between map key and value")?;
                    let value = self.parse()?;
                    self.expect(b')', "expected ')' closing a map entry")?;
                    entries.push((key, value));
                }
                self.expect(b']', "expected ']' closing a map")?;
                Ok(Payload::Entries(entries))
            }
            _ => {
                let mut elements = Vec::new();
                while self.peek() == Some(b'{') {
                    elements.push(self.parse()?);
                }
                self.expect(b']', "expected ']' closing a sequence")?;
                Ok(Payload::Elements(elements))
            }
        }
    }

    fn parse_fields(&mut self) -> CodecResult<Vec<Field>> {
        let mut fields = Vec::new();
        while self.peek() == Some(b'{') {
            self.pos += 1;
            let name = self.parse_name()?;
            self.expect(b':', "missing ':' after attribute name")?;
            let value = self.parse()?;
            self.expect(b'}', "expected '}' closing an attribute")?;
            fields.push(Field::new(name, value));
        }
        Ok(fields)
    }

    fn parse_name(&mut self) -> CodecResult<String> {
        let start = self.pos;
        while let Some(b) = self.peek() {
            match b {
                b':' => break,
                b'{' | b'}' | b'[' | b']' | b'(' | b')' | b'\\' => {
                    return Err(CodecError::malformed(
                        self.pos,
                        "invalid character in attribute name",
                    ))
                }
                _ => self.pos += 1,
            }
        }
        if self.peek().is_none() {
            return Err(self.eof());
        }
        if start == self.pos {
            return Err(CodecError::malformed(start, "empty attribute name"));
        }
        Ok(self.data[start..self.pos].to_string())
    }

    fn parse_literal(&mut self) -> CodecResult<String> {
        let mut out = String::new();
        let mut start = self.pos;
        loop {
            match self.peek() {
                None => return Err(self.eof()),
                Some(b'}') => break,
                Some(b'\\') => {
                    out.push_str(&self.data[start..self.pos]);
                    self.pos += 1;
                    match self.peek() {
                        Some(b) if is_escapable(b) => {
                            out.push(char::from(b));
                            self.pos += 1;
                            start = self.pos;
                        }
                        Some(_) => {
                            return Err(CodecError::malformed(self.pos, "invalid escape"))
                        }
                        None => return Err(self.eof()),
                    }
                }
                Some(b'{' | b'[' | b']' | b'(' | b')') => {
                    return Err(CodecError::malformed(
                        self.pos,
                        "unescaped bracket in literal",
                    ))
                }
                Some(_) => self.pos += 1,
            }
        }
        out.push_str(&self.data[start..self.pos]);
        Ok(out)
    }
}

fn is_escapable(byte: u8) -> bool {
    crate::encoder::ESCAPED.contains(&char::from(byte))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::builtin;

    #[test]
    fn parse_literal_record() {
        let record = parse_record("{6:Jhones Conrado}").unwrap();
        assert_eq!(record.type_index, builtin::STRING);
        assert_eq!(record.as_literal(), Some("Jhones Conrado"));
    }

    #[test]
    fn parse_unescapes_literal() {
        let record = parse_record(r"{6:a\{b\}\\c ção}").unwrap();
        assert_eq!(record.as_literal(), Some(r"a{b}\c ção"));
    }

    #[test]
    fn parse_nested_composite() {
        let text = "{33:{nome:{6:Maria}}{tags:{8:[{6:a}{6:b}]}}{pesos:{10:[({6:x}:{5:1.5})]}}}";
        let record = parse_record(text).unwrap();
        assert_eq!(record.type_index, 33);
        assert_eq!(
            record.field("nome").and_then(Record::as_literal),
            Some("Maria")
        );
        match &record.field("tags").unwrap().payload {
            Payload::Elements(items) => assert_eq!(items.len(), 2),
            other => panic!("expected elements, got {other:?}"),
        }
        match &record.field("pesos").unwrap().payload {
            Payload::Entries(entries) => {
                assert_eq!(entries[0].0.as_literal(), Some("x"));
                assert_eq!(entries[0].1.as_literal(), Some("1.5"));
            }
            other => panic!("expected entries, got {other:?}"),
        }
    }

    #[test]
    fn parse_empty_payloads() {
        assert_eq!(
            parse_record("{8:[]}").unwrap().payload,
            Payload::Elements(vec![])
        );
        assert_eq!(
            parse_record("{40:}").unwrap().payload,
            Payload::Literal(String::new())
        );
    }

    #[test]
    fn parse_tolerates_trailing_newline() {
        assert!(parse_record("{4:7}\n").is_ok());
    }

    #[test]
    fn unbalanced_brackets_fail() {
        for text in ["{6:abc", "{33:{nome:{6:x}}", "{8:[{4:1}", "{4:1}}", "{6:a{b}"] {
            let result = parse_record(text);
            assert!(
                matches!(result, Err(CodecError::MalformedRecord { .. })),
                "{text} should be malformed, got {result:?}"
            );
        }
    }

    #[test]
    fn missing_separators_fail() {
        for text in ["{6abc}", "{:abc}", "{33:{nome{6:x}}}", "{10:[({6:k}{6:v})]}"] {
            assert!(
                matches!(parse_record(text), Err(CodecError::MalformedRecord { .. })),
                "{text} should be malformed"
            );
        }
    }

    #[test]
    fn excessive_nesting_fails() {
        let text = format!("{}{{4:1}}{}", "{8:[".repeat(600), "]}".repeat(600));
        assert!(matches!(
            parse_record(&text),
            Err(CodecError::MalformedRecord { .. })
        ));
    }

    #[test]
    fn nesting_limit_is_inclusive() {
        let nested = |levels: usize| {
            format!("{}{{4:1}}{}", "{8:[".repeat(levels - 1), "]}".repeat(levels - 1))
        };
        assert!(parse_record(&nested(MAX_DEPTH)).is_ok());
        assert!(parse_record(&nested(MAX_DEPTH + 1)).is_err());
    }
}
