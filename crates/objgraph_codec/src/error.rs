//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while writing or parsing records.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The record text is corrupt or truncated.
    #[error("malformed record at byte {position}: {message}")]
    MalformedRecord {
        /// Byte offset in the input where the problem was detected.
        position: usize,
        /// Description of the structural error.
        message: String,
    },

    /// A literal payload could not be read as the expected scalar.
    #[error("invalid {type_name} literal: {literal:?}")]
    InvalidLiteral {
        /// Name of the scalar type the literal was read as.
        type_name: &'static str,
        /// The offending literal text.
        literal: String,
    },
}

impl CodecError {
    /// Create a malformed record error.
    pub fn malformed(position: usize, message: impl Into<String>) -> Self {
        Self::MalformedRecord {
            position,
            message: message.into(),
        }
    }

    /// Create an invalid literal error.
    pub fn invalid_literal(type_name: &'static str, literal: impl Into<String>) -> Self {
        Self::InvalidLiteral {
            type_name,
            literal: literal.into(),
        }
    }
}
