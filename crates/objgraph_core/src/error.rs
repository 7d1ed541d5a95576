//! Error types for objgraph core.

use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in objgraph core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] objgraph_storage::StorageError),

    /// Record grammar error.
    #[error("codec error: {0}")]
    Codec(#[from] objgraph_codec::CodecError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A runtime value does not fit the declared attribute type, or a
    /// composite cycle runs through a value without identity.
    #[error("unsupported value: expected {expected}, found {found}")]
    UnsupportedValueType {
        /// What the schema declares.
        expected: String,
        /// What was found at runtime.
        found: String,
    },

    /// The graph nests deeper than a stored record may.
    #[error("graph too deep: records nest at most {limit} levels")]
    GraphTooDeep {
        /// Maximum record nesting depth.
        limit: usize,
    },

    /// No type is registered under the given name or index.
    #[error("type not registered: {name}")]
    TypeNotRegistered {
        /// Type name, or `#<index>` when looked up by index.
        name: String,
    },

    /// The type has no identity attribute, so it cannot be stored on its own.
    #[error("type {type_name} has no identity attribute")]
    IdentityAttributeMissing {
        /// The offending type.
        type_name: String,
    },

    /// Attempt to overwrite an identity that was already assigned.
    #[error("identity of {type_name} is already {current:?} and cannot change")]
    IdentityReassigned {
        /// The entity type.
        type_name: String,
        /// The identity already held.
        current: String,
    },

    /// A unique attribute value is already held by another instance.
    #[error("duplicated unique field {type_name}.{attribute} = {value}")]
    DuplicatedUniqueField {
        /// The entity type.
        type_name: String,
        /// The unique attribute.
        attribute: String,
        /// Encoded value that collided.
        value: String,
    },

    /// The type declares no attribute with this name.
    #[error("unknown attribute {type_name}.{attribute}")]
    UnknownAttribute {
        /// The entity type.
        type_name: String,
        /// The attribute requested.
        attribute: String,
    },

    /// A node id does not belong to the graph it was used with.
    #[error("unknown node #{index}")]
    UnknownNode {
        /// Arena index of the node.
        index: usize,
    },

    /// A schema failed validation at registration.
    #[error("invalid schema: {message}")]
    InvalidSchema {
        /// Description of the problem.
        message: String,
    },

    /// A reference points to an entity that has no identity yet.
    #[error("dangling reference to unsaved {type_name}")]
    DanglingReference {
        /// Type of the referenced entity.
        type_name: String,
    },

    /// Filter or query text could not be parsed.
    #[error("invalid filter: {message}")]
    InvalidFilter {
        /// Description of the problem.
        message: String,
    },

    /// Invalid database directory or manifest.
    #[error("invalid database format: {message}")]
    InvalidFormat {
        /// Description of the format issue.
        message: String,
    },

    /// Database is already open or locked.
    #[error("database locked: another process has exclusive access")]
    DatabaseLocked,
}

impl CoreError {
    /// Creates an unsupported value error.
    pub fn unsupported(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::UnsupportedValueType {
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Creates a type-not-registered error.
    pub fn type_not_registered(name: impl Into<String>) -> Self {
        Self::TypeNotRegistered { name: name.into() }
    }

    /// Creates an identity-attribute-missing error.
    pub fn identity_missing(type_name: impl Into<String>) -> Self {
        Self::IdentityAttributeMissing {
            type_name: type_name.into(),
        }
    }

    /// Creates an unknown attribute error.
    pub fn unknown_attribute(type_name: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self::UnknownAttribute {
            type_name: type_name.into(),
            attribute: attribute.into(),
        }
    }

    /// Creates an invalid schema error.
    pub fn invalid_schema(message: impl Into<String>) -> Self {
        Self::InvalidSchema {
            message: message.into(),
        }
    }

    /// Creates a dangling reference error.
    pub fn dangling(type_name: impl Into<String>) -> Self {
        Self::DanglingReference {
            type_name: type_name.into(),
        }
    }

    /// Creates an invalid filter error.
    pub fn invalid_filter(message: impl Into<String>) -> Self {
        Self::InvalidFilter {
            message: message.into(),
        }
    }

    /// Creates an invalid format error.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    /// Returns true for the error a caller can fix by changing the value of a
    /// unique attribute and saving again.
    #[must_use]
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::DuplicatedUniqueField { .. })
    }
}
