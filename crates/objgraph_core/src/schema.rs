//! Type schemas.
//!
//! A [`TypeSchema`] lists the persisted attributes of one composite type in
//! declaration order. Records are written and read in that order, and
//! attribute lookup by name goes through a table built once when the schema
//! is built.

use crate::error::{CoreError, CoreResult};
use crate::identity::IdentityResolver;
use crate::value::Value;
use std::collections::HashMap;
use std::fmt;

/// Attribute name of the parent back-reference marker.
pub const PARENT_MARKER: &str = "superente";

/// Attribute name of the root back-reference marker.
pub const ROOT_MARKER: &str = "root";

/// Declared type of an attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrType {
    /// `true` / `false`.
    Bool,
    /// Unsigned byte.
    Byte,
    /// Single character.
    Char,
    /// Signed integer.
    Int,
    /// Floating point number.
    Float,
    /// Text.
    Text,
    /// Instant.
    Date,
    /// Ordered sequence of the element type.
    List(Box<AttrType>),
    /// Sequence without duplicates.
    Set(Box<AttrType>),
    /// Key/value pairs.
    Map(Box<AttrType>, Box<AttrType>),
    /// Composite of the named registered type.
    Object(String),
    /// Anything; the record carries its own type index.
    Any,
}

impl AttrType {
    /// List of `inner`.
    #[must_use]
    pub fn list(inner: AttrType) -> Self {
        Self::List(Box::new(inner))
    }

    /// Set of `inner`.
    #[must_use]
    pub fn set(inner: AttrType) -> Self {
        Self::Set(Box::new(inner))
    }

    /// Map from `key` to `value`.
    #[must_use]
    pub fn map(key: AttrType, value: AttrType) -> Self {
        Self::Map(Box::new(key), Box::new(value))
    }

    /// Composite of the named type.
    pub fn object(type_name: impl Into<String>) -> Self {
        Self::Object(type_name.into())
    }

    /// True for single literal-valued types.
    #[must_use]
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Self::Bool | Self::Byte | Self::Char | Self::Int | Self::Float | Self::Text | Self::Date
        )
    }

    /// True if a composite can appear anywhere inside this type.
    #[must_use]
    pub fn holds_objects(&self) -> bool {
        match self {
            Self::Object(_) | Self::Any => true,
            Self::List(inner) | Self::Set(inner) => inner.holds_objects(),
            Self::Map(key, value) => key.holds_objects() || value.holds_objects(),
            _ => false,
        }
    }

    /// Value held by a freshly constructed instance.
    #[must_use]
    pub fn default_value(&self) -> Value {
        match self {
            Self::Bool => Value::Bool(false),
            Self::Byte => Value::Byte(0),
            Self::Char => Value::Char('\0'),
            Self::Int => Value::Int(0),
            Self::Float => Value::Float(0.0),
            _ => Value::Null,
        }
    }
}

impl fmt::Display for AttrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => f.write_str("bool"),
            Self::Byte => f.write_str("byte"),
            Self::Char => f.write_str("char"),
            Self::Int => f.write_str("int"),
            Self::Float => f.write_str("float"),
            Self::Text => f.write_str("string"),
            Self::Date => f.write_str("date"),
            Self::List(inner) => write!(f, "list<{inner}>"),
            Self::Set(inner) => write!(f, "set<{inner}>"),
            Self::Map(key, value) => write!(f, "map<{key}, {value}>"),
            Self::Object(name) => f.write_str(name),
            Self::Any => f.write_str("any"),
        }
    }
}

/// One declared attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    name: String,
    ty: AttrType,
    unique: bool,
    cold: bool,
}

impl Attribute {
    /// Declares a plain owned attribute.
    pub fn new(name: impl Into<String>, ty: AttrType) -> Self {
        Self {
            name: name.into(),
            ty,
            unique: false,
            cold: false,
        }
    }

    /// Marks the attribute unique among persisted instances.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Marks the attribute as a non-owning reference.
    #[must_use]
    pub fn cold(mut self) -> Self {
        self.cold = true;
        self
    }

    /// Attribute name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type.
    #[must_use]
    pub fn ty(&self) -> &AttrType {
        &self.ty
    }

    /// True if values must be unique per type.
    #[must_use]
    pub fn is_unique(&self) -> bool {
        self.unique
    }

    /// True if the attribute does not own its target.
    #[must_use]
    pub fn is_cold(&self) -> bool {
        self.cold
    }
}

/// Schema of one composite type.
#[derive(Debug, Clone)]
pub struct TypeSchema {
    name: String,
    attributes: Vec<Attribute>,
    positions: HashMap<String, usize>,
    identity: Option<usize>,
}

impl TypeSchema {
    /// Starts a schema for the named type.
    pub fn builder(name: impl Into<String>) -> TypeSchemaBuilder {
        TypeSchemaBuilder {
            name: name.into(),
            attributes: Vec::new(),
            identity: IdentityChoice::Infer,
        }
    }

    /// Type name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attributes in declaration order.
    #[must_use]
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Position of an attribute.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    /// Looks up an attribute by name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.position(name).map(|pos| &self.attributes[pos])
    }

    /// Position of the identity attribute, if the type has one.
    #[must_use]
    pub fn identity_position(&self) -> Option<usize> {
        self.identity
    }

    /// The identity attribute, if the type has one.
    #[must_use]
    pub fn identity_attribute(&self) -> Option<&Attribute> {
        self.identity.map(|pos| &self.attributes[pos])
    }

    /// True if instances are entities rather than value objects.
    #[must_use]
    pub fn has_identity(&self) -> bool {
        self.identity.is_some()
    }

    /// Unique attributes in declaration order.
    pub fn unique_attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter().filter(|a| a.unique)
    }

    /// True if any attribute is unique.
    #[must_use]
    pub fn has_unique_attributes(&self) -> bool {
        self.attributes.iter().any(|a| a.unique)
    }

    /// True if the schema declares its own attribute named like a marker.
    #[must_use]
    pub fn declares(&self, name: &str) -> bool {
        self.positions.contains_key(name)
    }
}

impl PartialEq for TypeSchema {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.attributes == other.attributes
            && self.identity == other.identity
    }
}

#[derive(Debug, Clone)]
enum IdentityChoice {
    Infer,
    Named(String),
    Without,
}

/// Builder for [`TypeSchema`].
#[derive(Debug, Clone)]
pub struct TypeSchemaBuilder {
    name: String,
    attributes: Vec<Attribute>,
    identity: IdentityChoice,
}

impl TypeSchemaBuilder {
    /// Adds an owned attribute.
    #[must_use]
    pub fn attribute(self, name: impl Into<String>, ty: AttrType) -> Self {
        self.with(Attribute::new(name, ty))
    }

    /// Adds a unique attribute.
    #[must_use]
    pub fn unique(self, name: impl Into<String>, ty: AttrType) -> Self {
        self.with(Attribute::new(name, ty).unique())
    }

    /// Adds a cold (non-owning) reference attribute.
    #[must_use]
    pub fn cold(self, name: impl Into<String>, ty: AttrType) -> Self {
        self.with(Attribute::new(name, ty).cold())
    }

    /// Adds a prepared attribute.
    #[must_use]
    pub fn with(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Names the identity attribute explicitly.
    ///
    /// Without this, the identity is found by attribute name; see
    /// [`IdentityResolver`].
    #[must_use]
    pub fn identity(mut self, name: impl Into<String>) -> Self {
        self.identity = IdentityChoice::Named(name.into());
        self
    }

    /// Declares the type a value object: it has no identity even if an
    /// attribute name would suggest one.
    #[must_use]
    pub fn value_object(mut self) -> Self {
        self.identity = IdentityChoice::Without;
        self
    }

    /// Validates and builds the schema.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSchema` if the type or an attribute name is not
    /// storable, an attribute is declared twice, a unique attribute is not
    /// scalar, a cold attribute cannot hold objects, or the explicit identity
    /// does not name a string attribute.
    pub fn build(self) -> CoreResult<TypeSchema> {
        validate_type_name(&self.name)?;

        let mut positions = HashMap::with_capacity(self.attributes.len());
        for (pos, attr) in self.attributes.iter().enumerate() {
            validate_attribute_name(&self.name, &attr.name)?;
            if positions.insert(attr.name.clone(), pos).is_some() {
                return Err(CoreError::invalid_schema(format!(
                    "{}.{} declared twice",
                    self.name, attr.name
                )));
            }
            if attr.unique && !attr.ty.is_scalar() {
                return Err(CoreError::invalid_schema(format!(
                    "{}.{} is unique but of non-scalar type {}",
                    self.name, attr.name, attr.ty
                )));
            }
            if attr.cold && !attr.ty.holds_objects() {
                return Err(CoreError::invalid_schema(format!(
                    "{}.{} is cold but of type {}",
                    self.name, attr.name, attr.ty
                )));
            }
        }

        let identity = match &self.identity {
            IdentityChoice::Infer => IdentityResolver::resolve(&self.name, None, &self.attributes)?,
            IdentityChoice::Named(name) => {
                IdentityResolver::resolve(&self.name, Some(name), &self.attributes)?
            }
            IdentityChoice::Without => None,
        };

        Ok(TypeSchema {
            name: self.name,
            attributes: self.attributes,
            positions,
            identity,
        })
    }
}

fn validate_type_name(name: &str) -> CoreResult<()> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(CoreError::invalid_schema(format!(
            "invalid type name {name:?}"
        )))
    }
}

fn validate_attribute_name(type_name: &str, name: &str) -> CoreResult<()> {
    let valid = !name.is_empty()
        && !name
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, ':' | '.' | '\\' | '{' | '}' | '[' | ']' | '(' | ')'));
    if valid {
        Ok(())
    } else {
        Err(CoreError::invalid_schema(format!(
            "invalid attribute name {type_name}.{name:?}"
        )))
    }
}
