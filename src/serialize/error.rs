//! Error types for binary scene serialization and deserialization.
//!
//! The error model is two-tier: failures that leave the stream position
//! trustworthy are logged and recovered from inside the object reader
//! (unknown field tags, chunk name mismatches), while failures that do not
//! are surfaced as values of these enums and abort the current operation.

use std::fmt;

/// Errors that can occur while writing a scene or reflected object.
#[derive(Debug)]
pub enum SerializeError {
    /// The underlying stream failed (disk full, broken pipe, ...).
    Io(std::io::Error),
    /// A polymorphic value's concrete type is not in the [`TypeRegistry`](crate::TypeRegistry),
    /// so a reader would have no factory to reconstruct it with.
    UnregisteredType { name: &'static str },
    /// A payload length or element count does not fit in its u32 wire
    /// prefix; writing it would silently truncate and corrupt the record.
    LengthOverflow { len: u64 },
}

impl fmt::Display for SerializeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "stream write failed: {e}"),
            Self::UnregisteredType { name } => {
                write!(f, "type '{name}' is not registered and cannot be written polymorphically")
            }
            Self::LengthOverflow { len } => {
                write!(f, "length {len} does not fit in a u32 wire prefix")
            }
        }
    }
}

impl std::error::Error for SerializeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SerializeError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

/// Errors that can occur while reading a scene or reflected object.
#[derive(Debug)]
pub enum DeserializeError {
    /// The underlying stream failed or was truncated mid-record.
    Io(std::io::Error),
    /// The scene file header is missing, has the wrong magic, or carries an
    /// unsupported format version.
    BadHeader { message: String },
    /// A field consumed a different number of bytes than its record declared.
    ///
    /// After this the stream position can no longer be trusted, so the whole
    /// read operation is aborted.
    FieldSize {
        type_name: String,
        tag: u16,
        declared: u32,
        consumed: u64,
    },
    /// A polymorphic field named a type the registry does not know.
    ///
    /// The object reader catches this, logs a warning, and leaves the field
    /// at its default; it only escapes to callers that read polymorphic
    /// values outside a length-prefixed field record.
    UnknownType { name: String },
    /// A scene node record named a type the registry does not know.
    ///
    /// Unlike a polymorphic field, a node body cannot be skipped without
    /// constructing the node, so this fails the whole load.
    UnknownNodeType { name: String, node: u32 },
    /// A scene node record referenced an entity that does not exist.
    MissingEntity { entity: u32, node: u32 },
    /// The stream contents are structurally invalid (bad UTF-8, dangling
    /// shared tag, out-of-range reference, ...).
    Corrupt { message: String },
}

impl fmt::Display for DeserializeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "stream read failed: {e}"),
            Self::BadHeader { message } => write!(f, "bad scene file header: {message}"),
            Self::FieldSize {
                type_name,
                tag,
                declared,
                consumed,
            } => write!(
                f,
                "field tag {tag} of '{type_name}' declared {declared} bytes but consumed {consumed}"
            ),
            Self::UnknownType { name } => write!(f, "unknown type '{name}'"),
            Self::UnknownNodeType { name, node } => {
                write!(f, "scene node {node} has unknown type '{name}'")
            }
            Self::MissingEntity { entity, node } => {
                write!(f, "scene node {node} references missing entity {entity}")
            }
            Self::Corrupt { message } => write!(f, "corrupt stream: {message}"),
        }
    }
}

impl std::error::Error for DeserializeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for DeserializeError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
