//! The node tree adapter contract.
//!
//! Every format exposes its parsed document as a tree of values implementing [`Node`].
//! Scopes are the only code that touches nodes; the dispatcher and user code go
//! through scopes. Getters never coerce: `as_i64` on a float node returns `None`.
//! Coercion between kinds is the job of [`crate::convert`].

use crate::convert::ConversionError;
use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt;

/// The discriminant of a document node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Explicit null.
    Null,
    /// Boolean.
    Bool,
    /// Signed integer.
    Int,
    /// Unsigned integer that does not fit a signed one (or a format that tracks signedness).
    UInt,
    /// Floating point number.
    Float,
    /// UTF-8 string.
    String,
    /// Point in time, for formats with a native timestamp type.
    Timestamp,
    /// Ordered sequence of nodes.
    Array,
    /// Keyed collection of nodes.
    Object,
}

impl NodeKind {
    /// `true` for every kind that is neither an array nor an object.
    pub fn is_scalar(self) -> bool {
        !matches!(self, Self::Array | Self::Object)
    }

    /// `true` for the three numeric kinds.
    pub fn is_number(self) -> bool {
        matches!(self, Self::Int | Self::UInt | Self::Float)
    }

    /// Lower-case name used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool => "boolean",
            Self::Int => "integer",
            Self::UInt => "unsigned integer",
            Self::Float => "float",
            Self::String => "string",
            Self::Timestamp => "timestamp",
            Self::Array => "array",
            Self::Object => "object",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Failure of a structural node operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeError {
    /// The object already holds the key.
    DuplicateKey,
    /// The node is not of the kind the operation needs.
    WrongKind(NodeKind),
}

/// One value in a format's document tree.
///
/// `Default` must produce a null node; save-mode scopes create children with it before
/// filling them in.
pub trait Node: Default + Sized {
    /// The kind of this node.
    fn kind(&self) -> NodeKind;

    /// `true` for an explicit null.
    fn is_null(&self) -> bool {
        self.kind() == NodeKind::Null
    }
    /// `true` for any non-container kind.
    fn is_scalar(&self) -> bool {
        self.kind().is_scalar()
    }
    /// `true` for string nodes.
    fn is_string(&self) -> bool {
        self.kind() == NodeKind::String
    }
    /// `true` for array nodes.
    fn is_array(&self) -> bool {
        self.kind() == NodeKind::Array
    }
    /// `true` for object nodes.
    fn is_object(&self) -> bool {
        self.kind() == NodeKind::Object
    }

    /// The boolean payload.
    fn as_bool(&self) -> Option<bool>;
    /// The payload of an [`NodeKind::Int`] node.
    fn as_i64(&self) -> Option<i64>;
    /// The payload of an [`NodeKind::UInt`] node.
    fn as_u64(&self) -> Option<u64>;
    /// The payload of a [`NodeKind::Float`] node.
    fn as_f64(&self) -> Option<f64>;
    /// The payload of a string node.
    fn as_str(&self) -> Option<&str>;
    /// The payload of a timestamp node. Formats without the kind return `None`.
    fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        None
    }

    /// Replaces the node with null.
    fn set_null(&mut self);
    /// Replaces the node with a boolean.
    fn set_bool(&mut self, value: bool);
    /// Replaces the node with a signed integer.
    fn set_i64(&mut self, value: i64);
    /// Replaces the node with an unsigned integer.
    fn set_u64(&mut self, value: u64);
    /// Replaces the node with a float.
    ///
    /// Formats that cannot represent `value` (NaN or infinities in JSON) leave the node
    /// untouched and report an overflow.
    fn set_f64(&mut self, value: f64) -> Result<(), ConversionError>;
    /// Replaces the node with a string.
    fn set_string(&mut self, value: String);
    /// Replaces the node with a timestamp. Formats without the kind store RFC 3339 text.
    fn set_timestamp(&mut self, value: DateTime<Utc>) {
        self.set_string(value.to_rfc3339_opts(SecondsFormat::AutoSi, true));
    }

    /// An empty array with room for `capacity` elements.
    fn new_array(capacity: usize) -> Self;
    /// An empty object with room for `capacity` entries.
    fn new_object(capacity: usize) -> Self;

    /// Element count of an array or entry count of an object; `0` otherwise.
    fn len(&self) -> usize;
    /// `true` when [`Node::len`] is zero.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// The array element at `index`.
    fn element(&self, index: usize) -> Option<&Self>;
    /// Appends to an array and returns the stored element.
    fn push(&mut self, node: Self) -> Result<&mut Self, NodeError>;
    /// The object entry under `key`.
    fn find(&self, key: &str) -> Option<&Self>;
    /// Adds a new object entry and returns the stored node; existing keys are rejected.
    fn insert(&mut self, key: &str, node: Self) -> Result<&mut Self, NodeError>;
    /// Calls `visitor` with every object key in document order.
    fn visit_keys(&self, visitor: &mut dyn FnMut(&str));
}
