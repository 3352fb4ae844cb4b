//! The native document tree and its binary encoding.
//!
//! [`TreeNode`] is the crate's own node type: a sum type with one variant per
//! [`NodeKind`], including a native timestamp, with objects kept in insertion order.
//! It is useful on its own as an in-memory document (see
//! [`Archive::save_document`](crate::Archive::save_document)) and is the tree behind
//! the [`Binary`] format.
//!
//! ## Binary Layout
//!
//! ```text
//! [Magic "BSC1" (4)] [Layout Version u16 LE (2)] [bincode payload]
//! ```
//!
//! The payload is the `TreeNode` encoded with `bincode`'s standard configuration.
//! A wrong magic, an unknown version and trailing bytes are all parsing errors.

use super::Format;
use crate::convert::ConversionError;
use crate::error::{Error, Result};
use crate::node::{Node, NodeError, NodeKind};
use crate::options::FormatOptions;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use indexmap::map::Entry;
use serde::{Deserialize, Serialize};
use std::io::Write;

/// Magic bytes identifying a binary document: "BSC1".
pub const MAGIC_BYTES: [u8; 4] = *b"BSC1";

/// Current layout version.
pub const LAYOUT_VERSION: u16 = 1;

const HEADER_SIZE: usize = MAGIC_BYTES.len() + 2;

/// One value of the native document tree.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum TreeNode {
    /// Explicit null.
    #[default]
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Unsigned integer.
    UInt(u64),
    /// Floating point number.
    Float(f64),
    /// UTF-8 string.
    String(String),
    /// UTC timestamp.
    Timestamp(DateTime<Utc>),
    /// Ordered sequence.
    Array(Vec<TreeNode>),
    /// Insertion-ordered keyed collection.
    Object(IndexMap<String, TreeNode>),
}

impl Node for TreeNode {
    fn kind(&self) -> NodeKind {
        match self {
            Self::Null => NodeKind::Null,
            Self::Bool(_) => NodeKind::Bool,
            Self::Int(_) => NodeKind::Int,
            Self::UInt(_) => NodeKind::UInt,
            Self::Float(_) => NodeKind::Float,
            Self::String(_) => NodeKind::String,
            Self::Timestamp(_) => NodeKind::Timestamp,
            Self::Array(_) => NodeKind::Array,
            Self::Object(_) => NodeKind::Object,
        }
    }

    fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    fn as_u64(&self) -> Option<u64> {
        match self {
            Self::UInt(v) => Some(*v),
            _ => None,
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Timestamp(v) => Some(*v),
            _ => None,
        }
    }

    fn set_null(&mut self) {
        *self = Self::Null;
    }

    fn set_bool(&mut self, value: bool) {
        *self = Self::Bool(value);
    }

    fn set_i64(&mut self, value: i64) {
        *self = Self::Int(value);
    }

    fn set_u64(&mut self, value: u64) {
        *self = Self::UInt(value);
    }

    fn set_f64(&mut self, value: f64) -> std::result::Result<(), ConversionError> {
        *self = Self::Float(value);
        Ok(())
    }

    fn set_string(&mut self, value: String) {
        *self = Self::String(value);
    }

    fn set_timestamp(&mut self, value: DateTime<Utc>) {
        *self = Self::Timestamp(value);
    }

    fn new_array(capacity: usize) -> Self {
        Self::Array(Vec::with_capacity(capacity))
    }

    fn new_object(capacity: usize) -> Self {
        Self::Object(IndexMap::with_capacity(capacity))
    }

    fn len(&self) -> usize {
        match self {
            Self::Array(items) => items.len(),
            Self::Object(entries) => entries.len(),
            _ => 0,
        }
    }

    fn element(&self, index: usize) -> Option<&Self> {
        match self {
            Self::Array(items) => items.get(index),
            _ => None,
        }
    }

    fn push(&mut self, node: Self) -> std::result::Result<&mut Self, NodeError> {
        match self {
            Self::Array(items) => {
                items.push(node);
                items.last_mut().ok_or(NodeError::WrongKind(NodeKind::Array))
            }
            other => Err(NodeError::WrongKind(other.kind())),
        }
    }

    fn find(&self, key: &str) -> Option<&Self> {
        match self {
            Self::Object(entries) => entries.get(key),
            _ => None,
        }
    }

    fn insert(&mut self, key: &str, node: Self) -> std::result::Result<&mut Self, NodeError> {
        match self {
            Self::Object(entries) => match entries.entry(key.to_owned()) {
                Entry::Vacant(entry) => Ok(entry.insert(node)),
                Entry::Occupied(_) => Err(NodeError::DuplicateKey),
            },
            other => Err(NodeError::WrongKind(other.kind())),
        }
    }

    fn visit_keys(&self, visitor: &mut dyn FnMut(&str)) {
        if let Self::Object(entries) = self {
            for key in entries.keys() {
                visitor(key);
            }
        }
    }
}

/// The binary format: a [`TreeNode`] document encoded with `bincode`.
///
/// Paths use `/` like JSON Pointers, without key escaping.
#[derive(Debug, Clone, Copy, Default)]
pub struct Binary;

impl Format for Binary {
    type Node = TreeNode;

    const NAME: &'static str = "binary";
    const PATH_SEPARATOR: char = '/';
    const IS_BINARY: bool = true;

    fn parse(input: &[u8]) -> Result<TreeNode> {
        if input.len() < HEADER_SIZE {
            return Err(Error::Parsing(format!(
                "document too small: {} bytes, the header alone needs {HEADER_SIZE}",
                input.len()
            )));
        }
        let (header, payload) = input.split_at(HEADER_SIZE);
        if header[..MAGIC_BYTES.len()] != MAGIC_BYTES {
            return Err(Error::Parsing("invalid magic bytes".into()));
        }
        let version = u16::from_le_bytes([header[4], header[5]]);
        if version != LAYOUT_VERSION {
            return Err(Error::Parsing(format!(
                "unsupported layout version {version}, expected {LAYOUT_VERSION}"
            )));
        }

        let (root, read) =
            bincode::serde::decode_from_slice::<TreeNode, _>(payload, bincode::config::standard())
                .map_err(|e| Error::Parsing(e.to_string()))?;
        if read != payload.len() {
            return Err(Error::Parsing(format!(
                "{} trailing bytes after the document",
                payload.len() - read
            )));
        }
        Ok(root)
    }

    fn write<W: Write>(root: &TreeNode, mut writer: W, _options: &FormatOptions) -> Result<()> {
        let payload = bincode::serde::encode_to_vec(root, bincode::config::standard())
            .map_err(|e| Error::Format(e.to_string()))?;
        writer.write_all(&MAGIC_BYTES)?;
        writer.write_all(&LAYOUT_VERSION.to_le_bytes())?;
        writer.write_all(&payload)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TreeNode {
        let mut root = TreeNode::new_object(3);
        let _ = root.insert("name", TreeNode::String("probe".into()));
        let _ = root.insert("count", TreeNode::UInt(7));
        let _ = root.insert(
            "items",
            TreeNode::Array(vec![TreeNode::Float(1.5), TreeNode::Null]),
        );
        root
    }

    #[test]
    fn test_encoded_document_starts_with_header() -> Result<()> {
        let mut out = Vec::new();
        Binary::write(&sample(), &mut out, &FormatOptions::default())?;
        assert_eq!(&out[..4], b"BSC1");
        assert_eq!(&out[4..6], &LAYOUT_VERSION.to_le_bytes());
        assert_eq!(Binary::parse(&out)?, sample());
        Ok(())
    }

    #[test]
    fn test_corrupted_headers_are_parsing_errors() -> Result<()> {
        let mut out = Vec::new();
        Binary::write(&sample(), &mut out, &FormatOptions::default())?;

        let mut bad_magic = out.clone();
        bad_magic[0] = b'X';
        assert!(matches!(Binary::parse(&bad_magic), Err(Error::Parsing(_))));

        let mut bad_version = out.clone();
        bad_version[4] = 9;
        assert!(matches!(Binary::parse(&bad_version), Err(Error::Parsing(_))));

        let mut trailing = out;
        trailing.push(0);
        assert!(matches!(Binary::parse(&trailing), Err(Error::Parsing(_))));

        assert!(matches!(Binary::parse(b"BS"), Err(Error::Parsing(_))));
        Ok(())
    }

    #[test]
    fn test_object_keeps_insertion_order() {
        let mut keys = Vec::new();
        sample().visit_keys(&mut |key| keys.push(key.to_owned()));
        assert_eq!(keys, ["name", "count", "items"]);
    }
}
