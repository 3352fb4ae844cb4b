//! JSON adapter over `serde_json::Value`.
//!
//! `serde_json` is built with `preserve_order`, so object keys keep document order
//! both when parsing and when writing. Numbers are classified as [`NodeKind::Int`]
//! when they fit an `i64`, [`NodeKind::UInt`] when they only fit a `u64`, and
//! [`NodeKind::Float`] otherwise. JSON has no representation for NaN or infinities;
//! saving one is an overflow.

use super::{Format, TextFormat};
use crate::convert::ConversionError;
use crate::error::{Error, Result};
use crate::node::{Node, NodeError, NodeKind};
use crate::options::FormatOptions;
use serde::Serialize as _;
use serde_json::map::Entry;
use serde_json::{Map, Number, Value};
use std::borrow::Cow;
use std::io::Write;

/// The JSON format. Paths are JSON Pointers (RFC 6901).
#[derive(Debug, Clone, Copy, Default)]
pub struct Json;

impl Format for Json {
    type Node = Value;

    const NAME: &'static str = "json";
    const PATH_SEPARATOR: char = '/';
    const IS_BINARY: bool = false;

    fn escape_key(key: &str) -> Cow<'_, str> {
        if key.contains(['~', '/']) {
            Cow::Owned(key.replace('~', "~0").replace('/', "~1"))
        } else {
            Cow::Borrowed(key)
        }
    }

    fn parse(input: &[u8]) -> Result<Value> {
        serde_json::from_slice(input).map_err(|e| Error::Parsing(e.to_string()))
    }

    fn write<W: Write>(root: &Value, writer: W, options: &FormatOptions) -> Result<()> {
        let result = if options.enable_format {
            let indent = options.indent();
            let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
            let mut serializer = serde_json::Serializer::with_formatter(writer, formatter);
            root.serialize(&mut serializer)
        } else {
            serde_json::to_writer(writer, root)
        };
        result.map_err(|e| {
            if e.is_io() {
                Error::from(std::io::Error::from(e))
            } else {
                Error::Format(e.to_string())
            }
        })
    }
}

impl TextFormat for Json {}

impl Node for Value {
    fn kind(&self) -> NodeKind {
        match self {
            Value::Null => NodeKind::Null,
            Value::Bool(_) => NodeKind::Bool,
            Value::Number(n) if n.is_i64() => NodeKind::Int,
            Value::Number(n) if n.is_u64() => NodeKind::UInt,
            Value::Number(_) => NodeKind::Float,
            Value::String(_) => NodeKind::String,
            Value::Array(_) => NodeKind::Array,
            Value::Object(_) => NodeKind::Object,
        }
    }

    fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Number(n) if !n.is_i64() => n.as_u64(),
            _ => None,
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) if n.is_f64() => n.as_f64(),
            _ => None,
        }
    }

    fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    fn set_null(&mut self) {
        *self = Value::Null;
    }

    fn set_bool(&mut self, value: bool) {
        *self = Value::Bool(value);
    }

    fn set_i64(&mut self, value: i64) {
        *self = Value::Number(value.into());
    }

    fn set_u64(&mut self, value: u64) {
        *self = Value::Number(value.into());
    }

    fn set_f64(&mut self, value: f64) -> std::result::Result<(), ConversionError> {
        let number = Number::from_f64(value).ok_or_else(|| {
            ConversionError::Overflow(format!("The value {value} cannot be represented in JSON"))
        })?;
        *self = Value::Number(number);
        Ok(())
    }

    fn set_string(&mut self, value: String) {
        *self = Value::String(value);
    }

    fn new_array(capacity: usize) -> Self {
        Value::Array(Vec::with_capacity(capacity))
    }

    fn new_object(capacity: usize) -> Self {
        Value::Object(Map::with_capacity(capacity))
    }

    fn len(&self) -> usize {
        match self {
            Value::Array(items) => items.len(),
            Value::Object(map) => map.len(),
            _ => 0,
        }
    }

    fn element(&self, index: usize) -> Option<&Self> {
        match self {
            Value::Array(items) => items.get(index),
            _ => None,
        }
    }

    fn push(&mut self, node: Self) -> std::result::Result<&mut Self, NodeError> {
        match self {
            Value::Array(items) => {
                items.push(node);
                items.last_mut().ok_or(NodeError::WrongKind(NodeKind::Array))
            }
            other => Err(NodeError::WrongKind(Node::kind(other))),
        }
    }

    fn find(&self, key: &str) -> Option<&Self> {
        match self {
            Value::Object(map) => map.get(key),
            _ => None,
        }
    }

    fn insert(&mut self, key: &str, node: Self) -> std::result::Result<&mut Self, NodeError> {
        match self {
            Value::Object(map) => match map.entry(key) {
                Entry::Vacant(entry) => Ok(entry.insert(node)),
                Entry::Occupied(_) => Err(NodeError::DuplicateKey),
            },
            other => Err(NodeError::WrongKind(Node::kind(other))),
        }
    }

    fn visit_keys(&self, visitor: &mut dyn FnMut(&str)) {
        if let Value::Object(map) = self {
            for key in map.keys() {
                visitor(key);
            }
        }
    }
}
