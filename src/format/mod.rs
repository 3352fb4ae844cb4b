//! Pluggable document formats.
//!
//! A [`Format`] ties together a node tree type, the codec that turns bytes into that
//! tree and back, and the conventions the format uses for diagnostics (the path
//! separator and key escaping). Two formats ship with the crate:
//!
//! - [`Json`]: text, backed by `serde_json::Value`.
//! - [`Binary`]: the native [`TreeNode`] document encoded with `bincode`.
//!
//! ## Encoding
//!
//! Text formats accept UTF-8 input, with or without a byte-order mark. Inputs starting
//! with a UTF-16 or UTF-32 byte-order mark are rejected with
//! [`Error::UnsupportedEncoding`] before the codec sees them.

use crate::error::{Error, Result};
use crate::node::Node;
use crate::options::FormatOptions;
use std::borrow::Cow;
use std::io::Write;

pub mod binary;
pub mod json;

pub use binary::{Binary, TreeNode};
pub use json::Json;

/// The UTF-8 byte-order mark.
pub const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// A document format: node tree, codec and path conventions.
pub trait Format: Sized + 'static {
    /// The in-memory document tree.
    type Node: Node + 'static;

    /// Short lower-case name, used in logs.
    const NAME: &'static str;

    /// Separator between path segments in reported paths.
    const PATH_SEPARATOR: char;

    /// `true` for formats whose input is not text.
    const IS_BINARY: bool;

    /// Escapes an object key for use as a path segment.
    fn escape_key(key: &str) -> Cow<'_, str> {
        Cow::Borrowed(key)
    }

    /// Parses a complete document.
    ///
    /// Text formats receive their input with any UTF-8 byte-order mark already removed.
    fn parse(input: &[u8]) -> Result<Self::Node>;

    /// Writes a complete document.
    fn write<W: Write>(root: &Self::Node, writer: W, options: &FormatOptions) -> Result<()>;
}

/// Marker for formats whose documents are UTF-8 text.
pub trait TextFormat: Format {}

/// Checks the byte-order mark of a text input and strips a UTF-8 one.
pub(crate) fn strip_bom(input: &[u8]) -> Result<&[u8]> {
    if let Some(rest) = input.strip_prefix(&UTF8_BOM) {
        return Ok(rest);
    }
    if let Some(encoding) = detect_foreign_bom(input) {
        return Err(Error::UnsupportedEncoding(format!(
            "{encoding} input is not supported, documents must be UTF-8"
        )));
    }
    Ok(input)
}

// UTF-32 LE must be checked before UTF-16 LE, they share the first two bytes.
fn detect_foreign_bom(input: &[u8]) -> Option<&'static str> {
    match input {
        [0xFF, 0xFE, 0x00, 0x00, ..] => Some("UTF-32LE"),
        [0x00, 0x00, 0xFE, 0xFF, ..] => Some("UTF-32BE"),
        [0xFF, 0xFE, ..] => Some("UTF-16LE"),
        [0xFE, 0xFF, ..] => Some("UTF-16BE"),
        _ => None,
    }
}

/// Prepares raw input for `F::parse`.
pub(crate) fn decode_input<F: Format>(input: &[u8]) -> Result<&[u8]> {
    if F::IS_BINARY {
        Ok(input)
    } else {
        strip_bom(input)
    }
}
