//! Archives: the entry points of every load and save.
//!
//! An archive owns one parsed (or being-built) document of a [`Format`] and hands out
//! its root scope. Two layers are provided:
//!
//! - [`InputArchive`] and [`OutputArchive`] expose the document and the root scope, for
//!   callers that drive scopes by hand or inspect the tree.
//! - [`Archive`] is the one-call facade: parse, traverse, escalate and write.
//!
//! Every top-level call finishes by checking the [`SerializationContext`]: unless the
//! validation policy is [`ValidationPolicy::Collect`](crate::ValidationPolicy::Collect),
//! collected errors turn into [`Error::ValidationFailed`](crate::Error::ValidationFailed).

use crate::context::SerializationContext;
use crate::error::{Error, Result};
use crate::format::{Binary, Format, Json, TextFormat, UTF8_BOM, decode_input};
use crate::scope::{Load, RootScope, Save, UnkeyedScope};
use crate::serialize::Serialize;
use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::marker::PhantomData;
use std::path::Path;

/// A parsed document, ready to be loaded into values.
pub struct InputArchive<F: Format> {
    document: F::Node,
}

impl<F: Format> InputArchive<F> {
    /// Parses a complete document.
    pub fn from_slice(input: &[u8]) -> Result<Self> {
        let input = decode_input::<F>(input)?;
        Ok(Self {
            document: F::parse(input)?,
        })
    }

    /// Reads `reader` to the end and parses it.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut buffer = Vec::new();
        reader.read_to_end(&mut buffer)?;
        Self::from_slice(&buffer)
    }

    /// Wraps an already-built document.
    pub fn from_document(document: F::Node) -> Self {
        Self { document }
    }

    /// The parsed document.
    pub fn document(&self) -> &F::Node {
        &self.document
    }

    /// The root scope, borrowing the document and `context` for its lifetime.
    pub fn root_scope<'a>(&'a self, context: &'a mut SerializationContext) -> RootScope<'a, F, Load> {
        RootScope::loading(&self.document, context)
    }

    /// Loads `value` from the document root and applies the escalation check.
    ///
    /// Returns `false` when the document root is null.
    pub fn load<T: Serialize>(&self, value: &mut T, context: &mut SerializationContext) -> Result<bool> {
        let present = self.root_scope(context).serialize_value(value)?;
        context.finish()?;
        Ok(present)
    }
}

impl<F: Format> fmt::Debug for InputArchive<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputArchive")
            .field("format", &F::NAME)
            .finish_non_exhaustive()
    }
}

/// A document being built from values.
pub struct OutputArchive<F: Format> {
    document: F::Node,
}

impl<F: Format> Default for OutputArchive<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Format> OutputArchive<F> {
    /// Starts with an empty (null) document.
    pub fn new() -> Self {
        Self {
            document: F::Node::default(),
        }
    }

    /// The document built so far.
    pub fn document(&self) -> &F::Node {
        &self.document
    }

    /// Takes the built document.
    pub fn into_document(self) -> F::Node {
        self.document
    }

    /// The root scope. The root accepts one value per scope.
    pub fn root_scope<'a>(&'a mut self, context: &'a mut SerializationContext) -> RootScope<'a, F, Save> {
        RootScope::saving(&mut self.document, context)
    }

    /// Saves `value` as the document root and applies the escalation check.
    pub fn save<T: Serialize>(&mut self, value: &mut T, context: &mut SerializationContext) -> Result<()> {
        self.root_scope(context).serialize_value(value)?;
        context.finish()
    }

    /// Encodes the document into `writer` using the context's format options.
    pub fn write<W: Write>(&self, writer: W, context: &SerializationContext) -> Result<()> {
        F::write(&self.document, writer, &context.options().format_options)
    }

    /// Encodes the document into a fresh buffer.
    pub fn to_vec(&self, context: &SerializationContext) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.write(&mut out, context)?;
        Ok(out)
    }
}

impl<F: Format> fmt::Debug for OutputArchive<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputArchive")
            .field("format", &F::NAME)
            .finish_non_exhaustive()
    }
}

/// One-call load and save for a format.
///
/// ```rust
/// use bitscope::{JsonArchive, SerializationContext, SerializationOptions};
///
/// let mut numbers: Vec<u16> = Vec::new();
/// JsonArchive::load(&mut numbers, b"[1, 2, 3]")?;
/// assert_eq!(numbers, [1, 2, 3]);
///
/// let mut context = SerializationContext::new(SerializationOptions::default().with_pretty_print(' ', 2));
/// let bytes = JsonArchive::save_with(&mut numbers, &mut context)?;
/// assert_eq!(String::from_utf8_lossy(&bytes), "[\n  1,\n  2,\n  3\n]");
/// # Ok::<(), bitscope::Error>(())
/// ```
pub struct Archive<F: Format>(PhantomData<F>);

/// [`Archive`] over JSON.
pub type JsonArchive = Archive<Json>;

/// [`Archive`] over the native binary format.
pub type BinaryArchive = Archive<Binary>;

impl<F: Format> fmt::Debug for Archive<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Archive").field(&F::NAME).finish()
    }
}

impl<F: Format> Archive<F> {
    /// Loads `value` from `input` with default options.
    pub fn load<T: Serialize>(value: &mut T, input: &[u8]) -> Result<()> {
        Self::load_with(value, input, &mut SerializationContext::default())
    }

    /// Loads `value` from `input`, recording errors in `context`.
    pub fn load_with<T: Serialize>(
        value: &mut T,
        input: &[u8],
        context: &mut SerializationContext,
    ) -> Result<()> {
        tracing::debug!(format = F::NAME, bytes = input.len(), "loading document");
        let archive = InputArchive::<F>::from_slice(input)?;
        Self::finish_load(&archive, value, context)
    }

    /// Loads `value` from everything `reader` yields.
    pub fn load_from_reader<T: Serialize, R: Read>(
        value: &mut T,
        reader: R,
        context: &mut SerializationContext,
    ) -> Result<()> {
        tracing::debug!(format = F::NAME, "loading document from reader");
        let archive = InputArchive::<F>::from_reader(reader)?;
        Self::finish_load(&archive, value, context)
    }

    /// Loads `value` from the file at `path`.
    pub fn load_from_file<T: Serialize, P: AsRef<Path>>(
        value: &mut T,
        path: P,
        context: &mut SerializationContext,
    ) -> Result<()> {
        let path = path.as_ref();
        tracing::debug!(format = F::NAME, path = %path.display(), "loading document from file");
        let bytes = fs::read(path)?;
        let archive = InputArchive::<F>::from_slice(&bytes)?;
        Self::finish_load(&archive, value, context)
    }

    /// Loads `value` from an in-memory document tree.
    pub fn load_document<T: Serialize>(
        value: &mut T,
        document: &F::Node,
        context: &mut SerializationContext,
    ) -> Result<()> {
        RootScope::<F, Load>::loading(document, context).serialize_value(value)?;
        context.finish()
    }

    fn finish_load<T: Serialize>(
        archive: &InputArchive<F>,
        value: &mut T,
        context: &mut SerializationContext,
    ) -> Result<()> {
        let result = archive.load(value, context);
        tracing::debug!(
            format = F::NAME,
            ok = result.is_ok(),
            errors = context.errors().len(),
            "document loaded"
        );
        result.map(|_| ())
    }

    /// Saves `value` with default options.
    pub fn save<T: Serialize>(value: &mut T) -> Result<Vec<u8>> {
        Self::save_with(value, &mut SerializationContext::default())
    }

    /// Saves `value` into a buffer, recording errors in `context`.
    ///
    /// In-memory output never carries a byte-order mark.
    pub fn save_with<T: Serialize>(value: &mut T, context: &mut SerializationContext) -> Result<Vec<u8>> {
        let archive = Self::build(value, context)?;
        archive.to_vec(context)
    }

    /// Saves `value` into `writer`, with a UTF-8 byte-order mark for text formats when
    /// [`StreamOptions::write_bom`](crate::StreamOptions::write_bom) is set.
    pub fn save_to_writer<T: Serialize, W: Write>(
        value: &mut T,
        mut writer: W,
        context: &mut SerializationContext,
    ) -> Result<()> {
        let archive = Self::build(value, context)?;
        if !F::IS_BINARY && context.options().stream_options.write_bom {
            writer.write_all(&UTF8_BOM)?;
        }
        archive.write(&mut writer, context)?;
        writer.flush()?;
        Ok(())
    }

    /// Saves `value` into the file at `path`, replacing it.
    pub fn save_to_file<T: Serialize, P: AsRef<Path>>(
        value: &mut T,
        path: P,
        context: &mut SerializationContext,
    ) -> Result<()> {
        let path = path.as_ref();
        tracing::debug!(format = F::NAME, path = %path.display(), "saving document to file");
        let file = File::create(path)?;
        Self::save_to_writer(value, BufWriter::new(file), context)
    }

    /// Saves `value` into an in-memory document tree.
    pub fn save_document<T: Serialize>(
        value: &mut T,
        context: &mut SerializationContext,
    ) -> Result<F::Node> {
        Self::build(value, context).map(OutputArchive::into_document)
    }

    fn build<T: Serialize>(value: &mut T, context: &mut SerializationContext) -> Result<OutputArchive<F>> {
        tracing::debug!(format = F::NAME, "saving document");
        let mut archive = OutputArchive::<F>::new();
        let result = archive.save(value, context);
        tracing::debug!(
            format = F::NAME,
            ok = result.is_ok(),
            errors = context.errors().len(),
            "document saved"
        );
        result.map(|()| archive)
    }
}

impl<F: TextFormat> Archive<F> {
    /// Loads `value` from text with default options.
    pub fn load_str<T: Serialize>(value: &mut T, input: &str) -> Result<()> {
        Self::load(value, input.as_bytes())
    }

    /// Loads `value` from text, recording errors in `context`.
    pub fn load_str_with<T: Serialize>(
        value: &mut T,
        input: &str,
        context: &mut SerializationContext,
    ) -> Result<()> {
        Self::load_with(value, input.as_bytes(), context)
    }

    /// Saves `value` as text with default options.
    pub fn save_string<T: Serialize>(value: &mut T) -> Result<String> {
        Self::save_string_with(value, &mut SerializationContext::default())
    }

    /// Saves `value` as text, recording errors in `context`.
    pub fn save_string_with<T: Serialize>(
        value: &mut T,
        context: &mut SerializationContext,
    ) -> Result<String> {
        let bytes = Self::save_with(value, context)?;
        String::from_utf8(bytes)
            .map_err(|e| Error::Format(format!("{} produced invalid UTF-8: {e}", F::NAME)))
    }
}
