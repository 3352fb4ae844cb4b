//! Centralized error handling for bitscope.
//!
//! Every fallible operation in the crate returns [`Result`], whose error type is the
//! [`Error`] enum defined here. The library never panics on malformed input: parse
//! failures, structural violations and policy decisions are all represented as values.
//!
//! ## Error Categories
//!
//! Errors fall into two groups.
//!
//! **Fatal** categories abort the whole load/save call:
//!
//! - [`Error::Parsing`]: the input document is malformed.
//! - [`Error::OutOfRange`]: the traversal does not fit the document's shape
//!   (reading past the end of an array, writing past a reserved capacity).
//! - [`Error::DuplicateKey`]: a key was written twice into the same object.
//! - [`Error::UnsupportedEncoding`]: the input uses a text encoding the format rejects.
//! - [`Error::Io`] and [`Error::Format`]: the stream or the codec failed.
//!
//! **Recoverable** categories are normally resolved per field by the active policy
//! (see [`crate::options`]) and only surface as errors when the caller asks for it:
//!
//! - [`Error::MismatchedTypes`] under `MismatchedTypesPolicy::ThrowError`.
//! - [`Error::Overflow`] under `OverflowNumberPolicy::ThrowError`.
//! - [`Error::ValidationFailed`] when the `ValidationPolicy` escalates collected errors.
//!
//! ## Usage
//!
//! ```rust
//! use bitscope::{Error, ErrorCode, JsonArchive};
//!
//! let mut value: i8 = 0;
//! let err = JsonArchive::load_str(&mut value, "300").unwrap_err();
//! assert_eq!(err.code(), ErrorCode::Overflow);
//! assert!(!err.is_fatal());
//! ```

use crate::context::ValidationErrors;
use std::io;
use std::sync::Arc;

/// A specialized `Result` type for bitscope operations.
///
/// Equivalent to `std::result::Result<T, bitscope::Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// The master error enum covering all failure domains.
///
/// The type is `Clone` so collected errors can be stored and compared; I/O errors are
/// wrapped in an `Arc` to keep cloning cheap.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// The input document could not be parsed.
    ///
    /// The message is the codec's diagnostic, passed through verbatim.
    #[error("Parsing Error: {0}")]
    Parsing(String),

    /// The traversal violated the actual shape of the document.
    ///
    /// Raised when an array scope is asked for more elements than the document holds
    /// (load) or than were reserved (save).
    #[error("Out of range at '{path}': {message}")]
    OutOfRange {
        /// Path of the offending element.
        path: String,
        /// Description of the violation.
        message: String,
    },

    /// The same key was written twice into one object scope.
    #[error("Duplicate key '{key}' at '{path}'")]
    DuplicateKey {
        /// Path of the object that already holds the key.
        path: String,
        /// The repeated key.
        key: String,
    },

    /// The source node cannot be converted to the target type at all.
    #[error("Mismatched types at '{path}': {message}")]
    MismatchedTypes {
        /// Path of the field being loaded or saved.
        path: String,
        /// Description of the source and target kinds.
        message: String,
    },

    /// A numeric conversion would lose information.
    #[error("Overflow at '{path}': {message}")]
    Overflow {
        /// Path of the field being loaded or saved.
        path: String,
        /// Description of the value and the target type.
        message: String,
    },

    /// One or more declared validators rejected a value.
    ///
    /// Carries every error collected so far, keyed by path.
    #[error("Validation failed: {0}")]
    ValidationFailed(ValidationErrors),

    /// The input stream uses an encoding the format does not accept.
    #[error("Unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    /// Low-level I/O failure while reading or writing a stream.
    #[error("I/O Error: {0}")]
    Io(#[source] Arc<io::Error>),

    /// The format codec failed while producing output.
    #[error("Format Error: {0}")]
    Format(String),
}

/// Stable category of an [`Error`], convenient for matching without destructuring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// See [`Error::Parsing`].
    ParsingError,
    /// See [`Error::OutOfRange`].
    OutOfRange,
    /// See [`Error::DuplicateKey`].
    DuplicateKey,
    /// See [`Error::MismatchedTypes`].
    MismatchedTypes,
    /// See [`Error::Overflow`].
    Overflow,
    /// See [`Error::ValidationFailed`].
    FailedValidation,
    /// See [`Error::UnsupportedEncoding`].
    UnsupportedEncoding,
    /// See [`Error::Io`].
    InputOutputError,
    /// See [`Error::Format`].
    FormatError,
}

impl Error {
    /// Returns the category of this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Parsing(_) => ErrorCode::ParsingError,
            Self::OutOfRange { .. } => ErrorCode::OutOfRange,
            Self::DuplicateKey { .. } => ErrorCode::DuplicateKey,
            Self::MismatchedTypes { .. } => ErrorCode::MismatchedTypes,
            Self::Overflow { .. } => ErrorCode::Overflow,
            Self::ValidationFailed(_) => ErrorCode::FailedValidation,
            Self::UnsupportedEncoding(_) => ErrorCode::UnsupportedEncoding,
            Self::Io(_) => ErrorCode::InputOutputError,
            Self::Format(_) => ErrorCode::FormatError,
        }
    }

    /// Returns `true` for categories that no policy can recover from.
    ///
    /// Mismatched types, overflow and validation failures are recoverable: a different
    /// policy would have let the call continue.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::MismatchedTypes { .. } | Self::Overflow { .. } | Self::ValidationFailed(_)
        )
    }

    /// Returns the path the error refers to, if it is tied to one node.
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::OutOfRange { path, .. }
            | Self::DuplicateKey { path, .. }
            | Self::MismatchedTypes { path, .. }
            | Self::Overflow { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Returns the collected validation errors carried by [`Error::ValidationFailed`].
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            Self::ValidationFailed(errors) => Some(errors),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}
