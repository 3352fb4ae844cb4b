//! Configuration consumed by archives and scopes.
//!
//! Options are constructed by the caller, carried by the
//! [`SerializationContext`](crate::SerializationContext) and read (never modified)
//! during traversal. All types here derive `serde` traits with `#[serde(default)]`, so
//! a partial configuration file is enough to override individual settings.

use serde::{Deserialize, Serialize};

/// Behavior when a numeric conversion would lose information.
///
/// Covers narrowing (`i64` into `i8`), sign conversions, fractional floats loaded into
/// integers and non-0/1 numbers loaded into `bool`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OverflowNumberPolicy {
    /// Abort the call with [`Error::Overflow`](crate::Error::Overflow).
    #[default]
    ThrowError,
    /// Leave the target untouched, record an error at its path and continue.
    Skip,
}

/// Behavior when a source node cannot be converted to the target type at all.
///
/// A null source never triggers this policy; it counts as an absent value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MismatchedTypesPolicy {
    /// Abort the call with [`Error::MismatchedTypes`](crate::Error::MismatchedTypes).
    #[default]
    ThrowError,
    /// Leave the target untouched, record an error at its path and continue.
    Skip,
}

/// When collected validation errors turn into [`Error::ValidationFailed`](crate::Error::ValidationFailed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ValidationPolicy {
    /// Raise as soon as a field records a validator failure.
    FailFast,
    /// Never raise; the caller inspects the context.
    Collect,
    /// Raise once the top-level call has traversed the whole value.
    #[default]
    FailAfterCompletion,
}

/// Output layout of text formats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatOptions {
    /// Pretty-print the document.
    pub enable_format: bool,
    /// Character used for one level of indentation.
    pub padding_char: char,
    /// How many `padding_char` make up one level of indentation.
    pub padding_char_num: usize,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            enable_format: false,
            padding_char: '\t',
            padding_char_num: 1,
        }
    }
}

impl FormatOptions {
    /// The indentation string for one nesting level.
    pub fn indent(&self) -> String {
        std::iter::repeat_n(self.padding_char, self.padding_char_num).collect()
    }
}

/// Options applied when writing to streams and files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamOptions {
    /// Prefix text output with a UTF-8 byte-order mark.
    pub write_bom: bool,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self { write_bom: true }
    }
}

/// Complete configuration surface of a load or save call.
///
/// ```rust
/// use bitscope::{OverflowNumberPolicy, SerializationOptions, ValidationPolicy};
///
/// let options = SerializationOptions::default()
///     .with_overflow_number_policy(OverflowNumberPolicy::Skip)
///     .with_validation_policy(ValidationPolicy::Collect)
///     .with_pretty_print(' ', 2);
/// assert!(options.format_options.enable_format);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerializationOptions {
    /// See [`OverflowNumberPolicy`].
    pub overflow_number_policy: OverflowNumberPolicy,
    /// See [`MismatchedTypesPolicy`].
    pub mismatched_types_policy: MismatchedTypesPolicy,
    /// See [`ValidationPolicy`].
    pub validation_policy: ValidationPolicy,
    /// See [`FormatOptions`].
    pub format_options: FormatOptions,
    /// See [`StreamOptions`].
    pub stream_options: StreamOptions,
}

impl SerializationOptions {
    /// Sets the overflow policy.
    pub fn with_overflow_number_policy(mut self, policy: OverflowNumberPolicy) -> Self {
        self.overflow_number_policy = policy;
        self
    }

    /// Sets the mismatched-types policy.
    pub fn with_mismatched_types_policy(mut self, policy: MismatchedTypesPolicy) -> Self {
        self.mismatched_types_policy = policy;
        self
    }

    /// Sets the validation escalation policy.
    pub fn with_validation_policy(mut self, policy: ValidationPolicy) -> Self {
        self.validation_policy = policy;
        self
    }

    /// Enables pretty printing with the given indentation.
    pub fn with_pretty_print(mut self, padding_char: char, padding_char_num: usize) -> Self {
        self.format_options = FormatOptions {
            enable_format: true,
            padding_char,
            padding_char_num,
        };
        self
    }

    /// Enables or disables the UTF-8 byte-order mark on stream output.
    pub fn with_bom(mut self, write_bom: bool) -> Self {
        self.stream_options.write_bom = write_bom;
        self
    }
}
