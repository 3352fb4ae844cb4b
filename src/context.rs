//! Per-call serialization state.
//!
//! A [`SerializationContext`] is created by the caller, borrowed mutably by one or more
//! load/save calls and inspected afterwards. It carries the active
//! [`SerializationOptions`], the errors collected so far (keyed by the path of the
//! failing node) and a validity flag that flips to `false` on the first recorded error
//! and is never reset by the library.

use crate::error::{Error, Result};
use crate::options::{SerializationOptions, ValidationPolicy};
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;

/// Errors collected during traversal, grouped by path in first-failure order.
///
/// Messages for one path keep the order in which they were recorded, which for
/// validators is their declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    entries: IndexMap<String, Vec<String>>,
}

impl ValidationErrors {
    /// Number of distinct paths with at least one error.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Messages recorded for `path`.
    pub fn get(&self, path: &str) -> Option<&[String]> {
        self.entries.get(path).map(Vec::as_slice)
    }

    /// Returns `true` when at least one message was recorded for `path`.
    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    /// Iterates over `(path, messages)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(path, messages)| (path.as_str(), messages.as_slice()))
    }

    /// Paths with errors, in first-failure order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Total number of messages across all paths.
    pub fn message_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub(crate) fn push(&mut self, path: String, message: String) {
        self.entries.entry(path).or_default().push(message);
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (path, messages) in &self.entries {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                first = false;
                write!(f, "'{path}': {message}")?;
            }
        }
        Ok(())
    }
}

/// Options, collected errors and overall validity of one logical operation.
///
/// ```rust
/// use bitscope::{SerializationContext, SerializationOptions, ValidationPolicy};
///
/// let mut context = SerializationContext::new(
///     SerializationOptions::default().with_validation_policy(ValidationPolicy::Collect),
/// );
/// context.add_error("/name", "This field is required");
/// assert!(!context.is_valid());
/// assert_eq!(context.errors().get("/name").map(<[String]>::len), Some(1));
/// ```
#[derive(Debug, Clone)]
pub struct SerializationContext {
    options: SerializationOptions,
    errors: ValidationErrors,
    valid: bool,
}

impl Default for SerializationContext {
    fn default() -> Self {
        Self::new(SerializationOptions::default())
    }
}

impl SerializationContext {
    /// Creates a valid context with no recorded errors.
    pub fn new(options: SerializationOptions) -> Self {
        Self {
            options,
            errors: ValidationErrors::default(),
            valid: true,
        }
    }

    /// The active options.
    pub fn options(&self) -> &SerializationOptions {
        &self.options
    }

    /// `false` once any error has been recorded.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Errors collected so far.
    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    /// Records `message` under `path` and marks the context invalid.
    pub fn add_error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        let path = path.into();
        let message = message.into();
        tracing::debug!(path = %path, message = %message, "recorded serialization error");
        self.errors.push(path, message);
        self.valid = false;
    }

    /// Records a batch of validator failures for one field, escalating under
    /// [`ValidationPolicy::FailFast`].
    pub(crate) fn record_failures(&mut self, path: String, failures: Vec<String>) -> Result<()> {
        if failures.is_empty() {
            return Ok(());
        }
        for message in failures {
            self.add_error(path.clone(), message);
        }
        if self.options.validation_policy == ValidationPolicy::FailFast {
            return Err(Error::ValidationFailed(self.errors.clone()));
        }
        Ok(())
    }

    /// Escalation check run by archives at the end of every top-level call.
    ///
    /// Returns [`Error::ValidationFailed`] when the context is invalid and the policy is
    /// anything but [`ValidationPolicy::Collect`].
    pub fn finish(&self) -> Result<()> {
        if self.valid || self.options.validation_policy == ValidationPolicy::Collect {
            return Ok(());
        }
        Err(Error::ValidationFailed(self.errors.clone()))
    }
}
