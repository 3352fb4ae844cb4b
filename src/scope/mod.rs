//! Traversal cursors over a document tree.
//!
//! A scope references exactly one node of the document and is the only code allowed to
//! touch nodes. There are three kinds:
//!
//! - [`RootScope`]: the document root, holding one unnamed value.
//! - [`ObjectScope`]: a keyed scope over an object node ([`KeyedScope`]).
//! - [`ArrayScope`]: an unkeyed scope over an array node ([`UnkeyedScope`]).
//!
//! Every scope is parameterized by a [`Mode`], either [`Load`] or [`Save`], fixed at
//! compile time. A load scope borrows its node immutably; a save scope borrows it
//! mutably. Operations that only make sense in one direction exist only on that
//! direction's type, so using them in the other one is a compile error.
//!
//! Scopes never outlive the call that opened them: a child borrows its parent mutably
//! for its whole lifetime, and the parent's path link is borrowed alongside, which is
//! how [`Scope::path`] rebuilds the full path without any back-pointer.
//!
//! ## Capability Gating
//!
//! Keyed and unkeyed scopes expose different signatures, so a bare value cannot be
//! written into an object without a key:
//!
//! ```compile_fail
//! use bitscope::{KeyedScope, Object, Result};
//!
//! struct Point { x: i32 }
//!
//! impl Object for Point {
//!     fn serialize_fields<S: KeyedScope>(&mut self, scope: &mut S) -> Result<()> {
//!         scope.serialize_value(&mut self.x)?;
//!         Ok(())
//!     }
//! }
//! ```
//!
//! Load-only operations are absent from save scopes:
//!
//! ```compile_fail
//! use bitscope::{ArrayScope, Json, Save};
//!
//! fn drained(scope: &ArrayScope<'_, Json, Save>) -> bool {
//!     scope.is_end()
//! }
//! ```

use crate::context::SerializationContext;
use crate::convert::ConversionError;
use crate::error::Result;
use crate::format::Format;
use crate::options::{MismatchedTypesPolicy, OverflowNumberPolicy};
use crate::serialize::{Object, Serialize};
use crate::validate::Validator;
use std::fmt::{self, Write as _};

mod array;
mod object;
mod root;
mod slot;

pub use array::{ArrayScope, IndexSlot};
pub use object::{KeyedSlot, ObjectScope};
pub use root::{RootScope, RootSlot};
pub use slot::Slot;

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Load {}
    impl Sealed for super::Save {}
}

/// Direction of a traversal, fixed at compile time.
pub trait Mode: sealed::Sealed + Copy + fmt::Debug + Send + Sync + 'static {
    /// `true` for [`Load`].
    const IS_LOADING: bool;

    /// How a scope of this mode holds its node.
    #[doc(hidden)]
    type NodeRef<'a, N: 'a>;
}

/// Reading a document into values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Load;

/// Writing values into a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Save;

impl Mode for Load {
    const IS_LOADING: bool = true;
    type NodeRef<'a, N: 'a> = &'a N;
}

impl Mode for Save {
    const IS_LOADING: bool = false;
    type NodeRef<'a, N: 'a> = &'a mut N;
}

/// Operations shared by every scope.
pub trait Scope {
    /// Direction of the traversal.
    type Mode: Mode;

    /// Path of the scope's node in the format's pointer syntax (`""` for the root).
    fn path(&self) -> String;

    /// The context of the running call.
    fn context(&self) -> &SerializationContext;

    /// The context of the running call, for recording custom errors.
    fn context_mut(&mut self) -> &mut SerializationContext;

    /// `true` in load mode.
    fn is_loading(&self) -> bool {
        <Self::Mode as Mode>::IS_LOADING
    }
}

/// A scope whose values are addressed by key.
pub trait KeyedScope: Scope + Sized {
    /// Path of the child stored under `key`.
    fn child_path(&self, key: &str) -> String;

    /// Number of entries in the object (present entries on load, written ones on save).
    fn estimated_size(&self) -> usize;

    /// Calls `callback` with every key of the object in document order.
    fn visit_keys<C: FnMut(&str)>(&self, callback: C);

    /// `true` when loading and the document holds an explicit null under `key`.
    fn holds_null(&self, key: &str) -> bool;

    /// Position produced by [`KeyedScope::slot`].
    type Entry<'s>: Slot<Mode = Self::Mode>
    where
        Self: 's;

    /// The position under `key`, for values that drive their slot by hand.
    fn slot<'s>(&'s mut self, key: &'s str) -> Self::Entry<'s>;

    /// Opens a nested object under `key`.
    ///
    /// ```rust
    /// use bitscope::{JsonArchive, KeyedScope, Object, Result};
    /// # use bitscope::{Serialize, Slot};
    ///
    /// #[derive(Default)]
    /// struct Segment { from: (i32, i32), to: (i32, i32) }
    ///
    /// impl Object for Segment {
    ///     fn serialize_fields<S: KeyedScope>(&mut self, scope: &mut S) -> Result<()> {
    ///         if let Some(mut ends) = scope.open_object_scope("ends", 2)? {
    ///             ends.serialize_value("from", &mut self.from)?;
    ///             ends.serialize_value("to", &mut self.to)?;
    ///         }
    ///         Ok(())
    ///     }
    /// }
    /// # impl Serialize for Segment {
    /// #     fn serialize<S: Slot>(&mut self, slot: S) -> Result<bool> {
    /// #         bitscope::serialize_object(self, slot)
    /// #     }
    /// # }
    ///
    /// let mut segment = Segment { from: (0, 0), to: (3, 4) };
    /// let text = JsonArchive::save_string(&mut segment)?;
    /// assert_eq!(text, r#"{"ends":{"from":[0,0],"to":[3,4]}}"#);
    /// # Ok::<(), bitscope::Error>(())
    /// ```
    fn open_object_scope<'s>(
        &'s mut self,
        key: &'s str,
        size_hint: usize,
    ) -> Result<Option<<Self::Entry<'s> as Slot>::Object>> {
        self.slot(key).open_object(size_hint)
    }

    /// Opens a nested array under `key`.
    fn open_array_scope<'s>(
        &'s mut self,
        key: &'s str,
        size: usize,
    ) -> Result<Option<<Self::Entry<'s> as Slot>::Array>> {
        self.slot(key).open_array(size)
    }

    /// Loads or saves `value` under `key`.
    ///
    /// Returns `true` when a value was present (load) or written (save). A missing key
    /// is not an error; it returns `false` and leaves `value` untouched.
    fn serialize_value<T: Serialize>(&mut self, key: &str, value: &mut T) -> Result<bool>;

    /// Like [`KeyedScope::serialize_value`], then runs `validators` in order and records
    /// their failures under the field's path.
    ///
    /// ```rust
    /// use bitscope::{JsonArchive, KeyedScope, MaxSize, Object, Range, Required, Result};
    /// # use bitscope::{Serialize, Slot};
    ///
    /// #[derive(Default)]
    /// struct Account { age: i32, nick: String }
    ///
    /// impl Object for Account {
    ///     fn serialize_fields<S: KeyedScope>(&mut self, scope: &mut S) -> Result<()> {
    ///         scope.serialize_field("age", &mut self.age, &[&Required, &Range::new(0, 150)])?;
    ///         scope.serialize_field("nick", &mut self.nick, &[&MaxSize(16)])?;
    ///         Ok(())
    ///     }
    /// }
    /// # impl Serialize for Account {
    /// #     fn serialize<S: Slot>(&mut self, slot: S) -> Result<bool> {
    /// #         bitscope::serialize_object(self, slot)
    /// #     }
    /// # }
    ///
    /// let mut account = Account::default();
    /// let err = JsonArchive::load_str(&mut account, r#"{"age": 200}"#).unwrap_err();
    /// let errors = err.validation_errors().unwrap();
    /// assert!(errors.contains("/age"));
    /// ```
    fn serialize_field<T: Serialize>(
        &mut self,
        key: &str,
        value: &mut T,
        validators: &[&dyn Validator<T>],
    ) -> Result<bool> {
        let present = self.serialize_value(key, value)?;
        if validators.is_empty() {
            return Ok(present);
        }
        let failures: Vec<String> = validators
            .iter()
            .filter_map(|validator| validator.validate(value, present))
            .collect();
        if !failures.is_empty() {
            let path = self.child_path(key);
            self.context_mut().record_failures(path, failures)?;
        }
        Ok(present)
    }

    /// Runs the traversal of `base` against this same scope.
    ///
    /// The base type's fields land next to the caller's own fields, without a nested
    /// object.
    fn serialize_base<T: Object>(&mut self, base: &mut T) -> Result<()> {
        base.serialize_fields(self)
    }
}

/// A scope whose values are addressed by position.
pub trait UnkeyedScope: Scope + Sized {
    /// Number of elements (present elements on load, reserved capacity on save).
    fn estimated_size(&self) -> usize;

    /// `true` when loading and the next element is an explicit null.
    fn next_is_null(&self) -> bool;

    /// Position produced by [`UnkeyedScope::slot`].
    type Element<'s>: Slot<Mode = Self::Mode>
    where
        Self: 's;

    /// The next position, for values that drive their slot by hand.
    fn slot(&mut self) -> Result<Self::Element<'_>>;

    /// Opens an object as the next element.
    fn open_object_scope(
        &mut self,
        size_hint: usize,
    ) -> Result<Option<<Self::Element<'_> as Slot>::Object>> {
        self.slot()?.open_object(size_hint)
    }

    /// Opens an array as the next element.
    fn open_array_scope(&mut self, size: usize) -> Result<Option<<Self::Element<'_> as Slot>::Array>> {
        self.slot()?.open_array(size)
    }

    /// Loads or saves the next value.
    ///
    /// On load, reading past the last element is an [`Error::OutOfRange`](crate::Error::OutOfRange).
    fn serialize_value<T: Serialize>(&mut self, value: &mut T) -> Result<bool>;
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum Segment<'a> {
    Root,
    Key(&'a str),
    Index(usize),
}

/// One link of the chain from a scope up to the root.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PathLink<'a> {
    parent: Option<&'a PathLink<'a>>,
    segment: Segment<'a>,
}

impl<'a> PathLink<'a> {
    pub(crate) const fn root() -> Self {
        Self {
            parent: None,
            segment: Segment::Root,
        }
    }

    pub(crate) fn child(parent: &'a PathLink<'a>, segment: Segment<'a>) -> Self {
        Self {
            parent: Some(parent),
            segment,
        }
    }

    pub(crate) fn render<F: Format>(&self) -> String {
        let mut out = String::new();
        self.write_into::<F>(&mut out);
        out
    }

    fn write_into<F: Format>(&self, out: &mut String) {
        if let Some(parent) = self.parent {
            parent.write_into::<F>(out);
        }
        match self.segment {
            Segment::Root => {}
            Segment::Key(key) => {
                out.push(F::PATH_SEPARATOR);
                out.push_str(&F::escape_key(key));
            }
            Segment::Index(index) => {
                out.push(F::PATH_SEPARATOR);
                let _ = write!(out, "{index}");
            }
        }
    }
}

/// Resolves a conversion failure according to the active policy.
///
/// `ThrowError` turns it into the matching [`crate::Error`]; `Skip` records it at
/// `path` and lets the traversal continue.
pub(crate) fn apply_policy(
    context: &mut SerializationContext,
    path: String,
    error: ConversionError,
) -> Result<()> {
    let skip = match error {
        ConversionError::Overflow(_) => {
            context.options().overflow_number_policy == OverflowNumberPolicy::Skip
        }
        ConversionError::MismatchedTypes(_) => {
            context.options().mismatched_types_policy == MismatchedTypesPolicy::Skip
        }
    };
    if !skip {
        return Err(error.into_error(path));
    }
    tracing::debug!(path = %path, "skipping value: {error}");
    context.add_error(path, error.message());
    Ok(())
}
