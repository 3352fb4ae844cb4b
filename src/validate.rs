//! Field validators.
//!
//! A [`Validator`] inspects a field after it has been serialized and returns an error
//! message when the value is not acceptable. Validators are attached per field through
//! [`KeyedScope::serialize_field`](crate::KeyedScope::serialize_field) or the
//! `#[bitscope(...)]` field attributes of `#[derive(BitObject)]`, and run in declaration
//! order. Their messages are recorded in the
//! [`SerializationContext`](crate::SerializationContext) under the field's path.
//!
//! Every validator receives `is_loaded`, which is `true` when the value was present in
//! the source (load) or written (save). Except for [`Required`], the built-in validators
//! accept absent values: an optional field that is missing is not out of range.
//!
//! Any closure with the signature `Fn(&T, bool) -> Option<String>` is a validator too:
//!
//! ```rust
//! use bitscope::Validator;
//!
//! let even = |value: &i32, _loaded: bool| (value % 2 != 0).then(|| "Must be even".to_owned());
//! assert_eq!(even.validate(&3, true).as_deref(), Some("Must be even"));
//! assert_eq!(even.validate(&4, true), None);
//! ```

use indexmap::{IndexMap, IndexSet};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt::Display;

/// A check run against a serialized field.
pub trait Validator<T: ?Sized> {
    /// Returns an error message when `value` is not acceptable.
    fn validate(&self, value: &T, is_loaded: bool) -> Option<String>;
}

impl<T: ?Sized, F> Validator<T> for F
where
    F: Fn(&T, bool) -> Option<String>,
{
    fn validate(&self, value: &T, is_loaded: bool) -> Option<String> {
        self(value, is_loaded)
    }
}

/// Fails when the field was not present.
#[derive(Debug, Clone, Copy, Default)]
pub struct Required;

impl<T: ?Sized> Validator<T> for Required {
    fn validate(&self, _value: &T, is_loaded: bool) -> Option<String> {
        (!is_loaded).then(|| "This field is required".to_owned())
    }
}

/// Accepts values in the half-open interval `[min, max)`.
///
/// ```rust
/// use bitscope::{Range, Validator};
///
/// let percent = Range::new(0, 100);
/// assert_eq!(percent.validate(&99, true), None);
/// assert!(percent.validate(&100, true).is_some());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Range<T> {
    min: T,
    max: T,
}

impl<T> Range<T> {
    /// `min` is inclusive, `max` is exclusive.
    pub const fn new(min: T, max: T) -> Self {
        Self { min, max }
    }
}

impl<T: PartialOrd + Display> Validator<T> for Range<T> {
    fn validate(&self, value: &T, is_loaded: bool) -> Option<String> {
        if !is_loaded || (*value >= self.min && *value < self.max) {
            return None;
        }
        Some(format!("Value must be between {} and {}", self.min, self.max))
    }
}

impl<T: PartialOrd + Display> Validator<Option<T>> for Range<T> {
    fn validate(&self, value: &Option<T>, is_loaded: bool) -> Option<String> {
        value
            .as_ref()
            .and_then(|inner| self.validate(inner, is_loaded))
    }
}

/// Number of elements (or characters, for text) of a value.
pub trait HasSize {
    /// The size compared by [`MinSize`] and [`MaxSize`].
    fn size(&self) -> usize;
}

impl HasSize for str {
    fn size(&self) -> usize {
        self.chars().count()
    }
}

impl HasSize for String {
    fn size(&self) -> usize {
        self.as_str().size()
    }
}

impl<T> HasSize for [T] {
    fn size(&self) -> usize {
        self.len()
    }
}

impl<T: HasSize + ?Sized> HasSize for Box<T> {
    fn size(&self) -> usize {
        (**self).size()
    }
}

impl<T: HasSize> HasSize for Option<T> {
    fn size(&self) -> usize {
        self.as_ref().map_or(0, HasSize::size)
    }
}

macro_rules! impl_len_size {
    ($($container:ident<$($param:ident),+>),*) => {
        $(
            impl<$($param),+> HasSize for $container<$($param),+> {
                fn size(&self) -> usize {
                    self.len()
                }
            }
        )*
    };
}

impl_len_size!(
    Vec<T>,
    VecDeque<T>,
    BTreeSet<T>,
    HashSet<T, H>,
    IndexSet<T, H>,
    BTreeMap<K, V>,
    HashMap<K, V, H>,
    IndexMap<K, V, H>
);

impl<T, const N: usize> HasSize for [T; N] {
    fn size(&self) -> usize {
        N
    }
}

/// Accepts values with at least `n` elements.
#[derive(Debug, Clone, Copy)]
pub struct MinSize(pub usize);

impl<T: HasSize + ?Sized> Validator<T> for MinSize {
    fn validate(&self, value: &T, is_loaded: bool) -> Option<String> {
        if !is_loaded || value.size() >= self.0 {
            return None;
        }
        Some(format!("The minimum size of this field should be {}.", self.0))
    }
}

/// Accepts values with fewer than `n` elements.
#[derive(Debug, Clone, Copy)]
pub struct MaxSize(pub usize);

impl<T: HasSize + ?Sized> Validator<T> for MaxSize {
    fn validate(&self, value: &T, is_loaded: bool) -> Option<String> {
        if !is_loaded || value.size() < self.0 {
            return None;
        }
        Some(format!(
            "The maximum size of this field should be not greater than {}.",
            self.0
        ))
    }
}
