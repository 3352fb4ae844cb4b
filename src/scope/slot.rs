use super::{KeyedScope, Mode, PathLink, UnkeyedScope, apply_policy};
use crate::context::SerializationContext;
use crate::convert::{ConversionError, Scalar};
use crate::error::Result;
use crate::format::Format;
use crate::node::{Node, NodeKind};

/// A single position inside a scope, about to receive one value.
///
/// A slot is what a [`Serialize`](crate::Serialize) implementation talks to: the key of
/// an object entry, the next element of an array or the document root. Each method
/// consumes the slot, so a position is filled exactly once.
pub trait Slot: Sized {
    /// Direction of the traversal.
    type Mode: Mode;
    /// Scope produced by [`Slot::open_object`].
    type Object: KeyedScope<Mode = Self::Mode>;
    /// Scope produced by [`Slot::open_array`].
    type Array: UnkeyedScope<Mode = Self::Mode>;

    /// Path of the position.
    fn path(&self) -> String;

    /// The context of the running call.
    fn context(&mut self) -> &mut SerializationContext;

    /// `true` when loading and the source holds an explicit null.
    fn is_null(&self) -> bool;

    /// Saves a null. On load, returns whether the source is null.
    fn null(self) -> Result<bool>;

    /// Loads or saves a scalar, applying the numeric and type policies.
    fn scalar<T: Scalar>(self, value: &mut T) -> Result<bool>;

    /// Opens an object at this position.
    ///
    /// On load, returns `None` when the value is absent or null, and when it is not an
    /// object (after the mismatched-types policy has been applied).
    fn open_object(self, size_hint: usize) -> Result<Option<Self::Object>>;

    /// Opens an array at this position. `size` reserves capacity on save and is ignored
    /// on load, where the document decides.
    fn open_array(self, size: usize) -> Result<Option<Self::Array>>;
}

pub(crate) fn load_scalar<F: Format, T: Scalar>(
    node: Option<&F::Node>,
    value: &mut T,
    context: &mut SerializationContext,
    path: &PathLink<'_>,
) -> Result<bool> {
    let Some(node) = node else {
        return Ok(false);
    };
    if node.is_null() && !T::NULLABLE {
        return Ok(false);
    }
    match T::load_from(node) {
        Ok(loaded) => {
            *value = loaded;
            Ok(true)
        }
        Err(error) => {
            apply_policy(context, path.render::<F>(), error)?;
            Ok(false)
        }
    }
}

/// Builds the node for a scalar; `None` when the policy skipped it.
pub(crate) fn save_scalar<F: Format, T: Scalar>(
    value: &T,
    context: &mut SerializationContext,
    path: &PathLink<'_>,
) -> Result<Option<F::Node>> {
    let mut node = F::Node::default();
    match value.save_into(&mut node) {
        Ok(()) => Ok(Some(node)),
        Err(error) => {
            apply_policy(context, path.render::<F>(), error)?;
            Ok(None)
        }
    }
}

/// Checks that a loaded node is a container of `expected` kind.
pub(crate) fn expect_container<'n, F: Format>(
    node: Option<&'n F::Node>,
    expected: NodeKind,
    context: &mut SerializationContext,
    path: &PathLink<'_>,
) -> Result<Option<&'n F::Node>> {
    match node {
        None => Ok(None),
        Some(node) if node.kind() == expected => Ok(Some(node)),
        Some(node) if node.is_null() => Ok(None),
        Some(node) => {
            let error = ConversionError::MismatchedTypes(format!(
                "Expected {expected} but the document holds {}",
                node.kind()
            ));
            apply_policy(context, path.render::<F>(), error)?;
            Ok(None)
        }
    }
}
