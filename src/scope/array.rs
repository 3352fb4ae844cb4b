use super::slot::{expect_container, load_scalar, save_scalar};
use super::{Load, Mode, ObjectScope, PathLink, Save, Scope, Segment, Slot, UnkeyedScope};
use crate::context::SerializationContext;
use crate::convert::Scalar;
use crate::error::{Error, Result};
use crate::format::Format;
use crate::node::{Node, NodeError, NodeKind};
use crate::serialize::Serialize;
use std::fmt;

/// An unkeyed scope over an array node.
///
/// The scope keeps a cursor that advances by one for every value serialized. On load
/// the document decides how many elements exist; on save the size passed when the
/// scope was opened is a hard capacity.
pub struct ArrayScope<'a, F: Format, M: Mode> {
    node: M::NodeRef<'a, F::Node>,
    path: PathLink<'a>,
    context: &'a mut SerializationContext,
    cursor: usize,
    capacity: usize,
}

impl<'a, F: Format> ArrayScope<'a, F, Load> {
    pub(crate) fn loading(
        node: &'a F::Node,
        path: PathLink<'a>,
        context: &'a mut SerializationContext,
    ) -> Self {
        Self {
            capacity: node.len(),
            node,
            path,
            context,
            cursor: 0,
        }
    }

    /// `true` once every element of the source array has been consumed.
    pub fn is_end(&self) -> bool {
        self.cursor >= self.node.len()
    }

    /// Number of source elements not consumed yet.
    pub fn remaining(&self) -> usize {
        self.node.len().saturating_sub(self.cursor)
    }
}

impl<'a, F: Format> ArrayScope<'a, F, Save> {
    pub(crate) fn saving(
        node: &'a mut F::Node,
        path: PathLink<'a>,
        context: &'a mut SerializationContext,
        capacity: usize,
    ) -> Self {
        Self {
            node,
            path,
            context,
            cursor: 0,
            capacity,
        }
    }
}

impl<'a, F: Format, M: Mode> ArrayScope<'a, F, M> {
    /// Index of the next element.
    pub fn position(&self) -> usize {
        self.cursor
    }

    fn next_slot(&mut self) -> Result<IndexSlot<'_, 'a, F, M>> {
        let index = self.advance()?;
        Ok(IndexSlot { scope: self, index })
    }

    fn advance(&mut self) -> Result<usize> {
        let index = self.cursor;
        if index >= self.capacity {
            let message = if M::IS_LOADING {
                "No more items to load".to_owned()
            } else {
                format!("The array was opened for {} elements", self.capacity)
            };
            return Err(Error::OutOfRange {
                path: PathLink::child(&self.path, Segment::Index(index)).render::<F>(),
                message,
            });
        }
        self.cursor += 1;
        Ok(index)
    }
}

impl<F: Format, M: Mode> Scope for ArrayScope<'_, F, M> {
    type Mode = M;

    fn path(&self) -> String {
        self.path.render::<F>()
    }

    fn context(&self) -> &SerializationContext {
        &*self.context
    }

    fn context_mut(&mut self) -> &mut SerializationContext {
        &mut *self.context
    }
}

impl<F: Format, M: Mode> fmt::Debug for ArrayScope<'_, F, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrayScope")
            .field("format", &F::NAME)
            .field("mode", &if M::IS_LOADING { "load" } else { "save" })
            .field("path", &self.path.render::<F>())
            .field("cursor", &self.cursor)
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl<'a, F: Format> UnkeyedScope for ArrayScope<'a, F, Load> {
    type Element<'s>
        = IndexSlot<'s, 'a, F, Load>
    where
        Self: 's;

    fn estimated_size(&self) -> usize {
        self.node.len()
    }

    fn next_is_null(&self) -> bool {
        self.node.element(self.cursor).is_some_and(Node::is_null)
    }

    fn slot(&mut self) -> Result<Self::Element<'_>> {
        self.next_slot()
    }

    fn serialize_value<T: Serialize>(&mut self, value: &mut T) -> Result<bool> {
        value.serialize(self.next_slot()?)
    }
}

impl<'a, F: Format> UnkeyedScope for ArrayScope<'a, F, Save> {
    type Element<'s>
        = IndexSlot<'s, 'a, F, Save>
    where
        Self: 's;

    fn estimated_size(&self) -> usize {
        self.capacity
    }

    fn next_is_null(&self) -> bool {
        false
    }

    fn slot(&mut self) -> Result<Self::Element<'_>> {
        self.next_slot()
    }

    fn serialize_value<T: Serialize>(&mut self, value: &mut T) -> Result<bool> {
        value.serialize(self.next_slot()?)
    }
}

/// The position of one element of an [`ArrayScope`].
pub struct IndexSlot<'s, 'a, F: Format, M: Mode> {
    scope: &'s mut ArrayScope<'a, F, M>,
    index: usize,
}

impl<'s, F: Format> Slot for IndexSlot<'s, '_, F, Load> {
    type Mode = Load;
    type Object = ObjectScope<'s, F, Load>;
    type Array = ArrayScope<'s, F, Load>;

    fn path(&self) -> String {
        PathLink::child(&self.scope.path, Segment::Index(self.index)).render::<F>()
    }

    fn context(&mut self) -> &mut SerializationContext {
        &mut *self.scope.context
    }

    fn is_null(&self) -> bool {
        self.scope.node.element(self.index).is_some_and(Node::is_null)
    }

    fn null(self) -> Result<bool> {
        Ok(self.is_null())
    }

    fn scalar<T: Scalar>(self, value: &mut T) -> Result<bool> {
        let scope = self.scope;
        let path = PathLink::child(&scope.path, Segment::Index(self.index));
        load_scalar::<F, T>(scope.node.element(self.index), value, &mut *scope.context, &path)
    }

    fn open_object(self, _size_hint: usize) -> Result<Option<Self::Object>> {
        let scope = self.scope;
        let path = PathLink::child(&scope.path, Segment::Index(self.index));
        let node = scope.node.element(self.index);
        match expect_container::<F>(node, NodeKind::Object, &mut *scope.context, &path)? {
            Some(node) => Ok(Some(ObjectScope::loading(node, path, &mut *scope.context))),
            None => Ok(None),
        }
    }

    fn open_array(self, _size: usize) -> Result<Option<Self::Array>> {
        let scope = self.scope;
        let path = PathLink::child(&scope.path, Segment::Index(self.index));
        let node = scope.node.element(self.index);
        match expect_container::<F>(node, NodeKind::Array, &mut *scope.context, &path)? {
            Some(node) => Ok(Some(ArrayScope::loading(node, path, &mut *scope.context))),
            None => Ok(None),
        }
    }
}

impl<'s, F: Format> Slot for IndexSlot<'s, '_, F, Save> {
    type Mode = Save;
    type Object = ObjectScope<'s, F, Save>;
    type Array = ArrayScope<'s, F, Save>;

    fn path(&self) -> String {
        PathLink::child(&self.scope.path, Segment::Index(self.index)).render::<F>()
    }

    fn context(&mut self) -> &mut SerializationContext {
        &mut *self.scope.context
    }

    fn is_null(&self) -> bool {
        false
    }

    fn null(self) -> Result<bool> {
        let scope = self.scope;
        push_child::<F>(&mut *scope.node, F::Node::default(), &scope.path)?;
        Ok(true)
    }

    fn scalar<T: Scalar>(self, value: &mut T) -> Result<bool> {
        let scope = self.scope;
        let path = PathLink::child(&scope.path, Segment::Index(self.index));
        // A skipped element still takes its position, as null.
        let node = save_scalar::<F, T>(value, &mut *scope.context, &path)?;
        let written = node.is_some();
        push_child::<F>(&mut *scope.node, node.unwrap_or_default(), &scope.path)?;
        Ok(written)
    }

    fn open_object(self, size_hint: usize) -> Result<Option<Self::Object>> {
        let scope = self.scope;
        let child = push_child::<F>(&mut *scope.node, F::Node::new_object(size_hint), &scope.path)?;
        let path = PathLink::child(&scope.path, Segment::Index(self.index));
        Ok(Some(ObjectScope::saving(child, path, &mut *scope.context)))
    }

    fn open_array(self, size: usize) -> Result<Option<Self::Array>> {
        let scope = self.scope;
        let child = push_child::<F>(&mut *scope.node, F::Node::new_array(size), &scope.path)?;
        let path = PathLink::child(&scope.path, Segment::Index(self.index));
        Ok(Some(ArrayScope::saving(child, path, &mut *scope.context, size)))
    }
}

fn push_child<'n, F: Format>(
    array: &'n mut F::Node,
    child: F::Node,
    array_path: &PathLink<'_>,
) -> Result<&'n mut F::Node> {
    array.push(child).map_err(|error| match error {
        NodeError::WrongKind(kind) => Error::MismatchedTypes {
            path: array_path.render::<F>(),
            message: format!("Cannot append an element to a node of kind {kind}"),
        },
        NodeError::DuplicateKey => Error::OutOfRange {
            path: array_path.render::<F>(),
            message: "Arrays have no keys".to_owned(),
        },
    })
}
