use super::slot::{expect_container, load_scalar, save_scalar};
use super::{ArrayScope, KeyedScope, Load, Mode, PathLink, Save, Scope, Segment, Slot};
use crate::context::SerializationContext;
use crate::convert::Scalar;
use crate::error::{Error, Result};
use crate::format::Format;
use crate::node::{Node, NodeError, NodeKind};
use crate::serialize::Serialize;
use std::fmt;

/// A keyed scope over an object node.
pub struct ObjectScope<'a, F: Format, M: Mode> {
    node: M::NodeRef<'a, F::Node>,
    path: PathLink<'a>,
    context: &'a mut SerializationContext,
}

impl<'a, F: Format> ObjectScope<'a, F, Load> {
    pub(crate) fn loading(
        node: &'a F::Node,
        path: PathLink<'a>,
        context: &'a mut SerializationContext,
    ) -> Self {
        Self {
            node,
            path,
            context,
        }
    }

    /// `true` when the document holds `key`, even with a null value.
    pub fn contains_key(&self, key: &str) -> bool {
        self.node.find(key).is_some()
    }
}

impl<'a, F: Format> ObjectScope<'a, F, Save> {
    pub(crate) fn saving(
        node: &'a mut F::Node,
        path: PathLink<'a>,
        context: &'a mut SerializationContext,
    ) -> Self {
        Self {
            node,
            path,
            context,
        }
    }
}

impl<F: Format, M: Mode> Scope for ObjectScope<'_, F, M> {
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

impl<F: Format, M: Mode> fmt::Debug for ObjectScope<'_, F, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectScope")
            .field("format", &F::NAME)
            .field("mode", &if M::IS_LOADING { "load" } else { "save" })
            .field("path", &self.path.render::<F>())
            .finish()
    }
}

impl<'a, F: Format> KeyedScope for ObjectScope<'a, F, Load> {
    type Entry<'s>
        = KeyedSlot<'s, 'a, F, Load>
    where
        Self: 's;

    fn child_path(&self, key: &str) -> String {
        PathLink::child(&self.path, Segment::Key(key)).render::<F>()
    }

    fn estimated_size(&self) -> usize {
        self.node.len()
    }

    fn visit_keys<C: FnMut(&str)>(&self, mut callback: C) {
        self.node.visit_keys(&mut callback);
    }

    fn holds_null(&self, key: &str) -> bool {
        self.node.find(key).is_some_and(Node::is_null)
    }

    fn slot<'s>(&'s mut self, key: &'s str) -> Self::Entry<'s> {
        KeyedSlot { scope: self, key }
    }

    fn serialize_value<T: Serialize>(&mut self, key: &str, value: &mut T) -> Result<bool> {
        value.serialize(self.slot(key))
    }
}

impl<'a, F: Format> KeyedScope for ObjectScope<'a, F, Save> {
    type Entry<'s>
        = KeyedSlot<'s, 'a, F, Save>
    where
        Self: 's;

    fn child_path(&self, key: &str) -> String {
        PathLink::child(&self.path, Segment::Key(key)).render::<F>()
    }

    fn estimated_size(&self) -> usize {
        self.node.len()
    }

    fn visit_keys<C: FnMut(&str)>(&self, mut callback: C) {
        self.node.visit_keys(&mut callback);
    }

    fn holds_null(&self, _key: &str) -> bool {
        false
    }

    fn slot<'s>(&'s mut self, key: &'s str) -> Self::Entry<'s> {
        KeyedSlot { scope: self, key }
    }

    fn serialize_value<T: Serialize>(&mut self, key: &str, value: &mut T) -> Result<bool> {
        value.serialize(self.slot(key))
    }
}

/// The position under one key of an [`ObjectScope`].
pub struct KeyedSlot<'s, 'a, F: Format, M: Mode> {
    scope: &'s mut ObjectScope<'a, F, M>,
    key: &'s str,
}

impl<'s, F: Format> Slot for KeyedSlot<'s, '_, F, Load> {
    type Mode = Load;
    type Object = ObjectScope<'s, F, Load>;
    type Array = ArrayScope<'s, F, Load>;

    fn path(&self) -> String {
        self.scope.child_path(self.key)
    }

    fn context(&mut self) -> &mut SerializationContext {
        &mut *self.scope.context
    }

    fn is_null(&self) -> bool {
        self.scope.node.find(self.key).is_some_and(Node::is_null)
    }

    fn null(self) -> Result<bool> {
        Ok(self.is_null())
    }

    fn scalar<T: Scalar>(self, value: &mut T) -> Result<bool> {
        let scope = self.scope;
        let path = PathLink::child(&scope.path, Segment::Key(self.key));
        load_scalar::<F, T>(scope.node.find(self.key), value, &mut *scope.context, &path)
    }

    fn open_object(self, _size_hint: usize) -> Result<Option<Self::Object>> {
        let scope = self.scope;
        let path = PathLink::child(&scope.path, Segment::Key(self.key));
        let node = scope.node.find(self.key);
        match expect_container::<F>(node, NodeKind::Object, &mut *scope.context, &path)? {
            Some(node) => Ok(Some(ObjectScope::loading(node, path, &mut *scope.context))),
            None => Ok(None),
        }
    }

    fn open_array(self, _size: usize) -> Result<Option<Self::Array>> {
        let scope = self.scope;
        let path = PathLink::child(&scope.path, Segment::Key(self.key));
        let node = scope.node.find(self.key);
        match expect_container::<F>(node, NodeKind::Array, &mut *scope.context, &path)? {
            Some(node) => Ok(Some(ArrayScope::loading(node, path, &mut *scope.context))),
            None => Ok(None),
        }
    }
}

impl<'s, F: Format> Slot for KeyedSlot<'s, '_, F, Save> {
    type Mode = Save;
    type Object = ObjectScope<'s, F, Save>;
    type Array = ArrayScope<'s, F, Save>;

    fn path(&self) -> String {
        self.scope.child_path(self.key)
    }

    fn context(&mut self) -> &mut SerializationContext {
        &mut *self.scope.context
    }

    fn is_null(&self) -> bool {
        false
    }

    fn null(self) -> Result<bool> {
        let scope = self.scope;
        insert_child::<F>(&mut *scope.node, self.key, F::Node::default(), &scope.path)?;
        Ok(true)
    }

    fn scalar<T: Scalar>(self, value: &mut T) -> Result<bool> {
        let scope = self.scope;
        let path = PathLink::child(&scope.path, Segment::Key(self.key));
        let Some(node) = save_scalar::<F, T>(value, &mut *scope.context, &path)? else {
            return Ok(false);
        };
        insert_child::<F>(&mut *scope.node, self.key, node, &scope.path)?;
        Ok(true)
    }

    fn open_object(self, size_hint: usize) -> Result<Option<Self::Object>> {
        let scope = self.scope;
        let child = insert_child::<F>(
            &mut *scope.node,
            self.key,
            F::Node::new_object(size_hint),
            &scope.path,
        )?;
        let path = PathLink::child(&scope.path, Segment::Key(self.key));
        Ok(Some(ObjectScope::saving(child, path, &mut *scope.context)))
    }

    fn open_array(self, size: usize) -> Result<Option<Self::Array>> {
        let scope = self.scope;
        let child = insert_child::<F>(
            &mut *scope.node,
            self.key,
            F::Node::new_array(size),
            &scope.path,
        )?;
        let path = PathLink::child(&scope.path, Segment::Key(self.key));
        Ok(Some(ArrayScope::saving(child, path, &mut *scope.context, size)))
    }
}

fn insert_child<'n, F: Format>(
    object: &'n mut F::Node,
    key: &str,
    child: F::Node,
    object_path: &PathLink<'_>,
) -> Result<&'n mut F::Node> {
    object.insert(key, child).map_err(|error| match error {
        NodeError::DuplicateKey => Error::DuplicateKey {
            path: object_path.render::<F>(),
            key: key.to_owned(),
        },
        NodeError::WrongKind(kind) => Error::MismatchedTypes {
            path: object_path.render::<F>(),
            message: format!("Cannot add the key '{key}' to a node of kind {kind}"),
        },
    })
}
