use super::slot::{expect_container, load_scalar, save_scalar};
use super::{ArrayScope, Load, Mode, ObjectScope, PathLink, Save, Scope, Slot, UnkeyedScope};
use crate::context::SerializationContext;
use crate::convert::Scalar;
use crate::error::{Error, Result};
use crate::format::Format;
use crate::node::{Node, NodeKind};
use crate::serialize::Serialize;
use std::fmt;

/// The scope over a document's root node. It holds exactly one unnamed value.
pub struct RootScope<'a, F: Format, M: Mode> {
    node: M::NodeRef<'a, F::Node>,
    path: PathLink<'a>,
    context: &'a mut SerializationContext,
    written: bool,
}

impl<'a, F: Format> RootScope<'a, F, Load> {
    pub(crate) fn loading(node: &'a F::Node, context: &'a mut SerializationContext) -> Self {
        Self {
            node,
            path: PathLink::root(),
            context,
            written: false,
        }
    }
}

impl<'a, F: Format> RootScope<'a, F, Save> {
    pub(crate) fn saving(node: &'a mut F::Node, context: &'a mut SerializationContext) -> Self {
        Self {
            node,
            path: PathLink::root(),
            context,
            written: false,
        }
    }
}

impl<'a, F: Format, M: Mode> RootScope<'a, F, M> {
    /// On save, the root can be filled only once.
    fn take_slot(&mut self) -> Result<RootSlot<'_, 'a, F, M>> {
        if !M::IS_LOADING && self.written {
            return Err(Error::OutOfRange {
                path: self.path.render::<F>(),
                message: "The root already holds a value".to_owned(),
            });
        }
        self.written = true;
        Ok(RootSlot { scope: self })
    }
}

impl<F: Format, M: Mode> Scope for RootScope<'_, F, M> {
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

impl<F: Format, M: Mode> fmt::Debug for RootScope<'_, F, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RootScope")
            .field("format", &F::NAME)
            .field("mode", &if M::IS_LOADING { "load" } else { "save" })
            .field("written", &self.written)
            .finish()
    }
}

impl<'a, F: Format> UnkeyedScope for RootScope<'a, F, Load> {
    type Element<'s>
        = RootSlot<'s, 'a, F, Load>
    where
        Self: 's;

    fn estimated_size(&self) -> usize {
        1
    }

    fn next_is_null(&self) -> bool {
        !self.written && self.node.is_null()
    }

    fn slot(&mut self) -> Result<Self::Element<'_>> {
        self.take_slot()
    }

    fn serialize_value<T: Serialize>(&mut self, value: &mut T) -> Result<bool> {
        value.serialize(self.take_slot()?)
    }
}

impl<'a, F: Format> UnkeyedScope for RootScope<'a, F, Save> {
    type Element<'s>
        = RootSlot<'s, 'a, F, Save>
    where
        Self: 's;

    fn estimated_size(&self) -> usize {
        1
    }

    fn next_is_null(&self) -> bool {
        false
    }

    fn slot(&mut self) -> Result<Self::Element<'_>> {
        self.take_slot()
    }

    fn serialize_value<T: Serialize>(&mut self, value: &mut T) -> Result<bool> {
        value.serialize(self.take_slot()?)
    }
}

/// The position of a document's root value.
pub struct RootSlot<'s, 'a, F: Format, M: Mode> {
    scope: &'s mut RootScope<'a, F, M>,
}

impl<'s, F: Format> Slot for RootSlot<'s, '_, F, Load> {
    type Mode = Load;
    type Object = ObjectScope<'s, F, Load>;
    type Array = ArrayScope<'s, F, Load>;

    fn path(&self) -> String {
        self.scope.path.render::<F>()
    }

    fn context(&mut self) -> &mut SerializationContext {
        &mut *self.scope.context
    }

    fn is_null(&self) -> bool {
        self.scope.node.is_null()
    }

    fn null(self) -> Result<bool> {
        Ok(self.is_null())
    }

    fn scalar<T: Scalar>(self, value: &mut T) -> Result<bool> {
        let scope = self.scope;
        load_scalar::<F, T>(Some(scope.node), value, &mut *scope.context, &scope.path)
    }

    fn open_object(self, _size_hint: usize) -> Result<Option<Self::Object>> {
        let scope = self.scope;
        let node = Some(scope.node);
        match expect_container::<F>(node, NodeKind::Object, &mut *scope.context, &scope.path)? {
            Some(node) => Ok(Some(ObjectScope::loading(
                node,
                PathLink::root(),
                &mut *scope.context,
            ))),
            None => Ok(None),
        }
    }

    fn open_array(self, _size: usize) -> Result<Option<Self::Array>> {
        let scope = self.scope;
        let node = Some(scope.node);
        match expect_container::<F>(node, NodeKind::Array, &mut *scope.context, &scope.path)? {
            Some(node) => Ok(Some(ArrayScope::loading(
                node,
                PathLink::root(),
                &mut *scope.context,
            ))),
            None => Ok(None),
        }
    }
}

impl<'s, F: Format> Slot for RootSlot<'s, '_, F, Save> {
    type Mode = Save;
    type Object = ObjectScope<'s, F, Save>;
    type Array = ArrayScope<'s, F, Save>;

    fn path(&self) -> String {
        self.scope.path.render::<F>()
    }

    fn context(&mut self) -> &mut SerializationContext {
        &mut *self.scope.context
    }

    fn is_null(&self) -> bool {
        false
    }

    fn null(self) -> Result<bool> {
        self.scope.node.set_null();
        Ok(true)
    }

    fn scalar<T: Scalar>(self, value: &mut T) -> Result<bool> {
        let scope = self.scope;
        match save_scalar::<F, T>(value, &mut *scope.context, &scope.path)? {
            Some(node) => {
                *scope.node = node;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn open_object(self, size_hint: usize) -> Result<Option<Self::Object>> {
        let scope = self.scope;
        *scope.node = F::Node::new_object(size_hint);
        Ok(Some(ObjectScope::saving(
            &mut *scope.node,
            PathLink::root(),
            &mut *scope.context,
        )))
    }

    fn open_array(self, size: usize) -> Result<Option<Self::Array>> {
        let scope = self.scope;
        *scope.node = F::Node::new_array(size);
        Ok(Some(ArrayScope::saving(
            &mut *scope.node,
            PathLink::root(),
            &mut *scope.context,
            size,
        )))
    }
}
