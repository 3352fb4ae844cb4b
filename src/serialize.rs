//! The serialization dispatcher.
//!
//! [`Serialize`] is implemented once per value shape and works in both directions: the
//! same `&mut self` traversal loads when handed a load slot and saves when handed a
//! save slot. The shapes covered here are:
//!
//! - **Scalars** (numbers, `bool`, `String`, `PathBuf`, timestamps, `()`, registered
//!   enums): stored in one node via [`Slot::scalar`].
//! - **Fixed-size values** (`[T; N]`, tuples, [`PositionalObject`]s): an array sized to
//!   the arity. On load a shorter source leaves trailing elements untouched and a
//!   longer source has its extra elements ignored.
//! - **Resizable containers** (`Vec`, `VecDeque`, sets, maps): resized to the source on
//!   load. Maps whose key type is a map key (see [`Serialize::IS_MAP_KEY`]) are stored
//!   as objects; other maps become arrays of `{"key": .., "value": ..}` objects.
//! - **User objects** ([`Object`]): an object scope handed to the type's own traversal.
//!
//! ## Implementing `Object` by hand
//!
//! ```rust
//! use bitscope::{JsonArchive, KeyedScope, Object, Result, Serialize, Slot};
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Point { x: i32, y: i32 }
//!
//! impl Object for Point {
//!     fn serialize_fields<S: KeyedScope>(&mut self, scope: &mut S) -> Result<()> {
//!         scope.serialize_value("x", &mut self.x)?;
//!         scope.serialize_value("y", &mut self.y)?;
//!         Ok(())
//!     }
//! }
//!
//! impl Serialize for Point {
//!     fn serialize<S: Slot>(&mut self, slot: S) -> Result<bool> {
//!         bitscope::serialize_object(self, slot)
//!     }
//! }
//!
//! let mut point = Point { x: 100, y: 200 };
//! let text = JsonArchive::save_string(&mut point)?;
//! assert_eq!(text, r#"{"x":100,"y":200}"#);
//!
//! let mut loaded = Point::default();
//! JsonArchive::load_str(&mut loaded, &text)?;
//! assert_eq!(loaded, point);
//! # Ok::<(), bitscope::Error>(())
//! ```

use crate::convert::ConversionError;
use crate::error::Result;
use crate::scope::{KeyedScope, Mode, Slot, UnkeyedScope, apply_policy};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use std::any::type_name;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::hash::{BuildHasher, Hash};
use std::path::PathBuf;

/// A value that can be loaded from and saved into a slot.
pub trait Serialize {
    /// `true` when the type can be an object key (strings, integers, `bool`, enums).
    const IS_MAP_KEY: bool = false;

    /// Loads or saves the value at `slot`.
    ///
    /// Returns `true` when a value was present (load) or written (save).
    fn serialize<S: Slot>(&mut self, slot: S) -> Result<bool>;

    /// The object key for this value, for types with [`Serialize::IS_MAP_KEY`].
    fn to_map_key(&self) -> Option<String> {
        None
    }

    /// Parses an object key, for types with [`Serialize::IS_MAP_KEY`].
    fn from_map_key(_key: &str) -> Option<Self>
    where
        Self: Sized,
    {
        None
    }
}

/// A user type that maps its fields to keys of an object.
///
/// The traversal is the same for both directions; use [`Scope::is_loading`](crate::Scope::is_loading) when a
/// field needs direction-specific handling.
pub trait Object {
    /// Number of keys the type writes, used to pre-size objects on save.
    const FIELD_COUNT: usize = 0;

    /// Serializes every field into `scope`.
    fn serialize_fields<S: KeyedScope>(&mut self, scope: &mut S) -> Result<()>;
}

/// A user type stored positionally, as a fixed-size array.
pub trait PositionalObject {
    /// Number of elements.
    const ARITY: usize;

    /// Serializes every element into `array`, in order.
    ///
    /// Use [`fixed_len`] to honor the truncating policy on load.
    fn serialize_items<A: UnkeyedScope>(&mut self, array: &mut A) -> Result<()>;
}

/// The [`Serialize`] body shared by every [`Object`].
pub fn serialize_object<T, S>(value: &mut T, slot: S) -> Result<bool>
where
    T: Object + ?Sized,
    S: Slot,
{
    match slot.open_object(T::FIELD_COUNT)? {
        Some(mut scope) => {
            value.serialize_fields(&mut scope)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// The [`Serialize`] body shared by every [`PositionalObject`].
pub fn serialize_positional<T, S>(value: &mut T, slot: S) -> Result<bool>
where
    T: PositionalObject + ?Sized,
    S: Slot,
{
    match slot.open_array(T::ARITY)? {
        Some(mut array) => {
            value.serialize_items(&mut array)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// How many of `arity` fixed elements can be serialized into `array`.
///
/// On save this is the arity. On load it is capped by the source length; extra source
/// elements are ignored.
pub fn fixed_len<A: UnkeyedScope>(array: &A, arity: usize) -> usize {
    if !<A::Mode as Mode>::IS_LOADING {
        return arity;
    }
    let available = array.estimated_size();
    if available > arity {
        tracing::trace!(
            path = %array.path(),
            ignored = available - arity,
            "ignoring extra array elements"
        );
    }
    available.min(arity)
}

/// A named value at a position that has no key of its own, such as the document root.
///
/// ```rust
/// use bitscope::{JsonArchive, KeyValue};
///
/// let mut answer = 42;
/// let text = JsonArchive::save_string(&mut KeyValue::new("Root", &mut answer))?;
/// assert_eq!(text, r#"{"Root":42}"#);
/// # Ok::<(), bitscope::Error>(())
/// ```
#[derive(Debug)]
pub struct KeyValue<'v, T> {
    key: &'v str,
    value: &'v mut T,
}

impl<'v, T> KeyValue<'v, T> {
    /// Pairs `key` with `value`.
    pub fn new(key: &'v str, value: &'v mut T) -> Self {
        Self { key, value }
    }
}

impl<T: Serialize> Serialize for KeyValue<'_, T> {
    fn serialize<S: Slot>(&mut self, slot: S) -> Result<bool> {
        match slot.open_object(1)? {
            Some(mut scope) => scope.serialize_value(self.key, &mut *self.value),
            None => Ok(false),
        }
    }
}

/// One entry of a map stored as an array of pairs.
struct MapEntry<'e, K, V> {
    key: &'e mut K,
    value: &'e mut V,
}

impl<K: Serialize, V: Serialize> Serialize for MapEntry<'_, K, V> {
    fn serialize<S: Slot>(&mut self, slot: S) -> Result<bool> {
        match slot.open_object(2)? {
            Some(mut scope) => {
                let null_key = scope.holds_null("key");
                let has_key = scope.serialize_value("key", &mut *self.key)? || null_key;
                scope.serialize_value("value", &mut *self.value)?;
                Ok(has_key)
            }
            None => Ok(false),
        }
    }
}

// --- Scalars ---

macro_rules! impl_scalar {
    ($($t:ty),*) => {
        $(
            impl Serialize for $t {
                fn serialize<S: Slot>(&mut self, slot: S) -> Result<bool> {
                    slot.scalar(self)
                }
            }
        )*
    };
}

macro_rules! impl_key_scalar {
    ($($t:ty),*) => {
        $(
            impl Serialize for $t {
                const IS_MAP_KEY: bool = true;

                fn serialize<S: Slot>(&mut self, slot: S) -> Result<bool> {
                    slot.scalar(self)
                }

                fn to_map_key(&self) -> Option<String> {
                    Some(self.to_string())
                }

                fn from_map_key(key: &str) -> Option<Self> {
                    key.parse().ok()
                }
            }
        )*
    };
}

impl_scalar!(f32, f64, PathBuf, DateTime<Utc>, ());
impl_key_scalar!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, bool, String);

// --- Wrappers ---

impl<T: Serialize + Default> Serialize for Option<T> {
    fn serialize<S: Slot>(&mut self, slot: S) -> Result<bool> {
        if !<S::Mode as Mode>::IS_LOADING {
            return match self {
                Some(inner) => inner.serialize(slot),
                None => slot.null(),
            };
        }
        if slot.is_null() {
            *self = None;
            return Ok(false);
        }
        match self {
            Some(inner) => inner.serialize(slot),
            None => {
                let mut inner = T::default();
                let loaded = inner.serialize(slot)?;
                if loaded {
                    *self = Some(inner);
                }
                Ok(loaded)
            }
        }
    }
}

impl<T: Serialize> Serialize for Box<T> {
    fn serialize<S: Slot>(&mut self, slot: S) -> Result<bool> {
        (**self).serialize(slot)
    }
}

// --- Sequences ---

macro_rules! impl_sequence {
    ($($container:ident),*) => {
        $(
            impl<T: Serialize + Default> Serialize for $container<T> {
                fn serialize<S: Slot>(&mut self, slot: S) -> Result<bool> {
                    let Some(mut array) = slot.open_array(self.len())? else {
                        return Ok(false);
                    };
                    if <S::Mode as Mode>::IS_LOADING {
                        self.clear();
                        self.resize_with(array.estimated_size(), T::default);
                    }
                    for item in self.iter_mut() {
                        array.serialize_value(item)?;
                    }
                    Ok(true)
                }
            }
        )*
    };
}

impl_sequence!(Vec, VecDeque);

impl<T: Serialize, const N: usize> Serialize for [T; N] {
    fn serialize<S: Slot>(&mut self, slot: S) -> Result<bool> {
        let Some(mut array) = slot.open_array(N)? else {
            return Ok(false);
        };
        let available = fixed_len(&array, N);
        for item in self.iter_mut().take(available) {
            array.serialize_value(item)?;
        }
        Ok(true)
    }
}

macro_rules! impl_tuple {
    ($arity:expr => $($name:ident $index:tt),+) => {
        impl<$($name: Serialize),+> Serialize for ($($name,)+) {
            fn serialize<S: Slot>(&mut self, slot: S) -> Result<bool> {
                let Some(mut array) = slot.open_array($arity)? else {
                    return Ok(false);
                };
                let available = fixed_len(&array, $arity);
                $(
                    if $index < available {
                        array.serialize_value(&mut self.$index)?;
                    }
                )+
                Ok(true)
            }
        }
    };
}

impl_tuple!(1 => A 0);
impl_tuple!(2 => A 0, B 1);
impl_tuple!(3 => A 0, B 1, C 2);
impl_tuple!(4 => A 0, B 1, C 2, D 3);
impl_tuple!(5 => A 0, B 1, C 2, D 3, E 4);
impl_tuple!(6 => A 0, B 1, C 2, D 3, E 4, F 5);
impl_tuple!(7 => A 0, B 1, C 2, D 3, E 4, F 5, G 6);
impl_tuple!(8 => A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7);

// --- Sets ---

trait SetStorage {
    type Item: Serialize + Default + Clone;

    fn len(&self) -> usize;
    fn clear(&mut self);
    fn add(&mut self, item: Self::Item);
    fn snapshot(&self) -> Vec<Self::Item>;
}

impl<T, H> SetStorage for HashSet<T, H>
where
    T: Serialize + Default + Clone + Eq + Hash,
    H: BuildHasher,
{
    type Item = T;

    fn len(&self) -> usize {
        HashSet::len(self)
    }
    fn clear(&mut self) {
        HashSet::clear(self);
    }
    fn add(&mut self, item: T) {
        self.insert(item);
    }
    fn snapshot(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }
}

impl<T> SetStorage for BTreeSet<T>
where
    T: Serialize + Default + Clone + Ord,
{
    type Item = T;

    fn len(&self) -> usize {
        BTreeSet::len(self)
    }
    fn clear(&mut self) {
        BTreeSet::clear(self);
    }
    fn add(&mut self, item: T) {
        self.insert(item);
    }
    fn snapshot(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }
}

fn serialize_set<C: SetStorage, S: Slot>(set: &mut C, slot: S) -> Result<bool> {
    let Some(mut array) = slot.open_array(set.len())? else {
        return Ok(false);
    };
    if <S::Mode as Mode>::IS_LOADING {
        set.clear();
        for _ in 0..array.estimated_size() {
            // Nulls are kept as default elements; skipped values are dropped.
            let null = array.next_is_null();
            let mut item = C::Item::default();
            if array.serialize_value(&mut item)? || null {
                set.add(item);
            }
        }
    } else {
        // Set elements cannot be borrowed mutably in place.
        for mut item in set.snapshot() {
            array.serialize_value(&mut item)?;
        }
    }
    Ok(true)
}

impl<T, H> Serialize for HashSet<T, H>
where
    T: Serialize + Default + Clone + Eq + Hash,
    H: BuildHasher,
{
    fn serialize<S: Slot>(&mut self, slot: S) -> Result<bool> {
        serialize_set(self, slot)
    }
}

impl<T> Serialize for BTreeSet<T>
where
    T: Serialize + Default + Clone + Ord,
{
    fn serialize<S: Slot>(&mut self, slot: S) -> Result<bool> {
        serialize_set(self, slot)
    }
}

// --- Maps ---

trait MapStorage {
    type Key: Serialize + Default + Clone;
    type Value: Serialize + Default;

    fn len(&self) -> usize;
    fn clear(&mut self);
    fn add(&mut self, key: Self::Key, value: Self::Value);
    fn entries_mut(&mut self) -> Box<dyn Iterator<Item = (&Self::Key, &mut Self::Value)> + '_>;
}

impl<K, V, H> MapStorage for HashMap<K, V, H>
where
    K: Serialize + Default + Clone + Eq + Hash,
    V: Serialize + Default,
    H: BuildHasher,
{
    type Key = K;
    type Value = V;

    fn len(&self) -> usize {
        HashMap::len(self)
    }
    fn clear(&mut self) {
        HashMap::clear(self);
    }
    fn add(&mut self, key: K, value: V) {
        self.insert(key, value);
    }
    fn entries_mut(&mut self) -> Box<dyn Iterator<Item = (&K, &mut V)> + '_> {
        Box::new(self.iter_mut())
    }
}

impl<K, V> MapStorage for BTreeMap<K, V>
where
    K: Serialize + Default + Clone + Ord,
    V: Serialize + Default,
{
    type Key = K;
    type Value = V;

    fn len(&self) -> usize {
        BTreeMap::len(self)
    }
    fn clear(&mut self) {
        BTreeMap::clear(self);
    }
    fn add(&mut self, key: K, value: V) {
        self.insert(key, value);
    }
    fn entries_mut(&mut self) -> Box<dyn Iterator<Item = (&K, &mut V)> + '_> {
        Box::new(self.iter_mut())
    }
}

impl<K, V, H> MapStorage for IndexMap<K, V, H>
where
    K: Serialize + Default + Clone + Eq + Hash,
    V: Serialize + Default,
    H: BuildHasher,
{
    type Key = K;
    type Value = V;

    fn len(&self) -> usize {
        IndexMap::len(self)
    }
    fn clear(&mut self) {
        IndexMap::clear(self);
    }
    fn add(&mut self, key: K, value: V) {
        self.insert(key, value);
    }
    fn entries_mut(&mut self) -> Box<dyn Iterator<Item = (&K, &mut V)> + '_> {
        Box::new(self.iter_mut())
    }
}

fn serialize_map<C: MapStorage, S: Slot>(map: &mut C, slot: S) -> Result<bool> {
    if C::Key::IS_MAP_KEY {
        match slot.open_object(map.len())? {
            Some(mut object) => serialize_keyed_map(map, &mut object)?,
            None => return Ok(false),
        }
    } else {
        match slot.open_array(map.len())? {
            Some(mut array) => serialize_pair_map(map, &mut array)?,
            None => return Ok(false),
        }
    }
    Ok(true)
}

fn serialize_keyed_map<C: MapStorage, O: KeyedScope>(map: &mut C, object: &mut O) -> Result<()> {
    if !object.is_loading() {
        for (key, value) in map.entries_mut() {
            match key.to_map_key() {
                Some(name) => {
                    object.serialize_value(&name, value)?;
                }
                None => {
                    let error = ConversionError::MismatchedTypes(format!(
                        "A key of type {} has no object key representation",
                        type_name::<C::Key>()
                    ));
                    let path = object.path();
                    apply_policy(object.context_mut(), path, error)?;
                }
            }
        }
        return Ok(());
    }

    map.clear();
    let mut keys = Vec::with_capacity(object.estimated_size());
    object.visit_keys(|key| keys.push(key.to_owned()));
    for key in keys {
        let Some(parsed) = C::Key::from_map_key(&key) else {
            let error = ConversionError::MismatchedTypes(format!(
                "The key '{key}' cannot be converted to {}",
                type_name::<C::Key>()
            ));
            let path = object.child_path(&key);
            apply_policy(object.context_mut(), path, error)?;
            continue;
        };
        let null = object.holds_null(&key);
        let mut value = C::Value::default();
        if object.serialize_value(&key, &mut value)? || null {
            map.add(parsed, value);
        }
    }
    Ok(())
}

fn serialize_pair_map<C: MapStorage, A: UnkeyedScope>(map: &mut C, array: &mut A) -> Result<()> {
    if !array.is_loading() {
        for (key, value) in map.entries_mut() {
            let mut key = key.clone();
            array.serialize_value(&mut MapEntry {
                key: &mut key,
                value,
            })?;
        }
        return Ok(());
    }

    map.clear();
    for _ in 0..array.estimated_size() {
        let mut key = C::Key::default();
        let mut value = C::Value::default();
        let present = array.serialize_value(&mut MapEntry {
            key: &mut key,
            value: &mut value,
        })?;
        if present {
            map.add(key, value);
        }
    }
    Ok(())
}

impl<K, V, H> Serialize for HashMap<K, V, H>
where
    K: Serialize + Default + Clone + Eq + Hash,
    V: Serialize + Default,
    H: BuildHasher,
{
    fn serialize<S: Slot>(&mut self, slot: S) -> Result<bool> {
        serialize_map(self, slot)
    }
}

impl<K, V> Serialize for BTreeMap<K, V>
where
    K: Serialize + Default + Clone + Ord,
    V: Serialize + Default,
{
    fn serialize<S: Slot>(&mut self, slot: S) -> Result<bool> {
        serialize_map(self, slot)
    }
}

impl<K, V, H> Serialize for IndexMap<K, V, H>
where
    K: Serialize + Default + Clone + Eq + Hash,
    V: Serialize + Default,
    H: BuildHasher,
{
    fn serialize<S: Slot>(&mut self, slot: S) -> Result<bool> {
        serialize_map(self, slot)
    }
}
