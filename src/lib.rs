//! # Bitscope
//!
//! A format-agnostic object serialization framework. User types describe their fields
//! once, and the same traversal both loads and saves them through any supported
//! document format.
//!
//! ## Overview
//!
//! Most serialization libraries split a type's description into a serializer and a
//! deserializer. Bitscope has one traversal per type: a `&mut self` walk over the fields
//! that reads them when driven by a load scope and writes them when driven by a save
//! scope. The direction is a type parameter, so direction-specific operations are
//! checked at compile time.
//!
//! ### Key Features
//!
//! *   **One Traversal:** [`Object::serialize_fields`] works in both directions.
//! *   **Numeric Safety:** narrowing, sign changes and fractional floats never truncate
//!     silently. Each conversion failure is either an error or a recorded skip, as
//!     chosen by [`OverflowNumberPolicy`] and [`MismatchedTypesPolicy`].
//! *   **Path-Keyed Validation:** field validators record their failures under the
//!     field's path (`/users/0/name` for JSON), in a [`SerializationContext`] the caller
//!     inspects afterwards.
//! *   **Pluggable Formats:** a [`Format`] is a node tree plus a codec. [`Json`] and the
//!     native [`Binary`] format ship with the crate.
//! *   **Parallel Batches:** independent documents can be processed on the rayon pool
//!     (feature `parallel`).
//!
//! ## Architecture
//!
//! ```text
//! Archive ──▶ InputArchive / OutputArchive ──▶ RootScope
//!                                                 │
//!                        Serialize::serialize(slot)
//!                                                 │
//!               ┌─────────────────────────────────┼──────────────────────┐
//!           Slot::scalar                   Slot::open_object        Slot::open_array
//!          (convert.rs)                      ObjectScope              ArrayScope
//!                                          (KeyedScope)            (UnkeyedScope)
//! ```
//!
//! - **Archives** ([`archive`]) parse input into a document tree, hand out its root
//!   scope and check the context once the traversal is done.
//! - **Scopes** ([`scope`]) are the only code that touches document nodes. Each scope
//!   references one node and knows its path.
//! - **The dispatcher** ([`serialize`]) picks the storage shape of each Rust type:
//!   scalars, fixed-size arrays, resizable containers, maps and user objects.
//! - **The context** ([`context`]) carries options and collected errors across the call.
//!
//! ## Usage Patterns
//!
//! ### Deriving an object
//!
//! ```rust
//! use bitscope::{BitEnum, BitObject, JsonArchive};
//!
//! #[derive(Debug, Default, PartialEq, BitEnum)]
//! enum Role { #[default] Guest, Admin }
//!
//! #[derive(Debug, Default, PartialEq, BitObject)]
//! struct User {
//!     #[bitscope(required, max_size = 32)]
//!     name: String,
//!     #[bitscope(range(0, 150))]
//!     age: u8,
//!     role: Role,
//!     tags: Vec<String>,
//! }
//!
//! let mut user = User { name: "Ada".into(), age: 36, role: Role::Admin, tags: vec!["math".into()] };
//! let text = JsonArchive::save_string(&mut user)?;
//! assert_eq!(text, r#"{"name":"Ada","age":36,"role":"Admin","tags":["math"]}"#);
//!
//! let mut loaded = User::default();
//! JsonArchive::load_str(&mut loaded, &text)?;
//! assert_eq!(loaded, user);
//! # Ok::<(), bitscope::Error>(())
//! ```
//!
//! ### Collecting errors instead of failing
//!
//! ```rust
//! use bitscope::{
//!     BitObject, JsonArchive, OverflowNumberPolicy, SerializationContext,
//!     SerializationOptions, ValidationPolicy,
//! };
//!
//! #[derive(Default, BitObject)]
//! struct Reading { sensor: u8, level: u8 }
//!
//! let options = SerializationOptions::default()
//!     .with_overflow_number_policy(OverflowNumberPolicy::Skip)
//!     .with_validation_policy(ValidationPolicy::Collect);
//! let mut context = SerializationContext::new(options);
//!
//! let mut reading = Reading::default();
//! JsonArchive::load_str_with(&mut reading, r#"{"sensor": 3, "level": 1000}"#, &mut context)?;
//! assert_eq!(reading.sensor, 3);
//! assert_eq!(reading.level, 0);
//! assert!(context.errors().contains("/level"));
//! # Ok::<(), bitscope::Error>(())
//! ```
//!
//! ### Safety and Error Handling
//!
//! * **No Unsafe:** the crate forbids `unsafe` code.
//! * **No Panics:** No `unwrap()` or `panic!()` calls in the library (enforced by clippy lints).
//! * **Comprehensive Errors:** All failures correspond to an [`Error`] variant with a
//!   stable [`ErrorCode`] and, where it applies, the path of the failing node.

#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![warn(missing_docs)]

// --- PUBLIC API MODULES ---
pub mod archive;
pub mod context;
pub mod convert;
pub mod error;
pub mod format;
pub mod node;
pub mod options;
pub mod scope;
pub mod serialize;
pub mod validate;

#[cfg(feature = "parallel")]
pub mod parallel;

// --- MACRO SUPPORT MODULES ---

/// Runtime utilities used by the derived code.
#[doc(hidden)]
pub mod rt;

// --- RE-EXPORTS ---

pub use archive::{Archive, BinaryArchive, InputArchive, JsonArchive, OutputArchive};
pub use context::{SerializationContext, ValidationErrors};
pub use convert::{ConversionError, EnumTable, Scalar};
pub use error::{Error, ErrorCode, Result};
pub use format::{Binary, Format, Json, TextFormat, TreeNode};
pub use node::{Node, NodeError, NodeKind};
pub use options::{
    FormatOptions, MismatchedTypesPolicy, OverflowNumberPolicy, SerializationOptions,
    StreamOptions, ValidationPolicy,
};
pub use scope::{
    ArrayScope, IndexSlot, KeyedScope, KeyedSlot, Load, Mode, ObjectScope, RootScope, RootSlot,
    Save, Scope, Slot, UnkeyedScope,
};
pub use serialize::{
    KeyValue, Object, PositionalObject, Serialize, serialize_object, serialize_positional,
};
pub use validate::{HasSize, MaxSize, MinSize, Range, Required, Validator};

#[cfg(feature = "parallel")]
pub use parallel::BatchItem;

// Re-export the derive macros so they are accessible as `bitscope::BitObject`
pub use bitscope_derive::{BitEnum, BitObject};
