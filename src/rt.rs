// src/rt.rs

//! Runtime utilities for generated code (macros).
//! Do not use directly.

use crate::error::Result;
use crate::scope::KeyedScope;
use std::collections::HashSet;

pub use crate::convert::{load_enum, save_enum};
pub use crate::serialize::{fixed_len, serialize_object, serialize_positional};

/// Maps a field type to the bound type of a `range(min, max)` attribute.
///
/// Optional fields are range-checked on their inner value.
pub trait Bounded {
    /// Type of `min` and `max`.
    type Bound;
}

macro_rules! impl_bounded {
    ($($t:ty),*) => {
        $( impl Bounded for $t { type Bound = $t; } )*
    };
}

impl_bounded!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64, char);
impl_bounded!(String, chrono::DateTime<chrono::Utc>);

impl<T: Bounded> Bounded for Option<T> {
    type Bound = T::Bound;
}

/// Records an "Unknown field" error for every source key outside `known`.
///
/// Runs on load only; on save the object holds exactly what the traversal wrote.
pub fn reject_unknown_fields<S: KeyedScope>(scope: &mut S, known: &[&str]) -> Result<()> {
    if !scope.is_loading() {
        return Ok(());
    }
    let known: HashSet<&str> = known.iter().copied().collect();
    let mut unknown = Vec::new();
    scope.visit_keys(|key| {
        if !known.contains(key) {
            unknown.push(key.to_owned());
        }
    });
    for key in unknown {
        let path = scope.child_path(&key);
        scope
            .context_mut()
            .record_failures(path, vec!["Unknown field".to_owned()])?;
    }
    Ok(())
}
