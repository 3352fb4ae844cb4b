//! Scalar values and safe numeric conversion.
//!
//! A [`Scalar`] is a value stored in a single node: numbers, booleans, strings,
//! timestamps, registered enums and the unit type (null). Loading a scalar converts
//! whatever numeric kind the document holds into the target type, and reports any
//! loss of information as [`ConversionError::Overflow`] instead of truncating:
//!
//! | Source | Target | Rule |
//! |---|---|---|
//! | integer | integer | exact range check |
//! | float | integer | must be finite, integral and in range |
//! | boolean | integer | `false` is 0, `true` is 1 |
//! | integer or float | `bool` | only 0 and 1 |
//! | integer | float | always accepted (nearest representable value) |
//! | `f64` | `f32` | finite values must lie within `f32` range |
//!
//! Kinds that cannot be converted at all (a string into a number, an array into a
//! string) produce [`ConversionError::MismatchedTypes`]. What happens next is decided by
//! the scope, according to the policies in [`SerializationOptions`](crate::SerializationOptions).

use crate::error::Error;
use crate::node::{Node, NodeKind};
use chrono::{DateTime, Utc};
use std::any::type_name;
use std::fmt;
use std::path::PathBuf;

/// Why a scalar could not be converted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionError {
    /// The value does not fit the target type.
    Overflow(String),
    /// The source kind cannot represent the target type.
    MismatchedTypes(String),
}

impl ConversionError {
    /// Overflow of `value` into `T`.
    pub fn overflow<T: ?Sized>(value: impl fmt::Display) -> Self {
        Self::Overflow(format!(
            "The value {value} does not fit the target type ({})",
            type_name::<T>()
        ))
    }

    /// A node of `kind` loaded into `T`.
    pub fn mismatched<T: ?Sized>(kind: NodeKind) -> Self {
        Self::MismatchedTypes(format!(
            "The type of target field ({}) does not match the value being loaded ({kind})",
            type_name::<T>()
        ))
    }

    /// The human-readable description.
    pub fn message(&self) -> &str {
        match self {
            Self::Overflow(message) | Self::MismatchedTypes(message) => message,
        }
    }

    /// Attaches the path of the node and turns the conversion failure into an [`Error`].
    pub fn into_error(self, path: String) -> Error {
        match self {
            Self::Overflow(message) => Error::Overflow { path, message },
            Self::MismatchedTypes(message) => Error::MismatchedTypes { path, message },
        }
    }
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// A value stored in exactly one node.
pub trait Scalar: Sized {
    /// `true` when a null node is a legitimate value of the type rather than absence.
    const NULLABLE: bool = false;

    /// Reads the value out of `node`.
    fn load_from<N: Node>(node: &N) -> Result<Self, ConversionError>;

    /// Writes the value into `node`, replacing its content.
    fn save_into<N: Node>(&self, node: &mut N) -> Result<(), ConversionError>;
}

/// Loads any integer type, applying the numeric safety rules.
pub(crate) fn load_integer<T, N>(node: &N) -> Result<T, ConversionError>
where
    T: TryFrom<i64> + TryFrom<u64>,
    N: Node,
{
    if let Some(v) = node.as_i64() {
        return <T as TryFrom<i64>>::try_from(v).map_err(|_| ConversionError::overflow::<T>(v));
    }
    if let Some(v) = node.as_u64() {
        return <T as TryFrom<u64>>::try_from(v).map_err(|_| ConversionError::overflow::<T>(v));
    }
    if let Some(v) = node.as_f64() {
        return integer_from_float(v);
    }
    if let Some(v) = node.as_bool() {
        return <T as TryFrom<u64>>::try_from(u64::from(v))
            .map_err(|_| ConversionError::overflow::<T>(v));
    }
    Err(ConversionError::mismatched::<T>(node.kind()))
}

fn integer_from_float<T>(v: f64) -> Result<T, ConversionError>
where
    T: TryFrom<i64> + TryFrom<u64>,
{
    // 2^63 and 2^64 are exact in f64, so the upper bounds are exclusive.
    const I64_LOWER: f64 = i64::MIN as f64;
    const I64_UPPER: f64 = 9_223_372_036_854_775_808.0;
    const U64_UPPER: f64 = 18_446_744_073_709_551_616.0;

    if !v.is_finite() || v.fract() != 0.0 {
        return Err(ConversionError::overflow::<T>(v));
    }
    let converted = if (I64_LOWER..I64_UPPER).contains(&v) {
        <T as TryFrom<i64>>::try_from(v as i64).ok()
    } else if (0.0..U64_UPPER).contains(&v) {
        <T as TryFrom<u64>>::try_from(v as u64).ok()
    } else {
        None
    };
    converted.ok_or_else(|| ConversionError::overflow::<T>(v))
}

/// Loads `f64`; integers are widened.
pub(crate) fn load_f64<N: Node>(node: &N) -> Result<f64, ConversionError> {
    if let Some(v) = node.as_f64() {
        return Ok(v);
    }
    if let Some(v) = node.as_i64() {
        return Ok(v as f64);
    }
    if let Some(v) = node.as_u64() {
        return Ok(v as f64);
    }
    Err(ConversionError::mismatched::<f64>(node.kind()))
}

fn load_f32<N: Node>(node: &N) -> Result<f32, ConversionError> {
    let wide = load_f64(node).map_err(|_| ConversionError::mismatched::<f32>(node.kind()))?;
    if wide.is_finite() && wide.abs() > f64::from(f32::MAX) {
        return Err(ConversionError::overflow::<f32>(wide));
    }
    Ok(wide as f32)
}

macro_rules! impl_signed_scalar {
    ($($t:ty),*) => {
        $(
            impl Scalar for $t {
                fn load_from<N: Node>(node: &N) -> Result<Self, ConversionError> {
                    load_integer(node)
                }

                fn save_into<N: Node>(&self, node: &mut N) -> Result<(), ConversionError> {
                    let value = i64::try_from(*self).map_err(|_| ConversionError::overflow::<i64>(*self))?;
                    node.set_i64(value);
                    Ok(())
                }
            }
        )*
    };
}

macro_rules! impl_unsigned_scalar {
    ($($t:ty),*) => {
        $(
            impl Scalar for $t {
                fn load_from<N: Node>(node: &N) -> Result<Self, ConversionError> {
                    load_integer(node)
                }

                fn save_into<N: Node>(&self, node: &mut N) -> Result<(), ConversionError> {
                    let value = u64::try_from(*self).map_err(|_| ConversionError::overflow::<u64>(*self))?;
                    node.set_u64(value);
                    Ok(())
                }
            }
        )*
    };
}

impl_signed_scalar!(i8, i16, i32, i64, isize);
impl_unsigned_scalar!(u8, u16, u32, u64, usize);

impl Scalar for f64 {
    fn load_from<N: Node>(node: &N) -> Result<Self, ConversionError> {
        load_f64(node)
    }

    fn save_into<N: Node>(&self, node: &mut N) -> Result<(), ConversionError> {
        node.set_f64(*self)
    }
}

impl Scalar for f32 {
    fn load_from<N: Node>(node: &N) -> Result<Self, ConversionError> {
        load_f32(node)
    }

    fn save_into<N: Node>(&self, node: &mut N) -> Result<(), ConversionError> {
        node.set_f64(f64::from(*self))
    }
}

impl Scalar for bool {
    fn load_from<N: Node>(node: &N) -> Result<Self, ConversionError> {
        if let Some(v) = node.as_bool() {
            return Ok(v);
        }
        let number = node.as_i64().map(i128::from).or(node.as_u64().map(i128::from));
        match number {
            Some(0) => return Ok(false),
            Some(1) => return Ok(true),
            Some(other) => return Err(ConversionError::overflow::<bool>(other)),
            None => {}
        }
        match node.as_f64() {
            Some(v) if v == 0.0 => Ok(false),
            Some(v) if v == 1.0 => Ok(true),
            Some(v) => Err(ConversionError::overflow::<bool>(v)),
            None => Err(ConversionError::mismatched::<bool>(node.kind())),
        }
    }

    fn save_into<N: Node>(&self, node: &mut N) -> Result<(), ConversionError> {
        node.set_bool(*self);
        Ok(())
    }
}

impl Scalar for String {
    fn load_from<N: Node>(node: &N) -> Result<Self, ConversionError> {
        node.as_str()
            .map(str::to_owned)
            .ok_or_else(|| ConversionError::mismatched::<String>(node.kind()))
    }

    fn save_into<N: Node>(&self, node: &mut N) -> Result<(), ConversionError> {
        node.set_string(self.clone());
        Ok(())
    }
}

impl Scalar for PathBuf {
    fn load_from<N: Node>(node: &N) -> Result<Self, ConversionError> {
        node.as_str()
            .map(PathBuf::from)
            .ok_or_else(|| ConversionError::mismatched::<PathBuf>(node.kind()))
    }

    fn save_into<N: Node>(&self, node: &mut N) -> Result<(), ConversionError> {
        let text = self.to_str().ok_or_else(|| {
            ConversionError::MismatchedTypes(format!(
                "The path {} is not valid UTF-8",
                self.display()
            ))
        })?;
        node.set_string(text.to_owned());
        Ok(())
    }
}

/// Timestamps load from native timestamp nodes or from RFC 3339 strings.
impl Scalar for DateTime<Utc> {
    fn load_from<N: Node>(node: &N) -> Result<Self, ConversionError> {
        if let Some(ts) = node.as_timestamp() {
            return Ok(ts);
        }
        let text = node
            .as_str()
            .ok_or_else(|| ConversionError::mismatched::<Self>(node.kind()))?;
        DateTime::parse_from_rfc3339(text)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(|e| {
                ConversionError::MismatchedTypes(format!("'{text}' is not an RFC 3339 timestamp: {e}"))
            })
    }

    fn save_into<N: Node>(&self, node: &mut N) -> Result<(), ConversionError> {
        node.set_timestamp(*self);
        Ok(())
    }
}

/// The unit type is the null value.
impl Scalar for () {
    const NULLABLE: bool = true;

    fn load_from<N: Node>(node: &N) -> Result<Self, ConversionError> {
        if node.is_null() {
            Ok(())
        } else {
            Err(ConversionError::mismatched::<()>(node.kind()))
        }
    }

    fn save_into<N: Node>(&self, node: &mut N) -> Result<(), ConversionError> {
        node.set_null();
        Ok(())
    }
}

/// A two-way table between an enum's values and their names.
///
/// Enums are stored as their registered name. Implement it with
/// `#[derive(BitEnum)]`, or with [`register_enum!`](crate::register_enum) to register
/// only some of the values.
pub trait EnumTable: Sized + 'static {
    /// The registered name of the value, if any.
    fn to_name(&self) -> Option<&'static str>;

    /// The value registered under `name`, if any.
    fn from_name(name: &str) -> Option<Self>;
}

/// Loads an enum value from its registered name.
pub fn load_enum<E: EnumTable, N: Node>(node: &N) -> Result<E, ConversionError> {
    let name = node
        .as_str()
        .ok_or_else(|| ConversionError::mismatched::<E>(node.kind()))?;
    E::from_name(name).ok_or_else(|| {
        ConversionError::MismatchedTypes(format!(
            "The value '{name}' is not registered for {}",
            type_name::<E>()
        ))
    })
}

/// Saves an enum value as its registered name.
pub fn save_enum<E: EnumTable, N: Node>(value: &E, node: &mut N) -> Result<(), ConversionError> {
    let name = value.to_name().ok_or_else(|| {
        ConversionError::MismatchedTypes(format!(
            "The value is not registered in the name table of {}",
            type_name::<E>()
        ))
    })?;
    node.set_string(name.to_owned());
    Ok(())
}

/// Registers names for the listed values of a fieldless enum.
///
/// Values left out of the list fail to save with a mismatched-types error.
///
/// ```rust
/// use bitscope::{JsonArchive, register_enum};
///
/// #[derive(Debug, Default, PartialEq)]
/// enum Level { #[default] Low, High, Internal }
///
/// register_enum!(Level { Level::Low => "low", Level::High => "high" });
///
/// let mut level = Level::High;
/// assert_eq!(JsonArchive::save_string(&mut level)?, r#""high""#);
///
/// let mut hidden = Level::Internal;
/// assert!(JsonArchive::save_string(&mut hidden).is_err());
/// # Ok::<(), bitscope::Error>(())
/// ```
#[macro_export]
macro_rules! register_enum {
    ($ty:ty { $($variant:path => $name:literal),* $(,)? }) => {
        impl $crate::EnumTable for $ty {
            fn to_name(&self) -> ::core::option::Option<&'static str> {
                match self {
                    $( $variant => ::core::option::Option::Some($name), )*
                    #[allow(unreachable_patterns)]
                    _ => ::core::option::Option::None,
                }
            }

            fn from_name(name: &str) -> ::core::option::Option<Self> {
                match name {
                    $( $name => ::core::option::Option::Some($variant), )*
                    _ => ::core::option::Option::None,
                }
            }
        }

        impl $crate::Scalar for $ty {
            fn load_from<N: $crate::Node>(
                node: &N,
            ) -> ::core::result::Result<Self, $crate::ConversionError> {
                $crate::rt::load_enum(node)
            }

            fn save_into<N: $crate::Node>(
                &self,
                node: &mut N,
            ) -> ::core::result::Result<(), $crate::ConversionError> {
                $crate::rt::save_enum(self, node)
            }
        }

        impl $crate::Serialize for $ty {
            const IS_MAP_KEY: bool = true;

            fn serialize<S: $crate::Slot>(&mut self, slot: S) -> $crate::Result<bool> {
                $crate::Slot::scalar(slot, self)
            }

            fn to_map_key(&self) -> ::core::option::Option<::std::string::String> {
                $crate::EnumTable::to_name(self).map(::std::borrow::ToOwned::to_owned)
            }

            fn from_map_key(key: &str) -> ::core::option::Option<Self> {
                <Self as $crate::EnumTable>::from_name(key)
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::TreeNode;

    fn load<T: Scalar>(node: TreeNode) -> Result<T, ConversionError> {
        T::load_from(&node)
    }

    #[test]
    fn test_integer_narrowing() {
        assert_eq!(load::<i8>(TreeNode::Int(127)), Ok(127));
        assert!(matches!(load::<i8>(TreeNode::Int(128)), Err(ConversionError::Overflow(_))));
        assert!(matches!(
            load::<i8>(TreeNode::Int(i64::MAX)),
            Err(ConversionError::Overflow(_))
        ));
        assert!(matches!(load::<u32>(TreeNode::Int(-1)), Err(ConversionError::Overflow(_))));
        assert_eq!(load::<u64>(TreeNode::UInt(u64::MAX)), Ok(u64::MAX));
        assert!(matches!(
            load::<i64>(TreeNode::UInt(u64::MAX)),
            Err(ConversionError::Overflow(_))
        ));
    }

    #[test]
    fn test_float_into_integer() {
        assert_eq!(load::<i32>(TreeNode::Float(42.0)), Ok(42));
        assert!(matches!(load::<i32>(TreeNode::Float(3.25)), Err(ConversionError::Overflow(_))));
        assert!(matches!(load::<u8>(TreeNode::Float(-1.0)), Err(ConversionError::Overflow(_))));
        assert!(matches!(
            load::<i64>(TreeNode::Float(f64::INFINITY)),
            Err(ConversionError::Overflow(_))
        ));
        assert!(matches!(load::<i64>(TreeNode::Float(1e19)), Err(ConversionError::Overflow(_))));
        assert_eq!(load::<u64>(TreeNode::Float(1e19)), Ok(10_000_000_000_000_000_000));
    }

    #[test]
    fn test_bool_accepts_only_zero_and_one() {
        assert_eq!(load::<bool>(TreeNode::Int(0)), Ok(false));
        assert_eq!(load::<bool>(TreeNode::UInt(1)), Ok(true));
        assert!(matches!(load::<bool>(TreeNode::Int(2)), Err(ConversionError::Overflow(_))));
        assert_eq!(load::<bool>(TreeNode::Float(1.0)), Ok(true));
        assert_eq!(load::<bool>(TreeNode::Float(-0.0)), Ok(false));
        assert!(matches!(load::<bool>(TreeNode::Float(0.5)), Err(ConversionError::Overflow(_))));
        assert!(matches!(
            load::<bool>(TreeNode::Float(f64::NAN)),
            Err(ConversionError::Overflow(_))
        ));
        assert!(matches!(
            load::<bool>(TreeNode::String("1".into())),
            Err(ConversionError::MismatchedTypes(_))
        ));
        assert_eq!(load::<u8>(TreeNode::Bool(true)), Ok(1));
    }

    #[test]
    fn test_f32_range() {
        assert_eq!(load::<f32>(TreeNode::Float(1.5)), Ok(1.5));
        assert_eq!(load::<f32>(TreeNode::Int(-3)), Ok(-3.0));
        assert!(matches!(load::<f32>(TreeNode::Float(1e300)), Err(ConversionError::Overflow(_))));
        assert!(load::<f32>(TreeNode::Float(f64::NAN)).is_ok_and(f32::is_nan));
    }

    #[test]
    fn test_kind_mismatches() {
        assert!(matches!(
            load::<i32>(TreeNode::String("1".into())),
            Err(ConversionError::MismatchedTypes(_))
        ));
        assert!(matches!(
            load::<String>(TreeNode::Int(1)),
            Err(ConversionError::MismatchedTypes(_))
        ));
        assert!(matches!(
            load::<f64>(TreeNode::Array(Vec::new())),
            Err(ConversionError::MismatchedTypes(_))
        ));
    }

    #[test]
    fn test_timestamp_from_text() {
        let ts = load::<DateTime<Utc>>(TreeNode::String("2024-03-01T12:00:00Z".into()));
        assert_eq!(ts.map(|t| t.timestamp()), Ok(1_709_294_400));
        assert!(matches!(
            load::<DateTime<Utc>>(TreeNode::String("yesterday".into())),
            Err(ConversionError::MismatchedTypes(_))
        ));
    }
}
