//! # API Cache - Domain Model
//!
//! Shared types for the response cache: the lossless [`Value`] model that
//! every cached argument and result passes through, the [`ToValue`] /
//! [`FromValue`] conversion traits, and the identifiers ([`Namespace`],
//! [`FunctionId`], [`CacheKey`]) that cache keys are built from.
//!
//! These types carry no I/O. The engine crate owns the codec, the key
//! deriver and the store.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod convert;
pub mod ident;
pub mod value;

pub use convert::{Bytes, FromValue, MapKey, RecordReader, ToValue};
pub use ident::{CacheKey, FunctionId, Namespace};
pub use value::{RecordBuilder, Value, ValueKind};

// =============================================================================
// ERRORS
// =============================================================================

/// Domain-level errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    #[error("Invalid namespace '{name}': {reason}")]
    InvalidNamespace { name: String, reason: &'static str },

    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: ValueKind,
    },

    #[error("Missing field '{field}' in {record}")]
    MissingField {
        record: &'static str,
        field: String,
    },

    #[error("Value {value} out of range for {target}")]
    OutOfRange { target: &'static str, value: String },

    #[error("Invalid map key '{key}' for {target}")]
    InvalidMapKey { key: String, target: &'static str },

    #[error("Unknown variant '{variant}' for {target}")]
    UnknownVariant {
        variant: String,
        target: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, DomainError>;

/// Implements [`ToValue`] and [`FromValue`] for a fieldless enum, encoding
/// each variant as its underlying string value.
///
/// ```rust
/// use apicache_domain::{value_enum, FromValue, ToValue, Value};
///
/// #[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// enum Role {
///     Admin,
///     Member,
/// }
///
/// value_enum!(Role { Admin => "admin", Member => "member" });
///
/// assert_eq!(Role::Admin.to_value(), Value::from("admin"));
/// assert_eq!(Role::from_value(Value::from("member")).unwrap(), Role::Member);
/// ```
#[macro_export]
macro_rules! value_enum {
    ($ty:ident { $($variant:ident => $repr:literal),+ $(,)? }) => {
        impl $crate::ToValue for $ty {
            fn to_value(&self) -> $crate::Value {
                match self {
                    $(Self::$variant => $crate::Value::String($repr.to_string()),)+
                }
            }
        }

        impl $crate::FromValue for $ty {
            fn from_value(value: $crate::Value) -> $crate::Result<Self> {
                match value {
                    $crate::Value::String(s) => match s.as_str() {
                        $($repr => Ok(Self::$variant),)+
                        _ => Err($crate::DomainError::UnknownVariant {
                            variant: s,
                            target: stringify!($ty),
                        }),
                    },
                    other => Err($crate::DomainError::TypeMismatch {
                        expected: stringify!($ty),
                        found: other.kind(),
                    }),
                }
            }
        }
    };
}

/// Builds a [`FunctionId`] qualified with the calling module path.
///
/// `function_id!(get_user)` inside `crate::routes::users` yields
/// `"crate_name::routes::users::get_user"`.
#[macro_export]
macro_rules! function_id {
    ($name:ident) => {
        $crate::FunctionId::from_static(concat!(module_path!(), "::", stringify!($name)))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Tier {
        Free,
        Pro,
    }

    value_enum!(Tier { Free => "free", Pro => "pro" });

    #[test]
    fn test_value_enum_round_trip() {
        assert_eq!(Tier::Pro.to_value(), Value::from("pro"));
        assert_eq!(Tier::from_value(Value::from("free")).unwrap(), Tier::Free);
    }

    #[test]
    fn test_value_enum_rejects_unknown_variant() {
        let err = Tier::from_value(Value::from("enterprise")).unwrap_err();
        assert!(matches!(err, DomainError::UnknownVariant { .. }));
    }

    #[test]
    fn test_function_id_is_module_qualified() {
        let id = function_id!(read_users);
        assert_eq!(id.as_str(), "apicache_domain::tests::read_users");
    }
}
