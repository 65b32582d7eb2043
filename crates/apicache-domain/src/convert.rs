//! Conversions between Rust types and [`Value`].

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::hash::{BuildHasher, Hash};
use std::ops::Deref;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::value::Value;
use crate::{DomainError, Result};

/// Converts a Rust value into the cacheable [`Value`] model.
///
/// Types without an implementation cannot be passed to the cache at all,
/// so unsupported types are rejected at compile time.
pub trait ToValue {
    fn to_value(&self) -> Value;
}

/// Reconstructs a Rust value from a decoded [`Value`].
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self>;

    /// Value used when a record field is absent.
    fn from_missing() -> Option<Self> {
        None
    }
}

/// Map key types that coerce to and from strings.
pub trait MapKey: Sized {
    fn to_key(&self) -> String;
    fn from_key(key: &str) -> Option<Self>;
}

const fn mismatch(expected: &'static str, found: &Value) -> DomainError {
    DomainError::TypeMismatch {
        expected,
        found: found.kind(),
    }
}

// =============================================================================
// BYTE SEQUENCES
// =============================================================================

/// Raw byte sequence, kept distinct from a list of small integers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Bytes(pub Vec<u8>);

impl Bytes {
    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }
}

impl Deref for Bytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for Bytes {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl ToValue for Bytes {
    fn to_value(&self) -> Value {
        Value::Bytes(self.0.clone())
    }
}

impl FromValue for Bytes {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Bytes(bytes) => Ok(Self(bytes)),
            other => Err(mismatch("bytes", &other)),
        }
    }
}

// =============================================================================
// PRIMITIVES
// =============================================================================

impl ToValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self> {
        Ok(value)
    }
}

impl<T: ToValue + ?Sized> ToValue for &T {
    fn to_value(&self) -> Value {
        (**self).to_value()
    }
}

impl ToValue for () {
    fn to_value(&self) -> Value {
        Value::Null
    }
}

impl FromValue for () {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(()),
            other => Err(mismatch("unit", &other)),
        }
    }
}

impl ToValue for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Bool(v) => Ok(v),
            other => Err(mismatch("bool", &other)),
        }
    }
}

impl ToValue for str {
    fn to_value(&self) -> Value {
        Value::String(self.to_string())
    }
}

impl ToValue for String {
    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::String(s) => Ok(s),
            other => Err(mismatch("string", &other)),
        }
    }
}

macro_rules! int_value {
    ($($ty:ty),+) => {
        $(
            impl ToValue for $ty {
                fn to_value(&self) -> Value {
                    i64::try_from(*self).map_or_else(
                        |_| u64::try_from(*self).map_or(Value::Null, Value::UInt),
                        Value::Int,
                    )
                }
            }

            impl FromValue for $ty {
                fn from_value(value: Value) -> Result<Self> {
                    let out_of_range = |v: String| DomainError::OutOfRange {
                        target: stringify!($ty),
                        value: v,
                    };
                    match value {
                        Value::Int(v) => <$ty>::try_from(v).map_err(|_| out_of_range(v.to_string())),
                        Value::UInt(v) => <$ty>::try_from(v).map_err(|_| out_of_range(v.to_string())),
                        other => Err(mismatch(stringify!($ty), &other)),
                    }
                }
            }
        )+
    };
}

int_value!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl ToValue for f64 {
    fn to_value(&self) -> Value {
        Value::Float(*self)
    }
}

impl ToValue for f32 {
    fn to_value(&self) -> Value {
        Value::Float(f64::from(*self))
    }
}

#[allow(clippy::cast_precision_loss)]
impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Float(v) => Ok(v),
            Value::Int(v) => Ok(v as Self),
            Value::UInt(v) => Ok(v as Self),
            other => Err(mismatch("f64", &other)),
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
impl FromValue for f32 {
    fn from_value(value: Value) -> Result<Self> {
        f64::from_value(value).map(|v| v as Self)
    }
}

// =============================================================================
// TAGGED SCALARS
// =============================================================================

impl ToValue for Decimal {
    fn to_value(&self) -> Value {
        Value::Decimal(*self)
    }
}

impl FromValue for Decimal {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Decimal(v) => Ok(v),
            other => Err(mismatch("decimal", &other)),
        }
    }
}

impl ToValue for DateTime<FixedOffset> {
    fn to_value(&self) -> Value {
        Value::DateTime(*self)
    }
}

impl FromValue for DateTime<FixedOffset> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::DateTime(v) => Ok(v),
            other => Err(mismatch("datetime", &other)),
        }
    }
}

impl ToValue for DateTime<Utc> {
    fn to_value(&self) -> Value {
        Value::DateTime(self.fixed_offset())
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: Value) -> Result<Self> {
        DateTime::<FixedOffset>::from_value(value).map(|v| v.with_timezone(&Utc))
    }
}

impl ToValue for NaiveDate {
    fn to_value(&self) -> Value {
        Value::Date(*self)
    }
}

impl FromValue for NaiveDate {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Date(v) => Ok(v),
            other => Err(mismatch("date", &other)),
        }
    }
}

impl ToValue for Uuid {
    fn to_value(&self) -> Value {
        Value::Uuid(*self)
    }
}

impl FromValue for Uuid {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Uuid(v) => Ok(v),
            other => Err(mismatch("uuid", &other)),
        }
    }
}

// =============================================================================
// CONTAINERS
// =============================================================================

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::Null, ToValue::to_value)
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }

    fn from_missing() -> Option<Self> {
        Some(None)
    }
}

impl<T: ToValue> ToValue for [T] {
    fn to_value(&self) -> Value {
        Value::List(self.iter().map(ToValue::to_value).collect())
    }
}

impl<T: ToValue> ToValue for Vec<T> {
    fn to_value(&self) -> Value {
        self.as_slice().to_value()
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::List(items) => items.into_iter().map(T::from_value).collect(),
            other => Err(mismatch("list", &other)),
        }
    }
}

impl<T: ToValue> ToValue for BTreeSet<T> {
    fn to_value(&self) -> Value {
        Value::List(self.iter().map(ToValue::to_value).collect())
    }
}

impl<T: FromValue + Ord> FromValue for BTreeSet<T> {
    fn from_value(value: Value) -> Result<Self> {
        Vec::<T>::from_value(value).map(|items| items.into_iter().collect())
    }
}

impl<K: MapKey, V: ToValue> ToValue for BTreeMap<K, V> {
    fn to_value(&self) -> Value {
        Value::Map(
            self.iter()
                .map(|(k, v)| (k.to_key(), v.to_value()))
                .collect(),
        )
    }
}

impl<K: MapKey + Ord, V: FromValue> FromValue for BTreeMap<K, V> {
    fn from_value(value: Value) -> Result<Self> {
        Ok(entries_from_value::<K, V>(value, "BTreeMap")?
            .into_iter()
            .collect())
    }
}

impl<K: MapKey, V: ToValue, S: BuildHasher> ToValue for HashMap<K, V, S> {
    fn to_value(&self) -> Value {
        // Collected into a BTreeMap so iteration order never leaks into the output.
        Value::Map(
            self.iter()
                .map(|(k, v)| (k.to_key(), v.to_value()))
                .collect(),
        )
    }
}

impl<K: MapKey + Eq + Hash, V: FromValue, S: BuildHasher + Default> FromValue
    for HashMap<K, V, S>
{
    fn from_value(value: Value) -> Result<Self> {
        Ok(entries_from_value::<K, V>(value, "HashMap")?
            .into_iter()
            .collect())
    }
}

fn entries_from_value<K: MapKey, V: FromValue>(
    value: Value,
    target: &'static str,
) -> Result<Vec<(K, V)>> {
    let Value::Map(map) = value else {
        return Err(mismatch(target, &value));
    };
    map.into_iter()
        .map(|(key, v)| {
            let k = K::from_key(&key).ok_or(DomainError::InvalidMapKey { key, target })?;
            Ok((k, V::from_value(v)?))
        })
        .collect()
}

// =============================================================================
// MAP KEYS
// =============================================================================

impl MapKey for String {
    fn to_key(&self) -> String {
        self.clone()
    }

    fn from_key(key: &str) -> Option<Self> {
        Some(key.to_string())
    }
}

macro_rules! parsed_map_key {
    ($($ty:ty),+) => {
        $(
            impl MapKey for $ty {
                fn to_key(&self) -> String {
                    self.to_string()
                }

                fn from_key(key: &str) -> Option<Self> {
                    key.parse().ok()
                }
            }
        )+
    };
}

parsed_map_key!(i32, i64, u32, u64, bool, Uuid);

// =============================================================================
// RECORD READER
// =============================================================================

/// Pulls typed fields back out of a record's map representation.
pub struct RecordReader {
    record: &'static str,
    fields: BTreeMap<String, Value>,
}

impl RecordReader {
    pub fn new(record: &'static str, value: Value) -> Result<Self> {
        match value {
            Value::Map(fields) => Ok(Self { record, fields }),
            other => Err(mismatch(record, &other)),
        }
    }

    /// Take a field, falling back to [`FromValue::from_missing`] when absent.
    pub fn take<T: FromValue>(&mut self, field: &str) -> Result<T> {
        match self.fields.remove(field) {
            Some(value) => T::from_value(value),
            None => T::from_missing().ok_or_else(|| DomainError::MissingField {
                record: self.record,
                field: field.to_string(),
            }),
        }
    }
}
