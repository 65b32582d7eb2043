//! Lossless value model.
//!
//! [`Value`] is a superset of JSON: on top of the JSON primitives it keeps
//! byte strings, decimals, offset-aware date-times, dates and UUIDs as
//! distinct variants so they survive a round trip through the cache.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::convert::ToValue;

/// A structured value that can be cached without information loss.
///
/// Maps are ordered so two equal values always encode to identical text.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    /// Only used for integers above `i64::MAX`.
    UInt(u64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    Decimal(Decimal),
    DateTime(DateTime<FixedOffset>),
    Date(NaiveDate),
    Uuid(Uuid),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

/// Discriminant of a [`Value`], used as the codec registry key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Null,
    Bool,
    Int,
    UInt,
    Float,
    String,
    Bytes,
    Decimal,
    DateTime,
    Date,
    Uuid,
    List,
    Map,
}

impl ValueKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::UInt => "uint",
            Self::Float => "float",
            Self::String => "string",
            Self::Bytes => "bytes",
            Self::Decimal => "decimal",
            Self::DateTime => "datetime",
            Self::Date => "date",
            Self::Uuid => "uuid",
            Self::List => "list",
            Self::Map => "map",
        }
    }

    /// Whether JSON can carry this kind without a tagged envelope.
    pub const fn is_json_native(self) -> bool {
        matches!(
            self,
            Self::Null
                | Self::Bool
                | Self::Int
                | Self::UInt
                | Self::Float
                | Self::String
                | Self::List
                | Self::Map
        )
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Value {
    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::Null => ValueKind::Null,
            Self::Bool(_) => ValueKind::Bool,
            Self::Int(_) => ValueKind::Int,
            Self::UInt(_) => ValueKind::UInt,
            Self::Float(_) => ValueKind::Float,
            Self::String(_) => ValueKind::String,
            Self::Bytes(_) => ValueKind::Bytes,
            Self::Decimal(_) => ValueKind::Decimal,
            Self::DateTime(_) => ValueKind::DateTime,
            Self::Date(_) => ValueKind::Date,
            Self::Uuid(_) => ValueKind::Uuid,
            Self::List(_) => ValueKind::List,
            Self::Map(_) => ValueKind::Map,
        }
    }

    /// Start building a record value field by field.
    pub fn record() -> RecordBuilder {
        RecordBuilder::default()
    }

    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Look up a field of a map value.
    pub fn get(&self, field: &str) -> Option<&Self> {
        match self {
            Self::Map(map) => map.get(field),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<Vec<Self>> for Value {
    fn from(items: Vec<Self>) -> Self {
        Self::List(items)
    }
}

impl From<BTreeMap<String, Self>> for Value {
    fn from(map: BTreeMap<String, Self>) -> Self {
        Self::Map(map)
    }
}

// =============================================================================
// RECORD BUILDER
// =============================================================================

/// Builds the map representation of a structured record.
#[derive(Debug, Default)]
pub struct RecordBuilder {
    fields: BTreeMap<String, Value>,
}

impl RecordBuilder {
    #[must_use]
    pub fn field<T: ToValue + ?Sized>(mut self, name: impl Into<String>, value: &T) -> Self {
        self.fields.insert(name.into(), value.to_value());
        self
    }

    pub fn build(self) -> Value {
        Value::Map(self.fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_builder_orders_fields() {
        let value = Value::record()
            .field("zeta", &1_i64)
            .field("alpha", "a")
            .build();

        let Value::Map(map) = &value else {
            panic!("expected map");
        };
        let keys: Vec<&str> = map.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["alpha", "zeta"]);
        assert_eq!(value.get("alpha").and_then(Value::as_str), Some("a"));
    }

    #[test]
    fn test_native_kinds() {
        assert!(ValueKind::Map.is_json_native());
        assert!(!ValueKind::Bytes.is_json_native());
        assert!(!ValueKind::DateTime.is_json_native());
        assert_eq!(Value::Decimal(Decimal::ONE).kind(), ValueKind::Decimal);
    }
}
