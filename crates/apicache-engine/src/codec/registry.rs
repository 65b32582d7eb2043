//! Type codec registry.
//!
//! Every value kind JSON cannot express natively is encoded through a
//! [`TypeCodec`] looked up by [`ValueKind`], and decoded through the same
//! codec looked up by its tag. Supporting a new tagged type means
//! registering a codec, not editing the encoder.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use apicache_domain::{Value, ValueKind};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{DateTime, NaiveDate};
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::error::CodecError;

/// Produces the inner `val` payload for a value of the codec's kind.
pub type EncodeFn = fn(&Value) -> Result<JsonValue, CodecError>;

/// Rebuilds a value from the inner `val` payload.
pub type DecodeFn = fn(&JsonValue) -> Result<Value, CodecError>;

/// Encoder/decoder pair for one tagged type.
#[derive(Clone, Copy)]
pub struct TypeCodec {
    pub kind: ValueKind,
    pub tag: &'static str,
    pub encode: EncodeFn,
    pub decode: DecodeFn,
}

impl fmt::Debug for TypeCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeCodec")
            .field("kind", &self.kind)
            .field("tag", &self.tag)
            .finish_non_exhaustive()
    }
}

/// Registry of tagged type codecs.
#[derive(Debug, Clone, Default)]
pub struct CodecRegistry {
    by_kind: HashMap<ValueKind, TypeCodec>,
    by_tag: HashMap<&'static str, TypeCodec>,
}

impl CodecRegistry {
    /// Registry with no tagged types; only JSON-native values encode.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with bytes, decimal, datetime, date and uuid codecs.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        for codec in [BYTES, DECIMAL, DATETIME, DATE, UUID] {
            registry.register(codec);
        }
        registry
    }

    /// Register a codec, replacing any codec with the same kind.
    ///
    /// The replaced codec's tag stays decodable so entries written before
    /// the swap can still be read.
    pub fn register(&mut self, codec: TypeCodec) -> Option<TypeCodec> {
        self.by_tag.insert(codec.tag, codec);
        self.by_kind.insert(codec.kind, codec)
    }

    /// Register a decode-only alias, e.g. a tag used by older entries.
    pub fn register_alias(&mut self, tag: &'static str, decode: DecodeFn, kind: ValueKind) {
        self.by_tag.insert(
            tag,
            TypeCodec {
                kind,
                tag,
                encode: unsupported,
                decode,
            },
        );
    }

    /// Forget a tag entirely, for both directions.
    pub fn unregister(&mut self, tag: &str) -> Option<TypeCodec> {
        let codec = self.by_tag.remove(tag)?;
        if self.by_kind.get(&codec.kind).is_some_and(|c| c.tag == tag) {
            self.by_kind.remove(&codec.kind);
        }
        Some(codec)
    }

    pub fn encoder(&self, kind: ValueKind) -> Option<&TypeCodec> {
        self.by_kind.get(&kind)
    }

    pub fn decoder(&self, tag: &str) -> Option<&TypeCodec> {
        self.by_tag.get(tag)
    }

    pub fn tags(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.by_tag.keys().copied()
    }
}

fn unsupported(value: &Value) -> Result<JsonValue, CodecError> {
    Err(CodecError::Unsupported(value.kind()))
}

fn payload_str<'a>(tag: &str, val: &'a JsonValue) -> Result<&'a str, CodecError> {
    val.as_str().ok_or_else(|| CodecError::InvalidTaggedValue {
        tag: tag.to_string(),
        reason: "expected a string payload".to_string(),
    })
}

fn invalid(tag: &str, err: impl fmt::Display) -> CodecError {
    CodecError::InvalidTaggedValue {
        tag: tag.to_string(),
        reason: err.to_string(),
    }
}

// =============================================================================
// BUILT-IN CODECS
// =============================================================================

pub const BYTES_TAG: &str = "bytes";
pub const DECIMAL_TAG: &str = "decimal";
pub const DATETIME_TAG: &str = "datetime";
pub const DATE_TAG: &str = "date";
pub const UUID_TAG: &str = "uuid";

pub const BYTES: TypeCodec = TypeCodec {
    kind: ValueKind::Bytes,
    tag: BYTES_TAG,
    encode: encode_bytes,
    decode: decode_bytes,
};

pub const DECIMAL: TypeCodec = TypeCodec {
    kind: ValueKind::Decimal,
    tag: DECIMAL_TAG,
    encode: encode_decimal,
    decode: decode_decimal,
};

pub const DATETIME: TypeCodec = TypeCodec {
    kind: ValueKind::DateTime,
    tag: DATETIME_TAG,
    encode: encode_datetime,
    decode: decode_datetime,
};

pub const DATE: TypeCodec = TypeCodec {
    kind: ValueKind::Date,
    tag: DATE_TAG,
    encode: encode_date,
    decode: decode_date,
};

pub const UUID: TypeCodec = TypeCodec {
    kind: ValueKind::Uuid,
    tag: UUID_TAG,
    encode: encode_uuid,
    decode: decode_uuid,
};

fn encode_bytes(value: &Value) -> Result<JsonValue, CodecError> {
    match value {
        Value::Bytes(bytes) => Ok(JsonValue::String(STANDARD.encode(bytes))),
        other => unsupported(other),
    }
}

fn decode_bytes(val: &JsonValue) -> Result<Value, CodecError> {
    STANDARD
        .decode(payload_str(BYTES_TAG, val)?)
        .map(Value::Bytes)
        .map_err(|e| invalid(BYTES_TAG, e))
}

fn encode_decimal(value: &Value) -> Result<JsonValue, CodecError> {
    match value {
        // Display keeps the scale, so 12.50 stays 12.50.
        Value::Decimal(d) => Ok(JsonValue::String(d.to_string())),
        other => unsupported(other),
    }
}

fn decode_decimal(val: &JsonValue) -> Result<Value, CodecError> {
    Decimal::from_str(payload_str(DECIMAL_TAG, val)?)
        .map(Value::Decimal)
        .map_err(|e| invalid(DECIMAL_TAG, e))
}

fn encode_datetime(value: &Value) -> Result<JsonValue, CodecError> {
    match value {
        Value::DateTime(dt) => Ok(JsonValue::String(dt.to_rfc3339())),
        other => unsupported(other),
    }
}

fn decode_datetime(val: &JsonValue) -> Result<Value, CodecError> {
    DateTime::parse_from_rfc3339(payload_str(DATETIME_TAG, val)?)
        .map(Value::DateTime)
        .map_err(|e| invalid(DATETIME_TAG, e))
}

fn encode_date(value: &Value) -> Result<JsonValue, CodecError> {
    match value {
        Value::Date(d) => Ok(JsonValue::String(d.format("%Y-%m-%d").to_string())),
        other => unsupported(other),
    }
}

fn decode_date(val: &JsonValue) -> Result<Value, CodecError> {
    NaiveDate::parse_from_str(payload_str(DATE_TAG, val)?, "%Y-%m-%d")
        .map(Value::Date)
        .map_err(|e| invalid(DATE_TAG, e))
}

fn encode_uuid(value: &Value) -> Result<JsonValue, CodecError> {
    match value {
        Value::Uuid(id) => Ok(JsonValue::String(id.hyphenated().to_string())),
        other => unsupported(other),
    }
}

fn decode_uuid(val: &JsonValue) -> Result<Value, CodecError> {
    Uuid::parse_str(payload_str(UUID_TAG, val)?)
        .map(Value::Uuid)
        .map_err(|e| invalid(UUID_TAG, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_tags() {
        let registry = CodecRegistry::builtin();
        let mut tags: Vec<_> = registry.tags().collect();
        tags.sort_unstable();
        assert_eq!(tags, vec!["bytes", "date", "datetime", "decimal", "uuid"]);
        assert!(registry.encoder(ValueKind::Map).is_none());
    }

    #[test]
    fn test_register_replacement_keeps_old_tag_decodable() {
        fn encode_hex(value: &Value) -> Result<JsonValue, CodecError> {
            match value {
                Value::Bytes(b) => Ok(JsonValue::String(hex::encode(b))),
                other => Err(CodecError::Unsupported(other.kind())),
            }
        }
        fn decode_hex(val: &JsonValue) -> Result<Value, CodecError> {
            let s = val.as_str().unwrap_or_default();
            hex::decode(s)
                .map(Value::Bytes)
                .map_err(|e| invalid("hex", e))
        }

        let mut registry = CodecRegistry::builtin();
        let replaced = registry.register(TypeCodec {
            kind: ValueKind::Bytes,
            tag: "hex",
            encode: encode_hex,
            decode: decode_hex,
        });

        assert_eq!(replaced.map(|c| c.tag), Some(BYTES_TAG));
        assert_eq!(registry.encoder(ValueKind::Bytes).map(|c| c.tag), Some("hex"));
        assert!(registry.decoder(BYTES_TAG).is_some());
    }

    #[test]
    fn test_unregister_removes_both_directions() {
        let mut registry = CodecRegistry::builtin();
        registry.unregister(DECIMAL_TAG);
        assert!(registry.decoder(DECIMAL_TAG).is_none());
        assert!(registry.encoder(ValueKind::Decimal).is_none());
    }

    #[test]
    fn test_bad_payload_is_rejected() {
        let err = (BYTES.decode)(&JsonValue::String("not base64!".into())).unwrap_err();
        assert!(matches!(err, CodecError::InvalidTaggedValue { .. }));

        let err = (DATE.decode)(&JsonValue::Bool(true)).unwrap_err();
        assert!(matches!(err, CodecError::InvalidTaggedValue { .. }));
    }
}
