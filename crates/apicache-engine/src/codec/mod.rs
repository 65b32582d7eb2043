//! # Value Codec
//!
//! Lossless text encoding of [`Value`]s for storage in the cache.
//!
//! JSON-native values encode as plain JSON. Everything else is wrapped in a
//! tagged envelope produced by a registered [`TypeCodec`]:
//!
//! ```text
//! {"_spec_type": "bytes", "val": "AAE="}
//! ```
//!
//! Decoding dispatches every object that carries `_spec_type` to the codec
//! registered for that tag and fails with [`CodecError::UnknownTag`] when
//! there is none. A map whose own keys include `_spec_type` is escaped in a
//! `map` envelope so user data can never be mistaken for an envelope.

pub mod registry;

use std::collections::BTreeMap;
use std::sync::Arc;

use apicache_domain::{FromValue, ToValue, Value};
use serde_json::{Map as JsonMap, Number, Value as JsonValue};

use crate::error::CodecError;

pub use registry::{CodecRegistry, DecodeFn, EncodeFn, TypeCodec};

/// Envelope field holding the type tag.
pub const TYPE_TAG_FIELD: &str = "_spec_type";

/// Envelope field holding the encoded inner value.
pub const VALUE_FIELD: &str = "val";

/// Tag of the escape envelope for maps containing [`TYPE_TAG_FIELD`].
pub const MAP_ESCAPE_TAG: &str = "map";

pub const DEFAULT_MAX_DEPTH: usize = 10;

pub const DEFAULT_INTERNAL_PREFIX: &str = "__";

/// Codec behaviour switches
#[derive(Debug, Clone)]
pub struct CodecOptions {
    /// Values nested deeper than this many levels encode as `null`, or fail
    /// through [`Codec::encode_exact`].
    pub max_depth: usize,

    /// Drop map entries whose key starts with `internal_prefix`.
    pub storage_safe: bool,

    /// Prefix marking internal bookkeeping fields of records.
    pub internal_prefix: String,
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            storage_safe: true,
            internal_prefix: DEFAULT_INTERNAL_PREFIX.to_string(),
        }
    }
}

/// Registry-driven encoder/decoder, cheap to clone.
#[derive(Debug, Clone)]
pub struct Codec {
    options: CodecOptions,
    registry: Arc<CodecRegistry>,
}

impl Default for Codec {
    fn default() -> Self {
        Self::new(CodecOptions::default())
    }
}

impl Codec {
    /// Codec with the built-in tagged types.
    pub fn new(options: CodecOptions) -> Self {
        Self::with_registry(options, CodecRegistry::builtin())
    }

    pub fn with_registry(options: CodecOptions, registry: CodecRegistry) -> Self {
        Self {
            options,
            registry: Arc::new(registry),
        }
    }

    pub const fn options(&self) -> &CodecOptions {
        &self.options
    }

    pub fn registry(&self) -> &CodecRegistry {
        &self.registry
    }

    /// Codec sharing this one's registry under different options.
    #[must_use]
    pub fn with_options(&self, options: CodecOptions) -> Self {
        Self {
            options,
            registry: Arc::clone(&self.registry),
        }
    }

    /// Encode a value to JSON text. Subtrees past `max_depth` become `null`.
    pub fn encode(&self, value: &Value) -> Result<String, CodecError> {
        let json = self.to_json(value, 1, false)?;
        Ok(serde_json::to_string(&json)?)
    }

    /// Encode a value to JSON text, failing with
    /// [`CodecError::DepthExceeded`] instead of dropping deep subtrees.
    pub fn encode_exact(&self, value: &Value) -> Result<String, CodecError> {
        let json = self.to_json(value, 1, true)?;
        Ok(serde_json::to_string(&json)?)
    }

    /// Encode any convertible value to JSON text.
    pub fn encode_value<T: ToValue + ?Sized>(&self, value: &T) -> Result<String, CodecError> {
        self.encode(&value.to_value())
    }

    /// Decode JSON text, reconstructing every tagged envelope.
    pub fn decode(&self, text: &str) -> Result<Value, CodecError> {
        let json: JsonValue = serde_json::from_str(text)?;
        self.json_to_value(json)
    }

    /// Decode JSON text straight into a typed value.
    pub fn decode_value<T: FromValue>(&self, text: &str) -> Result<T, CodecError> {
        Ok(T::from_value(self.decode(text)?)?)
    }

    fn to_json(&self, value: &Value, depth: usize, exact: bool) -> Result<JsonValue, CodecError> {
        if depth > self.options.max_depth {
            if exact {
                return Err(CodecError::DepthExceeded(self.options.max_depth));
            }
            return Ok(JsonValue::Null);
        }

        let json = match value {
            Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Int(i) => JsonValue::Number(Number::from(*i)),
            Value::UInt(u) => JsonValue::Number(Number::from(*u)),
            Value::Float(f) => {
                JsonValue::Number(Number::from_f64(*f).ok_or(CodecError::NonFiniteFloat(*f))?)
            }
            Value::String(s) => JsonValue::String(s.clone()),
            Value::List(items) => JsonValue::Array(
                items
                    .iter()
                    .map(|item| self.to_json(item, depth + 1, exact))
                    .collect::<Result<_, _>>()?,
            ),
            Value::Map(map) => self.map_to_json(map, depth, exact)?,
            tagged => {
                let codec = self
                    .registry
                    .encoder(tagged.kind())
                    .ok_or(CodecError::Unsupported(tagged.kind()))?;
                envelope(codec.tag, (codec.encode)(tagged)?)
            }
        };
        Ok(json)
    }

    fn map_to_json(
        &self,
        map: &BTreeMap<String, Value>,
        depth: usize,
        exact: bool,
    ) -> Result<JsonValue, CodecError> {
        let mut object = JsonMap::new();
        for (key, value) in map {
            if self.options.storage_safe && key.starts_with(&self.options.internal_prefix) {
                continue;
            }
            object.insert(key.clone(), self.to_json(value, depth + 1, exact)?);
        }

        if object.contains_key(TYPE_TAG_FIELD) {
            return Ok(envelope(MAP_ESCAPE_TAG, JsonValue::Object(object)));
        }
        Ok(JsonValue::Object(object))
    }

    fn json_to_value(&self, json: JsonValue) -> Result<Value, CodecError> {
        let value = match json {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(b),
            JsonValue::Number(n) => number_to_value(&n)?,
            JsonValue::String(s) => Value::String(s),
            JsonValue::Array(items) => Value::List(
                items
                    .into_iter()
                    .map(|item| self.json_to_value(item))
                    .collect::<Result<_, _>>()?,
            ),
            JsonValue::Object(object) if object.contains_key(TYPE_TAG_FIELD) => {
                self.envelope_to_value(object)?
            }
            JsonValue::Object(object) => self.object_to_value(object)?,
        };
        Ok(value)
    }

    fn envelope_to_value(&self, mut object: JsonMap<String, JsonValue>) -> Result<Value, CodecError> {
        if object.len() != 2 {
            return Err(CodecError::MalformedEnvelope(format!(
                "expected exactly '{TYPE_TAG_FIELD}' and '{VALUE_FIELD}', found {} fields",
                object.len()
            )));
        }
        let tag = match object.remove(TYPE_TAG_FIELD) {
            Some(JsonValue::String(tag)) => tag,
            _ => {
                return Err(CodecError::MalformedEnvelope(format!(
                    "'{TYPE_TAG_FIELD}' must be a string"
                )));
            }
        };
        let val = object
            .remove(VALUE_FIELD)
            .ok_or_else(|| CodecError::MalformedEnvelope(format!("missing '{VALUE_FIELD}'")))?;

        if tag == MAP_ESCAPE_TAG {
            return match val {
                JsonValue::Object(inner) => self.object_to_value(inner),
                _ => Err(CodecError::MalformedEnvelope(
                    "escaped map payload must be an object".to_string(),
                )),
            };
        }

        let codec = self
            .registry
            .decoder(&tag)
            .ok_or_else(|| CodecError::UnknownTag(tag.clone()))?;
        (codec.decode)(&val)
    }

    fn object_to_value(&self, object: JsonMap<String, JsonValue>) -> Result<Value, CodecError> {
        object
            .into_iter()
            .map(|(key, value)| Ok((key, self.json_to_value(value)?)))
            .collect::<Result<BTreeMap<_, _>, CodecError>>()
            .map(Value::Map)
    }
}

fn envelope(tag: &str, val: JsonValue) -> JsonValue {
    let mut object = JsonMap::new();
    object.insert(TYPE_TAG_FIELD.to_string(), JsonValue::String(tag.to_string()));
    object.insert(VALUE_FIELD.to_string(), val);
    JsonValue::Object(object)
}

fn number_to_value(n: &Number) -> Result<Value, CodecError> {
    if let Some(i) = n.as_i64() {
        Ok(Value::Int(i))
    } else if let Some(u) = n.as_u64() {
        Ok(Value::UInt(u))
    } else {
        n.as_f64()
            .map(Value::Float)
            .ok_or_else(|| CodecError::MalformedEnvelope(format!("unrepresentable number {n}")))
    }
}

/// Encode with the default codec.
pub fn encode(value: &Value) -> Result<String, CodecError> {
    Codec::default().encode(value)
}

/// Decode with the default codec.
pub fn decode(text: &str) -> Result<Value, CodecError> {
    Codec::default().decode(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use apicache_domain::{Bytes, RecordReader, ValueKind};
    use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Timelike};
    use rust_decimal::Decimal;
    use std::collections::HashMap;
    use std::str::FromStr;
    use uuid::Uuid;

    #[derive(Debug, Clone, PartialEq)]
    struct Order {
        id: Uuid,
        placed_at: DateTime<FixedOffset>,
        ship_on: NaiveDate,
        amount: Decimal,
        signature: Bytes,
        lines: Vec<OrderLine>,
        tags: HashMap<String, i64>,
    }

    #[derive(Debug, Clone, PartialEq)]
    struct OrderLine {
        sku: String,
        quantity: u32,
        unit_price: Decimal,
        discount: Option<f64>,
    }

    impl ToValue for Order {
        fn to_value(&self) -> Value {
            Value::record()
                .field("id", &self.id)
                .field("placed_at", &self.placed_at)
                .field("ship_on", &self.ship_on)
                .field("amount", &self.amount)
                .field("signature", &self.signature)
                .field("lines", &self.lines)
                .field("tags", &self.tags)
                .build()
        }
    }

    impl FromValue for Order {
        fn from_value(value: Value) -> apicache_domain::Result<Self> {
            let mut r = RecordReader::new("Order", value)?;
            Ok(Self {
                id: r.take("id")?,
                placed_at: r.take("placed_at")?,
                ship_on: r.take("ship_on")?,
                amount: r.take("amount")?,
                signature: r.take("signature")?,
                lines: r.take("lines")?,
                tags: r.take("tags")?,
            })
        }
    }

    impl ToValue for OrderLine {
        fn to_value(&self) -> Value {
            Value::record()
                .field("sku", &self.sku)
                .field("quantity", &self.quantity)
                .field("unit_price", &self.unit_price)
                .field("discount", &self.discount)
                .build()
        }
    }

    impl FromValue for OrderLine {
        fn from_value(value: Value) -> apicache_domain::Result<Self> {
            let mut r = RecordReader::new("OrderLine", value)?;
            Ok(Self {
                sku: r.take("sku")?,
                quantity: r.take("quantity")?,
                unit_price: r.take("unit_price")?,
                discount: r.take("discount")?,
            })
        }
    }

    fn sample_order() -> Order {
        let offset = FixedOffset::east_opt(5 * 3600 + 1800).unwrap();
        Order {
            id: Uuid::from_u128(0x1234_5678_9abc_def0_1234_5678_9abc_def0),
            placed_at: offset
                .with_ymd_and_hms(2024, 2, 29, 23, 59, 58)
                .unwrap()
                .with_nanosecond(123_456_789)
                .unwrap(),
            ship_on: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            amount: Decimal::from_str("1049.50").unwrap(),
            signature: Bytes(vec![0xde, 0xad, 0xbe, 0xef, 0x00]),
            lines: vec![
                OrderLine {
                    sku: "KB-01".to_string(),
                    quantity: 2,
                    unit_price: Decimal::from_str("499.75").unwrap(),
                    discount: Some(0.1),
                },
                OrderLine {
                    sku: "CBL-9".to_string(),
                    quantity: 1,
                    unit_price: Decimal::from_str("50.000").unwrap(),
                    discount: None,
                },
            ],
            tags: HashMap::from([("priority".to_string(), 1), ("gift".to_string(), 0)]),
        }
    }


    #[test]
    fn test_bytes_envelope() {
        let text = encode(&Bytes(vec![0x00, 0x01]).to_value()).unwrap();
        assert_eq!(text, r#"{"_spec_type":"bytes","val":"AAE="}"#);

        let back = decode(&text).unwrap();
        assert_eq!(back, Value::Bytes(vec![0x00, 0x01]));
    }

    #[test]
    fn test_nested_record_round_trip() {
        let codec = Codec::default();
        let order = sample_order();

        let text = codec.encode_value(&order).unwrap();
        let back: Order = codec.decode_value(&text).unwrap();

        assert_eq!(back, order);
        // Offset and decimal scale survive, not just the instant and amount.
        assert_eq!(back.placed_at.offset(), order.placed_at.offset());
        assert_eq!(back.lines[1].unit_price.to_string(), "50.000");
    }

    #[test]
    fn test_scalars_round_trip() {
        let codec = Codec::default();
        let values = vec![
            Value::Null,
            Value::Bool(true),
            Value::Int(-17),
            Value::UInt(u64::MAX),
            Value::Float(2.5),
            Value::Float(3.0),
            Value::String("plain".to_string()),
            Value::Date(NaiveDate::from_ymd_opt(1999, 12, 31).unwrap()),
        ];
        for value in values {
            let text = codec.encode(&value).unwrap();
            assert_eq!(codec.decode(&text).unwrap(), value, "round trip of {text}");
        }
    }

    #[test]
    fn test_unknown_tag_fails() {
        let err = decode(r#"{"_spec_type":"complex","val":"1+2j"}"#).unwrap_err();
        assert!(matches!(err, CodecError::UnknownTag(ref tag) if tag == "complex"));
    }

    #[test]
    fn test_unregistered_kind_fails_on_encode() {
        let mut registry = CodecRegistry::builtin();
        registry.unregister(registry::DECIMAL_TAG);
        let codec = Codec::with_registry(CodecOptions::default(), registry);

        let err = codec.encode(&Value::Decimal(Decimal::ONE)).unwrap_err();
        assert!(matches!(err, CodecError::Unsupported(ValueKind::Decimal)));

        let err = codec
            .decode(r#"{"_spec_type":"decimal","val":"1"}"#)
            .unwrap_err();
        assert!(matches!(err, CodecError::UnknownTag(_)));
    }

    #[test]
    fn test_malformed_envelopes() {
        assert!(matches!(
            decode(r#"{"_spec_type":"bytes"}"#).unwrap_err(),
            CodecError::MalformedEnvelope(_)
        ));
        assert!(matches!(
            decode(r#"{"_spec_type":7,"val":"AA=="}"#).unwrap_err(),
            CodecError::MalformedEnvelope(_)
        ));
        assert!(matches!(decode("{not json").unwrap_err(), CodecError::Json(_)));
    }

    #[test]
    fn test_non_finite_float_fails_fast() {
        let err = encode(&Value::Float(f64::NAN)).unwrap_err();
        assert!(matches!(err, CodecError::NonFiniteFloat(_)));
    }

    #[test]
    fn test_depth_bound_nulls_deep_subtree() {
        let codec = Codec::new(CodecOptions {
            max_depth: 3,
            ..CodecOptions::default()
        });
        let deep = Value::List(vec![Value::List(vec![Value::List(vec![Value::Int(1)])])]);

        assert_eq!(codec.encode(&deep).unwrap(), "[[[null]]]");
    }

    #[test]
    fn test_exact_encoding_rejects_deep_subtree() {
        let codec = Codec::new(CodecOptions {
            max_depth: 3,
            ..CodecOptions::default()
        });
        let fits = Value::List(vec![Value::List(vec![Value::Int(1)])]);
        let deep = Value::List(vec![fits.clone()]);

        assert_eq!(codec.encode_exact(&fits).unwrap(), "[[1]]");
        let err = codec.encode_exact(&deep).unwrap_err();
        assert!(matches!(err, CodecError::DepthExceeded(3)));
    }

    #[test]
    fn test_with_options_shares_registry() {
        let mut registry = CodecRegistry::builtin();
        registry.unregister(registry::DECIMAL_TAG);
        let codec = Codec::with_registry(CodecOptions::default(), registry);
        let raw = codec.with_options(CodecOptions {
            storage_safe: false,
            ..CodecOptions::default()
        });

        assert!(!raw.options().storage_safe);
        assert!(matches!(
            raw.encode(&Value::Decimal(Decimal::ONE)).unwrap_err(),
            CodecError::Unsupported(ValueKind::Decimal)
        ));
    }

    #[test]
    fn test_storage_safe_drops_internal_fields() {
        let record = Value::record()
            .field("id", &7_i64)
            .field("__session_state", "persistent")
            .build();

        let safe = Codec::default().encode(&record).unwrap();
        assert_eq!(safe, r#"{"id":7}"#);

        let raw = Codec::new(CodecOptions {
            storage_safe: false,
            ..CodecOptions::default()
        })
        .encode(&record)
        .unwrap();
        assert!(raw.contains("__session_state"));
    }

    #[test]
    fn test_user_map_with_tag_key_is_escaped() {
        let codec = Codec::default();
        let mut map = BTreeMap::new();
        map.insert(TYPE_TAG_FIELD.to_string(), Value::from("bytes"));
        map.insert(VALUE_FIELD.to_string(), Value::from("AAE="));
        let value = Value::Map(map);

        let text = codec.encode(&value).unwrap();
        assert!(text.starts_with(r#"{"_spec_type":"map""#));
        assert_eq!(codec.decode(&text).unwrap(), value);
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let codec = Codec::default();
        let a = codec.encode_value(&sample_order()).unwrap();
        let b = codec.encode_value(&sample_order()).unwrap();
        assert_eq!(a, b);
    }
}
