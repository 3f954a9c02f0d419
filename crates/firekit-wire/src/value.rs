//! Wire value types and the typed/dynamic value codec.
//!
//! The document store speaks a tagged-union JSON format: every value is an
//! object with exactly one tag key (`stringValue`, `integerValue`, ...).
//! 64-bit integers travel as strings to avoid precision loss in JSON.

use std::collections::HashMap;

use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fixed timestamp layout on the wire: `YYYY-MM-DDTHH:MM:SSZ`, always UTC.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Format an instant in the wire timestamp layout.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a wire timestamp. Accepts full RFC 3339 (the service appends
/// fractional seconds on document metadata).
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.into())
}

// =============================================================================
// Wire value
// =============================================================================

/// Document value types on the wire.
///
/// An object carrying none of the known tags deserializes into
/// [`WireValue::Unknown`] and is preserved unchanged, so future server-side
/// value kinds pass through decode/encode untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WireValue {
    NullValue(()),
    BooleanValue(bool),
    IntegerValue(String), // wire format mandates string-encoded i64
    DoubleValue(f64),
    TimestampValue(String),
    StringValue(String),
    BytesValue(String), // base64
    ArrayValue(ArrayValue),
    MapValue(MapValue),
    #[serde(untagged)]
    Unknown(serde_json::Map<String, serde_json::Value>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayValue {
    pub values: Option<Vec<WireValue>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapValue {
    pub fields: Option<HashMap<String, WireValue>>,
}

impl WireValue {
    /// Wrap a list of values.
    pub fn array(values: Vec<WireValue>) -> Self {
        WireValue::ArrayValue(ArrayValue {
            values: Some(values),
        })
    }

    /// Wrap a name→value mapping.
    pub fn map(fields: HashMap<String, WireValue>) -> Self {
        WireValue::MapValue(MapValue {
            fields: Some(fields),
        })
    }
}

// =============================================================================
// Binary blobs
// =============================================================================

/// Dedicated binary value kind.
///
/// Binary payloads are an explicit variant rather than a serialize-and-sniff
/// side channel; they travel base64-encoded under the `bytesValue` tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob(pub Vec<u8>);

impl Blob {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.0)
    }

    fn from_base64(s: &str) -> Option<Self> {
        base64::engine::general_purpose::STANDARD
            .decode(s)
            .ok()
            .map(Self)
    }
}

// =============================================================================
// Typed codec
// =============================================================================

/// Convert a Rust value to a wire value.
pub trait ToWireValue {
    fn to_wire_value(&self) -> WireValue;
}

/// Convert a wire value back to a Rust type.
pub trait FromWireValue: Sized {
    fn from_wire_value(value: &WireValue) -> Option<Self>;
}

impl ToWireValue for String {
    fn to_wire_value(&self) -> WireValue {
        WireValue::StringValue(self.clone())
    }
}

impl ToWireValue for &str {
    fn to_wire_value(&self) -> WireValue {
        WireValue::StringValue(self.to_string())
    }
}

impl ToWireValue for i64 {
    fn to_wire_value(&self) -> WireValue {
        WireValue::IntegerValue(self.to_string())
    }
}

impl ToWireValue for i32 {
    fn to_wire_value(&self) -> WireValue {
        WireValue::IntegerValue((*self as i64).to_string())
    }
}

impl ToWireValue for u32 {
    fn to_wire_value(&self) -> WireValue {
        WireValue::IntegerValue((*self as i64).to_string())
    }
}

impl ToWireValue for u64 {
    fn to_wire_value(&self) -> WireValue {
        // The wire integer is an i64; larger values clamp to its max.
        let clamped = i64::try_from(*self).unwrap_or(i64::MAX);
        WireValue::IntegerValue(clamped.to_string())
    }
}

impl ToWireValue for f64 {
    fn to_wire_value(&self) -> WireValue {
        WireValue::DoubleValue(*self)
    }
}

impl ToWireValue for bool {
    fn to_wire_value(&self) -> WireValue {
        WireValue::BooleanValue(*self)
    }
}

impl ToWireValue for DateTime<Utc> {
    fn to_wire_value(&self) -> WireValue {
        WireValue::TimestampValue(format_timestamp(self))
    }
}

impl ToWireValue for Blob {
    fn to_wire_value(&self) -> WireValue {
        WireValue::BytesValue(self.to_base64())
    }
}

impl<T: ToWireValue> ToWireValue for Option<T> {
    fn to_wire_value(&self) -> WireValue {
        match self {
            Some(v) => v.to_wire_value(),
            None => WireValue::NullValue(()),
        }
    }
}

impl<T: ToWireValue> ToWireValue for Vec<T> {
    fn to_wire_value(&self) -> WireValue {
        WireValue::array(self.iter().map(|v| v.to_wire_value()).collect())
    }
}

impl<T: ToWireValue> ToWireValue for HashMap<String, T> {
    fn to_wire_value(&self) -> WireValue {
        WireValue::map(
            self.iter()
                .map(|(k, v)| (k.clone(), v.to_wire_value()))
                .collect(),
        )
    }
}

impl FromWireValue for String {
    fn from_wire_value(value: &WireValue) -> Option<Self> {
        match value {
            WireValue::StringValue(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl FromWireValue for i64 {
    fn from_wire_value(value: &WireValue) -> Option<Self> {
        match value {
            WireValue::IntegerValue(s) => s.parse().ok(),
            WireValue::DoubleValue(f) => Some(*f as i64),
            _ => None,
        }
    }
}

impl FromWireValue for i32 {
    fn from_wire_value(value: &WireValue) -> Option<Self> {
        i64::from_wire_value(value).map(|v| v as i32)
    }
}

impl FromWireValue for u32 {
    fn from_wire_value(value: &WireValue) -> Option<Self> {
        match value {
            WireValue::IntegerValue(s) => s.parse().ok(),
            WireValue::DoubleValue(f) => Some(*f as u32),
            _ => None,
        }
    }
}

impl FromWireValue for u64 {
    fn from_wire_value(value: &WireValue) -> Option<Self> {
        match value {
            WireValue::IntegerValue(s) => s.parse().ok(),
            WireValue::DoubleValue(f) => Some(*f as u64),
            _ => None,
        }
    }
}

impl FromWireValue for f64 {
    fn from_wire_value(value: &WireValue) -> Option<Self> {
        match value {
            WireValue::DoubleValue(f) => Some(*f),
            WireValue::IntegerValue(s) => s.parse().ok(),
            _ => None,
        }
    }
}

impl FromWireValue for bool {
    fn from_wire_value(value: &WireValue) -> Option<Self> {
        match value {
            WireValue::BooleanValue(b) => Some(*b),
            _ => None,
        }
    }
}

impl FromWireValue for DateTime<Utc> {
    fn from_wire_value(value: &WireValue) -> Option<Self> {
        match value {
            WireValue::TimestampValue(s) => parse_timestamp(s),
            _ => None,
        }
    }
}

impl FromWireValue for Blob {
    fn from_wire_value(value: &WireValue) -> Option<Self> {
        match value {
            WireValue::BytesValue(s) => Blob::from_base64(s),
            _ => None,
        }
    }
}

impl<T: FromWireValue> FromWireValue for Vec<T> {
    fn from_wire_value(value: &WireValue) -> Option<Self> {
        match value {
            WireValue::ArrayValue(arr) => arr
                .values
                .as_deref()
                .unwrap_or_default()
                .iter()
                .map(T::from_wire_value)
                .collect(),
            _ => None,
        }
    }
}

impl<T: FromWireValue> FromWireValue for HashMap<String, T> {
    fn from_wire_value(value: &WireValue) -> Option<Self> {
        match value {
            WireValue::MapValue(map) => map
                .fields
                .as_ref()
                .map(|fields| {
                    fields
                        .iter()
                        .map(|(k, v)| T::from_wire_value(v).map(|t| (k.clone(), t)))
                        .collect()
                })
                .unwrap_or_else(|| Some(HashMap::new())),
            _ => None,
        }
    }
}

// =============================================================================
// Dynamic codec
// =============================================================================

/// Encode an untyped JSON value.
///
/// The host type decides the tag: whole numbers that fit an i64 become
/// integer values, everything else numeric becomes a double. Values with no
/// wire representation fall back to their text form.
pub fn encode_json(value: &serde_json::Value) -> WireValue {
    use serde_json::Value as J;
    match value {
        J::Null => WireValue::NullValue(()),
        J::Bool(b) => WireValue::BooleanValue(*b),
        J::Number(n) => {
            if let Some(i) = n.as_i64() {
                WireValue::IntegerValue(i.to_string())
            } else if let Some(f) = n.as_f64() {
                WireValue::DoubleValue(f)
            } else {
                WireValue::StringValue(n.to_string())
            }
        }
        J::String(s) => WireValue::StringValue(s.clone()),
        J::Array(items) => WireValue::array(items.iter().map(encode_json).collect()),
        J::Object(obj) => WireValue::map(
            obj.iter()
                .map(|(k, v)| (k.clone(), encode_json(v)))
                .collect(),
        ),
    }
}

/// Decode a wire value to untyped JSON, the inverse of [`encode_json`].
///
/// Integer values parse back to JSON integers. Timestamps and bytes have no
/// untyped host representation and decode to their string forms; unknown tags
/// pass through unchanged.
pub fn decode_json(value: &WireValue) -> serde_json::Value {
    use serde_json::Value as J;
    match value {
        WireValue::NullValue(()) => J::Null,
        WireValue::BooleanValue(b) => J::Bool(*b),
        WireValue::IntegerValue(s) => s
            .parse::<i64>()
            .map(|i| J::Number(i.into()))
            .unwrap_or_else(|_| J::String(s.clone())),
        WireValue::DoubleValue(f) => serde_json::Number::from_f64(*f)
            .map(J::Number)
            .unwrap_or(J::Null),
        WireValue::TimestampValue(s)
        | WireValue::StringValue(s)
        | WireValue::BytesValue(s) => J::String(s.clone()),
        WireValue::ArrayValue(arr) => J::Array(
            arr.values
                .as_deref()
                .unwrap_or_default()
                .iter()
                .map(decode_json)
                .collect(),
        ),
        WireValue::MapValue(map) => J::Object(
            map.fields
                .as_ref()
                .map(|fields| {
                    fields
                        .iter()
                        .map(|(k, v)| (k.clone(), decode_json(v)))
                        .collect()
                })
                .unwrap_or_default(),
        ),
        WireValue::Unknown(obj) => J::Object(obj.clone()),
    }
}

/// Encode a whole JSON object as a document `fields` map.
pub fn encode_fields(obj: &serde_json::Map<String, serde_json::Value>) -> HashMap<String, WireValue> {
    obj.iter()
        .map(|(k, v)| (k.clone(), encode_json(v)))
        .collect()
}

/// Decode a document `fields` map back to a JSON object.
pub fn decode_fields(fields: &HashMap<String, WireValue>) -> serde_json::Map<String, serde_json::Value> {
    fields
        .iter()
        .map(|(k, v)| (k.clone(), decode_json(v)))
        .collect()
}

// =============================================================================
// Tests
// =============================================================================
