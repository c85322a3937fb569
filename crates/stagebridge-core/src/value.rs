//! Canonical value kinds and cell values
//!
//! Every driver type and every vendor type name resolves into one of the
//! [`ValueKind`]s below, paired with a nullability flag as a [`SlotKind`].

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Text layout used for timestamps in every text format
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Closed set of canonical value types a tuple slot can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Bool,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    String,
    Timestamp,
    Byte,
    /// Opaque pass-through blob, never nullable
    RawBytes,
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Bool => "BOOL",
            Self::Int16 => "INT16",
            Self::Int32 => "INT32",
            Self::Int64 => "INT64",
            Self::Float32 => "FLOAT32",
            Self::Float64 => "FLOAT64",
            Self::String => "STRING",
            Self::Timestamp => "TIMESTAMP",
            Self::Byte => "BYTE",
            Self::RawBytes => "RAW_BYTES",
        };
        write!(f, "{}", name)
    }
}

/// A value kind together with its nullability
///
/// Two combinations do not exist and are normalised on construction:
/// a nullable `Float32` widens to a nullable `Float64`, and `RawBytes`
/// is always non-nullable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "SlotKindFields")]
pub struct SlotKind {
    kind: ValueKind,
    nullable: bool,
}

#[derive(Deserialize)]
struct SlotKindFields {
    kind: ValueKind,
    #[serde(default)]
    nullable: bool,
}

impl From<SlotKindFields> for SlotKind {
    fn from(fields: SlotKindFields) -> Self {
        Self::new(fields.kind, fields.nullable)
    }
}

impl SlotKind {
    /// Create a slot kind, normalising the combinations that have no native form
    pub fn new(kind: ValueKind, nullable: bool) -> Self {
        match (kind, nullable) {
            (ValueKind::Float32, true) => Self { kind: ValueKind::Float64, nullable: true },
            (ValueKind::RawBytes, _) => Self { kind: ValueKind::RawBytes, nullable: false },
            (kind, nullable) => Self { kind, nullable },
        }
    }

    /// Non-nullable slot kind
    pub fn required(kind: ValueKind) -> Self {
        Self::new(kind, false)
    }

    /// Nullable slot kind
    pub fn nullable(kind: ValueKind) -> Self {
        Self::new(kind, true)
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// The value a freshly allocated slot of this kind holds
    pub fn initial_value(&self) -> Value {
        if self.nullable {
            return Value::Null;
        }
        match self.kind {
            ValueKind::Bool => Value::Bool(false),
            ValueKind::Int16 => Value::Int16(0),
            ValueKind::Int32 => Value::Int32(0),
            ValueKind::Int64 => Value::Int64(0),
            ValueKind::Float32 => Value::Float32(0.0),
            ValueKind::Float64 => Value::Float64(0.0),
            ValueKind::String => Value::String(String::new()),
            ValueKind::Timestamp => Value::Timestamp(NaiveDateTime::default()),
            ValueKind::Byte => Value::Byte(0),
            ValueKind::RawBytes => Value::RawBytes(Vec::new()),
        }
    }

    /// Check whether a value may be stored in a slot of this kind
    pub fn accepts(&self, value: &Value) -> bool {
        match value.kind() {
            None => self.nullable,
            Some(kind) => kind == self.kind,
        }
    }
}

impl std::fmt::Display for SlotKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.nullable {
            write!(f, "NULLABLE {}", self.kind)
        } else {
            write!(f, "{}", self.kind)
        }
    }
}

/// An owned cell value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    String(String),
    Timestamp(NaiveDateTime),
    Byte(u8),
    RawBytes(Vec<u8>),
}

impl Value {
    /// Kind of the payload, `None` for `Null`
    pub fn kind(&self) -> Option<ValueKind> {
        Some(match self {
            Self::Null => return None,
            Self::Bool(_) => ValueKind::Bool,
            Self::Int16(_) => ValueKind::Int16,
            Self::Int32(_) => ValueKind::Int32,
            Self::Int64(_) => ValueKind::Int64,
            Self::Float32(_) => ValueKind::Float32,
            Self::Float64(_) => ValueKind::Float64,
            Self::String(_) => ValueKind::String,
            Self::Timestamp(_) => ValueKind::Timestamp,
            Self::Byte(_) => ValueKind::Byte,
            Self::RawBytes(_) => ValueKind::RawBytes,
        })
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

/// Format a timestamp with [`TIMESTAMP_FORMAT`]
pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a timestamp written by [`format_timestamp`]
///
/// A space separator between date and time is accepted too, since that is
/// how most SQL engines render `TIMESTAMP` as text. Bare dates parse as
/// midnight.
pub fn parse_timestamp(text: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    let text = text.trim();
    NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f"))
        .or_else(|err| {
            chrono::NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .map(|d| d.and_hms_opt(0, 0, 0).unwrap_or_default())
                .map_err(|_| err)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialized_slot_kind_is_normalised() {
        let slot: SlotKind = toml::from_str("kind = \"float32\"\nnullable = true").unwrap();
        assert_eq!(slot, SlotKind::nullable(ValueKind::Float64));

        let slot: SlotKind = toml::from_str("kind = \"rawbytes\"\nnullable = true").unwrap();
        assert_eq!(slot, SlotKind::required(ValueKind::RawBytes));
        assert!(!slot.is_nullable());

        let slot: SlotKind = toml::from_str("kind = \"int32\"").unwrap();
        assert_eq!(slot, SlotKind::required(ValueKind::Int32));
    }

    #[test]
    fn nullable_float32_widens() {
        let slot = SlotKind::nullable(ValueKind::Float32);
        assert_eq!(slot.kind(), ValueKind::Float64);
        assert!(slot.is_nullable());

        let slot = SlotKind::required(ValueKind::Float32);
        assert_eq!(slot.kind(), ValueKind::Float32);
    }

    #[test]
    fn raw_bytes_never_nullable() {
        let slot = SlotKind::nullable(ValueKind::RawBytes);
        assert!(!slot.is_nullable());
        assert!(!slot.accepts(&Value::Null));
    }

    #[test]
    fn initial_values() {
        assert_eq!(SlotKind::nullable(ValueKind::Int64).initial_value(), Value::Null);
        assert_eq!(SlotKind::required(ValueKind::Int64).initial_value(), Value::Int64(0));
        assert_eq!(
            SlotKind::required(ValueKind::String).initial_value(),
            Value::String(String::new())
        );
    }

    #[test]
    fn accepts_checks_kind_and_null() {
        let slot = SlotKind::required(ValueKind::Int32);
        assert!(slot.accepts(&Value::Int32(7)));
        assert!(!slot.accepts(&Value::Int64(7)));
        assert!(!slot.accepts(&Value::Null));
        assert!(SlotKind::nullable(ValueKind::Int32).accepts(&Value::Null));
    }

    #[test]
    fn timestamp_text_roundtrip() {
        let ts = parse_timestamp("2024-03-01T12:30:45.123456").unwrap();
        assert_eq!(format_timestamp(&ts), "2024-03-01T12:30:45.123456");
        assert_eq!(parse_timestamp("2024-03-01 12:30:45.123456").unwrap(), ts);
        assert_eq!(
            format_timestamp(&parse_timestamp("2024-03-01").unwrap()),
            "2024-03-01T00:00:00"
        );
    }
}
