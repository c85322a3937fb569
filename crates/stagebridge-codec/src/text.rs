//! Scalar text rendering shared by the text formats

use crate::CodecError;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use stagebridge_core::{format_timestamp, parse_timestamp, Value, ValueKind};

/// Render a non-null value as text, `None` for NULL
pub(crate) fn render(value: &Value) -> Option<String> {
    let text = match value {
        Value::Null => return None,
        Value::Bool(v) => v.to_string(),
        Value::Int16(v) => v.to_string(),
        Value::Int32(v) => v.to_string(),
        Value::Int64(v) => v.to_string(),
        Value::Float32(v) => v.to_string(),
        Value::Float64(v) => v.to_string(),
        Value::String(v) => v.clone(),
        Value::Timestamp(v) => format_timestamp(v),
        Value::Byte(v) => v.to_string(),
        Value::RawBytes(v) => BASE64.encode(v),
    };
    Some(text)
}

/// Parse text produced by [`render`] back into a value of `kind`
pub(crate) fn parse(kind: ValueKind, text: &str, slot: usize) -> Result<Value, CodecError> {
    let bad = |e: &dyn std::fmt::Display| {
        CodecError::parse(slot, format!("invalid {} {:?}: {}", kind, text, e))
    };

    let value = match kind {
        ValueKind::Bool => Value::Bool(text.parse().map_err(|e| bad(&e))?),
        ValueKind::Int16 => Value::Int16(text.parse().map_err(|e| bad(&e))?),
        ValueKind::Int32 => Value::Int32(text.parse().map_err(|e| bad(&e))?),
        ValueKind::Int64 => Value::Int64(text.parse().map_err(|e| bad(&e))?),
        ValueKind::Float32 => Value::Float32(text.parse().map_err(|e| bad(&e))?),
        ValueKind::Float64 => Value::Float64(text.parse().map_err(|e| bad(&e))?),
        ValueKind::String => Value::String(text.to_string()),
        ValueKind::Timestamp => Value::Timestamp(parse_timestamp(text).map_err(|e| bad(&e))?),
        ValueKind::Byte => Value::Byte(text.parse().map_err(|e| bad(&e))?),
        ValueKind::RawBytes => Value::RawBytes(BASE64.decode(text).map_err(|e| bad(&e))?),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn floats_render_shortest_roundtrip() {
        let value = Value::Float64(0.1 + 0.2);
        let text = render(&value).unwrap();
        assert_eq!(parse(ValueKind::Float64, &text, 0).unwrap(), value);

        let value = Value::Float32(1.0e-7);
        let text = render(&value).unwrap();
        assert_eq!(parse(ValueKind::Float32, &text, 0).unwrap(), value);
    }

    #[test]
    fn non_finite_floats() {
        assert_eq!(render(&Value::Float64(f64::INFINITY)).unwrap(), "inf");
        assert_eq!(
            parse(ValueKind::Float64, "-inf", 0).unwrap(),
            Value::Float64(f64::NEG_INFINITY)
        );
        assert!(matches!(
            parse(ValueKind::Float64, "NaN", 0).unwrap(),
            Value::Float64(v) if v.is_nan()
        ));
    }

    #[test]
    fn raw_bytes_are_base64() {
        let value = Value::RawBytes(vec![0, 159, 255]);
        let text = render(&value).unwrap();
        assert_eq!(text, "AJ//");
        assert_eq!(parse(ValueKind::RawBytes, &text, 0).unwrap(), value);
    }

    #[test]
    fn parse_error_names_slot() {
        let err = parse(ValueKind::Int16, "70000", 3).unwrap_err();
        assert!(matches!(err, CodecError::Parse { slot: 3, .. }));
    }

    #[test]
    fn null_renders_as_none() {
        assert_eq!(render(&Value::Null), None);
    }
}
