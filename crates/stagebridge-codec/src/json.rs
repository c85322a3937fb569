//! Newline-delimited JSON codec
//!
//! Each tuple becomes one JSON object keyed by the configured field names.
//! Timestamps are strings in the shared timestamp layout, raw bytes are
//! base64 strings, and non-finite floats are written as the strings `"NaN"`,
//! `"inf"` and `"-inf"`.

use crate::{text, CodecError, ShapeGuard, TupleReader, TupleWriter};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::{Map, Number, Value as JsonValue};
use stagebridge_core::{format_timestamp, Tuple, TupleError, Value, ValueKind};
use std::io::{self, Write};

fn float_to_json(v: f64) -> JsonValue {
    match Number::from_f64(v) {
        Some(n) => JsonValue::Number(n),
        None => JsonValue::String(v.to_string()),
    }
}

fn to_json(value: &Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Bool(v) => JsonValue::Bool(*v),
        Value::Int16(v) => JsonValue::from(*v),
        Value::Int32(v) => JsonValue::from(*v),
        Value::Int64(v) => JsonValue::from(*v),
        Value::Float32(v) => float_to_json(f64::from(*v)),
        Value::Float64(v) => float_to_json(*v),
        Value::String(v) => JsonValue::String(v.clone()),
        Value::Timestamp(v) => JsonValue::String(format_timestamp(v)),
        Value::Byte(v) => JsonValue::from(*v),
        Value::RawBytes(v) => JsonValue::String(BASE64.encode(v)),
    }
}

fn from_json(kind: ValueKind, json: &JsonValue, slot: usize) -> Result<Value, CodecError> {
    let mismatch = || CodecError::parse(slot, format!("expected {}, found {}", kind, json));

    let value = match (kind, json) {
        (_, JsonValue::Null) => Value::Null,
        (ValueKind::Bool, JsonValue::Bool(v)) => Value::Bool(*v),
        (ValueKind::Int16, JsonValue::Number(n)) => Value::Int16(
            n.as_i64()
                .and_then(|v| i16::try_from(v).ok())
                .ok_or_else(mismatch)?,
        ),
        (ValueKind::Int32, JsonValue::Number(n)) => Value::Int32(
            n.as_i64()
                .and_then(|v| i32::try_from(v).ok())
                .ok_or_else(mismatch)?,
        ),
        (ValueKind::Int64, JsonValue::Number(n)) => Value::Int64(n.as_i64().ok_or_else(mismatch)?),
        (ValueKind::Byte, JsonValue::Number(n)) => Value::Byte(
            n.as_u64()
                .and_then(|v| u8::try_from(v).ok())
                .ok_or_else(mismatch)?,
        ),
        (ValueKind::Float32, JsonValue::Number(n)) => {
            Value::Float32(n.as_f64().ok_or_else(mismatch)? as f32)
        }
        (ValueKind::Float64, JsonValue::Number(n)) => Value::Float64(n.as_f64().ok_or_else(mismatch)?),
        // non-finite floats and the remaining string-encoded kinds
        (
            ValueKind::Float32
            | ValueKind::Float64
            | ValueKind::String
            | ValueKind::Timestamp
            | ValueKind::RawBytes,
            JsonValue::String(s),
        ) => text::parse(kind, s, slot)?,
        _ => return Err(mismatch()),
    };
    Ok(value)
}

/// Writes tuples as newline-delimited JSON objects
pub struct JsonWriter<W: io::Write> {
    inner: io::BufWriter<W>,
    field_names: Vec<String>,
    guard: ShapeGuard,
}

impl<W: io::Write> JsonWriter<W> {
    /// Writer keying slot `i` by `field_names[i]`
    pub fn new<S: Into<String>>(writer: W, field_names: impl IntoIterator<Item = S>) -> Self {
        Self {
            inner: io::BufWriter::new(writer),
            field_names: field_names.into_iter().map(Into::into).collect(),
            guard: ShapeGuard::default(),
        }
    }

    /// Flush and return the underlying writer
    pub fn into_inner(self) -> Result<W, CodecError> {
        self.inner.into_inner().map_err(|e| CodecError::Io(e.into_error()))
    }
}

impl<W: io::Write> TupleWriter for JsonWriter<W> {
    fn write_tuple(&mut self, row: &Tuple) -> Result<(), CodecError> {
        if row.width() != self.field_names.len() {
            return Err(TupleError::WidthMismatch {
                expected: self.field_names.len(),
                found: row.width(),
            }
            .into());
        }
        self.guard.check(row)?;

        let object: Map<String, JsonValue> = self
            .field_names
            .iter()
            .cloned()
            .zip(row.values().map(to_json))
            .collect();
        serde_json::to_writer(&mut self.inner, &object)?;
        self.inner.write_all(b"\n")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), CodecError> {
        self.inner.flush()?;
        Ok(())
    }
}

/// Reads newline-delimited JSON objects into tuples
///
/// Fields are looked up by name, so key order in the input does not matter.
/// Every field name must be present; NULL is an explicit `null`.
pub struct JsonReader<R: io::Read> {
    stream: serde_json::StreamDeserializer<'static, serde_json::de::IoRead<R>, Map<String, JsonValue>>,
    field_names: Vec<String>,
}

impl<R: io::Read> JsonReader<R> {
    pub fn new<S: Into<String>>(reader: R, field_names: impl IntoIterator<Item = S>) -> Self {
        Self {
            stream: serde_json::Deserializer::from_reader(reader).into_iter(),
            field_names: field_names.into_iter().map(Into::into).collect(),
        }
    }
}

impl<R: io::Read> TupleReader for JsonReader<R> {
    fn next(&mut self, row: &mut Tuple) -> Result<bool, CodecError> {
        let object = match self.stream.next() {
            None => return Ok(false),
            Some(object) => object?,
        };

        let width = row.width();
        if self.field_names.len() != width {
            return Err(TupleError::WidthMismatch {
                expected: width,
                found: self.field_names.len(),
            }
            .into());
        }

        for (slot, name) in self.field_names.iter().enumerate() {
            let kind = row
                .kind(slot)
                .ok_or(TupleError::SlotOutOfRange { slot, width })?;
            let json = object
                .get(name)
                .ok_or_else(|| CodecError::parse(slot, format!("missing field {:?}", name)))?;
            row.set(slot, from_json(kind.kind(), json, slot)?)?;
        }
        Ok(true)
    }
}
