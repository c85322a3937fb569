//! Delimited text codec
//!
//! One record per tuple, fields in slot order. NULL is written as the bare
//! marker `\N`; any non-null field that begins with a backslash gets one extra
//! leading backslash so it can never be confused with the marker. Quoting of
//! separators and line breaks is left to the `csv` crate.

use crate::{text, CodecError, ShapeGuard, TupleReader, TupleWriter};
use stagebridge_core::{Tuple, TupleError, Value, ValueKind};
use std::io;

/// Field text standing for NULL
pub const NULL_MARKER: &str = "\\N";

fn encode_field(value: &Value) -> String {
    match text::render(value) {
        None => NULL_MARKER.to_string(),
        Some(text) if text.starts_with('\\') => format!("\\{}", text),
        Some(text) => text,
    }
}

fn decode_field(kind: ValueKind, field: &str, slot: usize) -> Result<Value, CodecError> {
    if field == NULL_MARKER {
        return Ok(Value::Null);
    }
    let field = if field.starts_with("\\\\") { &field[1..] } else { field };
    text::parse(kind, field, slot)
}

/// Writes tuples as delimited records
pub struct CsvWriter<W: io::Write> {
    inner: ::csv::Writer<W>,
    pending_header: Option<Vec<String>>,
    guard: ShapeGuard,
    record: Vec<String>,
}

impl<W: io::Write> CsvWriter<W> {
    /// Writer without a header record
    pub fn new(writer: W) -> Self {
        Self::build(writer, b',')
    }

    /// Writer that emits `field_names` as the first record
    ///
    /// The header is written even if no tuple follows.
    pub fn with_header<S: Into<String>>(writer: W, field_names: impl IntoIterator<Item = S>) -> Self {
        let mut this = Self::new(writer);
        this.pending_header = Some(field_names.into_iter().map(Into::into).collect());
        this
    }

    /// Use a field delimiter other than `,`
    pub fn with_delimiter(writer: W, delimiter: u8) -> Self {
        Self::build(writer, delimiter)
    }

    fn build(writer: W, delimiter: u8) -> Self {
        Self {
            inner: ::csv::WriterBuilder::new()
                .has_headers(false)
                .delimiter(delimiter)
                .from_writer(writer),
            pending_header: None,
            guard: ShapeGuard::default(),
            record: Vec::new(),
        }
    }

    /// Flush and return the underlying writer
    pub fn into_inner(mut self) -> Result<W, CodecError> {
        TupleWriter::flush(&mut self)?;
        self.inner.into_inner().map_err(|e| CodecError::Io(e.into_error()))
    }

    fn write_pending_header(&mut self) -> Result<(), CodecError> {
        if let Some(header) = self.pending_header.take() {
            self.inner.write_record(&header)?;
        }
        Ok(())
    }
}

impl<W: io::Write> TupleWriter for CsvWriter<W> {
    fn write_tuple(&mut self, row: &Tuple) -> Result<(), CodecError> {
        self.guard.check(row)?;
        self.write_pending_header()?;

        self.record.clear();
        self.record.extend(row.values().map(encode_field));
        self.inner.write_record(&self.record)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), CodecError> {
        self.write_pending_header()?;
        self.inner.flush()?;
        Ok(())
    }
}

/// Reads delimited records into tuples
pub struct CsvReader<R: io::Read> {
    inner: ::csv::Reader<R>,
    record: ::csv::StringRecord,
}

impl<R: io::Read> CsvReader<R> {
    /// Reader for a stream without a header record
    pub fn new(reader: R) -> Self {
        Self::build(reader, false, b',')
    }

    /// Reader that skips a leading header record
    pub fn with_header(reader: R) -> Self {
        Self::build(reader, true, b',')
    }

    /// Reader for a headerless stream using a field delimiter other than `,`
    pub fn with_delimiter(reader: R, delimiter: u8) -> Self {
        Self::build(reader, false, delimiter)
    }

    fn build(reader: R, has_headers: bool, delimiter: u8) -> Self {
        Self {
            // width is checked per record against the scratch tuple instead
            inner: ::csv::ReaderBuilder::new()
                .has_headers(has_headers)
                .delimiter(delimiter)
                .flexible(true)
                .from_reader(reader),
            record: ::csv::StringRecord::new(),
        }
    }
}

impl<R: io::Read> TupleReader for CsvReader<R> {
    fn next(&mut self, row: &mut Tuple) -> Result<bool, CodecError> {
        if !self.inner.read_record(&mut self.record)? {
            return Ok(false);
        }

        let width = row.width();
        if self.record.len() != width {
            return Err(TupleError::WidthMismatch {
                expected: width,
                found: self.record.len(),
            }
            .into());
        }

        for (slot, field) in self.record.iter().enumerate() {
            let kind = row
                .kind(slot)
                .ok_or(TupleError::SlotOutOfRange { slot, width })?;
            row.set(slot, decode_field(kind.kind(), field, slot)?)?;
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use stagebridge_core::SlotKind;

    fn shape() -> Vec<SlotKind> {
        vec![
            SlotKind::required(ValueKind::Int64),
            SlotKind::nullable(ValueKind::String),
            SlotKind::nullable(ValueKind::Float64),
        ]
    }

    fn written(rows: &[Vec<Value>]) -> String {
        let mut buf = Vec::new();
        {
            let mut writer = CsvWriter::new(&mut buf);
            for values in rows {
                let tuple = Tuple::with_values(shape(), values.clone()).unwrap();
                writer.write_tuple(&tuple).unwrap();
            }
            writer.flush().unwrap();
        }
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn null_and_escape_encoding() {
        let out = written(&[
            vec![Value::Int64(1), Value::Null, Value::Float64(1.5)],
            vec![Value::Int64(2), Value::String("\\N".into()), Value::Null],
        ]);
        assert_eq!(out, "1,\\N,1.5\n2,\\\\N,\\N\n");
    }

    #[test]
    fn decode_distinguishes_null_from_marker_text() {
        let input = "1,\\N,1.5\n2,\\\\N,\\N\n3,,-2\n";
        let mut reader = CsvReader::new(input.as_bytes());
        let mut row = Tuple::new(shape());

        assert!(reader.next(&mut row).unwrap());
        assert_eq!(row.get(1), Some(&Value::Null));

        assert!(reader.next(&mut row).unwrap());
        assert_eq!(row.get(1), Some(&Value::String("\\N".into())));
        assert_eq!(row.get(2), Some(&Value::Null));

        assert!(reader.next(&mut row).unwrap());
        assert_eq!(row.get(1), Some(&Value::String(String::new())));
        assert_eq!(row.get(2), Some(&Value::Float64(-2.0)));

        assert!(!reader.next(&mut row).unwrap());
    }

    #[test]
    fn separators_and_newlines_survive() {
        let tricky = Value::String("a,b\n\"c\"".into());
        let out = written(&[vec![Value::Int64(1), tricky.clone(), Value::Null]]);

        let mut reader = CsvReader::new(out.as_bytes());
        let mut row = Tuple::new(shape());
        assert!(reader.next(&mut row).unwrap());
        assert_eq!(row.get(1), Some(&tricky));
    }

    #[test]
    fn header_written_for_empty_stream() {
        let mut buf = Vec::new();
        {
            let mut writer = CsvWriter::with_header(&mut buf, ["id", "name"]);
            writer.flush().unwrap();
            writer.flush().unwrap();
        }
        assert_eq!(String::from_utf8(buf).unwrap(), "id,name\n");
    }

    #[test]
    fn reader_skips_header() {
        let mut reader = CsvReader::with_header("id,name,score\n7,x,\\N\n".as_bytes());
        let mut row = Tuple::new(shape());
        assert!(reader.next(&mut row).unwrap());
        assert_eq!(row.get(0), Some(&Value::Int64(7)));
        assert!(!reader.next(&mut row).unwrap());
    }

    #[test]
    fn writer_rejects_shape_change() {
        let mut writer = CsvWriter::new(Vec::new());
        let first = Tuple::new(shape());
        writer.write_tuple(&first).unwrap();

        let other = Tuple::new(vec![SlotKind::required(ValueKind::Int64)]);
        let err = writer.write_tuple(&other).unwrap_err();
        assert!(err.is_shape_mismatch());
    }

    #[test]
    fn reader_rejects_wrong_width() {
        let mut reader = CsvReader::new("1,2\n".as_bytes());
        let mut row = Tuple::new(shape());
        let err = reader.next(&mut row).unwrap_err();
        assert!(matches!(
            err,
            CodecError::Tuple(TupleError::WidthMismatch { expected: 3, found: 2 })
        ));
    }

    #[test]
    fn reader_rejects_null_in_required_slot() {
        let mut reader = CsvReader::new("\\N,a,1\n".as_bytes());
        let mut row = Tuple::new(shape());
        let err = reader.next(&mut row).unwrap_err();
        assert!(matches!(
            err,
            CodecError::Tuple(TupleError::NullInNonNullable { slot: 0, .. })
        ));
    }

    #[test]
    fn tab_delimiter() {
        let mut buf = Vec::new();
        {
            let mut writer = CsvWriter::with_delimiter(&mut buf, b'\t');
            let tuple = Tuple::with_values(
                shape(),
                vec![Value::Int64(1), Value::String("a b".into()), Value::Null],
            )
            .unwrap();
            writer.write_tuple(&tuple).unwrap();
            writer.flush().unwrap();
        }
        assert_eq!(String::from_utf8(buf).unwrap(), "1\ta b\t\\N\n");
    }

    #[test]
    fn tab_delimited_roundtrip() {
        let values = vec![Value::Int64(1), Value::String("a,b\tc".into()), Value::Float64(0.25)];
        let mut buf = Vec::new();
        {
            let mut writer = CsvWriter::with_delimiter(&mut buf, b'\t');
            writer.write_tuple(&Tuple::with_values(shape(), values.clone()).unwrap()).unwrap();
            writer.flush().unwrap();
        }

        let mut reader = CsvReader::with_delimiter(buf.as_slice(), b'\t');
        let mut row = Tuple::new(shape());
        assert!(reader.next(&mut row).unwrap());
        assert_eq!(row.values().cloned().collect::<Vec<_>>(), values);
        assert!(!reader.next(&mut row).unwrap());
    }
}
