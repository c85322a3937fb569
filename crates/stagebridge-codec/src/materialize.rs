//! Drain a live query result into a tuple writer

use crate::{CodecError, TupleWriter};
use serde::{Deserialize, Serialize};
use stagebridge_core::{ColumnDescriptor, Tuple, Value};
use tracing::{debug, info};

/// A live query result, consumed row by row
pub trait Cursor {
    /// Type descriptors of the result columns, in order
    fn column_types(&self) -> &[ColumnDescriptor];

    /// Result column names, in order
    fn column_names(&self) -> Vec<String> {
        self.column_types().iter().map(|c| c.name.clone()).collect()
    }

    /// Decode the next row into `row`, returning `Ok(false)` when exhausted
    fn next_row(&mut self, row: &mut Tuple) -> Result<bool, CodecError>;
}

/// Outcome of draining a cursor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterializationResult {
    /// Result column names, in order
    pub column_names: Vec<String>,

    /// Number of rows written
    pub row_count: u64,
}

/// Write every row of `cursor` to `writer`, then flush it once
///
/// The scratch tuple is allocated from the cursor's column types before the
/// first row is pulled, so an unsupported column fails before any output is
/// produced. On error the writer is not flushed.
pub fn materialize<W, C>(writer: &mut W, cursor: &mut C) -> Result<MaterializationResult, CodecError>
where
    W: TupleWriter + ?Sized,
    C: Cursor + ?Sized,
{
    let column_names = cursor.column_names();
    let mut row = Tuple::from_descriptors(cursor.column_types())?;
    debug!("Materializing {} columns: {}", column_names.len(), column_names.join(", "));

    let mut row_count = 0u64;
    while cursor.next_row(&mut row)? {
        writer.write_tuple(&row)?;
        row_count += 1;
    }
    writer.flush()?;

    info!("Materialized {} rows", row_count);
    Ok(MaterializationResult {
        column_names,
        row_count,
    })
}

/// Cursor over rows held in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryCursor {
    columns: Vec<ColumnDescriptor>,
    rows: std::collections::VecDeque<Vec<Value>>,
}

impl MemoryCursor {
    pub fn new(columns: Vec<ColumnDescriptor>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            columns,
            rows: rows.into(),
        }
    }

    /// Rows not yet pulled
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }
}

impl Cursor for MemoryCursor {
    fn column_types(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    fn next_row(&mut self, row: &mut Tuple) -> Result<bool, CodecError> {
        let Some(values) = self.rows.pop_front() else {
            return Ok(false);
        };
        if values.len() != row.width() {
            return Err(stagebridge_core::TupleError::WidthMismatch {
                expected: row.width(),
                found: values.len(),
            }
            .into());
        }
        for (slot, value) in values.into_iter().enumerate() {
            row.set(slot, value)?;
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CsvWriter;
    use pretty_assertions::assert_eq;
    use stagebridge_core::{ScanType, TupleError};

    fn columns() -> Vec<ColumnDescriptor> {
        vec![
            ColumnDescriptor::new("id", ScanType::Int64, Some(false)),
            ColumnDescriptor::new("name", ScanType::NullString, Some(true)),
        ]
    }

    #[test]
    fn materialize_reports_names_and_count() {
        let mut cursor = MemoryCursor::new(
            columns(),
            vec![
                vec![Value::Int64(1), Value::String("a".into())],
                vec![Value::Int64(2), Value::Null],
            ],
        );
        let mut writer = CsvWriter::new(Vec::new());
        let result = materialize(&mut writer, &mut cursor).unwrap();

        assert_eq!(
            result,
            MaterializationResult {
                column_names: vec!["id".into(), "name".into()],
                row_count: 2,
            }
        );
        assert_eq!(
            String::from_utf8(writer.into_inner().unwrap()).unwrap(),
            "1,a\n2,\\N\n"
        );
    }

    #[test]
    fn materialize_empty_result() {
        let mut cursor = MemoryCursor::new(columns(), vec![]);
        let mut writer = CsvWriter::with_header(Vec::new(), ["id", "name"]);
        let result = materialize(&mut writer, &mut cursor).unwrap();
        assert_eq!(result.row_count, 0);
        assert_eq!(String::from_utf8(writer.into_inner().unwrap()).unwrap(), "id,name\n");
    }

    #[test]
    fn unsupported_column_fails_before_any_row() {
        let mut cursor = MemoryCursor::new(
            vec![ColumnDescriptor::new("geo", ScanType::Other("GEOGRAPHY".into()), None)],
            vec![vec![Value::Null]],
        );
        let mut writer = CsvWriter::new(Vec::new());
        let err = materialize(&mut writer, &mut cursor).unwrap_err();
        assert!(matches!(err, CodecError::Tuple(TupleError::UnsupportedType { .. })));
        assert_eq!(cursor.remaining(), 1);
    }
}
