//! Parameterised INSERT sink
//!
//! [`SqlTupleWriter`] turns each tuple into one execution of a prepared
//! `INSERT INTO <schema>.<table> (<columns>) VALUES (<placeholders>)` with every
//! identifier quoted for the dialect. It runs inside whatever transaction the
//! caller holds and never commits: flushing is a no-op and the caller decides
//! when the rows become visible.

use crate::{CodecError, ShapeGuard, TupleWriter};
use rusqlite::types::{ToSql, ToSqlOutput, Value as SqlValue, ValueRef};
use stagebridge_core::{format_timestamp, shape_of_table, DialectConfig, TableInfo, Tuple, Value};
use tracing::debug;

/// Something that can execute one parameterised statement
pub trait SqlExecutor {
    /// Execute `sql` with positional parameters, returning the affected row count
    fn execute_params(&self, sql: &str, params: &[&Value]) -> Result<usize, CodecError>;
}

impl SqlExecutor for rusqlite::Connection {
    fn execute_params(&self, sql: &str, params: &[&Value]) -> Result<usize, CodecError> {
        let mut stmt = self.prepare_cached(sql)?;
        let changed = stmt.execute(rusqlite::params_from_iter(params.iter().map(|v| SqlParam(*v))))?;
        Ok(changed)
    }
}

impl SqlExecutor for rusqlite::Transaction<'_> {
    fn execute_params(&self, sql: &str, params: &[&Value]) -> Result<usize, CodecError> {
        let conn: &rusqlite::Connection = self;
        conn.execute_params(sql, params)
    }
}

/// Binds a tuple value as a rusqlite parameter
///
/// Timestamps are bound as text in the shared timestamp layout.
pub struct SqlParam<'a>(pub &'a Value);

impl ToSql for SqlParam<'_> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let output = match self.0 {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Bool(v) => ToSqlOutput::Owned(SqlValue::Integer(i64::from(*v))),
            Value::Int16(v) => ToSqlOutput::Owned(SqlValue::Integer(i64::from(*v))),
            Value::Int32(v) => ToSqlOutput::Owned(SqlValue::Integer(i64::from(*v))),
            Value::Int64(v) => ToSqlOutput::Owned(SqlValue::Integer(*v)),
            Value::Float32(v) => ToSqlOutput::Owned(SqlValue::Real(f64::from(*v))),
            Value::Float64(v) => ToSqlOutput::Owned(SqlValue::Real(*v)),
            Value::String(v) => ToSqlOutput::Borrowed(ValueRef::Text(v.as_bytes())),
            Value::Timestamp(v) => ToSqlOutput::Owned(SqlValue::Text(format_timestamp(v))),
            Value::Byte(v) => ToSqlOutput::Owned(SqlValue::Integer(i64::from(*v))),
            Value::RawBytes(v) => ToSqlOutput::Borrowed(ValueRef::Blob(v)),
        };
        Ok(output)
    }
}

/// Build the INSERT statement for a table
pub fn insert_statement(table: &TableInfo, dialect: DialectConfig) -> String {
    let mut target = dialect.quote_identifier(&table.name);
    if !table.schema.is_empty() {
        target = format!("{}.{}", dialect.quote_identifier(&table.schema), target);
    }
    let columns = table
        .column_names()
        .iter()
        .map(|name| dialect.quote_identifier(name))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = (1..=table.columns.len())
        .map(|i| dialect.placeholder(i))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        target,
        columns,
        placeholders
    )
}

/// Writes each tuple as one row of a table
pub struct SqlTupleWriter<'a, E: SqlExecutor + ?Sized> {
    executor: &'a E,
    insert: String,
    guard: ShapeGuard,
    rows_written: u64,
}

impl<'a, E: SqlExecutor + ?Sized> SqlTupleWriter<'a, E> {
    /// Create a sink for `table`, whose expected shape is derived from its columns
    pub fn new(executor: &'a E, table: &TableInfo, dialect: DialectConfig) -> Result<Self, CodecError> {
        let shape = shape_of_table(table)?;
        Ok(Self {
            executor,
            insert: insert_statement(table, dialect),
            guard: ShapeGuard::fixed(shape),
            rows_written: 0,
        })
    }

    /// The INSERT statement executed per tuple
    pub fn statement(&self) -> &str {
        &self.insert
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }
}

impl<E: SqlExecutor + ?Sized> TupleWriter for SqlTupleWriter<'_, E> {
    fn write_tuple(&mut self, row: &Tuple) -> Result<(), CodecError> {
        self.guard.check(row)?;
        let params: Vec<&Value> = row.values().collect();
        self.executor.execute_params(&self.insert, &params)?;
        self.rows_written += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), CodecError> {
        debug!("SQL sink flushed after {} rows; commit is left to the caller", self.rows_written);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use stagebridge_core::ColumnInfo;

    fn table() -> TableInfo {
        TableInfo::new(
            "test_table",
            "main",
            vec![
                ColumnInfo::new("c_id", "BIGINT"),
                ColumnInfo::new("c_varchar", "VARCHAR").with_nullable(true),
            ],
        )
    }

    #[test]
    fn insert_statement_uses_dialect_placeholders() {
        assert_eq!(
            insert_statement(&table(), DialectConfig::Sqlite),
            "INSERT INTO \"main\".\"test_table\" (\"c_id\", \"c_varchar\") VALUES (?, ?)"
        );
        assert_eq!(
            insert_statement(&table(), DialectConfig::Postgres),
            "INSERT INTO \"main\".\"test_table\" (\"c_id\", \"c_varchar\") VALUES ($1, $2)"
        );
    }

    #[test]
    fn inserts_into_reserved_and_mixed_case_names() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute("CREATE TABLE \"order\" (\"select\" BIGINT NOT NULL, \"Unit Price\" DOUBLE)", [])
            .unwrap();
        let table = TableInfo::new(
            "order",
            "main",
            vec![
                ColumnInfo::new("select", "BIGINT"),
                ColumnInfo::new("Unit Price", "FLOAT").with_nullable(true),
            ],
        );

        let mut writer = SqlTupleWriter::new(&conn, &table, DialectConfig::Sqlite).unwrap();
        let mut row = Tuple::new(shape_of_table(&table).unwrap());
        row.set(0, Value::Int64(7)).unwrap();
        row.set(1, Value::Float64(2.5)).unwrap();
        writer.write_tuple(&row).unwrap();

        let (id, price): (i64, f64) = conn
            .query_row("SELECT \"select\", \"Unit Price\" FROM \"order\"", [], |r| {
                Ok((r.get(0)?, r.get(1)?))
            })
            .unwrap();
        assert_eq!((id, price), (7, 2.5));
    }

    #[test]
    fn rows_are_not_visible_until_caller_commits() {
        let mut conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute("CREATE TABLE test_table (c_id BIGINT NOT NULL, c_varchar VARCHAR)", [])
            .unwrap();

        let tx = conn.transaction().unwrap();
        {
            let mut writer = SqlTupleWriter::new(&tx, &table(), DialectConfig::Sqlite).unwrap();
            let mut row = Tuple::new(shape_of_table(&table()).unwrap());
            row.set(0, Value::Int64(1)).unwrap();
            row.set(1, Value::String("x".into())).unwrap();
            writer.write_tuple(&row).unwrap();
            writer.flush().unwrap();
            assert_eq!(writer.rows_written(), 1);
        }
        tx.rollback().unwrap();

        let count: i64 = conn
            .query_row("SELECT count(*) FROM test_table", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn rejects_tuple_of_other_shape() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        let mut writer = SqlTupleWriter::new(&conn, &table(), DialectConfig::Sqlite).unwrap();
        let err = writer
            .write_tuple(&Tuple::new(vec![stagebridge_core::SlotKind::required(
                stagebridge_core::ValueKind::Int64,
            )]))
            .unwrap_err();
        assert!(err.is_shape_mismatch());
    }

    #[test]
    fn unsupported_column_type_fails_at_construction() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        let table = TableInfo::new("t", "main", vec![ColumnInfo::new("v", "VARIANT")]);
        assert!(SqlTupleWriter::new(&conn, &table, DialectConfig::Sqlite).is_err());
    }
}
