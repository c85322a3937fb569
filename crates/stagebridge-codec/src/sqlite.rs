//! SQLite cursor and schema introspection
//!
//! SQLite reports a declared type per result column but no nullability, so
//! every cursor column resolves to a nullable slot. Declared types the oracle
//! knows map through [`VendorType`] so both type tables see the same answer;
//! a few SQLite-only spellings are mapped here.

use crate::materialize::Cursor;
use crate::CodecError;
use rusqlite::{Connection, Params, Row, Rows, Statement};
use stagebridge_core::{
    parse_timestamp, ColumnDescriptor, ColumnInfo, ScanType, TableInfo, Tuple, TupleError, Value,
    ValueKind, VendorType,
};

/// Scan type for a declared column type
pub fn scan_type_for_decl(decl: Option<&str>) -> ScanType {
    let Some(decl) = decl else {
        return ScanType::Other("UNTYPED".to_string());
    };
    let (base, _, scale) = split_type(decl);

    if let Some(vendor) = VendorType::parse(&base) {
        return vendor.driver_scan_type(scale);
    }

    match base.as_str() {
        "TINYINT" => ScanType::Byte,
        "MEDIUMINT" => ScanType::Int32,
        "FLOAT4" => ScanType::Float32,
        "DOUBLE" => ScanType::Float64,
        "CHAR" | "CHARACTER" | "CLOB" | "STRING" => ScanType::String,
        "DATETIME" => ScanType::Time,
        "BLOB" => ScanType::RawBytes,
        _ => ScanType::Other(decl.to_string()),
    }
}

/// Split `NAME(p,s)` into upper-cased name, precision and scale
///
/// Only `NUMBER`, `NUMERIC` and `DECIMAL` carry precision and scale; length
/// arguments of other types are dropped.
fn split_type(decl: &str) -> (String, u32, u32) {
    let decl = decl.trim();
    let Some(open) = decl.find('(') else {
        return (decl.to_uppercase(), 0, 0);
    };
    let base = decl[..open].trim().to_uppercase();
    if !matches!(base.as_str(), "NUMBER" | "NUMERIC" | "DECIMAL") {
        return (base, 0, 0);
    }

    let args = decl[open + 1..].trim_end_matches(')');
    let mut parts = args.split(',').map(|p| p.trim().parse::<u32>().unwrap_or(0));
    let precision = parts.next().unwrap_or(0);
    let scale = parts.next().unwrap_or(0);
    (base, precision, scale)
}

/// A live SQLite query result
pub struct SqliteCursor<'stmt> {
    rows: Rows<'stmt>,
    columns: Vec<ColumnDescriptor>,
}

impl<'stmt> SqliteCursor<'stmt> {
    /// Run a prepared statement and wrap its result
    pub fn query<P: Params>(stmt: &'stmt mut Statement<'_>, params: P) -> Result<Self, CodecError> {
        let columns = stmt
            .columns()
            .iter()
            .map(|c| ColumnDescriptor::new(c.name(), scan_type_for_decl(c.decl_type()), None))
            .collect();
        let rows = stmt.query(params)?;
        Ok(Self { rows, columns })
    }
}

impl Cursor for SqliteCursor<'_> {
    fn column_types(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    fn next_row(&mut self, row: &mut Tuple) -> Result<bool, CodecError> {
        let Some(sql_row) = self.rows.next()? else {
            return Ok(false);
        };
        let width = row.width();
        for slot in 0..width {
            let kind = row
                .kind(slot)
                .ok_or(TupleError::SlotOutOfRange { slot, width })?;
            let value = read_value(sql_row, slot, kind.kind())?;
            row.set(slot, value)?;
        }
        Ok(true)
    }
}

fn read_value(row: &Row<'_>, idx: usize, kind: ValueKind) -> Result<Value, CodecError> {
    let value = match kind {
        ValueKind::Bool => row.get::<_, Option<bool>>(idx)?.map(Value::Bool),
        ValueKind::Int16 => row.get::<_, Option<i16>>(idx)?.map(Value::Int16),
        ValueKind::Int32 => row.get::<_, Option<i32>>(idx)?.map(Value::Int32),
        ValueKind::Int64 => row.get::<_, Option<i64>>(idx)?.map(Value::Int64),
        ValueKind::Float32 => row
            .get::<_, Option<f64>>(idx)?
            .map(|v| Value::Float32(v as f32)),
        ValueKind::Float64 => row.get::<_, Option<f64>>(idx)?.map(Value::Float64),
        ValueKind::String => row.get::<_, Option<String>>(idx)?.map(Value::String),
        ValueKind::Timestamp => match row.get::<_, Option<String>>(idx)? {
            Some(text) => Some(Value::Timestamp(
                parse_timestamp(&text).map_err(|e| CodecError::parse(idx, e.to_string()))?,
            )),
            None => None,
        },
        ValueKind::Byte => row.get::<_, Option<u8>>(idx)?.map(Value::Byte),
        ValueKind::RawBytes => row.get::<_, Option<Vec<u8>>>(idx)?.map(Value::RawBytes),
    };
    Ok(value.unwrap_or(Value::Null))
}

/// Describe a table of the `main` schema
pub fn table_info(conn: &Connection, table: &str) -> Result<TableInfo, CodecError> {
    let mut stmt = conn.prepare("SELECT name, type, \"notnull\" FROM pragma_table_info(?1) ORDER BY cid")?;
    let columns = stmt
        .query_map([table], |row| {
            let name: String = row.get(0)?;
            let decl: String = row.get(1)?;
            let not_null: bool = row.get(2)?;
            Ok((name, decl, not_null))
        })?
        .map(|r| {
            let (name, decl, not_null) = r?;
            let (base, precision, scale) = split_type(&decl);
            Ok(ColumnInfo::new(name, base)
                .with_nullable(!not_null)
                .with_precision(precision, scale))
        })
        .collect::<Result<Vec<_>, CodecError>>()?;

    if columns.is_empty() {
        return Err(CodecError::TableNotFound(table.to_string()));
    }
    Ok(TableInfo::new(table, "main", columns))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materialize;
    use pretty_assertions::assert_eq;
    use stagebridge_core::{shape_of_table, SlotKind};

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE test_table (
                c_id NUMBER(38,0) NOT NULL,
                c_smallint SMALLINT NOT NULL,
                c_float_null FLOAT,
                c_varchar VARCHAR(100) NOT NULL,
                c_amount NUMBER(10,2),
                c_time TIMESTAMP
            );
            INSERT INTO test_table VALUES (1, 2, NULL, 'a', 1.25, '2024-01-01 10:00:00');
            INSERT INTO test_table VALUES (2, 3, 0.5, 'b', NULL, NULL);",
        )
        .unwrap();
        conn
    }

    #[test]
    fn decl_types_map_through_vendor_table() {
        assert_eq!(scan_type_for_decl(Some("bigint")), ScanType::Int64);
        assert_eq!(scan_type_for_decl(Some("INTEGER")), ScanType::Int32);
        assert_eq!(scan_type_for_decl(Some("NUMBER(38,0)")), ScanType::Int64);
        assert_eq!(scan_type_for_decl(Some("NUMBER(10,2)")), ScanType::Float64);
        assert_eq!(scan_type_for_decl(Some("VARCHAR(100)")), ScanType::String);
        assert_eq!(scan_type_for_decl(Some("BLOB")), ScanType::RawBytes);
        assert_eq!(scan_type_for_decl(Some("TINYINT")), ScanType::Byte);
        assert_eq!(scan_type_for_decl(Some("VARIANT")), ScanType::Other("VARIANT".into()));
        assert!(matches!(scan_type_for_decl(None), ScanType::Other(_)));
    }

    #[test]
    fn split_type_parses_precision_and_scale() {
        assert_eq!(split_type("number(10, 2)"), ("NUMBER".into(), 10, 2));
        assert_eq!(split_type("VARCHAR(100)"), ("VARCHAR".into(), 0, 0));
        assert_eq!(split_type("TEXT"), ("TEXT".into(), 0, 0));
    }

    #[test]
    fn table_info_reads_columns_in_order() {
        let conn = conn();
        let info = table_info(&conn, "test_table").unwrap();

        assert_eq!(info.qualified_name(), "main.test_table");
        assert_eq!(
            info.column_names(),
            vec!["c_id", "c_smallint", "c_float_null", "c_varchar", "c_amount", "c_time"]
        );
        let amount = info.find_column("c_amount").unwrap();
        assert_eq!((amount.precision, amount.scale), (10, 2));
        assert!(amount.is_nullable);
        assert!(!info.find_column("c_id").unwrap().is_nullable);

        assert_eq!(
            shape_of_table(&info).unwrap(),
            vec![
                SlotKind::required(ValueKind::Int64),
                SlotKind::required(ValueKind::Int16),
                SlotKind::nullable(ValueKind::Float64),
                SlotKind::required(ValueKind::String),
                SlotKind::nullable(ValueKind::Float64),
                SlotKind::nullable(ValueKind::Timestamp),
            ]
        );
    }

    #[test]
    fn missing_table() {
        let conn = conn();
        assert!(matches!(
            table_info(&conn, "nope"),
            Err(CodecError::TableNotFound(_))
        ));
    }

    #[test]
    fn cursor_reads_typed_rows() {
        let conn = conn();
        let mut stmt = conn.prepare("SELECT * FROM test_table ORDER BY c_id").unwrap();
        let mut cursor = SqliteCursor::query(&mut stmt, []).unwrap();

        let mut row = Tuple::from_descriptors(cursor.column_types()).unwrap();
        assert!(cursor.next_row(&mut row).unwrap());
        assert_eq!(
            row.values().cloned().collect::<Vec<_>>(),
            vec![
                Value::Int64(1),
                Value::Int16(2),
                Value::Null,
                Value::String("a".into()),
                Value::Float64(1.25),
                Value::Timestamp(parse_timestamp("2024-01-01T10:00:00").unwrap()),
            ]
        );
        assert!(cursor.next_row(&mut row).unwrap());
        assert_eq!(row.get(2), Some(&Value::Float64(0.5)));
        assert_eq!(row.get(5), Some(&Value::Null));
        assert!(!cursor.next_row(&mut row).unwrap());
    }

    #[test]
    fn materialize_sqlite_result_to_csv() {
        let conn = conn();
        let mut stmt = conn
            .prepare("SELECT c_id, c_varchar FROM test_table ORDER BY c_id")
            .unwrap();
        let mut cursor = SqliteCursor::query(&mut stmt, []).unwrap();
        let mut writer = crate::CsvWriter::new(Vec::new());

        let result = materialize(&mut writer, &mut cursor).unwrap();
        assert_eq!(result.column_names, vec!["c_id", "c_varchar"]);
        assert_eq!(result.row_count, 2);
        assert_eq!(
            String::from_utf8(writer.into_inner().unwrap()).unwrap(),
            "1,a\n2,b\n"
        );
    }
}
