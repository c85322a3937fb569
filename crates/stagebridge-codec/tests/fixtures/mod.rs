//! Test fixtures for codec integration tests
//!
//! The test table mirrors the column set used against real warehouses: one
//! column per supported vendor type, each with a nullable sibling.

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use stagebridge_codec::{CodecError, TupleWriter};
use stagebridge_core::{ColumnInfo, TableInfo, Tuple, Value, ValueKind};

/// DDL for the test table in SQLite
pub const CREATE_TEST_TABLE: &str = "CREATE TABLE test_table (
    c_id NUMBER NOT NULL,
    c_smallint SMALLINT NOT NULL,
    c_smallint_null SMALLINT,
    c_int INTEGER NOT NULL,
    c_int_null INTEGER,
    c_bigint BIGINT NOT NULL,
    c_bigint_null BIGINT,
    c_float FLOAT NOT NULL,
    c_float_null FLOAT,
    c_varchar VARCHAR(100) NOT NULL,
    c_varchar_null VARCHAR(100),
    c_time TIMESTAMP NOT NULL,
    c_time_null TIMESTAMP
)";

/// Schema record for the test table, as introspection reports it
pub fn test_table_info() -> TableInfo {
    let pair = |name: &str, data_type: &str| {
        vec![
            ColumnInfo::new(format!("c_{}", name), data_type),
            ColumnInfo::new(format!("c_{}_null", name), data_type).with_nullable(true),
        ]
    };

    let mut columns = vec![ColumnInfo::new("c_id", "NUMBER").with_precision(38, 0)];
    columns.extend(pair("smallint", "SMALLINT"));
    columns.extend(pair("int", "INTEGER"));
    columns.extend(pair("bigint", "BIGINT"));
    columns.extend(pair("float", "FLOAT"));
    columns.extend(pair("varchar", "VARCHAR"));
    columns.extend(pair("time", "TIMESTAMP"));
    TableInfo::new("test_table", "main", columns)
}

/// Column names of the test table
pub fn test_field_names() -> Vec<String> {
    test_table_info()
        .columns
        .iter()
        .map(|c| c.name.clone())
        .collect()
}

const STRING_ALPHABET: [char; 12] = ['a', 'Z', '0', ' ', ',', '"', '\n', '\\', 'N', 'é', '\t', '\''];

fn random_string(rng: &mut StdRng) -> String {
    let len = rng.gen_range(0..12);
    (0..len)
        .map(|_| STRING_ALPHABET[rng.gen_range(0..STRING_ALPHABET.len())])
        .collect()
}

fn random_value(rng: &mut StdRng, kind: ValueKind) -> Value {
    match kind {
        ValueKind::Bool => Value::Bool(rng.gen()),
        ValueKind::Int16 => Value::Int16(rng.gen()),
        ValueKind::Int32 => Value::Int32(rng.gen()),
        ValueKind::Int64 => Value::Int64(rng.gen()),
        ValueKind::Float32 => Value::Float32(rng.gen_range(-1.0e6..1.0e6)),
        ValueKind::Float64 => Value::Float64(rng.gen_range(-1.0e12..1.0e12)),
        ValueKind::String => Value::String(random_string(rng)),
        ValueKind::Timestamp => {
            let ts = NaiveDate::from_ymd_opt(rng.gen_range(1970..2100), rng.gen_range(1..=12), rng.gen_range(1..=28))
                .and_then(|d| {
                    d.and_hms_micro_opt(
                        rng.gen_range(0..24),
                        rng.gen_range(0..60),
                        rng.gen_range(0..60),
                        rng.gen_range(0..1_000_000),
                    )
                })
                .unwrap();
            Value::Timestamp(ts)
        }
        ValueKind::Byte => Value::Byte(rng.gen()),
        ValueKind::RawBytes => Value::RawBytes((0..rng.gen_range(0..16)).map(|_| rng.gen()).collect()),
    }
}

/// Fill a tuple with random values, leaving nullable slots NULL a third of the time
pub fn randomize(rng: &mut StdRng, row: &mut Tuple) {
    for (slot, kind) in row.shape().into_iter().enumerate() {
        let value = if kind.is_nullable() && rng.gen_bool(1.0 / 3.0) {
            Value::Null
        } else {
            random_value(rng, kind.kind())
        };
        row.set(slot, value).unwrap();
    }
}

/// `count` random tuples of the given template's shape, reproducible by seed
pub fn random_tuples(template: &Tuple, count: usize, seed: u64) -> Vec<Tuple> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let mut row = template.clone();
            randomize(&mut rng, &mut row);
            row
        })
        .collect()
}

/// Writer that keeps every tuple and counts flushes
#[derive(Debug, Default)]
pub struct RecordingWriter {
    pub rows: Vec<Tuple>,
    pub flushes: usize,
}

impl TupleWriter for RecordingWriter {
    fn write_tuple(&mut self, row: &Tuple) -> Result<(), CodecError> {
        self.rows.push(row.clone());
        Ok(())
    }

    fn flush(&mut self) -> Result<(), CodecError> {
        self.flushes += 1;
        Ok(())
    }
}
