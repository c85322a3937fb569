//! Schema records and the two type vocabularies resolved by the oracle
//!
//! [`ColumnInfo`] / [`TableInfo`] come from information-schema introspection and
//! carry vendor type names. [`ColumnDescriptor`] comes from a live cursor and
//! carries the driver's scan type.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A column as reported by schema introspection
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnInfo {
    /// Column name
    pub name: String,

    /// Vendor type name, upper case (e.g. "NUMBER", "VARCHAR")
    pub data_type: String,

    /// Whether the column accepts NULL
    pub is_nullable: bool,

    /// Numeric precision, 0 when not applicable
    pub precision: u32,

    /// Numeric scale, 0 when not applicable
    pub scale: u32,
}

impl ColumnInfo {
    /// Create a non-nullable column without precision or scale
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            is_nullable: false,
            precision: 0,
            scale: 0,
        }
    }

    /// Set nullability
    pub fn with_nullable(mut self, is_nullable: bool) -> Self {
        self.is_nullable = is_nullable;
        self
    }

    /// Set numeric precision and scale
    pub fn with_precision(mut self, precision: u32, scale: u32) -> Self {
        self.precision = precision;
        self.scale = scale;
        self
    }
}

/// A table as reported by schema introspection
///
/// Column order defines tuple slot order everywhere downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableInfo {
    /// Table name
    pub name: String,

    /// Schema the table lives in
    pub schema: String,

    /// Ordered list of columns
    pub columns: Vec<ColumnInfo>,
}

impl TableInfo {
    pub fn new(name: impl Into<String>, schema: impl Into<String>, columns: Vec<ColumnInfo>) -> Self {
        Self {
            name: name.into(),
            schema: schema.into(),
            columns,
        }
    }

    /// Schema-qualified name, or the bare name when no schema is known
    pub fn qualified_name(&self) -> String {
        if self.schema.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.schema, self.name)
        }
    }

    /// Get column names
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Find a column by name
    pub fn find_column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }
}

impl fmt::Display for TableInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.qualified_name())
    }
}

/// Scan type reported by a live driver for a result column
///
/// The `Null*` variants are the nullable siblings some drivers report instead
/// of a nullability flag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScanType {
    Bool,
    NullBool,
    Int16,
    NullInt16,
    Int32,
    NullInt32,
    Int64,
    NullInt64,
    Float32,
    Float64,
    NullFloat64,
    String,
    NullString,
    Time,
    NullTime,
    Byte,
    NullByte,
    RawBytes,
    /// Anything the driver reports that has no canonical mapping
    Other(String),
}

impl fmt::Display for ScanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Other(name) => write!(f, "{}", name),
            other => write!(f, "{:?}", other),
        }
    }
}

/// Type descriptor of one live result column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Column name
    pub name: String,

    /// Scan type reported by the driver
    pub scan_type: ScanType,

    /// Reported nullability, `None` when the driver cannot tell
    pub nullable: Option<bool>,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, scan_type: ScanType, nullable: Option<bool>) -> Self {
        Self {
            name: name.into(),
            scan_type,
            nullable,
        }
    }
}

/// Information-schema type names understood by the oracle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VendorType {
    /// Snowflake `NUMBER`, integral or fractional depending on scale
    Number,
    Boolean,
    SmallInt,
    Integer,
    BigInt,
    Float,
    Varchar,
    Timestamp,
}

impl VendorType {
    /// Every vendor type, for table-completeness checks
    pub const ALL: [VendorType; 8] = [
        Self::Number,
        Self::Boolean,
        Self::SmallInt,
        Self::Integer,
        Self::BigInt,
        Self::Float,
        Self::Varchar,
        Self::Timestamp,
    ];

    /// Parse a vendor type name
    ///
    /// Matching ignores surrounding whitespace and case.
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim().to_uppercase();
        let parsed = match name.as_str() {
            "NUMBER" => Self::Number,
            "BOOL" | "BOOLEAN" => Self::Boolean,
            "SMALLINT" | "INT2" => Self::SmallInt,
            "INTEGER" | "INT" | "INT4" => Self::Integer,
            "BIGINT" | "INT8" => Self::BigInt,
            "FLOAT" | "FLOAT8" | "REAL" | "DOUBLE PRECISION" => Self::Float,
            "VARCHAR" | "TEXT" | "CHARACTER VARYING" => Self::Varchar,
            "DATE" | "TIMESTAMP" | "TIMESTAMP_NTZ" | "TIMESTAMP WITHOUT TIME ZONE" => Self::Timestamp,
            _ => return None,
        };
        Some(parsed)
    }

    /// Every spelling that [`VendorType::parse`] accepts for this type
    pub fn names(&self) -> &'static [&'static str] {
        match self {
            Self::Number => &["NUMBER"],
            Self::Boolean => &["BOOL", "BOOLEAN"],
            Self::SmallInt => &["SMALLINT", "INT2"],
            Self::Integer => &["INTEGER", "INT", "INT4"],
            Self::BigInt => &["BIGINT", "INT8"],
            Self::Float => &["FLOAT", "FLOAT8", "REAL", "DOUBLE PRECISION"],
            Self::Varchar => &["VARCHAR", "TEXT", "CHARACTER VARYING"],
            Self::Timestamp => &["DATE", "TIMESTAMP", "TIMESTAMP_NTZ", "TIMESTAMP WITHOUT TIME ZONE"],
        }
    }

    /// Scan type a driver reports for a column of this vendor type
    ///
    /// `scale` only matters for `NUMBER`.
    pub fn driver_scan_type(&self, scale: u32) -> ScanType {
        match self {
            Self::Number if scale == 0 => ScanType::Int64,
            Self::Number => ScanType::Float64,
            Self::Boolean => ScanType::Bool,
            Self::SmallInt => ScanType::Int16,
            Self::Integer => ScanType::Int32,
            Self::BigInt => ScanType::Int64,
            Self::Float => ScanType::Float64,
            Self::Varchar => ScanType::String,
            Self::Timestamp => ScanType::Time,
        }
    }
}
