//! Stagebridge Core
//!
//! The neutral data model shared by every codec and stage phase: schema
//! records, canonical value kinds, fixed-shape tuples, and the type oracle
//! that maps driver and vendor types onto them.

pub mod config;
pub mod error;
pub mod oracle;
pub mod schema;
pub mod tuple;
pub mod value;

pub use config::{Config, ConfigError, DialectConfig, ExportConfig, FileFormat, ImportConfig, WarehouseConfig};
pub use error::TupleError;
pub use oracle::{resolve_from_driver, resolve_from_schema, shape_of_table};
pub use schema::{ColumnDescriptor, ColumnInfo, ScanType, TableInfo, VendorType};
pub use tuple::{Slot, Tuple};
pub use value::{format_timestamp, parse_timestamp, SlotKind, Value, ValueKind};
