//! Tuple codecs, materialization and copying
//!
//! Every format provides a [`TupleWriter`] and, where it can be read back, a
//! [`TupleReader`]. Writers fix their expected shape either at construction or
//! from the first tuple they see, and reject anything that disagrees with it.
//!
//! ## Example
//!
//! ```rust,ignore
//! use stagebridge_codec::{materialize, CsvWriter, SqliteCursor};
//!
//! let mut stmt = conn.prepare("SELECT * FROM orders")?;
//! let mut cursor = SqliteCursor::query(&mut stmt, [])?;
//! let mut writer = CsvWriter::with_header(std::io::stdout(), cursor.column_names());
//! let result = materialize(&mut writer, &mut cursor)?;
//! ```

pub mod copy;
pub mod csv;
pub mod json;
pub mod materialize;
pub mod sql;
pub mod sqlite;
mod text;

pub use copy::copy;
pub use self::csv::{CsvReader, CsvWriter};
pub use json::{JsonReader, JsonWriter};
pub use materialize::{materialize, Cursor, MaterializationResult, MemoryCursor};
pub use sql::{SqlExecutor, SqlTupleWriter};
pub use sqlite::{table_info, SqliteCursor};

use stagebridge_core::{SlotKind, Tuple, TupleError};

/// Errors raised while encoding, decoding or moving tuples
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error(transparent)]
    Tuple(#[from] TupleError),

    /// A field could not be decoded into its slot's kind
    #[error("Parse error at slot {slot}: {message}")]
    Parse { slot: usize, message: String },

    #[error("CSV error: {0}")]
    Csv(#[from] ::csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("SQL error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Table not found: {0}")]
    TableNotFound(String),

    /// Failure reported by a cursor implementation outside this crate
    #[error("Cursor error: {0}")]
    Cursor(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl CodecError {
    pub(crate) fn parse(slot: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            slot,
            message: message.into(),
        }
    }

    /// Whether the stream was aborted because a tuple had the wrong shape
    pub fn is_shape_mismatch(&self) -> bool {
        matches!(self, Self::Tuple(e) if e.is_shape_mismatch())
    }
}

/// Sink for a stream of tuples
pub trait TupleWriter {
    /// Append one tuple, in slot order
    fn write_tuple(&mut self, row: &Tuple) -> Result<(), CodecError>;

    /// Finalize the stream
    ///
    /// Safe to call on an empty stream and more than once.
    fn flush(&mut self) -> Result<(), CodecError>;
}

/// Source of a stream of tuples
pub trait TupleReader {
    /// Read the next tuple into `row`, using its slot kinds as the expected shape
    ///
    /// Returns `Ok(false)` once the stream is exhausted.
    fn next(&mut self, row: &mut Tuple) -> Result<bool, CodecError>;
}

impl<W: TupleWriter + ?Sized> TupleWriter for &mut W {
    fn write_tuple(&mut self, row: &Tuple) -> Result<(), CodecError> {
        (**self).write_tuple(row)
    }

    fn flush(&mut self) -> Result<(), CodecError> {
        (**self).flush()
    }
}

impl<W: TupleWriter + ?Sized> TupleWriter for Box<W> {
    fn write_tuple(&mut self, row: &Tuple) -> Result<(), CodecError> {
        (**self).write_tuple(row)
    }

    fn flush(&mut self) -> Result<(), CodecError> {
        (**self).flush()
    }
}

impl<R: TupleReader + ?Sized> TupleReader for &mut R {
    fn next(&mut self, row: &mut Tuple) -> Result<bool, CodecError> {
        (**self).next(row)
    }
}

impl<R: TupleReader + ?Sized> TupleReader for Box<R> {
    fn next(&mut self, row: &mut Tuple) -> Result<bool, CodecError> {
        (**self).next(row)
    }
}

/// Expected shape of a writer's stream, fixed by the first tuple unless given
#[derive(Debug, Default)]
pub(crate) struct ShapeGuard {
    expected: Option<Vec<SlotKind>>,
}

impl ShapeGuard {
    pub(crate) fn fixed(shape: Vec<SlotKind>) -> Self {
        Self {
            expected: Some(shape),
        }
    }

    pub(crate) fn check(&mut self, row: &Tuple) -> Result<(), TupleError> {
        match &self.expected {
            Some(expected) => row.check_shape(expected),
            None => {
                self.expected = Some(row.shape());
                Ok(())
            }
        }
    }
}
