//! Stage command text and result row layouts

use crate::client::Row;
use crate::error::StageError;
use serde::{Deserialize, Serialize};
use stagebridge_core::ExportConfig;
use std::path::Path;

/// Bulk copy of the export query into `location`
pub fn copy_into_command(config: &ExportConfig, location: &str) -> String {
    let mut command = format!("COPY INTO @{} FROM ({})", location, config.query.trim());
    if let Some(expr) = &config.partition_by {
        command.push_str(&format!(" PARTITION BY ({})", expr));
    }
    command.push_str(&format!(" FILE_FORMAT = (TYPE = {}", config.file_format));
    if let Some(compression) = &config.compression {
        command.push_str(&format!(" COMPRESSION = {}", compression.to_uppercase()));
    }
    command.push_str(&format!(") MAX_FILE_SIZE = {}", config.max_file_size));
    command
}

/// Listing of every object under `location`
pub fn list_command(location: &str) -> String {
    format!("LIST @{}", location)
}

/// Download of the object(s) at `path` into a local directory
pub fn get_command(path: &str, dir: &Path) -> String {
    format!("GET @{} file://{} overwrite=true", path, dir.display())
}

/// External path a pointer file records for a listed object
///
/// Listings of named stages already include the stage name, lower-cased when
/// the identifier is unquoted; table stages report names relative to the stage.
pub fn qualify_staged_name(stage: &str, name: &str) -> String {
    let (head, rest) = match (name.get(..stage.len()), name.get(stage.len()..)) {
        (Some(head), Some(rest)) => (head, rest),
        _ => ("", name),
    };
    if head.eq_ignore_ascii_case(stage) && rest.starts_with('/') {
        format!("{}{}", stage, rest)
    } else {
        format!("{}/{}", stage, name.trim_start_matches('/'))
    }
}

fn cell<'r>(command: &str, row: &'r Row, idx: usize, column: &str) -> Result<&'r str, StageError> {
    row.get(idx)
        .map(String::as_str)
        .ok_or_else(|| StageError::malformed(command, format!("row has no {} column", column)))
}

fn size(command: &str, text: &str) -> Result<u64, StageError> {
    text.trim()
        .parse()
        .map_err(|_| StageError::malformed(command, format!("invalid size {:?}", text)))
}

/// One object reported by a listing command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedFile {
    pub name: String,
    pub size: u64,
    pub md5: String,
    pub last_modified: String,
}

impl StagedFile {
    /// Parse a `(name, size, md5, last_modified)` row
    pub fn from_row(command: &str, row: &Row) -> Result<Self, StageError> {
        if row.len() < 4 {
            return Err(StageError::malformed(
                command,
                format!("expected 4 columns, found {}", row.len()),
            ));
        }
        Ok(Self {
            name: cell(command, row, 0, "name")?.to_string(),
            size: size(command, cell(command, row, 1, "size")?)?,
            md5: cell(command, row, 2, "md5")?.to_string(),
            last_modified: cell(command, row, 3, "last_modified")?.to_string(),
        })
    }
}

/// One file reported by a retrieval command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievedFile {
    pub file: String,
    pub size: u64,
    pub status: String,
    pub message: String,
}

impl RetrievedFile {
    /// Parse a `(file, size, status, message)` row
    pub fn from_row(command: &str, row: &Row) -> Result<Self, StageError> {
        if row.len() < 4 {
            return Err(StageError::malformed(
                command,
                format!("expected 4 columns, found {}", row.len()),
            ));
        }
        Ok(Self {
            file: cell(command, row, 0, "file")?.to_string(),
            size: size(command, cell(command, row, 1, "size")?)?,
            status: cell(command, row, 2, "status")?.to_string(),
            message: cell(command, row, 3, "message")?.to_string(),
        })
    }
}
