//! Bulk export: stage a query result and write one pointer file per object
//!
//! The run is keyed by a trigger marker, a small file in the input directory
//! whose content is an integer timestamp. Objects are staged under
//! `{stage}/{job_name}/{timestamp}`, listed, and recorded locally as pointer
//! files named `0`, `1`, ... in listing order. The output directory must be
//! absent or empty when the run starts. Staged objects are never cleaned up
//! here, even when a later step fails.

use crate::client::StageClient;
use crate::commands::{copy_into_command, list_command, qualify_staged_name, StagedFile};
use crate::error::StageError;
use serde::{Deserialize, Serialize};
use stagebridge_core::ExportConfig;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Outcome of an export run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportSummary {
    /// Timestamp read from the trigger marker
    pub timestamp: i64,

    /// Namespaced stage location the objects were copied to
    pub location: String,

    /// Objects reported by the listing, in listing order
    pub staged: Vec<StagedFile>,

    /// Pointer files written, one per staged object
    pub pointers: Vec<PathBuf>,
}

/// Read the trigger marker's timestamp
///
/// With a configured file name only that file is read; otherwise the input
/// directory must contain exactly one regular file.
pub async fn read_trigger_marker(input_dir: &Path, trigger_file: Option<&str>) -> Result<i64, StageError> {
    if !input_dir.is_dir() {
        return Err(StageError::MissingTriggerMarker(format!(
            "input directory {} does not exist",
            input_dir.display()
        )));
    }

    let path = match trigger_file {
        Some(name) => {
            let path = input_dir.join(name);
            if !path.is_file() {
                return Err(StageError::MissingTriggerMarker(path.display().to_string()));
            }
            path
        }
        None => {
            let mut files = Vec::new();
            for entry in WalkDir::new(input_dir).min_depth(1).max_depth(1).sort_by_file_name() {
                let entry = entry?;
                if entry.file_type().is_file() {
                    files.push(entry.into_path());
                }
            }
            match files.len() {
                0 => {
                    return Err(StageError::MissingTriggerMarker(format!(
                        "no file in {}",
                        input_dir.display()
                    )))
                }
                1 => files.remove(0),
                n => {
                    return Err(StageError::InvalidTriggerMarker {
                        path: input_dir.display().to_string(),
                        reason: format!("expected exactly one file, found {}", n),
                    })
                }
            }
        }
    };

    let content = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| StageError::InvalidTriggerMarker {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

    content
        .trim()
        .parse::<i64>()
        .map_err(|e| StageError::InvalidTriggerMarker {
            path: path.display().to_string(),
            reason: format!("{:?} is not an integer timestamp: {}", content.trim(), e),
        })
}

/// Reject an output directory that already holds files
///
/// Pointer numbering restarts at zero on every run.
async fn ensure_fresh_output(output_dir: &Path) -> Result<(), StageError> {
    if !output_dir.exists() {
        return Ok(());
    }
    for entry in WalkDir::new(output_dir).min_depth(1) {
        if entry?.file_type().is_file() {
            return Err(StageError::OutputNotEmpty(output_dir.display().to_string()));
        }
    }
    Ok(())
}

/// Runs the export phase against a stage client
pub struct StageExporter<'a, C: StageClient + ?Sized> {
    client: &'a C,
    config: ExportConfig,
}

impl<'a, C: StageClient + ?Sized> StageExporter<'a, C> {
    /// Create an exporter, rejecting configurations that cannot produce a valid copy
    pub fn new(client: &'a C, config: ExportConfig) -> Result<Self, StageError> {
        config.validate()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Namespaced stage location for a run keyed by `timestamp`
    pub fn location(&self, timestamp: i64) -> String {
        format!("{}/{}/{}", self.config.stage, self.config.job_name, timestamp)
    }

    /// Execute the export
    pub async fn run(&self) -> Result<ExportSummary, StageError> {
        let timestamp =
            read_trigger_marker(&self.config.input_dir, self.config.trigger_file.as_deref()).await?;
        let location = self.location(timestamp);

        let output_dir = &self.config.output_dir;
        ensure_fresh_output(output_dir).await?;

        let copy = copy_into_command(&self.config, &location);
        info!("Executing query: {}", copy);
        self.client
            .execute(&copy)
            .await
            .map_err(StageError::external(&copy))?;

        let list = list_command(&location);
        info!("Executing query: {}", list);
        let rows = self
            .client
            .query(&list)
            .await
            .map_err(StageError::external(&list))?;
        let staged = rows
            .iter()
            .map(|row| StagedFile::from_row(&list, row))
            .collect::<Result<Vec<_>, _>>()?;

        // exists even when nothing was staged
        tokio::fs::create_dir_all(output_dir)
            .await
            .map_err(StageError::io(output_dir))?;

        if staged.is_empty() {
            info!("Zero files exported to @{}", location);
            return Ok(ExportSummary {
                timestamp,
                location,
                staged,
                pointers: Vec::new(),
            });
        }

        let mut pointers = Vec::with_capacity(staged.len());
        for (ordinal, file) in staged.iter().enumerate() {
            let pointer = output_dir.join(ordinal.to_string());
            let external = qualify_staged_name(&self.config.stage, &file.name);
            tokio::fs::write(&pointer, external.as_bytes())
                .await
                .map_err(StageError::io(&pointer))?;
            debug!("Pointer {} -> {} ({} bytes)", pointer.display(), external, file.size);
            pointers.push(pointer);
        }

        info!("Exported {} files to @{}", pointers.len(), location);
        Ok(ExportSummary {
            timestamp,
            location,
            staged,
            pointers,
        })
    }
}
