//! Bulk import: resolve pointer files into the staged bytes they reference
//!
//! Every pointer file under the input directory becomes exactly one output
//! file at the same relative path, holding the concatenation of every object
//! the retrieval returned for that pointer.

use crate::client::StageClient;
use crate::commands::{get_command, RetrievedFile};
use crate::error::StageError;
use crate::pump::{bijective_map, identity_path};
use stagebridge_core::ImportConfig;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Runs the import phase against a stage client
pub struct StageImporter<'a, C: StageClient + ?Sized> {
    client: &'a C,
    config: ImportConfig,
    temp_root: Option<PathBuf>,
}

impl<'a, C: StageClient + ?Sized> StageImporter<'a, C> {
    pub fn new(client: &'a C, config: ImportConfig) -> Self {
        Self {
            client,
            config,
            temp_root: None,
        }
    }

    /// Create per-pointer download directories under `root` instead of the
    /// system temp directory
    pub fn with_temp_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.temp_root = Some(root.into());
        self
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// Execute the import, returning the number of files written
    pub async fn run(&self) -> Result<usize, StageError> {
        let client = self.client;
        let temp_root = self.temp_root.as_deref();

        let count = bijective_map(
            &self.config.input_dir,
            &self.config.output_dir,
            identity_path,
            move |bytes| retrieve(client, temp_root, bytes),
        )
        .await?;

        info!(
            "Imported {} files into {}",
            count,
            self.config.output_dir.display()
        );
        Ok(count)
    }
}

/// Fetch every object a pointer references and return their concatenation
///
/// The download directory is removed when this returns, on success or failure.
async fn retrieve<C: StageClient + ?Sized>(
    client: &C,
    temp_root: Option<&Path>,
    pointer: Vec<u8>,
) -> Result<Vec<u8>, StageError> {
    let path = String::from_utf8(pointer)
        .map_err(|e| StageError::InvalidPointer(format!("pointer is not UTF-8: {}", e)))?;
    let path = path.trim();
    if path.is_empty() {
        return Err(StageError::InvalidPointer("pointer file is empty".into()));
    }

    let builder = {
        let mut builder = tempfile::Builder::new();
        builder.prefix("stagebridge-get");
        builder
    };
    let download = match temp_root {
        Some(root) => builder.tempdir_in(root).map_err(StageError::io(root))?,
        None => builder
            .tempdir()
            .map_err(StageError::io(&std::env::temp_dir()))?,
    };

    let command = get_command(path, download.path());
    info!("Executing query: {}", command);
    let rows = client
        .query(&command)
        .await
        .map_err(StageError::external(&command))?;
    for row in &rows {
        let file = RetrievedFile::from_row(&command, row)?;
        info!(
            "Retrieved {} ({} bytes): {} {}",
            file.file, file.size, file.status, file.message
        );
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(download.path()).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }

    let mut output = Vec::new();
    for file in &files {
        let bytes = tokio::fs::read(file).await.map_err(StageError::io(file))?;
        output.extend_from_slice(&bytes);
    }
    debug!("Pointer {} resolved to {} files, {} bytes", path, files.len(), output.len());

    Ok(output)
}
