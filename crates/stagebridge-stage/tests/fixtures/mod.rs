//! Test fixtures for export/import integration tests
//!
//! Each fixture lays out the directories a run works on inside one temporary
//! root, so a test only has to hold on to the returned guard.

use stagebridge_core::{ExportConfig, FileFormat, ImportConfig};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const STAGE: &str = "%orders";
pub const JOB: &str = "nightly";
pub const TIMESTAMP: i64 = 1_700_000_000;

/// CSV chunks a warehouse might produce for a three-row orders export
pub fn orders_chunks() -> Vec<Vec<u8>> {
    vec![
        b"1,widget,9.5\n2,gadget,12\n".to_vec(),
        b"3,gizmo,\\N\n".to_vec(),
    ]
}

/// Directories for one export/import round
pub struct Workspace {
    pub root: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir(root.path().join("trigger")).unwrap();
        std::fs::create_dir(root.path().join("downloads")).unwrap();
        Self { root }
    }

    pub fn trigger_dir(&self) -> PathBuf {
        self.root.path().join("trigger")
    }

    pub fn pointer_dir(&self) -> PathBuf {
        self.root.path().join("pointers")
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.path().join("data")
    }

    /// Temp root for import downloads, so leftovers can be inspected
    pub fn download_dir(&self) -> PathBuf {
        self.root.path().join("downloads")
    }

    pub fn write_marker(&self, timestamp: i64) {
        std::fs::write(self.trigger_dir().join("marker"), timestamp.to_string()).unwrap();
    }

    pub fn export_config(&self) -> ExportConfig {
        ExportConfig::new(
            self.trigger_dir(),
            self.pointer_dir(),
            "SELECT id, name, price FROM orders",
            STAGE,
            JOB,
        )
        .with_format(FileFormat::Csv, Some("none".to_string()))
    }

    pub fn import_config(&self) -> ImportConfig {
        ImportConfig::new(self.pointer_dir(), self.data_dir())
    }
}

/// Names of the regular files directly in `dir`, sorted
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
