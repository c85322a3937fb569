//! In-memory stage client for testing
//!
//! `MockStage` understands the three stage commands the export and import
//! phases issue and keeps staged objects in memory. It does not connect to
//! any warehouse. It's useful for:
//! - Unit testing the export and import phases
//! - Running the CLI without credentials
//! - Simulating command failures and latency
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stagebridge_stage::{MockStage, StageClient};
//!
//! // Every COPY INTO produces two objects with these contents
//! let stage = MockStage::new().with_export_files(vec![b"1,a\n".to_vec(), b"2,b\n".to_vec()]);
//!
//! stage.execute("COPY INTO @%t/job/1 FROM (select 1) ...").await?;
//! let rows = stage.query("LIST @%t/job/1").await?;
//! assert_eq!(rows.len(), 2);
//! ```
//!
//! ## Simulating Failures
//!
//! ```rust,ignore
//! let stage = MockStage::new().with_failure(CommandKind::List);
//! assert!(stage.query("LIST @s").await.is_err());
//! ```

use crate::client::{Row, StageClient};
use crate::error::ClientError;
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashSet};
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

const LAST_MODIFIED: &str = "Mon, 1 Jan 2024 00:00:00 GMT";

/// Stage commands the mock recognises
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    CopyInto,
    List,
    Get,
    Other,
}

impl CommandKind {
    /// Classify a command by its leading keywords
    pub fn of(command: &str) -> Self {
        let upper = command.trim_start().to_ascii_uppercase();
        if upper.starts_with("COPY INTO") {
            Self::CopyInto
        } else if upper.starts_with("LIST") {
            Self::List
        } else if upper.starts_with("GET") {
            Self::Get
        } else {
            Self::Other
        }
    }
}

/// Mock stage client for testing
///
/// Objects are keyed by their full stage path, e.g. `%orders/job/5/data_0_0_0`.
/// Listings report names relative to the stage, the way table stages do.
pub struct MockStage {
    /// Staged objects by full path
    objects: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,

    /// Every command received, in order
    commands: Arc<RwLock<Vec<String>>>,

    /// Contents of the objects a COPY INTO creates
    export_files: Vec<Vec<u8>>,

    /// Command kinds that fail
    failures: HashSet<CommandKind>,

    /// Simulate query latency (milliseconds)
    latency_ms: u64,

    /// Name to return from name() method
    client_name: &'static str,
}

impl MockStage {
    /// Create a mock stage with no objects whose COPY INTO produces nothing
    pub fn new() -> Self {
        Self {
            objects: Arc::new(RwLock::new(BTreeMap::new())),
            commands: Arc::new(RwLock::new(Vec::new())),
            export_files: Vec::new(),
            failures: HashSet::new(),
            latency_ms: 0,
            client_name: "Mock",
        }
    }

    /// Contents of the objects every COPY INTO creates, one object per entry
    pub fn with_export_files(mut self, files: Vec<Vec<u8>>) -> Self {
        self.export_files = files;
        self
    }

    /// Make every command of `kind` fail with a query error
    pub fn with_failure(mut self, kind: CommandKind) -> Self {
        self.failures.insert(kind);
        self
    }

    /// Configure simulated latency for all commands
    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    /// Set a custom client name
    pub fn with_name(mut self, name: &'static str) -> Self {
        self.client_name = name;
        self
    }

    /// Put an object on the stage at `path`
    pub async fn add_object(&self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.objects.write().await.insert(path.into(), bytes.into());
    }

    /// Full paths of every staged object, sorted
    pub async fn object_paths(&self) -> Vec<String> {
        self.objects.read().await.keys().cloned().collect()
    }

    /// Every command received so far, in order
    pub async fn executed_commands(&self) -> Vec<String> {
        self.commands.read().await.clone()
    }

    async fn simulate_latency(&self) {
        if self.latency_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.latency_ms)).await;
        }
    }

    async fn run(&self, command: &str) -> Result<Vec<Row>, ClientError> {
        self.simulate_latency().await;
        self.commands.write().await.push(command.to_string());

        let kind = CommandKind::of(command);
        if self.failures.contains(&kind) {
            return Err(ClientError::QueryError(format!(
                "Simulated {:?} failure",
                kind
            )));
        }

        match kind {
            CommandKind::CopyInto => self.copy_into(command).await,
            CommandKind::List => self.list(command).await,
            CommandKind::Get => self.get(command).await,
            CommandKind::Other => Ok(Vec::new()),
        }
    }

    async fn copy_into(&self, command: &str) -> Result<Vec<Row>, ClientError> {
        let location = stage_path(command, "COPY INTO")?;
        let mut objects = self.objects.write().await;
        for (i, bytes) in self.export_files.iter().enumerate() {
            objects.insert(format!("{}/data_0_0_{}", location, i), bytes.clone());
        }
        Ok(vec![vec![
            self.export_files.len().to_string(),
            self.export_files.iter().map(Vec::len).sum::<usize>().to_string(),
        ]])
    }

    async fn list(&self, command: &str) -> Result<Vec<Row>, ClientError> {
        let location = stage_path(command, "LIST")?;
        let stage = location.split('/').next().unwrap_or_default();
        let objects = self.objects.read().await;

        Ok(objects
            .iter()
            .filter(|(path, _)| path.starts_with(location))
            .map(|(path, bytes)| {
                let relative = path
                    .strip_prefix(stage)
                    .unwrap_or(path.as_str())
                    .trim_start_matches('/');
                vec![
                    relative.to_string(),
                    bytes.len().to_string(),
                    checksum(bytes),
                    LAST_MODIFIED.to_string(),
                ]
            })
            .collect())
    }

    async fn get(&self, command: &str) -> Result<Vec<Row>, ClientError> {
        let path = stage_path(command, "GET")?;
        let dir = command
            .split_whitespace()
            .find_map(|word| word.strip_prefix("file://"))
            .map(PathBuf::from)
            .ok_or_else(|| ClientError::QueryError(format!("No local target in `{}`", command)))?;

        let objects = self.objects.read().await;
        let mut rows = Vec::new();
        for (full, bytes) in objects.iter().filter(|(full, _)| full.starts_with(path)) {
            let name = full.rsplit('/').next().unwrap_or(full.as_str());
            tokio::fs::write(dir.join(name), bytes)
                .await
                .map_err(|e| ClientError::QueryError(e.to_string()))?;
            rows.push(vec![
                name.to_string(),
                bytes.len().to_string(),
                "DOWNLOADED".to_string(),
                String::new(),
            ]);
        }
        Ok(rows)
    }
}

/// The `@path` operand following `keyword`
fn stage_path<'c>(command: &'c str, keyword: &str) -> Result<&'c str, ClientError> {
    command
        .split_whitespace()
        .find_map(|word| word.strip_prefix('@'))
        .ok_or_else(|| ClientError::QueryError(format!("{} without a stage path: {}", keyword, command)))
}

fn checksum(bytes: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    bytes.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

impl Default for MockStage {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for MockStage {
    fn clone(&self) -> Self {
        Self {
            objects: Arc::clone(&self.objects),
            commands: Arc::clone(&self.commands),
            export_files: self.export_files.clone(),
            failures: self.failures.clone(),
            latency_ms: self.latency_ms,
            client_name: self.client_name,
        }
    }
}

#[async_trait::async_trait]
impl StageClient for MockStage {
    fn name(&self) -> &'static str {
        self.client_name
    }

    async fn execute(&self, command: &str) -> Result<(), ClientError> {
        self.run(command).await.map(|_| ())
    }

    async fn query(&self, command: &str) -> Result<Vec<Row>, ClientError> {
        self.run(command).await
    }

    async fn test_connection(&self) -> Result<(), ClientError> {
        self.simulate_latency().await;
        if self.failures.contains(&CommandKind::Other) {
            Err(ClientError::NetworkError(
                "Simulated connection failure".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}
