//! Configuration schema (stagebridge.toml)

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Default `MAX_FILE_SIZE` for bulk copies, in bytes
pub const DEFAULT_MAX_FILE_SIZE: u64 = 16_777_216;

/// SQL dialect configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectConfig {
    /// Snowflake SQL dialect
    Snowflake,

    /// PostgreSQL SQL dialect
    Postgres,

    /// MySQL SQL dialect
    MySql,

    /// SQLite SQL dialect
    Sqlite,

    /// Generic ANSI SQL
    Ansi,
}

impl Default for DialectConfig {
    fn default() -> Self {
        Self::Ansi
    }
}

impl DialectConfig {
    /// Bind parameter placeholder for the 1-based parameter `index`
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            Self::Postgres => format!("${}", index),
            _ => "?".to_string(),
        }
    }

    /// Quote an identifier so reserved words and mixed case survive
    ///
    /// MySQL uses backticks; every other dialect uses double quotes. An
    /// embedded quote character is doubled.
    pub fn quote_identifier(&self, ident: &str) -> String {
        let quote = match self {
            Self::MySql => '`',
            _ => '"',
        };
        let mut quoted = String::with_capacity(ident.len() + 2);
        quoted.push(quote);
        for c in ident.chars() {
            if c == quote {
                quoted.push(quote);
            }
            quoted.push(c);
        }
        quoted.push(quote);
        quoted
    }
}

/// Warehouse connection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarehouseConfig {
    /// Warehouse type (snowflake, mock, etc.)
    #[serde(rename = "type")]
    pub warehouse_type: String,

    /// Connection settings (warehouse-specific)
    #[serde(flatten)]
    pub settings: HashMap<String, String>,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            warehouse_type: "snowflake".to_string(),
            settings: HashMap::new(),
        }
    }
}

impl WarehouseConfig {
    /// Look up a connection setting
    pub fn setting(&self, key: &str) -> Option<&str> {
        self.settings.get(key).map(String::as_str)
    }
}

/// File format of staged objects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Csv,
    Json,
    Parquet,
}

impl Default for FileFormat {
    fn default() -> Self {
        Self::Csv
    }
}

impl std::fmt::Display for FileFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Csv => write!(f, "CSV"),
            Self::Json => write!(f, "JSON"),
            Self::Parquet => write!(f, "PARQUET"),
        }
    }
}

/// Parameters for the bulk export phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Directory holding the trigger marker
    pub input_dir: PathBuf,

    /// Directory that receives one pointer file per staged object
    pub output_dir: PathBuf,

    /// Query whose result set is exported
    pub query: String,

    /// External stage identifier, without the leading `@`
    pub stage: String,

    /// Job name used to namespace staged objects
    pub job_name: String,

    /// Expression the bulk copy partitions its output by
    #[serde(default)]
    pub partition_by: Option<String>,

    #[serde(default)]
    pub file_format: FileFormat,

    /// Compression mode passed through to the warehouse (e.g. NONE, GZIP)
    #[serde(default)]
    pub compression: Option<String>,

    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// Name of the trigger marker file; when unset the input directory must
    /// hold exactly one file
    #[serde(default)]
    pub trigger_file: Option<String>,
}

fn default_max_file_size() -> u64 {
    DEFAULT_MAX_FILE_SIZE
}

impl ExportConfig {
    /// Create an export configuration with default format settings
    pub fn new(
        input_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        query: impl Into<String>,
        stage: impl Into<String>,
        job_name: impl Into<String>,
    ) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            query: query.into(),
            stage: stage.into(),
            job_name: job_name.into(),
            partition_by: None,
            file_format: FileFormat::default(),
            compression: None,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            trigger_file: None,
        }
    }

    /// Set the partition expression
    pub fn with_partition_by(mut self, expr: impl Into<String>) -> Self {
        self.partition_by = Some(expr.into());
        self
    }

    /// Set file format and compression
    pub fn with_format(mut self, format: FileFormat, compression: Option<String>) -> Self {
        self.file_format = format;
        self.compression = compression;
        self
    }

    /// Set the maximum staged file size
    pub fn with_max_file_size(mut self, max_file_size: u64) -> Self {
        self.max_file_size = max_file_size;
        self
    }

    /// Set the trigger marker file name
    pub fn with_trigger_file(mut self, name: impl Into<String>) -> Self {
        self.trigger_file = Some(name.into());
        self
    }

    /// Reject configurations that cannot produce a valid bulk copy
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.query.trim().is_empty() {
            return Err(ConfigError::Invalid("export.query must not be empty".into()));
        }
        if self.stage.trim().is_empty() {
            return Err(ConfigError::Invalid("export.stage must not be empty".into()));
        }
        if self.stage.starts_with('@') {
            return Err(ConfigError::Invalid(
                "export.stage must not start with '@'".into(),
            ));
        }
        if self.job_name.trim().is_empty() || self.job_name.contains('/') {
            return Err(ConfigError::Invalid(
                "export.job_name must be a non-empty path segment".into(),
            ));
        }
        if self.max_file_size == 0 {
            return Err(ConfigError::Invalid("export.max_file_size must be positive".into()));
        }
        Ok(())
    }
}

/// Parameters for the bulk import phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Directory holding pointer files
    pub input_dir: PathBuf,

    /// Directory that receives the retrieved content
    pub output_dir: PathBuf,
}

impl ImportConfig {
    pub fn new(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    /// SQL dialect
    #[serde(default)]
    pub dialect: DialectConfig,

    /// Warehouse connection configuration
    #[serde(default)]
    pub warehouse: Option<WarehouseConfig>,

    /// Bulk export phase
    #[serde(default)]
    pub export: Option<ExportConfig>,

    /// Bulk import phase
    #[serde(default)]
    pub import: Option<ImportConfig>,
}

impl Config {
    /// Load config from TOML file
    ///
    /// Relative directories are resolved against the config file's parent.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        let mut config = Self::from_toml(&contents)?;

        if let Some(parent) = path.parent() {
            config.resolve_relative_to(parent);
        }

        Ok(config)
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(toml)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        if let Some(export) = &config.export {
            export.validate()?;
        }

        Ok(config)
    }

    /// Save config to TOML file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        let toml = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, toml)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    fn resolve_relative_to(&mut self, root: &std::path::Path) {
        let resolve = |dir: &mut PathBuf| {
            if dir.is_relative() {
                *dir = root.join(&*dir);
            }
        };
        if let Some(export) = &mut self.export {
            resolve(&mut export.input_dir);
            resolve(&mut export.output_dir);
        }
        if let Some(import) = &mut self.import {
            resolve(&mut import.input_dir);
            resolve(&mut import.output_dir);
        }
    }
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
