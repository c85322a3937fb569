//! Two-phase bulk transfer through a warehouse stage
//!
//! The export phase copies a query result onto a stage and writes one local
//! pointer file per staged object. The import phase turns each pointer file
//! back into the bytes it references. Both phases talk to the warehouse
//! through a [`StageClient`].
//!
//! ## Features
//!
//! Enable warehouse support via Cargo features:
//! - `snowflake` - Snowflake support
//!
//! ## Example
//!
//! ```rust,ignore
//! use stagebridge_stage::{MockStage, StageExporter, StageImporter};
//! use stagebridge_core::{ExportConfig, ImportConfig};
//!
//! let stage = MockStage::new().with_export_files(vec![b"1,a\n".to_vec()]);
//! let config = ExportConfig::new("trigger", "pointers", "select * from t", "%t", "nightly");
//! let summary = StageExporter::new(&stage, config)?.run().await?;
//!
//! let count = StageImporter::new(&stage, ImportConfig::new("pointers", "data")).run().await?;
//! ```

pub mod client;
pub mod commands;
pub mod error;
pub mod export;
pub mod import;
pub mod mock;
pub mod pump;
pub mod snowflake;

pub use client::{Row, StageClient};
pub use commands::{RetrievedFile, StagedFile};
pub use error::{ClientError, StageError};
pub use export::{read_trigger_marker, ExportSummary, StageExporter};
pub use import::StageImporter;
pub use mock::{CommandKind, MockStage};
pub use pump::{bijective_map, identity_path};
pub use snowflake::{SnowflakeCredentials, SnowflakeStageClient, SnowflakeStageClientBuilder};
