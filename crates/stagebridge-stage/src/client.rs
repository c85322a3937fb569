//! Stage client trait for issuing bulk-copy, listing and retrieval commands

use crate::error::ClientError;

/// A result row with every cell rendered as text
pub type Row = Vec<String>;

/// Trait for warehouse connections that can run stage commands
///
/// Commands are plain SQL text in the warehouse dialect. Commands run
/// sequentially; implementations do not need to support concurrent calls.
#[async_trait::async_trait]
pub trait StageClient: Send + Sync {
    /// Get the client name (e.g., "Snowflake", "Mock")
    fn name(&self) -> &'static str;

    /// Execute a command whose result rows are not needed
    async fn execute(&self, command: &str) -> Result<(), ClientError>;

    /// Execute a command and collect its result rows
    async fn query(&self, command: &str) -> Result<Vec<Row>, ClientError>;

    /// Test the connection to the warehouse
    async fn test_connection(&self) -> Result<(), ClientError> {
        self.query("SELECT 1").await.map(|_| ())
    }
}
