//! Snowflake stage client
//!
//! Runs COPY INTO, LIST and GET through the Snowflake SQL API and renders
//! every result cell as text. Requires privileges to write to and read from
//! the target stage.
//!
//! ## Authentication Methods
//!
//! 1. Password authentication (username/password)
//! 2. Key-pair authentication (private key PEM)
//!
//! ## Usage
//!
//! ```rust,ignore
//! let client = SnowflakeStageClient::new(
//!     "xy12345.us-east-1",
//!     "username",
//!     "password"
//! )
//! .with_warehouse("COMPUTE_WH")
//! .with_role("LOADER")
//! .build()?;
//! ```
//!
//! Reference: https://docs.snowflake.com/en/sql-reference/sql/copy-into-location

use crate::client::{Row, StageClient};
use crate::error::ClientError;

#[cfg(feature = "snowflake")]
use snowflake_api::SnowflakeApi;

#[cfg(feature = "snowflake")]
use arrow_array::cast::AsArray;

#[cfg(feature = "snowflake")]
use arrow_array::types::{Decimal128Type, Float32Type, Float64Type, Int16Type, Int32Type, Int64Type, Int8Type};

#[cfg(feature = "snowflake")]
use arrow_array::{Array, RecordBatch};

#[cfg(feature = "snowflake")]
use arrow_schema::DataType;

/// Snowflake authentication credentials
#[derive(Clone)]
pub enum SnowflakeCredentials {
    /// Password-based authentication
    Password(String),
    /// Key-pair authentication (PEM format private key)
    PrivateKey(String),
}

/// Builder for SnowflakeStageClient
pub struct SnowflakeStageClientBuilder {
    account: String,
    username: String,
    credentials: SnowflakeCredentials,
    warehouse: Option<String>,
    role: Option<String>,
    database: Option<String>,
    schema: Option<String>,
}

impl SnowflakeStageClientBuilder {
    /// Create new builder with password authentication
    pub fn with_password(
        account: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self::with_credentials(account, username, SnowflakeCredentials::Password(password.into()))
    }

    /// Create new builder with key-pair authentication
    pub fn with_key_pair(
        account: impl Into<String>,
        username: impl Into<String>,
        private_key_pem: impl Into<String>,
    ) -> Self {
        Self::with_credentials(
            account,
            username,
            SnowflakeCredentials::PrivateKey(private_key_pem.into()),
        )
    }

    fn with_credentials(
        account: impl Into<String>,
        username: impl Into<String>,
        credentials: SnowflakeCredentials,
    ) -> Self {
        Self {
            account: account.into(),
            username: username.into(),
            credentials,
            warehouse: None,
            role: None,
            database: None,
            schema: None,
        }
    }

    /// Set the warehouse to use
    pub fn with_warehouse(mut self, warehouse: impl Into<String>) -> Self {
        self.warehouse = Some(warehouse.into());
        self
    }

    /// Set the role to use
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Set the default database
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Set the default schema; table stages (`@%table`) resolve against it
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    /// Build the client
    #[cfg(feature = "snowflake")]
    pub fn build(self) -> Result<SnowflakeStageClient, ClientError> {
        let api = match &self.credentials {
            SnowflakeCredentials::Password(password) => SnowflakeApi::with_password_auth(
                &self.account,
                self.warehouse.as_deref(),
                self.database.as_deref(),
                self.schema.as_deref(),
                &self.username,
                self.role.as_deref(),
                password,
            )
            .map_err(|e| {
                ClientError::AuthenticationError(format!(
                    "Failed to authenticate with Snowflake: {}",
                    e
                ))
            })?,
            SnowflakeCredentials::PrivateKey(private_key_pem) => SnowflakeApi::with_certificate_auth(
                &self.account,
                self.warehouse.as_deref(),
                self.database.as_deref(),
                self.schema.as_deref(),
                &self.username,
                self.role.as_deref(),
                private_key_pem,
            )
            .map_err(|e| {
                ClientError::AuthenticationError(format!(
                    "Failed to authenticate with key-pair: {}",
                    e
                ))
            })?,
        };

        Ok(SnowflakeStageClient {
            api,
            account: self.account,
        })
    }

    /// Build without snowflake feature
    #[cfg(not(feature = "snowflake"))]
    pub fn build(self) -> Result<SnowflakeStageClient, ClientError> {
        Err(ClientError::ConfigError(
            "Snowflake support not compiled. Rebuild with: cargo build --features snowflake"
                .to_string(),
        ))
    }
}

/// Snowflake stage client
pub struct SnowflakeStageClient {
    #[cfg(feature = "snowflake")]
    api: SnowflakeApi,

    account: String,
}

impl SnowflakeStageClient {
    /// Create a new client with password authentication (returns builder)
    pub fn new(
        account: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> SnowflakeStageClientBuilder {
        SnowflakeStageClientBuilder::with_password(account, username, password)
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    #[cfg(feature = "snowflake")]
    async fn exec(&self, command: &str) -> Result<snowflake_api::QueryResult, ClientError> {
        self.api.exec(command).await.map_err(|e| {
            let err_str = e.to_string();
            if err_str.contains("Authentication") || err_str.contains("token") {
                ClientError::AuthenticationError(err_str)
            } else if err_str.contains("connect") || err_str.contains("timed out") {
                ClientError::NetworkError(err_str)
            } else {
                ClientError::QueryError(err_str)
            }
        })
    }
}

/// Render a Decimal128 value with `scale` fractional digits
pub fn format_decimal(value: i128, scale: i8) -> String {
    if scale <= 0 {
        let mut text = value.to_string();
        if value != 0 {
            text.extend(std::iter::repeat('0').take(scale.unsigned_abs() as usize));
        }
        return text;
    }

    let scale = scale as usize;
    let digits = value.unsigned_abs().to_string();
    let digits = if digits.len() <= scale {
        format!("{}{}", "0".repeat(scale - digits.len() + 1), digits)
    } else {
        digits
    };
    let (whole, fraction) = digits.split_at(digits.len() - scale);
    let sign = if value < 0 { "-" } else { "" };
    format!("{}{}.{}", sign, whole, fraction)
}

/// Render every cell of `batches` as text; nulls become the empty string
#[cfg(feature = "snowflake")]
pub fn batches_to_rows(batches: &[RecordBatch]) -> Result<Vec<Row>, ClientError> {
    let mut rows = Vec::new();

    for batch in batches {
        let mut batch_rows: Vec<Row> = vec![Vec::with_capacity(batch.num_columns()); batch.num_rows()];

        for column in batch.columns() {
            for (row_idx, row) in batch_rows.iter_mut().enumerate() {
                let cell = if column.is_null(row_idx) {
                    String::new()
                } else {
                    match column.data_type() {
                        DataType::Utf8 => column.as_string::<i32>().value(row_idx).to_string(),
                        DataType::LargeUtf8 => column.as_string::<i64>().value(row_idx).to_string(),
                        DataType::Int8 => column.as_primitive::<Int8Type>().value(row_idx).to_string(),
                        DataType::Int16 => column.as_primitive::<Int16Type>().value(row_idx).to_string(),
                        DataType::Int32 => column.as_primitive::<Int32Type>().value(row_idx).to_string(),
                        DataType::Int64 => column.as_primitive::<Int64Type>().value(row_idx).to_string(),
                        DataType::Float32 => column.as_primitive::<Float32Type>().value(row_idx).to_string(),
                        DataType::Float64 => column.as_primitive::<Float64Type>().value(row_idx).to_string(),
                        DataType::Decimal128(_, scale) => {
                            format_decimal(column.as_primitive::<Decimal128Type>().value(row_idx), *scale)
                        }
                        DataType::Boolean => column.as_boolean().value(row_idx).to_string(),
                        other => {
                            return Err(ClientError::InvalidResponse(format!(
                                "Unsupported result column type {}",
                                other
                            )))
                        }
                    }
                };
                row.push(cell);
            }
        }

        rows.extend(batch_rows);
    }

    Ok(rows)
}

#[async_trait::async_trait]
impl StageClient for SnowflakeStageClient {
    fn name(&self) -> &'static str {
        "Snowflake"
    }

    #[cfg(feature = "snowflake")]
    async fn execute(&self, command: &str) -> Result<(), ClientError> {
        self.exec(command).await.map(|_| ())
    }

    #[cfg(not(feature = "snowflake"))]
    async fn execute(&self, _command: &str) -> Result<(), ClientError> {
        Err(ClientError::ConfigError(
            "Snowflake support not compiled. Rebuild with: cargo build --features snowflake"
                .to_string(),
        ))
    }

    #[cfg(feature = "snowflake")]
    async fn query(&self, command: &str) -> Result<Vec<Row>, ClientError> {
        use snowflake_api::QueryResult;

        match self.exec(command).await? {
            QueryResult::Arrow(batches) => batches_to_rows(&batches),
            QueryResult::Json(_) => Err(ClientError::InvalidResponse(
                "Unexpected JSON result format".to_string(),
            )),
            QueryResult::Empty => Ok(Vec::new()),
        }
    }

    #[cfg(not(feature = "snowflake"))]
    async fn query(&self, _command: &str) -> Result<Vec<Row>, ClientError> {
        Err(ClientError::ConfigError(
            "Snowflake support not compiled. Rebuild with: cargo build --features snowflake"
                .to_string(),
        ))
    }
}
