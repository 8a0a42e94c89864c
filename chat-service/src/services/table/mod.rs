//! Sources of table context (schema + sample rows) for prompts.

pub mod mock;
pub mod mysql;

use crate::models::TableContext;
use async_trait::async_trait;
use thiserror::Error;

pub use mock::StaticTableSource;
pub use mysql::MySqlTableSource;

/// Any failure reaching or querying the database.
#[derive(Error, Debug)]
pub enum DataSourceError {
    #[error("Failed to connect to database: {0}")]
    Connection(#[source] sqlx::Error),

    #[error("Failed to describe table '{table}': {source}")]
    Describe {
        table: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Table '{0}' not found or has no columns")]
    TableNotFound(String),

    #[error("Failed to sample table '{table}': {source}")]
    Sample {
        table: String,
        #[source]
        source: sqlx::Error,
    },
}

impl DataSourceError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            DataSourceError::Connection(_) => "connection",
            DataSourceError::Describe { .. } => "describe",
            DataSourceError::TableNotFound(_) => "table_not_found",
            DataSourceError::Sample { .. } => "sample",
        }
    }
}

/// Supplies the schema snapshot and sample rows of one table.
#[async_trait]
pub trait TableSource: Send + Sync {
    /// Describe the table and sample its first rows over a single connection
    /// that is released before returning, on success and failure alike.
    async fn fetch_context(&self) -> Result<TableContext, DataSourceError>;

    /// Cheap connectivity check for readiness.
    async fn health_check(&self) -> Result<(), DataSourceError>;

    /// Name of the table this source reads.
    fn table(&self) -> &str;
}
