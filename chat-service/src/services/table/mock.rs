//! In-memory table source for tests and local demos.

use super::{DataSourceError, TableSource};
use crate::models::TableContext;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Returns a fixed context, or fails as if the database were unreachable.
pub struct StaticTableSource {
    context: Option<TableContext>,
    table: String,
    calls: AtomicUsize,
}

impl StaticTableSource {
    pub fn new(context: TableContext) -> Self {
        Self {
            table: context.table.clone(),
            context: Some(context),
            calls: AtomicUsize::new(0),
        }
    }

    /// A source whose every call fails with a connection error.
    pub fn unreachable(table: impl Into<String>) -> Self {
        Self {
            context: None,
            table: table.into(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of `fetch_context` calls so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn connection_refused() -> DataSourceError {
    DataSourceError::Connection(sqlx::Error::Io(std::io::Error::from(
        std::io::ErrorKind::ConnectionRefused,
    )))
}

#[async_trait]
impl TableSource for StaticTableSource {
    async fn fetch_context(&self) -> Result<TableContext, DataSourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.context.clone().ok_or_else(connection_refused)
    }

    async fn health_check(&self) -> Result<(), DataSourceError> {
        match self.context {
            Some(_) => Ok(()),
            None => Err(connection_refused()),
        }
    }

    fn table(&self) -> &str {
        &self.table
    }
}
