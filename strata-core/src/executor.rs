use std::sync::Arc;

use async_trait::async_trait;

use crate::dialect::Dialect;
use crate::error::Result;
use crate::value::{Row, Value};

/// Driver-level result of a statement that returns no rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryOutcome {
    pub rows_affected: u64,
    pub last_insert_id: Option<i64>,
}

/// The five statement operations every execution target provides.
///
/// SQL reaches implementations with `?` placeholders; implementations that
/// talk to PostgreSQL rewrite them before sending.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Run a query and return its rows.
    async fn select(&self, sql: &str, bindings: &[Value]) -> Result<Vec<Row>>;

    /// Run an insert and return the generated id, if the backend reports one.
    async fn insert(&self, sql: &str, bindings: &[Value]) -> Result<Option<i64>>;

    /// Run an update and return the affected row count.
    async fn update(&self, sql: &str, bindings: &[Value]) -> Result<u64>;

    /// Run a delete and return the affected row count.
    async fn delete(&self, sql: &str, bindings: &[Value]) -> Result<u64> {
        self.update(sql, bindings).await
    }

    /// Run any statement (DDL included) and return the raw outcome.
    async fn raw_query(&self, sql: &str, bindings: &[Value]) -> Result<QueryOutcome>;
}

/// An open transaction. Dropping an unfinished handle rolls it back.
#[async_trait]
pub trait TransactionHandle: Executor {
    async fn commit(&self) -> Result<()>;
    async fn rollback(&self) -> Result<()>;
}

/// A pooled execution target that can open transactions.
#[async_trait]
pub trait Driver: Executor {
    fn dialect(&self) -> Dialect;

    async fn begin(&self) -> Result<Arc<dyn TransactionHandle>>;
}
