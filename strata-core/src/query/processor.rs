use async_trait::async_trait;

use crate::connection::Connection;
use crate::error::Result;
use crate::value::{FromRow, Row, Value};

/// Turns executed statements into results for the builder.
///
/// Row hydration into caller types happens in [`hydrate`] after
/// `process_select`, so processors stay object safe.
#[async_trait]
pub trait Processor: Send + Sync {
    async fn process_select(
        &self,
        connection: &Connection,
        sql: &str,
        bindings: &[Value],
    ) -> Result<Vec<Row>>;

    async fn process_insert_get_id(
        &self,
        connection: &Connection,
        sql: &str,
        bindings: &[Value],
    ) -> Result<Option<i64>>;

    async fn process_update(&self, connection: &Connection, sql: &str, bindings: &[Value]) -> Result<u64>;

    async fn process_delete(&self, connection: &Connection, sql: &str, bindings: &[Value]) -> Result<u64>;
}

/// Passes every statement straight to the connection.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultProcessor;

#[async_trait]
impl Processor for DefaultProcessor {
    async fn process_select(
        &self,
        connection: &Connection,
        sql: &str,
        bindings: &[Value],
    ) -> Result<Vec<Row>> {
        connection.select(sql, bindings).await
    }

    async fn process_insert_get_id(
        &self,
        connection: &Connection,
        sql: &str,
        bindings: &[Value],
    ) -> Result<Option<i64>> {
        connection.insert(sql, bindings).await
    }

    async fn process_update(&self, connection: &Connection, sql: &str, bindings: &[Value]) -> Result<u64> {
        connection.update(sql, bindings).await
    }

    async fn process_delete(&self, connection: &Connection, sql: &str, bindings: &[Value]) -> Result<u64> {
        connection.delete(sql, bindings).await
    }
}

/// Hydrate processed rows into `T`.
pub fn hydrate<T: FromRow>(rows: &[Row]) -> Result<Vec<T>> {
    rows.iter().map(T::from_row).collect()
}
