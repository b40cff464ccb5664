use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::executor::{Driver, QueryOutcome, TransactionHandle};
use crate::metrics::record_query_metrics;
use crate::query::grammar::QueryGrammar;
use crate::query::processor::{DefaultProcessor, Processor};
use crate::query::QueryBuilder;
use crate::schema::SchemaBuilder;
use crate::schema::grammar::SchemaGrammar;
use crate::value::{Row, Value};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Transactions opened in the current task, keyed by connection id.
#[derive(Clone, Default)]
struct TransactionScope {
    active: HashMap<u64, Arc<dyn TransactionHandle>>,
}

tokio::task_local! {
    static TRANSACTIONS: TransactionScope;
}

/// Handle to a database: the driver, its dialect and the result processor.
///
/// Cloning is cheap and clones share the same pool and transaction routing.
/// Statements issued inside [`Connection::transaction`] (from any nested
/// `.await` in the same task) run on the open transaction.
#[derive(Clone)]
pub struct Connection {
    id: u64,
    dialect: Dialect,
    driver: Arc<dyn Driver>,
    processor: Arc<dyn Processor>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("dialect", &self.dialect)
            .finish_non_exhaustive()
    }
}

impl Connection {
    pub fn new(driver: Arc<dyn Driver>) -> Self {
        Self {
            id: NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
            dialect: driver.dialect(),
            driver,
            processor: Arc::new(DefaultProcessor),
        }
    }

    /// Connect through the bundled driver for the configured dialect.
    #[cfg(any(feature = "sqlite", feature = "postgres", feature = "mysql"))]
    pub async fn connect(config: &crate::config::ConnectionConfig) -> Result<Self> {
        let driver = crate::driver::connect(config).await?;
        Ok(Self::new(driver))
    }

    pub fn with_processor(mut self, processor: Arc<dyn Processor>) -> Self {
        self.processor = processor;
        self
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn query_grammar(&self) -> &'static dyn QueryGrammar {
        self.dialect.query_grammar()
    }

    pub fn schema_grammar(&self) -> &'static dyn SchemaGrammar {
        self.dialect.schema_grammar()
    }

    pub fn processor(&self) -> Arc<dyn Processor> {
        Arc::clone(&self.processor)
    }

    pub fn driver(&self) -> &Arc<dyn Driver> {
        &self.driver
    }

    /// Start a query against `table`.
    pub fn table(&self, table: &str) -> QueryBuilder<Row> {
        QueryBuilder::table(self, table)
    }

    pub fn schema(&self) -> SchemaBuilder {
        SchemaBuilder::new(self.clone())
    }

    /// Whether the current task is inside a transaction on this connection.
    pub fn in_transaction(&self) -> bool {
        self.active_transaction().is_some()
    }

    fn active_transaction(&self) -> Option<Arc<dyn TransactionHandle>> {
        TRANSACTIONS
            .try_with(|scope| scope.active.get(&self.id).cloned())
            .ok()
            .flatten()
    }

    fn trace(&self, operation: &'static str, sql: &str, bindings: &[Value]) -> Instant {
        tracing::debug!(
            operation,
            dialect = self.dialect.label(),
            sql = %sql,
            bindings = bindings.len(),
            "strata query"
        );
        Instant::now()
    }

    pub async fn select(&self, sql: &str, bindings: &[Value]) -> Result<Vec<Row>> {
        let start = self.trace("select", sql, bindings);
        let result = match self.active_transaction() {
            Some(tx) => tx.select(sql, bindings).await,
            None => self.driver.select(sql, bindings).await,
        };
        record_query_metrics("select", self.dialect, start.elapsed());
        result
    }

    pub async fn insert(&self, sql: &str, bindings: &[Value]) -> Result<Option<i64>> {
        let start = self.trace("insert", sql, bindings);
        let result = match self.active_transaction() {
            Some(tx) => tx.insert(sql, bindings).await,
            None => self.driver.insert(sql, bindings).await,
        };
        record_query_metrics("insert", self.dialect, start.elapsed());
        result
    }

    pub async fn update(&self, sql: &str, bindings: &[Value]) -> Result<u64> {
        let start = self.trace("update", sql, bindings);
        let result = match self.active_transaction() {
            Some(tx) => tx.update(sql, bindings).await,
            None => self.driver.update(sql, bindings).await,
        };
        record_query_metrics("update", self.dialect, start.elapsed());
        result
    }

    pub async fn delete(&self, sql: &str, bindings: &[Value]) -> Result<u64> {
        let start = self.trace("delete", sql, bindings);
        let result = match self.active_transaction() {
            Some(tx) => tx.delete(sql, bindings).await,
            None => self.driver.delete(sql, bindings).await,
        };
        record_query_metrics("delete", self.dialect, start.elapsed());
        result
    }

    pub async fn raw_query(&self, sql: &str, bindings: &[Value]) -> Result<QueryOutcome> {
        let start = self.trace("raw", sql, bindings);
        let result = match self.active_transaction() {
            Some(tx) => tx.raw_query(sql, bindings).await,
            None => self.driver.raw_query(sql, bindings).await,
        };
        record_query_metrics("raw", self.dialect, start.elapsed());
        result
    }

    /// Run `callback` inside a transaction.
    ///
    /// Commits when the callback returns `Ok`; rolls back and returns the
    /// callback's own error otherwise. When a transaction on this connection is
    /// already open in the current task, the callback joins it.
    pub async fn transaction<F, Fut, T, E>(&self, callback: F) -> Result<T, E>
    where
        F: FnOnce(Connection) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<Error>,
    {
        if self.in_transaction() {
            return callback(self.clone()).await;
        }

        let handle = self.driver.begin().await.map_err(E::from)?;
        tracing::debug!(operation = "begin", dialect = self.dialect.label(), "strata transaction");

        let mut scope = TRANSACTIONS.try_with(Clone::clone).unwrap_or_default();
        scope.active.insert(self.id, Arc::clone(&handle));
        let result = TRANSACTIONS.scope(scope, callback(self.clone())).await;

        match result {
            Ok(value) => {
                handle.commit().await.map_err(E::from)?;
                tracing::debug!(operation = "commit", dialect = self.dialect.label(), "strata transaction");
                Ok(value)
            }
            Err(err) => {
                match handle.rollback().await {
                    Ok(()) => tracing::debug!(
                        operation = "rollback",
                        dialect = self.dialect.label(),
                        "strata transaction"
                    ),
                    Err(rollback_err) => tracing::warn!(
                        error = %rollback_err,
                        dialect = self.dialect.label(),
                        "strata rollback failed"
                    ),
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::RecordingDriver;

    #[tokio::test]
    async fn statements_inside_transaction_use_the_handle() {
        let driver = RecordingDriver::new(Dialect::Sqlite);
        let connection = Connection::new(Arc::new(driver.clone()));

        connection
            .transaction(|conn| async move {
                conn.raw_query("insert into t values (1)", &[]).await?;
                assert!(conn.in_transaction());
                Ok::<_, Error>(())
            })
            .await
            .unwrap();
        connection.raw_query("select 2", &[]).await.unwrap();

        assert_eq!(
            driver.log(),
            vec![
                "begin".to_owned(),
                "tx: insert into t values (1)".to_owned(),
                "commit".to_owned(),
                "select 2".to_owned(),
            ]
        );
        assert!(!connection.in_transaction());
    }

    #[tokio::test]
    async fn failing_callback_rolls_back_and_keeps_its_error() {
        let driver = RecordingDriver::new(Dialect::Sqlite);
        let connection = Connection::new(Arc::new(driver.clone()));

        let err = connection
            .transaction(|conn| async move {
                conn.raw_query("delete from t", &[]).await?;
                Err::<(), _>(Error::Validation("boom".to_owned()))
            })
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Validation(ref m) if m == "boom"));
        assert_eq!(
            driver.log(),
            vec!["begin".to_owned(), "tx: delete from t".to_owned(), "rollback".to_owned()]
        );
    }

    #[tokio::test]
    async fn nested_transactions_join_the_outer_one() {
        let driver = RecordingDriver::new(Dialect::Sqlite);
        let connection = Connection::new(Arc::new(driver.clone()));

        connection
            .transaction(|outer| async move {
                outer
                    .transaction(|inner| async move {
                        inner.raw_query("select 1", &[]).await?;
                        Ok::<_, Error>(())
                    })
                    .await
            })
            .await
            .unwrap();

        assert_eq!(
            driver.log(),
            vec!["begin".to_owned(), "tx: select 1".to_owned(), "commit".to_owned()]
        );
    }

    #[tokio::test]
    async fn separate_connections_do_not_share_transactions() {
        let first_driver = RecordingDriver::new(Dialect::Sqlite);
        let second_driver = RecordingDriver::new(Dialect::Sqlite);
        let first = Connection::new(Arc::new(first_driver.clone()));
        let second = Connection::new(Arc::new(second_driver.clone()));

        first
            .transaction(|_conn| {
                let second = second.clone();
                async move {
                    second.raw_query("select 1", &[]).await?;
                    Ok::<_, Error>(())
                }
            })
            .await
            .unwrap();

        assert_eq!(second_driver.log(), vec!["select 1".to_owned()]);
        assert_eq!(first_driver.log(), vec!["begin".to_owned(), "commit".to_owned()]);
    }
}
