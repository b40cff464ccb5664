use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::connection::Connection;
use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::executor::{Driver, Executor, QueryOutcome, TransactionHandle};
use crate::value::{Row, Value};

/// A statement captured by [`RecordingDriver`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedStatement {
    pub sql: String,
    pub bindings: Vec<Value>,
    pub in_transaction: bool,
}

#[derive(Default)]
struct State {
    log: Vec<String>,
    statements: Vec<RecordedStatement>,
    rows: VecDeque<Vec<Row>>,
    insert_id: Option<i64>,
    affected: u64,
    fail_on: Option<String>,
}

/// In-memory driver that records every statement and replays canned results.
///
/// `select` pops the next queued row set (empty when the queue is drained).
#[derive(Clone)]
pub struct RecordingDriver {
    dialect: Dialect,
    state: Arc<Mutex<State>>,
}

impl RecordingDriver {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            state: Arc::default(),
        }
    }

    /// A connection over a fresh recording driver, plus the driver itself.
    pub fn connection(dialect: Dialect) -> (Connection, Self) {
        let driver = Self::new(dialect);
        (Connection::new(Arc::new(driver.clone())), driver)
    }

    pub fn push_rows(&self, rows: Vec<Row>) {
        self.state.lock().unwrap().rows.push_back(rows);
    }

    pub fn set_insert_id(&self, id: Option<i64>) {
        self.state.lock().unwrap().insert_id = id;
    }

    pub fn set_affected(&self, affected: u64) {
        self.state.lock().unwrap().affected = affected;
    }

    /// Fail any statement whose SQL contains `fragment`.
    pub fn fail_when(&self, fragment: &str) {
        self.state.lock().unwrap().fail_on = Some(fragment.to_owned());
    }

    /// SQL text plus `begin`/`commit`/`rollback` markers, in order.
    pub fn log(&self) -> Vec<String> {
        self.state.lock().unwrap().log.clone()
    }

    pub fn statements(&self) -> Vec<RecordedStatement> {
        self.state.lock().unwrap().statements.clone()
    }

    pub fn last_statement(&self) -> Option<RecordedStatement> {
        self.state.lock().unwrap().statements.last().cloned()
    }

    fn record(&self, sql: &str, bindings: &[Value], in_transaction: bool) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_on.as_deref().is_some_and(|fragment| sql.contains(fragment)) {
            return Err(Error::Database(sqlx::Error::Protocol(format!("refused: {sql}"))));
        }
        let entry = if in_transaction {
            format!("tx: {sql}")
        } else {
            sql.to_owned()
        };
        state.log.push(entry);
        state.statements.push(RecordedStatement {
            sql: sql.to_owned(),
            bindings: bindings.to_vec(),
            in_transaction,
        });
        Ok(())
    }

    fn mark(&self, event: &str) {
        self.state.lock().unwrap().log.push(event.to_owned());
    }

    fn select_rows(&self, sql: &str, bindings: &[Value], in_transaction: bool) -> Result<Vec<Row>> {
        self.record(sql, bindings, in_transaction)?;
        Ok(self.state.lock().unwrap().rows.pop_front().unwrap_or_default())
    }

    fn outcome(&self, sql: &str, bindings: &[Value], in_transaction: bool) -> Result<QueryOutcome> {
        self.record(sql, bindings, in_transaction)?;
        let state = self.state.lock().unwrap();
        Ok(QueryOutcome {
            rows_affected: state.affected,
            last_insert_id: state.insert_id,
        })
    }
}

#[async_trait]
impl Executor for RecordingDriver {
    async fn select(&self, sql: &str, bindings: &[Value]) -> Result<Vec<Row>> {
        self.select_rows(sql, bindings, false)
    }

    async fn insert(&self, sql: &str, bindings: &[Value]) -> Result<Option<i64>> {
        Ok(self.outcome(sql, bindings, false)?.last_insert_id)
    }

    async fn update(&self, sql: &str, bindings: &[Value]) -> Result<u64> {
        Ok(self.outcome(sql, bindings, false)?.rows_affected)
    }

    async fn raw_query(&self, sql: &str, bindings: &[Value]) -> Result<QueryOutcome> {
        self.outcome(sql, bindings, false)
    }
}

#[async_trait]
impl Driver for RecordingDriver {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    async fn begin(&self) -> Result<Arc<dyn TransactionHandle>> {
        self.mark("begin");
        Ok(Arc::new(RecordingTransaction {
            driver: self.clone(),
        }))
    }
}

struct RecordingTransaction {
    driver: RecordingDriver,
}

#[async_trait]
impl Executor for RecordingTransaction {
    async fn select(&self, sql: &str, bindings: &[Value]) -> Result<Vec<Row>> {
        self.driver.select_rows(sql, bindings, true)
    }

    async fn insert(&self, sql: &str, bindings: &[Value]) -> Result<Option<i64>> {
        Ok(self.driver.outcome(sql, bindings, true)?.last_insert_id)
    }

    async fn update(&self, sql: &str, bindings: &[Value]) -> Result<u64> {
        Ok(self.driver.outcome(sql, bindings, true)?.rows_affected)
    }

    async fn raw_query(&self, sql: &str, bindings: &[Value]) -> Result<QueryOutcome> {
        self.driver.outcome(sql, bindings, true)
    }
}

#[async_trait]
impl TransactionHandle for RecordingTransaction {
    async fn commit(&self) -> Result<()> {
        self.driver.mark("commit");
        Ok(())
    }

    async fn rollback(&self) -> Result<()> {
        self.driver.mark("rollback");
        Ok(())
    }
}

/// Lightweight helper for a dedicated in-memory SQLite connection.
#[cfg(feature = "sqlite")]
pub struct MockDatabase;

#[cfg(feature = "sqlite")]
impl MockDatabase {
    /// Single-connection pool so every statement sees the same memory database.
    pub async fn new_sqlite() -> Result<Connection> {
        let config = crate::config::ConnectionConfig::new("sqlite::memory:").with_max_connections(1);
        Connection::connect(&config).await
    }
}
