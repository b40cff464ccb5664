//! Bundled [`Driver`]s on sqlx's native pools, one per compiled-in backend.
//!
//! Each backend binds [`Value`](crate::value::Value)s and decodes its own row
//! types, so temporal, uuid, json and numeric columns come back as cells.

use std::sync::Arc;

use sqlx::pool::PoolOptions;

use crate::config::ConnectionConfig;
use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::executor::Driver;

/// Generates the pool driver, its transaction handle and the statement plumbing
/// for one sqlx database. The invoking module supplies `bind_value`,
/// `decode_cell`, `last_insert_id` and `statement_cache`.
macro_rules! native_driver {
    ($(#[$meta:meta])* $driver:ident, $transaction:ident, $db:ty, $dialect:expr) => {
        type NativeQuery<'q> = sqlx::query::Query<'q, $db, <$db as sqlx::Database>::Arguments<'q>>;

        /// Either the shared pool or a single connection checked out for a transaction.
        enum Target<'a> {
            Pool(&'a sqlx::Pool<$db>),
            Conn(&'a mut <$db as sqlx::Database>::Connection),
        }

        impl Target<'_> {
            fn prepare<'q>(sql: &'q str, bindings: &[$crate::value::Value]) -> NativeQuery<'q> {
                bindings
                    .iter()
                    .fold(sqlx::query::<$db>(sql), bind_value)
                    .persistent(statement_cache(bindings))
            }

            async fn fetch_all(
                &mut self,
                sql: &str,
                bindings: &[$crate::value::Value],
            ) -> $crate::error::Result<Vec<$crate::value::Row>> {
                let query = Self::prepare(sql, bindings);
                let rows = match self {
                    Self::Pool(pool) => query.fetch_all(*pool).await?,
                    Self::Conn(conn) => query.fetch_all(&mut **conn).await?,
                };
                rows.iter().map(decode_row).collect()
            }

            async fn execute(
                &mut self,
                sql: &str,
                bindings: &[$crate::value::Value],
            ) -> $crate::error::Result<$crate::executor::QueryOutcome> {
                // Without bindings the statement goes through the unprepared path, which
                // accepts several `;`-separated statements.
                let result = if bindings.is_empty() {
                    match self {
                        Self::Pool(pool) => sqlx::Executor::execute(*pool, sql).await?,
                        Self::Conn(conn) => sqlx::Executor::execute(&mut **conn, sql).await?,
                    }
                } else {
                    let query = Self::prepare(sql, bindings);
                    match self {
                        Self::Pool(pool) => query.execute(*pool).await?,
                        Self::Conn(conn) => query.execute(&mut **conn).await?,
                    }
                };
                Ok($crate::executor::QueryOutcome {
                    rows_affected: result.rows_affected(),
                    last_insert_id: last_insert_id(&result),
                })
            }

            async fn select(
                &mut self,
                sql: &str,
                bindings: &[$crate::value::Value],
            ) -> $crate::error::Result<Vec<$crate::value::Row>> {
                let sql = $dialect.rewrite_placeholders(sql);
                self.fetch_all(&sql, bindings).await
            }

            async fn insert(
                &mut self,
                sql: &str,
                bindings: &[$crate::value::Value],
            ) -> $crate::error::Result<Option<i64>> {
                let sql = $dialect.rewrite_placeholders(sql);
                if $dialect.supports_returning() {
                    let rows = self.fetch_all(&sql, bindings).await?;
                    return Ok(rows
                        .first()
                        .and_then($crate::value::Row::first)
                        .and_then($crate::value::Value::as_i64));
                }
                Ok(self.execute(&sql, bindings).await?.last_insert_id)
            }

            async fn raw(
                &mut self,
                sql: &str,
                bindings: &[$crate::value::Value],
            ) -> $crate::error::Result<$crate::executor::QueryOutcome> {
                let sql = $dialect.rewrite_placeholders(sql);
                self.execute(&sql, bindings).await
            }
        }

        fn decode_row(row: &<$db as sqlx::Database>::Row) -> $crate::error::Result<$crate::value::Row> {
            use sqlx::{Column as _, Row as _};

            row.columns()
                .iter()
                .map(|column| -> $crate::error::Result<(String, $crate::value::Value)> {
                    Ok((column.name().to_owned(), decode_cell(row, column.ordinal())?))
                })
                .collect()
        }

        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $driver {
            pool: sqlx::Pool<$db>,
        }

        impl $driver {
            /// Open a pool for `config`.
            pub async fn connect(config: &$crate::config::ConnectionConfig) -> $crate::error::Result<Self> {
                let pool = super::pool_options::<$db>(config).connect(&config.url).await?;
                tracing::debug!(dialect = $dialect.label(), "strata pool connected");
                Ok(Self { pool })
            }

            /// Wrap an existing pool.
            pub fn from_pool(pool: sqlx::Pool<$db>) -> Self {
                Self { pool }
            }

            pub fn pool(&self) -> &sqlx::Pool<$db> {
                &self.pool
            }
        }

        #[async_trait::async_trait]
        impl $crate::executor::Executor for $driver {
            async fn select(
                &self,
                sql: &str,
                bindings: &[$crate::value::Value],
            ) -> $crate::error::Result<Vec<$crate::value::Row>> {
                Target::Pool(&self.pool).select(sql, bindings).await
            }

            async fn insert(
                &self,
                sql: &str,
                bindings: &[$crate::value::Value],
            ) -> $crate::error::Result<Option<i64>> {
                Target::Pool(&self.pool).insert(sql, bindings).await
            }

            async fn update(&self, sql: &str, bindings: &[$crate::value::Value]) -> $crate::error::Result<u64> {
                let outcome = Target::Pool(&self.pool).raw(sql, bindings).await?;
                Ok(outcome.rows_affected)
            }

            async fn raw_query(
                &self,
                sql: &str,
                bindings: &[$crate::value::Value],
            ) -> $crate::error::Result<$crate::executor::QueryOutcome> {
                Target::Pool(&self.pool).raw(sql, bindings).await
            }
        }

        #[async_trait::async_trait]
        impl $crate::executor::Driver for $driver {
            fn dialect(&self) -> $crate::dialect::Dialect {
                $dialect
            }

            async fn begin(
                &self,
            ) -> $crate::error::Result<std::sync::Arc<dyn $crate::executor::TransactionHandle>> {
                let tx = self.pool.begin().await?;
                Ok(std::sync::Arc::new($transaction {
                    tx: tokio::sync::Mutex::new(Some(tx)),
                }))
            }
        }

        #[doc = concat!("Transaction opened by [`", stringify!($driver), "::begin`]. Statements run one at a time.")]
        pub struct $transaction {
            tx: tokio::sync::Mutex<Option<sqlx::Transaction<'static, $db>>>,
        }

        #[async_trait::async_trait]
        impl $crate::executor::Executor for $transaction {
            async fn select(
                &self,
                sql: &str,
                bindings: &[$crate::value::Value],
            ) -> $crate::error::Result<Vec<$crate::value::Row>> {
                let mut guard = self.tx.lock().await;
                let tx = guard.as_mut().ok_or_else(super::finished)?;
                Target::Conn(&mut **tx).select(sql, bindings).await
            }

            async fn insert(
                &self,
                sql: &str,
                bindings: &[$crate::value::Value],
            ) -> $crate::error::Result<Option<i64>> {
                let mut guard = self.tx.lock().await;
                let tx = guard.as_mut().ok_or_else(super::finished)?;
                Target::Conn(&mut **tx).insert(sql, bindings).await
            }

            async fn update(&self, sql: &str, bindings: &[$crate::value::Value]) -> $crate::error::Result<u64> {
                Ok(self.raw_query(sql, bindings).await?.rows_affected)
            }

            async fn raw_query(
                &self,
                sql: &str,
                bindings: &[$crate::value::Value],
            ) -> $crate::error::Result<$crate::executor::QueryOutcome> {
                let mut guard = self.tx.lock().await;
                let tx = guard.as_mut().ok_or_else(super::finished)?;
                Target::Conn(&mut **tx).raw(sql, bindings).await
            }
        }

        #[async_trait::async_trait]
        impl $crate::executor::TransactionHandle for $transaction {
            async fn commit(&self) -> $crate::error::Result<()> {
                let tx = self.tx.lock().await.take().ok_or_else(super::finished)?;
                tx.commit().await?;
                Ok(())
            }

            async fn rollback(&self) -> $crate::error::Result<()> {
                let tx = self.tx.lock().await.take().ok_or_else(super::finished)?;
                tx.rollback().await?;
                Ok(())
            }
        }
    };
}

#[cfg(feature = "mysql")]
mod mysql;
#[cfg(feature = "postgres")]
mod postgres;
#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(feature = "mysql")]
pub use mysql::{MySqlDriver, MySqlTransaction};
#[cfg(feature = "postgres")]
pub use postgres::{PostgresDriver, PostgresTransaction};
#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteDriver, SqliteTransaction};

/// Open a pool for the dialect `config` resolves to.
pub async fn connect(config: &ConnectionConfig) -> Result<Arc<dyn Driver>> {
    let dialect = config.resolve_dialect()?;
    let driver: Arc<dyn Driver> = match dialect {
        #[cfg(feature = "mysql")]
        Dialect::MySql => Arc::new(MySqlDriver::connect(config).await?),
        #[cfg(feature = "postgres")]
        Dialect::Postgres => Arc::new(PostgresDriver::connect(config).await?),
        #[cfg(feature = "sqlite")]
        Dialect::Sqlite => Arc::new(SqliteDriver::connect(config).await?),
        #[allow(unreachable_patterns)]
        other => {
            return Err(Error::Configuration(format!(
                "strata was built without the `{}` feature",
                other.label()
            )));
        }
    };
    Ok(driver)
}

fn pool_options<DB: sqlx::Database>(config: &ConnectionConfig) -> PoolOptions<DB> {
    let mut options = PoolOptions::<DB>::new();
    if let Some(max) = config.max_connections {
        options = options.max_connections(max);
    }
    if let Some(min) = config.min_connections {
        options = options.min_connections(min);
    }
    if let Some(timeout) = config.acquire_timeout() {
        options = options.acquire_timeout(timeout);
    }
    options
}

fn finished() -> Error {
    Error::Transaction("transaction already finished".to_owned())
}
