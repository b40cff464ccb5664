//! Strata: dialect-aware query and schema compilation plus a batch-based
//! migration runner for MySQL, PostgreSQL and SQLite.
//!
//! A [`Connection`] wraps any [`Driver`]. From it, [`Connection::table`] opens a
//! fluent [`QueryBuilder`], [`Connection::schema`] opens a [`SchemaBuilder`] and
//! a [`Migrator`] applies registered [`Migration`]s in batches.

pub use async_trait;
pub use sqlx;

pub mod config;
pub mod connection;
pub mod dialect;
#[cfg(any(feature = "sqlite", feature = "postgres", feature = "mysql"))]
pub mod driver;
pub mod error;
pub mod executor;
pub mod metrics;
pub mod migration;
pub mod model;
pub mod query;
pub mod schema;
pub mod test_utils;
pub mod value;

pub use config::{ConnectionConfig, MigrationConfig};
pub use connection::Connection;
pub use dialect::Dialect;
#[cfg(feature = "mysql")]
pub use driver::MySqlDriver;
#[cfg(feature = "postgres")]
pub use driver::PostgresDriver;
#[cfg(feature = "sqlite")]
pub use driver::SqliteDriver;
pub use error::{Error, Result};
pub use executor::{Driver, Executor, QueryOutcome, TransactionHandle};
pub use migration::{Migration, MigrationStatus, Migrations, Migrator, SqlMigration};
pub use model::Model;
pub use query::{Direction, QueryBuilder};
pub use schema::{Blueprint, SchemaBuilder};
pub use value::{Attributes, FromRow, Row, Value};

pub mod prelude {
    pub use crate::{
        Blueprint, Connection, Direction, FromRow, Migration, Migrations, Migrator, Model,
        QueryBuilder, Row, SchemaBuilder, Value,
    };
}
