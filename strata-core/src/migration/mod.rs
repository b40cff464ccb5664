//! Migration units, the ledger repository and the batch-based runner.

mod migrator;
mod repository;

pub use migrator::{MigrationStatus, Migrator};
pub use repository::{MigrationRecord, MigrationRepository};

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::schema::SchemaBuilder;

/// One reversible schema change. `down` must undo exactly what `up` did.
#[async_trait]
pub trait Migration: Send + Sync {
    async fn up(&self, schema: &SchemaBuilder) -> Result<()>;

    async fn down(&self, schema: &SchemaBuilder) -> Result<()>;
}

/// A migration written as raw SQL scripts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlMigration {
    pub up_sql: String,
    pub down_sql: String,
}

impl SqlMigration {
    pub fn new(up_sql: impl Into<String>, down_sql: impl Into<String>) -> Self {
        Self {
            up_sql: up_sql.into(),
            down_sql: down_sql.into(),
        }
    }
}

#[async_trait]
impl Migration for SqlMigration {
    async fn up(&self, schema: &SchemaBuilder) -> Result<()> {
        if self.up_sql.trim().is_empty() {
            return Ok(());
        }
        schema.connection().raw_query(&self.up_sql, &[]).await?;
        Ok(())
    }

    async fn down(&self, schema: &SchemaBuilder) -> Result<()> {
        if self.down_sql.trim().is_empty() {
            return Err(Error::Validation("Down migration is empty.".to_owned()));
        }
        schema.connection().raw_query(&self.down_sql, &[]).await?;
        Ok(())
    }
}

/// Named migration units, kept in lexicographic name order.
///
/// Names should start with a sortable timestamp (`20240101120000_create_users`)
/// so that name order is creation order.
#[derive(Clone, Default)]
pub struct Migrations {
    units: BTreeMap<String, Arc<dyn Migration>>,
}

impl Migrations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `migration` under `name`, replacing any unit with that name.
    pub fn add(mut self, name: impl Into<String>, migration: impl Migration + 'static) -> Self {
        self.insert(name, Arc::new(migration));
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, migration: Arc<dyn Migration>) {
        self.units.insert(name.into(), migration);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Migration>> {
        self.units.get(name)
    }

    /// Resolve `name` or fail with [`Error::MigrationNotFound`].
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Migration>> {
        self.units
            .get(name)
            .cloned()
            .ok_or_else(|| Error::MigrationNotFound(name.to_owned()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.units.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn Migration>)> {
        self.units.iter().map(|(name, unit)| (name.as_str(), unit))
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

impl fmt::Debug for Migrations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.units.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;
    use crate::test_utils::RecordingDriver;

    #[test]
    fn registry_iterates_in_name_order() {
        let migrations = Migrations::new()
            .add("20240102000000_b", SqlMigration::new("b", "b"))
            .add("20240101000000_a", SqlMigration::new("a", "a"))
            .add("20240103000000_c", SqlMigration::new("c", "c"));
        assert_eq!(
            migrations.names().collect::<Vec<_>>(),
            vec!["20240101000000_a", "20240102000000_b", "20240103000000_c"]
        );
        assert_eq!(migrations.len(), 3);
    }

    #[test]
    fn resolve_reports_missing_name() {
        let err = Migrations::new().resolve("20240101000000_gone").err().unwrap();
        assert_eq!(
            err.to_string(),
            "Migration file for \"20240101000000_gone\" not found."
        );
    }

    #[tokio::test]
    async fn sql_migration_runs_scripts_and_refuses_empty_down() {
        let (connection, driver) = RecordingDriver::connection(Dialect::Sqlite);
        let schema = connection.schema();
        let migration = SqlMigration::new("create table t (id integer)", "  ");

        migration.up(&schema).await.unwrap();
        assert_eq!(driver.log(), vec!["create table t (id integer)"]);

        let err = migration.down(&schema).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
