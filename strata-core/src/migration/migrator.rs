use std::collections::BTreeSet;
use std::sync::Arc;

use crate::config::MigrationConfig;
use crate::connection::Connection;
use crate::error::Result;
use crate::migration::repository::{MigrationRecord, MigrationRepository};
use crate::migration::{Migration, Migrations};
use crate::schema::SchemaBuilder;

/// Whether a registered migration has run, and in which batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    pub name: String,
    pub batch: Option<i64>,
}

impl MigrationStatus {
    pub fn is_applied(&self) -> bool {
        self.batch.is_some()
    }
}

/// Applies and reverts [`Migrations`] against the ledger.
///
/// Migrations run one at a time in name order. A ledger row is written only
/// after `up` succeeds and removed only after `down` succeeds, so a failed
/// migration is retried by the next [`Migrator::run`].
#[derive(Debug, Clone)]
pub struct Migrator {
    schema: SchemaBuilder,
    repository: MigrationRepository,
    migrations: Migrations,
    transactional: bool,
}

impl Migrator {
    pub fn new(connection: Connection, migrations: Migrations) -> Self {
        Self::with_config(connection, migrations, &MigrationConfig::default())
    }

    pub fn with_config(
        connection: Connection,
        migrations: Migrations,
        config: &MigrationConfig,
    ) -> Self {
        Self {
            schema: connection.schema(),
            repository: MigrationRepository::new(connection, config),
            migrations,
            transactional: false,
        }
    }

    /// Wrap each migration and its ledger write in one transaction.
    pub fn transactional(mut self, enabled: bool) -> Self {
        self.transactional = enabled;
        self
    }

    pub fn repository(&self) -> &MigrationRepository {
        &self.repository
    }

    pub fn migrations(&self) -> &Migrations {
        &self.migrations
    }

    /// Apply every pending migration as one new batch.
    ///
    /// Returns the applied names in order; empty when nothing was pending.
    #[tracing::instrument(skip(self), fields(table = %self.repository.table()))]
    pub async fn run(&self) -> Result<Vec<String>> {
        self.repository.ensure_table().await?;
        let ran: BTreeSet<String> = self.repository.get_ran().await?.into_iter().collect();
        let pending: Vec<(&str, &Arc<dyn Migration>)> = self
            .migrations
            .iter()
            .filter(|(name, _)| !ran.contains(*name))
            .collect();

        if pending.is_empty() {
            tracing::debug!("strata migration: nothing to migrate");
            return Ok(Vec::new());
        }

        let batch = self.repository.get_next_batch_number().await?;
        let mut applied = Vec::with_capacity(pending.len());
        for (name, unit) in pending {
            self.apply(name, unit.as_ref(), batch).await?;
            tracing::info!(operation = "migration_apply", migration = name, batch, "strata migration");
            applied.push(name.to_owned());
        }
        Ok(applied)
    }

    /// Revert the most recent `steps` batches (at least one).
    #[tracing::instrument(skip(self), fields(table = %self.repository.table()))]
    pub async fn rollback(&self, steps: usize) -> Result<Vec<String>> {
        self.repository.ensure_table().await?;
        let records = self.repository.get_migrations_descending().await?;

        let mut batches = Vec::new();
        for record in &records {
            if !batches.contains(&record.batch) {
                batches.push(record.batch);
            }
        }
        batches.truncate(steps.max(1));

        let selected = records
            .into_iter()
            .filter(|record| batches.contains(&record.batch))
            .collect();
        self.revert(selected).await
    }

    /// Revert every applied migration, newest first.
    #[tracing::instrument(skip(self), fields(table = %self.repository.table()))]
    pub async fn reset(&self) -> Result<Vec<String>> {
        self.repository.ensure_table().await?;
        let records = self.repository.get_migrations_descending().await?;
        self.revert(records).await
    }

    /// Reset, then run everything again. Returns the names applied.
    pub async fn refresh(&self) -> Result<Vec<String>> {
        self.reset().await?;
        self.run().await
    }

    /// Every registered migration with the batch it ran in, if any.
    pub async fn status(&self) -> Result<Vec<MigrationStatus>> {
        self.repository.ensure_table().await?;
        let records = self.repository.get_migrations_descending().await?;
        Ok(self
            .migrations
            .names()
            .map(|name| MigrationStatus {
                name: name.to_owned(),
                batch: records
                    .iter()
                    .find(|record| record.migration == name)
                    .map(|record| record.batch),
            })
            .collect())
    }

    async fn revert(&self, records: Vec<MigrationRecord>) -> Result<Vec<String>> {
        // Resolve everything first so a missing unit fails before any `down` runs.
        let units = records
            .iter()
            .map(|record| self.migrations.resolve(&record.migration))
            .collect::<Result<Vec<_>>>()?;

        let mut reverted = Vec::with_capacity(records.len());
        for (record, unit) in records.into_iter().zip(units) {
            self.unapply(&record.migration, unit.as_ref()).await?;
            tracing::info!(
                operation = "migration_rollback",
                migration = %record.migration,
                batch = record.batch,
                "strata migration"
            );
            reverted.push(record.migration);
        }
        Ok(reverted)
    }

    async fn apply(&self, name: &str, unit: &dyn Migration, batch: i64) -> Result<()> {
        if !self.transactional {
            unit.up(&self.schema).await?;
            return self.repository.log(name, batch).await;
        }
        self.schema
            .connection()
            .transaction(|_| async move {
                unit.up(&self.schema).await?;
                self.repository.log(name, batch).await
            })
            .await
    }

    async fn unapply(&self, name: &str, unit: &dyn Migration) -> Result<()> {
        if !self.transactional {
            unit.down(&self.schema).await?;
            return self.repository.delete(name).await;
        }
        self.schema
            .connection()
            .transaction(|_| async move {
                unit.down(&self.schema).await?;
                self.repository.delete(name).await
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::dialect::Dialect;
    use crate::error::Error;
    use crate::test_utils::RecordingDriver;
    use crate::value::{Row, Value};

    /// Records `up:<name>` / `down:<name>` into a shared journal.
    struct Journaled {
        name: &'static str,
        journal: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Migration for Journaled {
        async fn up(&self, _schema: &SchemaBuilder) -> Result<()> {
            self.journal.lock().unwrap().push(format!("up:{}", self.name));
            Ok(())
        }

        async fn down(&self, _schema: &SchemaBuilder) -> Result<()> {
            self.journal.lock().unwrap().push(format!("down:{}", self.name));
            Ok(())
        }
    }

    fn registry(names: &[&'static str], journal: &Arc<Mutex<Vec<String>>>) -> Migrations {
        names.iter().copied().fold(Migrations::new(), |migrations, name| {
            migrations.add(
                name,
                Journaled {
                    name,
                    journal: Arc::clone(journal),
                },
            )
        })
    }

    fn ledger_exists() -> Vec<Row> {
        vec![Row::new().with("name", "migrations")]
    }

    fn record(name: &str, batch: i64) -> Row {
        Row::new().with("migration", name).with("batch", batch)
    }

    #[tokio::test]
    async fn run_applies_pending_in_name_order_as_one_batch() {
        let journal = Arc::default();
        let (connection, driver) = RecordingDriver::connection(Dialect::Sqlite);
        let migrator = Migrator::new(connection, registry(&["2_posts", "1_users", "3_tags"], &journal));

        driver.push_rows(ledger_exists());
        driver.push_rows(vec![Row::new().with("migration", "1_users")]);
        driver.push_rows(vec![Row::new().with("aggregate", 1_i64)]);

        let applied = migrator.run().await.unwrap();
        assert_eq!(applied, vec!["2_posts", "3_tags"]);
        assert_eq!(*journal.lock().unwrap(), vec!["up:2_posts", "up:3_tags"]);

        let inserts: Vec<_> = driver
            .statements()
            .into_iter()
            .filter(|statement| statement.sql.starts_with("insert"))
            .map(|statement| statement.bindings)
            .collect();
        assert_eq!(
            inserts,
            vec![
                vec![Value::from("2_posts"), Value::from(2_i64)],
                vec![Value::from("3_tags"), Value::from(2_i64)],
            ]
        );
    }

    #[tokio::test]
    async fn run_with_nothing_pending_is_a_no_op() {
        let journal = Arc::default();
        let (connection, driver) = RecordingDriver::connection(Dialect::Sqlite);
        let migrator = Migrator::new(connection, registry(&["1_users"], &journal));

        driver.push_rows(ledger_exists());
        driver.push_rows(vec![Row::new().with("migration", "1_users")]);

        assert!(migrator.run().await.unwrap().is_empty());
        assert!(journal.lock().unwrap().is_empty());
        assert_eq!(driver.statements().len(), 2);
    }

    #[tokio::test]
    async fn rollback_reverts_latest_batches_newest_first() {
        let journal = Arc::default();
        let (connection, driver) = RecordingDriver::connection(Dialect::Sqlite);
        let migrator = Migrator::new(connection, registry(&["1_users", "2_posts", "3_tags"], &journal));

        driver.push_rows(ledger_exists());
        driver.push_rows(vec![record("3_tags", 2), record("2_posts", 1), record("1_users", 1)]);

        let reverted = migrator.rollback(1).await.unwrap();
        assert_eq!(reverted, vec!["3_tags"]);

        driver.push_rows(ledger_exists());
        driver.push_rows(vec![record("2_posts", 1), record("1_users", 1)]);
        let reverted = migrator.rollback(0).await.unwrap();
        assert_eq!(reverted, vec!["2_posts", "1_users"]);
        assert_eq!(
            *journal.lock().unwrap(),
            vec!["down:3_tags", "down:2_posts", "down:1_users"]
        );
    }

    #[tokio::test]
    async fn rollback_on_empty_ledger_returns_nothing() {
        let journal = Arc::default();
        let (connection, driver) = RecordingDriver::connection(Dialect::Sqlite);
        let migrator = Migrator::new(connection, registry(&["1_users"], &journal));
        driver.push_rows(ledger_exists());

        assert!(migrator.rollback(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_unit_fails_before_any_down() {
        let journal = Arc::default();
        let (connection, driver) = RecordingDriver::connection(Dialect::Sqlite);
        let migrator = Migrator::new(connection, registry(&["1_users"], &journal));

        driver.push_rows(ledger_exists());
        driver.push_rows(vec![record("2_gone", 1), record("1_users", 1)]);

        let err = migrator.reset().await.unwrap_err();
        assert!(matches!(err, Error::MigrationNotFound(name) if name == "2_gone"));
        assert!(journal.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn transactional_runs_wrap_each_migration() {
        let journal = Arc::default();
        let (connection, driver) = RecordingDriver::connection(Dialect::Sqlite);
        let migrator =
            Migrator::new(connection, registry(&["1_users"], &journal)).transactional(true);

        driver.push_rows(ledger_exists());
        driver.push_rows(Vec::new());
        driver.push_rows(Vec::new());

        migrator.run().await.unwrap();
        let log = driver.log();
        assert_eq!(log[log.len() - 3], "begin");
        assert!(log[log.len() - 2].starts_with("tx: insert into \"migrations\""));
        assert_eq!(log[log.len() - 1], "commit");
    }

    #[tokio::test]
    async fn status_reports_batches() {
        let journal = Arc::default();
        let (connection, driver) = RecordingDriver::connection(Dialect::Sqlite);
        let migrator = Migrator::new(connection, registry(&["1_users", "2_posts"], &journal));

        driver.push_rows(ledger_exists());
        driver.push_rows(vec![record("1_users", 1)]);

        let status = migrator.status().await.unwrap();
        assert_eq!(
            status,
            vec![
                MigrationStatus {
                    name: "1_users".into(),
                    batch: Some(1)
                },
                MigrationStatus {
                    name: "2_posts".into(),
                    batch: None
                },
            ]
        );
        assert!(status[0].is_applied());
    }
}
