use crate::config::MigrationConfig;
use crate::connection::Connection;
use crate::error::Result;
use crate::query::{Direction, QueryBuilder};
use crate::value::{FromRow, Row};

/// One ledger row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationRecord {
    pub migration: String,
    pub batch: i64,
}

impl FromRow for MigrationRecord {
    fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            migration: row.require_string("migration")?,
            batch: row.require_i64("batch")?,
        })
    }
}

/// Reads and writes the migration ledger table.
#[derive(Debug, Clone)]
pub struct MigrationRepository {
    connection: Connection,
    table: String,
}

impl MigrationRepository {
    pub fn new(connection: Connection, config: &MigrationConfig) -> Self {
        Self {
            connection,
            table: config.table.clone(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    fn query<T: FromRow>(&self) -> QueryBuilder<T> {
        QueryBuilder::table(&self.connection, &self.table)
    }

    /// Create the ledger table when it does not exist yet.
    pub async fn ensure_table(&self) -> Result<()> {
        let schema = self.connection.schema();
        if schema.has_table(&self.table).await? {
            return Ok(());
        }
        tracing::debug!(table = %self.table, "strata creating migration ledger");
        schema
            .create(&self.table, |table| {
                table.id();
                table.string("migration");
                table.integer("batch");
            })
            .await
    }

    /// Applied migration names in application order.
    pub async fn get_ran(&self) -> Result<Vec<String>> {
        let rows = self
            .query::<Row>()
            .select(["migration"])
            .order_by("id", Direction::Asc)
            .get()
            .await?;
        rows.iter().map(|row| row.require_string("migration")).collect()
    }

    /// Ledger rows, newest batch first and newest row first within a batch.
    pub async fn get_migrations_descending(&self) -> Result<Vec<MigrationRecord>> {
        self.query::<MigrationRecord>()
            .select(["migration", "batch"])
            .order_by("batch", Direction::Desc)
            .order_by("id", Direction::Desc)
            .get()
            .await
    }

    pub async fn log(&self, migration: &str, batch: i64) -> Result<()> {
        let row = Row::new().with("migration", migration).with("batch", batch);
        self.query::<Row>().insert(&[row]).await?;
        Ok(())
    }

    pub async fn delete(&self, migration: &str) -> Result<()> {
        self.query::<Row>()
            .filter_eq("migration", migration)
            .delete()
            .await?;
        Ok(())
    }

    pub async fn get_last_batch_number(&self) -> Result<i64> {
        let value = self.query::<Row>().max("batch").await?;
        Ok(value.as_i64().unwrap_or(0))
    }

    /// `max(batch) + 1`, or `1` for an empty ledger.
    pub async fn get_next_batch_number(&self) -> Result<i64> {
        Ok(self.get_last_batch_number().await? + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;
    use crate::test_utils::RecordingDriver;
    use crate::value::Value;

    fn repository(dialect: Dialect) -> (MigrationRepository, RecordingDriver) {
        let (connection, driver) = RecordingDriver::connection(dialect);
        (MigrationRepository::new(connection, &MigrationConfig::default()), driver)
    }

    #[tokio::test]
    async fn ensure_table_creates_ledger_once() {
        let (repository, driver) = repository(Dialect::MySql);
        repository.ensure_table().await.unwrap();
        assert_eq!(
            driver.statements()[1].sql,
            "create table `migrations` (`id` bigint unsigned not null auto_increment primary key, `migration` varchar(255) not null, `batch` int not null)"
        );

        driver.push_rows(vec![Row::new().with("table_name", "migrations")]);
        repository.ensure_table().await.unwrap();
        assert_eq!(driver.statements().len(), 3);
    }

    #[tokio::test]
    async fn ledger_statements() {
        let (repository, driver) = repository(Dialect::Postgres);
        repository.get_migrations_descending().await.unwrap();
        repository.log("20240101000000_users", 2).await.unwrap();
        repository.delete("20240101000000_users").await.unwrap();

        let statements = driver.statements();
        assert_eq!(
            statements[0].sql,
            "select \"migration\", \"batch\" from \"migrations\" order by \"batch\" desc, \"id\" desc"
        );
        assert_eq!(
            statements[1].bindings,
            vec![Value::from("20240101000000_users"), Value::from(2_i64)]
        );
        assert_eq!(
            statements[2].sql,
            "delete from \"migrations\" where \"migration\" = ?"
        );
    }

    #[tokio::test]
    async fn next_batch_number_starts_at_one() {
        let (repository, driver) = repository(Dialect::Sqlite);
        driver.push_rows(vec![Row::new().with("aggregate", Value::Null)]);
        assert_eq!(repository.get_next_batch_number().await.unwrap(), 1);

        driver.push_rows(vec![Row::new().with("aggregate", 1_i64)]);
        assert_eq!(repository.get_next_batch_number().await.unwrap(), 2);
        assert_eq!(
            driver.last_statement().unwrap().sql,
            "select max(\"batch\") as aggregate from \"migrations\""
        );
    }

    #[test]
    fn record_hydrates_from_row() {
        let row = Row::new().with("migration", "20240101000000_users").with("batch", "3");
        assert_eq!(
            MigrationRecord::from_row(&row).unwrap(),
            MigrationRecord {
                migration: "20240101000000_users".into(),
                batch: 3
            }
        );
    }
}
