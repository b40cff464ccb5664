//! Schema definition: blueprints, their DDL grammars and the async
//! [`SchemaBuilder`] that executes them.

mod blueprint;
mod column;
mod command;
pub mod grammar;

pub use blueprint::Blueprint;
pub use column::{ColumnDefinition, ColumnType, DefaultValue};
pub use command::{Command, CommandName, ForeignKeyCommand, IndexTarget, PlainCommand};
pub use grammar::{CompiledQuery, Modifier, SchemaGrammar};

use crate::connection::Connection;
use crate::error::Result;
use crate::value::{Row, Value};

/// Row keys that carry the column name in the various catalog listings.
const COLUMN_NAME_KEYS: [&str; 5] = ["Field", "field", "COLUMN_NAME", "column_name", "name"];

/// Builds and runs schema changes against a [`Connection`].
///
/// Statements execute one after another through the connection, so inside
/// [`Connection::transaction`] they join the open transaction. A failure
/// part way through a multi-statement change leaves the earlier statements
/// applied.
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    connection: Connection,
}

impl SchemaBuilder {
    pub fn new(connection: Connection) -> Self {
        Self { connection }
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn grammar(&self) -> &'static dyn SchemaGrammar {
        self.connection.schema_grammar()
    }

    /// Create `table` with the columns declared in `callback`.
    pub async fn create<F>(&self, table: &str, callback: F) -> Result<()>
    where
        F: FnOnce(&mut Blueprint),
    {
        let mut blueprint = Blueprint::new(table);
        blueprint.create();
        callback(&mut blueprint);
        self.build(&blueprint).await
    }

    /// Alter an existing `table`.
    pub async fn table<F>(&self, table: &str, callback: F) -> Result<()>
    where
        F: FnOnce(&mut Blueprint),
    {
        let mut blueprint = Blueprint::new(table);
        callback(&mut blueprint);
        self.build(&blueprint).await
    }

    pub async fn drop(&self, table: &str) -> Result<()> {
        self.table(table, |blueprint| blueprint.drop()).await
    }

    pub async fn drop_if_exists(&self, table: &str) -> Result<()> {
        self.table(table, |blueprint| blueprint.drop_if_exists()).await
    }

    pub async fn rename_column(&self, table: &str, from: &str, to: &str) -> Result<()> {
        self.table(table, |blueprint| blueprint.rename_column(from, to))
            .await
    }

    pub async fn drop_columns(&self, table: &str, columns: &[&str]) -> Result<()> {
        self.table(table, |blueprint| blueprint.drop_columns(columns))
            .await
    }

    pub async fn has_table(&self, table: &str) -> Result<bool> {
        let query = self.grammar().compile_table_exists(table);
        let rows = self.connection.select(&query.sql, &query.bindings).await?;
        Ok(!rows.is_empty())
    }

    /// Case-insensitive column lookup through the dialect's catalog listing.
    pub async fn has_column(&self, table: &str, column: &str) -> Result<bool> {
        let query = self.grammar().compile_column_listing(table);
        let rows = self.connection.select(&query.sql, &query.bindings).await?;
        let column = column.to_lowercase();
        Ok(rows
            .iter()
            .filter_map(column_name)
            .any(|name| name.to_lowercase() == column))
    }

    /// Compile without executing.
    pub fn to_sql(&self, blueprint: &Blueprint) -> Result<Vec<String>> {
        blueprint.to_sql(self.grammar())
    }

    /// Compile `blueprint` and execute its statements in order.
    pub async fn build(&self, blueprint: &Blueprint) -> Result<()> {
        let statements = self.to_sql(blueprint)?;
        tracing::debug!(
            table = blueprint.table(),
            statements = statements.len(),
            "strata schema"
        );
        for statement in &statements {
            self.connection.raw_query(statement, &[]).await?;
        }
        Ok(())
    }
}

/// Column name from one catalog row, trying the known keys and then the
/// first text cell.
fn column_name(row: &Row) -> Option<String> {
    for key in COLUMN_NAME_KEYS {
        if let Some(value) = row.get(key) {
            return match value {
                Value::Text(name) => Some(name.clone()),
                Value::Bytes(bytes) => String::from_utf8(bytes.clone()).ok(),
                Value::Null => None,
                other => Some(other.to_string()),
            };
        }
    }
    match row.first() {
        Some(Value::Text(name)) => Some(name.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;
    use crate::test_utils::RecordingDriver;

    #[tokio::test]
    async fn create_executes_a_single_statement() {
        let (connection, driver) = RecordingDriver::connection(Dialect::Sqlite);
        connection
            .schema()
            .create("widgets", |table| {
                table.id();
                table.string("name");
                table.json("meta").nullable();
            })
            .await
            .unwrap();

        let statements = driver.statements();
        assert_eq!(statements.len(), 1);
        assert_eq!(
            statements[0].sql,
            "create table \"widgets\" (\"id\" integer not null primary key autoincrement, \"name\" varchar(255) not null, \"meta\" text)"
        );
    }

    #[tokio::test]
    async fn helpers_run_their_commands() {
        let (connection, driver) = RecordingDriver::connection(Dialect::Postgres);
        let schema = connection.schema();
        schema.rename_column("widgets", "name", "title").await.unwrap();
        schema.drop_columns("widgets", &["legacy_field"]).await.unwrap();
        schema.drop("widgets").await.unwrap();
        schema.drop_if_exists("widgets_backup").await.unwrap();

        assert_eq!(
            driver.log(),
            vec![
                "alter table \"widgets\" rename column \"name\" to \"title\"",
                "alter table \"widgets\" drop column \"legacy_field\"",
                "drop table \"widgets\"",
                "drop table if exists \"widgets_backup\"",
            ]
        );
    }

    #[tokio::test]
    async fn has_table_checks_the_catalog() {
        let (connection, driver) = RecordingDriver::connection(Dialect::Sqlite);
        driver.push_rows(vec![Row::new().with("name", "widgets")]);
        assert!(connection.schema().has_table("widgets").await.unwrap());
        assert!(!connection.schema().has_table("gadgets").await.unwrap());

        let last = driver.last_statement().unwrap();
        assert!(last.sql.contains("sqlite_master"));
        assert_eq!(last.bindings, vec![Value::from("gadgets")]);
    }

    #[tokio::test]
    async fn has_column_normalizes_catalog_keys() {
        let (connection, driver) = RecordingDriver::connection(Dialect::MySql);
        driver.push_rows(vec![
            Row::new().with("Field", "id").with("Type", "bigint"),
            Row::new().with("Field", "Email").with("Type", "varchar(255)"),
        ]);
        assert!(connection.schema().has_column("users", "email").await.unwrap());

        driver.push_rows(vec![Row::new().with("COLUMN_NAME", "title")]);
        assert!(!connection.schema().has_column("users", "body").await.unwrap());
    }

    #[test]
    fn column_name_falls_back_to_first_text_cell() {
        let row = Row::new().with("attname", "slug").with("attnum", 3_i64);
        assert_eq!(column_name(&row).as_deref(), Some("slug"));
        assert_eq!(column_name(&Row::new().with("n", 1_i64)), None);
    }

    #[tokio::test]
    async fn failed_statement_stops_the_build() {
        let (connection, driver) = RecordingDriver::connection(Dialect::Postgres);
        driver.fail_when("create index");
        let err = connection
            .schema()
            .table("widgets", |table| {
                table.string("nickname").index();
                table.string("code").unique();
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("refused"));
        assert_eq!(driver.statements().len(), 1);
    }
}
