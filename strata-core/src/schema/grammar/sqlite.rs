use crate::dialect::Dialect;
use crate::error::Result;
use crate::schema::blueprint::Blueprint;
use crate::schema::column::{ColumnDefinition, ColumnType};
use crate::schema::command::{Command, CommandName, PlainCommand};
use crate::schema::grammar::{CompiledQuery, Modifier, SchemaGrammar};
use crate::value::Value;

/// SQLite DDL.
///
/// SQLite cannot add foreign keys after creation, so `create table` inlines
/// them. `alter table` accepts one column per statement, so adds and drops
/// produce one statement per column.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteSchemaGrammar;

const MODIFIERS: &[Modifier] = &[Modifier::Nullable, Modifier::Default, Modifier::Increment];

impl SchemaGrammar for SqliteSchemaGrammar {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn modifiers(&self) -> &'static [Modifier] {
        MODIFIERS
    }

    fn column_type(&self, column: &ColumnDefinition) -> Result<String> {
        let sql = match column.column_type {
            ColumnType::Uuid => "varchar(36)".to_owned(),
            ColumnType::Integer
            | ColumnType::TinyInteger
            | ColumnType::SmallInteger
            | ColumnType::BigInteger
            | ColumnType::Boolean
            | ColumnType::Year => "integer".to_owned(),
            ColumnType::Char => format!("char({})", column.length.unwrap_or(255)),
            ColumnType::String => format!("varchar({})", column.length.unwrap_or(255)),
            ColumnType::Text | ColumnType::LongText | ColumnType::Json => "text".to_owned(),
            ColumnType::Float => "float".to_owned(),
            ColumnType::Double => "double".to_owned(),
            ColumnType::Date => "date".to_owned(),
            ColumnType::DateTime | ColumnType::Timestamp => "datetime".to_owned(),
            ColumnType::Time => "time".to_owned(),
            ColumnType::Binary => "blob".to_owned(),
        };
        Ok(sql)
    }

    fn compile_table_exists(&self, table: &str) -> CompiledQuery {
        CompiledQuery::new(
            "select name from sqlite_master where type = 'table' and name = ? limit 1",
            vec![Value::from(table)],
        )
    }

    fn compile_column_listing(&self, table: &str) -> CompiledQuery {
        CompiledQuery::new("select name from pragma_table_info(?)", vec![Value::from(table)])
    }

    /// Nullable columns carry no token at all.
    fn modify_nullable(&self, column: &ColumnDefinition) -> String {
        if column.nullable {
            String::new()
        } else {
            " not null".to_owned()
        }
    }

    fn modify_increment(&self, column: &ColumnDefinition, commands: &mut [Command]) -> String {
        if !column.auto_increment {
            return String::new();
        }
        for command in commands.iter_mut() {
            if command.is(CommandName::Primary) {
                command.skip();
            }
        }
        " primary key autoincrement".to_owned()
    }

    fn compile_create(&self, blueprint: &Blueprint, commands: &mut [Command]) -> Result<String> {
        let mut structure = self.compile_columns(blueprint, commands)?;
        structure.extend(self.inline_primary_key(commands));

        for command in commands.iter_mut() {
            if let Command::Foreign(foreign) = command {
                foreign.ensure_target()?;
                structure.push(format!(
                    "constraint {} {}",
                    self.wrap(&foreign.index_name),
                    self.foreign_key_clause(foreign)
                ));
                foreign.should_be_skipped = true;
            }
        }

        Ok(format!(
            "create table {} ({})",
            self.wrap_table(blueprint.table()),
            structure.join(", ")
        ))
    }

    fn compile_add(&self, blueprint: &Blueprint, commands: &mut [Command]) -> Result<Vec<String>> {
        let table = self.wrap_table(blueprint.table());
        Ok(self
            .compile_columns(blueprint, commands)?
            .into_iter()
            .map(|column| format!("alter table {table} add column {column}"))
            .collect())
    }

    fn compile_unique(&self, blueprint: &Blueprint, command: &PlainCommand) -> String {
        format!(
            "create unique index {} on {} ({})",
            self.wrap(&command.index_name),
            self.wrap_table(blueprint.table()),
            self.columnize(&command.columns)
        )
    }

    fn compile_drop_unique(&self, _blueprint: &Blueprint, command: &PlainCommand) -> String {
        format!("drop index if exists {}", self.wrap(&command.index_name))
    }

    fn compile_drop_index(&self, _blueprint: &Blueprint, command: &PlainCommand) -> String {
        format!("drop index if exists {}", self.wrap(&command.index_name))
    }

    fn compile_drop_column(&self, blueprint: &Blueprint, command: &PlainCommand) -> Vec<String> {
        let table = self.wrap_table(blueprint.table());
        command
            .columns
            .iter()
            .map(|column| format!("alter table {table} drop column {}", self.wrap(column)))
            .collect()
    }
}
