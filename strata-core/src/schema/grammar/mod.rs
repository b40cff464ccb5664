//! Per-dialect DDL compilers for [`Blueprint`]s.
//!
//! Each command is compiled on its own; a command may mark later ones as
//! skipped when its statement already covers them (an inlined primary key,
//! SQLite's inlined foreign keys).

mod mysql;
mod postgres;
mod sqlite;

pub use mysql::MySqlSchemaGrammar;
pub use postgres::PostgresSchemaGrammar;
pub use sqlite::SqliteSchemaGrammar;

use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::schema::blueprint::Blueprint;
use crate::schema::column::{ColumnDefinition, DefaultValue};
use crate::schema::command::{Command, CommandName, ForeignKeyCommand, PlainCommand};
use crate::value::Value;

/// Column modifiers, applied in the order a grammar lists them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    Unsigned,
    Nullable,
    Default,
    OnUpdate,
    Increment,
    Comment,
    After,
    First,
}

/// An introspection query with its bindings.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub sql: String,
    pub bindings: Vec<Value>,
}

impl CompiledQuery {
    pub fn new(sql: impl Into<String>, bindings: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            bindings,
        }
    }
}

const CURRENT_TIMESTAMP: &str = "CURRENT_TIMESTAMP";

/// Compiles blueprints into DDL for one dialect.
///
/// Defaults follow the PostgreSQL statement shapes; dialects override the
/// statements and modifiers whose syntax differs.
pub trait SchemaGrammar: Send + Sync {
    fn dialect(&self) -> Dialect;

    fn modifiers(&self) -> &'static [Modifier];

    /// SQL type for `column`.
    fn column_type(&self, column: &ColumnDefinition) -> Result<String> {
        Err(Error::unsupported(
            format!("the {} type", column.column_type.name()),
            self.dialect(),
        ))
    }

    fn compile_table_exists(&self, table: &str) -> CompiledQuery;

    fn compile_column_listing(&self, table: &str) -> CompiledQuery;

    fn wrap(&self, value: &str) -> String {
        if value == "*" {
            return value.to_owned();
        }
        self.dialect().quote_identifier(value)
    }

    fn wrap_table(&self, table: &str) -> String {
        self.wrap(table)
    }

    fn columnize(&self, columns: &[String]) -> String {
        columns
            .iter()
            .map(|column| self.wrap(column))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Compile `commands[index]`, returning zero or more statements.
    fn compile_command(
        &self,
        blueprint: &Blueprint,
        commands: &mut [Command],
        index: usize,
    ) -> Result<Vec<String>> {
        let command = match &commands[index] {
            Command::Foreign(foreign) => {
                foreign.ensure_target()?;
                return Ok(vec![self.compile_foreign(blueprint, foreign)]);
            }
            Command::Plain(plain) => plain.clone(),
        };

        let statement = match command.name {
            CommandName::Create => self.compile_create(blueprint, commands)?,
            CommandName::Add => return self.compile_add(blueprint, commands),
            CommandName::DropColumn => return Ok(self.compile_drop_column(blueprint, &command)),
            CommandName::Drop => self.compile_drop(blueprint),
            CommandName::DropIfExists => self.compile_drop_if_exists(blueprint),
            CommandName::Primary => self.compile_primary(blueprint, &command),
            CommandName::Unique => self.compile_unique(blueprint, &command),
            CommandName::Index => self.compile_index(blueprint, &command),
            CommandName::DropPrimary => self.compile_drop_primary(blueprint, &command),
            CommandName::DropUnique => self.compile_drop_unique(blueprint, &command),
            CommandName::DropIndex => self.compile_drop_index(blueprint, &command),
            CommandName::DropForeign => self.compile_drop_foreign(blueprint, &command),
            CommandName::RenameColumn => self.compile_rename_column(blueprint, &command)?,
        };
        Ok(vec![statement])
    }

    /// `<name> <type><modifiers>` for every blueprint column.
    fn compile_columns(&self, blueprint: &Blueprint, commands: &mut [Command]) -> Result<Vec<String>> {
        blueprint
            .columns()
            .iter()
            .map(|column| {
                let mut sql = format!("{} {}", self.wrap(&column.name), self.column_type(column)?);
                for modifier in self.modifiers() {
                    sql.push_str(&self.compile_modifier(*modifier, column, commands));
                }
                Ok(sql)
            })
            .collect()
    }

    fn compile_modifier(
        &self,
        modifier: Modifier,
        column: &ColumnDefinition,
        commands: &mut [Command],
    ) -> String {
        match modifier {
            Modifier::Unsigned => self.modify_unsigned(column),
            Modifier::Nullable => self.modify_nullable(column),
            Modifier::Default => self.modify_default(column),
            Modifier::OnUpdate => self.modify_on_update(column),
            Modifier::Increment => self.modify_increment(column, commands),
            Modifier::Comment => self.modify_comment(column),
            Modifier::After => self.modify_after(column),
            Modifier::First => self.modify_first(column),
        }
    }

    fn modify_nullable(&self, column: &ColumnDefinition) -> String {
        if column.nullable {
            " null".to_owned()
        } else {
            " not null".to_owned()
        }
    }

    fn modify_default(&self, column: &ColumnDefinition) -> String {
        self.column_default(column)
            .map(|value| format!(" default {value}"))
            .unwrap_or_default()
    }

    fn modify_unsigned(&self, _column: &ColumnDefinition) -> String {
        String::new()
    }

    fn modify_on_update(&self, _column: &ColumnDefinition) -> String {
        String::new()
    }

    fn modify_increment(&self, _column: &ColumnDefinition, _commands: &mut [Command]) -> String {
        String::new()
    }

    fn modify_comment(&self, _column: &ColumnDefinition) -> String {
        String::new()
    }

    fn modify_after(&self, _column: &ColumnDefinition) -> String {
        String::new()
    }

    fn modify_first(&self, _column: &ColumnDefinition) -> String {
        String::new()
    }

    /// The rendered default; `use_current` wins on datetime/timestamp columns.
    fn column_default(&self, column: &ColumnDefinition) -> Option<String> {
        if column.use_current && column.column_type.is_current_timestamp_capable() {
            return Some(CURRENT_TIMESTAMP.to_owned());
        }
        column
            .default
            .as_ref()
            .map(|value| self.compile_default_value(value))
    }

    fn compile_default_value(&self, value: &DefaultValue) -> String {
        match value {
            DefaultValue::Raw(raw) => raw.clone(),
            DefaultValue::Integer(value) => value.to_string(),
            DefaultValue::Float(value) => value.to_string(),
            DefaultValue::Bool(value) => u8::from(*value).to_string(),
        }
    }

    /// Inline the first pending primary command as `primary key (...)`.
    fn inline_primary_key(&self, commands: &mut [Command]) -> Option<String> {
        let command = commands
            .iter_mut()
            .find(|command| command.is(CommandName::Primary) && !command.is_skipped())?;
        command.skip();
        match command {
            Command::Plain(primary) => Some(format!("primary key ({})", self.columnize(&primary.columns))),
            Command::Foreign(_) => None,
        }
    }

    fn compile_create(&self, blueprint: &Blueprint, commands: &mut [Command]) -> Result<String> {
        let mut structure = self.compile_columns(blueprint, commands)?;
        structure.extend(self.inline_primary_key(commands));
        Ok(format!(
            "create table {} ({})",
            self.wrap_table(blueprint.table()),
            structure.join(", ")
        ))
    }

    fn compile_add(&self, blueprint: &Blueprint, commands: &mut [Command]) -> Result<Vec<String>> {
        let columns = self
            .compile_columns(blueprint, commands)?
            .into_iter()
            .map(|column| format!("add column {column}"))
            .collect::<Vec<_>>();
        Ok(vec![format!(
            "alter table {} {}",
            self.wrap_table(blueprint.table()),
            columns.join(", ")
        )])
    }

    /// `foreign key (...) references t (c)[ on delete ..][ on update ..]`
    fn foreign_key_clause(&self, command: &ForeignKeyCommand) -> String {
        let mut sql = format!(
            "foreign key ({}) references {} ({})",
            self.columnize(&command.columns),
            self.wrap_table(&command.reference_table),
            self.wrap(&command.reference_column)
        );
        if let Some(action) = &command.on_delete {
            sql.push_str(" on delete ");
            sql.push_str(action);
        }
        if let Some(action) = &command.on_update {
            sql.push_str(" on update ");
            sql.push_str(action);
        }
        sql
    }

    fn compile_foreign(&self, blueprint: &Blueprint, command: &ForeignKeyCommand) -> String {
        format!(
            "alter table {} add constraint {} {}",
            self.wrap_table(blueprint.table()),
            self.wrap(&command.index_name),
            self.foreign_key_clause(command)
        )
    }

    fn compile_primary(&self, blueprint: &Blueprint, command: &PlainCommand) -> String {
        format!(
            "alter table {} add constraint {} primary key ({})",
            self.wrap_table(blueprint.table()),
            self.wrap(&command.index_name),
            self.columnize(&command.columns)
        )
    }

    fn compile_unique(&self, blueprint: &Blueprint, command: &PlainCommand) -> String {
        format!(
            "alter table {} add constraint {} unique ({})",
            self.wrap_table(blueprint.table()),
            self.wrap(&command.index_name),
            self.columnize(&command.columns)
        )
    }

    fn compile_index(&self, blueprint: &Blueprint, command: &PlainCommand) -> String {
        format!(
            "create index {} on {} ({})",
            self.wrap(&command.index_name),
            self.wrap_table(blueprint.table()),
            self.columnize(&command.columns)
        )
    }

    fn compile_drop(&self, blueprint: &Blueprint) -> String {
        format!("drop table {}", self.wrap_table(blueprint.table()))
    }

    fn compile_drop_if_exists(&self, blueprint: &Blueprint) -> String {
        format!("drop table if exists {}", self.wrap_table(blueprint.table()))
    }

    fn compile_drop_primary(&self, blueprint: &Blueprint, command: &PlainCommand) -> String {
        self.compile_drop_constraint(blueprint, command)
    }

    fn compile_drop_unique(&self, blueprint: &Blueprint, command: &PlainCommand) -> String {
        self.compile_drop_constraint(blueprint, command)
    }

    fn compile_drop_index(&self, _blueprint: &Blueprint, command: &PlainCommand) -> String {
        format!("drop index {}", self.wrap(&command.index_name))
    }

    fn compile_drop_foreign(&self, blueprint: &Blueprint, command: &PlainCommand) -> String {
        self.compile_drop_constraint(blueprint, command)
    }

    fn compile_drop_constraint(&self, blueprint: &Blueprint, command: &PlainCommand) -> String {
        format!(
            "alter table {} drop constraint {}",
            self.wrap_table(blueprint.table()),
            self.wrap(&command.index_name)
        )
    }

    fn compile_drop_column(&self, blueprint: &Blueprint, command: &PlainCommand) -> Vec<String> {
        let columns = command
            .columns
            .iter()
            .map(|column| format!("drop column {}", self.wrap(column)))
            .collect::<Vec<_>>();
        vec![format!(
            "alter table {} {}",
            self.wrap_table(blueprint.table()),
            columns.join(", ")
        )]
    }

    fn compile_rename_column(&self, blueprint: &Blueprint, command: &PlainCommand) -> Result<String> {
        let (from, to) = command.rename_pair()?;
        Ok(format!(
            "alter table {} rename column {} to {}",
            self.wrap_table(blueprint.table()),
            self.wrap(from),
            self.wrap(to)
        ))
    }
}

/// Whether a primary key command is present, skipped or not.
pub(crate) fn has_primary(commands: &[Command]) -> bool {
    commands.iter().any(|command| command.is(CommandName::Primary))
}
