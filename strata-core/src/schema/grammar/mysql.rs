use crate::dialect::Dialect;
use crate::error::Result;
use crate::schema::blueprint::Blueprint;
use crate::schema::column::{ColumnDefinition, ColumnType};
use crate::schema::command::{Command, PlainCommand};
use crate::schema::grammar::{has_primary, CompiledQuery, Modifier, SchemaGrammar, CURRENT_TIMESTAMP};
use crate::value::Value;

/// MySQL / MariaDB DDL.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlSchemaGrammar;

const MODIFIERS: &[Modifier] = &[
    Modifier::Unsigned,
    Modifier::Nullable,
    Modifier::Default,
    Modifier::OnUpdate,
    Modifier::Increment,
    Modifier::Comment,
    Modifier::After,
    Modifier::First,
];

impl SchemaGrammar for MySqlSchemaGrammar {
    fn dialect(&self) -> Dialect {
        Dialect::MySql
    }

    fn modifiers(&self) -> &'static [Modifier] {
        MODIFIERS
    }

    fn column_type(&self, column: &ColumnDefinition) -> Result<String> {
        let sql = match column.column_type {
            ColumnType::Uuid => "char(36)".to_owned(),
            ColumnType::Integer => "int".to_owned(),
            ColumnType::TinyInteger => "tinyint".to_owned(),
            ColumnType::SmallInteger => "smallint".to_owned(),
            ColumnType::BigInteger => "bigint".to_owned(),
            ColumnType::Char => format!("char({})", column.length.unwrap_or(255)),
            ColumnType::String => format!("varchar({})", column.length.unwrap_or(255)),
            ColumnType::Text => "text".to_owned(),
            ColumnType::LongText => "longtext".to_owned(),
            ColumnType::Float => match column.precision {
                Some(precision) => format!("float({precision})"),
                None => "float".to_owned(),
            },
            ColumnType::Double => "double".to_owned(),
            ColumnType::Boolean => "tinyint(1)".to_owned(),
            ColumnType::Date => "date".to_owned(),
            ColumnType::DateTime => "datetime".to_owned(),
            ColumnType::Time => "time".to_owned(),
            ColumnType::Timestamp => "timestamp".to_owned(),
            ColumnType::Year => "year".to_owned(),
            ColumnType::Json => "json".to_owned(),
            ColumnType::Binary => "blob".to_owned(),
        };
        Ok(sql)
    }

    fn compile_table_exists(&self, table: &str) -> CompiledQuery {
        CompiledQuery::new(
            "select table_name from information_schema.tables where table_schema = database() and table_name = ? limit 1",
            vec![Value::from(table)],
        )
    }

    fn compile_column_listing(&self, table: &str) -> CompiledQuery {
        CompiledQuery::new(format!("show columns from {}", self.wrap_table(table)), Vec::new())
    }

    fn modify_unsigned(&self, column: &ColumnDefinition) -> String {
        if column.unsigned {
            " unsigned".to_owned()
        } else {
            String::new()
        }
    }

    fn modify_on_update(&self, column: &ColumnDefinition) -> String {
        let expression = if column.use_current_on_update
            && column.column_type.is_current_timestamp_capable()
        {
            Some(CURRENT_TIMESTAMP)
        } else {
            column.on_update.as_deref()
        };
        expression
            .map(|expression| format!(" on update {expression}"))
            .unwrap_or_default()
    }

    fn modify_increment(&self, column: &ColumnDefinition, commands: &mut [Command]) -> String {
        if !(column.column_type.is_serial() && column.auto_increment) {
            return String::new();
        }
        if has_primary(commands) {
            " auto_increment".to_owned()
        } else {
            " auto_increment primary key".to_owned()
        }
    }

    fn modify_comment(&self, column: &ColumnDefinition) -> String {
        match column.comment.as_deref() {
            Some(comment) if !comment.is_empty() => format!(" comment '{}'", add_slashes(comment)),
            _ => String::new(),
        }
    }

    fn modify_after(&self, column: &ColumnDefinition) -> String {
        column
            .after
            .as_deref()
            .map(|after| format!(" after {}", self.wrap(after)))
            .unwrap_or_default()
    }

    fn modify_first(&self, column: &ColumnDefinition) -> String {
        if column.first {
            " first".to_owned()
        } else {
            String::new()
        }
    }

    fn compile_add(&self, blueprint: &Blueprint, commands: &mut [Command]) -> Result<Vec<String>> {
        let columns = self
            .compile_columns(blueprint, commands)?
            .into_iter()
            .map(|column| format!("add {column}"))
            .collect::<Vec<_>>();
        Ok(vec![format!(
            "alter table {} {}",
            self.wrap_table(blueprint.table()),
            columns.join(", ")
        )])
    }

    fn compile_primary(&self, blueprint: &Blueprint, command: &PlainCommand) -> String {
        self.alter_index(blueprint, "primary key", command)
    }

    fn compile_unique(&self, blueprint: &Blueprint, command: &PlainCommand) -> String {
        self.alter_index(blueprint, "unique", command)
    }

    fn compile_index(&self, blueprint: &Blueprint, command: &PlainCommand) -> String {
        self.alter_index(blueprint, "index", command)
    }

    fn compile_drop_primary(&self, blueprint: &Blueprint, _command: &PlainCommand) -> String {
        format!("alter table {} drop primary key", self.wrap_table(blueprint.table()))
    }

    fn compile_drop_unique(&self, blueprint: &Blueprint, command: &PlainCommand) -> String {
        self.alter_drop(blueprint, "unique", command)
    }

    fn compile_drop_index(&self, blueprint: &Blueprint, command: &PlainCommand) -> String {
        self.alter_drop(blueprint, "index", command)
    }

    fn compile_drop_foreign(&self, blueprint: &Blueprint, command: &PlainCommand) -> String {
        self.alter_drop(blueprint, "foreign key", command)
    }
}

impl MySqlSchemaGrammar {
    fn alter_index(&self, blueprint: &Blueprint, kind: &str, command: &PlainCommand) -> String {
        format!(
            "alter table {} add {kind} {} ({})",
            self.wrap_table(blueprint.table()),
            self.wrap(&command.index_name),
            self.columnize(&command.columns)
        )
    }

    fn alter_drop(&self, blueprint: &Blueprint, kind: &str, command: &PlainCommand) -> String {
        format!(
            "alter table {} drop {kind} {}",
            self.wrap_table(blueprint.table()),
            self.wrap(&command.index_name)
        )
    }
}

fn add_slashes(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '\'' => escaped.push_str("\\'"),
            '"' => escaped.push_str("\\\""),
            '\0' => escaped.push_str("\\0"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(blueprint: &Blueprint) -> Vec<String> {
        blueprint.to_sql(&MySqlSchemaGrammar).unwrap()
    }

    #[test]
    fn explicit_primary_is_inlined_without_duplicate_key() {
        let mut blueprint = Blueprint::new("posts");
        blueprint.create();
        blueprint.increments("id");
        blueprint.string("slug");
        blueprint.primary(&["id"], None);
        assert_eq!(
            compile(&blueprint),
            vec![
                "create table `posts` (`id` int unsigned not null auto_increment, `slug` varchar(255) not null, primary key (`id`))"
            ]
        );
    }

    #[test]
    fn comment_and_first_modifiers() {
        let mut blueprint = Blueprint::new("posts");
        blueprint.string("title").comment("it's \"quoted\"").first();
        assert_eq!(
            compile(&blueprint),
            vec![
                "alter table `posts` add `title` varchar(255) not null comment 'it\\'s \\\"quoted\\\"' first"
            ]
        );
    }

    #[test]
    fn raw_on_update_expression() {
        let mut blueprint = Blueprint::new("posts");
        blueprint.date_time("touched_at").nullable().on_update("now()");
        assert_eq!(
            compile(&blueprint),
            vec!["alter table `posts` add `touched_at` datetime null on update now()"]
        );
    }

    #[test]
    fn table_exists_binds_table_name() {
        let query = MySqlSchemaGrammar.compile_table_exists("users");
        assert!(query.sql.contains("information_schema.tables"));
        assert_eq!(query.bindings, vec![Value::from("users")]);
        assert_eq!(
            MySqlSchemaGrammar.compile_column_listing("users").sql,
            "show columns from `users`"
        );
    }
}
