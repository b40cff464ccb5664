use crate::dialect::Dialect;
use crate::error::Result;
use crate::schema::column::{ColumnDefinition, ColumnType, DefaultValue};
use crate::schema::command::Command;
use crate::schema::grammar::{has_primary, CompiledQuery, Modifier, SchemaGrammar};
use crate::value::Value;

/// PostgreSQL DDL.
///
/// Auto-increment integers become `serial`/`bigserial`; when no primary
/// command exists the column is declared `primary key` inline.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresSchemaGrammar;

const MODIFIERS: &[Modifier] = &[Modifier::Nullable, Modifier::Default, Modifier::Increment];

impl SchemaGrammar for PostgresSchemaGrammar {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    fn modifiers(&self) -> &'static [Modifier] {
        MODIFIERS
    }

    fn column_type(&self, column: &ColumnDefinition) -> Result<String> {
        let sql = match column.column_type {
            ColumnType::Uuid => "uuid".to_owned(),
            ColumnType::Integer if column.auto_increment => "serial".to_owned(),
            ColumnType::Integer => "integer".to_owned(),
            ColumnType::SmallInteger if column.auto_increment => "smallserial".to_owned(),
            ColumnType::TinyInteger | ColumnType::SmallInteger => "smallint".to_owned(),
            ColumnType::BigInteger if column.auto_increment => "bigserial".to_owned(),
            ColumnType::BigInteger => "bigint".to_owned(),
            ColumnType::Char => format!("char({})", column.length.unwrap_or(255)),
            ColumnType::String => format!("varchar({})", column.length.unwrap_or(255)),
            ColumnType::Text | ColumnType::LongText => "text".to_owned(),
            ColumnType::Float => "real".to_owned(),
            ColumnType::Double => "double precision".to_owned(),
            ColumnType::Boolean => "boolean".to_owned(),
            ColumnType::Date => "date".to_owned(),
            ColumnType::DateTime | ColumnType::Timestamp => "timestamp".to_owned(),
            ColumnType::Time => "time".to_owned(),
            ColumnType::Year => "smallint".to_owned(),
            ColumnType::Json => "jsonb".to_owned(),
            ColumnType::Binary => "bytea".to_owned(),
        };
        Ok(sql)
    }

    fn compile_table_exists(&self, table: &str) -> CompiledQuery {
        CompiledQuery::new(
            "select table_name::text as table_name from information_schema.tables where table_schema = current_schema() and table_name = ? limit 1",
            vec![Value::from(table)],
        )
    }

    fn compile_column_listing(&self, table: &str) -> CompiledQuery {
        CompiledQuery::new(
            "select column_name::text as column_name from information_schema.columns where table_name = ? and table_schema = current_schema()",
            vec![Value::from(table)],
        )
    }

    fn modify_increment(&self, column: &ColumnDefinition, commands: &mut [Command]) -> String {
        if column.auto_increment && column.column_type.is_serial() && !has_primary(commands) {
            " primary key".to_owned()
        } else {
            String::new()
        }
    }

    fn compile_default_value(&self, value: &DefaultValue) -> String {
        match value {
            DefaultValue::Raw(raw) => raw.clone(),
            DefaultValue::Integer(value) => value.to_string(),
            DefaultValue::Float(value) => value.to_string(),
            DefaultValue::Bool(value) => value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Blueprint;

    fn compile(blueprint: &Blueprint) -> Vec<String> {
        blueprint.to_sql(&PostgresSchemaGrammar).unwrap()
    }

    #[test]
    fn create_with_serial_key_and_types() {
        let mut blueprint = Blueprint::new("users");
        blueprint.create();
        blueprint.id();
        blueprint.uuid("token");
        blueprint.boolean("active").default(true);
        blueprint.json("settings").nullable();
        blueprint.timestamp("seen_at").use_current().use_current_on_update();
        assert_eq!(
            compile(&blueprint),
            vec![
                "create table \"users\" (\"id\" bigserial not null primary key, \"token\" uuid not null, \"active\" boolean not null default true, \"settings\" jsonb null, \"seen_at\" timestamp not null default CURRENT_TIMESTAMP)"
            ]
        );
    }

    #[test]
    fn increments_is_a_serial_primary_key() {
        let mut blueprint = Blueprint::new("users");
        blueprint.create();
        blueprint.increments("id");
        blueprint.string("name");
        assert_eq!(
            compile(&blueprint),
            vec!["create table \"users\" (\"id\" serial not null primary key, \"name\" varchar(255) not null)"]
        );
    }

    #[test]
    fn small_increments_on_an_existing_table() {
        let mut blueprint = Blueprint::new("users");
        blueprint.small_increments("seq");
        assert_eq!(
            compile(&blueprint),
            vec!["alter table \"users\" add column \"seq\" smallserial not null primary key"]
        );
    }

    #[test]
    fn explicit_primary_replaces_inline_key() {
        let mut blueprint = Blueprint::new("posts");
        blueprint.create();
        blueprint.increments("id");
        blueprint.string("slug");
        blueprint.primary(&["id"], None);
        assert_eq!(
            compile(&blueprint),
            vec![
                "create table \"posts\" (\"id\" serial not null, \"slug\" varchar(255) not null, primary key (\"id\"))"
            ]
        );
    }

    #[test]
    fn alter_emits_add_column_then_constraints() {
        let mut blueprint = Blueprint::new("widgets");
        blueprint.string("nickname").nullable();
        blueprint.integer("category_id").unsigned();
        blueprint.index(&["nickname"], None);
        blueprint.unique(&["nickname"], None);
        blueprint
            .foreign("category_id")
            .references("id")
            .on("categories")
            .on_delete("cascade");
        assert_eq!(
            compile(&blueprint),
            vec![
                "alter table \"widgets\" add column \"nickname\" varchar(255) null, add column \"category_id\" integer not null",
                "create index \"widgets_nickname_index\" on \"widgets\" (\"nickname\")",
                "alter table \"widgets\" add constraint \"widgets_nickname_unique\" unique (\"nickname\")",
                "alter table \"widgets\" add constraint \"widgets_category_id_foreign\" foreign key (\"category_id\") references \"categories\" (\"id\") on delete cascade",
            ]
        );
    }

    #[test]
    fn drop_statements() {
        let mut blueprint = Blueprint::new("widgets");
        blueprint.drop_index("widgets_nickname_index");
        blueprint.drop_unique("widgets_nickname_unique");
        blueprint.drop_primary(["id"]);
        blueprint.drop_columns(&["a", "b"]);
        assert_eq!(
            compile(&blueprint),
            vec![
                "drop index \"widgets_nickname_index\"",
                "alter table \"widgets\" drop constraint \"widgets_nickname_unique\"",
                "alter table \"widgets\" drop constraint \"widgets_id_primary\"",
                "alter table \"widgets\" drop column \"a\", drop column \"b\"",
            ]
        );
    }

    #[test]
    fn introspection_casts_identifiers_to_text() {
        let listing = PostgresSchemaGrammar.compile_column_listing("users");
        assert!(listing.sql.starts_with("select column_name::text as column_name"));
        assert_eq!(listing.bindings, vec![Value::from("users")]);
    }
}
