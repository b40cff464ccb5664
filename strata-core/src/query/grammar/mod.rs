//! Per-dialect compilers turning a [`QueryObject`] into SQL text.
//!
//! Every statement uses `?` placeholders; drivers that need another form
//! rewrite them at execution time (see [`Dialect::rewrite_placeholders`]).

mod mysql;
mod postgres;
mod sqlite;

pub use mysql::MySqlGrammar;
pub use postgres::PostgresGrammar;
pub use sqlite::SqliteGrammar;

use crate::dialect::Dialect;
use crate::query::object::{JoinClause, Order, QueryObject, WhereClause};

/// Compiles query objects for one dialect.
///
/// The default methods produce the shared shape; dialects override only the
/// pieces whose syntax diverges (limit/offset, insert).
pub trait QueryGrammar: Send + Sync {
    fn dialect(&self) -> Dialect;

    /// Quote an identifier, handling `*`, dotted paths and `x as y` aliases.
    fn wrap(&self, value: &str) -> String {
        if value == "*" {
            return "*".to_owned();
        }
        if let Some((left, right)) = split_alias(value) {
            return format!("{} as {}", self.wrap(left), self.wrap(right));
        }
        let dialect = self.dialect();
        value
            .split('.')
            .map(|segment| {
                if segment == "*" {
                    "*".to_owned()
                } else {
                    dialect.quote_identifier(segment)
                }
            })
            .collect::<Vec<_>>()
            .join(".")
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

    fn parameterize(&self, count: usize) -> String {
        vec!["?"; count].join(", ")
    }

    fn compile_select(&self, query: &QueryObject) -> String {
        let segments = [
            "select".to_owned(),
            self.compile_distinct(query),
            self.compile_columns(query),
            self.compile_aggregate(query),
            self.compile_from(query),
            self.compile_joins(&query.joins),
            self.compile_wheres(&query.wheres, "where"),
            self.compile_groups(&query.groups),
            self.compile_wheres(&query.havings, "having"),
            self.compile_orders(&query.orders),
            self.compile_limit(query.limit, query.offset),
        ];
        join_segments(&segments)
    }

    fn compile_distinct(&self, query: &QueryObject) -> String {
        if query.distinct && !query.selects.is_empty() && query.aggregate.is_none() {
            "distinct".to_owned()
        } else {
            String::new()
        }
    }

    fn compile_columns(&self, query: &QueryObject) -> String {
        if query.aggregate.is_some() {
            String::new()
        } else if query.selects.is_empty() {
            "*".to_owned()
        } else {
            self.columnize(&query.selects)
        }
    }

    fn compile_aggregate(&self, query: &QueryObject) -> String {
        match &query.aggregate {
            Some(aggregate) => format!(
                "{}({}) as aggregate",
                aggregate.function.as_sql(),
                self.wrap(&aggregate.column)
            ),
            None => String::new(),
        }
    }

    fn compile_from(&self, query: &QueryObject) -> String {
        let mut sql = format!("from {}", self.wrap_table(&query.from));
        if let Some(alias) = query.alias.as_deref().filter(|alias| *alias != query.from) {
            sql.push_str(" as ");
            sql.push_str(&self.wrap(alias));
        }
        sql
    }

    fn compile_joins(&self, joins: &[JoinClause]) -> String {
        joins
            .iter()
            .map(|join| {
                let conditions = join
                    .conditions
                    .iter()
                    .enumerate()
                    .map(|(index, condition)| {
                        let expr = format!(
                            "{} {} {}",
                            self.wrap(&condition.first),
                            condition.operator.as_sql(),
                            self.wrap(&condition.second)
                        );
                        if index == 0 {
                            expr
                        } else {
                            format!("{} {}", condition.boolean.as_sql(), expr)
                        }
                    })
                    .collect::<Vec<_>>()
                    .join(" ");
                let target = format!("{} join {}", join.kind.as_sql(), self.wrap_table(&join.table));
                if conditions.is_empty() {
                    target
                } else {
                    format!("{target} on {conditions}")
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Render a `where` or `having` list; an empty list renders nothing.
    fn compile_wheres(&self, clauses: &[WhereClause], keyword: &str) -> String {
        if clauses.is_empty() {
            return String::new();
        }
        let sql = clauses
            .iter()
            .map(|clause| format!("{} {}", clause.boolean().as_sql(), self.compile_where_clause(clause)))
            .collect::<Vec<_>>()
            .join(" ");
        format!("{keyword} {}", remove_leading_boolean(&sql))
    }

    fn compile_where_clause(&self, clause: &WhereClause) -> String {
        match clause {
            WhereClause::Basic {
                column, operator, ..
            } => format!("{} {} ?", self.wrap(column), operator.as_sql()),
            WhereClause::In {
                column,
                values,
                negated,
                ..
            } => format!(
                "{} {}in ({})",
                self.wrap(column),
                if *negated { "not " } else { "" },
                self.parameterize(values.len())
            ),
            WhereClause::Between {
                column, negated, ..
            } => format!(
                "{} {}between ? and ?",
                self.wrap(column),
                if *negated { "not " } else { "" }
            ),
            WhereClause::Null {
                column, negated, ..
            } => format!(
                "{} is {}null",
                self.wrap(column),
                if *negated { "not " } else { "" }
            ),
        }
    }

    fn compile_groups(&self, groups: &[String]) -> String {
        if groups.is_empty() {
            return String::new();
        }
        format!("group by {}", self.columnize(groups))
    }

    fn compile_orders(&self, orders: &[Order]) -> String {
        if orders.is_empty() {
            return String::new();
        }
        let sql = orders
            .iter()
            .map(|order| format!("{} {}", self.wrap(&order.column), order.direction.as_sql()))
            .collect::<Vec<_>>()
            .join(", ");
        format!("order by {sql}")
    }

    fn compile_limit(&self, limit: Option<u64>, offset: Option<u64>) -> String {
        match (limit, offset) {
            (Some(limit), Some(offset)) => format!("limit {limit} offset {offset}"),
            (Some(limit), None) => format!("limit {limit}"),
            (None, Some(offset)) => format!("offset {offset}"),
            (None, None) => String::new(),
        }
    }

    /// `insert` for `rows` rows of `columns` values each.
    fn compile_insert(&self, query: &QueryObject, columns: &[String], rows: usize) -> String {
        let table = self.wrap_table(&query.from);
        if columns.is_empty() {
            return format!("insert into {table} default values");
        }
        let row = format!("({})", self.parameterize(columns.len()));
        let values = vec![row; rows.max(1)].join(", ");
        format!("insert into {table}({}) values{values}", self.columnize(columns))
    }

    fn compile_update(&self, query: &QueryObject, columns: &[String]) -> String {
        let sets = columns
            .iter()
            .map(|column| format!("{} = ?", self.wrap(column)))
            .collect::<Vec<_>>()
            .join(", ");
        let segments = [
            format!("update {} set {sets}", self.wrap_table(&query.from)),
            self.compile_wheres(&query.wheres, "where"),
        ];
        join_segments(&segments)
    }

    fn compile_delete(&self, query: &QueryObject) -> String {
        let segments = [
            format!("delete from {}", self.wrap_table(&query.from)),
            self.compile_wheres(&query.wheres, "where"),
        ];
        join_segments(&segments)
    }

    /// Wrap a select in `exists (...)`, projected as `exists`.
    fn compile_exists(&self, query: &QueryObject) -> String {
        format!("select exists({}) as {}", self.compile_select(query), self.wrap("exists"))
    }
}

/// Split `expr as alias` (any case, any surrounding whitespace).
fn split_alias(value: &str) -> Option<(&str, &str)> {
    let lower = value.to_ascii_lowercase();
    let bytes = lower.as_bytes();
    let mut start = 0;
    while let Some(found) = lower[start..].find("as") {
        let at = start + found;
        let before = at > 0 && bytes[at - 1].is_ascii_whitespace();
        let after = bytes.get(at + 2).is_some_and(u8::is_ascii_whitespace);
        if before && after {
            let left = value[..at].trim_end();
            let right = value[at + 2..].trim_start();
            if !left.is_empty() && !right.is_empty() {
                return Some((left, right));
            }
        }
        start = at + 2;
    }
    None
}

fn remove_leading_boolean(sql: &str) -> &str {
    if sql.get(..4).is_some_and(|prefix| prefix.eq_ignore_ascii_case("and ")) {
        &sql[4..]
    } else if sql.get(..3).is_some_and(|prefix| prefix.eq_ignore_ascii_case("or ")) {
        &sql[3..]
    } else {
        sql
    }
}

fn join_segments(segments: &[String]) -> String {
    segments
        .iter()
        .map(|segment| segment.trim())
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::object::{Boolean, Direction, Operator};
    use crate::value::Value;

    fn users() -> QueryObject {
        QueryObject::new("users")
    }

    #[test]
    fn wraps_dotted_and_aliased_identifiers() {
        let grammar = MySqlGrammar;
        assert_eq!(grammar.wrap("*"), "*");
        assert_eq!(grammar.wrap("users.*"), "`users`.*");
        assert_eq!(grammar.wrap("users.email"), "`users`.`email`");
        assert_eq!(grammar.wrap("users.email AS contact"), "`users`.`email` as `contact`");
        assert_eq!(PostgresGrammar.wrap("u.name as  n"), "\"u\".\"name\" as \"n\"");
    }

    #[test]
    fn alias_detection_ignores_embedded_as() {
        assert_eq!(split_alias("last_assigned"), None);
        assert_eq!(split_alias("alias"), None);
        assert_eq!(split_alias("a as b"), Some(("a", "b")));
    }

    #[test]
    fn strips_only_the_first_connective() {
        assert_eq!(remove_leading_boolean("and a = ? or b = ?"), "a = ? or b = ?");
        assert_eq!(remove_leading_boolean("OR a = ?"), "a = ?");
        assert_eq!(remove_leading_boolean("a = ?"), "a = ?");
    }

    #[test]
    fn empty_where_and_having_emit_nothing() {
        let query = users();
        assert_eq!(SqliteGrammar.compile_select(&query), "select * from \"users\"");
        assert_eq!(SqliteGrammar.compile_wheres(&[], "having"), "");
    }

    #[test]
    fn compiles_every_where_variant() {
        let mut query = users();
        query.wheres = vec![
            WhereClause::Basic {
                column: "age".to_owned(),
                operator: Operator::Gte,
                value: Value::Integer(18),
                boolean: Boolean::And,
            },
            WhereClause::In {
                column: "role".to_owned(),
                values: vec!["admin".into(), "staff".into()],
                boolean: Boolean::Or,
                negated: true,
            },
            WhereClause::Between {
                column: "score".to_owned(),
                low: Value::Integer(1),
                high: Value::Integer(9),
                boolean: Boolean::And,
                negated: false,
            },
            WhereClause::Null {
                column: "deleted_at".to_owned(),
                boolean: Boolean::And,
                negated: true,
            },
        ];
        assert_eq!(
            MySqlGrammar.compile_select(&query),
            "select * from `users` where `age` >= ? or `role` not in (?, ?) and `score` between ? and ? and `deleted_at` is not null"
        );
    }

    #[test]
    fn compiles_joins_with_multiple_conditions() {
        let mut query = users();
        query.selects = vec!["users.name".to_owned(), "roles.title".to_owned()];
        query.joins.push(
            JoinClause::new(crate::query::object::JoinType::Left, "roles")
                .on("roles.id", Operator::Eq, "users.role_id")
                .or_on("roles.slug", Operator::Eq, "users.role_slug"),
        );
        assert_eq!(
            PostgresGrammar.compile_select(&query),
            "select \"users\".\"name\", \"roles\".\"title\" from \"users\" left join \"roles\" on \"roles\".\"id\" = \"users\".\"role_id\" or \"roles\".\"slug\" = \"users\".\"role_slug\""
        );
    }

    #[test]
    fn join_without_conditions_has_no_dangling_on() {
        let mut query = users();
        query
            .joins
            .push(JoinClause::new(crate::query::object::JoinType::Inner, "roles"));
        assert_eq!(
            MySqlGrammar.compile_select(&query),
            "select * from `users` inner join `roles`"
        );
    }

    #[test]
    fn aggregate_replaces_columns_and_distinct() {
        let mut query = users();
        query.selects = vec!["name".to_owned()];
        query.distinct = true;
        query.aggregate = Some(crate::query::object::Aggregate {
            function: crate::query::object::AggregateFunction::Count,
            column: "*".to_owned(),
        });
        assert_eq!(
            MySqlGrammar.compile_select(&query),
            "select count(*) as aggregate from `users`"
        );
    }

    #[test]
    fn alias_is_emitted_when_different_from_table() {
        let mut query = users();
        query.alias = Some("u".to_owned());
        assert_eq!(MySqlGrammar.compile_select(&query), "select * from `users` as `u`");
        query.alias = Some("users".to_owned());
        assert_eq!(MySqlGrammar.compile_select(&query), "select * from `users`");
    }

    #[test]
    fn compiles_group_having_and_order() {
        let mut query = users();
        query.selects = vec!["role".to_owned()];
        query.groups = vec!["role".to_owned()];
        query.havings.push(WhereClause::Basic {
            column: "role".to_owned(),
            operator: Operator::Eq,
            value: "admin".into(),
            boolean: Boolean::And,
        });
        query.orders.push(Order {
            column: "role".to_owned(),
            direction: Direction::Asc,
        });
        assert_eq!(
            SqliteGrammar.compile_select(&query),
            "select \"role\" from \"users\" group by \"role\" having \"role\" = ? order by \"role\" asc"
        );
    }

    #[test]
    fn update_and_delete_carry_where_clause() {
        let mut query = users();
        query.wheres.push(WhereClause::Basic {
            column: "id".to_owned(),
            operator: Operator::Eq,
            value: Value::Integer(1),
            boolean: Boolean::And,
        });
        let columns = vec!["name".to_owned(), "email".to_owned()];
        assert_eq!(
            MySqlGrammar.compile_update(&query, &columns),
            "update `users` set `name` = ?, `email` = ? where `id` = ?"
        );
        assert_eq!(MySqlGrammar.compile_delete(&query), "delete from `users` where `id` = ?");
        assert_eq!(MySqlGrammar.compile_delete(&users()), "delete from `users`");
    }

    #[test]
    fn exists_wraps_the_select() {
        let query = users();
        assert_eq!(
            SqliteGrammar.compile_exists(&query),
            "select exists(select * from \"users\") as \"exists\""
        );
    }
}
