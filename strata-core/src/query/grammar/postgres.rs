use crate::dialect::Dialect;
use crate::query::QueryObject;
use crate::query::grammar::QueryGrammar;

/// Double-quoting grammar; inserts return the primary key.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresGrammar;

impl QueryGrammar for PostgresGrammar {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    fn compile_insert(&self, query: &QueryObject, columns: &[String], rows: usize) -> String {
        let table = self.wrap_table(&query.from);
        let returning = self.wrap(&query.primary_key);
        if columns.is_empty() {
            return format!("insert into {table} default values returning {returning}");
        }
        let row = format!("({})", self.parameterize(columns.len()));
        let values = vec![row; rows.max(1)].join(", ");
        format!(
            "insert into {table} ({}) values {values} returning {returning}",
            self.columnize(columns)
        )
    }
}
