use crate::dialect::Dialect;
use crate::query::grammar::QueryGrammar;

/// Largest unsigned 64-bit value; MySQL has no offset-only form.
const MAX_ROWS: u64 = u64::MAX;

/// Backtick-quoting grammar for MySQL and MariaDB.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlGrammar;

impl QueryGrammar for MySqlGrammar {
    fn dialect(&self) -> Dialect {
        Dialect::MySql
    }

    fn compile_limit(&self, limit: Option<u64>, offset: Option<u64>) -> String {
        match (limit, offset) {
            (Some(limit), Some(offset)) => format!("limit {limit} offset {offset}"),
            (Some(limit), None) => format!("limit {limit}"),
            (None, Some(offset)) => format!("limit {MAX_ROWS} offset {offset}"),
            (None, None) => String::new(),
        }
    }

    fn compile_insert(
        &self,
        query: &crate::query::QueryObject,
        columns: &[String],
        rows: usize,
    ) -> String {
        let table = self.wrap_table(&query.from);
        let row = format!("({})", self.parameterize(columns.len()));
        let values = vec![row; rows.max(1)].join(", ");
        format!("insert into {table}({}) values{values}", self.columnize(columns))
    }
}
