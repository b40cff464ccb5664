use crate::dialect::Dialect;
use crate::query::grammar::QueryGrammar;

#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteGrammar;

impl QueryGrammar for SqliteGrammar {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    // SQLite only accepts OFFSET after a LIMIT; -1 means unbounded.
    fn compile_limit(&self, limit: Option<u64>, offset: Option<u64>) -> String {
        match (limit, offset) {
            (Some(limit), Some(offset)) => format!("limit {limit} offset {offset}"),
            (Some(limit), None) => format!("limit {limit}"),
            (None, Some(offset)) => format!("limit -1 offset {offset}"),
            (None, None) => String::new(),
        }
    }
}
