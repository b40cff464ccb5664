//! SQLite backend. Cells decode by the storage class of the stored value, so
//! `datetime`, `numeric` or `json` declarations come back as their text.

use sqlx::sqlite::{Sqlite, SqliteQueryResult, SqliteRow};
use sqlx::{Row as _, TypeInfo as _, ValueRef as _};

use crate::dialect::Dialect;
use crate::error::Result;
use crate::value::Value;

native_driver!(
    /// Pooled SQLite driver.
    SqliteDriver,
    SqliteTransaction,
    Sqlite,
    Dialect::Sqlite
);

fn bind_value<'q>(query: NativeQuery<'q>, value: &Value) -> NativeQuery<'q> {
    match value {
        Value::Null => query.bind(Option::<String>::None),
        Value::Bool(v) => query.bind(*v),
        Value::Integer(v) => query.bind(*v),
        Value::Float(v) => query.bind(*v),
        Value::Text(v) => query.bind(v.clone()),
        Value::Bytes(v) => query.bind(v.clone()),
        Value::Uuid(v) => query.bind(v.to_string()),
        Value::DateTime(v) => query.bind(v.format("%Y-%m-%d %H:%M:%S").to_string()),
        Value::Json(v) => query.bind(v.to_string()),
    }
}

fn statement_cache(_bindings: &[Value]) -> bool {
    true
}

fn last_insert_id(result: &SqliteQueryResult) -> Option<i64> {
    Some(result.last_insert_rowid())
}

fn decode_cell(row: &SqliteRow, index: usize) -> Result<Value> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let class = raw.type_info().name().to_ascii_uppercase();
    let value = match class.as_str() {
        "INTEGER" | "BIGINT" | "INT8" | "BOOLEAN" => Value::Integer(row.try_get_unchecked(index)?),
        "REAL" | "FLOAT" | "DOUBLE" => Value::Float(row.try_get_unchecked(index)?),
        "BLOB" => Value::Bytes(row.try_get_unchecked(index)?),
        _ => Value::Text(row.try_get_unchecked(index)?),
    };
    Ok(value)
}
