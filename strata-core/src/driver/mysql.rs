//! MySQL backend. Cells decode by the column's reported type; `decimal`
//! arrives as text and is parsed into a float.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use sqlx::mysql::{MySql, MySqlQueryResult, MySqlRow};
use sqlx::{Row as _, TypeInfo as _, ValueRef as _};

use crate::dialect::Dialect;
use crate::error::Result;
use crate::value::Value;

native_driver!(
    /// Pooled MySQL driver.
    MySqlDriver,
    MySqlTransaction,
    MySql,
    Dialect::MySql
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
        Value::DateTime(v) => query.bind(*v),
        Value::Json(v) => query.bind(v.clone()),
    }
}

fn statement_cache(_bindings: &[Value]) -> bool {
    true
}

fn last_insert_id(result: &MySqlQueryResult) -> Option<i64> {
    match result.last_insert_id() {
        0 => None,
        id => i64::try_from(id).ok(),
    }
}

fn decode_cell(row: &MySqlRow, index: usize) -> Result<Value> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let kind = raw.type_info().name().to_owned();
    let value = match kind.as_str() {
        "BOOLEAN" => Value::Bool(row.try_get_unchecked(index)?),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" => {
            Value::Integer(row.try_get_unchecked(index)?)
        }
        unsigned if unsigned.ends_with(" UNSIGNED") => {
            let number: u64 = row.try_get_unchecked(index)?;
            i64::try_from(number).map_or_else(|_| Value::Text(number.to_string()), Value::Integer)
        }
        "FLOAT" => Value::Float(f64::from(row.try_get_unchecked::<f32, _>(index)?)),
        "DOUBLE" => Value::Float(row.try_get_unchecked(index)?),
        "DECIMAL" => {
            let text: String = row.try_get_unchecked(index)?;
            match text.parse::<f64>() {
                Ok(number) => Value::Float(number),
                Err(_) => Value::Text(text),
            }
        }
        "DATETIME" | "TIMESTAMP" => {
            Value::DateTime(row.try_get_unchecked::<NaiveDateTime, _>(index)?.and_utc())
        }
        "DATE" => Value::Text(row.try_get_unchecked::<NaiveDate, _>(index)?.to_string()),
        "TIME" => Value::Text(row.try_get_unchecked::<NaiveTime, _>(index)?.to_string()),
        "JSON" => Value::Json(row.try_get_unchecked(index)?),
        binary if binary.contains("BLOB") || binary.contains("BINARY") || binary == "BIT" => {
            Value::Bytes(row.try_get_unchecked(index)?)
        }
        _ => Value::Text(row.try_get_unchecked(index)?),
    };
    Ok(value)
}
