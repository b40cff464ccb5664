//! PostgreSQL backend. Cells decode by the column's wire type.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::postgres::types::Oid;
use sqlx::postgres::{PgArgumentBuffer, PgQueryResult, PgRow, PgTypeInfo, Postgres};
use sqlx::{Column as _, Row as _, TypeInfo as _, ValueRef as _};

use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::value::Value;

native_driver!(
    /// Pooled PostgreSQL driver. Insert ids come from `returning`.
    PostgresDriver,
    PostgresTransaction,
    Postgres,
    Dialect::Postgres
);

/// A NULL parameter sent with an unspecified type, so the server infers it
/// from the column it lands in.
struct UntypedNull;

impl sqlx::Type<Postgres> for UntypedNull {
    fn type_info() -> PgTypeInfo {
        PgTypeInfo::with_oid(Oid(0))
    }
}

impl sqlx::Encode<'_, Postgres> for UntypedNull {
    fn encode_by_ref(&self, _buf: &mut PgArgumentBuffer) -> std::result::Result<IsNull, BoxDynError> {
        Ok(IsNull::Yes)
    }
}

fn bind_value<'q>(query: NativeQuery<'q>, value: &Value) -> NativeQuery<'q> {
    match value {
        Value::Null => query.bind(UntypedNull),
        Value::Bool(v) => query.bind(*v),
        Value::Integer(v) => query.bind(*v),
        Value::Float(v) => query.bind(*v),
        Value::Text(v) => query.bind(v.clone()),
        Value::Bytes(v) => query.bind(v.clone()),
        Value::Uuid(v) => query.bind(*v),
        // `timestamp` columns hold naive UTC.
        Value::DateTime(v) => query.bind(v.naive_utc()),
        Value::Json(v) => query.bind(v.clone()),
    }
}

// Parameter types are fixed when a statement is first prepared. A statement
// carrying an untyped NULL must not be cached, or later executions would
// inherit whatever type the server inferred for it.
fn statement_cache(bindings: &[Value]) -> bool {
    !bindings.iter().any(Value::is_null)
}

fn last_insert_id(_result: &PgQueryResult) -> Option<i64> {
    None
}

fn decode_cell(row: &PgRow, index: usize) -> Result<Value> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let kind = raw.type_info().name().to_owned();
    let value = match kind.as_str() {
        "BOOL" => Value::Bool(row.try_get_unchecked(index)?),
        "INT2" => Value::Integer(i64::from(row.try_get_unchecked::<i16, _>(index)?)),
        "INT4" => Value::Integer(i64::from(row.try_get_unchecked::<i32, _>(index)?)),
        "INT8" => Value::Integer(row.try_get_unchecked(index)?),
        "FLOAT4" => Value::Float(f64::from(row.try_get_unchecked::<f32, _>(index)?)),
        "FLOAT8" => Value::Float(row.try_get_unchecked(index)?),
        "NUMERIC" => {
            let bytes = row.try_get_unchecked::<&[u8], _>(index)?;
            let number = numeric_to_f64(bytes)
                .or_else(|| std::str::from_utf8(bytes).ok()?.trim().parse().ok())
                .ok_or_else(|| Error::decode(row.columns()[index].name(), "malformed numeric"))?;
            Value::Float(number)
        }
        "UUID" => Value::Uuid(row.try_get_unchecked(index)?),
        "JSON" | "JSONB" => Value::Json(row.try_get_unchecked(index)?),
        "TIMESTAMPTZ" => Value::DateTime(row.try_get_unchecked(index)?),
        "TIMESTAMP" => Value::DateTime(row.try_get_unchecked::<NaiveDateTime, _>(index)?.and_utc()),
        "DATE" => Value::Text(row.try_get_unchecked::<NaiveDate, _>(index)?.to_string()),
        "TIME" => Value::Text(row.try_get_unchecked::<NaiveTime, _>(index)?.to_string()),
        "BYTEA" => Value::Bytes(row.try_get_unchecked(index)?),
        _ => match row.try_get_unchecked::<String, _>(index) {
            Ok(text) => Value::Text(text),
            Err(_) => Value::Bytes(row.try_get_unchecked(index)?),
        },
    };
    Ok(value)
}

const NUMERIC_NEG: u16 = 0x4000;
const NUMERIC_NAN: u16 = 0xC000;

/// Binary `numeric`: digit count, weight, sign and display scale, then
/// base-10000 digits starting at `10000^weight`.
fn numeric_to_f64(bytes: &[u8]) -> Option<f64> {
    let word = |at: usize| bytes.get(at..at + 2).map(|pair| [pair[0], pair[1]]);
    let ndigits = usize::from(u16::from_be_bytes(word(0)?));
    let weight = i32::from(i16::from_be_bytes(word(2)?));
    let sign = u16::from_be_bytes(word(4)?);
    if bytes.len() != 8 + ndigits * 2 {
        return None;
    }
    if sign == NUMERIC_NAN {
        return Some(f64::NAN);
    }
    let mut value = 0.0;
    for i in 0..ndigits {
        let digit = f64::from(u16::from_be_bytes(word(8 + i * 2)?));
        let exponent = weight - i32::try_from(i).ok()?;
        value += digit * 10_000f64.powi(exponent);
    }
    Some(if sign == NUMERIC_NEG { -value } else { value })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_with_fraction() {
        // 2.5 = [2][5000] with weight 0
        let bytes = [0, 2, 0, 0, 0, 0, 0, 1, 0, 2, 0x13, 0x88];
        assert_eq!(numeric_to_f64(&bytes), Some(2.5));
    }

    #[test]
    fn numeric_sign_and_weight() {
        let bytes = [0, 1, 0, 1, 0x40, 0, 0, 0, 0, 3];
        assert_eq!(numeric_to_f64(&bytes), Some(-30_000.0));
    }

    #[test]
    fn numeric_zero_and_nan() {
        assert_eq!(numeric_to_f64(&[0, 0, 0, 0, 0, 0, 0, 0]), Some(0.0));
        assert!(numeric_to_f64(&[0, 0, 0, 0, 0xC0, 0, 0, 0]).unwrap().is_nan());
    }

    #[test]
    fn numeric_rejects_text_payloads() {
        assert_eq!(numeric_to_f64(b"12345.678"), None);
        assert_eq!(numeric_to_f64(b"2.5"), None);
    }

    #[test]
    fn nulls_disable_the_statement_cache() {
        assert!(statement_cache(&[Value::Integer(1)]));
        assert!(!statement_cache(&[Value::Integer(1), Value::Null]));
    }
}
