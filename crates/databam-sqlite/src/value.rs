use anyhow::{Context, Result, bail};
use rusqlite::types::{Value as SqlValue, ValueRef};
use sea_query::Value;

/// Convert a query parameter into its `SQLite` storage class.
///
/// Temporal values are stored as text in the formats the decoder accepts.
pub fn to_sql(value: &Value) -> Result<SqlValue> {
    let converted = match value {
        Value::Bool(Some(v)) => SqlValue::Integer(i64::from(*v)),
        Value::TinyInt(Some(v)) => SqlValue::Integer(i64::from(*v)),
        Value::SmallInt(Some(v)) => SqlValue::Integer(i64::from(*v)),
        Value::Int(Some(v)) => SqlValue::Integer(i64::from(*v)),
        Value::BigInt(Some(v)) => SqlValue::Integer(*v),
        Value::TinyUnsigned(Some(v)) => SqlValue::Integer(i64::from(*v)),
        Value::SmallUnsigned(Some(v)) => SqlValue::Integer(i64::from(*v)),
        Value::Unsigned(Some(v)) => SqlValue::Integer(i64::from(*v)),
        Value::BigUnsigned(Some(v)) => {
            SqlValue::Integer(i64::try_from(*v).context("unsigned integer out of range")?)
        }
        Value::Float(Some(v)) => SqlValue::Real(f64::from(*v)),
        Value::Double(Some(v)) => SqlValue::Real(*v),
        Value::String(Some(v)) => SqlValue::Text(v.to_string()),
        Value::Char(Some(v)) => SqlValue::Text(v.to_string()),
        Value::Bytes(Some(v)) => SqlValue::Blob(v.to_vec()),
        Value::ChronoDate(Some(v)) => SqlValue::Text(v.to_string()), // "%Y-%m-%d"
        Value::ChronoTime(Some(v)) => SqlValue::Text(v.to_string()), // "%H:%M:%S%.f"
        Value::ChronoDateTime(Some(v)) => SqlValue::Text(v.to_string()), // "%Y-%m-%d %H:%M:%S%.f"
        Value::ChronoDateTimeUtc(Some(v)) => SqlValue::Text(v.to_rfc3339()),
        Value::ChronoDateTimeLocal(Some(v)) => SqlValue::Text(v.to_rfc3339()),
        Value::ChronoDateTimeWithTimeZone(Some(v)) => SqlValue::Text(v.to_rfc3339()),
        Value::Bool(None)
        | Value::TinyInt(None)
        | Value::SmallInt(None)
        | Value::Int(None)
        | Value::BigInt(None)
        | Value::TinyUnsigned(None)
        | Value::SmallUnsigned(None)
        | Value::Unsigned(None)
        | Value::BigUnsigned(None)
        | Value::Float(None)
        | Value::Double(None)
        | Value::String(None)
        | Value::Char(None)
        | Value::Bytes(None)
        | Value::ChronoDate(None)
        | Value::ChronoTime(None)
        | Value::ChronoDateTime(None)
        | Value::ChronoDateTimeUtc(None)
        | Value::ChronoDateTimeLocal(None)
        | Value::ChronoDateTimeWithTimeZone(None) => SqlValue::Null,
        #[allow(unreachable_patterns)]
        _ => bail!("unsupported parameter type: {value:?}"),
    };
    Ok(converted)
}

/// Convert a column value read from `SQLite`.
pub fn from_sql(value: ValueRef<'_>) -> Result<Value> {
    let converted = match value {
        ValueRef::Null => Value::String(None),
        ValueRef::Integer(v) => Value::BigInt(Some(v)),
        ValueRef::Real(v) => Value::Double(Some(v)),
        ValueRef::Text(v) => {
            Value::from(std::str::from_utf8(v).context("invalid UTF-8 in text value")?)
        }
        ValueRef::Blob(v) => Value::from(v.to_vec()),
    };
    Ok(converted)
}
