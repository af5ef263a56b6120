use anyhow::{Context, Result, anyhow, bail};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use sea_query::Value;

/// A field type that maps onto a single column.
///
/// Implemented for the standard Rust types a driver can produce (`i64`,
/// `String`, `DateTime<Utc>`, etc.) and for `Option<T>` of any of them.
pub trait Scalar: Sized {
    /// The value as a query parameter.
    fn to_value(&self) -> Value;

    /// Whether the value is its type's zero value and so contributes no
    /// condition to a query-by-example filter.
    fn is_zero(&self) -> bool;

    /// Convert a column value produced by the driver.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be converted to the target type.
    fn from_value(value: Value) -> Result<Self>;
}

macro_rules! integer_scalar {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Scalar for $ty {
                fn to_value(&self) -> Value {
                    Value::from(*self)
                }

                fn is_zero(&self) -> bool {
                    *self == 0
                }

                fn from_value(value: Value) -> Result<Self> {
                    let int = as_i64(value)?;
                    Self::try_from(int)
                        .with_context(|| format!("{int} out of range for {}", stringify!($ty)))
                }
            }
        )*
    };
}

integer_scalar!(i8, i16, i32, i64, u8, u16, u32, u64);

impl Scalar for f32 {
    fn to_value(&self) -> Value {
        Value::from(*self)
    }

    #[allow(clippy::float_cmp)]
    fn is_zero(&self) -> bool {
        *self == 0.0
    }

    #[allow(clippy::cast_possible_truncation)]
    fn from_value(value: Value) -> Result<Self> {
        as_f64(value).map(|v| v as Self)
    }
}

impl Scalar for f64 {
    fn to_value(&self) -> Value {
        Value::from(*self)
    }

    #[allow(clippy::float_cmp)]
    fn is_zero(&self) -> bool {
        *self == 0.0
    }

    fn from_value(value: Value) -> Result<Self> {
        as_f64(value)
    }
}

impl Scalar for bool {
    fn to_value(&self) -> Value {
        Value::from(*self)
    }

    fn is_zero(&self) -> bool {
        !*self
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Bool(Some(v)) => Ok(v),
            other => as_i64(other).map(|v| v != 0).context("expected boolean data type"),
        }
    }
}

impl Scalar for String {
    fn to_value(&self) -> Value {
        Value::from(self.clone())
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }

    fn from_value(value: Value) -> Result<Self> {
        as_string(value)
    }
}

impl Scalar for Vec<u8> {
    fn to_value(&self) -> Value {
        Value::from(self.clone())
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Bytes(Some(bytes)) => Ok(*bytes),
            Value::String(Some(raw)) => Ok(raw.into_bytes()),
            _ => bail!("expected binary data type"),
        }
    }
}

impl Scalar for DateTime<Utc> {
    fn to_value(&self) -> Value {
        Value::from(*self)
    }

    fn is_zero(&self) -> bool {
        *self == Self::default()
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::ChronoDateTimeUtc(Some(dt)) => Ok(*dt),
            Value::ChronoDateTime(Some(dt)) => Ok(dt.and_utc()),
            Value::String(Some(raw)) => parse_timestamp(&raw),
            _ => bail!("expected timestamp data type"),
        }
    }
}

impl Scalar for NaiveDateTime {
    fn to_value(&self) -> Value {
        Value::from(*self)
    }

    fn is_zero(&self) -> bool {
        *self == Self::default()
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::ChronoDateTime(Some(dt)) => Ok(*dt),
            Value::ChronoDateTimeUtc(Some(dt)) => Ok(dt.naive_utc()),
            Value::String(Some(raw)) => parse_timestamp(&raw).map(|dt| dt.naive_utc()),
            _ => bail!("expected timestamp data type"),
        }
    }
}

impl Scalar for NaiveDate {
    fn to_value(&self) -> Value {
        Value::from(*self)
    }

    fn is_zero(&self) -> bool {
        *self == Self::default()
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::ChronoDate(Some(date)) => Ok(*date),
            Value::String(Some(raw)) => NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                .map_err(|_e| anyhow!("unsupported date: {raw}; expected \"%Y-%m-%d\" format")),
            _ => bail!("expected date data type"),
        }
    }
}

impl<T: Scalar> Scalar for Option<T> {
    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::String(None), T::to_value)
    }

    fn is_zero(&self) -> bool {
        self.is_none()
    }

    fn from_value(value: Value) -> Result<Self> {
        if is_null(&value) { Ok(None) } else { T::from_value(value).map(Some) }
    }
}

/// Whether a driver value is SQL `NULL`.
pub(crate) const fn is_null(value: &Value) -> bool {
    matches!(
        value,
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
            | Value::ChronoDateTimeWithTimeZone(None)
    )
}

fn as_i64(value: Value) -> Result<i64> {
    match value {
        Value::TinyInt(Some(v)) => Ok(v.into()),
        Value::SmallInt(Some(v)) => Ok(v.into()),
        Value::Int(Some(v)) => Ok(v.into()),
        Value::BigInt(Some(v)) => Ok(v),
        Value::TinyUnsigned(Some(v)) => Ok(v.into()),
        Value::SmallUnsigned(Some(v)) => Ok(v.into()),
        Value::Unsigned(Some(v)) => Ok(v.into()),
        Value::BigUnsigned(Some(v)) => i64::try_from(v).context("integer out of range"),
        Value::Bool(Some(v)) => Ok(v.into()),
        _ => bail!("expected integer data type"),
    }
}

#[allow(clippy::cast_precision_loss)]
fn as_f64(value: Value) -> Result<f64> {
    match value {
        Value::Float(Some(v)) => Ok(v.into()),
        Value::Double(Some(v)) => Ok(v),
        other => as_i64(other).map(|v| v as f64).context("expected floating point data type"),
    }
}

fn as_string(value: Value) -> Result<String> {
    match value {
        Value::String(Some(raw)) => Ok(*raw),
        Value::Char(Some(ch)) => Ok(ch.to_string()),
        _ => bail!("expected string data type"),
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }

    if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(parsed.and_utc());
    }

    bail!("unsupported timestamp: {raw}; expected RFC3339 or \"%Y-%m-%d %H:%M:%S%.f\" format")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_values() {
        assert!(String::new().is_zero());
        assert!(!"Acme".to_string().is_zero());
        assert!(0_i64.is_zero());
        assert!(!7_i32.is_zero());
        assert!(DateTime::<Utc>::default().is_zero());
        assert!(None::<String>.is_zero());

        // an optional holding a zero value is still populated
        assert!(!Some(String::new()).is_zero());
    }

    #[test]
    fn optional_uses_contained_value() {
        let value = Some("tenant".to_string()).to_value();
        assert_eq!(value, Value::String(Some(Box::new("tenant".to_string()))));
    }

    #[test]
    fn integers_widen_and_narrow() {
        assert_eq!(i32::from_value(Value::BigInt(Some(42))).unwrap(), 42);
        assert_eq!(u8::from_value(Value::Int(Some(7))).unwrap(), 7);

        let err = u8::from_value(Value::BigInt(Some(300))).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn bool_from_integer() {
        assert!(bool::from_value(Value::BigInt(Some(1))).unwrap());
        assert!(!bool::from_value(Value::Bool(Some(false))).unwrap());
    }

    #[test]
    fn null_into_optional() {
        assert_eq!(Option::<String>::from_value(Value::String(None)).unwrap(), None);
        assert_eq!(Option::<i64>::from_value(Value::BigInt(Some(3))).unwrap(), Some(3));
    }

    #[test]
    fn null_into_required_fails() {
        String::from_value(Value::String(None)).unwrap_err();
        i64::from_value(Value::BigInt(None)).unwrap_err();
    }

    #[test]
    fn timestamp_formats() {
        let rfc = DateTime::<Utc>::from_value(Value::from("2024-01-15T10:30:45Z")).unwrap();
        assert_eq!(rfc.format("%Y-%m-%d %H:%M:%S").to_string(), "2024-01-15 10:30:45");

        let fallback = DateTime::<Utc>::from_value(Value::from("2024-01-15 10:30:45.123")).unwrap();
        assert_eq!(fallback.format("%Y-%m-%d %H:%M:%S").to_string(), "2024-01-15 10:30:45");

        let err = DateTime::<Utc>::from_value(Value::from("invalid date")).unwrap_err();
        assert!(err.to_string().contains("unsupported timestamp"));
    }

    #[test]
    fn dates() {
        let date = NaiveDate::from_value(Value::from("2024-01-15")).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
    }
}
