//! Database values and typed conversion.

use crate::error::{DbError, DbResult};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::fmt;
use uuid::Uuid;

/// A database value, as bound into a parameter or read back from a row.
///
/// `Null` is the database-null sentinel: an absent parameter value and a
/// NULL column both map to it.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Text(String),
    Bytes(Vec<u8>),
    Uuid(Uuid),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Json(serde_json::Value),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Name of the value's kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Bool",
            Value::I16(_) => "I16",
            Value::I32(_) => "I32",
            Value::I64(_) => "I64",
            Value::F32(_) => "F32",
            Value::F64(_) => "F64",
            Value::Text(_) => "Text",
            Value::Bytes(_) => "Bytes",
            Value::Uuid(_) => "Uuid",
            Value::Date(_) => "Date",
            Value::Timestamp(_) => "Timestamp",
            Value::TimestampTz(_) => "TimestampTz",
            Value::Json(_) => "Json",
        }
    }

    /// Integer payload widened to `i64`, if this is an integer kind.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I16(v) => Some(i64::from(*v)),
            Value::I32(v) => Some(i64::from(*v)),
            Value::I64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Invariant text rendering: no locale grouping, `.` as decimal separator.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::I16(v) => write!(f, "{v}"),
            Value::I32(v) => write!(f, "{v}"),
            Value::I64(v) => write!(f, "{v}"),
            Value::F32(v) => write!(f, "{v}"),
            Value::F64(v) => write!(f, "{v}"),
            Value::Text(v) => f.write_str(v),
            Value::Bytes(v) => {
                f.write_str("0x")?;
                for b in v {
                    write!(f, "{b:02x}")?;
                }
                Ok(())
            }
            Value::Uuid(v) => write!(f, "{v}"),
            Value::Date(v) => write!(f, "{}", v.format("%Y-%m-%d")),
            Value::Timestamp(v) => write!(f, "{}", v.format("%Y-%m-%dT%H:%M:%S%.f")),
            Value::TimestampTz(v) => write!(f, "{}", v.to_rfc3339()),
            Value::Json(v) => write!(f, "{v}"),
        }
    }
}

macro_rules! impl_from_for_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

impl_from_for_value! {
    bool => Bool,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    f32 => F32,
    f64 => F64,
    String => Text,
    Vec<u8> => Bytes,
    Uuid => Uuid,
    NaiveDate => Date,
    NaiveDateTime => Timestamp,
    DateTime<Utc> => TimestampTz,
    serde_json::Value => Json,
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Null
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(v.to_vec())
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

/// Conversion from a raw [`Value`] into a Rust type.
///
/// Conversions follow invariant rules: integers widen and narrow with range
/// checks, text parses with `str::parse`, and NULL is only accepted by
/// `Option<T>` (which maps it to `None`) and by `Value` itself.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> DbResult<Self>;
}

fn mismatch<T>(value: &Value) -> DbError {
    if value.is_null() {
        DbError::conversion(format!(
            "unexpected NULL converting to {}",
            std::any::type_name::<T>()
        ))
    } else {
        DbError::conversion(format!(
            "cannot convert {} value '{}' to {}",
            value.kind(),
            value,
            std::any::type_name::<T>()
        ))
    }
}

impl FromValue for Value {
    fn from_value(value: Value) -> DbResult<Self> {
        Ok(value)
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> DbResult<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

/// Whole floats inside the `i64` range; `NaN`, infinities and fractions
/// yield `None`.
fn float_to_i64(f: f64) -> Option<i64> {
    const MIN: f64 = -9_223_372_036_854_775_808.0;
    const MAX: f64 = 9_223_372_036_854_775_808.0;
    (f.fract() == 0.0 && (MIN..MAX).contains(&f)).then(|| f as i64)
}

macro_rules! impl_from_value_int {
    ($($ty:ty),*) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: Value) -> DbResult<Self> {
                    let wide: i64 = match &value {
                        Value::I16(_) | Value::I32(_) | Value::I64(_) => {
                            value.as_i64().ok_or_else(|| mismatch::<$ty>(&value))?
                        }
                        Value::Bool(b) => i64::from(*b),
                        Value::F32(f) => {
                            float_to_i64(f64::from(*f)).ok_or_else(|| mismatch::<$ty>(&value))?
                        }
                        Value::F64(f) => float_to_i64(*f).ok_or_else(|| mismatch::<$ty>(&value))?,
                        Value::Text(s) => s
                            .trim()
                            .parse::<i64>()
                            .map_err(|_| mismatch::<$ty>(&value))?,
                        _ => return Err(mismatch::<$ty>(&value)),
                    };
                    <$ty>::try_from(wide).map_err(|_| {
                        DbError::conversion(format!(
                            "value {} out of range for {}",
                            wide,
                            stringify!($ty)
                        ))
                    })
                }
            }
        )*
    };
}

impl_from_value_int!(i16, i32, i64);

impl FromValue for f64 {
    fn from_value(value: Value) -> DbResult<Self> {
        match &value {
            Value::F64(f) => Ok(*f),
            Value::F32(f) => Ok(f64::from(*f)),
            Value::I16(_) | Value::I32(_) | Value::I64(_) => value
                .as_i64()
                .map(|v| v as f64)
                .ok_or_else(|| mismatch::<f64>(&value)),
            Value::Text(s) => s.trim().parse().map_err(|_| mismatch::<f64>(&value)),
            _ => Err(mismatch::<f64>(&value)),
        }
    }
}

impl FromValue for f32 {
    fn from_value(value: Value) -> DbResult<Self> {
        match value {
            Value::F32(f) => Ok(f),
            other => {
                let wide = f64::from_value(other)?;
                let narrow = wide as f32;
                if wide.is_finite() && narrow.is_infinite() {
                    return Err(DbError::conversion(format!(
                        "value {wide} out of range for f32"
                    )));
                }
                Ok(narrow)
            }
        }
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> DbResult<Self> {
        match &value {
            Value::Bool(b) => Ok(*b),
            Value::I16(_) | Value::I32(_) | Value::I64(_) => Ok(value.as_i64() != Some(0)),
            Value::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(true),
                "false" => Ok(false),
                _ => Err(mismatch::<bool>(&value)),
            },
            _ => Err(mismatch::<bool>(&value)),
        }
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> DbResult<Self> {
        match value {
            Value::Text(s) => Ok(s),
            Value::Null | Value::Bytes(_) => Err(mismatch::<String>(&value)),
            other => Ok(other.to_string()),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: Value) -> DbResult<Self> {
        match value {
            Value::Bytes(b) => Ok(b),
            other => Err(mismatch::<Vec<u8>>(&other)),
        }
    }
}

impl FromValue for Uuid {
    fn from_value(value: Value) -> DbResult<Self> {
        match &value {
            Value::Uuid(u) => Ok(*u),
            Value::Text(s) => Uuid::parse_str(s.trim()).map_err(|_| mismatch::<Uuid>(&value)),
            _ => Err(mismatch::<Uuid>(&value)),
        }
    }
}

impl FromValue for NaiveDate {
    fn from_value(value: Value) -> DbResult<Self> {
        match &value {
            Value::Date(d) => Ok(*d),
            Value::Timestamp(ts) => Ok(ts.date()),
            Value::Text(s) => s.trim().parse().map_err(|_| mismatch::<NaiveDate>(&value)),
            _ => Err(mismatch::<NaiveDate>(&value)),
        }
    }
}

impl FromValue for NaiveDateTime {
    fn from_value(value: Value) -> DbResult<Self> {
        match &value {
            Value::Timestamp(ts) => Ok(*ts),
            Value::TimestampTz(ts) => Ok(ts.naive_utc()),
            Value::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| mismatch::<NaiveDateTime>(&value)),
            _ => Err(mismatch::<NaiveDateTime>(&value)),
        }
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: Value) -> DbResult<Self> {
        match &value {
            Value::TimestampTz(ts) => Ok(*ts),
            Value::Timestamp(ts) => Ok(ts.and_utc()),
            Value::Text(s) => DateTime::parse_from_rfc3339(s.trim())
                .map(|ts| ts.with_timezone(&Utc))
                .map_err(|_| mismatch::<DateTime<Utc>>(&value)),
            _ => Err(mismatch::<DateTime<Utc>>(&value)),
        }
    }
}

impl FromValue for serde_json::Value {
    fn from_value(value: Value) -> DbResult<Self> {
        match value {
            Value::Json(j) => Ok(j),
            Value::Text(s) => serde_json::from_str(&s)
                .map_err(|e| DbError::conversion(format!("invalid JSON text: {e}"))),
            other => Err(mismatch::<serde_json::Value>(&other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_maps_null_to_none() {
        assert_eq!(Option::<i32>::from_value(Value::Null).unwrap(), None);
        assert_eq!(Option::<i32>::from_value(Value::I64(7)).unwrap(), Some(7));
    }

    #[test]
    fn null_into_non_option_is_an_error() {
        let err = i32::from_value(Value::Null).unwrap_err();
        assert!(matches!(err, DbError::Conversion(_)));
    }

    #[test]
    fn integers_narrow_with_range_check() {
        assert_eq!(i16::from_value(Value::I64(123)).unwrap(), 123);
        assert!(i16::from_value(Value::I64(70_000)).is_err());
        assert_eq!(i64::from_value(Value::Text(" 42 ".into())).unwrap(), 42);
        assert_eq!(i32::from_value(Value::F64(3.0)).unwrap(), 3);
        assert!(i32::from_value(Value::F64(3.5)).is_err());
    }

    #[test]
    fn out_of_range_floats_are_rejected() {
        assert!(matches!(i64::from_value(Value::F64(1e30)), Err(DbError::Conversion(_))));
        assert!(Option::<i64>::from_value(Value::F64(-1e30)).is_err());
        assert!(i64::from_value(Value::F64(9_223_372_036_854_775_808.0)).is_err());
        assert!(i64::from_value(Value::F64(f64::NAN)).is_err());
        assert!(i32::from_value(Value::F32(f32::INFINITY)).is_err());
        assert_eq!(
            i64::from_value(Value::F64(-9_223_372_036_854_775_808.0)).unwrap(),
            i64::MIN
        );

        assert!(matches!(f32::from_value(Value::F64(1e300)), Err(DbError::Conversion(_))));
        assert_eq!(f32::from_value(Value::F64(f64::INFINITY)).unwrap(), f32::INFINITY);
        assert_eq!(f32::from_value(Value::F64(0.5)).unwrap(), 0.5);
    }

    #[test]
    fn invariant_text_rendering() {
        assert_eq!(Value::I64(1234567).to_string(), "1234567");
        assert_eq!(Value::F64(1.5).to_string(), "1.5");
        assert_eq!(String::from_value(Value::I32(-5)).unwrap(), "-5");
        assert_eq!(f64::from_value(Value::Text("2.25".into())).unwrap(), 2.25);
    }

    #[test]
    fn option_conversion_into_value() {
        assert_eq!(Value::from(Some(42i32)), Value::I32(42));
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(Value::from("x"), Value::Text("x".to_string()));
    }

    #[test]
    fn bool_and_uuid_conversions() {
        assert!(bool::from_value(Value::I32(1)).unwrap());
        assert!(!bool::from_value(Value::Text("False".into())).unwrap());
        let id = Uuid::nil();
        assert_eq!(Uuid::from_value(Value::Text(id.to_string())).unwrap(), id);
    }
}
