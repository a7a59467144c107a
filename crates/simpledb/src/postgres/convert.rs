//! `Value` <-> Postgres wire conversions.

use crate::error::{DbError, DbResult};
use crate::value::Value;
use bytes::BytesMut;
use std::error::Error;
use tokio_postgres::types::{IsNull, ToSql, Type, to_sql_checked};

type BoxError = Box<dyn Error + Sync + Send>;

impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(v) => v.to_sql_checked(ty, out),
            Value::I16(v) => int_to_sql(i64::from(*v), ty, out),
            Value::I32(v) => int_to_sql(i64::from(*v), ty, out),
            Value::I64(v) => int_to_sql(*v, ty, out),
            Value::F32(v) => match *ty {
                Type::FLOAT8 => f64::from(*v).to_sql(ty, out),
                _ => v.to_sql_checked(ty, out),
            },
            Value::F64(v) => match *ty {
                Type::FLOAT4 => (*v as f32).to_sql(ty, out),
                _ => v.to_sql_checked(ty, out),
            },
            Value::Text(v) => v.to_sql_checked(ty, out),
            Value::Bytes(v) => v.to_sql_checked(ty, out),
            Value::Uuid(v) => v.to_sql_checked(ty, out),
            Value::Date(v) => v.to_sql_checked(ty, out),
            Value::Timestamp(v) => v.to_sql_checked(ty, out),
            Value::TimestampTz(v) => v.to_sql_checked(ty, out),
            Value::Json(v) => v.to_sql_checked(ty, out),
        }
    }

    // Per-variant checks happen in `to_sql`.
    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

/// Integers bind to whichever integer width the server inferred, as long as
/// the value fits.
fn int_to_sql(v: i64, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::INT2 => i16::try_from(v)?.to_sql(ty, out),
        Type::INT4 => i32::try_from(v)?.to_sql(ty, out),
        Type::INT8 => v.to_sql(ty, out),
        Type::FLOAT4 => (v as f32).to_sql(ty, out),
        Type::FLOAT8 => (v as f64).to_sql(ty, out),
        Type::OID => u32::try_from(v)?.to_sql(ty, out),
        _ => v.to_sql_checked(ty, out),
    }
}

/// Read column `idx` of `row` as a [`Value`], choosing the Rust type from the
/// column's Postgres type.
pub(crate) fn column_value(row: &tokio_postgres::Row, idx: usize) -> DbResult<Value> {
    let column = &row.columns()[idx];
    let ty = column.type_();
    let decode = |e: tokio_postgres::Error| DbError::decode(column.name(), e.to_string());

    let value = match *ty {
        Type::BOOL => row.try_get::<_, Option<bool>>(idx).map_err(decode)?.into(),
        Type::INT2 => row.try_get::<_, Option<i16>>(idx).map_err(decode)?.into(),
        Type::INT4 => row.try_get::<_, Option<i32>>(idx).map_err(decode)?.into(),
        Type::INT8 => row.try_get::<_, Option<i64>>(idx).map_err(decode)?.into(),
        Type::OID => row
            .try_get::<_, Option<u32>>(idx)
            .map_err(decode)?
            .map(i64::from)
            .into(),
        Type::FLOAT4 => row.try_get::<_, Option<f32>>(idx).map_err(decode)?.into(),
        Type::FLOAT8 => row.try_get::<_, Option<f64>>(idx).map_err(decode)?.into(),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN => {
            row.try_get::<_, Option<String>>(idx).map_err(decode)?.into()
        }
        Type::BYTEA => row.try_get::<_, Option<Vec<u8>>>(idx).map_err(decode)?.into(),
        Type::UUID => row.try_get::<_, Option<uuid::Uuid>>(idx).map_err(decode)?.into(),
        Type::DATE => row
            .try_get::<_, Option<chrono::NaiveDate>>(idx)
            .map_err(decode)?
            .into(),
        Type::TIMESTAMP => row
            .try_get::<_, Option<chrono::NaiveDateTime>>(idx)
            .map_err(decode)?
            .into(),
        Type::TIMESTAMPTZ => row
            .try_get::<_, Option<chrono::DateTime<chrono::Utc>>>(idx)
            .map_err(decode)?
            .into(),
        Type::JSON | Type::JSONB => row
            .try_get::<_, Option<serde_json::Value>>(idx)
            .map_err(decode)?
            .into(),
        _ => {
            return Err(DbError::decode(
                column.name(),
                format!("unsupported column type {}", ty.name()),
            ));
        }
    };
    Ok(value)
}
