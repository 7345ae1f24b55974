use berth_core::Value;
use bytes::BytesMut;
use postgres_types::{FromSql, IsNull, ToSql, Type, to_sql_checked};
use rust_decimal::{Decimal, prelude::FromPrimitive};
use std::{error::Error, io::Read};
use time::{
    Date, OffsetDateTime, PrimitiveDateTime, Time,
    format_description::{BorrowedFormatItem, well_known::Rfc3339},
    macros::format_description,
};
use uuid::Uuid;

const DATE_FORMAT: &[BorrowedFormatItem<'_>] = format_description!("[year]-[month]-[day]");
const TIME_FORMAT: &[BorrowedFormatItem<'_>] = format_description!("[hour]:[minute]:[second]");
const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'_>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

fn parse_date(text: &str) -> Result<Date, time::error::Parse> {
    Date::parse(text, DATE_FORMAT)
}

fn parse_time(text: &str) -> Result<Time, time::error::Parse> {
    Time::parse(text, TIME_FORMAT)
}

fn parse_timestamp(text: &str) -> Result<PrimitiveDateTime, time::error::Parse> {
    OffsetDateTime::parse(text, &Rfc3339)
        .map(|v| {
            let utc = v.to_utc();
            PrimitiveDateTime::new(utc.date(), utc.time())
        })
        .or_else(|_| PrimitiveDateTime::parse(text, TIMESTAMP_FORMAT))
}

fn parse_timestamptz(text: &str) -> Result<OffsetDateTime, time::error::Parse> {
    OffsetDateTime::parse(text, &Rfc3339).or_else(|_| {
        PrimitiveDateTime::parse(text, TIMESTAMP_FORMAT).map(PrimitiveDateTime::assume_utc)
    })
}

/// Carrier moving a [`Value`] across the postgres wire protocol.
///
/// Decoding follows the column type reported by the backend. Encoding follows
/// the parameter type the statement inferred, coercing the dynamically typed
/// payloads (JSON born strings against temporal, uuid or json parameters,
/// JSON born integers against narrower numeric parameters) on the way out.
#[derive(Debug)]
pub struct ValueHolder(pub Value);

impl From<Value> for ValueHolder {
    fn from(value: Value) -> Self {
        ValueHolder(value)
    }
}

impl<'a> FromSql<'a> for ValueHolder {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        Self::from_sql_nullable(ty, Some(raw))
    }
    fn from_sql_null(ty: &Type) -> Result<Self, Box<dyn Error + Sync + Send>> {
        Self::from_sql_nullable(ty, None)
    }
    fn from_sql_nullable(
        ty: &Type,
        raw: Option<&'a [u8]>,
    ) -> Result<Self, Box<dyn Error + Sync + Send>> {
        macro_rules! to_value {
            ($ty_var:ident, $raw:ident, $($($ty:path)|+ => ( $value:path, $source:ty ) ,)+) => {
                match *$ty_var {
                    $($($ty)|+ => $value(if let Some($raw) = $raw { Some(<$source>::from_sql($ty_var, $raw)?.into()) } else { None }),)+
                    _ => {
                        if let Some(mut raw) = $raw {
                            let mut buf = String::new();
                            let _ = raw.read_to_string(&mut buf);
                            return Err(berth_core::Error::msg(format!("Cannot decode sql type: `{}`, value: `{}`", $ty_var, buf)).into());
                        }
                        Value::Null
                    }
                }
            };
        }
        let value = to_value!(ty, raw,
            Type::BOOL => (Value::Boolean, bool),
            Type::INT2 => (Value::Int16, i16),
            Type::INT4 => (Value::Int32, i32),
            Type::INT8 => (Value::Int64, i64),
            Type::FLOAT4 => (Value::Float32, f32),
            Type::FLOAT8 => (Value::Float64, f64),
            Type::NUMERIC => (Value::Decimal, Decimal),
            Type::VARCHAR
            | Type::TEXT
            | Type::NAME
            | Type::BPCHAR
            | Type::UNKNOWN
            | Type::XML => (Value::Varchar, String),
            Type::JSON | Type::JSONB => (Value::Json, serde_json::Value),
            Type::BYTEA => (Value::Blob, Vec<u8>),
            Type::DATE => (Value::Date, Date),
            Type::TIME => (Value::Time, Time),
            Type::TIMESTAMP => (Value::Timestamp, PrimitiveDateTime),
            Type::TIMESTAMPTZ => (Value::TimestampWithTimezone, OffsetDateTime),
            Type::UUID => (Value::Uuid, Uuid),
            Type::INT2_ARRAY
            | Type::INT4_ARRAY
            | Type::INT8_ARRAY
            | Type::FLOAT4_ARRAY
            | Type::FLOAT8_ARRAY
            | Type::TEXT_ARRAY
            | Type::VARCHAR_ARRAY
            | Type::BPCHAR_ARRAY => (Value::List, VecWrap<ValueHolder>),
        );
        Ok(value.into())
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

impl ToSql for ValueHolder {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, Box<dyn Error + Sync + Send>>
    where
        Self: Sized,
    {
        match &self.0 {
            Value::Null => None::<String>.to_sql(ty, out),
            Value::Boolean(v) => v.to_sql(ty, out),
            Value::Int16(v) => v.to_sql(ty, out),
            Value::Int32(v) => v.to_sql(ty, out),
            Value::Int64(v) => match *ty {
                Type::INT2 => v.map(|v| v as i16).to_sql(ty, out),
                Type::INT4 => v.map(|v| v as i32).to_sql(ty, out),
                Type::FLOAT4 => v.map(|v| v as f32).to_sql(ty, out),
                Type::FLOAT8 => v.map(|v| v as f64).to_sql(ty, out),
                Type::NUMERIC => v.map(Decimal::from).to_sql(ty, out),
                _ => v.to_sql(ty, out),
            },
            Value::Float32(v) => v.to_sql(ty, out),
            Value::Float64(v) => match *ty {
                Type::FLOAT4 => v.map(|v| v as f32).to_sql(ty, out),
                Type::NUMERIC => v.and_then(Decimal::from_f64).to_sql(ty, out),
                _ => v.to_sql(ty, out),
            },
            Value::Decimal(v) => v.to_sql(ty, out),
            Value::Varchar(v) => match *ty {
                Type::DATE => v.as_deref().map(parse_date).transpose()?.to_sql(ty, out),
                Type::TIME => v.as_deref().map(parse_time).transpose()?.to_sql(ty, out),
                Type::TIMESTAMP => v
                    .as_deref()
                    .map(parse_timestamp)
                    .transpose()?
                    .to_sql(ty, out),
                Type::TIMESTAMPTZ => v
                    .as_deref()
                    .map(parse_timestamptz)
                    .transpose()?
                    .to_sql(ty, out),
                Type::UUID => v
                    .as_deref()
                    .map(Uuid::parse_str)
                    .transpose()?
                    .to_sql(ty, out),
                Type::JSON | Type::JSONB => v
                    .as_deref()
                    .map(serde_json::from_str::<serde_json::Value>)
                    .transpose()?
                    .to_sql(ty, out),
                _ => v.to_sql(ty, out),
            },
            Value::Blob(v) => v.as_deref().to_sql(ty, out),
            Value::Date(v) => v.to_sql(ty, out),
            Value::Time(v) => v.to_sql(ty, out),
            Value::Timestamp(v) => v.to_sql(ty, out),
            Value::TimestampWithTimezone(v) => v.to_sql(ty, out),
            Value::Uuid(v) => v.to_sql(ty, out),
            Value::Json(v) => match *ty {
                Type::VARCHAR | Type::TEXT | Type::NAME | Type::BPCHAR => {
                    v.as_ref().map(|v| v.to_string()).to_sql(ty, out)
                }
                _ => v.to_sql(ty, out),
            },
            Value::List(v) => match *ty {
                Type::VARCHAR | Type::TEXT | Type::NAME | Type::BPCHAR => v
                    .as_ref()
                    .map(|_| self.0.to_json().to_string())
                    .to_sql(ty, out),
                Type::JSON | Type::JSONB => {
                    v.as_ref().map(|_| self.0.to_json()).to_sql(ty, out)
                }
                _ => v
                    .as_ref()
                    .map(|v| v.clone().into_iter().map(ValueHolder).collect::<Vec<_>>())
                    .to_sql(ty, out),
            },
        }
    }

    fn accepts(_ty: &Type) -> bool
    where
        Self: Sized,
    {
        true
    }

    to_sql_checked!();
}

struct VecWrap<T>(pub Vec<T>);

impl<'a, T: FromSql<'a>> FromSql<'a> for VecWrap<T> {
    fn from_sql_null(ty: &Type) -> Result<Self, Box<dyn Error + Sync + Send>> {
        Vec::<T>::from_sql_null(ty).map(VecWrap)
    }
    fn from_sql_nullable(
        ty: &Type,
        raw: Option<&'a [u8]>,
    ) -> Result<Self, Box<dyn Error + Sync + Send>> {
        Vec::<T>::from_sql_nullable(ty, raw).map(VecWrap)
    }
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        Vec::<T>::from_sql(ty, raw).map(VecWrap)
    }
    fn accepts(ty: &Type) -> bool {
        Vec::<T>::accepts(ty)
    }
}

impl From<VecWrap<ValueHolder>> for Vec<Value> {
    fn from(value: VecWrap<ValueHolder>) -> Self {
        value.0.into_iter().map(|v| v.0).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    fn encode(value: Value, ty: &Type) -> BytesMut {
        let mut out = BytesMut::new();
        ValueHolder(value)
            .to_sql(ty, &mut out)
            .expect("the value must encode");
        out
    }

    fn expected(value: impl ToSql, ty: &Type) -> BytesMut {
        let mut out = BytesMut::new();
        value.to_sql(ty, &mut out).expect("the value must encode");
        out
    }

    #[test]
    fn string_payload_reaches_a_date_parameter() {
        assert_eq!(
            encode(Value::Varchar(Some("2023-01-15".into())), &Type::DATE),
            expected(date!(2023 - 01 - 15), &Type::DATE),
        );
    }

    #[test]
    fn string_payload_reaches_a_timestamp_parameter() {
        let at = datetime!(2023-01-15 10:30:00);
        assert_eq!(
            encode(
                Value::Varchar(Some("2023-01-15T10:30:00Z".into())),
                &Type::TIMESTAMP,
            ),
            expected(at, &Type::TIMESTAMP),
        );
        assert_eq!(
            encode(
                Value::Varchar(Some("2023-01-15 10:30:00".into())),
                &Type::TIMESTAMP,
            ),
            expected(at, &Type::TIMESTAMP),
        );
    }

    #[test]
    fn string_payload_reaches_a_uuid_parameter() {
        let id = "61b53cfd-a2c4-4dcf-9cc4-9500c05288ae";
        assert_eq!(
            encode(Value::Varchar(Some(id.into())), &Type::UUID),
            expected(Uuid::parse_str(id).unwrap(), &Type::UUID),
        );
    }

    #[test]
    fn string_payload_reaches_a_json_parameter() {
        assert_eq!(
            encode(Value::Varchar(Some(r#"{"a":1}"#.into())), &Type::JSON),
            expected(serde_json::json!({"a": 1}), &Type::JSON),
        );
    }

    #[test]
    fn wide_integer_narrows_to_the_parameter_type() {
        assert_eq!(
            encode(Value::Int64(Some(7)), &Type::INT4),
            expected(7_i32, &Type::INT4),
        );
        assert_eq!(
            encode(Value::Int64(Some(7)), &Type::NUMERIC),
            expected(Decimal::from(7), &Type::NUMERIC),
        );
    }

    #[test]
    fn list_serializes_as_json_text_against_a_text_parameter() {
        assert_eq!(
            encode(
                Value::List(Some(vec![
                    Value::Varchar(Some("a".into())),
                    Value::Int64(Some(1)),
                ])),
                &Type::TEXT,
            ),
            expected(r#"["a",1]"#, &Type::TEXT),
        );
    }

    #[test]
    fn nulls_encode_as_sql_null() {
        let mut out = BytesMut::new();
        assert!(matches!(
            ValueHolder(Value::Null).to_sql(&Type::TEXT, &mut out),
            Ok(IsNull::Yes),
        ));
        assert!(matches!(
            ValueHolder(Value::Varchar(None)).to_sql(&Type::DATE, &mut out),
            Ok(IsNull::Yes),
        ));
    }
}
