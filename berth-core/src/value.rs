use rust_decimal::{Decimal, prelude::ToPrimitive};
use serde_json::{Number, json};
use std::fmt::Write;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};
use uuid::Uuid;

/// Dynamically typed value moved between records, criteria and query parameters.
///
/// Every variant wraps an `Option` so a value can carry its type even when the
/// payload is missing (a typed NULL).
#[derive(Default, Debug, Clone, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Boolean(Option<bool>),
    Int16(Option<i16>),
    Int32(Option<i32>),
    Int64(Option<i64>),
    Float32(Option<f32>),
    Float64(Option<f64>),
    Decimal(Option<Decimal>),
    Varchar(Option<String>),
    Blob(Option<Box<[u8]>>),
    Date(Option<Date>),
    Time(Option<Time>),
    Timestamp(Option<PrimitiveDateTime>),
    TimestampWithTimezone(Option<OffsetDateTime>),
    Uuid(Option<Uuid>),
    Json(Option<serde_json::Value>),
    List(Option<Vec<Value>>),
}

impl Value {
    /// Whether the value holds no payload (untyped or typed NULL).
    pub fn is_null(&self) -> bool {
        match self {
            Value::Null
            | Value::Boolean(None)
            | Value::Int16(None)
            | Value::Int32(None)
            | Value::Int64(None)
            | Value::Float32(None)
            | Value::Float64(None)
            | Value::Decimal(None)
            | Value::Varchar(None)
            | Value::Blob(None)
            | Value::Date(None)
            | Value::Time(None)
            | Value::Timestamp(None)
            | Value::TimestampWithTimezone(None)
            | Value::Uuid(None)
            | Value::Json(None)
            | Value::List(None) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Varchar(Some(v)) => Some(v),
            _ => None,
        }
    }

    /// Widening view of the value as a signed 64 bit integer, when lossless.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int16(Some(v)) => Some(*v as i64),
            Value::Int32(Some(v)) => Some(*v as i64),
            Value::Int64(Some(v)) => Some(*v),
            Value::Decimal(Some(v)) => v.to_i64(),
            Value::Varchar(Some(v)) => atoi::atoi(v.as_bytes()),
            _ => None,
        }
    }

    /// Convert a JSON scalar into the closest typed value.
    ///
    /// Arrays become `List`, objects are kept whole as `Json`. Integral numbers
    /// map to `Int64`, everything else numeric to `Float64`.
    pub fn from_json(value: &serde_json::Value) -> Value {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(v) => Value::Boolean(Some(*v)),
            serde_json::Value::Number(v) => {
                if let Some(v) = v.as_i64() {
                    Value::Int64(Some(v))
                } else {
                    Value::Float64(v.as_f64())
                }
            }
            serde_json::Value::String(v) => Value::Varchar(Some(v.clone())),
            serde_json::Value::Array(v) => {
                Value::List(Some(v.iter().map(Value::from_json).collect()))
            }
            serde_json::Value::Object(..) => Value::Json(Some(value.clone())),
        }
    }

    /// Project the value back into JSON, used when a list or json payload has
    /// to travel as serialized text.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            v if v.is_null() => serde_json::Value::Null,
            Value::Boolean(Some(v)) => json!(v),
            Value::Int16(Some(v)) => json!(v),
            Value::Int32(Some(v)) => json!(v),
            Value::Int64(Some(v)) => json!(v),
            Value::Float32(Some(v)) => json!(v),
            Value::Float64(Some(v)) => json!(v),
            Value::Decimal(Some(v)) => v
                .to_f64()
                .and_then(Number::from_f64)
                .map(serde_json::Value::Number)
                .unwrap_or_else(|| json!(v.to_string())),
            Value::Varchar(Some(v)) => json!(v),
            Value::Blob(Some(v)) => json!(hex::encode(v)),
            Value::Date(Some(v)) => json!(format_date(v)),
            Value::Time(Some(v)) => json!(format_time(v)),
            Value::Timestamp(Some(v)) => json!(format_timestamp(v)),
            Value::TimestampWithTimezone(Some(v)) => {
                let utc = v.to_utc();
                json!(format_timestamp(&PrimitiveDateTime::new(
                    utc.date(),
                    utc.time()
                )))
            }
            Value::Uuid(Some(v)) => json!(v.to_string()),
            Value::Json(Some(v)) => v.clone(),
            Value::List(Some(v)) => serde_json::Value::Array(v.iter().map(Value::to_json).collect()),
            _ => serde_json::Value::Null,
        }
    }
}

fn format_date(value: &Date) -> String {
    let mut out = String::with_capacity(10);
    let _ = write!(
        out,
        "{:04}-{:02}-{:02}",
        value.year(),
        value.month() as u8,
        value.day()
    );
    out
}

fn format_time(value: &Time) -> String {
    let mut out = String::with_capacity(8);
    let _ = write!(
        out,
        "{:02}:{:02}:{:02}",
        value.hour(),
        value.minute(),
        value.second()
    );
    out
}

fn format_timestamp(value: &PrimitiveDateTime) -> String {
    let mut out = format_date(&value.date());
    out.push(' ');
    out.push_str(&format_time(&value.time()));
    out
}

macro_rules! impl_from {
    ($source:ty, $variant:ident) => {
        impl From<$source> for Value {
            fn from(value: $source) -> Self {
                Value::$variant(Some(value.into()))
            }
        }
        impl From<Option<$source>> for Value {
            fn from(value: Option<$source>) -> Self {
                Value::$variant(value.map(Into::into))
            }
        }
    };
}

impl_from!(bool, Boolean);
impl_from!(i16, Int16);
impl_from!(i32, Int32);
impl_from!(i64, Int64);
impl_from!(f32, Float32);
impl_from!(f64, Float64);
impl_from!(Decimal, Decimal);
impl_from!(String, Varchar);
impl_from!(&str, Varchar);
impl_from!(Vec<u8>, Blob);
impl_from!(Date, Date);
impl_from!(Time, Time);
impl_from!(PrimitiveDateTime, Timestamp);
impl_from!(OffsetDateTime, TimestampWithTimezone);
impl_from!(Uuid, Uuid);
impl_from!(serde_json::Value, Json);
impl_from!(Vec<Value>, List);
