use proc_macro2::TokenStream;
use quote::{ToTokens, TokenStreamExt, quote};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt::{self, Display};
use time::{Date, PrimitiveDateTime, Time};
use uuid::Uuid;

/// Runtime type tag carried alongside every rendered expression.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    Boolean,
    Number,
    String,
    DateOnly,
    DateTime,
    Time,
    Uuid,
    Bytes,
    #[default]
    Unknown,
}

impl ValueType {
    /// Infer the tag from the last segment of a Rust type path (`i32`, `String`, `Date`).
    pub fn from_type_name(name: &str) -> Self {
        match name {
            "bool" => ValueType::Boolean,
            "i8" | "i16" | "i32" | "i64" | "isize" | "u8" | "u16" | "u32" | "u64" | "usize"
            | "f32" | "f64" | "Decimal" => ValueType::Number,
            "String" | "str" | "char" | "Cow" => ValueType::String,
            "Date" => ValueType::DateOnly,
            "PrimitiveDateTime" | "OffsetDateTime" => ValueType::DateTime,
            "Time" => ValueType::Time,
            "Uuid" => ValueType::Uuid,
            _ => ValueType::Unknown,
        }
    }
}

impl Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl ToTokens for ValueType {
    fn to_tokens(&self, tokens: &mut TokenStream) {
        use ValueType::*;
        tokens.append_all(match self {
            Boolean => quote!(::strata::ValueType::Boolean),
            Number => quote!(::strata::ValueType::Number),
            String => quote!(::strata::ValueType::String),
            DateOnly => quote!(::strata::ValueType::DateOnly),
            DateTime => quote!(::strata::ValueType::DateTime),
            Time => quote!(::strata::ValueType::Time),
            Uuid => quote!(::strata::ValueType::Uuid),
            Bytes => quote!(::strata::ValueType::Bytes),
            Unknown => quote!(::strata::ValueType::Unknown),
        });
    }
}

/// Dynamically typed value, used both for literals and for the cells returned by an executor.
///
/// Every variant carries an `Option` so that a typed NULL keeps its type tag.
#[derive(Default, Debug, Clone, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Boolean(Option<bool>),
    Int64(Option<i64>),
    Float64(Option<f64>),
    Decimal(Option<Decimal>),
    Varchar(Option<String>),
    Blob(Option<Box<[u8]>>),
    Date(Option<Date>),
    Time(Option<Time>),
    Timestamp(Option<PrimitiveDateTime>),
    Uuid(Option<Uuid>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Boolean(v) => v.is_none(),
            Value::Int64(v) => v.is_none(),
            Value::Float64(v) => v.is_none(),
            Value::Decimal(v) => v.is_none(),
            Value::Varchar(v) => v.is_none(),
            Value::Blob(v) => v.is_none(),
            Value::Date(v) => v.is_none(),
            Value::Time(v) => v.is_none(),
            Value::Timestamp(v) => v.is_none(),
            Value::Uuid(v) => v.is_none(),
        }
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Null => ValueType::Unknown,
            Value::Boolean(..) => ValueType::Boolean,
            Value::Int64(..) | Value::Float64(..) | Value::Decimal(..) => ValueType::Number,
            Value::Varchar(..) => ValueType::String,
            Value::Blob(..) => ValueType::Bytes,
            Value::Date(..) => ValueType::DateOnly,
            Value::Time(..) => ValueType::Time,
            Value::Timestamp(..) => ValueType::DateTime,
            Value::Uuid(..) => ValueType::Uuid,
        }
    }
}

/// Cells serialize as their inner value, NULL as `None`. Temporal values use the
/// human readable `time` formats so they deserialize back into `time` types.
impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Boolean(v) => v.serialize(serializer),
            Value::Int64(v) => v.serialize(serializer),
            Value::Float64(v) => v.serialize(serializer),
            Value::Decimal(v) => v.serialize(serializer),
            Value::Varchar(v) => v.serialize(serializer),
            Value::Blob(v) => v.serialize(serializer),
            Value::Date(v) => v.serialize(serializer),
            Value::Time(v) => v.serialize(serializer),
            Value::Timestamp(v) => v.serialize(serializer),
            Value::Uuid(v) => v.serialize(serializer),
        }
    }
}
