use crate::Value;
use rust_decimal::Decimal;
use std::borrow::Cow;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};
use uuid::Uuid;

/// Conversion from native Rust values into the dynamically typed [`Value`] used for literals.
///
/// ```rust
/// use strata_core::{AsValue, Value};
/// assert_eq!(42i32.as_value(), Value::Int64(Some(42)));
/// assert_eq!(None::<String>.as_value(), Value::Varchar(None));
/// ```
pub trait AsValue {
    /// The NULL variant for this type, keeping its type tag.
    fn as_empty_value() -> Value;
    fn as_value(self) -> Value;
}

macro_rules! impl_as_value {
    ($source:ty, $variant:path, $convert:expr) => {
        impl AsValue for $source {
            fn as_empty_value() -> Value {
                $variant(None)
            }
            fn as_value(self) -> Value {
                $variant(Some($convert(self)))
            }
        }
    };
}

impl_as_value!(bool, Value::Boolean, |v| v);
impl_as_value!(i8, Value::Int64, i64::from);
impl_as_value!(i16, Value::Int64, i64::from);
impl_as_value!(i32, Value::Int64, i64::from);
impl_as_value!(i64, Value::Int64, |v| v);
impl_as_value!(u8, Value::Int64, i64::from);
impl_as_value!(u16, Value::Int64, i64::from);
impl_as_value!(u32, Value::Int64, i64::from);
impl_as_value!(u64, Value::Decimal, Decimal::from);
impl_as_value!(isize, Value::Decimal, Decimal::from);
impl_as_value!(usize, Value::Decimal, Decimal::from);
impl_as_value!(f32, Value::Float64, f64::from);
impl_as_value!(f64, Value::Float64, |v| v);
impl_as_value!(Decimal, Value::Decimal, |v| v);
impl_as_value!(char, Value::Varchar, |v: char| v.to_string());
impl_as_value!(String, Value::Varchar, |v| v);
impl_as_value!(Cow<'_, str>, Value::Varchar, Cow::into_owned);
impl_as_value!(Vec<u8>, Value::Blob, Vec::into_boxed_slice);
impl_as_value!(Box<[u8]>, Value::Blob, |v| v);
impl_as_value!(Date, Value::Date, |v| v);
impl_as_value!(Time, Value::Time, |v| v);
impl_as_value!(PrimitiveDateTime, Value::Timestamp, |v| v);
impl_as_value!(
    OffsetDateTime,
    Value::Timestamp,
    |v: OffsetDateTime| {
        let v = v.to_offset(UtcOffset::UTC);
        PrimitiveDateTime::new(v.date(), v.time())
    }
);
impl_as_value!(Uuid, Value::Uuid, |v| v);

impl AsValue for &str {
    fn as_empty_value() -> Value {
        Value::Varchar(None)
    }
    fn as_value(self) -> Value {
        Value::Varchar(Some(self.to_owned()))
    }
}

impl AsValue for &String {
    fn as_empty_value() -> Value {
        Value::Varchar(None)
    }
    fn as_value(self) -> Value {
        Value::Varchar(Some(self.clone()))
    }
}

impl AsValue for Value {
    fn as_empty_value() -> Value {
        Value::Null
    }
    fn as_value(self) -> Value {
        self
    }
}

impl<T: AsValue> AsValue for Option<T> {
    fn as_empty_value() -> Value {
        T::as_empty_value()
    }
    fn as_value(self) -> Value {
        match self {
            Some(v) => v.as_value(),
            None => T::as_empty_value(),
        }
    }
}

impl<T: AsValue> AsValue for Box<T> {
    fn as_empty_value() -> Value {
        T::as_empty_value()
    }
    fn as_value(self) -> Value {
        (*self).as_value()
    }
}
