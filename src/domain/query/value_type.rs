use chrono::{DateTime, Utc};
use std::fmt;

use crate::domain::entity::{DataType, Value, ValueError};

/// 型付きの式 [`Expr<T>`](crate::domain::query::Expr) が扱える値の型
///
/// クエリ式の `T` はこのトレイトで `DataType` と `Value` に対応付けられる。
pub trait ValueType: Clone + fmt::Debug + 'static {
    const DATA_TYPE: DataType;

    fn into_value(self) -> Value;

    /// 値から変換する。NULL は `Ok(None)`。
    fn from_value(value: &Value) -> Result<Option<Self>, ValueError>;
}

/// 数値型（`sum` / `avg` が使える）
pub trait Numeric: ValueType {}

/// 大小比較できる型（`gt` / `between` などが使える）
pub trait Ordered: ValueType {}

impl ValueType for i64 {
    const DATA_TYPE: DataType = DataType::Integer;

    fn into_value(self) -> Value {
        Value::Integer(self)
    }

    fn from_value(value: &Value) -> Result<Option<Self>, ValueError> {
        match value.cast_to(DataType::Integer)? {
            Value::Integer(i) => Ok(Some(i)),
            _ => Ok(None),
        }
    }
}

impl ValueType for i32 {
    const DATA_TYPE: DataType = DataType::Integer;

    fn into_value(self) -> Value {
        Value::Integer(i64::from(self))
    }

    fn from_value(value: &Value) -> Result<Option<Self>, ValueError> {
        match i64::from_value(value)? {
            Some(i) => i32::try_from(i)
                .map(Some)
                .map_err(|_| ValueError::ConversionError(i.to_string(), "i32".to_string())),
            None => Ok(None),
        }
    }
}

impl ValueType for f64 {
    const DATA_TYPE: DataType = DataType::Float;

    fn into_value(self) -> Value {
        Value::Float(self)
    }

    fn from_value(value: &Value) -> Result<Option<Self>, ValueError> {
        match value.cast_to(DataType::Float)? {
            Value::Float(f) => Ok(Some(f)),
            _ => Ok(None),
        }
    }
}

impl ValueType for String {
    const DATA_TYPE: DataType = DataType::Text;

    fn into_value(self) -> Value {
        Value::Text(self)
    }

    fn from_value(value: &Value) -> Result<Option<Self>, ValueError> {
        match value.cast_to(DataType::Text)? {
            Value::Text(s) => Ok(Some(s)),
            _ => Ok(None),
        }
    }
}

impl ValueType for bool {
    const DATA_TYPE: DataType = DataType::Boolean;

    fn into_value(self) -> Value {
        Value::Boolean(self)
    }

    fn from_value(value: &Value) -> Result<Option<Self>, ValueError> {
        match value.cast_to(DataType::Boolean)? {
            Value::Boolean(b) => Ok(Some(b)),
            _ => Ok(None),
        }
    }
}

impl ValueType for DateTime<Utc> {
    const DATA_TYPE: DataType = DataType::Timestamp;

    fn into_value(self) -> Value {
        Value::Timestamp(self)
    }

    fn from_value(value: &Value) -> Result<Option<Self>, ValueError> {
        match value {
            Value::Null => Ok(None),
            Value::Timestamp(dt) => Ok(Some(*dt)),
            other => Err(ValueError::TypeMismatch {
                expected: DataType::Timestamp,
                actual: other.data_type(),
            }),
        }
    }
}

impl Numeric for i32 {}
impl Numeric for i64 {}
impl Numeric for f64 {}

impl Ordered for i32 {}
impl Ordered for i64 {}
impl Ordered for f64 {}
impl Ordered for String {}
impl Ordered for DateTime<Utc> {}
