use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use crate::domain::entity::data_type::DataType;
use thiserror::Error;

// 値型エラーの定義
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValueError {
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: DataType, actual: DataType },

    #[error("Cannot convert {0} to {1}")]
    ConversionError(String, String),

    #[error("NULL value not allowed")]
    NullValueNotAllowed,
}

// DB内の値の表現
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Text(String),
    Boolean(bool),
    Timestamp(DateTime<Utc>),
    Null,
}

impl Value {
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Integer(_) => DataType::Integer,
            Value::Float(_) => DataType::Float,
            Value::Text(_) => DataType::Text,
            Value::Boolean(_) => DataType::Boolean,
            Value::Timestamp(_) => DataType::Timestamp,
            Value::Null => DataType::Null,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    //指定したデータ型に変換する
    pub fn cast_to(&self, target_type: DataType) -> Result<Value, ValueError> {
        match (self, target_type) {
            //NUllはどの型にも変換できる
            (Value::Null, _) => Ok(Value::Null),

            //同じ型への変換はそのまま返す
            (v, t) if v.data_type() == t => Ok(v.clone()),

            //整数から他の型への変換
            (Value::Integer(i), DataType::Float) => Ok(Value::Float(*i as f64)),
            (Value::Integer(i), DataType::Text) => Ok(Value::Text(i.to_string())),
            (Value::Integer(i), DataType::Boolean) => Ok(Value::Boolean(*i != 0)),

            //浮動小数点数から他の型への変換
            (Value::Float(f), DataType::Integer) => Ok(Value::Integer(*f as i64)),
            (Value::Float(f), DataType::Text) => Ok(Value::Text(f.to_string())),

            (Value::Boolean(b), DataType::Text) => Ok(Value::Text(b.to_string())),
            (Value::Timestamp(dt), DataType::Text) => Ok(Value::Text(dt.to_rfc3339())),

            //文字列から他の型への変換
            (Value::Text(s), DataType::Integer) => s
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|_| ValueError::ConversionError(s.to_string(), "INTEGER".to_string())),
            (Value::Text(s), DataType::Float) => s
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| ValueError::ConversionError(s.to_string(), "FLOAT".to_string())),

            // その他の変換はエラー
            (value, target) => Err(ValueError::TypeMismatch {
                expected: target,
                actual: value.data_type(),
            }),
        }
    }

    /// SQLの比較セマンティクスで2つの値を比較する
    ///
    /// どちらかがNULL、または比較できない型同士の場合は`None`（UNKNOWN）を返す。
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, _) | (_, Value::Null) => None,
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Integer(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (Value::Float(a), Value::Integer(b)) => a.partial_cmp(&(*b as f64)),
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// 三値論理での等価比較
    pub fn sql_eq(&self, other: &Value) -> Option<bool> {
        self.compare(other).map(|ordering| ordering == Ordering::Equal)
    }

    /// JSON表現に変換する（フィールド射影で使用）
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Integer(i) => serde_json::Value::Number(serde_json::Number::from(*i)),
            Value::Float(f) => match serde_json::Number::from_f64(*f) {
                Some(num) => serde_json::Value::Number(num),
                None => serde_json::Value::String(f.to_string()),
            },
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::Timestamp(dt) => serde_json::Value::String(dt.to_rfc3339()),
            Value::Null => serde_json::Value::Null,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(n) => write!(f, "{}", n),
            Value::Text(s) => write!(f, "'{}'", s),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Timestamp(dt) => write!(f, "{}", dt),
            Value::Null => write!(f, "NULL"),
        }
    }
}

impl From<i64> for Value {
    fn from(val: i64) -> Self {
        Value::Integer(val)
    }
}
impl From<i32> for Value {
    fn from(val: i32) -> Self {
        Value::Integer(i64::from(val))
    }
}
impl From<f64> for Value {
    fn from(val: f64) -> Self {
        Value::Float(val)
    }
}
impl From<String> for Value {
    fn from(val: String) -> Self {
        Value::Text(val)
    }
}
impl From<&str> for Value {
    fn from(val: &str) -> Self {
        Value::Text(val.to_string())
    }
}
impl From<bool> for Value {
    fn from(val: bool) -> Self {
        Value::Boolean(val)
    }
}
impl From<DateTime<Utc>> for Value {
    fn from(val: DateTime<Utc>) -> Self {
        Value::Timestamp(val)
    }
}
impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(val: Option<T>) -> Self {
        val.map_or(Value::Null, Into::into)
    }
}
