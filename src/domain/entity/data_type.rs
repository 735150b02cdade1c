use derive_more::Display;
use strum::EnumString;
use serde::{Deserialize, Serialize};
use std::fmt;


/// クエリ式と列がとりうるデータ型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
pub enum DataType {
    #[strum(serialize = "INTEGER", serialize = "INT", serialize = "BIGINT")]
    Integer,

    #[strum(serialize = "FLOAT", serialize = "DOUBLE", serialize = "REAL")]
    Float,

    #[strum(serialize = "TEXT", serialize = "VARCHAR", serialize = "STRING")]
    Text,

    #[strum(serialize = "BOOLEAN", serialize = "BOOL")]
    Boolean,

    #[strum(serialize = "TIMESTAMP")]
    Timestamp,

    #[strum(serialize = "NULL")]
    Null,
}

impl DataType {
    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Integer | DataType::Float)
    }

    pub fn is_text(&self) -> bool {
        matches!(self, DataType::Text)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, DataType::Null)
    }

    /// 2つの型の値を比較できるかどうか
    ///
    /// NULLはどの型とも比較できる（結果は常にUNKNOWN）。整数と浮動小数点数は相互に比較できる。
    pub fn is_comparable_with(&self, other: DataType) -> bool {
        if self.is_null() || other.is_null() {
            return true;
        }
        *self == other || (self.is_numeric() && other.is_numeric())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Constraint {
    // 主キー制約
    PrimaryKey,
    // ユニーク制約
    Unique,
    // NOT NULL 制約
    NotNull,
    // 外部キー制約（参照先テーブル名、参照先は常に主キー）
    ForeignKey(String),
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::PrimaryKey => write!(f, "PRIMARY KEY"),
            Constraint::Unique => write!(f, "UNIQUE"),
            Constraint::NotNull => write!(f, "NOT NULL"),
            Constraint::ForeignKey(table) => write!(f, "REFERENCES {}", table),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use test_case::test_case;

    #[test_case(DataType::Integer, DataType::Float, true; "integer and float")]
    #[test_case(DataType::Text, DataType::Text, true; "same type")]
    #[test_case(DataType::Text, DataType::Integer, false; "text and integer")]
    #[test_case(DataType::Boolean, DataType::Null, true; "null is comparable")]
    fn comparable_types(left: DataType, right: DataType, expected: bool) {
        assert_eq!(left.is_comparable_with(right), expected);
        assert_eq!(right.is_comparable_with(left), expected);
    }

    #[test]
    fn parses_type_aliases() {
        assert_eq!(DataType::from_str("VARCHAR").ok(), Some(DataType::Text));
        assert_eq!(DataType::from_str("BIGINT").ok(), Some(DataType::Integer));
        assert!(DataType::from_str("BLOB").is_err());
    }
}
