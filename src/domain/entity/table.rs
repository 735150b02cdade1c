use crate::domain::entity::column::Column;
use crate::domain::entity::data_type::DataType;
use crate::domain::entity::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum TableError {
    #[error("Column '{0}' is declared twice")]
    DuplicateColumn(String),

    #[error("Table must have at least one column")]
    NoColumns,

    #[error("Table must have exactly one primary key column named 'id' of type Integer")]
    InvalidPrimaryKey,
}

/// エンティティに対応するテーブルのスキーマ
///
/// 主キーは常に整数の `id` 列。外部キーは `Constraint::ForeignKey` で参照先テーブルを持つ。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// 外部キー列と参照先テーブルの組
    pub fn foreign_keys(&self) -> impl Iterator<Item = (&Column, &str)> {
        self.columns
            .iter()
            .filter_map(|column| column.referenced_table().map(|table| (column, table)))
    }

    /// スキーマとして成り立つかを検査する
    pub fn validate(&self) -> Result<(), TableError> {
        if self.columns.is_empty() {
            return Err(TableError::NoColumns);
        }
        for (index, column) in self.columns.iter().enumerate() {
            if self.columns[..index].iter().any(|c| c.name == column.name) {
                return Err(TableError::DuplicateColumn(column.name.clone()));
            }
        }
        let mut primary_keys = self.columns.iter().filter(|c| c.is_primary_key());
        match (primary_keys.next(), primary_keys.next()) {
            (Some(pk), None) if pk.name == "id" && pk.data_type == DataType::Integer => Ok(()),
            _ => Err(TableError::InvalidPrimaryKey),
        }
    }
}

/// 1行のデータを表現する
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Row {
    /// カラム名と値のマッピング
    pub values: HashMap<String, Value>,
}

impl Row {
    /// 新しい空の行を作成する
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    /// 特定のカラムの値を取得する
    pub fn get(&self, column_name: &str) -> Option<&Value> {
        self.values.get(column_name)
    }

    /// 特定のカラムの値を設定する
    pub fn set(&mut self, column_name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(column_name.into(), value.into());
    }

    /// ビルダーパターンで値を設定する
    pub fn with(mut self, column_name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(column_name, value);
        self
    }

    /// `id` カラムの値（主キー）を取得する
    pub fn id(&self) -> Option<i64> {
        match self.get("id") {
            Some(Value::Integer(id)) => Some(*id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member_table() -> Table {
        Table {
            name: "member".to_string(),
            columns: vec![
                Column::new("id", DataType::Integer).primary_key(),
                Column::new("username", DataType::Text),
                Column::new("team_id", DataType::Integer).references("team"),
            ],
        }
    }

    #[test]
    fn valid_schema_exposes_foreign_keys() {
        let table = member_table();
        assert_eq!(table.validate(), Ok(()));
        let keys: Vec<_> = table.foreign_keys().map(|(c, t)| (c.name.as_str(), t)).collect();
        assert_eq!(keys, vec![("team_id", "team")]);
    }

    #[test]
    fn rejects_broken_schemas() {
        let mut duplicated = member_table();
        duplicated.columns.push(Column::new("username", DataType::Text));
        assert_eq!(duplicated.validate(), Err(TableError::DuplicateColumn("username".to_string())));

        let mut keyless = member_table();
        keyless.columns.remove(0);
        assert_eq!(keyless.validate(), Err(TableError::InvalidPrimaryKey));

        assert_eq!(Table::new("empty").validate(), Err(TableError::NoColumns));
    }

    #[test]
    fn row_id_reads_integer_key() {
        assert_eq!(Row::new().with("id", 7_i64).id(), Some(7));
        assert_eq!(Row::new().with("id", Value::Null).id(), None);
    }
}
