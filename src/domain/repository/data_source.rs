use thiserror::Error;

use crate::domain::entity::{DataType, Row, Table};

/// ストレージエラー
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StorageError {
    #[error("Table {0} not found")]
    TableNotFound(String),

    #[error("Table {0} already exists")]
    TableAlreadyExists(String),

    #[error("Column {0} not found in table {1}")]
    ColumnNotFound(String, String),

    #[error("Data type mismatch for column {column}: expected {expected}, got {actual}")]
    TypeMismatch {
        column: String,
        expected: DataType,
        actual: DataType,
    },

    #[error("Not null constraint violation for column {0}")]
    NotNullViolation(String),

    #[error("Unique constraint violation for column {0}")]
    UniqueViolation(String),

    #[error("Primary key constraint violation in table {0}")]
    PrimaryKeyViolation(String),

    #[error("Row {id} not found in table {table}")]
    RowNotFound { table: String, id: i64 },

    #[error("Foreign key constraint violation: {column} = {id} has no row in {table}")]
    ForeignKeyViolation { column: String, table: String, id: i64 },

    #[error("Internal storage error: {0}")]
    Internal(String),
}

/// クエリ実行エンジンが読む表形式のデータ源
///
/// 実行エンジンはこのトレイト越しにしかデータを見ないため、
/// テストではモックに差し替えられる。
#[cfg_attr(test, mockall::automock)]
pub trait DataSource {
    /// テーブルのスキーマを取得する
    fn table(&self, table_name: &str) -> Result<Table, StorageError>;

    /// テーブルの全行を挿入順に読む
    fn scan(&self, table_name: &str) -> Result<Vec<Row>, StorageError>;
}
