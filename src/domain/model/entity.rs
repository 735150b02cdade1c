use std::fmt;

use crate::domain::entity::{Row, Table};
use crate::domain::model::relation::RelationMeta;
use crate::domain::query::{EntityRow, ExecutionError, ValueType};

/// 永続化コンテキスト（1つの作業単位で管理されているエンティティの集合）
///
/// クエリで読み込まれた行は `register` で管理対象になる。
/// 遅延参照は、参照先がここで管理されていればロード済みとして解決される。
pub trait PersistenceContext {
    fn register(&self, table: &str, row: &Row);

    fn managed(&self, table: &str, id: i64) -> Option<Row>;
}

/// どのエンティティも管理していない文脈
#[derive(Debug, Default, Clone, Copy)]
pub struct Detached;

impl PersistenceContext for Detached {
    fn register(&self, _table: &str, _row: &Row) {}

    fn managed(&self, _table: &str, _id: i64) -> Option<Row> {
        None
    }
}

/// テーブルに対応付けられた型
pub trait Entity: Clone + fmt::Debug + 'static {
    const ENTITY_NAME: &'static str;
    const TABLE_NAME: &'static str;

    /// テーブルのスキーマ。主キーは常に `id`。
    fn table() -> Table;

    fn relations() -> &'static [RelationMeta] {
        &[]
    }

    fn relation(field: &str) -> Option<RelationMeta> {
        Self::relations().iter().find(|meta| meta.field == field).copied()
    }

    /// 永続化前は `None`
    fn id(&self) -> Option<i64>;

    fn set_id(&mut self, id: i64);

    /// 保存用の行に変換する。永続化されていない関連先を参照していればエラー。
    fn to_row(&self) -> Result<Row, ExecutionError>;

    /// 結果行からエンティティを組み立て、永続化コンテキストに登録する
    fn hydrate(entity: &EntityRow, context: &dyn PersistenceContext) -> Result<Self, ExecutionError>;
}

/// 行から列の値を読む。列がないかNULLなら `None`。
pub(crate) fn read<T: ValueType>(row: &Row, column: &str) -> Result<Option<T>, ExecutionError> {
    match row.get(column) {
        Some(value) => Ok(T::from_value(value)?),
        None => Ok(None),
    }
}

pub(crate) fn read_required<T: ValueType>(row: &Row, column: &str) -> Result<T, ExecutionError> {
    read(row, column)?.ok_or_else(|| {
        ExecutionError::Projection(format!("column '{}' must not be null", column))
    })
}
