use strum::Display;

/// エンティティ間の関連の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum RelationKind {
    /// 多対一（外部キーを持つ側）
    #[strum(serialize = "many-to-one")]
    ManyToOne,

    /// 一対多（外部キーは相手側にある。参照専用）
    #[strum(serialize = "one-to-many")]
    OneToMany,
}

/// エンティティの関連フィールドのメタデータ
///
/// `join_column` は常に「多」側のテーブルにある外部キー列を指す。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationMeta {
    /// 関連フィールド名（例: `team`）
    pub field: &'static str,

    pub kind: RelationKind,

    /// 関連先のエンティティ名（例: `Team`）
    pub target_entity: &'static str,

    /// 関連先のテーブル名（例: `team`）
    pub target_table: &'static str,

    /// 外部キー列名（例: `team_id`）
    pub join_column: &'static str,
}

impl RelationMeta {
    pub const fn many_to_one(
        field: &'static str,
        target_entity: &'static str,
        target_table: &'static str,
        join_column: &'static str,
    ) -> Self {
        Self { field, kind: RelationKind::ManyToOne, target_entity, target_table, join_column }
    }

    pub const fn one_to_many(
        field: &'static str,
        target_entity: &'static str,
        target_table: &'static str,
        mapped_by_column: &'static str,
    ) -> Self {
        Self {
            field,
            kind: RelationKind::OneToMany,
            target_entity,
            target_table,
            join_column: mapped_by_column,
        }
    }
}
