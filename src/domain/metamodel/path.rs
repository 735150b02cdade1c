use std::fmt;
use std::marker::PhantomData;

use crate::domain::model::{Entity, RelationMeta};
use crate::domain::query::{
    BuildError, EntityRef, Expr, Expression, JoinRelation, Source,
};

/// エイリアス付きのエンティティパス (`QMember` など)
///
/// 生成コードの代わりに手書きした型付きパスで、公開している列パスは
/// セッション開始時に `validate_schema` でエンティティのスキーマと照合される。
pub trait EntityPath {
    type Entity: Entity;

    fn alias(&self) -> &str;

    /// この型が公開している列パス
    fn column_paths(&self) -> Vec<Expression>;

    /// この型が公開している関連
    fn relation_paths(&self) -> Vec<RelationMeta> {
        Vec::new()
    }

    fn source(&self) -> Source {
        Source {
            entity: Self::Entity::ENTITY_NAME.to_string(),
            alias: self.alias().to_string(),
            table: Self::Entity::table(),
        }
    }

    /// エンティティ全体を表す式
    fn entity_expression(&self) -> Expression {
        Expression::Entity(EntityRef {
            alias: self.alias().to_string(),
            entity: Self::Entity::ENTITY_NAME.to_string(),
            table: Self::Entity::TABLE_NAME.to_string(),
        })
    }

    fn id_path(&self) -> Expr<i64> {
        Expr::column(self.alias(), "id")
    }

    /// `count(member)`。NULLの影響を受けないよう識別子の列を数える。
    fn count(&self) -> Expr<i64> {
        self.id_path().count()
    }

    /// 列パスと関連がエンティティのスキーマと一致するかを検証する
    fn validate_schema(&self) -> Result<(), BuildError> {
        let table = Self::Entity::table();
        for path in self.column_paths() {
            let matches = match &path {
                Expression::Column(column) => {
                    column.alias == self.alias()
                        && table
                            .get_column(&column.column)
                            .map_or(false, |c| c.data_type == column.data_type)
                }
                _ => false,
            };
            if !matches {
                return Err(BuildError::SchemaMismatch {
                    table: table.name.clone(),
                    path: path.to_string(),
                });
            }
        }
        for meta in self.relation_paths() {
            if Self::Entity::relation(meta.field) != Some(meta) {
                return Err(BuildError::SchemaMismatch {
                    table: table.name.clone(),
                    path: format!("{}.{}", self.alias(), meta.field),
                });
            }
        }
        Ok(())
    }
}

/// 関連のパス (`member.team`)。`T` は関連先のエンティティパス型。
pub struct RelationPath<T> {
    source_alias: String,
    meta: RelationMeta,
    marker: PhantomData<fn() -> T>,
}

impl<T> RelationPath<T> {
    pub fn new(source_alias: impl Into<String>, meta: RelationMeta) -> Self {
        Self {
            source_alias: source_alias.into(),
            meta,
            marker: PhantomData,
        }
    }

    pub fn meta(&self) -> &RelationMeta {
        &self.meta
    }

    pub fn source_alias(&self) -> &str {
        &self.source_alias
    }

    pub(crate) fn join_relation(&self) -> JoinRelation {
        JoinRelation {
            source_alias: self.source_alias.clone(),
            meta: self.meta,
        }
    }
}

impl<T> Clone for RelationPath<T> {
    fn clone(&self) -> Self {
        Self::new(self.source_alias.clone(), self.meta)
    }
}

impl<T> fmt::Debug for RelationPath<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RelationPath({}.{})", self.source_alias, self.meta.field)
    }
}
