use crate::domain::entity::Table;
use crate::domain::model::entity::Entity;
use crate::domain::model::relation::RelationMeta;
use crate::domain::model::{Hello, Member, Team};

/// 登録されたエンティティのスキーマ情報
#[derive(Debug, Clone, PartialEq)]
pub struct EntityDescriptor {
    pub name: &'static str,
    pub table: Table,
    pub relations: &'static [RelationMeta],
}

impl EntityDescriptor {
    pub fn relation(&self, field: &str) -> Option<&RelationMeta> {
        self.relations.iter().find(|meta| meta.field == field)
    }
}

/// エンティティ名からスキーマを引くための目録
///
/// テキストクエリの名前解決と、セッション開始時のテーブル作成に使われる。
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entities: Vec<EntityDescriptor>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// `Hello` / `Team` / `Member` を登録した目録
    pub fn standard() -> Self {
        Self::new()
            .register::<Hello>()
            .register::<Team>()
            .register::<Member>()
    }

    pub fn register<E: Entity>(mut self) -> Self {
        self.entities.retain(|entity| entity.name != E::ENTITY_NAME);
        self.entities.push(EntityDescriptor {
            name: E::ENTITY_NAME,
            table: E::table(),
            relations: E::relations(),
        });
        self
    }

    pub fn entity(&self, name: &str) -> Option<&EntityDescriptor> {
        self.entities.iter().find(|entity| entity.name == name)
    }

    pub fn by_table(&self, table: &str) -> Option<&EntityDescriptor> {
        self.entities.iter().find(|entity| entity.table.name == table)
    }

    pub fn entities(&self) -> &[EntityDescriptor] {
        &self.entities
    }
}
