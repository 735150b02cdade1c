use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::entity::{Column, DataType, Row, Table};
use crate::domain::model::entity::{read, Entity, PersistenceContext};
use crate::domain::model::relation::RelationMeta;
use crate::domain::query::{EntityRow, ExecutionError};

static TEAM_RELATIONS: [RelationMeta; 1] = [RelationMeta::one_to_many("members", "Member", "member", "team_id")];

/// チーム
///
/// 所属する会員の一覧は保持しない。`members` 関連は参照専用で、
/// `Session::members_of` で必要なときに問い合わせる。
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Team {
    pub id: Option<i64>,
    pub name: Option<String>,
}

impl Team {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: Some(name.into()),
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Team(id={}, name={})",
            self.id.map_or_else(|| "null".to_string(), |id| id.to_string()),
            self.name.as_deref().unwrap_or("null")
        )
    }
}

impl Entity for Team {
    const ENTITY_NAME: &'static str = "Team";
    const TABLE_NAME: &'static str = "team";

    fn table() -> Table {
        Table {
            name: Self::TABLE_NAME.to_string(),
            columns: vec![
                Column::new("id", DataType::Integer).primary_key(),
                Column::new("name", DataType::Text),
            ],
        }
    }

    fn relations() -> &'static [RelationMeta] {
        &TEAM_RELATIONS
    }

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn to_row(&self) -> Result<Row, ExecutionError> {
        Ok(Row::new()
            .with("id", self.id)
            .with("name", self.name.clone()))
    }

    fn hydrate(entity: &EntityRow, context: &dyn PersistenceContext) -> Result<Self, ExecutionError> {
        context.register(Self::TABLE_NAME, &entity.row);
        Ok(Self {
            id: read(&entity.row, "id")?,
            name: read(&entity.row, "name")?,
        })
    }
}
