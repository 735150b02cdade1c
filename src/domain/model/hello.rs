use serde::{Deserialize, Serialize};

use crate::domain::entity::{Column, DataType, Row, Table};
use crate::domain::model::entity::{read, Entity, PersistenceContext};
use crate::domain::query::{EntityRow, ExecutionError};

/// 動作確認用の最小のエンティティ
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Hello {
    pub id: Option<i64>,
}

impl Hello {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Entity for Hello {
    const ENTITY_NAME: &'static str = "Hello";
    const TABLE_NAME: &'static str = "hello";

    fn table() -> Table {
        Table {
            name: Self::TABLE_NAME.to_string(),
            columns: vec![Column::new("id", DataType::Integer).primary_key()],
        }
    }

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn to_row(&self) -> Result<Row, ExecutionError> {
        Ok(Row::new().with("id", self.id))
    }

    fn hydrate(entity: &EntityRow, context: &dyn PersistenceContext) -> Result<Self, ExecutionError> {
        context.register(Self::TABLE_NAME, &entity.row);
        Ok(Self {
            id: read(&entity.row, "id")?,
        })
    }
}
