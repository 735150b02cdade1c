use std::fmt;
use typed_builder::TypedBuilder;

use crate::domain::entity::{Column, DataType, Row, Table};
use crate::domain::model::entity::{read, read_required, Entity, PersistenceContext};
use crate::domain::model::lazy::Lazy;
use crate::domain::model::relation::RelationMeta;
use crate::domain::model::team::Team;
use crate::domain::query::{EntityRow, ExecutionError};

static MEMBER_RELATIONS: [RelationMeta; 1] = [RelationMeta::many_to_one("team", "Team", "team", "team_id")];

/// 会員
///
/// `team` は多対一の関連で、外部キー `team_id` を持つ。
#[derive(Debug, Clone, PartialEq, TypedBuilder)]
pub struct Member {
    #[builder(default)]
    pub id: Option<i64>,

    #[builder(default, setter(strip_option, into))]
    pub username: Option<String>,

    #[builder(default)]
    pub age: i32,

    #[builder(default, setter(transform = |team: &Team| Some(Lazy::loaded(team.clone()))))]
    pub team: Option<Lazy<Team>>,
}

impl Member {
    pub fn new(username: impl Into<String>, age: i32, team: &Team) -> Self {
        Self {
            id: None,
            username: Some(username.into()),
            age,
            team: Some(Lazy::loaded(team.clone())),
        }
    }

    /// チームに所属しない会員
    pub fn without_team(username: Option<&str>, age: i32) -> Self {
        Self {
            id: None,
            username: username.map(str::to_string),
            age,
            team: None,
        }
    }

    pub fn change_team(&mut self, team: &Team) {
        self.team = Some(Lazy::loaded(team.clone()));
    }

    /// ロード済みのチーム。未ロードまたは未所属なら `None`。
    pub fn team(&self) -> Option<&Team> {
        self.team.as_ref().and_then(Lazy::get)
    }
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Member(id={}, username={}, age={})",
            self.id.map_or_else(|| "null".to_string(), |id| id.to_string()),
            self.username.as_deref().unwrap_or("null"),
            self.age
        )
    }
}

impl Entity for Member {
    const ENTITY_NAME: &'static str = "Member";
    const TABLE_NAME: &'static str = "member";

    fn table() -> Table {
        Table {
            name: Self::TABLE_NAME.to_string(),
            columns: vec![
                Column::new("id", DataType::Integer).primary_key(),
                Column::new("username", DataType::Text),
                Column::new("age", DataType::Integer).not_null(),
                Column::new("team_id", DataType::Integer).references(Team::TABLE_NAME),
            ],
        }
    }

    fn relations() -> &'static [RelationMeta] {
        &MEMBER_RELATIONS
    }

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn to_row(&self) -> Result<Row, ExecutionError> {
        let team_id = match &self.team {
            Some(team) => Some(team.id().ok_or(ExecutionError::TransientReference {
                entity: Self::ENTITY_NAME,
                target: Team::ENTITY_NAME,
            })?),
            None => None,
        };
        Ok(Row::new()
            .with("id", self.id)
            .with("username", self.username.clone())
            .with("age", self.age)
            .with("team_id", team_id))
    }

    fn hydrate(entity: &EntityRow, context: &dyn PersistenceContext) -> Result<Self, ExecutionError> {
        let row = &entity.row;
        context.register(Self::TABLE_NAME, row);

        let team = match read::<i64>(row, "team_id")? {
            None => None,
            Some(team_id) => {
                // フェッチジョインされた行、次に管理中の行の順に探す
                let loaded = match entity.fetched("team") {
                    Some(Some(team_row)) => Some(team_row.clone()),
                    _ => context.managed(Team::TABLE_NAME, team_id),
                };
                Some(match loaded {
                    Some(team_row) => {
                        Lazy::loaded(Team::hydrate(&EntityRow::new(Team::TABLE_NAME, team_row), context)?)
                    }
                    None => Lazy::Unloaded(team_id),
                })
            }
        };

        Ok(Self {
            id: read(row, "id")?,
            username: read(row, "username")?,
            age: read_required(row, "age")?,
            team,
        })
    }
}
