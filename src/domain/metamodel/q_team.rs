use crate::domain::metamodel::path::{EntityPath, RelationPath};
use crate::domain::metamodel::q_member::QMember;
use crate::domain::model::{Entity, RelationMeta, Team};
use crate::domain::query::{Expr, Expression, Selectable};

/// `Team` の型付きパス
#[derive(Debug, Clone)]
pub struct QTeam {
    alias: String,
    pub id: Expr<i64>,
    pub name: Expr<String>,
    /// 一対多の逆参照 (`team.members`)
    pub members: RelationPath<QMember>,
}

impl QTeam {
    pub fn new(alias: impl Into<String>) -> Self {
        let alias = alias.into();
        let members = Team::relation("members")
            .unwrap_or(RelationMeta::one_to_many("members", "Member", "member", "team_id"));
        Self {
            id: Expr::column(&alias, "id"),
            name: Expr::column(&alias, "name"),
            members: RelationPath::new(alias.clone(), members),
            alias,
        }
    }

    /// 既定のエイリアス `team`
    pub fn team() -> Self {
        Self::new("team")
    }
}

impl EntityPath for QTeam {
    type Entity = Team;

    fn alias(&self) -> &str {
        &self.alias
    }

    fn column_paths(&self) -> Vec<Expression> {
        vec![self.id.select_expression(), self.name.select_expression()]
    }

    fn relation_paths(&self) -> Vec<RelationMeta> {
        vec![*self.members.meta()]
    }
}
