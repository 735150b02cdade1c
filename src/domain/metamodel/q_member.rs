use crate::domain::metamodel::path::{EntityPath, RelationPath};
use crate::domain::metamodel::q_team::QTeam;
use crate::domain::model::{Entity, Member, RelationMeta};
use crate::domain::query::{Expr, Expression, Selectable};

/// `Member` の型付きパス
///
/// ```
/// use rustydsl::domain::metamodel::QMember;
///
/// let member = QMember::member();
/// let condition = member.username.eq("member1").and(member.age.eq(10));
/// assert_eq!(condition.to_string(), "(member.username = 'member1' and member.age = 10)");
/// ```
#[derive(Debug, Clone)]
pub struct QMember {
    alias: String,
    pub id: Expr<i64>,
    pub username: Expr<String>,
    pub age: Expr<i32>,
    /// 多対一の関連 (`member.team`)
    pub team: RelationPath<QTeam>,
}

impl QMember {
    pub fn new(alias: impl Into<String>) -> Self {
        let alias = alias.into();
        let team = Member::relation("team")
            .unwrap_or(RelationMeta::many_to_one("team", "Team", "team", "team_id"));
        Self {
            id: Expr::column(&alias, "id"),
            username: Expr::column(&alias, "username"),
            age: Expr::column(&alias, "age"),
            team: RelationPath::new(alias.clone(), team),
            alias,
        }
    }

    /// 既定のエイリアス `member`
    pub fn member() -> Self {
        Self::new("member")
    }
}

impl EntityPath for QMember {
    type Entity = Member;

    fn alias(&self) -> &str {
        &self.alias
    }

    fn column_paths(&self) -> Vec<Expression> {
        vec![
            self.id.select_expression(),
            self.username.select_expression(),
            self.age.select_expression(),
        ]
    }

    fn relation_paths(&self) -> Vec<RelationMeta> {
        vec![*self.team.meta()]
    }
}
