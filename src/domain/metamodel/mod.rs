pub mod path;
pub mod q_hello;
pub mod q_member;
pub mod q_team;

pub use path::{EntityPath, RelationPath};
pub use q_hello::QHello;
pub use q_member::QMember;
pub use q_team::QTeam;

use crate::domain::model::PersistenceContext;
use crate::domain::query::{BuildError, Cell, EntityProjection, ExecutionError, Expression, Projection, Selectable};

// エンティティパスはそのまま選択句に置け、エンティティとして射影される
macro_rules! impl_entity_projection {
    ($($path:ty),+ $(,)?) => {
        $(
            impl Selectable for $path {
                fn select_expression(&self) -> Expression {
                    self.entity_expression()
                }
            }

            impl Projection for $path {
                type Output = <$path as EntityPath>::Entity;

                fn expressions(&self) -> Vec<Expression> {
                    vec![self.entity_expression()]
                }

                fn project(
                    &self,
                    cells: Vec<Cell>,
                    context: &dyn PersistenceContext,
                ) -> Result<Self::Output, ExecutionError> {
                    EntityProjection::<Self::Output>::new(self.alias()).project(cells, context)
                }
            }
        )+
    };
}

impl_entity_projection!(QHello, QTeam, QMember);

/// 標準のパスをすべてスキーマと照合する
pub fn validate_standard_paths() -> Result<(), BuildError> {
    QHello::hello().validate_schema()?;
    QTeam::team().validate_schema()?;
    QMember::member().validate_schema()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::query::Expr;

    /// 存在しない列を公開してしまったパス
    struct BrokenMember {
        nickname: Expr<String>,
    }

    impl EntityPath for BrokenMember {
        type Entity = crate::domain::model::Member;

        fn alias(&self) -> &str {
            "member"
        }

        fn column_paths(&self) -> Vec<Expression> {
            vec![self.nickname.select_expression()]
        }
    }

    #[test]
    fn standard_paths_match_the_schema() {
        assert_eq!(validate_standard_paths(), Ok(()));
    }

    #[test]
    fn unknown_path_is_a_schema_mismatch() {
        let broken = BrokenMember {
            nickname: Expr::column("member", "nickname"),
        };
        assert_eq!(
            broken.validate_schema(),
            Err(BuildError::SchemaMismatch {
                table: "member".to_string(),
                path: "member.nickname".to_string(),
            })
        );
    }

    #[test]
    fn mistyped_path_is_a_schema_mismatch() {
        struct MistypedMember {
            age: Expr<String>,
        }
        impl EntityPath for MistypedMember {
            type Entity = crate::domain::model::Member;
            fn alias(&self) -> &str {
                "member"
            }
            fn column_paths(&self) -> Vec<Expression> {
                vec![self.age.select_expression()]
            }
        }
        let mistyped = MistypedMember {
            age: Expr::column("member", "age"),
        };
        assert!(mistyped.validate_schema().is_err());
    }

    #[test]
    fn entity_path_selects_the_entity() {
        let member = QMember::new("m");
        assert_eq!(member.select_expression().to_string(), "m");
        assert_eq!(member.count().to_string(), "count(m.id)");
        assert_eq!(member.team.join_relation().meta.join_column, "team_id");
        assert_eq!(QTeam::team().members.meta().target_entity, "Member");
    }
}
