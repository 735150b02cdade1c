use crate::domain::metamodel::path::EntityPath;
use crate::domain::model::Hello;
use crate::domain::query::{Expr, Expression, Selectable};

/// `Hello` の型付きパス
#[derive(Debug, Clone)]
pub struct QHello {
    alias: String,
    pub id: Expr<i64>,
}

impl QHello {
    pub fn new(alias: impl Into<String>) -> Self {
        let alias = alias.into();
        Self {
            id: Expr::column(&alias, "id"),
            alias,
        }
    }

    /// 既定のエイリアス `hello`
    pub fn hello() -> Self {
        Self::new("hello")
    }
}

impl EntityPath for QHello {
    type Entity = Hello;

    fn alias(&self) -> &str {
        &self.alias
    }

    fn column_paths(&self) -> Vec<Expression> {
        vec![self.id.select_expression()]
    }
}
