use std::fmt;

use itertools::Itertools;
use strum::Display;

use crate::domain::entity::{DataType, Value};
use crate::domain::query::descriptor::QueryDescriptor;
use crate::domain::query::predicate::Predicate;

/// エイリアス付きのエンティティ列への参照 (`member.username` など)
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRef {
    pub alias: String,
    pub column: String,
    pub data_type: DataType,
}

impl ColumnRef {
    pub fn new(alias: impl Into<String>, column: impl Into<String>, data_type: DataType) -> Self {
        Self {
            alias: alias.into(),
            column: column.into(),
            data_type,
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.alias, self.column)
    }
}

/// エンティティ全体の選択 (`select(member)`)
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRef {
    pub alias: String,
    pub entity: String,
    pub table: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum AggregateFunction {
    #[strum(serialize = "count")]
    Count,
    #[strum(serialize = "count distinct")]
    CountDistinct,
    #[strum(serialize = "sum")]
    Sum,
    #[strum(serialize = "avg")]
    Avg,
    #[strum(serialize = "max")]
    Max,
    #[strum(serialize = "min")]
    Min,
}

/// CASE式の1分岐。上から順に評価され、最初に真になった分岐が採用される。
#[derive(Debug, Clone, PartialEq)]
pub struct CaseBranch {
    pub when: Predicate,
    pub then: Expression,
}

/// 型情報を持たないクエリ式の木
///
/// 型付きの [`Expr`](crate::domain::query::path::Expr) はこの式を包んだもの。
/// タプルの値は式の構造的な同一性で引き当てられるため `PartialEq` を実装している。
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Column(ColumnRef),
    Entity(EntityRef),
    Literal(Value),
    /// テキストクエリの名前付きパラメータ (`:username`)。実行前に束縛が必要。
    Parameter(String),
    Concat(Box<Expression>, Box<Expression>),
    Cast(Box<Expression>, DataType),
    Aggregate(AggregateFunction, Box<Expression>),
    Case {
        branches: Vec<CaseBranch>,
        otherwise: Box<Expression>,
    },
    Subquery(Box<QueryDescriptor>),
    Alias(Box<Expression>, String),
}

impl Expression {
    /// 式の結果型。エンティティ全体や未束縛パラメータのように型が決まらない場合は `None`。
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Expression::Column(column) => Some(column.data_type),
            Expression::Entity(_) | Expression::Parameter(_) => None,
            Expression::Literal(value) => Some(value.data_type()),
            Expression::Concat(_, _) => Some(DataType::Text),
            Expression::Cast(_, target) => Some(*target),
            Expression::Aggregate(function, inner) => match function {
                AggregateFunction::Count | AggregateFunction::CountDistinct => Some(DataType::Integer),
                AggregateFunction::Avg => Some(DataType::Float),
                AggregateFunction::Sum | AggregateFunction::Max | AggregateFunction::Min => {
                    inner.data_type()
                }
            },
            Expression::Case { branches, otherwise } => branches
                .iter()
                .filter_map(|branch| branch.then.data_type())
                .find(|data_type| !data_type.is_null())
                .or_else(|| otherwise.data_type()),
            Expression::Subquery(query) => query.projection().first().and_then(Expression::data_type),
            Expression::Alias(inner, _) => inner.data_type(),
        }
    }

    /// DTO射影で使われるプロパティ名。列はそのフィールド名、別名はその別名。
    pub fn name(&self) -> Option<&str> {
        match self {
            Expression::Column(column) => Some(column.column.as_str()),
            Expression::Alias(_, alias) => Some(alias.as_str()),
            _ => None,
        }
    }

    /// 別名を取り除いた式
    pub fn unaliased(&self) -> &Expression {
        match self {
            Expression::Alias(inner, _) => inner.unaliased(),
            other => other,
        }
    }

    /// 集約関数を含むか（サブクエリの中は数えない）
    pub fn contains_aggregate(&self) -> bool {
        match self {
            Expression::Aggregate(_, _) => true,
            Expression::Concat(left, right) => left.contains_aggregate() || right.contains_aggregate(),
            Expression::Cast(inner, _) | Expression::Alias(inner, _) => inner.contains_aggregate(),
            Expression::Case { branches, otherwise } => {
                otherwise.contains_aggregate()
                    || branches.iter().any(|branch| {
                        branch.then.contains_aggregate() || branch.when.contains_aggregate()
                    })
            }
            Expression::Column(_)
            | Expression::Entity(_)
            | Expression::Literal(_)
            | Expression::Parameter(_)
            | Expression::Subquery(_) => false,
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Column(column) => write!(f, "{}", column),
            Expression::Entity(entity) => write!(f, "{}", entity.alias),
            Expression::Literal(value) => write!(f, "{}", value),
            Expression::Parameter(name) => write!(f, ":{}", name),
            Expression::Concat(left, right) => write!(f, "concat({}, {})", left, right),
            Expression::Cast(inner, DataType::Text) => write!(f, "str({})", inner),
            Expression::Cast(inner, target) => write!(f, "cast({} as {})", inner, target),
            Expression::Aggregate(AggregateFunction::CountDistinct, inner) => {
                write!(f, "count(distinct {})", inner)
            }
            Expression::Aggregate(function, inner) => write!(f, "{}({})", function, inner),
            Expression::Case { branches, otherwise } => write!(
                f,
                "case {} else {} end",
                branches
                    .iter()
                    .map(|branch| format!("when {} then {}", branch.when, branch.then))
                    .join(" "),
                otherwise
            ),
            Expression::Subquery(query) => write!(f, "({})", query),
            Expression::Alias(inner, alias) => write!(f, "{} as {}", inner, alias),
        }
    }
}
