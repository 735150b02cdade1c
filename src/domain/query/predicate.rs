use std::cmp::Ordering;
use std::fmt;

use itertools::Itertools;
use strum::Display;

use crate::domain::query::descriptor::QueryDescriptor;
use crate::domain::query::expression::Expression;

/// 比較演算子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ComparisonOperator {
    #[strum(serialize = "=")]
    Eq,
    #[strum(serialize = "<>")]
    Ne,
    #[strum(serialize = ">")]
    Gt,
    #[strum(serialize = ">=")]
    Goe,
    #[strum(serialize = "<")]
    Lt,
    #[strum(serialize = "<=")]
    Loe,
}

impl ComparisonOperator {
    /// 比較結果の順序がこの演算子を満たすか
    pub fn matches(self, ordering: Ordering) -> bool {
        match self {
            ComparisonOperator::Eq => ordering == Ordering::Equal,
            ComparisonOperator::Ne => ordering != Ordering::Equal,
            ComparisonOperator::Gt => ordering == Ordering::Greater,
            ComparisonOperator::Goe => ordering != Ordering::Less,
            ComparisonOperator::Lt => ordering == Ordering::Less,
            ComparisonOperator::Loe => ordering != Ordering::Greater,
        }
    }
}

/// 真偽値を返す式の木
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Compare {
        op: ComparisonOperator,
        left: Expression,
        right: Expression,
    },
    Between {
        expr: Expression,
        low: Expression,
        high: Expression,
        negated: bool,
    },
    In {
        expr: Expression,
        list: Vec<Expression>,
        negated: bool,
    },
    InSubquery {
        expr: Expression,
        subquery: Box<QueryDescriptor>,
        negated: bool,
    },
    IsNull {
        expr: Expression,
        negated: bool,
    },
    Like {
        expr: Expression,
        pattern: Expression,
        negated: bool,
    },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    /// 論理積。既存のANDにはフラットに追加する。
    pub fn and(self, other: Predicate) -> Predicate {
        match (self, other) {
            (Predicate::And(mut left), Predicate::And(right)) => {
                left.extend(right);
                Predicate::And(left)
            }
            (Predicate::And(mut left), right) => {
                left.push(right);
                Predicate::And(left)
            }
            (left, right) => Predicate::And(vec![left, right]),
        }
    }

    /// 論理和。既存のORにはフラットに追加する。
    pub fn or(self, other: Predicate) -> Predicate {
        match (self, other) {
            (Predicate::Or(mut left), Predicate::Or(right)) => {
                left.extend(right);
                Predicate::Or(left)
            }
            (Predicate::Or(mut left), right) => {
                left.push(right);
                Predicate::Or(left)
            }
            (left, right) => Predicate::Or(vec![left, right]),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Predicate {
        match self {
            Predicate::Not(inner) => *inner,
            other => Predicate::Not(Box::new(other)),
        }
    }

    /// 条件の並びを引数順にANDで畳み込む。`None` は読み飛ばす。
    ///
    /// `where_` や `on` に複数の条件を渡したときの意味はこの関数と常に同じになる。
    /// 有効な条件が1つもなければ `None`。
    pub fn all<I>(predicates: I) -> Option<Predicate>
    where
        I: IntoIterator<Item = Option<Predicate>>,
    {
        predicates.into_iter().flatten().reduce(Predicate::and)
    }

    /// 条件の並びを引数順にORで畳み込む。`None` は読み飛ばす。
    pub fn any<I>(predicates: I) -> Option<Predicate>
    where
        I: IntoIterator<Item = Option<Predicate>>,
    {
        predicates.into_iter().flatten().reduce(Predicate::or)
    }

    pub(crate) fn contains_aggregate(&self) -> bool {
        match self {
            Predicate::Compare { left, right, .. } => {
                left.contains_aggregate() || right.contains_aggregate()
            }
            Predicate::Between { expr, low, high, .. } => {
                expr.contains_aggregate() || low.contains_aggregate() || high.contains_aggregate()
            }
            Predicate::In { expr, list, .. } => {
                expr.contains_aggregate() || list.iter().any(Expression::contains_aggregate)
            }
            Predicate::InSubquery { expr, .. }
            | Predicate::IsNull { expr, .. } => expr.contains_aggregate(),
            Predicate::Like { expr, pattern, .. } => {
                expr.contains_aggregate() || pattern.contains_aggregate()
            }
            Predicate::And(items) | Predicate::Or(items) => {
                items.iter().any(Predicate::contains_aggregate)
            }
            Predicate::Not(inner) => inner.contains_aggregate(),
        }
    }
}

fn not_keyword(negated: bool) -> &'static str {
    if negated {
        "not "
    } else {
        ""
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Compare { op, left, right } => write!(f, "{} {} {}", left, op, right),
            Predicate::Between { expr, low, high, negated } => {
                write!(f, "{} {}between {} and {}", expr, not_keyword(*negated), low, high)
            }
            Predicate::In { expr, list, negated } => {
                write!(f, "{} {}in ({})", expr, not_keyword(*negated), list.iter().join(", "))
            }
            Predicate::InSubquery { expr, subquery, negated } => {
                write!(f, "{} {}in ({})", expr, not_keyword(*negated), subquery)
            }
            Predicate::IsNull { expr, negated } => {
                write!(f, "{} is {}null", expr, not_keyword(*negated))
            }
            Predicate::Like { expr, pattern, negated } => {
                write!(f, "{} {}like {}", expr, not_keyword(*negated), pattern)
            }
            Predicate::And(items) => write!(f, "({})", items.iter().join(" and ")),
            Predicate::Or(items) => write!(f, "({})", items.iter().join(" or ")),
            Predicate::Not(inner) => write!(f, "not {}", inner),
        }
    }
}

/// `where_` / `on` / `having` に渡せる条件の並び
///
/// 単一の条件、`Option` の条件、配列や `Vec`、タプルを受け付ける。
/// 並びは常に引数順のANDとして扱われ、`None` は読み飛ばされる。
pub trait IntoPredicates {
    fn into_predicates(self) -> Vec<Predicate>;
}

impl IntoPredicates for Predicate {
    fn into_predicates(self) -> Vec<Predicate> {
        vec![self]
    }
}

impl IntoPredicates for Option<Predicate> {
    fn into_predicates(self) -> Vec<Predicate> {
        self.into_iter().collect()
    }
}

impl<P: Into<Option<Predicate>>> IntoPredicates for Vec<P> {
    fn into_predicates(self) -> Vec<Predicate> {
        self.into_iter().filter_map(Into::<Option<Predicate>>::into).collect()
    }
}

impl<P: Into<Option<Predicate>>, const N: usize> IntoPredicates for [P; N] {
    fn into_predicates(self) -> Vec<Predicate> {
        self.into_iter().filter_map(Into::<Option<Predicate>>::into).collect()
    }
}

macro_rules! impl_into_predicates_for_tuple {
    ($($name:ident),+) => {
        impl<$($name: Into<Option<Predicate>>),+> IntoPredicates for ($($name,)+) {
            #[allow(non_snake_case)]
            fn into_predicates(self) -> Vec<Predicate> {
                let ($($name,)+) = self;
                vec![$(Into::<Option<Predicate>>::into($name)),+]
                    .into_iter()
                    .flatten()
                    .collect()
            }
        }
    };
}

impl_into_predicates_for_tuple!(A, B);
impl_into_predicates_for_tuple!(A, B, C);
impl_into_predicates_for_tuple!(A, B, C, D);
impl_into_predicates_for_tuple!(A, B, C, D, E);
impl_into_predicates_for_tuple!(A, B, C, D, E, F);
