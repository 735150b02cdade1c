use std::marker::PhantomData;

use crate::domain::entity::Value;
use crate::domain::query::expression::{CaseBranch, Expression};
use crate::domain::query::path::{Expr, IntoOperand};
use crate::domain::query::predicate::{ComparisonOperator, Predicate};

/// CASE の `when` に渡せるキー
///
/// 検索CASE (`CaseBuilder`) では条件そのもの、単純CASE (`expr.when(..)`) では
/// 対象の式と比較される値。
pub trait CaseKey<K> {
    fn into_condition(self, subject: Option<&Expression>) -> Predicate;
}

impl CaseKey<Predicate> for Predicate {
    fn into_condition(self, _subject: Option<&Expression>) -> Predicate {
        self
    }
}

impl<T, V: IntoOperand<T>> CaseKey<T> for V {
    fn into_condition(self, subject: Option<&Expression>) -> Predicate {
        Predicate::Compare {
            op: ComparisonOperator::Eq,
            left: subject.cloned().unwrap_or(Expression::Literal(Value::Null)),
            right: self.into_operand(),
        }
    }
}

/// 検索CASE式のビルダー
///
/// ```
/// use rustydsl::domain::metamodel::QMember;
/// use rustydsl::domain::query::CaseBuilder;
///
/// let member = QMember::member();
/// let label = CaseBuilder::new()
///     .when(member.age.between(0, 20)).then("0~20")
///     .when(member.age.between(21, 30)).then("21~30")
///     .otherwise("etc");
/// assert!(label.to_string().starts_with("case when"));
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct CaseBuilder;

impl CaseBuilder {
    pub fn new() -> Self {
        Self
    }

    pub fn when<R>(self, condition: Predicate) -> CaseWhen<Predicate, R> {
        CaseWhen {
            subject: None,
            branches: Vec::new(),
            condition,
            marker: PhantomData,
        }
    }
}

/// `when` の直後。`then` で分岐の値を与える。
#[derive(Debug)]
pub struct CaseWhen<K, R> {
    subject: Option<Expression>,
    branches: Vec<CaseBranch>,
    condition: Predicate,
    marker: PhantomData<fn() -> (K, R)>,
}

impl<K, R> CaseWhen<K, R> {
    pub(crate) fn simple(subject: Expression, value: Expression) -> Self {
        let condition = Predicate::Compare {
            op: ComparisonOperator::Eq,
            left: subject.clone(),
            right: value,
        };
        Self {
            subject: Some(subject),
            branches: Vec::new(),
            condition,
            marker: PhantomData,
        }
    }

    pub fn then(self, value: impl IntoOperand<R>) -> CaseThen<K, R> {
        let mut branches = self.branches;
        branches.push(CaseBranch {
            when: self.condition,
            then: value.into_operand(),
        });
        CaseThen {
            subject: self.subject,
            branches,
            marker: PhantomData,
        }
    }
}

/// 分岐を1つ以上持つCASE。さらに `when` を続けるか `otherwise` で閉じる。
#[derive(Debug)]
pub struct CaseThen<K, R> {
    subject: Option<Expression>,
    branches: Vec<CaseBranch>,
    marker: PhantomData<fn() -> (K, R)>,
}

impl<K, R> CaseThen<K, R> {
    pub fn when(self, key: impl CaseKey<K>) -> CaseWhen<K, R> {
        let condition = key.into_condition(self.subject.as_ref());
        CaseWhen {
            subject: self.subject,
            branches: self.branches,
            condition,
            marker: PhantomData,
        }
    }

    /// 分岐は宣言順に評価され、最初に真になったものが採用される
    pub fn otherwise(self, value: impl IntoOperand<R>) -> Expr<R> {
        Expr::new(Expression::Case {
            branches: self.branches,
            otherwise: Box::new(value.into_operand()),
        })
    }
}
