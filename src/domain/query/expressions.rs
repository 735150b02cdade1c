//! `JPAExpressions` / `Expressions` に相当するファクトリ関数

use crate::domain::query::path::{Expr, IntoOperand};
use crate::domain::query::subquery::SubQuery;

/// サブクエリを始める
///
/// ```
/// use rustydsl::domain::metamodel::QMember;
/// use rustydsl::domain::query::expressions::select;
///
/// let member = QMember::member();
/// let member_sub = QMember::new("memberSub");
/// let oldest = member.age.eq(select(&member_sub.age.max()).from(&member_sub));
/// assert_eq!(
///     oldest.to_string(),
///     "member.age = (select max(memberSub.age) from Member memberSub)"
/// );
/// ```
pub fn select<T>(expr: &Expr<T>) -> SubQuery<T> {
    SubQuery::new(expr.expression().clone())
}

/// 定数式。行の値に関係なく常に同じ値を返す。
pub fn constant<T>(value: impl IntoOperand<T>) -> Expr<T> {
    Expr::new(value.into_operand())
}
