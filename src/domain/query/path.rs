use chrono::{DateTime, Utc};
use std::fmt;
use std::marker::PhantomData;

use crate::domain::entity::{DataType, Value};
use crate::domain::query::case::CaseWhen;
use crate::domain::query::expression::{AggregateFunction, ColumnRef, Expression};
use crate::domain::query::order::{Order, OrderSpecifier};
use crate::domain::query::predicate::{ComparisonOperator, Predicate};
use crate::domain::query::subquery::SubQuery;
use crate::domain::query::value_type::{Numeric, Ordered, ValueType};

/// 型付きのクエリ式
///
/// `T` は式の結果型で、比較の相手や射影の出力型をコンパイル時に決める。
/// 中身は型情報を持たない [`Expression`]。すべての操作は `&self` を取り、
/// 新しい式や条件を返すだけで副作用はない。
pub struct Expr<T> {
    expression: Expression,
    marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Expr<T> {
    fn clone(&self) -> Self {
        Self::new(self.expression.clone())
    }
}

impl<T> fmt::Debug for Expr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Expr").field(&self.expression).finish()
    }
}

impl<T> fmt::Display for Expr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expression)
    }
}

/// 比較演算の右辺になれる値
///
/// リテラル、同じ型の式、スカラーサブクエリが該当する。
pub trait IntoOperand<T> {
    fn into_operand(self) -> Expression;
}

impl<T> IntoOperand<T> for Expr<T> {
    fn into_operand(self) -> Expression {
        self.expression
    }
}

impl<T> IntoOperand<T> for &Expr<T> {
    fn into_operand(self) -> Expression {
        self.expression.clone()
    }
}

macro_rules! impl_literal_operand {
    ($target:ty => $($source:ty),+) => {
        $(
            impl IntoOperand<$target> for $source {
                fn into_operand(self) -> Expression {
                    Expression::Literal(Value::from(self))
                }
            }
        )+
    };
}

impl_literal_operand!(i32 => i32);
impl_literal_operand!(i64 => i64);
impl_literal_operand!(f64 => f64);
impl_literal_operand!(bool => bool);
impl_literal_operand!(String => String, &str);
impl_literal_operand!(DateTime<Utc> => DateTime<Utc>);

impl IntoOperand<String> for &String {
    fn into_operand(self) -> Expression {
        Expression::Literal(Value::Text(self.clone()))
    }
}

impl<T> Expr<T> {
    pub fn new(expression: Expression) -> Self {
        Self {
            expression,
            marker: PhantomData,
        }
    }

    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    pub fn into_expression(self) -> Expression {
        self.expression
    }

    fn derive<U>(&self, expression: Expression) -> Expr<U> {
        Expr::new(expression)
    }

    fn boxed(&self) -> Box<Expression> {
        Box::new(self.expression.clone())
    }

    fn compare(&self, op: ComparisonOperator, rhs: Expression) -> Predicate {
        Predicate::Compare {
            op,
            left: self.expression.clone(),
            right: rhs,
        }
    }

    pub fn eq(&self, rhs: impl IntoOperand<T>) -> Predicate {
        self.compare(ComparisonOperator::Eq, rhs.into_operand())
    }

    pub fn ne(&self, rhs: impl IntoOperand<T>) -> Predicate {
        self.compare(ComparisonOperator::Ne, rhs.into_operand())
    }

    pub fn is_in<I>(&self, values: I) -> Predicate
    where
        I: IntoIterator,
        I::Item: IntoOperand<T>,
    {
        Predicate::In {
            expr: self.expression.clone(),
            list: values.into_iter().map(IntoOperand::into_operand).collect(),
            negated: false,
        }
    }

    pub fn not_in<I>(&self, values: I) -> Predicate
    where
        I: IntoIterator,
        I::Item: IntoOperand<T>,
    {
        match self.is_in(values) {
            Predicate::In { expr, list, .. } => Predicate::In { expr, list, negated: true },
            other => other.not(),
        }
    }

    /// 複数行を返すサブクエリとの IN
    pub fn is_in_subquery(&self, subquery: SubQuery<T>) -> Predicate {
        Predicate::InSubquery {
            expr: self.expression.clone(),
            subquery: Box::new(subquery.into_descriptor()),
            negated: false,
        }
    }

    pub fn not_in_subquery(&self, subquery: SubQuery<T>) -> Predicate {
        Predicate::InSubquery {
            expr: self.expression.clone(),
            subquery: Box::new(subquery.into_descriptor()),
            negated: true,
        }
    }

    pub fn is_null(&self) -> Predicate {
        Predicate::IsNull {
            expr: self.expression.clone(),
            negated: false,
        }
    }

    pub fn is_not_null(&self) -> Predicate {
        Predicate::IsNull {
            expr: self.expression.clone(),
            negated: true,
        }
    }

    pub fn count(&self) -> Expr<i64> {
        self.derive(Expression::Aggregate(AggregateFunction::Count, self.boxed()))
    }

    pub fn count_distinct(&self) -> Expr<i64> {
        self.derive(Expression::Aggregate(AggregateFunction::CountDistinct, self.boxed()))
    }

    /// 文字列へのキャスト (`stringValue()`)
    pub fn string_value(&self) -> Expr<String> {
        self.derive(Expression::Cast(self.boxed(), DataType::Text))
    }

    /// 別名を付ける。DTO射影でプロパティ名と一致させるときに使う。
    pub fn as_(&self, alias: impl Into<String>) -> Expr<T> {
        let inner = self.expression.unaliased().clone();
        self.derive(Expression::Alias(Box::new(inner), alias.into()))
    }

    pub fn asc(&self) -> OrderSpecifier {
        OrderSpecifier::new(self.expression.clone(), Order::Asc)
    }

    pub fn desc(&self) -> OrderSpecifier {
        OrderSpecifier::new(self.expression.clone(), Order::Desc)
    }

    /// 単純CASE式を始める (`member.age.when(10).then("열살")`)
    pub fn when<R>(&self, value: impl IntoOperand<T>) -> CaseWhen<T, R> {
        CaseWhen::simple(self.expression.clone(), value.into_operand())
    }
}

impl<T: ValueType> Expr<T> {
    /// エイリアス付きエンティティの列を指す式
    pub fn column(alias: impl Into<String>, column: impl Into<String>) -> Self {
        Self::new(Expression::Column(ColumnRef::new(alias, column, T::DATA_TYPE)))
    }
}

impl<T: Ordered> Expr<T> {
    pub fn gt(&self, rhs: impl IntoOperand<T>) -> Predicate {
        self.compare(ComparisonOperator::Gt, rhs.into_operand())
    }

    pub fn goe(&self, rhs: impl IntoOperand<T>) -> Predicate {
        self.compare(ComparisonOperator::Goe, rhs.into_operand())
    }

    pub fn lt(&self, rhs: impl IntoOperand<T>) -> Predicate {
        self.compare(ComparisonOperator::Lt, rhs.into_operand())
    }

    pub fn loe(&self, rhs: impl IntoOperand<T>) -> Predicate {
        self.compare(ComparisonOperator::Loe, rhs.into_operand())
    }

    /// 両端を含む範囲
    pub fn between(&self, low: impl IntoOperand<T>, high: impl IntoOperand<T>) -> Predicate {
        Predicate::Between {
            expr: self.expression.clone(),
            low: low.into_operand(),
            high: high.into_operand(),
            negated: false,
        }
    }

    pub fn not_between(&self, low: impl IntoOperand<T>, high: impl IntoOperand<T>) -> Predicate {
        Predicate::Between {
            expr: self.expression.clone(),
            low: low.into_operand(),
            high: high.into_operand(),
            negated: true,
        }
    }

    pub fn max(&self) -> Expr<T> {
        self.derive(Expression::Aggregate(AggregateFunction::Max, self.boxed()))
    }

    pub fn min(&self) -> Expr<T> {
        self.derive(Expression::Aggregate(AggregateFunction::Min, self.boxed()))
    }
}

impl<T: Numeric> Expr<T> {
    pub fn sum(&self) -> Expr<T> {
        self.derive(Expression::Aggregate(AggregateFunction::Sum, self.boxed()))
    }

    pub fn avg(&self) -> Expr<f64> {
        self.derive(Expression::Aggregate(AggregateFunction::Avg, self.boxed()))
    }

    /// 実数の式として扱う（`avg` のような `f64` の式との比較用）
    pub fn as_f64(&self) -> Expr<f64> {
        self.derive(self.expression.clone())
    }
}

impl Expr<String> {
    /// `%` は任意の文字列、`_` は任意の1文字
    pub fn like(&self, pattern: impl IntoOperand<String>) -> Predicate {
        Predicate::Like {
            expr: self.expression.clone(),
            pattern: pattern.into_operand(),
            negated: false,
        }
    }

    pub fn contains(&self, text: &str) -> Predicate {
        self.like(format!("%{}%", text))
    }

    pub fn starts_with(&self, text: &str) -> Predicate {
        self.like(format!("{}%", text))
    }

    pub fn concat(&self, rhs: impl IntoOperand<String>) -> Expr<String> {
        self.derive(Expression::Concat(self.boxed(), Box::new(rhs.into_operand())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn age() -> Expr<i32> {
        Expr::column("member", "age")
    }

    fn username() -> Expr<String> {
        Expr::column("member", "username")
    }

    #[test]
    fn builds_comparisons() {
        assert_eq!(age().goe(30).to_string(), "member.age >= 30");
        assert_eq!(username().eq("member1").to_string(), "member.username = 'member1'");
        assert_eq!(age().between(0, 20).to_string(), "member.age between 0 and 20");
        assert_eq!(age().not_in([10, 20]).to_string(), "member.age not in (10, 20)");
    }

    #[test]
    fn concat_with_string_value() {
        let expr = username().concat("_").concat(age().string_value());
        assert_eq!(expr.to_string(), "concat(concat(member.username, '_'), str(member.age))");
        assert_eq!(expr.expression().data_type(), Some(DataType::Text));
    }

    #[test]
    fn alias_replaces_previous_alias() {
        let aliased = username().as_("name").as_("nickname");
        assert_eq!(aliased.expression().name(), Some("nickname"));
        assert_eq!(aliased.expression().unaliased(), username().expression());
    }

    #[test]
    fn contains_builds_like_pattern() {
        assert_eq!(username().contains("ber").to_string(), "member.username like '%ber%'");
    }
}
