use std::fmt;
use std::marker::PhantomData;

use crate::domain::metamodel::{EntityPath, RelationPath};
use crate::domain::query::descriptor::{JoinType, QueryDescriptor};
use crate::domain::query::expression::Expression;
use crate::domain::query::path::{Expr, IntoOperand};
use crate::domain::query::predicate::IntoPredicates;
use crate::domain::query::projection::Selectable;

/// 別のクエリの中に埋め込まれるサブクエリ
///
/// 比較の右辺ではスカラー（1行1列）として、`is_in_subquery` では集合として使われる。
/// 外側のクエリのエイリアスを参照でき（相関サブクエリ）、自分のエイリアスは
/// 外側と重複してはならない。
pub struct SubQuery<T> {
    descriptor: QueryDescriptor,
    marker: PhantomData<fn() -> T>,
}

impl<T> fmt::Debug for SubQuery<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SubQuery").field(&self.descriptor).finish()
    }
}

impl<T> Clone for SubQuery<T> {
    fn clone(&self) -> Self {
        Self {
            descriptor: self.descriptor.clone(),
            marker: PhantomData,
        }
    }
}

impl<T> SubQuery<T> {
    pub(crate) fn new(projection: Expression) -> Self {
        let descriptor = QueryDescriptor {
            projection: vec![projection],
            ..QueryDescriptor::default()
        };
        Self {
            descriptor,
            marker: PhantomData,
        }
    }

    pub fn from(mut self, source: &impl EntityPath) -> Self {
        self.descriptor.add_source(source.source());
        self
    }

    pub fn join<E: EntityPath>(mut self, relation: &RelationPath<E>, target: &E) -> Self {
        self.descriptor
            .add_join(JoinType::Inner, target.source(), Some(relation.join_relation()));
        self
    }

    pub fn left_join<E: EntityPath>(mut self, relation: &RelationPath<E>, target: &E) -> Self {
        self.descriptor
            .add_join(JoinType::Left, target.source(), Some(relation.join_relation()));
        self
    }

    pub fn on(mut self, predicates: impl IntoPredicates) -> Self {
        self.descriptor.add_join_condition(predicates.into_predicates());
        self
    }

    pub fn where_(mut self, predicates: impl IntoPredicates) -> Self {
        self.descriptor.add_filter(predicates.into_predicates());
        self
    }

    pub fn group_by(mut self, item: impl Selectable) -> Self {
        self.descriptor.group_by.push(item.select_expression());
        self
    }

    pub fn having(mut self, predicates: impl IntoPredicates) -> Self {
        self.descriptor.add_having(predicates.into_predicates());
        self
    }

    pub fn descriptor(&self) -> &QueryDescriptor {
        &self.descriptor
    }

    pub fn into_descriptor(self) -> QueryDescriptor {
        self.descriptor
    }

    pub fn into_expr(self) -> Expr<T> {
        Expr::new(Expression::Subquery(Box::new(self.descriptor)))
    }

    /// 選択句でDTOのプロパティに対応させるための別名 (`ExpressionUtils.as`)
    pub fn as_(self, alias: impl Into<String>) -> Expr<T> {
        Expr::new(Expression::Alias(
            Box::new(Expression::Subquery(Box::new(self.descriptor))),
            alias.into(),
        ))
    }
}

impl<T> IntoOperand<T> for SubQuery<T> {
    fn into_operand(self) -> Expression {
        Expression::Subquery(Box::new(self.descriptor))
    }
}

impl<T> IntoOperand<T> for &SubQuery<T> {
    fn into_operand(self) -> Expression {
        Expression::Subquery(Box::new(self.descriptor.clone()))
    }
}

impl<T> From<SubQuery<T>> for Expr<T> {
    fn from(subquery: SubQuery<T>) -> Self {
        subquery.into_expr()
    }
}
