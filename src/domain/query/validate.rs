//! 構築時検証
//!
//! 到達できない列、型の合わない比較、エイリアスの衝突などを実行前に検出する。

use crate::domain::entity::DataType;
use crate::domain::query::descriptor::{QueryDescriptor, Source};
use crate::domain::query::error::BuildError;
use crate::domain::query::expression::{AggregateFunction, Expression};
use crate::domain::query::predicate::Predicate;

/// 名前解決のスコープ。サブクエリは外側のクエリのエイリアスも参照できる（相関サブクエリ）。
struct Scope<'a> {
    query: &'a QueryDescriptor,
    parent: Option<&'a Scope<'a>>,
}

impl<'a> Scope<'a> {
    fn resolve(&self, alias: &str) -> Option<&'a Source> {
        self.query
            .source(alias)
            .or_else(|| self.parent.and_then(|parent| parent.resolve(alias)))
    }
}

impl QueryDescriptor {
    /// クエリ全体（サブクエリを含む）を検証する
    pub fn validate(&self) -> Result<(), BuildError> {
        validate_query(self, None)
    }
}

fn validate_query(query: &QueryDescriptor, parent: Option<&Scope<'_>>) -> Result<(), BuildError> {
    if let Some(error) = &query.error {
        return Err(error.clone());
    }
    if query.from.is_empty() {
        return Err(BuildError::MissingFrom);
    }
    if query.projection.is_empty() {
        return Err(BuildError::EmptyProjection);
    }

    let mut declared: Vec<&str> = Vec::new();
    for alias in query.aliases() {
        let shadows_outer = parent.map_or(false, |scope| scope.resolve(alias).is_some());
        if declared.contains(&alias) || shadows_outer {
            return Err(BuildError::AliasConflict(alias.to_string()));
        }
        declared.push(alias);
    }

    let scope = Scope { query, parent };
    let from_count = query.from.len();

    for (index, join) in query.joins.iter().enumerate() {
        match &join.relation {
            Some(relation) => {
                let visible = &declared[..from_count + index];
                if !visible.contains(&relation.source_alias.as_str()) {
                    return Err(BuildError::UnreachableAlias {
                        alias: relation.source_alias.clone(),
                    });
                }
                if join.target.table.name != relation.meta.target_table {
                    return Err(BuildError::RelationTargetMismatch {
                        relation: format!("{}.{}", relation.source_alias, relation.meta.field),
                        expected: relation.meta.target_table.to_string(),
                        actual: join.target.table.name.clone(),
                    });
                }
            }
            None => {
                if join.fetch {
                    return Err(BuildError::FetchJoinWithoutRelation {
                        alias: join.target.alias.clone(),
                    });
                }
                if join.on.is_none() {
                    return Err(BuildError::MissingJoinCondition {
                        alias: join.target.alias.clone(),
                    });
                }
            }
        }
        if let Some(on) = &join.on {
            check_predicate(on, &scope)?;
        }
    }

    for expression in &query.projection {
        check_expression(expression, &scope)?;
    }
    if let Some(filter) = &query.filter {
        check_predicate(filter, &scope)?;
    }
    for expression in &query.group_by {
        check_expression(expression, &scope)?;
    }
    if let Some(having) = &query.having {
        check_predicate(having, &scope)?;
    }
    for order in &query.order_by {
        check_expression(&order.target, &scope)?;
    }
    Ok(())
}

fn validate_subquery(subquery: &QueryDescriptor, scope: &Scope<'_>) -> Result<(), BuildError> {
    validate_query(subquery, Some(scope))?;
    if subquery.projection.len() != 1 {
        return Err(BuildError::SubqueryWidth(subquery.projection.len()));
    }
    Ok(())
}

fn check_expression(expression: &Expression, scope: &Scope<'_>) -> Result<(), BuildError> {
    match expression {
        Expression::Column(column) => {
            let source = scope.resolve(&column.alias).ok_or_else(|| BuildError::UnreachableAlias {
                alias: column.alias.clone(),
            })?;
            if source.table.get_column(&column.column).is_none() {
                return Err(BuildError::UnknownColumn {
                    alias: column.alias.clone(),
                    column: column.column.clone(),
                });
            }
            Ok(())
        }
        Expression::Entity(entity) => match scope.resolve(&entity.alias) {
            Some(_) => Ok(()),
            None => Err(BuildError::UnreachableAlias {
                alias: entity.alias.clone(),
            }),
        },
        Expression::Literal(_) => Ok(()),
        Expression::Parameter(name) => Err(BuildError::UnboundParameter(name.clone())),
        Expression::Concat(left, right) => {
            check_expression(left, scope)?;
            check_expression(right, scope)?;
            ensure_operand("concat", left, |data_type| data_type.is_text())?;
            ensure_operand("concat", right, |data_type| data_type.is_text())
        }
        Expression::Cast(inner, _) | Expression::Alias(inner, _) => check_expression(inner, scope),
        Expression::Aggregate(function, inner) => {
            check_expression(inner, scope)?;
            match function {
                AggregateFunction::Sum => ensure_operand("sum", inner, |data_type| data_type.is_numeric()),
                AggregateFunction::Avg => ensure_operand("avg", inner, |data_type| data_type.is_numeric()),
                _ => Ok(()),
            }
        }
        Expression::Case { branches, otherwise } => {
            for branch in branches {
                check_predicate(&branch.when, scope)?;
                check_expression(&branch.then, scope)?;
                ensure_comparable(&branch.then, otherwise)?;
            }
            check_expression(otherwise, scope)
        }
        Expression::Subquery(subquery) => validate_subquery(subquery, scope),
    }
}

fn check_predicate(predicate: &Predicate, scope: &Scope<'_>) -> Result<(), BuildError> {
    match predicate {
        Predicate::Compare { left, right, .. } => {
            check_expression(left, scope)?;
            check_expression(right, scope)?;
            ensure_comparable(left, right)
        }
        Predicate::Between { expr, low, high, .. } => {
            check_expression(expr, scope)?;
            check_expression(low, scope)?;
            check_expression(high, scope)?;
            ensure_comparable(expr, low)?;
            ensure_comparable(expr, high)
        }
        Predicate::In { expr, list, .. } => {
            check_expression(expr, scope)?;
            for item in list {
                check_expression(item, scope)?;
                ensure_comparable(expr, item)?;
            }
            Ok(())
        }
        Predicate::InSubquery { expr, subquery, .. } => {
            check_expression(expr, scope)?;
            validate_subquery(subquery, scope)?;
            match (expr.data_type(), subquery.projection[0].data_type()) {
                (Some(left), Some(right)) if !left.is_comparable_with(right) => {
                    Err(BuildError::IncompatibleTypes { left, right })
                }
                _ => Ok(()),
            }
        }
        Predicate::IsNull { expr, .. } => check_expression(expr, scope),
        Predicate::Like { expr, pattern, .. } => {
            check_expression(expr, scope)?;
            check_expression(pattern, scope)?;
            ensure_operand("like", expr, |data_type| data_type.is_text())?;
            ensure_operand("like", pattern, |data_type| data_type.is_text())
        }
        Predicate::And(items) | Predicate::Or(items) => {
            items.iter().try_for_each(|item| check_predicate(item, scope))
        }
        Predicate::Not(inner) => check_predicate(inner, scope),
    }
}

fn ensure_comparable(left: &Expression, right: &Expression) -> Result<(), BuildError> {
    match (left.data_type(), right.data_type()) {
        (Some(left), Some(right)) if !left.is_comparable_with(right) => {
            Err(BuildError::IncompatibleTypes { left, right })
        }
        _ => Ok(()),
    }
}

fn ensure_operand(
    operation: &'static str,
    expression: &Expression,
    accepts: impl Fn(DataType) -> bool,
) -> Result<(), BuildError> {
    match expression.data_type() {
        Some(data_type) if !data_type.is_null() && !accepts(data_type) => {
            Err(BuildError::InvalidOperand { operation, data_type })
        }
        _ => Ok(()),
    }
}
