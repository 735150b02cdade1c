use crate::domain::entity::{DataType, Value};
use crate::domain::query::{Cell, ExecutionError, Expression, Predicate, QueryDescriptor};
use crate::infrastructure::engine::functions::{aggregate, like};
use crate::infrastructure::engine::{QueryEngine, Scope};

/// 三値論理の AND。偽が1つでもあれば偽、次に UNKNOWN。
fn all(results: impl IntoIterator<Item = Option<bool>>) -> Option<bool> {
    let mut unknown = false;
    for result in results {
        match result {
            Some(false) => return Some(false),
            None => unknown = true,
            Some(true) => {}
        }
    }
    if unknown {
        None
    } else {
        Some(true)
    }
}

/// 三値論理の OR。真が1つでもあれば真、次に UNKNOWN。
fn any(results: impl IntoIterator<Item = Option<bool>>) -> Option<bool> {
    let mut unknown = false;
    for result in results {
        match result {
            Some(true) => return Some(true),
            None => unknown = true,
            Some(false) => {}
        }
    }
    if unknown {
        None
    } else {
        Some(false)
    }
}

/// `x IN (..)` の三値論理
fn membership(value: &Value, candidates: &[Value], negated: bool) -> Option<bool> {
    let found = any(candidates.iter().map(|candidate| value.sql_eq(candidate)));
    if negated {
        found.map(|found| !found)
    } else {
        found
    }
}

impl QueryEngine<'_> {
    /// 式を評価する
    pub(super) fn eval(&self, expr: &Expression, scope: &Scope<'_>) -> Result<Value, ExecutionError> {
        match expr {
            Expression::Column(column) => Ok(match scope.lookup(&column.alias) {
                Some(Some(row)) => row.get(&column.column).cloned().unwrap_or(Value::Null),
                Some(None) => Value::Null,
                None => {
                    return Err(ExecutionError::Projection(format!(
                        "alias '{}' is not bound",
                        column.alias
                    )))
                }
            }),
            // エンティティを値として使うと識別子になる
            Expression::Entity(entity) => Ok(scope
                .lookup(&entity.alias)
                .flatten()
                .and_then(|row| row.id())
                .map_or(Value::Null, Value::Integer)),
            Expression::Literal(value) => Ok(value.clone()),
            Expression::Parameter(name) => Err(ExecutionError::UnboundParameter(name.clone())),
            Expression::Concat(left, right) => {
                let left = self.eval(left, scope)?;
                let right = self.eval(right, scope)?;
                if left.is_null() || right.is_null() {
                    return Ok(Value::Null);
                }
                Ok(Value::Text(format!("{}{}", text_of(&left)?, text_of(&right)?)))
            }
            Expression::Cast(inner, target) => Ok(self.eval(inner, scope)?.cast_to(*target)?),
            Expression::Aggregate(function, inner) => {
                let group = scope.group.ok_or_else(|| {
                    ExecutionError::Projection(format!("aggregate '{}' used outside of a grouped query", expr))
                })?;
                let mut values = Vec::with_capacity(group.len());
                for binding in group {
                    let row_scope = Scope {
                        query: scope.query,
                        binding,
                        group: None,
                        parent: scope.parent,
                    };
                    let value = self.eval(inner, &row_scope)?;
                    if !value.is_null() {
                        values.push(value);
                    }
                }
                Ok(aggregate(*function, values))
            }
            Expression::Case { branches, otherwise } => {
                for branch in branches {
                    if self.test(&branch.when, scope)? == Some(true) {
                        return self.eval(&branch.then, scope);
                    }
                }
                self.eval(otherwise, scope)
            }
            Expression::Subquery(query) => self.scalar(query, scope),
            Expression::Alias(inner, _) => self.eval(inner, scope),
        }
    }

    /// 条件を三値論理で評価する。`None` は UNKNOWN。
    pub(super) fn test(&self, predicate: &Predicate, scope: &Scope<'_>) -> Result<Option<bool>, ExecutionError> {
        Ok(match predicate {
            Predicate::Compare { op, left, right } => {
                let left = self.eval(left, scope)?;
                let right = self.eval(right, scope)?;
                left.compare(&right).map(|ordering| op.matches(ordering))
            }
            Predicate::Between { expr, low, high, negated } => {
                let value = self.eval(expr, scope)?;
                let low = self.eval(low, scope)?;
                let high = self.eval(high, scope)?;
                let within = all([
                    value.compare(&low).map(|o| o.is_ge()),
                    value.compare(&high).map(|o| o.is_le()),
                ]);
                within.map(|within| within != *negated)
            }
            Predicate::In { expr, list, negated } => {
                let value = self.eval(expr, scope)?;
                let candidates = list
                    .iter()
                    .map(|item| self.eval(item, scope))
                    .collect::<Result<Vec<_>, _>>()?;
                membership(&value, &candidates, *negated)
            }
            Predicate::InSubquery { expr, subquery, negated } => {
                let value = self.eval(expr, scope)?;
                let candidates = self
                    .select(subquery, Some(scope), true)?
                    .into_iter()
                    .map(first_value)
                    .collect::<Result<Vec<_>, _>>()?;
                membership(&value, &candidates, *negated)
            }
            Predicate::IsNull { expr, negated } => Some(self.eval(expr, scope)?.is_null() != *negated),
            Predicate::Like { expr, pattern, negated } => {
                match (self.eval(expr, scope)?, self.eval(pattern, scope)?) {
                    (Value::Text(text), Value::Text(pattern)) => Some(like(&text, &pattern) != *negated),
                    _ => None,
                }
            }
            Predicate::And(items) => {
                let mut results = Vec::with_capacity(items.len());
                for item in items {
                    let result = self.test(item, scope)?;
                    if result == Some(false) {
                        return Ok(Some(false));
                    }
                    results.push(result);
                }
                all(results)
            }
            Predicate::Or(items) => {
                let mut results = Vec::with_capacity(items.len());
                for item in items {
                    let result = self.test(item, scope)?;
                    if result == Some(true) {
                        return Ok(Some(true));
                    }
                    results.push(result);
                }
                any(results)
            }
            Predicate::Not(inner) => self.test(inner, scope)?.map(|result| !result),
        })
    }

    /// スカラーサブクエリ。0行ならNULL、2行以上はエラー。
    fn scalar(&self, query: &QueryDescriptor, scope: &Scope<'_>) -> Result<Value, ExecutionError> {
        let mut rows = self.select(query, Some(scope), true)?;
        match rows.len() {
            0 => Ok(Value::Null),
            1 => first_value(rows.remove(0)),
            n => Err(ExecutionError::SubqueryCardinality(n)),
        }
    }
}

fn first_value(row: Vec<Cell>) -> Result<Value, ExecutionError> {
    match row.into_iter().next() {
        Some(Cell::Scalar(value)) => Ok(value),
        Some(Cell::Entity(entity)) => Ok(entity
            .and_then(|entity| entity.row.id())
            .map_or(Value::Null, Value::Integer)),
        None => Ok(Value::Null),
    }
}

/// 連結用の文字列表現
fn text_of(value: &Value) -> Result<String, ExecutionError> {
    match value {
        Value::Text(text) => Ok(text.clone()),
        other => match other.cast_to(DataType::Text)? {
            Value::Text(text) => Ok(text),
            _ => Ok(String::new()),
        },
    }
}
