//! 名前付きパラメータ (`:username`) の束縛

use crate::domain::entity::Value;
use crate::domain::query::descriptor::QueryDescriptor;
use crate::domain::query::expression::Expression;
use crate::domain::query::predicate::Predicate;

impl Expression {
    fn bind_parameter(&mut self, name: &str, value: &Value) {
        match self {
            Expression::Parameter(parameter) if parameter == name => {
                *self = Expression::Literal(value.clone());
            }
            Expression::Concat(left, right) => {
                left.bind_parameter(name, value);
                right.bind_parameter(name, value);
            }
            Expression::Cast(inner, _)
            | Expression::Aggregate(_, inner)
            | Expression::Alias(inner, _) => inner.bind_parameter(name, value),
            Expression::Case { branches, otherwise } => {
                for branch in branches {
                    branch.when.bind_parameter(name, value);
                    branch.then.bind_parameter(name, value);
                }
                otherwise.bind_parameter(name, value);
            }
            Expression::Subquery(query) => query.bind_parameter(name, value),
            Expression::Column(_)
            | Expression::Entity(_)
            | Expression::Literal(_)
            | Expression::Parameter(_) => {}
        }
    }
}

impl Predicate {
    fn bind_parameter(&mut self, name: &str, value: &Value) {
        match self {
            Predicate::Compare { left, right, .. } => {
                left.bind_parameter(name, value);
                right.bind_parameter(name, value);
            }
            Predicate::Between { expr, low, high, .. } => {
                expr.bind_parameter(name, value);
                low.bind_parameter(name, value);
                high.bind_parameter(name, value);
            }
            Predicate::In { expr, list, .. } => {
                expr.bind_parameter(name, value);
                list.iter_mut().for_each(|item| item.bind_parameter(name, value));
            }
            Predicate::InSubquery { expr, subquery, .. } => {
                expr.bind_parameter(name, value);
                subquery.bind_parameter(name, value);
            }
            Predicate::IsNull { expr, .. } => expr.bind_parameter(name, value),
            Predicate::Like { expr, pattern, .. } => {
                expr.bind_parameter(name, value);
                pattern.bind_parameter(name, value);
            }
            Predicate::And(items) | Predicate::Or(items) => {
                items.iter_mut().for_each(|item| item.bind_parameter(name, value));
            }
            Predicate::Not(inner) => inner.bind_parameter(name, value),
        }
    }
}

impl QueryDescriptor {
    /// クエリ中（サブクエリを含む）の `:name` をすべて値に置き換える
    pub fn bind_parameter(&mut self, name: &str, value: &Value) {
        self.projection
            .iter_mut()
            .for_each(|expr| expr.bind_parameter(name, value));
        for join in &mut self.joins {
            if let Some(on) = &mut join.on {
                on.bind_parameter(name, value);
            }
        }
        if let Some(filter) = &mut self.filter {
            filter.bind_parameter(name, value);
        }
        self.group_by
            .iter_mut()
            .for_each(|expr| expr.bind_parameter(name, value));
        if let Some(having) = &mut self.having {
            having.bind_parameter(name, value);
        }
        for order in &mut self.order_by {
            order.target.bind_parameter(name, value);
        }
    }
}
