use sqlparser::ast::{
    BinaryOperator, Expr, Function, FunctionArg, FunctionArgExpr, Join, JoinConstraint, JoinOperator,
    ObjectName, OrderByExpr, Query, SelectItem, SetExpr, Statement, TableFactor, UnaryOperator,
    Value as SqlValue,
};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::{Parser, ParserError};
use thiserror::Error;

use crate::domain::entity::{DataType, Value};
use crate::domain::model::{Catalog, EntityDescriptor, RelationKind};
use crate::domain::query::{
    AggregateFunction, CaseBranch, ColumnRef, ComparisonOperator, EntityRef, Expression, JoinRelation,
    JoinType, NullHandling, Order, OrderSpecifier, Predicate, QueryDescriptor, Source,
};
use crate::infrastructure::parser::rewrite::rewrite;

/// テキストクエリの解析エラー
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("syntax error: {0}")]
    SyntaxError(String),

    #[error("unsupported query feature: {0}")]
    UnsupportedFeature(String),

    #[error("unknown entity '{0}'")]
    UnknownEntity(String),

    #[error("unknown alias '{0}'")]
    UnknownAlias(String),

    #[error("unknown field '{field}' on entity '{entity}'")]
    UnknownField { entity: String, field: String },

    #[error("invalid value: {0}")]
    InvalidValue(String),
}

impl From<ParserError> for ParseError {
    fn from(err: ParserError) -> Self {
        ParseError::SyntaxError(err.to_string())
    }
}

fn unsupported<T>(feature: impl std::fmt::Display) -> Result<T, ParseError> {
    Err(ParseError::UnsupportedFeature(feature.to_string()))
}

/// 解析済みのテキストクエリ
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedQuery {
    pub descriptor: QueryDescriptor,
    /// `select new X(..)` のコンストラクタ名
    pub constructor: Option<String>,
}

/// JPQL 風のテキストクエリを記述子に変換するパーサー
///
/// 構文解析は `sqlparser` に任せ、エンティティ名・エイリアス・フィールドの解決を
/// エンティティの目録に対して行う。`join fetch` と `select new` は事前に取り除く。
pub struct QueryParser<'c> {
    dialect: GenericDialect,
    catalog: &'c Catalog,
}

impl<'c> QueryParser<'c> {
    pub fn new(catalog: &'c Catalog) -> Self {
        Self {
            dialect: GenericDialect {},
            catalog,
        }
    }

    /// テキストクエリを解析する
    pub fn parse(&self, text: &str) -> Result<ParsedQuery, ParseError> {
        let rewritten = rewrite(&self.dialect, text)?;
        let mut statements = Parser::new(&self.dialect)
            .with_tokens(rewritten.tokens)
            .parse_statements()?;

        let query = match (statements.pop(), statements.is_empty()) {
            (Some(Statement::Query(query)), true) => query,
            (Some(_), true) => return unsupported("only SELECT queries are supported"),
            _ => return unsupported("exactly one query is expected"),
        };

        let mut translation = Translation {
            catalog: self.catalog,
            fetch_paths: rewritten.fetch_paths,
            scopes: Vec::new(),
        };
        let descriptor = translation.query(&query)?;
        Ok(ParsedQuery {
            descriptor,
            constructor: rewritten.constructor,
        })
    }
}

/// 解析1回分の名前解決の状態
struct Translation<'c> {
    catalog: &'c Catalog,
    fetch_paths: Vec<String>,
    /// クエリの入れ子ごとのエイリアス。内側から順に探す。
    scopes: Vec<Vec<(String, &'c EntityDescriptor)>>,
}

impl<'c> Translation<'c> {
    fn declare(&mut self, alias: &str, entity: &'c EntityDescriptor) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.push((alias.to_string(), entity));
        }
    }

    fn resolve(&self, alias: &str) -> Option<&'c EntityDescriptor> {
        self.scopes
            .iter()
            .rev()
            .flat_map(|scope| scope.iter())
            .find(|(declared, _)| declared == alias)
            .map(|(_, entity)| *entity)
    }

    fn entity(&self, name: &str) -> Result<&'c EntityDescriptor, ParseError> {
        self.catalog
            .entity(name)
            .ok_or_else(|| ParseError::UnknownEntity(name.to_string()))
    }

    fn query(&mut self, query: &Query) -> Result<QueryDescriptor, ParseError> {
        self.scopes.push(Vec::new());
        let result = self.select_query(query);
        self.scopes.pop();
        result
    }

    fn select_query(&mut self, query: &Query) -> Result<QueryDescriptor, ParseError> {
        let SetExpr::Select(select) = query.body.as_ref() else {
            return unsupported("set operations");
        };

        let mut descriptor = QueryDescriptor::default();
        for table in &select.from {
            let (entity, alias) = self.table_factor(&table.relation)?;
            let entity = self.entity(&entity)?;
            self.declare(&alias, entity);
            descriptor.add_source(source(entity, alias));
            for join in &table.joins {
                self.join(&mut descriptor, join)?;
            }
        }

        for item in &select.projection {
            let expression = match item {
                SelectItem::UnnamedExpr(expr) => self.expression(expr)?,
                SelectItem::ExprWithAlias { expr, alias } => {
                    Expression::Alias(Box::new(self.expression(expr)?), alias.value.clone())
                }
                _ => return unsupported("wildcard selection; select the alias instead"),
            };
            descriptor.projection.push(expression);
        }

        if let Some(selection) = &select.selection {
            descriptor.add_filter(vec![self.predicate(selection)?]);
        }
        for expr in &select.group_by {
            descriptor.group_by.push(self.expression(expr)?);
        }
        if let Some(having) = &select.having {
            descriptor.add_having(vec![self.predicate(having)?]);
        }
        for order in &query.order_by {
            let specifier = self.order(order, &descriptor.projection)?;
            descriptor.order_by.push(specifier);
        }
        if let Some(limit) = &query.limit {
            descriptor.limit = Some(count_literal(limit)?);
        }
        if let Some(offset) = &query.offset {
            descriptor.offset = Some(count_literal(&offset.value)?);
        }
        descriptor.distinct = select.distinct.is_some();
        Ok(descriptor)
    }

    /// `Member m` → ("Member", "m")。`m.team t` → ("m.team", "t")。
    fn table_factor(&self, factor: &TableFactor) -> Result<(String, String), ParseError> {
        match factor {
            TableFactor::Table { name, alias, .. } => {
                let name = object_name(name);
                let alias = match alias {
                    Some(alias) => alias.name.value.clone(),
                    None => name.clone(),
                };
                Ok((name, alias))
            }
            _ => unsupported("derived tables in FROM"),
        }
    }

    fn join(&mut self, descriptor: &mut QueryDescriptor, join: &Join) -> Result<(), ParseError> {
        let (join_type, constraint) = match &join.join_operator {
            JoinOperator::Inner(constraint) => (JoinType::Inner, constraint),
            JoinOperator::LeftOuter(constraint) => (JoinType::Left, constraint),
            other => return unsupported(format!("{:?}", other)),
        };
        let (path, alias) = self.table_factor(&join.relation)?;

        match path.split_once('.') {
            // 関連を辿る結合 (`join m.team t`)
            Some((owner, field)) => {
                let owner_entity = self
                    .resolve(owner)
                    .ok_or_else(|| ParseError::UnknownAlias(owner.to_string()))?;
                let meta = *owner_entity.relation(field).ok_or_else(|| ParseError::UnknownField {
                    entity: owner_entity.name.to_string(),
                    field: field.to_string(),
                })?;
                let target = self.entity(meta.target_entity)?;
                self.declare(&alias, target);
                descriptor.add_join(
                    join_type,
                    source(target, alias),
                    Some(JoinRelation {
                        source_alias: owner.to_string(),
                        meta,
                    }),
                );
                if self.fetch_paths.iter().any(|fetched| *fetched == path) {
                    descriptor.mark_fetch_join();
                }
            }
            // 関連のない結合 (`left join Team t on ..`)
            None => {
                let target = self.entity(&path)?;
                self.declare(&alias, target);
                descriptor.add_join(join_type, source(target, alias), None);
            }
        }

        match constraint {
            JoinConstraint::On(on) => {
                let on = self.predicate(on)?;
                descriptor.add_join_condition(vec![on]);
            }
            JoinConstraint::None => {}
            _ => return unsupported("USING/NATURAL joins"),
        }
        Ok(())
    }

    fn order(&mut self, order: &OrderByExpr, projection: &[Expression]) -> Result<OrderSpecifier, ParseError> {
        // 選択句の別名で並べ替えられる
        let target = match &order.expr {
            Expr::Identifier(ident) if self.resolve(&ident.value).is_none() => projection
                .iter()
                .find_map(|expr| match expr {
                    Expression::Alias(inner, alias) if *alias == ident.value => Some((**inner).clone()),
                    _ => None,
                })
                .ok_or_else(|| ParseError::UnknownAlias(ident.value.clone()))?,
            expr => self.expression(expr)?,
        };
        let mut specifier = OrderSpecifier::new(
            target,
            if order.asc == Some(false) { Order::Desc } else { Order::Asc },
        );
        specifier.null_handling = match order.nulls_first {
            Some(true) => NullHandling::NullsFirst,
            Some(false) => NullHandling::NullsLast,
            None => NullHandling::Default,
        };
        Ok(specifier)
    }

    fn predicate(&mut self, expr: &Expr) -> Result<Predicate, ParseError> {
        match expr {
            Expr::Nested(inner) => self.predicate(inner),
            Expr::BinaryOp { left, op: BinaryOperator::And, right } => {
                Ok(self.predicate(left)?.and(self.predicate(right)?))
            }
            Expr::BinaryOp { left, op: BinaryOperator::Or, right } => {
                Ok(self.predicate(left)?.or(self.predicate(right)?))
            }
            Expr::BinaryOp { left, op, right } => {
                let op = match op {
                    BinaryOperator::Eq => ComparisonOperator::Eq,
                    BinaryOperator::NotEq => ComparisonOperator::Ne,
                    BinaryOperator::Gt => ComparisonOperator::Gt,
                    BinaryOperator::GtEq => ComparisonOperator::Goe,
                    BinaryOperator::Lt => ComparisonOperator::Lt,
                    BinaryOperator::LtEq => ComparisonOperator::Loe,
                    other => return unsupported(format!("operator {} in a condition", other)),
                };
                Ok(Predicate::Compare {
                    op,
                    left: self.expression(left)?,
                    right: self.expression(right)?,
                })
            }
            Expr::UnaryOp { op: UnaryOperator::Not, expr } => Ok(self.predicate(expr)?.not()),
            Expr::IsNull(expr) => Ok(Predicate::IsNull {
                expr: self.expression(expr)?,
                negated: false,
            }),
            Expr::IsNotNull(expr) => Ok(Predicate::IsNull {
                expr: self.expression(expr)?,
                negated: true,
            }),
            Expr::InList { expr, list, negated } => Ok(Predicate::In {
                expr: self.expression(expr)?,
                list: list
                    .iter()
                    .map(|item| self.expression(item))
                    .collect::<Result<Vec<_>, _>>()?,
                negated: *negated,
            }),
            Expr::InSubquery { expr, subquery, negated } => Ok(Predicate::InSubquery {
                expr: self.expression(expr)?,
                subquery: Box::new(self.query(subquery)?),
                negated: *negated,
            }),
            Expr::Between { expr, negated, low, high } => Ok(Predicate::Between {
                expr: self.expression(expr)?,
                low: self.expression(low)?,
                high: self.expression(high)?,
                negated: *negated,
            }),
            Expr::Like { negated, expr, pattern, .. } => Ok(Predicate::Like {
                expr: self.expression(expr)?,
                pattern: self.expression(pattern)?,
                negated: *negated,
            }),
            other => unsupported(format!("condition '{}'", other)),
        }
    }

    fn expression(&mut self, expr: &Expr) -> Result<Expression, ParseError> {
        match expr {
            Expr::Identifier(ident) => {
                let entity = self
                    .resolve(&ident.value)
                    .ok_or_else(|| ParseError::UnknownAlias(ident.value.clone()))?;
                Ok(Expression::Entity(EntityRef {
                    alias: ident.value.clone(),
                    entity: entity.name.to_string(),
                    table: entity.table.name.clone(),
                }))
            }
            Expr::CompoundIdentifier(parts) => match parts.as_slice() {
                [alias, field] => self.field(&alias.value, &field.value),
                _ => unsupported(format!(
                    "path '{}'; join the relation explicitly",
                    parts.iter().map(|part| part.value.as_str()).collect::<Vec<_>>().join(".")
                )),
            },
            Expr::Value(value) => literal(value),
            Expr::UnaryOp { op: UnaryOperator::Minus, expr } => match self.expression(expr)? {
                Expression::Literal(Value::Integer(i)) => Ok(Expression::Literal(Value::Integer(-i))),
                Expression::Literal(Value::Float(f)) => Ok(Expression::Literal(Value::Float(-f))),
                _ => unsupported("negation of a non-literal"),
            },
            Expr::Nested(inner) => self.expression(inner),
            Expr::BinaryOp { left, op: BinaryOperator::StringConcat, right } => Ok(Expression::Concat(
                Box::new(self.expression(left)?),
                Box::new(self.expression(right)?),
            )),
            Expr::Function(function) => self.function(function),
            Expr::Case { operand, conditions, results, else_result } => {
                let subject = match operand {
                    Some(operand) => Some(self.expression(operand)?),
                    None => None,
                };
                let mut branches = Vec::with_capacity(conditions.len());
                for (condition, result) in conditions.iter().zip(results) {
                    let when = match &subject {
                        Some(subject) => Predicate::Compare {
                            op: ComparisonOperator::Eq,
                            left: subject.clone(),
                            right: self.expression(condition)?,
                        },
                        None => self.predicate(condition)?,
                    };
                    branches.push(CaseBranch {
                        when,
                        then: self.expression(result)?,
                    });
                }
                let otherwise = match else_result {
                    Some(otherwise) => self.expression(otherwise)?,
                    None => Expression::Literal(Value::Null),
                };
                Ok(Expression::Case {
                    branches,
                    otherwise: Box::new(otherwise),
                })
            }
            Expr::Subquery(query) => Ok(Expression::Subquery(Box::new(self.query(query)?))),
            other => unsupported(format!("expression '{}'", other)),
        }
    }

    /// `m.username` → 列。多対一の関連フィールドは外部キー列になる。
    fn field(&self, alias: &str, field: &str) -> Result<Expression, ParseError> {
        let entity = self
            .resolve(alias)
            .ok_or_else(|| ParseError::UnknownAlias(alias.to_string()))?;

        let column = match entity.relation(field) {
            Some(meta) if meta.kind == RelationKind::ManyToOne => meta.join_column,
            Some(_) => return unsupported(format!("collection path '{}.{}' in an expression", alias, field)),
            None => field,
        };
        let data_type = entity
            .table
            .get_column(column)
            .map(|column| column.data_type)
            .ok_or_else(|| ParseError::UnknownField {
                entity: entity.name.to_string(),
                field: field.to_string(),
            })?;
        Ok(Expression::Column(ColumnRef::new(alias, column, data_type)))
    }

    fn function(&mut self, function: &Function) -> Result<Expression, ParseError> {
        let name = object_name(&function.name).to_ascii_lowercase();
        let mut args = Vec::with_capacity(function.args.len());
        for arg in &function.args {
            match arg {
                FunctionArg::Unnamed(FunctionArgExpr::Expr(expr)) => args.push(self.expression(expr)?),
                // count(*) は行数
                FunctionArg::Unnamed(FunctionArgExpr::Wildcard) => {
                    args.push(Expression::Literal(Value::Integer(1)))
                }
                _ => return unsupported(format!("arguments of {}", name)),
            }
        }

        let aggregate = match name.as_str() {
            "count" if function.distinct => Some(AggregateFunction::CountDistinct),
            "count" => Some(AggregateFunction::Count),
            "sum" => Some(AggregateFunction::Sum),
            "avg" => Some(AggregateFunction::Avg),
            "max" => Some(AggregateFunction::Max),
            "min" => Some(AggregateFunction::Min),
            _ => None,
        };
        if let Some(aggregate) = aggregate {
            let [arg] = <[Expression; 1]>::try_from(args)
                .map_err(|_| ParseError::SyntaxError(format!("{} takes exactly one argument", name)))?;
            return Ok(Expression::Aggregate(aggregate, Box::new(identity(arg))));
        }

        match name.as_str() {
            "concat" => args
                .into_iter()
                .reduce(|left, right| Expression::Concat(Box::new(left), Box::new(right)))
                .ok_or_else(|| ParseError::SyntaxError("concat needs arguments".to_string())),
            "str" => match <[Expression; 1]>::try_from(args) {
                Ok([arg]) => Ok(Expression::Cast(Box::new(arg), DataType::Text)),
                Err(_) => Err(ParseError::SyntaxError("str takes exactly one argument".to_string())),
            },
            _ => unsupported(format!("function {}", name)),
        }
    }
}

/// 集約の引数にエンティティが来たら識別子の列に置き換える (`count(m)`)
fn identity(expression: Expression) -> Expression {
    match expression {
        Expression::Entity(entity) => {
            Expression::Column(ColumnRef::new(entity.alias, "id", DataType::Integer))
        }
        other => other,
    }
}

fn source(entity: &EntityDescriptor, alias: String) -> Source {
    Source {
        entity: entity.name.to_string(),
        alias,
        table: entity.table.clone(),
    }
}

fn object_name(name: &ObjectName) -> String {
    name.0
        .iter()
        .map(|ident| ident.value.as_str())
        .collect::<Vec<_>>()
        .join(".")
}

fn literal(value: &SqlValue) -> Result<Expression, ParseError> {
    let value = match value {
        SqlValue::Number(number, _) => match number.parse::<i64>() {
            Ok(i) => Value::Integer(i),
            Err(_) => number
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| ParseError::InvalidValue(number.clone()))?,
        },
        SqlValue::SingleQuotedString(text) => Value::Text(text.clone()),
        SqlValue::Boolean(b) => Value::Boolean(*b),
        SqlValue::Null => Value::Null,
        SqlValue::Placeholder(name) => {
            let name = name.trim_start_matches(|c| c == ':' || c == '$' || c == '@');
            if name.is_empty() || name.chars().all(|c| c.is_ascii_digit()) {
                return unsupported("positional parameters; use :name");
            }
            return Ok(Expression::Parameter(name.to_string()));
        }
        other => return unsupported(format!("literal {}", other)),
    };
    Ok(Expression::Literal(value))
}

/// LIMIT/OFFSET の値
fn count_literal(expr: &Expr) -> Result<u64, ParseError> {
    match expr {
        Expr::Value(SqlValue::Number(number, _)) => number
            .parse::<u64>()
            .map_err(|_| ParseError::InvalidValue(number.clone())),
        other => Err(ParseError::InvalidValue(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<ParsedQuery, ParseError> {
        QueryParser::new(&Catalog::standard()).parse(text)
    }

    #[test]
    fn parses_parameterized_entity_query() {
        let parsed = parse("select m from Member m where m.username = :username").unwrap();
        assert_eq!(
            parsed.descriptor.to_string(),
            "select m from Member m where m.username = :username"
        );
    }

    #[test]
    fn parses_relation_join_with_fetch() {
        let parsed = parse("select m from Member m join fetch m.team t where t.name = 'teamA'").unwrap();
        let join = &parsed.descriptor.joins()[0];
        assert!(join.fetch);
        assert_eq!(join.relation.as_ref().map(|r| r.meta.field), Some("team"));
        assert_eq!(join.target.alias, "t");
    }

    #[test]
    fn parses_theta_left_join() {
        let parsed = parse("select m, t from Member m left join Team t on m.username = t.name").unwrap();
        let join = &parsed.descriptor.joins()[0];
        assert_eq!(join.join_type, JoinType::Left);
        assert!(join.relation.is_none());
        assert!(join.on.is_some());
    }

    #[test]
    fn resolves_relation_field_to_foreign_key() {
        let parsed = parse("select m.team from Member m").unwrap();
        assert_eq!(parsed.descriptor.projection()[0].to_string(), "m.team_id");
    }

    #[test]
    fn parses_aggregates_and_ordering() {
        let parsed = parse(
            "select t.name, avg(m.age) as ageAvg from Member m join m.team t \
             group by t.name having count(m) > 1 order by ageAvg desc nulls last limit 10 offset 1",
        )
        .unwrap();
        let descriptor = parsed.descriptor;
        assert_eq!(descriptor.group_by().len(), 1);
        assert_eq!(descriptor.having().map(ToString::to_string).as_deref(), Some("count(m.id) > 1"));
        assert_eq!(descriptor.order_by()[0].to_string(), "avg(m.age) desc nulls last");
        assert_eq!((descriptor.offset(), descriptor.limit()), (Some(1), Some(10)));
    }

    #[test]
    fn records_constructor() {
        let parsed = parse("select new study.querydsl.dto.MemberDto(m.username, m.age) from Member m").unwrap();
        assert_eq!(parsed.constructor.as_deref(), Some("study.querydsl.dto.MemberDto"));
        assert_eq!(parsed.descriptor.projection().len(), 2);
    }

    #[test]
    fn reports_unknown_names() {
        assert_eq!(
            parse("select o from Order o").unwrap_err(),
            ParseError::UnknownEntity("Order".to_string())
        );
        assert_eq!(
            parse("select m.nickname from Member m").unwrap_err(),
            ParseError::UnknownField {
                entity: "Member".to_string(),
                field: "nickname".to_string(),
            }
        );
        assert_eq!(
            parse("select x.age from Member m").unwrap_err(),
            ParseError::UnknownAlias("x".to_string())
        );
    }

    #[test]
    fn rejects_non_queries() {
        assert!(matches!(parse("delete from member"), Err(ParseError::UnsupportedFeature(_))));
        assert!(matches!(parse("select m from"), Err(ParseError::SyntaxError(_))));
    }
}
