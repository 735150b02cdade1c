use std::fmt;

use itertools::Itertools;
use strum::Display;

use crate::domain::entity::Table;
use crate::domain::model::RelationMeta;
use crate::domain::query::error::BuildError;
use crate::domain::query::expression::Expression;
use crate::domain::query::order::OrderSpecifier;
use crate::domain::query::predicate::Predicate;

/// FROM/JOIN に現れるエイリアス付きのエンティティ
#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    pub entity: String,
    pub alias: String,
    pub table: Table,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum JoinType {
    #[strum(serialize = "inner join")]
    Inner,
    #[strum(serialize = "left join")]
    Left,
}

/// 関連を辿る結合 (`join(member.team, team)`)
#[derive(Debug, Clone, PartialEq)]
pub struct JoinRelation {
    /// 関連を持つ側のエイリアス
    pub source_alias: String,
    pub meta: RelationMeta,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    pub join_type: JoinType,
    pub target: Source,
    /// `None` は関連のない結合（ON条件が必須）
    pub relation: Option<JoinRelation>,
    /// 結合条件。WHERE とは別に保持され、LEFT JOIN では駆動側の行を落とさない。
    pub on: Option<Predicate>,
    /// 関連先エンティティを結果に積み込むか
    pub fetch: bool,
}

/// 組み立て済みのクエリ
///
/// ビルダーが組み立て中に使い、`build` で検証された後は変更されない。
/// 実行エンジンとレンダラーはこの値だけを見る。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryDescriptor {
    pub(crate) projection: Vec<Expression>,
    pub(crate) from: Vec<Source>,
    pub(crate) joins: Vec<JoinClause>,
    pub(crate) filter: Option<Predicate>,
    pub(crate) group_by: Vec<Expression>,
    pub(crate) having: Option<Predicate>,
    pub(crate) order_by: Vec<OrderSpecifier>,
    pub(crate) offset: Option<u64>,
    pub(crate) limit: Option<u64>,
    pub(crate) distinct: bool,
    /// 組み立て中に最初に起きたエラー。`validate` で報告される。
    pub(crate) error: Option<BuildError>,
}

impl QueryDescriptor {
    pub fn projection(&self) -> &[Expression] {
        &self.projection
    }

    pub fn sources(&self) -> &[Source] {
        &self.from
    }

    pub fn joins(&self) -> &[JoinClause] {
        &self.joins
    }

    pub fn filter(&self) -> Option<&Predicate> {
        self.filter.as_ref()
    }

    pub fn group_by(&self) -> &[Expression] {
        &self.group_by
    }

    pub fn having(&self) -> Option<&Predicate> {
        self.having.as_ref()
    }

    pub fn order_by(&self) -> &[OrderSpecifier] {
        &self.order_by
    }

    pub fn offset(&self) -> Option<u64> {
        self.offset
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn is_distinct(&self) -> bool {
        self.distinct
    }

    /// 複数のFROMソースの直積をWHEREで絞り込むシータ結合か
    ///
    /// シータ結合は合法だが、関連の整合性を一切保証しない。
    pub fn is_theta_join(&self) -> bool {
        self.from.len() > 1
    }

    /// 集約を伴うクエリか（GROUP BY があるか、選択句に集約関数がある）
    pub fn is_aggregating(&self) -> bool {
        !self.group_by.is_empty() || self.projection.iter().any(Expression::contains_aggregate)
    }

    /// FROM/JOIN で宣言されたエイリアスを宣言順に列挙する
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.from
            .iter()
            .map(|source| source.alias.as_str())
            .chain(self.joins.iter().map(|join| join.target.alias.as_str()))
    }

    /// エイリアスからソースを引く
    pub fn source(&self, alias: &str) -> Option<&Source> {
        self.from
            .iter()
            .chain(self.joins.iter().map(|join| &join.target))
            .find(|source| source.alias == alias)
    }

    pub(crate) fn add_source(&mut self, source: Source) {
        self.from.push(source);
    }

    pub(crate) fn add_join(&mut self, join_type: JoinType, target: Source, relation: Option<JoinRelation>) {
        self.joins.push(JoinClause {
            join_type,
            target,
            relation,
            on: None,
            fetch: false,
        });
    }

    pub(crate) fn record_error(&mut self, error: BuildError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    pub(crate) fn add_filter(&mut self, predicates: Vec<Predicate>) {
        let current = self.filter.take();
        self.filter = Predicate::all(std::iter::once(current).chain(predicates.into_iter().map(Some)));
    }

    pub(crate) fn add_having(&mut self, predicates: Vec<Predicate>) {
        let current = self.having.take();
        self.having = Predicate::all(std::iter::once(current).chain(predicates.into_iter().map(Some)));
    }

    pub(crate) fn add_join_condition(&mut self, predicates: Vec<Predicate>) {
        match self.joins.last_mut() {
            Some(join) => {
                let current = join.on.take();
                join.on = Predicate::all(std::iter::once(current).chain(predicates.into_iter().map(Some)));
            }
            None => self.record_error(BuildError::JoinConditionWithoutJoin),
        }
    }

    pub(crate) fn mark_fetch_join(&mut self) {
        match self.joins.last_mut() {
            Some(join) => join.fetch = true,
            None => self.record_error(BuildError::JoinConditionWithoutJoin),
        }
    }
}

impl fmt::Display for QueryDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "select ")?;
        if self.distinct {
            write!(f, "distinct ")?;
        }
        write!(f, "{}", self.projection.iter().join(", "))?;
        write!(
            f,
            " from {}",
            self.from.iter().map(|source| format!("{} {}", source.entity, source.alias)).join(", ")
        )?;
        for join in &self.joins {
            write!(f, " {}", join.join_type)?;
            if join.fetch {
                write!(f, " fetch")?;
            }
            match &join.relation {
                Some(relation) => write!(
                    f,
                    " {}.{} as {}",
                    relation.source_alias, relation.meta.field, join.target.alias
                )?,
                None => write!(f, " {} {}", join.target.entity, join.target.alias)?,
            }
            if let Some(on) = &join.on {
                write!(f, " on {}", on)?;
            }
        }
        if let Some(filter) = &self.filter {
            write!(f, " where {}", filter)?;
        }
        if !self.group_by.is_empty() {
            write!(f, " group by {}", self.group_by.iter().join(", "))?;
        }
        if let Some(having) = &self.having {
            write!(f, " having {}", having)?;
        }
        if !self.order_by.is_empty() {
            write!(f, " order by {}", self.order_by.iter().join(", "))?;
        }
        if let Some(offset) = self.offset {
            write!(f, " offset {}", offset)?;
        }
        if let Some(limit) = self.limit {
            write!(f, " limit {}", limit)?;
        }
        Ok(())
    }
}
