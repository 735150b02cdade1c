use tracing::{debug, warn};

use crate::domain::metamodel::{EntityPath, RelationPath};
use crate::domain::model::PersistenceContext;
use crate::domain::query::descriptor::{JoinType, QueryDescriptor};
use crate::domain::query::error::{BuildError, ExecutionError};
use crate::domain::query::order::IntoOrderSpecifiers;
use crate::domain::query::predicate::IntoPredicates;
use crate::domain::query::projection::{Cell, Projection, Selectable};
use crate::{Error, Result};

/// 組み立て済みのクエリを実行するもの（永続化境界）
///
/// 返すのは射影前の結果行で、射影は [`Query`] 側で行う。
pub trait QueryExecutor {
    /// 結果行を返す。並び順・ページングは適用済み。
    fn execute(&self, query: &QueryDescriptor) -> std::result::Result<Vec<Vec<Cell>>, ExecutionError>;

    /// ページングを無視した結果行数
    fn count(&self, query: &QueryDescriptor) -> std::result::Result<u64, ExecutionError>;

    fn persistence_context(&self) -> &dyn PersistenceContext;
}

/// クエリの起点 (`JPAQueryFactory`)
#[derive(Clone, Copy)]
pub struct QueryFactory<'s> {
    executor: &'s dyn QueryExecutor,
}

impl<'s> QueryFactory<'s> {
    pub fn new(executor: &'s dyn QueryExecutor) -> Self {
        Self { executor }
    }

    pub fn select<P: Projection>(&self, projection: P) -> Query<'s, P> {
        Query::new(self.executor, projection)
    }

    /// `select(entity).from(entity)` の短縮形
    pub fn select_from<'p, E>(&self, path: &'p E) -> Query<'s, &'p E>
    where
        E: EntityPath + Projection,
    {
        Query::new(self.executor, path).from(path)
    }
}

/// ページングされた結果と、ページングなしの総件数
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResults<T> {
    results: Vec<T>,
    total: u64,
    offset: u64,
    limit: Option<u64>,
}

impl<T> QueryResults<T> {
    pub fn results(&self) -> &[T] {
        &self.results
    }

    pub fn into_results(self) -> Vec<T> {
        self.results
    }

    /// フィルタ後・ページング前の件数
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// 型付きクエリのビルダー
///
/// 組み立て中のメソッドは記述子を組み立てるだけで副作用はない。
/// `fetch` 系の終端操作は `self` を消費するため、実行後に同じビルダーは再利用できない。
pub struct Query<'s, P> {
    executor: &'s dyn QueryExecutor,
    projection: P,
    descriptor: QueryDescriptor,
}

impl<'s, P: Projection> Query<'s, P> {
    pub fn new(executor: &'s dyn QueryExecutor, projection: P) -> Self {
        let descriptor = QueryDescriptor {
            projection: projection.expressions(),
            ..QueryDescriptor::default()
        };
        Self {
            executor,
            projection,
            descriptor,
        }
    }

    /// FROM にソースを追加する。2つ目以降はシータ結合になる。
    pub fn from(mut self, source: &impl EntityPath) -> Self {
        if !self.descriptor.from.is_empty() {
            warn!(
                alias = source.alias(),
                "theta join: cross product filtered only by WHERE, relation integrity is not enforced"
            );
        }
        self.descriptor.add_source(source.source());
        self
    }

    /// 関連を辿る内部結合
    pub fn join<E: EntityPath>(mut self, relation: &RelationPath<E>, target: &E) -> Self {
        self.descriptor
            .add_join(JoinType::Inner, target.source(), Some(relation.join_relation()));
        self
    }

    /// 関連を辿る外部結合
    pub fn left_join<E: EntityPath>(mut self, relation: &RelationPath<E>, target: &E) -> Self {
        self.descriptor
            .add_join(JoinType::Left, target.source(), Some(relation.join_relation()));
        self
    }

    /// 関連のないエンティティとの内部結合。`on` が必須。
    pub fn join_entity(mut self, target: &impl EntityPath) -> Self {
        self.descriptor.add_join(JoinType::Inner, target.source(), None);
        self
    }

    /// 関連のないエンティティとの外部結合。`on` が必須。
    pub fn left_join_entity(mut self, target: &impl EntityPath) -> Self {
        self.descriptor.add_join(JoinType::Left, target.source(), None);
        self
    }

    /// 直前の結合の結合条件。WHERE と違い、LEFT JOIN の駆動側の行は落とさない。
    pub fn on(mut self, predicates: impl IntoPredicates) -> Self {
        self.descriptor.add_join_condition(predicates.into_predicates());
        self
    }

    /// 直前の結合をフェッチジョインにする
    pub fn fetch_join(mut self) -> Self {
        self.descriptor.mark_fetch_join();
        self
    }

    /// 複数の条件は引数順のANDになる。`None` は読み飛ばされる。
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

    pub fn order_by(mut self, specifiers: impl IntoOrderSpecifiers) -> Self {
        self.descriptor
            .order_by
            .extend(specifiers.into_order_specifiers());
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.descriptor.offset = Some(offset);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.descriptor.limit = Some(limit);
        self
    }

    pub fn distinct(mut self) -> Self {
        self.descriptor.distinct = true;
        self
    }

    /// 組み立て中の記述子（未検証）
    pub fn descriptor(&self) -> &QueryDescriptor {
        &self.descriptor
    }

    /// 検証して記述子を返す。構築時エラーはここで報告される。
    pub fn build(&self) -> std::result::Result<&QueryDescriptor, BuildError> {
        self.descriptor.validate()?;
        self.projection.validate()?;
        Ok(&self.descriptor)
    }

    fn project_rows(&self, rows: Vec<Vec<Cell>>) -> Result<Vec<P::Output>> {
        let context = self.executor.persistence_context();
        rows.into_iter()
            .map(|cells| self.projection.project(cells, context).map_err(Error::from))
            .collect()
    }

    /// 結果をすべて取得する
    pub fn fetch(self) -> Result<Vec<P::Output>> {
        let descriptor = self.build()?;
        let rows = self.executor.execute(descriptor)?;
        debug!(rows = rows.len(), "fetched");
        self.project_rows(rows)
    }

    /// 結果を1件取得する。0件なら `None`、2件以上なら `TooManyResults`。
    pub fn fetch_one(self) -> Result<Option<P::Output>> {
        let descriptor = self.build()?;
        let rows = self.executor.execute(descriptor)?;
        if rows.len() > 1 {
            return Err(Error::TooManyResults(rows.len()));
        }
        Ok(self.project_rows(rows)?.pop())
    }

    /// 先頭の1件を取得する (`limit(1).fetch_one()`)
    pub fn fetch_first(self) -> Result<Option<P::Output>> {
        self.limit(1).fetch_one()
    }

    /// ページングを無視した件数
    pub fn fetch_count(self) -> Result<u64> {
        let descriptor = self.build()?;
        Ok(self.executor.count(descriptor)?)
    }

    /// ページングされた結果と総件数を取得する
    pub fn fetch_results(self) -> Result<QueryResults<P::Output>> {
        let descriptor = self.build()?;
        let total = self.executor.count(descriptor)?;
        let offset = descriptor.offset.unwrap_or(0);
        let limit = descriptor.limit;
        let rows = self.executor.execute(descriptor)?;
        let results = self.project_rows(rows)?;
        Ok(QueryResults {
            results,
            total,
            offset,
            limit,
        })
    }
}
