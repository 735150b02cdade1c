//! 組み立て済みのクエリ記述子をデータ源に対して評価する実行エンジン
//!
//! 評価は次の順に進む: FROM の直積 → 結合 → WHERE → グループ化と HAVING →
//! 射影 → ORDER BY → DISTINCT → OFFSET/LIMIT。

pub mod functions;
mod eval;

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::trace;

use crate::domain::entity::{Row, Value};
use crate::domain::model::RelationKind;
use crate::domain::query::{
    Cell, EntityRow, ExecutionError, Expression, JoinClause, JoinType, QueryDescriptor,
};
use crate::domain::repository::DataSource;

/// 結合途中の1行。FROM/JOIN の宣言順に各エイリアスの行を並べたもの。
/// LEFT JOIN で相手がいなければ `None`。
type Binding = Vec<Option<Rc<Row>>>;

/// 式を評価するときの名前解決の文脈
///
/// 相関サブクエリは `parent` を辿って外側のエイリアスを参照する。
#[derive(Clone, Copy)]
struct Scope<'a> {
    query: &'a QueryDescriptor,
    binding: &'a [Option<Rc<Row>>],
    /// 集約中のグループ。集約関数はこの行の集合に対して評価される。
    group: Option<&'a [Binding]>,
    parent: Option<&'a Scope<'a>>,
}

impl<'a> Scope<'a> {
    /// エイリアスに束縛された行。外側の `None` はエイリアスが見つからないことを表す。
    fn lookup(&self, alias: &str) -> Option<Option<&'a Rc<Row>>> {
        match self.query.aliases().position(|candidate| candidate == alias) {
            Some(index) => Some(self.binding.get(index).and_then(Option::as_ref)),
            None => self.parent.and_then(|parent| parent.lookup(alias)),
        }
    }
}

/// クエリ実行エンジン
///
/// テーブルの読み込みは1回の実行の間キャッシュされる（相関サブクエリが行ごとに
/// 評価されても同じテーブルを読み直さない）。
pub struct QueryEngine<'d> {
    source: &'d dyn DataSource,
    tables: RefCell<HashMap<String, Rc<Vec<Rc<Row>>>>>,
}

impl<'d> QueryEngine<'d> {
    pub fn new(source: &'d dyn DataSource) -> Self {
        Self {
            source,
            tables: RefCell::new(HashMap::new()),
        }
    }

    /// 結果行を返す。並び順・DISTINCT・ページングは適用済み。
    pub fn execute(&self, query: &QueryDescriptor) -> Result<Vec<Vec<Cell>>, ExecutionError> {
        self.select(query, None, true)
    }

    /// ページングを無視した結果行数
    pub fn count(&self, query: &QueryDescriptor) -> Result<u64, ExecutionError> {
        Ok(self.select(query, None, false)?.len() as u64)
    }

    fn scan(&self, table: &str) -> Result<Rc<Vec<Rc<Row>>>, ExecutionError> {
        if let Some(rows) = self.tables.borrow().get(table) {
            return Ok(Rc::clone(rows));
        }
        let rows: Rc<Vec<Rc<Row>>> = Rc::new(self.source.scan(table)?.into_iter().map(Rc::new).collect());
        trace!(table, rows = rows.len(), "scan");
        self.tables.borrow_mut().insert(table.to_string(), Rc::clone(&rows));
        Ok(rows)
    }

    fn select(
        &self,
        query: &QueryDescriptor,
        parent: Option<&Scope<'_>>,
        paged: bool,
    ) -> Result<Vec<Vec<Cell>>, ExecutionError> {
        let mut bindings = self.cross_product(query)?;
        for (index, join) in query.joins.iter().enumerate() {
            bindings = self.join(query, parent, bindings, index, join)?;
        }

        if let Some(filter) = &query.filter {
            let mut kept = Vec::with_capacity(bindings.len());
            for binding in bindings {
                let scope = Scope { query, binding: &binding, group: None, parent };
                if self.test(filter, &scope)? == Some(true) {
                    kept.push(binding);
                }
            }
            bindings = kept;
        }

        // 射影した行と、そのソートキー
        let mut rows: Vec<(Vec<Cell>, Vec<Value>)> = Vec::new();
        if query.is_aggregating() {
            for group in self.group(query, parent, bindings)? {
                let first = group.first().cloned().unwrap_or_default();
                let scope = Scope { query, binding: &first, group: Some(&group), parent };
                if let Some(having) = &query.having {
                    if self.test(having, &scope)? != Some(true) {
                        continue;
                    }
                }
                rows.push(self.project(query, &scope)?);
            }
        } else {
            for binding in &bindings {
                let scope = Scope { query, binding, group: None, parent };
                rows.push(self.project(query, &scope)?);
            }
        }

        if !query.order_by.is_empty() {
            // 安定ソートなので、キーが等しい行は元の順序を保つ
            rows.sort_by(|(_, left), (_, right)| {
                query
                    .order_by
                    .iter()
                    .zip(left.iter().zip(right))
                    .map(|(specifier, (l, r))| specifier.compare(l, r))
                    .find(|ordering| *ordering != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            });
        }

        let mut cells: Vec<Vec<Cell>> = rows.into_iter().map(|(cells, _)| cells).collect();
        if query.distinct {
            let mut unique: Vec<Vec<Cell>> = Vec::with_capacity(cells.len());
            for row in cells {
                if !unique.contains(&row) {
                    unique.push(row);
                }
            }
            cells = unique;
        }

        if paged {
            // usize に収まらない値は上限として扱う
            let offset = query.offset.map_or(0, |offset| usize::try_from(offset).unwrap_or(usize::MAX));
            let limit = query.limit.map_or(usize::MAX, |limit| usize::try_from(limit).unwrap_or(usize::MAX));
            cells = cells.into_iter().skip(offset).take(limit).collect();
        }
        Ok(cells)
    }

    /// FROM に並んだソースの直積
    fn cross_product(&self, query: &QueryDescriptor) -> Result<Vec<Binding>, ExecutionError> {
        let mut bindings: Vec<Binding> = vec![Vec::new()];
        for source in &query.from {
            let rows = self.scan(&source.table.name)?;
            bindings = bindings
                .into_iter()
                .flat_map(|binding| {
                    rows.iter().map(move |row| {
                        let mut extended = binding.clone();
                        extended.push(Some(Rc::clone(row)));
                        extended
                    })
                })
                .collect();
        }
        Ok(bindings)
    }

    fn join(
        &self,
        query: &QueryDescriptor,
        parent: Option<&Scope<'_>>,
        bindings: Vec<Binding>,
        index: usize,
        join: &JoinClause,
    ) -> Result<Vec<Binding>, ExecutionError> {
        let candidates = self.scan(&join.target.table.name)?;
        let source_index = join.relation.as_ref().and_then(|relation| {
            query
                .aliases()
                .position(|alias| alias == relation.source_alias)
        });

        let mut joined = Vec::with_capacity(bindings.len());
        for binding in bindings {
            let mut matched = false;
            for candidate in candidates.iter() {
                if let Some(relation) = &join.relation {
                    let source = source_index.and_then(|i| binding.get(i)).and_then(Option::as_ref);
                    if !relates(source, candidate, relation.meta.kind, relation.meta.join_column) {
                        continue;
                    }
                }

                let mut extended = binding.clone();
                extended.push(Some(Rc::clone(candidate)));
                if let Some(on) = &join.on {
                    let scope = Scope { query, binding: &extended, group: None, parent };
                    if self.test(on, &scope)? != Some(true) {
                        continue;
                    }
                }
                matched = true;
                joined.push(extended);
            }

            if !matched && join.join_type == JoinType::Left {
                let mut extended = binding;
                extended.push(None);
                joined.push(extended);
            }
        }
        trace!(join = index, alias = %join.target.alias, rows = joined.len(), "join");
        Ok(joined)
    }

    /// GROUP BY のキーで行をまとめる。グループは最初に現れた順に並ぶ。
    ///
    /// GROUP BY がなければ全体が1つのグループになる（0行でも1グループ）。
    fn group(
        &self,
        query: &QueryDescriptor,
        parent: Option<&Scope<'_>>,
        bindings: Vec<Binding>,
    ) -> Result<Vec<Vec<Binding>>, ExecutionError> {
        if query.group_by.is_empty() {
            return Ok(vec![bindings]);
        }

        let mut groups: Vec<(Vec<Value>, Vec<Binding>)> = Vec::new();
        for binding in bindings {
            let scope = Scope { query, binding: &binding, group: None, parent };
            let key = query
                .group_by
                .iter()
                .map(|expr| self.eval(expr, &scope))
                .collect::<Result<Vec<_>, _>>()?;
            match groups.iter_mut().find(|(existing, _)| *existing == key) {
                Some((_, members)) => members.push(binding),
                None => groups.push((key, vec![binding])),
            }
        }
        Ok(groups.into_iter().map(|(_, members)| members).collect())
    }

    fn project(
        &self,
        query: &QueryDescriptor,
        scope: &Scope<'_>,
    ) -> Result<(Vec<Cell>, Vec<Value>), ExecutionError> {
        let cells = query
            .projection
            .iter()
            .map(|expr| match expr.unaliased() {
                Expression::Entity(entity) => Ok(Cell::Entity(self.entity_row(query, scope, &entity.alias))),
                other => self.eval(other, scope).map(Cell::Scalar),
            })
            .collect::<Result<Vec<_>, _>>()?;
        let keys = query
            .order_by
            .iter()
            .map(|specifier| self.eval(&specifier.target, scope))
            .collect::<Result<Vec<_>, _>>()?;
        Ok((cells, keys))
    }

    /// エンティティとして選択された行。フェッチジョインされた関連先も積み込む。
    fn entity_row(&self, query: &QueryDescriptor, scope: &Scope<'_>, alias: &str) -> Option<EntityRow> {
        let row = scope.lookup(alias).flatten()?;
        let source = query.source(alias)?;
        let mut entity = EntityRow::new(source.table.name.clone(), Row::clone(row));

        let offset = query.from.len();
        for (index, join) in query.joins.iter().enumerate() {
            let Some(relation) = join.relation.as_ref().filter(|r| join.fetch && r.source_alias == alias) else {
                continue;
            };
            let fetched = scope
                .binding
                .get(offset + index)
                .and_then(Option::as_ref)
                .map(|row| Row::clone(row));
            entity.fetched.push((relation.meta.field, fetched));
        }
        Some(entity)
    }
}

/// 関連で結ばれた2行か
fn relates(source: Option<&Rc<Row>>, target: &Row, kind: RelationKind, join_column: &str) -> bool {
    let Some(source) = source else {
        return false;
    };
    match kind {
        // 外部キーは関連元の行にある
        RelationKind::ManyToOne => match (source.get(join_column), target.id()) {
            (Some(Value::Integer(fk)), Some(id)) => *fk == id,
            _ => false,
        },
        // 外部キーは関連先の行にある
        RelationKind::OneToMany => match (target.get(join_column), source.id()) {
            (Some(Value::Integer(fk)), Some(id)) => *fk == id,
            _ => false,
        },
    }
}
