use itertools::Itertools;
use std::fmt;

use crate::domain::entity::{Row, Value};
use crate::domain::metamodel::EntityPath;
use crate::domain::model::{Entity, PersistenceContext};
use crate::domain::query::error::ExecutionError;
use crate::domain::query::expression::Expression;
use crate::domain::query::path::Expr;
use crate::domain::query::projection::Cell;
use crate::domain::query::value_type::ValueType;

/// 異なる型の値を並べた結果行
///
/// 値は選択に使った式そのもので引き当てる（`tuple.get(&member.age.avg())`）。
/// 同じ式を組み立て直しても構造的に等しければ同じ列が返る。
#[derive(Debug, Clone, PartialEq)]
pub struct Tuple {
    expressions: Vec<Expression>,
    cells: Vec<Cell>,
}

/// タプル内のエンティティ同士で関連を解決するための文脈
struct TupleContext<'a> {
    cells: &'a [Cell],
}

impl PersistenceContext for TupleContext<'_> {
    fn register(&self, _table: &str, _row: &Row) {}

    fn managed(&self, table: &str, id: i64) -> Option<Row> {
        self.cells
            .iter()
            .filter_map(Cell::as_entity)
            .find(|entity| entity.table == table && entity.row.id() == Some(id))
            .map(|entity| entity.row.clone())
    }
}

impl Tuple {
    pub fn new(expressions: Vec<Expression>, cells: Vec<Cell>) -> Self {
        Self { expressions, cells }
    }

    /// 結果行からタプルを作り、含まれるエンティティを永続化コンテキストに登録する
    pub(crate) fn project(
        expressions: Vec<Expression>,
        cells: Vec<Cell>,
        context: &dyn PersistenceContext,
    ) -> Self {
        for entity in cells.iter().filter_map(Cell::as_entity) {
            context.register(&entity.table, &entity.row);
        }
        Self::new(expressions, cells)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn expressions(&self) -> &[Expression] {
        &self.expressions
    }

    fn position(&self, expression: &Expression) -> Option<usize> {
        self.expressions
            .iter()
            .position(|candidate| candidate == expression)
            .or_else(|| {
                // 別名付きで選択した列は、別名なしの式でも引ける
                self.expressions
                    .iter()
                    .position(|candidate| candidate.unaliased() == expression.unaliased())
            })
    }

    /// 式に対応する値を取得する。選択されていない式やNULLは `None`。
    pub fn get<T: ValueType>(&self, expr: &Expr<T>) -> Option<T> {
        self.try_get(expr).ok().flatten()
    }

    pub fn try_get<T: ValueType>(&self, expr: &Expr<T>) -> Result<Option<T>, ExecutionError> {
        match self.position(expr.expression()) {
            Some(index) => self.try_get_at(index),
            None => Ok(None),
        }
    }

    /// 位置で値を取得する（テキストクエリの結果など、式が手元にない場合）
    pub fn get_at<T: ValueType>(&self, index: usize) -> Option<T> {
        self.try_get_at(index).ok().flatten()
    }

    fn try_get_at<T: ValueType>(&self, index: usize) -> Result<Option<T>, ExecutionError> {
        match self.cells.get(index) {
            Some(Cell::Scalar(value)) => Ok(T::from_value(value)?),
            Some(Cell::Entity(_)) => Err(ExecutionError::Projection(format!(
                "column #{} holds an entity",
                index + 1
            ))),
            None => Ok(None),
        }
    }

    pub fn value_at(&self, index: usize) -> Option<&Value> {
        self.cells.get(index).and_then(Cell::as_value)
    }

    /// エンティティを取得する。LEFT JOIN で相手がいなかった場合は `None`。
    pub fn get_entity<P: EntityPath>(&self, path: &P) -> Result<Option<P::Entity>, ExecutionError> {
        match self.position(&path.entity_expression()) {
            Some(index) => self.entity_at(index),
            None => Ok(None),
        }
    }

    pub fn entity_at<E: Entity>(&self, index: usize) -> Result<Option<E>, ExecutionError> {
        match self.cells.get(index) {
            Some(Cell::Entity(Some(row))) => {
                let context = TupleContext { cells: &self.cells };
                E::hydrate(row, &context).map(Some)
            }
            Some(Cell::Entity(None)) | None => Ok(None),
            Some(Cell::Scalar(_)) => Err(ExecutionError::Projection(format!(
                "column #{} holds a scalar value",
                index + 1
            ))),
        }
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.cells.iter().join(", "))
    }
}
