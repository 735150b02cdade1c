use serde::de::DeserializeOwned;
use std::fmt;
use std::marker::PhantomData;

use crate::domain::entity::{DataType, Row, Value, ValueError};
use crate::domain::model::{Entity, PersistenceContext};
use crate::domain::query::error::{BuildError, ExecutionError};
use crate::domain::query::expression::{EntityRef, Expression};
use crate::domain::query::path::Expr;
use crate::domain::query::subquery::SubQuery;
use crate::domain::query::tuple::Tuple;
use crate::domain::query::value_type::ValueType;

/// エンティティとして選択された行
///
/// `fetched` にはフェッチジョインで同時に読み込まれた関連先の行が入る。
/// LEFT のフェッチジョインで相手がいなかった場合は `None`。
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRow {
    pub table: String,
    pub row: Row,
    pub fetched: Vec<(&'static str, Option<Row>)>,
}

impl EntityRow {
    pub fn new(table: impl Into<String>, row: Row) -> Self {
        Self {
            table: table.into(),
            row,
            fetched: Vec::new(),
        }
    }

    /// フェッチジョインされた関連の行。フェッチされていなければ `None`。
    pub fn fetched(&self, field: &str) -> Option<Option<&Row>> {
        self.fetched
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, row)| row.as_ref())
    }
}

/// 結果行の1セル
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Scalar(Value),
    /// エンティティ全体。LEFT JOIN で相手がいなければ `None`。
    Entity(Option<EntityRow>),
}

impl Cell {
    /// スカラー値として取り出す
    pub fn into_value(self) -> Result<Value, ExecutionError> {
        match self {
            Cell::Scalar(value) => Ok(value),
            Cell::Entity(_) => Err(ExecutionError::Projection(
                "an entity was selected where a scalar value is expected".to_string(),
            )),
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Cell::Scalar(value) => Some(value),
            Cell::Entity(_) => None,
        }
    }

    pub fn as_entity(&self) -> Option<&EntityRow> {
        match self {
            Cell::Entity(row) => row.as_ref(),
            Cell::Scalar(_) => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Scalar(value) => write!(f, "{}", value),
            Cell::Entity(Some(entity)) => match entity.row.id() {
                Some(id) => write!(f, "{}#{}", entity.table, id),
                None => write!(f, "{}#?", entity.table),
            },
            Cell::Entity(None) => write!(f, "NULL"),
        }
    }
}

/// 選択句に置ける式
pub trait Selectable {
    fn select_expression(&self) -> Expression;
}

impl<T> Selectable for Expr<T> {
    fn select_expression(&self) -> Expression {
        self.expression().clone()
    }
}

impl<T> Selectable for SubQuery<T> {
    fn select_expression(&self) -> Expression {
        Expression::Subquery(Box::new(self.descriptor().clone()))
    }
}

impl<S: Selectable + ?Sized> Selectable for &S {
    fn select_expression(&self) -> Expression {
        (**self).select_expression()
    }
}

/// 結果行の形
///
/// 選択する式の並びと、結果行（式ごとのセル）から出力値への変換を定める。
pub trait Projection {
    type Output;

    fn expressions(&self) -> Vec<Expression>;

    /// 射影に固有の構築時検証（DTOの別名や引数の数など）
    fn validate(&self) -> Result<(), BuildError> {
        Ok(())
    }

    fn project(
        &self,
        cells: Vec<Cell>,
        context: &dyn PersistenceContext,
    ) -> Result<Self::Output, ExecutionError>;
}

impl<P: Projection + ?Sized> Projection for &P {
    type Output = P::Output;

    fn expressions(&self) -> Vec<Expression> {
        (**self).expressions()
    }

    fn validate(&self) -> Result<(), BuildError> {
        (**self).validate()
    }

    fn project(
        &self,
        cells: Vec<Cell>,
        context: &dyn PersistenceContext,
    ) -> Result<Self::Output, ExecutionError> {
        (**self).project(cells, context)
    }
}

fn single_cell(cells: Vec<Cell>) -> Result<Cell, ExecutionError> {
    let width = cells.len();
    let mut cells = cells.into_iter();
    match (cells.next(), cells.next()) {
        (Some(cell), None) => Ok(cell),
        _ => Err(ExecutionError::Projection(format!(
            "expected a single column but the row has {}",
            width
        ))),
    }
}

impl<T: ValueType> Projection for Expr<T> {
    type Output = Option<T>;

    fn expressions(&self) -> Vec<Expression> {
        vec![self.expression().clone()]
    }

    fn project(
        &self,
        cells: Vec<Cell>,
        _context: &dyn PersistenceContext,
    ) -> Result<Self::Output, ExecutionError> {
        let value = single_cell(cells)?.into_value()?;
        Ok(T::from_value(&value)?)
    }
}

/// エンティティ全体の射影 (`select(member)`)
#[derive(Debug, Clone)]
pub struct EntityProjection<E> {
    alias: String,
    marker: PhantomData<fn() -> E>,
}

impl<E: Entity> EntityProjection<E> {
    pub fn new(alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            marker: PhantomData,
        }
    }

    pub fn expression(&self) -> Expression {
        Expression::Entity(EntityRef {
            alias: self.alias.clone(),
            entity: E::ENTITY_NAME.to_string(),
            table: E::TABLE_NAME.to_string(),
        })
    }
}

impl<E: Entity> Projection for EntityProjection<E> {
    type Output = E;

    fn expressions(&self) -> Vec<Expression> {
        vec![self.expression()]
    }

    fn project(
        &self,
        cells: Vec<Cell>,
        context: &dyn PersistenceContext,
    ) -> Result<Self::Output, ExecutionError> {
        match single_cell(cells)? {
            Cell::Entity(Some(row)) => E::hydrate(&row, context),
            Cell::Entity(None) => Err(ExecutionError::Projection(format!(
                "{} '{}' is absent in this row",
                E::ENTITY_NAME,
                self.alias
            ))),
            Cell::Scalar(_) => Err(ExecutionError::Projection(format!(
                "expected {} but a scalar value was selected",
                E::ENTITY_NAME
            ))),
        }
    }
}

/// 複数の式を並べた選択リスト（DTO射影の引数）
pub trait SelectList {
    fn into_expressions(self) -> Vec<Expression>;
}

impl SelectList for Vec<Expression> {
    fn into_expressions(self) -> Vec<Expression> {
        self
    }
}

macro_rules! impl_tuple_projection {
    ($($name:ident),+) => {
        impl<$($name: Selectable),+> SelectList for ($($name,)+) {
            #[allow(non_snake_case)]
            fn into_expressions(self) -> Vec<Expression> {
                let ($($name,)+) = self;
                vec![$($name.select_expression()),+]
            }
        }

        impl<$($name: Selectable),+> Projection for ($($name,)+) {
            type Output = Tuple;

            #[allow(non_snake_case)]
            fn expressions(&self) -> Vec<Expression> {
                let ($($name,)+) = self;
                vec![$($name.select_expression()),+]
            }

            fn project(
                &self,
                cells: Vec<Cell>,
                context: &dyn PersistenceContext,
            ) -> Result<Self::Output, ExecutionError> {
                Ok(Tuple::project(self.expressions(), cells, context))
            }
        }
    };
}

impl_tuple_projection!(A, B);
impl_tuple_projection!(A, B, C);
impl_tuple_projection!(A, B, C, D);
impl_tuple_projection!(A, B, C, D, E);
impl_tuple_projection!(A, B, C, D, E, F);

/// コンストラクタ射影の位置引数
#[derive(Debug)]
pub struct Arguments {
    values: std::vec::IntoIter<Value>,
    position: usize,
}

impl Arguments {
    pub fn new(values: Vec<Value>) -> Self {
        Self {
            values: values.into_iter(),
            position: 0,
        }
    }

    /// 次の引数を取り出す。NULLは `None`。
    pub fn next<T: ValueType>(&mut self) -> Result<Option<T>, ValueError> {
        self.position += 1;
        match self.values.next() {
            Some(value) => T::from_value(&value),
            None => Err(ValueError::ConversionError(
                format!("argument #{}", self.position),
                "missing".to_string(),
            )),
        }
    }

    /// NULLを許さない引数を取り出す
    pub fn required<T: ValueType>(&mut self) -> Result<T, ValueError> {
        self.next()?.ok_or(ValueError::NullValueNotAllowed)
    }
}

/// 位置引数から組み立てられるDTO (`Projections.constructor`)
pub trait FromArguments: Sized {
    /// 宣言順の引数の型
    fn parameter_types() -> Vec<DataType>;

    fn from_arguments(arguments: &mut Arguments) -> Result<Self, ValueError>;
}

/// 既定値から作ってプロパティを1つずつ設定するDTO (`Projections.bean`)
pub trait Bean: Default {
    /// プロパティを設定する。該当するプロパティがなければ `Ok(false)`。
    fn set_property(&mut self, name: &str, value: Value) -> Result<bool, ValueError>;
}

/// DTO射影のファクトリ
pub struct Projections;

impl Projections {
    /// セッター経由で設定する
    pub fn bean<D: Bean>(items: impl SelectList) -> BeanProjection<D> {
        BeanProjection {
            expressions: items.into_expressions(),
            marker: PhantomData,
        }
    }

    /// フィールドに直接設定する（serde のデシリアライズを使う）
    pub fn fields<D: DeserializeOwned>(items: impl SelectList) -> FieldsProjection<D> {
        FieldsProjection {
            expressions: items.into_expressions(),
            marker: PhantomData,
        }
    }

    /// 宣言順・型が一致するコンストラクタで組み立てる
    pub fn constructor<D: FromArguments>(items: impl SelectList) -> ConstructorProjection<D> {
        ConstructorProjection {
            expressions: items.into_expressions(),
            marker: PhantomData,
        }
    }
}

fn require_names(expressions: &[Expression]) -> Result<(), BuildError> {
    match expressions.iter().position(|expr| expr.name().is_none()) {
        Some(index) => Err(BuildError::MissingAlias { position: index + 1 }),
        None => Ok(()),
    }
}

fn named_values(
    expressions: &[Expression],
    cells: Vec<Cell>,
) -> Result<Vec<(String, Value)>, ExecutionError> {
    expressions
        .iter()
        .zip(cells)
        .map(|(expr, cell)| {
            let name = expr.name().unwrap_or_default().to_string();
            Ok((name, cell.into_value()?))
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct BeanProjection<D> {
    expressions: Vec<Expression>,
    marker: PhantomData<fn() -> D>,
}

impl<D: Bean> Projection for BeanProjection<D> {
    type Output = D;

    fn expressions(&self) -> Vec<Expression> {
        self.expressions.clone()
    }

    fn validate(&self) -> Result<(), BuildError> {
        require_names(&self.expressions)
    }

    fn project(
        &self,
        cells: Vec<Cell>,
        _context: &dyn PersistenceContext,
    ) -> Result<Self::Output, ExecutionError> {
        let mut dto = D::default();
        for (name, value) in named_values(&self.expressions, cells)? {
            // 対応するセッターがないプロパティは無視する
            dto.set_property(&name, value)?;
        }
        Ok(dto)
    }
}

#[derive(Debug, Clone)]
pub struct FieldsProjection<D> {
    expressions: Vec<Expression>,
    marker: PhantomData<fn() -> D>,
}

impl<D: DeserializeOwned> Projection for FieldsProjection<D> {
    type Output = D;

    fn expressions(&self) -> Vec<Expression> {
        self.expressions.clone()
    }

    fn validate(&self) -> Result<(), BuildError> {
        require_names(&self.expressions)
    }

    fn project(
        &self,
        cells: Vec<Cell>,
        _context: &dyn PersistenceContext,
    ) -> Result<Self::Output, ExecutionError> {
        let fields: serde_json::Map<String, serde_json::Value> = named_values(&self.expressions, cells)?
            .into_iter()
            .map(|(name, value)| (name, value.to_json()))
            .collect();
        serde_json::from_value(serde_json::Value::Object(fields))
            .map_err(|e| ExecutionError::Projection(e.to_string()))
    }
}

#[derive(Debug, Clone)]
pub struct ConstructorProjection<D> {
    expressions: Vec<Expression>,
    marker: PhantomData<fn() -> D>,
}

impl<D: FromArguments> Projection for ConstructorProjection<D> {
    type Output = D;

    fn expressions(&self) -> Vec<Expression> {
        self.expressions.clone()
    }

    fn validate(&self) -> Result<(), BuildError> {
        validate_arguments::<D>(&self.expressions)
    }

    fn project(
        &self,
        cells: Vec<Cell>,
        _context: &dyn PersistenceContext,
    ) -> Result<Self::Output, ExecutionError> {
        let values = cells
            .into_iter()
            .map(Cell::into_value)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(D::from_arguments(&mut Arguments::new(values))?)
    }
}

/// コンストラクタの引数の数と型を選択式と照合する
pub(crate) fn validate_arguments<D: FromArguments>(expressions: &[Expression]) -> Result<(), BuildError> {
    let expected = D::parameter_types();
    if expected.len() != expressions.len() {
        return Err(BuildError::ConstructorArity {
            expected: expected.len(),
            actual: expressions.len(),
        });
    }
    for (index, (expected, expr)) in expected.iter().zip(expressions).enumerate() {
        if let Some(actual) = expr.data_type() {
            if !expected.is_comparable_with(actual) {
                return Err(BuildError::ConstructorArgumentType {
                    position: index + 1,
                    expected: *expected,
                    actual,
                });
            }
        }
    }
    Ok(())
}
