use tracing::debug;

use crate::domain::entity::Value;
use crate::domain::model::Entity;
use crate::domain::query::projection::validate_arguments;
use crate::domain::query::{
    BuildError, Cell, EntityProjection, Expression, FromArguments, Projection, Projections,
    QueryDescriptor, QueryExecutor, Tuple,
};
use crate::infrastructure::parser::sql_parser::ParsedQuery;
use crate::{Error, Result};

/// 解析済みのテキストクエリ (`TypedQuery`)
///
/// パラメータを束縛してから `get_*` で実行する。実行前に型付きクエリと同じ検証を通す。
pub struct TextQuery<'s> {
    executor: &'s dyn QueryExecutor,
    descriptor: QueryDescriptor,
    constructor: Option<String>,
}

impl<'s> TextQuery<'s> {
    pub fn new(executor: &'s dyn QueryExecutor, parsed: ParsedQuery) -> Self {
        Self {
            executor,
            descriptor: parsed.descriptor,
            constructor: parsed.constructor,
        }
    }

    /// `:name` に値を束縛する
    pub fn set_parameter(mut self, name: &str, value: impl Into<Value>) -> Self {
        let value = value.into();
        self.descriptor.bind_parameter(name.trim_start_matches(':'), &value);
        self
    }

    pub fn descriptor(&self) -> &QueryDescriptor {
        &self.descriptor
    }

    fn rows(&self) -> Result<Vec<Vec<Cell>>> {
        self.descriptor.validate()?;
        let rows = self.executor.execute(&self.descriptor)?;
        debug!(rows = rows.len(), "text query fetched");
        Ok(rows)
    }

    /// 選択句がエンティティ `E` の別名1つだけであることを確かめる
    fn entity_projection<E: Entity>(&self) -> Result<EntityProjection<E>> {
        match self.descriptor.projection() {
            [Expression::Entity(entity)] if entity.entity == E::ENTITY_NAME => {
                Ok(EntityProjection::new(entity.alias.clone()))
            }
            _ => Err(BuildError::ProjectionMismatch(format!(
                "'{}' does not select a single {}",
                self.descriptor,
                E::ENTITY_NAME
            ))
            .into()),
        }
    }

    /// エンティティの一覧 (`getResultList`)
    pub fn get_result_list<E: Entity>(&self) -> Result<Vec<E>> {
        let projection = self.entity_projection::<E>()?;
        let context = self.executor.persistence_context();
        self.rows()?
            .into_iter()
            .map(|cells| projection.project(cells, context).map_err(Error::from))
            .collect()
    }

    /// 結果を1件取得する。0件なら `None`、2件以上なら `TooManyResults`。
    pub fn get_single_result<E: Entity>(&self) -> Result<Option<E>> {
        let mut results = self.get_result_list::<E>()?;
        if results.len() > 1 {
            return Err(Error::TooManyResults(results.len()));
        }
        Ok(results.pop())
    }

    /// 選択した式ごとの値を持つタプルの一覧
    pub fn get_tuples(&self) -> Result<Vec<Tuple>> {
        let context = self.executor.persistence_context();
        Ok(self
            .rows()?
            .into_iter()
            .map(|cells| Tuple::project(self.descriptor.projection().to_vec(), cells, context))
            .collect())
    }

    /// `select new X(..)` の結果をDTOとして取得する
    ///
    /// コンストラクタ名の末尾が `D` の型名と一致し、引数の数と型が合っている必要がある。
    pub fn get_result_list_as<D: FromArguments>(&self) -> Result<Vec<D>> {
        let name = self.constructor.as_deref().ok_or_else(|| {
            BuildError::ProjectionMismatch("the query has no constructor expression".to_string())
        })?;
        let expected = short_name(std::any::type_name::<D>());
        if short_name(name) != expected {
            return Err(BuildError::ProjectionMismatch(format!(
                "constructor '{}' does not create {}",
                name, expected
            ))
            .into());
        }
        validate_arguments::<D>(self.descriptor.projection())?;

        let projection = Projections::constructor::<D>(self.descriptor.projection().to_vec());
        let context = self.executor.persistence_context();
        self.rows()?
            .into_iter()
            .map(|cells| projection.project(cells, context).map_err(Error::from))
            .collect()
    }
}

/// `a.b.MemberDto` や `crate::x::MemberDto` の末尾の名前
fn short_name(path: &str) -> &str {
    path.rsplit(|c| c == '.' || c == ':').next().unwrap_or(path)
}
