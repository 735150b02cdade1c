use thiserror::Error;

use crate::domain::entity::{DataType, ValueError};
use crate::domain::repository::StorageError;

/// クエリ構築時のエラー
///
/// すべて実行前（`build`の時点）に検出される。実行時エラーとは区別され、
/// 呼び出し側はクエリ自体を修正する必要がある。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BuildError {
    #[error("query has no FROM source")]
    MissingFrom,

    #[error("query selects nothing")]
    EmptyProjection,

    #[error("alias '{alias}' is not reachable from the declared FROM/JOIN sources")]
    UnreachableAlias { alias: String },

    #[error("column '{column}' does not exist on '{alias}'")]
    UnknownColumn { alias: String, column: String },

    #[error("alias '{0}' is declared more than once (use a distinct alias for subqueries)")]
    AliasConflict(String),

    #[error("cannot compare {left} with {right}")]
    IncompatibleTypes { left: DataType, right: DataType },

    #[error("operation '{operation}' is not applicable to {data_type}")]
    InvalidOperand { operation: &'static str, data_type: DataType },

    #[error("ON condition given without a preceding join")]
    JoinConditionWithoutJoin,

    #[error("join to '{alias}' has no relation and no ON condition")]
    MissingJoinCondition { alias: String },

    #[error("fetch join requested for '{alias}' which is not joined through a relation")]
    FetchJoinWithoutRelation { alias: String },

    #[error("relation '{relation}' targets '{expected}' but was joined to '{actual}'")]
    RelationTargetMismatch { relation: String, expected: String, actual: String },

    #[error("projection argument #{position} has no name; alias it with as_(..)")]
    MissingAlias { position: usize },

    #[error("constructor expects {expected} arguments but {actual} were selected")]
    ConstructorArity { expected: usize, actual: usize },

    #[error("constructor argument #{position} expects {expected} but {actual} was selected")]
    ConstructorArgumentType { position: usize, expected: DataType, actual: DataType },

    #[error("scalar subquery must select exactly one column, found {0}")]
    SubqueryWidth(usize),

    #[error("parameter ':{0}' is not bound")]
    UnboundParameter(String),

    #[error("unknown entity '{0}'")]
    UnknownEntity(String),

    #[error("unknown field '{field}' on entity '{entity}'")]
    UnknownField { entity: String, field: String },

    #[error("query result shape does not match: {0}")]
    ProjectionMismatch(String),

    #[error("metamodel path '{path}' does not match the schema of '{table}'")]
    SchemaMismatch { table: String, path: String },
}

/// クエリ実行時のエラー
///
/// データストアの失敗 (`Storage`) は手を加えずにそのまま運ばれる。
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("scalar subquery returned {0} rows")]
    SubqueryCardinality(usize),

    #[error(transparent)]
    Value(#[from] ValueError),

    #[error("cannot map result row: {0}")]
    Projection(String),

    #[error("{entity} references a transient {target}; persist the {target} first")]
    TransientReference { entity: &'static str, target: &'static str },

    #[error("{entity} with id {id} not found")]
    EntityNotFound { entity: &'static str, id: i64 },

    #[error("parameter ':{0}' is not bound")]
    UnboundParameter(String),
}
