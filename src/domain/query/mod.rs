pub mod builder;
pub mod case;
pub mod descriptor;
pub mod error;
pub mod expression;
pub mod expressions;
pub mod order;
pub mod parameter;
pub mod path;
pub mod predicate;
pub mod projection;
pub mod subquery;
pub mod tuple;
pub mod validate;
pub mod value_type;

pub use builder::{Query, QueryExecutor, QueryFactory, QueryResults};
pub use case::{CaseBuilder, CaseKey, CaseThen, CaseWhen};
pub use descriptor::{JoinClause, JoinRelation, JoinType, QueryDescriptor, Source};
pub use error::{BuildError, ExecutionError};
pub use expression::{AggregateFunction, CaseBranch, ColumnRef, EntityRef, Expression};
pub use order::{IntoOrderSpecifiers, NullHandling, Order, OrderSpecifier};
pub use path::{Expr, IntoOperand};
pub use predicate::{ComparisonOperator, IntoPredicates, Predicate};
pub use projection::{
    Arguments, Bean, BeanProjection, Cell, ConstructorProjection, EntityProjection, EntityRow,
    FieldsProjection, FromArguments, Projection, Projections, SelectList, Selectable,
};
pub use subquery::SubQuery;
pub use tuple::Tuple;
pub use value_type::{Numeric, Ordered, ValueType};
