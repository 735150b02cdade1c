pub mod config;
pub mod domain;
pub mod infrastructure;

// RustyDSL version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

use crate::domain::query::{BuildError, ExecutionError};
use crate::domain::repository::StorageError;
use crate::infrastructure::parser::ParseError;

// Query result type
pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Query build error: {0}")]
    Build(#[from] BuildError),

    #[error("Query parsing error: {0}")]
    Parse(#[from] ParseError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Expected at most one result but found {0}")]
    TooManyResults(usize),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// クエリの組み立て段階のエラーか（実行前に検出されるもの）
    pub fn is_build_error(&self) -> bool {
        matches!(self, Error::Build(_) | Error::Parse(_))
    }
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        Error::Execution(ExecutionError::Storage(err))
    }
}

/// よく使う型とトレイトの再エクスポート
pub mod prelude {
    pub use crate::config::SessionConfig;
    pub use crate::domain::entity::{DataType, Row, Value};
    pub use crate::domain::metamodel::{EntityPath, QHello, QMember, QTeam};
    pub use crate::domain::model::{Entity, Hello, Lazy, Member, MemberDto, Team, UserDto};
    pub use crate::domain::query::expressions::{self, constant};
    pub use crate::domain::query::{
        BuildError, CaseBuilder, ExecutionError, Expr, Predicate, Projections, QueryFactory,
        QueryResults, Tuple,
    };
    pub use crate::domain::repository::{MemberRepository, StorageError};
    pub use crate::infrastructure::repository::MemoryMemberRepository;
    pub use crate::infrastructure::session::Session;
    pub use crate::infrastructure::storage::MemoryStorage;
    pub use crate::{Error, Result};
}
