use async_trait::async_trait;

use crate::domain::model::Member;
use crate::Error;

#[derive(thiserror::Error, Debug)]
pub enum RepositoryError {
    #[error("Query error: {0}")]
    Query(#[from] Error),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<RepositoryError> for Error {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Query(inner) => inner,
            RepositoryError::InternalError(msg) => Error::Internal(msg),
        }
    }
}

/// 会員リポジトリ - `Member` の保存と取得のための抽象インターフェース
#[async_trait]
pub trait MemberRepository: Send + Sync {
    /// 会員を保存し、採番済みの会員を返す。保存済みの会員なら更新する。
    async fn save(&self, member: Member) -> Result<Member, RepositoryError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Member>, RepositoryError>;

    /// すべての会員を id 順に取得する
    async fn find_all(&self) -> Result<Vec<Member>, RepositoryError>;

    /// ユーザー名が一致する会員を id 順に取得する
    async fn find_by_username(&self, username: &str) -> Result<Vec<Member>, RepositoryError>;
}
