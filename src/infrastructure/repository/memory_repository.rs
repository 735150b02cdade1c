use std::sync::Arc;
use async_trait::async_trait;
use tracing::debug;

use crate::config::SessionConfig;
use crate::domain::metamodel::QMember;
use crate::domain::model::Member;
use crate::domain::repository::{MemberRepository, RepositoryError};
use crate::infrastructure::session::Session;
use crate::infrastructure::storage::MemoryStorage;

/// インメモリの会員リポジトリ
///
/// 呼び出しごとにセッションを開くため、返される会員の関連は管理中のチームがなければ未ロードになる。
pub struct MemoryMemberRepository {
    storage: Arc<MemoryStorage>,
    config: SessionConfig,
}

impl MemoryMemberRepository {
    pub fn new(storage: Arc<MemoryStorage>) -> Self {
        Self::with_config(storage, SessionConfig::default())
    }

    pub fn with_config(storage: Arc<MemoryStorage>, config: SessionConfig) -> Self {
        Self { storage, config }
    }

    fn session(&self) -> Result<Session, RepositoryError> {
        Ok(Session::open(Arc::clone(&self.storage), self.config.clone())?)
    }
}

#[async_trait]
impl MemberRepository for MemoryMemberRepository {
    async fn save(&self, mut member: Member) -> Result<Member, RepositoryError> {
        let session = self.session()?;
        session.merge(&mut member)?;
        session.flush()?;
        debug!(id = ?member.id, "member saved");
        Ok(member)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Member>, RepositoryError> {
        Ok(self.session()?.find::<Member>(id)?)
    }

    async fn find_all(&self) -> Result<Vec<Member>, RepositoryError> {
        let session = self.session()?;
        let member = QMember::member();
        Ok(session
            .query_factory()
            .select_from(&member)
            .order_by(member.id.asc())
            .fetch()?)
    }

    async fn find_by_username(&self, username: &str) -> Result<Vec<Member>, RepositoryError> {
        let session = self.session()?;
        let member = QMember::member();
        Ok(session
            .query_factory()
            .select_from(&member)
            .where_(member.username.eq(username))
            .order_by(member.id.asc())
            .fetch()?)
    }
}
