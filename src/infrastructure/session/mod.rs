//! 永続化の境界
//!
//! `Session` はエンティティの永続化・検索と、型付きクエリ・テキストクエリの実行を受け持つ。
//! 作業単位は1つのスレッドの中で使う想定で、ストレージは `Arc` で共有される。

pub mod context;

use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::config::SessionConfig;
use crate::domain::entity::Row;
use crate::domain::metamodel::{validate_standard_paths, QMember, QTeam};
use crate::domain::model::{Catalog, Entity, Lazy, Member, PersistenceContext, Team};
use crate::domain::query::{
    Cell, EntityRow, ExecutionError, QueryDescriptor, QueryExecutor, QueryFactory,
};
use crate::infrastructure::engine::QueryEngine;
use crate::infrastructure::parser::{QueryParser, TextQuery};
use crate::infrastructure::storage::MemoryStorage;
use crate::{Error, Result};

pub use context::{PendingWrite, SessionContext, WriteKind};

pub struct Session {
    storage: Arc<MemoryStorage>,
    config: SessionConfig,
    catalog: Catalog,
    context: SessionContext,
}

impl Session {
    /// 標準のエンティティ (`Hello` / `Team` / `Member`) でセッションを開く
    ///
    /// テーブルがなければ作成し、型付きパスがスキーマと一致するかを検証する。
    pub fn open(storage: Arc<MemoryStorage>, config: SessionConfig) -> Result<Self> {
        Self::with_catalog(storage, config, Catalog::standard())
    }

    pub fn with_catalog(storage: Arc<MemoryStorage>, config: SessionConfig, catalog: Catalog) -> Result<Self> {
        // 参照先のテーブルから作る（登録順）
        for entity in catalog.entities() {
            storage
                .create_table(entity.table.clone(), true)
                .map_err(ExecutionError::from)?;
        }
        validate_standard_paths()?;

        Ok(Self {
            storage,
            config,
            catalog,
            context: SessionContext::new(),
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn storage(&self) -> &Arc<MemoryStorage> {
        &self.storage
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    /// エンティティを管理下に置き、挿入を予約する。id はここで採番される。
    ///
    /// すでに管理中のエンティティなら挿入はせず、現在の内容で書き換えを予約する。
    pub fn persist<E: Entity>(&self, entity: &mut E) -> Result<()> {
        if self.contains(entity) {
            return self.merge(entity);
        }
        if entity.id().is_none() {
            let id = self
                .storage
                .next_id(E::TABLE_NAME)
                .map_err(ExecutionError::from)?;
            entity.set_id(id);
        }
        let row = entity.to_row()?;
        trace!(entity = E::ENTITY_NAME, id = ?entity.id(), "persist");
        self.context.queue_insert(E::TABLE_NAME, row);
        Ok(())
    }

    /// エンティティの内容を永続化コンテキストに反映する (`em.merge`)
    ///
    /// 管理中かストレージにある行なら更新を、どちらでもなければ挿入を予約する。
    pub fn merge<E: Entity>(&self, entity: &mut E) -> Result<()> {
        let known = match entity.id() {
            Some(id) => {
                self.context.is_managed(E::TABLE_NAME, id)
                    || self
                        .storage
                        .find_row(E::TABLE_NAME, id)
                        .map_err(ExecutionError::from)?
                        .is_some()
            }
            None => false,
        };
        if !known {
            return self.persist(entity);
        }
        let row = entity.to_row()?;
        trace!(entity = E::ENTITY_NAME, id = ?entity.id(), "merge");
        self.context.queue_update(E::TABLE_NAME, row);
        Ok(())
    }

    /// 予約された書き込みを予約順にストレージへ書き出す
    ///
    /// 途中で失敗した場合、失敗した行は管理対象から外れ、以降の行は予約に残る。
    pub fn flush(&self) -> Result<()> {
        Ok(self.flush_pending()?)
    }

    fn flush_pending(&self) -> std::result::Result<(), ExecutionError> {
        let pending = self.context.take_pending();
        if pending.is_empty() {
            return Ok(());
        }
        debug!(rows = pending.len(), "flush");
        let mut writes = pending.into_iter();
        while let Some(write) = writes.next() {
            let result = match write.kind {
                WriteKind::Insert => self.storage.insert_row(&write.table, write.row.clone()).map(|_| ()),
                WriteKind::Update => self.storage.update_row(&write.table, write.row.clone()),
            };
            if let Err(error) = result {
                warn!(table = %write.table, id = ?write.row.id(), %error, "flush failed");
                if let Some(id) = write.row.id() {
                    self.context.evict(&write.table, id);
                }
                self.context.restore_pending(writes.collect());
                return Err(error.into());
            }
        }
        Ok(())
    }

    /// 永続化コンテキストを空にする。書き出していない挿入も破棄される。
    pub fn clear(&self) {
        self.context.clear();
    }

    /// エンティティが管理下にあるか
    pub fn contains<E: Entity>(&self, entity: &E) -> bool {
        entity
            .id()
            .map_or(false, |id| self.context.is_managed(E::TABLE_NAME, id))
    }

    /// 主キーで検索する。管理中のエンティティがあればストレージを読まない。
    pub fn find<E: Entity>(&self, id: i64) -> Result<Option<E>> {
        let row = match self.context.managed(E::TABLE_NAME, id) {
            Some(row) => Some(row),
            None => self
                .storage
                .find_row(E::TABLE_NAME, id)
                .map_err(ExecutionError::from)?,
        };
        match row {
            Some(row) => Ok(Some(self.hydrate::<E>(row)?)),
            None => Ok(None),
        }
    }

    fn hydrate<E: Entity>(&self, row: Row) -> std::result::Result<E, ExecutionError> {
        E::hydrate(&EntityRow::new(E::TABLE_NAME, row), &self.context)
    }

    /// 関連先がロード済みか (`PersistenceUnitUtil.isLoaded`)
    pub fn is_loaded<T: Entity>(&self, reference: &Lazy<T>) -> bool {
        reference.is_loaded()
    }

    /// 未ロードの参照を読み込む
    pub fn load<T: Entity>(&self, reference: &Lazy<T>) -> Result<T> {
        match reference {
            Lazy::Loaded(value) => Ok(value.clone()),
            Lazy::Unloaded(id) => self.find::<T>(*id)?.ok_or_else(|| {
                Error::from(ExecutionError::EntityNotFound {
                    entity: T::ENTITY_NAME,
                    id: *id,
                })
            }),
        }
    }

    /// チームに所属する会員（一対多の逆参照）を id 順に読む
    pub fn members_of(&self, team: &Team) -> Result<Vec<Member>> {
        let Some(team_id) = team.id else {
            return Ok(Vec::new());
        };
        let member = QMember::member();
        let owner = QTeam::team();
        self.query_factory()
            .select(&member)
            .from(&member)
            .join(&member.team, &owner)
            .where_(owner.id.eq(team_id))
            .order_by(member.id.asc())
            .fetch()
    }

    pub fn query_factory(&self) -> QueryFactory<'_> {
        QueryFactory::new(self)
    }

    /// テキストクエリを解析する (`em.createQuery`)
    pub fn create_query(&self, text: &str) -> Result<TextQuery<'_>> {
        let parsed = QueryParser::new(&self.catalog).parse(text)?;
        Ok(TextQuery::new(self, parsed))
    }

    fn before_query(&self, query: &QueryDescriptor) -> std::result::Result<(), ExecutionError> {
        if self.config.auto_flush {
            self.flush_pending()?;
        }
        if self.config.show_sql {
            debug!(query = %query, "execute");
        }
        Ok(())
    }
}

impl QueryExecutor for Session {
    fn execute(&self, query: &QueryDescriptor) -> std::result::Result<Vec<Vec<Cell>>, ExecutionError> {
        self.before_query(query)?;
        QueryEngine::new(self.storage.as_ref()).execute(query)
    }

    fn count(&self, query: &QueryDescriptor) -> std::result::Result<u64, ExecutionError> {
        self.before_query(query)?;
        QueryEngine::new(self.storage.as_ref()).count(query)
    }

    fn persistence_context(&self) -> &dyn PersistenceContext {
        &self.context
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repository::StorageError;

    fn session() -> Session {
        Session::open(Arc::new(MemoryStorage::new()), SessionConfig::default()).unwrap()
    }

    #[test]
    fn persist_assigns_id_and_manages() {
        let session = session();
        let mut team = Team::new("teamA");
        session.persist(&mut team).unwrap();
        assert_eq!(team.id, Some(1));
        assert!(session.contains(&team));
        assert_eq!(session.storage().row_count("team").unwrap(), 0);

        session.flush().unwrap();
        assert_eq!(session.storage().row_count("team").unwrap(), 1);
    }

    #[test]
    fn find_prefers_managed_entity() {
        let session = session();
        let mut team = Team::new("teamA");
        session.persist(&mut team).unwrap();
        // 書き出す前でも管理中なので見つかる
        assert_eq!(session.find::<Team>(1).unwrap(), Some(team));
        assert_eq!(session.find::<Team>(99).unwrap(), None);
    }

    #[test]
    fn flush_reports_dangling_team() {
        let session = session();
        let mut team = Team::new("teamA");
        session.persist(&mut team).unwrap();
        let mut member = Member::new("member1", 10, &team);
        session.persist(&mut member).unwrap();
        // チームの挿入を破棄してから会員だけを書き出す
        session.context().take_pending();
        session.context().queue_insert("member", member.to_row().unwrap());
        let mut later = Team::new("teamB");
        session.persist(&mut later).unwrap();

        let error = session.flush().unwrap_err();
        assert!(matches!(
            error,
            Error::Execution(ExecutionError::Storage(StorageError::ForeignKeyViolation { .. }))
        ));
        // 失敗した行は管理対象から外れ、後ろの行は次の書き出しを待つ
        assert!(!session.contains(&member));
        assert!(session.contains(&later));
        assert_eq!(session.context().pending_count(), 1);
        session.flush().unwrap();
        assert!(session.storage().find_row("team", later.id.unwrap()).unwrap().is_some());
    }

    #[test]
    fn persist_of_managed_entity_writes_latest_state() {
        let session = session();
        let mut team = Team::new("teamC");
        session.persist(&mut team).unwrap();
        team.name = Some("renamed".to_string());
        session.persist(&mut team).unwrap();
        let mut other = Team::new("teamD");
        session.persist(&mut other).unwrap();

        session.flush().unwrap();
        assert_eq!(session.storage().row_count("team").unwrap(), 2);
        assert_eq!(session.find::<Team>(team.id.unwrap()).unwrap(), Some(team.clone()));

        // 書き出し後の変更は更新になる
        team.name = Some("teamE".to_string());
        session.persist(&mut team).unwrap();
        session.flush().unwrap();
        session.clear();
        assert_eq!(session.storage().row_count("team").unwrap(), 2);
        let stored: Team = session.find(team.id.unwrap()).unwrap().unwrap();
        assert_eq!(stored.name.as_deref(), Some("teamE"));
    }

    #[test]
    fn merge_updates_detached_entity() {
        let session = session();
        let mut team = Team::new("teamA");
        session.persist(&mut team).unwrap();
        session.flush().unwrap();
        session.clear();

        team.name = Some("teamB".to_string());
        session.merge(&mut team).unwrap();
        session.flush().unwrap();
        assert_eq!(session.storage().row_count("team").unwrap(), 1);
        session.clear();
        let stored: Team = session.find(team.id.unwrap()).unwrap().unwrap();
        assert_eq!(stored.name.as_deref(), Some("teamB"));

        // 新しいエンティティは挿入になる
        let mut fresh = Team::new("teamC");
        session.merge(&mut fresh).unwrap();
        assert!(fresh.id.is_some());
        session.flush().unwrap();
        assert_eq!(session.storage().row_count("team").unwrap(), 2);
    }

    #[test]
    fn clear_makes_team_references_unloaded() {
        let session = session();
        let mut team = Team::new("teamA");
        session.persist(&mut team).unwrap();
        let mut member = Member::new("member1", 10, &team);
        session.persist(&mut member).unwrap();
        session.flush().unwrap();
        session.clear();

        let found: Member = session.find(member.id.unwrap()).unwrap().unwrap();
        let reference = found.team.clone().unwrap();
        assert!(!session.is_loaded(&reference));
        assert_eq!(session.load(&reference).unwrap().name.as_deref(), Some("teamA"));
        assert!(matches!(
            session.load(&Lazy::<Team>::Unloaded(42)),
            Err(Error::Execution(ExecutionError::EntityNotFound { id: 42, .. }))
        ));
    }

    #[test]
    fn members_of_reads_back_reference() {
        let session = session();
        let mut team_a = Team::new("teamA");
        let mut team_b = Team::new("teamB");
        session.persist(&mut team_a).unwrap();
        session.persist(&mut team_b).unwrap();
        for (name, age, team) in [("member1", 10, &team_a), ("member2", 20, &team_a), ("member3", 30, &team_b)] {
            session.persist(&mut Member::new(name, age, team)).unwrap();
        }

        let members = session.members_of(&team_a).unwrap();
        let names: Vec<_> = members.iter().filter_map(|m| m.username.as_deref()).collect();
        assert_eq!(names, vec!["member1", "member2"]);
        assert!(session.members_of(&Team::new("transient")).unwrap().is_empty());
    }
}
