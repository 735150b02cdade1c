use std::cell::RefCell;
use std::collections::HashMap;

use tracing::trace;

use crate::domain::entity::Row;
use crate::domain::model::PersistenceContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    Insert,
    Update,
}

/// 書き出しを待っている1行
#[derive(Debug, Clone, PartialEq)]
pub struct PendingWrite {
    pub kind: WriteKind,
    pub table: String,
    pub row: Row,
}

/// セッションの永続化コンテキスト（同一性マップと未反映の書き込み）
///
/// クエリで読んだ行は、同じ (テーブル, id) で最初に管理下に入ったものが保持される。
/// 書き換えられるのは `queue_update` を通したときだけ。
#[derive(Debug, Default)]
pub struct SessionContext {
    managed: RefCell<HashMap<(String, i64), Row>>,
    pending: RefCell<Vec<PendingWrite>>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_managed(&self, table: &str, id: i64) -> bool {
        self.managed.borrow().contains_key(&(table.to_string(), id))
    }

    pub fn managed_count(&self) -> usize {
        self.managed.borrow().len()
    }

    /// 挿入を予約する。行は直ちに管理下に入る。
    pub fn queue_insert(&self, table: &str, row: Row) {
        self.register(table, &row);
        self.pending.borrow_mut().push(PendingWrite {
            kind: WriteKind::Insert,
            table: table.to_string(),
            row,
        });
    }

    /// 管理中の行を書き換える
    ///
    /// 同じ行の書き込みがまだ予約されていればその内容を差し替え、なければ更新を予約する。
    pub fn queue_update(&self, table: &str, row: Row) {
        let Some(id) = row.id() else {
            return;
        };
        self.managed
            .borrow_mut()
            .insert((table.to_string(), id), row.clone());

        let mut pending = self.pending.borrow_mut();
        match pending
            .iter()
            .position(|write| write.table == table && write.row.id() == Some(id))
        {
            Some(index) => pending[index].row = row,
            None => pending.push(PendingWrite {
                kind: WriteKind::Update,
                table: table.to_string(),
                row,
            }),
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.borrow().len()
    }

    /// 予約された書き込みを予約順に取り出す
    pub fn take_pending(&self) -> Vec<PendingWrite> {
        std::mem::take(&mut *self.pending.borrow_mut())
    }

    /// 書き出せなかった書き込みを予約の先頭に戻す
    pub fn restore_pending(&self, writes: Vec<PendingWrite>) {
        let mut pending = self.pending.borrow_mut();
        let queued = std::mem::replace(&mut *pending, writes);
        pending.extend(queued);
    }

    /// 行を管理対象から外す
    pub fn evict(&self, table: &str, id: i64) {
        if self.managed.borrow_mut().remove(&(table.to_string(), id)).is_some() {
            trace!(table, id, "evicted");
        }
    }

    /// 管理中のエンティティと未反映の挿入をすべて破棄する
    pub fn clear(&self) {
        let discarded = self.pending.borrow().len();
        self.managed.borrow_mut().clear();
        self.pending.borrow_mut().clear();
        trace!(discarded, "persistence context cleared");
    }
}

impl PersistenceContext for SessionContext {
    fn register(&self, table: &str, row: &Row) {
        let Some(id) = row.id() else {
            return;
        };
        self.managed
            .borrow_mut()
            .entry((table.to_string(), id))
            .or_insert_with(|| {
                trace!(table, id, "managed");
                row.clone()
            });
    }

    fn managed(&self, table: &str, id: i64) -> Option<Row> {
        self.managed.borrow().get(&(table.to_string(), id)).cloned()
    }
}
