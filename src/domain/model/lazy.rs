use crate::domain::model::entity::Entity;

/// 多対一の関連先への参照
///
/// フェッチジョインで読み込まれたか、読み込み時に関連先が永続化コンテキストで
/// 管理されていれば `Loaded`。そうでなければ id だけを持つ `Unloaded` になり、
/// 必要になった時点で `Session::load` で読み込む。
#[derive(Debug, Clone)]
pub enum Lazy<T> {
    Loaded(T),
    Unloaded(i64),
}

impl<T: Entity> Lazy<T> {
    pub fn loaded(value: T) -> Self {
        Lazy::Loaded(value)
    }

    /// 参照先の id。永続化されていない参照先なら `None`。
    pub fn id(&self) -> Option<i64> {
        match self {
            Lazy::Loaded(value) => value.id(),
            Lazy::Unloaded(id) => Some(*id),
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, Lazy::Loaded(_))
    }

    pub fn get(&self) -> Option<&T> {
        match self {
            Lazy::Loaded(value) => Some(value),
            Lazy::Unloaded(_) => None,
        }
    }

    pub fn into_inner(self) -> Option<T> {
        match self {
            Lazy::Loaded(value) => Some(value),
            Lazy::Unloaded(_) => None,
        }
    }
}

/// 参照の同一性は id で決まる（ロード状態は問わない）
impl<T: Entity> PartialEq for Lazy<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}
