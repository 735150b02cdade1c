use crate::domain::entity::data_type::{Constraint, DataType};
use serde::{Deserialize, Serialize};
use std::fmt;
use typed_builder::TypedBuilder;

/// エンティティのテーブルを構成する列
///
/// 制約は `primary_key()` などのメソッドをつないで付ける。同じ制約は重複しない。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
pub struct Column {
    #[builder(setter(into))]
    pub name: String,

    pub data_type: DataType,

    #[builder(default)]
    pub constraints: Vec<Constraint>,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            constraints: Vec::new(),
        }
    }

    fn with(mut self, constraint: Constraint) -> Self {
        if !self.constraints.contains(&constraint) {
            self.constraints.push(constraint);
        }
        self
    }

    /// 主キーは常に NOT NULL
    pub fn primary_key(self) -> Self {
        self.with(Constraint::PrimaryKey).with(Constraint::NotNull)
    }

    pub fn not_null(self) -> Self {
        self.with(Constraint::NotNull)
    }

    pub fn unique(self) -> Self {
        self.with(Constraint::Unique)
    }

    /// 多対一の関連の外部キー列にする。参照先は1つだけ。
    pub fn references(mut self, entity: impl Into<String>) -> Self {
        self.constraints.retain(|c| !matches!(c, Constraint::ForeignKey(_)));
        self.with(Constraint::ForeignKey(entity.into()))
    }

    pub fn is_primary_key(&self) -> bool {
        self.constraints.contains(&Constraint::PrimaryKey)
    }

    pub fn is_not_null(&self) -> bool {
        self.constraints.contains(&Constraint::NotNull)
    }

    pub fn is_unique(&self) -> bool {
        self.constraints.contains(&Constraint::Unique)
    }

    pub fn referenced_table(&self) -> Option<&str> {
        self.constraints.iter().find_map(|c| match c {
            Constraint::ForeignKey(entity) => Some(entity.as_str()),
            _ => None,
        })
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.data_type)?;
        for constraint in &self.constraints {
            write!(f, " {}", constraint)?;
        }
        Ok(())
    }
}
