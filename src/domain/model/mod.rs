pub mod catalog;
pub mod dto;
pub mod entity;
pub mod hello;
pub mod lazy;
pub mod member;
pub mod relation;
pub mod team;

pub use catalog::{Catalog, EntityDescriptor};
pub use dto::{MemberDto, UserDto};
pub use entity::{Detached, Entity, PersistenceContext};
pub use hello::Hello;
pub use lazy::Lazy;
pub use member::Member;
pub use relation::{RelationKind, RelationMeta};
pub use team::Team;
