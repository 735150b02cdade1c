pub mod data_source;
pub mod member_repository;

pub use data_source::{DataSource, StorageError};
pub use member_repository::{MemberRepository, RepositoryError};

#[cfg(test)]
pub use data_source::MockDataSource;
