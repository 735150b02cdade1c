pub mod entity;
pub mod metamodel;
pub mod model;
pub mod query;
pub mod repository;
