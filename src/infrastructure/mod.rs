pub mod engine;
pub mod parser;
pub mod repository;
pub mod session;
pub mod storage;
