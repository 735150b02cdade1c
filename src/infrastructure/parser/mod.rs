pub mod rewrite;
pub mod sql_parser;
pub mod text_query;

pub use sql_parser::{ParseError, ParsedQuery, QueryParser};
pub use text_query::TextQuery;
