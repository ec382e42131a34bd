pub mod ddl;
pub mod tokens;

pub use ddl::{DdlParser, parse};
