pub mod error;
pub mod types;
pub mod value;

pub use error::{EmmError, Result};
pub use types::{ColumnDefinition, TableDefinition, quote_identifier};
pub use value::Value;
