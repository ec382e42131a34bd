pub mod postgres;
pub mod result;
pub mod session;

pub use postgres::PgExecutor;
pub use result::{QueryResult, Row};
pub use session::{Session, in_session};

use crate::core::{Result, Value};

/// The database the workbench drives. Statements run on one connection;
/// `begin`/`commit`/`rollback` delimit a transaction on it.
pub trait QueryExecutor {
    /// Run `sql`. Without `params` the text may hold several statements.
    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<QueryResult>;

    fn begin(&mut self) -> Result<()>;

    fn commit(&mut self) -> Result<()>;

    fn rollback(&mut self) -> Result<()>;
}

impl<E: QueryExecutor + ?Sized> QueryExecutor for Box<E> {
    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        (**self).execute(sql, params)
    }

    fn begin(&mut self) -> Result<()> {
        (**self).begin()
    }

    fn commit(&mut self) -> Result<()> {
        (**self).commit()
    }

    fn rollback(&mut self) -> Result<()> {
        (**self).rollback()
    }
}
