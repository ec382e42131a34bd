use log::{debug, error};

use crate::core::{Result, Value};
use super::{QueryExecutor, QueryResult};

/// Transactional scope over a [`QueryExecutor`].
///
/// Commits only through [`Session::commit`]. Any other way out of the scope,
/// an early `?` return or a panic included, rolls the transaction back when the
/// session is dropped.
pub struct Session<'a> {
    executor: &'a mut dyn QueryExecutor,
    finished: bool,
}

impl<'a> Session<'a> {
    pub fn begin(executor: &'a mut dyn QueryExecutor) -> Result<Self> {
        executor.begin()?;
        debug!("Session started");
        Ok(Self {
            executor,
            finished: false,
        })
    }

    pub fn execute(&mut self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        debug!("Executing: {}", sql);
        self.executor.execute(sql, params)
    }

    /// Run a parameterless statement (or script), discarding its result.
    pub fn batch(&mut self, sql: &str) -> Result<()> {
        self.execute(sql, &[]).map(|_| ())
    }

    pub fn set_search_path(&mut self, schema: &str) -> Result<()> {
        self.batch(&format!("SET search_path TO {}", schema))
    }

    pub fn reset_search_path(&mut self) -> Result<()> {
        self.batch("SET search_path TO public")
    }

    pub fn commit(mut self) -> Result<()> {
        self.finished = true;
        self.executor.commit()?;
        debug!("Session committed");
        Ok(())
    }

    pub fn rollback(mut self) -> Result<()> {
        self.finished = true;
        self.executor.rollback()
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        debug!("Session dropped without commit, rolling back");
        if let Err(e) = self.executor.rollback() {
            error!("Rollback failed: {}", e);
        }
    }
}

/// Run `work` in its own session: commit if it succeeds, roll back otherwise.
pub fn in_session<T, F>(executor: &mut dyn QueryExecutor, work: F) -> Result<T>
where
    F: FnOnce(&mut Session<'_>) -> Result<T>,
{
    let mut session = Session::begin(executor)?;
    let value = work(&mut session)?;
    session.commit()?;
    Ok(value)
}
