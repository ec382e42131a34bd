#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use emm::{EmmError, FsProjectSource, MemoryStore, QueryExecutor, QueryResult, Result, Value, Workbench};
use tempfile::TempDir;

pub const ORDERS_DDL: &str = "\
-- orders of the demo shop
CREATE TABLE IF NOT EXISTS orders (
    id INTEGER NOT NULL,
    note TEXT,
    paid BOOLEAN DEFAULT false,
    customer TEXT,
    total NUMERIC(10, 2)
);
";

pub const ORDERS_DATA: &str = "\
INSERT INTO orders VALUES (1, 'first', true, 'ann', 10.50);
INSERT INTO orders (id, note, paid, customer, total) VALUES (2, NULL, false, 'bob', 3.00);
";

/// Executor double: records every statement, counts transaction calls and
/// answers the catalog queries the workbench issues with canned rows.
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    pub statements: Vec<String>,
    pub begins: usize,
    pub commits: usize,
    pub rollbacks: usize,
    fail_on: Vec<String>,
    sizes: Vec<(String, f64)>,
    mean_times: HashMap<String, f64>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every statement containing `fragment`.
    pub fn failing_on(mut self, fragment: &str) -> Self {
        self.fail_on.push(fragment.to_string());
        self
    }

    /// Report `total_bytes` for `table` in the table-size query.
    pub fn with_size(mut self, table: &str, total_bytes: f64) -> Self {
        self.sizes.push((table.to_string(), total_bytes));
        self
    }

    /// Report `mean_ms` as the mean execution time of every workload on `table`.
    pub fn with_mean_time(mut self, table: &str, mean_ms: f64) -> Self {
        self.mean_times.insert(table.to_string(), mean_ms);
        self
    }

    pub fn executed(&self, fragment: &str) -> Vec<&String> {
        self.statements.iter().filter(|s| s.contains(fragment)).collect()
    }

    fn size_rows(&self) -> QueryResult {
        let columns = ["table_name", "row_estimate", "total_bytes", "index_bytes", "toast_bytes", "table_bytes"]
            .iter()
            .map(|c| c.to_string())
            .collect();
        let rows = self
            .sizes
            .iter()
            .map(|(table, total)| {
                vec![
                    Value::from(table.as_str()),
                    Value::Float(2.0),
                    Value::Float(*total),
                    Value::Float(0.0),
                    Value::Float(0.0),
                    Value::Float(*total),
                ]
            })
            .collect();
        QueryResult::new(columns, rows)
    }

    fn statement_stats(&self, params: &[Value]) -> QueryResult {
        let table = params.first().and_then(Value::as_str).unwrap_or_default();
        let columns = vec!["calls".to_string(), "mean_exec_time".to_string()];
        match self.mean_times.get(table) {
            Some(mean) => QueryResult::new(columns, vec![vec![Value::Integer(5), Value::Float(*mean)]]),
            None => QueryResult::new(columns, Vec::new()),
        }
    }
}

impl QueryExecutor for ScriptedExecutor {
    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        self.statements.push(sql.to_string());
        if let Some(fragment) = self.fail_on.iter().find(|f| sql.contains(f.as_str())) {
            return Err(EmmError::ExecutionError(format!("scripted failure on '{}'", fragment)));
        }
        if sql.contains("pg_total_relation_size") {
            return Ok(self.size_rows());
        }
        if sql.contains("FROM pg_stat_statements") {
            return Ok(self.statement_stats(params));
        }
        Ok(QueryResult::empty())
    }

    fn begin(&mut self) -> Result<()> {
        self.begins += 1;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.commits += 1;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        self.rollbacks += 1;
        Ok(())
    }
}

pub fn write_project(root: &Path, name: &str, ddl: &str, data: &str) {
    let dir = root.join(name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("schema.sql"), ddl).unwrap();
    fs::write(dir.join("data.sql"), data).unwrap();
}

/// A projects directory holding the `shop` project.
pub fn shop_projects() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_project(dir.path(), "shop", ORDERS_DDL, ORDERS_DATA);
    dir
}

pub type TestBench = Workbench<ScriptedExecutor, MemoryStore, FsProjectSource>;

pub fn workbench(projects: &TempDir, executor: ScriptedExecutor) -> TestBench {
    Workbench::new(executor, MemoryStore::default(), FsProjectSource::new(projects.path()))
        .with_workload_iterations(3)
}
