//! PostgreSQL execution through tokio-postgres

use log::{debug, error, info};
use tokio::runtime::{Builder, Runtime};
use tokio_postgres::types::{ToSql, Type};
use tokio_postgres::{Client, NoTls, SimpleQueryMessage};

use crate::config::EmmConfig;
use crate::core::{EmmError, Result, Value};
use super::{QueryExecutor, QueryResult, Row};

/// A single PostgreSQL connection driven from synchronous code.
///
/// The executor owns a current-thread runtime and blocks on every call. The
/// connection task is spawned on that runtime, so it makes progress whenever
/// a call is being awaited.
pub struct PgExecutor {
    runtime: Runtime,
    client: Client,
}

impl PgExecutor {
    pub fn connect(config: &EmmConfig) -> Result<Self> {
        config.validate()?;

        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| EmmError::ExecutionError(format!("Failed to start runtime: {}", e)))?;

        let (client, connection) = runtime
            .block_on(tokio_postgres::connect(&config.connection_string(), NoTls))
            .map_err(|e| EmmError::execution(format!("Failed to connect to {}", config.to_url()), e))?;

        runtime.spawn(async move {
            if let Err(e) = connection.await {
                error!("Connection error: {}", e);
            }
        });

        info!("Connected to {}", config.to_url());
        Ok(Self { runtime, client })
    }

    fn run_simple(&self, sql: &str) -> Result<QueryResult> {
        let messages = self
            .runtime
            .block_on(self.client.simple_query(sql))
            .map_err(|e| EmmError::execution(preview(sql), e))?;

        let mut result = QueryResult::empty();
        for message in messages {
            if let SimpleQueryMessage::Row(row) = message {
                if result.columns.is_empty() {
                    result.columns = row.columns().iter().map(|c| c.name().to_string()).collect();
                }
                let values: Row = (0..row.len())
                    .map(|i| match row.get(i) {
                        Some(text) => Value::Text(text.to_string()),
                        None => Value::Null,
                    })
                    .collect();
                result.rows.push(values);
            }
        }
        Ok(result)
    }

    fn run_typed(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        let owned: Vec<Box<dyn ToSql + Sync>> = params.iter().map(to_sql).collect();
        let refs: Vec<&(dyn ToSql + Sync)> = owned.iter().map(|p| p.as_ref()).collect();

        let rows = self
            .runtime
            .block_on(self.client.query(sql, &refs))
            .map_err(|e| EmmError::execution(preview(sql), e))?;

        let mut result = QueryResult::empty();
        if let Some(first) = rows.first() {
            result.columns = first.columns().iter().map(|c| c.name().to_string()).collect();
        }
        for row in &rows {
            let values = row
                .columns()
                .iter()
                .enumerate()
                .map(|(i, column)| decode(row, i, column.type_()))
                .collect::<Result<Row>>()?;
            result.rows.push(values);
        }
        Ok(result)
    }

    fn batch(&self, sql: &str) -> Result<()> {
        self.runtime
            .block_on(self.client.batch_execute(sql))
            .map_err(|e| EmmError::execution(sql, e))
    }
}

impl QueryExecutor for PgExecutor {
    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        if params.is_empty() {
            self.run_simple(sql)
        } else {
            self.run_typed(sql, params)
        }
    }

    fn begin(&mut self) -> Result<()> {
        self.batch("BEGIN")
    }

    fn commit(&mut self) -> Result<()> {
        self.batch("COMMIT")
    }

    fn rollback(&mut self) -> Result<()> {
        self.batch("ROLLBACK")
    }
}

fn to_sql(value: &Value) -> Box<dyn ToSql + Sync> {
    match value {
        Value::Null => Box::new(None::<String>),
        Value::Integer(i) => Box::new(*i),
        Value::Float(f) => Box::new(*f),
        Value::Text(s) => Box::new(s.clone()),
        Value::Boolean(b) => Box::new(*b),
    }
}

fn decode(row: &tokio_postgres::Row, index: usize, ty: &Type) -> Result<Value> {
    let value = if *ty == Type::BOOL {
        row.try_get::<_, Option<bool>>(index)?.map(Value::Boolean)
    } else if *ty == Type::INT2 {
        row.try_get::<_, Option<i16>>(index)?.map(|v| Value::Integer(v.into()))
    } else if *ty == Type::INT4 {
        row.try_get::<_, Option<i32>>(index)?.map(|v| Value::Integer(v.into()))
    } else if *ty == Type::INT8 {
        row.try_get::<_, Option<i64>>(index)?.map(Value::Integer)
    } else if *ty == Type::OID {
        row.try_get::<_, Option<u32>>(index)?.map(|v| Value::Integer(v.into()))
    } else if *ty == Type::FLOAT4 {
        row.try_get::<_, Option<f32>>(index)?.map(|v| Value::Float(v.into()))
    } else if *ty == Type::FLOAT8 {
        row.try_get::<_, Option<f64>>(index)?.map(Value::Float)
    } else if [Type::TEXT, Type::VARCHAR, Type::NAME, Type::BPCHAR].contains(ty) {
        row.try_get::<_, Option<String>>(index)?.map(Value::Text)
    } else {
        debug!("Column {} has unsupported type {}, reading it as NULL", index, ty);
        None
    };
    Ok(value.unwrap_or(Value::Null))
}

/// First line of a statement, shortened for error messages.
fn preview(sql: &str) -> String {
    const LIMIT: usize = 80;
    let line = sql.trim().lines().next().unwrap_or_default();
    match line.char_indices().nth(LIMIT) {
        Some((cut, _)) => format!("{}...", &line[..cut]),
        None => line.to_string(),
    }
}
