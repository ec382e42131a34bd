use std::fmt;

use crate::core::quote_identifier;

/// Reported alongside the comparison, never compared itself.
pub const ROW_ESTIMATE: &str = "row_estimate";

/// Size metrics compared between permutations, in report order.
pub const SIZE_METRICS: [&str; 4] = ["total_bytes", "index_bytes", "toast_bytes", "table_bytes"];

/// Per-table size figures for every ordinary table of one namespace (`$1`).
pub const TABLE_SIZES_QUERY: &str = "\
SELECT table_name, row_estimate, total_bytes, index_bytes, toast_bytes,
       total_bytes - index_bytes - toast_bytes AS table_bytes
FROM (
    SELECT c.relname::text AS table_name,
           c.reltuples::float8 AS row_estimate,
           pg_total_relation_size(c.oid)::float8 AS total_bytes,
           pg_indexes_size(c.oid)::float8 AS index_bytes,
           COALESCE(pg_total_relation_size(c.reltoastrelid), 0)::float8 AS toast_bytes
    FROM pg_class c
    LEFT JOIN pg_namespace n ON n.oid = c.relnamespace
    WHERE c.relkind = 'r'
      AND n.nspname = $1
) sizes
ORDER BY total_bytes DESC";

pub const ENABLE_STATEMENT_STATS: &str = "CREATE EXTENSION IF NOT EXISTS pg_stat_statements";

pub const RESET_STATEMENT_STATS: &str = "SELECT pg_stat_statements_reset()";

/// Recorded statistics of the statements mentioning `$1`, skipping the
/// bookkeeping statements on pg_stat_statements itself.
pub const STATEMENT_STATS_QUERY: &str = "\
SELECT calls, mean_exec_time
FROM pg_stat_statements
WHERE strpos(query, $1) > 0
  AND strpos(query, 'pg_stat_statements') = 0
ORDER BY calls DESC
LIMIT 1";

/// Table-agnostic read-only queries run against every permutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadOnlyWorkload {
    ReadAll,
    ReadAggregation,
    ReadPagination,
}

impl ReadOnlyWorkload {
    pub const ALL: [ReadOnlyWorkload; 3] = [
        ReadOnlyWorkload::ReadAll,
        ReadOnlyWorkload::ReadAggregation,
        ReadOnlyWorkload::ReadPagination,
    ];

    /// Also the metric name its observations are stored under.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ReadAll => "read_all",
            Self::ReadAggregation => "read_aggregation",
            Self::ReadPagination => "read_pagination",
        }
    }

    pub fn query(&self, table: &str) -> String {
        let table = quote_identifier(table);
        match self {
            Self::ReadAll => format!("SELECT * FROM {}", table),
            Self::ReadAggregation => format!("SELECT COUNT(*) FROM {}", table),
            Self::ReadPagination => format!("SELECT * FROM {} LIMIT 100 OFFSET 200", table),
        }
    }
}

impl fmt::Display for ReadOnlyWorkload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
