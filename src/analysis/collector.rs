use log::{debug, warn};

use crate::core::{Result, Value};
use crate::executor::{QueryResult, Session};
use crate::storage::{PermutationRecord, RawMetricRecord, RecordId};
use super::metrics::{
    RESET_STATEMENT_STATS, ROW_ESTIMATE, ReadOnlyWorkload, SIZE_METRICS, STATEMENT_STATS_QUERY,
    TABLE_SIZES_QUERY,
};

/// Statistics pg_stat_statements recorded for one workload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkloadStats {
    pub calls: i64,
    pub mean_exec_time: f64,
}

/// Size figures of every table in `namespace`.
pub fn query_table_sizes(session: &mut Session<'_>, namespace: &str) -> Result<QueryResult> {
    // unquoted identifiers are stored folded to lower case
    session.execute(TABLE_SIZES_QUERY, &[Value::from(namespace.to_lowercase())])
}

fn find_permutation<'p>(permutations: &'p [PermutationRecord], table: &str) -> Option<&'p PermutationRecord> {
    permutations.iter().find(|p| p.name.eq_ignore_ascii_case(table))
}

/// Turn the rows of [`query_table_sizes`] into raw observations. Tables that
/// are not permutations of the schema are skipped.
pub fn size_observations(
    sizes: &QueryResult,
    permutations: &[PermutationRecord],
    analysis_id: RecordId,
) -> Vec<RawMetricRecord> {
    let mut observations = Vec::new();

    for row in 0..sizes.row_count() {
        let Some(table) = sizes.get(row, "table_name").map(|v| v.to_string()) else {
            continue;
        };
        let Some(permutation) = find_permutation(permutations, &table) else {
            warn!("Permutation with name {} not found. Skipping it", table);
            continue;
        };

        for metric in std::iter::once(ROW_ESTIMATE).chain(SIZE_METRICS) {
            match sizes.get(row, metric).and_then(Value::as_f64) {
                Some(value) => {
                    observations.push(RawMetricRecord::new(analysis_id, permutation.id, metric, value))
                }
                None => warn!("No {} reported for {}. Skipping it", metric, table),
            }
        }
    }

    observations
}

/// Run `workload` against `table` `iterations` times and read back what
/// pg_stat_statements recorded. `None` if nothing was recorded.
pub fn measure_workload(
    session: &mut Session<'_>,
    table: &str,
    workload: ReadOnlyWorkload,
    iterations: u32,
) -> Result<Option<WorkloadStats>> {
    session.batch(RESET_STATEMENT_STATS)?;

    let query = workload.query(table);
    for _ in 0..iterations {
        session.batch(&query)?;
    }

    let stats = session.execute(STATEMENT_STATS_QUERY, &[Value::from(table)])?;
    let calls = stats.get(0, "calls").and_then(Value::as_i64);
    let mean = stats.get(0, "mean_exec_time").and_then(Value::as_f64);

    match (calls, mean) {
        (Some(calls), Some(mean_exec_time)) => {
            debug!("{} on {}: {} calls, {} ms mean", workload, table, calls, mean_exec_time);
            Ok(Some(WorkloadStats { calls, mean_exec_time }))
        }
        _ => Ok(None),
    }
}

/// The raw observation for one measured workload.
pub fn workload_observation(
    analysis_id: RecordId,
    permutation: &PermutationRecord,
    workload: ReadOnlyWorkload,
    stats: WorkloadStats,
) -> RawMetricRecord {
    RawMetricRecord::new(analysis_id, permutation.id, workload.name(), stats.mean_exec_time)
        .with_notes(format!("Mean execution time over {} iterations", stats.calls))
}
