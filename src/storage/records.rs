use std::fmt;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::permutation::PermutationKey;

pub type RecordId = u64;

/// Id of a record that has not been stored yet. Stores assign real ids
/// starting at 1.
pub const UNASSIGNED: RecordId = 0;

// ============================================================================
// Schemas and permutations
// ============================================================================

/// A project initialized in the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaRecord {
    pub id: RecordId,
    pub name: String,
    pub original_table_name: String,
    pub created: DateTime<Utc>,
}

impl SchemaRecord {
    pub fn new(name: impl Into<String>, original_table_name: impl Into<String>) -> Self {
        Self {
            id: UNASSIGNED,
            name: name.into(),
            original_table_name: original_table_name.into(),
            created: Utc::now(),
        }
    }
}

/// One materialized column ordering of a schema's table.
///
/// The baseline is the table as written in the project DDL: it has no key and
/// carries the original table name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermutationRecord {
    pub id: RecordId,
    pub schema_id: RecordId,
    pub key: Option<PermutationKey>,
    pub name: String,
    pub materialized: bool,
    pub populated: bool,
    pub created: DateTime<Utc>,
}

impl PermutationRecord {
    pub fn baseline(schema_id: RecordId, table_name: impl Into<String>) -> Self {
        Self::materialized(schema_id, None, table_name.into())
    }

    pub fn generated(schema_id: RecordId, key: PermutationKey, table_name: impl Into<String>) -> Self {
        Self::materialized(schema_id, Some(key), table_name.into())
    }

    fn materialized(schema_id: RecordId, key: Option<PermutationKey>, name: String) -> Self {
        Self {
            id: UNASSIGNED,
            schema_id,
            key,
            name,
            materialized: true,
            populated: false,
            created: Utc::now(),
        }
    }

    pub fn is_baseline(&self) -> bool {
        self.key.is_none()
    }
}

// ============================================================================
// Analyses
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
    DiskSize,
    PerformanceReadOnly,
}

impl AnalysisKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DiskSize => "disk_size",
            Self::PerformanceReadOnly => "performance_read_only",
        }
    }
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub id: RecordId,
    pub schema_id: RecordId,
    pub name: String,
    pub description: String,
    pub kind: AnalysisKind,
    pub created: DateTime<Utc>,
}

impl AnalysisRecord {
    pub fn new(
        schema_id: RecordId,
        name: impl Into<String>,
        description: impl Into<String>,
        kind: AnalysisKind,
    ) -> Self {
        Self {
            id: UNASSIGNED,
            schema_id,
            name: name.into(),
            description: description.into(),
            kind,
            created: Utc::now(),
        }
    }
}

/// One observation of one metric on one permutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMetricRecord {
    pub analysis_id: RecordId,
    pub permutation_id: RecordId,
    pub metric: String,
    pub value: f64,
    pub notes: Option<String>,
}

impl RawMetricRecord {
    pub fn new(
        analysis_id: RecordId,
        permutation_id: RecordId,
        metric: impl Into<String>,
        value: f64,
    ) -> Self {
        Self {
            analysis_id,
            permutation_id,
            metric: metric.into(),
            value,
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// The best permutation for one metric of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub analysis_id: RecordId,
    pub metric: String,
    pub best_permutation_name: String,
    pub improvement_percentage: f64,
    pub baseline_value: f64,
    pub best_value: f64,
    pub baseline_row_estimate: Option<f64>,
}

impl fmt::Display for AnalysisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} improves by {:.2}% ({} -> {})",
            self.metric,
            self.best_permutation_name,
            self.improvement_percentage,
            self.baseline_value,
            self.best_value
        )
    }
}
