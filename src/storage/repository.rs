use std::collections::HashSet;

use crate::core::Result;
use crate::permutation::PermutationKey;
use super::records::{
    AnalysisRecord, AnalysisReport, PermutationRecord, RawMetricRecord, RecordId, SchemaRecord,
};

pub trait SchemaRepository {
    fn find_by_name(&self, name: &str) -> Result<Option<SchemaRecord>>;

    fn list_all(&self) -> Result<Vec<SchemaRecord>>;

    /// Remove the schema with everything it owns. Returns false if it did not exist.
    fn delete(&mut self, schema_id: RecordId) -> Result<bool>;

    /// Store a new schema and return it with its assigned id.
    fn add(&mut self, schema: SchemaRecord) -> Result<SchemaRecord>;
}

pub trait PermutationRepository {
    /// Keys of the generated (non-baseline) permutations of a schema.
    fn list_existing_keys(&self, schema_id: RecordId) -> Result<HashSet<PermutationKey>>;

    fn add(&mut self, permutation: PermutationRecord) -> Result<PermutationRecord>;

    /// All permutations of a schema, baseline included, in insertion order.
    fn list_for_schema(&self, schema_id: RecordId) -> Result<Vec<PermutationRecord>>;

    fn mark_populated(&mut self, permutation_id: RecordId) -> Result<()>;
}

pub trait AnalysisRepository {
    fn add_analysis(&mut self, analysis: AnalysisRecord) -> Result<AnalysisRecord>;

    fn add_metric(&mut self, metric: RawMetricRecord) -> Result<()>;

    fn add_report(&mut self, report: AnalysisReport) -> Result<()>;

    fn list_analyses(&self, schema_id: RecordId) -> Result<Vec<AnalysisRecord>>;

    fn list_metrics(&self, analysis_id: RecordId) -> Result<Vec<RawMetricRecord>>;

    fn list_reports(&self, analysis_id: RecordId) -> Result<Vec<AnalysisReport>>;
}

/// Everything the workbench persists.
pub trait MetadataStore: SchemaRepository + PermutationRepository + AnalysisRepository {}

impl<T> MetadataStore for T where T: SchemaRepository + PermutationRepository + AnalysisRepository {}
