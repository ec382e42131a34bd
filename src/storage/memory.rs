use std::collections::HashSet;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::core::{EmmError, Result};
use crate::permutation::PermutationKey;
use super::records::{
    AnalysisRecord, AnalysisReport, PermutationRecord, RawMetricRecord, RecordId, SchemaRecord,
};
use super::repository::{AnalysisRepository, PermutationRepository, SchemaRepository};

/// In-memory metadata store. Records are kept in insertion order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryStore {
    last_id: RecordId,
    schemas: Vec<SchemaRecord>,
    permutations: Vec<PermutationRecord>,
    analyses: Vec<AnalysisRecord>,
    metrics: Vec<RawMetricRecord>,
    reports: Vec<AnalysisReport>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&mut self) -> RecordId {
        self.last_id += 1;
        self.last_id
    }

    fn schema_exists(&self, schema_id: RecordId) -> bool {
        self.schemas.iter().any(|s| s.id == schema_id)
    }

    fn require_schema(&self, schema_id: RecordId) -> Result<()> {
        if self.schema_exists(schema_id) {
            Ok(())
        } else {
            Err(EmmError::NotFound(format!("Schema #{} does not exist", schema_id)))
        }
    }

    fn require_analysis(&self, analysis_id: RecordId) -> Result<()> {
        if self.analyses.iter().any(|a| a.id == analysis_id) {
            Ok(())
        } else {
            Err(EmmError::NotFound(format!("Analysis #{} does not exist", analysis_id)))
        }
    }
}

impl SchemaRepository for MemoryStore {
    fn find_by_name(&self, name: &str) -> Result<Option<SchemaRecord>> {
        Ok(self.schemas.iter().find(|s| s.name == name).cloned())
    }

    fn list_all(&self) -> Result<Vec<SchemaRecord>> {
        Ok(self.schemas.clone())
    }

    fn delete(&mut self, schema_id: RecordId) -> Result<bool> {
        if !self.schema_exists(schema_id) {
            return Ok(false);
        }

        let analysis_ids: HashSet<RecordId> = self
            .analyses
            .iter()
            .filter(|a| a.schema_id == schema_id)
            .map(|a| a.id)
            .collect();

        self.schemas.retain(|s| s.id != schema_id);
        self.permutations.retain(|p| p.schema_id != schema_id);
        self.analyses.retain(|a| a.schema_id != schema_id);
        self.metrics.retain(|m| !analysis_ids.contains(&m.analysis_id));
        self.reports.retain(|r| !analysis_ids.contains(&r.analysis_id));

        debug!("Deleted schema #{} with {} analyses", schema_id, analysis_ids.len());
        Ok(true)
    }

    fn add(&mut self, mut schema: SchemaRecord) -> Result<SchemaRecord> {
        if self.schemas.iter().any(|s| s.name == schema.name) {
            return Err(EmmError::ConflictError(format!(
                "Schema '{}' already exists",
                schema.name
            )));
        }
        schema.id = self.allocate_id();
        self.schemas.push(schema.clone());
        Ok(schema)
    }
}

impl PermutationRepository for MemoryStore {
    fn list_existing_keys(&self, schema_id: RecordId) -> Result<HashSet<PermutationKey>> {
        Ok(self
            .permutations
            .iter()
            .filter(|p| p.schema_id == schema_id)
            .filter_map(|p| p.key.clone())
            .collect())
    }

    fn add(&mut self, mut permutation: PermutationRecord) -> Result<PermutationRecord> {
        self.require_schema(permutation.schema_id)?;

        let duplicate = self
            .permutations
            .iter()
            .any(|p| p.schema_id == permutation.schema_id && p.key == permutation.key);
        if duplicate {
            let what = match &permutation.key {
                Some(key) => format!("Permutation {}", key),
                None => "Baseline permutation".to_string(),
            };
            return Err(EmmError::ConflictError(format!(
                "{} already exists for schema #{}",
                what, permutation.schema_id
            )));
        }

        permutation.id = self.allocate_id();
        self.permutations.push(permutation.clone());
        Ok(permutation)
    }

    fn list_for_schema(&self, schema_id: RecordId) -> Result<Vec<PermutationRecord>> {
        Ok(self
            .permutations
            .iter()
            .filter(|p| p.schema_id == schema_id)
            .cloned()
            .collect())
    }

    fn mark_populated(&mut self, permutation_id: RecordId) -> Result<()> {
        let permutation = self
            .permutations
            .iter_mut()
            .find(|p| p.id == permutation_id)
            .ok_or_else(|| EmmError::NotFound(format!("Permutation #{} does not exist", permutation_id)))?;
        permutation.populated = true;
        Ok(())
    }
}

impl AnalysisRepository for MemoryStore {
    fn add_analysis(&mut self, mut analysis: AnalysisRecord) -> Result<AnalysisRecord> {
        self.require_schema(analysis.schema_id)?;
        analysis.id = self.allocate_id();
        self.analyses.push(analysis.clone());
        Ok(analysis)
    }

    fn add_metric(&mut self, metric: RawMetricRecord) -> Result<()> {
        self.require_analysis(metric.analysis_id)?;
        self.metrics.push(metric);
        Ok(())
    }

    fn add_report(&mut self, report: AnalysisReport) -> Result<()> {
        self.require_analysis(report.analysis_id)?;
        self.reports.push(report);
        Ok(())
    }

    fn list_analyses(&self, schema_id: RecordId) -> Result<Vec<AnalysisRecord>> {
        Ok(self
            .analyses
            .iter()
            .filter(|a| a.schema_id == schema_id)
            .cloned()
            .collect())
    }

    fn list_metrics(&self, analysis_id: RecordId) -> Result<Vec<RawMetricRecord>> {
        Ok(self
            .metrics
            .iter()
            .filter(|m| m.analysis_id == analysis_id)
            .cloned()
            .collect())
    }

    fn list_reports(&self, analysis_id: RecordId) -> Result<Vec<AnalysisReport>> {
        Ok(self
            .reports
            .iter()
            .filter(|r| r.analysis_id == analysis_id)
            .cloned()
            .collect())
    }
}
