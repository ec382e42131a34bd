//! JSON snapshot persistence for the metadata store

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use log::{debug, info};
use tempfile::NamedTempFile;

use crate::core::{EmmError, Result};
use crate::permutation::PermutationKey;
use super::memory::MemoryStore;
use super::records::{
    AnalysisRecord, AnalysisReport, PermutationRecord, RawMetricRecord, RecordId, SchemaRecord,
};
use super::repository::{AnalysisRepository, PermutationRepository, SchemaRepository};

/// A [`MemoryStore`] mirrored to a JSON file.
///
/// The whole store is rewritten after every mutation. The new snapshot is
/// written to a temporary file next to the target and renamed over it, so a
/// crash never leaves a truncated catalog behind.
pub struct FileStore {
    path: PathBuf,
    inner: MemoryStore,
}

impl FileStore {
    /// Open the store at `path`. A missing file is an empty store.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let inner = if path.exists() {
            let file = File::open(&path)
                .map_err(|e| EmmError::IoError(format!("Failed to open catalog {}: {}", path.display(), e)))?;
            let store: MemoryStore = serde_json::from_reader(BufReader::new(file))?;
            info!("Loaded catalog from {}", path.display());
            store
        } else {
            debug!("No catalog at {}, starting empty", path.display());
            MemoryStore::new()
        };

        Ok(Self { path, inner })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)
            .map_err(|e| EmmError::IoError(format!("Failed to create catalog directory: {}", e)))?;

        let mut temp = NamedTempFile::new_in(&dir)?;
        {
            let mut writer = BufWriter::new(temp.as_file_mut());
            serde_json::to_writer_pretty(&mut writer, &self.inner)?;
            writer.flush()?;
        }
        temp.as_file().sync_all()?;
        temp.persist(&self.path)
            .map_err(|e| EmmError::IoError(format!("Failed to write catalog {}: {}", self.path.display(), e.error)))?;
        Ok(())
    }

    fn mutate<T>(&mut self, change: impl FnOnce(&mut MemoryStore) -> Result<T>) -> Result<T> {
        let outcome = change(&mut self.inner)?;
        self.save()?;
        Ok(outcome)
    }
}

impl SchemaRepository for FileStore {
    fn find_by_name(&self, name: &str) -> Result<Option<SchemaRecord>> {
        self.inner.find_by_name(name)
    }

    fn list_all(&self) -> Result<Vec<SchemaRecord>> {
        self.inner.list_all()
    }

    fn delete(&mut self, schema_id: RecordId) -> Result<bool> {
        self.mutate(|store| store.delete(schema_id))
    }

    fn add(&mut self, schema: SchemaRecord) -> Result<SchemaRecord> {
        self.mutate(|store| SchemaRepository::add(store, schema))
    }
}

impl PermutationRepository for FileStore {
    fn list_existing_keys(&self, schema_id: RecordId) -> Result<HashSet<PermutationKey>> {
        self.inner.list_existing_keys(schema_id)
    }

    fn add(&mut self, permutation: PermutationRecord) -> Result<PermutationRecord> {
        self.mutate(|store| PermutationRepository::add(store, permutation))
    }

    fn list_for_schema(&self, schema_id: RecordId) -> Result<Vec<PermutationRecord>> {
        self.inner.list_for_schema(schema_id)
    }

    fn mark_populated(&mut self, permutation_id: RecordId) -> Result<()> {
        self.mutate(|store| store.mark_populated(permutation_id))
    }
}

impl AnalysisRepository for FileStore {
    fn add_analysis(&mut self, analysis: AnalysisRecord) -> Result<AnalysisRecord> {
        self.mutate(|store| store.add_analysis(analysis))
    }

    fn add_metric(&mut self, metric: RawMetricRecord) -> Result<()> {
        self.mutate(|store| store.add_metric(metric))
    }

    fn add_report(&mut self, report: AnalysisReport) -> Result<()> {
        self.mutate(|store| store.add_report(report))
    }

    fn list_analyses(&self, schema_id: RecordId) -> Result<Vec<AnalysisRecord>> {
        self.inner.list_analyses(schema_id)
    }

    fn list_metrics(&self, analysis_id: RecordId) -> Result<Vec<RawMetricRecord>> {
        self.inner.list_metrics(analysis_id)
    }

    fn list_reports(&self, analysis_id: RecordId) -> Result<Vec<AnalysisReport>> {
        self.inner.list_reports(analysis_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_empty_store() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(temp_dir.path().join("catalog.json")).unwrap();
        assert!(store.list_all().unwrap().is_empty());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_mutations_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("catalog.json");

        let mut store = FileStore::open(&path).unwrap();
        let schema = SchemaRepository::add(&mut store, SchemaRecord::new("shop", "orders")).unwrap();
        let baseline = PermutationRepository::add(&mut store, PermutationRecord::baseline(schema.id, "orders")).unwrap();
        PermutationRepository::add(
            &mut store,
            PermutationRecord::generated(schema.id, PermutationKey::from("10"), "shop_10"),
        )
        .unwrap();
        store.mark_populated(baseline.id).unwrap();
        assert!(path.exists());

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.find_by_name("shop").unwrap(), Some(schema.clone()));
        let permutations = reopened.list_for_schema(schema.id).unwrap();
        assert_eq!(permutations.len(), 2);
        assert!(permutations[0].populated);
        assert_eq!(permutations[1].key, Some(PermutationKey::from("10")));
    }

    #[test]
    fn test_ids_continue_after_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("catalog.json");

        let mut store = FileStore::open(&path).unwrap();
        let first = SchemaRepository::add(&mut store, SchemaRecord::new("shop", "orders")).unwrap();

        let mut reopened = FileStore::open(&path).unwrap();
        let second = SchemaRepository::add(&mut reopened, SchemaRecord::new("blog", "posts")).unwrap();
        assert!(second.id > first.id);
    }

    #[test]
    fn test_failed_mutation_is_not_written() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("catalog.json");

        let mut store = FileStore::open(&path).unwrap();
        assert!(store.mark_populated(1).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_corrupt_catalog_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("catalog.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(FileStore::open(&path), Err(EmmError::SerializationError(_))));
    }
}
