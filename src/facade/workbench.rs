use log::{info, warn};

use crate::analysis::collector::{self, measure_workload, workload_observation};
use crate::analysis::metrics::ENABLE_STATEMENT_STATS;
use crate::analysis::{BenchmarkKind, ReadOnlyWorkload, compare, disk_analysis_name, read_only_analysis_name};
use crate::core::{EmmError, Result, TableDefinition, quote_identifier};
use crate::executor::{QueryExecutor, in_session};
use crate::parser;
use crate::permutation::{PermutationKey, PermutationPolicy, generate};
use crate::project::{ProjectSource, retarget_inserts, validate_identifier};
use crate::storage::{
    AnalysisKind, AnalysisRecord, AnalysisReport, MetadataStore, PermutationRecord,
    PermutationRepository, RawMetricRecord, RecordId, SchemaRecord, SchemaRepository,
};

const DEFAULT_WORKLOAD_ITERATIONS: u32 = 50;

/// Drives the whole workflow for a project: initialize the original table,
/// materialize permutations, load data, benchmark and compare.
pub struct Workbench<E, S, P> {
    executor: E,
    store: S,
    projects: P,
    workload_iterations: u32,
}

impl<E, S, P> Workbench<E, S, P>
where
    E: QueryExecutor,
    S: MetadataStore,
    P: ProjectSource,
{
    pub fn new(executor: E, store: S, projects: P) -> Self {
        Self {
            executor,
            store,
            projects,
            workload_iterations: DEFAULT_WORKLOAD_ITERATIONS,
        }
    }

    pub fn with_workload_iterations(mut self, iterations: u32) -> Self {
        self.workload_iterations = iterations;
        self
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn projects(&self) -> &P {
        &self.projects
    }

    // ========================================================================
    // Schemas
    // ========================================================================

    pub fn list_schemas(&self) -> Result<Vec<SchemaRecord>> {
        self.store.list_all()
    }

    pub fn find_schema(&self, project: &str) -> Result<SchemaRecord> {
        self.store.find_by_name(project)?.ok_or_else(|| {
            EmmError::NotFound(format!("Schema '{}' not found, run init first", project))
        })
    }

    /// Read and parse the project's DDL.
    pub fn read_table(&self, project: &str) -> Result<TableDefinition> {
        self.load_project(project).map(|(_, table)| table)
    }

    fn load_project(&self, project: &str) -> Result<(String, TableDefinition)> {
        validate_identifier(project)?;
        self.projects.validate(project)?;
        let ddl = self.projects.read_ddl(project)?;
        let table = parser::parse(&ddl)?.for_project(project);
        Ok((ddl, table))
    }

    /// Create the project namespace and the original table in it.
    pub fn initialize_schema(&mut self, project: &str) -> Result<SchemaRecord> {
        let (ddl, table) = self.load_project(project)?;
        if table.is_qualified() {
            return Err(EmmError::ParseError(format!(
                "Table '{}' of project '{}' is schema-qualified, the table has to be created in schema '{}'",
                table.table_name().unwrap_or_default(),
                project,
                project
            )));
        }
        let table_name = table
            .relation_name()
            .ok_or_else(|| EmmError::ParseError(format!("Project '{}' DDL has no table name", project)))?
            .to_string();

        if self.store.find_by_name(project)?.is_some() {
            return Err(EmmError::ConflictError(format!(
                "Schema '{}' is already initialized, run clean first",
                project
            )));
        }

        in_session(&mut self.executor, |session| {
            session.batch(&format!("CREATE SCHEMA IF NOT EXISTS {}", project))?;
            session.set_search_path(project)?;
            session.batch(&ddl)?;
            session.reset_search_path()
        })?;

        let schema = SchemaRepository::add(&mut self.store, SchemaRecord::new(project, table_name))?;
        info!(
            "Initialized schema {} with table {} ({} columns)",
            schema.name,
            schema.original_table_name,
            table.column_count()
        );
        Ok(schema)
    }

    /// Drop the project namespace and forget everything recorded about it.
    /// Returns false if no schema was recorded.
    pub fn clean(&mut self, project: &str) -> Result<bool> {
        validate_identifier(project)?;

        in_session(&mut self.executor, |session| {
            session.batch(&format!("DROP SCHEMA IF EXISTS {} CASCADE", project))
        })?;

        let removed = match self.store.find_by_name(project)? {
            Some(schema) => self.store.delete(schema.id)?,
            None => false,
        };
        info!("Cleaned project {}", project);
        Ok(removed)
    }

    // ========================================================================
    // Permutations
    // ========================================================================

    pub fn permutations(&self, project: &str) -> Result<Vec<PermutationRecord>> {
        let schema = self.find_schema(project)?;
        self.store.list_for_schema(schema.id)
    }

    pub fn generate_permutations_for_project(
        &mut self,
        project: &str,
        policy: PermutationPolicy,
    ) -> Result<Vec<PermutationRecord>> {
        let table = self.read_table(project)?;
        self.generate_permutations(table, policy)
    }

    /// Materialize every ordering `policy` yields for `table`, each in its own
    /// session, and record it. Fails without touching anything if any of the
    /// orderings already exists for the project.
    pub fn generate_permutations(
        &mut self,
        table: TableDefinition,
        policy: PermutationPolicy,
    ) -> Result<Vec<PermutationRecord>> {
        let project = table.project().to_string();
        validate_identifier(&project)?;
        let schema = self.find_schema(&project)?;

        let set = generate(table, policy)?;

        let existing = self.store.list_existing_keys(schema.id)?;
        let clashes: Vec<&PermutationKey> = set.keys().filter(|key| existing.contains(*key)).collect();
        if let Some(first) = clashes.first() {
            return Err(EmmError::ConflictError(format!(
                "{} permutations of project '{}' already exist (first: {}), run clean first",
                clashes.len(),
                project,
                first
            )));
        }

        self.ensure_baseline(&schema)?;

        let mut created = Vec::with_capacity(set.len());
        for (key, name, ddl) in set.ddl_statements() {
            in_session(&mut self.executor, |session| {
                session.set_search_path(&project)?;
                session.batch(&ddl)?;
                session.reset_search_path()
            })?;
            let record = PermutationRepository::add(&mut self.store, PermutationRecord::generated(schema.id, key, name))?;
            created.push(record);
        }

        info!(
            "Materialized {} permutations of {} with policy {}",
            created.len(),
            project,
            policy
        );
        Ok(created)
    }

    fn ensure_baseline(&mut self, schema: &SchemaRecord) -> Result<PermutationRecord> {
        let existing = self
            .store
            .list_for_schema(schema.id)?
            .into_iter()
            .find(PermutationRecord::is_baseline);
        match existing {
            Some(baseline) => Ok(baseline),
            None => PermutationRepository::add(
                &mut self.store,
                PermutationRecord::baseline(schema.id, schema.original_table_name.clone()),
            ),
        }
    }

    // ========================================================================
    // Data
    // ========================================================================

    /// Load the project data script into the original table and, unless
    /// `only_original`, into every permutation. Returns the number of tables
    /// populated.
    pub fn populate(&mut self, project: &str, only_original: bool) -> Result<usize> {
        let schema = self.find_schema(project)?;
        let table = self.read_table(project)?;
        let data = self.projects.read_data(project)?;
        self.ensure_baseline(&schema)?;

        let columns: Vec<String> = table.columns().iter().map(|c| c.sql_identifier()).collect();
        let targets: Vec<PermutationRecord> = self
            .store
            .list_for_schema(schema.id)?
            .into_iter()
            .filter(|p| !only_original || p.is_baseline())
            .collect();

        for permutation in &targets {
            let target = quote_identifier(&permutation.name);
            // the baseline keeps the source column order, positional rows fit as they are
            let script = if permutation.is_baseline() {
                retarget_inserts(&data, &target, &[])
            } else {
                retarget_inserts(&data, &target, &columns)
            };

            in_session(&mut self.executor, |session| {
                session.set_search_path(&schema.name)?;
                session.batch(&script)?;
                session.reset_search_path()
            })?;
            self.store.mark_populated(permutation.id)?;
            info!("Populated {}", permutation.name);
        }

        Ok(targets.len())
    }

    // ========================================================================
    // Analysis
    // ========================================================================

    /// Measure every permutation of the project and compare it with the
    /// original table. Reports of a `BenchmarkKind::All` run list the size
    /// metrics first.
    pub fn run_analysis(&mut self, project: &str, kind: BenchmarkKind) -> Result<Vec<AnalysisReport>> {
        let schema = self.find_schema(project)?;
        let permutations = self.store.list_for_schema(schema.id)?;
        if permutations.is_empty() {
            return Err(EmmError::NotFound(format!(
                "Project '{}' has no permutations, run perms first",
                project
            )));
        }
        for permutation in permutations.iter().filter(|p| !p.populated) {
            warn!("{} was never populated, its figures will be of an empty table", permutation.name);
        }

        let mut reports = Vec::new();
        if kind.includes_size() {
            reports.extend(self.analyze_sizes(&schema, &permutations)?);
        }
        if kind.includes_read_only() {
            reports.extend(self.analyze_read_only(&schema, &permutations)?);
        }
        Ok(reports)
    }

    fn analyze_sizes(
        &mut self,
        schema: &SchemaRecord,
        permutations: &[PermutationRecord],
    ) -> Result<Vec<AnalysisReport>> {
        let sizes = in_session(&mut self.executor, |session| {
            collector::query_table_sizes(session, &schema.name)
        })?;

        let analysis = self.store.add_analysis(AnalysisRecord::new(
            schema.id,
            disk_analysis_name(&schema.name),
            "Analysis of the tables sizes",
            AnalysisKind::DiskSize,
        ))?;
        let observations = collector::size_observations(&sizes, permutations, analysis.id);
        self.record(&analysis, observations, permutations, &schema.original_table_name)
    }

    fn analyze_read_only(
        &mut self,
        schema: &SchemaRecord,
        permutations: &[PermutationRecord],
    ) -> Result<Vec<AnalysisReport>> {
        in_session(&mut self.executor, |session| session.batch(ENABLE_STATEMENT_STATS))?;

        let analysis = self.store.add_analysis(AnalysisRecord::new(
            schema.id,
            read_only_analysis_name(&schema.name),
            "Analysis of the read-only performance",
            AnalysisKind::PerformanceReadOnly,
        ))?;

        let iterations = self.workload_iterations;
        let mut observations = Vec::new();
        for permutation in permutations {
            let measured = in_session(&mut self.executor, |session| {
                session.set_search_path(&schema.name)?;
                let mut measured = Vec::new();
                for workload in ReadOnlyWorkload::ALL {
                    match measure_workload(session, &permutation.name, workload, iterations)? {
                        Some(stats) => {
                            measured.push(workload_observation(analysis.id, permutation, workload, stats))
                        }
                        None => warn!(
                            "No statistics recorded for {} on {}. Skipping it",
                            workload, permutation.name
                        ),
                    }
                }
                session.reset_search_path()?;
                Ok(measured)
            })?;
            observations.extend(measured);
        }

        self.record(&analysis, observations, permutations, &schema.original_table_name)
    }

    fn record(
        &mut self,
        analysis: &AnalysisRecord,
        observations: Vec<RawMetricRecord>,
        permutations: &[PermutationRecord],
        baseline_name: &str,
    ) -> Result<Vec<AnalysisReport>> {
        let reports = compare(analysis.id, &observations, permutations, baseline_name);

        for observation in observations {
            self.store.add_metric(observation)?;
        }
        for report in &reports {
            self.store.add_report(report.clone())?;
        }

        info!("Analysis {} produced {} reports", analysis.name, reports.len());
        Ok(reports)
    }

    pub fn analyses(&self, project: &str) -> Result<Vec<AnalysisRecord>> {
        let schema = self.find_schema(project)?;
        self.store.list_analyses(schema.id)
    }

    pub fn reports(&self, analysis_id: RecordId) -> Result<Vec<AnalysisReport>> {
        self.store.list_reports(analysis_id)
    }
}
