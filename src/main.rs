use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use emm::storage::{AnalysisRepository, PermutationRepository, SchemaRepository};
use emm::{
    BenchmarkKind, EmmConfig, FileStore, FsProjectSource, PermutationPolicy, PgExecutor, Workbench,
};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "emm")]
#[command(about = "Materializes column-order permutations of a table and benchmarks them")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the projects on disk and the schemas already initialized
    Ls,
    /// Create the project schema and its original table
    Init { project: String },
    /// Generate and materialize column-order permutations
    Perms {
        project: String,
        #[arg(long, default_value = "type")]
        policy: String,
    },
    /// Load the project data into the original table and its permutations
    Populate {
        project: String,
        #[arg(long)]
        only_original: bool,
    },
    /// Measure every permutation and compare it with the original table
    Benchmark {
        project: String,
        #[arg(long, default_value = "all")]
        kind: String,
    },
    /// Print the stored comparison reports of a project
    Reports { project: String },
    /// Drop the project schema and everything recorded about it
    Clean {
        project: String,
        #[arg(long)]
        dry_run: bool,
    },
    /// Print the effective configuration
    Env,
}

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = EmmConfig::from_env().context("failed to load configuration")?;
    config.validate().context("invalid configuration")?;

    match cli.command {
        Command::Ls => list(&config),
        Command::Env => {
            print_env(&config);
            Ok(())
        }
        Command::Reports { project } => print_reports(&config, &project),
        Command::Clean { project, dry_run: true } => preview_clean(&config, &project),
        Command::Init { project } => {
            let mut workbench = open_workbench(&config)?;
            let schema = workbench
                .initialize_schema(&project)
                .with_context(|| format!("failed to initialize project {}", project))?;
            println!("Initialized {} ({})", schema.name, schema.original_table_name);
            Ok(())
        }
        Command::Perms { project, policy } => {
            let policy: PermutationPolicy = policy.parse()?;
            let mut workbench = open_workbench(&config)?;
            let created = workbench
                .generate_permutations_for_project(&project, policy)
                .with_context(|| format!("failed to generate permutations of {}", project))?;
            for permutation in &created {
                println!("{}", permutation.name);
            }
            println!("{} permutations created with policy {}", created.len(), policy);
            Ok(())
        }
        Command::Populate { project, only_original } => {
            let mut workbench = open_workbench(&config)?;
            let populated = workbench
                .populate(&project, only_original)
                .with_context(|| format!("failed to populate {}", project))?;
            println!("Populated {} tables", populated);
            Ok(())
        }
        Command::Benchmark { project, kind } => {
            let kind: BenchmarkKind = kind.parse()?;
            let mut workbench = open_workbench(&config)?;
            let reports = workbench
                .run_analysis(&project, kind)
                .with_context(|| format!("failed to benchmark {}", project))?;
            if reports.is_empty() {
                println!("No reports produced");
            }
            for report in &reports {
                println!("{}", report);
            }
            Ok(())
        }
        Command::Clean { project, dry_run: false } => {
            let mut workbench = open_workbench(&config)?;
            let removed = workbench
                .clean(&project)
                .with_context(|| format!("failed to clean {}", project))?;
            if removed {
                println!("Cleaned {}", project);
            } else {
                println!("Dropped schema {}, nothing was recorded for it", project);
            }
            Ok(())
        }
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("emm=info")))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn open_store(config: &EmmConfig) -> Result<FileStore> {
    FileStore::open(&config.catalog_path)
        .with_context(|| format!("failed to open catalog {}", config.catalog_path.display()))
}

fn open_workbench(config: &EmmConfig) -> Result<Workbench<PgExecutor, FileStore, FsProjectSource>> {
    let store = open_store(config)?;
    let executor = PgExecutor::connect(config)
        .with_context(|| format!("failed to connect to {}", config.to_url()))?;
    info!("Connected to {}", config.to_url());

    Ok(Workbench::new(executor, store, FsProjectSource::new(&config.projects_dir))
        .with_workload_iterations(config.workload_iterations))
}

fn list(config: &EmmConfig) -> Result<()> {
    let projects = FsProjectSource::new(&config.projects_dir).list_projects()?;
    println!("Projects in {}:", config.projects_dir.display());
    for project in &projects {
        println!("  {}", project);
    }

    let store = open_store(config)?;
    let schemas = store.list_all()?;
    println!("Initialized schemas:");
    for schema in &schemas {
        let permutations = store.list_for_schema(schema.id)?;
        let populated = permutations.iter().filter(|p| p.populated).count();
        println!(
            "  {} ({}): {} tables, {} populated, created {}",
            schema.name,
            schema.original_table_name,
            permutations.len(),
            populated,
            schema.created.format("%Y-%m-%d %H:%M:%S")
        );
    }
    Ok(())
}

fn print_env(config: &EmmConfig) {
    println!("database:            {}", config.to_url());
    println!("projects directory:  {}", config.projects_dir.display());
    println!("catalog:             {}", config.catalog_path.display());
    println!("workload iterations: {}", config.workload_iterations);
    println!("connect timeout:     {}s", config.connect_timeout.as_secs());
}

fn print_reports(config: &EmmConfig, project: &str) -> Result<()> {
    let store = open_store(config)?;
    let schema = store
        .find_by_name(project)?
        .ok_or_else(|| anyhow!("project {} is not initialized", project))?;

    let analyses = store.list_analyses(schema.id)?;
    if analyses.is_empty() {
        println!("No analyses recorded for {}, run benchmark first", project);
    }
    for analysis in &analyses {
        println!("{} [{}] {}", analysis.name, analysis.kind, analysis.description);
        let reports = store.list_reports(analysis.id)?;
        if let Some(rows) = reports.iter().find_map(|r| r.baseline_row_estimate) {
            println!("  estimated rows: {}", rows);
        }
        for report in &reports {
            println!("  {}", report);
        }
    }
    Ok(())
}

fn preview_clean(config: &EmmConfig, project: &str) -> Result<()> {
    emm::project::validate_identifier(project)?;
    println!("Would run: DROP SCHEMA IF EXISTS {} CASCADE", project);

    let store = open_store(config)?;
    match store.find_by_name(project)? {
        Some(schema) => {
            let permutations = store.list_for_schema(schema.id)?;
            let analyses = store.list_analyses(schema.id)?;
            println!(
                "Would forget schema {} with {} tables and {} analyses",
                schema.name,
                permutations.len(),
                analyses.len()
            );
        }
        None => println!("Nothing is recorded for {}", project),
    }
    Ok(())
}
