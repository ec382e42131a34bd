// ============================================================================
// EMM: column-order permutation workbench
// ============================================================================

//! Finds a byte-alignment-friendly column order for a PostgreSQL table.
//!
//! A project's `CREATE TABLE` statement is parsed into its columns, candidate
//! orderings are generated and materialized as sibling tables, the project
//! data is loaded into each of them, and size and read-only workload figures
//! are compared against the original table.
//!
//! ```
//! use emm::{PermutationPolicy, generate, parse};
//!
//! let table = parse("CREATE TABLE t (id INT, name TEXT, flag BOOLEAN)")?.for_project("demo");
//! let set = generate(table, PermutationPolicy::ClusterByDeclaredType)?;
//! assert_eq!(set.len(), 5);
//! # Ok::<(), emm::EmmError>(())
//! ```

pub mod analysis;
pub mod config;
pub mod core;
pub mod executor;
pub mod facade;
pub mod parser;
pub mod permutation;
pub mod project;
pub mod storage;

// Re-export main types for convenience
pub use analysis::BenchmarkKind;
pub use config::EmmConfig;
pub use core::{ColumnDefinition, EmmError, Result, TableDefinition, Value};
pub use executor::{PgExecutor, QueryExecutor, QueryResult, Session, in_session};
pub use facade::Workbench;
pub use parser::parse;
pub use permutation::{PermutationKey, PermutationPolicy, PermutationSet, generate};
pub use project::{FsProjectSource, ProjectSource};
pub use storage::{FileStore, MemoryStore, MetadataStore};
