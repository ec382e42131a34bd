pub mod analyzer;
pub mod collector;
pub mod metrics;

use std::fmt;
use std::str::FromStr;

use crate::core::EmmError;

pub use analyzer::{compare, improvement_percentage, select_best};
pub use collector::WorkloadStats;
pub use metrics::ReadOnlyWorkload;

/// Which measurements a benchmark run takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BenchmarkKind {
    /// Table sizes, then read-only workloads
    #[default]
    All,
    Size,
    ReadOnly,
}

impl BenchmarkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Size => "size",
            Self::ReadOnly => "read_only",
        }
    }

    pub fn includes_size(&self) -> bool {
        matches!(self, Self::All | Self::Size)
    }

    pub fn includes_read_only(&self) -> bool {
        matches!(self, Self::All | Self::ReadOnly)
    }
}

impl fmt::Display for BenchmarkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BenchmarkKind {
    type Err = EmmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(Self::All),
            "size" | "table_size" | "disk" => Ok(Self::Size),
            "read_only" | "ro" => Ok(Self::ReadOnly),
            "read_write" | "rw" | "mix" => Err(EmmError::NotSupported(format!(
                "Benchmark '{}' is not available, only read-only workloads are measured",
                s
            ))),
            other => Err(EmmError::PolicyError(format!(
                "Benchmark '{}' not valid, expected one of: all, size, read_only",
                other
            ))),
        }
    }
}

/// Name of the table-size analysis of `schema`.
pub fn disk_analysis_name(schema: &str) -> String {
    format!("{}_disk_analysis", schema)
}

/// Name of the read-only workload analysis of `schema`.
pub fn read_only_analysis_name(schema: &str) -> String {
    format!("{}_read_only", schema)
}
