use std::fmt;
use std::str::FromStr;

use crate::core::EmmError;

/// How candidate column orderings are enumerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PermutationPolicy {
    /// Every ordering of every column: N! candidates.
    Exhaustive,
    /// Columns sharing a declared type stay together; only the order of the
    /// type groups changes.
    ClusterByDeclaredType,
    /// Reserved for an alignment-aware heuristic. Not implemented.
    Heuristic,
}

impl PermutationPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exhaustive => "all",
            Self::ClusterByDeclaredType => "type",
            Self::Heuristic => "magic",
        }
    }
}

impl fmt::Display for PermutationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermutationPolicy {
    type Err = EmmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" | "exhaustive" => Ok(Self::Exhaustive),
            "type" | "cluster_by_type" | "cluster_by_declared_type" => Ok(Self::ClusterByDeclaredType),
            "magic" | "heuristic" => Ok(Self::Heuristic),
            other => Err(EmmError::PolicyError(format!(
                "Permutation policy '{}' not valid, expected one of: all, type, magic",
                other
            ))),
        }
    }
}
