use std::fmt;
use serde::{Deserialize, Serialize};

use crate::core::{EmmError, Result};

/// Above this many columns a single digit can no longer name an index, so
/// indices are separated to keep keys unambiguous.
const SINGLE_DIGIT_LIMIT: usize = 10;
const SEPARATOR: &str = "_";

/// Identifies one column ordering by the original indices of its columns,
/// written in permuted order: `[c, a, b]` over `[a, b, c]` is `"201"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermutationKey(String);

impl PermutationKey {
    /// Build the key for `indices`, a permutation of `0..indices.len()`.
    pub fn from_indices(indices: &[usize]) -> Self {
        let parts: Vec<String> = indices.iter().map(|i| i.to_string()).collect();
        if indices.len() > SINGLE_DIGIT_LIMIT {
            Self(parts.join(SEPARATOR))
        } else {
            Self(parts.concat())
        }
    }

    /// Recover the index sequence for a table of `column_count` columns.
    pub fn decode(&self, column_count: usize) -> Result<Vec<usize>> {
        let indices: Vec<usize> = if column_count > SINGLE_DIGIT_LIMIT {
            self.0
                .split(SEPARATOR)
                .map(|part| part.parse::<usize>().map_err(|_| self.malformed(column_count)))
                .collect::<Result<_>>()?
        } else {
            self.0
                .chars()
                .map(|c| c.to_digit(10).map(|d| d as usize).ok_or_else(|| self.malformed(column_count)))
                .collect::<Result<_>>()?
        };

        let mut seen = vec![false; column_count];
        if indices.len() != column_count {
            return Err(self.malformed(column_count));
        }
        for &index in &indices {
            match seen.get_mut(index) {
                Some(slot) if !*slot => *slot = true,
                _ => return Err(self.malformed(column_count)),
            }
        }

        Ok(indices)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn malformed(&self, column_count: usize) -> EmmError {
        EmmError::ParseError(format!(
            "Permutation key '{}' is not an ordering of {} columns",
            self.0, column_count
        ))
    }
}

impl fmt::Display for PermutationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PermutationKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}
