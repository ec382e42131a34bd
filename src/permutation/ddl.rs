use crate::core::ColumnDefinition;
use super::{PermutationKey, PermutationSet};

/// Name of the table materializing one ordering: `<project>_<key>`.
pub fn permutation_table_name(project: &str, key: &PermutationKey) -> String {
    format!("{}_{}", project, key)
}

/// CREATE TABLE text for one ordering. Column definitions are reused verbatim,
/// so defaults, constraints and comments inside them survive.
pub fn synthesize_ddl(project: &str, key: &PermutationKey, columns: &[&ColumnDefinition]) -> String {
    let body = columns
        .iter()
        .map(|column| column.original_definition.as_str())
        .collect::<Vec<_>>()
        .join(",");

    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n{});",
        permutation_table_name(project, key),
        body
    )
}

impl PermutationSet {
    /// `(key, table name, DDL)` for every ordering, in generation order.
    pub fn ddl_statements(&self) -> Vec<(PermutationKey, String, String)> {
        let project = self.table().project();
        self.iter()
            .map(|(key, columns)| {
                (
                    key.clone(),
                    permutation_table_name(project, key),
                    synthesize_ddl(project, key, &columns),
                )
            })
            .collect()
    }
}
