use serde::{Deserialize, Serialize};

/// Write a catalog name as a SQL identifier. Names PostgreSQL would fold to
/// themselves stay bare, anything else is double-quoted.
pub fn quote_identifier(name: &str) -> String {
    let mut chars = name.chars();
    let plain = chars
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '$');

    if plain {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

/// One column of a parsed CREATE TABLE statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub name: String,
    /// Upper-cased built-in type keyword, e.g. `INTEGER`, `TEXT`.
    pub declared_type: String,
    /// The column's definition exactly as written in the source, without the
    /// delimiter that ended it.
    pub original_definition: String,
}

impl ColumnDefinition {
    pub fn new(
        name: impl Into<String>,
        declared_type: impl Into<String>,
        original_definition: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            declared_type: declared_type.into().to_uppercase(),
            original_definition: original_definition.into(),
        }
    }

    /// The column name as it has to be written in SQL: double-quoted if it was
    /// quoted in the source definition, bare otherwise.
    pub fn sql_identifier(&self) -> String {
        if self.original_definition.trim_start().starts_with('"') {
            format!("\"{}\"", self.name.replace('"', "\"\""))
        } else {
            self.name.clone()
        }
    }
}

/// The table described by a project's DDL.
///
/// The table name can be set only once; the column list keeps source order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDefinition {
    project: String,
    table_name: Option<String>,
    columns: Vec<ColumnDefinition>,
}

impl TableDefinition {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            table_name: None,
            columns: Vec::new(),
        }
    }

    /// Attach the definition to a project, keeping the parsed contents.
    pub fn for_project(mut self, project: impl Into<String>) -> Self {
        self.project = project.into();
        self
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    /// The table name as the catalog stores it: unquoted parts lower-cased,
    /// quoted parts verbatim, parts joined with `.`.
    pub fn table_name(&self) -> Option<&str> {
        self.table_name.as_deref()
    }

    /// The table name without its schema qualification.
    pub fn relation_name(&self) -> Option<&str> {
        self.table_name()
            .map(|name| name.rsplit('.').next().unwrap_or(name))
    }

    pub fn is_qualified(&self) -> bool {
        self.table_name() != self.relation_name()
    }

    /// Returns false (and leaves the name untouched) if a name was already set.
    pub fn set_table_name(&mut self, name: impl Into<String>) -> bool {
        if self.table_name.is_some() {
            return false;
        }
        self.table_name = Some(name.into());
        true
    }

    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn find_column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|col| col.name == name)
    }

    pub fn add_column(&mut self, column: ColumnDefinition) {
        self.columns.push(column);
    }
}
