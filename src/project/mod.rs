pub mod data;

use std::fs;
use std::path::{Path, PathBuf};
use log::debug;

use crate::core::{EmmError, Result};

pub use data::retarget_inserts;

pub const SCHEMA_FILE: &str = "schema.sql";
pub const DATA_FILE: &str = "data.sql";

/// Where project DDL and seed data come from.
pub trait ProjectSource {
    /// Fails with `NotFound` unless both the DDL and the data script exist.
    fn validate(&self, project: &str) -> Result<()>;

    fn read_ddl(&self, project: &str) -> Result<String>;

    fn read_data(&self, project: &str) -> Result<String>;
}

/// Projects laid out as `<root>/<project>/schema.sql` and `data.sql`.
#[derive(Debug, Clone)]
pub struct FsProjectSource {
    root: PathBuf,
}

impl FsProjectSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn project_dir(&self, project: &str) -> PathBuf {
        self.root.join(project)
    }

    /// Names of the directories under the root that look like projects.
    pub fn list_projects(&self) -> Result<Vec<String>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }

        let mut projects = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if self.validate(&name).is_ok() {
                projects.push(name);
            }
        }
        projects.sort();
        Ok(projects)
    }

    fn read(&self, project: &str, file: &str) -> Result<String> {
        validate_identifier(project)?;
        let path = self.project_dir(project).join(file);
        debug!("Loading {} for project {} at {}", file, project, path.display());

        if !path.is_file() {
            return Err(EmmError::NotFound(format!(
                "Project '{}' has no {} at {}",
                project,
                file,
                path.display()
            )));
        }
        fs::read_to_string(&path)
            .map_err(|e| EmmError::IoError(format!("Failed to read {}: {}", path.display(), e)))
    }
}

impl ProjectSource for FsProjectSource {
    fn validate(&self, project: &str) -> Result<()> {
        validate_identifier(project)?;
        let dir = self.project_dir(project);
        if !dir.is_dir() {
            return Err(EmmError::NotFound(format!(
                "Project '{}' not found in {}",
                project,
                self.root.display()
            )));
        }
        for file in [SCHEMA_FILE, DATA_FILE] {
            if !dir.join(file).is_file() {
                return Err(EmmError::NotFound(format!(
                    "Project '{}' is missing {}",
                    project, file
                )));
            }
        }
        Ok(())
    }

    fn read_ddl(&self, project: &str) -> Result<String> {
        self.read(project, SCHEMA_FILE)
    }

    fn read_data(&self, project: &str) -> Result<String> {
        self.read(project, DATA_FILE)
    }
}

/// Project names become schema names and table-name prefixes, so they must be
/// plain SQL identifiers.
pub fn validate_identifier(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if valid_start && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(EmmError::ConfigError(format!(
            "'{}' is not a valid project name: use letters, digits and underscores, not starting with a digit",
            name
        )))
    }
}
