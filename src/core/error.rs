use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmmError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Policy error: {0}")]
    PolicyError(String),

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Conflict: {0}")]
    ConflictError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Execution error: {0}")]
    ExecutionError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl EmmError {
    /// Wrap a failure reported by the execution collaborator with the
    /// statement or step it happened in.
    pub fn execution(context: impl std::fmt::Display, err: impl std::fmt::Display) -> Self {
        Self::ExecutionError(format!("{}: {}", context, err))
    }
}

pub type Result<T> = std::result::Result<T, EmmError>;

impl From<std::io::Error> for EmmError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for EmmError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

impl From<sqlparser::tokenizer::TokenizerError> for EmmError {
    fn from(err: sqlparser::tokenizer::TokenizerError) -> Self {
        Self::ParseError(err.to_string())
    }
}

impl From<tokio_postgres::Error> for EmmError {
    fn from(err: tokio_postgres::Error) -> Self {
        Self::ExecutionError(err.to_string())
    }
}
