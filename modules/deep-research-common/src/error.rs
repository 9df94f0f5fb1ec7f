use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failure reported by a search backend for a single call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    #[error("search timed out")]
    Timeout,

    #[error("search failed: {0}")]
    Failed(String),
}

/// Why one retrieval attempt failed. Timeouts are logged separately but retried
/// like any other failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AttemptFailure {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Search(SearchError),
}

impl AttemptFailure {
    pub fn reason(&self) -> &'static str {
        match self {
            AttemptFailure::Timeout(_) | AttemptFailure::Search(SearchError::Timeout) => "timeout",
            AttemptFailure::Search(SearchError::Failed(_)) => "error",
        }
    }
}

/// Search failed on every attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("retrieval for {query:?} failed after {attempts} attempts: {last}")]
pub struct RetrievalError {
    pub query: String,
    pub attempts: u32,
    pub last: AttemptFailure,
}

/// An inference-service call failed or returned something that doesn't fit the schema.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("{task}: generation timed out after {timeout:?}")]
    Timeout { task: String, timeout: Duration },

    #[error("{task}: generation failed: {message}")]
    Provider { task: String, message: String },

    #[error("{task}: malformed response: {message}")]
    Malformed { task: String, message: String },
}

impl GenerationError {
    pub fn task(&self) -> &str {
        match self {
            GenerationError::Timeout { task, .. }
            | GenerationError::Provider { task, .. }
            | GenerationError::Malformed { task, .. } => task,
        }
    }
}

/// Errors that abort a research call. Retrieval failures never appear here: they
/// are contained at the branch that hit them.
#[derive(Error, Debug)]
pub enum ResearchError {
    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("failed to read clarifying answer: {0}")]
    Feedback(#[source] std::io::Error),

    #[error("research was cancelled")]
    Cancelled,
}

#[derive(Error, Debug)]
#[error("no free file name for {base:?} in {dir} after {attempts} attempts")]
pub struct FileCollisionError {
    pub dir: PathBuf,
    pub base: String,
    pub attempts: u32,
}

#[derive(Error, Debug)]
pub enum WriteError {
    #[error(transparent)]
    Collision(#[from] FileCollisionError),

    #[error("failed to write report to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("{key} has an invalid value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}
