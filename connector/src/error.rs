//! Run-level error taxonomy.

use thiserror::Error;

use crate::config::ConfigError;
use crate::sink::SinkError;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Api(#[from] jira::JiraError),
    #[error(transparent)]
    Sink(#[from] SinkError),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
    #[error("no transition to '{target}' available on issue {issue}, available: {available}")]
    TransitionNotFound {
        issue: String,
        target: String,
        available: String,
    },
}
