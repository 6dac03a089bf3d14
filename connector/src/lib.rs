//! Jira graph connector.
//!
//! Pulls account, project, user, and issue records from a Jira-compatible
//! REST API, converts them into normalized graph entities and relationships
//! with deterministic keys, and reconciles the result against the previously
//! persisted graph so only deltas reach the sink.
//!
//! Data flow: fetch client -> converters -> diff engine -> sink.

pub mod config;
pub mod content;
pub mod convert;
pub mod error;
pub mod issues;
pub mod models;
pub mod reconcile;
pub mod sink;
pub mod sync;

pub use config::JiraConfiguration;
pub use error::SyncError;
pub use reconcile::SyncSummary;
pub use sink::{GraphSink, MemorySink};
pub use sync::SyncPipeline;
