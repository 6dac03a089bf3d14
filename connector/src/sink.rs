//! Persistence seam for the downstream graph store.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

use crate::models::{Entity, Relationship};
use crate::reconcile::{OperationBatch, SyncSummary};

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink rejected batch for {kind} '{type_name}': {reason}")]
    Rejected {
        kind: &'static str,
        type_name: String,
        reason: String,
    },
    #[error("sink unavailable: {0}")]
    Unavailable(String),
}

/// The graph store the pipeline reconciles against. Reads return the full
/// previously persisted collection for one type; `apply` commits a batch of
/// create/update/delete operations and reports counts.
#[async_trait]
pub trait GraphSink: Send + Sync {
    async fn entities_by_type(&self, entity_type: &str) -> Result<Vec<Entity>, SinkError>;

    async fn relationships_by_type(
        &self,
        relationship_type: &str,
    ) -> Result<Vec<Relationship>, SinkError>;

    async fn apply(&self, batch: OperationBatch) -> Result<SyncSummary, SinkError>;
}

/// In-memory sink used by tests and local runs.
#[derive(Default)]
pub struct MemorySink {
    entities: RwLock<HashMap<String, HashMap<String, Entity>>>,
    relationships: RwLock<HashMap<String, HashMap<String, Relationship>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn entity(&self, entity_type: &str, key: &str) -> Option<Entity> {
        self.entities
            .read()
            .await
            .get(entity_type)
            .and_then(|by_key| by_key.get(key))
            .cloned()
    }
}

#[async_trait]
impl GraphSink for MemorySink {
    async fn entities_by_type(&self, entity_type: &str) -> Result<Vec<Entity>, SinkError> {
        let entities = self.entities.read().await;
        Ok(entities
            .get(entity_type)
            .map(|by_key| by_key.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn relationships_by_type(
        &self,
        relationship_type: &str,
    ) -> Result<Vec<Relationship>, SinkError> {
        let relationships = self.relationships.read().await;
        Ok(relationships
            .get(relationship_type)
            .map(|by_key| by_key.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn apply(&self, batch: OperationBatch) -> Result<SyncSummary, SinkError> {
        let mut summary = SyncSummary::default();

        let mut entities = self.entities.write().await;
        for (entity_type, changes) in batch.entities {
            summary.record(&changes);
            let by_key = entities.entry(entity_type.clone()).or_default();
            for entity in changes.creates.into_iter().chain(changes.updates) {
                by_key.insert(entity.key.clone(), entity);
            }
            for key in &changes.deletes {
                by_key.remove(key);
            }
            debug!(entity_type = %entity_type, total = by_key.len(), "applied entity changes");
        }

        let mut relationships = self.relationships.write().await;
        for (relationship_type, changes) in batch.relationships {
            summary.record(&changes);
            let by_key = relationships.entry(relationship_type).or_default();
            for relationship in changes.creates.into_iter().chain(changes.updates) {
                by_key.insert(relationship.key.clone(), relationship);
            }
            for key in &changes.deletes {
                by_key.remove(key);
            }
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::diff_by_key;

    fn entity(id: &str) -> Entity {
        Entity::new("jira_issue", id, &["Record"])
    }

    #[tokio::test]
    async fn applying_a_diff_transforms_old_state_into_new_state() {
        let sink = MemorySink::new();

        let mut seed = OperationBatch::default();
        seed.add_entities(
            "jira_issue",
            diff_by_key(&[], &[entity("1"), entity("2")]),
        );
        sink.apply(seed).await.unwrap();

        let old = sink.entities_by_type("jira_issue").await.unwrap();
        let new = vec![entity("2"), entity("3")];
        let mut batch = OperationBatch::default();
        batch.add_entities("jira_issue", diff_by_key(&old, &new));
        let summary = sink.apply(batch).await.unwrap();

        assert_eq!(summary.created, 1);
        assert_eq!(summary.updated, 1);
        assert_eq!(summary.deleted, 1);

        let mut keys: Vec<String> = sink
            .entities_by_type("jira_issue")
            .await
            .unwrap()
            .into_iter()
            .map(|entity| entity.key)
            .collect();
        keys.sort();
        assert_eq!(keys, vec!["jira_issue_2", "jira_issue_3"]);
    }
}
