//! Diff-based reconciliation between a previously persisted graph snapshot
//! and the freshly converted one.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::models::{Entity, Keyed, Relationship};

/// The operations that transform one keyed collection into another.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeSet<T> {
    pub creates: Vec<T>,
    pub updates: Vec<T>,
    pub deletes: Vec<String>,
}

// Manual impl: an empty change set needs no `T: Default` bound.
impl<T> Default for ChangeSet<T> {
    fn default() -> Self {
        ChangeSet {
            creates: Vec::new(),
            updates: Vec::new(),
            deletes: Vec::new(),
        }
    }
}

impl<T> ChangeSet<T> {
    pub fn is_empty(&self) -> bool {
        self.creates.is_empty() && self.updates.is_empty() && self.deletes.is_empty()
    }
}

/// Index both sides by key, then walk the union.
///
/// Keys only in `new` become creates, keys in both become updates
/// (unconditionally, the sink owns no-op detection), keys only in `old`
/// become deletes. BTreeMap indexing keeps the output ordering
/// deterministic, so diffing the same inputs twice yields identical
/// operation lists.
pub fn diff_by_key<T: Keyed + Clone>(old: &[T], new: &[T]) -> ChangeSet<T> {
    let old_index: BTreeMap<&str, &T> = old.iter().map(|item| (item.key(), item)).collect();
    let new_index: BTreeMap<&str, &T> = new.iter().map(|item| (item.key(), item)).collect();

    let mut change_set = ChangeSet::default();
    for (key, item) in &new_index {
        if old_index.contains_key(key) {
            change_set.updates.push((*item).clone());
        } else {
            change_set.creates.push((*item).clone());
        }
    }
    for key in old_index.keys() {
        if !new_index.contains_key(key) {
            change_set.deletes.push((*key).to_string());
        }
    }
    change_set
}

/// One run's worth of operations, grouped by entity and relationship type.
#[derive(Debug, Default)]
pub struct OperationBatch {
    pub entities: HashMap<String, ChangeSet<Entity>>,
    pub relationships: HashMap<String, ChangeSet<Relationship>>,
}

impl OperationBatch {
    pub fn add_entities(&mut self, entity_type: &str, changes: ChangeSet<Entity>) {
        if !changes.is_empty() {
            self.entities.insert(entity_type.to_string(), changes);
        }
    }

    pub fn add_relationships(&mut self, relationship_type: &str, changes: ChangeSet<Relationship>) {
        if !changes.is_empty() {
            self.relationships
                .insert(relationship_type.to_string(), changes);
        }
    }
}

/// Counts reported back by the sink after applying a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
}

impl SyncSummary {
    pub fn record<T>(&mut self, changes: &ChangeSet<T>) {
        self.created += changes.creates.len();
        self.updated += changes.updates.len();
        self.deleted += changes.deletes.len();
    }
}
