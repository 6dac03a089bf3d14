//! Directed edges between entities.

use serde::{Deserialize, Serialize};

/// A directed edge. The key is a pure function of the endpoints and the
/// verb, so re-deriving it from the same inputs always yields the same key —
/// the diff engine depends on that idempotence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub key: String,
    #[serde(rename = "type")]
    pub relationship_type: String,
    /// The verb, e.g. `HAS`, `CREATED`, `REPORTED`.
    pub class: String,
    pub from_entity_key: String,
    pub to_entity_key: String,
}

impl Relationship {
    pub fn new(relationship_type: &str, verb: &str, from_entity_key: &str, to_entity_key: &str) -> Self {
        Relationship {
            key: relationship_key(from_entity_key, verb, to_entity_key),
            relationship_type: relationship_type.to_string(),
            class: verb.to_string(),
            from_entity_key: from_entity_key.to_string(),
            to_entity_key: to_entity_key.to_string(),
        }
    }
}

/// `"{fromKey}_{verb}_{toKey}"`, verb lowercased.
pub fn relationship_key(from_entity_key: &str, verb: &str, to_entity_key: &str) -> String {
    format!("{from_entity_key}_{}_{to_entity_key}", verb.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relationship_key_is_pure_over_its_inputs() {
        let first = relationship_key("jira_project_10000", "HAS", "jira_issue_47788");
        let second = relationship_key("jira_project_10000", "HAS", "jira_issue_47788");
        assert_eq!(first, second);
        assert_eq!(first, "jira_project_10000_has_jira_issue_47788");
    }

    #[test]
    fn new_relationship_carries_endpoints_and_verb() {
        let rel = Relationship::new(
            "jira_user_created_issue",
            "CREATED",
            "jira_user_abc",
            "jira_issue_1",
        );
        assert_eq!(rel.key, "jira_user_abc_created_jira_issue_1");
        assert_eq!(rel.class, "CREATED");
        assert_eq!(rel.from_entity_key, "jira_user_abc");
        assert_eq!(rel.to_entity_key, "jira_issue_1");
    }
}
