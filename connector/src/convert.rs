//! Pure mapping from remote Jira records to graph entities and relationships.
//!
//! Converters do no I/O and never retry. A malformed record is the caller's
//! problem to catch and skip; nothing here aborts a batch.

use std::collections::HashMap;

use jira::types::{Field, Issue, Project, ServerInfo, User};
use serde_json::Value;
use tracing::debug;

use crate::content::{document_to_text, extract_value, AdfNode, ListMode};
use crate::models::{Entity, Relationship};

pub const ENTITY_TYPE_ACCOUNT: &str = "jira_account";
pub const ENTITY_TYPE_PROJECT: &str = "jira_project";
pub const ENTITY_TYPE_USER: &str = "jira_user";
pub const ENTITY_TYPE_ISSUE: &str = "jira_issue";

pub const RELATIONSHIP_TYPE_ACCOUNT_PROJECT: &str = "jira_account_has_project";
pub const RELATIONSHIP_TYPE_PROJECT_ISSUE: &str = "jira_project_has_issue";
pub const RELATIONSHIP_TYPE_USER_CREATED_ISSUE: &str = "jira_user_created_issue";
pub const RELATIONSHIP_TYPE_USER_REPORTED_ISSUE: &str = "jira_user_reported_issue";

const VERB_HAS: &str = "HAS";
const VERB_CREATED: &str = "CREATED";
const VERB_REPORTED: &str = "REPORTED";

/// Resolves configured custom-field selectors against the instance's field
/// listing. Selectors come in three forms: a full `customfield_<digits>` id,
/// bare digits, or a camel-cased alias of the field's display name.
#[derive(Debug, Default)]
pub struct CustomFieldIndex {
    /// field id -> attribute name to store it under
    selected: HashMap<String, String>,
}

impl CustomFieldIndex {
    pub fn new(selectors: &[String], fields: &[Field]) -> Self {
        let mut selected = HashMap::new();
        for selector in selectors {
            let selector = selector.trim();
            if selector.is_empty() {
                continue;
            }
            if selector.starts_with("customfield_") {
                selected.insert(selector.to_string(), selector.to_string());
            } else if selector.chars().all(|c| c.is_ascii_digit()) {
                let id = format!("customfield_{selector}");
                selected.insert(id.clone(), id);
            } else if let Some(field) = fields
                .iter()
                .find(|field| field.custom && camel_case(&field.name) == selector)
            {
                selected.insert(field.id.clone(), selector.to_string());
            } else {
                debug!(selector = %selector, "custom field selector matched no field, skipping");
            }
        }
        CustomFieldIndex { selected }
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    fn attribute_name(&self, field_id: &str) -> Option<&str> {
        self.selected.get(field_id).map(String::as_str)
    }
}

fn camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for (index, word) in name.split_whitespace().enumerate() {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            if index == 0 {
                out.extend(first.to_lowercase());
            } else {
                out.extend(first.to_uppercase());
            }
            out.extend(chars.flat_map(|c| c.to_lowercase()));
        }
    }
    out
}

pub fn account_entity(host: &str, info: &ServerInfo) -> Entity {
    let mut entity = Entity::new(ENTITY_TYPE_ACCOUNT, host, &["Account"]);
    entity.set("name", host);
    if !info.base_url.is_empty() {
        entity.set("baseUrl", info.base_url.clone());
    }
    if let Some(version) = &info.version {
        entity.set("version", version.clone());
    }
    if let Some(deployment) = &info.deployment_type {
        entity.set("deploymentType", deployment.clone());
    }
    entity
}

pub fn project_entity(project: &Project) -> Entity {
    let mut entity = Entity::new(ENTITY_TYPE_PROJECT, &project.id, &["Project"]);
    entity.set("key", project.key.clone());
    entity.set(
        "name",
        project.name.clone().unwrap_or_else(|| project.key.clone()),
    );
    if let Some(url) = &project.self_url {
        entity.set("webLink", url.clone());
    }
    if let Some(kind) = &project.project_type_key {
        entity.set("projectType", kind.clone());
    }
    entity
}

pub fn user_entity(user: &User) -> Option<Entity> {
    let provider_id = user.provider_id()?;
    let mut entity = Entity::new(ENTITY_TYPE_USER, provider_id, &["User"]);
    entity.set(
        "name",
        user.display_name
            .clone()
            .unwrap_or_else(|| provider_id.to_string()),
    );
    if let Some(email) = &user.email_address {
        entity.set("email", email.clone());
    }
    entity.set("active", user.active);
    if let Some(tz) = &user.time_zone {
        entity.set("timeZone", tz.clone());
    }
    Some(entity)
}

/// Convert an issue record. Custom fields are selected through `index` and
/// flattened with [`extract_value`]; the description arrives either as a
/// plain string (API v2) or a rich-document object (API v3).
pub fn issue_entity(issue: &Issue, index: &CustomFieldIndex, mode: ListMode) -> Entity {
    let fields = &issue.fields;
    let mut entity = Entity::new(ENTITY_TYPE_ISSUE, &issue.id, &["Record", "Issue"]);
    entity.set("name", issue.key.clone());
    entity.set("issueKey", issue.key.clone());
    if let Some(summary) = &fields.summary {
        entity.set("summary", summary.clone());
    }
    if let Some(description) = normalize_description(fields.description.as_ref()) {
        entity.set("description", description);
    }
    if let Some(status) = fields.status.as_ref().and_then(|n| n.name.clone()) {
        entity.set("status", status);
    }
    if let Some(priority) = fields.priority.as_ref().and_then(|n| n.name.clone()) {
        entity.set("priority", priority);
    }
    if let Some(issue_type) = fields.issuetype.as_ref().and_then(|n| n.name.clone()) {
        entity.set("issueType", issue_type);
    }
    if !fields.labels.is_empty() {
        entity.set("labels", fields.labels.clone());
    }
    let components: Vec<String> = fields
        .components
        .iter()
        .filter_map(|named| named.name.clone())
        .collect();
    if !components.is_empty() {
        entity.set("components", components);
    }
    if let Some(created) = &fields.created {
        entity.set("createdOn", created.clone());
    }
    if let Some(updated) = &fields.updated {
        entity.set("updatedOn", updated.clone());
    }

    if !index.is_empty() {
        for (field_id, raw) in &fields.custom {
            if raw.is_null() {
                continue;
            }
            if let Some(attribute) = index.attribute_name(field_id) {
                entity.set(attribute, extract_value(raw, mode).into_attribute());
            }
        }
    }

    entity
}

/// API v2 sends descriptions as plain strings, v3 as rich documents.
fn normalize_description(description: Option<&Value>) -> Option<String> {
    match description? {
        Value::String(text) => Some(text.clone()),
        document @ Value::Object(_) => {
            let parsed: AdfNode = serde_json::from_value(document.clone()).ok()?;
            Some(document_to_text(&parsed))
        }
        _ => None,
    }
}

pub fn account_has_project(account: &Entity, project: &Entity) -> Relationship {
    Relationship::new(
        RELATIONSHIP_TYPE_ACCOUNT_PROJECT,
        VERB_HAS,
        &account.key,
        &project.key,
    )
}

pub fn project_has_issue(project_key: &str, issue: &Entity) -> Relationship {
    Relationship::new(
        RELATIONSHIP_TYPE_PROJECT_ISSUE,
        VERB_HAS,
        project_key,
        &issue.key,
    )
}

pub fn user_created_issue(user_key: &str, issue: &Entity) -> Relationship {
    Relationship::new(
        RELATIONSHIP_TYPE_USER_CREATED_ISSUE,
        VERB_CREATED,
        user_key,
        &issue.key,
    )
}

pub fn user_reported_issue(user_key: &str, issue: &Entity) -> Relationship {
    Relationship::new(
        RELATIONSHIP_TYPE_USER_REPORTED_ISSUE,
        VERB_REPORTED,
        user_key,
        &issue.key,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AttributeValue;
    use jira::types::{IssueFields, Named};

    fn sample_issue() -> Issue {
        serde_json::from_value(serde_json::json!({
            "id": "47788",
            "key": "J1TEMP-112",
            "fields": {
                "summary": "Test Custom Field",
                "status": { "name": "Open" },
                "labels": ["infra", "backend"],
                "customfield_10023": { "value": "red" }
            }
        }))
        .unwrap()
    }

    #[test]
    fn issue_converts_with_stable_key_and_names() {
        let issue = sample_issue();
        let entity = issue_entity(&issue, &CustomFieldIndex::default(), ListMode::Joined);

        assert_eq!(entity.key, "jira_issue_47788");
        assert_eq!(entity.entity_type, "jira_issue");
        assert_eq!(entity.string_attribute("name"), Some("J1TEMP-112"));
        assert_eq!(entity.string_attribute("status"), Some("Open"));
        assert_eq!(
            entity.attribute("labels"),
            Some(&AttributeValue::StringList(vec![
                "infra".to_string(),
                "backend".to_string()
            ]))
        );
        // No selectors configured, so the custom field stays off the entity.
        assert!(entity.attribute("customfield_10023").is_none());
    }

    #[test]
    fn selected_custom_fields_are_extracted() {
        let issue = sample_issue();
        let index = CustomFieldIndex::new(&["customfield_10023".to_string()], &[]);
        let entity = issue_entity(&issue, &index, ListMode::Joined);
        assert_eq!(entity.string_attribute("customfield_10023"), Some("red"));
    }

    #[test]
    fn custom_field_selectors_resolve_digits_and_aliases() {
        let fields = vec![
            Field {
                id: "customfield_10023".to_string(),
                name: "Story Points".to_string(),
                custom: true,
            },
            Field {
                id: "summary".to_string(),
                name: "Summary".to_string(),
                custom: false,
            },
        ];
        let digits_only = CustomFieldIndex::new(&["10023".to_string()], &fields);
        assert_eq!(
            digits_only.attribute_name("customfield_10023"),
            Some("customfield_10023")
        );

        let alias_only = CustomFieldIndex::new(&["storyPoints".to_string()], &fields);
        assert_eq!(
            alias_only.attribute_name("customfield_10023"),
            Some("storyPoints")
        );
    }

    #[test]
    fn rich_document_description_is_flattened() {
        let issue: Issue = serde_json::from_value(serde_json::json!({
            "id": "1",
            "key": "PROJ-1",
            "fields": {
                "description": {
                    "type": "doc",
                    "version": 1,
                    "content": [
                        { "type": "paragraph", "content": [
                            { "type": "text", "text": "flat text" }
                        ]}
                    ]
                }
            }
        }))
        .unwrap();

        let entity = issue_entity(&issue, &CustomFieldIndex::default(), ListMode::Joined);
        assert_eq!(entity.string_attribute("description"), Some("flat text"));
    }

    #[test]
    fn user_without_any_identifier_is_skipped() {
        let user = User::default();
        assert!(user_entity(&user).is_none());
    }

    #[test]
    fn relationship_builders_namespace_by_type() {
        let project = project_entity(&Project {
            id: "10000".to_string(),
            key: "PROJ".to_string(),
            name: Some("Project".to_string()),
            ..Default::default()
        });
        let issue = issue_entity(
            &Issue {
                id: "1".to_string(),
                key: "PROJ-1".to_string(),
                fields: IssueFields {
                    status: Some(Named {
                        name: Some("Open".to_string()),
                    }),
                    ..Default::default()
                },
            },
            &CustomFieldIndex::default(),
            ListMode::Joined,
        );

        let rel = project_has_issue(&project.key, &issue);
        assert_eq!(rel.key, "jira_project_10000_has_jira_issue_1");
        assert_eq!(rel.relationship_type, "jira_project_has_issue");
    }
}
