//! Wire types for the Jira REST API.
//!
//! These are deserialized directly from the remote JSON contract and treated
//! as immutable snapshots. Fields the connector does not consume are omitted,
//! except for issue custom fields which are captured via `#[serde(flatten)]`
//! so the converters can select from them later.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Server-level metadata for the Jira instance.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub deployment_type: Option<String>,
    #[serde(default)]
    pub server_title: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Project {
    pub id: String,
    pub key: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "self", default)]
    pub self_url: Option<String>,
    #[serde(rename = "projectTypeKey", default)]
    pub project_type_key: Option<String>,
}

/// A Jira user. Cloud instances identify users by `accountId`, older server
/// instances by `key` or `name`; [`User::provider_id`] resolves in that order.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email_address: Option<String>,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub time_zone: Option<String>,
}

impl User {
    pub fn provider_id(&self) -> Option<&str> {
        self.account_id
            .as_deref()
            .or(self.key.as_deref())
            .or(self.name.as_deref())
    }
}

/// A reference that only carries a display name (status, priority, issue
/// type, component).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Named {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IssueFields {
    #[serde(default)]
    pub summary: Option<String>,
    /// Either a plain string (API v2) or a rich-document object (API v3).
    #[serde(default)]
    pub description: Option<Value>,
    #[serde(default)]
    pub status: Option<Named>,
    #[serde(default)]
    pub priority: Option<Named>,
    #[serde(default)]
    pub issuetype: Option<Named>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub components: Vec<Named>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub updated: Option<String>,
    #[serde(default)]
    pub creator: Option<User>,
    #[serde(default)]
    pub reporter: Option<User>,
    #[serde(default)]
    pub assignee: Option<User>,
    /// Everything else, notably `customfield_<digits>` entries.
    #[serde(flatten)]
    pub custom: HashMap<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Issue {
    pub id: String,
    pub key: String,
    #[serde(default)]
    pub fields: IssueFields,
}

/// An entry from the field listing, used to resolve custom field names.
#[derive(Debug, Clone, Deserialize)]
pub struct Field {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub custom: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub issues: Vec<Issue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Transition {
    pub id: String,
    pub name: String,
    /// Target status the transition moves the issue into.
    #[serde(default)]
    pub to: Option<Named>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TransitionsResponse {
    #[serde(default)]
    pub transitions: Vec<Transition>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatedIssue {
    pub id: String,
    pub key: String,
}

/// Input for issue creation. The description, when present, is an
/// already-built rich-document value.
#[derive(Debug, Clone, Serialize)]
pub struct NewIssue {
    pub project_key: String,
    pub summary: String,
    pub issue_type: String,
    pub description: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_deserializes_custom_fields_into_flatten_map() {
        let raw = serde_json::json!({
            "id": "47788",
            "key": "J1TEMP-112",
            "fields": {
                "summary": "Test Custom Field",
                "status": { "name": "Open" },
                "labels": ["infra"],
                "customfield_10023": { "value": "red" }
            }
        });

        let issue: Issue = serde_json::from_value(raw).expect("issue should deserialize");
        assert_eq!(issue.id, "47788");
        assert_eq!(issue.key, "J1TEMP-112");
        assert_eq!(issue.fields.summary.as_deref(), Some("Test Custom Field"));
        assert_eq!(
            issue.fields.status.as_ref().and_then(|s| s.name.as_deref()),
            Some("Open")
        );
        assert_eq!(issue.fields.labels, vec!["infra".to_string()]);
        assert!(issue.fields.custom.contains_key("customfield_10023"));
    }

    #[test]
    fn user_provider_id_prefers_account_id() {
        let user = User {
            account_id: Some("abc123".to_string()),
            key: Some("legacy-key".to_string()),
            name: Some("legacy-name".to_string()),
            ..Default::default()
        };
        assert_eq!(user.provider_id(), Some("abc123"));

        let server_user = User {
            key: Some("legacy-key".to_string()),
            name: Some("legacy-name".to_string()),
            ..Default::default()
        };
        assert_eq!(server_user.provider_id(), Some("legacy-key"));
    }
}
