//! Issue write operations: creation with the field-size guard, and
//! transitions resolved by name.

use jira::types::{CreatedIssue, NewIssue};
use jira::JiraApi;
use tracing::{info, warn};

use crate::content::text_to_document;
use crate::error::SyncError;

/// Hard limit the remote system places on long-text fields.
pub const DESCRIPTION_LENGTH_LIMIT: usize = 32_767;

/// What goes in the description field when the real content is too large and
/// has been attached instead.
pub const OVERSIZE_PLACEHOLDER: &str =
    "Description exceeds the field size limit. See the attached file for the full content.";

const OVERSIZE_ATTACHMENT_NAME: &str = "description.md";

/// Create an issue from markdown-flavored text.
///
/// The description is parsed into a rich document before submission. When
/// its stringified form reaches [`DESCRIPTION_LENGTH_LIMIT`] the document is
/// replaced with a placeholder and the original text is uploaded as a single
/// attachment on the created issue.
pub async fn create_issue(
    api: &dyn JiraApi,
    project_key: &str,
    summary: &str,
    issue_type: &str,
    description: Option<&str>,
) -> Result<CreatedIssue, SyncError> {
    let mut oversize: Option<&str> = None;
    let document = match description {
        Some(text) => {
            let document = text_to_document(text);
            let serialized = serde_json::to_string(&document)?;
            if serialized.len() >= DESCRIPTION_LENGTH_LIMIT {
                warn!(
                    project = %project_key,
                    size = serialized.len(),
                    limit = DESCRIPTION_LENGTH_LIMIT,
                    "description exceeds field size limit, attaching instead"
                );
                oversize = Some(text);
                Some(serde_json::to_value(text_to_document(OVERSIZE_PLACEHOLDER))?)
            } else {
                Some(serde_json::to_value(document)?)
            }
        }
        None => None,
    };

    let created = api
        .create_issue(&NewIssue {
            project_key: project_key.to_string(),
            summary: summary.to_string(),
            issue_type: issue_type.to_string(),
            description: document,
        })
        .await?;
    info!(issue = %created.key, project = %project_key, "created issue");

    if let Some(original) = oversize {
        api.add_attachment(
            &created.key,
            OVERSIZE_ATTACHMENT_NAME,
            original.as_bytes().to_vec(),
        )
        .await?;
    }

    Ok(created)
}

/// Move an issue to another state. `target` matches either a transition's
/// own name or the name of the status it leads to.
pub async fn transition_issue(
    api: &dyn JiraApi,
    issue: &str,
    target: &str,
) -> Result<(), SyncError> {
    let transitions = api.transitions(issue).await?;
    let matched = transitions.iter().find(|transition| {
        transition.name.eq_ignore_ascii_case(target)
            || transition
                .to
                .as_ref()
                .and_then(|to| to.name.as_deref())
                .is_some_and(|name| name.eq_ignore_ascii_case(target))
    });

    match matched {
        Some(transition) => {
            api.apply_transition(issue, &transition.id).await?;
            info!(issue = %issue, transition = %transition.name, "applied transition");
            Ok(())
        }
        None => Err(SyncError::TransitionNotFound {
            issue: issue.to_string(),
            target: target.to_string(),
            available: transitions
                .iter()
                .map(|transition| transition.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        }),
    }
}
