//! Mock Jira client for testing and local development.
//!
//! The `MockJiraApi` is pre-seeded with projects, users, and issues, serves
//! list endpoints with real pagination semantics (slices by `start_at`, empty
//! page at the end), and records every write so tests can assert on created
//! issues, applied transitions, and uploaded attachments.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::types::{
    CreatedIssue, Field, Issue, NewIssue, Project, ServerInfo, Transition, User,
};
use crate::{JiraApi, JiraError, Result};

#[derive(Default)]
struct MockState {
    server_info: ServerInfo,
    projects: Vec<Project>,
    fields: Vec<Field>,
    users: Vec<User>,
    /// Issues keyed by project key.
    issues: HashMap<String, Vec<Issue>>,
    /// Transitions keyed by issue id or key.
    transitions: HashMap<String, Vec<Transition>>,
    created_issues: Vec<NewIssue>,
    applied_transitions: Vec<(String, String)>,
    attachments: Vec<(String, String, Vec<u8>)>,
    /// Statuses to fail with, per resource name, consumed front to back.
    queued_errors: HashMap<String, Vec<u16>>,
    next_issue_id: u64,
}

pub struct MockJiraApi {
    state: RwLock<MockState>,
}

impl MockJiraApi {
    pub fn new() -> Self {
        MockJiraApi {
            state: RwLock::new(MockState {
                server_info: ServerInfo {
                    base_url: "https://mock.atlassian.net".to_string(),
                    version: Some("1001.0.0".to_string()),
                    deployment_type: Some("Cloud".to_string()),
                    server_title: Some("Mock Jira".to_string()),
                },
                next_issue_id: 90_000,
                ..MockState::default()
            }),
        }
    }

    pub fn set_server_info(&self, info: ServerInfo) {
        self.state.write().unwrap().server_info = info;
    }

    pub fn add_project(&self, project: Project) {
        self.state.write().unwrap().projects.push(project);
    }

    pub fn add_field(&self, field: Field) {
        self.state.write().unwrap().fields.push(field);
    }

    pub fn add_user(&self, user: User) {
        self.state.write().unwrap().users.push(user);
    }

    pub fn add_issue(&self, project_key: &str, issue: Issue) {
        self.state
            .write()
            .unwrap()
            .issues
            .entry(project_key.to_string())
            .or_default()
            .push(issue);
    }

    pub fn remove_issue(&self, project_key: &str, issue_id: &str) {
        if let Some(issues) = self.state.write().unwrap().issues.get_mut(project_key) {
            issues.retain(|issue| issue.id != issue_id);
        }
    }

    pub fn set_transitions(&self, issue: &str, transitions: Vec<Transition>) {
        self.state
            .write()
            .unwrap()
            .transitions
            .insert(issue.to_string(), transitions);
    }

    /// Queue a status-code failure for the next call to `resource`
    /// (`"server_info"`, `"projects"`, `"users"`, `"issues"`, `"fields"`).
    pub fn queue_error(&self, resource: &str, status: u16) {
        self.state
            .write()
            .unwrap()
            .queued_errors
            .entry(resource.to_string())
            .or_default()
            .push(status);
    }

    pub fn created_issues(&self) -> Vec<NewIssue> {
        self.state.read().unwrap().created_issues.clone()
    }

    pub fn attachments(&self) -> Vec<(String, String, Vec<u8>)> {
        self.state.read().unwrap().attachments.clone()
    }

    pub fn applied_transitions(&self) -> Vec<(String, String)> {
        self.state.read().unwrap().applied_transitions.clone()
    }

    fn take_queued_error(&self, resource: &str) -> Option<JiraError> {
        let mut state = self.state.write().unwrap();
        let queue = state.queued_errors.get_mut(resource)?;
        if queue.is_empty() {
            return None;
        }
        let status = queue.remove(0);
        Some(match status {
            401 | 403 => JiraError::Unauthorized {
                status,
                url: format!("mock://{resource}"),
            },
            _ => JiraError::Status {
                status,
                url: format!("mock://{resource}"),
                retry_after: None,
            },
        })
    }
}

impl Default for MockJiraApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JiraApi for MockJiraApi {
    async fn server_info(&self) -> Result<ServerInfo> {
        if let Some(err) = self.take_queued_error("server_info") {
            return Err(err);
        }
        Ok(self.state.read().unwrap().server_info.clone())
    }

    async fn projects(&self) -> Result<Vec<Project>> {
        if let Some(err) = self.take_queued_error("projects") {
            return Err(err);
        }
        Ok(self.state.read().unwrap().projects.clone())
    }

    async fn project_by_key(&self, key: &str) -> Result<Project> {
        self.state
            .read()
            .unwrap()
            .projects
            .iter()
            .find(|project| project.key == key)
            .cloned()
            .ok_or_else(|| JiraError::NotFound(format!("project not found in mock: {key}")))
    }

    async fn fields(&self) -> Result<Vec<Field>> {
        if let Some(err) = self.take_queued_error("fields") {
            return Err(err);
        }
        Ok(self.state.read().unwrap().fields.clone())
    }

    async fn users_page(&self, start_at: usize, page_size: usize) -> Result<Vec<User>> {
        if let Some(err) = self.take_queued_error("users") {
            return Err(err);
        }
        let state = self.state.read().unwrap();
        Ok(state
            .users
            .iter()
            .skip(start_at)
            .take(page_size)
            .cloned()
            .collect())
    }

    async fn issues_page(
        &self,
        project_key: &str,
        updated_since: Option<DateTime<Utc>>,
        start_at: usize,
        page_size: usize,
    ) -> Result<Vec<Issue>> {
        if let Some(err) = self.take_queued_error("issues") {
            return Err(err);
        }
        let state = self.state.read().unwrap();
        let issues = state.issues.get(project_key).cloned().unwrap_or_default();
        Ok(issues
            .into_iter()
            .filter(|issue| match (updated_since, updated_at(issue)) {
                (Some(since), Some(updated)) => updated >= since,
                _ => true,
            })
            .skip(start_at)
            .take(page_size)
            .collect())
    }

    async fn issue(&self, id_or_key: &str) -> Result<Issue> {
        let state = self.state.read().unwrap();
        state
            .issues
            .values()
            .flatten()
            .find(|issue| issue.id == id_or_key || issue.key == id_or_key)
            .cloned()
            .ok_or_else(|| JiraError::NotFound(format!("issue not found in mock: {id_or_key}")))
    }

    async fn create_issue(&self, new_issue: &NewIssue) -> Result<CreatedIssue> {
        let mut state = self.state.write().unwrap();
        state.next_issue_id += 1;
        let id = state.next_issue_id;
        let key = format!("{}-{}", new_issue.project_key, id);
        state.created_issues.push(new_issue.clone());
        Ok(CreatedIssue {
            id: id.to_string(),
            key,
        })
    }

    async fn transitions(&self, issue: &str) -> Result<Vec<Transition>> {
        Ok(self
            .state
            .read()
            .unwrap()
            .transitions
            .get(issue)
            .cloned()
            .unwrap_or_default())
    }

    async fn apply_transition(&self, issue: &str, transition_id: &str) -> Result<()> {
        self.state
            .write()
            .unwrap()
            .applied_transitions
            .push((issue.to_string(), transition_id.to_string()));
        Ok(())
    }

    async fn add_attachment(&self, issue: &str, filename: &str, content: Vec<u8>) -> Result<()> {
        self.state.write().unwrap().attachments.push((
            issue.to_string(),
            filename.to_string(),
            content,
        ));
        Ok(())
    }
}

fn updated_at(issue: &Issue) -> Option<DateTime<Utc>> {
    let raw = issue.fields.updated.as_deref()?;
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.3f%z"))
        .map(|parsed| parsed.with_timezone(&Utc))
        .ok()
}
