//! Jira REST client.
//!
//! This crate provides:
//! - [`JiraApi`] trait abstracting the remote surface for dependency
//!   injection and mocking
//! - [`JiraClient`] production client backed by reqwest with basic auth
//! - [`MockJiraApi`] mock client for tests, pre-seeded with records
//! - [`retry`] rate-aware retry wrapping every page fetch
//! - [`paginate`] bounded iteration over paginated list endpoints
//!
//! The wire payloads in [`types`] are consumed as an opaque JSON contract;
//! anything the connector does not read stays untouched.

pub mod mock;
pub mod paginate;
pub mod retry;
pub mod types;

pub use mock::MockJiraApi;
pub use paginate::{iterate_pages, PageOutcome, PageRun};
pub use retry::{with_retry, RetryPolicy};

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{header, multipart, Client as ReqwestClient, Response, StatusCode};
use serde::de::DeserializeOwned;

use types::{
    CreatedIssue, Field, Issue, NewIssue, Project, SearchResponse, ServerInfo, Transition,
    TransitionsResponse, User,
};

#[derive(Debug, thiserror::Error)]
pub enum JiraError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    /// 401/403 — not retried, aborts the run.
    #[error("authentication rejected by {url} ({status})")]
    Unauthorized { status: u16, url: String },
    #[error("{status} response from {url}")]
    Status {
        status: u16,
        url: String,
        /// Numeric `Retry-After` header, when the server sent one.
        retry_after: Option<u64>,
    },
    #[error("{operation} timed out after {after:?}")]
    Timeout { operation: String, after: Duration },
    #[error("could not decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("not found: {0}")]
    NotFound(String),
}

impl JiraError {
    /// Whether the retry executor may attempt the call again. Client errors
    /// and auth rejections are final; server and network errors are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            JiraError::Unauthorized { .. }
            | JiraError::Timeout { .. }
            | JiraError::Decode { .. }
            | JiraError::NotFound(_) => false,
            JiraError::Status { status, .. } => !matches!(status, 400 | 401 | 403 | 404),
            JiraError::Http { .. } => true,
        }
    }

    /// The server's `Retry-After` hint in seconds, if the failed response
    /// carried one.
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            JiraError::Status { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, JiraError>;

/// The remote Jira surface consumed by the connector.
///
/// Page-returning methods take a `start_at` cursor and a `page_size`; an
/// empty page signals end-of-data.
#[async_trait]
pub trait JiraApi: Send + Sync {
    async fn server_info(&self) -> Result<ServerInfo>;

    async fn projects(&self) -> Result<Vec<Project>>;

    async fn project_by_key(&self, key: &str) -> Result<Project>;

    async fn fields(&self) -> Result<Vec<Field>>;

    async fn users_page(&self, start_at: usize, page_size: usize) -> Result<Vec<User>>;

    /// One page of issues for a project. `updated_since` keeps only issues
    /// updated at or after the timestamp; `None` means all issues.
    async fn issues_page(
        &self,
        project_key: &str,
        updated_since: Option<DateTime<Utc>>,
        start_at: usize,
        page_size: usize,
    ) -> Result<Vec<Issue>>;

    async fn issue(&self, id_or_key: &str) -> Result<Issue>;

    async fn create_issue(&self, new_issue: &NewIssue) -> Result<CreatedIssue>;

    async fn transitions(&self, issue: &str) -> Result<Vec<Transition>>;

    async fn apply_transition(&self, issue: &str, transition_id: &str) -> Result<()>;

    async fn add_attachment(&self, issue: &str, filename: &str, content: Vec<u8>) -> Result<()>;
}

/// Production client. Every read goes through the retry executor; writes are
/// issued once, since replaying a create could duplicate remote state.
pub struct JiraClient {
    base_url: String,
    username: String,
    password: String,
    http: ReqwestClient,
    policy: RetryPolicy,
}

impl JiraClient {
    pub fn new(host: &str, username: &str, password: &str) -> Self {
        JiraClient {
            base_url: normalize_host(host),
            username: username.to_string(),
            password: password.to_string(),
            http: ReqwestClient::new(),
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        with_retry(&self.policy, path, || self.get_once(&url, query)).await
    }

    async fn get_once<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let response = self
            .http
            .get(url)
            .basic_auth(&self.username, Some(&self.password))
            .query(query)
            .send()
            .await
            .map_err(|source| JiraError::Http {
                url: url.to_string(),
                source,
            })?;
        decode_json(url, response).await
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .post(&url)
            .basic_auth(&self.username, Some(&self.password))
            .json(body)
            .send()
            .await
            .map_err(|source| JiraError::Http {
                url: url.clone(),
                source,
            })?;
        decode_json(&url, response).await
    }

    async fn post_no_content(&self, path: &str, body: &serde_json::Value) -> Result<()> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .post(&url)
            .basic_auth(&self.username, Some(&self.password))
            .json(body)
            .send()
            .await
            .map_err(|source| JiraError::Http {
                url: url.clone(),
                source,
            })?;
        check_status(&url, &response)?;
        Ok(())
    }
}

#[async_trait]
impl JiraApi for JiraClient {
    async fn server_info(&self) -> Result<ServerInfo> {
        self.get_json("/rest/api/3/serverInfo", &[]).await
    }

    async fn projects(&self) -> Result<Vec<Project>> {
        self.get_json("/rest/api/3/project", &[]).await
    }

    async fn project_by_key(&self, key: &str) -> Result<Project> {
        let path = format!("/rest/api/3/project/{key}");
        self.get_json(&path, &[]).await
    }

    async fn fields(&self) -> Result<Vec<Field>> {
        self.get_json("/rest/api/3/field", &[]).await
    }

    async fn users_page(&self, start_at: usize, page_size: usize) -> Result<Vec<User>> {
        self.get_json(
            "/rest/api/3/users/search",
            &[
                ("startAt", start_at.to_string()),
                ("maxResults", page_size.to_string()),
            ],
        )
        .await
    }

    async fn issues_page(
        &self,
        project_key: &str,
        updated_since: Option<DateTime<Utc>>,
        start_at: usize,
        page_size: usize,
    ) -> Result<Vec<Issue>> {
        let jql = issue_search_jql(project_key, updated_since);
        let response: SearchResponse = self
            .get_json(
                "/rest/api/3/search",
                &[
                    ("jql", jql),
                    ("startAt", start_at.to_string()),
                    ("maxResults", page_size.to_string()),
                ],
            )
            .await?;
        Ok(response.issues)
    }

    async fn issue(&self, id_or_key: &str) -> Result<Issue> {
        let path = format!("/rest/api/3/issue/{id_or_key}");
        self.get_json(&path, &[]).await
    }

    async fn create_issue(&self, new_issue: &NewIssue) -> Result<CreatedIssue> {
        let mut fields = serde_json::json!({
            "project": { "key": new_issue.project_key },
            "summary": new_issue.summary,
            "issuetype": { "name": new_issue.issue_type },
        });
        if let Some(description) = &new_issue.description {
            fields["description"] = description.clone();
        }
        self.post_json("/rest/api/3/issue", &serde_json::json!({ "fields": fields }))
            .await
    }

    async fn transitions(&self, issue: &str) -> Result<Vec<Transition>> {
        let path = format!("/rest/api/3/issue/{issue}/transitions");
        let response: TransitionsResponse = self.get_json(&path, &[]).await?;
        Ok(response.transitions)
    }

    async fn apply_transition(&self, issue: &str, transition_id: &str) -> Result<()> {
        let path = format!("/rest/api/3/issue/{issue}/transitions");
        self.post_no_content(
            &path,
            &serde_json::json!({ "transition": { "id": transition_id } }),
        )
        .await
    }

    async fn add_attachment(&self, issue: &str, filename: &str, content: Vec<u8>) -> Result<()> {
        let url = format!("{}/rest/api/3/issue/{issue}/attachments", self.base_url);
        let part = multipart::Part::bytes(content).file_name(filename.to_string());
        let form = multipart::Form::new().part("file", part);
        let response = self
            .http
            .post(&url)
            .basic_auth(&self.username, Some(&self.password))
            .header("X-Atlassian-Token", "no-check")
            .multipart(form)
            .send()
            .await
            .map_err(|source| JiraError::Http {
                url: url.clone(),
                source,
            })?;
        check_status(&url, &response)?;
        Ok(())
    }
}

/// JQL for one project's issue search, oldest first so the cursor is stable
/// across runs.
fn issue_search_jql(project_key: &str, updated_since: Option<DateTime<Utc>>) -> String {
    let mut jql = format!("project = \"{project_key}\"");
    if let Some(since) = updated_since {
        jql.push_str(&format!(
            " AND updated >= '{}'",
            since.format("%Y-%m-%d %H:%M")
        ));
    }
    jql.push_str(" ORDER BY id ASC");
    jql
}

fn normalize_host(host: &str) -> String {
    let trimmed = host.trim().trim_end_matches('/');
    if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    }
}

fn check_status(url: &str, response: &Response) -> Result<()> {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(JiraError::Unauthorized {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }
    if !status.is_success() {
        let retry_after = response
            .headers()
            .get(header::RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<u64>().ok());
        return Err(JiraError::Status {
            status: status.as_u16(),
            url: url.to_string(),
            retry_after,
        });
    }
    Ok(())
}

async fn decode_json<T: DeserializeOwned>(url: &str, response: Response) -> Result<T> {
    check_status(url, &response)?;
    let body = response.text().await.map_err(|source| JiraError::Http {
        url: url.to_string(),
        source,
    })?;
    serde_json::from_str(&body).map_err(|source| JiraError::Decode {
        url: url.to_string(),
        source,
    })
}
