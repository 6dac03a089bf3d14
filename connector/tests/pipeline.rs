//! End-to-end pipeline runs against the mock Jira client and the in-memory
//! sink.

use std::sync::Arc;

use connector::config::{JiraConfiguration, ProjectKey};
use connector::error::SyncError;
use connector::{GraphSink, MemorySink, SyncPipeline};
use jira::types::{Issue, IssueFields, Named, Project, User};
use jira::{JiraError, MockJiraApi};

fn test_config(projects: &[&str]) -> JiraConfiguration {
    JiraConfiguration {
        host: "mock.atlassian.net".to_string(),
        username: "svc-connector".to_string(),
        password: "token".to_string(),
        projects: projects
            .iter()
            .map(|key| ProjectKey {
                key: key.to_string(),
            })
            .collect(),
        custom_fields: Vec::new(),
        bulk_ingest_issues: false,
    }
}

fn test_project(id: &str, key: &str) -> Project {
    Project {
        id: id.to_string(),
        key: key.to_string(),
        name: Some(format!("Project {key}")),
        ..Default::default()
    }
}

fn test_user(account_id: &str) -> User {
    User {
        account_id: Some(account_id.to_string()),
        display_name: Some(format!("User {account_id}")),
        active: true,
        ..Default::default()
    }
}

fn test_issue(id: &str, key: &str, creator: Option<&str>) -> Issue {
    Issue {
        id: id.to_string(),
        key: key.to_string(),
        fields: IssueFields {
            summary: Some(format!("Summary for {key}")),
            status: Some(Named {
                name: Some("Open".to_string()),
            }),
            creator: creator.map(test_user),
            ..Default::default()
        },
    }
}

fn seeded_mock() -> MockJiraApi {
    let mock = MockJiraApi::new();
    mock.add_project(test_project("10000", "PROJ"));
    mock.add_user(test_user("alice"));
    mock.add_user(test_user("bob"));
    mock.add_issue("PROJ", test_issue("1", "PROJ-1", Some("alice")));
    mock.add_issue("PROJ", test_issue("2", "PROJ-2", Some("bob")));
    mock
}

#[tokio::test]
async fn first_run_creates_everything() {
    let api = Arc::new(seeded_mock());
    let sink = Arc::new(MemorySink::new());
    let pipeline = SyncPipeline::new(api, sink.clone(), test_config(&["PROJ"]));

    let summary = pipeline.run().await.unwrap();

    // 1 account + 1 project + 2 users + 2 issues,
    // 1 account-project + 2 project-issue + 2 created relationships.
    assert_eq!(summary.created, 11);
    assert_eq!(summary.updated, 0);
    assert_eq!(summary.deleted, 0);

    let issues = sink.entities_by_type("jira_issue").await.unwrap();
    let mut keys: Vec<&str> = issues.iter().map(|entity| entity.key.as_str()).collect();
    keys.sort();
    assert_eq!(keys, vec!["jira_issue_1", "jira_issue_2"]);

    let issue = sink.entity("jira_issue", "jira_issue_1").await.unwrap();
    assert_eq!(issue.string_attribute("name"), Some("PROJ-1"));
    assert_eq!(issue.string_attribute("status"), Some("Open"));

    let created = sink
        .relationships_by_type("jira_user_created_issue")
        .await
        .unwrap();
    assert_eq!(created.len(), 2);
}

#[tokio::test]
async fn second_run_over_same_data_only_updates() {
    let api = Arc::new(seeded_mock());
    let sink = Arc::new(MemorySink::new());
    let pipeline = SyncPipeline::new(api, sink.clone(), test_config(&["PROJ"]));

    let first = pipeline.run().await.unwrap();
    let second = pipeline.run().await.unwrap();

    assert_eq!(second.created, 0);
    assert_eq!(second.updated, first.created);
    assert_eq!(second.deleted, 0);
}

#[tokio::test]
async fn removed_issue_is_deleted_with_its_relationships() {
    let api = Arc::new(seeded_mock());
    let sink = Arc::new(MemorySink::new());
    let pipeline = SyncPipeline::new(api.clone(), sink.clone(), test_config(&["PROJ"]));

    pipeline.run().await.unwrap();
    api.remove_issue("PROJ", "2");
    let summary = pipeline.run().await.unwrap();

    // Issue entity, project-issue edge, and created-by edge all go.
    assert_eq!(summary.deleted, 3);
    assert_eq!(summary.created, 0);

    let issues = sink.entities_by_type("jira_issue").await.unwrap();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].key, "jira_issue_1");
}

#[tokio::test]
async fn issues_from_unknown_users_still_ingest_without_links() {
    let mock = MockJiraApi::new();
    mock.add_project(test_project("10000", "PROJ"));
    mock.add_issue("PROJ", test_issue("1", "PROJ-1", Some("ghost")));

    let sink = Arc::new(MemorySink::new());
    let pipeline = SyncPipeline::new(Arc::new(mock), sink.clone(), test_config(&["PROJ"]));
    pipeline.run().await.unwrap();

    let issues = sink.entities_by_type("jira_issue").await.unwrap();
    assert_eq!(issues.len(), 1);
    let created = sink
        .relationships_by_type("jira_user_created_issue")
        .await
        .unwrap();
    assert!(created.is_empty());
}

#[tokio::test]
async fn inaccessible_configured_project_fails_before_ingesting() {
    let api = Arc::new(seeded_mock());
    let sink = Arc::new(MemorySink::new());
    let pipeline = SyncPipeline::new(api, sink.clone(), test_config(&["PROJ", "SECRET"]));

    let err = pipeline.run().await.unwrap_err();
    assert!(matches!(err, SyncError::Config(_)));
    assert!(err.to_string().contains("SECRET"));

    let issues = sink.entities_by_type("jira_issue").await.unwrap();
    assert!(issues.is_empty());
}

#[tokio::test]
async fn updated_since_filter_narrows_the_issue_fetch() {
    let mock = MockJiraApi::new();
    mock.add_project(test_project("10000", "PROJ"));
    let mut stale = test_issue("1", "PROJ-1", None);
    stale.fields.updated = Some("2024-01-01T00:00:00.000+0000".to_string());
    let mut fresh = test_issue("2", "PROJ-2", None);
    fresh.fields.updated = Some("2024-06-01T00:00:00.000+0000".to_string());
    mock.add_issue("PROJ", stale);
    mock.add_issue("PROJ", fresh);

    let since = chrono::DateTime::parse_from_rfc3339("2024-03-01T00:00:00Z")
        .unwrap()
        .with_timezone(&chrono::Utc);
    let sink = Arc::new(MemorySink::new());
    let pipeline = SyncPipeline::new(Arc::new(mock), sink.clone(), test_config(&["PROJ"]))
        .with_updated_since(since);
    pipeline.run().await.unwrap();

    let issues = sink.entities_by_type("jira_issue").await.unwrap();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].key, "jira_issue_2");
}

#[tokio::test]
async fn auth_failure_aborts_the_run() {
    let api = Arc::new(seeded_mock());
    api.queue_error("projects", 401);

    let sink = Arc::new(MemorySink::new());
    let pipeline = SyncPipeline::new(api, sink, test_config(&["PROJ"]));

    let err = pipeline.run().await.unwrap_err();
    assert!(matches!(
        err,
        SyncError::Api(JiraError::Unauthorized { .. })
    ));
}
