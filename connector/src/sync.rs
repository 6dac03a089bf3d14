//! The sync pipeline: fetch, convert, diff, apply.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use jira::types::Issue;
use jira::{iterate_pages, JiraApi};
use tracing::{debug, info, instrument};

use crate::config::{ConfigError, JiraConfiguration, ProjectKey};
use crate::content::ListMode;
use crate::convert::{
    account_entity, account_has_project, issue_entity, project_entity, project_has_issue,
    user_created_issue, user_entity, user_reported_issue, CustomFieldIndex, ENTITY_TYPE_ACCOUNT,
    ENTITY_TYPE_ISSUE, ENTITY_TYPE_PROJECT, ENTITY_TYPE_USER, RELATIONSHIP_TYPE_ACCOUNT_PROJECT,
    RELATIONSHIP_TYPE_PROJECT_ISSUE, RELATIONSHIP_TYPE_USER_CREATED_ISSUE,
    RELATIONSHIP_TYPE_USER_REPORTED_ISSUE,
};
use crate::error::SyncError;
use crate::models::{Entity, Relationship};
use crate::reconcile::{diff_by_key, OperationBatch, SyncSummary};
use crate::sink::GraphSink;

const DEFAULT_PAGE_SIZE: usize = 50;
/// Per-project issue page cap, bypassed by `bulk_ingest_issues`.
const ISSUE_PAGE_LIMIT: usize = 10;
const USER_PAGE_LIMIT: usize = 100;

pub struct SyncPipeline {
    api: Arc<dyn JiraApi>,
    sink: Arc<dyn GraphSink>,
    config: JiraConfiguration,
    /// Only issues updated at or after this timestamp are fetched.
    updated_since: Option<DateTime<Utc>>,
}

impl SyncPipeline {
    pub fn new(api: Arc<dyn JiraApi>, sink: Arc<dyn GraphSink>, config: JiraConfiguration) -> Self {
        SyncPipeline {
            api,
            sink,
            config,
            updated_since: None,
        }
    }

    pub fn with_updated_since(mut self, updated_since: DateTime<Utc>) -> Self {
        self.updated_since = Some(updated_since);
        self
    }

    /// One full run. Top-level reads are issued concurrently; issue
    /// pagination depends on projects and users already being in hand.
    #[instrument(skip_all, fields(host = %self.config.host))]
    pub async fn run(&self) -> Result<SyncSummary, SyncError> {
        self.config.validate()?;

        let (server_info, projects, fields, users) = tokio::try_join!(
            self.api.server_info(),
            self.api.projects(),
            self.api.fields(),
            self.fetch_users(),
        )?;
        info!(
            projects = projects.len(),
            users = users.len(),
            "fetched top-level records"
        );

        let selected_projects = self.select_projects(&projects)?;
        let field_index = CustomFieldIndex::new(&self.config.custom_fields, &fields);

        let account = account_entity(&self.config.host, &server_info);
        let project_entities: Vec<Entity> = selected_projects
            .iter()
            .map(|project| project_entity(project))
            .collect();
        let user_entities: Vec<Entity> = users.iter().filter_map(user_entity).collect();
        let known_users: HashSet<String> =
            user_entities.iter().map(|user| user.key.clone()).collect();

        let mut account_project_rels: Vec<Relationship> = Vec::new();
        let mut project_issue_rels: Vec<Relationship> = Vec::new();
        let mut created_rels: Vec<Relationship> = Vec::new();
        let mut reported_rels: Vec<Relationship> = Vec::new();
        let mut issue_entities: Vec<Entity> = Vec::new();

        // Project issue fetches are independent of each other; each one
        // still pages sequentially inside.
        let issue_batches = futures::future::try_join_all(
            selected_projects
                .iter()
                .map(|project| self.fetch_issues(&project.key)),
        )
        .await?;

        for (entity, issues) in project_entities.iter().zip(&issue_batches) {
            account_project_rels.push(account_has_project(&account, entity));

            for issue in issues {
                let converted = issue_entity(issue, &field_index, ListMode::Joined);
                project_issue_rels.push(project_has_issue(&entity.key, &converted));
                self.link_issue_users(issue, &converted, &known_users, &mut created_rels, &mut reported_rels);
                issue_entities.push(converted);
            }
        }

        let mut batch = OperationBatch::default();
        self.diff_entities(&mut batch, ENTITY_TYPE_ACCOUNT, vec![account]).await?;
        self.diff_entities(&mut batch, ENTITY_TYPE_PROJECT, project_entities).await?;
        self.diff_entities(&mut batch, ENTITY_TYPE_USER, user_entities).await?;
        self.diff_entities(&mut batch, ENTITY_TYPE_ISSUE, issue_entities).await?;
        self.diff_relationships(&mut batch, RELATIONSHIP_TYPE_ACCOUNT_PROJECT, account_project_rels).await?;
        self.diff_relationships(&mut batch, RELATIONSHIP_TYPE_PROJECT_ISSUE, project_issue_rels).await?;
        self.diff_relationships(&mut batch, RELATIONSHIP_TYPE_USER_CREATED_ISSUE, created_rels).await?;
        self.diff_relationships(&mut batch, RELATIONSHIP_TYPE_USER_REPORTED_ISSUE, reported_rels).await?;

        let summary = self.sink.apply(batch).await?;
        info!(
            created = summary.created,
            updated = summary.updated,
            deleted = summary.deleted,
            "sync run complete"
        );
        Ok(summary)
    }

    async fn fetch_users(&self) -> jira::Result<Vec<jira::types::User>> {
        let mut users = Vec::new();
        let api = self.api.clone();
        iterate_pages(
            "users",
            DEFAULT_PAGE_SIZE,
            USER_PAGE_LIMIT,
            |start_at, page_size| {
                let api = api.clone();
                async move { api.users_page(start_at, page_size).await }
            },
            |user| users.push(user),
        )
        .await?;
        Ok(users)
    }

    async fn fetch_issues(&self, project_key: &str) -> jira::Result<Vec<Issue>> {
        let page_limit = if self.config.bulk_ingest_issues {
            usize::MAX
        } else {
            ISSUE_PAGE_LIMIT
        };
        let mut issues = Vec::new();
        let api = self.api.clone();
        let updated_since = self.updated_since;
        let key = project_key.to_string();
        iterate_pages(
            "issues",
            DEFAULT_PAGE_SIZE,
            page_limit,
            |start_at, page_size| {
                let api = api.clone();
                let key = key.clone();
                async move {
                    api.issues_page(&key, updated_since, start_at, page_size)
                        .await
                }
            },
            |issue| issues.push(issue),
        )
        .await?;
        debug!(project = %project_key, issues = issues.len(), "fetched project issues");
        Ok(issues)
    }

    /// Keep only the configured projects, or all of them when no filter is
    /// set. A configured key the remote listing does not contain means the
    /// authenticated user cannot see it.
    fn select_projects<'a>(
        &self,
        projects: &'a [jira::types::Project],
    ) -> Result<Vec<&'a jira::types::Project>, SyncError> {
        if self.config.projects.is_empty() {
            return Ok(projects.iter().collect());
        }

        let mut selected = Vec::new();
        let mut missing: Vec<&str> = Vec::new();
        for ProjectKey { key } in &self.config.projects {
            match projects.iter().find(|project| &project.key == key) {
                Some(project) => selected.push(project),
                None => missing.push(key),
            }
        }
        if !missing.is_empty() {
            return Err(ConfigError::InaccessibleProjects(missing.join(", ")).into());
        }
        Ok(selected)
    }

    /// Creator and reporter references resolve against the already-ingested
    /// user set. Unknown users are skipped, not fatal: Jira happily returns
    /// issues attributed to deactivated or app accounts the user search
    /// never lists.
    fn link_issue_users(
        &self,
        issue: &Issue,
        converted: &Entity,
        known_users: &HashSet<String>,
        created: &mut Vec<Relationship>,
        reported: &mut Vec<Relationship>,
    ) {
        if let Some(user_key) = self.resolve_user(issue.fields.creator.as_ref(), known_users, issue)
        {
            created.push(user_created_issue(&user_key, converted));
        }
        if let Some(user_key) =
            self.resolve_user(issue.fields.reporter.as_ref(), known_users, issue)
        {
            reported.push(user_reported_issue(&user_key, converted));
        }
    }

    fn resolve_user(
        &self,
        user: Option<&jira::types::User>,
        known_users: &HashSet<String>,
        issue: &Issue,
    ) -> Option<String> {
        let provider_id = user?.provider_id()?;
        let key = crate::models::entity_key(ENTITY_TYPE_USER, provider_id);
        if known_users.contains(&key) {
            Some(key)
        } else {
            debug!(issue = %issue.key, user = %provider_id, "issue references unknown user, skipping link");
            None
        }
    }

    async fn diff_entities(
        &self,
        batch: &mut OperationBatch,
        entity_type: &str,
        new: Vec<Entity>,
    ) -> Result<(), SyncError> {
        let old = self.sink.entities_by_type(entity_type).await?;
        batch.add_entities(entity_type, diff_by_key(&old, &new));
        Ok(())
    }

    async fn diff_relationships(
        &self,
        batch: &mut OperationBatch,
        relationship_type: &str,
        new: Vec<Relationship>,
    ) -> Result<(), SyncError> {
        let old = self.sink.relationships_by_type(relationship_type).await?;
        batch.add_relationships(relationship_type, diff_by_key(&old, &new));
        Ok(())
    }
}
