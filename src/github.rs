//! Issue operations on top of the authenticated [`Executor`].

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::{debug, error};

use crate::client::{AuthStatus, Executor, RequestSpec};
use crate::error::McpGhError;
use crate::types::{Issue, IssueComment, IssueState, IssueUpdate, SearchIssuesResponse};

/// Prepended to every comment posted through this server.
pub const AI_COMMENT_IDENTIFIER: &str = "[AI] Generated using MCP\n\n";

#[derive(Clone)]
pub struct GitHubIssues {
    executor: Arc<Executor>,
}

impl GitHubIssues {
    pub fn new(executor: Arc<Executor>) -> Self {
        Self { executor }
    }

    async fn call<T: DeserializeOwned>(&self, spec: RequestSpec) -> Result<T, McpGhError> {
        let body = self.executor.execute(&spec).await?;
        Ok(body.into_typed()?)
    }

    pub async fn create_issue(
        &self,
        owner: &str,
        repo: &str,
        title: &str,
        body: Option<&str>,
    ) -> Result<Issue, McpGhError> {
        debug!("Creating issue in {}/{}: {}", owner, repo, title);
        let spec = RequestSpec::post(format!("/repos/{}/{}/issues", owner, repo)).with_json(
            &serde_json::json!({
                "title": title,
                "body": body.unwrap_or(""),
            }),
        )?;
        self.call(spec).await
    }

    pub async fn list_open_issues(
        &self,
        owner: &str,
        repo: &str,
        limit: u8,
    ) -> Result<Vec<Issue>, McpGhError> {
        debug!("Listing {} open issues in {}/{}", limit, owner, repo);
        self.call(RequestSpec::get(format!(
            "/repos/{}/{}/issues?state=open&per_page={}",
            owner, repo, limit
        )))
        .await
    }

    pub async fn get_issue(&self, owner: &str, repo: &str, number: u64) -> Result<Issue, McpGhError> {
        debug!("Getting issue #{} from {}/{}", number, owner, repo);
        self.call(RequestSpec::get(format!(
            "/repos/{}/{}/issues/{}",
            owner, repo, number
        )))
        .await
    }

    pub async fn update_issue(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        update: &IssueUpdate,
    ) -> Result<Issue, McpGhError> {
        debug!("Updating issue #{} in {}/{}", number, owner, repo);
        let spec = RequestSpec::patch(format!("/repos/{}/{}/issues/{}", owner, repo, number))
            .with_json(update)?;
        self.call(spec).await
    }

    pub async fn close_issue(&self, owner: &str, repo: &str, number: u64) -> Result<Issue, McpGhError> {
        debug!("Closing issue #{} in {}/{}", number, owner, repo);
        let update = IssueUpdate {
            state: Some(IssueState::Closed),
            ..Default::default()
        };
        self.update_issue(owner, repo, number, &update).await
    }

    /// Search issues scoped to one repository. Pull requests are excluded.
    pub async fn search_issues(
        &self,
        owner: &str,
        repo: &str,
        query: &str,
        limit: u8,
    ) -> Result<Vec<Issue>, McpGhError> {
        debug!("Searching issues in {}/{} with query: {}", owner, repo, query);
        let q = format!("repo:{}/{} is:issue {}", owner, repo, query);
        let response: SearchIssuesResponse = self
            .call(RequestSpec::get(format!(
                "/search/issues?q={}&per_page={}",
                urlencoding::encode(&q),
                limit
            )))
            .await?;
        Ok(response.items)
    }

    pub async fn add_issue_comment(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        body: &str,
    ) -> Result<IssueComment, McpGhError> {
        debug!("Adding comment to issue #{} in {}/{}", number, owner, repo);
        let spec = RequestSpec::post(format!(
            "/repos/{}/{}/issues/{}/comments",
            owner, repo, number
        ))
        .with_json(&serde_json::json!({
            "body": format!("{}{}", AI_COMMENT_IDENTIFIER, body),
        }))?;
        self.call(spec).await
    }

    pub async fn get_issue_comments(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<IssueComment>, McpGhError> {
        debug!("Getting comments for issue #{} in {}/{}", number, owner, repo);
        self.call(RequestSpec::get(format!(
            "/repos/{}/{}/issues/{}/comments",
            owner, repo, number
        )))
        .await
    }

    /// `GET /user` with the session credential.
    pub async fn test_connection(&self) -> bool {
        match self.executor.execute(&RequestSpec::get("/user")).await {
            Ok(_) => true,
            Err(e) => {
                error!("Connection test failed: {}", e);
                false
            }
        }
    }

    pub async fn auth_status(&self) -> AuthStatus {
        self.executor.auth_status().await
    }
}
