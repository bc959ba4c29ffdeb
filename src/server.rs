use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::*;
use rmcp::{schemars, tool, tool_handler, tool_router, ServerHandler};
use serde::Deserialize;

use crate::auth::{GhCli, Source};
use crate::error::{into_tool_result, McpGhError};
use crate::github::GitHubIssues;
use crate::types::{Issue, IssueComment, IssueState, IssueUpdate};

#[derive(Clone)]
pub struct McpGhIssuesServer {
    github: Arc<GitHubIssues>,
    gh_cli: Option<Arc<GhCli>>,
    default_owner: Option<String>,
    max_results: u32,
    tool_router: ToolRouter<Self>,
}

// -- Tool parameter types --

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CreateIssueParams {
    #[schemars(description = "Repository owner (user or org)")]
    #[serde(default)]
    pub owner: Option<String>,

    #[schemars(description = "Repository name")]
    pub repo: String,

    #[schemars(description = "Issue title")]
    pub title: String,

    #[schemars(description = "Issue body (markdown)")]
    #[serde(default)]
    pub body: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListIssuesParams {
    #[schemars(description = "Repository owner (user or org)")]
    #[serde(default)]
    pub owner: Option<String>,

    #[schemars(description = "Repository name")]
    pub repo: String,

    #[schemars(description = "Maximum number of results")]
    #[serde(default)]
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct IssueParams {
    #[schemars(description = "Repository owner (user or org)")]
    #[serde(default)]
    pub owner: Option<String>,

    #[schemars(description = "Repository name")]
    pub repo: String,

    #[schemars(description = "Issue number")]
    pub issue_number: u64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateIssueParams {
    #[schemars(description = "Repository owner (user or org)")]
    #[serde(default)]
    pub owner: Option<String>,

    #[schemars(description = "Repository name")]
    pub repo: String,

    #[schemars(description = "Issue number")]
    pub issue_number: u64,

    #[schemars(description = "New title")]
    #[serde(default)]
    pub title: Option<String>,

    #[schemars(description = "New body (markdown)")]
    #[serde(default)]
    pub body: Option<String>,

    #[schemars(description = "New state: open or closed")]
    #[serde(default)]
    pub state: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SearchIssuesParams {
    #[schemars(description = "Repository owner (user or org)")]
    #[serde(default)]
    pub owner: Option<String>,

    #[schemars(description = "Repository name")]
    pub repo: String,

    #[schemars(description = "Search keywords (GitHub search syntax)")]
    pub query: String,

    #[schemars(description = "Maximum number of results")]
    #[serde(default)]
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddCommentParams {
    #[schemars(description = "Repository owner (user or org)")]
    #[serde(default)]
    pub owner: Option<String>,

    #[schemars(description = "Repository name")]
    pub repo: String,

    #[schemars(description = "Issue number")]
    pub issue_number: u64,

    #[schemars(description = "Comment body (markdown)")]
    pub body: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AuthStatusParams {
    #[schemars(description = "Also call GET /user to check the credential works")]
    #[serde(default)]
    pub verify: Option<bool>,
}

impl McpGhIssuesServer {
    pub fn new(github: GitHubIssues, default_owner: Option<String>, max_results: u32) -> Self {
        Self {
            github: Arc::new(github),
            gh_cli: None,
            default_owner,
            max_results,
            tool_router: Self::tool_router(),
        }
    }

    /// Report GitHub CLI account details from `get_auth_status`.
    pub fn with_gh_cli(mut self, gh_cli: Arc<GhCli>) -> Self {
        self.gh_cli = Some(gh_cli);
        self
    }

    fn resolve_owner(&self, param: Option<&str>) -> Result<String, McpGhError> {
        param
            .map(String::from)
            .or_else(|| self.default_owner.clone())
            .ok_or_else(|| {
                McpGhError::MissingParam("owner is required (or set --owner default)".to_string())
            })
    }

    /// Owner and repo, validated for use in API routes.
    fn repo_ref(&self, owner: Option<&str>, repo: &str) -> Result<(String, String), McpGhError> {
        let owner = self.resolve_owner(owner)?;
        sanitize_github_name(&owner, "owner")?;
        sanitize_github_name(repo, "repo")?;
        Ok((owner, repo.to_string()))
    }

    /// Cap the page size to 100 (GitHub API maximum) and safely cast to u8.
    fn capped_per_page(&self, per_page: Option<u32>) -> u8 {
        std::cmp::min(per_page.unwrap_or(self.max_results), 100) as u8
    }

    fn err(&self, e: McpGhError) -> ErrorData {
        e.to_mcp_error()
    }
}

/// Validate that a GitHub owner/repo name doesn't contain characters that
/// could be used for URL injection in API routes.
fn sanitize_github_name(name: &str, field: &str) -> Result<(), McpGhError> {
    if name.is_empty() {
        return Err(McpGhError::MissingParam(format!(
            "{} must not be empty",
            field
        )));
    }
    // Dot segments would be resolved by the URL layer and escape the route.
    if name == "." || name == ".." {
        return Err(McpGhError::InvalidParam(format!(
            "{} must not be '{}'",
            field, name
        )));
    }
    for ch in ['/', '?', '#', '%', '&', '\0', ' ', '\n', '\t'] {
        if name.contains(ch) {
            return Err(McpGhError::InvalidParam(format!(
                "{} contains invalid character '{}'",
                field,
                ch.escape_default()
            )));
        }
    }
    Ok(())
}

fn require_text(value: &str, field: &str) -> Result<(), McpGhError> {
    if value.trim().is_empty() {
        return Err(McpGhError::MissingParam(format!("{} must not be empty", field)));
    }
    Ok(())
}

fn labels_of(issue: &Issue) -> String {
    if issue.labels.is_empty() {
        return "(none)".to_string();
    }
    issue
        .labels
        .iter()
        .map(|l| l.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_created(issue: &Issue) -> String {
    format!(
        "Issue created! #{}: {}\nURL: {}",
        issue.number, issue.title, issue.html_url
    )
}

fn format_open_issues(issues: &[Issue]) -> String {
    if issues.is_empty() {
        return "No open issues 🎉".to_string();
    }
    issues
        .iter()
        .map(|i| {
            format!(
                "#{}: {}\nBy: {} | {}\nURL: {}\n---",
                i.number, i.title, i.user.login, i.created_at, i.html_url
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_issue(issue: &Issue) -> String {
    format!(
        "#{}: {}\nState: {}\nAuthor: {}\nCreated: {}\nUpdated: {}\nLabels: {}\n\n{}\n\nURL: {}",
        issue.number,
        issue.title,
        issue.state,
        issue.user.login,
        issue.created_at,
        issue.updated_at,
        labels_of(issue),
        issue.body.as_deref().unwrap_or(""),
        issue.html_url
    )
}

fn format_updated(issue: &Issue) -> String {
    format!(
        "Issue #{} updated.\nTitle: {}\nState: {}\nURL: {}",
        issue.number, issue.title, issue.state, issue.html_url
    )
}

fn format_search_results(issues: &[Issue]) -> String {
    if issues.is_empty() {
        return "No issues matched your query.".to_string();
    }
    issues
        .iter()
        .map(|i| {
            format!(
                "#{}: {}\nState: {} | By: {}\nURL: {}\n---",
                i.number, i.title, i.state, i.user.login, i.html_url
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_comments(issue_number: u64, comments: &[IssueComment]) -> String {
    if comments.is_empty() {
        return format!("No comments on issue #{}", issue_number);
    }
    comments
        .iter()
        .map(|c| {
            format!(
                "By: {} at {}\n{}\nURL: {}\n---",
                c.user.login, c.created_at, c.body, c.html_url
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// -- MCP tool handlers (thin wrappers over GitHubIssues) --

#[tool_router]
impl McpGhIssuesServer {
    #[tool(
        name = "create_issue",
        description = "Create a new issue in a GitHub repository"
    )]
    async fn create_issue(
        &self,
        Parameters(params): Parameters<CreateIssueParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let (owner, repo) = self
            .repo_ref(params.owner.as_deref(), &params.repo)
            .map_err(|e| self.err(e))?;
        require_text(&params.title, "title").map_err(|e| self.err(e))?;

        let result = self
            .github
            .create_issue(&owner, &repo, &params.title, params.body.as_deref())
            .await
            .map(|issue| format_created(&issue));
        into_tool_result(result)
    }

    #[tool(
        name = "list_open_issues",
        description = "List open issues in a GitHub repository"
    )]
    async fn list_open_issues(
        &self,
        Parameters(params): Parameters<ListIssuesParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let (owner, repo) = self
            .repo_ref(params.owner.as_deref(), &params.repo)
            .map_err(|e| self.err(e))?;
        let limit = self.capped_per_page(params.limit);

        let result = self
            .github
            .list_open_issues(&owner, &repo, limit)
            .await
            .map(|issues| format_open_issues(&issues));
        into_tool_result(result)
    }

    #[tool(name = "get_issue", description = "Get details of a GitHub issue")]
    async fn get_issue(
        &self,
        Parameters(params): Parameters<IssueParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let (owner, repo) = self
            .repo_ref(params.owner.as_deref(), &params.repo)
            .map_err(|e| self.err(e))?;

        let result = self
            .github
            .get_issue(&owner, &repo, params.issue_number)
            .await
            .map(|issue| format_issue(&issue));
        into_tool_result(result)
    }

    #[tool(
        name = "update_issue",
        description = "Update the title, body, or state of an existing GitHub issue"
    )]
    async fn update_issue(
        &self,
        Parameters(params): Parameters<UpdateIssueParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let (owner, repo) = self
            .repo_ref(params.owner.as_deref(), &params.repo)
            .map_err(|e| self.err(e))?;

        let state = match params.state.as_deref() {
            None => None,
            Some(s) => Some(IssueState::parse(s).ok_or_else(|| {
                self.err(McpGhError::InvalidParam(format!(
                    "state must be 'open' or 'closed', got '{}'",
                    s
                )))
            })?),
        };
        let update = IssueUpdate {
            title: params.title.filter(|t| !t.is_empty()),
            body: params.body.filter(|b| !b.is_empty()),
            state,
        };
        if update.is_empty() {
            return Ok(CallToolResult::success(vec![Content::text(
                "Nothing to update. Specify at least one field.",
            )]));
        }

        let result = self
            .github
            .update_issue(&owner, &repo, params.issue_number, &update)
            .await
            .map(|issue| format_updated(&issue));
        into_tool_result(result)
    }

    #[tool(name = "close_issue", description = "Close a GitHub issue")]
    async fn close_issue(
        &self,
        Parameters(params): Parameters<IssueParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let (owner, repo) = self
            .repo_ref(params.owner.as_deref(), &params.repo)
            .map_err(|e| self.err(e))?;

        let result = self
            .github
            .close_issue(&owner, &repo, params.issue_number)
            .await
            .map(|issue| format!("Issue #{} closed. URL: {}", issue.number, issue.html_url));
        into_tool_result(result)
    }

    #[tool(
        name = "search_issues",
        description = "Search issues in a repository using GitHub search syntax"
    )]
    async fn search_issues(
        &self,
        Parameters(params): Parameters<SearchIssuesParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let (owner, repo) = self
            .repo_ref(params.owner.as_deref(), &params.repo)
            .map_err(|e| self.err(e))?;
        require_text(&params.query, "query").map_err(|e| self.err(e))?;
        let limit = self.capped_per_page(params.limit);

        let result = self
            .github
            .search_issues(&owner, &repo, &params.query, limit)
            .await
            .map(|issues| format_search_results(&issues));
        into_tool_result(result)
    }

    #[tool(
        name = "add_issue_comment",
        description = "Add a comment to a GitHub issue"
    )]
    async fn add_issue_comment(
        &self,
        Parameters(params): Parameters<AddCommentParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let (owner, repo) = self
            .repo_ref(params.owner.as_deref(), &params.repo)
            .map_err(|e| self.err(e))?;
        require_text(&params.body, "body").map_err(|e| self.err(e))?;

        let number = params.issue_number;
        let result = self
            .github
            .add_issue_comment(&owner, &repo, number, &params.body)
            .await
            .map(|c| format!("Comment added to issue #{}\nURL: {}", number, c.html_url));
        into_tool_result(result)
    }

    #[tool(
        name = "get_issue_comments",
        description = "Get comments from a GitHub issue"
    )]
    async fn get_issue_comments(
        &self,
        Parameters(params): Parameters<IssueParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let (owner, repo) = self
            .repo_ref(params.owner.as_deref(), &params.repo)
            .map_err(|e| self.err(e))?;

        let number = params.issue_number;
        let result = self
            .github
            .get_issue_comments(&owner, &repo, number)
            .await
            .map(|comments| format_comments(number, &comments));
        into_tool_result(result)
    }

    #[tool(
        name = "get_auth_status",
        description = "Show which credential source (PAT or GitHub CLI) is in use"
    )]
    async fn get_auth_status(
        &self,
        Parameters(params): Parameters<AuthStatusParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let mut report = serde_json::json!({});
        if params.verify.unwrap_or(false) {
            report["connection_ok"] = serde_json::json!(self.github.test_connection().await);
        }

        let status = self.github.auth_status().await;
        report["authenticated"] = serde_json::json!(status.authenticated);
        if let Some(source) = status.source {
            report["source"] = serde_json::json!(source);
        }
        if let (Some(Source::ExternalCli), Some(gh)) = (status.source, self.gh_cli.as_ref()) {
            report["gh_cli"] = serde_json::json!(gh.account().await);
        }

        let text = serde_json::to_string_pretty(&report).unwrap_or_else(|_| "{}".to_string());
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }
}

#[tool_handler]
impl ServerHandler for McpGhIssuesServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "mcp-gh-issues".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            instructions: Some(
                "GitHub issue server. Use create_issue to open issues, list_open_issues and \
                 search_issues to find them, get_issue for details, update_issue or close_issue \
                 to change them, add_issue_comment/get_issue_comments for discussion, and \
                 get_auth_status to see which credential is in use."
                    .to_string(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::CredentialResolver;
    use crate::client::Executor;
    use crate::test_support::{json_response, FakeCredentialSource, FakeTransport};
    use crate::types::{Label, User};

    fn make_server_with(
        transport: Arc<FakeTransport>,
        default_owner: Option<String>,
        max_results: u32,
    ) -> McpGhIssuesServer {
        let resolver = CredentialResolver::new(
            Some("ghp_primary_token_1".into()),
            FakeCredentialSource::token("gho_cli_token_2"),
        );
        let executor = Executor::new(transport, resolver);
        McpGhIssuesServer::new(
            GitHubIssues::new(Arc::new(executor)),
            default_owner,
            max_results,
        )
    }

    fn make_server(default_owner: Option<String>, max_results: u32) -> McpGhIssuesServer {
        make_server_with(FakeTransport::new(vec![]), default_owner, max_results)
    }

    /// (text, is_error) of a tool result.
    fn text_of(result: &CallToolResult) -> (String, bool) {
        let value = serde_json::to_value(result).unwrap();
        let text = value["content"][0]["text"].as_str().unwrap_or("").to_string();
        let is_error = value["isError"].as_bool().unwrap_or(false);
        (text, is_error)
    }

    fn sample_issue() -> Issue {
        Issue {
            number: 42,
            title: "Crash on start".into(),
            html_url: "https://github.com/o/r/issues/42".into(),
            state: "open".into(),
            user: User {
                login: "octocat".into(),
            },
            created_at: "2024-01-01T00:00:00Z".into(),
            updated_at: "2024-01-02T00:00:00Z".into(),
            body: Some("It crashes.".into()),
            labels: vec![
                Label { name: "bug".into() },
                Label { name: "p1".into() },
            ],
            comments: Some(2),
        }
    }

    fn issue_json(number: u64) -> String {
        serde_json::to_string(&Issue {
            number,
            ..sample_issue()
        })
        .unwrap()
    }

    #[test]
    fn test_resolve_owner_with_param() {
        let server = make_server(None, 10);
        assert_eq!(server.resolve_owner(Some("my-org")).unwrap(), "my-org");
    }

    #[test]
    fn test_resolve_owner_with_default() {
        let server = make_server(Some("default-org".to_string()), 10);
        assert_eq!(server.resolve_owner(None).unwrap(), "default-org");
    }

    #[test]
    fn test_resolve_owner_param_overrides_default() {
        let server = make_server(Some("default-org".to_string()), 10);
        assert_eq!(
            server.resolve_owner(Some("explicit-org")).unwrap(),
            "explicit-org"
        );
    }

    #[test]
    fn test_resolve_owner_missing() {
        let server = make_server(None, 10);
        assert!(server.resolve_owner(None).is_err());
    }

    #[test]
    fn test_capped_per_page() {
        let server = make_server(None, 10);
        assert_eq!(server.capped_per_page(None), 10);
        assert_eq!(server.capped_per_page(Some(50)), 50);
        assert_eq!(server.capped_per_page(Some(1000)), 100);
        assert_eq!(make_server(None, 500).capped_per_page(None), 100);
    }

    #[test]
    fn test_sanitize_github_name() {
        assert!(sanitize_github_name("my-org", "owner").is_ok());
        assert!(sanitize_github_name("repo.name", "repo").is_ok());
        assert!(sanitize_github_name("", "owner").is_err());
        assert!(sanitize_github_name("owner/repo", "owner").is_err());
        assert!(sanitize_github_name("../etc", "owner").is_err());
        assert!(sanitize_github_name("repo?x=1", "repo").is_err());
        assert!(sanitize_github_name("my repo", "repo").is_err());
        assert!(sanitize_github_name("my\nrepo", "repo").is_err());
        assert!(sanitize_github_name(".", "repo").is_err());
        assert!(sanitize_github_name("..", "owner").is_err());
        assert!(sanitize_github_name(".github", "repo").is_ok());
    }

    #[test]
    fn test_format_issue_detail() {
        let text = format_issue(&sample_issue());
        assert!(text.starts_with("#42: Crash on start\nState: open\nAuthor: octocat"));
        assert!(text.contains("Labels: bug, p1"));
        assert!(text.ends_with("It crashes.\n\nURL: https://github.com/o/r/issues/42"));
    }

    #[test]
    fn test_format_empty_lists() {
        assert_eq!(format_open_issues(&[]), "No open issues 🎉");
        assert_eq!(format_search_results(&[]), "No issues matched your query.");
        assert_eq!(format_comments(3, &[]), "No comments on issue #3");
    }

    #[test]
    fn test_format_labels_none() {
        let issue = Issue {
            labels: vec![],
            ..sample_issue()
        };
        assert!(format_issue(&issue).contains("Labels: (none)"));
    }

    #[tokio::test]
    async fn test_create_issue_tool_success() {
        let transport = FakeTransport::new(vec![Ok(json_response(201, &issue_json(42)))]);
        let server = make_server_with(transport, Some("o".into()), 10);

        let result = server
            .create_issue(Parameters(CreateIssueParams {
                owner: None,
                repo: "r".into(),
                title: "Crash on start".into(),
                body: None,
            }))
            .await
            .unwrap();
        let (text, is_error) = text_of(&result);
        assert!(!is_error);
        assert_eq!(
            text,
            "Issue created! #42: Crash on start\nURL: https://github.com/o/r/issues/42"
        );
    }

    #[tokio::test]
    async fn test_api_failure_becomes_text_error() {
        let transport = FakeTransport::new(vec![Ok(json_response(
            404,
            r#"{"message":"Not Found"}"#,
        ))]);
        let server = make_server_with(transport, None, 10);

        let result = server
            .get_issue(Parameters(IssueParams {
                owner: Some("o".into()),
                repo: "r".into(),
                issue_number: 9,
            }))
            .await
            .unwrap();
        let (text, is_error) = text_of(&result);
        assert!(is_error);
        assert_eq!(text, "GitHub API error! Status: 404. Message: Not Found");
    }

    #[tokio::test]
    async fn test_fallback_context_in_tool_error() {
        let transport = FakeTransport::new(vec![
            Ok(json_response(401, r#"{"message":"Bad credentials"}"#)),
            Ok(json_response(401, r#"{"message":"Bad credentials"}"#)),
        ]);
        let server = make_server_with(transport, None, 10);

        let result = server
            .close_issue(Parameters(IssueParams {
                owner: Some("o".into()),
                repo: "r".into(),
                issue_number: 1,
            }))
            .await
            .unwrap();
        let (text, is_error) = text_of(&result);
        assert!(is_error);
        assert!(text.contains("Status: 401"));
        assert!(text.contains("Retried with GitHub CLI credential"));

        let value = serde_json::to_value(&result).unwrap();
        let report: serde_json::Value =
            serde_json::from_str(value["content"][1]["text"].as_str().unwrap()).unwrap();
        assert_eq!(report["kind"], "fallback_exhausted");
        assert_eq!(report["status"], 401);
        assert_eq!(report["fallback"]["attempted"], true);
        assert_eq!(report["fallback"]["failed"], true);
    }

    #[tokio::test]
    async fn test_dot_segment_names_are_rejected() {
        let transport = FakeTransport::new(vec![]);
        let server = make_server_with(transport.clone(), None, 10);

        let result = server
            .close_issue(Parameters(IssueParams {
                owner: Some("..".into()),
                repo: "..".into(),
                issue_number: 1,
            }))
            .await;
        assert!(result.is_err());
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_owner_is_protocol_error() {
        let transport = FakeTransport::new(vec![]);
        let server = make_server_with(transport.clone(), None, 10);

        let result = server
            .get_issue(Parameters(IssueParams {
                owner: Some("evil/../x".into()),
                repo: "r".into(),
                issue_number: 1,
            }))
            .await;
        assert!(result.is_err());
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_update_issue_nothing_to_update() {
        let transport = FakeTransport::new(vec![]);
        let server = make_server_with(transport.clone(), None, 10);

        let result = server
            .update_issue(Parameters(UpdateIssueParams {
                owner: Some("o".into()),
                repo: "r".into(),
                issue_number: 1,
                title: None,
                body: Some(String::new()),
                state: None,
            }))
            .await
            .unwrap();
        let (text, _) = text_of(&result);
        assert_eq!(text, "Nothing to update. Specify at least one field.");
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_update_issue_rejects_unknown_state() {
        let server = make_server(None, 10);
        let result = server
            .update_issue(Parameters(UpdateIssueParams {
                owner: Some("o".into()),
                repo: "r".into(),
                issue_number: 1,
                title: None,
                body: None,
                state: Some("merged".into()),
            }))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_auth_status_tool_tracks_source() {
        let transport = FakeTransport::new(vec![
            Ok(json_response(401, r#"{"message":"Bad credentials"}"#)),
            Ok(json_response(200, r#"{"login":"octocat"}"#)),
        ]);
        let server = make_server_with(transport, None, 10);

        let before = server
            .get_auth_status(Parameters(AuthStatusParams { verify: None }))
            .await
            .unwrap();
        let before: serde_json::Value = serde_json::from_str(&text_of(&before).0).unwrap();
        assert_eq!(before, serde_json::json!({"authenticated": false}));

        let after = server
            .get_auth_status(Parameters(AuthStatusParams { verify: Some(true) }))
            .await
            .unwrap();
        let after: serde_json::Value = serde_json::from_str(&text_of(&after).0).unwrap();
        assert_eq!(after["connection_ok"], true);
        assert_eq!(after["authenticated"], true);
        assert_eq!(after["source"], "GitHub CLI");
    }
}
