use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use mcp_gh_issues::auth::{looks_like_github_token, CredentialResolver, GhCli};
use mcp_gh_issues::client::{Executor, ReqwestTransport, DEFAULT_API_BASE};
use mcp_gh_issues::github::GitHubIssues;
use mcp_gh_issues::server;
use rmcp::{transport::stdio, ServiceExt};
use tracing_subscriber::EnvFilter;

/// MCP server for GitHub issues, with GitHub CLI fallback when the PAT is rejected
#[derive(Parser)]
#[command(name = "mcp-gh-issues", version, about)]
struct Cli {
    /// GitHub personal access token.
    /// Can also be set via GITHUB_PERSONAL_ACCESS_TOKEN environment variable.
    #[arg(long)]
    token: Option<String>,

    /// Read GitHub token from an environment variable.
    /// Default: GITHUB_PERSONAL_ACCESS_TOKEN
    #[arg(long = "token-env")]
    token_env: Option<String>,

    /// Default repository owner/org for operations
    #[arg(long)]
    owner: Option<String>,

    /// Maximum results per list or search call (default: 10)
    #[arg(long, default_value = "10")]
    max_results: u32,

    /// GitHub API base URL
    #[arg(long, default_value = DEFAULT_API_BASE)]
    api_base: String,

    /// GitHub CLI binary used as the fallback credential source
    #[arg(long = "gh-path", default_value = "gh")]
    gh_path: String,

    /// Run `gh auth login` interactively before starting the server
    #[arg(long)]
    login: bool,

    /// Log at debug level when RUST_LOG is not set
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    // Resolve token: --token > --token-env > GITHUB_PERSONAL_ACCESS_TOKEN
    let token_env = cli
        .token_env
        .as_deref()
        .unwrap_or("GITHUB_PERSONAL_ACCESS_TOKEN");
    let token = if let Some(t) = cli.token {
        Some(t)
    } else {
        match std::env::var(token_env) {
            Ok(t) if !t.is_empty() => {
                tracing::info!(env = token_env, "Read GitHub token from environment variable");
                Some(t)
            }
            _ => None,
        }
    };
    if let Some(ref t) = token {
        if !looks_like_github_token(t.trim()) {
            tracing::warn!("Configured token does not look like a GitHub token (expected a gh*_ prefix)");
        }
    }

    let gh_cli = Arc::new(GhCli::new(cli.gh_path));
    if cli.login {
        match gh_cli.login().await {
            Ok(true) => {}
            Ok(false) => tracing::warn!("GitHub CLI is still not authenticated after login"),
            Err(e) => tracing::error!("GitHub CLI login failed: {}", e),
        }
    }

    let transport = ReqwestTransport::new()
        .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;
    let resolver = CredentialResolver::new(token, gh_cli.clone()).with_token_env(token_env);
    let executor = Executor::new(Arc::new(transport), resolver).with_api_base(cli.api_base);

    // A missing credential is not fatal: every tool call retries resolution
    // and reports the enumerated sources until one works.
    match executor.authenticate().await {
        Ok(source) => tracing::info!(source = %source, "GitHub API authenticated"),
        Err(e) => tracing::error!("{}", e),
    }

    let authenticated = executor.auth_status().await.authenticated;

    tracing::info!(
        authenticated,
        owner = cli.owner.as_deref().unwrap_or("none"),
        max_results = cli.max_results,
        "Starting mcp-gh-issues server"
    );

    let github = GitHubIssues::new(Arc::new(executor));
    let service =
        server::McpGhIssuesServer::new(github, cli.owner, cli.max_results).with_gh_cli(gh_cli);
    let running = service.serve(stdio()).await?;
    running.waiting().await?;

    Ok(())
}
