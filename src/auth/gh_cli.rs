//! GitHub CLI credential source.
//!
//! Runs `gh auth status` followed by `gh auth token` and hands the token to
//! the resolver. Process execution goes through [`CommandRunner`] so the
//! lookup can be exercised without a real `gh` binary.

use std::process::Stdio;

use async_trait::async_trait;
use serde::Serialize;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::error::{HelperError, HelperResult};
use super::ExternalCredentialSource;

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs a program to completion with stdout and stderr captured.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, program: &str, args: &[&str]) -> std::io::Result<CommandOutput>;
}

/// [`CommandRunner`] backed by `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, program: &str, args: &[&str]) -> std::io::Result<CommandOutput> {
        debug!("executing: {} {}", program, args.join(" "));

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?
            .wait_with_output()
            .await?;

        Ok(CommandOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Login details reported by `gh auth status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GhCliAccount {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    pub hostname: String,
}

pub struct GhCli<R = ProcessRunner> {
    program: String,
    runner: R,
}

impl GhCli<ProcessRunner> {
    pub fn new(program: impl Into<String>) -> Self {
        Self::with_runner(program, ProcessRunner)
    }
}

impl<R: CommandRunner> GhCli<R> {
    pub fn with_runner(program: impl Into<String>, runner: R) -> Self {
        Self {
            program: program.into(),
            runner,
        }
    }

    async fn run(&self, args: &[&str]) -> HelperResult<CommandOutput> {
        self.runner
            .run(&self.program, args)
            .await
            .map_err(|e| self.spawn_error(e))
    }

    fn spawn_error(&self, e: std::io::Error) -> HelperError {
        if e.kind() == std::io::ErrorKind::NotFound {
            HelperError::NotFound(self.program.clone())
        } else {
            HelperError::Spawn {
                program: self.program.clone(),
                source: e,
            }
        }
    }

    /// Whether `gh auth status` reports a logged-in account.
    pub async fn check_auth_status(&self) -> HelperResult<bool> {
        let output = self.run(&["auth", "status"]).await?;
        if output.success() {
            debug!("GitHub CLI is authenticated");
        } else {
            debug!(code = ?output.exit_code, stderr = %output.stderr.trim(), "GitHub CLI auth check failed");
        }
        Ok(output.success())
    }

    /// Token printed by `gh auth token`, after confirming the CLI is logged in.
    pub async fn token(&self) -> HelperResult<String> {
        if !self.check_auth_status().await? {
            warn!("GitHub CLI is not authenticated");
            return Err(HelperError::NotAuthenticated(self.program.clone()));
        }

        let output = self.run(&["auth", "token"]).await?;
        if !output.success() {
            return Err(HelperError::CommandFailed {
                program: self.program.clone(),
                code: output.exit_code.unwrap_or(-1),
                stderr: output.stderr.trim().to_string(),
            });
        }

        let token = parse_token(&self.program, &output.stdout)?;
        info!("Retrieved token from GitHub CLI");
        Ok(token)
    }

    /// Account details from `gh auth status`. Any failure reads as
    /// "not authenticated".
    pub async fn account(&self) -> GhCliAccount {
        match self.run(&["auth", "status"]).await {
            // Older gh releases print the status report to stderr.
            Ok(output) => parse_auth_status(&format!("{}\n{}", output.stdout, output.stderr)),
            Err(e) => {
                debug!(error = %e, "GitHub CLI account lookup failed");
                GhCliAccount {
                    authenticated: false,
                    account: None,
                    hostname: "github.com".to_string(),
                }
            }
        }
    }

    /// Run `gh auth login` attached to the controlling terminal.
    ///
    /// Interactive, so it is only ever invoked from the command line and
    /// never from a request path.
    pub async fn login(&self) -> HelperResult<bool> {
        info!("Prompting GitHub CLI authentication");
        let status = Command::new(&self.program)
            .args(["auth", "login"])
            .status()
            .await
            .map_err(|e| self.spawn_error(e))?;
        if !status.success() {
            warn!(code = ?status.code(), "gh auth login did not complete");
        }
        self.check_auth_status().await
    }
}

#[async_trait]
impl<R: CommandRunner> ExternalCredentialSource for GhCli<R> {
    async fn fetch_token(&self) -> HelperResult<String> {
        self.token().await
    }

    fn remedy(&self) -> String {
        format!("run '{} auth login'", self.program)
    }
}

fn parse_token(program: &str, stdout: &str) -> HelperResult<String> {
    let token = stdout.trim();
    if token.is_empty() {
        return Err(HelperError::EmptyOutput(program.to_string()));
    }
    if token.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(HelperError::Malformed {
            program: program.to_string(),
            detail: "expected a single token on one line".to_string(),
        });
    }
    Ok(token.to_string())
}

fn parse_auth_status(output: &str) -> GhCliAccount {
    let authenticated = output.contains("Logged in to");
    let account = account_after(output, "account ").or_else(|| account_after(output, " as "));
    GhCliAccount {
        authenticated,
        account,
        hostname: "github.com".to_string(),
    }
}

fn account_after(output: &str, marker: &str) -> Option<String> {
    let start = output.find(marker)? + marker.len();
    let name: String = output[start..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    (!name.is_empty()).then_some(name)
}
