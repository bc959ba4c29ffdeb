//! Credential types and resolution.
//!
//! A [`Credential`] is a bearer secret tagged with the [`Source`] it came
//! from. The [`CredentialResolver`] walks the sources in priority order:
//! the directly configured personal access token first, then the GitHub CLI.

pub mod error;
pub mod gh_cli;
pub mod resolver;

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;

pub use error::{HelperError, HelperResult};
pub use gh_cli::{CommandOutput, CommandRunner, GhCli, GhCliAccount, ProcessRunner};
pub use resolver::{CredentialResolver, ResolutionFailure, SourceAttempt};

/// Where a credential was obtained from.
///
/// Variants are declared in resolution priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Source {
    /// Token passed with `--token` or read from the environment at startup.
    #[serde(rename = "PAT")]
    PrimaryToken,
    /// Token obtained from an external auth helper (`gh auth token`).
    #[serde(rename = "GitHub CLI")]
    ExternalCli,
}

impl Source {
    /// All sources, highest priority first.
    pub const PRIORITY: [Source; 2] = [Source::PrimaryToken, Source::ExternalCli];

    pub fn label(self) -> &'static str {
        match self {
            Source::PrimaryToken => "PAT",
            Source::ExternalCli => "GitHub CLI",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// An opaque bearer secret plus its source. Never printed in full.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    secret: String,
    source: Source,
}

impl Credential {
    pub fn new(secret: impl Into<String>, source: Source) -> Self {
        Self {
            secret: secret.into(),
            source,
        }
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn source(&self) -> Source {
        self.source
    }

    /// Value for the `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.secret)
    }

    /// First four characters followed by `****`; secrets of eight characters
    /// or fewer are fully masked.
    pub fn redacted(&self) -> String {
        if self.secret.chars().count() <= 8 {
            return "****".to_string();
        }
        let prefix: String = self.secret.chars().take(4).collect();
        format!("{}****", prefix)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("secret", &self.redacted())
            .field("source", &self.source)
            .finish()
    }
}

/// Capability for obtaining a credential from outside the process
/// configuration, e.g. by asking the GitHub CLI.
#[async_trait]
pub trait ExternalCredentialSource: Send + Sync {
    /// Fetch a token. Any error means "source unavailable".
    async fn fetch_token(&self) -> HelperResult<String>;

    /// What the user should do to make this source available.
    fn remedy(&self) -> String {
        "run 'gh auth login'".to_string()
    }
}

/// Heuristic check that a token has the shape of a GitHub token
/// (`ghp_`, `gho_`, `ghs_`, ... prefixes and more than ten characters).
pub fn looks_like_github_token(token: &str) -> bool {
    token.starts_with("gh") && token.len() > 10
}
