use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::{Credential, ExternalCredentialSource, Source};

/// Why a single source produced no credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceAttempt {
    pub source: Source,
    pub reason: String,
    pub remedy: String,
}

/// Every source was tried and none yielded a credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionFailure {
    pub attempts: Vec<SourceAttempt>,
}

impl ResolutionFailure {
    pub fn tried(&self, source: Source) -> bool {
        self.attempts.iter().any(|a| a.source == source)
    }
}

impl fmt::Display for ResolutionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("no usable GitHub credential. Tried: ")?;
        for (i, attempt) in self.attempts.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(
                f,
                "{} ({}; {})",
                attempt.source, attempt.reason, attempt.remedy
            )?;
        }
        Ok(())
    }
}

impl std::error::Error for ResolutionFailure {}

/// Produces credentials from the configured token and the external helper,
/// in that order.
pub struct CredentialResolver {
    configured: Option<String>,
    token_env: String,
    external: Arc<dyn ExternalCredentialSource>,
}

impl CredentialResolver {
    /// `configured` is the token read once at startup; blank values count as
    /// unset.
    pub fn new(configured: Option<String>, external: Arc<dyn ExternalCredentialSource>) -> Self {
        Self {
            configured: configured
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
            token_env: "GITHUB_PERSONAL_ACCESS_TOKEN".to_string(),
            external,
        }
    }

    /// Environment variable named in remediation hints for the primary token.
    pub fn with_token_env(mut self, token_env: impl Into<String>) -> Self {
        self.token_env = token_env.into();
        self
    }

    /// Try each source in priority order, skipping `excluding`.
    pub async fn resolve(&self, excluding: Option<Source>) -> Result<Credential, ResolutionFailure> {
        let mut attempts = Vec::with_capacity(Source::PRIORITY.len());

        for source in Source::PRIORITY {
            let outcome = if excluding == Some(source) {
                Err("skipped: credential was rejected by GitHub".to_string())
            } else {
                self.try_source(source).await
            };

            match outcome {
                Ok(credential) => {
                    debug!(
                        source = %source,
                        credential = %credential.redacted(),
                        "Resolved GitHub credential"
                    );
                    return Ok(credential);
                }
                Err(reason) => {
                    debug!(source = %source, reason = %reason, "Credential source unavailable");
                    attempts.push(SourceAttempt {
                        source,
                        reason,
                        remedy: self.remedy(source),
                    });
                }
            }
        }

        Err(ResolutionFailure { attempts })
    }

    async fn try_source(&self, source: Source) -> Result<Credential, String> {
        match source {
            Source::PrimaryToken => self
                .configured
                .as_ref()
                .map(|t| Credential::new(t.clone(), Source::PrimaryToken))
                .ok_or_else(|| format!("{} is not set", self.token_env)),
            Source::ExternalCli => self
                .external
                .fetch_token()
                .await
                .map(|t| Credential::new(t, Source::ExternalCli))
                .map_err(|e| e.to_string()),
        }
    }

    fn remedy(&self, source: Source) -> String {
        match source {
            Source::PrimaryToken => format!("set {} or pass --token", self.token_env),
            Source::ExternalCli => self.external.remedy(),
        }
    }
}
