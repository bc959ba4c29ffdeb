//! Authenticated request execution with one-shot credential fallback.
//!
//! Every call runs through a small state machine:
//!
//! ```text
//! Init -> Attempt1 -> (401 on PAT) -> Fallback -> Attempt2
//! ```
//!
//! Only a 401 received while using the primary token leads to `Fallback`,
//! and `Attempt2` is always terminal, so a call makes at most two requests.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

use super::error::ExecutorError;
use super::request::{set_header, OutboundRequest, RequestSpec};
use super::response::{Body, HttpFailure};
use super::transport::{RawResponse, Transport, TransportError};
use crate::auth::{Credential, CredentialResolver, ResolutionFailure, Source};

pub const DEFAULT_API_BASE: &str = "https://api.github.com";
pub const USER_AGENT: &str = concat!("mcp-gh-issues/", env!("CARGO_PKG_VERSION"));
const API_VERSION: &str = "2022-11-28";

/// Classification of one HTTP exchange.
#[derive(Debug)]
pub enum Outcome {
    Success(Body),
    AuthFailure(HttpFailure),
    OtherFailure(HttpFailure),
    TransportFailure(TransportError),
}

impl Outcome {
    /// Only 401 counts as an authentication failure; 403, 404, 429 and 5xx
    /// are reported as they are.
    pub fn classify(result: Result<RawResponse, TransportError>) -> Self {
        match result {
            Ok(response) if (200..300).contains(&response.status) => {
                Outcome::Success(Body::parse(&response))
            }
            Ok(response) if response.status == 401 => {
                Outcome::AuthFailure(HttpFailure::from_response(&response))
            }
            Ok(response) => Outcome::OtherFailure(HttpFailure::from_response(&response)),
            Err(e) => Outcome::TransportFailure(e),
        }
    }

    fn status(&self) -> Option<u16> {
        match self {
            Outcome::AuthFailure(f) | Outcome::OtherFailure(f) => Some(f.status),
            _ => None,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Outcome::Success(_) => "success",
            Outcome::AuthFailure(_) => "auth_failure",
            Outcome::OtherFailure(_) => "other_failure",
            Outcome::TransportFailure(_) => "transport_failure",
        }
    }
}

enum Phase {
    Init,
    Attempt1(Credential),
    Fallback {
        rejected: Credential,
        initial: HttpFailure,
    },
    Attempt2 {
        credential: Credential,
        initial: HttpFailure,
    },
}

/// Session credential state. Only resolution writes to it.
#[derive(Debug, Default)]
struct AuthState {
    credential: Option<Credential>,
}

/// Result of [`Executor::auth_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AuthStatus {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
}

pub struct Executor {
    transport: Arc<dyn Transport>,
    resolver: CredentialResolver,
    api_base: String,
    state: Mutex<AuthState>,
}

impl Executor {
    pub fn new(transport: Arc<dyn Transport>, resolver: CredentialResolver) -> Self {
        Self {
            transport,
            resolver,
            api_base: DEFAULT_API_BASE.to_string(),
            state: Mutex::new(AuthState::default()),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Resolve a credential now instead of on the first request.
    pub async fn authenticate(&self) -> Result<Source, ExecutorError> {
        self.current_credential().await.map(|c| c.source())
    }

    pub async fn auth_status(&self) -> AuthStatus {
        let state = self.state.lock().await;
        AuthStatus {
            authenticated: state.credential.is_some(),
            source: state.credential.as_ref().map(Credential::source),
        }
    }

    /// Send `spec` with the session credential, falling back from the
    /// primary token to the next source at most once.
    pub async fn execute(&self, spec: &RequestSpec) -> Result<Body, ExecutorError> {
        let mut phase = Phase::Init;
        loop {
            phase = match phase {
                Phase::Init => match self.current_credential().await {
                    Ok(credential) => Phase::Attempt1(credential),
                    Err(e) => return Err(self.fail(spec, e)),
                },

                Phase::Attempt1(credential) => match self.attempt(spec, &credential, 1).await {
                    Outcome::Success(body) => return Ok(body),
                    Outcome::AuthFailure(initial) if credential.source() == Source::PrimaryToken => {
                        Phase::Fallback {
                            rejected: credential,
                            initial,
                        }
                    }
                    Outcome::AuthFailure(failure) => {
                        return Err(self.fail(spec, ExecutorError::AuthFailure(failure)))
                    }
                    Outcome::OtherFailure(failure) => {
                        return Err(self.fail(spec, ExecutorError::OtherFailure(failure)))
                    }
                    Outcome::TransportFailure(e) => {
                        return Err(self.fail(spec, ExecutorError::Transport(e)))
                    }
                },

                Phase::Fallback { rejected, initial } => {
                    warn!(
                        method = %spec.method(),
                        path = spec.target(),
                        status = initial.status,
                        rejected = %rejected.source(),
                        "Primary token rejected; falling back to next credential source"
                    );
                    match self.escalate(&rejected).await {
                        Ok(credential) => Phase::Attempt2 {
                            credential,
                            initial,
                        },
                        Err(resolution) => {
                            return Err(self.fail(
                                spec,
                                ExecutorError::FallbackUnavailable {
                                    initial,
                                    resolution,
                                },
                            ))
                        }
                    }
                }

                Phase::Attempt2 {
                    credential,
                    initial,
                } => {
                    let fallback = credential.source();
                    let err = match self.attempt(spec, &credential, 2).await {
                        Outcome::Success(body) => return Ok(body),
                        Outcome::AuthFailure(retry) => ExecutorError::FallbackExhausted {
                            initial,
                            retry,
                            fallback,
                        },
                        Outcome::OtherFailure(failure) => ExecutorError::FallbackFailed {
                            initial,
                            fallback,
                            cause: Box::new(ExecutorError::OtherFailure(failure)),
                        },
                        Outcome::TransportFailure(e) => ExecutorError::FallbackFailed {
                            initial,
                            fallback,
                            cause: Box::new(ExecutorError::Transport(e)),
                        },
                    };
                    return Err(self.fail(spec, err));
                }
            };
        }
    }

    async fn current_credential(&self) -> Result<Credential, ExecutorError> {
        let mut state = self.state.lock().await;
        if let Some(ref credential) = state.credential {
            return Ok(credential.clone());
        }
        let credential = self
            .resolver
            .resolve(None)
            .await
            .map_err(ExecutorError::NoCredential)?;
        state.credential = Some(credential.clone());
        Ok(credential)
    }

    /// Replace the rejected primary credential. The state lock is held
    /// across resolution so concurrent fallbacks cannot interleave; a call
    /// that finds the credential already replaced reuses the replacement.
    async fn escalate(&self, rejected: &Credential) -> Result<Credential, ResolutionFailure> {
        let mut state = self.state.lock().await;
        if let Some(ref current) = state.credential {
            if current != rejected {
                debug!(source = %current.source(), "Credential already replaced by a concurrent fallback");
                return Ok(current.clone());
            }
        }
        let credential = self.resolver.resolve(Some(Source::PrimaryToken)).await?;
        debug!(
            from = %rejected.source(),
            to = %credential.source(),
            "Switched session credential"
        );
        state.credential = Some(credential.clone());
        Ok(credential)
    }

    async fn attempt(&self, spec: &RequestSpec, credential: &Credential, attempt: u8) -> Outcome {
        let request = self.render(spec, credential);
        debug!(
            attempt,
            method = %request.method,
            url = %request.url,
            source = %credential.source(),
            "Sending GitHub API request"
        );
        let outcome = Outcome::classify(self.transport.send(&request).await);
        debug!(
            attempt,
            outcome = outcome.label(),
            status = ?outcome.status(),
            "Classified GitHub API response"
        );
        outcome
    }

    /// Default headers, then the request's overrides, then `Authorization`,
    /// which overrides cannot replace.
    fn render(&self, spec: &RequestSpec, credential: &Credential) -> OutboundRequest {
        let mut headers: Vec<(String, String)> = vec![
            ("Accept".into(), "application/vnd.github.v3+json".into()),
            ("Content-Type".into(), "application/json".into()),
            ("User-Agent".into(), USER_AGENT.into()),
            ("X-GitHub-Api-Version".into(), API_VERSION.into()),
        ];
        for (name, value) in spec.headers() {
            set_header(&mut headers, name.clone(), value.clone());
        }
        set_header(&mut headers, "Authorization".into(), credential.bearer());

        OutboundRequest {
            method: spec.method(),
            url: spec.url(&self.api_base),
            headers,
            body: spec.body().map(String::from),
        }
    }

    fn fail(&self, spec: &RequestSpec, err: ExecutorError) -> ExecutorError {
        error!(
            method = %spec.method(),
            path = spec.target(),
            kind = err.kind(),
            status = ?err.status(),
            fallback_attempted = err.fallback().attempted,
            "GitHub API request failed: {}",
            err
        );
        err
    }
}
