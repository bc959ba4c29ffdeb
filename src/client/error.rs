use serde::Serialize;
use thiserror::Error;

use super::response::HttpFailure;
use super::transport::TransportError;
use crate::auth::{ResolutionFailure, Source};

/// Terminal failure of one `Executor::execute` call.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// No source produced a credential; nothing was sent.
    #[error("GitHub authentication failed: {0}")]
    NoCredential(ResolutionFailure),

    /// 401 while using a non-primary credential. No fallback is attempted.
    #[error("GitHub API error! {0}")]
    AuthFailure(HttpFailure),

    /// Any other non-2xx response.
    #[error("GitHub API error! {0}")]
    OtherFailure(HttpFailure),

    #[error("GitHub API request failed: {0}")]
    Transport(#[from] TransportError),

    /// 401 on the primary credential and no other source was available.
    #[error("GitHub API error! {initial}. Fallback to another credential failed: {resolution}")]
    FallbackUnavailable {
        initial: HttpFailure,
        resolution: ResolutionFailure,
    },

    /// 401 on the primary credential, and 401 again after falling back.
    #[error("GitHub API error! {initial}. Retried with {fallback} credential and got {retry}")]
    FallbackExhausted {
        initial: HttpFailure,
        retry: HttpFailure,
        fallback: Source,
    },

    /// 401 on the primary credential; the retry failed for another reason.
    #[error("GitHub API error! {initial}. Retried with {fallback} credential but the retry failed: {cause}")]
    FallbackFailed {
        initial: HttpFailure,
        fallback: Source,
        cause: Box<ExecutorError>,
    },
}

/// Whether a fallback happened during the failed call, and whether it
/// failed as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct FallbackReport {
    pub attempted: bool,
    pub failed: bool,
}

/// Serializable summary handed to the tool layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub message: String,
    pub fallback: FallbackReport,
}

impl ExecutorError {
    pub fn kind(&self) -> &'static str {
        match self {
            ExecutorError::NoCredential(_) => "no_credential",
            ExecutorError::AuthFailure(_) => "auth_failure",
            ExecutorError::OtherFailure(_) => "other_failure",
            ExecutorError::Transport(_) => "transport_failure",
            ExecutorError::FallbackUnavailable { .. } => "fallback_unavailable",
            ExecutorError::FallbackExhausted { .. } => "fallback_exhausted",
            ExecutorError::FallbackFailed { .. } => "fallback_failed",
        }
    }

    /// HTTP status of the last response received, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ExecutorError::NoCredential(_) | ExecutorError::Transport(_) => None,
            ExecutorError::AuthFailure(f) | ExecutorError::OtherFailure(f) => Some(f.status),
            ExecutorError::FallbackUnavailable { initial, .. } => Some(initial.status),
            ExecutorError::FallbackExhausted { retry, .. } => Some(retry.status),
            ExecutorError::FallbackFailed { cause, .. } => cause.status(),
        }
    }

    pub fn fallback(&self) -> FallbackReport {
        match self {
            ExecutorError::FallbackUnavailable { .. }
            | ExecutorError::FallbackExhausted { .. }
            | ExecutorError::FallbackFailed { .. } => FallbackReport {
                attempted: true,
                failed: true,
            },
            _ => FallbackReport::default(),
        }
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            kind: self.kind(),
            status: self.status(),
            message: self.to_string(),
            fallback: self.fallback(),
        }
    }
}
