//! Errors from the external auth helper.
//!
//! None of these are fatal: the resolver records them as the reason a
//! source was unavailable and moves on.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HelperError {
    /// The helper exited with a non-zero code
    #[error("{program} exited with code {code}: {stderr}")]
    CommandFailed {
        program: String,
        code: i32,
        stderr: String,
    },

    /// The helper could not be started
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The helper binary is not installed or not in PATH
    #[error("{0} not found - ensure the GitHub CLI is installed and in PATH")]
    NotFound(String),

    /// The helper is installed but has no logged-in account
    #[error("{0} is not authenticated")]
    NotAuthenticated(String),

    /// The helper succeeded but printed nothing
    #[error("{0} returned an empty token")]
    EmptyOutput(String),

    /// The helper printed something that is not a single token
    #[error("{program} returned a malformed token: {detail}")]
    Malformed { program: String, detail: String },
}

pub type HelperResult<T> = Result<T, HelperError>;
