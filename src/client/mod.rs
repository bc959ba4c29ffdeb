//! Authenticated GitHub API requests.
//!
//! [`Executor`] attaches the session credential to each [`RequestSpec`],
//! classifies the response, and replays the request once with a fallback
//! credential when the primary token is rejected.

pub mod error;
pub mod executor;
pub mod request;
pub mod response;
pub mod transport;

pub use error::{ErrorReport, ExecutorError, FallbackReport};
pub use executor::{AuthStatus, Executor, Outcome, DEFAULT_API_BASE, USER_AGENT};
pub use request::{Method, OutboundRequest, RequestSpec};
pub use response::{Body, HttpFailure};
pub use transport::{RawResponse, ReqwestTransport, Transport, TransportError};
