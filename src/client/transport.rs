//! HTTP transport seam.
//!
//! The executor only needs "send this request, give me status, body and
//! content type". [`ReqwestTransport`] is the production implementation.

use async_trait::async_trait;
use thiserror::Error;

use super::request::OutboundRequest;

/// Status, body and declared content type of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
    pub content_type: Option<String>,
}

/// Connection-level failures. Never retried.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The server could not be reached at all.
    #[error("connection failed: {0}")]
    Connection(String),
}

impl TransportError {
    fn from_send(e: reqwest::Error) -> Self {
        if e.is_connect() {
            TransportError::Connection(e.to_string())
        } else {
            TransportError::Http(e)
        }
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &OutboundRequest) -> Result<RawResponse, TransportError>;
}

/// [`Transport`] over a shared `reqwest::Client`.
/// Clone is cheap - the client pools connections behind an Arc.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &OutboundRequest) -> Result<RawResponse, TransportError> {
        let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes())
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(ref body) = request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(TransportError::from_send)?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let body = response.text().await?;

        Ok(RawResponse {
            status,
            body,
            content_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::request::Method;
    use wiremock::matchers::{body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn outbound(method: Method, url: String, body: Option<&str>) -> OutboundRequest {
        OutboundRequest {
            method,
            url,
            headers: vec![
                ("Authorization".to_string(), "Bearer ghp_test_token".to_string()),
                ("Content-Type".to_string(), "application/json".to_string()),
            ],
            body: body.map(String::from),
        }
    }

    #[tokio::test]
    async fn test_send_returns_status_body_and_content_type() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .and(header("authorization", "Bearer ghp_test_token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(r#"{"login":"octocat"}"#, "application/json; charset=utf-8"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let transport = ReqwestTransport::new().unwrap();
        let response = transport
            .send(&outbound(Method::Get, format!("{}/user", server.uri()), None))
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.body, r#"{"login":"octocat"}"#);
        assert_eq!(
            response.content_type.as_deref(),
            Some("application/json; charset=utf-8")
        );
    }

    #[tokio::test]
    async fn test_send_passes_body_and_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/repos/o/r/issues/1"))
            .and(body_string(r#"{"state":"closed"}"#))
            .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
            .mount(&server)
            .await;

        let transport = ReqwestTransport::new().unwrap();
        let response = transport
            .send(&outbound(
                Method::Patch,
                format!("{}/repos/o/r/issues/1", server.uri()),
                Some(r#"{"state":"closed"}"#),
            ))
            .await
            .unwrap();

        assert_eq!(response.status, 404);
        assert_eq!(response.body, "Not Found");
    }

    #[tokio::test]
    async fn test_send_connection_refused_is_connection_error() {
        let transport = ReqwestTransport::new().unwrap();
        let err = transport
            .send(&outbound(Method::Get, "http://127.0.0.1:1/user".to_string(), None))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Connection(_)));
    }

    #[tokio::test]
    async fn test_http_error_message_is_not_prefixed_twice() {
        let transport = ReqwestTransport::new().unwrap();
        let err = transport
            .send(&outbound(Method::Get, "not a url".to_string(), None))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Http(_)));

        let message = crate::client::ExecutorError::Transport(err).to_string();
        assert!(message.starts_with("GitHub API request failed: "));
        assert_eq!(message.matches("request failed").count(), 1);
    }
}
