use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use super::transport::RawResponse;

/// Maximum length for upstream messages carried in errors
const MAX_ERROR_MESSAGE_CHARS: usize = 500;

/// A decoded response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Json(Value),
    Text(String),
}

impl Body {
    /// Decode according to the declared content type. JSON that fails to
    /// parse degrades to the raw text.
    pub fn parse(response: &RawResponse) -> Self {
        let is_json = response
            .content_type
            .as_deref()
            .is_some_and(|ct| ct.contains("application/json"));
        if !is_json {
            return Body::Text(response.body.clone());
        }
        match serde_json::from_str(&response.body) {
            Ok(value) => Body::Json(value),
            Err(e) => {
                debug!(error = %e, "Response declared JSON but did not parse; keeping raw text");
                Body::Text(response.body.clone())
            }
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Body::Json(v) => Some(v),
            Body::Text(_) => None,
        }
    }

    /// Deserialize into a typed model. Text bodies are parsed as JSON too,
    /// for servers that omit the content type.
    pub fn into_typed<T: DeserializeOwned>(self) -> serde_json::Result<T> {
        match self {
            Body::Json(v) => serde_json::from_value(v),
            Body::Text(t) => serde_json::from_str(&t),
        }
    }
}

impl fmt::Display for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Json(v) => write!(f, "{}", v),
            Body::Text(t) => f.write_str(t),
        }
    }
}

/// A non-2xx response: status plus the upstream message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpFailure {
    pub status: u16,
    pub message: String,
}

impl HttpFailure {
    pub fn from_response(response: &RawResponse) -> Self {
        Self {
            status: response.status,
            message: upstream_message(&Body::parse(response)),
        }
    }
}

impl fmt::Display for HttpFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Status: {}. Message: {}", self.status, self.message)
    }
}

/// GitHub error bodies carry a `message` field; anything else is reported
/// verbatim.
fn upstream_message(body: &Body) -> String {
    let message = match body {
        Body::Json(v) => v
            .get("message")
            .and_then(Value::as_str)
            .map(String::from)
            .unwrap_or_else(|| v.to_string()),
        Body::Text(t) => t.trim().to_string(),
    };
    truncate(&message)
}

fn truncate(message: &str) -> String {
    let total = message.chars().count();
    if total <= MAX_ERROR_MESSAGE_CHARS {
        return message.to_string();
    }
    let head: String = message.chars().take(MAX_ERROR_MESSAGE_CHARS).collect();
    format!("{}... (truncated, {} total chars)", head, total)
}
