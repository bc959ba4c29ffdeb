//! Fakes shared by the unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::auth::{CommandOutput, CommandRunner, ExternalCredentialSource, HelperError, HelperResult};
use crate::client::{OutboundRequest, RawResponse, Transport, TransportError};

pub fn json_response(status: u16, body: &str) -> RawResponse {
    RawResponse {
        status,
        body: body.to_string(),
        content_type: Some("application/json; charset=utf-8".to_string()),
    }
}

/// Transport that replays scripted responses in order and records every
/// request it was given. Each send yields once so concurrent calls
/// interleave.
pub struct FakeTransport {
    responses: Mutex<VecDeque<Result<RawResponse, TransportError>>>,
    requests: Mutex<Vec<OutboundRequest>>,
}

impl FakeTransport {
    pub fn new(responses: Vec<Result<RawResponse, TransportError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<OutboundRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, request: &OutboundRequest) -> Result<RawResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        tokio::task::yield_now().await;
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::InvalidRequest("no scripted response".into())))
    }
}

/// External credential source returning a fixed token, or nothing.
pub struct FakeCredentialSource {
    token: Option<String>,
    calls: AtomicUsize,
}

impl FakeCredentialSource {
    pub fn token(token: &str) -> Arc<Self> {
        Arc::new(Self {
            token: Some(token.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn unavailable() -> Arc<Self> {
        Arc::new(Self {
            token: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExternalCredentialSource for FakeCredentialSource {
    async fn fetch_token(&self) -> HelperResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.token
            .clone()
            .ok_or_else(|| HelperError::NotAuthenticated("gh".to_string()))
    }
}

/// Command runner keyed on the joined argument list.
#[derive(Clone, Default)]
pub struct FakeRunner {
    outputs: HashMap<String, CommandOutput>,
    missing: bool,
    calls: Arc<Mutex<Vec<String>>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every invocation fails as if the binary were not installed.
    pub fn missing() -> Self {
        Self {
            missing: true,
            ..Self::default()
        }
    }

    pub fn on(mut self, args: &str, output: CommandOutput) -> Self {
        self.outputs.insert(args.to_string(), output);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(&self, program: &str, args: &[&str]) -> std::io::Result<CommandOutput> {
        let joined = args.join(" ");
        self.calls
            .lock()
            .unwrap()
            .push(format!("{} {}", program, joined));
        if self.missing {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "No such file or directory",
            ));
        }
        Ok(self.outputs.get(&joined).cloned().unwrap_or(CommandOutput {
            exit_code: Some(1),
            stdout: String::new(),
            stderr: format!("unknown command: {}", joined),
        }))
    }
}
