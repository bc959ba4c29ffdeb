use rmcp::model::{CallToolResult, Content, ErrorData};

use crate::client::ExecutorError;

#[derive(Debug, thiserror::Error)]
pub enum McpGhError {
    #[error(transparent)]
    Api(#[from] ExecutorError),

    #[error("Missing required parameter: {0}")]
    MissingParam(String),

    #[error("Invalid parameter: {0}")]
    InvalidParam(String),

    #[error("Unexpected JSON from GitHub: {0}")]
    Json(#[from] serde_json::Error),
}

impl McpGhError {
    pub fn to_mcp_error(&self) -> ErrorData {
        match self {
            McpGhError::MissingParam(_) | McpGhError::InvalidParam(_) => {
                ErrorData::invalid_params(self.to_string(), None)
            }
            McpGhError::Api(_) | McpGhError::Json(_) => {
                ErrorData::internal_error(self.to_string(), None)
            }
        }
    }

    /// Tool result for a failed GitHub call. The call is reported as a tool
    /// error rather than a protocol error so the client sees the message.
    /// API failures carry a second, JSON content block with the status and
    /// fallback flags.
    pub fn to_tool_result(&self) -> Result<CallToolResult, ErrorData> {
        let mut content = vec![Content::text(self.to_string())];
        if let McpGhError::Api(e) = self {
            content.push(Content::json(&e.report())?);
        }
        Ok(CallToolResult::error(content))
    }
}

/// Render an operation result. API and payload failures become textual
/// tool errors; invalid arguments stay protocol errors.
pub fn into_tool_result(result: Result<String, McpGhError>) -> Result<CallToolResult, ErrorData> {
    match result {
        Ok(text) => Ok(CallToolResult::success(vec![Content::text(text)])),
        Err(e @ (McpGhError::Api(_) | McpGhError::Json(_))) => e.to_tool_result(),
        Err(e) => Err(e.to_mcp_error()),
    }
}
