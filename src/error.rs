use crate::mcp::InitStage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum McpClientError {
    #[error("Failed to spawn MCP server '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("MCP handshake failed for '{server}': {details}")]
    Handshake { server: String, details: String },

    #[error("Failed to list tools for '{server}': {details}")]
    ToolFetch { server: String, details: String },

    #[error("Tool call '{tool}' failed on '{server}': {details}")]
    Invocation {
        server: String,
        tool: String,
        details: String,
    },

    #[error("MCP client is not connected: {0}")]
    NotConnected(String),

    #[error("MCP client is already connected: {0}")]
    AlreadyConnected(String),

    #[error("Failed to shut down MCP session for '{server}': {details}")]
    Shutdown { server: String, details: String },

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, McpClientError>;

impl McpClientError {
    pub(crate) fn spawn_failed(command: &str, source: std::io::Error) -> Self {
        McpClientError::Spawn {
            command: command.to_string(),
            source,
        }
    }

    pub(crate) fn handshake_failed(server: &str, details: impl std::fmt::Display) -> Self {
        McpClientError::Handshake {
            server: server.to_string(),
            details: details.to_string(),
        }
    }

    pub(crate) fn tool_fetch_failed(server: &str, details: impl std::fmt::Display) -> Self {
        McpClientError::ToolFetch {
            server: server.to_string(),
            details: details.to_string(),
        }
    }

    pub(crate) fn invocation_failed(
        server: &str,
        tool: &str,
        details: impl std::fmt::Display,
    ) -> Self {
        McpClientError::Invocation {
            server: server.to_string(),
            tool: tool.to_string(),
            details: details.to_string(),
        }
    }

    pub(crate) fn shutdown_failed(server: &str, details: impl std::fmt::Display) -> Self {
        McpClientError::Shutdown {
            server: server.to_string(),
            details: details.to_string(),
        }
    }

    /// Connection stage that produced this error, if it came out of `init`.
    pub fn stage(&self) -> Option<InitStage> {
        match self {
            McpClientError::Spawn { .. } => Some(InitStage::Spawn),
            McpClientError::Handshake { .. } => Some(InitStage::Handshake),
            McpClientError::ToolFetch { .. } => Some(InitStage::ToolFetch),
            _ => None,
        }
    }
}

// Implement conversion from anyhow::Error for convenience
impl From<anyhow::Error> for McpClientError {
    fn from(err: anyhow::Error) -> Self {
        McpClientError::Internal(err.to_string())
    }
}
