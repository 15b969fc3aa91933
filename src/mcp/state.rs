use serde::{Deserialize, Serialize};
use std::fmt;

/// Step of the connect sequence run by `McpClient::init`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitStage {
    Spawn,
    Handshake,
    ToolFetch,
}

impl fmt::Display for InitStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InitStage::Spawn => "spawn",
            InitStage::Handshake => "handshake",
            InitStage::ToolFetch => "tool_fetch",
        };
        write!(f, "{}", s)
    }
}

/// Lifecycle state of an MCP client connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "state", content = "stage")]
pub enum ClientState {
    Created,
    Connecting,
    Ready,
    Closed,
    Failed(InitStage),
}

impl ClientState {
    pub fn is_ready(&self) -> bool {
        matches!(self, ClientState::Ready)
    }
}

impl fmt::Display for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientState::Created => write!(f, "created"),
            ClientState::Connecting => write!(f, "connecting"),
            ClientState::Ready => write!(f, "ready"),
            ClientState::Closed => write!(f, "closed"),
            ClientState::Failed(stage) => write!(f, "failed ({})", stage),
        }
    }
}
