pub mod client;
pub mod launch;
pub mod state;
pub mod transport;
pub mod types;

pub use client::{ClientConfig, McpClient, DEFAULT_CLIENT_VERSION};
pub use launch::LaunchSpec;
pub use state::{ClientState, InitStage};
pub use transport::{ChildProcessConnector, ClientIdentity, Connector, McpSession, PendingTransport};
pub use types::{ToolCallRequest, ToolCallResponse, ToolDefinition};
