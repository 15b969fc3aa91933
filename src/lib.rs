pub mod config;
pub(crate) mod error;
pub mod mcp;
pub mod pool;

pub use error::{McpClientError, Result};
pub use mcp::{ClientConfig, ClientState, InitStage, LaunchSpec, McpClient};
pub use pool::ClientPool;
