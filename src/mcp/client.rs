use super::launch::LaunchSpec;
use super::state::{ClientState, InitStage};
use super::transport::{ChildProcessConnector, ClientIdentity, Connector, McpSession, PendingTransport};
use super::types::{ToolCallRequest, ToolCallResponse, ToolDefinition};
use crate::error::{McpClientError, Result};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Version announced during the handshake when none is configured
pub const DEFAULT_CLIENT_VERSION: &str = "1.0.0";

/// Immutable settings for one MCP client
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub name: String,
    pub version: String,
    pub launch: LaunchSpec,
    pub handshake_timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn new(name: impl Into<String>, launch: LaunchSpec) -> Self {
        Self {
            name: name.into(),
            version: DEFAULT_CLIENT_VERSION.to_string(),
            launch,
            handshake_timeout: None,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.launch = self.launch.with_env(env);
        self
    }

    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = Some(timeout);
        self
    }

    fn identity(&self) -> ClientIdentity {
        ClientIdentity {
            name: self.name.clone(),
            version: self.version.clone(),
        }
    }
}

struct Connection {
    state: ClientState,
    session: Option<Arc<dyn McpSession>>,
}

/// Client for a single MCP server reached over a spawned process.
///
/// `init` spawns the server, performs the handshake and caches the
/// advertised tools; `call_tool` forwards invocations; `close` releases the
/// session. State transitions are serialized, so concurrent callers never
/// observe a half-built connection.
pub struct McpClient {
    config: ClientConfig,
    connector: Arc<dyn Connector>,
    connection: Mutex<Connection>,
    tools: RwLock<Vec<ToolDefinition>>,
}

impl fmt::Debug for McpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("McpClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl McpClient {
    /// Create a client that launches `command args...` on `init`.
    /// Nothing is spawned here.
    pub fn new(
        name: impl Into<String>,
        command: impl Into<String>,
        args: Vec<String>,
        version: Option<&str>,
    ) -> Self {
        let config = ClientConfig::new(name, LaunchSpec::new(command, args))
            .with_version(version.unwrap_or(DEFAULT_CLIENT_VERSION));
        Self::from_config(config)
    }

    pub fn from_config(config: ClientConfig) -> Self {
        Self::with_connector(config, Arc::new(ChildProcessConnector))
    }

    pub fn with_connector(config: ClientConfig, connector: Arc<dyn Connector>) -> Self {
        Self {
            config,
            connector,
            connection: Mutex::new(Connection {
                state: ClientState::Created,
                session: None,
            }),
            tools: RwLock::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Current lifecycle state. Waits for an in-flight `init` or `close`.
    pub async fn state(&self) -> ClientState {
        self.connection.lock().await.state
    }

    /// Spawn the server, perform the handshake and cache its tools.
    ///
    /// Allowed from any state except `Ready`; after `close` it runs the full
    /// connect sequence again. On failure the previous tool cache is kept and
    /// the client moves to `Failed`.
    pub async fn init(&self) -> Result<()> {
        let mut connection = self.connection.lock().await;

        // A leftover Connecting state means an earlier init was cancelled
        if connection.state.is_ready() {
            return Err(McpClientError::AlreadyConnected(self.config.name.clone()));
        }

        connection.state = ClientState::Connecting;
        info!("Initializing MCP client: {}", self.config.name);
        debug!("Command: {}", self.config.launch);

        match self.connect().await {
            Ok((session, tools)) => {
                let tool_names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
                info!(
                    "Connected to MCP server '{}', available tools: {:?}",
                    self.config.name, tool_names
                );

                self.store_tools(tools);
                connection.session = Some(session);
                connection.state = ClientState::Ready;
                Ok(())
            }
            Err((stage, e)) => {
                error!(
                    "Failed to connect to MCP server '{}' during {}: {}",
                    self.config.name, stage, e
                );
                connection.session = None;
                connection.state = ClientState::Failed(stage);
                Err(e)
            }
        }
    }

    async fn connect(
        &self,
    ) -> std::result::Result<(Arc<dyn McpSession>, Vec<ToolDefinition>), (InitStage, McpClientError)>
    {
        let pending = self
            .connector
            .spawn(&self.config.launch)
            .await
            .map_err(|e| (InitStage::Spawn, e))?;

        let session = self
            .handshake(pending)
            .await
            .map_err(|e| (InitStage::Handshake, e))?;

        match session.list_tools().await {
            Ok(tools) => Ok((session, tools)),
            Err(e) => {
                if let Err(close_err) = session.close().await {
                    warn!(
                        "Failed to release session for {} after tool fetch error: {}",
                        self.config.name, close_err
                    );
                }
                Err((InitStage::ToolFetch, e))
            }
        }
    }

    async fn handshake(&self, pending: Box<dyn PendingTransport>) -> Result<Arc<dyn McpSession>> {
        let identity = self.config.identity();

        match self.config.handshake_timeout {
            Some(limit) => tokio::time::timeout(limit, pending.handshake(&identity))
                .await
                .map_err(|_| {
                    McpClientError::handshake_failed(
                        &self.config.name,
                        format!("timed out after {:?}", limit),
                    )
                })?,
            None => pending.handshake(&identity).await,
        }
    }

    /// Tools cached by the last successful `init`, in server order.
    /// Empty until the first successful `init`.
    pub fn list_tools(&self) -> Vec<ToolDefinition> {
        match self.tools.read() {
            Ok(tools) => tools.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn store_tools(&self, tools: Vec<ToolDefinition>) {
        match self.tools.write() {
            Ok(mut cache) => *cache = tools,
            Err(poisoned) => *poisoned.into_inner() = tools,
        }
    }

    /// Call a tool on the connected server. The name is not checked against
    /// the cached tool list; the server decides whether it exists.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<ToolCallResponse> {
        let session = self.session().await?;
        session
            .call_tool(ToolCallRequest::new(name, arguments))
            .await
    }

    async fn session(&self) -> Result<Arc<dyn McpSession>> {
        let connection = self.connection.lock().await;
        match (&connection.state, &connection.session) {
            (ClientState::Ready, Some(session)) => Ok(Arc::clone(session)),
            _ => Err(McpClientError::NotConnected(self.config.name.clone())),
        }
    }

    /// Release the session. Safe to call in any state and more than once.
    pub async fn close(&self) -> Result<()> {
        let mut connection = self.connection.lock().await;
        let session = connection.session.take();
        connection.state = ClientState::Closed;

        if let Some(session) = session {
            session.close().await?;
            info!("MCP client connection closed: {}", self.config.name);
        }

        Ok(())
    }
}
