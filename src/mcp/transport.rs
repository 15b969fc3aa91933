//! Transport seam between [`McpClient`](super::McpClient) and the MCP SDK.
//!
//! A [`Connector`] spawns the server process, the resulting
//! [`PendingTransport`] performs the protocol handshake, and the
//! [`McpSession`] it yields serves tool requests until closed. The
//! production implementation drives `rmcp` over a child process's stdio.

use super::launch::LaunchSpec;
use super::types::{ToolCallRequest, ToolCallResponse, ToolDefinition};
use crate::error::{McpClientError, Result};
use async_trait::async_trait;
use rmcp::model::{CallToolRequestParams, ClientInfo, Implementation, PaginatedRequestParams};
use rmcp::service::{Peer, RoleClient, RunningService};
use rmcp::transport::TokioChildProcess;
use rmcp::ServiceExt;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// Name and version the client announces during the handshake
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    pub name: String,
    pub version: String,
}

/// Spawns MCP server processes
#[async_trait]
pub trait Connector: Send + Sync {
    async fn spawn(&self, launch: &LaunchSpec) -> Result<Box<dyn PendingTransport>>;
}

/// A spawned transport that has not negotiated a session yet
#[async_trait]
pub trait PendingTransport: Send {
    async fn handshake(self: Box<Self>, identity: &ClientIdentity) -> Result<Arc<dyn McpSession>>;
}

/// An initialized MCP session
#[async_trait]
pub trait McpSession: Send + Sync {
    /// Fetch the full tool list advertised by the server
    async fn list_tools(&self) -> Result<Vec<ToolDefinition>>;

    async fn call_tool(&self, request: ToolCallRequest) -> Result<ToolCallResponse>;

    /// Tear down the session. Calling it again is a no-op.
    async fn close(&self) -> Result<()>;
}

/// Connector that launches servers as child processes speaking MCP over stdio
#[derive(Debug, Clone, Copy, Default)]
pub struct ChildProcessConnector;

#[async_trait]
impl Connector for ChildProcessConnector {
    async fn spawn(&self, launch: &LaunchSpec) -> Result<Box<dyn PendingTransport>> {
        debug!("Spawning MCP server: {}", launch);

        let transport = TokioChildProcess::new(launch.to_command()).map_err(|e| {
            error!("Failed to create TokioChildProcess: {}", e);
            McpClientError::spawn_failed(&launch.command, e)
        })?;

        Ok(Box::new(ChildProcessTransport {
            command: launch.command.clone(),
            transport,
        }))
    }
}

struct ChildProcessTransport {
    command: String,
    transport: TokioChildProcess,
}

#[async_trait]
impl PendingTransport for ChildProcessTransport {
    async fn handshake(self: Box<Self>, identity: &ClientIdentity) -> Result<Arc<dyn McpSession>> {
        let Self { command, transport } = *self;
        let server = identity.name.clone();

        let client_info = ClientInfo {
            client_info: Implementation {
                name: identity.name.clone(),
                version: identity.version.clone(),
                ..Implementation::from_build_env()
            },
            ..ClientInfo::default()
        };

        // Cancels the service if this future is dropped mid-handshake
        let ct = CancellationToken::new();
        let guard = ct.clone().drop_guard();

        let service = client_info
            .serve_with_ct(transport, ct)
            .await
            .map_err(|e| McpClientError::handshake_failed(&server, format!("{:?}", e)))?;
        guard.disarm();

        debug!("MCP handshake completed with {} ({})", server, command);
        Ok(Arc::new(RmcpSession::new(server, service)))
    }
}

/// Session backed by a running rmcp client service
pub(crate) struct RmcpSession {
    server_name: String,
    peer: Peer<RoleClient>,
    service: Mutex<Option<RunningService<RoleClient, ClientInfo>>>,
}

impl RmcpSession {
    fn new(server_name: String, service: RunningService<RoleClient, ClientInfo>) -> Self {
        Self {
            server_name,
            peer: service.peer().clone(),
            service: Mutex::new(Some(service)),
        }
    }
}

#[async_trait]
impl McpSession for RmcpSession {
    async fn list_tools(&self) -> Result<Vec<ToolDefinition>> {
        debug!("Listing tools for server: {}", self.server_name);

        let mut tool_list = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let request = Some(PaginatedRequestParams {
                meta: None,
                cursor: cursor.clone(),
            });

            match self.peer.list_tools(request).await {
                Ok(result) => {
                    tool_list.extend(result.tools.into_iter().map(|t| ToolDefinition {
                        name: t.name.to_string(),
                        description: t.description.map(|d| d.to_string()),
                        input_schema: Value::Object((*t.input_schema).clone()),
                    }));

                    cursor = result.next_cursor;
                    if cursor.is_none() {
                        break;
                    }
                }
                Err(e) => {
                    error!("Failed to list tools for {}: {}", self.server_name, e);
                    return Err(McpClientError::tool_fetch_failed(&self.server_name, e));
                }
            }
        }

        debug!(
            "Found {} tools for server: {}",
            tool_list.len(),
            self.server_name
        );
        Ok(tool_list)
    }

    async fn call_tool(&self, request: ToolCallRequest) -> Result<ToolCallResponse> {
        debug!(
            "Calling tool '{}' on server: {}",
            request.name, self.server_name
        );

        let tool_name = request.name.clone();
        let mcp_request = CallToolRequestParams {
            meta: None,
            name: request.name.into(),
            arguments: Some(request.arguments),
            task: None,
        };

        match self.peer.call_tool(mcp_request).await {
            Ok(result) => Ok(ToolCallResponse::new(serde_json::to_value(&result)?)),
            Err(e) => {
                error!(
                    "Failed to call tool '{}' on {}: {}",
                    tool_name, self.server_name, e
                );
                Err(McpClientError::invocation_failed(
                    &self.server_name,
                    &tool_name,
                    e,
                ))
            }
        }
    }

    async fn close(&self) -> Result<()> {
        let service = self.service.lock().await.take();

        match service {
            Some(service) => {
                debug!("Closing MCP session for server: {}", self.server_name);
                service
                    .cancel()
                    .await
                    .map(|_| ())
                    .map_err(|e| McpClientError::shutdown_failed(&self.server_name, e))
            }
            None => Ok(()),
        }
    }
}
