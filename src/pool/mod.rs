mod filter;

use crate::config::{AppConfig, ToolFilter};
use crate::error::{McpClientError, Result};
use crate::mcp::{ChildProcessConnector, Connector, McpClient, ToolCallResponse, ToolDefinition};
use dashmap::DashMap;
use filter::{apply_tool_filter, is_tool_allowed};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

struct PoolEntry {
    client: Arc<McpClient>,
    filter: Option<ToolFilter>,
}

/// A set of MCP clients addressed by name, with tool calls routed to
/// whichever server advertises the tool.
///
/// Clients are initialized in registration order and closed in reverse.
#[derive(Default)]
pub struct ClientPool {
    entries: Vec<PoolEntry>,
    routes: DashMap<String, usize>,
}

impl ClientPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build one child-process client per enabled server in the config
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::from_config_with_connector(config, Arc::new(ChildProcessConnector))
    }

    pub fn from_config_with_connector(
        config: &AppConfig,
        connector: Arc<dyn Connector>,
    ) -> Result<Self> {
        let mut pool = Self::new();
        for server in config.enabled_servers() {
            let client_config = server.client_config(&config.client)?;
            let client = McpClient::with_connector(client_config, Arc::clone(&connector));
            pool.add(client, server.tools.clone())?;
        }
        Ok(pool)
    }

    /// Register a client. Names must be unique within the pool.
    pub fn add(&mut self, client: McpClient, filter: Option<ToolFilter>) -> Result<Arc<McpClient>> {
        if self.get(client.name()).is_some() {
            return Err(McpClientError::Config(format!(
                "Duplicate server name '{}' in client pool",
                client.name()
            )));
        }

        let client = Arc::new(client);
        self.entries.push(PoolEntry {
            client: Arc::clone(&client),
            filter,
        });
        Ok(client)
    }

    pub fn get(&self, name: &str) -> Option<Arc<McpClient>> {
        self.entries
            .iter()
            .find(|entry| entry.client.name() == name)
            .map(|entry| Arc::clone(&entry.client))
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| entry.client.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Initialize every client in registration order, stopping at the first
    /// failure. Clients connected before the failure stay connected.
    pub async fn init_all(&self) -> Result<()> {
        info!("Initializing {} MCP clients", self.entries.len());

        for entry in &self.entries {
            if let Err(e) = entry.client.init().await {
                error!("Failed to initialize MCP client {}: {}", entry.client.name(), e);
                self.refresh_routes().await;
                return Err(e);
            }
        }

        self.refresh_routes().await;
        Ok(())
    }

    /// Rebuild the tool routing table from the clients that are ready.
    /// The first server to advertise a tool name wins.
    pub async fn refresh_routes(&self) {
        self.routes.clear();

        for (index, entry) in self.entries.iter().enumerate() {
            if !entry.client.state().await.is_ready() {
                continue;
            }

            for tool in entry.client.list_tools() {
                if !is_tool_allowed(&tool.name, entry.filter.as_ref()) {
                    continue;
                }

                match self.routes.entry(tool.name) {
                    dashmap::mapref::entry::Entry::Occupied(existing) => {
                        let owner = self.entries[*existing.get()].client.name();
                        warn!(
                            "Tool '{}' from {} is shadowed by {}",
                            existing.key(),
                            entry.client.name(),
                            owner
                        );
                    }
                    dashmap::mapref::entry::Entry::Vacant(slot) => {
                        slot.insert(index);
                    }
                }
            }
        }

        debug!("Routing {} tools across MCP clients", self.routes.len());
    }

    /// Filtered tools from every ready client, in registration order.
    /// A shadowed name is listed once, with the first server's definition.
    pub async fn tools(&self) -> Vec<ToolDefinition> {
        let mut seen = HashSet::new();
        let mut tools = Vec::new();
        for entry in &self.entries {
            if !entry.client.state().await.is_ready() {
                continue;
            }

            for tool in apply_tool_filter(entry.client.list_tools(), entry.filter.as_ref()) {
                if seen.insert(tool.name.clone()) {
                    tools.push(tool);
                }
            }
        }
        tools
    }

    /// Tools rendered as OpenAI-style function declarations
    pub async fn function_definitions(&self) -> Vec<Value> {
        self.tools()
            .await
            .iter()
            .map(ToolDefinition::to_function_definition)
            .collect()
    }

    /// Name of the server a tool call would be routed to
    pub fn route(&self, tool_name: &str) -> Option<&str> {
        self.routes
            .get(tool_name)
            .map(|index| self.entries[*index].client.name())
    }

    /// Call a tool on the server that advertises it
    pub async fn call_tool(
        &self,
        tool_name: &str,
        arguments: Map<String, Value>,
    ) -> Result<ToolCallResponse> {
        let index = self
            .routes
            .get(tool_name)
            .map(|index| *index)
            .ok_or_else(|| McpClientError::ToolNotFound(tool_name.to_string()))?;

        let client = &self.entries[index].client;
        debug!("Routing tool '{}' to {}", tool_name, client.name());
        client.call_tool(tool_name, arguments).await
    }

    /// Close every client, newest first. All clients are attempted; the
    /// first error is returned.
    pub async fn close_all(&self) -> Result<()> {
        info!("Closing all MCP clients");
        self.routes.clear();

        let mut first_error = None;
        for entry in self.entries.iter().rev() {
            if let Err(e) = entry.client.close().await {
                warn!("Error closing MCP client {}: {}", entry.client.name(), e);
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
