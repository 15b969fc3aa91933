use crate::error::{McpClientError, Result};
use crate::mcp::{ClientConfig, LaunchSpec, DEFAULT_CLIENT_VERSION};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub client: ClientSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub servers: Vec<ServerConfig>,
}

impl AppConfig {
    /// Servers that are not disabled, in file order
    pub fn enabled_servers(&self) -> impl Iterator<Item = &ServerConfig> {
        self.servers.iter().filter(|s| s.enabled)
    }
}

/// Handshake settings shared by every client
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    pub version: String,
    pub handshake_timeout_secs: Option<u64>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            version: DEFAULT_CLIENT_VERSION.to_string(),
            handshake_timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub name: String,
    pub command: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    /// Whole command line, split with shell quoting rules
    pub shell: Option<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub tools: Option<ToolFilter>,
}

fn default_enabled() -> bool {
    true
}

impl ServerConfig {
    pub fn launch_spec(&self) -> Result<LaunchSpec> {
        let spec = match (&self.command, &self.shell) {
            (Some(command), None) => LaunchSpec::new(command.clone(), self.args.clone()),
            (None, Some(shell)) => {
                if !self.args.is_empty() {
                    return Err(McpClientError::Config(format!(
                        "Server '{}' sets both 'shell' and 'args'",
                        self.name
                    )));
                }
                LaunchSpec::from_shell(shell)?
            }
            (Some(_), Some(_)) => {
                return Err(McpClientError::Config(format!(
                    "Server '{}' sets both 'command' and 'shell'",
                    self.name
                )))
            }
            (None, None) => {
                return Err(McpClientError::Config(format!(
                    "Server '{}' needs either 'command' or 'shell'",
                    self.name
                )))
            }
        };

        Ok(spec.with_env(self.env.clone()))
    }

    /// Build the client config for this server. The server name doubles as
    /// the client name announced in the handshake.
    pub fn client_config(&self, settings: &ClientSettings) -> Result<ClientConfig> {
        let mut config =
            ClientConfig::new(self.name.clone(), self.launch_spec()?).with_version(&settings.version);
        if let Some(secs) = settings.handshake_timeout_secs {
            config = config.with_handshake_timeout(Duration::from_secs(secs));
        }
        Ok(config)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ToolFilter {
    pub include: Option<Vec<String>>,
    pub exclude: Option<Vec<String>>,
}
