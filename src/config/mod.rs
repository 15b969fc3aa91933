pub mod types;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use std::path::Path;
pub use types::*;

/// Prefix for environment overrides, e.g. `MCP_CLIENT__LOGGING__LEVEL=debug`
pub const ENV_PREFIX: &str = "MCP_CLIENT";

/// Load configuration from a TOML file, overlaid with environment variables
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path = path.as_ref();

    let config = Config::builder()
        .add_source(File::from(path))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__"),
        )
        .build()
        .with_context(|| format!("Failed to load config from: {}", path.display()))?;

    let app_config: AppConfig = config
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// Validate the loaded configuration
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate that server names are unique
    let mut names = std::collections::HashSet::new();
    for server in &config.servers {
        if !names.insert(server.name.clone()) {
            anyhow::bail!(
                "Duplicate server name '{}' found in configuration",
                server.name
            );
        }
    }

    // Validate that every server resolves to a launchable command
    for server in &config.servers {
        server
            .launch_spec()
            .with_context(|| format!("Invalid launch settings for server '{}'", server.name))?;
    }

    // Validate log level
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.logging.level.as_str()) {
        anyhow::bail!(
            "Invalid log level '{}'. Valid levels: {}",
            config.logging.level,
            valid_levels.join(", ")
        );
    }

    // Validate log format
    let valid_formats = ["pretty", "json"];
    if !valid_formats.contains(&config.logging.format.as_str()) {
        anyhow::bail!(
            "Invalid log format '{}'. Valid formats: {}",
            config.logging.format,
            valid_formats.join(", ")
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::with_suffix(".toml").unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();
        temp_file
    }

    fn local_server(name: &str) -> ServerConfig {
        ServerConfig {
            name: name.to_string(),
            command: Some("echo".to_string()),
            args: vec![],
            shell: None,
            env: HashMap::new(),
            enabled: true,
            tools: None,
        }
    }

    #[test]
    #[serial]
    fn test_load_valid_config() {
        let temp_file = write_config(
            r#"
[client]
version = "2.0.0"
handshake_timeout_secs = 10

[logging]
level = "debug"
format = "json"

[[servers]]
name = "filesystem"
command = "npx"
args = ["-y", "@modelcontextprotocol/server-filesystem", "/tmp"]

[[servers]]
name = "fetch"
shell = "uvx mcp-server-fetch"
enabled = false
tools = { include = ["fetch"] }
"#,
        );

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.client.version, "2.0.0");
        assert_eq!(config.client.handshake_timeout_secs, Some(10));
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.servers.len(), 2);
        assert_eq!(config.servers[0].name, "filesystem");
        assert_eq!(config.servers[0].args.len(), 3);
        assert_eq!(config.servers[1].shell.as_deref(), Some("uvx mcp-server-fetch"));
        assert!(!config.servers[1].enabled);
        assert_eq!(
            config.servers[1].tools,
            Some(ToolFilter {
                include: Some(vec!["fetch".to_string()]),
                exclude: None,
            })
        );

        let enabled: Vec<&str> = config.enabled_servers().map(|s| s.name.as_str()).collect();
        assert_eq!(enabled, vec!["filesystem"]);
    }

    #[test]
    #[serial]
    fn test_load_config_with_defaults() {
        let temp_file = write_config(
            r#"
[logging]

[[servers]]
name = "test-server"
command = "echo"
"#,
        );

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.client.version, "1.0.0");
        assert!(config.client.handshake_timeout_secs.is_none());
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "pretty");
        assert!(config.servers[0].args.is_empty());
        assert!(config.servers[0].enabled);
    }

    #[test]
    #[serial]
    fn test_env_overrides_file() {
        let temp_file = write_config(
            r#"
[logging]
level = "info"
"#,
        );

        std::env::set_var("MCP_CLIENT__LOGGING__LEVEL", "trace");
        let result = load_config(temp_file.path());
        std::env::remove_var("MCP_CLIENT__LOGGING__LEVEL");

        let config = result.unwrap();
        assert_eq!(config.logging.level, "trace");
    }

    #[test]
    #[serial]
    fn test_load_missing_file_fails() {
        let result = load_config("/nonexistent/mcp-client-config.toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_duplicate_names() {
        let config = AppConfig {
            servers: vec![local_server("server1"), local_server("server1")],
            ..Default::default()
        };

        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_server_without_command() {
        let mut server = local_server("server1");
        server.command = None;
        let config = AppConfig {
            servers: vec![server],
            ..Default::default()
        };

        let err = validate_config(&config).unwrap_err();
        assert!(format!("{:#}", err).contains("server1"));
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let mut config = AppConfig::default();
        config.logging.level = "verbose".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_invalid_log_format() {
        let mut config = AppConfig::default();
        config.logging.format = "xml".to_string();
        assert!(validate_config(&config).is_err());
    }
}
