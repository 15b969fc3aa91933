use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mcp_stdio_client::config::{self, AppConfig};
use mcp_stdio_client::{ClientConfig, ClientPool, LaunchSpec, McpClient};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Parser, Debug)]
#[command(name = "mcp-stdio-client")]
#[command(about = "Talk to MCP servers over stdio", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "mcp-client.toml", env = "MCP_CLIENT_CONFIG")]
    config: PathBuf,

    /// Override log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Override log format (pretty, json)
    #[arg(long)]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Connect to the configured servers and list their tools
    Tools {
        #[command(flatten)]
        target: Target,

        /// Print tools as JSON function declarations
        #[arg(long)]
        json: bool,
    },
    /// Call a tool on whichever server advertises it
    Call {
        /// Tool name
        tool: String,

        /// Tool arguments as a JSON object
        #[arg(long, default_value = "{}")]
        args: String,

        #[command(flatten)]
        target: Target,
    },
}

#[derive(clap::Args, Debug)]
struct Target {
    /// Only use the named server from the config file
    #[arg(long, conflicts_with = "cmd")]
    server: Option<String>,

    /// Launch a single server from a shell-style command line instead
    #[arg(long)]
    cmd: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let target = match &cli.command {
        Command::Tools { target, .. } | Command::Call { target, .. } => target,
    };

    let mut config = read_config(&cli.config, target.cmd.is_some())?;

    // Apply CLI overrides
    if let Some(log_level) = cli.log_level.clone() {
        config.logging.level = log_level;
    }
    if let Some(log_format) = cli.log_format.clone() {
        config.logging.format = log_format;
    }

    init_logging(&config.logging)?;

    let pool = build_pool(&config, target)?;
    info!("Connecting to {} MCP server(s)", pool.len());

    if let Err(e) = pool.init_all().await {
        if let Err(close_err) = pool.close_all().await {
            warn!("Failed to close MCP servers after init error: {}", close_err);
        }
        return Err(e).context("Failed to connect to MCP servers");
    }

    let outcome = run(&pool, cli.command).await;
    let closed = pool.close_all().await;

    outcome?;
    closed.context("Failed to close MCP servers")?;
    Ok(())
}

fn read_config(path: &Path, ad_hoc: bool) -> Result<AppConfig> {
    if ad_hoc && !path.exists() {
        debug!("No config file at {}, using defaults", path.display());
        return Ok(AppConfig::default());
    }

    config::load_config(path)
        .with_context(|| format!("Failed to load configuration from: {}", path.display()))
}

fn build_pool(config: &AppConfig, target: &Target) -> Result<ClientPool> {
    if let Some(line) = &target.cmd {
        let launch = LaunchSpec::from_shell(line)?;
        let name = Path::new(&launch.command)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| launch.command.clone());

        let mut client_config = ClientConfig::new(name, launch).with_version(&config.client.version);
        if let Some(secs) = config.client.handshake_timeout_secs {
            client_config = client_config.with_handshake_timeout(Duration::from_secs(secs));
        }

        let mut pool = ClientPool::new();
        pool.add(McpClient::from_config(client_config), None)?;
        return Ok(pool);
    }

    if let Some(server) = &target.server {
        let mut selected = config
            .servers
            .iter()
            .find(|s| &s.name == server)
            .cloned()
            .with_context(|| format!("Server '{}' not found in configuration", server))?;
        // Naming a server explicitly overrides `enabled = false`
        selected.enabled = true;

        let single = AppConfig {
            servers: vec![selected],
            ..config.clone()
        };
        return Ok(ClientPool::from_config(&single)?);
    }

    if config.enabled_servers().next().is_none() {
        anyhow::bail!("No MCP servers configured; pass --cmd or add [[servers]] to the config");
    }

    Ok(ClientPool::from_config(config)?)
}

async fn run(pool: &ClientPool, command: Command) -> Result<()> {
    match command {
        Command::Tools { json, .. } => {
            if json {
                let definitions = pool.function_definitions().await;
                println!("{}", serde_json::to_string_pretty(&definitions)?);
                return Ok(());
            }

            for name in pool.names() {
                let Some(client) = pool.get(name) else {
                    continue;
                };
                println!("{}:", name);
                for tool in client.list_tools() {
                    match &tool.description {
                        Some(description) => println!("  {} - {}", tool.name, description),
                        None => println!("  {}", tool.name),
                    }
                }
            }
            Ok(())
        }
        Command::Call { tool, args, .. } => {
            let arguments: Map<String, Value> =
                serde_json::from_str(&args).context("--args must be a JSON object")?;

            let response = pool.call_tool(&tool, arguments).await?;
            println!("{}", serde_json::to_string_pretty(response.raw())?);

            if response.is_error() {
                anyhow::bail!("Tool '{}' reported an error", tool);
            }
            Ok(())
        }
    }
}

fn init_logging(config: &config::LoggingConfig) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    // stdout carries command output, so logs go to stderr
    match config.format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty().with_writer(std::io::stderr))
                .init();
        }
    }

    Ok(())
}
