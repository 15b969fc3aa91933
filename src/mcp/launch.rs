use crate::error::{McpClientError, Result};
use std::collections::HashMap;
use std::fmt;
use tokio::process::Command;

/// How to start an MCP server process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub command: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
}

impl LaunchSpec {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            env: HashMap::new(),
        }
    }

    /// Parse a shell-style command line such as `npx -y "@scope/server" /tmp`.
    /// The first word is the command, the rest are arguments.
    pub fn from_shell(line: &str) -> Result<Self> {
        let mut words = shell_words::split(line)
            .map_err(|e| McpClientError::Config(format!("Invalid command line '{}': {}", line, e)))?
            .into_iter();

        let command = words
            .next()
            .ok_or_else(|| McpClientError::Config("Command line is empty".to_string()))?;

        Ok(Self::new(command, words.collect()))
    }

    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env.extend(env);
        self
    }

    pub(crate) fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.command);
        cmd.args(&self.args).envs(&self.env);
        cmd
    }
}

impl fmt::Display for LaunchSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", shell_words::quote(&self.command))?;
        for arg in &self.args {
            write!(f, " {}", shell_words::quote(arg))?;
        }
        Ok(())
    }
}
