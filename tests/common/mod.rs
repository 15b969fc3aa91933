#![allow(dead_code)]

use async_trait::async_trait;
use mcp_stdio_client::mcp::{
    ClientIdentity, Connector, LaunchSpec, McpSession, PendingTransport, ToolCallRequest,
    ToolCallResponse, ToolDefinition,
};
use mcp_stdio_client::{InitStage, McpClientError, Result};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ──────────────────────────────────────────────
// Scripted connector
// ──────────────────────────────────────────────

/// What the next connect attempt should do
#[derive(Clone, Debug)]
pub struct Script {
    pub fail_at: Option<InitStage>,
    pub tools: Vec<ToolDefinition>,
    pub call_result: Value,
    pub fail_calls: bool,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            fail_at: None,
            tools: Vec::new(),
            call_result: json!({"content": [{"type": "text", "text": "ok"}], "isError": false}),
            fail_calls: false,
        }
    }
}

/// Everything the mock saw, shared between the connector and its sessions
#[derive(Default)]
pub struct Recorder {
    pub spawned: Mutex<Vec<LaunchSpec>>,
    pub handshakes: Mutex<Vec<ClientIdentity>>,
    pub calls: Mutex<Vec<ToolCallRequest>>,
    pub list_requests: AtomicUsize,
    pub closes: AtomicUsize,
}

impl Recorder {
    pub fn calls(&self) -> Vec<ToolCallRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn spawned(&self) -> Vec<LaunchSpec> {
        self.spawned.lock().unwrap().clone()
    }

    pub fn handshakes(&self) -> Vec<ClientIdentity> {
        self.handshakes.lock().unwrap().clone()
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[derive(Clone)]
pub struct MockConnector {
    script: Arc<Mutex<Script>>,
    pub recorder: Arc<Recorder>,
}

impl MockConnector {
    pub fn new(script: Script) -> Self {
        Self {
            script: Arc::new(Mutex::new(script)),
            recorder: Arc::new(Recorder::default()),
        }
    }

    pub fn with_tools(tools: Vec<ToolDefinition>) -> Self {
        Self::new(Script {
            tools,
            ..Script::default()
        })
    }

    pub fn failing_at(stage: InitStage) -> Self {
        Self::new(Script {
            fail_at: Some(stage),
            ..Script::default()
        })
    }

    /// Change the behaviour of subsequent connect attempts
    pub fn rescript(&self, update: impl FnOnce(&mut Script)) {
        update(&mut self.script.lock().unwrap());
    }

    pub fn arc(&self) -> Arc<dyn Connector> {
        Arc::new(self.clone())
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn spawn(&self, launch: &LaunchSpec) -> Result<Box<dyn PendingTransport>> {
        let script = self.script.lock().unwrap().clone();
        if script.fail_at == Some(InitStage::Spawn) {
            return Err(McpClientError::Spawn {
                command: launch.command.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "mock spawn failure"),
            });
        }

        self.recorder.spawned.lock().unwrap().push(launch.clone());
        Ok(Box::new(MockTransport {
            script,
            recorder: Arc::clone(&self.recorder),
        }))
    }
}

struct MockTransport {
    script: Script,
    recorder: Arc<Recorder>,
}

#[async_trait]
impl PendingTransport for MockTransport {
    async fn handshake(self: Box<Self>, identity: &ClientIdentity) -> Result<Arc<dyn McpSession>> {
        if self.script.fail_at == Some(InitStage::Handshake) {
            return Err(McpClientError::Handshake {
                server: identity.name.clone(),
                details: "mock handshake failure".to_string(),
            });
        }

        self.recorder
            .handshakes
            .lock()
            .unwrap()
            .push(identity.clone());

        Ok(Arc::new(MockSession {
            name: identity.name.clone(),
            script: self.script,
            recorder: self.recorder,
            closed: AtomicUsize::new(0),
        }))
    }
}

struct MockSession {
    name: String,
    script: Script,
    recorder: Arc<Recorder>,
    closed: AtomicUsize,
}

#[async_trait]
impl McpSession for MockSession {
    async fn list_tools(&self) -> Result<Vec<ToolDefinition>> {
        self.recorder.list_requests.fetch_add(1, Ordering::SeqCst);
        if self.script.fail_at == Some(InitStage::ToolFetch) {
            return Err(McpClientError::ToolFetch {
                server: self.name.clone(),
                details: "mock tools/list failure".to_string(),
            });
        }
        Ok(self.script.tools.clone())
    }

    async fn call_tool(&self, request: ToolCallRequest) -> Result<ToolCallResponse> {
        if self.closed.load(Ordering::SeqCst) > 0 {
            return Err(McpClientError::Invocation {
                server: self.name.clone(),
                tool: request.name,
                details: "transport closed".to_string(),
            });
        }

        self.recorder.calls.lock().unwrap().push(request.clone());
        if self.script.fail_calls {
            return Err(McpClientError::Invocation {
                server: self.name.clone(),
                tool: request.name,
                details: "mock call failure".to_string(),
            });
        }
        Ok(ToolCallResponse::new(self.script.call_result.clone()))
    }

    async fn close(&self) -> Result<()> {
        // Only the first close tears anything down
        if self.closed.fetch_add(1, Ordering::SeqCst) == 0 {
            self.recorder.closes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

// ──────────────────────────────────────────────
// Shared helpers
// ──────────────────────────────────────────────

pub fn tool(name: &str, description: &str) -> ToolDefinition {
    ToolDefinition::new(
        name,
        Some(description),
        json!({"type": "object", "properties": {}}),
    )
}

pub fn args(value: Value) -> serde_json::Map<String, Value> {
    value.as_object().cloned().unwrap()
}
