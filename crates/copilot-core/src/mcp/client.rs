//! Tool transport client over the official rmcp SDK
//!
//! Owns exactly one child-process MCP session and presents a
//! capability-oriented API. The externally observable state machine is
//! `Disconnected -> Connected -> Disconnected`; a failed connect never
//! leaves partially initialized handles behind.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use rmcp::{
    model::{
        CallToolRequestParams, ClientCapabilities, ClientInfo, GetPromptRequestParams,
        Implementation, ReadResourceRequestParams,
    },
    service::{RoleClient, RunningService, ServiceError},
    transport::child_process::TokioChildProcess,
    ServiceExt,
};
use serde_json::Value;
use tokio::process::Command;
use tokio::sync::Mutex;

use crate::logging::SharedLogger;
use crate::providers::ToolExecutor;
use crate::types::{PromptInfo, ResourceInfo, ServerCapabilities, Tool};
use crate::{log_info, log_warn};

use super::error::{McpError, McpResult};
use super::launch::LaunchSpec;

/// JSON-RPC codes the transport discriminates on
const CODE_REQUEST_TIMEOUT: i32 = -32001;
const CODE_METHOD_NOT_FOUND: i32 = -32601;
const CODE_INVALID_PARAMS: i32 = -32602;
const CODE_INTERNAL_ERROR: i32 = -32603;

struct ActiveSession {
    service: RunningService<RoleClient, ClientInfo>,
    capabilities: Arc<ServerCapabilities>,
}

/// Client for one external tool-provider subprocess
pub struct McpService {
    session: Mutex<Option<ActiveSession>>,
    logger: SharedLogger,
}

impl McpService {
    /// Create a disconnected client
    pub fn new(logger: SharedLogger) -> Self {
        Self {
            session: Mutex::new(None),
            logger,
        }
    }

    /// Connect to a tool-provider process
    ///
    /// `command` may be a bare program, a command string with embedded
    /// arguments, or a server path (see [`LaunchSpec`]). `env` is merged
    /// over the inherited process environment. On success the capability
    /// set has already been discovered when this returns `true`. Failures
    /// are logged and leave the client fully disconnected.
    pub async fn connect(
        &self,
        command: &str,
        args: &[String],
        env: &HashMap<String, String>,
    ) -> bool {
        let mut guard = self.session.lock().await;

        // Reconnect replaces any previous session
        if let Some(previous) = guard.take() {
            close_session(previous, &self.logger).await;
        }

        let spec = match LaunchSpec::resolve(command, args) {
            Ok(spec) => spec,
            Err(e) => {
                self.logger
                    .error(&format!("[McpService] MCP server connection failed: {}", e));
                return false;
            }
        };

        match start_session(&spec, env, &self.logger).await {
            Ok(session) => {
                log_info!(
                    self.logger,
                    "[McpService] Connected: {} tools, {} resources, {} prompts",
                    session.capabilities.tools.len(),
                    session.capabilities.resources.len(),
                    session.capabilities.prompts.len()
                );
                *guard = Some(session);
                true
            }
            Err(e) => {
                self.logger
                    .error(&format!("[McpService] MCP server connection failed: {}", e));
                false
            }
        }
    }

    /// Connect from a configured launch spec
    pub async fn connect_config(&self, config: &crate::config::McpServerConfig) -> bool {
        self.connect(&config.command, &config.args, &config.env).await
    }

    /// Whether an active session exists
    pub async fn is_connected(&self) -> bool {
        self.session.lock().await.is_some()
    }

    /// Current capability snapshot, if connected
    pub async fn capabilities(&self) -> Option<Arc<ServerCapabilities>> {
        self.session
            .lock()
            .await
            .as_ref()
            .map(|s| Arc::clone(&s.capabilities))
    }

    /// Re-run capability discovery and replace the snapshot
    pub async fn refresh_capabilities(&self) -> McpResult<Arc<ServerCapabilities>> {
        let mut guard = self.session.lock().await;
        let session = guard.as_mut().ok_or(McpError::NotConnected)?;

        match discover(&session.service, &self.logger).await {
            Ok(capabilities) => {
                let capabilities = Arc::new(capabilities);
                session.capabilities = Arc::clone(&capabilities);
                Ok(capabilities)
            }
            Err(e) => {
                // Tools listing failure degrades to empty-and-disconnected
                if let Some(broken) = guard.take() {
                    close_session(broken, &self.logger).await;
                }
                Err(e)
            }
        }
    }

    /// List the tools currently offered by the server
    pub async fn list_tools(&self) -> McpResult<Vec<Tool>> {
        let guard = self.session.lock().await;
        let session = guard.as_ref().ok_or(McpError::NotConnected)?;

        let result = session
            .service
            .list_tools(Default::default())
            .await
            .map_err(|e| McpError::Protocol(e.to_string()))?;

        Ok(result.tools.iter().map(Tool::from).collect())
    }

    /// Invoke a tool and return the raw result payload
    pub async fn call_tool(&self, name: &str, args: Value) -> McpResult<Value> {
        let guard = self.session.lock().await;
        let session = guard.as_ref().ok_or(McpError::NotConnected)?;
        let known = session.capabilities.tool_names();

        log_info!(self.logger, "[McpService] Calling tool: {}", name);

        let params = CallToolRequestParams {
            meta: None,
            name: name.to_owned().into(),
            arguments: args.as_object().cloned(),
            task: None,
        };

        match session.service.call_tool(params).await {
            Ok(result) => serde_json::to_value(&result).map_err(|e| McpError::CallFailed {
                name: name.to_string(),
                message: format!("unserializable result: {}", e),
            }),
            Err(error) => Err(map_call_error(name, &error, &known)),
        }
    }

    /// Read a resource by URI
    pub async fn read_resource(&self, uri: &str) -> McpResult<Value> {
        let guard = self.session.lock().await;
        let session = guard.as_ref().ok_or(McpError::NotConnected)?;

        let params = ReadResourceRequestParams {
            meta: None,
            uri: uri.to_string(),
        };

        let result = session
            .service
            .read_resource(params)
            .await
            .map_err(|e| McpError::Protocol(e.to_string()))?;

        serde_json::to_value(&result).map_err(|e| McpError::Protocol(e.to_string()))
    }

    /// Fetch a prompt template by name
    pub async fn get_prompt(&self, name: &str, args: Value) -> McpResult<Value> {
        let guard = self.session.lock().await;
        let session = guard.as_ref().ok_or(McpError::NotConnected)?;

        let params = GetPromptRequestParams {
            meta: None,
            name: name.to_owned().into(),
            arguments: args.as_object().cloned(),
        };

        let result = session
            .service
            .get_prompt(params)
            .await
            .map_err(|e| McpError::Protocol(e.to_string()))?;

        serde_json::to_value(&result).map_err(|e| McpError::Protocol(e.to_string()))
    }

    /// Close the session, if any, and reset to disconnected
    ///
    /// Close-time errors are logged and swallowed. Safe to call repeatedly
    /// and on a never-connected instance.
    pub async fn cleanup(&self) {
        let mut guard = self.session.lock().await;
        if let Some(session) = guard.take() {
            close_session(session, &self.logger).await;
        }
    }
}

async fn start_session(
    spec: &LaunchSpec,
    env: &HashMap<String, String>,
    logger: &SharedLogger,
) -> McpResult<ActiveSession> {
    log_info!(
        logger,
        "[McpService] Spawning MCP server: {} {:?}",
        spec.command,
        spec.args
    );

    let mut cmd = Command::new(&spec.command);
    cmd.args(&spec.args);
    // The child inherits our environment; configured entries win
    for (key, value) in env {
        cmd.env(key, value);
    }
    cmd.stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null());

    let transport = TokioChildProcess::new(cmd).map_err(|e| McpError::Spawn(e.to_string()))?;

    let client_info = ClientInfo {
        meta: None,
        protocol_version: Default::default(),
        capabilities: ClientCapabilities::default(),
        client_info: Implementation {
            name: "copilot-core".to_string(),
            title: Some("Dev Copilot".to_string()),
            version: env!("CARGO_PKG_VERSION").to_string(),
            website_url: None,
            icons: None,
        },
    };

    let service = client_info
        .serve(transport)
        .await
        .map_err(|e| McpError::Init(e.to_string()))?;

    let capabilities = discover(&service, logger).await?;

    Ok(ActiveSession {
        service,
        capabilities: Arc::new(capabilities),
    })
}

/// Fan out the three discovery requests and join the results
///
/// Resource and prompt listings are independently fault tolerant; a tools
/// listing failure fails discovery as a whole, since tools are the primary
/// capability.
async fn discover(
    service: &RunningService<RoleClient, ClientInfo>,
    logger: &SharedLogger,
) -> McpResult<ServerCapabilities> {
    let (tools, resources, prompts) = tokio::join!(
        service.list_tools(Default::default()),
        service.list_resources(Default::default()),
        service.list_prompts(Default::default()),
    );

    let tools = tools
        .map_err(|e| McpError::Protocol(format!("Failed to get tools list: {}", e)))?
        .tools
        .iter()
        .map(Tool::from)
        .collect();

    let resources = match resources {
        Ok(result) => result.resources.iter().map(ResourceInfo::from).collect(),
        Err(e) => {
            log_warn!(logger, "[McpService] Resource listing unavailable: {}", e);
            Vec::new()
        }
    };

    let prompts = match prompts {
        Ok(result) => result.prompts.iter().map(PromptInfo::from).collect(),
        Err(e) => {
            log_warn!(logger, "[McpService] Prompt listing unavailable: {}", e);
            Vec::new()
        }
    };

    Ok(ServerCapabilities {
        tools,
        resources,
        prompts,
        connected_at: std::time::SystemTime::now(),
    })
}

async fn close_session(session: ActiveSession, logger: &SharedLogger) {
    if let Err(e) = session.service.cancel().await {
        log_warn!(logger, "[McpService] Error disconnecting MCP client: {}", e);
    }
}

fn map_call_error(name: &str, error: &ServiceError, known: &[String]) -> McpError {
    match error {
        ServiceError::McpError(data) => {
            classify_call_error(name, Some(data.code.0), &data.message, known)
        }
        other => classify_call_error(name, None, &other.to_string(), known),
    }
}

/// Error-mapping table: JSON-RPC code + message -> transport error kind
fn classify_call_error(
    name: &str,
    code: Option<i32>,
    message: &str,
    known: &[String],
) -> McpError {
    let lower = message.to_lowercase();
    let unknown_tool = code == Some(CODE_METHOD_NOT_FOUND)
        || (code == Some(CODE_INTERNAL_ERROR) && lower.contains("unknown tool"))
        || (code == Some(CODE_INVALID_PARAMS) && lower.contains("tool"))
        || lower.contains("unknown tool");

    match code {
        Some(CODE_REQUEST_TIMEOUT) => McpError::Timeout {
            name: name.to_string(),
        },
        _ if unknown_tool => McpError::UnknownTool {
            name: name.to_string(),
            known: known.to_vec(),
        },
        _ => McpError::CallFailed {
            name: name.to_string(),
            message: message.to_string(),
        },
    }
}

#[async_trait]
impl ToolExecutor for McpService {
    async fn execute_tool(&self, name: &str, args: &Value) -> McpResult<String> {
        let result = self.call_tool(name, args.clone()).await?;
        Ok(super::format::format_tool_result(&result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NoOpLogger;

    fn service() -> McpService {
        McpService::new(Arc::new(NoOpLogger))
    }

    #[tokio::test]
    async fn test_cleanup_is_idempotent() {
        let client = service();

        // Never connected: cleanup must not panic, repeatedly
        client.cleanup().await;
        client.cleanup().await;
        client.cleanup().await;

        assert!(!client.is_connected().await);
    }

    #[tokio::test]
    async fn test_operations_require_connection() {
        let client = service();

        assert!(matches!(
            client.list_tools().await,
            Err(McpError::NotConnected)
        ));
        assert!(matches!(
            client.call_tool("x", serde_json::json!({})).await,
            Err(McpError::NotConnected)
        ));
        assert!(matches!(
            client.read_resource("file:///x").await,
            Err(McpError::NotConnected)
        ));
        assert!(matches!(
            client.refresh_capabilities().await,
            Err(McpError::NotConnected)
        ));
        assert!(client.capabilities().await.is_none());
    }

    #[tokio::test]
    async fn test_failed_connect_leaves_disconnected() {
        let client = service();

        // Non-existent server path fails at launch detection
        let connected = client
            .connect("/no/such/dir/server.py", &[], &HashMap::new())
            .await;
        assert!(!connected);
        assert!(!client.is_connected().await);

        // Unspawnable command fails at process start
        let connected = client
            .connect("definitely-not-a-real-binary-xyz", &[], &HashMap::new())
            .await;
        assert!(!connected);
        assert!(!client.is_connected().await);
    }

    #[test]
    fn test_classify_timeout() {
        let err = classify_call_error("slow", Some(CODE_REQUEST_TIMEOUT), "timed out", &[]);
        assert!(matches!(err, McpError::Timeout { .. }));
    }

    #[test]
    fn test_classify_unknown_tool_by_message() {
        let known = vec!["a".to_string(), "b".to_string()];
        let err = classify_call_error(
            "c",
            Some(CODE_INTERNAL_ERROR),
            "Unknown tool: c",
            &known,
        );
        match err {
            McpError::UnknownTool { name, known } => {
                assert_eq!(name, "c");
                assert_eq!(known, vec!["a", "b"]);
            }
            other => panic!("expected UnknownTool, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_unknown_tool_by_code() {
        let err = classify_call_error("c", Some(CODE_METHOD_NOT_FOUND), "no such method", &[]);
        assert!(matches!(err, McpError::UnknownTool { .. }));
    }

    #[test]
    fn test_classify_other_errors_wrap_message() {
        let err = classify_call_error("t", Some(CODE_INTERNAL_ERROR), "disk on fire", &[]);
        match err {
            McpError::CallFailed { name, message } => {
                assert_eq!(name, "t");
                assert_eq!(message, "disk on fire");
            }
            other => panic!("expected CallFailed, got {:?}", other),
        }
    }
}
