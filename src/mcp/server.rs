//! JSON-RPC 2.0 protocol engine for the schema MCP server.
//!
//! [`McpServer::handle_message`] takes one raw request and produces at most
//! one response envelope. Four methods are supported: `initialize`,
//! `tools/list`, `tools/call` and `server/info`. Notifications (requests
//! without an `id`) are processed but never answered.
//!
//! [`McpServer::run`] drives the engine over newline-delimited stdio.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use serde::Serialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, error, warn};

use crate::errors::{Result, SchemaGraphError};

use super::registry::ToolRegistry;
use super::transport::{ErrorCode, JsonRpcRequest, JsonRpcResponse};

/// Protocol version reported when the client does not ask for one.
pub const DEFAULT_PROTOCOL_VERSION: &str = "2024-11-05";

/// Method names understood by the server.
pub mod methods {
    pub const INITIALIZE: &str = "initialize";
    pub const LIST_TOOLS: &str = "tools/list";
    pub const CALL_TOOL: &str = "tools/call";
    pub const SERVER_INFO: &str = "server/info";
}

/// Static identity reported by `initialize` and `server/info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerIdentity {
    pub name: String,
    pub version: String,
    pub description: String,
}

impl Default for ServerIdentity {
    fn default() -> Self {
        Self {
            name: "Graph Schema MCP Server".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: "Relational database schema stored in a graph, exposed for SQL and \
                          Cypher generation"
                .to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct InitializeResult<'a> {
    #[serde(rename = "protocolVersion")]
    protocol_version: &'a str,
    capabilities: ServerCapabilities,
    #[serde(rename = "serverInfo")]
    server_info: &'a ServerIdentity,
}

/// Unsupported capabilities serialize as `null`.
#[derive(Debug, Serialize)]
struct ServerCapabilities {
    tools: Option<ToolsCapability>,
    resources: Option<Value>,
    prompts: Option<Value>,
}

#[derive(Debug, Serialize)]
struct ToolsCapability {
    #[serde(rename = "listChanged")]
    list_changed: bool,
}

/// Runtime statistics for the MCP server.
pub struct ServerStats {
    started_at: Instant,
    total_requests: AtomicU64,
    tool_calls: AtomicU64,
    errors: AtomicU64,
}

impl ServerStats {
    fn new() -> Self {
        Self {
            started_at: Instant::now(),
            total_requests: AtomicU64::new(0),
            tool_calls: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        }
    }
}

/// The MCP server: a tool registry plus the protocol state around it.
///
/// Built once at startup and shared by the transport for the life of the
/// process. Request handling only reads the registry.
pub struct McpServer {
    registry: ToolRegistry,
    identity: ServerIdentity,
    stats: ServerStats,
    tool_call_counts: Mutex<HashMap<String, u64>>,
}

impl McpServer {
    /// Creates a server exposing the tools in `registry`.
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry,
            identity: ServerIdentity::default(),
            stats: ServerStats::new(),
            tool_call_counts: Mutex::new(HashMap::new()),
        }
    }

    /// Replaces the default server identity.
    pub fn with_identity(mut self, identity: ServerIdentity) -> Self {
        self.identity = identity;
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Runs the server, reading JSON-RPC requests from stdin and writing
    /// responses to stdout. Runs until stdin is closed.
    pub async fn run(self: Arc<Self>) -> Result<()> {
        self.serve(tokio::io::stdin(), tokio::io::stdout()).await
    }

    /// Serves newline-delimited requests from `reader`, writing one response
    /// line per answered request to `writer`.
    ///
    /// Requests are handled one at a time. Tool calls block on the graph
    /// store, so each runs on tokio's blocking pool.
    pub async fn serve<R, W>(self: Arc<Self>, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = BufReader::new(reader).lines();

        while let Some(line) = lines.next_line().await? {
            let line = line.trim().to_string();
            if line.is_empty() {
                continue;
            }

            let server = Arc::clone(&self);
            let handled = tokio::task::spawn_blocking(move || server.handle_message(&line)).await;
            let response = match handled {
                Ok(Some(response)) => response,
                Ok(None) => continue,
                Err(e) => {
                    error!(error = %e, "request task failed");
                    continue;
                }
            };

            let json_line = match serde_json::to_string(&response) {
                Ok(s) => s,
                Err(e) => {
                    error!(error = %e, "failed to serialize response");
                    continue;
                }
            };
            writer.write_all(format!("{json_line}\n").as_bytes()).await?;
            writer.flush().await?;
        }

        Ok(())
    }

    /// Handles one raw request text.
    ///
    /// Text that is not valid JSON yields a parse error without an `id`.
    pub fn handle_message(&self, raw: &str) -> Option<JsonRpcResponse> {
        match serde_json::from_str::<Value>(raw) {
            Ok(value) => self.handle_value(value),
            Err(e) => {
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                Some(JsonRpcResponse::error_with_data(
                    None,
                    ErrorCode::ParseError,
                    "Parse error".to_string(),
                    Some(json!(e.to_string())),
                ))
            }
        }
    }

    /// Handles one already-decoded request object.
    pub fn handle_value(&self, value: Value) -> Option<JsonRpcResponse> {
        let id = value.get("id").filter(|v| !v.is_null()).cloned();
        match JsonRpcRequest::from_value(value) {
            Ok(request) => self.handle_request(&request),
            Err(reason) => {
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                Some(JsonRpcResponse::error_with_data(
                    id,
                    ErrorCode::InvalidRequest,
                    "Invalid Request".to_string(),
                    Some(json!(reason)),
                ))
            }
        }
    }

    /// Dispatches a parsed request to its method handler.
    ///
    /// Returns `None` for notifications, after the handler has run.
    pub fn handle_request(&self, request: &JsonRpcRequest) -> Option<JsonRpcResponse> {
        self.stats.total_requests.fetch_add(1, Ordering::Relaxed);
        debug!(method = %request.method, notification = request.is_notification(), "dispatching request");

        let id = request.id.clone();
        let params = request.params.clone().unwrap_or_else(|| json!({}));

        let response = match self.dispatch(&request.method, &params) {
            None => JsonRpcResponse::error(
                id,
                ErrorCode::MethodNotFound,
                format!("Method not found: {}", request.method),
            ),
            Some(Ok(result)) => JsonRpcResponse::success(id, result),
            Some(Err(e)) => {
                error!(method = %request.method, error = %e, "request handler failed");
                JsonRpcResponse::error_with_data(
                    id,
                    ErrorCode::InternalError,
                    format!("Error executing {}: {}", request.method, e),
                    Some(json!(e.to_string())),
                )
            }
        };

        if response.is_error() {
            self.stats.errors.fetch_add(1, Ordering::Relaxed);
        }

        if request.is_notification() {
            return None;
        }
        Some(response)
    }

    /// Runs the handler for `method`, or returns `None` if there is none.
    ///
    /// A panicking handler is reported as an error rather than unwinding
    /// into the transport.
    fn dispatch(&self, method: &str, params: &Value) -> Option<Result<Value>> {
        let handler: fn(&Self, &Value) -> Result<Value> = match method {
            methods::INITIALIZE => Self::handle_initialize,
            methods::LIST_TOOLS => Self::handle_tools_list,
            methods::CALL_TOOL => Self::handle_tools_call,
            methods::SERVER_INFO => Self::handle_server_info,
            _ => return None,
        };

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler(self, params)));
        Some(outcome.unwrap_or_else(|_| {
            warn!(method, "handler panicked");
            Err(SchemaGraphError::ToolExecution {
                tool: method.to_string(),
                message: "handler panicked".to_string(),
            })
        }))
    }

    /// Handles `initialize`, echoing the requested protocol version.
    fn handle_initialize(&self, params: &Value) -> Result<Value> {
        let protocol_version = params
            .get("protocolVersion")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_PROTOCOL_VERSION);

        let result = InitializeResult {
            protocol_version,
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: false,
                }),
                resources: None,
                prompts: None,
            },
            server_info: &self.identity,
        };
        Ok(serde_json::to_value(result)?)
    }

    /// Handles `tools/list`, returning every registered tool definition.
    fn handle_tools_list(&self, _params: &Value) -> Result<Value> {
        Ok(json!({ "tools": self.registry.list() }))
    }

    /// Handles `tools/call`, running the named tool and wrapping its payload
    /// as a single text content block.
    fn handle_tools_call(&self, params: &Value) -> Result<Value> {
        let tool_name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| SchemaGraphError::invalid_argument("missing required parameter: name"))?;
        let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));

        self.stats.tool_calls.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut counts) = self.tool_call_counts.lock() {
            *counts.entry(tool_name.to_string()).or_insert(0) += 1;
        }

        let result = self.registry.call(tool_name, &arguments)?;
        let text = serde_json::to_string_pretty(&result)?;
        Ok(json!({
            "content": [{ "type": "text", "text": text }]
        }))
    }

    fn handle_server_info(&self, _params: &Value) -> Result<Value> {
        Ok(self.server_info())
    }

    /// Returns static identity, live tool count, capability flags and stats.
    pub fn server_info(&self) -> Value {
        json!({
            "name": self.identity.name,
            "version": self.identity.version,
            "description": self.identity.description,
            "tools_count": self.registry.len(),
            "capabilities": {
                "tools": true,
                "resources": false,
                "prompts": false,
            },
            "stats": self.server_stats_json(),
        })
    }

    /// Returns the current server runtime statistics as a JSON value.
    pub fn server_stats_json(&self) -> Value {
        let uptime = self.stats.started_at.elapsed();
        let tool_counts: Value = self
            .tool_call_counts
            .lock()
            .map(|counts| json!(*counts))
            .unwrap_or(json!({}));

        json!({
            "uptime_secs": uptime.as_secs(),
            "total_requests": self.stats.total_requests.load(Ordering::Relaxed),
            "tool_calls": self.stats.tool_calls.load(Ordering::Relaxed),
            "errors": self.stats.errors.load(Ordering::Relaxed),
            "tool_call_counts": tool_counts,
        })
    }
}
