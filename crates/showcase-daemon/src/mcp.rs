//! MCP server over stdio: line-delimited JSON-RPC 2.0.
//!
//! Exposes a single `show` tool that forwards to [`SessionManager::present`].
//! Requests are handled one at a time in arrival order.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};
use showcase_core::{ContentPayload, SessionId, SessionManager};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

pub const SERVER_NAME: &str = "showcase-mcp";
/// Newest protocol revision; offered when the client asks for one we do not know.
pub const PROTOCOL_VERSION: &str = "2025-06-18";
const SUPPORTED_PROTOCOL_VERSIONS: [&str; 3] = ["2024-11-05", "2025-03-26", PROTOCOL_VERSION];

const SHOW_TOOL: &str = "show";

const PARSE_ERROR: i64 = -32700;
const INVALID_REQUEST: i64 = -32600;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;

#[derive(Debug, Deserialize)]
struct Request {
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Debug, Deserialize)]
struct ToolCall {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShowArguments {
    title: String,
    message: Option<String>,
    html: Option<String>,
    mermaid: Option<String>,
    image_url: Option<String>,
    window_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct RpcError {
    code: i64,
    message: String,
}

impl RpcError {
    fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

pub struct McpServer {
    manager: Arc<SessionManager>,
}

impl McpServer {
    pub fn new(manager: Arc<SessionManager>) -> Self {
        Self { manager }
    }

    /// Answer requests from `reader` until it reaches EOF.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(response) = self.handle_line(line) {
                let mut frame = response.to_string();
                frame.push('\n');
                writer.write_all(frame.as_bytes()).await?;
                writer.flush().await?;
            }
        }
        Ok(())
    }

    /// Handle one frame. Notifications produce no response.
    pub fn handle_line(&self, line: &str) -> Option<Value> {
        let message: Value = match serde_json::from_str(line) {
            Ok(message) => message,
            Err(e) => {
                log::warn!("Failed to parse request: {}", e);
                return Some(error_response(
                    Value::Null,
                    RpcError::new(PARSE_ERROR, format!("Parse error: {}", e)),
                ));
            }
        };

        // A present `id`, even null, makes this a request that needs an answer.
        let id = message.get("id").cloned();
        let request: Request = match serde_json::from_value(message) {
            Ok(request) => request,
            Err(e) => {
                return Some(error_response(
                    Value::Null,
                    RpcError::new(INVALID_REQUEST, format!("Invalid request: {}", e)),
                ));
            }
        };

        let Some(id) = id else {
            log::debug!("Notification: {}", request.method);
            return None;
        };

        Some(match self.dispatch(&request.method, request.params) {
            Ok(result) => json!({ "jsonrpc": "2.0", "id": id, "result": result }),
            Err(e) => error_response(id, e),
        })
    }

    fn dispatch(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        match method {
            "initialize" => Ok(initialize_result(&params)),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": [show_tool()] })),
            "tools/call" => self.call_tool(params),
            _ => Err(RpcError::new(
                METHOD_NOT_FOUND,
                format!("Method not found: {}", method),
            )),
        }
    }

    fn call_tool(&self, params: Value) -> Result<Value, RpcError> {
        let call: ToolCall = serde_json::from_value(params)
            .map_err(|e| RpcError::new(INVALID_PARAMS, format!("Invalid tool call: {}", e)))?;

        match call.name.as_str() {
            SHOW_TOOL => self.show(call.arguments),
            other => Err(RpcError::new(
                INVALID_PARAMS,
                format!("Unknown tool: {}", other),
            )),
        }
    }

    fn show(&self, arguments: Value) -> Result<Value, RpcError> {
        let args: ShowArguments = serde_json::from_value(arguments)
            .map_err(|e| RpcError::new(INVALID_PARAMS, format!("Invalid arguments: {}", e)))?;
        if args.title.trim().is_empty() {
            return Err(RpcError::new(INVALID_PARAMS, "title must not be empty"));
        }

        let payload = ContentPayload {
            title: args.title,
            message: args.message,
            html: args.html,
            mermaid: args.mermaid,
            image_url: args.image_url,
        };
        let requested = args.window_id.map(SessionId::from);

        // Failures of the tool itself are reported as tool output, not as
        // protocol errors, so the caller gets to see them.
        match self.manager.present(payload, requested.as_ref()) {
            Ok(id) => {
                let text = json!({ "windowId": id.as_str() }).to_string();
                Ok(json!({ "content": [{ "type": "text", "text": text }] }))
            }
            Err(e) => {
                log::error!("Failed to show content: {}", e);
                Ok(json!({
                    "content": [{ "type": "text", "text": e.to_string() }],
                    "isError": true,
                }))
            }
        }
    }
}

fn initialize_result(params: &Value) -> Value {
    let version = params
        .get("protocolVersion")
        .and_then(Value::as_str)
        .filter(|requested| SUPPORTED_PROTOCOL_VERSIONS.contains(requested))
        .unwrap_or(PROTOCOL_VERSION);

    json!({
        "protocolVersion": version,
        "capabilities": { "tools": {} },
        "serverInfo": {
            "name": SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION"),
        },
    })
}

fn show_tool() -> Value {
    json!({
        "name": SHOW_TOOL,
        "description": "Show rich content (Markdown, HTML, Mermaid diagrams, images) in a native window. \
            Returns a windowId; pass it back to replace that window's content instead of opening a new one.",
        "inputSchema": {
            "type": "object",
            "properties": {
                "title": { "type": "string", "description": "Title shown at the top of the window" },
                "message": { "type": "string", "description": "Markdown body" },
                "html": { "type": "string", "description": "Raw HTML to render" },
                "mermaid": { "type": "string", "description": "Mermaid diagram source" },
                "imageUrl": { "type": "string", "description": "URL of an image to show" },
                "windowId": { "type": "string", "description": "Window to update; omit to open a new one" },
            },
            "required": ["title"],
        },
    })
}

fn error_response(id: Value, error: RpcError) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": error.code, "message": error.message },
    })
}

// ============================================================================
// TESTS
// ============================================================================
