//! MCP protocol adapter
//!
//! Line-delimited JSON-RPC 2.0. One request per line in, at most one
//! response per line out; notifications never produce output.
//!
//! # Critical Invariants
//!
//! 1. **No fatal requests**: every malformed or failing request becomes a
//!    JSON-RPC error (or a tool result); the server keeps reading
//! 2. **Facade failures are results**: a failing envelope is returned as a
//!    tool result with `isError: true`, never as a JSON-RPC error
//!
//! # Example
//!
//! ```rust
//! use automation_bridge_core::protocol::McpServer;
//! use automation_bridge_core::runtime::MemoryRuntime;
//! use automation_bridge_core::{Bridge, BridgeConfig};
//!
//! let mut server = McpServer::new(Bridge::new(MemoryRuntime::demo().unwrap(), BridgeConfig::default()));
//! let reply = server.handle_line(r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#).unwrap();
//! assert_eq!(reply, r#"{"jsonrpc":"2.0","id":1,"result":{}}"#);
//!
//! assert!(server.handle_line(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#).is_none());
//! ```

pub mod resources;
pub mod tools;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::bridge::Bridge;
use crate::core::ResultCode;
use crate::registry::ShutdownReport;
use crate::runtime::AutomationRuntime;

pub use tools::{tool_definitions, ToolDefinition, ToolError, ToolName, ToolRouter};

pub const JSONRPC_VERSION: &str = "2.0";

/// Offered when the client does not ask for a version
pub const PROTOCOL_VERSION: &str = "2024-11-05";

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct Request {
    jsonrpc: String,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

impl RpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<ToolError> for RpcError {
    fn from(err: ToolError) -> Self {
        let code = match err {
            ToolError::UnknownTool(_) | ToolError::InvalidParams(_) => INVALID_PARAMS,
            ToolError::Serialization(_) => INTERNAL_ERROR,
        };
        RpcError::new(code, err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl Response {
    fn result(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    fn error(id: Value, error: RpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ToolCallParams {
    name: String,
    #[serde(default)]
    arguments: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ReadResourceParams {
    uri: String,
}

// ============================================================================
// Server
// ============================================================================

/// JSON-RPC front end over one bridge
pub struct McpServer<R> {
    router: ToolRouter<R>,
    server_name: String,
    server_version: String,
}

impl<R: AutomationRuntime> McpServer<R> {
    pub fn new(bridge: Bridge<R>) -> Self {
        let config = bridge.config();
        Self {
            server_name: config.server_name.clone(),
            server_version: config.server_version.clone(),
            router: ToolRouter::new(bridge),
        }
    }

    pub fn router(&self) -> &ToolRouter<R> {
        &self.router
    }

    /// Handle one raw input frame; invalid UTF-8 is a parse error
    pub fn handle_bytes(&mut self, frame: &[u8]) -> Option<String> {
        match std::str::from_utf8(frame) {
            Ok(line) => self.handle_line(line),
            Err(e) => {
                warn!(error = %e, "frame is not valid UTF-8");
                encode(&parse_error(e))
            }
        }
    }

    /// Handle one input line, returning the serialized response if any
    pub fn handle_line(&mut self, line: &str) -> Option<String> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let response = match serde_json::from_str::<Value>(line) {
            Ok(message) => self.handle_message(message)?,
            Err(e) => {
                warn!(error = %e, "unparseable frame");
                parse_error(e)
            }
        };

        encode(&response)
    }

    /// Handle one decoded message; `None` for notifications
    pub fn handle_message(&mut self, message: Value) -> Option<Response> {
        // Read from the raw message so `"id": null` still counts as a request.
        let id = message.get("id").cloned();
        let request = match serde_json::from_value::<Request>(message) {
            Ok(request) if request.jsonrpc == JSONRPC_VERSION => request,
            Ok(_) => {
                return Some(Response::error(
                    id.unwrap_or(Value::Null),
                    RpcError::new(INVALID_REQUEST, "Invalid Request: jsonrpc must be \"2.0\""),
                ))
            }
            Err(e) => {
                return Some(Response::error(
                    id.unwrap_or(Value::Null),
                    RpcError::new(INVALID_REQUEST, format!("Invalid Request: {}", e)),
                ))
            }
        };

        debug!(method = %request.method, "request");
        let outcome = self.dispatch(&request.method, request.params);

        // Notifications get no reply, whatever happened.
        let id = id?;
        Some(match outcome {
            Ok(result) => Response::result(id, result),
            Err(error) => Response::error(id, error),
        })
    }

    /// Release every live object
    pub fn shutdown(&mut self) -> ShutdownReport {
        self.router.shutdown()
    }

    fn dispatch(&mut self, method: &str, params: Value) -> Result<Value, RpcError> {
        match method {
            "initialize" => Ok(self.initialize(&params)),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": self.router.list_tools() })),
            "tools/call" => self.call_tool(params),
            "resources/list" => Ok(list_resources()),
            "resources/read" => read_resource(params),
            _ if method.starts_with("notifications/") => Ok(Value::Null),
            _ => Err(RpcError::new(
                METHOD_NOT_FOUND,
                format!("Method not found: {}", method),
            )),
        }
    }

    fn initialize(&self, params: &Value) -> Value {
        let version = params
            .get("protocolVersion")
            .and_then(Value::as_str)
            .unwrap_or(PROTOCOL_VERSION);
        json!({
            "protocolVersion": version,
            "capabilities": {
                "tools": { "listChanged": false },
                "resources": { "subscribe": false, "listChanged": false }
            },
            "serverInfo": {
                "name": self.server_name,
                "version": self.server_version
            }
        })
    }

    fn call_tool(&mut self, params: Value) -> Result<Value, RpcError> {
        let params: ToolCallParams = serde_json::from_value(params)
            .map_err(|e| RpcError::new(INVALID_PARAMS, format!("Invalid parameters: {}", e)))?;
        let arguments = params.arguments.unwrap_or_else(|| json!({}));

        let envelope = self.router.handle_tool_call(&params.name, arguments)?;
        let text = serde_json::to_string(&envelope)
            .map_err(|e| RpcError::from(ToolError::Serialization(e.to_string())))?;

        Ok(json!({
            "content": [{ "type": "text", "text": text }],
            "structuredContent": envelope,
            "isError": is_failure(&envelope)
        }))
    }
}

fn parse_error(e: impl std::fmt::Display) -> Response {
    Response::error(Value::Null, RpcError::new(PARSE_ERROR, format!("Parse error: {}", e)))
}

fn encode(response: &Response) -> Option<String> {
    match serde_json::to_string(response) {
        Ok(text) => Some(text),
        Err(e) => {
            warn!(error = %e, "failed to serialize response");
            None
        }
    }
}

fn is_failure(envelope: &Value) -> bool {
    envelope
        .get("result")
        .and_then(Value::as_u64)
        .and_then(|code| u32::try_from(code).ok())
        .and_then(ResultCode::from_value)
        .map_or(true, |code| !code.is_success())
}

fn list_resources() -> Value {
    let resources: Vec<Value> = resources::DEMO_RESOURCES
        .iter()
        .map(|resource| {
            json!({
                "uri": resource.uri,
                "name": resource.name,
                "description": resource.description,
                "mimeType": resources::MIME_TYPE
            })
        })
        .collect();
    json!({ "resources": resources })
}

fn read_resource(params: Value) -> Result<Value, RpcError> {
    let params: ReadResourceParams = serde_json::from_value(params)
        .map_err(|e| RpcError::new(INVALID_PARAMS, format!("Invalid parameters: {}", e)))?;
    let resource = resources::find(&params.uri)
        .ok_or_else(|| RpcError::new(INVALID_PARAMS, format!("Unknown resource: {}", params.uri)))?;

    Ok(json!({
        "contents": [{
            "uri": resource.uri,
            "mimeType": resources::MIME_TYPE,
            "text": resource.text
        }]
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BridgeConfig;
    use crate::runtime::MemoryRuntime;

    fn server() -> McpServer<MemoryRuntime> {
        McpServer::new(Bridge::new(MemoryRuntime::demo().unwrap(), BridgeConfig::default()))
    }

    fn call(server: &mut McpServer<MemoryRuntime>, line: &str) -> Value {
        serde_json::from_str(&server.handle_line(line).unwrap()).unwrap()
    }

    #[test]
    fn test_initialize_echoes_requested_version() {
        let mut server = server();
        let reply = call(
            &mut server,
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2025-03-26"}}"#,
        );
        assert_eq!(reply["result"]["protocolVersion"], "2025-03-26");
        assert_eq!(reply["result"]["serverInfo"]["name"], "automation-bridge");
    }

    #[test]
    fn test_wrong_version_is_invalid_request() {
        let mut server = server();
        let reply = call(&mut server, r#"{"jsonrpc":"1.0","id":7,"method":"ping"}"#);
        assert_eq!(reply["error"]["code"], INVALID_REQUEST);
        assert_eq!(reply["id"], 7);
    }

    #[test]
    fn test_unknown_method() {
        let mut server = server();
        let reply = call(&mut server, r#"{"jsonrpc":"2.0","id":"a","method":"prompts/list"}"#);
        assert_eq!(reply["error"]["code"], METHOD_NOT_FOUND);
    }

    #[test]
    fn test_null_id_is_answered() {
        let mut server = server();
        let reply = call(&mut server, r#"{"jsonrpc":"2.0","id":null,"method":"ping"}"#);
        assert_eq!(reply["id"], Value::Null);
        assert_eq!(reply["result"], json!({}));

        assert!(server.handle_line(r#"{"jsonrpc":"2.0","method":"ping"}"#).is_none());
    }

    #[test]
    fn test_invalid_utf8_is_parse_error() {
        let mut server = server();
        let reply: Value = serde_json::from_str(&server.handle_bytes(b"\xff\xfe garbage").unwrap()).unwrap();
        assert_eq!(reply["error"]["code"], PARSE_ERROR);
        assert_eq!(reply["id"], Value::Null);

        let ping = server.handle_bytes(br#"{"jsonrpc":"2.0","id":3,"method":"ping"}"#).unwrap();
        let reply: Value = serde_json::from_str(&ping).unwrap();
        assert_eq!(reply["id"], 3);
    }

    #[test]
    fn test_blank_lines_are_ignored() {
        let mut server = server();
        assert!(server.handle_line("   ").is_none());
    }

    #[test]
    fn test_failure_envelope_sets_is_error() {
        assert!(is_failure(&json!({"result": 0x80070057u32})));
        assert!(!is_failure(&json!({"result": 0})));
        assert!(!is_failure(&json!({"result": 1})));
        assert!(is_failure(&json!({})));
    }
}
