//! Tool routing
//!
//! Maps MCP tool names onto facade operations. Each tool decodes its
//! arguments into a typed request, calls the [`Bridge`], and hands back the
//! envelope as JSON. Decoding failures are the only errors surfaced here;
//! every facade outcome, failures included, is a normal tool result.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::bridge::{Bridge, DisposeTarget};
use crate::registry::ShutdownReport;
use crate::runtime::AutomationRuntime;

// ============================================================================
// Tool names
// ============================================================================

/// Tools exposed by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    CreateObject,
    QueryInterface,
    GetTypeInformation,
    InvokeMethod,
    GetProperty,
    SetProperty,
    DisposeObject,
    ListActiveComObjects,
}

impl ToolName {
    pub const ALL: [ToolName; 8] = [
        ToolName::CreateObject,
        ToolName::QueryInterface,
        ToolName::GetTypeInformation,
        ToolName::InvokeMethod,
        ToolName::GetProperty,
        ToolName::SetProperty,
        ToolName::DisposeObject,
        ToolName::ListActiveComObjects,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            ToolName::CreateObject => "CreateObject",
            ToolName::QueryInterface => "QueryInterface",
            ToolName::GetTypeInformation => "GetTypeInformation",
            ToolName::InvokeMethod => "InvokeMethod",
            ToolName::GetProperty => "GetProperty",
            ToolName::SetProperty => "SetProperty",
            ToolName::DisposeObject => "DisposeObject",
            ToolName::ListActiveComObjects => "ListActiveComObjects",
        }
    }

    /// Exact, case-sensitive lookup
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.as_str() == name)
    }

    pub const fn description(self) -> &'static str {
        match self {
            ToolName::CreateObject => {
                "Creates an automation object from a symbolic name (ProgID) or braced class id \
                 (CLSID) and returns a handle for it. Properties and method results that are \
                 objects are registered under new handles which work exactly like this one."
            }
            ToolName::QueryInterface => {
                "Retrieves another interface of a live object by interface id and returns a new handle for it."
            }
            ToolName::GetTypeInformation => {
                "Describes the methods, properties and events of a live object. Members that \
                 cannot be inspected are listed under errors_encountered."
            }
            ToolName::InvokeMethod => {
                "Invokes a method on a live object. Object results are registered and returned \
                 as a new handle. Prefer an empty list over omitting args."
            }
            ToolName::GetProperty => {
                "Reads a property of a live object. Object values are registered and returned as a new handle."
            }
            ToolName::SetProperty => "Writes a property of a live object.",
            ToolName::DisposeObject => {
                "Releases one or more objects and removes their handles. Only dispose objects \
                 when the user is done with an application or interaction."
            }
            ToolName::ListActiveComObjects => {
                "Lists every live object with its handle, type name and type identity."
            }
        }
    }

    /// JSON Schema of the tool's arguments
    pub fn input_schema(self) -> Value {
        let handle = json!({"type": "string", "description": "Handle returned by a previous call"});
        match self {
            ToolName::CreateObject => json!({
                "type": "object",
                "properties": {
                    "identifier": {"type": "string", "description": "ProgID or braced CLSID"}
                },
                "required": ["identifier"]
            }),
            ToolName::QueryInterface => json!({
                "type": "object",
                "properties": {
                    "handle": handle,
                    "interface_id": {"type": "string", "description": "Braced interface id"}
                },
                "required": ["handle", "interface_id"]
            }),
            ToolName::GetTypeInformation => json!({
                "type": "object",
                "properties": {"handle": handle},
                "required": ["handle"]
            }),
            ToolName::InvokeMethod => json!({
                "type": "object",
                "properties": {
                    "handle": handle,
                    "method_name": {"type": "string"},
                    "args": {"type": "array", "items": {}, "description": "Positional arguments"}
                },
                "required": ["handle", "method_name"]
            }),
            ToolName::GetProperty => json!({
                "type": "object",
                "properties": {
                    "handle": handle,
                    "property_name": {"type": "string"}
                },
                "required": ["handle", "property_name"]
            }),
            ToolName::SetProperty => json!({
                "type": "object",
                "properties": {
                    "handle": handle,
                    "property_name": {"type": "string"},
                    "value": {}
                },
                "required": ["handle", "property_name", "value"]
            }),
            ToolName::DisposeObject => json!({
                "type": "object",
                "properties": {
                    "handles": {
                        "oneOf": [
                            {"type": "string"},
                            {"type": "array", "items": {"type": "string"}}
                        ],
                        "description": "One handle or a list of handles"
                    }
                },
                "required": ["handles"]
            }),
            ToolName::ListActiveComObjects => json!({"type": "object", "properties": {}}),
        }
    }
}

/// Entry of a `tools/list` response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

impl From<ToolName> for ToolDefinition {
    fn from(tool: ToolName) -> Self {
        Self {
            name: tool.as_str().to_string(),
            description: tool.description().to_string(),
            input_schema: tool.input_schema(),
        }
    }
}

pub fn tool_definitions() -> Vec<ToolDefinition> {
    ToolName::ALL.into_iter().map(ToolDefinition::from).collect()
}

// ============================================================================
// Requests
// ============================================================================

// Inputs also accept the `runtime_id` / `iid` / `runtime_id_or_ids` names
// older clients send.

#[derive(Debug, Deserialize)]
pub struct CreateObjectRequest {
    pub identifier: String,
}

#[derive(Debug, Deserialize)]
pub struct QueryInterfaceRequest {
    #[serde(alias = "runtime_id")]
    pub handle: String,
    #[serde(alias = "iid")]
    pub interface_id: String,
}

#[derive(Debug, Deserialize)]
pub struct HandleRequest {
    #[serde(alias = "runtime_id")]
    pub handle: String,
}

#[derive(Debug, Deserialize)]
pub struct InvokeMethodRequest {
    #[serde(alias = "runtime_id")]
    pub handle: String,
    pub method_name: String,
    #[serde(default)]
    pub args: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
pub struct GetPropertyRequest {
    #[serde(alias = "runtime_id")]
    pub handle: String,
    pub property_name: String,
}

#[derive(Debug, Deserialize)]
pub struct SetPropertyRequest {
    #[serde(alias = "runtime_id")]
    pub handle: String,
    pub property_name: String,
    pub value: Value,
}

#[derive(Debug, Deserialize)]
pub struct DisposeObjectRequest {
    #[serde(alias = "runtime_id_or_ids")]
    pub handles: DisposeTarget,
}

// ============================================================================
// Router
// ============================================================================

/// Routes tool calls to one bridge
pub struct ToolRouter<R> {
    bridge: Bridge<R>,
}

impl<R: AutomationRuntime> ToolRouter<R> {
    pub fn new(bridge: Bridge<R>) -> Self {
        Self { bridge }
    }

    pub fn bridge(&self) -> &Bridge<R> {
        &self.bridge
    }

    pub fn list_tools(&self) -> Vec<ToolDefinition> {
        tool_definitions()
    }

    /// Handle a tool call by name with JSON arguments
    ///
    /// # Errors
    ///
    /// [`ToolError`] when the name is unknown or the arguments do not decode.
    pub fn handle_tool_call(&mut self, name: &str, payload: Value) -> Result<Value, ToolError> {
        let tool = ToolName::parse(name).ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        match tool {
            ToolName::CreateObject => {
                let request = decode::<CreateObjectRequest>(payload)?;
                encode(self.bridge.create_object(&request.identifier))
            }
            ToolName::QueryInterface => {
                let request = decode::<QueryInterfaceRequest>(payload)?;
                encode(self.bridge.query_interface(&request.handle, &request.interface_id))
            }
            ToolName::GetTypeInformation => {
                let request = decode::<HandleRequest>(payload)?;
                encode(self.bridge.describe(&request.handle))
            }
            ToolName::InvokeMethod => {
                let request = decode::<InvokeMethodRequest>(payload)?;
                encode(
                    self.bridge
                        .invoke_method(&request.handle, &request.method_name, request.args),
                )
            }
            ToolName::GetProperty => {
                let request = decode::<GetPropertyRequest>(payload)?;
                encode(self.bridge.get_property(&request.handle, &request.property_name))
            }
            ToolName::SetProperty => {
                let request = decode::<SetPropertyRequest>(payload)?;
                encode(
                    self.bridge
                        .set_property(&request.handle, &request.property_name, request.value),
                )
            }
            ToolName::DisposeObject => {
                let request = decode::<DisposeObjectRequest>(payload)?;
                encode(self.bridge.dispose(request.handles))
            }
            // Takes no arguments; whatever was sent is ignored.
            ToolName::ListActiveComObjects => encode(self.bridge.list_objects()),
        }
    }

    pub fn shutdown(&mut self) -> ShutdownReport {
        self.bridge.shutdown()
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Tool routing errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Serialization failure: {0}")]
    Serialization(String),
}

fn decode<T: for<'de> Deserialize<'de>>(payload: Value) -> Result<T, ToolError> {
    serde_json::from_value(payload).map_err(|err| ToolError::InvalidParams(err.to_string()))
}

fn encode<T: Serialize>(response: T) -> Result<Value, ToolError> {
    serde_json::to_value(response).map_err(|err| ToolError::Serialization(err.to_string()))
}
