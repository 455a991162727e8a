//! Tests for the MCP JSON-RPC adapter

use automation_bridge_core::protocol::{
    McpServer, INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND, PARSE_ERROR,
};
use automation_bridge_core::runtime::MemoryRuntime;
use automation_bridge_core::{Bridge, BridgeConfig};
use serde_json::{json, Value};

fn setup() -> (MemoryRuntime, McpServer<MemoryRuntime>) {
    let runtime = MemoryRuntime::demo().unwrap();
    let server = McpServer::new(Bridge::new(runtime.clone(), BridgeConfig::default()));
    (runtime, server)
}

fn send(server: &mut McpServer<MemoryRuntime>, request: Value) -> Value {
    let reply = server.handle_line(&request.to_string()).expect("request must be answered");
    serde_json::from_str(&reply).unwrap()
}

fn call_tool(server: &mut McpServer<MemoryRuntime>, name: &str, arguments: Value) -> Value {
    let reply = send(
        server,
        json!({"jsonrpc": "2.0", "id": 1, "method": "tools/call", "params": {"name": name, "arguments": arguments}}),
    );
    assert!(reply.get("error").is_none(), "unexpected error: {}", reply);
    reply["result"].clone()
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn test_initialize_handshake() {
    let (_runtime, mut server) = setup();
    let reply = send(
        &mut server,
        json!({"jsonrpc": "2.0", "id": 0, "method": "initialize", "params": {"capabilities": {}}}),
    );

    assert_eq!(reply["id"], 0);
    assert_eq!(reply["result"]["protocolVersion"], "2024-11-05");
    assert!(reply["result"]["capabilities"]["tools"].is_object());
    assert!(reply["result"]["capabilities"]["resources"].is_object());
    assert_eq!(reply["result"]["serverInfo"]["name"], "automation-bridge");
}

#[test]
fn test_notifications_produce_no_output() {
    let (_runtime, mut server) = setup();
    for line in [
        r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
        r#"{"jsonrpc":"2.0","method":"notifications/cancelled","params":{"requestId":3}}"#,
        r#"{"jsonrpc":"2.0","method":"unknown/notification"}"#,
    ] {
        assert!(server.handle_line(line).is_none(), "{}", line);
    }
}

#[test]
fn test_ping() {
    let (_runtime, mut server) = setup();
    let reply = send(&mut server, json!({"jsonrpc": "2.0", "id": "p", "method": "ping"}));
    assert_eq!(reply["id"], "p");
    assert_eq!(reply["result"], json!({}));
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_malformed_json_is_parse_error() {
    let (_runtime, mut server) = setup();
    let reply: Value = serde_json::from_str(&server.handle_line("{not json").unwrap()).unwrap();
    assert_eq!(reply["error"]["code"], PARSE_ERROR);
    assert_eq!(reply["id"], Value::Null);

    // The server keeps answering afterwards.
    let reply = send(&mut server, json!({"jsonrpc": "2.0", "id": 2, "method": "ping"}));
    assert_eq!(reply["result"], json!({}));
}

#[test]
fn test_request_without_method_is_invalid() {
    let (_runtime, mut server) = setup();
    let reply = send(&mut server, json!({"jsonrpc": "2.0", "id": 5}));
    assert_eq!(reply["error"]["code"], INVALID_REQUEST);
    assert_eq!(reply["id"], 5);

    let reply = send(&mut server, json!([1, 2, 3]));
    assert_eq!(reply["error"]["code"], INVALID_REQUEST);
}

#[test]
fn test_unknown_method() {
    let (_runtime, mut server) = setup();
    let reply = send(&mut server, json!({"jsonrpc": "2.0", "id": 1, "method": "sampling/createMessage"}));
    assert_eq!(reply["error"]["code"], METHOD_NOT_FOUND);
}

#[test]
fn test_unknown_tool_is_invalid_params() {
    let (_runtime, mut server) = setup();
    let reply = send(
        &mut server,
        json!({"jsonrpc": "2.0", "id": 1, "method": "tools/call", "params": {"name": "DeleteEverything", "arguments": {}}}),
    );
    assert_eq!(reply["error"]["code"], INVALID_PARAMS);
    assert!(reply["error"]["message"].as_str().unwrap().contains("DeleteEverything"));
}

#[test]
fn test_bad_tool_arguments_are_invalid_params() {
    let (_runtime, mut server) = setup();
    let reply = send(
        &mut server,
        json!({"jsonrpc": "2.0", "id": 1, "method": "tools/call", "params": {"name": "GetProperty", "arguments": {"handle": 12}}}),
    );
    assert_eq!(reply["error"]["code"], INVALID_PARAMS);
}

// ============================================================================
// Tools
// ============================================================================

#[test]
fn test_tools_list_has_eight_tools() {
    let (_runtime, mut server) = setup();
    let reply = send(&mut server, json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"}));
    let tools = reply["result"]["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 8);

    let names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
    assert_eq!(
        names,
        vec![
            "CreateObject",
            "QueryInterface",
            "GetTypeInformation",
            "InvokeMethod",
            "GetProperty",
            "SetProperty",
            "DisposeObject",
            "ListActiveComObjects"
        ]
    );
    for tool in tools {
        assert_eq!(tool["inputSchema"]["type"], "object");
    }
}

#[test]
fn test_tool_call_round_trip() {
    let (runtime, mut server) = setup();

    let created = call_tool(&mut server, "CreateObject", json!({"identifier": "Calc.App"}));
    assert_eq!(created["isError"], false);
    let envelope = &created["structuredContent"];
    assert_eq!(envelope["result"], 0);
    let handle = envelope["handle"].as_str().unwrap().to_string();

    // The text content carries the same envelope.
    let text: Value = serde_json::from_str(created["content"][0]["text"].as_str().unwrap()).unwrap();
    assert_eq!(&text, envelope);
    assert_eq!(created["content"][0]["type"], "text");

    let sum = call_tool(
        &mut server,
        "InvokeMethod",
        json!({"handle": handle, "method_name": "Add", "args": [1, 2]}),
    );
    assert_eq!(sum["structuredContent"]["return_value"], 3);

    let listed = call_tool(&mut server, "ListActiveComObjects", json!({}));
    assert_eq!(listed["structuredContent"]["objects"][0]["handle"], handle.as_str());
    assert_eq!(listed["structuredContent"]["objects"][0]["type_name"], "Calc.App");

    let disposed = call_tool(&mut server, "DisposeObject", json!({"handles": handle}));
    assert_eq!(disposed["structuredContent"]["details"][0]["result"], 0);
    assert_eq!(runtime.live_references(), 0);
}

#[test]
fn test_failed_envelope_is_tool_error_not_rpc_error() {
    let (_runtime, mut server) = setup();
    let result = call_tool(
        &mut server,
        "GetProperty",
        json!({"handle": "00000000-0000-0000-0000-000000000000", "property_name": "Visible"}),
    );
    assert_eq!(result["isError"], true);
    assert_eq!(result["structuredContent"]["result"], 0x8007_0057u32);
    assert_eq!(result["structuredContent"]["value"], Value::Null);
}

#[test]
fn test_arguments_may_be_omitted_for_list() {
    let (_runtime, mut server) = setup();
    let reply = send(
        &mut server,
        json!({"jsonrpc": "2.0", "id": 1, "method": "tools/call", "params": {"name": "ListActiveComObjects"}}),
    );
    assert_eq!(reply["result"]["structuredContent"]["objects"], json!([]));
}

#[test]
fn test_legacy_argument_names_are_accepted() {
    let (_runtime, mut server) = setup();
    let created = call_tool(&mut server, "CreateObject", json!({"identifier": "Calc.App"}));
    let handle = created["structuredContent"]["handle"].as_str().unwrap().to_string();

    let queried = call_tool(
        &mut server,
        "QueryInterface",
        json!({"runtime_id": handle, "iid": "{00020400-0000-0000-C000-000000000046}"}),
    );
    assert_eq!(queried["structuredContent"]["result"], 0);
}

// ============================================================================
// Resources
// ============================================================================

#[test]
fn test_resources_list_and_read() {
    let (_runtime, mut server) = setup();
    let listed = send(&mut server, json!({"jsonrpc": "2.0", "id": 1, "method": "resources/list"}));
    let resources = listed["result"]["resources"].as_array().unwrap();
    assert_eq!(resources.len(), 3);

    let uri = resources[0]["uri"].as_str().unwrap();
    let read = send(
        &mut server,
        json!({"jsonrpc": "2.0", "id": 2, "method": "resources/read", "params": {"uri": uri}}),
    );
    let contents = &read["result"]["contents"][0];
    assert_eq!(contents["uri"], uri);
    assert_eq!(contents["mimeType"], "text/plain");
    assert!(!contents["text"].as_str().unwrap().is_empty());
}

#[test]
fn test_unknown_resource() {
    let (_runtime, mut server) = setup();
    let reply = send(
        &mut server,
        json!({"jsonrpc": "2.0", "id": 1, "method": "resources/read", "params": {"uri": "mcp-com://nope"}}),
    );
    assert_eq!(reply["error"]["code"], INVALID_PARAMS);
}
