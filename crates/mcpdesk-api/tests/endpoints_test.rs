#![allow(clippy::unwrap_used)]
// Integration tests for the typed endpoint bindings.

use pretty_assertions::assert_eq;
use serde_json::{Map, json};
use url::Url;
use wiremock::matchers::{body_json, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

use mcpdesk_api::models::{
    MarketFilter, McpConnectionRequest, McpInvokeRequest, McpMarket, McpTransport, Status,
    ToolFilter, ToolType,
};
use mcpdesk_api::{ErrorKind, Gateway, GatewayOptions};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, Gateway) {
    let server = MockServer::start().await;
    let base = Url::parse(&format!("{}/api", server.uri())).unwrap();
    let gateway = Gateway::with_client(reqwest::Client::new(), base, GatewayOptions::default());
    (server, gateway)
}

fn ok(data: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "success": true, "data": data }))
}

// ── Chat ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_generate_returns_text() {
    let (server, gateway) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/ai/generate"))
        .and(query_param("message", "what is mcp?"))
        .and(query_param_is_missing("sessionId"))
        .respond_with(ResponseTemplate::new(200).set_body_string("A protocol."))
        .mount(&server)
        .await;

    let answer = gateway.generate("what is mcp?", None).await.unwrap();
    assert_eq!(answer, "A protocol.");
}

#[tokio::test]
async fn test_chat_history_is_a_bare_list() {
    let (server, gateway) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/ai/history"))
        .and(query_param("sessionId", "abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 1, "sessionId": "abc", "userMessage": "hi", "aiResponse": "hello",
              "createTime": "2025-05-01T10:00:00" },
            { "id": 2, "sessionId": "abc", "userMessage": "bye", "aiResponse": "ciao" }
        ])))
        .mount(&server)
        .await;

    let history = gateway.chat_history("abc").await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].ai_response, "hello");
    assert!(history[1].create_time.is_none());
}

#[tokio::test]
async fn test_delete_chat_history_returns_confirmation() {
    let (server, gateway) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/api/ai/history"))
        .and(query_param("sessionId", "abc"))
        .respond_with(ResponseTemplate::new(200).set_body_string("History cleared"))
        .mount(&server)
        .await;

    assert_eq!(
        gateway.delete_chat_history("abc").await.unwrap(),
        "History cleared"
    );
}

// ── Markets ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_markets_with_filters() {
    let (server, gateway) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/mcp/markets"))
        .and(query_param("status", "ENABLED"))
        .and(query_param_is_missing("keyword"))
        .respond_with(ok(json!([
            { "id": 1, "name": "Official", "url": "https://market.example", "status": "ENABLED" }
        ])))
        .mount(&server)
        .await;

    let filter = MarketFilter {
        status: Some(Status::Enabled),
        keyword: Some(String::new()),
    };
    let result = gateway.list_markets(&filter).await.unwrap();
    let markets = result.data().unwrap();
    assert_eq!(markets[0].name, "Official");
}

#[tokio::test]
async fn test_market_tools_pagination() {
    let (server, gateway) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/mcp/markets/4/tools"))
        .and(query_param("page", "2"))
        .and(query_param("size", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": [{ "id": 11, "marketId": 4, "toolName": "weather", "isLoaded": false }],
            "total": 11, "page": 2, "size": 10, "pages": 2
        })))
        .mount(&server)
        .await;

    let result = gateway.market_tools(4, Some(2), Some(10)).await.unwrap();
    assert_eq!(result.total, Some(11));
    assert_eq!(result.pages, Some(2));
    assert!(!result.data().unwrap()[0].is_loaded);
}

#[tokio::test]
async fn test_create_market_sends_camel_case_body() {
    let (server, gateway) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/mcp/markets"))
        .and(body_json(json!({
            "name": "Mirror",
            "url": "https://mirror.example",
            "authConfig": "{\"token\":\"x\"}",
            "status": "DISABLED"
        })))
        .respond_with(ok(json!({
            "id": 9, "name": "Mirror", "url": "https://mirror.example", "status": "DISABLED"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let market = McpMarket {
        id: None,
        name: "Mirror".into(),
        url: "https://mirror.example".into(),
        description: None,
        auth_config: Some("{\"token\":\"x\"}".into()),
        status: Status::Disabled,
        create_time: None,
        update_time: None,
    };
    let created = gateway.create_market(&market).await.unwrap();
    assert_eq!(created.data().unwrap().id, Some(9));
}

#[tokio::test]
async fn test_market_status_refresh_and_load() {
    let (server, gateway) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/api/mcp/markets/3/status"))
        .and(query_param("status", "DISABLED"))
        .respond_with(ok(json!(null)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/mcp/markets/3/refresh"))
        .respond_with(ok(json!(null)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/mcp/markets/tools/8/load"))
        .respond_with(ok(json!(null)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/mcp/markets/tools/batch-load"))
        .and(body_json(json!({ "toolIds": [8, 9] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true, "message": "loaded 2 tools"
        })))
        .expect(1)
        .mount(&server)
        .await;

    gateway.set_market_status(3, Status::Disabled).await.unwrap();
    gateway.refresh_market(3).await.unwrap();
    gateway.load_market_tool(8).await.unwrap();
    let batch = gateway.batch_load_market_tools(&[8, 9]).await.unwrap();
    assert_eq!(batch.message.as_deref(), Some("loaded 2 tools"));
}

// ── Tools ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_tools_with_type_filter() {
    let (server, gateway) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/mcp/tools"))
        .and(query_param("type", "REMOTE"))
        .and(query_param("keyword", "fs"))
        .and(query_param_is_missing("status"))
        .respond_with(ok(json!([{ "id": 2, "name": "fs", "type": "REMOTE", "status": "ENABLED" }])))
        .mount(&server)
        .await;

    let filter = ToolFilter {
        tool_type: Some(ToolType::Remote),
        status: None,
        keyword: Some("fs".into()),
    };
    let result = gateway.list_tools(&filter).await.unwrap();
    assert_eq!(result.data().unwrap()[0].tool_type, ToolType::Remote);
}

#[tokio::test]
async fn test_batch_delete_joins_ids() {
    let (server, gateway) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/api/mcp/tools/batch"))
        .and(query_param("ids", "1,5,9"))
        .respond_with(ok(json!(null)))
        .expect(1)
        .mount(&server)
        .await;

    gateway.delete_tools(&[1, 5, 9]).await.unwrap();
}

#[tokio::test]
async fn test_tool_test_posts_arguments() {
    let (server, gateway) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/mcp/tools/test/4"))
        .and(body_json(json!({ "path": "/tmp" })))
        .respond_with(ok(json!({ "output": "ok" })))
        .mount(&server)
        .await;

    let mut args = Map::new();
    args.insert("path".into(), json!("/tmp"));
    let result = gateway.test_tool(4, Some(&args)).await.unwrap();
    assert_eq!(result.data().unwrap()["output"], "ok");
}

#[tokio::test]
async fn test_tool_not_found_is_normalized() {
    let (server, gateway) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/mcp/tools/info/77"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "success": false, "message": "tool 77 not found"
        })))
        .mount(&server)
        .await;

    let err = gateway.tool_info(77).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ServerFailure);
    assert_eq!(err.message(), "tool 77 not found");
}

// ── Connection probes ───────────────────────────────────────────────

#[tokio::test]
async fn test_probe_list_tools_reads_flat_response() {
    let (server, gateway) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/mcp/test/tools/list"))
        .and(body_json(json!({ "url": "http://mcp.local/sse", "transportType": "sse" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "tools": [{ "name": "echo", "inputSchema": { "type": "object" } }],
            "count": 1
        })))
        .mount(&server)
        .await;

    let mut target = McpConnectionRequest::new("http://mcp.local/sse");
    target.transport_type = Some(McpTransport::Sse);
    let result = gateway.probe_list_tools(&target).await.unwrap();
    let probed = result.probed_tools().unwrap();
    assert_eq!(probed.count, 1);
    assert_eq!(probed.tools[0].name, "echo");
}

#[tokio::test]
async fn test_probe_failure_is_a_successful_call() {
    let (server, gateway) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/mcp/test/tools/invoke"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false, "error": "Connection refused", "errorType": "ConnectException"
        })))
        .mount(&server)
        .await;

    let request = McpInvokeRequest {
        connection: McpConnectionRequest::new("http://127.0.0.1:1/mcp"),
        tool_name: "echo".into(),
        arguments: None,
    };
    let result = gateway.probe_invoke(&request).await.unwrap();
    assert!(!result.success);
    assert_eq!(result.error_type.as_deref(), Some("ConnectException"));
}
