// Wire types for the admin API.
//
// Field names follow the server's camelCase JSON. Every envelope endpoint
// answers with `ApiResult<T>`; the chat history endpoint answers with a
// bare list of `ChatExchange`.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ── Envelope ─────────────────────────────────────────────────────────

/// The uniform `{success, message, data, total, page, size, pages}` wrapper.
///
/// Decoded exactly as received. The connection-test endpoints answer with
/// flat objects (`{success, tools, count}`), so unknown top-level fields are
/// kept in `extra` instead of being dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResult<T> {
    #[serde(default)]
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<u64>,

    /// Failure detail reported with `success: false` by the test endpoints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl<T> ApiResult<T> {
    /// Borrow the payload, if the server sent one.
    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    /// Look up a top-level field that is not part of the standard envelope.
    pub fn field<U: DeserializeOwned>(&self, key: &str) -> Option<U> {
        self.extra
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

// ── Chat ─────────────────────────────────────────────────────────────

/// One persisted question/answer pair. Read-only on the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatExchange {
    #[serde(default)]
    pub id: Option<i64>,
    pub session_id: String,
    pub user_message: String,
    pub ai_response: String,
    #[serde(default)]
    pub create_time: Option<NaiveDateTime>,
    #[serde(default)]
    pub update_time: Option<NaiveDateTime>,
}

// ── Markets ──────────────────────────────────────────────────────────

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum Status {
    #[default]
    Enabled,
    Disabled,
}

/// A remote tool market the console can pull tools from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpMarket {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_config: Option<String>,
    #[serde(default)]
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<NaiveDateTime>,
}

/// A tool advertised by a market, possibly already loaded locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpMarketTool {
    #[serde(default)]
    pub id: Option<i64>,
    pub market_id: i64,
    pub tool_name: String,
    #[serde(default)]
    pub tool_description: Option<String>,
    #[serde(default)]
    pub tool_version: Option<String>,
    #[serde(default)]
    pub tool_metadata: Option<String>,
    #[serde(default)]
    pub is_loaded: bool,
    #[serde(default)]
    pub local_tool_id: Option<i64>,
    #[serde(default)]
    pub create_time: Option<NaiveDateTime>,
}

/// Query filters for the market list.
#[derive(Debug, Clone, Default)]
pub struct MarketFilter {
    pub status: Option<Status>,
    pub keyword: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BatchLoadRequest<'a> {
    pub tool_ids: &'a [i64],
}

// ── Tools ────────────────────────────────────────────────────────────

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum ToolType {
    Local,
    Remote,
}

/// A tool registered with the console.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpTool {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub tool_type: ToolType,
    #[serde(default)]
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_json: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<NaiveDateTime>,
}

/// Query filters for the tool list.
#[derive(Debug, Clone, Default)]
pub struct ToolFilter {
    pub tool_type: Option<ToolType>,
    pub status: Option<Status>,
    pub keyword: Option<String>,
}

// ── Connection tests ─────────────────────────────────────────────────

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum McpTransport {
    Sse,
    #[default]
    StreamableHttp,
}

/// Target of an ad-hoc MCP server probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpConnectionRequest {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport_type: Option<McpTransport>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

impl McpConnectionRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            transport_type: None,
            headers: BTreeMap::new(),
        }
    }
}

/// Ad-hoc tool invocation against an MCP server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpInvokeRequest {
    #[serde(flatten)]
    pub connection: McpConnectionRequest,
    pub tool_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Map<String, Value>>,
}

/// A tool as described by a probed MCP server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteToolDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub input_schema: Option<Value>,
}
