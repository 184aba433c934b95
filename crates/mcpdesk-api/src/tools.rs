// Registered tool endpoints

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::Error;
use crate::gateway::{CallOptions, Gateway};
use crate::models::{ApiResult, McpTool, Status, ToolFilter};

impl Gateway {
    /// `GET /mcp/tools?type=..&status=..&keyword=..`
    pub async fn list_tools(&self, filter: &ToolFilter) -> Result<ApiResult<Vec<McpTool>>, Error> {
        let options = CallOptions::new()
            .param("type", filter.tool_type)
            .param("status", filter.status)
            .param("keyword", filter.keyword.as_deref().filter(|k| !k.is_empty()));
        self.get("mcp/tools", options).await
    }

    /// `GET /mcp/tools/{id}`
    pub async fn get_tool(&self, id: i64) -> Result<ApiResult<McpTool>, Error> {
        self.get(&format!("mcp/tools/{id}"), CallOptions::new()).await
    }

    /// `POST /mcp/tools`
    pub async fn create_tool(&self, tool: &McpTool) -> Result<ApiResult<McpTool>, Error> {
        self.post("mcp/tools", CallOptions::new().json(tool)?).await
    }

    /// `PUT /mcp/tools/{id}`
    pub async fn update_tool(&self, id: i64, tool: &McpTool) -> Result<ApiResult<McpTool>, Error> {
        self.put(&format!("mcp/tools/{id}"), CallOptions::new().json(tool)?).await
    }

    /// `DELETE /mcp/tools/{id}`
    pub async fn delete_tool(&self, id: i64) -> Result<ApiResult<Value>, Error> {
        debug!(id, "deleting tool");
        self.delete(&format!("mcp/tools/{id}"), CallOptions::new()).await
    }

    /// `DELETE /mcp/tools/batch?ids=1,2,3`
    pub async fn delete_tools(&self, ids: &[i64]) -> Result<ApiResult<Value>, Error> {
        let joined = ids
            .iter()
            .map(i64::to_string)
            .collect::<Vec<_>>()
            .join(",");
        debug!(ids = %joined, "deleting tools");
        self.delete("mcp/tools/batch", CallOptions::new().param("ids", Some(joined))).await
    }

    /// `PUT /mcp/tools/{id}/status?status=..`
    pub async fn set_tool_status(
        &self,
        id: i64,
        status: Status,
    ) -> Result<ApiResult<Value>, Error> {
        let options = CallOptions::new().param("status", Some(status));
        self.put(&format!("mcp/tools/{id}/status"), options).await
    }

    /// Run a tool server-side with optional arguments.
    ///
    /// `POST /mcp/tools/test/{id}`
    pub async fn test_tool(
        &self,
        id: i64,
        arguments: Option<&Map<String, Value>>,
    ) -> Result<ApiResult<Value>, Error> {
        let mut options = CallOptions::new();
        if let Some(arguments) = arguments {
            options = options.json(arguments)?;
        }
        self.post(&format!("mcp/tools/test/{id}"), options).await
    }

    /// `GET /mcp/tools/info/{id}`
    pub async fn tool_info(&self, id: i64) -> Result<ApiResult<Value>, Error> {
        self.get(&format!("mcp/tools/info/{id}"), CallOptions::new()).await
    }
}
