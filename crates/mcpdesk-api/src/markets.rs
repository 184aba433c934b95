// Tool market endpoints
//
// Markets are remote catalogues; their tools are mirrored locally on
// `refresh` and promoted to registered tools on `load`.

use serde_json::Value;
use tracing::debug;

use crate::error::Error;
use crate::gateway::{CallOptions, Gateway};
use crate::models::{ApiResult, BatchLoadRequest, MarketFilter, McpMarket, McpMarketTool, Status};

impl Gateway {
    /// `GET /mcp/markets?status=..&keyword=..`
    pub async fn list_markets(
        &self,
        filter: &MarketFilter,
    ) -> Result<ApiResult<Vec<McpMarket>>, Error> {
        let options = CallOptions::new()
            .param("status", filter.status)
            .param("keyword", filter.keyword.as_deref().filter(|k| !k.is_empty()));
        self.get("mcp/markets", options).await
    }

    /// `GET /mcp/markets/{id}`
    pub async fn get_market(&self, id: i64) -> Result<ApiResult<McpMarket>, Error> {
        self.get(&format!("mcp/markets/{id}"), CallOptions::new()).await
    }

    /// Tools mirrored from a market, paginated server-side.
    ///
    /// `GET /mcp/markets/{id}/tools?page=..&size=..`
    pub async fn market_tools(
        &self,
        market_id: i64,
        page: Option<u32>,
        size: Option<u32>,
    ) -> Result<ApiResult<Vec<McpMarketTool>>, Error> {
        let options = CallOptions::new().param("page", page).param("size", size);
        self.get(&format!("mcp/markets/{market_id}/tools"), options).await
    }

    /// `POST /mcp/markets`
    pub async fn create_market(&self, market: &McpMarket) -> Result<ApiResult<McpMarket>, Error> {
        self.post("mcp/markets", CallOptions::new().json(market)?).await
    }

    /// `PUT /mcp/markets/{id}`
    pub async fn update_market(
        &self,
        id: i64,
        market: &McpMarket,
    ) -> Result<ApiResult<McpMarket>, Error> {
        self.put(&format!("mcp/markets/{id}"), CallOptions::new().json(market)?).await
    }

    /// `DELETE /mcp/markets/{id}`
    pub async fn delete_market(&self, id: i64) -> Result<ApiResult<Value>, Error> {
        debug!(id, "deleting market");
        self.delete(&format!("mcp/markets/{id}"), CallOptions::new()).await
    }

    /// `PUT /mcp/markets/{id}/status?status=..`
    pub async fn set_market_status(
        &self,
        id: i64,
        status: Status,
    ) -> Result<ApiResult<Value>, Error> {
        let options = CallOptions::new().param("status", Some(status));
        self.put(&format!("mcp/markets/{id}/status"), options).await
    }

    /// Re-fetch the market's catalogue.
    ///
    /// `POST /mcp/markets/{id}/refresh`
    pub async fn refresh_market(&self, id: i64) -> Result<ApiResult<Value>, Error> {
        debug!(id, "refreshing market tools");
        self.post(&format!("mcp/markets/{id}/refresh"), CallOptions::new()).await
    }

    /// Register one market tool as a local tool.
    ///
    /// `POST /mcp/markets/tools/{tool_id}/load`
    pub async fn load_market_tool(&self, tool_id: i64) -> Result<ApiResult<Value>, Error> {
        self.post(&format!("mcp/markets/tools/{tool_id}/load"), CallOptions::new()).await
    }

    /// `POST /mcp/markets/tools/batch-load` with `{"toolIds": [..]}`
    pub async fn batch_load_market_tools(
        &self,
        tool_ids: &[i64],
    ) -> Result<ApiResult<Value>, Error> {
        debug!(count = tool_ids.len(), "batch-loading market tools");
        let options = CallOptions::new().json(&BatchLoadRequest { tool_ids })?;
        self.post("mcp/markets/tools/batch-load", options).await
    }
}
