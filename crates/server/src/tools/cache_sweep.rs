//! cache_sweep tool implementation.
//!
//! Removes expired records immediately instead of waiting for the background sweeper.

use embedfix_core::{Error, TtlCache};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the cache_sweep tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheSweepParams {}

/// Output from the cache_sweep tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheSweepOutput {
    /// Number of records deleted.
    pub deleted: u64,
}

/// Implementation of the cache_sweep tool.
pub async fn sweep_impl(cache: &TtlCache, _params: CacheSweepParams) -> Result<CallToolResult, McpError> {
    let deleted = cache.sweep().await?;

    let output = CacheSweepOutput { deleted };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::Parse(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
