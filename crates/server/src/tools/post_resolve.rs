//! post_resolve tool implementation.
//!
//! Resolves a post id through the cache and the extractor chain.

use embedfix_client::{Resolver, Source};
use embedfix_core::{Error, Record};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the post_resolve tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PostResolveParams {
    /// Post shortcode, e.g. `CxYz123`.
    pub id: String,
}

/// Output from the post_resolve tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PostResolveOutput {
    pub record: Record,
    /// Strategy that produced the record.
    pub source: Source,
}

/// Implementation of the post_resolve tool.
pub async fn resolve_impl(resolver: &Resolver, params: PostResolveParams) -> Result<CallToolResult, McpError> {
    let id = params.id.trim();
    let resolution = resolver.resolve_with_source(id).await?;

    let output = PostResolveOutput { record: resolution.record, source: resolution.source };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::Parse(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use embedfix_client::{Transport, UpstreamRequest};
    use embedfix_core::{CacheDb, MediaItem, TtlCache};
    use std::sync::Arc;

    /// Transport that fails every request.
    struct Offline;

    #[async_trait]
    impl Transport for Offline {
        async fn fetch(&self, _request: &UpstreamRequest) -> Result<Bytes, Error> {
            Err(Error::Transport("offline".into()))
        }
    }

    async fn resolver() -> Resolver {
        let db = CacheDb::open_in_memory().await.unwrap();
        Resolver::new(TtlCache::new(db), Arc::new(Offline))
    }

    fn output_of(result: &CallToolResult) -> PostResolveOutput {
        let content_val = serde_json::to_value(&result.content[0]).unwrap();
        let text = content_val
            .get("text")
            .and_then(|v| v.as_str())
            .expect("Expected text field in content");
        serde_json::from_str(text).unwrap()
    }

    #[tokio::test]
    async fn test_resolve_cached_post() {
        let resolver = resolver().await;
        let record = Record {
            id: "CxYz123".into(),
            username: "someone".into(),
            caption: "hello".into(),
            media: vec![MediaItem { kind: "GraphImage".into(), url: "https://cdn.example/a.jpg".into() }],
        };
        resolver.cache().put(&record).await.unwrap();

        let params = PostResolveParams { id: " CxYz123 ".into() };
        let result = resolve_impl(&resolver, params).await.unwrap();
        let output = output_of(&result);
        assert_eq!(output.record, record);
        assert_eq!(output.source, Source::Cache);
    }

    #[tokio::test]
    async fn test_invalid_id() {
        let params = PostResolveParams { id: "not/a/post".into() };
        let err = resolve_impl(&resolver().await, params).await.unwrap_err();
        assert_eq!(err.code.0, -32602);
    }

    #[tokio::test]
    async fn test_transport_failure() {
        let params = PostResolveParams { id: "CxYz123".into() };
        let err = resolve_impl(&resolver().await, params).await.unwrap_err();
        assert_eq!(err.code.0, -32003);
    }
}
