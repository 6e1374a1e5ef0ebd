//! Post resolution pipeline.
//!
//! ### Flow
//! - Cache lookup; a hit returns immediately
//! - Fetch the embed document once
//! - Embedded script payload, when present and well-formed, wins outright
//! - Otherwise embed HTML; a blocked video or missing username consults GraphQL
//! - Normalize, persist with a fresh expiry, return
//!
//! ### Failures
//! - Parse failures of the script or GraphQL stage fall through to the next
//!   strategy; an undecodable embed document fails the resolution
//! - Transport and cache failures propagate unchanged
//! - `NotFound` is logged as a warning and never cached

use std::sync::Arc;

use embedfix_core::{Error, Record, TtlCache, validate_post_id};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::extract::{EmbedDocument, extract_embedded_script, normalize, parse_graphql_response};
use crate::fetch::{Transport, embed_request, graphql_request};

/// Where a resolved record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Cache,
    EmbeddedScript,
    EmbedHtml,
    #[serde(rename = "graphql")]
    GraphQl,
}

/// A resolved record and the strategy that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub record: Record,
    pub source: Source,
}

/// Resolves post ids to records through the cache and the extractor chain.
#[derive(Clone)]
pub struct Resolver {
    cache: TtlCache,
    transport: Arc<dyn Transport>,
}

impl Resolver {
    pub fn new(cache: TtlCache, transport: Arc<dyn Transport>) -> Self {
        Self { cache, transport }
    }

    pub fn cache(&self) -> &TtlCache {
        &self.cache
    }

    /// Resolve a post id to its record.
    pub async fn resolve(&self, id: &str) -> Result<Record, Error> {
        self.resolve_with_source(id).await.map(|resolution| resolution.record)
    }

    /// Resolve a post id, reporting which strategy produced the record.
    pub async fn resolve_with_source(&self, id: &str) -> Result<Resolution, Error> {
        let result = self.run(id).await;
        match &result {
            Ok(resolution) => {
                tracing::info!(post_id = %id, source = ?resolution.source, "resolved post");
            }
            Err(e) if e.is_expected() => tracing::warn!(post_id = %id, error = %e, "post not found"),
            Err(e) => tracing::error!(post_id = %id, error = %e, "failed to resolve post"),
        }
        result
    }

    async fn run(&self, id: &str) -> Result<Resolution, Error> {
        validate_post_id(id)?;

        if let Some(record) = self.cache.get(id).await? {
            return Ok(Resolution { record, source: Source::Cache });
        }

        let (data, source) = self.fetch_data(id).await?;
        let record = normalize(id, &data)?;
        let expires_at = self.cache.put(&record).await?;
        tracing::debug!(post_id = %id, %expires_at, "cached post");

        Ok(Resolution { record, source })
    }

    async fn fetch_data(&self, id: &str) -> Result<(Value, Source), Error> {
        let body = self.transport.fetch(&embed_request(id)?).await?;

        match extract_embedded_script(&body) {
            Ok(Some(data)) => return Ok((data, Source::EmbeddedScript)),
            Ok(None) => {}
            Err(e) => tracing::warn!(post_id = %id, error = %e, "embedded script unusable, trying embed HTML"),
        }

        let doc = EmbedDocument::parse(&body)?;
        if doc.needs_fallback() {
            tracing::debug!(post_id = %id, video_blocked = doc.video_blocked, "querying GraphQL fallback");
            let response = self.transport.fetch(&graphql_request(id)?).await?;
            match parse_graphql_response(&response) {
                Ok(Some(data)) => return Ok((data, Source::GraphQl)),
                Ok(None) => tracing::debug!(post_id = %id, "GraphQL response has no data"),
                Err(e) => tracing::warn!(post_id = %id, error = %e, "GraphQL response unusable"),
            }
        }

        if doc.username.is_empty() {
            return Err(Error::NotFound(format!("no username found for post {id}")));
        }
        Ok((doc.to_value(), Source::EmbedHtml))
    }
}
