//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use crate::tools::{CacheSweepParams, PostResolveParams, resolve_impl, sweep_impl};

use embedfix_client::Resolver;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The main MCP server handler for embedfix.
#[derive(Clone)]
pub struct EmbedfixServer {
    resolver: Resolver,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl EmbedfixServer {
    /// Create a new server handler around a resolver.
    pub fn new(resolver: Resolver) -> Self {
        Self { resolver, tool_router: Self::tool_router() }
    }

    /// Resolve a post to its owner, caption and media.
    ///
    /// Served from the cache when possible; otherwise the embed document is fetched
    /// and the result cached for the configured TTL.
    #[tool(
        description = "Resolve a post id to its username, caption and media URLs. Returns the record and the strategy that produced it."
    )]
    async fn post_resolve(&self, params: Parameters<PostResolveParams>) -> Result<CallToolResult, McpError> {
        resolve_impl(&self.resolver, params.0).await
    }

    /// Remove expired cache records now.
    #[tool(description = "Delete expired cached posts immediately. Returns the number of records deleted.")]
    async fn cache_sweep(&self, params: Parameters<CacheSweepParams>) -> Result<CallToolResult, McpError> {
        sweep_impl(self.resolver.cache(), params.0).await
    }
}

impl ServerHandler for EmbedfixServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "embedfix".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
