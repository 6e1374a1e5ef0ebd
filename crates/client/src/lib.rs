//! Client code for embedfix.
//!
//! This crate provides the upstream fetch transport, the post extraction
//! strategies, and the resolver that ties them to the cache.

pub mod extract;
pub mod fetch;
pub mod resolve;

pub use extract::{EmbedDocument, extract_embedded_script, normalize, parse_graphql_response};
pub use fetch::{FetchClient, FetchConfig, ProxySelector, RetryPolicy, Transport, UpstreamRequest};
pub use resolve::{Resolution, Resolver, Source};
