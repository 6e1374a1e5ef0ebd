//! MCP tool implementations.
//!
//! This module contains all tools exposed by the embedfix server.

pub mod cache_sweep;
pub mod post_resolve;

pub use cache_sweep::{CacheSweepOutput, CacheSweepParams, sweep_impl};
pub use post_resolve::{PostResolveOutput, PostResolveParams, resolve_impl};
