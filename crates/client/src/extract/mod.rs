//! Post data extraction strategies.
//!
//! ### Embedded script
//! - Last `TimeSliceImpl` line, first string literal mentioning `shortcode_media`
//! - Literal is unescaped and parsed; its `gql_data` is the result
//!
//! ### Embed HTML
//! - Media, username and caption read from the embed document's classes
//! - Flags blocked videos so the GraphQL fallback can be consulted
//!
//! ### GraphQL
//! - `data` of the persisted shortcode query
//!
//! All three produce a `shortcode_media` object that [`normalize`] turns into
//! a [`Record`](embedfix_core::Record).

pub mod embed;
pub mod graphql;
pub mod marker;
pub mod normalize;
pub mod script;

pub use embed::EmbedDocument;
pub use graphql::parse_graphql_response;
pub use marker::{MarkerMatch, MarkerScanner, TIME_SLICE_MARKER};
pub use normalize::normalize;
pub use script::extract_embedded_script;
