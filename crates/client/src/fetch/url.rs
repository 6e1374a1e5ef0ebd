//! Upstream URL construction for post lookups.

use embedfix_core::Error;
use url::Url;

/// Origin serving embed documents and the GraphQL endpoint.
pub const UPSTREAM_ORIGIN: &str = "https://www.instagram.com";

/// Persisted query used for the shortcode fallback lookup.
pub const GRAPHQL_QUERY_HASH: &str = "b3055c01b4b222b8a47dc12b090e4e64";

/// A single upstream GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamRequest {
    pub url: Url,
    /// `Referer` header value, if any.
    pub referer: Option<String>,
}

/// Canonical page URL of a post.
pub fn post_url(id: &str) -> String {
    format!("{UPSTREAM_ORIGIN}/p/{id}/")
}

/// Request for the captioned embed document of a post.
pub fn embed_request(id: &str) -> Result<UpstreamRequest, Error> {
    let url = Url::parse(&format!("{UPSTREAM_ORIGIN}/p/{id}/embed/captioned/"))
        .map_err(|e| Error::InvalidInput(format!("invalid post id {id}: {e}")))?;
    Ok(UpstreamRequest { url, referer: None })
}

/// Request for the GraphQL shortcode query, referred from the post page.
pub fn graphql_request(id: &str) -> Result<UpstreamRequest, Error> {
    let mut url = Url::parse(&format!("{UPSTREAM_ORIGIN}/graphql/query/"))
        .map_err(|e| Error::InvalidInput(e.to_string()))?;
    let variables = serde_json::json!({ "shortcode": id }).to_string();
    url.query_pairs_mut()
        .append_pair("query_hash", GRAPHQL_QUERY_HASH)
        .append_pair("variables", &variables);
    Ok(UpstreamRequest { url, referer: Some(post_url(id)) })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embed_request() {
        let req = embed_request("CxYz123").unwrap();
        assert_eq!(req.url.as_str(), "https://www.instagram.com/p/CxYz123/embed/captioned/");
        assert!(req.referer.is_none());
    }

    #[test]
    fn test_graphql_request_query() {
        let req = graphql_request("CxYz123").unwrap();
        assert_eq!(req.url.path(), "/graphql/query/");

        let pairs: Vec<(String, String)> = req.url.query_pairs().into_owned().collect();
        assert_eq!(pairs[0], ("query_hash".to_string(), GRAPHQL_QUERY_HASH.to_string()));
        assert_eq!(pairs[1], ("variables".to_string(), r#"{"shortcode":"CxYz123"}"#.to_string()));
    }

    #[test]
    fn test_graphql_request_referer() {
        let req = graphql_request("abc").unwrap();
        assert_eq!(req.referer.as_deref(), Some("https://www.instagram.com/p/abc/"));
    }
}
