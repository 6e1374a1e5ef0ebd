//! GraphQL fallback response parsing.

use embedfix_core::Error;
use serde_json::Value;

/// The `data` object of a GraphQL shortcode response.
///
/// Returns `Ok(None)` when `data` is absent or null.
pub fn parse_graphql_response(body: &[u8]) -> Result<Option<Value>, Error> {
    let mut value: Value =
        serde_json::from_slice(body).map_err(|e| Error::Parse(format!("GraphQL response is not JSON: {e}")))?;

    match value.get_mut("data").map(Value::take) {
        Some(data) if !data.is_null() => Ok(Some(data)),
        _ => Ok(None),
    }
}
