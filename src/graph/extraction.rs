//! Endpoint extraction from relationship strings (regex-based).

use regex::Regex;
use std::sync::OnceLock;

use super::Endpoints;

fn endpoint_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // "(Book)<-[WROTE]-(Person)": a word in parens at both ends, anything between
    PATTERN.get_or_init(|| Regex::new(r"^\((\w+)\).+\((\w+)\)$").expect("Invalid regex pattern"))
}

/// Extract the two Item names from a relationship string.
///
/// Returns `None` when the string does not follow the `(X)...(Y)` shape; that is
/// not an error, the relationship simply has no derived endpoints. Names are
/// returned as written; the Item write path normalizes them.
pub fn derive_endpoints(relationship_str: &str) -> Option<Endpoints> {
    let caps = endpoint_pattern().captures(relationship_str)?;
    Some(Endpoints {
        from: caps.get(1)?.as_str().to_string(),
        to: caps.get(2)?.as_str().to_string(),
    })
}
