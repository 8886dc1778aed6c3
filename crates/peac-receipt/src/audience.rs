//! Request/response context and audience derivation.

use std::collections::HashMap;

/// A minimal, framework-agnostic view of an inbound request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// The HTTP method, as received (case is normalised by [`derive_audience`]
    /// and claim construction, not here).
    pub method: String,
    /// The request path, without query string.
    pub path: String,
    /// The raw query string, without the leading `?`, if any.
    pub query: Option<String>,
    /// Request headers. Multi-valued headers are represented as a `Vec`;
    /// lookups in this module are case-insensitive on the header name.
    pub headers: HashMap<String, Vec<String>>,
    /// When the request was received, Unix seconds.
    pub timestamp: i64,
}

/// A minimal, framework-agnostic view of an outbound response.
#[derive(Debug, Clone)]
pub struct ResponseContext {
    /// The HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HashMap<String, Vec<String>>,
    /// The response body, if buffered and available for wrapping.
    pub body: Option<Vec<u8>>,
}

fn header_first(headers: &HashMap<String, Vec<String>>, name: &str) -> Option<String> {
    headers.iter().find_map(|(k, v)| {
        if k.eq_ignore_ascii_case(name) {
            v.first().cloned()
        } else {
            None
        }
    })
}

/// Derive the receipt audience from a request: `Host` header, then
/// `Origin` header (both case-insensitive on the header name, taking the
/// first value when multi-valued), falling back to
/// `https://localhost{path}` if neither is present.
#[must_use]
pub fn derive_audience(ctx: &RequestContext) -> String {
    if let Some(host) = header_first(&ctx.headers, "host") {
        return format!("https://{host}");
    }
    if let Some(origin) = header_first(&ctx.headers, "origin") {
        return origin;
    }
    format!("https://localhost{}", ctx.path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&str, &[&str])]) -> HashMap<String, Vec<String>> {
        pairs
            .iter()
            .map(|(k, vs)| {
                (
                    (*k).to_string(),
                    vs.iter().map(|v| (*v).to_string()).collect(),
                )
            })
            .collect()
    }

    fn ctx(headers: HashMap<String, Vec<String>>) -> RequestContext {
        RequestContext {
            method: "get".to_string(),
            path: "/widgets".to_string(),
            query: None,
            headers,
            timestamp: 0,
        }
    }

    #[test]
    fn host_header_wins_when_present() {
        let ctx = ctx(headers(&[
            ("Host", &["api.example.com"]),
            ("Origin", &["https://other.example"]),
        ]));
        assert_eq!(derive_audience(&ctx), "https://api.example.com");
    }

    #[test]
    fn host_lookup_is_case_insensitive() {
        let ctx = ctx(headers(&[("HOST", &["api.example.com"])]));
        assert_eq!(derive_audience(&ctx), "https://api.example.com");
    }

    #[test]
    fn falls_back_to_origin_without_host() {
        let ctx = ctx(headers(&[("Origin", &["https://other.example"])]));
        assert_eq!(derive_audience(&ctx), "https://other.example");
    }

    #[test]
    fn falls_back_to_localhost_path_without_either() {
        let ctx = ctx(HashMap::new());
        assert_eq!(derive_audience(&ctx), "https://localhost/widgets");
    }

    #[test]
    fn multi_valued_header_uses_first_value() {
        let ctx = ctx(headers(&[("Host", &["first.example", "second.example"])]));
        assert_eq!(derive_audience(&ctx), "https://first.example");
    }
}
