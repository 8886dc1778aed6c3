//! Policy URI normalisation: lower-case scheme/host, strip
//! default ports, resolve dot-segments, minimally percent-decode, preserve
//! trailing slash and query order.

use crate::CanonError;
use url::Url;

/// Normalise a policy URI: lower-case scheme and host, strip a
/// default port (80 for `http`, 443 for `https`), resolve `.`/`..` path
/// segments, decode only percent-encoded *unreserved* characters, and
/// otherwise preserve the trailing slash and query string verbatim.
pub fn normalize_policy_uri(uri: &str) -> Result<String, CanonError> {
    let url = Url::parse(uri).map_err(|e| CanonError::InvalidUri(e.to_string()))?;

    // `Url` already lower-cases scheme and host, resolves dot-segments in
    // the path, and omits the port when it matches the scheme's default —
    // the remaining work is the unreserved-only percent-decode pass.
    let mut out = String::new();
    out.push_str(url.scheme());
    out.push_str("://");
    if let Some(host) = url.host_str() {
        out.push_str(host);
    }
    if let Some(port) = url.port() {
        out.push(':');
        out.push_str(&port.to_string());
    }
    out.push_str(&decode_unreserved(url.path()));
    if let Some(query) = url.query() {
        out.push('?');
        out.push_str(query);
    }
    if let Some(fragment) = url.fragment() {
        out.push('#');
        out.push_str(fragment);
    }
    Ok(out)
}

fn is_unreserved(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~')
}

/// Decode `%XX` sequences that encode an RFC 3986 unreserved character,
/// leaving every other percent-encoded sequence (reserved characters,
/// invalid UTF-8) untouched and re-encoded with uppercase hex digits, as
/// RFC 3986 §2.1 and §6.2.2.1 require for normalisation.
fn decode_unreserved(path: &str) -> String {
    let bytes = path.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_val(bytes[i + 1]), hex_val(bytes[i + 2])) {
                let decoded = hi * 16 + lo;
                if is_unreserved(decoded) {
                    out.push(decoded);
                } else {
                    out.push(b'%');
                    out.push(bytes[i + 1].to_ascii_uppercase());
                    out.push(bytes[i + 2].to_ascii_uppercase());
                }
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    // The input was valid UTF-8 and every byte we emit is either taken
    // verbatim from it or is ASCII, so the result is valid UTF-8 too.
    String::from_utf8(out).expect("normalisation preserves UTF-8 validity")
}

fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
