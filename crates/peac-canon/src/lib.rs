//! JSON Canonicalization Scheme (RFC 8785) and the policy URI / policy hash
//! rules built on top of it.
//!
//! Every signed or hashed artifact in PEAC — a policy hash, a spool entry
//! digest, a detached JWS signature base, a binding-message hash — is
//! computed over the bytes [`to_jcs`] produces, never over
//! `serde_json::to_string`'s output, because object key order and number
//! formatting are otherwise implementation-defined.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

mod number;
mod uri;

pub use uri::normalize_policy_uri;

/// Errors produced while canonicalising a JSON value.
#[derive(Debug, thiserror::Error)]
pub enum CanonError {
    /// A `NaN` or infinite floating point number was encountered; JCS has
    /// no representation for non-finite numbers.
    #[error("non-finite number cannot be canonicalised")]
    NonFiniteNumber,
    /// The caller asked to canonicalise an absent top-level value (e.g. via
    /// [`to_jcs_opt`] with `None`).
    #[error("top-level value is missing")]
    TopLevelMissing,
    /// The policy URI failed RFC 3986 parsing or normalisation.
    #[error("invalid policy URI: {0}")]
    InvalidUri(String),
    /// Serialising the input to a `serde_json::Value` failed.
    #[error("failed to serialize value: {0}")]
    Json(#[from] serde_json::Error),
}

/// Serialise `value` to its canonical JCS (RFC 8785) byte representation.
///
/// # Examples
/// ```
/// use serde_json::json;
/// let v = json!({"b": 1, "a": 2});
/// assert_eq!(peac_canon::to_jcs(&v).unwrap(), r#"{"a":2,"b":1}"#);
/// ```
pub fn to_jcs(value: &impl Serialize) -> Result<String, CanonError> {
    let v = serde_json::to_value(value)?;
    to_jcs_value(&v)
}

/// Like [`to_jcs`] but for an already-constructed [`Value`], avoiding a
/// re-serialise round trip. Used by callers (e.g. C6's policy normalisation)
/// that build or rewrite a `Value` before hashing.
pub fn to_jcs_value(value: &Value) -> Result<String, CanonError> {
    let mut out = String::new();
    write_value(value, &mut out)?;
    Ok(out)
}

/// Canonicalise an optional top-level value, failing with
/// [`CanonError::TopLevelMissing`] when `value` is `None` rather than
/// silently producing `"null"`.
pub fn to_jcs_opt(value: Option<&impl Serialize>) -> Result<String, CanonError> {
    match value {
        Some(v) => to_jcs(v),
        None => Err(CanonError::TopLevelMissing),
    }
}

/// SHA-256 over the JCS canonical form of `value`, base64url-encoded
/// (no padding).
pub fn jcs_sha256_b64url(value: &impl Serialize) -> Result<String, CanonError> {
    let canonical = to_jcs(value)?;
    let digest = Sha256::digest(canonical.as_bytes());
    Ok(base64url_nopad(&digest))
}

/// `policy_hash = base64url(SHA-256(JCS({"policy_uri": normalize(uri), "policy": policy})))`.
///
/// The normalised policy URI is bound into the hashed envelope alongside the
/// policy body so that two distinct URIs serving byte-identical policy JSON
/// do not collide, and so that trivial URI variation (scheme case, default
/// port, dot segments) does not change the hash.
pub fn policy_hash(uri: &str, policy: &Value) -> Result<String, CanonError> {
    let normalized = normalize_policy_uri(uri)?;
    let envelope = serde_json::json!({
        "policy_uri": normalized,
        "policy": policy,
    });
    jcs_sha256_b64url(&envelope)
}

fn base64url_nopad(bytes: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

fn write_value(value: &Value, out: &mut String) -> Result<(), CanonError> {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&number::format_number(n)?),
        Value::String(s) => write_json_string(s, out),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(item, out)?;
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&str> = map.keys().map(String::as_str).collect();
            keys.sort_by(|a, b| utf16_cmp(a, b));
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_json_string(key, out);
                out.push(':');
                write_value(&map[*key], out)?;
            }
            out.push('}');
        }
    }
    Ok(())
}

/// JSON string escaping is the same under JCS as under RFC 8259;
/// `serde_json`'s own string serialisation already produces the minimal
/// escaped form JCS requires.
fn write_json_string(s: &str, out: &mut String) {
    out.push_str(&serde_json::to_string(s).expect("string serialisation is infallible"));
}

/// Compare two strings by UTF-16 code unit order, per RFC 8785 §3.2.3.
/// This differs from naive UTF-8 byte ordering for supplementary-plane
/// characters (U+10000 and above), which encode as surrogate pairs whose
/// code units are numerically larger than any BMP character's.
fn utf16_cmp(a: &str, b: &str) -> std::cmp::Ordering {
    a.encode_utf16().cmp(b.encode_utf16())
}
