//! Stable error taxonomy and `application/problem+json` (RFC 9457) catalogue
//! for PEAC.
//!
//! Every PEAC error carries an [`ErrorCode`] (a machine-readable, stable
//! string tag that also doubles as the `code` extension member of a
//! [`Problem`]), a human-readable message, and arbitrary structured context.
//! [`Problem`] is the wire representation handed back at the enforcement
//! engine (C6) and edge verifier (C9) boundaries; narrower, local error
//! enums elsewhere in the workspace are not required to round-trip through
//! it.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// ErrorCategory
// ---------------------------------------------------------------------------

/// Broad family that an [`ErrorCode`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Receipt issuance / transport errors.
    Receipt,
    /// Ed25519 / detached-JWS signature errors.
    Signature,
    /// TAP (Trusted Agent Protocol) request-signing errors.
    Tap,
    /// Issuer / authentication errors.
    Auth,
    /// SSRF-safe fetcher errors.
    Ssrf,
    /// Wire schema / validation errors.
    Schema,
    /// Capture pipeline errors.
    Capture,
    /// Dispute / attribution lifecycle errors.
    Lifecycle,
    /// Configuration errors.
    Config,
    /// Catch-all for unexpected internal errors.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Receipt => "receipt",
            Self::Signature => "signature",
            Self::Tap => "tap",
            Self::Auth => "auth",
            Self::Ssrf => "ssrf",
            Self::Schema => "schema",
            Self::Capture => "capture",
            Self::Lifecycle => "lifecycle",
            Self::Config => "config",
            Self::Internal => "internal",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// ErrorCode
// ---------------------------------------------------------------------------

/// Machine-readable, stable error code.
///
/// Each variant serialises to a `SCREAMING_SNAKE_CASE` string that is
/// guaranteed not to change across patch releases, and doubles as the
/// final path segment of a [`Problem`]'s `type` URI (lower-kebab form via
/// [`ErrorCode::slug`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // -- Receipt / transport --
    /// No receipt was presented and none could be minted (402 challenge).
    ReceiptMissing,
    /// A presented receipt's `exp` has passed.
    ReceiptExpired,

    // -- Signature --
    /// Detached JWS signature did not verify.
    SignatureInvalid,
    /// The `kid` referenced by a signature could not be resolved.
    KeyNotFound,
    /// `iat`/`exp` fall outside the allowed clock skew.
    TimeInvalid,

    // -- TAP --
    /// The same `(issuer, keyid, nonce)` was already seen.
    TapNonceReplay,
    /// The signature's `created`/`expires` window exceeds the configured max.
    TapWindowTooLarge,
    /// A signed component tag was not recognised and not acknowledged.
    TapUnknownTag,
    /// The signature algorithm was not `EdDSA`.
    TapInvalidAlgorithm,

    // -- Auth --
    /// The issuer is not present in the configured allowlist.
    IssuerNotAllowlisted,

    // -- SSRF --
    /// DNS resolution returned a mix of public and private addresses.
    SsrfMixedDnsBlocked,
    /// Target resolved to a private/reserved IPv4 address.
    SsrfBlockedPrivateIpv4,
    /// Target resolved to a private/reserved IPv6 address.
    SsrfBlockedPrivateIpv6,

    // -- Schema --
    /// A wire payload failed schema or cross-field validation.
    SchemaInvalid,
    /// A JSON payload exceeded a bounded-safety limit (depth/keys/size).
    SchemaPayloadTooComplex,

    // -- Capture --
    /// The same action was captured twice in the same session.
    CaptureDuplicate,
    /// The action to capture was structurally invalid.
    CaptureInvalidAction,
    /// Hashing the action failed.
    CaptureHashFailed,
    /// The capture backend store failed.
    CaptureStoreFailed,
    /// The capture session was already closed.
    CaptureSessionClosed,
    /// An invariant was broken inside the capture pipeline.
    CaptureInternal,

    // -- Lifecycle --
    /// A dispute/workflow state transition was not in the allowed table.
    InvalidTransition,
    /// A terminal dispute state requires a `resolution` that was missing.
    ResolutionRequired,
    /// A non-terminal dispute state carried a `resolution` it must not.
    ResolutionNotAllowed,
    /// An attribution derivation graph would contain a cycle.
    AttributionCycle,

    // -- Config --
    /// Configuration file or value is invalid.
    ConfigInvalid,

    // -- Internal --
    /// Catch-all for unexpected internal errors.
    Internal,
}

impl ErrorCode {
    /// Returns the broad [`ErrorCategory`] this code belongs to.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ReceiptMissing | Self::ReceiptExpired => ErrorCategory::Receipt,
            Self::SignatureInvalid | Self::KeyNotFound | Self::TimeInvalid => {
                ErrorCategory::Signature
            }
            Self::TapNonceReplay
            | Self::TapWindowTooLarge
            | Self::TapUnknownTag
            | Self::TapInvalidAlgorithm => ErrorCategory::Tap,
            Self::IssuerNotAllowlisted => ErrorCategory::Auth,
            Self::SsrfMixedDnsBlocked
            | Self::SsrfBlockedPrivateIpv4
            | Self::SsrfBlockedPrivateIpv6 => ErrorCategory::Ssrf,
            Self::SchemaInvalid | Self::SchemaPayloadTooComplex => ErrorCategory::Schema,
            Self::CaptureDuplicate
            | Self::CaptureInvalidAction
            | Self::CaptureHashFailed
            | Self::CaptureStoreFailed
            | Self::CaptureSessionClosed
            | Self::CaptureInternal => ErrorCategory::Capture,
            Self::InvalidTransition
            | Self::ResolutionRequired
            | Self::ResolutionNotAllowed
            | Self::AttributionCycle => ErrorCategory::Lifecycle,
            Self::ConfigInvalid => ErrorCategory::Config,
            Self::Internal => ErrorCategory::Internal,
        }
    }

    /// Stable `&'static str` representation (e.g. `"RECEIPT_MISSING"`).
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReceiptMissing => "RECEIPT_MISSING",
            Self::ReceiptExpired => "RECEIPT_EXPIRED",
            Self::SignatureInvalid => "SIGNATURE_INVALID",
            Self::KeyNotFound => "KEY_NOT_FOUND",
            Self::TimeInvalid => "TIME_INVALID",
            Self::TapNonceReplay => "TAP_NONCE_REPLAY",
            Self::TapWindowTooLarge => "TAP_WINDOW_TOO_LARGE",
            Self::TapUnknownTag => "TAP_UNKNOWN_TAG",
            Self::TapInvalidAlgorithm => "TAP_INVALID_ALGORITHM",
            Self::IssuerNotAllowlisted => "ISSUER_NOT_ALLOWLISTED",
            Self::SsrfMixedDnsBlocked => "SSRF_MIXED_DNS_BLOCKED",
            Self::SsrfBlockedPrivateIpv4 => "SSRF_BLOCKED_PRIVATE_IPV4",
            Self::SsrfBlockedPrivateIpv6 => "SSRF_BLOCKED_PRIVATE_IPV6",
            Self::SchemaInvalid => "SCHEMA_INVALID",
            Self::SchemaPayloadTooComplex => "SCHEMA_PAYLOAD_TOO_COMPLEX",
            Self::CaptureDuplicate => "E_CAPTURE_DUPLICATE",
            Self::CaptureInvalidAction => "E_CAPTURE_INVALID_ACTION",
            Self::CaptureHashFailed => "E_CAPTURE_HASH_FAILED",
            Self::CaptureStoreFailed => "E_CAPTURE_STORE_FAILED",
            Self::CaptureSessionClosed => "E_CAPTURE_SESSION_CLOSED",
            Self::CaptureInternal => "E_CAPTURE_INTERNAL",
            Self::InvalidTransition => "INVALID_TRANSITION",
            Self::ResolutionRequired => "RESOLUTION_REQUIRED",
            Self::ResolutionNotAllowed => "RESOLUTION_NOT_ALLOWED",
            Self::AttributionCycle => "ATTRIBUTION_CYCLE",
            Self::ConfigInvalid => "CONFIG_INVALID",
            Self::Internal => "INTERNAL",
        }
    }

    /// Lower-kebab slug used as the final path segment of a problem `type`
    /// URI, e.g. `"receipt-missing"`.
    #[must_use]
    pub fn slug(&self) -> String {
        self.as_str().to_ascii_lowercase().replace(['_'], "-")
    }

    /// HTTP status code this code maps to, per the PEAC status-mapping
    /// table (malformed/unknown → 400, auth missing/invalid/expired → 401,
    /// receipt required → 402, issuer not allowlisted → 403, replay → 409,
    /// configuration/internal → 500).
    #[must_use]
    pub fn http_status(&self) -> u16 {
        match self {
            Self::ReceiptMissing => 402,
            Self::IssuerNotAllowlisted => 403,
            Self::TapNonceReplay => 409,
            Self::SignatureInvalid
            | Self::KeyNotFound
            | Self::TimeInvalid
            | Self::ReceiptExpired => 401,
            Self::TapWindowTooLarge | Self::TapUnknownTag | Self::TapInvalidAlgorithm => 400,
            Self::SchemaInvalid | Self::SchemaPayloadTooComplex => 400,
            Self::SsrfMixedDnsBlocked
            | Self::SsrfBlockedPrivateIpv4
            | Self::SsrfBlockedPrivateIpv6 => 400,
            Self::InvalidTransition | Self::ResolutionRequired | Self::ResolutionNotAllowed => {
                400
            }
            Self::AttributionCycle => 400,
            Self::CaptureDuplicate
            | Self::CaptureInvalidAction
            | Self::CaptureHashFailed
            | Self::CaptureStoreFailed
            | Self::CaptureSessionClosed
            | Self::CaptureInternal => 500,
            Self::ConfigInvalid | Self::Internal => 500,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Problem (RFC 9457)
// ---------------------------------------------------------------------------

/// Base URI for every PEAC problem `type`: `https://peacprotocol.org/problems/`.
pub const PROBLEM_BASE_URI: &str = "https://peacprotocol.org/problems/";

/// `application/problem+json` representation (RFC 9457) with a stable
/// `code` extension member.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Problem {
    /// Stable URI identifying the problem type.
    #[serde(rename = "type")]
    pub type_uri: String,
    /// Short, human-readable summary of the problem type.
    pub title: String,
    /// HTTP status code generating servers use for this response.
    pub status: u16,
    /// Human-readable explanation specific to this occurrence, sanitised.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// URI reference identifying the specific occurrence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    /// Stable machine-readable error code (extension member).
    pub code: ErrorCode,
    /// Arbitrary additional extension members.
    #[serde(flatten)]
    pub extensions: BTreeMap<String, serde_json::Value>,
}

impl Problem {
    /// Build a new problem from an [`ErrorCode`] and a title, with the
    /// status code filled in from [`ErrorCode::http_status`] and the type
    /// URI derived from [`ErrorCode::slug`].
    #[must_use]
    pub fn new(code: ErrorCode, title: impl Into<String>) -> Self {
        Self {
            type_uri: format!("{PROBLEM_BASE_URI}{}", code.slug()),
            title: title.into(),
            status: code.http_status(),
            detail: None,
            instance: None,
            code,
            extensions: BTreeMap::new(),
        }
    }

    /// Attach a sanitised detail message.
    #[must_use]
    pub fn with_detail(mut self, detail: impl AsRef<str>) -> Self {
        self.detail = Some(sanitize_detail(detail.as_ref()));
        self
    }

    /// Attach an instance URI/identifier.
    #[must_use]
    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }

    /// Attach an extension member. The value is converted via
    /// [`serde_json::to_value`]; if conversion fails the entry is skipped.
    #[must_use]
    pub fn with_extension(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.extensions.insert(key.into(), v);
        }
        self
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} ({})", self.code.as_str(), self.title, self.status)
    }
}

impl std::error::Error for Problem {}

// ---------------------------------------------------------------------------
// Detail sanitisation
// ---------------------------------------------------------------------------

/// Redact signature blobs, PEM blocks, bearer-style credentials, and raw IP
/// literals from a message before it is placed in a [`Problem::detail`].
///
/// This is best-effort pattern redaction, not a cryptographic guarantee; it
/// exists so that a thrown low-level error (which may embed a JWS, a PEM
/// block, or an `Authorization` header value) cannot leak those bytes
/// verbatim into a client-visible error body.
#[must_use]
pub fn sanitize_detail(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for line in input.lines() {
        if line.contains("BEGIN ") && line.contains("PRIVATE KEY") {
            out.push_str("[REDACTED-PEM]");
            out.push('\n');
            continue;
        }
        out.push_str(&redact_tokens(line));
        out.push('\n');
    }
    let mut result = out.trim_end().to_string();
    if result.is_empty() {
        result = redact_tokens(input);
    }
    result
}

fn redact_tokens(line: &str) -> String {
    let mut s = line.to_string();
    s = redact_prefixed(&s, "Bearer ");
    s = redact_prefixed(&s, "Basic ");
    s = redact_ipv4(&s);
    s
}

fn redact_prefixed(s: &str, prefix: &str) -> String {
    if let Some(idx) = s.find(prefix) {
        let (head, rest) = s.split_at(idx + prefix.len());
        let token_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let (_, tail) = rest.split_at(token_end);
        format!("{head}[REDACTED]{tail}")
    } else {
        s.to_string()
    }
}

fn redact_ipv4(s: &str) -> String {
    let parts: Vec<&str> = s.split_whitespace().collect();
    let mut words: Vec<String> = Vec::with_capacity(parts.len());
    for part in parts {
        let trimmed = part.trim_matches(|c: char| !c.is_ascii_alphanumeric() && c != '.');
        if is_ipv4_literal(trimmed) {
            words.push(part.replace(trimmed, "[REDACTED-IP]"));
        } else {
            words.push(part.to_string());
        }
    }
    words.join(" ")
}

fn is_ipv4_literal(s: &str) -> bool {
    let octets: Vec<&str> = s.split('.').collect();
    if octets.len() != 4 {
        return false;
    }
    octets
        .iter()
        .all(|o| !o.is_empty() && o.len() <= 3 && o.parse::<u8>().is_ok())
}

#[cfg(test)]
mod tests;
