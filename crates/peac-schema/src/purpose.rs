//! Purpose tokens.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical, known purpose vocabulary. Tokens outside this set are still
/// accepted (with reason `unknown_preserved`) — the set only governs
/// whether a reason other than `unknown_preserved` may be assigned.
pub const CANONICAL_PURPOSES: &[&str] = &["train", "search", "user_action", "inference", "index"];

/// Why a purpose was assigned the value it has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurposeReason {
    /// The purpose was explicitly allowed.
    Allowed,
    /// The purpose was allowed subject to constraints.
    Constrained,
    /// The purpose was explicitly denied.
    Denied,
    /// The purpose was downgraded from a broader one requested.
    Downgraded,
    /// No purpose was declared; a default applied.
    UndeclaredDefault,
    /// The token is outside [`CANONICAL_PURPOSES`] and was preserved as-is.
    UnknownPreserved,
}

/// Errors validating a [`PurposeToken`].
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum PurposeTokenError {
    /// Exceeded the 64-character limit.
    #[error("purpose token exceeds 64 characters")]
    TooLong,
    /// Did not match `^[a-z](?:[a-z0-9_-]*[a-z0-9])?(?::[a-z](?:[a-z0-9_-]*[a-z0-9])?)?$`.
    #[error("purpose token {0:?} does not match the required shape")]
    MalformedShape(String),
}

/// A validated purpose token: `^[a-z](?:[a-z0-9_-]*[a-z0-9])?(?::[a-z](?:[a-z0-9_-]*[a-z0-9])?)?$`,
/// max 64 chars.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PurposeToken(String);

impl PurposeToken {
    /// Validate and construct a purpose token.
    pub fn new(value: impl Into<String>) -> Result<Self, PurposeTokenError> {
        let value = value.into();
        if value.len() > 64 {
            return Err(PurposeTokenError::TooLong);
        }
        if !is_valid_shape(&value) {
            return Err(PurposeTokenError::MalformedShape(value));
        }
        Ok(Self(value))
    }

    /// Whether this token is in [`CANONICAL_PURPOSES`].
    #[must_use]
    pub fn is_canonical(&self) -> bool {
        CANONICAL_PURPOSES.contains(&self.0.as_str())
    }

    /// The underlying string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PurposeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for PurposeToken {
    type Error = PurposeTokenError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PurposeToken> for String {
    fn from(value: PurposeToken) -> Self {
        value.0
    }
}

fn is_valid_shape(s: &str) -> bool {
    let (head, tail) = match s.split_once(':') {
        Some((h, t)) => (h, Some(t)),
        None => (s, None),
    };
    is_valid_segment(head) && tail.is_none_or(is_valid_segment)
}

fn is_valid_segment(s: &str) -> bool {
    let bytes = s.as_bytes();
    if bytes.is_empty() {
        return false;
    }
    if !bytes[0].is_ascii_lowercase() {
        return false;
    }
    if bytes.len() == 1 {
        return true;
    }
    let last = bytes[bytes.len() - 1];
    if !(last.is_ascii_lowercase() || last.is_ascii_digit()) {
        return false;
    }
    bytes[1..bytes.len() - 1]
        .iter()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || *b == b'_' || *b == b'-')
}
