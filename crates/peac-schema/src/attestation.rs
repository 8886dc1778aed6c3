//! Attestations: agent-identity, attribution, dispute, and
//! workflow-summary share one envelope shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default clock skew tolerance for `expires_at` checks.
pub const DEFAULT_CLOCK_SKEW_SECS: i64 = 30;

/// An attestation of one of the known kinds, sharing the common envelope
/// shape `{type: "peac/<kind>", issuer, issued_at, expires_at?, ref?, evidence}`.
/// Closed shape — unknown fields are rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Attestation {
    /// Always `"peac/<kind>"`, e.g. `"peac/agent-identity"`.
    #[serde(rename = "type")]
    pub type_: String,
    /// The party that issued this attestation.
    pub issuer: String,
    /// When this attestation was issued.
    pub issued_at: DateTime<Utc>,
    /// When this attestation expires, if it does.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// A reference to the subject this attestation concerns.
    #[serde(rename = "ref", skip_serializing_if = "Option::is_none")]
    pub ref_: Option<String>,
    /// Kind-specific evidence payload.
    pub evidence: serde_json::Value,
}

/// The known attestation kinds, as the suffix of `Attestation::type_`
/// after the `peac/` prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttestationKind {
    /// `peac/agent-identity`.
    AgentIdentity,
    /// `peac/attribution`.
    Attribution,
    /// `peac/dispute`.
    Dispute,
    /// `peac/workflow-summary`.
    WorkflowSummary,
}

impl AttestationKind {
    /// The full `type` string, including the `peac/` prefix.
    #[must_use]
    pub fn type_string(self) -> &'static str {
        match self {
            Self::AgentIdentity => "peac/agent-identity",
            Self::Attribution => "peac/attribution",
            Self::Dispute => "peac/dispute",
            Self::WorkflowSummary => "peac/workflow-summary",
        }
    }
}

impl Attestation {
    /// Has this attestation expired as of `now`, allowing
    /// [`DEFAULT_CLOCK_SKEW_SECS`] of tolerance?
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .is_some_and(|exp| now > exp + chrono::Duration::seconds(DEFAULT_CLOCK_SKEW_SECS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn attestation(expires_at: Option<DateTime<Utc>>) -> Attestation {
        Attestation {
            type_: AttestationKind::AgentIdentity.type_string().to_string(),
            issuer: "https://issuer.example".to_string(),
            issued_at: Utc::now(),
            expires_at,
            ref_: None,
            evidence: serde_json::json!({}),
        }
    }

    #[test]
    fn not_expired_without_expiry() {
        assert!(!attestation(None).is_expired(Utc::now()));
    }

    #[test]
    fn not_expired_within_skew_window() {
        let exp = Utc::now() - Duration::seconds(10);
        assert!(!attestation(Some(exp)).is_expired(Utc::now()));
    }

    #[test]
    fn expired_beyond_skew_window() {
        let exp = Utc::now() - Duration::seconds(60);
        assert!(attestation(Some(exp)).is_expired(Utc::now()));
    }
}
