//! The receipt envelope: the JSON object a detached JWS signs
//! over. Open shape — unlike [`crate::control::ControlStep`] or
//! [`crate::payment::PaymentSplit`], `Auth`/`Evidence`/`Meta`/`Envelope`
//! do NOT `deny_unknown_fields`. Unknown `ext` namespaces must survive a
//! decode/encode round trip bit-for-bit, so every unrecognised field is
//! captured into an `extensions` map via `#[serde(flatten)]` rather than
//! rejected.

use crate::attestation::Attestation;
use crate::control::ControlBlock;
use crate::payment::PaymentEvidence;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

/// The `auth` section of a receipt envelope: the claims that get signed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Auth {
    /// The issuer's HTTPS URL.
    pub iss: String,
    /// The audience this receipt is bound to.
    pub aud: String,
    /// The subject (typically the requesting agent's identity).
    pub sub: String,
    /// Issued-at, Unix seconds.
    pub iat: i64,
    /// Expiry, Unix seconds. Must satisfy `iat <= exp <= iat + 300`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    /// Request id — a UUIDv7, time-ordered and unique per receipt.
    pub rid: Uuid,
    /// `base64url(SHA-256(JCS({"policy_uri", "policy"})))`.
    pub policy_hash: String,
    /// The HTTPS URL the policy snapshot was fetched from.
    pub policy_uri: String,
    /// The governance chain that produced this receipt, if recorded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub control: Option<ControlBlock>,
    /// Enforcement-engine metadata (decision trace, precedence stage).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enforcement: Option<Value>,
    /// Transport-binding details (e.g. request hash) for this receipt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binding: Option<Value>,
    /// A snapshot of the subject's state at issuance time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_snapshot: Option<Value>,
    /// Unrecognised fields, preserved verbatim for forward compatibility.
    #[serde(flatten)]
    pub extensions: BTreeMap<String, Value>,
}

/// The `evidence` section of a receipt envelope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Evidence {
    /// A single payment evidence record, if exactly one applies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment: Option<PaymentEvidence>,
    /// A single attestation, if exactly one applies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attestation: Option<Attestation>,
    /// Multiple payment evidence records, if more than one applies.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub payments: Vec<PaymentEvidence>,
    /// Multiple attestations, if more than one applies.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attestations: Vec<Attestation>,
    /// Unrecognised fields, preserved verbatim for forward compatibility.
    #[serde(flatten)]
    pub extensions: BTreeMap<String, Value>,
}

/// The `meta` section of a receipt envelope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Meta {
    /// Fields redacted from the underlying request/response before
    /// capture, if any.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub redactions: Vec<String>,
    /// A privacy-budget accounting snapshot, if the issuer tracks one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub privacy_budget: Option<Value>,
    /// Debug information, only ever populated outside production.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<Value>,
    /// Unrecognised fields, preserved verbatim for forward compatibility.
    #[serde(flatten)]
    pub extensions: BTreeMap<String, Value>,
}

/// The full receipt envelope: the object a detached JWS signs over.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    /// The signed claims.
    pub auth: Auth,
    /// Supporting evidence, if any was produced.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence: Option<Evidence>,
    /// Out-of-band metadata, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

/// Errors from [`Envelope::validate`].
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum EnvelopeError {
    /// `iss` was not an HTTPS URL.
    #[error("iss must be an https URL, got {0:?}")]
    IssNotHttps(String),
    /// `policy_uri` was not an HTTPS URL.
    #[error("policy_uri must be an https URL, got {0:?}")]
    PolicyUriNotHttps(String),
    /// `exp` was before `iat`.
    #[error("exp ({exp}) precedes iat ({iat})")]
    ExpBeforeIat {
        /// The offending `iat`.
        iat: i64,
        /// The offending `exp`.
        exp: i64,
    },
    /// `exp - iat` exceeded the 300-second maximum window.
    #[error("exp ({exp}) exceeds iat + 300 ({max})")]
    WindowTooLarge {
        /// `exp`.
        exp: i64,
        /// `iat + 300`.
        max: i64,
    },
    /// `rid` was not a UUIDv7.
    #[error("rid must be a UUIDv7, got version {0}")]
    RidNotV7(usize),
}

const MAX_WINDOW_SECS: i64 = 300;

impl From<EnvelopeError> for peac_problem::Problem {
    fn from(err: EnvelopeError) -> Self {
        let code = peac_problem::ErrorCode::SchemaInvalid;
        peac_problem::Problem::new(code, "envelope validation failed").with_detail(err.to_string())
    }
}

impl Envelope {
    /// Enforce the invariants: `iss`/`policy_uri` are HTTPS,
    /// `iat <= exp <= iat + 300`, and `rid` is a UUIDv7.
    pub fn validate(&self) -> Result<(), EnvelopeError> {
        if !self.auth.iss.starts_with("https://") {
            return Err(EnvelopeError::IssNotHttps(self.auth.iss.clone()));
        }
        if !self.auth.policy_uri.starts_with("https://") {
            return Err(EnvelopeError::PolicyUriNotHttps(self.auth.policy_uri.clone()));
        }
        if let Some(exp) = self.auth.exp {
            if exp < self.auth.iat {
                return Err(EnvelopeError::ExpBeforeIat {
                    iat: self.auth.iat,
                    exp,
                });
            }
            let max = self.auth.iat.saturating_add(MAX_WINDOW_SECS);
            if exp > max {
                return Err(EnvelopeError::WindowTooLarge { exp, max });
            }
        }
        if self.auth.rid.get_version_num() != 7 {
            return Err(EnvelopeError::RidNotV7(self.auth.rid.get_version_num()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth(iss: &str, policy_uri: &str, iat: i64, exp: Option<i64>, rid: Uuid) -> Auth {
        Auth {
            iss: iss.to_string(),
            aud: "https://agent.example".to_string(),
            sub: "agent:foo".to_string(),
            iat,
            exp,
            rid,
            policy_hash: "abc".to_string(),
            policy_uri: policy_uri.to_string(),
            control: None,
            enforcement: None,
            binding: None,
            subject_snapshot: None,
            extensions: BTreeMap::new(),
        }
    }

    #[test]
    fn valid_envelope_passes() {
        let envelope = Envelope {
            auth: auth(
                "https://issuer.example",
                "https://issuer.example/policy",
                1_000,
                Some(1_100),
                Uuid::now_v7(),
            ),
            evidence: None,
            meta: None,
        };
        assert!(envelope.validate().is_ok());
    }

    #[test]
    fn non_https_iss_rejected() {
        let envelope = Envelope {
            auth: auth(
                "http://issuer.example",
                "https://issuer.example/policy",
                1_000,
                None,
                Uuid::now_v7(),
            ),
            evidence: None,
            meta: None,
        };
        assert!(matches!(
            envelope.validate(),
            Err(EnvelopeError::IssNotHttps(_))
        ));
    }

    #[test]
    fn window_too_large_rejected() {
        let envelope = Envelope {
            auth: auth(
                "https://issuer.example",
                "https://issuer.example/policy",
                1_000,
                Some(1_000 + MAX_WINDOW_SECS + 1),
                Uuid::now_v7(),
            ),
            evidence: None,
            meta: None,
        };
        assert!(matches!(
            envelope.validate(),
            Err(EnvelopeError::WindowTooLarge { .. })
        ));
    }

    #[test]
    fn exp_before_iat_rejected() {
        let envelope = Envelope {
            auth: auth(
                "https://issuer.example",
                "https://issuer.example/policy",
                1_000,
                Some(900),
                Uuid::now_v7(),
            ),
            evidence: None,
            meta: None,
        };
        assert!(matches!(
            envelope.validate(),
            Err(EnvelopeError::ExpBeforeIat { .. })
        ));
    }

    #[test]
    fn non_v7_rid_rejected() {
        let envelope = Envelope {
            auth: auth(
                "https://issuer.example",
                "https://issuer.example/policy",
                1_000,
                None,
                Uuid::new_v4(),
            ),
            evidence: None,
            meta: None,
        };
        assert!(matches!(
            envelope.validate(),
            Err(EnvelopeError::RidNotV7(_))
        ));
    }

    #[test]
    fn unknown_auth_fields_round_trip() {
        let mut json: Value = serde_json::json!({
            "iss": "https://issuer.example",
            "aud": "https://agent.example",
            "sub": "agent:foo",
            "iat": 1000,
            "rid": Uuid::now_v7().to_string(),
            "policy_hash": "abc",
            "policy_uri": "https://issuer.example/policy",
            "ext:custom": {"vendor_field": 42}
        });
        let auth: Auth = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(
            auth.extensions.get("ext:custom"),
            json.as_object_mut().unwrap().get("ext:custom")
        );
        let back = serde_json::to_value(&auth).unwrap();
        assert_eq!(back.get("ext:custom"), json.get("ext:custom"));
    }
}
