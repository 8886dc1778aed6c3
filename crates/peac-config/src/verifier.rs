//! The TOML-serializable shape of [`peac_verifier::VerifierConfig`].
//!
//! `VerifierConfig`'s dangerous-ack enums intentionally have no `Deserialize`
//! impl of their own — a bare string in a config file can't become an unsafe
//! mode without going through the same ack check their constructors
//! enforce. This module is that boundary: plain, serde-friendly fields in,
//! the real typed config (or a rejection) out.

use peac_verifier::{
    IssuerAllowlist, ReplayPolicy, UnknownTagPolicy, VerifierConfig, DEFAULT_SKEW_SECONDS,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::ConfigError;

fn default_skew_secs() -> u64 {
    u64::try_from(DEFAULT_SKEW_SECONDS).unwrap_or(120)
}

/// TOML shape of a [`VerifierConfig`].
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct VerifierSection {
    /// Accepted issuers. Required and non-empty unless
    /// `allow_any_issuer_ack` is set.
    #[serde(default)]
    pub issuers: Vec<String>,
    /// Must equal `peac_verifier::ACK_ALLOW_ANY_ISSUER` to accept any
    /// issuer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_any_issuer_ack: Option<String>,
    /// Must equal `peac_verifier::ACK_ALLOW_UNKNOWN_TAGS` to tolerate
    /// unrecognised signed-component tags.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_unknown_tags_ack: Option<String>,
    /// Must equal `peac_verifier::ACK_ALLOW_NO_REPLAY` to disable replay
    /// protection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_no_replay_ack: Option<String>,
    /// Allowed clock skew, seconds.
    #[serde(default = "default_skew_secs")]
    pub skew_secs: u64,
    /// Path prefixes that bypass verification entirely.
    #[serde(default)]
    pub bypass_prefixes: Vec<String>,
    /// Hosts a JWKS document may be fetched from.
    #[serde(default)]
    pub jwks_host_allowlist: Vec<String>,
}

impl VerifierSection {
    /// Build the real, typed [`VerifierConfig`], applying the same ack
    /// checks as its constituent enums' constructors.
    pub fn to_verifier_config(&self) -> Result<VerifierConfig, ConfigError> {
        let issuer_allowlist = match &self.allow_any_issuer_ack {
            Some(ack) => IssuerAllowlist::dangerous_allow_any(ack),
            None => IssuerAllowlist::required(self.issuers.clone()),
        }
        .map_err(|e| ConfigError::ValidationError { reasons: vec![e.to_string()] })?;

        let unknown_tag_policy = match &self.allow_unknown_tags_ack {
            Some(ack) => UnknownTagPolicy::dangerous_allow(ack)
                .map_err(|e| ConfigError::ValidationError { reasons: vec![e.to_string()] })?,
            None => UnknownTagPolicy::Reject,
        };

        let replay_policy = match &self.allow_no_replay_ack {
            Some(ack) => ReplayPolicy::dangerous_disabled(ack)
                .map_err(|e| ConfigError::ValidationError { reasons: vec![e.to_string()] })?,
            None => ReplayPolicy::Required,
        };

        Ok(VerifierConfig {
            issuer_allowlist,
            unknown_tag_policy,
            replay_policy,
            skew: Duration::from_secs(self.skew_secs),
            bypass_prefixes: self.bypass_prefixes.clone(),
            jwks_host_allowlist: self.jwks_host_allowlist.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use peac_verifier::ACK_ALLOW_ANY_ISSUER;

    #[test]
    fn default_section_requires_a_non_empty_allowlist() {
        let section = VerifierSection::default();
        let err = section.to_verifier_config().unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { .. }));
    }

    #[test]
    fn required_allowlist_builds_a_safe_config() {
        let section = VerifierSection {
            issuers: vec!["https://issuer.example".to_string()],
            ..Default::default()
        };
        let config = section.to_verifier_config().unwrap();
        assert!(!config.operating_unsafely());
    }

    #[test]
    fn wrong_ack_is_rejected() {
        let section = VerifierSection {
            allow_any_issuer_ack: Some("nope".to_string()),
            ..Default::default()
        };
        assert!(section.to_verifier_config().is_err());
    }

    #[test]
    fn correct_ack_builds_a_dangerous_config() {
        let section = VerifierSection {
            allow_any_issuer_ack: Some(ACK_ALLOW_ANY_ISSUER.to_string()),
            ..Default::default()
        };
        let config = section.to_verifier_config().unwrap();
        assert!(config.operating_unsafely());
    }
}
