//! Fail-closed verifier configuration.
//!
//! Every unsafe toggle is a typed enum carrying the literal acknowledgement
//! string, never a bare `bool` — mirroring `peac-fetch`'s `ACK_CGNAT`
//! pattern, but pushed one level further into the type itself so a caller
//! cannot flip a switch without naming the risk they're accepting.

use std::time::Duration;

/// Must be supplied verbatim to construct
/// [`IssuerAllowlist::DangerousAllowAny`].
pub const ACK_ALLOW_ANY_ISSUER: &str = "UNSAFE_ALLOW_ANY_ISSUER";
/// Must be supplied verbatim to construct
/// [`UnknownTagPolicy::DangerousAllow`].
pub const ACK_ALLOW_UNKNOWN_TAGS: &str = "UNSAFE_ALLOW_UNKNOWN_TAGS";
/// Must be supplied verbatim to construct [`ReplayPolicy::DangerousDisabled`].
pub const ACK_ALLOW_NO_REPLAY: &str = "UNSAFE_ALLOW_NO_REPLAY";

/// The outer ceiling on a TAP signature's `created`/`expires` window,
/// independent of the configured clock-skew tolerance.
pub const MAX_WINDOW_SECONDS: i64 = 300;

/// Default clock-skew tolerance applied to `created`/`expires` checks.
pub const DEFAULT_SKEW_SECONDS: i64 = 120;

/// A configuration value was rejected at construction time.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// A dangerous toggle was requested with the wrong ack literal.
    #[error("wrong acknowledgement for {toggle}: expected {expected:?}")]
    WrongAck {
        /// Which toggle was being configured.
        toggle: &'static str,
        /// The literal string that must be supplied.
        expected: &'static str,
    },
    /// The issuer allowlist was empty and not explicitly bypassed.
    #[error("issuer allowlist is required and must be non-empty")]
    EmptyIssuerAllowlist,
}

/// Whether incoming issuers are checked against an explicit allowlist.
#[derive(Debug, Clone)]
pub enum IssuerAllowlist {
    /// The default, fail-closed mode: only these issuers are accepted.
    Required(Vec<String>),
    /// Accept any issuer. Requires [`ACK_ALLOW_ANY_ISSUER`].
    DangerousAllowAny(&'static str),
}

impl IssuerAllowlist {
    /// Build the default mode, requiring a non-empty issuer list.
    pub fn required(issuers: Vec<String>) -> Result<Self, ConfigError> {
        if issuers.is_empty() {
            return Err(ConfigError::EmptyIssuerAllowlist);
        }
        Ok(Self::Required(issuers))
    }

    /// Build the dangerous "allow any issuer" mode, validating `ack`
    /// against [`ACK_ALLOW_ANY_ISSUER`].
    pub fn dangerous_allow_any(ack: &str) -> Result<Self, ConfigError> {
        if ack == ACK_ALLOW_ANY_ISSUER {
            Ok(Self::DangerousAllowAny(ACK_ALLOW_ANY_ISSUER))
        } else {
            Err(ConfigError::WrongAck {
                toggle: "issuer_allowlist",
                expected: ACK_ALLOW_ANY_ISSUER,
            })
        }
    }

    /// Whether `issuer` is accepted under this policy.
    #[must_use]
    pub fn allows(&self, issuer: &str) -> bool {
        match self {
            Self::Required(issuers) => issuers.iter().any(|i| i == issuer),
            Self::DangerousAllowAny(_) => true,
        }
    }
}

/// Whether signed-component tags this verifier doesn't recognise are
/// rejected or tolerated.
#[derive(Debug, Clone, Copy)]
pub enum UnknownTagPolicy {
    /// The default, fail-closed mode: reject unrecognised component tags.
    Reject,
    /// Tolerate unrecognised tags. Requires [`ACK_ALLOW_UNKNOWN_TAGS`].
    DangerousAllow(&'static str),
}

impl UnknownTagPolicy {
    /// Build the dangerous "allow unknown tags" mode, validating `ack`.
    pub fn dangerous_allow(ack: &str) -> Result<Self, ConfigError> {
        if ack == ACK_ALLOW_UNKNOWN_TAGS {
            Ok(Self::DangerousAllow(ACK_ALLOW_UNKNOWN_TAGS))
        } else {
            Err(ConfigError::WrongAck {
                toggle: "unknown_tag_policy",
                expected: ACK_ALLOW_UNKNOWN_TAGS,
            })
        }
    }

    #[must_use]
    fn is_dangerous(&self) -> bool {
        matches!(self, Self::DangerousAllow(_))
    }

    /// Whether a signed-component tag this verifier doesn't recognise
    /// should be tolerated rather than rejected.
    #[must_use]
    pub fn allows_unknown(&self) -> bool {
        self.is_dangerous()
    }
}

/// Whether replay protection is mandatory.
#[derive(Debug, Clone, Copy)]
pub enum ReplayPolicy {
    /// The default, fail-closed mode: replayed nonces are rejected.
    Required,
    /// Disable replay protection. Requires [`ACK_ALLOW_NO_REPLAY`]; even
    /// then, an `X-PEAC-Warning` header is required on every response.
    DangerousDisabled(&'static str),
}

impl ReplayPolicy {
    /// Build the dangerous "no replay protection" mode, validating `ack`.
    pub fn dangerous_disabled(ack: &str) -> Result<Self, ConfigError> {
        if ack == ACK_ALLOW_NO_REPLAY {
            Ok(Self::DangerousDisabled(ACK_ALLOW_NO_REPLAY))
        } else {
            Err(ConfigError::WrongAck {
                toggle: "replay_policy",
                expected: ACK_ALLOW_NO_REPLAY,
            })
        }
    }

    #[must_use]
    pub fn is_disabled(&self) -> bool {
        matches!(self, Self::DangerousDisabled(_))
    }
}

/// Fail-closed verifier configuration.
#[derive(Debug, Clone)]
pub struct VerifierConfig {
    /// Which issuers are accepted.
    pub issuer_allowlist: IssuerAllowlist,
    /// Whether unrecognised signed-component tags are tolerated.
    pub unknown_tag_policy: UnknownTagPolicy,
    /// Whether replay protection is mandatory.
    pub replay_policy: ReplayPolicy,
    /// Allowed clock skew for the `created`/`expires` window check.
    pub skew: Duration,
    /// Request path prefixes that bypass verification entirely (health
    /// checks, etc). Evaluated before the rest of this config is even
    /// consulted, so a misconfigured verifier cannot block them.
    pub bypass_prefixes: Vec<String>,
    /// Hosts a JWKS document may be fetched from.
    pub jwks_host_allowlist: Vec<String>,
}

impl VerifierConfig {
    /// Whether `path` is covered by a configured bypass prefix.
    #[must_use]
    pub fn is_bypassed(&self, path: &str) -> bool {
        self.bypass_prefixes.iter().any(|p| path.starts_with(p.as_str()))
    }

    /// Whether this configuration requires an `X-PEAC-Warning` header on
    /// successful verification (because some unsafe mode is active).
    #[must_use]
    pub fn operating_unsafely(&self) -> bool {
        matches!(self.issuer_allowlist, IssuerAllowlist::DangerousAllowAny(_))
            || self.unknown_tag_policy.is_dangerous()
            || self.replay_policy.is_disabled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_allowlist_rejects_empty() {
        assert!(matches!(
            IssuerAllowlist::required(vec![]),
            Err(ConfigError::EmptyIssuerAllowlist)
        ));
    }

    #[test]
    fn dangerous_allow_any_requires_exact_ack() {
        assert!(IssuerAllowlist::dangerous_allow_any("nope").is_err());
        assert!(IssuerAllowlist::dangerous_allow_any(ACK_ALLOW_ANY_ISSUER).is_ok());
    }

    #[test]
    fn required_allowlist_only_allows_listed_issuers() {
        let allowlist = IssuerAllowlist::required(vec!["https://a.example".to_string()]).unwrap();
        assert!(allowlist.allows("https://a.example"));
        assert!(!allowlist.allows("https://b.example"));
    }

    #[test]
    fn dangerous_allow_any_allows_everything() {
        let allowlist = IssuerAllowlist::dangerous_allow_any(ACK_ALLOW_ANY_ISSUER).unwrap();
        assert!(allowlist.allows("https://anything.example"));
    }

    #[test]
    fn unknown_tag_policy_requires_exact_ack() {
        assert!(UnknownTagPolicy::dangerous_allow("nope").is_err());
        assert!(UnknownTagPolicy::dangerous_allow(ACK_ALLOW_UNKNOWN_TAGS).is_ok());
    }

    #[test]
    fn replay_policy_requires_exact_ack() {
        assert!(ReplayPolicy::dangerous_disabled("nope").is_err());
        assert!(ReplayPolicy::dangerous_disabled(ACK_ALLOW_NO_REPLAY).is_ok());
    }

    #[test]
    fn operating_unsafely_reflects_any_dangerous_toggle() {
        let safe = VerifierConfig {
            issuer_allowlist: IssuerAllowlist::required(vec!["https://a.example".to_string()])
                .unwrap(),
            unknown_tag_policy: UnknownTagPolicy::Reject,
            replay_policy: ReplayPolicy::Required,
            skew: Duration::from_secs(120),
            bypass_prefixes: vec![],
            jwks_host_allowlist: vec!["a.example".to_string()],
        };
        assert!(!safe.operating_unsafely());

        let mut unsafe_cfg = safe.clone();
        unsafe_cfg.replay_policy = ReplayPolicy::dangerous_disabled(ACK_ALLOW_NO_REPLAY).unwrap();
        assert!(unsafe_cfg.operating_unsafely());
    }

    #[test]
    fn bypass_prefix_check_is_a_simple_prefix_match() {
        let cfg = VerifierConfig {
            issuer_allowlist: IssuerAllowlist::required(vec!["https://a.example".to_string()])
                .unwrap(),
            unknown_tag_policy: UnknownTagPolicy::Reject,
            replay_policy: ReplayPolicy::Required,
            skew: Duration::from_secs(120),
            bypass_prefixes: vec!["/healthz".to_string()],
            jwks_host_allowlist: vec![],
        };
        assert!(cfg.is_bypassed("/healthz/live"));
        assert!(!cfg.is_bypassed("/api/widgets"));
    }
}
