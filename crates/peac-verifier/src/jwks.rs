//! Host-allowlisted, TTL-cached JWKS key resolution.
//!
//! Fetching is delegated to an injected [`JwksResolver`] so this crate never
//! has to make its own decision about HTTP clients, redirects, or SSRF
//! defenses — a deployment that already runs `peac-fetch` elsewhere can wrap
//! it in a resolver; a test can use [`StaticJwksResolver`].

use ed25519_dalek::VerifyingKey;
use peac_crypto::{Jwk, Jwks};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::config::VerifierConfig;

/// The cache entry TTL: a JWKS document is refetched at most this often per
/// host.
pub const JWKS_CACHE_TTL: Duration = Duration::from_secs(300);

/// Errors produced while resolving a verifying key.
#[derive(Debug, Clone, thiserror::Error)]
pub enum JwksError {
    /// `host` is not in the configured JWKS host allowlist.
    #[error("jwks host not allowlisted: {0}")]
    HostNotAllowlisted(String),
    /// The resolver failed to fetch or parse a JWKS document.
    #[error("jwks fetch failed for {host}: {reason}")]
    FetchFailed {
        /// The host the fetch was attempted against.
        host: String,
        /// Resolver-supplied failure reason.
        reason: String,
    },
    /// No key with the requested `kid` was present in the fetched document.
    #[error("no key found for kid {0:?}")]
    KeyNotFound(String),
    /// The matching JWK's `x` member was not valid base64url or not a
    /// 32-byte Ed25519 public key.
    #[error("malformed jwk for kid {0:?}")]
    MalformedKey(String),
}

/// Fetches the JWKS document published by `host`. Implementations decide
/// the transport (HTTPS GET, a static test fixture, a local file) and own
/// any SSRF precautions at the fetch site.
#[async_trait::async_trait]
pub trait JwksResolver: Send + Sync {
    /// Fetch the current JWKS document for `host`.
    async fn fetch(&self, host: &str) -> Result<Jwks, String>;
}

/// A resolver returning one fixed [`Jwks`] for every host, for tests and for
/// deployments with a single static signer set.
pub struct StaticJwksResolver {
    jwks: Jwks,
}

impl StaticJwksResolver {
    /// Build a resolver that always returns `jwks`, regardless of host.
    #[must_use]
    pub fn new(jwks: Jwks) -> Self {
        Self { jwks }
    }
}

#[async_trait::async_trait]
impl JwksResolver for StaticJwksResolver {
    async fn fetch(&self, _host: &str) -> Result<Jwks, String> {
        Ok(self.jwks.clone())
    }
}

struct CacheEntry {
    jwks: Jwks,
    fetched_at: Instant,
}

/// A TTL-caching wrapper over a [`JwksResolver`], keyed by host.
pub struct JwksCache {
    resolver: Box<dyn JwksResolver>,
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl JwksCache {
    /// Build a cache around `resolver` with the default TTL
    /// ([`JWKS_CACHE_TTL`]).
    #[must_use]
    pub fn new(resolver: Box<dyn JwksResolver>) -> Self {
        Self::with_ttl(resolver, JWKS_CACHE_TTL)
    }

    /// Build a cache with an explicit TTL, for tests.
    #[must_use]
    pub fn with_ttl(resolver: Box<dyn JwksResolver>, ttl: Duration) -> Self {
        Self {
            resolver,
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Resolve the verifying key for `kid` published by `host`, honouring
    /// `config.jwks_host_allowlist` and the cache TTL.
    pub async fn resolve(
        &self,
        config: &VerifierConfig,
        host: &str,
        kid: &str,
    ) -> Result<VerifyingKey, JwksError> {
        if !config.jwks_host_allowlist.iter().any(|h| h == host) {
            return Err(JwksError::HostNotAllowlisted(host.to_string()));
        }

        let cached = self
            .entries
            .lock()
            .expect("jwks cache mutex poisoned")
            .get(host)
            .filter(|entry| entry.fetched_at.elapsed() < self.ttl)
            .map(|entry| entry.jwks.clone());

        let jwks = match cached {
            Some(jwks) => jwks,
            None => {
                let jwks = self
                    .resolver
                    .fetch(host)
                    .await
                    .map_err(|reason| JwksError::FetchFailed {
                        host: host.to_string(),
                        reason,
                    })?;
                self.entries.lock().expect("jwks cache mutex poisoned").insert(
                    host.to_string(),
                    CacheEntry {
                        jwks: jwks.clone(),
                        fetched_at: Instant::now(),
                    },
                );
                jwks
            }
        };

        let jwk = jwks.find(kid).ok_or_else(|| JwksError::KeyNotFound(kid.to_string()))?;
        jwk_to_verifying_key(jwk).ok_or_else(|| JwksError::MalformedKey(kid.to_string()))
    }
}

fn jwk_to_verifying_key(jwk: &Jwk) -> Option<VerifyingKey> {
    use base64::Engine;
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(&jwk.x).ok()?;
    let array: [u8; 32] = bytes.try_into().ok()?;
    VerifyingKey::from_bytes(&array).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IssuerAllowlist;
    use crate::config::{ReplayPolicy, UnknownTagPolicy};
    use peac_crypto::Ed25519KeyPair;

    fn config(allowlist: Vec<String>) -> VerifierConfig {
        VerifierConfig {
            issuer_allowlist: IssuerAllowlist::required(vec!["https://issuer.example".to_string()])
                .unwrap(),
            unknown_tag_policy: UnknownTagPolicy::Reject,
            replay_policy: ReplayPolicy::Required,
            skew: Duration::from_secs(120),
            bypass_prefixes: vec![],
            jwks_host_allowlist: allowlist,
        }
    }

    #[tokio::test]
    async fn host_not_allowlisted_is_rejected() {
        let key = Ed25519KeyPair::generate();
        let jwk = Jwk::from_keypair("2026-07-28/01", &key);
        let cache = JwksCache::new(Box::new(StaticJwksResolver::new(Jwks::new(vec![jwk]))));
        let cfg = config(vec![]);
        let err = cache.resolve(&cfg, "issuer.example", "2026-07-28/01").await.unwrap_err();
        assert!(matches!(err, JwksError::HostNotAllowlisted(_)));
    }

    #[tokio::test]
    async fn resolves_and_caches_a_known_kid() {
        let key = Ed25519KeyPair::generate();
        let jwk = Jwk::from_keypair("2026-07-28/01", &key);
        let expected = key.public_key();
        let cache = JwksCache::new(Box::new(StaticJwksResolver::new(Jwks::new(vec![jwk]))));
        let cfg = config(vec!["issuer.example".to_string()]);

        let resolved = cache.resolve(&cfg, "issuer.example", "2026-07-28/01").await.unwrap();
        assert_eq!(resolved, expected);

        // Second resolution should hit the cache and return the same key.
        let resolved_again = cache.resolve(&cfg, "issuer.example", "2026-07-28/01").await.unwrap();
        assert_eq!(resolved_again, expected);
    }

    #[tokio::test]
    async fn unknown_kid_is_rejected() {
        let key = Ed25519KeyPair::generate();
        let jwk = Jwk::from_keypair("2026-07-28/01", &key);
        let cache = JwksCache::new(Box::new(StaticJwksResolver::new(Jwks::new(vec![jwk]))));
        let cfg = config(vec!["issuer.example".to_string()]);
        let err = cache.resolve(&cfg, "issuer.example", "2026-07-28/99").await.unwrap_err();
        assert!(matches!(err, JwksError::KeyNotFound(_)));
    }

    #[tokio::test]
    async fn expired_cache_entry_is_refetched() {
        let key = Ed25519KeyPair::generate();
        let jwk = Jwk::from_keypair("2026-07-28/01", &key);
        let cache = JwksCache::with_ttl(
            Box::new(StaticJwksResolver::new(Jwks::new(vec![jwk]))),
            Duration::from_millis(1),
        );
        let cfg = config(vec!["issuer.example".to_string()]);
        cache.resolve(&cfg, "issuer.example", "2026-07-28/01").await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        let resolved = cache.resolve(&cfg, "issuer.example", "2026-07-28/01").await.unwrap();
        assert_eq!(resolved, key.public_key());
    }
}
