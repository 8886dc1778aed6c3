//! TAP request verification: ties together bypass handling,
//! window checks, JWKS resolution, signature-base verification, and replay
//! protection behind one entry point, [`verify_tap`].

use std::collections::HashMap;
use std::time::Duration;

use base64::Engine;
use ed25519_dalek::{Signature, Verifier};
use peac_nonce::NonceStore;
use peac_problem::{ErrorCode, Problem};
use sha2::{Digest, Sha256};

use crate::config::{VerifierConfig, MAX_WINDOW_SECONDS};
use crate::jwks::JwksCache;
use crate::signature::{build_signature_base, parse_signature, parse_signature_input, ComponentSource};

/// Signed-component tags this verifier recognises without consulting
/// [`crate::config::UnknownTagPolicy`].
const KNOWN_COMPONENTS: &[&str] = &[
    "@authority",
    "@method",
    "@path",
    "@query",
    "@scheme",
    "signature-agent",
    "content-digest",
];

/// An incoming request to verify, reduced to exactly what TAP signature
/// verification needs. Framework glue (extracting this from an actual HTTP
/// request type) lives outside this crate.
pub struct TapRequest {
    /// The request authority (host\[:port\]), i.e. the `@authority` component.
    pub authority: String,
    /// The request path, used only for [`VerifierConfig::is_bypassed`]
    /// prefix matching.
    pub path: String,
    /// The claimed issuer, used for allowlisting and the replay key.
    pub issuer: String,
    /// Request headers, lower-cased keys.
    pub headers: HashMap<String, String>,
    /// The signature label to verify, e.g. `"sig1"`.
    pub label: String,
    /// The time this request is being verified at, Unix seconds.
    pub now: i64,
}

impl ComponentSource for TapRequest {
    fn resolve(&self, component: &str) -> Option<String> {
        match component {
            "@authority" => Some(self.authority.clone()),
            "@path" => Some(self.path.clone()),
            _ => self.headers.get(component).cloned(),
        }
    }
}

impl TapRequest {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

/// The successful-verification contract: the headers a caller
/// must attach to its response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verified {
    /// Always `true` for a value returned from [`verify_tap`] — failures are
    /// `Err(Problem)`, never a `false` value here.
    pub verified: bool,
    /// Always `"tap"`.
    pub engine: &'static str,
    /// Echoes the verified signature's label, e.g. `"sig1"`.
    pub tag: Option<String>,
    /// Present (and required on the response) whenever the verifier is
    /// operating with a dangerous toggle active, or this request was let
    /// through via a bypass prefix.
    pub warning: Option<String>,
}

impl Verified {
    fn bypassed() -> Self {
        Self {
            verified: true,
            engine: "tap",
            tag: None,
            warning: Some("request bypassed TAP verification".to_string()),
        }
    }
}

fn problem(code: ErrorCode, title: &str, detail: impl AsRef<str>) -> Problem {
    Problem::new(code, title).with_detail(detail)
}

/// Verify a TAP-signed request end to end. Fails closed: any missing or
/// malformed header, disallowed issuer, expired or oversized window,
/// unresolvable key, invalid signature, or replayed nonce returns `Err`.
pub async fn verify_tap(
    config: &VerifierConfig,
    jwks: &JwksCache,
    nonce_store: &dyn NonceStore,
    request: &TapRequest,
) -> Result<Verified, Problem> {
    if config.is_bypassed(&request.path) {
        return Ok(Verified::bypassed());
    }

    let sig_input_header = request
        .header("signature-input")
        .ok_or_else(|| problem(ErrorCode::SignatureInvalid, "missing Signature-Input", "no Signature-Input header"))?;
    let signature_header = request
        .header("signature")
        .ok_or_else(|| problem(ErrorCode::SignatureInvalid, "missing Signature", "no Signature header"))?;

    let input = parse_signature_input(sig_input_header)
        .map_err(|e| problem(ErrorCode::SignatureInvalid, "malformed Signature-Input", e.to_string()))?;

    if !input.alg.eq_ignore_ascii_case("ed25519") {
        return Err(problem(
            ErrorCode::TapInvalidAlgorithm,
            "unsupported signature algorithm",
            &input.alg,
        ));
    }

    if !config.issuer_allowlist.allows(&request.issuer) {
        return Err(problem(
            ErrorCode::IssuerNotAllowlisted,
            "issuer not allowlisted",
            &request.issuer,
        ));
    }

    let window = input.expires - input.created;
    if window < 0 || window > MAX_WINDOW_SECONDS {
        return Err(problem(
            ErrorCode::TapWindowTooLarge,
            "signature window too large",
            format!("created={} expires={}", input.created, input.expires),
        ));
    }
    let skew = i64::try_from(config.skew.as_secs()).unwrap_or(i64::MAX);
    if request.now < input.created - skew || request.now > input.expires + skew {
        return Err(problem(
            ErrorCode::TimeInvalid,
            "signature outside allowed window",
            format!("now={} created={} expires={}", request.now, input.created, input.expires),
        ));
    }

    for component in &input.components {
        let known = KNOWN_COMPONENTS.contains(&component.as_str());
        if !known && !config.unknown_tag_policy.allows_unknown() {
            return Err(problem(ErrorCode::TapUnknownTag, "unrecognised signed component", component));
        }
    }

    let verifying_key = jwks
        .resolve(config, &request.authority, &input.keyid)
        .await
        .map_err(|e| problem(ErrorCode::KeyNotFound, "jwks key resolution failed", e.to_string()))?;

    let base = build_signature_base(&input, request)
        .map_err(|e| problem(ErrorCode::SignatureInvalid, "could not build signature base", e.to_string()))?;

    let envelope = parse_signature(signature_header, &input.label)
        .map_err(|e| problem(ErrorCode::SignatureInvalid, "malformed Signature header", e.to_string()))?;
    let sig_bytes = base64::engine::general_purpose::STANDARD
        .decode(envelope)
        .map_err(|e| problem(ErrorCode::SignatureInvalid, "malformed signature envelope", e.to_string()))?;
    let sig_array: [u8; 64] = sig_bytes
        .try_into()
        .map_err(|_| problem(ErrorCode::SignatureInvalid, "signature must be 64 bytes", ""))?;
    let signature = Signature::from_bytes(&sig_array);

    verifying_key
        .verify(base.as_bytes(), &signature)
        .map_err(|_| problem(ErrorCode::SignatureInvalid, "signature did not verify", ""))?;

    if !config.replay_policy.is_disabled() {
        let replay_key = replay_key(&request.issuer, &input.keyid, &input.nonce);
        if nonce_store.has(&replay_key).await {
            return Err(problem(ErrorCode::TapNonceReplay, "nonce already seen", &replay_key));
        }
        nonce_store
            .add(&replay_key, Duration::from_secs(u64::try_from(MAX_WINDOW_SECONDS).unwrap_or(300)))
            .await
            .map_err(|e| problem(ErrorCode::Internal, "nonce store unavailable", e.to_string()))?;
    }

    Ok(Verified {
        verified: true,
        engine: "tap",
        tag: Some(input.label.clone()),
        warning: if config.operating_unsafely() {
            Some("verifier is operating with a dangerous toggle active".to_string())
        } else {
            None
        },
    })
}

fn replay_key(issuer: &str, keyid: &str, nonce: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(issuer.as_bytes());
    hasher.update(b"|");
    hasher.update(keyid.as_bytes());
    hasher.update(b"|");
    hasher.update(nonce.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{IssuerAllowlist, ReplayPolicy, UnknownTagPolicy};
    use crate::jwks::{JwksCache, StaticJwksResolver};
    use peac_crypto::{Ed25519KeyPair, Jwk, Jwks};
    use peac_nonce::InMemoryNonceStore;

    fn config() -> VerifierConfig {
        VerifierConfig {
            issuer_allowlist: IssuerAllowlist::required(vec!["https://issuer.example".to_string()])
                .unwrap(),
            unknown_tag_policy: UnknownTagPolicy::Reject,
            replay_policy: ReplayPolicy::Required,
            skew: Duration::from_secs(120),
            bypass_prefixes: vec!["/healthz".to_string()],
            jwks_host_allowlist: vec!["api.example.com".to_string()],
        }
    }

    fn signed_request(key: &Ed25519KeyPair, created: i64, nonce: &str) -> TapRequest {
        let mut headers = HashMap::new();
        headers.insert("signature-agent".to_string(), "peac/0.1".to_string());
        let sig_input = format!(
            r#"sig1=("@authority" "signature-agent");created={created};expires={};keyid="2026-07-28/01";alg="ed25519";nonce="{nonce}""#,
            created + 60
        );
        headers.insert("signature-input".to_string(), sig_input.clone());

        let input = parse_signature_input(&sig_input).unwrap();
        let request_stub = TapRequest {
            authority: "api.example.com".to_string(),
            path: "/widgets".to_string(),
            issuer: "https://issuer.example".to_string(),
            headers: headers.clone(),
            label: "sig1".to_string(),
            now: created,
        };
        let base = build_signature_base(&input, &request_stub).unwrap();
        let signature = key.sign_raw(base.as_bytes());
        let envelope = base64::engine::general_purpose::STANDARD.encode(signature.to_bytes());
        headers.insert("signature".to_string(), format!("sig1=:{envelope}:"));

        TapRequest {
            authority: "api.example.com".to_string(),
            path: "/widgets".to_string(),
            issuer: "https://issuer.example".to_string(),
            headers,
            label: "sig1".to_string(),
            now: created,
        }
    }

    fn jwks_cache(key: &Ed25519KeyPair) -> JwksCache {
        let jwk = Jwk::from_keypair("2026-07-28/01", key);
        JwksCache::new(Box::new(StaticJwksResolver::new(Jwks::new(vec![jwk]))))
    }

    #[tokio::test]
    async fn verifies_a_well_formed_request() {
        let key = Ed25519KeyPair::generate();
        let request = signed_request(&key, 1_000, "nonce-1");
        let jwks = jwks_cache(&key);
        let nonces = InMemoryNonceStore::new(Duration::from_secs(60));

        let verified = verify_tap(&config(), &jwks, &nonces, &request).await.unwrap();
        assert!(verified.verified);
        assert_eq!(verified.tag.as_deref(), Some("sig1"));
        assert!(verified.warning.is_none());
    }

    #[tokio::test]
    async fn replayed_nonce_is_rejected() {
        let key = Ed25519KeyPair::generate();
        let jwks = jwks_cache(&key);
        let nonces = InMemoryNonceStore::new(Duration::from_secs(60));

        let first = signed_request(&key, 1_000, "nonce-dup");
        verify_tap(&config(), &jwks, &nonces, &first).await.unwrap();

        let second = signed_request(&key, 1_001, "nonce-dup");
        let err = verify_tap(&config(), &jwks, &nonces, &second).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::TapNonceReplay);
    }

    #[tokio::test]
    async fn unallowlisted_issuer_is_rejected() {
        let key = Ed25519KeyPair::generate();
        let jwks = jwks_cache(&key);
        let nonces = InMemoryNonceStore::new(Duration::from_secs(60));
        let mut request = signed_request(&key, 1_000, "nonce-2");
        request.issuer = "https://evil.example".to_string();

        let err = verify_tap(&config(), &jwks, &nonces, &request).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::IssuerNotAllowlisted);
    }

    #[tokio::test]
    async fn tampered_signature_is_rejected() {
        let key = Ed25519KeyPair::generate();
        let jwks = jwks_cache(&key);
        let nonces = InMemoryNonceStore::new(Duration::from_secs(60));
        let mut request = signed_request(&key, 1_000, "nonce-3");
        request.headers.insert(
            "signature".to_string(),
            "sig1=:AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA==:"
                .to_string(),
        );

        let err = verify_tap(&config(), &jwks, &nonces, &request).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::SignatureInvalid);
    }

    #[tokio::test]
    async fn bypass_prefix_skips_verification_entirely() {
        let key = Ed25519KeyPair::generate();
        let jwks = jwks_cache(&key);
        let nonces = InMemoryNonceStore::new(Duration::from_secs(60));
        let request = TapRequest {
            authority: "api.example.com".to_string(),
            path: "/healthz/live".to_string(),
            issuer: "https://anyone.example".to_string(),
            headers: HashMap::new(),
            label: "sig1".to_string(),
            now: 1_000,
        };

        let verified = verify_tap(&config(), &jwks, &nonces, &request).await.unwrap();
        assert!(verified.warning.is_some());
    }

    #[tokio::test]
    async fn stale_window_is_rejected() {
        let key = Ed25519KeyPair::generate();
        let mut request = signed_request(&key, 1_000, "nonce-4");
        request.now = 1_000 + 120 + 121;
        let jwks = jwks_cache(&key);
        let nonces = InMemoryNonceStore::new(Duration::from_secs(60));

        let err = verify_tap(&config(), &jwks, &nonces, &request).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::TimeInvalid);
    }
}
