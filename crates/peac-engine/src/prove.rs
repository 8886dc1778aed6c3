//! Proof issuance: build the minimal claim set,
//! register `rid` with the nonce cache, and sign a detached JWS.

use peac_crypto::{CryptoError, DetachedJws, Ed25519KeyPair};
use peac_nonce::{NonceError, NonceStore};
use peac_schema::PaymentEvidence;
use std::time::Duration;
use uuid::Uuid;

/// The minimal claim set proved at issuance.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Claims {
    /// Issuer.
    pub iss: String,
    /// Subject.
    pub sub: String,
    /// Audience.
    pub aud: String,
    /// Issued-at, Unix seconds.
    pub iat: i64,
    /// Expiry, Unix seconds.
    pub exp: i64,
    /// Request id. Must be a UUIDv7.
    pub rid: Uuid,
    /// Declared purpose, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    /// The policy hash this claim set was evaluated under.
    pub policy_hash: String,
    /// Settled payment evidence, if settlement occurred.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment: Option<PaymentEvidence>,
}

/// A proven claim set alongside the compact `payloadB64..signature` form.
#[derive(Debug, Clone)]
pub struct Proof {
    /// The claims that were signed.
    pub claims: Claims,
    /// The detached JWS over the JCS-canonical claims.
    pub jws: DetachedJws,
}

/// Errors from [`prove`].
#[derive(Debug, thiserror::Error)]
pub enum ProveError {
    /// `rid` was not a UUIDv7.
    #[error("rid must be a UUIDv7, got version {0}")]
    RidNotV7(usize),
    /// `rid` had already been registered (replay).
    #[error("rid {0} has already been used")]
    RidReplayed(Uuid),
    /// The nonce store rejected registration.
    #[error("nonce store error: {0}")]
    Nonce(#[from] NonceError),
    /// Canonicalising the claims failed.
    #[error("canonicalisation failed: {0}")]
    Canon(#[from] peac_canon::CanonError),
    /// Signing failed.
    #[error("signing failed: {0}")]
    Crypto(#[from] CryptoError),
}

/// Build the minimal claim set, validate and register `rid`, and sign a
/// detached JWS over its JCS-canonical form.
pub async fn prove(
    claims: Claims,
    kid: &str,
    key: &Ed25519KeyPair,
    nonce_store: &dyn NonceStore,
    nonce_ttl: Duration,
) -> Result<Proof, ProveError> {
    if claims.rid.get_version_num() != 7 {
        return Err(ProveError::RidNotV7(claims.rid.get_version_num()));
    }

    let rid_str = claims.rid.to_string();
    if nonce_store.has(&rid_str).await {
        return Err(ProveError::RidReplayed(claims.rid));
    }
    nonce_store.add(&rid_str, nonce_ttl).await?;

    let canonical = peac_canon::to_jcs(&claims)?;
    let jws = peac_crypto::sign_detached(canonical.as_bytes(), kid, key)?;

    Ok(Proof { claims, jws })
}

#[cfg(test)]
mod tests {
    use super::*;
    use peac_nonce::InMemoryNonceStore;

    fn claims(rid: Uuid) -> Claims {
        Claims {
            iss: "https://issuer.example".to_string(),
            sub: "agent:foo".to_string(),
            aud: "https://agent.example".to_string(),
            iat: 1_000,
            exp: 1_100,
            rid,
            purpose: Some("search".to_string()),
            policy_hash: "abc".to_string(),
            payment: None,
        }
    }

    #[tokio::test]
    async fn proves_and_signs_a_valid_claim_set() {
        let store = InMemoryNonceStore::new(Duration::from_secs(60));
        let key = Ed25519KeyPair::generate();
        let proof = prove(
            claims(Uuid::now_v7()),
            "2026-01-01/01",
            &key,
            &store,
            Duration::from_secs(120),
        )
        .await
        .unwrap();
        assert!(!proof.jws.signature.is_empty());
    }

    #[tokio::test]
    async fn non_v7_rid_rejected() {
        let store = InMemoryNonceStore::new(Duration::from_secs(60));
        let key = Ed25519KeyPair::generate();
        let err = prove(
            claims(Uuid::new_v4()),
            "2026-01-01/01",
            &key,
            &store,
            Duration::from_secs(120),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ProveError::RidNotV7(_)));
    }

    #[tokio::test]
    async fn replayed_rid_rejected() {
        let store = InMemoryNonceStore::new(Duration::from_secs(60));
        let key = Ed25519KeyPair::generate();
        let rid = Uuid::now_v7();
        prove(
            claims(rid),
            "2026-01-01/01",
            &key,
            &store,
            Duration::from_secs(120),
        )
        .await
        .unwrap();
        let err = prove(
            claims(rid),
            "2026-01-01/01",
            &key,
            &store,
            Duration::from_secs(120),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ProveError::RidReplayed(_)));
    }
}
