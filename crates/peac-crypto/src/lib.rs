//! Ed25519 keypairs, detached JWS sign/verify, and JWKS export.
//!
//! v0.9 supports Ed25519 only. A `kid` is always of the form
//! `YYYY-MM-DD/nn` (issue date plus a two-digit rotation counter) and is
//! validated on both the signing and verification paths — the two code
//! paths share one validator, so there is no "the other path forgot to
//! check" class of bug.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use base64::Engine;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};

mod jwk;
mod kid;

pub use jwk::{Jwk, Jwks};
pub use kid::validate_kid;

/// Errors produced by key generation, signing, or verification.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// The signature did not verify against the payload and protected
    /// header.
    #[error("signature is invalid")]
    SignatureInvalid,
    /// No verifying key was found for the `kid` in the protected header.
    #[error("no key found for kid {0:?}")]
    KeyNotFound(String),
    /// `iat`/`exp` fall outside the allowed window (`iat <= exp <= iat + 300`)
    /// or `now` falls outside `[iat, exp]`.
    #[error("time window invalid: iat={iat} exp={exp} now={now}")]
    TimeInvalid {
        /// Issued-at timestamp (seconds since epoch).
        iat: i64,
        /// Expiry timestamp (seconds since epoch).
        exp: i64,
        /// The time the window was checked against.
        now: i64,
    },
    /// A `kid` did not match `YYYY-MM-DD/nn`.
    #[error("malformed kid: {0:?}")]
    MalformedKid(String),
    /// The protected header or signature was not valid base64url / JSON.
    #[error("malformed detached JWS: {0}")]
    Malformed(String),
    /// Canonicalising the protected header failed.
    #[error(transparent)]
    Canon(#[from] peac_canon::CanonError),
}

const MAX_WINDOW_SECS: i64 = 300;

/// Check `iat <= exp <= iat + 300` and `iat <= now <= exp`.
pub fn validate_time_window(iat: i64, exp: i64, now: i64) -> Result<(), CryptoError> {
    if exp < iat || exp > iat + MAX_WINDOW_SECS || now < iat || now > exp {
        return Err(CryptoError::TimeInvalid { iat, exp, now });
    }
    Ok(())
}

/// An Ed25519 keypair.
pub struct Ed25519KeyPair {
    signing_key: SigningKey,
}

impl Ed25519KeyPair {
    /// Generate a new random keypair using the OS CSPRNG.
    #[must_use]
    pub fn generate() -> Self {
        let mut seed = [0u8; 32];
        OsRng.fill_bytes(&mut seed);
        Self {
            signing_key: SigningKey::from_bytes(&seed),
        }
    }

    /// Reconstruct a keypair from a 32-byte seed, e.g. loaded from a key
    /// store.
    #[must_use]
    pub fn from_seed_bytes(seed: [u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&seed),
        }
    }

    /// The public (verifying) key.
    #[must_use]
    pub fn public_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// The public key's raw 32 bytes.
    #[must_use]
    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// Sign raw bytes with this key directly (no JWS framing).
    #[must_use]
    pub fn sign_raw(&self, message: &[u8]) -> Signature {
        self.signing_key.sign(message)
    }
}

/// The raw-payload detached JWS variant (`b64=false`, `crit=["b64"]`):
/// protected header and signature travel separately from the payload,
/// which is never base64-encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetachedJws {
    /// Base64url (no padding) of the UTF-8 JCS-canonical protected header.
    pub protected: String,
    /// Base64url (no padding) of the raw 64-byte Ed25519 signature.
    pub signature: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ProtectedHeader {
    alg: String,
    b64: bool,
    crit: Vec<String>,
    kid: String,
}

fn b64url_encode(bytes: &[u8]) -> String {
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

fn b64url_decode(s: &str) -> Result<Vec<u8>, CryptoError> {
    base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(s)
        .map_err(|e| CryptoError::Malformed(e.to_string()))
}

/// Produce the JWS signing input for the detached, `b64=false` variant:
/// `ASCII(BASE64URL(protected header)) || '.' || payload` — the payload
/// itself is never base64-encoded.
fn signing_input(protected_b64: &str, payload: &[u8]) -> Vec<u8> {
    let mut input = Vec::with_capacity(protected_b64.len() + 1 + payload.len());
    input.extend_from_slice(protected_b64.as_bytes());
    input.push(b'.');
    input.extend_from_slice(payload);
    input
}

/// Sign `payload` under `kid`, producing a [`DetachedJws`].
pub fn sign_detached(
    payload: &[u8],
    kid: &str,
    key: &Ed25519KeyPair,
) -> Result<DetachedJws, CryptoError> {
    validate_kid(kid)?;
    let header = ProtectedHeader {
        alg: "EdDSA".to_string(),
        b64: false,
        crit: vec!["b64".to_string()],
        kid: kid.to_string(),
    };
    let protected_json = peac_canon::to_jcs(&header)?;
    let protected_b64 = b64url_encode(protected_json.as_bytes());
    let input = signing_input(&protected_b64, payload);
    let signature = key.sign_raw(&input);
    Ok(DetachedJws {
        protected: protected_b64,
        signature: b64url_encode(&signature.to_bytes()),
    })
}

/// Verify a [`DetachedJws`] against `payload`, resolving the verifying key
/// for the protected header's `kid` via `resolve_key`.
pub fn verify_detached(
    jws: &DetachedJws,
    payload: &[u8],
    resolve_key: impl Fn(&str) -> Option<VerifyingKey>,
) -> Result<(), CryptoError> {
    let header_bytes = b64url_decode(&jws.protected)?;
    let header: ProtectedHeader = serde_json::from_slice(&header_bytes)
        .map_err(|e| CryptoError::Malformed(e.to_string()))?;
    validate_kid(&header.kid)?;
    if header.alg != "EdDSA" || header.b64 {
        return Err(CryptoError::SignatureInvalid);
    }
    if !header.crit.iter().any(|c| c == "b64") {
        return Err(CryptoError::SignatureInvalid);
    }

    let verifying_key = resolve_key(&header.kid).ok_or_else(|| CryptoError::KeyNotFound(header.kid.clone()))?;
    let sig_bytes = b64url_decode(&jws.signature)?;
    let sig_array: [u8; 64] = sig_bytes
        .try_into()
        .map_err(|_| CryptoError::Malformed("signature must be 64 bytes".to_string()))?;
    let signature = Signature::from_bytes(&sig_array);

    let input = signing_input(&jws.protected, payload);
    verifying_key
        .verify(&input, &signature)
        .map_err(|_| CryptoError::SignatureInvalid)
}

#[cfg(test)]
mod tests;
