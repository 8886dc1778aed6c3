//! JWKS export (OKP/Ed25519 JWK shape, RFC 8037).

use crate::{b64url_encode, Ed25519KeyPair};
use serde::{Deserialize, Serialize};

/// A single Ed25519 public key in JWK form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type, always `"OKP"` for Ed25519.
    pub kty: String,
    /// Subtype curve, always `"Ed25519"`.
    pub crv: String,
    /// Base64url (no padding) public key bytes.
    pub x: String,
    /// Key identifier, `YYYY-MM-DD/nn`.
    pub kid: String,
    /// Intended use, always `"sig"`.
    #[serde(rename = "use")]
    pub use_: String,
}

impl Jwk {
    /// Build a `Jwk` for a keypair's public half under `kid`.
    #[must_use]
    pub fn from_keypair(kid: impl Into<String>, key: &Ed25519KeyPair) -> Self {
        Self {
            kty: "OKP".to_string(),
            crv: "Ed25519".to_string(),
            x: b64url_encode(&key.public_key_bytes()),
            kid: kid.into(),
            use_: "sig".to_string(),
        }
    }
}

/// A JSON Web Key Set, sorted by `kid` so export is deterministic.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Jwks {
    /// The keys in the set.
    pub keys: Vec<Jwk>,
}

impl Jwks {
    /// Build a set from an unordered collection of keys, sorting by `kid`.
    #[must_use]
    pub fn new(mut keys: Vec<Jwk>) -> Self {
        keys.sort_by(|a, b| a.kid.cmp(&b.kid));
        Self { keys }
    }

    /// Look up a key by `kid`.
    #[must_use]
    pub fn find(&self, kid: &str) -> Option<&Jwk> {
        self.keys.iter().find(|k| k.kid == kid)
    }
}
