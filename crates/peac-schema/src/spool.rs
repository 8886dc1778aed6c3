//! Capture pipeline spool entries and the hash-chain digest rules.
//! The digest computation lives here (rather than in
//! `peac-capture`) so both the capture pipeline and an offline verifier
//! can compute and check `entry_digest` against the same formula.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// 64 zero hex characters — the sentinel `prev_entry_digest` for the first
/// entry in a chain. Deliberately not `SHA-256("")`, so a chain can never
/// be mistaken for one whose first entry happens to hash an empty
/// predecessor.
pub const GENESIS_DIGEST: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

/// A payload hash, recording which algorithm produced it so a truncated
/// hash is never confused with a full one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadDigest {
    /// `"sha-256"` for payloads ≤ 1 MiB, `"sha-256:trunc-1m"` otherwise.
    pub alg: String,
    /// The hex-encoded digest.
    pub digest: String,
    /// The true byte length of the payload (even when truncated for
    /// hashing).
    pub bytes: u64,
}

const TRUNCATION_THRESHOLD: usize = 1024 * 1024;

/// Hash a payload: payloads at or under 1 MiB get a full
/// SHA-256 (`alg = "sha-256"`); larger payloads are hashed over only their
/// first 1 MiB (`alg = "sha-256:trunc-1m"`), with `bytes` still recording
/// the true length.
#[must_use]
pub fn hash_payload(payload: &[u8]) -> PayloadDigest {
    if payload.len() <= TRUNCATION_THRESHOLD {
        PayloadDigest {
            alg: "sha-256".to_string(),
            digest: hex::encode(Sha256::digest(payload)),
            bytes: payload.len() as u64,
        }
    } else {
        PayloadDigest {
            alg: "sha-256:trunc-1m".to_string(),
            digest: hex::encode(Sha256::digest(&payload[..TRUNCATION_THRESHOLD])),
            bytes: payload.len() as u64,
        }
    }
}

/// One link in a capture session's hash chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpoolEntry {
    /// When the underlying action completed (or started, if it never
    /// completed) — never wall-clock time at capture.
    pub captured_at: chrono::DateTime<chrono::Utc>,
    /// The captured action payload.
    pub action: serde_json::Value,
    /// Digest of the action's input, if recorded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_digest: Option<PayloadDigest>,
    /// Digest of the action's output, if recorded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_digest: Option<PayloadDigest>,
    /// The previous entry's `entry_digest`, or [`GENESIS_DIGEST`] for the
    /// first entry in a chain.
    pub prev_entry_digest: String,
    /// `hex(SHA-256(JCS(entry without entry_digest)))`.
    pub entry_digest: String,
    /// This entry's position in the chain, starting at 0.
    pub sequence: u64,
}

/// Compute `entry_digest` for an entry given every other field (i.e. with
/// `entry_digest` itself omitted): `hex(SHA-256(JCS(entry)))`.
pub fn compute_entry_digest(
    captured_at: chrono::DateTime<chrono::Utc>,
    action: &serde_json::Value,
    input_digest: Option<&PayloadDigest>,
    output_digest: Option<&PayloadDigest>,
    prev_entry_digest: &str,
    sequence: u64,
) -> Result<String, peac_canon::CanonError> {
    let without_digest = serde_json::json!({
        "captured_at": captured_at,
        "action": action,
        "input_digest": input_digest,
        "output_digest": output_digest,
        "prev_entry_digest": prev_entry_digest,
        "sequence": sequence,
    });
    let canonical = peac_canon::to_jcs_value(&without_digest)?;
    Ok(hex::encode(Sha256::digest(canonical.as_bytes())))
}

mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{b:02x}")).collect()
    }
}
