//! Receipt verification: the counterpart to [`crate::issue::issue`].
//!
//! A verifier re-derives the JCS-canonical payload [`issue`](crate::issue::issue)
//! signed and checks it against the receipt's [`DetachedJws`] plus the
//! claimed `iat`/`exp` window, via [`peac_crypto::verify_detached`].

use ed25519_dalek::VerifyingKey;

use crate::issue::ReceiptClaims;
use peac_canon::to_jcs;
use peac_crypto::{validate_time_window, verify_detached, CryptoError, DetachedJws};

/// Failure modes of [`verify_receipt`].
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    /// Canonicalising the claims for verification failed.
    #[error(transparent)]
    Canon(#[from] peac_canon::CanonError),
    /// Signature, kid, or time-window verification failed.
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

impl From<VerifyError> for peac_problem::Problem {
    fn from(err: VerifyError) -> Self {
        use peac_problem::{ErrorCode, Problem};
        match err {
            VerifyError::Canon(_) => Problem::new(ErrorCode::Internal, "receipt claims could not be canonicalized"),
            VerifyError::Crypto(CryptoError::SignatureInvalid) => {
                Problem::new(ErrorCode::SignatureInvalid, "receipt signature is invalid")
            }
            VerifyError::Crypto(CryptoError::KeyNotFound(kid)) => {
                Problem::new(ErrorCode::KeyNotFound, "receipt signing key not found").with_detail(kid)
            }
            VerifyError::Crypto(CryptoError::TimeInvalid { .. }) => {
                Problem::new(ErrorCode::TimeInvalid, "receipt claims window invalid")
            }
            VerifyError::Crypto(CryptoError::MalformedKid(kid)) => {
                Problem::new(ErrorCode::SignatureInvalid, "receipt kid is malformed").with_detail(kid)
            }
            VerifyError::Crypto(CryptoError::Malformed(detail)) => {
                Problem::new(ErrorCode::SignatureInvalid, "receipt is malformed").with_detail(detail)
            }
        }
    }
}

/// Verify that `jws` is a valid signature over `claims`'s JCS-canonical
/// encoding, resolving the verifying key via `resolve_key`, and that
/// `claims.iat`/`claims.exp` are not expired relative to `now`.
pub fn verify_receipt(
    claims: &ReceiptClaims,
    jws: &DetachedJws,
    resolve_key: impl Fn(&str) -> Option<VerifyingKey>,
    now: i64,
) -> Result<(), VerifyError> {
    let payload = to_jcs(claims)?;
    verify_detached(jws, payload.as_bytes(), resolve_key)?;
    validate_time_window(claims.iat, claims.exp, now)?;
    Ok(())
}
