use super::*;

#[test]
fn sign_then_verify_round_trips() {
    let key = Ed25519KeyPair::generate();
    let payload = b"the quick brown fox";
    let jws = sign_detached(payload, "2026-07-28/01", &key).unwrap();
    let pk = key.public_key();
    verify_detached(&jws, payload, |_kid| Some(pk)).unwrap();
}

#[test]
fn verify_rejects_tampered_payload() {
    let key = Ed25519KeyPair::generate();
    let jws = sign_detached(b"original", "2026-07-28/01", &key).unwrap();
    let pk = key.public_key();
    let err = verify_detached(&jws, b"tampered", |_| Some(pk)).unwrap_err();
    assert!(matches!(err, CryptoError::SignatureInvalid));
}

#[test]
fn verify_rejects_wrong_key() {
    let key = Ed25519KeyPair::generate();
    let other = Ed25519KeyPair::generate();
    let jws = sign_detached(b"payload", "2026-07-28/01", &key).unwrap();
    let wrong_pk = other.public_key();
    let err = verify_detached(&jws, b"payload", |_| Some(wrong_pk)).unwrap_err();
    assert!(matches!(err, CryptoError::SignatureInvalid));
}

#[test]
fn verify_reports_key_not_found() {
    let key = Ed25519KeyPair::generate();
    let jws = sign_detached(b"payload", "2026-07-28/01", &key).unwrap();
    let err = verify_detached(&jws, b"payload", |_| None).unwrap_err();
    assert!(matches!(err, CryptoError::KeyNotFound(kid) if kid == "2026-07-28/01"));
}

#[test]
fn sign_rejects_malformed_kid() {
    let key = Ed25519KeyPair::generate();
    let err = sign_detached(b"payload", "not-a-kid", &key).unwrap_err();
    assert!(matches!(err, CryptoError::MalformedKid(_)));
}

#[test]
fn verify_rejects_malformed_kid_in_header_even_if_well_formed_b64() {
    let key = Ed25519KeyPair::generate();
    // Hand-build a protected header with an invalid kid to exercise the
    // verify-side validator independently of the sign-side one.
    let header = serde_json::json!({
        "alg": "EdDSA",
        "b64": false,
        "crit": ["b64"],
        "kid": "bad-kid",
    });
    let protected = peac_canon::to_jcs(&header).unwrap();
    let protected_b64 = b64url_encode(protected.as_bytes());
    let input = signing_input(&protected_b64, b"payload");
    let sig = key.sign_raw(&input);
    let jws = DetachedJws {
        protected: protected_b64,
        signature: b64url_encode(&sig.to_bytes()),
    };
    let pk = key.public_key();
    let err = verify_detached(&jws, b"payload", |_| Some(pk)).unwrap_err();
    assert!(matches!(err, CryptoError::MalformedKid(_)));
}

#[test]
fn detached_jws_serde_round_trips() {
    let key = Ed25519KeyPair::generate();
    let jws = sign_detached(b"payload", "2026-07-28/01", &key).unwrap();
    let json = serde_json::to_string(&jws).unwrap();
    let back: DetachedJws = serde_json::from_str(&json).unwrap();
    assert_eq!(jws, back);
}

#[test]
fn time_window_accepts_valid_range() {
    assert!(validate_time_window(1000, 1200, 1100).is_ok());
}

#[test]
fn time_window_rejects_window_wider_than_300s() {
    let err = validate_time_window(1000, 1400, 1100).unwrap_err();
    assert!(matches!(err, CryptoError::TimeInvalid { .. }));
}

#[test]
fn time_window_rejects_now_outside_window() {
    assert!(validate_time_window(1000, 1200, 900).is_err());
    assert!(validate_time_window(1000, 1200, 1300).is_err());
}

#[test]
fn time_window_rejects_exp_before_iat() {
    assert!(validate_time_window(1200, 1000, 1100).is_err());
}
