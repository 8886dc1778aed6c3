//! Hand-rolled `kid` format validator: `^\d{4}-\d{2}-\d{2}/\d{2}$`.
//!
//! A byte-wise parser is used instead of a `regex` dependency — this crate
//! is small and the grammar is fixed-width, so a regex engine buys nothing.

use crate::CryptoError;

/// Validate that `kid` matches `YYYY-MM-DD/nn` exactly (four-digit year,
/// two-digit month, two-digit day, a literal `/`, two-digit rotation
/// counter). Digits are not range-checked against real calendar dates —
/// only the shape is enforced, matching what both the signer and the
/// verifier need to agree on.
pub fn validate_kid(kid: &str) -> Result<(), CryptoError> {
    let bytes = kid.as_bytes();
    let shape_ok = bytes.len() == 13
        && is_digit(bytes, 0..4)
        && bytes[4] == b'-'
        && is_digit(bytes, 5..7)
        && bytes[7] == b'-'
        && is_digit(bytes, 8..10)
        && bytes[10] == b'/'
        && is_digit(bytes, 11..13);
    if shape_ok {
        Ok(())
    } else {
        Err(CryptoError::MalformedKid(kid.to_string()))
    }
}

fn is_digit(bytes: &[u8], range: std::ops::Range<usize>) -> bool {
    bytes[range].iter().all(u8::is_ascii_digit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_kid() {
        assert!(validate_kid("2026-07-28/01").is_ok());
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(validate_kid("2026-7-28/01").is_err());
        assert!(validate_kid("2026-07-28/1").is_err());
    }

    #[test]
    fn rejects_wrong_separators() {
        assert!(validate_kid("2026/07/28/01").is_err());
        assert!(validate_kid("2026-07-28-01").is_err());
    }

    #[test]
    fn rejects_non_digit_segments() {
        assert!(validate_kid("20a6-07-28/01").is_err());
    }

    #[test]
    fn rejects_empty_string() {
        assert!(validate_kid("").is_err());
    }
}
