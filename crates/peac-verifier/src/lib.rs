//! Edge verifier for TAP (Trusted Agent Protocol) request signatures.
//!
//! Fail-closed by default: an unconfigured or misconfigured
//! [`VerifierConfig`] rejects rather than falls open, and every unsafe
//! toggle must be unlocked with its matching acknowledgement literal.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod jwks;
pub mod signature;
pub mod verify;

pub use config::{
    ConfigError, IssuerAllowlist, ReplayPolicy, UnknownTagPolicy, VerifierConfig,
    ACK_ALLOW_ANY_ISSUER, ACK_ALLOW_NO_REPLAY, ACK_ALLOW_UNKNOWN_TAGS, DEFAULT_SKEW_SECONDS,
    MAX_WINDOW_SECONDS,
};
pub use jwks::{JwksCache, JwksError, JwksResolver, StaticJwksResolver, JWKS_CACHE_TTL};
pub use signature::{
    build_signature_base, parse_signature, parse_signature_input, ComponentSource,
    SignatureInput, SignatureParseError, REQUIRED_COMPONENTS,
};
pub use verify::{verify_tap, TapRequest, Verified};
