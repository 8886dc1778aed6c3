//! Facade crate for the PEAC protocol stack.
//!
//! Depending on `peac-protocol` pulls in every component crate behind a
//! cargo feature of the same name (all enabled by default); narrow with
//! `default-features = false` plus the features you need, or depend on the
//! component crates directly.

#![deny(unsafe_code)]

#[cfg(feature = "canon")]
pub use peac_canon as canon;

#[cfg(feature = "crypto")]
pub use peac_crypto as crypto;

#[cfg(feature = "nonce")]
pub use peac_nonce as nonce;

#[cfg(feature = "fetch")]
pub use peac_fetch as fetch;

#[cfg(feature = "schema")]
pub use peac_schema as schema;

#[cfg(feature = "engine")]
pub use peac_engine as engine;

#[cfg(feature = "receipt")]
pub use peac_receipt as receipt;

#[cfg(feature = "capture")]
pub use peac_capture as capture;

#[cfg(feature = "verifier")]
pub use peac_verifier as verifier;

#[cfg(feature = "lifecycle")]
pub use peac_lifecycle as lifecycle;

#[cfg(feature = "config")]
pub use peac_config as config;

#[cfg(feature = "problem")]
pub use peac_problem as problem;
