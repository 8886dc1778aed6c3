//! Wire schemas and cross-field invariants for the PEAC receipt envelope,
//! attestations, and their state machines.
//!
//! Entities with an open shape — [`envelope::Auth`], [`envelope::Evidence`],
//! [`envelope::Meta`], [`envelope::Envelope`] — flatten unrecognised fields
//! into an `extensions` map instead of rejecting them, so an unknown `ext`
//! namespace survives a decode/encode round trip bit-for-bit. Entities with
//! a closed shape — [`control::ControlStep`], [`payment::PaymentSplit`],
//! [`attestation::Attestation`] — deny unknown fields outright.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod attestation;
pub mod control;
pub mod dispute;
pub mod envelope;
pub mod json_guard;
pub mod payment;
pub mod purpose;
pub mod spool;
pub mod workflow;

pub use attestation::{Attestation, AttestationKind, DEFAULT_CLOCK_SKEW_SECS};
pub use control::{Combinator, ControlBlock, ControlBlockError, ControlStep, Decision};
pub use dispute::{
    is_legal_transition, validate_dispute, DisputeRecord, DisputeState, DisputeValidationError,
};
pub use envelope::{Auth, Envelope, EnvelopeError, Evidence, Meta};
pub use json_guard::{check as check_json_guard, JsonGuardError, JsonGuardLimits};
pub use payment::{
    PaymentEnv, PaymentEvidence, PaymentSplit, PaymentValidationError, Rail, Routing,
};
pub use purpose::{PurposeReason, PurposeToken, PurposeTokenError, CANONICAL_PURPOSES};
pub use spool::{compute_entry_digest, hash_payload, PayloadDigest, SpoolEntry, GENESIS_DIGEST};
pub use workflow::{
    AttributionError, AttributionGraph, AttributionSource, WorkflowGraph, WorkflowStatus,
    WorkflowStep, WorkflowValidationError,
};
