//! The enforcement engine: `discover -> evaluate -> settle -> prove`.
//!
//! SSRF/HTTPS-scheme errors from `peac-fetch` surface here as
//! [`EngineError::Transport`] rather than as a [`peac_problem::Problem`] —
//! they signal misuse, not a policy outcome, so they are left as a plain
//! `thiserror` error for the caller to decide how to handle. Every other
//! failure path converts to `Problem`.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod discover;
pub mod evaluate;
pub mod prove;
pub mod settle;

pub use discover::{
    discover, DiscoveryEntry, DiscoveryError, PolicySource, WellKnownPolicySource,
    DISCOVERY_MAX_BODY_BYTES, DISCOVERY_TIMEOUT, PEAC_TXT_FALLBACK, WELL_KNOWN_PATHS,
};
pub use evaluate::{evaluate, EnforceContext, EvaluationOutcome, PrecedenceStage, PRECEDENCE_ORDER};
pub use prove::{prove, Claims, Proof, ProveError};
pub use settle::{settle, synthesize_challenge, PaymentHandler, SettleError};

use discover::PolicySource;
use evaluate::{EnforceContext, EvaluationOutcome};
use peac_crypto::Ed25519KeyPair;
use peac_fetch::FetchError;
use peac_nonce::NonceStore;
use peac_problem::Problem;
use peac_schema::{Decision, PurposeToken};
use prove::Claims;
use settle::PaymentHandler;
use std::time::Duration;
use uuid::Uuid;

/// Top-level failure of the `enforce` pipeline outside an evaluated
/// policy decision.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A discovery fetch failed for SSRF or scheme-allowlist reasons —
    /// intentionally NOT converted to `Problem`; see the crate's top-level
    /// documentation.
    #[error("transport error during discovery: {0}")]
    Transport(#[from] FetchError),
    /// Settlement could not proceed and no receipt can be issued.
    #[error("payment required")]
    PaymentRequired(Problem),
    /// Proof issuance failed.
    #[error("proof issuance failed: {0}")]
    Prove(#[from] prove::ProveError),
    /// Hashing the discovered policy documents failed.
    #[error("policy hash computation failed: {0}")]
    PolicyHash(#[from] peac_canon::CanonError),
}

/// The outcome of running the full `enforce` pipeline.
#[derive(Debug)]
pub struct EnforceResult {
    /// Whether the resource access is allowed to proceed.
    pub allowed: bool,
    /// The signed proof, present when `allowed` and proving succeeded.
    pub proof: Option<prove::Proof>,
    /// The decision that was reached.
    pub decision: evaluate::EvaluationOutcome,
}

/// Everything `enforce` needs beyond the policy source, payment handler,
/// and nonce store, which are injected separately so they can be swapped
/// for test doubles.
pub struct EnforceRequest<'a> {
    /// Origin to discover policy documents against.
    pub base_url: String,
    /// The resource being accessed.
    pub resource: String,
    /// The declared purpose, if any.
    pub purpose: Option<PurposeToken>,
    /// The calling agent's identity, signed into `sub`.
    pub subject: String,
    /// Receipt issuer URL.
    pub issuer: String,
    /// Receipt audience.
    pub audience: String,
    /// Active signing key id.
    pub kid: String,
    /// The signing key.
    pub key: &'a Ed25519KeyPair,
    /// Caller-supplied current time, Unix seconds. Never read from the
    /// system clock here so the pipeline stays deterministic to test.
    pub now: i64,
    /// How long a proof is valid for once issued.
    pub proof_ttl: Duration,
}

/// Run the full `discover -> evaluate -> settle -> prove` pipeline.
///
/// A hard `Deny` with no payment requirement short-circuits before
/// settlement or proving. A `Review` decision settles (if payment was
/// required) but is never proved — it is returned as not-allowed with the
/// decision attached so the caller can surface it for human review. Only
/// an `Allow` (or a `Deny` that was resolved by successful settlement)
/// reaches `prove`.
pub async fn enforce(
    req: &EnforceRequest<'_>,
    source: &dyn PolicySource,
    payment_handler: Option<&dyn PaymentHandler>,
    nonce_store: &dyn NonceStore,
) -> Result<EnforceResult, EngineError> {
    let discoveries = discover::discover(source, &req.base_url).await;
    let ctx = EnforceContext {
        resource: req.resource.clone(),
        purpose: req.purpose.clone(),
    };
    let decision = evaluate::evaluate(&discoveries, &ctx);

    if decision.decision == Decision::Deny && !decision.payment_required {
        return not_allowed(decision);
    }

    let payment = settle::settle(&ctx, &decision, payment_handler)
        .await
        .map_err(EngineError::PaymentRequired)?;

    if decision.decision == Decision::Review {
        return not_allowed(decision);
    }

    let policy_doc = serde_json::Value::Array(
        discoveries
            .iter()
            .filter_map(|d| d.outcome.as_ref().ok())
            .cloned()
            .collect(),
    );
    let policy_hash = peac_canon::policy_hash(&req.base_url, &policy_doc)?;

    let claims = Claims {
        iss: req.issuer.clone(),
        sub: req.subject.clone(),
        aud: req.audience.clone(),
        iat: req.now,
        exp: req.now + i64::try_from(req.proof_ttl.as_secs()).unwrap_or(i64::MAX),
        rid: Uuid::now_v7(),
        purpose: req.purpose.as_ref().map(|p| p.to_string()),
        policy_hash,
        payment,
    };
    let proof = prove::prove(claims, &req.kid, req.key, nonce_store, req.proof_ttl).await?;

    Ok(EnforceResult {
        allowed: true,
        proof: Some(proof),
        decision,
    })
}

fn not_allowed(decision: EvaluationOutcome) -> Result<EnforceResult, EngineError> {
    Ok(EnforceResult {
        allowed: false,
        proof: None,
        decision,
    })
}
