//! Rail-agnostic payment evidence.
//!
//! `rail` is a closed discriminated union rather than a free-form string —
//! grounded in the `AgentRegistration`/`AgentService` shapes the x402/
//! ERC-8004 reference types use for rail-specific metadata — so unknown
//! rails still round-trip (via `Other`) without the type losing the
//! ability to match exhaustively on the rails it knows about.

use serde::{Deserialize, Serialize};

/// Which payment rail produced a [`PaymentEvidence`] record.
///
/// Serialises as a plain string (`"x402"`, `"l402"`, `"fluora"`, or the
/// verbatim name of an unrecognised rail) rather than as a tagged object —
/// `serde`'s derive macros have no representation for "closed enum with a
/// string fallback variant" that still serialises as a bare string, so
/// this is implemented by hand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rail {
    /// HTTP 402-based x402 payments.
    X402,
    /// Lightning-based L402 payments.
    L402,
    /// Fluora rail.
    Fluora,
    /// Any other rail, carrying its own name verbatim.
    Other(String),
}

impl Rail {
    /// The wire string for this rail.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::X402 => "x402",
            Self::L402 => "l402",
            Self::Fluora => "fluora",
            Self::Other(name) => name,
        }
    }
}

impl From<&str> for Rail {
    fn from(value: &str) -> Self {
        match value {
            "x402" => Self::X402,
            "l402" => Self::L402,
            "fluora" => Self::Fluora,
            other => Self::Other(other.to_string()),
        }
    }
}

impl Serialize for Rail {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Rail {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Rail::from(s.as_str()))
    }
}

/// Whether a payment was made in `live` or `test` mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentEnv {
    /// A real, settled payment.
    Live,
    /// A test/sandbox payment.
    Test,
}

/// How a payment was routed to the publisher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Routing {
    /// Paid directly to the publisher.
    Direct,
    /// Routed through a callback/webhook.
    Callback,
    /// Routed through a distinct role (e.g. an aggregator).
    Role,
}

/// A share of a payment attributed to one party. Closed shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PaymentSplit {
    /// The party this split is attributed to.
    pub party: String,
    /// An absolute amount, if this split is amount-denominated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    /// A fractional share in `[0, 1]`, if this split is share-denominated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share: Option<f64>,
}

/// Errors from [`PaymentSplit::validate`] / [`PaymentEvidence::validate`].
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum PaymentValidationError {
    /// A split had neither `amount` nor a valid `share`.
    #[error("split for party {party:?} has neither a non-negative amount nor a share in [0,1]")]
    SplitMissingAmountOrShare {
        /// The party whose split failed validation.
        party: String,
    },
}

impl PaymentSplit {
    /// At least one of `amount >= 0` or `share in [0, 1]` must hold.
    /// The sum of shares/amounts across splits is deliberately NOT
    /// enforced.
    pub fn validate(&self) -> Result<(), PaymentValidationError> {
        let amount_ok = self.amount.is_some_and(|a| a >= 0.0);
        let share_ok = self.share.is_some_and(|s| (0.0..=1.0).contains(&s));
        if amount_ok || share_ok {
            Ok(())
        } else {
            Err(PaymentValidationError::SplitMissingAmountOrShare {
                party: self.party.clone(),
            })
        }
    }
}

/// Normalised, rail-agnostic payment evidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentEvidence {
    /// Which rail produced this evidence.
    pub rail: Rail,
    /// The rail's own reference/transaction id.
    pub reference: String,
    /// The amount paid, in `currency`'s minor or major unit as the rail
    /// defines.
    pub amount: f64,
    /// ISO 4217 currency code, or a rail-specific asset ticker.
    pub currency: String,
    /// The underlying asset, if distinct from `currency` (e.g. a token).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset: Option<String>,
    /// Whether this was a live or test payment.
    pub env: PaymentEnv,
    /// The network the payment settled on, if applicable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    /// The facilitator that brokered the payment, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facilitator: Option<String>,
    /// The facilitator's own reference for this payment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facilitator_ref: Option<String>,
    /// Opaque, rail-specific evidence payload.
    pub evidence: serde_json::Value,
    /// The aggregator that settled this payment, if routed through one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregator: Option<String>,
    /// How this payment was split across parties.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub splits: Vec<PaymentSplit>,
    /// How the payment was routed to the publisher.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub routing: Option<Routing>,
}

impl PaymentEvidence {
    /// Validate every split in `splits`.
    pub fn validate(&self) -> Result<(), Vec<PaymentValidationError>> {
        let errors: Vec<_> = self
            .splits
            .iter()
            .filter_map(|s| s.validate().err())
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
