//! Deny-safe precedence evaluation.

use crate::discover::DiscoveryEntry;
use peac_schema::{Decision, PurposeToken};

/// The evaluation stages, walked in this fixed order. Each stage's rule,
/// if present in a discovered policy document, either settles the
/// decision or falls through to the next stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrecedenceStage {
    /// Does anything permit the action at all.
    Permission,
    /// Has the relevant party consented.
    Consent,
    /// Is payment required or already settled.
    Commerce,
    /// Is attribution owed.
    Attribution,
    /// Does the action satisfy compliance constraints.
    Compliance,
}

/// Stages in evaluation order.
pub const PRECEDENCE_ORDER: [PrecedenceStage; 5] = [
    PrecedenceStage::Permission,
    PrecedenceStage::Consent,
    PrecedenceStage::Commerce,
    PrecedenceStage::Attribution,
    PrecedenceStage::Compliance,
];

impl PrecedenceStage {
    fn key(self) -> &'static str {
        match self {
            Self::Permission => "permission",
            Self::Consent => "consent",
            Self::Commerce => "commerce",
            Self::Attribution => "attribution",
            Self::Compliance => "compliance",
        }
    }
}

/// The context an evaluation runs under.
#[derive(Debug, Clone)]
pub struct EnforceContext {
    /// The resource being accessed.
    pub resource: String,
    /// The declared purpose, if any.
    pub purpose: Option<PurposeToken>,
}

/// The result of walking the precedence chain.
#[derive(Debug, Clone)]
pub struct EvaluationOutcome {
    /// The settled decision.
    pub decision: Decision,
    /// The stage whose rule settled it, or `None` on a fail-open/no-match
    /// default.
    pub stage: Option<PrecedenceStage>,
    /// A short machine-readable reason, e.g. `no_policies_found` or
    /// `payment_required`.
    pub reason: String,
    /// Whether settlement is required before the caller proceeds — true
    /// exactly when the commerce stage denied with `payment_required`.
    pub payment_required: bool,
}

/// Evaluate `discoveries` against `ctx`, walking PERMISSION -> CONSENT ->
/// COMMERCE -> ATTRIBUTION -> COMPLIANCE. If every discovery errored, fails
/// open with reason `no_policies_found`. Otherwise the first stage whose
/// rule resolves (across any successfully discovered document) wins.
#[must_use]
pub fn evaluate(discoveries: &[DiscoveryEntry], _ctx: &EnforceContext) -> EvaluationOutcome {
    let documents: Vec<&serde_json::Value> =
        discoveries.iter().filter_map(|d| d.outcome.as_ref().ok()).collect();

    if documents.is_empty() {
        return EvaluationOutcome {
            decision: Decision::Allow,
            stage: None,
            reason: "no_policies_found".to_string(),
            payment_required: false,
        };
    }

    for stage in PRECEDENCE_ORDER {
        for doc in &documents {
            let Some(rule) = doc.get(stage.key()) else {
                continue;
            };
            let Some(result) = rule.get("result").and_then(serde_json::Value::as_str) else {
                continue;
            };
            let decision = match result {
                "allow" => Decision::Allow,
                "deny" => Decision::Deny,
                "review" => Decision::Review,
                _ => continue,
            };
            let payment_required =
                decision == Decision::Deny && stage == PrecedenceStage::Commerce;
            let reason = if payment_required {
                "payment_required".to_string()
            } else {
                format!("{}_{}", stage.key(), decision_word(decision))
            };
            return EvaluationOutcome {
                decision,
                stage: Some(stage),
                reason,
                payment_required,
            };
        }
    }

    EvaluationOutcome {
        decision: Decision::Allow,
        stage: None,
        reason: "no_matching_rule".to_string(),
        payment_required: false,
    }
}

fn decision_word(decision: Decision) -> &'static str {
    match decision {
        Decision::Allow => "allow",
        Decision::Deny => "deny",
        Decision::Review => "review",
    }
}
