//! Settlement: delegate a `payment_required` outcome
//! to an injected handler, falling back to a deterministic 402 challenge
//! if none is configured or the handler itself fails.

use crate::evaluate::{EnforceContext, EvaluationOutcome};
use async_trait::async_trait;
use peac_problem::{ErrorCode, Problem};
use peac_schema::PaymentEvidence;

/// Why settlement failed.
#[derive(Debug, thiserror::Error)]
pub enum SettleError {
    /// The handler itself reported a failure.
    #[error("payment handler failed: {0}")]
    HandlerFailed(String),
}

/// Settles a `payment_required` decision against a specific rail.
#[async_trait]
pub trait PaymentHandler: Send + Sync {
    /// Attempt to settle payment for `outcome` under `ctx`.
    async fn settle(
        &self,
        ctx: &EnforceContext,
        outcome: &EvaluationOutcome,
    ) -> Result<PaymentEvidence, SettleError>;
}

/// The deterministic 402 challenge body returned when no handler is
/// configured, or the configured handler fails, for a `payment_required`
/// outcome. The caller sees a structured 402, never a bare 500.
#[must_use]
pub fn synthesize_challenge(ctx: &EnforceContext) -> Problem {
    Problem::new(ErrorCode::ReceiptMissing, "payment required to access this resource")
        .with_extension("resource", &ctx.resource)
}

/// Run settlement for `outcome`: if it isn't `payment_required`, there is
/// nothing to settle. Otherwise delegate to `handler` if present; its
/// failure (or its absence) synthesizes the challenge rather than
/// propagating an error.
pub async fn settle(
    ctx: &EnforceContext,
    outcome: &EvaluationOutcome,
    handler: Option<&dyn PaymentHandler>,
) -> Result<Option<PaymentEvidence>, Problem> {
    if !outcome.payment_required {
        return Ok(None);
    }
    match handler {
        None => Err(synthesize_challenge(ctx)),
        Some(handler) => match handler.settle(ctx, outcome).await {
            Ok(evidence) => Ok(Some(evidence)),
            Err(_) => Err(synthesize_challenge(ctx)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluate::PrecedenceStage;
    use peac_schema::{Decision, PaymentEnv, Rail};

    fn ctx() -> EnforceContext {
        EnforceContext {
            resource: "https://origin.example/thing".to_string(),
            purpose: None,
        }
    }

    fn payment_required_outcome() -> EvaluationOutcome {
        EvaluationOutcome {
            decision: Decision::Deny,
            stage: Some(PrecedenceStage::Commerce),
            reason: "payment_required".to_string(),
            payment_required: true,
        }
    }

    struct AlwaysSettles;
    #[async_trait]
    impl PaymentHandler for AlwaysSettles {
        async fn settle(
            &self,
            _ctx: &EnforceContext,
            _outcome: &EvaluationOutcome,
        ) -> Result<PaymentEvidence, SettleError> {
            Ok(PaymentEvidence {
                rail: Rail::X402,
                reference: "ref-1".to_string(),
                amount: 1.0,
                currency: "USD".to_string(),
                asset: None,
                env: PaymentEnv::Live,
                network: None,
                facilitator: None,
                facilitator_ref: None,
                evidence: serde_json::json!({}),
                aggregator: None,
                splits: vec![],
                routing: None,
            })
        }
    }

    struct AlwaysFails;
    #[async_trait]
    impl PaymentHandler for AlwaysFails {
        async fn settle(
            &self,
            _ctx: &EnforceContext,
            _outcome: &EvaluationOutcome,
        ) -> Result<PaymentEvidence, SettleError> {
            Err(SettleError::HandlerFailed("facilitator unreachable".to_string()))
        }
    }

    #[tokio::test]
    async fn non_payment_outcomes_need_no_settlement() {
        let outcome = EvaluationOutcome {
            decision: Decision::Allow,
            stage: None,
            reason: "no_policies_found".to_string(),
            payment_required: false,
        };
        let result = settle(&ctx(), &outcome, None).await;
        assert!(result.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_handler_synthesizes_challenge() {
        let problem = settle(&ctx(), &payment_required_outcome(), None)
            .await
            .unwrap_err();
        assert_eq!(problem.code, ErrorCode::ReceiptMissing);
        assert_eq!(problem.status, 402);
    }

    #[tokio::test]
    async fn failing_handler_synthesizes_challenge_not_error() {
        let handler = AlwaysFails;
        let problem = settle(&ctx(), &payment_required_outcome(), Some(&handler))
            .await
            .unwrap_err();
        assert_eq!(problem.code, ErrorCode::ReceiptMissing);
    }

    #[tokio::test]
    async fn succeeding_handler_returns_evidence() {
        let handler = AlwaysSettles;
        let evidence = settle(&ctx(), &payment_required_outcome(), Some(&handler))
            .await
            .unwrap();
        assert!(evidence.is_some());
    }
}
