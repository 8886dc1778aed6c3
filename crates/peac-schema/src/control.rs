//! Composable governance.

use serde::{Deserialize, Serialize};

/// The outcome of a single control step or of a whole [`ControlBlock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Access is allowed.
    Allow,
    /// Access is denied.
    Deny,
    /// Access requires human review before proceeding.
    Review,
}

/// One link in a [`ControlBlock`]'s chain. Closed shape — unknown fields
/// are rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ControlStep {
    /// The policy engine that produced this step.
    pub engine: String,
    /// The engine's version, if tracked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// The specific policy identifier this step evaluated, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_id: Option<String>,
    /// This step's own decision.
    pub result: Decision,
    /// A human-readable reason for `result`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// The purpose this step evaluated against, if purpose-scoped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    /// A licensing mode tag, if this step concerns licensing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub licensing_mode: Option<String>,
    /// The scope this step's decision applies to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// A snapshot of the limits this step enforced.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limits_snapshot: Option<serde_json::Value>,
    /// A reference to supporting evidence for this step's decision.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence_ref: Option<String>,
}

/// The combination rule a [`ControlBlock`] uses to fold its chain's
/// per-step results into one decision. Only one combinator exists today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Combinator {
    /// Any step that denies forces the overall decision to `deny`.
    AnyCanVeto,
}

/// Composable governance result: a chain of [`ControlStep`]s folded by
/// `combinator` into an overall [`Decision`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlBlock {
    /// The steps that were evaluated, in evaluation order. Must be
    /// non-empty.
    pub chain: Vec<ControlStep>,
    /// The overall decision.
    pub decision: Decision,
    /// How `decision` was derived from `chain`.
    pub combinator: Combinator,
}

/// Errors from [`ControlBlock::validate`].
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ControlBlockError {
    /// `chain` was empty.
    #[error("control block chain must have at least one step")]
    EmptyChain,
    /// A step denied but the overall decision was not `deny`.
    #[error("a step denied but the overall decision was {0:?}")]
    DenyNotPropagated(Decision),
    /// Every step allowed but the overall decision was not `allow`.
    #[error("every step allowed but the overall decision was {0:?}")]
    AllowNotPropagated(Decision),
}

impl ControlBlock {
    /// Enforce the consistency rule: any `deny` step forces an
    /// overall `deny`; all-`allow` forces an overall `allow`; otherwise the
    /// overall decision may be `review`.
    pub fn validate(&self) -> Result<(), ControlBlockError> {
        if self.chain.is_empty() {
            return Err(ControlBlockError::EmptyChain);
        }
        let any_deny = self.chain.iter().any(|s| s.result == Decision::Deny);
        let all_allow = self.chain.iter().all(|s| s.result == Decision::Allow);

        if any_deny && self.decision != Decision::Deny {
            return Err(ControlBlockError::DenyNotPropagated(self.decision));
        }
        if all_allow && !any_deny && self.decision != Decision::Allow {
            return Err(ControlBlockError::AllowNotPropagated(self.decision));
        }
        Ok(())
    }
}
