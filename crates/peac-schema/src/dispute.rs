//! Dispute attestations: a state machine over the lifecycle
//! of a contested interaction.

use serde::{Deserialize, Serialize};

/// Where a dispute stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisputeState {
    /// Raised, awaiting acknowledgement.
    Filed,
    /// Acknowledged by the counterparty.
    Acknowledged,
    /// Rejected outright. Terminal.
    Rejected,
    /// Under active investigation.
    UnderReview,
    /// Resolved. Terminal.
    Resolved,
    /// Escalated beyond the initial reviewer.
    Escalated,
    /// Appealed after a rejection or resolution.
    Appealed,
    /// Final — no further transitions possible. Terminal.
    Final,
}

impl DisputeState {
    /// Terminal states require a `resolution` to be set; non-terminal
    /// states forbid one.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Resolved | Self::Rejected | Self::Final)
    }

    /// The states legally reachable directly from this one.
    #[must_use]
    pub fn allowed_transitions(self) -> &'static [DisputeState] {
        use DisputeState::{
            Acknowledged, Appealed, Escalated, Filed, Final, Rejected, Resolved, UnderReview,
        };
        match self {
            Filed => &[Acknowledged, Rejected],
            Acknowledged => &[UnderReview, Rejected],
            UnderReview => &[Resolved, Escalated],
            Escalated => &[Resolved],
            Resolved => &[Appealed, Final],
            Rejected => &[Appealed, Final],
            Appealed => &[UnderReview, Final],
            Final => &[],
        }
    }
}

/// Is `from -> to` a legal transition?
#[must_use]
pub fn is_legal_transition(from: DisputeState, to: DisputeState) -> bool {
    from.allowed_transitions().contains(&to)
}

/// A dispute attestation's evidence payload (carried in
/// `Attestation::evidence` for a `peac/dispute` attestation).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisputeRecord {
    /// The receipt or interaction this dispute concerns.
    pub subject_ref: String,
    /// The party raising the dispute.
    pub claimant: String,
    /// Current lifecycle state.
    pub state: DisputeState,
    /// A short reason/summary.
    pub reason: String,
    /// The resolution outcome, required iff `state.is_terminal()`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
}

/// Errors from [`validate_dispute`].
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum DisputeValidationError {
    /// A terminal state had no `resolution`.
    #[error("dispute state {0:?} is terminal and requires a resolution")]
    MissingResolution(DisputeState),
    /// A non-terminal state had a `resolution` set.
    #[error("dispute state {0:?} is not terminal and must not carry a resolution")]
    UnexpectedResolution(DisputeState),
}

/// Enforce the invariant: terminal states require `resolution`,
/// non-terminal states forbid it.
pub fn validate_dispute(record: &DisputeRecord) -> Result<(), DisputeValidationError> {
    let terminal = record.state.is_terminal();
    match (terminal, record.resolution.is_some()) {
        (true, false) => Err(DisputeValidationError::MissingResolution(record.state)),
        (false, true) => Err(DisputeValidationError::UnexpectedResolution(record.state)),
        _ => Ok(()),
    }
}

impl From<DisputeValidationError> for peac_problem::Problem {
    fn from(err: DisputeValidationError) -> Self {
        let code = match err {
            DisputeValidationError::MissingResolution(_) => {
                peac_problem::ErrorCode::ResolutionRequired
            }
            DisputeValidationError::UnexpectedResolution(_) => {
                peac_problem::ErrorCode::ResolutionNotAllowed
            }
        };
        peac_problem::Problem::new(code, "dispute validation failed").with_detail(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(state: DisputeState, resolution: Option<&str>) -> DisputeRecord {
        DisputeRecord {
            subject_ref: "receipt:abc".to_string(),
            claimant: "agent:foo".to_string(),
            state,
            reason: "quality dispute".to_string(),
            resolution: resolution.map(str::to_string),
        }
    }

    #[test]
    fn filed_without_resolution_is_valid() {
        assert!(validate_dispute(&record(DisputeState::Filed, None)).is_ok());
    }

    #[test]
    fn resolved_without_resolution_is_invalid() {
        let err = validate_dispute(&record(DisputeState::Resolved, None)).unwrap_err();
        assert!(matches!(err, DisputeValidationError::MissingResolution(_)));
    }

    #[test]
    fn filed_with_resolution_is_invalid() {
        let err = validate_dispute(&record(DisputeState::Filed, Some("n/a"))).unwrap_err();
        assert!(matches!(
            err,
            DisputeValidationError::UnexpectedResolution(_)
        ));
    }

    #[test]
    fn final_with_resolution_is_valid() {
        assert!(validate_dispute(&record(DisputeState::Final, Some("closed"))).is_ok());
    }

    #[test]
    fn terminal_states_have_limited_or_no_outgoing_transitions() {
        assert!(DisputeState::Final.allowed_transitions().is_empty());
        assert!(is_legal_transition(DisputeState::Resolved, DisputeState::Appealed));
        assert!(is_legal_transition(DisputeState::Resolved, DisputeState::Final));
        assert!(!is_legal_transition(DisputeState::Resolved, DisputeState::UnderReview));
    }

    #[test]
    fn filed_can_move_to_acknowledged_or_rejected_only() {
        assert!(is_legal_transition(DisputeState::Filed, DisputeState::Acknowledged));
        assert!(is_legal_transition(DisputeState::Filed, DisputeState::Rejected));
        assert!(!is_legal_transition(DisputeState::Filed, DisputeState::Resolved));
    }

    #[test]
    fn appealed_can_return_to_under_review() {
        assert!(is_legal_transition(
            DisputeState::Appealed,
            DisputeState::UnderReview
        ));
    }
}
