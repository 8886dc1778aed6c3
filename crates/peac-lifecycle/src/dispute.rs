//! Dispute state transitions.

use peac_schema::{is_legal_transition, DisputeState};

/// A requested dispute transition was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    /// `from -> to` is not in the legal-transition table.
    #[error("{from:?} -> {to:?} is not a legal dispute transition")]
    InvalidTransition {
        /// The state the dispute was in.
        from: DisputeState,
        /// The state the transition was attempted to.
        to: DisputeState,
    },
    /// The target state is terminal but no `resolution` was supplied.
    #[error("transitioning to a terminal state requires a resolution")]
    ResolutionRequired,
    /// The target state is non-terminal but a `resolution` was supplied.
    #[error("a resolution may only be set on a terminal state")]
    ResolutionNotAllowed,
}

impl From<TransitionError> for peac_problem::Problem {
    fn from(err: TransitionError) -> Self {
        let code = match err {
            TransitionError::InvalidTransition { .. } => peac_problem::ErrorCode::InvalidTransition,
            TransitionError::ResolutionRequired => peac_problem::ErrorCode::ResolutionRequired,
            TransitionError::ResolutionNotAllowed => peac_problem::ErrorCode::ResolutionNotAllowed,
        };
        peac_problem::Problem::new(code, "dispute transition rejected").with_detail(err.to_string())
    }
}

/// Attempt `current -> next`, enforcing both the legal-transition table and
/// the terminal-state/resolution invariant in one call.
/// `reason` is recorded for audit purposes only and does not affect the
/// outcome.
pub fn transition_dispute(
    current: DisputeState,
    next: DisputeState,
    reason: &str,
    resolution: Option<&str>,
) -> Result<DisputeState, TransitionError> {
    if !is_legal_transition(current, next) {
        return Err(TransitionError::InvalidTransition { from: current, to: next });
    }

    match (next.is_terminal(), resolution) {
        (true, None) => return Err(TransitionError::ResolutionRequired),
        (false, Some(_)) => return Err(TransitionError::ResolutionNotAllowed),
        _ => {}
    }

    tracing::info!(from = ?current, to = ?next, reason, "dispute transitioned");
    Ok(next)
}
