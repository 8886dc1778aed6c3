//! The capture session: a per-session mutex serialising writes into a
//! hash-chained spool.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::store::{SpoolStore, StoreError};
use peac_schema::spool::{compute_entry_digest, hash_payload, SpoolEntry, GENESIS_DIGEST};

/// One action submitted for capture.
#[derive(Debug, Clone)]
pub struct Action {
    /// A caller-assigned id, unique within the session, used for dedupe
    /// detection.
    pub id: String,
    /// When the action started.
    pub started_at: DateTime<Utc>,
    /// When the action completed, if it has.
    pub completed_at: Option<DateTime<Utc>>,
    /// The action payload recorded verbatim into `SpoolEntry::action`.
    pub payload: serde_json::Value,
    /// Raw input bytes to hash, if any.
    pub input: Option<Vec<u8>>,
    /// Raw output bytes to hash, if any.
    pub output: Option<Vec<u8>>,
}

impl Action {
    fn captured_at(&self) -> DateTime<Utc> {
        self.completed_at.unwrap_or(self.started_at)
    }
}

/// The six-code capture error taxonomy. Deliberately not
/// `peac_problem::Problem` — capture errors are a closed, capture-specific
/// set that never needs an RFC 9457 representation at this layer.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CaptureError {
    /// The same action id was already captured in this session.
    #[error("action {0:?} was already captured in this session")]
    Duplicate(String),
    /// The action failed a structural check (e.g. `completed_at` before
    /// `started_at`).
    #[error("invalid action: {0}")]
    InvalidAction(String),
    /// Hashing the entry (JCS canonicalisation) failed.
    #[error("hashing failed: {0}")]
    HashFailed(String),
    /// The backend store rejected the append.
    #[error("store failed: {0}")]
    StoreFailed(String),
    /// The session was already closed.
    #[error("capture session is closed")]
    SessionClosed,
    /// An invariant was broken inside the capture pipeline.
    #[error("internal capture error: {0}")]
    Internal(String),
}

/// The outcome of a single [`CaptureSession::capture`] call. Never an
/// `Err` returned from the function itself — every failure is encoded
/// here instead.
pub type CaptureResult = Result<SpoolEntry, CaptureError>;

struct SessionState {
    last_entry_digest: [u8; 32],
    sequence: u64,
    seen_action_ids: HashSet<String>,
    closed: bool,
}

impl SessionState {
    fn new() -> Self {
        Self {
            last_entry_digest: [0u8; 32],
            sequence: 0,
            seen_action_ids: HashSet::new(),
            closed: false,
        }
    }
}

fn encode_hex32(bytes: &[u8; 32]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn decode_hex32(hex: &str) -> [u8; 32] {
    let mut out = [0u8; 32];
    for (i, byte) in out.iter_mut().enumerate() {
        let pos = i * 2;
        *byte = u8::from_str_radix(&hex[pos..pos + 2], 16).expect("entry_digest is valid hex");
    }
    out
}

/// A single-writer capture session producing a hash-chained, deterministic
/// spool of [`SpoolEntry`] records.
pub struct CaptureSession {
    store: Arc<dyn SpoolStore>,
    state: Mutex<SessionState>,
}

impl CaptureSession {
    /// Start a new session writing into `store`.
    #[must_use]
    pub fn new(store: Arc<dyn SpoolStore>) -> Self {
        Self {
            store,
            state: Mutex::new(SessionState::new()),
        }
    }

    fn validate(action: &Action) -> Result<(), CaptureError> {
        if action.id.trim().is_empty() {
            return Err(CaptureError::InvalidAction("action id is empty".to_string()));
        }
        if let Some(completed_at) = action.completed_at {
            if completed_at < action.started_at {
                return Err(CaptureError::InvalidAction(
                    "completed_at precedes started_at".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Capture `action`, appending a new [`SpoolEntry`] to the chain.
    /// Never panics and never returns an `Err` from the function call
    /// itself — failures are values in the returned [`CaptureResult`].
    /// `sequence` increments on every call, including failed ones, so the
    /// chain's positional counter stays monotonic even when an entry is
    /// never produced; `prev_entry_digest` only ever advances on success.
    pub async fn capture(&self, action: Action) -> CaptureResult {
        let mut state = self.state.lock().await;

        if state.closed {
            return Err(CaptureError::SessionClosed);
        }

        state.sequence += 1;
        let sequence = state.sequence - 1;

        if let Err(err) = Self::validate(&action) {
            return Err(err);
        }
        if !state.seen_action_ids.insert(action.id.clone()) {
            return Err(CaptureError::Duplicate(action.id));
        }

        let captured_at = action.captured_at();
        let input_digest = action.input.as_deref().map(hash_payload);
        let output_digest = action.output.as_deref().map(hash_payload);
        let prev_entry_digest = if sequence == 0 {
            GENESIS_DIGEST.to_string()
        } else {
            encode_hex32(&state.last_entry_digest)
        };

        let entry_digest = compute_entry_digest(
            captured_at,
            &action.payload,
            input_digest.as_ref(),
            output_digest.as_ref(),
            &prev_entry_digest,
            sequence,
        )
        .map_err(|e| CaptureError::HashFailed(e.to_string()))?;

        let entry = SpoolEntry {
            captured_at,
            action: action.payload,
            input_digest,
            output_digest,
            prev_entry_digest,
            entry_digest: entry_digest.clone(),
            sequence,
        };

        self.store
            .append(&entry)
            .await
            .map_err(|StoreError(msg)| CaptureError::StoreFailed(msg))?;

        state.last_entry_digest = decode_hex32(&entry_digest);
        Ok(entry)
    }

    /// Close the session. Immediate and idempotent; in-flight `capture`
    /// calls may still complete, or observe `closed` and return
    /// `SessionClosed`. Calls the backend store's `close` exactly once.
    pub async fn close(&self) {
        let mut state = self.state.lock().await;
        if state.closed {
            return;
        }
        state.closed = true;
        drop(state);
        self.store.close().await;
    }
}
