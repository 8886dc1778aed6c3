//! Bounded audit-event channel. A fetch's security-relevant decisions
//! (redirect followed/denied, DNS answer classified, mixed-answer block)
//! are pushed onto a bounded `mpsc` channel rather than logged directly,
//! so a slow or absent consumer cannot make `SafeFetcher` block on I/O it
//! doesn't otherwise need.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// A security-relevant event raised during a fetch.
#[derive(Debug, Clone)]
pub enum AuditEvent {
    /// A redirect was followed.
    RedirectFollowed {
        /// The URL the redirect pointed away from.
        from: String,
        /// The URL the redirect pointed to.
        to: String,
    },
    /// A redirect was refused by the configured [`crate::RedirectPolicy`].
    RedirectDenied {
        /// The URL the redirect pointed away from.
        from: String,
        /// The URL the redirect pointed to.
        to: String,
    },
    /// A DNS answer resolved to a private/reserved address and the fetch
    /// was blocked.
    BlockedPrivateAddress {
        /// The host that was being resolved.
        host: String,
        /// The address that triggered the block.
        addr: String,
    },
    /// A DNS answer set mixed public and private addresses and the fetch
    /// was blocked.
    MixedDnsBlocked {
        /// The host that was being resolved.
        host: String,
    },
    /// The audit channel was full and one or more events were dropped.
    /// Raised at most once per overflow window to avoid amplifying the
    /// overflow into more events.
    AuditOverflow {
        /// How many events were dropped since the last `AuditOverflow`.
        dropped: u64,
    },
    /// Delivering an event to the channel failed for a reason other than
    /// being full (e.g. the receiver was dropped).
    AuditHookError {
        /// A description of the failure.
        reason: String,
    },
}

/// A bounded sender for [`AuditEvent`]s that degrades to counting drops
/// instead of blocking or panicking when the channel is full, and guards
/// against infinitely recursing into itself while reporting an overflow.
#[derive(Clone)]
pub struct AuditSink {
    tx: mpsc::Sender<AuditEvent>,
    dropped: Arc<std::sync::atomic::AtomicU64>,
    reporting_overflow: Arc<AtomicBool>,
}

impl AuditSink {
    /// Create a sink/receiver pair with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<AuditEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (
            Self {
                tx,
                dropped: Arc::new(std::sync::atomic::AtomicU64::new(0)),
                reporting_overflow: Arc::new(AtomicBool::new(false)),
            },
            rx,
        )
    }

    /// Best-effort send: if the channel is full, counts the drop and (at
    /// most once until the next successful send) emits a single
    /// `AuditOverflow` summarising the count instead of blocking.
    pub fn emit(&self, event: AuditEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                if self
                    .reporting_overflow
                    .compare_exchange(false, true, Ordering::AcqRel, Ordering::Relaxed)
                    .is_ok()
                {
                    let dropped = self.dropped.swap(0, Ordering::AcqRel);
                    if self
                        .tx
                        .try_send(AuditEvent::AuditOverflow { dropped })
                        .is_err()
                    {
                        tracing::warn!(dropped, "audit channel overflowed and stayed full");
                    }
                    self.reporting_overflow.store(false, Ordering::Release);
                }
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!("audit receiver dropped; discarding event");
            }
        }
    }
}
