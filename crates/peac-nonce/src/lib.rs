//! Bounded-TTL nonce cache used for TAP replay protection and
//! for `rid` registration at proof time.
//!
//! `NonceStore` is a trait rather than a concrete type so a deployment can
//! swap the in-memory, single-process store this crate ships for a
//! distributed one; [`Consistency::Eventual`] stores exist, but callers
//! that need a hard replay guarantee must check
//! [`NonceStore::declared_consistency`] before trusting one.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tokio::time;

/// Errors produced while adding a nonce to a store.
#[derive(Debug, thiserror::Error)]
pub enum NonceError {
    /// The caller asked for a TTL longer than the 300s ceiling.
    #[error("requested ttl {requested:?} exceeds the 300s ceiling")]
    TtlTooLarge {
        /// The TTL that was rejected.
        requested: Duration,
    },
    /// The backing store is unavailable (e.g. a remote store timed out).
    #[error("nonce store unavailable: {0}")]
    StoreUnavailable(String),
}

const MAX_TTL: Duration = Duration::from_secs(300);

/// Whether a `NonceStore` implementation can guarantee that a nonce,
/// once added, is immediately visible to every subsequent `has` call
/// (`Strong`), or only eventually so (`Eventual`, e.g. a store replicated
/// across regions with read-after-write lag).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Consistency {
    /// `add` happens-before every subsequent `has` that observes it.
    Strong,
    /// `has` may miss a nonce added a short time ago elsewhere.
    Eventual,
}

/// A bounded-TTL seen-set used to detect replayed nonces.
#[async_trait]
pub trait NonceStore: Send + Sync {
    /// Has `nonce` already been recorded (and not yet expired)?
    async fn has(&self, nonce: &str) -> bool;

    /// Record `nonce` as seen for `ttl`. Rejects `ttl > 300s`.
    async fn add(&self, nonce: &str, ttl: Duration) -> Result<(), NonceError>;

    /// Evict expired entries. Implementations may run this periodically in
    /// the background and treat an explicit call as a hint, not a
    /// requirement.
    async fn cleanup(&self);

    /// The consistency guarantee this store makes.
    fn declared_consistency(&self) -> Consistency;
}

/// A single-process, in-memory `NonceStore` with a background sweep task.
pub struct InMemoryNonceStore {
    entries: Arc<Mutex<HashMap<String, Instant>>>,
    shutdown: Mutex<Option<oneshot::Sender<()>>>,
}

impl InMemoryNonceStore {
    /// Create a store and, if called from within a running tokio runtime,
    /// spawn its background sweep task, which runs every `sweep_interval`
    /// (clamped to a minimum of 60s) evicting expired entries until the
    /// store is dropped. Outside a runtime (e.g. constructing a store
    /// before `#[tokio::main]` has started one), the store is still fully
    /// usable via [`Self::cleanup`] or [`Self::sync_facade`] — it simply
    /// has no automatic sweep until one is spawned some other way.
    #[must_use]
    pub fn new(sweep_interval: Duration) -> Self {
        let sweep_interval = sweep_interval.max(Duration::from_secs(60));
        let entries: Arc<Mutex<HashMap<String, Instant>>> = Arc::new(Mutex::new(HashMap::new()));
        let (tx, mut rx) = oneshot::channel();

        if tokio::runtime::Handle::try_current().is_ok() {
            let sweep_entries = Arc::clone(&entries);
            tokio::spawn(async move {
                let mut interval = time::interval(sweep_interval);
                loop {
                    tokio::select! {
                        _ = interval.tick() => {
                            let now = Instant::now();
                            sweep_entries.lock().expect("nonce map mutex poisoned").retain(|_, expiry| *expiry > now);
                        }
                        _ = &mut rx => {
                            break;
                        }
                    }
                }
            });
        }

        Self {
            entries,
            shutdown: Mutex::new(Some(tx)),
        }
    }

    /// A synchronous facade over this store for callers on non-async
    /// paths (e.g. a blocking middleware hook).
    #[must_use]
    pub fn sync_facade(self: &Arc<Self>) -> SyncNonceStore {
        SyncNonceStore {
            inner: Arc::clone(self),
        }
    }
}

impl Drop for InMemoryNonceStore {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.lock().expect("shutdown mutex poisoned").take() {
            let _ = tx.send(());
        }
    }
}

#[async_trait]
impl NonceStore for InMemoryNonceStore {
    async fn has(&self, nonce: &str) -> bool {
        let now = Instant::now();
        self.entries
            .lock()
            .expect("nonce map mutex poisoned")
            .get(nonce)
            .is_some_and(|expiry| *expiry > now)
    }

    async fn add(&self, nonce: &str, ttl: Duration) -> Result<(), NonceError> {
        if ttl > MAX_TTL {
            return Err(NonceError::TtlTooLarge { requested: ttl });
        }
        let expiry = Instant::now() + ttl;
        self.entries
            .lock()
            .expect("nonce map mutex poisoned")
            .insert(nonce.to_string(), expiry);
        Ok(())
    }

    async fn cleanup(&self) {
        let now = Instant::now();
        self.entries
            .lock()
            .expect("nonce map mutex poisoned")
            .retain(|_, expiry| *expiry > now);
    }

    fn declared_consistency(&self) -> Consistency {
        Consistency::Strong
    }
}

/// A blocking-friendly wrapper over an [`InMemoryNonceStore`], for callers
/// that cannot `.await` (e.g. a synchronous trait impl required by a
/// third-party framework hook). Each call blocks on a freshly-entered
/// current-thread runtime; it must not be invoked from inside an already
/// running async executor.
pub struct SyncNonceStore {
    inner: Arc<InMemoryNonceStore>,
}

impl SyncNonceStore {
    /// See [`NonceStore::has`].
    pub fn has(&self, nonce: &str) -> bool {
        tokio::runtime::Handle::try_current().map_or_else(
            |_| futures_block_on(self.inner.has(nonce)),
            |handle| tokio::task::block_in_place(|| handle.block_on(self.inner.has(nonce))),
        )
    }

    /// See [`NonceStore::add`].
    pub fn add(&self, nonce: &str, ttl: Duration) -> Result<(), NonceError> {
        tokio::runtime::Handle::try_current().map_or_else(
            |_| futures_block_on(self.inner.add(nonce, ttl)),
            |handle| tokio::task::block_in_place(|| handle.block_on(self.inner.add(nonce, ttl))),
        )
    }
}

fn futures_block_on<F: std::future::Future>(fut: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to build a fallback current-thread runtime")
        .block_on(fut)
}
