//! The pluggable append-only backend a [`crate::CaptureSession`] writes to.

use async_trait::async_trait;
use peac_schema::spool::SpoolEntry;
use std::sync::Mutex;

/// A backend failed to accept or close a spool.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct StoreError(pub String);

/// An append-only backend for [`SpoolEntry`] records.
#[async_trait]
pub trait SpoolStore: Send + Sync {
    /// Append `entry` to the backend. Failure here is always surfaced as
    /// `CaptureError::StoreFailed`, never `CaptureError::Internal`.
    async fn append(&self, entry: &SpoolEntry) -> Result<(), StoreError>;

    /// Flush and release backend resources. Called once by
    /// `CaptureSession::close`; implementations should make repeated calls
    /// harmless.
    async fn close(&self);
}

/// An in-process, unbounded [`SpoolStore`] backed by a `Vec`. Useful for
/// tests and single-process deployments that don't need durability across
/// restarts.
#[derive(Debug, Default)]
pub struct InMemorySpoolStore {
    entries: Mutex<Vec<SpoolEntry>>,
}

impl InMemorySpoolStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the entries appended so far, in append order.
    #[must_use]
    pub fn entries(&self) -> Vec<SpoolEntry> {
        self.entries.lock().expect("store mutex poisoned").clone()
    }
}

#[async_trait]
impl SpoolStore for InMemorySpoolStore {
    async fn append(&self, entry: &SpoolEntry) -> Result<(), StoreError> {
        self.entries
            .lock()
            .expect("store mutex poisoned")
            .push(entry.clone());
        Ok(())
    }

    async fn close(&self) {}
}
