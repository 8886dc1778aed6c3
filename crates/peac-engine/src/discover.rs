//! Policy discovery: a bounded, parallel fan-out over
//! the well-known policy paths.

use async_trait::async_trait;
use peac_fetch::{FetchError, SafeFetcher};
use std::sync::Arc;
use std::time::Duration;

/// The well-known paths probed for a policy document, in fan-out order.
pub const WELL_KNOWN_PATHS: &[&str] = &[
    "/.well-known/ai-policy",
    "/.well-known/agent-permissions",
    "/.well-known/peac.txt",
];

/// Fallback path tried only if `/.well-known/peac.txt` itself failed.
pub const PEAC_TXT_FALLBACK: &str = "/peac.txt";

/// Per-source timeout for a single discovery fetch.
pub const DISCOVERY_TIMEOUT: Duration = Duration::from_millis(250);

/// Per-source body size bound for a single discovery fetch.
pub const DISCOVERY_MAX_BODY_BYTES: usize = 256 * 1024;

/// Why a single discovery fetch failed.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    /// The fetch did not complete within [`DISCOVERY_TIMEOUT`].
    #[error("discovery fetch for {0:?} timed out")]
    Timeout(String),
    /// The underlying transport failed (DNS, SSRF block, connection, ...).
    #[error("discovery fetch for {path:?} failed: {source}")]
    Fetch {
        /// The path that was being fetched.
        path: String,
        /// The underlying transport error.
        #[source]
        source: FetchError,
    },
    /// The response body was not valid JSON.
    #[error("discovery response for {0:?} was not valid JSON")]
    InvalidJson(String),
}

/// One discovery attempt's outcome, success or failure, always recorded.
#[derive(Debug)]
pub struct DiscoveryEntry {
    /// The path that was probed.
    pub path: String,
    /// The result of fetching and parsing it.
    pub outcome: Result<serde_json::Value, DiscoveryError>,
}

/// A source of policy documents for a given origin. A trait so discovery
/// can be swapped for a test double without touching `evaluate`.
#[async_trait]
pub trait PolicySource: Send + Sync {
    /// Fetch and parse the policy document at `base_url + path`.
    async fn fetch_policy(&self, base_url: &str, path: &str) -> DiscoveryEntry;
}

/// The production [`PolicySource`], backed by a SSRF-safe [`SafeFetcher`].
pub struct WellKnownPolicySource {
    fetcher: Arc<SafeFetcher>,
}

impl WellKnownPolicySource {
    /// Wrap an existing fetcher for policy discovery.
    #[must_use]
    pub fn new(fetcher: Arc<SafeFetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl PolicySource for WellKnownPolicySource {
    async fn fetch_policy(&self, base_url: &str, path: &str) -> DiscoveryEntry {
        let url = format!("{base_url}{path}");
        let outcome = match tokio::time::timeout(DISCOVERY_TIMEOUT, self.fetcher.fetch(&url)).await
        {
            Err(_) => Err(DiscoveryError::Timeout(path.to_string())),
            Ok(Err(source)) => Err(DiscoveryError::Fetch {
                path: path.to_string(),
                source,
            }),
            Ok(Ok(body)) => serde_json::from_slice(&body)
                .map_err(|_| DiscoveryError::InvalidJson(path.to_string())),
        };
        DiscoveryEntry {
            path: path.to_string(),
            outcome,
        }
    }
}

/// Run discovery against `base_url`: fan out `WELL_KNOWN_PATHS` in
/// parallel via `futures::future::join_all`, then probe [`PEAC_TXT_FALLBACK`]
/// only if `/.well-known/peac.txt` itself did not succeed. Every attempt,
/// success or failure, is returned.
pub async fn discover(source: &dyn PolicySource, base_url: &str) -> Vec<DiscoveryEntry> {
    let futures = WELL_KNOWN_PATHS
        .iter()
        .map(|path| source.fetch_policy(base_url, path));
    let mut entries = futures::future::join_all(futures).await;

    let peac_txt_failed = entries
        .iter()
        .find(|e| e.path == "/.well-known/peac.txt")
        .is_some_and(|e| e.outcome.is_err());
    if peac_txt_failed {
        entries.push(source.fetch_policy(base_url, PEAC_TXT_FALLBACK).await);
    }

    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticSource {
        responses: Vec<(&'static str, Result<serde_json::Value, &'static str>)>,
    }

    #[async_trait]
    impl PolicySource for StaticSource {
        async fn fetch_policy(&self, _base_url: &str, path: &str) -> DiscoveryEntry {
            let outcome = self
                .responses
                .iter()
                .find(|(p, _)| *p == path)
                .map(|(_, r)| match r {
                    Ok(v) => Ok(v.clone()),
                    Err(_) => Err(DiscoveryError::InvalidJson(path.to_string())),
                })
                .unwrap_or_else(|| Err(DiscoveryError::InvalidJson(path.to_string())));
            DiscoveryEntry {
                path: path.to_string(),
                outcome,
            }
        }
    }

    #[tokio::test]
    async fn all_well_known_paths_are_attempted() {
        let source = StaticSource {
            responses: vec![
                ("/.well-known/ai-policy", Ok(serde_json::json!({}))),
                ("/.well-known/agent-permissions", Ok(serde_json::json!({}))),
                ("/.well-known/peac.txt", Ok(serde_json::json!({}))),
            ],
        };
        let entries = discover(&source, "https://origin.example").await;
        assert_eq!(entries.len(), 3);
        assert!(entries.iter().all(|e| e.outcome.is_ok()));
    }

    #[tokio::test]
    async fn peac_txt_fallback_only_fires_on_failure() {
        let source = StaticSource {
            responses: vec![
                ("/.well-known/ai-policy", Ok(serde_json::json!({}))),
                ("/.well-known/agent-permissions", Ok(serde_json::json!({}))),
                // peac.txt deliberately absent from responses -> failure
                ("/peac.txt", Ok(serde_json::json!({"fallback": true}))),
            ],
        };
        let entries = discover(&source, "https://origin.example").await;
        assert_eq!(entries.len(), 4);
        let fallback = entries.iter().find(|e| e.path == "/peac.txt").unwrap();
        assert!(fallback.outcome.is_ok());
    }
}
