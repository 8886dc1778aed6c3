//! Pins `reqwest`'s DNS resolution to the exact address
//! [`crate::dns::resolve_and_classify`] already validated for the current
//! attempt, closing the TOCTOU window between classification and connect.
//!
//! `reqwest::dns::Resolve` is implemented over a small shared table keyed
//! by hostname. [`SafeFetcher::fetch`](crate::SafeFetcher::fetch) pins a
//! host to one winning address immediately before issuing the request for
//! it, and the [`PinGuard`] it holds removes the pin again once that
//! attempt finishes, successfully or not — a stale pin must never outlive
//! the request it was created for.

use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

/// A `reqwest` DNS resolver that only ever answers with addresses another
/// part of the fetcher pinned in advance. A host with no pin is refused
/// rather than falling through to the OS resolver — if that happened, the
/// whole point of pinning would be silently defeated.
#[derive(Debug, Default)]
pub struct PinningResolver {
    pins: Mutex<HashMap<String, Vec<SocketAddr>>>,
}

impl PinningResolver {
    /// An empty resolver with no pins set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pins: Mutex::new(HashMap::new()),
        }
    }

    fn pin(&self, host: &str, addrs: Vec<SocketAddr>) {
        self.pins
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(host.to_string(), addrs);
    }

    fn unpin(&self, host: &str) {
        self.pins
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(host);
    }
}

impl Resolve for PinningResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let pinned = self
            .pins
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(name.as_str())
            .cloned();
        Box::pin(async move {
            let addrs = pinned.ok_or_else(|| -> Box<dyn std::error::Error + Send + Sync> {
                format!("no dns pin set for host {:?}", name.as_str()).into()
            })?;
            Ok(Box::new(addrs.into_iter()) as Addrs)
        })
    }
}

/// Holds a single hostname pinned to `addrs` for as long as it lives,
/// removing the pin on drop regardless of how the guarded request turns
/// out.
pub struct PinGuard<'a> {
    resolver: &'a PinningResolver,
    host: String,
}

impl<'a> PinGuard<'a> {
    /// Pin `host` to exactly `addrs` for the lifetime of the returned
    /// guard.
    #[must_use]
    pub fn new(resolver: &'a PinningResolver, host: &str, addrs: Vec<SocketAddr>) -> Self {
        resolver.pin(host, addrs);
        Self {
            resolver,
            host: host.to_string(),
        }
    }
}

impl Drop for PinGuard<'_> {
    fn drop(&mut self) {
        self.resolver.unpin(&self.host);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> SocketAddr {
        s.parse().unwrap()
    }

    #[test]
    fn guard_pins_on_construction_and_unpins_on_drop() {
        let resolver = PinningResolver::new();
        {
            let _guard = PinGuard::new(&resolver, "example.com", vec![addr("93.184.216.34:443")]);
            assert_eq!(
                resolver.pins.lock().unwrap().get("example.com"),
                Some(&vec![addr("93.184.216.34:443")])
            );
        }
        assert!(resolver.pins.lock().unwrap().get("example.com").is_none());
    }

    #[test]
    fn pins_are_scoped_per_host() {
        let resolver = PinningResolver::new();
        let _a = PinGuard::new(&resolver, "a.example.com", vec![addr("10.0.0.1:443")]);
        let _b = PinGuard::new(&resolver, "b.example.com", vec![addr("10.0.0.2:443")]);
        let pins = resolver.pins.lock().unwrap();
        assert_eq!(pins.get("a.example.com"), Some(&vec![addr("10.0.0.1:443")]));
        assert_eq!(pins.get("b.example.com"), Some(&vec![addr("10.0.0.2:443")]));
    }

    #[test]
    fn repinning_a_host_replaces_the_previous_pin() {
        let resolver = PinningResolver::new();
        let first = PinGuard::new(&resolver, "example.com", vec![addr("10.0.0.1:443")]);
        drop(first);
        let _second = PinGuard::new(&resolver, "example.com", vec![addr("10.0.0.2:443")]);
        assert_eq!(
            resolver.pins.lock().unwrap().get("example.com"),
            Some(&vec![addr("10.0.0.2:443")])
        );
    }
}
