//! DNS pre-resolution with public/private mixed-answer detection.

use crate::ip_class::{classify_ip, IpClass};
use crate::{FetchError, SsrfConfig};
use std::net::IpAddr;

/// The result of resolving a host: every address returned, IPv6 first
/// (RFC 8305), alongside its [`IpClass`].
#[derive(Debug, Clone)]
pub struct ResolvedHost {
    /// Addresses in connection-attempt order (IPv6 before IPv4).
    pub addresses: Vec<IpAddr>,
}

/// Resolve `host` (a bare hostname, no scheme/port) and classify every
/// answer, rejecting the resolution outright if any answer is private
/// (unless the whole answer set is private and the caller is, e.g.,
/// deliberately fetching a loopback target in a test harness) or if the
/// answer set mixes public and private addresses and
/// [`SsrfConfig::allow_mixed_dns`] is `false`.
pub async fn resolve_and_classify(
    host: &str,
    port: u16,
    config: &SsrfConfig,
) -> Result<ResolvedHost, FetchError> {
    let lookup_target = format!("{host}:{port}");
    let addrs: Vec<IpAddr> = tokio::net::lookup_host(&lookup_target)
        .await
        .map_err(|e| FetchError::Dns(e.to_string()))?
        .map(|sa| sa.ip())
        .collect();

    if addrs.is_empty() {
        return Err(FetchError::Dns(format!("no addresses for {host}")));
    }

    let classes: Vec<IpClass> = addrs
        .iter()
        .map(|a| classify_ip(*a, config.acknowledge_cgnat.as_deref()))
        .collect();

    let private_targets_unsafely_allowed = config.unsafe_allow_private_targets.as_deref()
        == Some(crate::UNSAFE_ACK_PRIVATE_TARGETS);

    let any_public = classes.iter().any(|c| *c == IpClass::Public);
    let any_private = classes.iter().any(|c| *c == IpClass::Private);

    if !private_targets_unsafely_allowed {
        if any_public && any_private && !config.allow_mixed_dns {
            return Err(FetchError::MixedDnsAnswers {
                host: host.to_string(),
            });
        }
        if any_private && !any_public {
            return Err(FetchError::BlockedPrivateAddress {
                host: host.to_string(),
            });
        }
    }

    let mut ordered = addrs;
    ordered.sort_by_key(|a| if a.is_ipv6() { 0 } else { 1 });
    Ok(ResolvedHost { addresses: ordered })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn loopback_only_answers_are_blocked() {
        let config = SsrfConfig::default();
        let err = resolve_and_classify("localhost", 80, &config).await.unwrap_err();
        assert!(matches!(err, FetchError::BlockedPrivateAddress { .. }));
    }
}
