//! SSRF-safe outbound fetcher used by PEAC's policy discovery (C6) and
//! anywhere else a publisher-controlled URL must be dereferenced.
//!
//! `reqwest`'s automatic redirect following is disabled at the client
//! level; [`SafeFetcher`] re-validates scheme, DNS answers, and the
//! configured [`RedirectPolicy`] at every hop instead of trusting the
//! first resolution. The address a hop's DNS answer was classified
//! against is pinned into `reqwest`'s resolver for that hop alone, so a
//! second, independent resolution at connect time can never substitute a
//! different (possibly private) address for the one that was validated.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod audit;
mod dns;
mod happy_eyeballs;
mod ip_class;
mod pin_resolver;
mod redirect;

pub use audit::{AuditEvent, AuditSink};
pub use dns::{resolve_and_classify, ResolvedHost};
pub use happy_eyeballs::connect_preferring_ipv6;
pub use ip_class::{classify_ip, IpClass, ACK_CGNAT};
pub use redirect::{registrable_domain, RedirectPolicy};

use pin_resolver::{PinGuard, PinningResolver};
use std::sync::Arc;
use tokio::sync::mpsc;
use url::Url;

/// Errors produced by a fetch.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The URL's scheme was not in the allowlist (only `https` by default).
    #[error("scheme {0:?} is not allowed")]
    SchemeNotAllowed(String),
    /// DNS resolution failed outright.
    #[error("dns resolution failed: {0}")]
    Dns(String),
    /// Connecting to every validated candidate address failed or timed
    /// out before one could be pinned for the request.
    #[error("failed to connect to {0}")]
    Connect(String),
    /// The host resolved only to private/reserved addresses.
    #[error("host {host} resolved only to private addresses")]
    BlockedPrivateAddress {
        /// The host that was being resolved.
        host: String,
    },
    /// The host's DNS answers mixed public and private addresses.
    #[error("host {host} returned a mix of public and private DNS answers")]
    MixedDnsAnswers {
        /// The host that was being resolved.
        host: String,
    },
    /// A redirect was returned but the configured [`RedirectPolicy`]
    /// refused to follow it.
    #[error("redirect to {0} was not permitted by the configured policy")]
    RedirectDenied(String),
    /// Too many redirects were followed.
    #[error("exceeded the maximum of {0} redirects")]
    TooManyRedirects(usize),
    /// The response body exceeded the configured size bound.
    #[error("response body exceeded the {0}-byte bound")]
    BodyTooLarge(usize),
    /// The underlying HTTP client returned an error.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The URL could not be parsed.
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Security configuration for a [`SafeFetcher`].
#[derive(Debug, Clone)]
pub struct SsrfConfig {
    /// Allowed URL schemes. Defaults to `["https"]`.
    pub allowed_schemes: Vec<String>,
    /// Whether a DNS answer set mixing public and private addresses is
    /// tolerated (rather than rejected as [`FetchError::MixedDnsAnswers`]).
    pub allow_mixed_dns: bool,
    /// Must be exactly [`ACK_CGNAT`] for CGNAT-range (100.64.0.0/10)
    /// addresses to be treated as public.
    pub acknowledge_cgnat: Option<String>,
    /// Must be exactly [`UNSAFE_ACK_PRIVATE_TARGETS`] to disable the
    /// private/loopback address block entirely. Only ever meant for a test
    /// harness pointed at a local mock server — never for production
    /// traffic, since it is precisely the SSRF protection this crate
    /// exists to provide.
    pub unsafe_allow_private_targets: Option<String>,
    /// How redirects are handled.
    pub redirect_policy: RedirectPolicy,
    /// Maximum number of redirects to follow before giving up.
    pub max_redirects: usize,
    /// Maximum response body size, in bytes.
    pub max_body_bytes: usize,
    /// Per-attempt connect timeout.
    pub connect_timeout: std::time::Duration,
}

impl Default for SsrfConfig {
    fn default() -> Self {
        Self {
            allowed_schemes: vec!["https".to_string()],
            allow_mixed_dns: false,
            acknowledge_cgnat: None,
            unsafe_allow_private_targets: None,
            redirect_policy: RedirectPolicy::None,
            max_redirects: 5,
            max_body_bytes: 256 * 1024,
            connect_timeout: std::time::Duration::from_millis(250),
        }
    }
}

/// Hop-by-hop headers (RFC 7230 §6.1) that must never be forwarded across
/// a redirect or proxy hop.
pub const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Literal acknowledgement string required to set
/// [`SsrfConfig::unsafe_allow_private_targets`].
pub const UNSAFE_ACK_PRIVATE_TARGETS: &str = "I_UNDERSTAND_THIS_DISABLES_SSRF_PROTECTION";

/// Strip hop-by-hop headers from a header name list, retaining only
/// end-to-end headers that are safe to carry across a redirect.
#[must_use]
pub fn strip_hop_by_hop<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<&'a str> {
    names
        .into_iter()
        .filter(|n| !HOP_BY_HOP_HEADERS.contains(&n.to_ascii_lowercase().as_str()))
        .collect()
}

/// An SSRF-safe outbound fetcher.
pub struct SafeFetcher {
    client: reqwest::Client,
    config: SsrfConfig,
    audit: AuditSink,
    resolver: Arc<PinningResolver>,
}

impl SafeFetcher {
    /// Build a fetcher from `config`, returning its audit event receiver
    /// alongside it.
    pub fn new(config: SsrfConfig) -> Result<(Self, mpsc::Receiver<AuditEvent>), FetchError> {
        let resolver = Arc::new(PinningResolver::new());
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(config.connect_timeout)
            .dns_resolver(resolver.clone())
            .build()?;
        let (audit, rx) = AuditSink::new(64);
        Ok((
            Self {
                client,
                config,
                audit,
                resolver,
            },
            rx,
        ))
    }

    /// Fetch `url`, manually validating and following redirects up to
    /// `max_redirects` times, and returning a body bounded to
    /// `max_body_bytes`.
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let mut current = Url::parse(url)?;
        for _ in 0..=self.config.max_redirects {
            self.validate_scheme(&current)?;
            let _pin = match current.host_str() {
                Some(host) => {
                    let port = current.port_or_known_default().unwrap_or(443);
                    let resolved = resolve_and_classify(host, port, &self.config).await?;
                    let (_probe, winner) =
                        tokio::time::timeout(
                            self.config.connect_timeout,
                            happy_eyeballs::connect_preferring_ipv6(&resolved.addresses, port),
                        )
                        .await
                        .map_err(|_| FetchError::Connect(host.to_string()))?
                        .map_err(|e| FetchError::Connect(format!("{host}: {e}")))?;
                    Some(PinGuard::new(&self.resolver, host, vec![winner]))
                }
                None => None,
            };

            let response = self.client.get(current.clone()).send().await?;
            if response.status().is_redirection() {
                let location = response
                    .headers()
                    .get(reqwest::header::LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .ok_or_else(|| FetchError::RedirectDenied(current.to_string()))?;
                let next = current.join(location)?;
                if !self.config.redirect_policy.permits(&current, &next) {
                    self.audit.emit(AuditEvent::RedirectDenied {
                        from: current.to_string(),
                        to: next.to_string(),
                    });
                    return Err(FetchError::RedirectDenied(next.to_string()));
                }
                self.audit.emit(AuditEvent::RedirectFollowed {
                    from: current.to_string(),
                    to: next.to_string(),
                });
                current = next;
                continue;
            }

            let mut body = Vec::new();
            let mut stream = response;
            loop {
                match stream.chunk().await? {
                    Some(chunk) => {
                        if body.len() + chunk.len() > self.config.max_body_bytes {
                            return Err(FetchError::BodyTooLarge(self.config.max_body_bytes));
                        }
                        body.extend_from_slice(&chunk);
                    }
                    None => break,
                }
            }
            return Ok(body);
        }
        Err(FetchError::TooManyRedirects(self.config.max_redirects))
    }

    fn validate_scheme(&self, url: &Url) -> Result<(), FetchError> {
        if self
            .config
            .allowed_schemes
            .iter()
            .any(|s| s == url.scheme())
        {
            Ok(())
        } else {
            Err(FetchError::SchemeNotAllowed(url.scheme().to_string()))
        }
    }
}
