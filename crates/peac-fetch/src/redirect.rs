//! Redirect policy and the small embedded public-suffix subset used for
//! same-registrable-domain comparisons.
//!
//! Compiles a small rule table into the binary rather than reaching for a
//! runtime dependency or a network fetch of the real Public Suffix List.

use url::Url;

/// What redirects a [`crate::SafeFetcher`] is allowed to follow.
#[derive(Debug, Clone)]
pub enum RedirectPolicy {
    /// Never follow a redirect; return it to the caller unresolved.
    None,
    /// Only follow a redirect to the exact same scheme+host+port.
    SameOrigin,
    /// Follow a redirect whose registrable domain (eTLD+1) matches the
    /// original request's.
    SameRegistrableDomain,
    /// Follow a redirect only to a host in the given allowlist.
    Allowlist(Vec<String>),
}

/// Multi-label public suffixes the eTLD+1 fallback (last-two-labels) would
/// get wrong. Not exhaustive — anything not in this table falls back to
/// "last two labels", documented as an approximation.
const MULTI_LABEL_SUFFIXES: &[&str] = &[
    "co.uk", "org.uk", "gov.uk", "ac.uk", "com.au", "net.au", "org.au", "co.jp", "co.nz",
    "co.za", "com.br", "github.io", "pages.dev", "vercel.app", "netlify.app", "herokuapp.com",
];

/// The registrable domain (eTLD+1) of `host`, using the embedded suffix
/// table where it applies and falling back to "last two labels" otherwise.
#[must_use]
pub fn registrable_domain(host: &str) -> String {
    let host = host.trim_end_matches('.');
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() <= 1 {
        return host.to_string();
    }
    for suffix in MULTI_LABEL_SUFFIXES {
        let suffix_labels: Vec<&str> = suffix.split('.').collect();
        if labels.len() > suffix_labels.len() {
            let tail = &labels[labels.len() - suffix_labels.len()..];
            if tail.iter().zip(&suffix_labels).all(|(a, b)| a == b) {
                let start = labels.len() - suffix_labels.len() - 1;
                return labels[start..].join(".");
            }
        }
    }
    labels[labels.len() - 2..].join(".")
}

impl RedirectPolicy {
    /// Does this policy permit following a redirect from `original` to
    /// `target`?
    #[must_use]
    pub fn permits(&self, original: &Url, target: &Url) -> bool {
        match self {
            Self::None => false,
            Self::SameOrigin => original.origin() == target.origin(),
            Self::SameRegistrableDomain => {
                match (original.host_str(), target.host_str()) {
                    (Some(a), Some(b)) => registrable_domain(a) == registrable_domain(b),
                    _ => false,
                }
            }
            Self::Allowlist(hosts) => target
                .host_str()
                .is_some_and(|h| hosts.iter().any(|allowed| allowed == h)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registrable_domain_handles_simple_host() {
        assert_eq!(registrable_domain("example.com"), "example.com");
        assert_eq!(registrable_domain("www.example.com"), "example.com");
    }

    #[test]
    fn registrable_domain_uses_multi_label_table() {
        assert_eq!(registrable_domain("api.example.co.uk"), "example.co.uk");
        assert_eq!(registrable_domain("user.github.io"), "user.github.io");
    }

    #[test]
    fn registrable_domain_falls_back_for_unknown_suffix() {
        assert_eq!(registrable_domain("a.b.unknown-tld"), "b.unknown-tld");
    }

    #[test]
    fn none_policy_permits_nothing() {
        let a = Url::parse("https://a.example.com/x").unwrap();
        let b = Url::parse("https://a.example.com/y").unwrap();
        assert!(!RedirectPolicy::None.permits(&a, &b));
    }

    #[test]
    fn same_origin_requires_exact_match() {
        let a = Url::parse("https://a.example.com/x").unwrap();
        let same = Url::parse("https://a.example.com/y").unwrap();
        let other = Url::parse("https://b.example.com/y").unwrap();
        assert!(RedirectPolicy::SameOrigin.permits(&a, &same));
        assert!(!RedirectPolicy::SameOrigin.permits(&a, &other));
    }

    #[test]
    fn same_registrable_domain_allows_subdomain_hop() {
        let a = Url::parse("https://a.example.com/x").unwrap();
        let b = Url::parse("https://b.example.com/y").unwrap();
        assert!(RedirectPolicy::SameRegistrableDomain.permits(&a, &b));
    }

    #[test]
    fn allowlist_checks_exact_host() {
        let a = Url::parse("https://a.example.com/x").unwrap();
        let allowed = Url::parse("https://cdn.example.net/y").unwrap();
        let policy = RedirectPolicy::Allowlist(vec!["cdn.example.net".to_string()]);
        assert!(policy.permits(&a, &allowed));
        let denied = Url::parse("https://evil.example.net/y").unwrap();
        assert!(!policy.permits(&a, &denied));
    }
}
