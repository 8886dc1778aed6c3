//! Path binding and transport profile selection.

use std::fmt;
use std::sync::Arc;

/// How much of the request path gets bound into the receipt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PathBinding {
    /// Bind the path with its query string stripped. Default.
    #[default]
    Minimal,
    /// Bind the path including its query string.
    Full,
    /// Omit interaction binding entirely.
    Off,
}

impl PathBinding {
    /// Render `path`/`query` per this binding mode.
    #[must_use]
    pub fn bind(self, path: &str, query: Option<&str>) -> Option<String> {
        match self {
            Self::Off => None,
            Self::Minimal => Some(path.to_string()),
            Self::Full => Some(match query {
                Some(q) if !q.is_empty() => format!("{path}?{q}"),
                _ => path.to_string(),
            }),
        }
    }
}

/// A pointer-URL generator: given the raw receipt bytes, returns the URL a
/// client should fetch the full receipt from.
pub type PointerUrlFn = Arc<dyn Fn(&[u8]) -> String + Send + Sync>;

/// How the receipt is delivered to the client.
#[derive(Clone)]
pub enum TransportProfile {
    /// Emit the receipt as a `PEAC-Receipt` header. Default.
    Header,
    /// Wrap the response body as `{data, peac_receipt}`.
    Body,
    /// Emit a `sha256=...; url=...` pointer header; the full receipt is
    /// served out of band by whatever `pointer_url` points at.
    Pointer {
        /// Generates the out-of-band URL for a given receipt's bytes.
        pointer_url: PointerUrlFn,
    },
}

impl fmt::Debug for TransportProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Header => write!(f, "Header"),
            Self::Body => write!(f, "Body"),
            Self::Pointer { .. } => write!(f, "Pointer {{ .. }}"),
        }
    }
}

impl Default for TransportProfile {
    fn default() -> Self {
        Self::Header
    }
}

/// The three named transport kinds, as they'd appear in untyped
/// configuration (e.g. a `transport: "pointer"` value loaded from TOML).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// See [`TransportProfile::Header`].
    Header,
    /// See [`TransportProfile::Body`].
    Body,
    /// See [`TransportProfile::Pointer`].
    Pointer,
}

/// Build a [`TransportProfile`] from a named kind plus an optional
/// pointer-url generator, failing with [`super::issue::IssueError::PointerUrlMissing`]
/// if `Pointer` was named without one. The `Header`/`Body`/`Pointer` struct
/// variants in [`TransportProfile`] already make this unrepresentable when
/// a caller constructs the enum directly; this constructor exists for
/// config layers that only have a kind name and an `Option` in hand.
pub fn build_transport(
    kind: TransportKind,
    pointer_url: Option<PointerUrlFn>,
) -> Result<TransportProfile, crate::issue::IssueError> {
    match (kind, pointer_url) {
        (TransportKind::Header, _) => Ok(TransportProfile::Header),
        (TransportKind::Body, _) => Ok(TransportProfile::Body),
        (TransportKind::Pointer, Some(pointer_url)) => {
            Ok(TransportProfile::Pointer { pointer_url })
        }
        (TransportKind::Pointer, None) => Err(crate::issue::IssueError::PointerUrlMissing),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_binding_strips_query() {
        assert_eq!(
            PathBinding::Minimal.bind("/a", Some("x=1")),
            Some("/a".to_string())
        );
    }

    #[test]
    fn full_binding_keeps_query() {
        assert_eq!(
            PathBinding::Full.bind("/a", Some("x=1")),
            Some("/a?x=1".to_string())
        );
    }

    #[test]
    fn full_binding_without_query_omits_question_mark() {
        assert_eq!(PathBinding::Full.bind("/a", None), Some("/a".to_string()));
    }

    #[test]
    fn off_binding_omits_entirely() {
        assert_eq!(PathBinding::Off.bind("/a", Some("x=1")), None);
    }

    #[test]
    fn pointer_kind_without_generator_is_a_config_error() {
        let err = build_transport(TransportKind::Pointer, None).unwrap_err();
        assert!(matches!(err, crate::issue::IssueError::PointerUrlMissing));
    }

    #[test]
    fn pointer_kind_with_generator_builds() {
        let profile = build_transport(
            TransportKind::Pointer,
            Some(Arc::new(|_: &[u8]| "https://x.example".to_string())),
        )
        .unwrap();
        assert!(matches!(profile, TransportProfile::Pointer { .. }));
    }

    #[test]
    fn header_kind_ignores_generator() {
        let profile = build_transport(TransportKind::Header, None).unwrap();
        assert!(matches!(profile, TransportProfile::Header));
    }
}
