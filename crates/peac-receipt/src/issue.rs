//! Claims construction and receipt issuance.

use std::time::Duration;

use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::audience::{derive_audience, RequestContext, ResponseContext};
use crate::transport::{PathBinding, TransportProfile};
use peac_canon::to_jcs;
use peac_crypto::{sign_detached, CryptoError, DetachedJws, Ed25519KeyPair};

/// The minimal claim set signed into an issued receipt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptClaims {
    /// Issuer URL, trailing slash stripped.
    pub iss: String,
    /// Audience, derived via [`derive_audience`] unless overridden.
    pub aud: String,
    /// Issued-at, Unix seconds.
    pub iat: i64,
    /// Expiry, Unix seconds (`iat + expires_in`).
    pub exp: i64,
    /// Request id.
    pub rid: Uuid,
    /// Subject, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// The bound interaction path, if [`PathBinding`] is not `Off`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Namespaced extension data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ext: Option<Value>,
}

/// Options controlling how a receipt is built and delivered.
#[derive(Clone)]
pub struct IssueOptions {
    /// Issuer URL; any trailing slash is stripped before signing.
    pub iss: String,
    /// Subject, if known.
    pub sub: Option<String>,
    /// Overrides audience derivation when set.
    pub aud: Option<String>,
    /// How long the receipt is valid for.
    pub expires_in: Duration,
    /// How much of the request path to bind.
    pub path_binding: PathBinding,
    /// How the receipt is delivered to the client.
    pub transport: TransportProfile,
    /// Header-transport size ceiling before falling back to body-wrap.
    pub max_header_size: usize,
    /// Namespaced extension data to attach to the claims.
    pub ext: Option<Value>,
    /// The signing key and its `kid`.
    pub kid: String,
}

impl IssueOptions {
    /// Construct options with the spec defaults: `minimal` path binding,
    /// `header` transport, and a 4096-byte header ceiling.
    #[must_use]
    pub fn new(iss: impl Into<String>, kid: impl Into<String>, expires_in: Duration) -> Self {
        Self {
            iss: iss.into(),
            sub: None,
            aud: None,
            expires_in,
            path_binding: PathBinding::default(),
            transport: TransportProfile::default(),
            max_header_size: 4096,
            ext: None,
            kid: kid.into(),
        }
    }
}

/// A successfully issued receipt, ready to be applied to a response.
#[derive(Debug, Clone)]
pub struct Issued {
    /// The signed claims.
    pub claims: ReceiptClaims,
    /// The detached JWS over the JCS-canonical claims.
    pub jws: DetachedJws,
    /// The transport actually used — may differ from the requested one if
    /// header-size auto-fallback kicked in.
    pub transport: IssuedTransport,
}

/// The transport a receipt was ultimately delivered through.
#[derive(Clone)]
pub enum IssuedTransport {
    /// `PEAC-Receipt: <payload>.<signature>` header.
    Header(String),
    /// `{data, peac_receipt}` body wrapper.
    Body(Value),
    /// `PEAC-Receipt-Pointer: sha256=<b64u>; url=<url>` header.
    Pointer(String),
}

/// Failure modes of [`issue`].
#[derive(Debug, thiserror::Error)]
pub enum IssueError {
    /// `Pointer` transport was selected without a `pointer_url` generator.
    #[error("pointer transport requires a pointer-url generator")]
    PointerUrlMissing,
    /// Canonicalising the claims failed.
    #[error(transparent)]
    Canon(#[from] peac_canon::CanonError),
    /// Signing the claims failed.
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    /// The response body could not be parsed as JSON for body-wrapping.
    #[error("response body is not valid JSON: {0}")]
    InvalidBody(serde_json::Error),
}

impl From<IssueError> for peac_problem::Problem {
    fn from(err: IssueError) -> Self {
        use peac_problem::{ErrorCode, Problem};
        match err {
            IssueError::PointerUrlMissing => {
                Problem::new(ErrorCode::ConfigInvalid, "pointer transport misconfigured")
                    .with_detail("Pointer transport was selected without a pointer-url generator")
            }
            IssueError::Crypto(CryptoError::TimeInvalid { .. }) => {
                Problem::new(ErrorCode::TimeInvalid, "receipt claims window invalid")
            }
            IssueError::Crypto(_) | IssueError::Canon(_) => {
                Problem::new(ErrorCode::Internal, "receipt signing failed")
            }
            IssueError::InvalidBody(_) => {
                Problem::new(ErrorCode::Internal, "response body was not valid JSON")
            }
        }
    }
}

fn strip_trailing_slash(iss: &str) -> String {
    iss.trim_end_matches('/').to_string()
}

fn encode_receipt(jws: &DetachedJws, payload_b64: &str) -> String {
    format!("{payload_b64}.{}", jws.signature)
}

/// Build claims and sign a receipt for `ctx`/`resp`, choosing a transport
/// per `opts` (auto-falling-back from `Header` to `Body` on overflow).
pub fn issue(
    ctx: &RequestContext,
    resp: &ResponseContext,
    opts: &IssueOptions,
    rid: Uuid,
    key: &Ed25519KeyPair,
) -> Result<Issued, IssueError> {
    let aud = opts.aud.clone().unwrap_or_else(|| derive_audience(ctx));
    let path = opts
        .path_binding
        .bind(&ctx.path, ctx.query.as_deref());
    let iat = ctx.timestamp;
    let exp = iat + i64::try_from(opts.expires_in.as_secs()).unwrap_or(i64::MAX);

    let claims = ReceiptClaims {
        iss: strip_trailing_slash(&opts.iss),
        aud,
        iat,
        exp,
        rid,
        sub: opts.sub.clone(),
        path,
        ext: opts.ext.clone(),
    };

    let payload = to_jcs(&claims)?;
    let jws = sign_detached(payload.as_bytes(), &opts.kid, key)?;
    let payload_b64 = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(payload.as_bytes());
    let encoded = encode_receipt(&jws, &payload_b64);

    let transport = match &opts.transport {
        TransportProfile::Header => {
            if encoded.len() > opts.max_header_size {
                body_transport(resp, &encoded)?
            } else {
                IssuedTransport::Header(encoded)
            }
        }
        TransportProfile::Body => body_transport(resp, &encoded)?,
        TransportProfile::Pointer { pointer_url } => {
            let digest = Sha256::digest(encoded.as_bytes());
            let digest_b64 = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(digest);
            let url = pointer_url(encoded.as_bytes());
            IssuedTransport::Pointer(format!("sha256={digest_b64}; url={url}"))
        }
    };

    Ok(Issued {
        claims,
        jws,
        transport,
    })
}

fn body_transport(resp: &ResponseContext, encoded: &str) -> Result<IssuedTransport, IssueError> {
    let data: Value = match &resp.body {
        Some(bytes) if !bytes.is_empty() => {
            serde_json::from_slice(bytes).map_err(IssueError::InvalidBody)?
        }
        _ => Value::Null,
    };
    Ok(IssuedTransport::Body(serde_json::json!({
        "data": data,
        "peac_receipt": encoded,
    })))
}


impl std::fmt::Debug for IssuedTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Header(h) => f.debug_tuple("Header").field(h).finish(),
            Self::Body(b) => f.debug_tuple("Body").field(b).finish(),
            Self::Pointer(p) => f.debug_tuple("Pointer").field(p).finish(),
        }
    }
}
