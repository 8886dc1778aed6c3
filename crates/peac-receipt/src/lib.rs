//! Framework-free receipt issuance and verification middleware.
//!
//! A host extracts a [`RequestContext`]/[`ResponseContext`] pair from
//! whatever HTTP framework it runs, derives an audience, picks a
//! [`TransportProfile`], and calls [`issue`] to mint a signed receipt. A
//! relying party holding the issued claims and [`peac_crypto::DetachedJws`]
//! calls [`verify_receipt`] to check them back.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod audience;
pub mod issue;
pub mod transport;
pub mod verify;

pub use audience::{derive_audience, RequestContext, ResponseContext};
pub use issue::{issue, IssueError, IssueOptions, Issued, IssuedTransport, ReceiptClaims};
pub use transport::{build_transport, PathBinding, PointerUrlFn, TransportKind, TransportProfile};
pub use verify::{verify_receipt, VerifyError};
