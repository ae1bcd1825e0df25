//! Authenticated request execution core for the cloud provider SDK.
//!
//! Resource bindings (VPCs, subnets, compute instances, ...) build their
//! payloads and hand them to a [`Session`], which:
//!
//! - authenticates each request with a bearer token or an AK/SK signature
//! - reauthenticates once and replays when the token is rejected (401)
//! - retries 502/504 with a bounded budget and fixed delay
//! - maps unaccepted statuses to typed errors, with per-request overrides

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod classify;
pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod reauth;
pub mod request;
pub mod service;
pub mod signer;
pub mod token;

pub use classify::{ErrorContext, StatusClass, classify};
pub use client::{DOMAIN_ID_HEADER, PROJECT_ID_HEADER, Session};
pub use config::{DEFAULT_MAX_ATTEMPTS, SessionConfig};
pub use credentials::{AkSkOptions, AuthResult, CredentialState, Identity};
pub use error::{BoxError, ProviderError, ProviderResult, StatusError, UnexpectedResponse};
pub use reauth::{ReauthFn, Reauthenticator, reauth_fn};
pub use request::{RawBody, RequestOptions, Response, SeekableBody, default_ok_codes};
pub use service::ServiceClient;
pub use signer::{AkSkSigner, SignError, Signer};
pub use token::{AUTH_TOKEN_HEADER, Guarded, ReauthOutcome, TokenGuard, Unguarded};
