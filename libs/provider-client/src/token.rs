//! Token guard: the only access path to a session's credential state.
//!
//! A session is built with one of two guards:
//!
//! - [`Guarded`] for sessions shared between tasks. Reads and writes of the
//!   token go through an async read/write lock, and a separately locked
//!   "reauthenticating" flag keeps concurrent 401s from each invoking the
//!   reauthentication callback.
//! - [`Unguarded`] for single-task use. State lives in a `RefCell`, so an
//!   unguarded session is `!Sync` and cannot be shared across threads.
//!
//! While a reauthentication is in flight, [`TokenGuard::auth_headers`] on a
//! guarded session returns no headers instead of waiting. Requests built in
//! that window go out unauthenticated; if they come back 401 they see that
//! the token already changed and replay without another reauthentication.

use crate::credentials::{AuthResult, CredentialState, Identity};
use crate::error::BoxError;
use crate::reauth::Reauthenticator;
use parking_lot::Mutex;
use reqwest::header::{HeaderMap, HeaderValue};
use std::cell::RefCell;
use subtle::ConstantTimeEq;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Header carrying the bearer token.
pub const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

/// What a reauthentication attempt did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReauthOutcome {
    /// The callback ran and the new token was stored
    Refreshed,
    /// The token changed since the failed request was built; the callback was skipped
    AlreadyRefreshed,
}

/// Access contract for the token and identity of a session.
#[allow(async_fn_in_trait)]
pub trait TokenGuard {
    /// Wrap initial credential state.
    fn from_state(state: CredentialState) -> Self;

    /// Current token.
    async fn read_token(&self) -> String;

    /// Replace the token.
    async fn write_token(&self, token: String);

    /// Current identity.
    async fn identity(&self) -> Identity;

    /// Headers authenticating a request: the token header when a token is set
    /// and no reauthentication is running, otherwise nothing.
    async fn auth_headers(&self) -> HeaderMap;

    /// Run `reauth` and store its result.
    ///
    /// `pre_request_token` is the token the rejected request was sent with.
    /// A guarded session skips the callback when the current token no longer
    /// matches it. `None` forces the callback.
    async fn reauthenticate(
        &self,
        pre_request_token: Option<&str>,
        reauth: &dyn Reauthenticator,
    ) -> Result<ReauthOutcome, BoxError>;
}

fn token_headers(token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if token.is_empty() {
        return headers;
    }
    match HeaderValue::from_str(token) {
        Ok(mut value) => {
            value.set_sensitive(true);
            headers.insert(AUTH_TOKEN_HEADER, value);
        }
        Err(_) => warn!(
            header = AUTH_TOKEN_HEADER,
            "token is not a valid header value; sending request without it"
        ),
    }
    headers
}

fn tokens_match(current: &str, sent: &str) -> bool {
    current.as_bytes().ct_eq(sent.as_bytes()).into()
}

/// Concurrency-safe guard.
#[derive(Debug, Default)]
pub struct Guarded {
    state: RwLock<CredentialState>,
    reauthenticating: Mutex<bool>,
}

/// Clears the reauthenticating flag when dropped, including when the
/// reauthenticating future is cancelled.
struct ReauthFlag<'a>(&'a Mutex<bool>);

impl<'a> ReauthFlag<'a> {
    fn raise(flag: &'a Mutex<bool>) -> Self {
        *flag.lock() = true;
        Self(flag)
    }
}

impl Drop for ReauthFlag<'_> {
    fn drop(&mut self) {
        *self.0.lock() = false;
    }
}

impl Guarded {
    /// Whether a reauthentication is currently running.
    #[must_use]
    pub fn is_reauthenticating(&self) -> bool {
        *self.reauthenticating.lock()
    }
}

impl TokenGuard for Guarded {
    fn from_state(state: CredentialState) -> Self {
        Self {
            state: RwLock::new(state),
            reauthenticating: Mutex::new(false),
        }
    }

    async fn read_token(&self) -> String {
        self.state.read().await.token.clone()
    }

    async fn write_token(&self, token: String) {
        self.state.write().await.token = token;
    }

    async fn identity(&self) -> Identity {
        self.state.read().await.identity.clone()
    }

    async fn auth_headers(&self) -> HeaderMap {
        if self.is_reauthenticating() {
            debug!("Reauthentication in flight, sending request without token");
            return HeaderMap::new();
        }
        let state = self.state.read().await;
        token_headers(&state.token)
    }

    async fn reauthenticate(
        &self,
        pre_request_token: Option<&str>,
        reauth: &dyn Reauthenticator,
    ) -> Result<ReauthOutcome, BoxError> {
        let mut state = self.state.write().await;
        let _flag = ReauthFlag::raise(&self.reauthenticating);

        if let Some(sent) = pre_request_token {
            if !tokens_match(&state.token, sent) {
                debug!("Token already refreshed by a concurrent request");
                return Ok(ReauthOutcome::AlreadyRefreshed);
            }
        }

        let auth: AuthResult = reauth.reauthenticate().await?;
        state.apply(auth);
        Ok(ReauthOutcome::Refreshed)
    }
}

/// Single-task guard with no synchronization.
#[derive(Debug, Default)]
pub struct Unguarded {
    state: RefCell<CredentialState>,
}

impl TokenGuard for Unguarded {
    fn from_state(state: CredentialState) -> Self {
        Self {
            state: RefCell::new(state),
        }
    }

    async fn read_token(&self) -> String {
        self.state.borrow().token.clone()
    }

    async fn write_token(&self, token: String) {
        self.state.borrow_mut().token = token;
    }

    async fn identity(&self) -> Identity {
        self.state.borrow().identity.clone()
    }

    async fn auth_headers(&self) -> HeaderMap {
        token_headers(&self.state.borrow().token)
    }

    async fn reauthenticate(
        &self,
        _pre_request_token: Option<&str>,
        reauth: &dyn Reauthenticator,
    ) -> Result<ReauthOutcome, BoxError> {
        let auth = reauth.reauthenticate().await?;
        self.state.borrow_mut().apply(auth);
        Ok(ReauthOutcome::Refreshed)
    }
}
