//! Reauthentication callbacks.

use crate::credentials::AuthResult;
use crate::error::BoxError;
use async_trait::async_trait;
use std::future::Future;

/// Obtains a fresh token after the current one was rejected with a 401.
///
/// Implementations talk to the identity service and return the new token;
/// the session stores it. Different identity API versions need different
/// callbacks, which is why this is pluggable.
#[async_trait]
pub trait Reauthenticator: Send + Sync {
    /// Authenticate again and return the new credentials.
    async fn reauthenticate(&self) -> Result<AuthResult, BoxError>;
}

/// Adapter turning an async closure into a [`Reauthenticator`].
pub struct ReauthFn<F>(F);

/// Wrap an async closure as a [`Reauthenticator`].
///
/// ```
/// use provider_client::{AuthResult, reauth_fn};
///
/// let reauth = reauth_fn(|| async { Ok(AuthResult::token("fresh")) });
/// # let _ = reauth;
/// ```
pub fn reauth_fn<F, Fut>(f: F) -> ReauthFn<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<AuthResult, BoxError>> + Send,
{
    ReauthFn(f)
}

#[async_trait]
impl<F, Fut> Reauthenticator for ReauthFn<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<AuthResult, BoxError>> + Send,
{
    async fn reauthenticate(&self) -> Result<AuthResult, BoxError> {
        (self.0)().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_closure_adapter() {
        let reauth = reauth_fn(|| async { Ok(AuthResult::token("t-2").with_user_id("u")) });
        let auth = reauth.reauthenticate().await.unwrap();
        assert_eq!(auth.token, "t-2");
        assert_eq!(auth.user_id.as_deref(), Some("u"));
    }

    #[tokio::test]
    async fn test_closure_adapter_error() {
        let reauth = reauth_fn(|| async { Err::<AuthResult, BoxError>("identity down".into()) });
        let err = reauth.reauthenticate().await.unwrap_err();
        assert_eq!(err.to_string(), "identity down");
    }
}
