//! Mock implementations for testing.
//!
//! This module provides mock reauthenticators and error contexts for use in tests.

use async_trait::async_trait;
use provider_client::{AuthResult, BoxError, ErrorContext, Reauthenticator, UnexpectedResponse};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Mock reauthenticator that counts its invocations.
///
/// Each successful call returns `"{prefix}-{n}"`, where `n` is the
/// 1-based call number.
#[derive(Debug)]
pub struct CountingReauthenticator {
    calls: AtomicUsize,
    prefix: String,
    delay: Duration,
    failing: bool,
}

impl CountingReauthenticator {
    /// Create a mock issuing tokens with the given prefix.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            prefix: prefix.into(),
            delay: Duration::ZERO,
            failing: false,
        }
    }

    /// Create a mock that always fails.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::new("unused")
        }
    }

    /// Sleep before answering.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Number of times the callback ran.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The token issued by call `n` (1-based).
    #[must_use]
    pub fn token_for_call(&self, n: usize) -> String {
        format!("{}-{n}", self.prefix)
    }
}

#[async_trait]
impl Reauthenticator for CountingReauthenticator {
    async fn reauthenticate(&self) -> Result<AuthResult, BoxError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.failing {
            return Err("identity service rejected the credentials".into());
        }
        Ok(AuthResult::token(self.token_for_call(n)))
    }
}

/// Domain error produced by [`NotFoundContext`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainError {
    /// Resource kind
    pub resource: String,
    /// Resource id
    pub id: String,
    /// Status code of the response that was upgraded
    pub status: u16,
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} not found (status {})", self.resource, self.id, self.status)
    }
}

impl std::error::Error for DomainError {}

/// Error context that only overrides 404.
#[derive(Debug, Clone)]
pub struct NotFoundContext {
    /// Resource kind
    pub resource: String,
    /// Resource id
    pub id: String,
}

impl NotFoundContext {
    /// Create a context for one resource.
    #[must_use]
    pub fn new(resource: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            id: id.into(),
        }
    }
}

impl ErrorContext for NotFoundContext {
    fn not_found(&self, response: &UnexpectedResponse) -> Option<BoxError> {
        Some(Box::new(DomainError {
            resource: self.resource.clone(),
            id: self.id.clone(),
            status: response.actual,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_counting_reauthenticator() {
        let reauth = CountingReauthenticator::new("tok");
        let first = reauth.reauthenticate().await.unwrap();
        let second = reauth.reauthenticate().await.unwrap();
        assert_eq!(first.token, "tok-1");
        assert_eq!(second.token, "tok-2");
        assert_eq!(reauth.calls(), 2);
    }

    #[tokio::test]
    async fn test_failing_reauthenticator() {
        let reauth = CountingReauthenticator::failing();
        assert!(reauth.reauthenticate().await.is_err());
        assert_eq!(reauth.calls(), 1);
    }
}
