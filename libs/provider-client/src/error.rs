//! Error types for authenticated requests using thiserror 2.0.
//!
//! Every failure that came back from the server carries the full
//! [`UnexpectedResponse`], so callers can always get at the status, headers
//! and raw body of the response that failed.

use bytes::Bytes;
use reqwest::Method;
use reqwest::header::HeaderMap;
use std::fmt;
use thiserror::Error;

/// Boxed error returned by caller-supplied hooks (reauthentication, error overrides).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// A response whose status code was not in the accepted set.
#[derive(Debug, Clone)]
pub struct UnexpectedResponse {
    /// Request URL
    pub url: String,
    /// Request method
    pub method: Method,
    /// Status codes that would have been accepted
    pub expected: Vec<u16>,
    /// Status code actually received
    pub actual: u16,
    /// Response headers
    pub headers: HeaderMap,
    /// Raw response body, unmodified
    pub body: Bytes,
}

impl UnexpectedResponse {
    /// The body as text, with invalid UTF-8 replaced.
    #[must_use]
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

impl fmt::Display for UnexpectedResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Expected HTTP response code {:?} when accessing [{} {}], but got {} instead\n{}",
            self.expected,
            self.method,
            self.url,
            self.actual,
            self.body_text()
        )
    }
}

impl std::error::Error for UnexpectedResponse {}

/// Generic error for an unaccepted status code, one variant per status class.
#[derive(Error, Debug)]
pub enum StatusError {
    /// 400
    #[error("Bad request with: [{} {}], error message: {}", .0.method, .0.url, .0.body_text())]
    BadRequest(UnexpectedResponse),

    /// 401
    #[error("Authentication failed")]
    Unauthorized(UnexpectedResponse),

    /// 403
    #[error("Action forbidden: [{} {}], error message: {}", .0.method, .0.url, .0.body_text())]
    Forbidden(UnexpectedResponse),

    /// 404
    #[error("Resource not found: [{} {}], error message: {}", .0.method, .0.url, .0.body_text())]
    NotFound(UnexpectedResponse),

    /// 405
    #[error("Method not allowed")]
    MethodNotAllowed(UnexpectedResponse),

    /// 408
    #[error("The server timed out waiting for the request")]
    RequestTimeout(UnexpectedResponse),

    /// 409
    #[error("Conflict with the current state of the resource: [{} {}], error message: {}", .0.method, .0.url, .0.body_text())]
    Conflict(UnexpectedResponse),

    /// 429
    #[error(
        "Too many requests have been sent in a given amount of time. Pause requests, wait up to one minute, and try again."
    )]
    TooManyRequests(UnexpectedResponse),

    /// 500
    #[error("Internal Server Error")]
    InternalServerError(UnexpectedResponse),

    /// 502 after the retry budget ran out
    #[error("Bad gateway after retries: [{} {}]", .0.method, .0.url)]
    BadGateway(UnexpectedResponse),

    /// 503
    #[error(
        "The service is currently unable to handle the request due to a temporary overloading or maintenance. This is a temporary condition. Try again later."
    )]
    ServiceUnavailable(UnexpectedResponse),

    /// 504 after the retry budget ran out
    #[error("Gateway timeout after retries: [{} {}]", .0.method, .0.url)]
    GatewayTimeout(UnexpectedResponse),

    /// Any other unaccepted status
    #[error(transparent)]
    Unexpected(UnexpectedResponse),
}

impl StatusError {
    /// The response that produced this error.
    #[must_use]
    pub const fn response(&self) -> &UnexpectedResponse {
        match self {
            Self::BadRequest(r)
            | Self::Unauthorized(r)
            | Self::Forbidden(r)
            | Self::NotFound(r)
            | Self::MethodNotAllowed(r)
            | Self::RequestTimeout(r)
            | Self::Conflict(r)
            | Self::TooManyRequests(r)
            | Self::InternalServerError(r)
            | Self::BadGateway(r)
            | Self::ServiceUnavailable(r)
            | Self::GatewayTimeout(r)
            | Self::Unexpected(r) => r,
        }
    }

    /// The status code received.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.response().actual
    }
}

/// Errors returned by [`Session`](crate::Session) requests.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The request was malformed by the caller. Raised before any I/O.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Session configuration is incomplete or inconsistent
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Transport failure (DNS, connection refused, timeout), passed through as-is
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The JSON body could not be rendered
    #[error("Failed to serialize request body: {0}")]
    Serialization(#[source] serde_json::Error),

    /// The signer rejected the request
    #[error("Failed to sign request: {0}")]
    Signing(String),

    /// Unaccepted status code, generic error for its class
    #[error(transparent)]
    Status(#[from] StatusError),

    /// Unaccepted status code, replaced by the request's error context
    #[error("{source}")]
    Domain {
        /// The response that failed
        response: UnexpectedResponse,
        /// The domain-specific error
        source: BoxError,
    },

    /// The reauthentication callback failed
    #[error("Unable to re-authenticate: {source}")]
    Reauthentication {
        /// The 401 response that triggered reauthentication, if any
        original: Option<UnexpectedResponse>,
        /// Error returned by the callback
        source: BoxError,
    },

    /// Reauthentication succeeded but the replayed request failed
    #[error("Error after re-authenticating: {0}")]
    AfterReauthentication(Box<ProviderError>),

    /// The raw body could not be rewound for replay
    #[error("Failed to rewind request body for replay: {0}")]
    BodyRewind(#[source] std::io::Error),

    /// The raw body could not be read
    #[error("Failed to read request body: {0}")]
    BodyRead(#[source] std::io::Error),

    /// Status was accepted but the body did not decode
    #[error("Failed to decode response body: {0}")]
    Decode(#[source] serde_json::Error),
}

impl ProviderError {
    /// Create an invalid request error.
    #[must_use]
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// The server response behind this error, if any.
    #[must_use]
    pub fn response(&self) -> Option<&UnexpectedResponse> {
        match self {
            Self::Status(e) => Some(e.response()),
            Self::Domain { response, .. } => Some(response),
            Self::Reauthentication { original, .. } => original.as_ref(),
            Self::AfterReauthentication(inner) => inner.response(),
            _ => None,
        }
    }

    /// Status code of the failed response, if any.
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        self.response().map(|r| r.actual)
    }

    /// Check whether the error is a 404.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status_code() == Some(404)
    }

    /// Check if the error is transient.
    ///
    /// Gateway failures that survived the retry budget, throttling,
    /// unavailability and transport timeouts are retryable. Reauthentication
    /// failures and programming errors never are.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Status(e) => matches!(
                e,
                StatusError::TooManyRequests(_)
                    | StatusError::BadGateway(_)
                    | StatusError::ServiceUnavailable(_)
                    | StatusError::GatewayTimeout(_)
            ),
            Self::AfterReauthentication(inner) => inner.is_retryable(),
            _ => false,
        }
    }

    /// Wrap an error raised by a replay after reauthentication.
    #[must_use]
    pub fn after_reauthentication(self) -> Self {
        match self {
            Self::AfterReauthentication(_) => self,
            other => Self::AfterReauthentication(Box::new(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(actual: u16, body: &'static str) -> UnexpectedResponse {
        UnexpectedResponse {
            url: "https://vpc.example.com/v1/subnets".to_string(),
            method: Method::GET,
            expected: vec![200],
            actual,
            headers: HeaderMap::new(),
            body: Bytes::from_static(body.as_bytes()),
        }
    }

    #[test]
    fn test_unexpected_display() {
        let err = response(418, "teapot");
        assert_eq!(
            err.to_string(),
            "Expected HTTP response code [200] when accessing [GET https://vpc.example.com/v1/subnets], but got 418 instead\nteapot"
        );
    }

    #[test]
    fn test_status_error_display() {
        let err = StatusError::NotFound(response(404, "{\"code\":\"VPC.0202\"}"));
        assert_eq!(
            err.to_string(),
            "Resource not found: [GET https://vpc.example.com/v1/subnets], error message: {\"code\":\"VPC.0202\"}"
        );
        assert_eq!(err.status(), 404);
    }

    #[test]
    fn test_response_accessors() {
        let err = ProviderError::from(StatusError::InternalServerError(response(500, "boom")));
        assert_eq!(err.status_code(), Some(500));
        assert_eq!(err.response().map(|r| r.body.clone()), Some(Bytes::from_static(b"boom")));

        let wrapped = err.after_reauthentication();
        assert_eq!(wrapped.status_code(), Some(500));
        assert!(matches!(wrapped, ProviderError::AfterReauthentication(_)));

        let rewrapped = wrapped.after_reauthentication();
        match rewrapped {
            ProviderError::AfterReauthentication(inner) => {
                assert!(matches!(*inner, ProviderError::Status(_)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_retryable_errors() {
        assert!(ProviderError::from(StatusError::BadGateway(response(502, ""))).is_retryable());
        assert!(ProviderError::from(StatusError::TooManyRequests(response(429, ""))).is_retryable());
        assert!(!ProviderError::from(StatusError::NotFound(response(404, ""))).is_retryable());
        assert!(!ProviderError::invalid_request("both bodies").is_retryable());
    }
}
