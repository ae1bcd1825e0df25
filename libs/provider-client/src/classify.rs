//! Status code classification and per-request error overrides.
//!
//! A failed response is first mapped to the generic [`StatusError`] for its
//! status class. If the request carries an [`ErrorContext`], the handler
//! registered for that class gets a chance to replace the generic error with
//! a domain-specific one. Dispatch goes through a static table keyed by
//! [`StatusClass`].

use crate::error::{BoxError, ProviderError, StatusError, UnexpectedResponse};
use std::fmt;

/// Status codes with a dedicated error variant and override hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusClass {
    /// 400
    BadRequest,
    /// 401
    Unauthorized,
    /// 403
    Forbidden,
    /// 404
    NotFound,
    /// 405
    MethodNotAllowed,
    /// 408
    RequestTimeout,
    /// 409
    Conflict,
    /// 429
    TooManyRequests,
    /// 500
    InternalServerError,
    /// 502
    BadGateway,
    /// 503
    ServiceUnavailable,
    /// 504
    GatewayTimeout,
}

impl StatusClass {
    /// Map a status code to its class.
    #[must_use]
    pub const fn from_status(status: u16) -> Option<Self> {
        Some(match status {
            400 => Self::BadRequest,
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            405 => Self::MethodNotAllowed,
            408 => Self::RequestTimeout,
            409 => Self::Conflict,
            429 => Self::TooManyRequests,
            500 => Self::InternalServerError,
            502 => Self::BadGateway,
            503 => Self::ServiceUnavailable,
            504 => Self::GatewayTimeout,
            _ => return None,
        })
    }

    /// The status code of this class.
    #[must_use]
    pub const fn code(self) -> u16 {
        match self {
            Self::BadRequest => 400,
            Self::Unauthorized => 401,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::MethodNotAllowed => 405,
            Self::RequestTimeout => 408,
            Self::Conflict => 409,
            Self::TooManyRequests => 429,
            Self::InternalServerError => 500,
            Self::BadGateway => 502,
            Self::ServiceUnavailable => 503,
            Self::GatewayTimeout => 504,
        }
    }

    fn generic_error(self, response: UnexpectedResponse) -> StatusError {
        match self {
            Self::BadRequest => StatusError::BadRequest(response),
            Self::Unauthorized => StatusError::Unauthorized(response),
            Self::Forbidden => StatusError::Forbidden(response),
            Self::NotFound => StatusError::NotFound(response),
            Self::MethodNotAllowed => StatusError::MethodNotAllowed(response),
            Self::RequestTimeout => StatusError::RequestTimeout(response),
            Self::Conflict => StatusError::Conflict(response),
            Self::TooManyRequests => StatusError::TooManyRequests(response),
            Self::InternalServerError => StatusError::InternalServerError(response),
            Self::BadGateway => StatusError::BadGateway(response),
            Self::ServiceUnavailable => StatusError::ServiceUnavailable(response),
            Self::GatewayTimeout => StatusError::GatewayTimeout(response),
        }
    }
}

/// Per-request error override.
///
/// Resource bindings implement the handlers for the statuses they know how
/// to describe better than the generic error. Returning `None` (the default
/// for every handler) keeps the generic error.
///
/// ```
/// use provider_client::{BoxError, ErrorContext, UnexpectedResponse};
///
/// #[derive(Debug)]
/// struct SubnetContext {
///     subnet_id: String,
/// }
///
/// impl ErrorContext for SubnetContext {
///     fn not_found(&self, _response: &UnexpectedResponse) -> Option<BoxError> {
///         Some(format!("subnet {} does not exist", self.subnet_id).into())
///     }
/// }
/// ```
pub trait ErrorContext: Send + Sync + fmt::Debug {
    /// Override for 400.
    fn bad_request(&self, _response: &UnexpectedResponse) -> Option<BoxError> {
        None
    }

    /// Override for 401 (only consulted when no reauthentication is configured
    /// or attempts are exhausted).
    fn unauthorized(&self, _response: &UnexpectedResponse) -> Option<BoxError> {
        None
    }

    /// Override for 403.
    fn forbidden(&self, _response: &UnexpectedResponse) -> Option<BoxError> {
        None
    }

    /// Override for 404.
    fn not_found(&self, _response: &UnexpectedResponse) -> Option<BoxError> {
        None
    }

    /// Override for 405.
    fn method_not_allowed(&self, _response: &UnexpectedResponse) -> Option<BoxError> {
        None
    }

    /// Override for 408.
    fn request_timeout(&self, _response: &UnexpectedResponse) -> Option<BoxError> {
        None
    }

    /// Override for 409.
    fn conflict(&self, _response: &UnexpectedResponse) -> Option<BoxError> {
        None
    }

    /// Override for 429.
    fn too_many_requests(&self, _response: &UnexpectedResponse) -> Option<BoxError> {
        None
    }

    /// Override for 500.
    fn internal_server_error(&self, _response: &UnexpectedResponse) -> Option<BoxError> {
        None
    }

    /// Override for 503.
    fn service_unavailable(&self, _response: &UnexpectedResponse) -> Option<BoxError> {
        None
    }
}

type Upgrade = fn(&dyn ErrorContext, &UnexpectedResponse) -> Option<BoxError>;

// 502/504 have no hook: they only surface once the retry budget is spent.
const UPGRADES: [(StatusClass, Upgrade); 10] = [
    (StatusClass::BadRequest, |ctx, r| ctx.bad_request(r)),
    (StatusClass::Unauthorized, |ctx, r| ctx.unauthorized(r)),
    (StatusClass::Forbidden, |ctx, r| ctx.forbidden(r)),
    (StatusClass::NotFound, |ctx, r| ctx.not_found(r)),
    (StatusClass::MethodNotAllowed, |ctx, r| ctx.method_not_allowed(r)),
    (StatusClass::RequestTimeout, |ctx, r| ctx.request_timeout(r)),
    (StatusClass::Conflict, |ctx, r| ctx.conflict(r)),
    (StatusClass::TooManyRequests, |ctx, r| ctx.too_many_requests(r)),
    (StatusClass::InternalServerError, |ctx, r| ctx.internal_server_error(r)),
    (StatusClass::ServiceUnavailable, |ctx, r| ctx.service_unavailable(r)),
];

fn upgrade_for(class: StatusClass) -> Option<Upgrade> {
    UPGRADES
        .iter()
        .find(|(candidate, _)| *candidate == class)
        .map(|(_, upgrade)| *upgrade)
}

/// Classify a failed response into a typed error.
#[must_use]
pub fn classify(response: UnexpectedResponse, context: Option<&dyn ErrorContext>) -> ProviderError {
    let Some(class) = StatusClass::from_status(response.actual) else {
        return StatusError::Unexpected(response).into();
    };

    let upgraded = context
        .zip(upgrade_for(class))
        .and_then(|(ctx, upgrade)| upgrade(ctx, &response));

    match upgraded {
        Some(source) => ProviderError::Domain { response, source },
        None => class.generic_error(response).into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use reqwest::Method;
    use reqwest::header::HeaderMap;

    fn response(actual: u16) -> UnexpectedResponse {
        UnexpectedResponse {
            url: "https://ecs.example.com/v1/p/cloudservers".to_string(),
            method: Method::DELETE,
            expected: vec![202, 204],
            actual,
            headers: HeaderMap::new(),
            body: Bytes::from_static(b"{}"),
        }
    }

    #[derive(Debug)]
    struct ConflictOnly;

    impl ErrorContext for ConflictOnly {
        fn conflict(&self, response: &UnexpectedResponse) -> Option<BoxError> {
            Some(format!("server busy, status {}", response.actual).into())
        }
    }

    #[test]
    fn test_class_roundtrip() {
        for code in [400, 401, 403, 404, 405, 408, 409, 429, 500, 502, 503, 504] {
            let class = StatusClass::from_status(code).unwrap();
            assert_eq!(class.code(), code);
        }
        assert_eq!(StatusClass::from_status(418), None);
    }

    #[test]
    fn test_generic_classification() {
        assert!(matches!(
            classify(response(404), None),
            ProviderError::Status(StatusError::NotFound(_))
        ));
        assert!(matches!(
            classify(response(503), None),
            ProviderError::Status(StatusError::ServiceUnavailable(_))
        ));
        assert!(matches!(
            classify(response(418), None),
            ProviderError::Status(StatusError::Unexpected(_))
        ));
    }

    #[test]
    fn test_override_applies_to_matching_status_only() {
        let ctx = ConflictOnly;
        match classify(response(409), Some(&ctx)) {
            ProviderError::Domain { response, source } => {
                assert_eq!(response.actual, 409);
                assert_eq!(source.to_string(), "server busy, status 409");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        assert!(matches!(
            classify(response(400), Some(&ctx)),
            ProviderError::Status(StatusError::BadRequest(_))
        ));
    }

    #[test]
    fn test_gateway_codes_have_no_override() {
        assert!(upgrade_for(StatusClass::BadGateway).is_none());
        assert!(upgrade_for(StatusClass::GatewayTimeout).is_none());
        assert!(upgrade_for(StatusClass::NotFound).is_some());
    }
}
