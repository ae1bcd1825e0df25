//! Shared proptest generators for the provider SDK libraries.

use proptest::prelude::*;
use reqwest::Method;
use std::time::Duration;

/// Generate HTTP methods used by resource bindings.
pub fn method_strategy() -> impl Strategy<Value = Method> {
    prop_oneof![
        Just(Method::GET),
        Just(Method::POST),
        Just(Method::PUT),
        Just(Method::PATCH),
        Just(Method::DELETE),
        Just(Method::HEAD),
    ]
}

/// Generate status codes with a dedicated error class.
pub fn classified_status_strategy() -> impl Strategy<Value = u16> {
    prop::sample::select(vec![
        400u16, 401, 403, 404, 405, 408, 409, 429, 500, 502, 503, 504,
    ])
}

/// Generate error status codes without a dedicated class.
pub fn unclassified_status_strategy() -> impl Strategy<Value = u16> {
    (400u16..600).prop_filter("status has a dedicated class", |s| {
        ![400, 401, 403, 404, 405, 408, 409, 429, 500, 502, 503, 504].contains(s)
    })
}

/// Generate bearer tokens.
pub fn token_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_-]{16,64}"
}

/// Generate custom header names (never one the session sets itself).
pub fn header_name_strategy() -> impl Strategy<Value = String> {
    "X-Test-[A-Za-z]{1,12}"
}

/// Generate printable header values.
pub fn header_value_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z0-9 ./_=-]{1,40}"
}

/// Generate User-Agent fragments.
pub fn user_agent_fragment_strategy() -> impl Strategy<Value = String> {
    "[a-z]{2,10}/[0-9]\\.[0-9]{1,2}"
}

/// Generate retry counts.
pub fn retry_count_strategy() -> impl Strategy<Value = u32> {
    0u32..5
}

/// Generate short retry delays.
pub fn retry_delay_strategy() -> impl Strategy<Value = Duration> {
    (0u64..50).prop_map(Duration::from_millis)
}
