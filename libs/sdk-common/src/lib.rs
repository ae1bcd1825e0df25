//! Shared building blocks for the cloud provider SDK.
//!
//! This crate provides:
//! - HTTP transport configuration and building
//! - The gateway retry policy (502/504, fixed delay, bounded budget)
//! - User-Agent accumulation
//! - Tracing subscriber initialisation

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod http;
pub mod retry;
pub mod tracing_config;
pub mod user_agent;

pub use http::{HttpConfig, build_http_client};
pub use retry::{RetryBudget, RetryPolicy, is_retriable_status};
pub use tracing_config::{TracingConfig, init_tracing};
pub use user_agent::{DEFAULT_USER_AGENT, UserAgent};
